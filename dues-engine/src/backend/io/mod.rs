//! # IO Module
//!
//! Adapter layer between the domain services and the mess backend. It owns
//! the wire protocol (REST over HTTP with JSON bodies), retries, and the
//! translation of backend responses into domain models.

pub mod rest;

pub use rest::*;
