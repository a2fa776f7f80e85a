//! # Domain Module
//!
//! Dues reconciliation logic for a mess owner and its members. Nothing in
//! here talks HTTP; services read through
//! [`MessDataSource`](crate::backend::storage::MessDataSource).
//!
//! ## Module Organization
//!
//! - **subscription_resolver**: turns a plan value and a per-meal price into an amount
//! - **ledger_service**: latest payment per member and the collected total
//! - **dues_synthesizer**: default dues for joined members who never paid
//! - **summary_service**: mess-wide summary and per-member dues views
//! - **reconciliation_service**: fetches a snapshot and runs the above on it
//! - **payment_service**: one member's dues, recording payments, payment history
//!
//! ## Business Rules
//!
//! - A member's balance is the remaining due of their latest payment
//! - Collected money counts every payment ever made, not just the latest
//! - Joined members without payments owe one subscription period
//! - Members that left keep their outstanding balance in the pending total
//! - No amount is ever negative

pub mod commands;
pub mod dues_synthesizer;
pub mod errors;
pub mod ledger_service;
pub mod models;
pub mod payment_service;
pub mod reconciliation_service;
pub mod subscription_resolver;
pub mod summary_service;

pub use dues_synthesizer::DuesSynthesizer;
pub use errors::{DuesError, PaymentValidationError};
pub use ledger_service::{LedgerAggregate, LedgerService};
pub use payment_service::PaymentService;
pub use reconciliation_service::{ReconciliationInput, ReconciliationService};
pub use subscription_resolver::{resolve_amount, PlanInterpretation};
pub use summary_service::SummaryService;
