//! # REST client layer
//!
//! Talks to the mess backend over HTTP. This layer handles:
//! - building endpoint URLs with percent-encoded path segments
//! - retrying failed requests with backoff ([`fetcher`])
//! - mapping loosely typed JSON into domain models ([`mappers`])
//!
//! Nothing here computes dues; the domain services do that from what this
//! layer returns.

pub mod fetcher;
pub mod mappers;
pub mod mess_api_client;

pub use fetcher::{FetchError, ResilientFetcher, RetryPolicy, TransportError};
pub use mess_api_client::HttpMessDataSource;
