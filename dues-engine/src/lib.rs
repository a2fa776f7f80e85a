//! Dues reconciliation engine for the mess subscription client.
//!
//! Given a mess and its payment ledger, the engine works out what every
//! member still owes, what the mess has collected, and records new payments.
//! Start with [`initialize_engine`] or [`DuesEngine::with_source`].

pub mod backend;
pub mod logging;

pub use backend::config::{ConfigError, EngineConfig};
pub use backend::domain::commands::payments::{RecordPaymentCommand, RecordPaymentResult};
pub use backend::domain::models::MessRef;
pub use backend::domain::{DuesError, PaymentValidationError, ReconciliationInput};
pub use backend::io::{FetchError, RetryPolicy, TransportError};
pub use backend::{initialize_engine, DuesEngine};
pub use logging::init_logging;
