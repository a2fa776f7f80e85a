//! Errors surfaced by the dues services.
use crate::backend::io::rest::fetcher::FetchError;

/// Failure of a reconciliation pass or a dues lookup
#[derive(Debug, thiserror::Error)]
pub enum DuesError {
    /// Roster or payment list could not be fetched; no summary may be produced
    #[error("{what} is unavailable: {source}")]
    UpstreamUnavailable {
        what: String,
        #[source]
        source: FetchError,
    },
    /// The mess response could not be interpreted as a mess at all
    #[error("{mess} returned an unusable response: {detail}")]
    MalformedMess { mess: String, detail: String },
    /// A newer pass started while this one was fetching
    #[error("Reconciliation pass {pass_id} was superseded by pass {latest}")]
    Superseded { pass_id: u64, latest: u64 },
    #[error(transparent)]
    InvalidPayment(#[from] PaymentValidationError),
    #[error("Payment could not be recorded: {0}")]
    PaymentNotRecorded(#[source] FetchError),
}

impl DuesError {
    pub fn upstream(what: impl Into<String>, source: FetchError) -> Self {
        DuesError::UpstreamUnavailable {
            what: what.into(),
            source,
        }
    }

    /// True when the caller should offer a retry rather than show data
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DuesError::UpstreamUnavailable { .. } | DuesError::PaymentNotRecorded(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PaymentValidationError {
    #[error("Payment amount must be a positive number")]
    NonPositiveAmount,
    #[error("Payment amount {amount:.2} exceeds total dues {total_dues:.2}")]
    ExceedsDues { amount: f64, total_dues: f64 },
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}
