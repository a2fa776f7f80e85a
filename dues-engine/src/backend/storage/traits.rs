//! # Data source traits
//!
//! The domain services read mess rosters, payments and profiles through
//! [`MessDataSource`] so they can run against the HTTP backend or an
//! in-memory source without modification.

use async_trait::async_trait;
use shared::RecordPaymentRequest;

use crate::backend::domain::errors::DuesError;
use crate::backend::domain::models::{Coerced, MemberProfile, MessConfig, MessRef, PaymentRecord};

/// Read and write access to the mess backend.
///
/// Results carry the data issues found while coercing the response. Errors
/// mean the data could not be obtained at all.
#[async_trait]
pub trait MessDataSource: Send + Sync {
    /// Mess configuration and roster
    async fn fetch_mess(&self, mess: &MessRef) -> Result<Coerced<MessConfig>, DuesError>;

    /// Every payment ever recorded for a mess
    async fn fetch_mess_payments(&self, mess_id: &str) -> Result<Coerced<Vec<PaymentRecord>>, DuesError>;

    /// Payments of one member in one mess
    async fn fetch_member_payments(
        &self,
        member_email: &str,
        mess_id: &str,
    ) -> Result<Coerced<Vec<PaymentRecord>>, DuesError>;

    /// Member profile, `None` when the backend has no usable profile
    async fn fetch_member_profile(&self, member_email: &str) -> Result<Option<MemberProfile>, DuesError>;

    /// Pending dues as computed by the backend, `None` when it reports no usable figure
    async fn fetch_pending_dues(&self, member_email: &str, mess_id: &str) -> Result<Option<f64>, DuesError>;

    /// Record a payment. Returns the stored record when the backend echoes one back.
    async fn record_payment(&self, request: &RecordPaymentRequest) -> Result<Option<PaymentRecord>, DuesError>;
}
