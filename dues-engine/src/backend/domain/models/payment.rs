//! Domain model for a single recorded payment.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: String,
    pub member_email: String,
    pub owner_email: String,
    pub mess_id: String,
    /// Amount owed when the payment was made
    pub total_due: f64,
    /// Amount paid in this transaction
    pub amount_paid: f64,
    /// Outstanding balance carried forward, never negative
    pub remaining_due: f64,
    /// None when the backend sent a missing or unusable date
    pub payment_date: Option<DateTime<Utc>>,
    pub status: Option<String>,
}

impl PaymentRecord {
    /// True when this payment left nothing outstanding
    pub fn is_settled(&self) -> bool {
        self.remaining_due <= 0.0
    }
}
