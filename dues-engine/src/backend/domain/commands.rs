//! Domain-level command types.
//! These are what presentation code hands to the services; the services map
//! them to the backend's wire shapes themselves.

pub mod payments {
    use crate::backend::domain::models::PaymentRecord;

    /// Input for recording a payment from a member to a mess.
    #[derive(Debug, Clone)]
    pub struct RecordPaymentCommand {
        pub member_email: String,
        pub owner_email: String,
        pub mess_id: String,
        pub amount_paid: f64,
        /// What the member owed before this payment
        pub total_dues: f64,
    }

    /// Result of recording a payment.
    #[derive(Debug, Clone)]
    pub struct RecordPaymentResult {
        pub payment: PaymentRecord,
        /// True when the backend echoed a usable record back
        pub confirmed_by_backend: bool,
    }
}
