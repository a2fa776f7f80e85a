use serde::{Deserialize, Serialize};
use std::fmt;

/// Form body for `POST /payment/record`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPaymentRequest {
    pub user_email: String,
    pub owner_email: String,
    pub mess_id: String,
    pub amount_paid: f64,
    pub remaining_dues: f64,
}

// ---------------------------------------------------------------------------
// Views handed to the presentation layer.
// ---------------------------------------------------------------------------

/// Mess-wide financial state for one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialSummary {
    /// Lifetime sum of every amount paid to the mess
    pub total_collected: f64,
    /// Current outstanding balance across all members
    pub pending_dues: f64,
    pub total_members: usize,
    pub active_members: usize,
    /// Set when malformed backend data was coerced during the pass
    pub is_partial: bool,
}

/// Where a member's pending dues figure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuesSource {
    /// Remaining due of the member's latest payment record
    FromLedger,
    /// Computed from plan and price because the member never paid
    SynthesizedDefault,
    /// Reported directly by the backend's pending dues endpoint
    BackendReported,
}

impl fmt::Display for DuesSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuesSource::FromLedger => write!(f, "ledger"),
            DuesSource::SynthesizedDefault => write!(f, "synthesized default"),
            DuesSource::BackendReported => write!(f, "backend"),
        }
    }
}

/// Per-member dues line shown on the owner's member list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberDuesView {
    pub member_email: String,
    /// Display name, "Unknown User" when the profile could not be loaded
    pub name: String,
    /// Human-readable plan label
    pub plan: String,
    pub pending_dues: f64,
    pub source: DuesSource,
    /// Attendance is not computed by the engine yet
    pub attendance: Option<u32>,
}

/// Status badge of a payment in the history list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

/// One row of the owner's payment history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentHistoryEntry {
    pub id: String,
    pub member_email: String,
    pub member_name: String,
    pub amount_paid: f64,
    pub remaining_due: f64,
    /// RFC 3339 timestamp, absent when the backend sent an unusable date
    pub payment_date: Option<String>,
    pub status: PaymentStatus,
}

/// Payment history of a mess as shown to the owner
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentHistory {
    pub entries: Vec<PaymentHistoryEntry>,
    /// True when malformed payment data was skipped or coerced
    pub is_partial: bool,
    pub issues: Vec<String>,
}

/// Filter applied to the payment history list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentFilter {
    #[default]
    All,
    /// Only payments that still leave something outstanding
    Due,
    /// Only payments that settled the balance
    Paid,
}

impl PaymentFilter {
    pub fn matches(&self, entry: &PaymentHistoryEntry) -> bool {
        match self {
            PaymentFilter::All => true,
            PaymentFilter::Due => entry.status == PaymentStatus::Pending,
            PaymentFilter::Paid => entry.status == PaymentStatus::Paid,
        }
    }
}

/// Output of one complete reconciliation pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub pass_id: u64,
    pub mess_id: String,
    pub summary: FinancialSummary,
    pub members: Vec<MemberDuesView>,
    /// Descriptions of malformed data absorbed during the pass
    pub issues: Vec<String>,
}

impl ReconciliationReport {
    /// Members that still owe something
    pub fn members_with_dues(&self) -> impl Iterator<Item = &MemberDuesView> {
        self.members.iter().filter(|m| m.pending_dues > 0.0)
    }
}

/// Pending dues for a single member, as shown on the pay-dues screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberPendingDues {
    pub member_email: String,
    pub mess_id: String,
    pub pending_dues: f64,
    pub source: DuesSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_payment_request_uses_backend_field_names() {
        let request = RecordPaymentRequest {
            user_email: "a@x.com".to_string(),
            owner_email: "o@x.com".to_string(),
            mess_id: "m1".to_string(),
            amount_paid: 500.0,
            remaining_dues: 2500.0,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["userEmail"], "a@x.com");
        assert_eq!(json["remainingDues"], 2500.0);
    }

    #[test]
    fn test_payment_filter_matches_status() {
        let entry = PaymentHistoryEntry {
            id: "p1".to_string(),
            member_email: "a@x.com".to_string(),
            member_name: "A".to_string(),
            amount_paid: 100.0,
            remaining_due: 50.0,
            payment_date: None,
            status: PaymentStatus::Pending,
        };
        assert!(PaymentFilter::All.matches(&entry));
        assert!(PaymentFilter::Due.matches(&entry));
        assert!(!PaymentFilter::Paid.matches(&entry));
    }
}
