//! Ledger aggregation.
//!
//! Turns the full payment history of a mess into the current balance of each
//! member and the lifetime amount collected. A member's current balance is
//! the `remaining_due` of their latest payment; earlier payments only count
//! towards the collected total.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::backend::domain::models::PaymentRecord;

/// Result of aggregating one mess's ledger
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerAggregate {
    /// Authoritative record per member email
    pub latest_by_member: BTreeMap<String, PaymentRecord>,
    /// Sum of `amount_paid` over every record, not just the latest ones
    pub total_collected: f64,
    /// Joined members with no payment history at all
    pub unpaid_members: BTreeSet<String>,
}

impl LedgerAggregate {
    pub fn latest_for(&self, member_email: &str) -> Option<&PaymentRecord> {
        self.latest_by_member.get(member_email)
    }

    /// Sum of current balances of every member with a ledger entry
    pub fn ledger_pending(&self) -> f64 {
        self.latest_by_member.values().map(|p| p.remaining_due).sum()
    }
}

/// Aggregates payment records into per-member balances
#[derive(Clone, Default)]
pub struct LedgerService;

impl LedgerService {
    pub fn new() -> Self {
        Self
    }

    /// Partition payments by member, keep the latest per member and total
    /// what was collected.
    ///
    /// The result does not depend on the order of `payments`.
    pub fn aggregate(
        &self,
        payments: &[PaymentRecord],
        joined_members: &BTreeSet<String>,
    ) -> LedgerAggregate {
        let mut latest_by_member: BTreeMap<String, PaymentRecord> = BTreeMap::new();

        for payment in payments {
            match latest_by_member.get(&payment.member_email) {
                Some(current) if !supersedes(payment, current) => {}
                _ => {
                    latest_by_member.insert(payment.member_email.clone(), payment.clone());
                }
            }
        }

        // Summed in a fixed order so the float result is independent of input order
        let mut amounts: Vec<f64> = payments.iter().map(|p| p.amount_paid).collect();
        amounts.sort_by(|a, b| a.total_cmp(b));
        let total_collected = amounts.into_iter().sum();

        let unpaid_members: BTreeSet<String> = joined_members
            .iter()
            .filter(|member| !latest_by_member.contains_key(*member))
            .cloned()
            .collect();

        debug!(
            "Aggregated {} payments: {} members with history, {} joined members without, collected {:.2}",
            payments.len(),
            latest_by_member.len(),
            unpaid_members.len(),
            total_collected
        );

        LedgerAggregate {
            latest_by_member,
            total_collected,
            unpaid_members,
        }
    }
}

/// Order used to pick the authoritative record of a member.
///
/// Later `payment_date` wins; records without a date lose to any dated one.
/// Equal dates are broken by the larger `amount_paid`, then by the larger id,
/// so the pick is deterministic even though the backend has no sequence number.
pub fn compare_recency(a: &PaymentRecord, b: &PaymentRecord) -> Ordering {
    a.payment_date
        .cmp(&b.payment_date)
        .then_with(|| a.amount_paid.total_cmp(&b.amount_paid))
        .then_with(|| a.id.cmp(&b.id))
}

fn supersedes(candidate: &PaymentRecord, current: &PaymentRecord) -> bool {
    compare_recency(candidate, current) == Ordering::Greater
}
