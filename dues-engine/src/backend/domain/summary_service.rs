//! Financial summary and member dues views for the owner screens.

use std::collections::{BTreeMap, BTreeSet};

use shared::{DuesSource, FinancialSummary, MemberDuesView};
use tracing::info;

use crate::backend::domain::dues_synthesizer::DuesSynthesizer;
use crate::backend::domain::ledger_service::LedgerAggregate;
use crate::backend::domain::models::{MemberProfile, MessConfig, UNKNOWN_MEMBER_NAME};

/// Builds the mess-wide summary and the per-member views from an aggregated ledger
#[derive(Clone, Default)]
pub struct SummaryService {
    synthesizer: DuesSynthesizer,
}

impl SummaryService {
    pub fn new() -> Self {
        Self {
            synthesizer: DuesSynthesizer::new(),
        }
    }

    /// Compose the summary and one view per joined member.
    ///
    /// Pending dues are the latest remaining due of every member with a
    /// ledger entry, including members who have since left, plus the
    /// synthesized default of every joined member without one. Members in
    /// `inactive_members` still count towards `total_members` and still owe
    /// their dues, they are only left out of `active_members`.
    pub fn build(
        &self,
        mess: &MessConfig,
        aggregate: &LedgerAggregate,
        profiles: &BTreeMap<String, MemberProfile>,
        inactive_members: &BTreeSet<String>,
        is_partial: bool,
    ) -> (FinancialSummary, Vec<MemberDuesView>) {
        let mut views = Vec::with_capacity(mess.joined_members.len());
        let mut synthesized_total = 0.0;

        for member in &mess.joined_members {
            let profile = profiles.get(member);
            let (pending_dues, source) = match aggregate.latest_for(member) {
                Some(latest) => (latest.remaining_due, DuesSource::FromLedger),
                None => {
                    let amount = self.synthesizer.synthesize_default(member, mess, profile);
                    synthesized_total += amount;
                    (amount, DuesSource::SynthesizedDefault)
                }
            };

            views.push(MemberDuesView {
                member_email: member.clone(),
                name: profile
                    .map(|p| p.name.clone())
                    .unwrap_or_else(|| UNKNOWN_MEMBER_NAME.to_string()),
                plan: self.synthesizer.plan_label(mess, profile),
                pending_dues,
                source,
                attendance: None,
            });
        }

        let total_members = mess.joined_members.len();
        let active_members = mess
            .joined_members
            .iter()
            .filter(|m| !inactive_members.contains(*m))
            .count();

        let summary = FinancialSummary {
            total_collected: aggregate.total_collected,
            pending_dues: aggregate.ledger_pending() + synthesized_total,
            total_members,
            active_members,
            is_partial,
        };

        info!(
            "Summary for mess {}: collected {:.2}, pending {:.2}, {} members ({} active){}",
            mess.id,
            summary.total_collected,
            summary.pending_dues,
            summary.total_members,
            summary.active_members,
            if is_partial { ", partial" } else { "" }
        );

        (summary, views)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::domain::ledger_service::LedgerService;
    use crate::backend::domain::models::{PaymentRecord, PlanValue};
    use chrono::{TimeZone, Utc};

    fn mess(members: &[&str]) -> MessConfig {
        MessConfig {
            id: "mess-1".to_string(),
            name: None,
            owner_email: None,
            price_per_meal: 100.0,
            subscription_plan: Some(PlanValue::Number(30.0)),
            joined_members: members.iter().map(|m| m.to_string()).collect(),
        }
    }

    fn payment(member: &str, paid: f64, remaining: f64) -> PaymentRecord {
        PaymentRecord {
            id: format!("pay-{}", member),
            member_email: member.to_string(),
            owner_email: "owner@mess.com".to_string(),
            mess_id: "mess-1".to_string(),
            total_due: paid + remaining,
            amount_paid: paid,
            remaining_due: remaining,
            payment_date: Some(Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap()),
            status: None,
        }
    }

    #[test]
    fn test_member_without_payments_contributes_synthesized_default() {
        let mess = mess(&["a@x.com", "b@x.com"]);
        let aggregate = LedgerService::new().aggregate(&[payment("a@x.com", 500.0, 2500.0)], &mess.joined_members);

        let (summary, views) = SummaryService::new().build(&mess, &aggregate, &BTreeMap::new(), &BTreeSet::new(), false);

        assert_eq!(summary.total_collected, 500.0);
        assert_eq!(summary.pending_dues, 5500.0);
        assert_eq!(summary.total_members, 2);
        assert_eq!(summary.active_members, 2);
        assert!(!summary.is_partial);

        assert_eq!(views.len(), 2);
        assert_eq!(views[0].member_email, "a@x.com");
        assert_eq!(views[0].pending_dues, 2500.0);
        assert_eq!(views[0].source, DuesSource::FromLedger);
        assert_eq!(views[1].pending_dues, 3000.0);
        assert_eq!(views[1].source, DuesSource::SynthesizedDefault);
        assert_eq!(views[1].name, UNKNOWN_MEMBER_NAME);
    }

    #[test]
    fn test_fully_paid_member_shows_zero() {
        let mess = mess(&["a@x.com"]);
        let aggregate = LedgerService::new().aggregate(&[payment("a@x.com", 3000.0, 0.0)], &mess.joined_members);

        let (summary, views) = SummaryService::new().build(&mess, &aggregate, &BTreeMap::new(), &BTreeSet::new(), false);

        assert_eq!(summary.pending_dues, 0.0);
        assert_eq!(views[0].pending_dues, 0.0);
        assert_eq!(views[0].source, DuesSource::FromLedger);
    }

    #[test]
    fn test_inactive_members_reduce_active_count_only() {
        let mess = mess(&["a@x.com", "b@x.com", "c@x.com"]);
        let aggregate = LedgerService::new().aggregate(&[], &mess.joined_members);
        let inactive: BTreeSet<String> = ["c@x.com".to_string()].into_iter().collect();

        let (summary, _) = SummaryService::new().build(&mess, &aggregate, &BTreeMap::new(), &inactive, false);

        assert_eq!(summary.total_members, 3);
        assert_eq!(summary.active_members, 2);
        assert_eq!(summary.pending_dues, 9000.0);
    }

    #[test]
    fn test_profile_names_are_used() {
        let mess = mess(&["a@x.com"]);
        let aggregate = LedgerService::new().aggregate(&[], &mess.joined_members);
        let mut profiles = BTreeMap::new();
        profiles.insert(
            "a@x.com".to_string(),
            MemberProfile {
                name: "Asha".to_string(),
                ..MemberProfile::unknown("a@x.com")
            },
        );

        let (_, views) = SummaryService::new().build(&mess, &aggregate, &profiles, &BTreeSet::new(), false);
        assert_eq!(views[0].name, "Asha");
        assert_eq!(views[0].plan, "Monthly");
    }
}
