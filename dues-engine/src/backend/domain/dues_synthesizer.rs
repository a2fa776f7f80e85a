//! Default dues for members who never paid.

use tracing::debug;

use crate::backend::domain::models::{MemberProfile, MessConfig, PlanValue};
use crate::backend::domain::subscription_resolver::{interpret_plan, resolve_amount};

/// Which plan value a synthesized figure was based on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanOrigin {
    Mess,
    MemberProfile,
    /// Neither the mess nor the member has a usable plan
    Default,
}

/// Synthesizes an outstanding balance from plan and price
#[derive(Clone, Default)]
pub struct DuesSynthesizer;

impl DuesSynthesizer {
    pub fn new() -> Self {
        Self
    }

    /// Default dues for `member`, who has no payment record in the mess.
    ///
    /// The mess plan takes precedence, then the member's own plan, then the
    /// monthly default. The result is never negative.
    pub fn synthesize_default(
        &self,
        member: &str,
        mess: &MessConfig,
        profile: Option<&MemberProfile>,
    ) -> f64 {
        let (plan, origin) = Self::effective_plan(mess, profile);
        let amount = resolve_amount(plan, mess.price_per_meal);
        debug!(
            "Synthesized default dues for {} from {:?} plan: {:.2}",
            member, origin, amount
        );
        amount
    }

    /// Plan label shown next to a member, following the same precedence
    pub fn plan_label(&self, mess: &MessConfig, profile: Option<&MemberProfile>) -> String {
        let (plan, _) = Self::effective_plan(mess, profile);
        match plan {
            Some(PlanValue::Text(text)) => text.trim().to_string(),
            other => interpret_plan(other).label(),
        }
    }

    fn effective_plan<'a>(
        mess: &'a MessConfig,
        profile: Option<&'a MemberProfile>,
    ) -> (Option<&'a PlanValue>, PlanOrigin) {
        if mess_plan_is_set(mess) {
            return (mess.subscription_plan.as_ref(), PlanOrigin::Mess);
        }
        if let Some(plan) = profile
            .and_then(|p| p.subscription_plan.as_ref())
            .filter(|p| is_set(p))
        {
            return (Some(plan), PlanOrigin::MemberProfile);
        }
        (None, PlanOrigin::Default)
    }
}

/// True when the mess's own plan decides default dues and member plans are never consulted
pub fn mess_plan_is_set(mess: &MessConfig) -> bool {
    mess.subscription_plan.as_ref().is_some_and(is_set)
}

/// A zero or blank plan counts as not configured
fn is_set(plan: &PlanValue) -> bool {
    match plan {
        PlanValue::Number(n) => *n != 0.0 && !n.is_nan(),
        PlanValue::Text(text) => !text.trim().is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn mess(price: f64, plan: Option<PlanValue>) -> MessConfig {
        MessConfig {
            id: "mess-1".to_string(),
            name: Some("Annapurna".to_string()),
            owner_email: Some("owner@mess.com".to_string()),
            price_per_meal: price,
            subscription_plan: plan,
            joined_members: BTreeSet::new(),
        }
    }

    fn profile(plan: Option<PlanValue>) -> MemberProfile {
        MemberProfile {
            subscription_plan: plan,
            ..MemberProfile::unknown("b@x.com")
        }
    }

    #[test]
    fn test_mess_plan_takes_precedence() {
        let synthesizer = DuesSynthesizer::new();
        let mess = mess(100.0, Some(PlanValue::Number(20.0)));
        let member = profile(Some(PlanValue::Text("Bimonthly".to_string())));

        assert_eq!(synthesizer.synthesize_default("b@x.com", &mess, Some(&member)), 2000.0);
    }

    #[test]
    fn test_member_plan_used_when_mess_has_none() {
        let synthesizer = DuesSynthesizer::new();
        let mess = mess(100.0, None);
        let member = profile(Some(PlanValue::Text("Bimonthly".to_string())));

        assert_eq!(synthesizer.synthesize_default("b@x.com", &mess, Some(&member)), 6000.0);
    }

    #[test]
    fn test_zero_mess_plan_counts_as_unset() {
        let synthesizer = DuesSynthesizer::new();
        let mess = mess(100.0, Some(PlanValue::Number(0.0)));
        let member = profile(Some(PlanValue::Number(10.0)));

        assert_eq!(synthesizer.synthesize_default("b@x.com", &mess, Some(&member)), 1000.0);
    }

    #[test]
    fn test_mess_plan_is_set() {
        assert!(mess_plan_is_set(&mess(100.0, Some(PlanValue::Number(30.0)))));
        assert!(mess_plan_is_set(&mess(100.0, Some(PlanValue::Text("Monthly".to_string())))));
        assert!(!mess_plan_is_set(&mess(100.0, None)));
        assert!(!mess_plan_is_set(&mess(100.0, Some(PlanValue::Number(0.0)))));
        assert!(!mess_plan_is_set(&mess(100.0, Some(PlanValue::Number(f64::NAN)))));
        assert!(!mess_plan_is_set(&mess(100.0, Some(PlanValue::Text("  ".to_string())))));
    }

    #[test]
    fn test_no_plan_anywhere_defaults_to_monthly() {
        let synthesizer = DuesSynthesizer::new();
        let mess = mess(80.0, None);

        assert_eq!(synthesizer.synthesize_default("b@x.com", &mess, None), 2400.0);
        assert_eq!(synthesizer.synthesize_default("b@x.com", &mess, Some(&profile(None))), 2400.0);
    }

    #[test]
    fn test_never_negative() {
        let synthesizer = DuesSynthesizer::new();
        let mess = mess(-50.0, Some(PlanValue::Number(-3.0)));

        assert_eq!(synthesizer.synthesize_default("b@x.com", &mess, None), 0.0);
    }

    #[test]
    fn test_plan_label_follows_precedence() {
        let synthesizer = DuesSynthesizer::new();
        let member = profile(Some(PlanValue::Text(" Bimonthly ".to_string())));

        assert_eq!(synthesizer.plan_label(&mess(100.0, Some(PlanValue::Number(30.0))), Some(&member)), "Monthly");
        assert_eq!(synthesizer.plan_label(&mess(100.0, None), Some(&member)), "Bimonthly");
        assert_eq!(synthesizer.plan_label(&mess(100.0, None), None), "Monthly");
    }
}
