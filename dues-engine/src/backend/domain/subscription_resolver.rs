//! Subscription amount resolution.
//!
//! A mess's `subscriptionPlan` is a single number that means two different
//! things: up to [`FIXED_AMOUNT_THRESHOLD`] it is a number of days to be
//! multiplied by the per-meal price, above it the owner already entered the
//! total amount. Member profiles add textual plans from the join flow.
//!
//! Rule order, first match wins:
//! 1. absent plan: monthly (30 days)
//! 2. number above the threshold: taken as the amount
//! 3. number at or below the threshold: days x price
//! 4. text containing "monthly" (but not "bimonthly"): 30 days
//! 5. text containing "bimonthly": 60 days
//! 6. numeric text: rules 2 and 3 on the parsed number
//! 7. anything else: monthly
//!
//! Resolution never fails and never yields a negative or NaN amount.

use tracing::debug;

use crate::backend::domain::models::PlanValue;

/// Plans above this value are amounts, at or below it they are day counts
pub const FIXED_AMOUNT_THRESHOLD: f64 = 100.0;
pub const MONTHLY_DAYS: f64 = 30.0;
pub const BIMONTHLY_DAYS: f64 = 60.0;

/// What a plan value was understood as
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlanInterpretation {
    /// Number of days to be charged at the per-meal price
    Days(f64),
    /// Pre-computed total amount, the price is ignored
    FixedAmount(f64),
}

impl PlanInterpretation {
    pub fn amount(&self, price_per_meal: f64) -> f64 {
        let price = sanitize_price(price_per_meal);
        let raw = match *self {
            PlanInterpretation::Days(days) => days * price,
            PlanInterpretation::FixedAmount(amount) => amount,
        };
        non_negative(raw)
    }

    /// Short label for member lists
    pub fn label(&self) -> String {
        match *self {
            PlanInterpretation::Days(days) if days == MONTHLY_DAYS => "Monthly".to_string(),
            PlanInterpretation::Days(days) if days == BIMONTHLY_DAYS => "Bimonthly".to_string(),
            PlanInterpretation::Days(days) => format!("{} days", days),
            PlanInterpretation::FixedAmount(amount) => format!("Fixed {:.2}", amount),
        }
    }
}

/// Interpret a plan value without applying a price
pub fn interpret_plan(plan: Option<&PlanValue>) -> PlanInterpretation {
    match plan {
        None => PlanInterpretation::Days(MONTHLY_DAYS),
        Some(PlanValue::Number(n)) => interpret_number(*n),
        Some(PlanValue::Text(text)) => interpret_text(text),
    }
}

/// Resolve a plan value and a per-meal price to a currency amount
pub fn resolve_amount(plan: Option<&PlanValue>, price_per_meal: f64) -> f64 {
    let interpretation = interpret_plan(plan);
    let amount = interpretation.amount(price_per_meal);
    debug!(
        "Resolved plan {:?} at price {:.2} as {:?} = {:.2}",
        plan, price_per_meal, interpretation, amount
    );
    amount
}

fn interpret_number(value: f64) -> PlanInterpretation {
    if !value.is_finite() {
        return PlanInterpretation::Days(MONTHLY_DAYS);
    }
    if value > FIXED_AMOUNT_THRESHOLD {
        PlanInterpretation::FixedAmount(value)
    } else {
        PlanInterpretation::Days(value)
    }
}

fn interpret_text(text: &str) -> PlanInterpretation {
    let normalized = text.trim().to_lowercase();
    if normalized.is_empty() {
        return PlanInterpretation::Days(MONTHLY_DAYS);
    }
    if normalized.contains("bimonthly") {
        return PlanInterpretation::Days(BIMONTHLY_DAYS);
    }
    if normalized.contains("monthly") {
        return PlanInterpretation::Days(MONTHLY_DAYS);
    }
    match normalized.parse::<f64>() {
        Ok(n) if n.is_finite() => interpret_number(n),
        _ => PlanInterpretation::Days(MONTHLY_DAYS),
    }
}

fn sanitize_price(price: f64) -> f64 {
    if price.is_finite() && price > 0.0 {
        price
    } else {
        0.0
    }
}

fn non_negative(amount: f64) -> f64 {
    if amount.is_finite() && amount > 0.0 {
        amount
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn text(s: &str) -> Option<PlanValue> {
        Some(PlanValue::Text(s.to_string()))
    }

    fn num(n: f64) -> Option<PlanValue> {
        Some(PlanValue::Number(n))
    }

    #[test]
    fn test_absent_plan_defaults_to_monthly() {
        assert_eq!(resolve_amount(None, 100.0), 3000.0);
    }

    #[test]
    fn test_large_number_is_fixed_amount() {
        assert_eq!(resolve_amount(num(150.0).as_ref(), 100.0), 150.0);
        assert_eq!(resolve_amount(num(150.0).as_ref(), 0.0), 150.0);
        assert_eq!(resolve_amount(num(150.0).as_ref(), 7.5), 150.0);
    }

    #[test]
    fn test_small_number_is_day_count() {
        assert_eq!(resolve_amount(num(20.0).as_ref(), 100.0), 2000.0);
        // The threshold itself still counts as days
        assert_eq!(resolve_amount(num(100.0).as_ref(), 10.0), 1000.0);
    }

    #[test]
    fn test_textual_plans() {
        assert_eq!(resolve_amount(text("bimonthly").as_ref(), 100.0), 6000.0);
        assert_eq!(resolve_amount(text("Bimonthly").as_ref(), 100.0), 6000.0);
        assert_eq!(resolve_amount(text("monthly").as_ref(), 100.0), 3000.0);
        assert_eq!(resolve_amount(text("MONTHLY plan").as_ref(), 100.0), 3000.0);
        assert_eq!(resolve_amount(text("garbage").as_ref(), 100.0), 3000.0);
    }

    #[test]
    fn test_numeric_strings_follow_number_rules() {
        assert_eq!(resolve_amount(text("45").as_ref(), 100.0), 4500.0);
        assert_eq!(resolve_amount(text(" 2500 ").as_ref(), 100.0), 2500.0);
    }

    #[test]
    fn test_degenerate_inputs_never_go_negative() {
        assert_eq!(resolve_amount(num(-5.0).as_ref(), 100.0), 0.0);
        assert_eq!(resolve_amount(num(f64::NAN).as_ref(), 100.0), 3000.0);
        assert_eq!(resolve_amount(text("inf").as_ref(), 100.0), 3000.0);
        assert_eq!(resolve_amount(text("NaN").as_ref(), 100.0), 3000.0);
        assert_eq!(resolve_amount(text("   ").as_ref(), 100.0), 3000.0);
        assert_eq!(resolve_amount(None, -10.0), 0.0);
        assert_eq!(resolve_amount(None, f64::NAN), 0.0);
    }

    #[test]
    fn test_plan_labels() {
        assert_eq!(interpret_plan(None).label(), "Monthly");
        assert_eq!(interpret_plan(text("bimonthly").as_ref()).label(), "Bimonthly");
        assert_eq!(interpret_plan(num(12.0).as_ref()).label(), "12 days");
        assert_eq!(interpret_plan(num(2500.0).as_ref()).label(), "Fixed 2500.00");
    }

    fn arb_plan() -> impl Strategy<Value = Option<PlanValue>> {
        prop_oneof![
            Just(None),
            any::<f64>().prop_map(|n| Some(PlanValue::Number(n))),
            (-1.0e6..1.0e6f64).prop_map(|n| Some(PlanValue::Number(n))),
            ".{0,20}".prop_map(|s| Some(PlanValue::Text(s))),
            r"-?[0-9]{1,5}(\.[0-9]{1,2})?".prop_map(|s| Some(PlanValue::Text(s))),
        ]
    }

    proptest! {
        #[test]
        fn resolved_amount_is_never_negative_or_nan(
            plan in arb_plan(),
            price in prop_oneof![any::<f64>(), 0.0..10_000.0f64],
        ) {
            let amount = resolve_amount(plan.as_ref(), price);
            prop_assert!(!amount.is_nan());
            prop_assert!(amount >= 0.0);
        }
    }
}
