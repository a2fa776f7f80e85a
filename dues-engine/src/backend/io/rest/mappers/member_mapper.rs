use serde_json::Value;
use tracing::debug;

use super::payment_mapper::parse_payment_date;
use super::{coerce_plan, coerce_text};
use crate::backend::domain::models::{MemberProfile, UNKNOWN_MEMBER_NAME};

pub struct MemberMapper;

impl MemberMapper {
    /// Map a `/byEmail` response. `None` when the response is not a profile.
    ///
    /// Profiles are only used for display names and as a plan fallback, so
    /// bad fields are dropped quietly instead of being reported.
    pub fn to_domain(value: &Value, member_email: &str) -> Option<MemberProfile> {
        let object = value.as_object()?;

        let subscription_plan = coerce_plan(object.get("subscriptionPlan")).unwrap_or_else(|detail| {
            debug!("Ignoring plan of {}: {}", member_email, detail);
            None
        });

        let join_date = match object.get("joinDate") {
            Some(Value::String(date)) if !date.trim().is_empty() => Some(date.trim().to_string()),
            Some(raw @ Value::Array(_)) => {
                parse_payment_date(raw).map(|date| date.date_naive().to_string())
            }
            _ => None,
        };

        Some(MemberProfile {
            email: coerce_text(object.get("email")).unwrap_or_else(|| member_email.to_string()),
            name: coerce_text(object.get("name")).unwrap_or_else(|| UNKNOWN_MEMBER_NAME.to_string()),
            subscription_plan,
            food_type: coerce_text(object.get("foodType")),
            join_date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::domain::models::PlanValue;
    use serde_json::json;

    #[test]
    fn test_profile_fields() {
        let profile = MemberMapper::to_domain(
            &json!({
                "email": "a@x.com",
                "name": "Asha",
                "subscriptionPlan": "Bimonthly",
                "foodType": "Veg",
                "joinDate": [2025, 2, 1]
            }),
            "a@x.com",
        )
        .unwrap();

        assert_eq!(profile.name, "Asha");
        assert_eq!(profile.subscription_plan, Some(PlanValue::Text("Bimonthly".to_string())));
        assert_eq!(profile.food_type.as_deref(), Some("Veg"));
        assert_eq!(profile.join_date.as_deref(), Some("2025-02-01"));
    }

    #[test]
    fn test_missing_name_falls_back_to_unknown() {
        let profile = MemberMapper::to_domain(&json!({"subscriptionPlan": [1]}), "a@x.com").unwrap();
        assert_eq!(profile.name, UNKNOWN_MEMBER_NAME);
        assert_eq!(profile.email, "a@x.com");
        assert_eq!(profile.subscription_plan, None);
    }

    #[test]
    fn test_non_object_is_not_a_profile() {
        assert_eq!(MemberMapper::to_domain(&Value::Null, "a@x.com"), None);
        assert_eq!(MemberMapper::to_domain(&json!("Asha"), "a@x.com"), None);
    }
}
