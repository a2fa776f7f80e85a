//! Domain model for a member's profile as far as dues are concerned.
use serde::{Deserialize, Serialize};

use super::mess::PlanValue;

pub const UNKNOWN_MEMBER_NAME: &str = "Unknown User";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberProfile {
    pub email: String,
    pub name: String,
    /// Plan chosen when joining, used when the mess has no plan configured
    pub subscription_plan: Option<PlanValue>,
    pub food_type: Option<String>,
    pub join_date: Option<String>,
}

impl MemberProfile {
    /// Placeholder profile for a member whose details could not be loaded
    pub fn unknown(email: &str) -> Self {
        Self {
            email: email.to_string(),
            name: UNKNOWN_MEMBER_NAME.to_string(),
            subscription_plan: None,
            food_type: None,
            join_date: None,
        }
    }
}
