//! Domain model for a mess and its subscription terms.
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A subscription plan value as configured by an owner or chosen by a member.
///
/// Numbers are overloaded: up to 100 they count days, above 100 they are a
/// total amount. Text comes from the join flow ("Monthly", "Bimonthly") or
/// from a backend that stringifies numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlanValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for PlanValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanValue::Number(n) => write!(f, "{}", n),
            PlanValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// How a mess is looked up on the backend
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessRef {
    Id(String),
    OwnerEmail(String),
}

impl fmt::Display for MessRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessRef::Id(id) => write!(f, "mess {}", id),
            MessRef::OwnerEmail(email) => write!(f, "mess owned by {}", email),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessConfig {
    pub id: String,
    pub name: Option<String>,
    pub owner_email: Option<String>,
    pub price_per_meal: f64,
    pub subscription_plan: Option<PlanValue>,
    /// Ground truth for membership, independent of payment history
    pub joined_members: BTreeSet<String>,
}

impl MessConfig {
    pub fn is_member(&self, email: &str) -> bool {
        self.joined_members.contains(email)
    }
}
