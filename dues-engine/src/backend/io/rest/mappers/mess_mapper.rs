use std::collections::BTreeSet;

use serde_json::Value;

use super::{coerce_number, coerce_plan, coerce_text};
use crate::backend::domain::errors::DuesError;
use crate::backend::domain::models::{Coerced, DataIssue, MessConfig, MessRef};

pub struct MessMapper;

impl MessMapper {
    /// Map a mess response to a [`MessConfig`].
    ///
    /// A response that is not a JSON object, or that carries no mess id, is
    /// not a roster at all and fails with [`DuesError::MalformedMess`]. Bad
    /// fields inside a usable object are coerced and reported.
    pub fn to_domain(value: Value, requested: &MessRef) -> Result<Coerced<MessConfig>, DuesError> {
        let object = match value {
            Value::Object(object) => object,
            other => {
                return Err(DuesError::MalformedMess {
                    mess: requested.to_string(),
                    detail: format!("expected an object, got {}", shape_of(&other)),
                })
            }
        };

        let origin = requested.to_string();
        let mut issues = Vec::new();

        let id = coerce_text(object.get("id"))
            .or_else(|| match requested {
                MessRef::Id(id) => Some(id.clone()),
                MessRef::OwnerEmail(_) => None,
            })
            .ok_or_else(|| DuesError::MalformedMess {
                mess: requested.to_string(),
                detail: "response has no mess id".to_string(),
            })?;

        let price_per_meal = match coerce_number(object.get("pricePerMeal")) {
            Some(price) => price,
            None => {
                issues.push(DataIssue::new(&origin, "pricePerMeal missing or not numeric, using 0"));
                0.0
            }
        };

        let subscription_plan = coerce_plan(object.get("subscriptionPlan")).unwrap_or_else(|detail| {
            issues.push(DataIssue::new(&origin, detail));
            None
        });

        let joined_members = Self::joined_members(object.get("joinedUsers"), &origin, &mut issues);

        let owner_email = coerce_text(object.get("email")).or_else(|| match requested {
            MessRef::OwnerEmail(email) => Some(email.clone()),
            MessRef::Id(_) => None,
        });

        Ok(Coerced::with_issues(
            MessConfig {
                id,
                name: coerce_text(object.get("messName")),
                owner_email,
                price_per_meal,
                subscription_plan,
                joined_members,
            },
            issues,
        ))
    }

    fn joined_members(value: Option<&Value>, origin: &str, issues: &mut Vec<DataIssue>) -> BTreeSet<String> {
        let entries = match value {
            Some(Value::Array(entries)) => entries,
            None | Some(Value::Null) => {
                issues.push(DataIssue::new(origin, "joinedUsers missing, treating the mess as empty"));
                return BTreeSet::new();
            }
            Some(other) => {
                issues.push(DataIssue::new(
                    origin,
                    format!("joinedUsers is {}, not a list", shape_of(other)),
                ));
                return BTreeSet::new();
            }
        };

        let mut members = BTreeSet::new();
        for (index, entry) in entries.iter().enumerate() {
            match entry {
                Value::String(email) if !email.trim().is_empty() => {
                    members.insert(email.trim().to_string());
                }
                other => issues.push(DataIssue::new(
                    origin,
                    format!("joinedUsers[{}] is not a member email: {}", index, other),
                )),
            }
        }
        members
    }
}

pub(crate) fn shape_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
