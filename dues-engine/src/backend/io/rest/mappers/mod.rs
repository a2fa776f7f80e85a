//! Mappers from backend JSON to domain models.
//!
//! The backend is loose about types (numbers arrive as strings, lists as
//! `null`), so mappers work field by field and report what they patched up
//! as [`DataIssue`](crate::backend::domain::models::DataIssue)s.

pub mod member_mapper;
pub mod mess_mapper;
pub mod payment_mapper;

pub use member_mapper::MemberMapper;
pub use mess_mapper::MessMapper;
pub use payment_mapper::PaymentMapper;

use serde_json::Value;

use crate::backend::domain::models::PlanValue;

/// Read a finite number from a JSON number or a numeric string
pub(crate) fn coerce_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64().filter(|n| n.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// A non-blank string, trimmed
pub(crate) fn coerce_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Plan values keep their textual or numeric form, anything else is absent.
///
/// Returns `Err` with a description when a value was present but unusable.
pub(crate) fn coerce_plan(value: Option<&Value>) -> Result<Option<PlanValue>, String> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => match n.as_f64().filter(|n| n.is_finite()) {
            Some(n) => Ok(Some(PlanValue::Number(n))),
            None => Err(format!("subscription plan {} is not a finite number", n)),
        },
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(PlanValue::Text(s.clone()))),
        Some(other) => Err(format!("subscription plan has unexpected shape {}", other)),
    }
}
