use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use shared::{PaymentHistoryEntry, PaymentStatus};

use super::mess_mapper::shape_of;
use super::{coerce_number, coerce_text};
use crate::backend::domain::models::{Coerced, DataIssue, PaymentRecord};

/// Naive formats the backend has been seen to send, interpreted as UTC
const NAIVE_DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

pub struct PaymentMapper;

impl PaymentMapper {
    /// Map a payment list response.
    ///
    /// Anything other than an array is treated as an empty list. Records that
    /// cannot be attributed to a member are dropped, everything else is
    /// coerced. `mess_id` fills in records that do not name their mess.
    pub fn list_to_domain(value: Value, origin: &str, mess_id: &str) -> Coerced<Vec<PaymentRecord>> {
        let entries = match value {
            Value::Array(entries) => entries,
            other => {
                return Coerced::with_issues(
                    Vec::new(),
                    vec![DataIssue::new(
                        origin,
                        format!("expected a list of payments, got {}", shape_of(&other)),
                    )],
                )
            }
        };

        let mut records = Vec::with_capacity(entries.len());
        let mut issues = Vec::new();
        for (index, entry) in entries.into_iter().enumerate() {
            let entry_origin = format!("{}[{}]", origin, index);
            match Self::to_domain(&entry, &entry_origin, mess_id) {
                Some(coerced) => {
                    issues.extend(coerced.issues);
                    records.push(coerced.value);
                }
                None => issues.push(DataIssue::new(
                    entry_origin,
                    "payment has no member email, skipped",
                )),
            }
        }
        Coerced::with_issues(records, issues)
    }

    /// Map one payment object. `None` when it cannot be attributed to a member.
    pub fn to_domain(value: &Value, origin: &str, mess_id: &str) -> Option<Coerced<PaymentRecord>> {
        let object = value.as_object()?;
        let member_email = coerce_text(field(object, "userEmail", "memberEmail"))?;
        let mut issues = Vec::new();

        let amount_paid = match coerce_number(object.get("amountPaid")) {
            Some(amount) if amount >= 0.0 => amount,
            Some(amount) => {
                issues.push(DataIssue::new(origin, format!("negative amountPaid {} treated as 0", amount)));
                0.0
            }
            None => {
                issues.push(DataIssue::new(origin, "amountPaid missing or not numeric, using 0"));
                0.0
            }
        };

        let total_due = coerce_number(field(object, "totalDues", "totalDue"));
        let remaining_due = match coerce_number(field(object, "remainingDues", "remainingDue")) {
            Some(remaining) if remaining >= 0.0 => remaining,
            Some(remaining) => {
                issues.push(DataIssue::new(
                    origin,
                    format!("negative remaining due {} clamped to 0", remaining),
                ));
                0.0
            }
            None => {
                let derived = total_due.map(|total| (total - amount_paid).max(0.0)).unwrap_or(0.0);
                issues.push(DataIssue::new(
                    origin,
                    format!("remaining due missing or not numeric, using {:.2}", derived),
                ));
                derived
            }
        };

        let payment_date = match object.get("paymentDate") {
            Some(raw) if !raw.is_null() => {
                let parsed = parse_payment_date(raw);
                if parsed.is_none() {
                    issues.push(DataIssue::new(origin, format!("unparseable paymentDate {}", raw)));
                }
                parsed
            }
            _ => {
                issues.push(DataIssue::new(origin, "paymentDate missing"));
                None
            }
        };

        let id = coerce_text(object.get("id")).unwrap_or_else(|| {
            issues.push(DataIssue::new(origin, "payment has no id"));
            format!("{}#{}", member_email, origin)
        });

        Some(Coerced::with_issues(
            PaymentRecord {
                id,
                member_email,
                owner_email: coerce_text(object.get("ownerEmail")).unwrap_or_default(),
                mess_id: coerce_text(object.get("messId")).unwrap_or_else(|| mess_id.to_string()),
                total_due: total_due.unwrap_or(amount_paid + remaining_due),
                amount_paid,
                remaining_due,
                payment_date,
                status: coerce_text(object.get("status")),
            },
            issues,
        ))
    }

    /// Read the `pendingDues` of a pending dues response.
    ///
    /// `None` when the response has no usable figure, so callers can fall
    /// back to the ledger.
    pub fn pending_dues(value: &Value) -> Option<f64> {
        let raw = match value {
            Value::Object(object) => object.get("pendingDues"),
            bare @ (Value::Number(_) | Value::String(_)) => Some(bare),
            _ => None,
        };
        coerce_number(raw).filter(|dues| *dues >= 0.0)
    }

    pub fn to_history_entry(record: PaymentRecord, member_name: String) -> PaymentHistoryEntry {
        let status = if record.is_settled() {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Pending
        };
        PaymentHistoryEntry {
            id: record.id,
            member_email: record.member_email,
            member_name,
            amount_paid: record.amount_paid,
            remaining_due: record.remaining_due,
            payment_date: record
                .payment_date
                .map(|date| date.to_rfc3339_opts(SecondsFormat::Secs, true)),
            status,
        }
    }
}

fn field<'a>(object: &'a Map<String, Value>, name: &str, alias: &str) -> Option<&'a Value> {
    object.get(name).filter(|v| !v.is_null()).or_else(|| object.get(alias))
}

/// Parse the date forms the backend produces.
///
/// Accepts RFC 3339, ISO date-times without an offset (taken as UTC), bare
/// ISO dates, epoch milliseconds, and Jackson's `[y, m, d, h, min, s, nanos]`
/// array form of a `LocalDateTime`.
pub fn parse_payment_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => parse_date_text(text.trim()),
        Value::Number(millis) => millis.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
        Value::Array(parts) => parse_date_parts(parts),
        _ => None,
    }
}

fn parse_date_text(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Some(date.with_timezone(&Utc));
    }
    for format in NAIVE_DATE_TIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn parse_date_parts(parts: &[Value]) -> Option<DateTime<Utc>> {
    let numbers: Option<Vec<i64>> = parts.iter().map(Value::as_i64).collect();
    let numbers = numbers?;
    if numbers.len() < 3 {
        return None;
    }
    let part = |index: usize| -> Option<u32> {
        numbers.get(index).map_or(Some(0), |n| u32::try_from(*n).ok())
    };
    let date = NaiveDate::from_ymd_opt(i32::try_from(numbers[0]).ok()?, part(1)?, part(2)?)?;
    date.and_hms_nano_opt(part(3)?, part(4)?, part(5)?, part(6)?)
        .map(|naive| naive.and_utc())
}
