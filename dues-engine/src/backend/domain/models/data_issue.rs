//! Malformed-input bookkeeping.
//!
//! Mappers never fail a response because of one bad field. Instead they
//! coerce to a safe default and record a [`DataIssue`], which later marks the
//! financial summary as partial.
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataIssue {
    /// Which response the issue was found in, e.g. "payments" or "mess m1"
    pub origin: String,
    pub detail: String,
}

impl DataIssue {
    pub fn new(origin: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for DataIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.origin, self.detail)
    }
}

/// A value coerced from a backend response, with whatever had to be patched up
#[derive(Debug, Clone, PartialEq)]
pub struct Coerced<T> {
    pub value: T,
    pub issues: Vec<DataIssue>,
}

impl<T> Coerced<T> {
    pub fn with_issues(value: T, issues: Vec<DataIssue>) -> Self {
        Self { value, issues }
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Coerced<U> {
        Coerced {
            value: f(self.value),
            issues: self.issues,
        }
    }
}
