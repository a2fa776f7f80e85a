//! In-memory mess data.
//!
//! Holds raw backend-shaped JSON and runs it through the same mappers as the
//! HTTP source, so malformed data behaves identically. Endpoints can be made
//! to fail to simulate an unreachable backend.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};
use shared::RecordPaymentRequest;
use tracing::debug;

use super::traits::MessDataSource;
use crate::backend::domain::errors::DuesError;
use crate::backend::domain::models::{Coerced, MemberProfile, MessConfig, MessRef, PaymentRecord};
use crate::backend::io::rest::fetcher::{FetchError, TransportError};
use crate::backend::io::rest::mappers::{MemberMapper, MessMapper, PaymentMapper};

/// Backend operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Endpoint {
    Mess,
    MessPayments,
    MemberPayments,
    MemberProfile,
    PendingDues,
    RecordPayment,
}

impl Endpoint {
    pub fn description(&self) -> &'static str {
        match self {
            Endpoint::Mess => "mess roster",
            Endpoint::MessPayments => "payment list",
            Endpoint::MemberPayments => "member payments",
            Endpoint::MemberProfile => "member profile",
            Endpoint::PendingDues => "pending dues",
            Endpoint::RecordPayment => "payment recording",
        }
    }
}

#[derive(Default)]
struct State {
    messes_by_id: BTreeMap<String, Value>,
    messes_by_owner: BTreeMap<String, Value>,
    payments_by_mess: BTreeMap<String, Value>,
    profiles: BTreeMap<String, Value>,
    pending_dues: BTreeMap<(String, String), Value>,
    failing: BTreeSet<Endpoint>,
    recorded: Vec<RecordPaymentRequest>,
}

#[derive(Default)]
pub struct InMemoryMessSource {
    state: Mutex<State>,
    payments_delay: Option<Duration>,
}

impl InMemoryMessSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mess response. It is found by its `id` and its owner `email`.
    pub fn with_mess(self, mess: Value) -> Self {
        {
            let mut state = self.lock();
            if let Some(id) = mess.get("id").and_then(Value::as_str) {
                state.messes_by_id.insert(id.to_string(), mess.clone());
            }
            if let Some(email) = mess.get("email").and_then(Value::as_str) {
                state.messes_by_owner.insert(email.to_string(), mess.clone());
            }
        }
        self
    }

    /// Register a raw mess response under an id, whatever its shape
    pub fn with_raw_mess(self, mess_id: &str, response: Value) -> Self {
        self.lock().messes_by_id.insert(mess_id.to_string(), response);
        self
    }

    /// Set the payment list response of a mess
    pub fn with_payments(self, mess_id: &str, payments: Value) -> Self {
        self.lock().payments_by_mess.insert(mess_id.to_string(), payments);
        self
    }

    pub fn with_profile(self, member_email: &str, profile: Value) -> Self {
        self.lock().profiles.insert(member_email.to_string(), profile);
        self
    }

    pub fn with_pending_dues(self, member_email: &str, mess_id: &str, response: Value) -> Self {
        self.lock()
            .pending_dues
            .insert((member_email.to_string(), mess_id.to_string()), response);
        self
    }

    /// Delay every payment list response, to overlap reconciliation passes
    pub fn with_payments_delay(mut self, delay: Duration) -> Self {
        self.payments_delay = Some(delay);
        self
    }

    pub fn failing(self, endpoint: Endpoint) -> Self {
        self.set_failing(endpoint, true);
        self
    }

    pub fn set_failing(&self, endpoint: Endpoint, failing: bool) {
        let mut state = self.lock();
        if failing {
            state.failing.insert(endpoint);
        } else {
            state.failing.remove(&endpoint);
        }
    }

    /// Payment requests received so far, oldest first
    pub fn recorded_payments(&self) -> Vec<RecordPaymentRequest> {
        self.lock().recorded.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check(&self, endpoint: Endpoint) -> Result<(), FetchError> {
        if self.lock().failing.contains(&endpoint) {
            debug!("In-memory source failing {}", endpoint.description());
            return Err(FetchError::Exhausted {
                label: endpoint.description().to_string(),
                attempts: 1,
                last_error: TransportError::Status {
                    status: 503,
                    body: "unavailable".to_string(),
                },
            });
        }
        Ok(())
    }

    fn guard(&self, endpoint: Endpoint) -> Result<(), DuesError> {
        self.check(endpoint)
            .map_err(|e| DuesError::upstream(endpoint.description(), e))
    }
}

#[async_trait]
impl MessDataSource for InMemoryMessSource {
    async fn fetch_mess(&self, mess: &MessRef) -> Result<Coerced<MessConfig>, DuesError> {
        self.guard(Endpoint::Mess)?;
        let response = {
            let state = self.lock();
            match mess {
                MessRef::Id(id) => state.messes_by_id.get(id).cloned(),
                MessRef::OwnerEmail(email) => state.messes_by_owner.get(email).cloned(),
            }
        };
        MessMapper::to_domain(response.unwrap_or(Value::Null), mess)
    }

    async fn fetch_mess_payments(&self, mess_id: &str) -> Result<Coerced<Vec<PaymentRecord>>, DuesError> {
        if let Some(delay) = self.payments_delay {
            tokio::time::sleep(delay).await;
        }
        self.guard(Endpoint::MessPayments)?;
        let response = self
            .lock()
            .payments_by_mess
            .get(mess_id)
            .cloned()
            .unwrap_or_else(|| json!([]));
        Ok(PaymentMapper::list_to_domain(
            response,
            &format!("payments of mess {}", mess_id),
            mess_id,
        ))
    }

    async fn fetch_member_payments(
        &self,
        member_email: &str,
        mess_id: &str,
    ) -> Result<Coerced<Vec<PaymentRecord>>, DuesError> {
        self.guard(Endpoint::MemberPayments)?;
        let response = self
            .lock()
            .payments_by_mess
            .get(mess_id)
            .cloned()
            .unwrap_or_else(|| json!([]));
        Ok(PaymentMapper::list_to_domain(
            response,
            &format!("payments of {} in mess {}", member_email, mess_id),
            mess_id,
        )
        .map(|records| {
            records
                .into_iter()
                .filter(|record| record.member_email == member_email)
                .collect()
        }))
    }

    async fn fetch_member_profile(&self, member_email: &str) -> Result<Option<MemberProfile>, DuesError> {
        self.guard(Endpoint::MemberProfile)?;
        Ok(self
            .lock()
            .profiles
            .get(member_email)
            .and_then(|profile| MemberMapper::to_domain(profile, member_email)))
    }

    async fn fetch_pending_dues(&self, member_email: &str, mess_id: &str) -> Result<Option<f64>, DuesError> {
        self.guard(Endpoint::PendingDues)?;
        Ok(self
            .lock()
            .pending_dues
            .get(&(member_email.to_string(), mess_id.to_string()))
            .and_then(PaymentMapper::pending_dues))
    }

    async fn record_payment(&self, request: &RecordPaymentRequest) -> Result<Option<PaymentRecord>, DuesError> {
        self.check(Endpoint::RecordPayment)
            .map_err(DuesError::PaymentNotRecorded)?;

        let mut state = self.lock();
        state.recorded.push(request.clone());
        let stored = json!({
            "id": format!("mem-{}", state.recorded.len()),
            "userEmail": request.user_email,
            "ownerEmail": request.owner_email,
            "messId": request.mess_id,
            "totalDues": request.amount_paid + request.remaining_dues,
            "amountPaid": request.amount_paid,
            "remainingDues": request.remaining_dues,
            "paymentDate": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            "status": "COMPLETED"
        });

        let list = state
            .payments_by_mess
            .entry(request.mess_id.clone())
            .or_insert_with(|| json!([]));
        if let Value::Array(entries) = list {
            entries.push(stored.clone());
        }

        Ok(PaymentMapper::to_domain(&stored, "recorded payment", &request.mess_id).map(|c| c.value))
    }
}
