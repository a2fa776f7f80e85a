//! Member-facing dues lookups, payment recording and the owner's payment history.
//!
//! ## Pending dues of one member
//!
//! 1. the backend's own pending dues figure, when it reports a usable one
//! 2. otherwise the remaining due of the member's latest payment
//! 3. otherwise the synthesized default for a joined member
//!
//! ## Recording a payment
//!
//! The amount must be positive and may not exceed what the member owes. The
//! remaining due sent to the backend is `max(0, total dues - amount)`.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use shared::{
    DuesSource, MemberPendingDues, PaymentFilter, PaymentHistory, PaymentHistoryEntry, RecordPaymentRequest,
};
use tracing::{debug, info, warn};

use crate::backend::domain::commands::payments::{RecordPaymentCommand, RecordPaymentResult};
use crate::backend::domain::dues_synthesizer::DuesSynthesizer;
use crate::backend::domain::errors::{DuesError, PaymentValidationError};
use crate::backend::domain::ledger_service::compare_recency;
use crate::backend::domain::models::{MessRef, PaymentRecord, UNKNOWN_MEMBER_NAME};
use crate::backend::io::rest::mappers::PaymentMapper;
use crate::backend::storage::MessDataSource;

#[derive(Clone)]
pub struct PaymentService {
    source: Arc<dyn MessDataSource>,
    synthesizer: DuesSynthesizer,
}

impl PaymentService {
    pub fn new(source: Arc<dyn MessDataSource>) -> Self {
        Self {
            source,
            synthesizer: DuesSynthesizer::new(),
        }
    }

    /// Current pending dues of `member_email` in a mess, tagged with where the figure came from
    pub async fn pending_dues_for_member(
        &self,
        member_email: &str,
        mess_ref: &MessRef,
    ) -> Result<MemberPendingDues, DuesError> {
        let mess = self.source.fetch_mess(mess_ref).await?;
        for issue in &mess.issues {
            debug!("Mess data issue: {}", issue);
        }
        let mess = mess.value;

        let dues = |pending_dues: f64, source: DuesSource| {
            info!(
                "Pending dues of {} in mess {}: {:.2} ({})",
                member_email, mess.id, pending_dues, source
            );
            MemberPendingDues {
                member_email: member_email.to_string(),
                mess_id: mess.id.clone(),
                pending_dues,
                source,
            }
        };

        match self.source.fetch_pending_dues(member_email, &mess.id).await {
            Ok(Some(pending)) => return Ok(dues(pending, DuesSource::BackendReported)),
            Ok(None) => debug!("Backend reported no usable pending dues for {}", member_email),
            Err(e) => warn!("Pending dues lookup for {} failed, using the ledger: {}", member_email, e),
        }

        let payments = self.source.fetch_member_payments(member_email, &mess.id).await?;
        let latest = payments
            .value
            .iter()
            .filter(|payment| payment.member_email == member_email)
            .max_by(|a, b| compare_recency(a, b));
        if let Some(latest) = latest {
            return Ok(dues(latest.remaining_due, DuesSource::FromLedger));
        }

        if !mess.is_member(member_email) {
            warn!("{} has no payments and has not joined mess {}", member_email, mess.id);
            return Ok(dues(0.0, DuesSource::SynthesizedDefault));
        }

        let profile = match self.source.fetch_member_profile(member_email).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!("Profile lookup for {} failed: {}", member_email, e);
                None
            }
        };
        let amount = self
            .synthesizer
            .synthesize_default(member_email, &mess, profile.as_ref());
        Ok(dues(amount, DuesSource::SynthesizedDefault))
    }

    pub fn validate_payment(command: &RecordPaymentCommand) -> Result<(), PaymentValidationError> {
        if command.member_email.trim().is_empty() {
            return Err(PaymentValidationError::MissingField("member_email"));
        }
        if command.owner_email.trim().is_empty() {
            return Err(PaymentValidationError::MissingField("owner_email"));
        }
        if command.mess_id.trim().is_empty() {
            return Err(PaymentValidationError::MissingField("mess_id"));
        }
        if !command.amount_paid.is_finite() || command.amount_paid <= 0.0 {
            return Err(PaymentValidationError::NonPositiveAmount);
        }
        let total_dues = sanitize_dues(command.total_dues);
        if command.amount_paid > total_dues {
            return Err(PaymentValidationError::ExceedsDues {
                amount: command.amount_paid,
                total_dues,
            });
        }
        Ok(())
    }

    /// Validate and record a payment
    pub async fn record_payment(&self, command: RecordPaymentCommand) -> Result<RecordPaymentResult, DuesError> {
        info!("Recording payment: {:?}", command);
        if let Err(e) = Self::validate_payment(&command) {
            warn!("Rejected payment from {}: {}", command.member_email, e);
            return Err(e.into());
        }

        let total_dues = sanitize_dues(command.total_dues);
        let request = RecordPaymentRequest {
            user_email: command.member_email.trim().to_string(),
            owner_email: command.owner_email.trim().to_string(),
            mess_id: command.mess_id.trim().to_string(),
            amount_paid: command.amount_paid,
            remaining_dues: (total_dues - command.amount_paid).max(0.0),
        };

        let result = match self.source.record_payment(&request).await? {
            Some(payment) => RecordPaymentResult {
                payment,
                confirmed_by_backend: true,
            },
            None => {
                warn!("Backend did not echo the recorded payment, using submitted values");
                let now = Utc::now();
                RecordPaymentResult {
                    payment: PaymentRecord {
                        id: format!("local-{}", now.timestamp_millis()),
                        member_email: request.user_email,
                        owner_email: request.owner_email,
                        mess_id: request.mess_id,
                        total_due: total_dues,
                        amount_paid: request.amount_paid,
                        remaining_due: request.remaining_dues,
                        payment_date: Some(now),
                        status: None,
                    },
                    confirmed_by_backend: false,
                }
            }
        };

        info!(
            "Recorded payment {} of {:.2}, {:.2} remaining",
            result.payment.id, result.payment.amount_paid, result.payment.remaining_due
        );
        Ok(result)
    }

    /// Every payment of a mess, newest first, with member names.
    ///
    /// Malformed payment data marks the history partial instead of failing it.
    pub async fn payment_history(
        &self,
        mess_ref: &MessRef,
        filter: PaymentFilter,
    ) -> Result<PaymentHistory, DuesError> {
        let mess = self.source.fetch_mess(mess_ref).await?.value;
        let payments = self.source.fetch_mess_payments(&mess.id).await?;
        for issue in &payments.issues {
            warn!("Payment history data issue: {}", issue);
        }

        let payers: BTreeSet<&str> = payments
            .value
            .iter()
            .map(|p| p.member_email.as_str())
            .collect();
        let lookups = payers
            .into_iter()
            .map(|email| async move { (email, self.source.fetch_member_profile(email).await) });
        let names: BTreeMap<&str, String> = join_all(lookups)
            .await
            .into_iter()
            .filter_map(|(email, result)| match result {
                Ok(Some(profile)) => Some((email, profile.name)),
                Ok(None) => None,
                Err(e) => {
                    debug!("No name for {}: {}", email, e);
                    None
                }
            })
            .collect();

        let mut records = payments.value.clone();
        records.sort_by(|a, b| compare_recency(b, a));

        let entries: Vec<PaymentHistoryEntry> = records
            .into_iter()
            .map(|record| {
                let name = names
                    .get(record.member_email.as_str())
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN_MEMBER_NAME.to_string());
                PaymentMapper::to_history_entry(record, name)
            })
            .filter(|entry| filter.matches(entry))
            .collect();

        let issues: Vec<String> = payments.issues.iter().map(|issue| issue.to_string()).collect();
        info!(
            "Payment history for mess {}: {} entries ({:?}), {} data issues",
            mess.id,
            entries.len(),
            filter,
            issues.len()
        );
        Ok(PaymentHistory {
            entries,
            is_partial: !issues.is_empty(),
            issues,
        })
    }
}

fn sanitize_dues(total_dues: f64) -> f64 {
    if total_dues.is_finite() && total_dues > 0.0 {
        total_dues
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::storage::in_memory::{Endpoint, InMemoryMessSource};
    use serde_json::json;
    use shared::PaymentStatus;

    fn mess_ref() -> MessRef {
        MessRef::Id("m1".to_string())
    }

    fn source() -> InMemoryMessSource {
        InMemoryMessSource::new()
            .with_mess(json!({
                "id": "m1",
                "email": "owner@mess.com",
                "pricePerMeal": 100,
                "joinedUsers": ["a@x.com", "b@x.com", "c@x.com"]
            }))
            .with_payments(
                "m1",
                json!([
                    {"id": "p1", "userEmail": "a@x.com", "amountPaid": 500, "remainingDues": 2500, "paymentDate": "2025-01-05T10:00:00"},
                    {"id": "p2", "userEmail": "a@x.com", "amountPaid": 2500, "remainingDues": 0, "paymentDate": "2025-02-01T10:00:00"},
                    {"id": "p3", "userEmail": "b@x.com", "amountPaid": 1000, "remainingDues": 2000, "paymentDate": "2025-01-20T10:00:00"}
                ]),
            )
            .with_profile("a@x.com", json!({"name": "Asha"}))
            .with_profile("c@x.com", json!({"name": "Chetan", "subscriptionPlan": "Bimonthly"}))
    }

    fn command(amount_paid: f64, total_dues: f64) -> RecordPaymentCommand {
        RecordPaymentCommand {
            member_email: "b@x.com".to_string(),
            owner_email: "owner@mess.com".to_string(),
            mess_id: "m1".to_string(),
            amount_paid,
            total_dues,
        }
    }

    #[tokio::test]
    async fn test_backend_figure_is_preferred() {
        let service = PaymentService::new(Arc::new(
            source().with_pending_dues("b@x.com", "m1", json!({"pendingDues": "1750"})),
        ));

        let dues = service.pending_dues_for_member("b@x.com", &mess_ref()).await.unwrap();
        assert_eq!(dues.pending_dues, 1750.0);
        assert_eq!(dues.source, DuesSource::BackendReported);
    }

    #[tokio::test]
    async fn test_falls_back_to_latest_payment() {
        let service = PaymentService::new(Arc::new(source().failing(Endpoint::PendingDues)));

        let dues = service.pending_dues_for_member("a@x.com", &mess_ref()).await.unwrap();
        assert_eq!(dues.pending_dues, 0.0);
        assert_eq!(dues.source, DuesSource::FromLedger);

        let dues = service.pending_dues_for_member("b@x.com", &mess_ref()).await.unwrap();
        assert_eq!(dues.pending_dues, 2000.0);
    }

    #[tokio::test]
    async fn test_unpaid_member_gets_synthesized_default() {
        let service = PaymentService::new(Arc::new(
            source().with_pending_dues("c@x.com", "m1", json!({"pendingDues": null})),
        ));

        let dues = service.pending_dues_for_member("c@x.com", &mess_ref()).await.unwrap();
        // No mess plan, so the member's bimonthly plan applies
        assert_eq!(dues.pending_dues, 6000.0);
        assert_eq!(dues.source, DuesSource::SynthesizedDefault);
    }

    #[tokio::test]
    async fn test_stranger_owes_nothing() {
        let service = PaymentService::new(Arc::new(source()));
        let dues = service.pending_dues_for_member("z@x.com", &mess_ref()).await.unwrap();
        assert_eq!(dues.pending_dues, 0.0);
    }

    #[tokio::test]
    async fn test_member_payment_failure_is_an_error() {
        let service = PaymentService::new(Arc::new(
            source().failing(Endpoint::PendingDues).failing(Endpoint::MemberPayments),
        ));
        let result = service.pending_dues_for_member("a@x.com", &mess_ref()).await;
        assert!(matches!(result, Err(DuesError::UpstreamUnavailable { .. })));
    }

    #[test]
    fn test_payment_validation() {
        assert_eq!(PaymentService::validate_payment(&command(500.0, 2000.0)), Ok(()));
        assert_eq!(PaymentService::validate_payment(&command(2000.0, 2000.0)), Ok(()));
        assert_eq!(
            PaymentService::validate_payment(&command(0.0, 2000.0)),
            Err(PaymentValidationError::NonPositiveAmount)
        );
        assert_eq!(
            PaymentService::validate_payment(&command(-10.0, 2000.0)),
            Err(PaymentValidationError::NonPositiveAmount)
        );
        assert_eq!(
            PaymentService::validate_payment(&command(f64::NAN, 2000.0)),
            Err(PaymentValidationError::NonPositiveAmount)
        );
        assert_eq!(
            PaymentService::validate_payment(&command(2500.0, 2000.0)),
            Err(PaymentValidationError::ExceedsDues {
                amount: 2500.0,
                total_dues: 2000.0
            })
        );

        let mut missing_owner = command(100.0, 2000.0);
        missing_owner.owner_email = " ".to_string();
        assert_eq!(
            PaymentService::validate_payment(&missing_owner),
            Err(PaymentValidationError::MissingField("owner_email"))
        );
    }

    #[tokio::test]
    async fn test_record_payment_posts_remaining_dues() {
        let source = Arc::new(source());
        let service = PaymentService::new(source.clone());

        let result = service.record_payment(command(500.0, 2000.0)).await.unwrap();

        assert!(result.confirmed_by_backend);
        assert_eq!(result.payment.remaining_due, 1500.0);
        let recorded = source.recorded_payments();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].remaining_dues, 1500.0);
        assert_eq!(recorded[0].user_email, "b@x.com");

        // The new payment is now the latest one for the member
        let dues = service.pending_dues_for_member("b@x.com", &mess_ref()).await.unwrap();
        assert_eq!(dues.pending_dues, 1500.0);
    }

    #[tokio::test]
    async fn test_rejected_payment_is_not_sent() {
        let source = Arc::new(source());
        let service = PaymentService::new(source.clone());

        let result = service.record_payment(command(5000.0, 2000.0)).await;
        assert!(matches!(
            result,
            Err(DuesError::InvalidPayment(PaymentValidationError::ExceedsDues { .. }))
        ));
        assert!(source.recorded_payments().is_empty());
    }

    #[tokio::test]
    async fn test_recording_failure_is_reported() {
        let service = PaymentService::new(Arc::new(source().failing(Endpoint::RecordPayment)));
        let result = service.record_payment(command(100.0, 2000.0)).await;
        assert!(matches!(result, Err(DuesError::PaymentNotRecorded(_))));
    }

    #[tokio::test]
    async fn test_history_is_newest_first_with_names() {
        let service = PaymentService::new(Arc::new(source()));

        let history = service.payment_history(&mess_ref(), PaymentFilter::All).await.unwrap();
        assert!(!history.is_partial);
        let history = history.entries;
        let ids: Vec<&str> = history.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["p2", "p3", "p1"]);
        assert_eq!(history[0].member_name, "Asha");
        assert_eq!(history[1].member_name, UNKNOWN_MEMBER_NAME);
        assert_eq!(history[0].status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn test_history_filters() {
        let service = PaymentService::new(Arc::new(source()));

        let due = service.payment_history(&mess_ref(), PaymentFilter::Due).await.unwrap().entries;
        assert_eq!(due.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(), vec!["p3", "p1"]);

        let paid = service.payment_history(&mess_ref(), PaymentFilter::Paid).await.unwrap().entries;
        assert_eq!(paid.len(), 1);
        assert_eq!(paid[0].id, "p2");
    }

    #[tokio::test]
    async fn test_history_of_malformed_payment_list_is_partial() {
        let source = source().with_payments("m1", json!({"message": "not a list"}));
        let service = PaymentService::new(Arc::new(source));

        let history = service.payment_history(&mess_ref(), PaymentFilter::All).await.unwrap();
        assert!(history.entries.is_empty());
        assert!(history.is_partial);
        assert_eq!(history.issues.len(), 1);
    }

    #[tokio::test]
    async fn test_history_keeps_good_entries_next_to_skipped_ones() {
        let source = source().with_payments(
            "m1",
            json!([
                {"id": "p1", "userEmail": "a@x.com", "amountPaid": 500, "remainingDues": 2500, "paymentDate": "2025-01-05T10:00:00"},
                {"id": "p2", "amountPaid": 100}
            ]),
        );
        let service = PaymentService::new(Arc::new(source));

        let history = service.payment_history(&mess_ref(), PaymentFilter::All).await.unwrap();
        assert_eq!(history.entries.len(), 1);
        assert_eq!(history.entries[0].member_name, "Asha");
        assert!(history.is_partial);
    }
}
