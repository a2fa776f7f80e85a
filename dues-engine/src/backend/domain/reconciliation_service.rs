//! Reconciliation passes.
//!
//! A pass fetches, in order, the mess roster, the mess's payment list and the
//! profiles of joined members, freezes them into a [`ReconciliationInput`]
//! and hands that snapshot to [`ReconciliationService::reconcile_snapshot`],
//! which is a pure function of its input.
//!
//! Every pass takes a new id when it starts. When a pass finishes fetching
//! and a newer pass has started in the meantime, its result is discarded
//! with [`DuesError::Superseded`], so a screen never shows figures from two
//! different passes.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use shared::ReconciliationReport;
use tracing::{error, info, warn};

use crate::backend::domain::dues_synthesizer::mess_plan_is_set;
use crate::backend::domain::errors::DuesError;
use crate::backend::domain::ledger_service::LedgerService;
use crate::backend::domain::models::{DataIssue, MemberProfile, MessConfig, MessRef, PaymentRecord};
use crate::backend::domain::summary_service::SummaryService;
use crate::backend::storage::MessDataSource;

/// Everything one pass computes from, fetched up front
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationInput {
    pub pass_id: u64,
    pub mess: MessConfig,
    pub payments: Vec<PaymentRecord>,
    /// Profiles by member email. Missing entries render as "Unknown User".
    pub profiles: BTreeMap<String, MemberProfile>,
    /// Joined members currently on leave; they still owe dues
    pub inactive_members: BTreeSet<String>,
    /// Malformed data absorbed while fetching
    pub issues: Vec<DataIssue>,
}

#[derive(Clone)]
pub struct ReconciliationService {
    source: Arc<dyn MessDataSource>,
    ledger_service: LedgerService,
    summary_service: SummaryService,
    latest_pass: Arc<AtomicU64>,
}

impl ReconciliationService {
    pub fn new(source: Arc<dyn MessDataSource>) -> Self {
        Self {
            source,
            ledger_service: LedgerService::new(),
            summary_service: SummaryService::new(),
            latest_pass: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Run a full pass for a mess
    pub async fn reconcile(&self, mess: &MessRef) -> Result<ReconciliationReport, DuesError> {
        self.reconcile_with_inactive(mess, BTreeSet::new()).await
    }

    /// Run a full pass, leaving `inactive_members` out of the active count
    pub async fn reconcile_with_inactive(
        &self,
        mess: &MessRef,
        inactive_members: BTreeSet<String>,
    ) -> Result<ReconciliationReport, DuesError> {
        let pass_id = self.begin_pass();
        info!("Starting reconciliation pass {} for {}", pass_id, mess);

        let mut input = self.fetch_snapshot(pass_id, mess).await.map_err(|e| {
            error!("Reconciliation pass {} for {} failed: {}", pass_id, mess, e);
            e
        })?;
        input.inactive_members = inactive_members;

        self.complete_pass(&input)
    }

    /// Claim a new pass id; every earlier pass becomes stale
    pub fn begin_pass(&self) -> u64 {
        self.latest_pass.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, pass_id: u64) -> bool {
        self.latest_pass.load(Ordering::SeqCst) == pass_id
    }

    /// Fetch roster, payments and profiles for pass `pass_id`.
    ///
    /// Roster and payment list failures abort the pass. Profile failures are
    /// absorbed; they only matter for the amount when the mess has no plan
    /// of its own, and are reported as issues in that case.
    pub async fn fetch_snapshot(&self, pass_id: u64, mess_ref: &MessRef) -> Result<ReconciliationInput, DuesError> {
        let roster = self.source.fetch_mess(mess_ref).await?;
        let mut issues = roster.issues;
        let mess = roster.value;

        let payments = self.source.fetch_mess_payments(&mess.id).await?;
        issues.extend(payments.issues);

        let plan_depends_on_profiles = !mess_plan_is_set(&mess);
        let lookups = mess
            .joined_members
            .iter()
            .map(|member| async move { (member, self.source.fetch_member_profile(member).await) });

        let mut profiles = BTreeMap::new();
        for (member, result) in join_all(lookups).await {
            match result {
                Ok(Some(profile)) => {
                    profiles.insert(member.clone(), profile);
                }
                Ok(None) => {
                    warn!("No usable profile for {}", member);
                    if plan_depends_on_profiles {
                        issues.push(DataIssue::new(
                            format!("profile of {}", member),
                            "profile unusable, plan defaulted",
                        ));
                    }
                }
                Err(e) => {
                    warn!("Profile lookup for {} failed: {}", member, e);
                    if plan_depends_on_profiles {
                        issues.push(DataIssue::new(format!("profile of {}", member), e.to_string()));
                    }
                }
            }
        }

        Ok(ReconciliationInput {
            pass_id,
            mess,
            payments: payments.value,
            profiles,
            inactive_members: BTreeSet::new(),
            issues,
        })
    }

    /// Produce the report of a fetched pass, unless a newer pass has started
    pub fn complete_pass(&self, input: &ReconciliationInput) -> Result<ReconciliationReport, DuesError> {
        let latest = self.latest_pass.load(Ordering::SeqCst);
        if latest != input.pass_id {
            info!(
                "Discarding reconciliation pass {} for mess {}: pass {} is newer",
                input.pass_id, input.mess.id, latest
            );
            return Err(DuesError::Superseded {
                pass_id: input.pass_id,
                latest,
            });
        }
        Ok(self.reconcile_snapshot(input))
    }

    /// Compute summary and member views from a snapshot.
    ///
    /// Pure: the same input always yields an identical report.
    pub fn reconcile_snapshot(&self, input: &ReconciliationInput) -> ReconciliationReport {
        let aggregate = self
            .ledger_service
            .aggregate(&input.payments, &input.mess.joined_members);

        let (summary, members) = self.summary_service.build(
            &input.mess,
            &aggregate,
            &input.profiles,
            &input.inactive_members,
            !input.issues.is_empty(),
        );

        if !input.issues.is_empty() {
            warn!(
                "Pass {} for mess {} absorbed {} data issue(s)",
                input.pass_id,
                input.mess.id,
                input.issues.len()
            );
        }

        ReconciliationReport {
            pass_id: input.pass_id,
            mess_id: input.mess.id.clone(),
            summary,
            members,
            issues: input.issues.iter().map(ToString::to_string).collect(),
        }
    }
}
