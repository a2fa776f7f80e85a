//! HTTP implementation of [`MessDataSource`].
//!
//! Endpoints used:
//! - `GET  /mess/getById/{id}` and `GET /mess/getByEmail/{ownerEmail}`
//! - `GET  /payment/mess/{messId}`
//! - `GET  /payment/user/{email}/mess/{messId}`
//! - `GET  /payment/pending/user/{email}/mess/{messId}`
//! - `GET  /byEmail/{email}`
//! - `POST /payment/record` (form encoded)

use async_trait::async_trait;
use reqwest::Url;
use shared::RecordPaymentRequest;
use tracing::{debug, info};

use super::fetcher::{FetchError, ResilientFetcher};
use super::mappers::{MemberMapper, MessMapper, PaymentMapper};
use crate::backend::domain::errors::DuesError;
use crate::backend::domain::models::{Coerced, MemberProfile, MessConfig, MessRef, PaymentRecord};
use crate::backend::storage::MessDataSource;

#[derive(Clone)]
pub struct HttpMessDataSource {
    fetcher: ResilientFetcher,
    base_url: Url,
}

impl HttpMessDataSource {
    pub fn new(fetcher: ResilientFetcher, base_url: Url) -> Self {
        Self { fetcher, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Append percent-encoded path segments to the base URL
    fn endpoint(&self, segments: &[&str]) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidUrl {
                label: segments.join("/"),
                detail: format!("{} cannot carry a path", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get(&self, what: &str, segments: &[&str]) -> Result<serde_json::Value, DuesError> {
        let url = self
            .endpoint(segments)
            .map_err(|e| DuesError::upstream(what, e))?;
        debug!("Fetching {} from {}", what, url);
        self.fetcher
            .get_json(url)
            .await
            .map_err(|e| DuesError::upstream(what, e))
    }
}

#[async_trait]
impl MessDataSource for HttpMessDataSource {
    async fn fetch_mess(&self, mess: &MessRef) -> Result<Coerced<MessConfig>, DuesError> {
        let response = match mess {
            MessRef::Id(id) => self.get("mess roster", &["mess", "getById", id.as_str()]).await?,
            MessRef::OwnerEmail(email) => self.get("mess roster", &["mess", "getByEmail", email.as_str()]).await?,
        };
        MessMapper::to_domain(response, mess)
    }

    async fn fetch_mess_payments(&self, mess_id: &str) -> Result<Coerced<Vec<PaymentRecord>>, DuesError> {
        let response = self.get("payment list", &["payment", "mess", mess_id]).await?;
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
        let response = self
            .get("member payments", &["payment", "user", member_email, "mess", mess_id])
            .await?;
        Ok(PaymentMapper::list_to_domain(
            response,
            &format!("payments of {} in mess {}", member_email, mess_id),
            mess_id,
        ))
    }

    async fn fetch_member_profile(&self, member_email: &str) -> Result<Option<MemberProfile>, DuesError> {
        let response = self.get("member profile", &["byEmail", member_email]).await?;
        Ok(MemberMapper::to_domain(&response, member_email))
    }

    async fn fetch_pending_dues(&self, member_email: &str, mess_id: &str) -> Result<Option<f64>, DuesError> {
        let response = self
            .get(
                "pending dues",
                &["payment", "pending", "user", member_email, "mess", mess_id],
            )
            .await?;
        Ok(PaymentMapper::pending_dues(&response))
    }

    async fn record_payment(&self, request: &RecordPaymentRequest) -> Result<Option<PaymentRecord>, DuesError> {
        let url = self
            .endpoint(&["payment", "record"])
            .map_err(DuesError::PaymentNotRecorded)?;
        info!(
            "Recording payment of {:.2} by {} to mess {}",
            request.amount_paid, request.user_email, request.mess_id
        );
        let response = self
            .fetcher
            .post_form(url, request)
            .await
            .map_err(DuesError::PaymentNotRecorded)?;
        Ok(PaymentMapper::to_domain(&response, "recorded payment", &request.mess_id).map(|c| c.value))
    }
}
