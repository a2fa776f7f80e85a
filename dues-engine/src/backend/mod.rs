//! # Backend Module
//!
//! Everything below the presentation layer of the mess client:
//! - **Domain**: dues rules and the reconciliation and payment services
//! - **Storage**: the data source abstraction the services read through
//! - **IO**: the HTTP client for the mess backend
//!
//! ```text
//! Presentation (owner and member screens)
//!     ↓
//! Domain (ReconciliationService, PaymentService)
//!     ↓
//! Storage (MessDataSource)
//!     ↓
//! IO (HttpMessDataSource, ResilientFetcher)
//! ```

pub mod config;
pub mod domain;
pub mod io;
pub mod storage;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::backend::config::EngineConfig;
use crate::backend::domain::{PaymentService, ReconciliationService};
use crate::backend::io::{HttpMessDataSource, ResilientFetcher};
use crate::backend::storage::MessDataSource;

/// Services shared by every screen of the client
#[derive(Clone)]
pub struct DuesEngine {
    pub reconciliation_service: ReconciliationService,
    pub payment_service: PaymentService,
}

impl DuesEngine {
    /// Build the services on top of any data source
    pub fn with_source(source: Arc<dyn MessDataSource>) -> Self {
        Self {
            reconciliation_service: ReconciliationService::new(source.clone()),
            payment_service: PaymentService::new(source),
        }
    }
}

/// Initialize the engine against the HTTP backend described by `config`
pub fn initialize_engine(config: &EngineConfig) -> Result<DuesEngine> {
    info!("Setting up HTTP client");
    config.validate().context("Invalid engine configuration")?;
    let fetcher = ResilientFetcher::new(config.retry_policy()?, config.request_timeout())?;
    let source = HttpMessDataSource::new(fetcher, config.base_url()?);

    info!("Setting up domain services for {}", source.base_url());
    Ok(DuesEngine::with_source(Arc::new(source)))
}
