//! The report-count oracle: the only authoritative input to the ledger.

use crate::{
    error::{BadgeError, BadgeResult},
    types::ReportCount,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Source of truth for an identity's cumulative report count.
///
/// An unknown or unauthenticated identity must come back as `Ok(0)`.
/// `Err` means the cycle is skipped, never that the count is zero.
#[async_trait]
pub trait ReportCountOracle: Send + Sync {
    async fn fetch_count(&self, identity: &str) -> BadgeResult<ReportCount>;
}

/// One row of the report listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportRecord {
    pub report_id: String,
    pub submitted_by: String,
}

/// Raw access to the report listing.
#[async_trait]
pub trait ReportFeed: Send + Sync {
    async fn list_reports(&self) -> anyhow::Result<Vec<ReportRecord>>;
}

/// Counts the active identity's reports in a full listing.
/// Reports rejected upstream drop out of the listing, so the count can fall.
pub struct ReportFeedOracle {
    feed: Arc<dyn ReportFeed>,
}

impl ReportFeedOracle {
    pub fn new(feed: Arc<dyn ReportFeed>) -> Self {
        Self { feed }
    }
}

#[async_trait]
impl ReportCountOracle for ReportFeedOracle {
    async fn fetch_count(&self, identity: &str) -> BadgeResult<ReportCount> {
        if identity.trim().is_empty() {
            log::debug!("no active identity, report count is 0");
            return Ok(0);
        }
        let reports = self
            .feed
            .list_reports()
            .await
            .map_err(|e| BadgeError::OracleUnavailable { reason: e.to_string() })?;
        let count = reports.iter().filter(|r| r.submitted_by == identity).count();
        log::debug!("{identity}: {count} reports in feed of {}", reports.len());
        Ok(count as ReportCount)
    }
}
