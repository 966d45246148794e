//! Optimistic display counter.
//!
//! Bumped immediately after a report submission so the badge panel can
//! react before the next poll. It is display-only: nothing here ever
//! feeds the ledger, and each successful poll overwrites it.

use crate::{
    error::BadgeResult,
    store::{BadgeStore, StoreKey},
    types::{IdentityId, ReportCount},
};
use std::sync::Arc;

pub struct DisplayCounter {
    identity: IdentityId,
    store: Arc<dyn BadgeStore>,
}

impl DisplayCounter {
    pub fn new(identity: IdentityId, store: Arc<dyn BadgeStore>) -> Self {
        Self { identity, store }
    }

    /// Cached value; missing or malformed reads as 0.
    pub fn get(&self) -> BadgeResult<ReportCount> {
        let raw = self.store.get(&self.identity, StoreKey::DisplayCount)?;
        Ok(raw
            .and_then(|s| s.trim().parse::<ReportCount>().ok())
            .unwrap_or(0))
    }

    /// Add `delta` to the cached value and return the new value.
    pub fn bump(&self, delta: ReportCount) -> BadgeResult<ReportCount> {
        let next = self.get()?.saturating_add(delta);
        self.overwrite(next)?;
        Ok(next)
    }

    /// Replace the cached value with an authoritative count.
    pub fn overwrite(&self, count: ReportCount) -> BadgeResult<()> {
        self.store
            .set(&self.identity, StoreKey::DisplayCount, &count.to_string())
    }
}
