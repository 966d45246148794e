//! Unlock notifications.
//!
//! RULE: this pointer drives presentation only (toast, glow animation).
//! It is never consulted by the ledger. If the two disagree, the worst
//! outcome is a skipped or repeated notification, never a re-award.

use crate::{
    error::BadgeResult,
    ledger::ReconcileOutcome,
    store::{BadgeStore, StoreKey},
    threshold::ThresholdDef,
    types::{IdentityId, Timestamp},
};
use serde::Serialize;
use std::sync::Arc;

/// Emitted once per genuinely new top tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnlockEvent {
    pub identity: IdentityId,
    pub tier: ThresholdDef,
    pub unlocked_at: Timestamp,
    /// Tier the previous notification was sent for.
    pub previous: Option<String>,
}

pub type UnlockCallback = Box<dyn FnMut(&UnlockEvent) + Send>;

pub struct UnlockNotifier {
    identity: IdentityId,
    store: Arc<dyn BadgeStore>,
    callback: Option<UnlockCallback>,
}

impl UnlockNotifier {
    pub fn new(identity: IdentityId, store: Arc<dyn BadgeStore>) -> Self {
        Self { identity, store, callback: None }
    }

    /// Register the presentation hook. Replaces any earlier one.
    pub fn on_unlock(&mut self, callback: UnlockCallback) {
        self.callback = Some(callback);
    }

    pub fn last_notified(&self) -> BadgeResult<Option<String>> {
        Ok(self
            .store
            .get(&self.identity, StoreKey::LastUnlocked)?
            .filter(|s| !s.is_empty()))
    }

    /// Inspect a reconcile result and fire at most one notification.
    ///
    /// The pointer is written before the callback runs, so a callback
    /// that triggers another reconcile cannot fire the same tier twice.
    pub fn observe(
        &mut self,
        outcome: &ReconcileOutcome,
        at: Timestamp,
    ) -> BadgeResult<Option<UnlockEvent>> {
        let Some(tier) = &outcome.newly_unlocked else {
            return Ok(None);
        };

        let previous = self.last_notified()?;
        if previous.as_deref() == Some(tier.tier_name.as_str()) {
            log::debug!("{}: {} already notified", self.identity, tier.tier_name);
            return Ok(None);
        }

        self.store
            .set(&self.identity, StoreKey::LastUnlocked, &tier.tier_name)?;

        let event = UnlockEvent {
            identity: self.identity.clone(),
            tier: tier.clone(),
            unlocked_at: at,
            previous,
        };
        if let Some(cb) = self.callback.as_mut() {
            cb(&event);
        }
        log::info!("{}: unlock notification for {}", self.identity, tier.tier_name);
        Ok(Some(event))
    }
}
