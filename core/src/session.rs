//! One identity's achievement session, and the gate that serializes
//! every reconciliation against it.
//!
//! RULE: every path that reconciles goes through ReconcileGate, scheduler
//! ticks and manual refreshes alike. Two prune/award passes never interleave.

use crate::{
    clock::Clock,
    display::DisplayCounter,
    error::BadgeResult,
    ledger::{EarnedTier, Ledger, ReconcileOutcome},
    notifier::{UnlockCallback, UnlockEvent, UnlockNotifier},
    resolver::{BadgeResolver, Progress},
    store::BadgeStore,
    types::{IdentityId, ReportCount},
};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// What one applied count did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUpdate {
    pub count: ReportCount,
    pub outcome: ReconcileOutcome,
    pub unlock: Option<UnlockEvent>,
}

pub struct AchievementSession {
    ledger: Ledger,
    notifier: UnlockNotifier,
    display: DisplayCounter,
    clock: Arc<dyn Clock>,
}

impl AchievementSession {
    pub fn open(
        identity: IdentityId,
        resolver: BadgeResolver,
        store: Arc<dyn BadgeStore>,
        clock: Arc<dyn Clock>,
    ) -> BadgeResult<Self> {
        let ledger = Ledger::load(identity.clone(), resolver, store.clone(), clock.clone())?;
        Ok(Self {
            notifier: UnlockNotifier::new(identity.clone(), store.clone()),
            display: DisplayCounter::new(identity, store),
            ledger,
            clock,
        })
    }

    pub fn identity(&self) -> &str {
        self.ledger.identity()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn notifier(&self) -> &UnlockNotifier {
        &self.notifier
    }

    pub fn on_unlock(&mut self, callback: UnlockCallback) {
        self.notifier.on_unlock(callback);
    }

    /// Apply an authoritative count: reconcile, notify, refresh the display cache.
    ///
    /// Only the reconcile can fail the call. Once the ledger is persisted the
    /// count is applied; notifier and display-cache errors are logged and the
    /// update carries no unlock.
    pub fn apply_count(&mut self, count: ReportCount) -> BadgeResult<SessionUpdate> {
        let outcome = self.ledger.reconcile(count)?;
        let unlock = match self.notifier.observe(&outcome, self.clock.now()) {
            Ok(unlock) => unlock,
            Err(e) => {
                log::warn!(
                    "{}: unlock notification at count {count} failed: {e}",
                    self.identity()
                );
                None
            }
        };
        if let Err(e) = self.display.overwrite(count) {
            log::warn!("{}: display count refresh to {count} failed: {e}", self.identity());
        }
        Ok(SessionUpdate { count, outcome, unlock })
    }

    /// Optimistic bump after a local submission. Never reaches the ledger.
    pub fn bump_display_count(&self, delta: ReportCount) -> BadgeResult<ReportCount> {
        self.display.bump(delta)
    }

    pub fn display_count(&self) -> BadgeResult<ReportCount> {
        self.display.get()
    }

    /// Progress against the display count.
    pub fn progress(&self) -> BadgeResult<Progress> {
        Ok(self.ledger.resolver().progress(self.display.get()?))
    }

    pub fn earned(&self) -> Vec<EarnedTier> {
        self.ledger.earned()
    }

    /// Logout: ledger, unlock pointer and display cache go together.
    pub fn reset(&mut self) -> BadgeResult<()> {
        self.ledger.reset()
    }
}

/// Shared, serialized access to one session.
#[derive(Clone)]
pub struct ReconcileGate {
    identity: IdentityId,
    session: Arc<Mutex<AchievementSession>>,
}

impl ReconcileGate {
    pub fn new(session: AchievementSession) -> Self {
        Self {
            identity: session.identity().to_string(),
            session: Arc::new(Mutex::new(session)),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Wait for exclusive access to the session.
    pub async fn lock(&self) -> MutexGuard<'_, AchievementSession> {
        self.session.lock().await
    }

    /// Manual refresh with a known authoritative count.
    pub async fn apply_count(&self, count: ReportCount) -> BadgeResult<SessionUpdate> {
        self.session.lock().await.apply_count(count)
    }
}
