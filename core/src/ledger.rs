//! Badge ledger: the persisted record of tiers earned in the current
//! continuous qualifying period.
//!
//! RULES:
//!   - The ledger is mutated only through `reconcile` (and `reset`).
//!   - The store is the durable truth; `entries` is a cache of it,
//!     rehydrated in `load` and flushed on every reconcile.
//!   - Award dedup is membership-based: a tier already present is never
//!     awarded again, whatever the unlock notifier last saw.
//!   - `earned_at` is stamped once, when the entry is created. A tier
//!     pruned and later re-qualified gets a new entry with a new stamp.

use crate::{
    clock::Clock,
    error::BadgeResult,
    resolver::BadgeResolver,
    store::{BadgeStore, StoreKey},
    threshold::{ThresholdDef, ThresholdTable},
    types::{IdentityId, ReportCount, Timestamp},
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// One earned tier, as persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EarnedBadge {
    pub tier_name: String,
    pub earned_at: Timestamp,
}

/// An earned tier joined with its threshold definition, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EarnedTier {
    pub tier: ThresholdDef,
    pub earned_at: Timestamp,
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReconcileOutcome {
    /// True when the entry list differs from before the pass.
    pub changed: bool,
    /// Set only when this pass appended a new entry.
    pub newly_unlocked: Option<ThresholdDef>,
    /// Tier names removed because the count fell below them.
    pub pruned: Vec<String>,
}

pub struct Ledger {
    identity: IdentityId,
    resolver: BadgeResolver,
    store: Arc<dyn BadgeStore>,
    clock: Arc<dyn Clock>,
    entries: Vec<EarnedBadge>,
}

impl Ledger {
    /// Rehydrate the ledger for `identity` from the store.
    /// Malformed or foreign stored data yields an empty ledger, not an error.
    pub fn load(
        identity: IdentityId,
        resolver: BadgeResolver,
        store: Arc<dyn BadgeStore>,
        clock: Arc<dyn Clock>,
    ) -> BadgeResult<Self> {
        let raw = store.get(&identity, StoreKey::EarnedBadges)?;
        let entries = match raw {
            Some(raw) => decode_entries(&identity, &raw, resolver.table()),
            None => Vec::new(),
        };
        log::debug!("ledger loaded for {identity}: {} entries", entries.len());
        Ok(Self { identity, resolver, store, clock, entries })
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn resolver(&self) -> &BadgeResolver {
        &self.resolver
    }

    pub fn entries(&self) -> &[EarnedBadge] {
        &self.entries
    }

    pub fn contains(&self, tier_name: &str) -> bool {
        self.entries.iter().any(|e| e.tier_name == tier_name)
    }

    /// Entries joined with their threshold definitions, lowest tier first.
    pub fn earned(&self) -> Vec<EarnedTier> {
        self.entries
            .iter()
            .filter_map(|e| {
                self.resolver.table().by_name(&e.tier_name).map(|t| EarnedTier {
                    tier: t.clone(),
                    earned_at: e.earned_at,
                })
            })
            .collect()
    }

    /// Look up one earned tier (for certificate download).
    pub fn earned_tier(&self, tier_name: &str) -> Option<EarnedTier> {
        self.earned().into_iter().find(|e| e.tier.tier_name == tier_name)
    }

    /// Highest tier currently held.
    pub fn top_tier(&self) -> Option<&ThresholdDef> {
        self.entries
            .last()
            .and_then(|e| self.resolver.table().by_name(&e.tier_name))
    }

    /// Prune, resolve, award, persist.
    ///
    /// In-memory state is only replaced after the store write succeeds,
    /// so a failed persist leaves the ledger as it was.
    pub fn reconcile(&mut self, count: ReportCount) -> BadgeResult<ReconcileOutcome> {
        let table = self.resolver.table();

        // 1. Prune everything the count no longer justifies.
        let mut next = Vec::with_capacity(self.entries.len() + 1);
        let mut pruned = Vec::new();
        for entry in &self.entries {
            match table.by_name(&entry.tier_name) {
                Some(t) if t.min_count <= count => next.push(entry.clone()),
                _ => pruned.push(entry.tier_name.clone()),
            }
        }

        // 2. Resolve; 3. award if not already held.
        let mut newly_unlocked = None;
        if let Some(tier) = self.resolver.resolve_tier(count) {
            if !next.iter().any(|e| e.tier_name == tier.tier_name) {
                next.push(EarnedBadge {
                    tier_name: tier.tier_name.clone(),
                    earned_at: self.clock.now(),
                });
                newly_unlocked = Some(tier.clone());
            }
        }
        sort_by_table(&mut next, table);

        // 4. Persist.
        let encoded = serde_json::to_string(&next)?;
        self.store.set(&self.identity, StoreKey::EarnedBadges, &encoded)?;

        let changed = next != self.entries;
        self.entries = next;

        for name in &pruned {
            log::info!("{}: pruned {name} at count {count}", self.identity);
        }
        if let Some(t) = &newly_unlocked {
            log::info!("{}: awarded {} at count {count}", self.identity, t.tier_name);
        }

        Ok(ReconcileOutcome { changed, newly_unlocked, pruned })
    }

    /// Clear the ledger, the unlock pointer and the display cache together.
    pub fn reset(&mut self) -> BadgeResult<()> {
        self.store.reset_all(&self.identity)?;
        self.entries.clear();
        log::info!("{}: achievement state reset", self.identity);
        Ok(())
    }
}

/// Parse a stored ledger. Drops entries naming unknown tiers and repeated
/// names; a blob that does not parse at all becomes an empty ledger.
fn decode_entries(identity: &str, raw: &str, table: &ThresholdTable) -> Vec<EarnedBadge> {
    let parsed: Vec<EarnedBadge> = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("{identity}: discarding malformed ledger data: {e}");
            return Vec::new();
        }
    };

    let mut seen = HashSet::new();
    let mut entries: Vec<EarnedBadge> = parsed
        .into_iter()
        .filter(|e| table.position(&e.tier_name).is_some())
        .filter(|e| seen.insert(e.tier_name.clone()))
        .collect();
    sort_by_table(&mut entries, table);
    entries
}

fn sort_by_table(entries: &mut [EarnedBadge], table: &ThresholdTable) {
    entries.sort_by_key(|e| table.position(&e.tier_name).unwrap_or(usize::MAX));
}
