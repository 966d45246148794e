//! Persistence port for the badge ledger.
//!
//! RULE: only adapters in this module touch durable storage.
//! The ledger, notifier and display counter go through BadgeStore;
//! they never read a database or file directly.
//!
//! Each identity owns exactly three values (see StoreKey). There is
//! no per-key delete: `reset_all` is the only way to
//! clear anything, so a logout can never leave one value behind.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::BadgeResult;

/// The three independently addressable values kept per identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    /// JSON array of earned badges.
    EarnedBadges,
    /// Name of the last tier an unlock notification was sent for.
    LastUnlocked,
    /// Optimistic display counter.
    DisplayCount,
}

impl StoreKey {
    pub const ALL: [StoreKey; 3] = [
        StoreKey::EarnedBadges,
        StoreKey::LastUnlocked,
        StoreKey::DisplayCount,
    ];

    /// Stable column value; never renamed once shipped.
    pub fn as_str(self) -> &'static str {
        match self {
            StoreKey::EarnedBadges => "earned_badges",
            StoreKey::LastUnlocked => "last_unlocked",
            StoreKey::DisplayCount => "display_count",
        }
    }
}

/// Key/value port keyed by `(identity, StoreKey)`.
/// Values are opaque strings; callers own their encoding.
pub trait BadgeStore: Send + Sync {
    fn get(&self, identity: &str, key: StoreKey) -> BadgeResult<Option<String>>;

    fn set(&self, identity: &str, key: StoreKey, value: &str) -> BadgeResult<()>;

    /// Clear all three values for `identity` together.
    fn reset_all(&self, identity: &str) -> BadgeResult<()>;
}
