//! Integration tests for ledger reconciliation.
//!
//! Tests verify:
//! 1. The Bronze/Silver/Diamond walk-through, including prune and re-earn
//! 2. Reconciling the same count twice is a no-op
//! 3. A lower count prunes every tier above it
//! 4. Unlock notifications fire once per genuinely new tier
//! 5. The optimistic display count never reaches the ledger
//! 6. A failed notifier or display write does not un-apply a persisted count

use chrono::{Duration, TimeZone, Utc};
use civic_badges_core::{
    clock::ManualClock,
    resolver::BadgeResolver,
    session::AchievementSession,
    error::{BadgeError, BadgeResult},
    store::{BadgeStore, MemoryStore, StoreKey},
    threshold::{ThresholdDef, ThresholdTable},
    types::Timestamp,
};
use std::sync::{Arc, Mutex};

fn t0() -> Timestamp {
    Utc.with_ymd_and_hms(2026, 10, 1, 8, 0, 0).unwrap()
}

fn resolver() -> BadgeResolver {
    BadgeResolver::new(Arc::new(
        ThresholdTable::new(vec![
            ThresholdDef::new(10, "Bronze", "🥉"),
            ThresholdDef::new(20, "Silver", "🥈"),
            ThresholdDef::new(50, "Diamond", "💎"),
        ])
        .expect("valid table"),
    ))
}

struct Fixture {
    store: Arc<MemoryStore>,
    clock: Arc<ManualClock>,
    session: AchievementSession,
}

fn build(identity: &str) -> Fixture {
    let _ = env_logger::builder().is_test(true).try_init();
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(t0()));
    let session = AchievementSession::open(identity.into(), resolver(), store.clone(), clock.clone())
        .expect("open session");
    Fixture { store, clock, session }
}

fn ledger_view(session: &AchievementSession) -> Vec<(String, Timestamp)> {
    session
        .ledger()
        .entries()
        .iter()
        .map(|e| (e.tier_name.clone(), e.earned_at))
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 1: the documented walk-through
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn bronze_silver_prune_and_reearn_walkthrough() {
    let mut f = build("walk");

    let u = f.session.apply_count(0).unwrap();
    assert!(u.outcome.newly_unlocked.is_none());
    assert!(f.session.ledger().entries().is_empty());

    let t1 = f.clock.advance(Duration::minutes(1));
    let u = f.session.apply_count(12).unwrap();
    assert_eq!(u.outcome.newly_unlocked.unwrap().tier_name, "Bronze");
    assert_eq!(ledger_view(&f.session), vec![("Bronze".to_string(), t1)]);

    let t2 = f.clock.advance(Duration::minutes(1));
    let u = f.session.apply_count(22).unwrap();
    assert_eq!(u.outcome.newly_unlocked.unwrap().tier_name, "Silver");
    assert_eq!(
        ledger_view(&f.session),
        vec![("Bronze".to_string(), t1), ("Silver".to_string(), t2)]
    );

    // A report was rejected upstream.
    f.clock.advance(Duration::minutes(1));
    let u = f.session.apply_count(15).unwrap();
    assert!(u.outcome.newly_unlocked.is_none());
    assert!(u.outcome.changed);
    assert_eq!(u.outcome.pruned, vec!["Silver".to_string()]);
    assert_eq!(ledger_view(&f.session), vec![("Bronze".to_string(), t1)]);

    let t3 = f.clock.advance(Duration::minutes(1));
    let u = f.session.apply_count(22).unwrap();
    assert_eq!(u.outcome.newly_unlocked.unwrap().tier_name, "Silver");
    assert_eq!(
        ledger_view(&f.session),
        vec![("Bronze".to_string(), t1), ("Silver".to_string(), t3)]
    );
    assert_ne!(t2, t3);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 2: idempotence
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn same_count_twice_is_byte_identical() {
    let mut f = build("idem");

    for count in [0u64, 9, 12, 22, 49, 50, 51, 400] {
        f.session.apply_count(count).unwrap();
        let stored_a = f.store.get("idem", StoreKey::EarnedBadges).unwrap();

        f.clock.advance(Duration::seconds(5));
        let again = f.session.apply_count(count).unwrap();
        let stored_b = f.store.get("idem", StoreKey::EarnedBadges).unwrap();

        assert!(again.outcome.newly_unlocked.is_none(), "count={count}");
        assert!(!again.outcome.changed, "count={count}");
        assert_eq!(stored_a, stored_b, "count={count}");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 3: pruning law
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn lower_count_keeps_only_tiers_it_justifies() {
    let table = resolver();
    let counts = [0u64, 5, 10, 15, 20, 35, 50, 80];
    for &high in &counts {
        for &low in counts.iter().filter(|&&c| c < high) {
            let mut f = build("prune");
            // Walk up so several tiers are held.
            for step in [10u64, 20, 50] {
                if step <= high {
                    f.session.apply_count(step).unwrap();
                }
            }
            f.session.apply_count(high).unwrap();
            f.session.apply_count(low).unwrap();

            for entry in f.session.ledger().entries() {
                let min = table.table().by_name(&entry.tier_name).unwrap().min_count;
                assert!(min <= low, "high={high} low={low} kept {}", entry.tier_name);
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 4: single-fire notifications
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn unlock_fires_once_while_tier_is_held() {
    let mut f = build("notify");
    let fired = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink = fired.clone();
    f.session
        .on_unlock(Box::new(move |e| sink.lock().unwrap().push(e.tier.tier_name.clone())));

    for count in [3u64, 12, 12, 14, 19, 12, 22, 22, 25, 21] {
        f.session.apply_count(count).unwrap();
    }

    assert_eq!(*fired.lock().unwrap(), vec!["Bronze".to_string(), "Silver".to_string()]);
    assert_eq!(f.session.notifier().last_notified().unwrap().as_deref(), Some("Silver"));
}

#[test]
fn pointer_survives_reopen_so_restart_does_not_refire() {
    let mut f = build("restart");
    f.session.apply_count(12).unwrap();

    let mut reopened =
        AchievementSession::open("restart".into(), resolver(), f.store.clone(), f.clock.clone())
            .unwrap();
    let u = reopened.apply_count(12).unwrap();

    assert!(u.outcome.newly_unlocked.is_none());
    assert!(u.unlock.is_none());
    assert_eq!(ledger_view(&reopened), ledger_view(&f.session));
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 5: optimistic display count is display-only
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn display_bump_is_overwritten_by_next_authoritative_count() {
    let mut f = build("display");
    f.session.apply_count(9).unwrap();

    assert_eq!(f.session.bump_display_count(1).unwrap(), 10);
    assert_eq!(f.session.progress().unwrap().headline(), "Bronze Achiever");
    // Ledger has not moved: the bump is not authoritative.
    assert!(f.session.ledger().entries().is_empty());

    f.session.apply_count(9).unwrap();
    assert_eq!(f.session.display_count().unwrap(), 9);
    assert_eq!(f.session.progress().unwrap().next_hint().as_deref(), Some("1 more to reach Bronze"));
}

#[test]
fn reset_clears_all_three_values_together() {
    let mut f = build("logout");
    f.session.apply_count(30).unwrap();
    assert!(f.store.value_count().unwrap() == 3);

    f.session.reset().unwrap();

    assert_eq!(f.store.value_count().unwrap(), 0);
    assert!(f.session.ledger().entries().is_empty());
    assert!(f.session.notifier().last_notified().unwrap().is_none());
    assert_eq!(f.session.display_count().unwrap(), 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 6: side-effect failures after persist
// ─────────────────────────────────────────────────────────────────────────────

/// Memory store that refuses writes to selected keys.
struct RefusingStore {
    inner: MemoryStore,
    refused: Vec<StoreKey>,
}

impl BadgeStore for RefusingStore {
    fn get(&self, identity: &str, key: StoreKey) -> BadgeResult<Option<String>> {
        self.inner.get(identity, key)
    }

    fn set(&self, identity: &str, key: StoreKey, value: &str) -> BadgeResult<()> {
        if self.refused.contains(&key) {
            return Err(BadgeError::StoreUnavailable {
                reason: format!("{} is read-only", key.as_str()),
            });
        }
        self.inner.set(identity, key, value)
    }

    fn reset_all(&self, identity: &str) -> BadgeResult<()> {
        self.inner.reset_all(identity)
    }
}

#[test]
fn failed_pointer_or_display_write_still_reports_applied_count() {
    let store = Arc::new(RefusingStore {
        inner: MemoryStore::new(),
        refused: vec![StoreKey::LastUnlocked, StoreKey::DisplayCount],
    });
    let mut session = AchievementSession::open(
        "readonly".into(),
        resolver(),
        store.clone(),
        Arc::new(ManualClock::new(t0())),
    )
    .unwrap();

    let update = session.apply_count(12).expect("count is applied once the ledger persists");
    assert_eq!(update.count, 12);
    assert_eq!(update.outcome.newly_unlocked.unwrap().tier_name, "Bronze");
    assert!(update.unlock.is_none());

    assert_eq!(ledger_view(&session), vec![("Bronze".to_string(), t0())]);
    assert!(store.get("readonly", StoreKey::EarnedBadges).unwrap().is_some());
    assert!(store.get("readonly", StoreKey::LastUnlocked).unwrap().is_none());
}
