//! Pure tier lookups over a validated ThresholdTable.

use crate::{
    threshold::{ThresholdDef, ThresholdTable},
    types::ReportCount,
};
use serde::Serialize;
use std::sync::Arc;

/// Icon shown while no tier is held.
pub const SEEDLING_ICON: &str = "🌱";

/// The tier with the greatest `min_count <= count`, if any.
pub fn resolve_tier(count: ReportCount, table: &ThresholdTable) -> Option<&ThresholdDef> {
    let tiers = table.tiers();
    // Number of tiers already reached; the table is strictly increasing.
    let reached = tiers.partition_point(|t| t.min_count <= count);
    reached.checked_sub(1).map(|idx| &tiers[idx])
}

/// The tier after the current one, or the first tier when none is held.
pub fn resolve_next(count: ReportCount, table: &ThresholdTable) -> Option<&ThresholdDef> {
    let tiers = table.tiers();
    let reached = tiers.partition_point(|t| t.min_count <= count);
    tiers.get(reached)
}

/// Progress summary for the badge panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub count: ReportCount,
    pub current: Option<ThresholdDef>,
    pub next: Option<ThresholdDef>,
    /// Reports still needed for `next`; 0 when at the top tier.
    pub remaining: ReportCount,
}

impl Progress {
    /// "Bronze Achiever", or "New Citizen" before the first tier.
    pub fn headline(&self) -> String {
        match &self.current {
            Some(t) => format!("{} Achiever", t.tier_name),
            None => "New Citizen".to_string(),
        }
    }

    pub fn icon(&self) -> &str {
        self.current.as_ref().map_or(SEEDLING_ICON, |t| t.icon.as_str())
    }

    /// "8 more to reach Silver"; `None` at the top tier.
    pub fn next_hint(&self) -> Option<String> {
        self.next
            .as_ref()
            .map(|n| format!("{} more to reach {}", self.remaining, n.tier_name))
    }
}

/// Shared handle over one threshold table.
#[derive(Debug, Clone)]
pub struct BadgeResolver {
    table: Arc<ThresholdTable>,
}

impl BadgeResolver {
    pub fn new(table: Arc<ThresholdTable>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &ThresholdTable {
        &self.table
    }

    pub fn resolve_tier(&self, count: ReportCount) -> Option<&ThresholdDef> {
        resolve_tier(count, &self.table)
    }

    pub fn resolve_next(&self, count: ReportCount) -> Option<&ThresholdDef> {
        resolve_next(count, &self.table)
    }

    pub fn progress(&self, count: ReportCount) -> Progress {
        let current = self.resolve_tier(count).cloned();
        let next = self.resolve_next(count).cloned();
        let remaining = next
            .as_ref()
            .map_or(0, |n| n.min_count.saturating_sub(count));
        Progress { count, current, next, remaining }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ThresholdTable {
        ThresholdTable::new(vec![
            ThresholdDef::new(10, "Bronze", "🥉"),
            ThresholdDef::new(20, "Silver", "🥈"),
            ThresholdDef::new(50, "Diamond", "💎"),
        ])
        .unwrap()
    }

    #[test]
    fn below_first_threshold_resolves_nothing() {
        let t = table();
        assert!(resolve_tier(0, &t).is_none());
        assert!(resolve_tier(9, &t).is_none());
        assert_eq!(resolve_next(0, &t).unwrap().tier_name, "Bronze");
    }

    #[test]
    fn boundaries_are_inclusive() {
        let t = table();
        assert_eq!(resolve_tier(10, &t).unwrap().tier_name, "Bronze");
        assert_eq!(resolve_tier(19, &t).unwrap().tier_name, "Bronze");
        assert_eq!(resolve_tier(20, &t).unwrap().tier_name, "Silver");
        assert_eq!(resolve_tier(10_000, &t).unwrap().tier_name, "Diamond");
    }

    #[test]
    fn selection_is_the_greatest_qualifying_tier() {
        let t = table();
        for count in 0..80u64 {
            let qualifying: Vec<_> = t.tiers().iter().filter(|d| d.min_count <= count).collect();
            let expected = qualifying.iter().max_by_key(|d| d.min_count).map(|d| &d.tier_name);
            assert_eq!(resolve_tier(count, &t).map(|d| &d.tier_name), expected, "count={count}");
        }
    }

    #[test]
    fn next_is_none_at_top_tier() {
        let t = table();
        assert_eq!(resolve_next(22, &t).unwrap().tier_name, "Diamond");
        assert!(resolve_next(50, &t).is_none());
    }

    #[test]
    fn empty_table_resolves_nothing() {
        let t = ThresholdTable::new(vec![]).unwrap();
        assert!(resolve_tier(5, &t).is_none());
        assert!(resolve_next(5, &t).is_none());
    }

    #[test]
    fn progress_reports_remaining_and_headline() {
        let resolver = BadgeResolver::new(Arc::new(table()));

        let fresh = resolver.progress(3);
        assert_eq!(fresh.headline(), "New Citizen");
        assert_eq!(fresh.icon(), SEEDLING_ICON);
        assert_eq!(fresh.next_hint().as_deref(), Some("7 more to reach Bronze"));

        let mid = resolver.progress(12);
        assert_eq!(mid.headline(), "Bronze Achiever");
        assert_eq!(mid.remaining, 8);

        let top = resolver.progress(60);
        assert_eq!(top.remaining, 0);
        assert!(top.next_hint().is_none());
    }
}
