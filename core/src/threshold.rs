//! Tier definitions.
//!
//! RULE: a ThresholdTable is validated once, at construction.
//! Every lookup afterwards relies on strictly increasing `min_count`
//! and unique `tier_name`, and never re-checks.

use crate::{
    error::{BadgeError, BadgeResult},
    types::ReportCount,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One achievement tier: reached once the report count hits `min_count`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ThresholdDef {
    pub min_count: ReportCount,
    pub tier_name: String,
    /// Opaque glyph reference (an emoji in the stock table).
    pub icon: String,
}

impl ThresholdDef {
    pub fn new(min_count: ReportCount, tier_name: &str, icon: &str) -> Self {
        Self {
            min_count,
            tier_name: tier_name.to_string(),
            icon: icon.to_string(),
        }
    }
}

/// Immutable, ordered list of tiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdTable {
    tiers: Vec<ThresholdDef>,
}

impl ThresholdTable {
    /// Validate and wrap `tiers`. Refuses unsorted, tied or duplicated input
    /// rather than repairing it.
    pub fn new(tiers: Vec<ThresholdDef>) -> BadgeResult<Self> {
        validate(&tiers)?;
        Ok(Self { tiers })
    }

    /// The stock six-tier civic table.
    pub fn civic_default() -> Self {
        Self {
            tiers: vec![
                ThresholdDef::new(10, "Bronze", "🥉"),
                ThresholdDef::new(20, "Silver", "🥈"),
                ThresholdDef::new(50, "Diamond", "💎"),
                ThresholdDef::new(100, "Titanium", "🛡️"),
                ThresholdDef::new(300, "Vibranium", "🔷"),
                ThresholdDef::new(700, "Ultra Civic", "🌟"),
            ],
        }
    }

    pub fn tiers(&self) -> &[ThresholdDef] {
        &self.tiers
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    pub fn by_name(&self, tier_name: &str) -> Option<&ThresholdDef> {
        self.tiers.iter().find(|t| t.tier_name == tier_name)
    }

    /// Sort key of a tier within the table; `None` for foreign names.
    pub fn position(&self, tier_name: &str) -> Option<usize> {
        self.tiers.iter().position(|t| t.tier_name == tier_name)
    }
}

fn validate(tiers: &[ThresholdDef]) -> BadgeResult<()> {
    let mut names = HashSet::new();
    for (idx, tier) in tiers.iter().enumerate() {
        if tier.tier_name.trim().is_empty() {
            return Err(BadgeError::InvalidThresholdConfig {
                reason: format!("tier at position {idx} has a blank name"),
            });
        }
        if !names.insert(tier.tier_name.as_str()) {
            return Err(BadgeError::InvalidThresholdConfig {
                reason: format!("duplicate tier name '{}'", tier.tier_name),
            });
        }
        if let Some(prev) = idx.checked_sub(1).map(|p| &tiers[p]) {
            if tier.min_count <= prev.min_count {
                return Err(BadgeError::InvalidThresholdConfig {
                    reason: format!(
                        "'{}' (min {}) does not strictly exceed '{}' (min {})",
                        tier.tier_name, tier.min_count, prev.tier_name, prev.min_count
                    ),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn civic_default_passes_validation() {
        let stock = ThresholdTable::civic_default();
        let checked = ThresholdTable::new(stock.tiers().to_vec()).unwrap();
        assert_eq!(checked.len(), 6);
        assert_eq!(checked.by_name("Ultra Civic").unwrap().min_count, 700);
    }

    #[test]
    fn rejects_tied_min_count() {
        let err = ThresholdTable::new(vec![
            ThresholdDef::new(10, "Bronze", "b"),
            ThresholdDef::new(10, "Silver", "s"),
        ])
        .unwrap_err();
        assert!(matches!(err, BadgeError::InvalidThresholdConfig { .. }));
    }

    #[test]
    fn rejects_descending_order() {
        let err = ThresholdTable::new(vec![
            ThresholdDef::new(20, "Silver", "s"),
            ThresholdDef::new(10, "Bronze", "b"),
        ])
        .unwrap_err();
        assert!(matches!(err, BadgeError::InvalidThresholdConfig { .. }));
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = ThresholdTable::new(vec![
            ThresholdDef::new(10, "Bronze", "b"),
            ThresholdDef::new(20, "Bronze", "b"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("duplicate tier name"));
    }

    #[test]
    fn rejects_blank_name() {
        assert!(ThresholdTable::new(vec![ThresholdDef::new(1, "  ", "x")]).is_err());
    }

    #[test]
    fn empty_table_is_allowed() {
        assert!(ThresholdTable::new(vec![]).unwrap().is_empty());
    }
}
