//! Rank Tiers
//!
//! Pure mapping from cumulative points to a rank. Stats are the only input;
//! nothing in the game loop depends on the result except presentation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Rank bracket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// 0 - 599 points (and everything below zero)
    Iron,
    /// 600 - 1499 points
    Gold,
    /// 1500 - 2999 points
    Diamond,
    /// 3000+ points
    Master,
}

impl Tier {
    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            Tier::Iron => "Iron",
            Tier::Gold => "Gold",
            Tier::Diamond => "Diamond",
            Tier::Master => "Master",
        }
    }

    /// Display color as a hex string.
    pub fn color(self) -> &'static str {
        match self {
            Tier::Iron => "#C0C0C0",
            Tier::Gold => "#FFD700",
            Tier::Diamond => "#4EE2EC",
            Tier::Master => "#DC143C",
        }
    }
}

/// Sub-tier within Iron, Gold and Diamond. `I` is the lowest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Division {
    /// Lowest division.
    I,
    /// Second division.
    II,
    /// Third division.
    III,
    /// Fourth division.
    IV,
    /// Highest division.
    V,
}

impl Division {
    /// Roman numeral label.
    pub fn label(self) -> &'static str {
        match self {
            Division::I => "I",
            Division::II => "II",
            Division::III => "III",
            Division::IV => "IV",
            Division::V => "V",
        }
    }
}

/// A resolved rank.
///
/// Field order matters: the derived `Ord` compares tier first, then
/// division, which matches point order. Master carries no division.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Rank {
    /// Bracket.
    pub tier: Tier,
    /// Sub-tier, `None` for Master.
    pub division: Option<Division>,
}

impl Rank {
    /// Sub-tier label, empty for Master.
    pub fn division_label(&self) -> &'static str {
        self.division.map_or("", Division::label)
    }

    /// Display color.
    pub fn color(&self) -> &'static str {
        self.tier.color()
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.division {
            Some(division) => write!(f, "{} {}", self.tier.name(), division.label()),
            None => f.write_str(self.tier.name()),
        }
    }
}

/// Point thresholds, highest first.
const THRESHOLDS: [(i64, Tier, Option<Division>); 16] = [
    (3000, Tier::Master, None),
    (2700, Tier::Diamond, Some(Division::V)),
    (2400, Tier::Diamond, Some(Division::IV)),
    (2100, Tier::Diamond, Some(Division::III)),
    (1800, Tier::Diamond, Some(Division::II)),
    (1500, Tier::Diamond, Some(Division::I)),
    (1320, Tier::Gold, Some(Division::V)),
    (1140, Tier::Gold, Some(Division::IV)),
    (960, Tier::Gold, Some(Division::III)),
    (780, Tier::Gold, Some(Division::II)),
    (600, Tier::Gold, Some(Division::I)),
    (480, Tier::Iron, Some(Division::V)),
    (360, Tier::Iron, Some(Division::IV)),
    (240, Tier::Iron, Some(Division::III)),
    (120, Tier::Iron, Some(Division::II)),
    (0, Tier::Iron, Some(Division::I)),
];

/// The lowest rank, also used for negative totals.
pub const LOWEST_RANK: Rank = Rank {
    tier: Tier::Iron,
    division: Some(Division::I),
};

/// Resolve the rank for a point total.
///
/// Picks the highest threshold the total meets or exceeds.
pub fn rank_for_points(points: i64) -> Rank {
    THRESHOLDS
        .iter()
        .find(|(min, _, _)| points >= *min)
        .map_or(LOWEST_RANK, |&(_, tier, division)| Rank { tier, division })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rank(tier: Tier, division: Option<Division>) -> Rank {
        Rank { tier, division }
    }

    #[test]
    fn test_boundaries_resolve_to_higher_tier() {
        assert_eq!(rank_for_points(3000), rank(Tier::Master, None));
        assert_eq!(rank_for_points(2999), rank(Tier::Diamond, Some(Division::V)));
        assert_eq!(rank_for_points(1500), rank(Tier::Diamond, Some(Division::I)));
        assert_eq!(rank_for_points(1499), rank(Tier::Gold, Some(Division::V)));
        assert_eq!(rank_for_points(600), rank(Tier::Gold, Some(Division::I)));
        assert_eq!(rank_for_points(120), rank(Tier::Iron, Some(Division::II)));
        assert_eq!(rank_for_points(119), rank(Tier::Iron, Some(Division::I)));
        assert_eq!(rank_for_points(0), LOWEST_RANK);
    }

    #[test]
    fn test_negative_points_are_lowest() {
        assert_eq!(rank_for_points(-1), LOWEST_RANK);
        assert_eq!(rank_for_points(i64::MIN), LOWEST_RANK);
    }

    #[test]
    fn test_display() {
        assert_eq!(rank_for_points(5000).to_string(), "Master");
        assert_eq!(rank_for_points(1000).to_string(), "Gold III");
        assert_eq!(rank_for_points(5000).division_label(), "");
        assert_eq!(rank_for_points(1000).color(), "#FFD700");
    }

    #[test]
    fn test_thresholds_strictly_descending_and_ordered() {
        for pair in THRESHOLDS.windows(2) {
            let (hi, lo) = (pair[0], pair[1]);
            assert!(hi.0 > lo.0);
            assert!(rank(hi.1, hi.2) > rank(lo.1, lo.2));
        }
    }

    #[test]
    fn test_every_rank_is_reachable() {
        for (min, tier, division) in THRESHOLDS {
            assert_eq!(rank_for_points(min), rank(tier, division));
        }
    }

    proptest! {
        #[test]
        fn prop_rank_is_monotonic(a in -1000i64..5000, b in -1000i64..5000) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(rank_for_points(lo) <= rank_for_points(hi));
        }
    }
}
