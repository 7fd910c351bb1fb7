//! Repair classes, priority ordering, and hysteresis transitions.
//!
//! Each repairable structure class has a hysteresis band: repair starts
//! when hits drop below the start threshold and the structure stays
//! flagged until hits reach the end threshold. The band prevents repair
//! targets from flickering in and out of the queue as workers chip at
//! them.
//!
//! Walls and ramparts use absolute thresholds driven by the per-room
//! ratchet floor; everything else uses hit fractions.

use serde::{Deserialize, Serialize};

/// Repairable structure classes, in repair priority order.
///
/// `Rampart` and `Wall` share the lowest priority tier and compete by
/// absolute hits rather than hit fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RepairClass {
    Spawn,
    Tower,
    Storage,
    Terminal,
    Lab,
    Extractor,
    Extension,
    Link,
    Container,
    Road,
    Rampart,
    Wall,
}

impl RepairClass {
    pub const ALL: [RepairClass; 12] = [
        RepairClass::Spawn,
        RepairClass::Tower,
        RepairClass::Storage,
        RepairClass::Terminal,
        RepairClass::Lab,
        RepairClass::Extractor,
        RepairClass::Extension,
        RepairClass::Link,
        RepairClass::Container,
        RepairClass::Road,
        RepairClass::Rampart,
        RepairClass::Wall,
    ];

    /// Priority tier; lower repairs first. Rampart and Wall tie.
    pub fn priority(self) -> u8 {
        match self {
            RepairClass::Spawn => 0,
            RepairClass::Tower => 1,
            RepairClass::Storage => 2,
            RepairClass::Terminal => 3,
            RepairClass::Lab => 4,
            RepairClass::Extractor => 5,
            RepairClass::Extension => 6,
            RepairClass::Link => 7,
            RepairClass::Container => 8,
            RepairClass::Road => 9,
            RepairClass::Rampart | RepairClass::Wall => 10,
        }
    }

    /// Tied-tier classes order by absolute hits instead of hit fraction.
    pub fn orders_by_absolute_hits(self) -> bool {
        matches!(self, RepairClass::Rampart | RepairClass::Wall)
    }

    /// Fortifications share one ratchet; raising either floor consults
    /// the other.
    pub fn ratchet_partner(self) -> Option<RepairClass> {
        match self {
            RepairClass::Rampart => Some(RepairClass::Wall),
            RepairClass::Wall => Some(RepairClass::Rampart),
            _ => None,
        }
    }
}

/// Start/end hysteresis band for one class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Band {
    /// Thresholds as fractions of max hits.
    Fraction { start: f64, end: f64 },
    /// Thresholds as absolute hits (fortifications under ratchet).
    Absolute { start: u32, end: u32 },
}

/// Hysteresis band for a class. `fort_floor` is the current ratchet floor
/// for ramparts/walls; `fort_band` is the width repaired above it.
pub fn band_for(class: RepairClass, fort_floor: u32, fort_band: u32) -> Band {
    match class {
        RepairClass::Container | RepairClass::Road => Band::Fraction { start: 0.66, end: 0.95 },
        RepairClass::Rampart | RepairClass::Wall => Band::Absolute {
            start: fort_floor,
            end: fort_floor.saturating_add(fort_band),
        },
        _ => Band::Fraction { start: 0.9, end: 1.0 },
    }
}

/// One hysteresis step: given the persisted flag and current hits, decide
/// whether the structure needs repair after this tick.
pub fn needs_repair_transition(flagged: bool, hits: u32, hits_max: u32, band: Band) -> bool {
    let (start_hit, end_hit) = match band {
        Band::Fraction { start, end } => (
            (hits_max as f64 * start) as u32,
            (hits_max as f64 * end) as u32,
        ),
        Band::Absolute { start, end } => (start, end.min(hits_max)),
    };

    if flagged {
        hits < end_hit
    } else {
        hits < start_hit
    }
}

/// Sort key for one flagged structure. Lexicographic ordering of these
/// yields the repair queue: priority tier first, then damage severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RepairKey {
    tier: u8,
    /// Fraction in parts-per-million for fraction classes, absolute hits
    /// for the tied fortification tier. Smaller repairs first either way.
    severity: u64,
}

impl RepairKey {
    pub fn new(class: RepairClass, hits: u32, hits_max: u32) -> Self {
        let severity = if class.orders_by_absolute_hits() {
            hits as u64
        } else if hits_max == 0 {
            u64::MAX
        } else {
            (hits as u64) * 1_000_000 / hits_max as u64
        };
        Self { tier: class.priority(), severity }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hysteresis_round_trip_has_no_oscillation() {
        let band = band_for(RepairClass::Road, 0, 0);
        // Below start: turns on.
        assert!(needs_repair_transition(false, 6_000, 10_000, band));
        // Inside the band: keeps whatever state it had.
        assert!(needs_repair_transition(true, 8_000, 10_000, band));
        assert!(!needs_repair_transition(false, 8_000, 10_000, band));
        // At end: turns off.
        assert!(!needs_repair_transition(true, 9_500, 10_000, band));
    }

    #[test]
    fn road_band_is_66_95() {
        let band = band_for(RepairClass::Road, 0, 0);
        assert!(needs_repair_transition(false, 6_599, 10_000, band));
        assert!(!needs_repair_transition(false, 6_600, 10_000, band));
        assert!(needs_repair_transition(true, 9_499, 10_000, band));
        assert!(!needs_repair_transition(true, 9_500, 10_000, band));
    }

    #[test]
    fn fortifications_follow_the_floor() {
        let band = band_for(RepairClass::Wall, 250_000, 30_000);
        assert!(needs_repair_transition(false, 249_999, 300_000_000, band));
        assert!(!needs_repair_transition(false, 250_000, 300_000_000, band));
        // Once flagged, repaired up to floor + band.
        assert!(needs_repair_transition(true, 270_000, 300_000_000, band));
        assert!(!needs_repair_transition(true, 280_000, 300_000_000, band));
    }

    #[test]
    fn fortification_band_clamps_to_max_hits() {
        let band = band_for(RepairClass::Rampart, 250_000, 30_000);
        // A small rampart can never reach the floor; it stays flagged
        // until full.
        assert!(needs_repair_transition(true, 90_000, 100_000, band));
        assert!(!needs_repair_transition(true, 100_000, 100_000, band));
    }

    #[test]
    fn queue_orders_tiers_then_severity() {
        let spawn = RepairKey::new(RepairClass::Spawn, 4_000, 5_000);
        let road_bad = RepairKey::new(RepairClass::Road, 1_000, 10_000);
        let road_ok = RepairKey::new(RepairClass::Road, 8_000, 10_000);
        assert!(spawn < road_bad);
        assert!(road_bad < road_ok);
    }

    #[test]
    fn fortification_tier_orders_by_absolute_hits() {
        // A 10% wall at 30M max has more absolute hits than a 50%
        // rampart at 1M max; the rampart repairs first.
        let wall = RepairKey::new(RepairClass::Wall, 3_000_000, 30_000_000);
        let rampart = RepairKey::new(RepairClass::Rampart, 500_000, 1_000_000);
        assert!(rampart < wall);
    }
}
