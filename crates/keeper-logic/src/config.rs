//! Runtime tuning knobs for the colony agent.
//!
//! Everything here is a cadence, debounce window, or threshold an operator
//! might plausibly adjust. Defaults match long-running colony experience;
//! the harness overrides individual fields to make scenarios fast.

use serde::{Deserialize, Serialize};

/// Agent-wide configuration. `Default` gives the production values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Ticks between spawn allocation scans.
    pub spawn_scan_interval: u64,
    /// Ticks between repair queue rebuilds.
    pub repair_rebuild_interval: u64,
    /// Ticks between repair claim cross-checks.
    pub cross_check_interval: u64,
    /// Ticks between telemetry collections.
    pub stats_interval: u64,

    /// Ticks between emergency staffing checks.
    pub emergency_check_after: u64,
    /// Sustained shortfall ticks before an emergency spawn is forced.
    pub emergency_escalate_after: u64,

    /// Ticks between ratchet evaluation passes.
    pub ratchet_check_interval: u64,
    /// Minimum ticks between two raises of the same floor.
    pub ratchet_cooldown: u64,
    /// Hits added per raise.
    pub ratchet_delta: u32,
    /// Raised floors are rounded down to a multiple of this.
    pub ratchet_rounding: u32,
    /// Floor a fresh ratchet starts from when structures are weaker.
    pub ratchet_min: u32,
    /// Floors never rise above this without a marker override.
    pub ratchet_max: u32,
    /// Hysteresis width above the floor at which repair stops.
    pub ratchet_repair_band: u32,

    /// Stored energy a room keeps before funding multi-room roles.
    pub multi_room_energy_reserve: u32,
    /// Bootstrappers maintained per spawnless owned room.
    pub bootstrap_desired: u32,

    /// Consecutive ticks a creep may squat on a container.
    pub max_standing_ticks: u32,
    /// Ticks a creep keeps retreating after last seeing an enemy.
    pub retreat_ticks: u32,
    /// Creeps this close to expiry go recycle themselves.
    pub despawn_below_ttl: u32,

    /// Links do not fire below this stored energy.
    pub link_min_transfer: u32,
    /// Towers stop road maintenance below this energy fraction.
    pub tower_energy_reserve: f64,
    /// Ramparts below this are always tower-repaired first.
    pub tower_rampart_floor: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spawn_scan_interval: 3,
            repair_rebuild_interval: 3,
            cross_check_interval: 100,
            stats_interval: 100,
            emergency_check_after: 3,
            emergency_escalate_after: 300,
            ratchet_check_interval: 100,
            ratchet_cooldown: 500,
            ratchet_delta: 20_000,
            ratchet_rounding: 1_000,
            ratchet_min: 250_000,
            ratchet_max: 10_000_000,
            ratchet_repair_band: 30_000,
            multi_room_energy_reserve: 20_000,
            bootstrap_desired: 6,
            max_standing_ticks: 10,
            retreat_ticks: 10,
            despawn_below_ttl: 30,
            link_min_transfer: 100,
            tower_energy_reserve: 0.5,
            tower_rampart_floor: 10_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = Config::default();
        assert!(cfg.emergency_escalate_after > cfg.emergency_check_after);
        assert!(cfg.ratchet_cooldown >= cfg.ratchet_check_interval);
        assert_eq!(cfg.ratchet_delta % cfg.ratchet_rounding, 0);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: Config = serde_json::from_str(r#"{"spawn_scan_interval": 1}"#).unwrap();
        assert_eq!(cfg.spawn_scan_interval, 1);
        assert_eq!(cfg.ratchet_delta, Config::default().ratchet_delta);
    }
}
