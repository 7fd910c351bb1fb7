//! Plain-data per-room summary consumed by every planner.
//!
//! A `RoomSnapshot` is recomputed fresh each tick from whatever the agent
//! can currently see; nothing in it is authoritative beyond the tick it was
//! built on. The only piece that survives ticks is [`EnemyWindow`], which
//! the summarizer persists so threat assessment tolerates lost visibility.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One room as seen at a single tick.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub name: String,
    /// Tick the snapshot was built on.
    pub tick: u64,

    /// Controller level; 0 when unowned or no controller visible.
    pub level: u8,
    /// Controller is owned by us.
    pub owned: bool,
    /// Controller is reserved by us.
    pub reserved: bool,

    /// Energy currently in spawns + extensions.
    pub energy_available: u32,
    /// Energy capacity of spawns + extensions.
    pub energy_capacity: u32,
    /// Energy sitting in storage (0 when no storage).
    pub storage_energy: u32,
    pub has_storage: bool,
    pub has_terminal: bool,

    pub spawns: u32,
    pub towers: u32,
    pub links: u32,
    pub containers: u32,
    /// Harvestable sources in the room.
    pub sources: u32,
    /// Sources with a container adjacent (static-harvest ready).
    pub sources_with_container: u32,
    pub has_extractor: bool,
    /// Units of mineral left in the deposit.
    pub mineral_amount: u32,
    pub construction_sites: u32,

    /// Hostile creeps visible this tick.
    pub hostiles: u32,
    /// Hostile count per owner name, this tick.
    pub hostile_owners: BTreeMap<String, u32>,

    /// Rolling threat state, persisted across ticks.
    pub enemy_window: EnemyWindow,
}

/// Rolling enemy-presence window for one room.
///
/// Updated exactly once per room per tick by the summarizer and persisted
/// in durable memory, so a tick without visibility keeps the last known
/// threat picture instead of reporting peace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyWindow {
    /// Consecutive ticks with at least one hostile present.
    pub ticks_with_enemies: u32,
    /// Largest concurrent hostile count seen in the current window.
    pub max_hostiles: u32,
}

impl EnemyWindow {
    /// Fold one tick's observation into the window.
    pub fn observe(&mut self, hostiles: u32) {
        if hostiles > 0 {
            self.ticks_with_enemies += 1;
            self.max_hostiles = self.max_hostiles.max(hostiles);
        } else {
            self.ticks_with_enemies = 0;
            self.max_hostiles = 0;
        }
    }
}

impl RoomSnapshot {
    /// Fraction of spawn/extension capacity currently filled.
    pub fn energy_fraction(&self) -> f64 {
        if self.energy_capacity == 0 {
            return 0.0;
        }
        self.energy_available as f64 / self.energy_capacity as f64
    }

    /// Room is under active attack (hostiles seen this tick).
    pub fn under_attack(&self) -> bool {
        self.hostiles > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enemy_window_grows_and_resets() {
        let mut w = EnemyWindow::default();
        w.observe(2);
        w.observe(5);
        w.observe(1);
        assert_eq!(w.ticks_with_enemies, 3);
        assert_eq!(w.max_hostiles, 5);
        w.observe(0);
        assert_eq!(w, EnemyWindow::default());
    }

    #[test]
    fn energy_fraction_handles_empty_room() {
        let snap = RoomSnapshot::default();
        assert_eq!(snap.energy_fraction(), 0.0);
    }
}
