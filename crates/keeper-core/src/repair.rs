//! The repair board: prioritized repair queue with exclusive claims.
//!
//! Rebuilt at most every few ticks from the world plus the hysteresis
//! rules in `keeper-logic`; between rebuilds the flagged set is stable so
//! repairers keep their targets. Claims are bidirectional: the board
//! entry names the repairer and the creep's memory names the structure.
//! A periodic cross-check detects and clears any disagreement between
//! the two sides, so a crash between the two writes self-heals instead
//! of wedging a structure.

use std::collections::HashMap;

use keeper_logic::config::Config;
use keeper_logic::repair::{band_for, needs_repair_transition, RepairClass, RepairKey};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::components::{Pos, Structure};
use crate::flags::MarkerSet;
use crate::memory::Memory;
use crate::ratchet::floor_of;
use crate::world::GameWorld;

/// One tracked structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairEntry {
    pub room: String,
    pub class: RepairClass,
    /// Durable hysteresis flag.
    pub flagged: bool,
    /// Exclusive claimant (creep name), mirrored in that creep's memory.
    pub repairer: Option<String>,
}

/// Prioritized repair queue, persisted across ticks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepairBoard {
    entries: HashMap<u64, RepairEntry>,
    /// Flagged structure ids per room, in repair priority order.
    queues: HashMap<String, Vec<u64>>,
    last_rebuild: Option<u64>,
}

impl RepairBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(&self, id: u64) -> Option<&RepairEntry> {
        self.entries.get(&id)
    }

    /// Rebuild flags and queues if the rebuild interval has elapsed.
    pub fn maybe_rebuild(
        &mut self,
        world: &GameWorld,
        memory: &Memory,
        markers: &MarkerSet,
        cfg: &Config,
        tick: u64,
    ) {
        if let Some(last) = self.last_rebuild {
            if tick.saturating_sub(last) < cfg.repair_rebuild_interval {
                return;
            }
        }
        self.rebuild(world, memory, markers, cfg, tick);
    }

    fn rebuild(
        &mut self,
        world: &GameWorld,
        memory: &Memory,
        markers: &MarkerSet,
        cfg: &Config,
        tick: u64,
    ) {
        self.last_rebuild = Some(tick);
        let mut seen: Vec<u64> = Vec::new();
        let mut keyed: HashMap<String, Vec<(RepairKey, u64)>> = HashMap::new();

        for (entity, (pos, s)) in world.ecs.query::<(&Pos, &Structure)>().iter() {
            let Some(id) = world.id_of(entity) else { continue };
            seen.push(id);
            if markers.no_repair.contains(&(pos.room.clone(), pos.x, pos.y)) {
                self.entries.remove(&id);
                continue;
            }
            let class = s.kind.repair_class();
            let floor = floor_of(memory, &pos.room, class)
                .map(|s| s.floor)
                .unwrap_or(cfg.ratchet_min);
            let band = band_for(class, floor, cfg.ratchet_repair_band);

            let entry = self.entries.entry(id).or_insert_with(|| RepairEntry {
                room: pos.room.clone(),
                class,
                flagged: false,
                repairer: None,
            });
            entry.room = pos.room.clone();
            entry.flagged = needs_repair_transition(entry.flagged, s.hits, s.hits_max, band);
            if entry.flagged {
                keyed
                    .entry(pos.room.clone())
                    .or_default()
                    .push((RepairKey::new(class, s.hits, s.hits_max), id));
            }
        }

        // Forget structures that no longer exist.
        seen.sort_unstable();
        self.entries.retain(|id, _| seen.binary_search(id).is_ok());

        self.queues.clear();
        for (room, mut ids) in keyed {
            ids.sort();
            self.queues.insert(room, ids.into_iter().map(|(_, id)| id).collect());
        }
    }

    /// Highest-priority flagged, unclaimed structure in `room`.
    pub fn next_unclaimed(&self, room: &str) -> Option<u64> {
        self.queues.get(room)?.iter().copied().find(|id| {
            self.entries
                .get(id)
                .is_some_and(|e| e.flagged && e.repairer.is_none())
        })
    }

    /// Flagged structure ids for a room, claimed or not.
    pub fn queue(&self, room: &str) -> &[u64] {
        self.queues.get(room).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Claim a structure for `creep`. Fails if already claimed by someone
    /// else. Writes both sides of the mapping.
    pub fn claim(&mut self, id: u64, creep: &str, memory: &mut Memory) -> bool {
        let Some(entry) = self.entries.get_mut(&id) else { return false };
        match &entry.repairer {
            Some(existing) if existing != creep => return false,
            _ => {}
        }
        entry.repairer = Some(creep.to_string());
        memory.set(&["creeps", creep, "repairing"], json!(id));
        true
    }

    /// The structure `creep` currently holds a claim on, if the claim is
    /// still coherent and flagged.
    pub fn claimed_by(&self, creep: &str, memory: &Memory) -> Option<u64> {
        let id = memory.get(&["creeps", creep, "repairing"])?.as_u64()?;
        let entry = self.entries.get(&id)?;
        if entry.flagged && entry.repairer.as_deref() == Some(creep) {
            Some(id)
        } else {
            None
        }
    }

    /// Release whatever claim `creep` holds (used on completion and on
    /// death).
    pub fn release(&mut self, creep: &str, memory: &mut Memory) {
        for entry in self.entries.values_mut() {
            if entry.repairer.as_deref() == Some(creep) {
                entry.repairer = None;
            }
        }
        memory.delete(&["creeps", creep, "repairing"]);
    }

    /// Verify the claim mapping in both directions, clearing stale sides.
    /// Also drops entries whose structure has vanished between rebuilds.
    pub fn cross_check(&mut self, world: &GameWorld, memory: &mut Memory) {
        let live_creeps: Vec<String> = world
            .my_creeps()
            .into_iter()
            .filter_map(|e| world.creep_data(e))
            .map(|c| c.name)
            .collect();

        self.entries.retain(|id, entry| {
            if world.entity(*id).is_none() {
                if let Some(name) = &entry.repairer {
                    log::warn!("repair target {} vanished; releasing {}", id, name);
                    memory.delete(&["creeps", name, "repairing"]);
                }
                return false;
            }
            true
        });

        for (id, entry) in self.entries.iter_mut() {
            let Some(name) = entry.repairer.clone() else { continue };
            let alive = live_creeps.iter().any(|c| c == &name);
            let agreed = memory.get(&["creeps", &name, "repairing"]).and_then(|v| v.as_u64())
                == Some(*id);
            if !alive || !agreed {
                log::warn!(
                    "repair claim on {} by {} is stale (alive: {}, agreed: {})",
                    id,
                    name,
                    alive,
                    agreed
                );
                entry.repairer = None;
            }
        }

        for creep in memory.keys(&["creeps"]) {
            let Some(id) = memory.get(&["creeps", &creep, "repairing"]).and_then(|v| v.as_u64())
            else {
                continue;
            };
            let coherent = self
                .entries
                .get(&id)
                .is_some_and(|e| e.repairer.as_deref() == Some(creep.as_str()));
            if !coherent {
                log::warn!("creep {} claims {} but the board disagrees", creep, id);
                memory.delete(&["creeps", &creep, "repairing"]);
            }
        }
    }

    /// Death hook: free any claim the named creep held.
    pub fn creep_died(&mut self, creep: &str, memory: &mut Memory) {
        self.release(creep, memory);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::StructureKind;
    use crate::world::GameWorld;

    fn damaged_world() -> (GameWorld, u64, u64) {
        let mut w = GameWorld::new("keeper");
        let road = w.add_structure(StructureKind::Road, Pos::new("alpha", 5, 5), None);
        let spawn = w.add_structure(StructureKind::Spawn, Pos::new("alpha", 6, 5), Some("keeper"));
        // Road at 50%, spawn at 60%: both inside their start bands.
        set_hits(&mut w, road, 2_500);
        set_hits(&mut w, spawn, 3_000);
        (w, road, spawn)
    }

    fn set_hits(w: &mut GameWorld, id: u64, hits: u32) {
        let entity = w.entity(id).unwrap();
        if let Ok(s) = w.ecs.query_one_mut::<&mut Structure>(entity) {
            s.hits = hits;
        }
    }

    fn rebuild(board: &mut RepairBoard, w: &GameWorld, memory: &Memory, tick: u64) {
        board.maybe_rebuild(w, memory, &MarkerSet::default(), &Config::default(), tick);
    }

    #[test]
    fn spawn_outranks_road() {
        let (w, road, spawn) = damaged_world();
        let memory = Memory::new();
        let mut board = RepairBoard::new();
        rebuild(&mut board, &w, &memory, 1);
        assert_eq!(board.queue("alpha"), &[spawn, road]);
        assert_eq!(board.next_unclaimed("alpha"), Some(spawn));
    }

    #[test]
    fn claims_are_exclusive_and_bidirectional() {
        let (w, _, spawn) = damaged_world();
        let mut memory = Memory::new();
        let mut board = RepairBoard::new();
        rebuild(&mut board, &w, &memory, 1);

        assert!(board.claim(spawn, "repairer0001", &mut memory));
        assert!(!board.claim(spawn, "repairer0002", &mut memory));
        assert_eq!(board.claimed_by("repairer0001", &memory), Some(spawn));
        assert_ne!(board.next_unclaimed("alpha"), Some(spawn));

        board.release("repairer0001", &mut memory);
        assert_eq!(board.claimed_by("repairer0001", &memory), None);
        assert_eq!(board.next_unclaimed("alpha"), Some(spawn));
    }

    #[test]
    fn hysteresis_keeps_flag_until_band_end() {
        let (mut w, road, spawn) = damaged_world();
        let memory = Memory::new();
        let mut board = RepairBoard::new();
        rebuild(&mut board, &w, &memory, 1);

        // Repair the road to 80%: inside the band, stays flagged.
        set_hits(&mut w, road, 4_000);
        rebuild(&mut board, &w, &memory, 10);
        assert!(board.entry(road).unwrap().flagged);

        // At 95% the flag clears; dropping to 80% does not re-flag.
        set_hits(&mut w, road, 4_750);
        rebuild(&mut board, &w, &memory, 20);
        assert!(!board.entry(road).unwrap().flagged);
        set_hits(&mut w, road, 4_000);
        rebuild(&mut board, &w, &memory, 30);
        assert!(!board.entry(road).unwrap().flagged);
        let _ = spawn;
    }

    #[test]
    fn rebuild_respects_the_interval() {
        let (mut w, road, _) = damaged_world();
        let memory = Memory::new();
        let mut board = RepairBoard::new();
        rebuild(&mut board, &w, &memory, 10);

        // Fully repair the road; one tick later the board has not looked.
        set_hits(&mut w, road, 5_000);
        rebuild(&mut board, &w, &memory, 11);
        assert!(board.entry(road).unwrap().flagged);
        rebuild(&mut board, &w, &memory, 13);
        assert!(!board.entry(road).unwrap().flagged);
    }

    #[test]
    fn no_repair_marker_suppresses_the_structure() {
        let (w, road, spawn) = damaged_world();
        let memory = Memory::new();
        let mut board = RepairBoard::new();
        let mut markers = MarkerSet::default();
        markers.no_repair.insert(("alpha".to_string(), 5, 5));
        board.maybe_rebuild(&w, &memory, &markers, &Config::default(), 1);
        assert!(board.entry(road).is_none());
        assert_eq!(board.queue("alpha"), &[spawn]);
    }

    #[test]
    fn cross_check_clears_stale_sides() {
        let (w, _, spawn) = damaged_world();
        let mut memory = Memory::new();
        let mut board = RepairBoard::new();
        rebuild(&mut board, &w, &memory, 1);

        // Claim by a creep that does not exist.
        assert!(board.claim(spawn, "ghost", &mut memory));
        board.cross_check(&w, &mut memory);
        assert_eq!(board.entry(spawn).unwrap().repairer, None);
        assert_eq!(memory.get(&["creeps", "ghost", "repairing"]), None);

        // Memory claims with no matching board entry.
        memory.set(&["creeps", "liar", "repairing"], json!(spawn));
        board.cross_check(&w, &mut memory);
        assert_eq!(memory.get(&["creeps", "liar", "repairing"]), None);
    }

    #[test]
    fn death_releases_the_claim() {
        let (w, _, spawn) = damaged_world();
        let mut memory = Memory::new();
        let mut board = RepairBoard::new();
        rebuild(&mut board, &w, &memory, 1);
        assert!(board.claim(spawn, "repairer0001", &mut memory));
        board.creep_died("repairer0001", &mut memory);
        assert_eq!(board.next_unclaimed("alpha"), Some(spawn));
    }
}
