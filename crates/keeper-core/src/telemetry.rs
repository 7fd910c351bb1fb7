//! Periodic colony stats.
//!
//! Collection is best-effort and read-only: a failing sink never
//! affects the tick.

use std::collections::BTreeMap;

use keeper_logic::demand::desired_in_room;
use keeper_logic::repair::RepairClass;
use keeper_logic::roles::Role;
use serde::Serialize;

use crate::context::TickCtx;
use crate::memory::Memory;
use crate::ratchet::floor_of;
use crate::summarize::summarize;
use crate::world::GameWorld;

/// One room's numbers for a stats interval.
#[derive(Debug, Clone, Serialize)]
pub struct RoomStats {
    pub level: u8,
    pub energy_available: u32,
    pub energy_capacity: u32,
    pub storage_energy: u32,
    pub hostiles: u32,
    pub creeps: u32,
    /// Desired counts for room-scoped roles with nonzero demand.
    pub desired: BTreeMap<String, u32>,
    pub rampart_floor: Option<u32>,
    pub wall_floor: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TickStats {
    pub tick: u64,
    pub total_creeps: u32,
    pub rooms: BTreeMap<String, RoomStats>,
}

/// Destination for periodic stats.
pub trait StatsSink {
    fn record(&mut self, stats: &TickStats);
}

/// Default sink: one structured log line per interval.
pub struct LogSink;

impl StatsSink for LogSink {
    fn record(&mut self, stats: &TickStats) {
        match serde_json::to_string(stats) {
            Ok(json) => log::info!("stats {}", json),
            Err(e) => log::warn!("stats serialization failed: {}", e),
        }
    }
}

pub fn collect(world: &GameWorld, memory: &mut Memory, ctx: &mut TickCtx) -> TickStats {
    let mut rooms = BTreeMap::new();
    for room in world.my_rooms() {
        let snap = summarize(world, memory, ctx, &room);
        let mut desired = BTreeMap::new();
        for role in Role::ALL {
            let want = desired_in_room(role, &snap);
            if want > 0 {
                desired.insert(role.info().prefix.to_string(), want);
            }
        }
        let creeps = world
            .my_creeps()
            .iter()
            .filter(|e| {
                world
                    .creep_data(**e)
                    .is_some_and(|c| c.home_room == room)
            })
            .count() as u32;
        rooms.insert(
            room.clone(),
            RoomStats {
                level: snap.level,
                energy_available: snap.energy_available,
                energy_capacity: snap.energy_capacity,
                storage_energy: snap.storage_energy,
                hostiles: snap.hostiles,
                creeps,
                desired,
                rampart_floor: floor_of(memory, &room, RepairClass::Rampart).map(|s| s.floor),
                wall_floor: floor_of(memory, &room, RepairClass::Wall).map(|s| s.floor),
            },
        );
    }
    TickStats {
        tick: ctx.tick,
        total_creeps: world.my_creeps().len() as u32,
        rooms,
    }
}
