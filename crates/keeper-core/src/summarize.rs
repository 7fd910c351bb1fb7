//! Room summarizer.
//!
//! Builds one [`RoomSnapshot`] per room per tick and memoizes it in the
//! tick context; every planner that asks again the same tick gets the
//! same `Rc`. The enemy-presence window is folded exactly once per room
//! per tick (on first build) and persisted in durable memory so threat
//! state survives visibility gaps.

use std::rc::Rc;

use keeper_logic::snapshot::{EnemyWindow, RoomSnapshot};

use crate::components::{Pos, StructureKind};
use crate::context::TickCtx;
use crate::memory::Memory;
use crate::world::GameWorld;

/// Summarize `room`, memoized for the tick.
pub fn summarize(
    world: &GameWorld,
    memory: &mut Memory,
    ctx: &mut TickCtx,
    room: &str,
) -> Rc<RoomSnapshot> {
    if let Some(snap) = ctx.snapshots.get(room) {
        return Rc::clone(snap);
    }
    let snap = Rc::new(build(world, memory, ctx.tick, room));
    ctx.snapshots.insert(room.to_string(), Rc::clone(&snap));
    snap
}

fn build(world: &GameWorld, memory: &mut Memory, tick: u64, room: &str) -> RoomSnapshot {
    let mut snap = RoomSnapshot {
        name: room.to_string(),
        tick,
        ..Default::default()
    };

    if let Some(entity) = world.controller_in(room) {
        if let Ok(c) = world.ecs.get::<&crate::components::Controller>(entity) {
            snap.level = c.level;
            snap.owned = c.owner.as_deref() == Some(world.me.as_str());
            snap.reserved = c.reserved_by.as_deref() == Some(world.me.as_str());
        }
    }

    let mut container_positions: Vec<Pos> = Vec::new();
    for entity in world.structures_in(room) {
        let Some(s) = world.structure_data(entity) else { continue };
        match s.kind {
            StructureKind::Spawn => snap.spawns += 1,
            StructureKind::Tower => snap.towers += 1,
            StructureKind::Link => snap.links += 1,
            StructureKind::Container => {
                snap.containers += 1;
                if let Some(pos) = world.pos_of(entity) {
                    container_positions.push(pos);
                }
            }
            StructureKind::Storage => {
                snap.has_storage = true;
                snap.storage_energy += s.store.energy();
            }
            StructureKind::Terminal => snap.has_terminal = true,
            StructureKind::Extractor => snap.has_extractor = true,
            _ => {}
        }
    }

    let (available, capacity) = world.room_energy(room);
    snap.energy_available = available;
    snap.energy_capacity = capacity;

    for entity in world.sources_in(room) {
        snap.sources += 1;
        if let Some(pos) = world.pos_of(entity) {
            if container_positions.iter().any(|c| c.is_near(&pos)) {
                snap.sources_with_container += 1;
            }
        }
    }

    for (_, (pos, m)) in world.ecs.query::<(&Pos, &crate::components::MineralNode)>().iter() {
        if pos.room == room {
            snap.mineral_amount += m.amount;
        }
    }

    snap.construction_sites = world.sites_in(room).len() as u32;

    for entity in world.hostiles_in(room) {
        snap.hostiles += 1;
        if let Ok(h) = world.ecs.get::<&crate::components::Hostile>(entity) {
            *snap.hostile_owners.entry(h.owner.clone()).or_insert(0) += 1;
        }
    }

    // Fold this tick's observation into the persisted window.
    let path = ["rooms", room, "enemy_window"];
    let mut window: EnemyWindow = memory.get_as(&path).unwrap_or_default();
    window.observe(snap.hostiles);
    if window != EnemyWindow::default() || memory.get(&path).is_some() {
        match serde_json::to_value(&window) {
            Ok(v) => memory.set(&path, v),
            Err(e) => log::warn!("room {}: enemy window not persisted: {}", room, e),
        }
    }
    if snap.hostiles > 0 && window.ticks_with_enemies == 1 {
        log::debug!("room {}: hostiles sighted ({})", room, snap.hostiles);
    }
    snap.enemy_window = window;

    snap
}
