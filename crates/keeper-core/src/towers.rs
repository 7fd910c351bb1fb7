//! Tower control.
//!
//! Priorities per tower: shoot hostiles, patch critically low ramparts,
//! heal hurt creeps, then discretionary road repair when energy is
//! comfortable. Towers in the same room spread across targets instead
//! of piling onto one.

use std::collections::HashSet;

use keeper_logic::config::Config;
use keeper_logic::constants::TOWER_ACTION_COST;

use crate::components::{Creep, Pos, StructureKind};
use crate::context::TickCtx;
use crate::flags::markers;
use crate::world::GameWorld;

pub fn run(world: &mut GameWorld, ctx: &mut TickCtx, cfg: &Config) {
    let no_repair = markers(world, ctx).no_repair.clone();

    for room in world.my_rooms() {
        let mut engaged: HashSet<hecs::Entity> = HashSet::new();
        for tower in world.structures_of_kind(&room, StructureKind::Tower) {
            let Some(tower_data) = world.structure_data(tower) else { continue };
            if tower_data.store.energy() < TOWER_ACTION_COST {
                continue;
            }
            let Some(tower_pos) = world.pos_of(tower) else { continue };

            // 1. Hostiles.
            let hostiles: Vec<hecs::Entity> = world
                .hostiles_in(&room)
                .into_iter()
                .filter(|h| !engaged.contains(h))
                .collect();
            if let Some(target) = world.closest(&tower_pos, &hostiles) {
                engaged.insert(target);
                if let Err(e) = world.tower_attack(tower, target) {
                    log::warn!("room {}: tower attack failed: {}", room, e);
                }
                continue;
            }

            // 2. Ramparts about to crumble.
            let rampart = world
                .structures_of_kind(&room, StructureKind::Rampart)
                .into_iter()
                .filter(|e| !engaged.contains(e))
                .filter(|e| {
                    world
                        .pos_of(*e)
                        .map_or(true, |p| !no_repair.contains(&(p.room.clone(), p.x, p.y)))
                })
                .filter_map(|e| world.structure_data(e).map(|s| (e, s.hits)))
                .filter(|(_, hits)| *hits < cfg.tower_rampart_floor)
                .min_by_key(|(_, hits)| *hits)
                .map(|(e, _)| e);
            if let Some(target) = rampart {
                engaged.insert(target);
                let _ = world.tower_repair(tower, target);
                continue;
            }

            // 3. Hurt creeps.
            let hurt: Vec<hecs::Entity> = world
                .my_creeps()
                .into_iter()
                .filter(|e| !engaged.contains(e))
                .filter(|e| {
                    world.pos_of(*e).map_or(false, |p| p.room == room)
                        && world
                            .ecs
                            .get::<&Creep>(*e)
                            .map(|c| c.hits < c.hits_max)
                            .unwrap_or(false)
                })
                .collect();
            if let Some(target) = world.closest(&tower_pos, &hurt) {
                engaged.insert(target);
                let _ = world.tower_heal(tower, target);
                continue;
            }

            // 4. Roads, only with energy to spare and not every tick.
            let comfortable =
                tower_data.energy_fraction() > cfg.tower_energy_reserve && world.tick % 3 != 0;
            if !comfortable {
                continue;
            }
            let roads: Vec<hecs::Entity> = world
                .structures_of_kind(&room, StructureKind::Road)
                .into_iter()
                .filter(|e| !engaged.contains(e))
                .filter(|e| {
                    world
                        .pos_of(*e)
                        .map_or(true, |p| !no_repair.contains(&(p.room.clone(), p.x, p.y)))
                })
                .filter(|e| {
                    world
                        .structure_data(*e)
                        .map(|s| s.hits_fraction() < 0.95)
                        .unwrap_or(false)
                })
                .collect();
            if let Some(target) = world.closest(&tower_pos, &roads) {
                engaged.insert(target);
                let _ = world.tower_repair(tower, target);
            }
        }
    }
}
