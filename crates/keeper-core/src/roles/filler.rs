//! Keeps spawns, extensions, towers, links and the terminal topped up
//! from storage.
//!
//! When a room runs more than one filler, the newest one works a
//! "secondary" priority ladder so the pair does not fight over the
//! same targets: the primary feeds the spawn economy first, the
//! secondary stocks towers and the terminal first.

use keeper_logic::config::Config;
use keeper_logic::roles::Role;

use crate::components::{Creep, StructureKind};
use crate::context::TickCtx;
use crate::links;
use crate::memory::Memory;
use crate::world::GameWorld;

use super::toolkit::{self, GatherOpts};
use super::RoleResult;

/// Storage reserve below which source links are left to drain; the
/// relay economy refills them on its own once storage recovers.
const MIN_STORAGE_FOR_LINKS: u32 = 15_000;
/// Room energy on hand before the terminal gets its first trickle.
const MIN_AVAIL_FOR_TERMINAL: u32 = 10_000;
/// Energy on hand before low towers jump the queue outside combat.
const MIN_AVAIL_FOR_TOWER_PRIORITY: u32 = 3_000;

const PULL: GatherOpts = GatherOpts {
    withdraw: &[StructureKind::Storage, StructureKind::Container],
    harvest: false,
    pickup: false,
};

pub(super) fn run(
    world: &mut GameWorld,
    memory: &mut Memory,
    ctx: &mut TickCtx,
    cfg: &Config,
    entity: hecs::Entity,
    creep: &Creep,
) -> RoleResult {
    if toolkit::retreat_from_enemies(world, memory, cfg, entity, creep)? {
        return Ok(());
    }
    if toolkit::needs_energy(memory, creep) {
        return toolkit::gather_energy(world, memory, ctx, entity, creep, PULL);
    }
    let Some(pos) = world.pos_of(entity) else { return Ok(()) };
    let room = pos.room;

    // Towers first when it matters: under attack, or nearly dry while
    // the spawn economy still has a cushion for an emergency spawn.
    if !world.hostiles_in(&room).is_empty()
        && toolkit::deliver_structure(world, entity, &[StructureKind::Tower], 0.75)?
    {
        return Ok(());
    }
    let (avail, _) = world.room_energy(&room);
    if avail >= MIN_AVAIL_FOR_TOWER_PRIORITY
        && toolkit::deliver_structure(world, entity, &[StructureKind::Tower], 0.10)?
    {
        return Ok(());
    }

    let stored = world.storage_energy(&room);
    let fillable_link = |w: &GameWorld, e: hecs::Entity| {
        w.id_of(e)
            .is_some_and(|id| links::is_source_link(memory, id) && !links::is_nofill(memory, id))
    };

    let filled = if !secondary_in(world, &room, creep) {
        toolkit::deliver_structure(
            world,
            entity,
            &[StructureKind::Spawn, StructureKind::Extension],
            1.0,
        )? || toolkit::deliver_structure(world, entity, &[StructureKind::Tower], 0.5)?
            || (stored > MIN_STORAGE_FOR_LINKS
                && toolkit::deliver_structure_where(
                    world,
                    entity,
                    &[StructureKind::Link],
                    1.0,
                    &fillable_link,
                )?)
            || (avail > MIN_AVAIL_FOR_TERMINAL
                && toolkit::deliver_structure(world, entity, &[StructureKind::Terminal], 0.0333)?)
            || toolkit::deliver_structure(world, entity, &[StructureKind::Tower], 0.85)?
            || toolkit::deliver_structure(world, entity, &[StructureKind::Terminal], 0.05)?
            || toolkit::deliver_structure_where(
                world,
                entity,
                &[StructureKind::Link],
                1.0,
                &fillable_link,
            )?
            || toolkit::deliver_structure(world, entity, &[StructureKind::Lab], 1.0)?
    } else {
        toolkit::deliver_structure(world, entity, &[StructureKind::Tower], 0.5)?
            || toolkit::deliver_structure(world, entity, &[StructureKind::Terminal], 0.10)?
            || toolkit::deliver_structure(world, entity, &[StructureKind::Tower], 0.85)?
            || toolkit::deliver_structure(
                world,
                entity,
                &[StructureKind::Spawn, StructureKind::Extension],
                1.0,
            )?
            || toolkit::deliver_structure_where(
                world,
                entity,
                &[StructureKind::Link],
                1.0,
                &fillable_link,
            )?
            || toolkit::deliver_structure(world, entity, &[StructureKind::Lab], 1.0)?
    };

    if !filled {
        // Everything topped up; clear the container approaches.
        let _ = world.random_step(entity);
    }
    Ok(())
}

/// The last-named filler in a multi-filler room runs the secondary
/// ladder. Names are sequential, so this is the newest one.
fn secondary_in(world: &GameWorld, room: &str, creep: &Creep) -> bool {
    let mut fellows: Vec<String> = world
        .creeps_of_role(Role::Filler)
        .into_iter()
        .filter(|e| world.pos_of(*e).is_some_and(|p| p.room == room))
        .filter_map(|e| world.creep_data(e).map(|c| c.name))
        .collect();
    if fellows.len() < 2 {
        return false;
    }
    fellows.sort();
    fellows.last().map(String::as_str) == Some(creep.name.as_str())
}
