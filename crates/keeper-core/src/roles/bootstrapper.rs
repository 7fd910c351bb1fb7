//! Seed crew for a claimed room with no spawn: build the room's sites
//! (the first spawn above all) and push the controller meanwhile.

use keeper_logic::config::Config;

use crate::components::{Creep, StructureKind};
use crate::context::TickCtx;
use crate::memory::Memory;
use crate::world::GameWorld;

use super::{act, toolkit, RoleResult};

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
    let Some(pos) = world.pos_of(entity) else { return Ok(()) };
    if pos.room != creep.home_room {
        let home = creep.home_room.clone();
        return toolkit::move_to_room_safe(world, ctx, entity, &home);
    }
    if toolkit::needs_energy(memory, creep) {
        return toolkit::gather_energy(
            world,
            memory,
            ctx,
            entity,
            creep,
            toolkit::GatherOpts::SCROUNGE,
        );
    }

    let sites = world.sites_in(&pos.room);
    // Spawn sites first; everything else waits.
    let spawn_sites: Vec<hecs::Entity> = sites
        .iter()
        .copied()
        .filter(|e| {
            world
                .ecs
                .get::<&crate::components::ConstructionSite>(*e)
                .map(|s| s.kind == StructureKind::Spawn)
                .unwrap_or(false)
        })
        .collect();
    let pick = world
        .closest(&pos, &spawn_sites)
        .or_else(|| world.closest(&pos, &sites));
    if let Some(site) = pick {
        let Some(spos) = world.pos_of(site) else { return Ok(()) };
        if pos.in_range(&spos, 3) {
            return act("build", world.build(entity, site));
        }
        return act("move to site", world.move_toward(entity, &spos));
    }

    let Some(controller) = world.controller_in(&pos.room) else { return Ok(()) };
    let Some(cpos) = world.pos_of(controller) else { return Ok(()) };
    if pos.in_range(&cpos, 3) {
        act("upgrade", world.upgrade(entity, controller))
    } else {
        act("move to controller", world.move_toward(entity, &cpos))
    }
}
