//! Works construction sites; with nothing to build it upgrades.

use keeper_logic::config::Config;

use crate::components::Creep;
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

    let Some(pos) = world.pos_of(entity) else { return Ok(()) };
    let sites = world.sites_in(&pos.room);
    if let Some(site) = world.closest(&pos, &sites) {
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
