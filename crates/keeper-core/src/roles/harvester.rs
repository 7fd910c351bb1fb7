//! Early-game generalist: mines by hand, feeds the spawn economy, and
//! dumps any surplus into the controller.

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
    if toolkit::deliver_structure(
        world,
        entity,
        &[StructureKind::Spawn, StructureKind::Extension],
        1.0,
    )? {
        return Ok(());
    }
    // Everything full: push the controller instead of idling.
    let Some(pos) = world.pos_of(entity) else { return Ok(()) };
    let Some(controller) = world.controller_in(&pos.room) else { return Ok(()) };
    let Some(cpos) = world.pos_of(controller) else { return Ok(()) };
    if pos.in_range(&cpos, 3) {
        act("upgrade", world.upgrade(entity, controller))
    } else {
        act("move to controller", world.move_toward(entity, &cpos))
    }
}
