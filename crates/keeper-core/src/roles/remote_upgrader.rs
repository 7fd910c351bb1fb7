//! Upgrader on loan to a freshly claimed room; spawned only through
//! desired-count markers.

use keeper_logic::config::Config;

use crate::components::Creep;
use crate::context::TickCtx;
use crate::flags::markers;
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
    let rooms = markers(world, ctx).claim_rooms.clone();
    let Some(target) = toolkit::assigned_room(world, memory, creep, &rooms) else {
        return Ok(());
    };
    let Some(pos) = world.pos_of(entity) else { return Ok(()) };
    if pos.room != target {
        return toolkit::move_to_room_safe(world, ctx, entity, &target);
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
    let Some(controller) = world.controller_in(&target) else { return Ok(()) };
    let Some(cpos) = world.pos_of(controller) else { return Ok(()) };
    if pos.in_range(&cpos, 3) {
        act("upgrade", world.upgrade(entity, controller))
    } else {
        act("move to controller", world.move_toward(entity, &cpos))
    }
}
