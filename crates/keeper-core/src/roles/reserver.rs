//! Keeps a marked remote room's controller reserved under our name.

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
    _cfg: &Config,
    entity: hecs::Entity,
    creep: &Creep,
) -> RoleResult {
    let rooms = markers(world, ctx).reserve_rooms.clone();
    let Some(target) = toolkit::assigned_room(world, memory, creep, &rooms) else {
        return Ok(());
    };
    let Some(pos) = world.pos_of(entity) else { return Ok(()) };
    if pos.room != target {
        return toolkit::move_to_room_safe(world, ctx, entity, &target);
    }
    let Some(controller) = world.controller_in(&target) else { return Ok(()) };
    let Some(cpos) = world.pos_of(controller) else { return Ok(()) };
    if pos.is_near(&cpos) {
        act("reserve", world.reserve(entity, controller))
    } else {
        act("move to controller", world.move_toward(entity, &cpos))
    }
}
