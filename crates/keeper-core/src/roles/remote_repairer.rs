//! Patches up structures in marked remote rooms, using the same claim
//! discipline as the home repairer.

use keeper_logic::config::Config;

use crate::components::{Creep, Structure};
use crate::context::TickCtx;
use crate::flags::markers;
use crate::memory::Memory;
use crate::repair::RepairBoard;
use crate::world::GameWorld;

use super::{act, toolkit, RoleResult};

pub(super) fn run(
    world: &mut GameWorld,
    memory: &mut Memory,
    ctx: &mut TickCtx,
    cfg: &Config,
    board: &mut RepairBoard,
    entity: hecs::Entity,
    creep: &Creep,
) -> RoleResult {
    if toolkit::retreat_from_enemies(world, memory, cfg, entity, creep)? {
        return Ok(());
    }
    let rooms = markers(world, ctx).repair_rooms.clone();
    let Some(target_room) = toolkit::assigned_room(world, memory, creep, &rooms) else {
        return Ok(());
    };
    let Some(pos) = world.pos_of(entity) else { return Ok(()) };
    if pos.room != target_room {
        return toolkit::move_to_room_safe(world, ctx, entity, &target_room);
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

    let target = match board.claimed_by(&creep.name, memory) {
        Some(id) => Some(id),
        None => {
            let next = board.next_unclaimed(&target_room);
            next.filter(|id| board.claim(*id, &creep.name, memory))
        }
    };
    let Some(id) = target else { return Ok(()) };
    let Some(structure) = world.entity(id) else {
        board.release(&creep.name, memory);
        return Ok(());
    };
    let fixed = world
        .ecs
        .get::<&Structure>(structure)
        .map(|s| s.hits >= s.hits_max)
        .unwrap_or(true);
    if fixed {
        board.release(&creep.name, memory);
        return Ok(());
    }
    let Some(spos) = world.pos_of(structure) else { return Ok(()) };
    if pos.in_range(&spos, 3) {
        act("repair", world.repair(entity, structure))
    } else {
        act("move to repair", world.move_toward(entity, &spos))
    }
}
