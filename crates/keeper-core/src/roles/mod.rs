//! Creep behavior dispatch.
//!
//! One creep acts per call, routed by its role. A failing creep never
//! takes the tick down with it: errors are logged against the creep and
//! the loop moves on, so one confused worker cannot stall the colony.
//!
//! Shared housekeeping runs before the role behavior: creeps about to
//! expire walk home and recycle, adjacent dropped energy is scooped up
//! opportunistically, room-scoped creeps found outside their home room
//! walk back, and creeps loitering on a container get nudged off it.

pub mod toolkit;

mod bootstrapper;
mod builder;
mod claimer;
mod defender;
mod extractor;
mod filler;
mod harvester;
mod hauler;
mod remote_harvester;
mod remote_repairer;
mod remote_upgrader;
mod repairer;
mod reserver;
mod static_harvester;
mod terminal_mover;
mod upgrader;

use keeper_logic::config::Config;
use keeper_logic::roles::Role;

use crate::components::{Creep, StructureKind};
use crate::context::TickCtx;
use crate::flags::markers;
use crate::memory::Memory;
use crate::repair::RepairBoard;
use crate::world::{CmdResult, CommandError, GameWorld};

/// A command failure with the action that caused it.
#[derive(Debug)]
pub struct RoleError {
    pub action: &'static str,
    pub cause: CommandError,
}

impl std::fmt::Display for RoleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.action, self.cause)
    }
}

impl std::error::Error for RoleError {}

pub type RoleResult = Result<(), RoleError>;

/// Attach an action name to a command result.
pub(crate) fn act<T>(action: &'static str, result: CmdResult<T>) -> Result<T, RoleError> {
    result.map_err(|cause| RoleError { action, cause })
}

/// Run every live creep's behavior for the tick.
pub fn run_creeps(
    world: &mut GameWorld,
    memory: &mut Memory,
    ctx: &mut TickCtx,
    cfg: &Config,
    board: &mut RepairBoard,
) {
    for entity in world.my_creeps() {
        let Some(creep) = world.creep_data(entity) else { continue };
        if creep.spawning {
            continue;
        }

        if creep.ticks_to_live < cfg.despawn_below_ttl {
            if let Err(e) = toolkit::dump_and_despawn(world, ctx, entity, &creep) {
                log::error!("creep {} ({:?}): {}", creep.name, creep.role, e);
            }
            continue;
        }

        toolkit::pickup_adjacent_energy(world, entity, &creep);

        let info = creep.role.info();
        let Some(pos) = world.pos_of(entity) else { continue };
        if !info.multi_room && pos.room != creep.home_room {
            let avoid = markers(world, ctx).avoid_list();
            let home = creep.home_room.clone();
            let _ = world.move_to_room(entity, &home, &avoid);
            continue;
        }

        // A creep camped on a container blocks the miner that feeds it;
        // once it has squatted past the limit it is shooed off instead
        // of acting this tick.
        if !info.ok_container && nudge_if_squatting(world, memory, cfg, entity, &creep) {
            continue;
        }

        let result = dispatch(world, memory, ctx, cfg, board, entity, &creep);
        if let Err(e) = result {
            log::error!("creep {} ({:?}): {}", creep.name, creep.role, e);
        }
    }
}

fn dispatch(
    world: &mut GameWorld,
    memory: &mut Memory,
    ctx: &mut TickCtx,
    cfg: &Config,
    board: &mut RepairBoard,
    entity: hecs::Entity,
    creep: &Creep,
) -> RoleResult {
    match creep.role {
        Role::StaticHarvester => static_harvester::run(world, memory, ctx, cfg, entity, creep),
        Role::Hauler => hauler::run(world, memory, ctx, cfg, entity, creep),
        Role::Filler => filler::run(world, memory, ctx, cfg, entity, creep),
        Role::Defender => defender::run(world, memory, ctx, cfg, entity, creep),
        Role::Harvester => harvester::run(world, memory, ctx, cfg, entity, creep),
        Role::Reserver => reserver::run(world, memory, ctx, cfg, entity, creep),
        Role::Claimer => claimer::run(world, memory, ctx, cfg, entity, creep),
        Role::Repairer => repairer::run(world, memory, ctx, cfg, board, entity, creep),
        Role::Builder => builder::run(world, memory, ctx, cfg, entity, creep),
        Role::Extractor => extractor::run(world, memory, ctx, cfg, entity, creep),
        Role::RemoteUpgrader => remote_upgrader::run(world, memory, ctx, cfg, entity, creep),
        Role::Upgrader => upgrader::run(world, memory, ctx, cfg, entity, creep),
        Role::TerminalMover => terminal_mover::run(world, memory, ctx, cfg, entity, creep),
        Role::RemoteRepairer => remote_repairer::run(world, memory, ctx, cfg, board, entity, creep),
        Role::RemoteHarvester => remote_harvester::run(world, memory, ctx, cfg, entity, creep),
        Role::Bootstrapper => bootstrapper::run(world, memory, ctx, cfg, entity, creep),
    }
}

/// Creeps parked on a container block the miners that feed it. Track
/// how many consecutive ticks each creep has held a container tile and
/// shoo persistent squatters. Returns true when the nudge fired, in
/// which case the creep skips its role logic for the tick.
fn nudge_if_squatting(
    world: &mut GameWorld,
    memory: &mut Memory,
    cfg: &Config,
    entity: hecs::Entity,
    creep: &Creep,
) -> bool {
    let Some(pos) = world.pos_of(entity) else { return false };
    let name = creep.name.as_str();
    let on_container = world
        .structures_of_kind(&pos.room, StructureKind::Container)
        .iter()
        .filter_map(|e| world.pos_of(*e))
        .any(|p| p == pos);

    let last_x = memory.get_u64(&["creeps", name, "last_x"]) as i32;
    let last_y = memory.get_u64(&["creeps", name, "last_y"]) as i32;
    let held = pos.x == last_x && pos.y == last_y;
    memory.set_u64(&["creeps", name, "last_x"], pos.x as u64);
    memory.set_u64(&["creeps", name, "last_y"], pos.y as u64);

    // Only ticks actually spent on the container count; idling elsewhere
    // and then stepping onto one starts the clock fresh.
    let standing = match (on_container, held) {
        (true, true) => memory.get_u64(&["creeps", name, "standing"]) + 1,
        (true, false) => 1,
        (false, _) => 0,
    };

    if standing >= cfg.max_standing_ticks as u64 {
        let _ = world.random_step(entity);
        memory.set_u64(&["creeps", name, "standing"], 0);
        return true;
    }
    memory.set_u64(&["creeps", name, "standing"], standing);
    false
}
