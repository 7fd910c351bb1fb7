//! Ferries energy from mining containers (and the ground) to storage.

use keeper_logic::config::Config;

use crate::components::{Creep, StructureKind};
use crate::context::TickCtx;
use crate::memory::Memory;
use crate::world::GameWorld;

use super::toolkit::{self, GatherOpts};
use super::RoleResult;

const PULL: GatherOpts = GatherOpts {
    withdraw: &[StructureKind::Container],
    harvest: false,
    pickup: true,
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
    if toolkit::deliver_structure(world, entity, &[StructureKind::Storage], 1.0)? {
        return Ok(());
    }
    // No storage yet: feed the spawn economy directly.
    toolkit::deliver_structure(
        world,
        entity,
        &[StructureKind::Spawn, StructureKind::Extension],
        1.0,
    )?;
    Ok(())
}
