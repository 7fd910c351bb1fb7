//! Mines the room's mineral and carries it to the terminal or storage.

use keeper_logic::config::Config;

use crate::components::{Creep, MineralNode, Pos, StructureKind};
use crate::context::TickCtx;
use crate::memory::Memory;
use crate::world::{CommandError, GameWorld};

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
    let _ = ctx;
    let Some(pos) = world.pos_of(entity) else { return Ok(()) };

    // Same two-phase loop as the energy workers, but hauling minerals.
    let key = ["creeps", creep.name.as_str(), "acting"];
    let mut delivering = memory.get_bool(&key);
    if delivering && creep.store.is_empty() {
        delivering = false;
        memory.set_bool(&key, false);
    } else if !delivering && creep.free_capacity() == 0 {
        delivering = true;
        memory.set_bool(&key, true);
    }

    if !delivering {
        let mineral: Option<hecs::Entity> = world
            .ecs
            .query::<(&Pos, &MineralNode)>()
            .iter()
            .find(|(_, (p, m))| p.room == pos.room && m.amount > 0)
            .map(|(e, _)| e);
        let Some(mineral) = mineral else { return Ok(()) };
        let Some(mpos) = world.pos_of(mineral) else { return Ok(()) };
        if !pos.is_near(&mpos) {
            return act("move to mineral", world.move_toward(entity, &mpos));
        }
        return match world.harvest_mineral(entity, mineral) {
            Err(CommandError::NotEnoughResources) => Ok(()),
            other => act("extract", other),
        };
    }

    let mut sinks = world.structures_of_kind(&pos.room, StructureKind::Terminal);
    if sinks.is_empty() {
        sinks = world.structures_of_kind(&pos.room, StructureKind::Storage);
    }
    let Some(sink) = world.closest(&pos, &sinks) else { return Ok(()) };
    let Some(spos) = world.pos_of(sink) else { return Ok(()) };
    if !pos.is_near(&spos) {
        return act("move to sink", world.move_toward(entity, &spos));
    }
    for resource in creep.store.kinds() {
        act("bank mineral", world.transfer(entity, sink, resource))?;
    }
    Ok(())
}
