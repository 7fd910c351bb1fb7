//! Mines a marked remote room and carts the haul back home.

use keeper_logic::config::Config;

use crate::components::{Creep, StructureKind};
use crate::context::TickCtx;
use crate::flags::markers;
use crate::memory::Memory;
use crate::world::GameWorld;

use super::{toolkit, RoleResult};

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

    if toolkit::needs_energy(memory, creep) {
        let rooms = markers(world, ctx).harvest_rooms.clone();
        let Some(target) = toolkit::assigned_room(world, memory, creep, &rooms) else {
            return Ok(());
        };
        if pos.room != target {
            return toolkit::move_to_room_safe(world, ctx, entity, &target);
        }
        return toolkit::gather_energy(
            world,
            memory,
            ctx,
            entity,
            creep,
            toolkit::GatherOpts::SCROUNGE,
        );
    }

    // Full: walk the load home and bank it.
    if pos.room != creep.home_room {
        let home = creep.home_room.clone();
        return toolkit::move_to_room_safe(world, ctx, entity, &home);
    }
    if toolkit::deliver_structure(world, entity, &[StructureKind::Storage], 1.0)? {
        return Ok(());
    }
    toolkit::deliver_structure(
        world,
        entity,
        &[StructureKind::Spawn, StructureKind::Extension],
        1.0,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{MarkerColor, Pos};
    use keeper_logic::body::Part;
    use keeper_logic::roles::Role;

    #[test]
    fn empty_remote_harvester_heads_for_its_marked_room() {
        let mut w = GameWorld::new("keeper");
        w.connect("alpha", "east");
        w.add_marker("rh", Pos::new("east", 25, 25), MarkerColor::Yellow, MarkerColor::Yellow);
        let c = Creep::new(
            "rmharvester0000",
            Role::RemoteHarvester,
            "alpha",
            vec![Part::Work, Part::Carry, Part::Move, Part::Move],
        );
        let entity_id = w.add_creep(c, Pos::new("alpha", 25, 25));
        let entity = w.entity(entity_id).unwrap();

        let mut memory = Memory::new();
        let mut ctx = TickCtx::new(1);
        let creep = w.creep_data(entity).unwrap();
        run(&mut w, &mut memory, &mut ctx, &Config::default(), entity, &creep).unwrap();

        assert_eq!(memory.get_str(&["creeps", "rmharvester0000", "target_room"]), Some("east"));
        assert_eq!(w.pos_of(entity).unwrap().room, "east");
    }
}
