//! Container miner: parks on the container next to its source and
//! harvests nonstop, topping the container up from its own carry.

use crate::components::{Creep, StructureKind};
use crate::context::TickCtx;
use crate::flags::markers;
use crate::memory::Memory;
use crate::world::{CommandError, GameWorld};

use super::{act, RoleResult};

pub(super) fn run(
    world: &mut GameWorld,
    memory: &mut Memory,
    ctx: &mut TickCtx,
    _cfg: &keeper_logic::config::Config,
    entity: hecs::Entity,
    creep: &Creep,
) -> RoleResult {
    let Some(pos) = world.pos_of(entity) else { return Ok(()) };
    let key = ["creeps", creep.name.as_str(), "source"];

    let source = match memory.get_u64(&key) {
        0 => None,
        id => world.entity(id),
    };
    let source = match source {
        Some(s) => s,
        None => {
            let Some(s) = pick_source(world, memory, ctx, creep) else {
                // Every covered source is taken; wait for a slot.
                return Ok(());
            };
            if let Some(id) = world.id_of(s) {
                memory.set_u64(&key, id);
            }
            s
        }
    };

    let Some(source_pos) = world.pos_of(source) else {
        memory.delete(&key);
        return Ok(());
    };
    let Some(station) = container_beside(world, &source_pos) else {
        memory.delete(&key);
        return Ok(());
    };
    let Some(station_pos) = world.pos_of(station) else { return Ok(()) };

    if pos != station_pos {
        return act("move to station", world.move_toward(entity, &station_pos));
    }

    if creep.free_capacity() == 0 && !creep.store.is_empty() {
        return act("fill container", world.transfer(entity, station, crate::components::Resource::Energy));
    }
    match world.harvest(entity, source) {
        // Regenerating source: wait it out in place.
        Err(CommandError::NotEnoughResources) => Ok(()),
        other => act("harvest", other),
    }
}

/// First covered source in the home room no other miner has claimed.
fn pick_source(
    world: &GameWorld,
    memory: &Memory,
    ctx: &mut TickCtx,
    creep: &Creep,
) -> Option<hecs::Entity> {
    let ignored = markers(world, ctx).ignore_sources.clone();
    let taken: Vec<u64> = world
        .creeps_of_role(keeper_logic::roles::Role::StaticHarvester)
        .iter()
        .filter_map(|e| world.creep_data(*e))
        .filter(|c| c.name != creep.name)
        .map(|c| memory.get_u64(&["creeps", &c.name, "source"]))
        .filter(|id| *id != 0)
        .collect();

    world
        .sources_in(&creep.home_room)
        .into_iter()
        .filter(|s| {
            let Some(p) = world.pos_of(*s) else { return false };
            !ignored.contains(&(p.room.clone(), p.x, p.y))
                && container_beside(world, &p).is_some()
        })
        .find(|s| world.id_of(*s).map_or(false, |id| !taken.contains(&id)))
}

fn container_beside(world: &GameWorld, pos: &crate::components::Pos) -> Option<hecs::Entity> {
    world
        .structures_of_kind(&pos.room, StructureKind::Container)
        .into_iter()
        .find(|e| world.pos_of(*e).is_some_and(|p| p.is_near(pos)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Pos, Resource};
    use keeper_logic::body::Part;
    use keeper_logic::config::Config;
    use keeper_logic::roles::Role;

    fn miner(name: &str) -> Creep {
        Creep::new(
            name,
            Role::StaticHarvester,
            "alpha",
            vec![Part::Carry, Part::Move, Part::Work, Part::Work],
        )
    }

    fn mining_room() -> GameWorld {
        let mut w = GameWorld::new("keeper");
        for (x, y) in [(10, 10), (40, 10)] {
            w.add_source(Pos::new("alpha", x, y), 3_000);
            w.add_structure(StructureKind::Container, Pos::new("alpha", x, y + 1), None);
        }
        w
    }

    #[test]
    fn miners_split_across_sources() {
        let mut w = mining_room();
        let a_id = w.add_creep(miner("miner0000"), Pos::new("alpha", 20, 20));
        let a = w.entity(a_id).unwrap();
        let b_id = w.add_creep(miner("miner0001"), Pos::new("alpha", 20, 21));
        let b = w.entity(b_id).unwrap();

        let mut memory = Memory::new();
        let mut ctx = TickCtx::new(1);
        let ca = w.creep_data(a).unwrap();
        run(&mut w, &mut memory, &mut ctx, &Config::default(), a, &ca).unwrap();
        let cb = w.creep_data(b).unwrap();
        run(&mut w, &mut memory, &mut ctx, &Config::default(), b, &cb).unwrap();

        let sa = memory.get_u64(&["creeps", "miner0000", "source"]);
        let sb = memory.get_u64(&["creeps", "miner0001", "source"]);
        assert_ne!(sa, 0);
        assert_ne!(sb, 0);
        assert_ne!(sa, sb);
    }

    #[test]
    fn full_miner_unloads_into_its_container() {
        let mut w = mining_room();
        let mut creep = miner("miner0002");
        creep.store.add(Resource::Energy, creep.capacity);
        // Already on station.
        let entity_id = w.add_creep(creep, Pos::new("alpha", 10, 11));
        let entity = w.entity(entity_id).unwrap();
        let source = w
            .sources_in("alpha")
            .into_iter()
            .find(|e| w.pos_of(*e) == Some(Pos::new("alpha", 10, 10)))
            .unwrap();

        let mut memory = Memory::new();
        memory.set_u64(&["creeps", "miner0002", "source"], w.id_of(source).unwrap());
        let mut ctx = TickCtx::new(1);
        let c = w.creep_data(entity).unwrap();
        run(&mut w, &mut memory, &mut ctx, &Config::default(), entity, &c).unwrap();

        let container = w.structures_of_kind("alpha", StructureKind::Container)
            .into_iter()
            .find(|e| w.pos_of(*e) == Some(Pos::new("alpha", 10, 11)))
            .unwrap();
        assert_eq!(w.structure_data(container).unwrap().store.energy(), 50);
    }
}
