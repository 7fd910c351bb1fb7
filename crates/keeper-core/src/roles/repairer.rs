//! Works the prioritized repair queue, one claimed structure at a time.

use keeper_logic::config::Config;

use crate::components::{Creep, Structure};
use crate::context::TickCtx;
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
    let target = match board.claimed_by(&creep.name, memory) {
        Some(id) => Some(id),
        None => {
            let next = board.next_unclaimed(&pos.room);
            next.filter(|id| board.claim(*id, &creep.name, memory))
        }
    };
    let Some(id) = target else {
        // Queue is clear.
        return Ok(());
    };

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Pos, Resource, StructureKind};
    use keeper_logic::body::Part;
    use keeper_logic::roles::Role;

    #[test]
    fn repairer_claims_and_works_the_queue_head() {
        let mut w = GameWorld::new("keeper");
        let road = w.add_structure(StructureKind::Road, Pos::new("alpha", 12, 10), None);
        if let Ok(s) = w.ecs.query_one_mut::<&mut Structure>(w.entity(road).unwrap()) {
            s.hits = 1_000;
        }
        let mut c = Creep::new(
            "repairer0000",
            Role::Repairer,
            "alpha",
            vec![Part::Work, Part::Carry, Part::Move],
        );
        c.store.add(Resource::Energy, 50);
        let entity_id = w.add_creep(c, Pos::new("alpha", 10, 10));
        let entity = w.entity(entity_id).unwrap();

        let cfg = Config::default();
        let mut memory = Memory::new();
        let mut ctx = TickCtx::new(1);
        let mut board = RepairBoard::new();
        let marker_set = crate::flags::MarkerSet::build(&w);
        board.maybe_rebuild(&w, &memory, &marker_set, &cfg, 1);
        assert_eq!(board.next_unclaimed("alpha"), Some(road));

        let creep = w.creep_data(entity).unwrap();
        run(&mut w, &mut memory, &mut ctx, &cfg, &mut board, entity, &creep).unwrap();
        assert_eq!(board.claimed_by("repairer0000", &memory), Some(road));
        // In range 3 already: repaired this tick.
        let s = w.structure_data(w.entity(road).unwrap()).unwrap();
        assert_eq!(s.hits, 1_100);
    }
}
