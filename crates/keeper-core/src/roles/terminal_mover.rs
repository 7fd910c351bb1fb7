//! Shuttles minerals from storage and containers into the terminal,
//! leaving energy to the fillers. An orange/purple marker in the room
//! reverses the flow, draining the terminal (minerals first, then
//! energy) back into storage.

use keeper_logic::config::Config;

use crate::components::{Creep, Resource, StructureKind};
use crate::context::TickCtx;
use crate::flags::markers;
use crate::memory::Memory;
use crate::world::GameWorld;

use super::{act, toolkit, RoleResult};

/// Delivery stops once the destination is this full.
const DEST_FILL_LIMIT: f64 = 0.9;

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
    let reversed = markers(world, ctx).terminal_reverse.contains(&pos.room);
    let (src_kinds, dst_kind): (&[StructureKind], _) = if reversed {
        (&[StructureKind::Terminal], StructureKind::Storage)
    } else {
        (
            &[StructureKind::Container, StructureKind::Storage],
            StructureKind::Terminal,
        )
    };

    if toolkit::needs_energy(memory, creep) {
        let Some((src, resource)) = pick_load(world, &pos.room, src_kinds, reversed) else {
            return Ok(());
        };
        let Some(spos) = world.pos_of(src) else { return Ok(()) };
        if pos.is_near(&spos) {
            return act("load", world.withdraw(entity, src, resource));
        }
        return act("move to source", world.move_toward(entity, &spos));
    }

    let dst = world
        .structures_of_kind(&pos.room, dst_kind)
        .into_iter()
        .find(|e| {
            world
                .structure_data(*e)
                .is_some_and(|s| s.energy_fraction() < DEST_FILL_LIMIT)
        });
    let Some(dst) = dst else { return Ok(()) };
    let Some(dpos) = world.pos_of(dst) else { return Ok(()) };
    if pos.is_near(&dpos) {
        for resource in creep.store.kinds() {
            act("unload", world.transfer(entity, dst, resource))?;
        }
        Ok(())
    } else {
        act("move to sink", world.move_toward(entity, &dpos))
    }
}

/// The first source holding a mineral, and which mineral to take. On
/// the reverse run plain energy is worth carrying home too.
fn pick_load(
    world: &GameWorld,
    room: &str,
    src_kinds: &[StructureKind],
    reversed: bool,
) -> Option<(hecs::Entity, Resource)> {
    let with_mineral = src_kinds
        .iter()
        .flat_map(|k| world.structures_of_kind(room, *k))
        .find_map(|e| {
            let s = world.structure_data(e)?;
            let r = s.store.kinds().into_iter().find(|r| *r != Resource::Energy)?;
            Some((e, r))
        });
    with_mineral.or_else(|| {
        if !reversed {
            return None;
        }
        src_kinds
            .iter()
            .flat_map(|k| world.structures_of_kind(room, *k))
            .find(|e| world.structure_data(*e).is_some_and(|s| s.store.energy() > 0))
            .map(|e| (e, Resource::Energy))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{MarkerColor, Pos, Structure};
    use keeper_logic::body::Part;
    use keeper_logic::roles::Role;

    fn mover(name: &str) -> Creep {
        Creep::new(name, Role::TerminalMover, "alpha", vec![Part::Carry, Part::Move])
    }

    #[test]
    fn minerals_ride_from_storage_to_the_terminal() {
        let mut w = GameWorld::new("keeper");
        let storage =
            w.add_structure(StructureKind::Storage, Pos::new("alpha", 10, 10), Some("keeper"));
        let terminal =
            w.add_structure(StructureKind::Terminal, Pos::new("alpha", 12, 10), Some("keeper"));
        if let Ok(s) = w.ecs.query_one_mut::<&mut Structure>(w.entity(storage).unwrap()) {
            s.store.add(Resource::Energy, 1_000);
            s.store.add(Resource::Oxygen, 300);
        }
        let entity_id = w.add_creep(mover("termxfer0000"), Pos::new("alpha", 10, 11));
        let entity = w.entity(entity_id).unwrap();

        let mut memory = Memory::new();
        let mut ctx = TickCtx::new(1);
        let creep = w.creep_data(entity).unwrap();
        run(&mut w, &mut memory, &mut ctx, &Config::default(), entity, &creep).unwrap();

        // The mineral comes out; the energy stays for the fillers.
        let c = w.creep_data(entity).unwrap();
        assert_eq!(c.store.energy(), 0);
        assert_eq!(c.store.total(), 50);

        // Walk the load over and drop it off.
        if let Ok(p) = w.ecs.query_one_mut::<&mut Pos>(entity) {
            p.x = 12;
            p.y = 11;
        }
        let creep = w.creep_data(entity).unwrap();
        run(&mut w, &mut memory, &mut ctx, &Config::default(), entity, &creep).unwrap();

        let t = w.structure_data(w.entity(terminal).unwrap()).unwrap();
        assert_eq!(t.store.total(), 50);
        assert_eq!(t.store.energy(), 0);
        let s = w.structure_data(w.entity(storage).unwrap()).unwrap();
        assert_eq!(s.store.energy(), 1_000);
    }

    #[test]
    fn marker_reverses_the_flow() {
        let mut w = GameWorld::new("keeper");
        let storage =
            w.add_structure(StructureKind::Storage, Pos::new("alpha", 10, 10), Some("keeper"));
        let terminal =
            w.add_structure(StructureKind::Terminal, Pos::new("alpha", 12, 10), Some("keeper"));
        for id in [storage, terminal] {
            if let Ok(s) = w.ecs.query_one_mut::<&mut Structure>(w.entity(id).unwrap()) {
                s.store.add(Resource::Energy, 1_000);
            }
        }
        w.add_marker("rev", Pos::new("alpha", 1, 1), MarkerColor::Orange, MarkerColor::Purple);
        // Adjacent to the terminal, empty: with the reversal in force it
        // drains the terminal.
        let entity_id = w.add_creep(mover("termxfer0001"), Pos::new("alpha", 12, 11));
        let entity = w.entity(entity_id).unwrap();

        let mut memory = Memory::new();
        let mut ctx = TickCtx::new(1);
        let creep = w.creep_data(entity).unwrap();
        run(&mut w, &mut memory, &mut ctx, &Config::default(), entity, &creep).unwrap();

        let t = w.structure_data(w.entity(terminal).unwrap()).unwrap();
        assert_eq!(t.store.energy(), 950);
        let c = w.creep_data(entity).unwrap();
        assert_eq!(c.store.energy(), 50);
    }
}
