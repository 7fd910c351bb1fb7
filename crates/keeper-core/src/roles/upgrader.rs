//! Feeds the home controller.

use keeper_logic::config::Config;

use crate::components::Creep;
use crate::context::TickCtx;
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
    let Some(controller) = world.controller_in(&pos.room) else { return Ok(()) };
    let Some(cpos) = world.pos_of(controller) else { return Ok(()) };
    if pos.in_range(&cpos, 3) {
        act("upgrade", world.upgrade(entity, controller))
    } else {
        act("move to controller", world.move_toward(entity, &cpos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Controller, Pos, Resource};
    use keeper_logic::body::Part;
    use keeper_logic::roles::Role;

    #[test]
    fn upgrader_pushes_controller_progress() {
        let mut w = GameWorld::new("keeper");
        let controller = w.add_controller(Pos::new("alpha", 10, 10), 2, Some("keeper"));
        let mut c = Creep::new(
            "upgrader0000",
            Role::Upgrader,
            "alpha",
            vec![Part::Work, Part::Carry, Part::Move],
        );
        c.store.add(Resource::Energy, 50);
        let entity_id = w.add_creep(c, Pos::new("alpha", 12, 10));
        let entity = w.entity(entity_id).unwrap();

        let mut memory = Memory::new();
        let mut ctx = TickCtx::new(1);
        let creep = w.creep_data(entity).unwrap();
        run(&mut w, &mut memory, &mut ctx, &Config::default(), entity, &creep).unwrap();

        let e = w.entity(controller).unwrap();
        assert_eq!(w.ecs.get::<&Controller>(e).unwrap().progress, 1);
    }
}
