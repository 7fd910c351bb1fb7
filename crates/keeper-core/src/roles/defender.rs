//! Walks to whichever room is under attack and fights.

use keeper_logic::config::Config;

use crate::components::Creep;
use crate::context::TickCtx;
use crate::memory::Memory;
use crate::world::GameWorld;

use super::{act, toolkit, RoleResult};

pub(super) fn run(
    world: &mut GameWorld,
    _memory: &mut Memory,
    ctx: &mut TickCtx,
    _cfg: &Config,
    entity: hecs::Entity,
    creep: &Creep,
) -> RoleResult {
    let Some(pos) = world.pos_of(entity) else { return Ok(()) };

    // Fight whatever is here first.
    let hostiles = world.hostiles_in(&pos.room);
    if let Some(target) = world.closest(&pos, &hostiles) {
        let Some(target_pos) = world.pos_of(target) else { return Ok(()) };
        if pos.is_near(&target_pos) {
            return act("attack", world.attack(entity, target));
        }
        return act("close distance", world.move_toward(entity, &target_pos));
    }

    // Otherwise head for the nearest hot room.
    let hot = world
        .visible_rooms()
        .into_iter()
        .find(|room| !world.hostiles_in(room).is_empty());
    if let Some(room) = hot {
        if room != pos.room {
            return toolkit::move_to_room_safe(world, ctx, entity, &room);
        }
    }

    // Peacetime: hold station near a home spawn.
    if pos.room != creep.home_room {
        let home = creep.home_room.clone();
        return toolkit::move_to_room_safe(world, ctx, entity, &home);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Pos;
    use keeper_logic::body::Part;
    use keeper_logic::roles::Role;

    #[test]
    fn defender_closes_and_strikes() {
        let mut w = GameWorld::new("keeper");
        w.add_hostile(Pos::new("alpha", 10, 10), "raider", 200);
        let d = Creep::new(
            "defender0000",
            Role::Defender,
            "alpha",
            vec![Part::Tough, Part::Attack, Part::Move, Part::Move],
        );
        let entity_id = w.add_creep(d, Pos::new("alpha", 10, 12));
        let entity = w.entity(entity_id).unwrap();

        let mut memory = Memory::new();
        let mut ctx = TickCtx::new(1);
        let c = w.creep_data(entity).unwrap();
        run(&mut w, &mut memory, &mut ctx, &Config::default(), entity, &c).unwrap();
        // First tick closes to melee range.
        assert_eq!(w.pos_of(entity).unwrap(), Pos::new("alpha", 10, 11));

        let c = w.creep_data(entity).unwrap();
        run(&mut w, &mut memory, &mut ctx, &Config::default(), entity, &c).unwrap();
        // Second tick lands a 30-damage hit.
        let hostile = w.hostiles_in("alpha")[0];
        let hits = w.ecs.get::<&crate::components::Hostile>(hostile).unwrap().hits;
        assert_eq!(hits, 170);
    }
}
