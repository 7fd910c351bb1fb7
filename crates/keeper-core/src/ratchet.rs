//! Fortification ratchet maintenance.
//!
//! Periodically evaluates the per-room rampart and wall floors using the
//! pure decision in `keeper_logic::ratchet` and persists the results in
//! durable memory. The repair board reads the floors back when it builds
//! hysteresis bands for fortifications.

use keeper_logic::config::Config;
use keeper_logic::constants::FORT_HITS_MAX;
use keeper_logic::ratchet::{evaluate, RatchetState, RatchetStep};
use keeper_logic::repair::RepairClass;

use crate::components::{Pos, Structure};
use crate::context::TickCtx;
use crate::flags::markers;
use crate::memory::Memory;
use crate::world::GameWorld;

fn class_key(class: RepairClass) -> &'static str {
    match class {
        RepairClass::Rampart => "rampart",
        RepairClass::Wall => "wall",
        _ => "other",
    }
}

/// Persisted ratchet state for a room + class, if any.
pub fn floor_of(memory: &Memory, room: &str, class: RepairClass) -> Option<RatchetState> {
    if class.ratchet_partner().is_none() {
        return None;
    }
    memory.get_as(&["rooms", room, "ratchet", class_key(class)])
}

fn store(memory: &mut Memory, room: &str, class: RepairClass, state: RatchetState) {
    if let Ok(v) = serde_json::to_value(state) {
        memory.set(&["rooms", room, "ratchet", class_key(class)], v);
    }
}

/// Weakest structure of `class` in `room`, if the class has any.
fn observed_min(world: &GameWorld, room: &str, class: RepairClass) -> Option<u32> {
    world
        .ecs
        .query::<(&Pos, &Structure)>()
        .iter()
        .filter(|(_, (pos, s))| pos.room == room && s.kind.repair_class() == class)
        .map(|(_, (_, s))| s.hits)
        .min()
}

/// Evaluate the ratchet for every owned room. The engine calls this on
/// the check interval.
pub fn run(world: &GameWorld, memory: &mut Memory, ctx: &mut TickCtx, cfg: &Config) {
    let marker_set = markers(world, ctx);
    for room in world.my_rooms() {
        // A marker replaces the configured ceiling outright; operators
        // use it to push one room's fortifications past the default.
        let cap = marker_set
            .ratchet_caps
            .get(&room)
            .copied()
            .unwrap_or(cfg.ratchet_max)
            .min(FORT_HITS_MAX);

        for class in [RepairClass::Rampart, RepairClass::Wall] {
            let state = floor_of(memory, &room, class);
            let min = observed_min(world, &room, class);
            let partner = class
                .ratchet_partner()
                .filter(|p| observed_min(world, &room, *p).is_some())
                .and_then(|p| floor_of(memory, &room, p))
                .map(|s| s.floor);

            match evaluate(state, min, partner, cap, ctx.tick, cfg) {
                RatchetStep::Init(floor) => {
                    log::info!("room {}: {} floor starts at {}", room, class_key(class), floor);
                    store(memory, &room, class, RatchetState { floor, raised_at: ctx.tick });
                }
                RatchetStep::Raise(floor) => {
                    log::info!("room {}: {} floor raised to {}", room, class_key(class), floor);
                    store(memory, &room, class, RatchetState { floor, raised_at: ctx.tick });
                }
                RatchetStep::Hold | RatchetStep::Deferred => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::StructureKind;

    fn fortified_world(rampart_hits: u32, wall_hits: u32) -> GameWorld {
        let mut w = GameWorld::new("keeper");
        w.add_controller(Pos::new("alpha", 40, 40), 5, Some("keeper"));
        let r = w.add_structure(StructureKind::Rampart, Pos::new("alpha", 5, 5), Some("keeper"));
        let wall = w.add_structure(StructureKind::Wall, Pos::new("alpha", 6, 5), None);
        for (id, hits) in [(r, rampart_hits), (wall, wall_hits)] {
            let e = w.entity(id).unwrap();
            if let Ok(s) = w.ecs.query_one_mut::<&mut Structure>(e) {
                s.hits = hits;
            }
        }
        w
    }

    #[test]
    fn first_pass_initializes_both_floors() {
        let world = fortified_world(40_000, 40_000);
        let mut memory = Memory::new();
        let mut ctx = TickCtx::new(100);
        run(&world, &mut memory, &mut ctx, &Config::default());

        let floor = floor_of(&memory, "alpha", RepairClass::Rampart).unwrap();
        assert_eq!(floor.floor, 250_000);
        assert!(floor_of(&memory, "alpha", RepairClass::Wall).is_some());
    }

    #[test]
    fn floors_only_move_up() {
        let cfg = Config::default();
        let world = fortified_world(260_000, 260_000);
        let mut memory = Memory::new();

        let mut ctx = TickCtx::new(100);
        run(&world, &mut memory, &mut ctx, &cfg);
        let first = floor_of(&memory, "alpha", RepairClass::Wall).unwrap().floor;

        // Well past the cooldown, both classes satisfied: raise.
        let mut ctx = TickCtx::new(100 + cfg.ratchet_cooldown);
        run(&world, &mut memory, &mut ctx, &cfg);
        let second = floor_of(&memory, "alpha", RepairClass::Wall).unwrap().floor;
        assert!(second > first);
        assert_eq!(second, first + cfg.ratchet_delta);

        // Nothing ever lowers a floor.
        let mut ctx = TickCtx::new(100 + cfg.ratchet_cooldown + 1);
        run(&world, &mut memory, &mut ctx, &cfg);
        assert!(floor_of(&memory, "alpha", RepairClass::Wall).unwrap().floor >= second);
    }

    #[test]
    fn marker_cap_limits_the_floor() {
        use crate::components::MarkerColor;
        let cfg = Config::default();
        let mut world = fortified_world(260_000, 260_000);
        world.add_marker("255000", Pos::new("alpha", 1, 1), MarkerColor::Green, MarkerColor::Yellow);
        let mut memory = Memory::new();

        let mut ctx = TickCtx::new(100);
        run(&world, &mut memory, &mut ctx, &cfg);
        // Init clamps straight to the cap (rounded down).
        assert_eq!(
            floor_of(&memory, "alpha", RepairClass::Wall).unwrap().floor,
            255_000
        );
        let mut ctx = TickCtx::new(100 + cfg.ratchet_cooldown);
        run(&world, &mut memory, &mut ctx, &cfg);
        assert_eq!(
            floor_of(&memory, "alpha", RepairClass::Wall).unwrap().floor,
            255_000
        );
    }

    #[test]
    fn marker_cap_raises_the_floor_past_the_default() {
        use crate::components::MarkerColor;
        let cfg = Config::default();
        let mut world = fortified_world(11_500_000, 11_500_000);
        world.add_marker(
            "12000000",
            Pos::new("alpha", 1, 1),
            MarkerColor::Green,
            MarkerColor::Yellow,
        );
        let mut memory = Memory::new();

        let mut ctx = TickCtx::new(100);
        run(&world, &mut memory, &mut ctx, &cfg);
        // The marker replaces the configured ceiling, so the floor may
        // climb past it; only the absolute fortification cap holds.
        assert!(11_500_000 > cfg.ratchet_max);
        assert_eq!(
            floor_of(&memory, "alpha", RepairClass::Wall).unwrap().floor,
            11_500_000
        );
    }

    #[test]
    fn unowned_rooms_are_ignored() {
        let mut world = GameWorld::new("keeper");
        world.add_controller(Pos::new("beta", 40, 40), 3, Some("rival"));
        world.add_structure(StructureKind::Wall, Pos::new("beta", 5, 5), None);
        let mut memory = Memory::new();
        let mut ctx = TickCtx::new(100);
        run(&world, &mut memory, &mut ctx, &Config::default());
        assert!(floor_of(&memory, "beta", RepairClass::Wall).is_none());
    }
}
