//! Spawn allocation.
//!
//! The allocator walks spawns in storage-energy order and the role
//! catalog in priority order, issuing at most one spawn command per
//! spawn per tick. A spawn that finds an under-provisioned role it
//! cannot yet afford stops scanning and saves for it, so cheap
//! low-priority roles never starve an expensive high-priority one.
//!
//! Two side paths run outside the catalog scan: the bootstrap path keeps
//! a fixed population of bootstrappers assigned to owned rooms that have
//! no spawn yet, and the emergency path force-spawns a minimal worker
//! when a critical role has been continuously absent past a debounce
//! window.

use keeper_logic::body::body_cost;
use keeper_logic::config::Config;
use keeper_logic::constants::{SPAWN_ID_MODULO, SPAWN_TIME_PER_PART};
use keeper_logic::demand::{desired_global, desired_in_room};
use keeper_logic::roles::Role;
use keeper_logic::snapshot::RoomSnapshot;

use crate::components::EMERGENCY_BODY;
use crate::context::TickCtx;
use crate::flags::markers;
use crate::memory::Memory;
use crate::summarize::summarize;
use crate::world::{CommandError, GameWorld};

/// What a spawn's catalog scan decided.
#[derive(Debug, PartialEq, Eq)]
enum ScanOutcome {
    /// A spawn command was issued.
    Issued,
    /// An under-provisioned role was found but is not yet affordable;
    /// the spawn holds its energy for it.
    Saving,
    /// Nothing to do.
    Idle,
}

/// Mint the next creep name for a role; returns the name and the
/// sequence value to restore on rollback.
fn mint_name(memory: &mut Memory, role: Role) -> (String, u64) {
    let seq = memory.get_u64(&["spawn_seq"]);
    let name = format!("{}{:04}", role.info().prefix, seq % SPAWN_ID_MODULO);
    memory.set_u64(&["spawn_seq"], seq + 1);
    (name, seq)
}

fn rollback_name(memory: &mut Memory, seq: u64) {
    memory.set_u64(&["spawn_seq"], seq);
}

/// Live creeps of `role`, including ones still assembling — a spawn
/// command lands in the world immediately, so in-flight creeps are
/// already visible here. `room` scoped by home room; `None` counts
/// globally. Returns (count, minimum ticks-to-live seen).
fn live_count(world: &GameWorld, role: Role, room: Option<&str>) -> (u32, Option<u32>) {
    let mut count = 0;
    let mut min_ttl = None;
    for entity in world.creeps_of_role(role) {
        let Some(creep) = world.creep_data(entity) else { continue };
        if let Some(room) = room {
            if creep.home_room != room {
                continue;
            }
        }
        count += 1;
        if !creep.spawning {
            min_ttl = Some(min_ttl.map_or(creep.ticks_to_live, |m: u32| m.min(creep.ticks_to_live)));
        }
    }
    (count, min_ttl)
}

/// Main allocation pass. The engine calls this on the spawn scan
/// interval.
pub fn run(world: &mut GameWorld, memory: &mut Memory, ctx: &mut TickCtx, cfg: &Config) {
    let marker_set = markers(world, ctx);
    let remotes = marker_set.remote_targets();

    let visible = world.visible_rooms();
    let all_snaps: Vec<std::rc::Rc<RoomSnapshot>> = visible
        .iter()
        .map(|room| summarize(world, memory, ctx, room))
        .collect();

    // Richest rooms first: they can afford the biggest bodies.
    let mut rooms = world.my_rooms();
    rooms.sort_by_key(|room| std::cmp::Reverse(world.storage_energy(room)));

    let mut idle: Vec<(hecs::Entity, String)> = Vec::new();
    for room in &rooms {
        let snap = summarize(world, memory, ctx, room);
        for spawn in world.spawns_in(room) {
            let busy = world
                .ecs
                .get::<&crate::components::SpawnFacility>(spawn)
                .map(|f| f.job.is_some())
                .unwrap_or(true);
            if busy {
                continue;
            }
            let outcome = scan_roles(
                world,
                memory,
                cfg,
                marker_set.as_ref(),
                remotes,
                &all_snaps,
                spawn,
                room,
                snap.as_ref(),
            );
            if outcome == ScanOutcome::Idle {
                idle.push((spawn, room.clone()));
            }
        }
    }

    bootstrap(world, memory, cfg, marker_set.as_ref(), &idle);
}

#[allow(clippy::too_many_arguments)]
fn scan_roles(
    world: &mut GameWorld,
    memory: &mut Memory,
    cfg: &Config,
    marker_set: &crate::flags::MarkerSet,
    remotes: keeper_logic::demand::RemoteTargets,
    all_snaps: &[std::rc::Rc<RoomSnapshot>],
    spawn: hecs::Entity,
    room: &str,
    snap: &RoomSnapshot,
) -> ScanOutcome {
    let snap_refs: Vec<&RoomSnapshot> = all_snaps.iter().map(|s| s.as_ref()).collect();

    for role in Role::ALL {
        // Bootstrappers go through their own path.
        if role == Role::Bootstrapper {
            continue;
        }
        let info = role.info();

        if info.multi_room {
            if marker_set.no_remote.contains(room) {
                continue;
            }
            if !info.important && snap.storage_energy < cfg.multi_room_energy_reserve {
                continue;
            }
        }

        let desired = match marker_set.desired_override(room, role) {
            Some(n) => n,
            None if info.multi_room => desired_global(role, &snap_refs, remotes),
            None => desired_in_room(role, snap),
        };
        if desired == 0 {
            continue;
        }

        let Some(body) = info.body.build(snap.energy_capacity) else {
            continue;
        };

        let scope = if info.multi_room { None } else { Some(room) };
        let (mut have, min_ttl) = live_count(world, role, scope);
        // A creep that will die before its replacement finishes
        // assembling no longer counts.
        if let Some(ttl) = min_ttl {
            if have > 0 && ttl < body.len() as u32 * SPAWN_TIME_PER_PART {
                have -= 1;
            }
        }
        if have >= desired {
            continue;
        }

        let cost = body_cost(&body);
        if world.room_energy(room).0 < cost {
            // Hold this spawn's energy for the priority role.
            return ScanOutcome::Saving;
        }

        let (name, seq) = mint_name(memory, role);
        match world.spawn_creep(spawn, &name, role, body, room) {
            Ok(_) => {
                log::info!("room {}: spawning {} ({}/{} {:?})", room, name, have + 1, desired, role);
                return ScanOutcome::Issued;
            }
            Err(CommandError::NotEnoughEnergy) => {
                rollback_name(memory, seq);
                return ScanOutcome::Saving;
            }
            Err(e) => {
                log::warn!("room {}: spawn of {} failed: {}", room, name, e);
                rollback_name(memory, seq);
            }
        }
    }
    ScanOutcome::Idle
}

/// Keep spawnless owned rooms supplied with bootstrappers, using spawns
/// that had nothing else to do this tick.
fn bootstrap(
    world: &mut GameWorld,
    memory: &mut Memory,
    cfg: &Config,
    marker_set: &crate::flags::MarkerSet,
    idle: &[(hecs::Entity, String)],
) {
    let targets: Vec<String> = world
        .my_rooms()
        .into_iter()
        .filter(|room| world.spawns_in(room).is_empty())
        .collect();
    if targets.is_empty() {
        return;
    }

    let mut idle = idle.iter();
    for target in targets {
        loop {
            let (have, _) = live_count(world, Role::Bootstrapper, Some(&target));
            if have >= cfg.bootstrap_desired {
                break;
            }
            let Some((spawn, spawn_room)) = idle.next() else { return };
            // Rooms marked no-remote keep their spawns to themselves.
            if marker_set.no_remote.contains(spawn_room) {
                continue;
            }
            let (_, capacity) = world.room_energy(spawn_room);
            let Some(body) = Role::Bootstrapper.info().body.build(capacity) else {
                continue;
            };
            if world.room_energy(spawn_room).0 < body_cost(&body) {
                continue;
            }
            let (name, seq) = mint_name(memory, Role::Bootstrapper);
            match world.spawn_creep(*spawn, &name, Role::Bootstrapper, body, &target) {
                Ok(_) => {
                    log::info!("room {}: bootstrapping {} toward {}", spawn_room, name, target);
                }
                Err(e) => {
                    log::warn!("bootstrap spawn of {} failed: {}", name, e);
                    rollback_name(memory, seq);
                }
            }
        }
    }
}

/// Emergency staffing check. Cheap; the engine calls it every tick and
/// the debounce lives here.
pub fn run_emergency(world: &mut GameWorld, memory: &mut Memory, ctx: &mut TickCtx, cfg: &Config) {
    for room in world.my_rooms() {
        if world.spawns_in(&room).is_empty() {
            continue;
        }
        let last = memory.get_u64(&["rooms", &room, "emergency", "last_check"]);
        if last != 0 && ctx.tick.saturating_sub(last) < cfg.emergency_check_after {
            continue;
        }
        memory.set_u64(&["rooms", &room, "emergency", "last_check"], ctx.tick);

        let snap = summarize(world, memory, ctx, &room);
        let shortfall = Role::CRITICAL.iter().any(|role| {
            desired_in_room(*role, &snap) > 0
                && live_count(world, *role, Some(&room)).0 == 0
        });

        let since = memory.get_u64(&["rooms", &room, "emergency", "since"]);
        if !shortfall {
            if since != 0 {
                memory.delete(&["rooms", &room, "emergency", "since"]);
            }
            continue;
        }
        if since == 0 {
            memory.set_u64(&["rooms", &room, "emergency", "since"], ctx.tick);
            continue;
        }
        if ctx.tick.saturating_sub(since) < cfg.emergency_escalate_after {
            continue;
        }

        // Sustained outage: force the smallest viable worker.
        for spawn in world.spawns_in(&room) {
            let busy = world
                .ecs
                .get::<&crate::components::SpawnFacility>(spawn)
                .map(|f| f.job.is_some())
                .unwrap_or(true);
            if busy {
                continue;
            }
            let (name, seq) = mint_name(memory, Role::Harvester);
            match world.spawn_creep(spawn, &name, Role::Harvester, EMERGENCY_BODY.to_vec(), &room) {
                Ok(_) => {
                    log::warn!("room {}: emergency spawn of {}", room, name);
                    memory.delete(&["rooms", &room, "emergency", "since"]);
                    break;
                }
                Err(e) => {
                    log::debug!("room {}: emergency spawn blocked: {}", room, e);
                    rollback_name(memory, seq);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Creep, Pos, Resource, SpawnFacility, Structure, StructureKind};
    use keeper_logic::body::Part;

    /// Owned level-4 room with storage, eight extensions and two
    /// container-covered sources. Capacity 700.
    fn economy_room(me: &str) -> GameWorld {
        let mut w = GameWorld::new(me);
        w.add_controller(Pos::new("alpha", 40, 40), 4, Some(me));
        w.add_structure(StructureKind::Spawn, Pos::new("alpha", 25, 25), Some(me));
        w.add_structure(StructureKind::Storage, Pos::new("alpha", 26, 25), Some(me));
        for i in 0..8 {
            w.add_structure(StructureKind::Extension, Pos::new("alpha", 20 + i, 28), Some(me));
        }
        for (x, y) in [(10, 10), (40, 10)] {
            w.add_source(Pos::new("alpha", x, y), 3_000);
            w.add_structure(StructureKind::Container, Pos::new("alpha", x, y + 1), None);
        }
        fill_energy(&mut w, "alpha");
        w
    }

    fn fill_energy(w: &mut GameWorld, room: &str) {
        for e in w.structures_in(room) {
            if let Ok(s) = w.ecs.query_one_mut::<&mut Structure>(e) {
                if matches!(s.kind, StructureKind::Spawn | StructureKind::Extension) {
                    let free = s.free_capacity();
                    s.store.add(Resource::Energy, free);
                }
            }
        }
    }

    fn spawn_jobs(w: &GameWorld) -> usize {
        w.ecs
            .query::<&SpawnFacility>()
            .iter()
            .filter(|(_, f)| f.job.is_some())
            .count()
    }

    #[test]
    fn one_command_per_spawn_in_catalog_order() {
        let mut w = economy_room("keeper");
        // Two more spawns and enough extensions to afford three bodies.
        w.add_structure(StructureKind::Spawn, Pos::new("alpha", 30, 25), Some("keeper"));
        w.add_structure(StructureKind::Spawn, Pos::new("alpha", 35, 25), Some("keeper"));
        for i in 0..22 {
            w.add_structure(StructureKind::Extension, Pos::new("alpha", 5 + i, 30), Some("keeper"));
        }
        fill_energy(&mut w, "alpha");
        let mut memory = Memory::new();
        let mut ctx = TickCtx::new(1);

        run(&mut w, &mut memory, &mut ctx, &Config::default());
        assert_eq!(spawn_jobs(&w), 3);
        // Miner demand (two covered sources) fills first; the third
        // spawn sees the in-flight miners and moves on to haulers.
        assert_eq!(w.creeps_of_role(Role::StaticHarvester).len(), 2);
        assert_eq!(w.creeps_of_role(Role::Hauler).len(), 1);
    }

    #[test]
    fn single_spawn_issues_one_command_despite_many_shortfalls() {
        let mut w = economy_room("keeper");
        let mut memory = Memory::new();
        let mut ctx = TickCtx::new(1);
        run(&mut w, &mut memory, &mut ctx, &Config::default());
        assert_eq!(w.my_creeps().len(), 1);
        assert_eq!(spawn_jobs(&w), 1);
    }

    #[test]
    fn names_are_sequential_and_roll_back_on_failure() {
        let mut memory = Memory::new();
        let (a, _) = mint_name(&mut memory, Role::Filler);
        let (b, seq) = mint_name(&mut memory, Role::Hauler);
        assert_eq!(a, "filler0000");
        assert_eq!(b, "hauler0001");
        rollback_name(&mut memory, seq);
        let (c, _) = mint_name(&mut memory, Role::Filler);
        assert_eq!(c, "filler0001");
    }

    #[test]
    fn dying_creep_triggers_early_replacement() {
        let mut w = economy_room("keeper");
        // Full population of miners, one about to expire.
        for (i, ttl) in [(1, 1_000), (2, 5)] {
            let mut c = Creep::new(
                format!("miner000{}", i),
                Role::StaticHarvester,
                "alpha",
                vec![Part::Carry, Part::Move, Part::Work],
            );
            c.ticks_to_live = ttl;
            w.add_creep(c, Pos::new("alpha", 10 + i, 11));
        }
        let mut memory = Memory::new();
        let mut ctx = TickCtx::new(1);
        run(&mut w, &mut memory, &mut ctx, &Config::default());
        assert_eq!(w.creeps_of_role(Role::StaticHarvester).len(), 3);
    }

    #[test]
    fn multi_room_roles_wait_for_stored_energy() {
        use crate::components::MarkerColor;
        let mut w = economy_room("keeper");
        w.connect("alpha", "east");
        w.add_marker("rsv", Pos::new("east", 1, 1), MarkerColor::Yellow, MarkerColor::Red);
        w.add_controller(Pos::new("east", 40, 40), 0, None);
        // Enough live workers that the catalog reaches Reserver.
        saturate_room_roles(&mut w);

        let mut memory = Memory::new();
        let mut ctx = TickCtx::new(1);
        run(&mut w, &mut memory, &mut ctx, &Config::default());
        assert!(w.creeps_of_role(Role::Reserver).is_empty());

        // With a funded storage the reserver spawns.
        add_storage_energy(&mut w, 50_000);
        let mut ctx = TickCtx::new(2);
        run(&mut w, &mut memory, &mut ctx, &Config::default());
        assert_eq!(w.creeps_of_role(Role::Reserver).len(), 1);
    }

    fn saturate_room_roles(w: &mut GameWorld) {
        let worker = [Part::Work, Part::Carry, Part::Move];
        for (role, n) in [
            (Role::StaticHarvester, 2),
            (Role::Hauler, 2),
            (Role::Filler, 1),
            (Role::Repairer, 1),
            (Role::Upgrader, 2),
        ] {
            for i in 0..n {
                let name = format!("{}9{:03}", role.info().prefix, i);
                w.add_creep(Creep::new(name, role, "alpha", worker.to_vec()), Pos::new("alpha", 20, 20));
            }
        }
    }

    fn add_storage_energy(w: &mut GameWorld, amount: u32) {
        for e in w.structures_of_kind("alpha", StructureKind::Storage) {
            if let Ok(s) = w.ecs.query_one_mut::<&mut Structure>(e) {
                s.store.add(Resource::Energy, amount);
            }
        }
    }

    #[test]
    fn emergency_spawn_waits_out_the_debounce_then_fires_once() {
        let mut cfg = Config::default();
        cfg.emergency_check_after = 2;
        cfg.emergency_escalate_after = 10;

        let mut w = economy_room("keeper");
        let mut memory = Memory::new();

        // Sources are covered, so StaticHarvester demand is positive and
        // unmet; the main allocator is deliberately not running.
        let mut ctx = TickCtx::new(1);
        run_emergency(&mut w, &mut memory, &mut ctx, &cfg);
        assert!(w.my_creeps().is_empty());
        assert_eq!(memory.get_u64(&["rooms", "alpha", "emergency", "since"]), 1);

        // Inside the escalation window: still nothing.
        let mut ctx = TickCtx::new(5);
        run_emergency(&mut w, &mut memory, &mut ctx, &cfg);
        assert!(w.my_creeps().is_empty());

        // Past the window: one minimal worker, timer reset.
        let mut ctx = TickCtx::new(12);
        run_emergency(&mut w, &mut memory, &mut ctx, &cfg);
        assert_eq!(w.my_creeps().len(), 1);
        let creep = w.creep_data(w.my_creeps()[0]).unwrap();
        assert_eq!(creep.role, Role::Harvester);
        assert_eq!(creep.body, EMERGENCY_BODY.to_vec());
        assert_eq!(memory.get_u64(&["rooms", "alpha", "emergency", "since"]), 0);

        // The debounce restarts from scratch; no immediate second spawn.
        let mut ctx = TickCtx::new(15);
        run_emergency(&mut w, &mut memory, &mut ctx, &cfg);
        assert_eq!(w.my_creeps().len(), 1);
    }

    #[test]
    fn bootstrap_supplies_spawnless_owned_rooms() {
        let mut cfg = Config::default();
        cfg.bootstrap_desired = 2;

        let mut w = economy_room("keeper");
        w.connect("alpha", "beta");
        // Owned, no spawn.
        w.add_controller(Pos::new("beta", 40, 40), 1, Some("keeper"));
        saturate_room_roles(&mut w);
        add_storage_energy(&mut w, 50_000);

        let mut memory = Memory::new();
        let mut ctx = TickCtx::new(1);
        run(&mut w, &mut memory, &mut ctx, &cfg);

        let bootstrappers = w.creeps_of_role(Role::Bootstrapper);
        assert_eq!(bootstrappers.len(), 1);
        let c = w.creep_data(bootstrappers[0]).unwrap();
        assert_eq!(c.home_room, "beta");
    }

    #[test]
    fn no_remote_rooms_keep_their_spawns_out_of_bootstrap() {
        use crate::components::MarkerColor;
        let mut cfg = Config::default();
        cfg.bootstrap_desired = 2;

        let mut w = economy_room("keeper");
        w.connect("alpha", "beta");
        w.add_controller(Pos::new("beta", 40, 40), 1, Some("keeper"));
        saturate_room_roles(&mut w);
        add_storage_energy(&mut w, 50_000);
        w.add_marker("keep_home", Pos::new("alpha", 1, 1), MarkerColor::Red, MarkerColor::Yellow);

        let mut memory = Memory::new();
        let mut ctx = TickCtx::new(1);
        run(&mut w, &mut memory, &mut ctx, &cfg);

        assert!(w.creeps_of_role(Role::Bootstrapper).is_empty());
    }
}
