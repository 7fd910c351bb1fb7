//! Keeper Headless Colony Harness
//!
//! Runs the full agent against synthetic worlds — no game server, no
//! networking, no rendering. Exercises the planner crate directly and the
//! engine end to end.
//!
//! Usage:
//!   cargo run -p keeper-simtest
//!   cargo run -p keeper-simtest -- --verbose

use keeper_core::components::{Hostile, Pos, Resource, Structure, StructureKind};
use keeper_core::engine::ColonyEngine;
use keeper_core::world::GameWorld;
use keeper_logic::config::Config;
use keeper_logic::demand::{self, RemoteTargets};
use keeper_logic::ratchet::{self, RatchetState, RatchetStep};
use keeper_logic::repair::{band_for, needs_repair_transition, RepairClass};
use keeper_logic::roles::Role;
use keeper_logic::snapshot::RoomSnapshot;

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn main() {
    env_logger::init();
    let verbose = std::env::args().any(|a| a == "--verbose");
    println!("=== Keeper Colony Harness ===\n");

    let mut results = Vec::new();

    // 1. Role catalog consistency
    results.extend(validate_role_catalog(verbose));

    // 2. Demand planner sweep
    results.extend(validate_demand_logic(verbose));

    // 3. Repair priority & hysteresis
    results.extend(validate_repair_logic(verbose));

    // 4. Fortification ratchet long run
    results.extend(validate_ratchet_logic(verbose));

    // 5. Fresh colony boot (full engine)
    results.extend(validate_colony_boot(verbose));

    // 6. Emergency staffing path
    results.extend(validate_emergency_path(verbose));

    // 7. Tower defense
    results.extend(validate_defense(verbose));

    // 8. Snapshot save/load round trip
    results.extend(validate_persistence(verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

// ── World builders ──────────────────────────────────────────────────────

/// Level-1 starter room: one spawn, two sources, nothing else.
fn starter_room() -> GameWorld {
    let mut w = GameWorld::new("keeper");
    w.add_controller(Pos::new("alpha", 40, 40), 1, Some("keeper"));
    w.add_structure(StructureKind::Spawn, Pos::new("alpha", 25, 25), Some("keeper"));
    w.add_source(Pos::new("alpha", 10, 10), 3_000);
    w.add_source(Pos::new("alpha", 40, 10), 3_000);
    fill_spawn_net(&mut w, "alpha", 300);
    w
}

/// Container-mining room with extensions, a storage, and covered sources.
fn developed_room() -> GameWorld {
    let mut w = GameWorld::new("keeper");
    w.add_controller(Pos::new("alpha", 40, 40), 4, Some("keeper"));
    w.add_structure(StructureKind::Spawn, Pos::new("alpha", 25, 25), Some("keeper"));
    for i in 0..8 {
        w.add_structure(
            StructureKind::Extension,
            Pos::new("alpha", 20 + i, 22),
            Some("keeper"),
        );
    }
    w.add_structure(StructureKind::Storage, Pos::new("alpha", 27, 25), Some("keeper"));
    w.add_source(Pos::new("alpha", 10, 10), 3_000);
    w.add_structure(StructureKind::Container, Pos::new("alpha", 11, 10), None);
    w.add_source(Pos::new("alpha", 40, 10), 3_000);
    w.add_structure(StructureKind::Container, Pos::new("alpha", 39, 10), None);
    w
}

/// Fill spawns and extensions in a room with up to `amount` energy total.
fn fill_spawn_net(w: &mut GameWorld, room: &str, mut amount: u32) {
    for kind in [StructureKind::Spawn, StructureKind::Extension] {
        for e in w.structures_of_kind(room, kind) {
            if amount == 0 {
                return;
            }
            if let Ok(s) = w.ecs.query_one_mut::<&mut Structure>(e) {
                let take = amount.min(s.free_capacity());
                s.store.add(Resource::Energy, take);
                amount -= take;
            }
        }
    }
}

// ── 1. Role Catalog ─────────────────────────────────────────────────────

fn validate_role_catalog(verbose: bool) -> Vec<TestResult> {
    println!("--- Role Catalog ---");
    let mut results = Vec::new();

    // Prefixes are unique and round-trip through from_prefix.
    let mut prefixes = Vec::new();
    let mut round_trips = true;
    for role in Role::ALL {
        let prefix = role.info().prefix;
        prefixes.push(prefix);
        if Role::from_prefix(prefix) != Some(role) {
            round_trips = false;
        }
    }
    let unique = {
        let mut sorted = prefixes.clone();
        sorted.sort_unstable();
        sorted.dedup();
        sorted.len() == prefixes.len()
    };
    results.push(TestResult {
        name: "catalog_prefixes_unique".into(),
        passed: unique,
        detail: format!("{} roles, {} distinct prefixes", Role::ALL.len(), prefixes.len()),
    });
    results.push(TestResult {
        name: "catalog_prefix_round_trip".into(),
        passed: round_trips,
        detail: "every prefix resolves back to its role".into(),
    });

    // Every role can build a body at a rich room's budget, and the body
    // never exceeds that budget.
    let budget = 12_900u32;
    let mut all_build = true;
    let mut all_affordable = true;
    for role in Role::ALL {
        match role.info().body.build(budget) {
            Some(body) => {
                if keeper_logic::body::body_cost(&body) > budget {
                    all_affordable = false;
                }
                if verbose {
                    println!(
                        "    {:10} {} parts, {} energy",
                        role.info().prefix,
                        body.len(),
                        keeper_logic::body::body_cost(&body)
                    );
                }
            }
            None => all_build = false,
        }
    }
    results.push(TestResult {
        name: "catalog_bodies_build_at_full_budget".into(),
        passed: all_build && all_affordable,
        detail: format!("all 16 bodies build within {} energy", budget),
    });

    // A claim body cannot be built in a 300-capacity room.
    results.push(TestResult {
        name: "catalog_claim_needs_capacity".into(),
        passed: Role::Reserver.info().body.build(300).is_none(),
        detail: "reserver body unavailable below 650 energy".into(),
    });

    results
}

// ── 2. Demand Planner ───────────────────────────────────────────────────

fn validate_demand_logic(_verbose: bool) -> Vec<TestResult> {
    println!("--- Demand Planner ---");
    let mut results = Vec::new();

    let base = RoomSnapshot {
        name: "alpha".into(),
        owned: true,
        level: 4,
        sources: 2,
        sources_with_container: 2,
        containers: 2,
        has_storage: true,
        spawns: 1,
        ..RoomSnapshot::default()
    };

    // Container mining staffs one miner per covered source.
    results.push(TestResult {
        name: "demand_miner_per_covered_source".into(),
        passed: demand::desired_in_room(Role::StaticHarvester, &base) == 2,
        detail: "2 covered sources → 2 static harvesters".into(),
    });

    // Hand harvesters only before container mining is up.
    let fresh = RoomSnapshot {
        level: 1,
        sources_with_container: 0,
        containers: 0,
        has_storage: false,
        ..base.clone()
    };
    let hand_fresh = demand::desired_in_room(Role::Harvester, &fresh);
    let hand_grown = demand::desired_in_room(Role::Harvester, &base);
    results.push(TestResult {
        name: "demand_hand_harvest_transitional".into(),
        passed: hand_fresh == 2 && hand_grown == 0,
        detail: format!("fresh room wants {}, developed wants {}", hand_fresh, hand_grown),
    });

    // No construction sites, no builders.
    let with_sites = RoomSnapshot { construction_sites: 4, ..base.clone() };
    results.push(TestResult {
        name: "demand_builders_follow_sites".into(),
        passed: demand::desired_in_room(Role::Builder, &base) == 0
            && demand::desired_in_room(Role::Builder, &with_sites) >= 1,
        detail: "builders only demanded while sites exist".into(),
    });

    // Upgrader throttles down at max level.
    let maxed = RoomSnapshot { level: 8, ..base.clone() };
    results.push(TestResult {
        name: "demand_upgraders_throttle_at_cap".into(),
        passed: demand::desired_in_room(Role::Upgrader, &base) == 2
            && demand::desired_in_room(Role::Upgrader, &maxed) == 1,
        detail: "2 upgraders normally, 1 at level 8".into(),
    });

    // Unowned rooms demand nothing room-scoped.
    let unowned = RoomSnapshot { owned: false, ..base.clone() };
    let any_demand = Role::ALL
        .iter()
        .any(|&r| demand::desired_in_room(r, &unowned) > 0);
    results.push(TestResult {
        name: "demand_unowned_rooms_idle".into(),
        passed: !any_demand,
        detail: "no room-scoped demand in unowned rooms".into(),
    });

    // Remote markers drive multi-room counts.
    let snaps = [&base];
    let remotes = RemoteTargets { reserve_rooms: 2, ..RemoteTargets::default() };
    results.push(TestResult {
        name: "demand_reservers_track_markers".into(),
        passed: demand::desired_global(Role::Reserver, &snaps, remotes) == 2
            && demand::desired_global(Role::Reserver, &snaps, RemoteTargets::default()) == 0,
        detail: "2 reserve markers → 2 reservers".into(),
    });

    results
}

// ── 3. Repair Priority & Hysteresis ─────────────────────────────────────

fn validate_repair_logic(_verbose: bool) -> Vec<TestResult> {
    println!("--- Repair Priority & Hysteresis ---");
    let mut results = Vec::new();

    // Spawns outrank roads, roads outrank walls.
    let spawn_p = RepairClass::Spawn.priority();
    let road_p = RepairClass::Road.priority();
    let wall_p = RepairClass::Wall.priority();
    results.push(TestResult {
        name: "repair_priority_ordering".into(),
        passed: spawn_p < road_p && road_p < wall_p,
        detail: format!("spawn={} road={} wall={}", spawn_p, road_p, wall_p),
    });

    // Fortifications partner with each other and nothing else does.
    results.push(TestResult {
        name: "repair_fort_partnering".into(),
        passed: RepairClass::Wall.ratchet_partner() == Some(RepairClass::Rampart)
            && RepairClass::Rampart.ratchet_partner() == Some(RepairClass::Wall)
            && RepairClass::Road.ratchet_partner().is_none(),
        detail: "wall⇄rampart, roads unpartnered".into(),
    });

    // Road hysteresis: flag below 66%, keep the flag until 95%.
    let band = band_for(RepairClass::Road, 0, 0);
    let flags_low = needs_repair_transition(false, 3_000, 5_000, band);
    let holds_mid = needs_repair_transition(true, 4_000, 5_000, band);
    let ignores_mid = needs_repair_transition(false, 4_000, 5_000, band);
    let clears_high = needs_repair_transition(true, 4_800, 5_000, band);
    results.push(TestResult {
        name: "repair_road_hysteresis".into(),
        passed: flags_low && holds_mid && !ignores_mid && !clears_high,
        detail: "60% flags, 80% holds only if already flagged, 96% clears".into(),
    });

    // Wall band follows the ratchet floor, not the (huge) hits_max.
    let wall_band = band_for(RepairClass::Wall, 250_000, 30_000);
    let below_floor = needs_repair_transition(false, 200_000, 300_000_000, wall_band);
    let above_band = needs_repair_transition(true, 281_000, 300_000_000, wall_band);
    results.push(TestResult {
        name: "repair_wall_absolute_band".into(),
        passed: below_floor && !above_band,
        detail: "200k flags against a 250k floor, 281k clears".into(),
    });

    results
}

// ── 4. Fortification Ratchet ────────────────────────────────────────────

fn validate_ratchet_logic(verbose: bool) -> Vec<TestResult> {
    println!("--- Fortification Ratchet ---");
    let mut results = Vec::new();
    let cfg = Config::default();

    // Simulate a workforce that always tops walls up to the current floor.
    // The floor must rise monotonically and stop exactly at the cap.
    let cap = 400_000u32;
    let mut state: Option<RatchetState> = None;
    let mut observed = 10_000u32;
    let mut raises = 0u32;
    let mut monotone = true;
    let mut last_floor = 0u32;

    for tick in (0..50_000u64).step_by(cfg.ratchet_check_interval as usize) {
        let step = ratchet::evaluate(state, Some(observed), None, cap, tick, &cfg);
        match step {
            RatchetStep::Init(floor) => {
                state = Some(RatchetState { floor, raised_at: tick });
            }
            RatchetStep::Raise(floor) => {
                if floor <= last_floor {
                    monotone = false;
                }
                last_floor = floor;
                raises += 1;
                state = Some(RatchetState { floor, raised_at: tick });
            }
            RatchetStep::Hold | RatchetStep::Deferred => {}
        }
        // Workforce catches up before the next evaluation.
        if let Some(s) = state {
            observed = observed.max(s.floor);
        }
    }

    let final_floor = state.map(|s| s.floor).unwrap_or(0);
    results.push(TestResult {
        name: "ratchet_reaches_cap_monotonically".into(),
        passed: monotone && final_floor == cap,
        detail: format!("{} raises, final floor {}", raises, final_floor),
    });

    // Expected raise count: (cap - min) / delta, plus the init.
    let expected_raises = (cap - cfg.ratchet_min) / cfg.ratchet_delta
        + u32::from((cap - cfg.ratchet_min) % cfg.ratchet_delta != 0);
    results.push(TestResult {
        name: "ratchet_step_count".into(),
        passed: raises == expected_raises,
        detail: format!("{} raises (expected {})", raises, expected_raises),
    });

    // A lagging partner blocks the whole climb.
    let stuck = ratchet::evaluate(
        Some(RatchetState { floor: 270_000, raised_at: 0 }),
        Some(280_000),
        Some(250_000),
        cfg.ratchet_max,
        10_000,
        &cfg,
    );
    results.push(TestResult {
        name: "ratchet_partner_gating".into(),
        passed: stuck == RatchetStep::Deferred,
        detail: "rampart floor 250k defers the wall raise".into(),
    });

    if verbose {
        println!("    cap {} reached in {} raises", cap, raises);
    }

    results
}

// ── 5. Fresh Colony Boot ────────────────────────────────────────────────

fn validate_colony_boot(verbose: bool) -> Vec<TestResult> {
    println!("--- Fresh Colony Boot ---");
    let mut results = Vec::new();

    let mut engine = ColonyEngine::new(starter_room(), Config::default());
    for _ in 0..300 {
        engine.tick();
    }

    let harvesters = engine.world.creeps_of_role(Role::Harvester).len();
    results.push(TestResult {
        name: "boot_hand_harvesters_spawned".into(),
        passed: harvesters >= 1,
        detail: format!("{} hand harvesters after 300 ticks", harvesters),
    });

    let total: usize = Role::ALL
        .iter()
        .map(|&r| engine.world.creeps_of_role(r).len())
        .sum();
    results.push(TestResult {
        name: "boot_economy_running".into(),
        passed: total >= 2,
        detail: format!("{} creeps alive", total),
    });

    results.push(TestResult {
        name: "boot_clock_advanced".into(),
        passed: engine.world.tick == 300,
        detail: format!("tick {}", engine.world.tick),
    });

    if verbose {
        for role in Role::ALL {
            let n = engine.world.creeps_of_role(role).len();
            if n > 0 {
                println!("    {:10}: {}", role.info().prefix, n);
            }
        }
    }

    results
}

// ── 6. Emergency Staffing ───────────────────────────────────────────────

fn validate_emergency_path(_verbose: bool) -> Vec<TestResult> {
    println!("--- Emergency Staffing ---");
    let mut results = Vec::new();

    // Developed room with no creeps and too little energy for a proper
    // miner body: the regular allocator saves forever, the emergency path
    // must eventually force a minimal worker out.
    let mut world = developed_room();
    fill_spawn_net(&mut world, "alpha", 250);

    // Harness override: shrink the debounce windows, same shape an
    // operator would deploy as JSON.
    let cfg: Config = serde_json::from_str(
        r#"{"emergency_check_after": 1, "emergency_escalate_after": 20}"#,
    )
    .unwrap_or_default();

    let mut engine = ColonyEngine::new(world, cfg);
    for _ in 0..10 {
        engine.tick();
    }
    let early = engine.world.creeps_of_role(Role::Harvester).len();
    results.push(TestResult {
        name: "emergency_waits_out_debounce".into(),
        passed: early == 0,
        detail: format!("{} workers before the escalation window", early),
    });

    for _ in 0..30 {
        engine.tick();
    }
    let spawned = engine.world.creeps_of_role(Role::Harvester);
    let minimal_body = spawned.first().map_or(false, |&e| {
        engine
            .world
            .creep_data(e)
            .map_or(false, |c| c.body.len() == 3)
    });
    results.push(TestResult {
        name: "emergency_forces_minimal_worker".into(),
        passed: spawned.len() == 1 && minimal_body,
        detail: format!("{} emergency workers, 3-part body", spawned.len()),
    });

    results
}

// ── 7. Tower Defense ────────────────────────────────────────────────────

fn validate_defense(_verbose: bool) -> Vec<TestResult> {
    println!("--- Tower Defense ---");
    let mut results = Vec::new();

    let mut world = developed_room();
    fill_spawn_net(&mut world, "alpha", 300);
    let tower = world.add_structure(StructureKind::Tower, Pos::new("alpha", 24, 24), Some("keeper"));
    if let Some(e) = world.entity(tower) {
        if let Ok(s) = world.ecs.query_one_mut::<&mut Structure>(e) {
            s.store.add(Resource::Energy, 1_000);
        }
    }
    let intruder = world.add_hostile(Pos::new("alpha", 30, 30), "invader", 2_000);

    let mut engine = ColonyEngine::new(world, Config::default());
    for _ in 0..3 {
        engine.tick();
    }

    let hits = engine
        .world
        .entity(intruder)
        .and_then(|e| engine.world.ecs.get::<&Hostile>(e).ok().map(|h| h.hits));
    let weakened = hits.map_or(true, |h| h < 2_000);
    results.push(TestResult {
        name: "defense_tower_engages".into(),
        passed: weakened,
        detail: match hits {
            Some(h) => format!("intruder at {}/2000 hits after 3 ticks", h),
            None => "intruder destroyed".into(),
        },
    });

    let window = engine
        .world
        .hostiles_in("alpha")
        .len();
    results.push(TestResult {
        name: "defense_threat_tracked".into(),
        passed: window <= 1,
        detail: format!("{} hostiles still visible", window),
    });

    results
}

// ── 8. Persistence ──────────────────────────────────────────────────────

fn validate_persistence(_verbose: bool) -> Vec<TestResult> {
    println!("--- Persistence ---");
    let mut results = Vec::new();

    let path = std::env::temp_dir().join("keeper_simtest_snapshot.bin");

    let mut engine = ColonyEngine::new(starter_room(), Config::default());
    for _ in 0..50 {
        engine.tick();
    }
    let tick_before = engine.world.tick;
    let creeps_before: usize = Role::ALL
        .iter()
        .map(|&r| engine.world.creeps_of_role(r).len())
        .sum();

    let saved = engine.save(&path);
    results.push(TestResult {
        name: "persist_save_succeeds".into(),
        passed: saved.is_ok(),
        detail: format!("snapshot at {}", path.display()),
    });

    match ColonyEngine::load(&path, Config::default()) {
        Ok(mut loaded) => {
            let creeps_after: usize = Role::ALL
                .iter()
                .map(|&r| loaded.world.creeps_of_role(r).len())
                .sum();
            results.push(TestResult {
                name: "persist_state_survives".into(),
                passed: loaded.world.tick == tick_before && creeps_after == creeps_before,
                detail: format!(
                    "tick {} and {} creeps restored",
                    loaded.world.tick, creeps_after
                ),
            });

            // The restored colony keeps running.
            for _ in 0..20 {
                loaded.tick();
            }
            results.push(TestResult {
                name: "persist_resumes_ticking".into(),
                passed: loaded.world.tick == tick_before + 20,
                detail: format!("resumed to tick {}", loaded.world.tick),
            });
        }
        Err(e) => {
            results.push(TestResult {
                name: "persist_load_succeeds".into(),
                passed: false,
                detail: format!("load failed: {}", e),
            });
        }
    }

    let _ = std::fs::remove_file(&path);
    results
}
