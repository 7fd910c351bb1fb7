//! Game-balance constants shared by the planners and the engine.
//!
//! Tuning knobs that an operator might reasonably change live in
//! [`crate::config::Config`] instead; these are fixed rules of the world.

/// Ticks of spawn time consumed per body part.
pub const SPAWN_TIME_PER_PART: u32 = 3;

/// Lifespan of a freshly spawned creep, in ticks.
pub const CREEP_LIFETIME: u32 = 1500;

/// Lifespan of a claim-carrying creep, in ticks.
pub const CLAIM_CREEP_LIFETIME: u32 = 600;

/// Creep name sequence wraps at this modulus (names are `prefix` + 4 digits).
pub const SPAWN_ID_MODULO: u64 = 10_000;

/// Energy capacity of a bare spawn.
pub const SPAWN_ENERGY_CAPACITY: u32 = 300;

/// Energy capacity of a single extension.
pub const EXTENSION_ENERGY_CAPACITY: u32 = 50;

/// Energy harvested per WORK part per harvest action.
pub const HARVEST_POWER: u32 = 2;

/// Construction progress per WORK part per build action.
pub const BUILD_POWER: u32 = 5;

/// Hits restored per WORK part per repair action.
pub const REPAIR_POWER: u32 = 100;

/// Controller progress per WORK part per upgrade action.
pub const UPGRADE_POWER: u32 = 1;

/// Damage dealt per ATTACK part per attack action.
pub const ATTACK_POWER: u32 = 30;

/// Hits restored per HEAL part per heal action.
pub const HEAL_POWER: u32 = 12;

/// Tower attack damage at point-blank range.
pub const TOWER_ATTACK_POWER: u32 = 600;

/// Tower repair amount at point-blank range.
pub const TOWER_REPAIR_POWER: u32 = 800;

/// Tower heal amount at point-blank range.
pub const TOWER_HEAL_POWER: u32 = 400;

/// Energy a tower spends per action.
pub const TOWER_ACTION_COST: u32 = 10;

/// Fraction of transferred link energy lost in transit.
pub const LINK_LOSS_RATIO: f64 = 0.03;

/// Link cooldown ticks per room of distance (same-room relay uses 1).
pub const LINK_COOLDOWN: u32 = 1;

/// Source energy pool refills this many ticks after first harvest.
pub const SOURCE_REGEN_TIME: u32 = 300;

/// Highest controller level.
pub const MAX_CONTROLLER_LEVEL: u8 = 8;

/// Hard hit ceiling for walls and ramparts; no ratchet override passes it.
pub const FORT_HITS_MAX: u32 = 300_000_000;

/// Minimum energy to assemble the smallest viable worker.
pub const MIN_WORKER_COST: u32 = 200;
