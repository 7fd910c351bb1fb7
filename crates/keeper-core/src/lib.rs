//! Colony agent engine.
//!
//! Owns the hecs-backed world model and the per-tick decision loop:
//! summarize every visible room, keep the repair queue and fortification
//! ratchet current, allocate spawn capacity against the role catalog, and
//! drive every live creep through its role routine. Pure planning logic
//! lives in `keeper-logic`; this crate binds it to entities, durable
//! memory, and the tick cadence.

pub mod components;
pub mod context;
pub mod engine;
pub mod flags;
pub mod links;
pub mod memory;
pub mod persistence;
pub mod ratchet;
pub mod repair;
pub mod roles;
pub mod spawn;
pub mod summarize;
pub mod telemetry;
pub mod towers;
pub mod world;

pub use engine::ColonyEngine;
pub use memory::Memory;
pub use world::{CommandError, GameWorld};
