//! Pure colony decision logic for Keeper.
//!
//! This crate contains all planning logic that is independent of the world
//! model, the engine, or any runtime. Functions take plain data (room
//! snapshots, marker tallies, persisted state) and return decisions, making
//! them unit-testable and portable.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`body`] | Creep body parts, part costs, greedy group-based body planning |
//! | [`config`] | Runtime tuning knobs (cadences, debounce windows, thresholds) |
//! | [`constants`] | Game-balance constants shared by planner and engine |
//! | [`demand`] | Per-role desired worker counts from room snapshots |
//! | [`ratchet`] | Monotone wall/rampart repair-floor raising decisions |
//! | [`repair`] | Repair classes, priority ordering, hysteresis transitions |
//! | [`roles`] | Closed role catalog: spawn priority, body plans, role flags |
//! | [`snapshot`] | Plain-data per-room summary consumed by all planners |

pub mod body;
pub mod config;
pub mod constants;
pub mod demand;
pub mod ratchet;
pub mod repair;
pub mod roles;
pub mod snapshot;
