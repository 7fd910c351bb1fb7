//! Per-tick working context.
//!
//! Everything here is rebuilt at the top of each tick and thrown away at
//! the end: memoized room snapshots and the parsed marker set. Passing
//! the context explicitly (instead of reaching for globals) keeps every
//! planner honest about what it reads and lets tests hand in exactly the
//! state they want.

use std::collections::HashMap;
use std::rc::Rc;

use keeper_logic::snapshot::RoomSnapshot;

use crate::flags::MarkerSet;

/// One tick's scratch state.
#[derive(Default)]
pub struct TickCtx {
    pub tick: u64,
    /// Memoized snapshots; a second summarize of the same room returns
    /// the same `Rc`.
    pub snapshots: HashMap<String, Rc<RoomSnapshot>>,
    /// Parsed markers, built once per tick on first use.
    pub markers: Option<Rc<MarkerSet>>,
}

impl TickCtx {
    pub fn new(tick: u64) -> Self {
        Self { tick, ..Default::default() }
    }
}
