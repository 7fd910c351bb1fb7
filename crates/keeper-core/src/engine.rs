//! The colony engine: owns the world, durable memory, the repair board
//! and the tick loop that sequences every subsystem.

use std::path::Path;

use keeper_logic::config::Config;

use crate::context::TickCtx;
use crate::flags::markers;
use crate::memory::Memory;
use crate::persistence::{self, SaveError};
use crate::ratchet;
use crate::repair::RepairBoard;
use crate::roles;
use crate::spawn;
use crate::summarize::summarize;
use crate::telemetry::{self, LogSink, StatsSink};
use crate::world::GameWorld;
use crate::{links, towers};

pub struct ColonyEngine {
    pub world: GameWorld,
    pub memory: Memory,
    pub board: RepairBoard,
    pub config: Config,
    sink: Box<dyn StatsSink>,
    last_ratchet: u64,
    last_spawn_scan: u64,
    last_cross_check: u64,
    last_stats: u64,
}

impl ColonyEngine {
    pub fn new(world: GameWorld, config: Config) -> Self {
        Self {
            world,
            memory: Memory::new(),
            board: RepairBoard::new(),
            config,
            sink: Box::new(LogSink),
            last_ratchet: 0,
            last_spawn_scan: 0,
            last_cross_check: 0,
            last_stats: 0,
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn StatsSink>) -> Self {
        self.sink = sink;
        self
    }

    fn due(last: &mut u64, now: u64, interval: u64) -> bool {
        if now.saturating_sub(*last) >= interval {
            *last = now;
            true
        } else {
            false
        }
    }

    /// Advance the colony one tick.
    pub fn tick(&mut self) {
        self.world.begin_tick();
        let now = self.world.tick;
        let mut ctx = TickCtx::new(now);
        let cfg = self.config.clone();

        // Summarize every visible room up front so enemy windows fold
        // exactly once per tick.
        for room in self.world.visible_rooms() {
            summarize(&self.world, &mut self.memory, &mut ctx, &room);
        }

        // Dead creeps release their claims and their memory subtree.
        for name in self.world.take_dead() {
            self.board.creep_died(&name, &mut self.memory);
            self.memory.delete(&["creeps", &name]);
        }

        if Self::due(&mut self.last_ratchet, now, cfg.ratchet_check_interval) {
            ratchet::run(&self.world, &mut self.memory, &mut ctx, &cfg);
        }

        let marker_set = markers(&self.world, &mut ctx);
        self.board
            .maybe_rebuild(&self.world, &self.memory, marker_set.as_ref(), &cfg, now);

        spawn::run_emergency(&mut self.world, &mut self.memory, &mut ctx, &cfg);
        if Self::due(&mut self.last_spawn_scan, now, cfg.spawn_scan_interval) {
            spawn::run(&mut self.world, &mut self.memory, &mut ctx, &cfg);
        }

        roles::run_creeps(
            &mut self.world,
            &mut self.memory,
            &mut ctx,
            &cfg,
            &mut self.board,
        );

        links::run(&mut self.world, &self.memory, &cfg);
        towers::run(&mut self.world, &mut ctx, &cfg);

        if Self::due(&mut self.last_cross_check, now, cfg.cross_check_interval) {
            self.board.cross_check(&self.world, &mut self.memory);
        }

        if Self::due(&mut self.last_stats, now, cfg.stats_interval) {
            let stats = telemetry::collect(&self.world, &mut self.memory, &mut ctx);
            self.sink.record(&stats);
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), SaveError> {
        persistence::save(path, &self.world, &self.memory, &self.board)
    }

    pub fn load(path: &Path, config: Config) -> Result<Self, SaveError> {
        let (world, memory, board) = persistence::load(path)?;
        let mut engine = Self::new(world, config);
        engine.memory = memory;
        engine.board = board;
        Ok(engine)
    }
}
