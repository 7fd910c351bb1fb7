//! Structure, terrain-object, and marker components.

use keeper_logic::body::Part;
use keeper_logic::repair::RepairClass;
use keeper_logic::roles::Role;
use serde::{Deserialize, Serialize};

use super::units::{Resource, Store};

/// Every structure kind the world model knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StructureKind {
    Spawn,
    Extension,
    Tower,
    Storage,
    Terminal,
    Lab,
    Link,
    Container,
    Road,
    Rampart,
    Wall,
    Extractor,
}

impl StructureKind {
    pub fn repair_class(self) -> RepairClass {
        match self {
            StructureKind::Spawn => RepairClass::Spawn,
            StructureKind::Tower => RepairClass::Tower,
            StructureKind::Storage => RepairClass::Storage,
            StructureKind::Terminal => RepairClass::Terminal,
            StructureKind::Lab => RepairClass::Lab,
            StructureKind::Extractor => RepairClass::Extractor,
            StructureKind::Extension => RepairClass::Extension,
            StructureKind::Link => RepairClass::Link,
            StructureKind::Container => RepairClass::Container,
            StructureKind::Road => RepairClass::Road,
            StructureKind::Rampart => RepairClass::Rampart,
            StructureKind::Wall => RepairClass::Wall,
        }
    }

    pub fn energy_capacity(self) -> u32 {
        match self {
            StructureKind::Spawn => 300,
            StructureKind::Extension => 50,
            StructureKind::Tower => 1_000,
            StructureKind::Link => 800,
            StructureKind::Storage => 1_000_000,
            StructureKind::Terminal => 300_000,
            StructureKind::Container => 2_000,
            StructureKind::Lab => 2_000,
            _ => 0,
        }
    }

    pub fn default_hits(self) -> u32 {
        match self {
            StructureKind::Rampart => 300_000,
            StructureKind::Wall => 300_000_000,
            StructureKind::Road => 5_000,
            StructureKind::Container => 250_000,
            _ => 5_000,
        }
    }

    /// Construction progress required to finish a site of this kind.
    pub fn build_cost(self) -> u32 {
        match self {
            StructureKind::Spawn => 15_000,
            StructureKind::Extension => 3_000,
            StructureKind::Tower => 5_000,
            StructureKind::Storage => 30_000,
            StructureKind::Terminal => 100_000,
            StructureKind::Lab => 50_000,
            StructureKind::Link => 5_000,
            StructureKind::Container => 5_000,
            StructureKind::Road => 300,
            StructureKind::Rampart => 1,
            StructureKind::Wall => 1,
            StructureKind::Extractor => 5_000,
        }
    }
}

/// A built structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Structure {
    pub kind: StructureKind,
    pub hits: u32,
    pub hits_max: u32,
    pub store: Store,
    pub capacity: u32,
    /// `None` for neutral structures (roads, containers, walls).
    pub owner: Option<String>,
}

impl Structure {
    pub fn new(kind: StructureKind, owner: Option<String>) -> Self {
        let hits = kind.default_hits();
        Self {
            kind,
            hits,
            hits_max: hits,
            store: Store::default(),
            capacity: kind.energy_capacity(),
            owner,
        }
    }

    pub fn free_capacity(&self) -> u32 {
        self.capacity.saturating_sub(self.store.total())
    }

    pub fn energy_fraction(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        self.store.total() as f64 / self.capacity as f64
    }

    pub fn hits_fraction(&self) -> f64 {
        if self.hits_max == 0 {
            return 1.0;
        }
        self.hits as f64 / self.hits_max as f64
    }
}

/// Spawn facility state attached to spawn structures.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpawnFacility {
    pub name: String,
    pub job: Option<SpawnJob>,
}

/// An in-flight creep assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnJob {
    /// ObjectId of the creep entity being assembled.
    pub creep: u64,
    pub remaining: u32,
}

/// Link relay state attached to link structures.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LinkState {
    pub cooldown: u32,
}

/// Room controller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Controller {
    pub level: u8,
    pub owner: Option<String>,
    pub reserved_by: Option<String>,
    pub progress: u64,
}

impl Controller {
    /// Progress needed to reach the next level.
    pub fn next_level_cost(&self) -> u64 {
        match self.level {
            0 => 1,
            1 => 200,
            2 => 45_000,
            3 => 135_000,
            4 => 405_000,
            5 => 1_215_000,
            6 => 3_645_000,
            7 => 10_935_000,
            _ => u64::MAX,
        }
    }
}

/// Harvestable energy source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceNode {
    pub energy: u32,
    pub capacity: u32,
    /// Tick the pool refills, set on first harvest of a cycle.
    pub regen_at: Option<u64>,
}

impl SourceNode {
    pub fn new(capacity: u32) -> Self {
        Self { energy: capacity, capacity, regen_at: None }
    }
}

/// Mineral deposit, workable only through an extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MineralNode {
    pub resource: Resource,
    pub amount: u32,
}

/// Planned structure under construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructionSite {
    pub kind: StructureKind,
    pub progress: u32,
    pub owner: String,
}

/// Energy or minerals lying on the ground.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DroppedResource {
    pub resource: Resource,
    pub amount: u32,
}

/// Operator marker colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarkerColor {
    Red,
    Purple,
    Blue,
    Green,
    Yellow,
    Orange,
    Brown,
    White,
}

/// In-world operator marker; color pair selects the directive, the name
/// carries parameters (see `flags`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Marker {
    pub name: String,
    pub primary: MarkerColor,
    pub secondary: MarkerColor,
}

/// Marker directive parameters for desired-count overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DesiredOverride {
    pub role: Role,
    pub count: u32,
}

/// Smallest emergency body: one group of the baseline worker.
pub const EMERGENCY_BODY: [Part; 3] = [Part::Work, Part::Carry, Part::Move];
