//! Snapshot save and restore.
//!
//! The whole colony state serializes to a single bincode blob: world
//! entities component by component, the durable memory tree, and the
//! repair board. hecs entity ids are not stable across a reload, so the
//! object-id index is rebuilt from the persisted [`ObjectId`]s.

use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::components::{
    ConstructionSite, Controller, Creep, DroppedResource, Hostile, LinkState, Marker, MineralNode,
    ObjectId, Pos, SourceNode, SpawnFacility, Structure,
};
use crate::memory::Memory;
use crate::repair::RepairBoard;
use crate::world::GameWorld;

const SAVE_VERSION: u32 = 1;

#[derive(Debug)]
pub enum SaveError {
    Io(std::io::Error),
    Encode(bincode::Error),
    Memory(serde_json::Error),
    VersionMismatch { found: u32, expected: u32 },
}

impl std::fmt::Display for SaveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveError::Io(e) => write!(f, "save io error: {}", e),
            SaveError::Encode(e) => write!(f, "save encoding error: {}", e),
            SaveError::Memory(e) => write!(f, "save memory encoding error: {}", e),
            SaveError::VersionMismatch { found, expected } => {
                write!(f, "save version {} (expected {})", found, expected)
            }
        }
    }
}

impl std::error::Error for SaveError {}

impl From<std::io::Error> for SaveError {
    fn from(e: std::io::Error) -> Self {
        SaveError::Io(e)
    }
}

impl From<bincode::Error> for SaveError {
    fn from(e: bincode::Error) -> Self {
        SaveError::Encode(e)
    }
}

impl From<serde_json::Error> for SaveError {
    fn from(e: serde_json::Error) -> Self {
        SaveError::Memory(e)
    }
}

/// One entity, component by component.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SerializableEntity {
    object_id: Option<ObjectId>,
    pos: Option<Pos>,
    structure: Option<Structure>,
    spawn_facility: Option<SpawnFacility>,
    link_state: Option<LinkState>,
    controller: Option<Controller>,
    source: Option<SourceNode>,
    mineral: Option<MineralNode>,
    site: Option<ConstructionSite>,
    dropped: Option<DroppedResource>,
    marker: Option<Marker>,
    creep: Option<Creep>,
    hostile: Option<Hostile>,
}

#[derive(Serialize, Deserialize)]
struct SaveData {
    version: u32,
    tick: u64,
    me: String,
    next_id: u64,
    rooms: BTreeSet<String>,
    exits: HashMap<String, Vec<String>>,
    /// Memory tree as JSON bytes. `serde_json::Value` is self-describing
    /// and cannot pass through bincode directly.
    memory: Vec<u8>,
    board: RepairBoard,
    entities: Vec<SerializableEntity>,
}

fn serialize_entities(world: &GameWorld) -> Vec<SerializableEntity> {
    let mut entities = Vec::new();
    for entity_ref in world.ecs.iter() {
        let e = SerializableEntity {
            object_id: entity_ref.get::<&ObjectId>().map(|c| *c),
            pos: entity_ref.get::<&Pos>().map(|c| (*c).clone()),
            structure: entity_ref.get::<&Structure>().map(|c| (*c).clone()),
            spawn_facility: entity_ref.get::<&SpawnFacility>().map(|c| (*c).clone()),
            link_state: entity_ref.get::<&LinkState>().map(|c| *c),
            controller: entity_ref.get::<&Controller>().map(|c| (*c).clone()),
            source: entity_ref.get::<&SourceNode>().map(|c| (*c).clone()),
            mineral: entity_ref.get::<&MineralNode>().map(|c| (*c).clone()),
            site: entity_ref.get::<&ConstructionSite>().map(|c| (*c).clone()),
            dropped: entity_ref.get::<&DroppedResource>().map(|c| (*c).clone()),
            marker: entity_ref.get::<&Marker>().map(|c| (*c).clone()),
            creep: entity_ref.get::<&Creep>().map(|c| (*c).clone()),
            hostile: entity_ref.get::<&Hostile>().map(|c| (*c).clone()),
        };
        entities.push(e);
    }
    entities
}

fn spawn_entity(world: &mut GameWorld, e: SerializableEntity) {
    let mut builder = hecs::EntityBuilder::new();
    if let Some(c) = e.object_id {
        builder.add(c);
    }
    if let Some(c) = e.pos {
        builder.add(c);
    }
    if let Some(c) = e.structure {
        builder.add(c);
    }
    if let Some(c) = e.spawn_facility {
        builder.add(c);
    }
    if let Some(c) = e.link_state {
        builder.add(c);
    }
    if let Some(c) = e.controller {
        builder.add(c);
    }
    if let Some(c) = e.source {
        builder.add(c);
    }
    if let Some(c) = e.mineral {
        builder.add(c);
    }
    if let Some(c) = e.site {
        builder.add(c);
    }
    if let Some(c) = e.dropped {
        builder.add(c);
    }
    if let Some(c) = e.marker {
        builder.add(c);
    }
    if let Some(c) = e.creep {
        builder.add(c);
    }
    if let Some(c) = e.hostile {
        builder.add(c);
    }
    let entity = world.ecs.spawn(builder.build());
    if let Some(ObjectId(id)) = e.object_id {
        world.index.insert(id, entity);
    }
}

pub fn save(
    path: &Path,
    world: &GameWorld,
    memory: &Memory,
    board: &RepairBoard,
) -> Result<(), SaveError> {
    let data = SaveData {
        version: SAVE_VERSION,
        tick: world.tick,
        me: world.me.clone(),
        next_id: world.next_id,
        rooms: world.rooms.clone(),
        exits: world.exits.clone(),
        memory: serde_json::to_vec(memory.as_value())?,
        board: board.clone(),
        entities: serialize_entities(world),
    };
    let file = File::create(path)?;
    bincode::serialize_into(BufWriter::new(file), &data)?;
    Ok(())
}

pub fn load(path: &Path) -> Result<(GameWorld, Memory, RepairBoard), SaveError> {
    let file = File::open(path)?;
    let data: SaveData = bincode::deserialize_from(BufReader::new(file))?;
    if data.version != SAVE_VERSION {
        return Err(SaveError::VersionMismatch {
            found: data.version,
            expected: SAVE_VERSION,
        });
    }

    let mut world = GameWorld::new(data.me);
    world.tick = data.tick;
    world.next_id = data.next_id;
    world.rooms = data.rooms;
    world.exits = data.exits;
    for entity in data.entities {
        spawn_entity(&mut world, entity);
    }
    let memory = Memory::from_value(serde_json::from_slice(&data.memory)?);
    Ok((world, memory, data.board))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Resource, StructureKind};
    use keeper_logic::body::Part;
    use keeper_logic::roles::Role;

    #[test]
    fn save_and_load_round_trips_the_colony() {
        let dir = std::env::temp_dir();
        let path = dir.join("keeper_persistence_roundtrip.bin");

        let mut w = GameWorld::new("keeper");
        w.connect("alpha", "beta");
        w.add_controller(Pos::new("alpha", 40, 40), 4, Some("keeper"));
        let spawn_id =
            w.add_structure(StructureKind::Spawn, Pos::new("alpha", 25, 25), Some("keeper"));
        let creep_id = w.add_creep(
            Creep::new("miner0000", Role::StaticHarvester, "alpha", vec![Part::Work, Part::Move]),
            Pos::new("alpha", 10, 11),
        );
        let mut memory = Memory::new();
        memory.set_u64(&["spawn_seq"], 17);
        memory.set_u64(&["creeps", "miner0000", "source"], 3);
        let board = RepairBoard::new();

        save(&path, &w, &memory, &board).unwrap();
        let (loaded, loaded_memory, _board) = load(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        // Ids resolve to the same objects through the rebuilt index.
        let spawn = loaded.entity(spawn_id).unwrap();
        assert!(loaded.ecs.get::<&SpawnFacility>(spawn).is_ok());
        let creep = loaded.entity(creep_id).unwrap();
        assert_eq!(loaded.ecs.get::<&Creep>(creep).unwrap().name, "miner0000");

        assert_eq!(loaded.tick, w.tick);
        assert_eq!(loaded.visible_rooms(), vec!["alpha".to_string(), "beta".to_string()]);
        assert_eq!(loaded_memory.get_u64(&["spawn_seq"]), 17);
        assert_eq!(loaded_memory.get_u64(&["creeps", "miner0000", "source"]), 3);

        // New mints continue past the loaded ids.
        let mut loaded = loaded;
        let next = mint_next_id(&mut loaded);
        assert!(next > creep_id);
    }

    fn mint_next_id(w: &mut GameWorld) -> u64 {
        w.add_dropped(Pos::new("alpha", 1, 1), Resource::Energy, 10)
    }
}
