//! The hecs-backed world model.
//!
//! A deliberately simple stand-in for the real game server: rooms are
//! nodes in an adjacency graph, each a 50x50 tile grid; movement steps
//! one tile (or one room hop) per tick; actions resolve immediately with
//! the server's rejection taxonomy. Planners and roles are written
//! against [`CommandError`] and retry next tick on rejection, exactly as
//! they would against the real thing.

use std::collections::{BTreeSet, HashMap, VecDeque};

use hecs::Entity;
use keeper_logic::body::{body_cost, Part};
use keeper_logic::constants::{
    ATTACK_POWER, BUILD_POWER, HARVEST_POWER, HEAL_POWER, LINK_COOLDOWN, LINK_LOSS_RATIO,
    REPAIR_POWER, SOURCE_REGEN_TIME, SPAWN_TIME_PER_PART, TOWER_ACTION_COST, TOWER_ATTACK_POWER,
    TOWER_HEAL_POWER, TOWER_REPAIR_POWER,
};
use keeper_logic::roles::Role;
use rand::Rng;

use crate::components::*;

/// Why the world refused a command. Maps one-to-one onto the rejection
/// codes roles are written to tolerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    NotInRange,
    NotEnoughEnergy,
    NotEnoughResources,
    Busy,
    InvalidTarget,
    Full,
    NotOwner,
    NoPath,
    NoBodypart,
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CommandError::NotInRange => "not in range",
            CommandError::NotEnoughEnergy => "not enough energy",
            CommandError::NotEnoughResources => "not enough resources",
            CommandError::Busy => "busy",
            CommandError::InvalidTarget => "invalid target",
            CommandError::Full => "full",
            CommandError::NotOwner => "not owner",
            CommandError::NoPath => "no path",
            CommandError::NoBodypart => "missing body part",
        };
        f.write_str(s)
    }
}

pub type CmdResult<T = ()> = Result<T, CommandError>;

/// The game world: entities, rooms, and the command surface.
pub struct GameWorld {
    pub ecs: hecs::World,
    pub tick: u64,
    /// Our player name; everything owned by this string is ours.
    pub me: String,
    pub(crate) next_id: u64,
    pub(crate) index: HashMap<u64, Entity>,
    pub(crate) rooms: BTreeSet<String>,
    pub(crate) exits: HashMap<String, Vec<String>>,
    died: Vec<String>,
}

impl GameWorld {
    pub fn new(me: impl Into<String>) -> Self {
        Self {
            ecs: hecs::World::new(),
            tick: 0,
            me: me.into(),
            next_id: 1,
            index: HashMap::new(),
            rooms: BTreeSet::new(),
            exits: HashMap::new(),
            died: Vec::new(),
        }
    }

    // ── Rooms ───────────────────────────────────────────────────────────

    pub fn add_room(&mut self, name: &str) {
        self.rooms.insert(name.to_string());
        self.exits.entry(name.to_string()).or_default();
    }

    /// Connect two rooms with a bidirectional exit.
    pub fn connect(&mut self, a: &str, b: &str) {
        self.add_room(a);
        self.add_room(b);
        let fwd = self.exits.entry(a.to_string()).or_default();
        if !fwd.contains(&b.to_string()) {
            fwd.push(b.to_string());
        }
        let back = self.exits.entry(b.to_string()).or_default();
        if !back.contains(&a.to_string()) {
            back.push(a.to_string());
        }
    }

    pub fn visible_rooms(&self) -> Vec<String> {
        self.rooms.iter().cloned().collect()
    }

    /// Rooms whose controller we own.
    pub fn my_rooms(&self) -> Vec<String> {
        let mut rooms: Vec<String> = self
            .ecs
            .query::<(&Pos, &Controller)>()
            .iter()
            .filter(|(_, (_, c))| c.owner.as_deref() == Some(self.me.as_str()))
            .map(|(_, (pos, _))| pos.room.clone())
            .collect();
        rooms.sort();
        rooms.dedup();
        rooms
    }

    // ── Object construction ─────────────────────────────────────────────

    fn mint(&mut self, entity: Entity) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        let _ = self.ecs.insert_one(entity, ObjectId(id));
        self.index.insert(id, entity);
        id
    }

    pub fn add_structure(&mut self, kind: StructureKind, pos: Pos, owner: Option<&str>) -> u64 {
        self.add_room(&pos.room);
        let structure = Structure::new(kind, owner.map(str::to_string));
        let entity = self.ecs.spawn((pos, structure));
        let id = self.mint(entity);
        match kind {
            StructureKind::Spawn => {
                let facility = SpawnFacility { name: format!("spawn{}", id), job: None };
                let _ = self.ecs.insert_one(entity, facility);
            }
            StructureKind::Link => {
                let _ = self.ecs.insert_one(entity, LinkState::default());
            }
            _ => {}
        }
        id
    }

    pub fn add_source(&mut self, pos: Pos, capacity: u32) -> u64 {
        self.add_room(&pos.room);
        let entity = self.ecs.spawn((pos, SourceNode::new(capacity)));
        self.mint(entity)
    }

    pub fn add_mineral(&mut self, pos: Pos, resource: Resource, amount: u32) -> u64 {
        self.add_room(&pos.room);
        let entity = self.ecs.spawn((pos, MineralNode { resource, amount }));
        self.mint(entity)
    }

    pub fn add_controller(&mut self, pos: Pos, level: u8, owner: Option<&str>) -> u64 {
        self.add_room(&pos.room);
        let controller = Controller {
            level,
            owner: owner.map(str::to_string),
            reserved_by: None,
            progress: 0,
        };
        let entity = self.ecs.spawn((pos, controller));
        self.mint(entity)
    }

    pub fn add_site(&mut self, pos: Pos, kind: StructureKind, owner: &str) -> u64 {
        self.add_room(&pos.room);
        let site = ConstructionSite { kind, progress: 0, owner: owner.to_string() };
        let entity = self.ecs.spawn((pos, site));
        self.mint(entity)
    }

    pub fn add_dropped(&mut self, pos: Pos, resource: Resource, amount: u32) -> u64 {
        self.add_room(&pos.room);
        let entity = self.ecs.spawn((pos, DroppedResource { resource, amount }));
        self.mint(entity)
    }

    pub fn add_marker(
        &mut self,
        name: &str,
        pos: Pos,
        primary: MarkerColor,
        secondary: MarkerColor,
    ) -> u64 {
        self.add_room(&pos.room);
        let marker = Marker { name: name.to_string(), primary, secondary };
        let entity = self.ecs.spawn((pos, marker));
        self.mint(entity)
    }

    pub fn add_hostile(&mut self, pos: Pos, owner: &str, hits: u32) -> u64 {
        self.add_room(&pos.room);
        let hostile = Hostile { owner: owner.to_string(), hits, hits_max: hits };
        let entity = self.ecs.spawn((pos, hostile));
        self.mint(entity)
    }

    pub fn add_creep(&mut self, creep: Creep, pos: Pos) -> u64 {
        self.add_room(&pos.room);
        let entity = self.ecs.spawn((pos, creep));
        self.mint(entity)
    }

    // ── Lookups ─────────────────────────────────────────────────────────

    pub fn entity(&self, id: u64) -> Option<Entity> {
        self.index.get(&id).copied().filter(|e| self.ecs.contains(*e))
    }

    pub fn id_of(&self, entity: Entity) -> Option<u64> {
        self.ecs.get::<&ObjectId>(entity).map(|id| id.0).ok()
    }

    pub fn pos_of(&self, entity: Entity) -> Option<Pos> {
        self.ecs.get::<&Pos>(entity).map(|p| (*p).clone()).ok()
    }

    pub fn creep_data(&self, entity: Entity) -> Option<Creep> {
        self.ecs.get::<&Creep>(entity).map(|c| (*c).clone()).ok()
    }

    pub fn structure_data(&self, entity: Entity) -> Option<Structure> {
        self.ecs.get::<&Structure>(entity).map(|s| (*s).clone()).ok()
    }

    pub fn my_creeps(&self) -> Vec<Entity> {
        self.ecs.query::<&Creep>().iter().map(|(e, _)| e).collect()
    }

    pub fn creeps_of_role(&self, role: Role) -> Vec<Entity> {
        self.ecs
            .query::<&Creep>()
            .iter()
            .filter(|(_, c)| c.role == role)
            .map(|(e, _)| e)
            .collect()
    }

    pub fn structures_in(&self, room: &str) -> Vec<Entity> {
        self.ecs
            .query::<(&Pos, &Structure)>()
            .iter()
            .filter(|(_, (pos, _))| pos.room == room)
            .map(|(e, _)| e)
            .collect()
    }

    pub fn structures_of_kind(&self, room: &str, kind: StructureKind) -> Vec<Entity> {
        self.ecs
            .query::<(&Pos, &Structure)>()
            .iter()
            .filter(|(_, (pos, s))| pos.room == room && s.kind == kind)
            .map(|(e, _)| e)
            .collect()
    }

    pub fn my_spawns(&self) -> Vec<Entity> {
        self.ecs
            .query::<(&Structure, &SpawnFacility)>()
            .iter()
            .filter(|(_, (s, _))| s.owner.as_deref() == Some(self.me.as_str()))
            .map(|(e, _)| e)
            .collect()
    }

    pub fn spawns_in(&self, room: &str) -> Vec<Entity> {
        self.ecs
            .query::<(&Pos, &Structure, &SpawnFacility)>()
            .iter()
            .filter(|(_, (pos, s, _))| {
                pos.room == room && s.owner.as_deref() == Some(self.me.as_str())
            })
            .map(|(e, _)| e)
            .collect()
    }

    pub fn sources_in(&self, room: &str) -> Vec<Entity> {
        self.ecs
            .query::<(&Pos, &SourceNode)>()
            .iter()
            .filter(|(_, (pos, _))| pos.room == room)
            .map(|(e, _)| e)
            .collect()
    }

    pub fn hostiles_in(&self, room: &str) -> Vec<Entity> {
        self.ecs
            .query::<(&Pos, &Hostile)>()
            .iter()
            .filter(|(_, (pos, _))| pos.room == room)
            .map(|(e, _)| e)
            .collect()
    }

    pub fn controller_in(&self, room: &str) -> Option<Entity> {
        self.ecs
            .query::<(&Pos, &Controller)>()
            .iter()
            .find(|(_, (pos, _))| pos.room == room)
            .map(|(e, _)| e)
    }

    pub fn sites_in(&self, room: &str) -> Vec<Entity> {
        self.ecs
            .query::<(&Pos, &ConstructionSite)>()
            .iter()
            .filter(|(_, (pos, _))| pos.room == room)
            .map(|(e, _)| e)
            .collect()
    }

    /// Energy in spawns + extensions of a room (available, capacity).
    pub fn room_energy(&self, room: &str) -> (u32, u32) {
        let mut available = 0;
        let mut capacity = 0;
        for (_, (pos, s)) in self.ecs.query::<(&Pos, &Structure)>().iter() {
            if pos.room != room {
                continue;
            }
            if matches!(s.kind, StructureKind::Spawn | StructureKind::Extension) {
                available += s.store.energy();
                capacity += s.capacity;
            }
        }
        (available, capacity)
    }

    pub fn storage_energy(&self, room: &str) -> u32 {
        self.ecs
            .query::<(&Pos, &Structure)>()
            .iter()
            .filter(|(_, (pos, s))| pos.room == room && s.kind == StructureKind::Storage)
            .map(|(_, (_, s))| s.store.energy())
            .sum()
    }

    /// Candidate closest to `from` by in-room range; cross-room candidates
    /// sort last.
    pub fn closest(&self, from: &Pos, candidates: &[Entity]) -> Option<Entity> {
        candidates
            .iter()
            .copied()
            .min_by_key(|e| {
                self.pos_of(*e)
                    .and_then(|p| from.range_to(&p))
                    .unwrap_or(u32::MAX)
            })
    }

    // ── Movement ────────────────────────────────────────────────────────

    /// One step toward a target position; crosses rooms when needed.
    pub fn move_toward(&mut self, creep: Entity, target: &Pos) -> CmdResult {
        let pos = self.pos_of(creep).ok_or(CommandError::InvalidTarget)?;
        if pos.room != target.room {
            let room = target.room.clone();
            return self.move_to_room(creep, &room, &[]);
        }
        let dx = (target.x - pos.x).signum();
        let dy = (target.y - pos.y).signum();
        if dx == 0 && dy == 0 {
            return Ok(());
        }
        if let Ok(p) = self.ecs.query_one_mut::<&mut Pos>(creep) {
            p.x = (p.x + dx).clamp(0, ROOM_SIZE - 1);
            p.y = (p.y + dy).clamp(0, ROOM_SIZE - 1);
        }
        Ok(())
    }

    /// One room hop along the shortest exit path, skipping `avoid`.
    pub fn move_to_room(&mut self, creep: Entity, target: &str, avoid: &[String]) -> CmdResult {
        let pos = self.pos_of(creep).ok_or(CommandError::InvalidTarget)?;
        if pos.room == target {
            return Ok(());
        }
        let hop = self
            .next_hop(&pos.room, target, avoid)
            .ok_or(CommandError::NoPath)?;
        if let Ok(p) = self.ecs.query_one_mut::<&mut Pos>(creep) {
            p.room = hop;
            p.x = ROOM_SIZE / 2;
            p.y = ROOM_SIZE / 2;
        }
        Ok(())
    }

    fn next_hop(&self, from: &str, to: &str, avoid: &[String]) -> Option<String> {
        // BFS over the exit graph; the destination itself is never avoided.
        let mut prev: HashMap<&str, &str> = HashMap::new();
        let mut queue: VecDeque<&str> = VecDeque::from([from]);
        while let Some(cur) = queue.pop_front() {
            if cur == to {
                let mut hop = to;
                while prev.get(hop).copied() != Some(from) {
                    hop = prev.get(hop).copied()?;
                }
                return Some(hop.to_string());
            }
            for next in self.exits.get(cur).into_iter().flatten() {
                let next = next.as_str();
                let blocked = next != to && avoid.iter().any(|a| a.as_str() == next);
                if !blocked && next != from && !prev.contains_key(next) {
                    prev.insert(next, cur);
                    queue.push_back(next);
                }
            }
        }
        None
    }

    /// Shove a creep one tile in a random direction.
    pub fn random_step(&mut self, creep: Entity) {
        let mut rng = rand::thread_rng();
        let (dx, dy) = loop {
            let dx: i32 = rng.gen_range(-1..=1);
            let dy: i32 = rng.gen_range(-1..=1);
            if dx != 0 || dy != 0 {
                break (dx, dy);
            }
        };
        if let Ok(p) = self.ecs.query_one_mut::<&mut Pos>(creep) {
            p.x = (p.x + dx).clamp(0, ROOM_SIZE - 1);
            p.y = (p.y + dy).clamp(0, ROOM_SIZE - 1);
        }
    }

    // ── Creep actions ───────────────────────────────────────────────────

    fn require_near(&self, a: Entity, b: Entity) -> CmdResult {
        let pa = self.pos_of(a).ok_or(CommandError::InvalidTarget)?;
        let pb = self.pos_of(b).ok_or(CommandError::InvalidTarget)?;
        if pa.is_near(&pb) {
            Ok(())
        } else {
            Err(CommandError::NotInRange)
        }
    }

    fn require_in_range(&self, a: Entity, b: Entity, range: u32) -> CmdResult {
        let pa = self.pos_of(a).ok_or(CommandError::InvalidTarget)?;
        let pb = self.pos_of(b).ok_or(CommandError::InvalidTarget)?;
        if pa.in_range(&pb, range) {
            Ok(())
        } else {
            Err(CommandError::NotInRange)
        }
    }

    fn work_parts(&self, creep: Entity) -> CmdResult<u32> {
        let parts = self
            .ecs
            .get::<&Creep>(creep)
            .map_err(|_| CommandError::InvalidTarget)?
            .count_part(Part::Work);
        if parts == 0 {
            Err(CommandError::NoBodypart)
        } else {
            Ok(parts)
        }
    }

    pub fn harvest(&mut self, creep: Entity, source: Entity) -> CmdResult {
        self.require_near(creep, source)?;
        let work = self.work_parts(creep)?;
        let free = self
            .ecs
            .get::<&Creep>(creep)
            .map_err(|_| CommandError::InvalidTarget)?
            .free_capacity();

        let tick = self.tick;
        let mined = {
            let node = self
                .ecs
                .query_one_mut::<&mut SourceNode>(source)
                .map_err(|_| CommandError::InvalidTarget)?;
            if node.energy == 0 {
                return Err(CommandError::NotEnoughResources);
            }
            let mined = (work * HARVEST_POWER).min(node.energy).min(free);
            if mined == 0 {
                return Err(CommandError::Full);
            }
            node.energy -= mined;
            if node.regen_at.is_none() {
                node.regen_at = Some(tick + SOURCE_REGEN_TIME as u64);
            }
            mined
        };
        if let Ok(c) = self.ecs.query_one_mut::<&mut Creep>(creep) {
            c.store.add(Resource::Energy, mined);
        }
        Ok(())
    }

    /// Mine the mineral deposit; requires an extractor on the same tile.
    pub fn harvest_mineral(&mut self, creep: Entity, mineral: Entity) -> CmdResult {
        self.require_near(creep, mineral)?;
        let work = self.work_parts(creep)?;
        let pos = self.pos_of(mineral).ok_or(CommandError::InvalidTarget)?;
        let has_extractor = self
            .structures_of_kind(&pos.room, StructureKind::Extractor)
            .iter()
            .any(|e| self.pos_of(*e).as_ref() == Some(&pos));
        if !has_extractor {
            return Err(CommandError::InvalidTarget);
        }
        let free = self
            .ecs
            .get::<&Creep>(creep)
            .map_err(|_| CommandError::InvalidTarget)?
            .free_capacity();
        let (resource, mined) = {
            let node = self
                .ecs
                .query_one_mut::<&mut MineralNode>(mineral)
                .map_err(|_| CommandError::InvalidTarget)?;
            if node.amount == 0 {
                return Err(CommandError::NotEnoughResources);
            }
            let mined = work.min(node.amount).min(free);
            if mined == 0 {
                return Err(CommandError::Full);
            }
            node.amount -= mined;
            (node.resource, mined)
        };
        if let Ok(c) = self.ecs.query_one_mut::<&mut Creep>(creep) {
            c.store.add(resource, mined);
        }
        Ok(())
    }

    pub fn withdraw(&mut self, creep: Entity, target: Entity, resource: Resource) -> CmdResult {
        self.require_near(creep, target)?;
        let free = self
            .ecs
            .get::<&Creep>(creep)
            .map_err(|_| CommandError::InvalidTarget)?
            .free_capacity();
        if free == 0 {
            return Err(CommandError::Full);
        }
        let moved = {
            let s = self
                .ecs
                .query_one_mut::<&mut Structure>(target)
                .map_err(|_| CommandError::InvalidTarget)?;
            let moved = s.store.amount(resource).min(free);
            if moved == 0 {
                return Err(CommandError::NotEnoughResources);
            }
            s.store.remove(resource, moved);
            moved
        };
        if let Ok(c) = self.ecs.query_one_mut::<&mut Creep>(creep) {
            c.store.add(resource, moved);
        }
        Ok(())
    }

    pub fn transfer(&mut self, creep: Entity, target: Entity, resource: Resource) -> CmdResult {
        self.require_near(creep, target)?;
        let carried = self
            .ecs
            .get::<&Creep>(creep)
            .map_err(|_| CommandError::InvalidTarget)?
            .store
            .amount(resource);
        if carried == 0 {
            return Err(CommandError::NotEnoughResources);
        }
        let moved = {
            let s = self
                .ecs
                .query_one_mut::<&mut Structure>(target)
                .map_err(|_| CommandError::InvalidTarget)?;
            let moved = carried.min(s.free_capacity());
            if moved == 0 {
                return Err(CommandError::Full);
            }
            s.store.add(resource, moved);
            moved
        };
        if let Ok(c) = self.ecs.query_one_mut::<&mut Creep>(creep) {
            c.store.remove(resource, moved);
        }
        Ok(())
    }

    pub fn pickup(&mut self, creep: Entity, dropped: Entity) -> CmdResult {
        self.require_near(creep, dropped)?;
        let free = self
            .ecs
            .get::<&Creep>(creep)
            .map_err(|_| CommandError::InvalidTarget)?
            .free_capacity();
        if free == 0 {
            return Err(CommandError::Full);
        }
        let (resource, taken, drained) = {
            let d = self
                .ecs
                .query_one_mut::<&mut DroppedResource>(dropped)
                .map_err(|_| CommandError::InvalidTarget)?;
            let taken = d.amount.min(free);
            d.amount -= taken;
            (d.resource, taken, d.amount == 0)
        };
        if drained {
            self.remove_entity(dropped);
        }
        if let Ok(c) = self.ecs.query_one_mut::<&mut Creep>(creep) {
            c.store.add(resource, taken);
        }
        Ok(())
    }

    pub fn build(&mut self, creep: Entity, site: Entity) -> CmdResult {
        self.require_in_range(creep, site, 3)?;
        let work = self.work_parts(creep)?;
        let energy = self
            .ecs
            .get::<&Creep>(creep)
            .map_err(|_| CommandError::InvalidTarget)?
            .store
            .energy();
        if energy == 0 {
            return Err(CommandError::NotEnoughEnergy);
        }
        let (finished, kind, points, owner) = {
            let s = self
                .ecs
                .query_one_mut::<&mut ConstructionSite>(site)
                .map_err(|_| CommandError::InvalidTarget)?;
            let remaining = s.kind.build_cost().saturating_sub(s.progress);
            let points = (work * BUILD_POWER).min(energy).min(remaining);
            s.progress += points;
            (s.progress >= s.kind.build_cost(), s.kind, points, s.owner.clone())
        };
        if let Ok(c) = self.ecs.query_one_mut::<&mut Creep>(creep) {
            c.store.remove(Resource::Energy, points);
        }
        if finished {
            let site_pos = self.pos_of(site).ok_or(CommandError::InvalidTarget)?;
            self.remove_entity(site);
            let owner = if matches!(kind, StructureKind::Road | StructureKind::Container | StructureKind::Wall)
            {
                None
            } else {
                Some(owner)
            };
            self.add_structure(kind, site_pos, owner.as_deref());
        }
        Ok(())
    }

    pub fn repair(&mut self, creep: Entity, target: Entity) -> CmdResult {
        self.require_in_range(creep, target, 3)?;
        let work = self.work_parts(creep)?;
        let energy = self
            .ecs
            .get::<&Creep>(creep)
            .map_err(|_| CommandError::InvalidTarget)?
            .store
            .energy();
        if energy == 0 {
            return Err(CommandError::NotEnoughEnergy);
        }
        let spent = {
            let s = self
                .ecs
                .query_one_mut::<&mut Structure>(target)
                .map_err(|_| CommandError::InvalidTarget)?;
            let healed = (work * REPAIR_POWER).min(s.hits_max - s.hits);
            if healed == 0 {
                return Err(CommandError::Full);
            }
            s.hits += healed;
            // One energy per work part per action.
            work.min(energy)
        };
        if let Ok(c) = self.ecs.query_one_mut::<&mut Creep>(creep) {
            c.store.remove(Resource::Energy, spent);
        }
        Ok(())
    }

    pub fn attack(&mut self, creep: Entity, target: Entity) -> CmdResult {
        self.require_near(creep, target)?;
        let attack = self
            .ecs
            .get::<&Creep>(creep)
            .map_err(|_| CommandError::InvalidTarget)?
            .count_part(Part::Attack);
        if attack == 0 {
            return Err(CommandError::NoBodypart);
        }
        let dead = {
            let h = self
                .ecs
                .query_one_mut::<&mut Hostile>(target)
                .map_err(|_| CommandError::InvalidTarget)?;
            h.hits = h.hits.saturating_sub(attack * ATTACK_POWER);
            h.hits == 0
        };
        if dead {
            self.remove_entity(target);
        }
        Ok(())
    }

    pub fn heal(&mut self, creep: Entity, target: Entity) -> CmdResult {
        self.require_near(creep, target)?;
        let heal = self
            .ecs
            .get::<&Creep>(creep)
            .map_err(|_| CommandError::InvalidTarget)?
            .count_part(Part::Heal);
        if heal == 0 {
            return Err(CommandError::NoBodypart);
        }
        let c = self
            .ecs
            .query_one_mut::<&mut Creep>(target)
            .map_err(|_| CommandError::InvalidTarget)?;
        c.hits = (c.hits + heal * HEAL_POWER).min(c.hits_max);
        Ok(())
    }

    pub fn upgrade(&mut self, creep: Entity, controller: Entity) -> CmdResult {
        self.require_in_range(creep, controller, 3)?;
        let work = self.work_parts(creep)?;
        let energy = self
            .ecs
            .get::<&Creep>(creep)
            .map_err(|_| CommandError::InvalidTarget)?
            .store
            .energy();
        if energy == 0 {
            return Err(CommandError::NotEnoughEnergy);
        }
        let me = self.me.clone();
        let spent = {
            let c = self
                .ecs
                .query_one_mut::<&mut Controller>(controller)
                .map_err(|_| CommandError::InvalidTarget)?;
            if c.owner.as_deref() != Some(me.as_str()) {
                return Err(CommandError::NotOwner);
            }
            let spent = work.min(energy);
            c.progress += spent as u64;
            while c.progress >= c.next_level_cost() {
                c.progress -= c.next_level_cost();
                c.level += 1;
            }
            spent
        };
        if let Ok(c) = self.ecs.query_one_mut::<&mut Creep>(creep) {
            c.store.remove(Resource::Energy, spent);
        }
        Ok(())
    }

    pub fn claim(&mut self, creep: Entity, controller: Entity) -> CmdResult {
        self.require_near(creep, controller)?;
        let claim = self
            .ecs
            .get::<&Creep>(creep)
            .map_err(|_| CommandError::InvalidTarget)?
            .count_part(Part::Claim);
        if claim == 0 {
            return Err(CommandError::NoBodypart);
        }
        let me = self.me.clone();
        let c = self
            .ecs
            .query_one_mut::<&mut Controller>(controller)
            .map_err(|_| CommandError::InvalidTarget)?;
        if c.owner.is_some() {
            return Err(CommandError::InvalidTarget);
        }
        c.owner = Some(me);
        c.level = 1;
        Ok(())
    }

    pub fn reserve(&mut self, creep: Entity, controller: Entity) -> CmdResult {
        self.require_near(creep, controller)?;
        let claim = self
            .ecs
            .get::<&Creep>(creep)
            .map_err(|_| CommandError::InvalidTarget)?
            .count_part(Part::Claim);
        if claim == 0 {
            return Err(CommandError::NoBodypart);
        }
        let me = self.me.clone();
        let c = self
            .ecs
            .query_one_mut::<&mut Controller>(controller)
            .map_err(|_| CommandError::InvalidTarget)?;
        if c.owner.is_some() {
            return Err(CommandError::InvalidTarget);
        }
        c.reserved_by = Some(me);
        Ok(())
    }

    // ── Spawning ────────────────────────────────────────────────────────

    /// Issue a spawn command. Energy is drawn from the room's spawns and
    /// extensions; the creep exists immediately with `spawning = true`.
    pub fn spawn_creep(
        &mut self,
        spawn: Entity,
        name: &str,
        role: Role,
        body: Vec<Part>,
        home_room: &str,
    ) -> CmdResult<u64> {
        let busy = self
            .ecs
            .get::<&SpawnFacility>(spawn)
            .map_err(|_| CommandError::InvalidTarget)?
            .job
            .is_some();
        if busy {
            return Err(CommandError::Busy);
        }
        let pos = self.pos_of(spawn).ok_or(CommandError::InvalidTarget)?;
        let cost = body_cost(&body);
        let (available, _) = self.room_energy(&pos.room);
        if available < cost {
            return Err(CommandError::NotEnoughEnergy);
        }
        self.drain_room_energy(&pos.room, cost);

        let mut creep = Creep::new(name, role, home_room, body);
        creep.spawning = true;
        let remaining = creep.body.len() as u32 * SPAWN_TIME_PER_PART;
        let spawn_pos = Pos::new(pos.room.clone(), (pos.x + 1).clamp(0, ROOM_SIZE - 1), pos.y);
        let id = self.add_creep(creep, spawn_pos);
        if let Ok(f) = self.ecs.query_one_mut::<&mut SpawnFacility>(spawn) {
            f.job = Some(SpawnJob { creep: id, remaining });
        }
        Ok(id)
    }

    fn drain_room_energy(&mut self, room: &str, mut cost: u32) {
        // Extensions drain first, spawns last, matching refill priority.
        for kind in [StructureKind::Extension, StructureKind::Spawn] {
            for entity in self.structures_of_kind(room, kind) {
                if cost == 0 {
                    return;
                }
                if let Ok(s) = self.ecs.query_one_mut::<&mut Structure>(entity) {
                    cost -= s.store.remove(Resource::Energy, cost);
                }
            }
        }
    }

    /// Recycle a creep standing next to a spawn; its name joins the dead
    /// list for the next memory sweep.
    pub fn recycle(&mut self, spawn: Entity, creep: Entity) -> CmdResult {
        self.require_near(spawn, creep)?;
        let name = self
            .ecs
            .get::<&Creep>(creep)
            .map_err(|_| CommandError::InvalidTarget)?
            .name
            .clone();
        self.remove_entity(creep);
        self.died.push(name);
        Ok(())
    }

    // ── Towers & links ──────────────────────────────────────────────────

    fn tower_fire(&mut self, tower: Entity) -> CmdResult {
        let s = self
            .ecs
            .query_one_mut::<&mut Structure>(tower)
            .map_err(|_| CommandError::InvalidTarget)?;
        if s.kind != StructureKind::Tower {
            return Err(CommandError::InvalidTarget);
        }
        if s.store.energy() < TOWER_ACTION_COST {
            return Err(CommandError::NotEnoughEnergy);
        }
        s.store.remove(Resource::Energy, TOWER_ACTION_COST);
        Ok(())
    }

    pub fn tower_attack(&mut self, tower: Entity, target: Entity) -> CmdResult {
        self.tower_fire(tower)?;
        let dead = {
            let h = self
                .ecs
                .query_one_mut::<&mut Hostile>(target)
                .map_err(|_| CommandError::InvalidTarget)?;
            h.hits = h.hits.saturating_sub(TOWER_ATTACK_POWER);
            h.hits == 0
        };
        if dead {
            self.remove_entity(target);
        }
        Ok(())
    }

    pub fn tower_repair(&mut self, tower: Entity, target: Entity) -> CmdResult {
        self.tower_fire(tower)?;
        let s = self
            .ecs
            .query_one_mut::<&mut Structure>(target)
            .map_err(|_| CommandError::InvalidTarget)?;
        s.hits = (s.hits + TOWER_REPAIR_POWER).min(s.hits_max);
        Ok(())
    }

    pub fn tower_heal(&mut self, tower: Entity, target: Entity) -> CmdResult {
        self.tower_fire(tower)?;
        let c = self
            .ecs
            .query_one_mut::<&mut Creep>(target)
            .map_err(|_| CommandError::InvalidTarget)?;
        c.hits = (c.hits + TOWER_HEAL_POWER).min(c.hits_max);
        Ok(())
    }

    /// Relay energy between two links in the same room (3% transit loss).
    pub fn link_send(&mut self, from: Entity, to: Entity) -> CmdResult {
        let pa = self.pos_of(from).ok_or(CommandError::InvalidTarget)?;
        let pb = self.pos_of(to).ok_or(CommandError::InvalidTarget)?;
        if pa.room != pb.room || from == to {
            return Err(CommandError::InvalidTarget);
        }
        let on_cooldown = self
            .ecs
            .get::<&LinkState>(from)
            .map_err(|_| CommandError::InvalidTarget)?
            .cooldown
            > 0;
        if on_cooldown {
            return Err(CommandError::Busy);
        }
        let sent = {
            let s = self
                .ecs
                .query_one_mut::<&mut Structure>(from)
                .map_err(|_| CommandError::InvalidTarget)?;
            let sent = s.store.energy();
            if sent == 0 {
                return Err(CommandError::NotEnoughEnergy);
            }
            s.store.remove(Resource::Energy, sent);
            sent
        };
        let arriving = sent - (sent as f64 * LINK_LOSS_RATIO).ceil() as u32;
        {
            let s = self
                .ecs
                .query_one_mut::<&mut Structure>(to)
                .map_err(|_| CommandError::InvalidTarget)?;
            let accepted = arriving.min(s.free_capacity());
            s.store.add(Resource::Energy, accepted);
        }
        if let Ok(l) = self.ecs.query_one_mut::<&mut LinkState>(from) {
            l.cooldown = LINK_COOLDOWN;
        }
        Ok(())
    }

    // ── Per-tick mechanics ──────────────────────────────────────────────

    /// Advance world mechanics by one tick: spawn assembly, source regen,
    /// link cooldowns, creep aging. Call once at the top of each tick.
    pub fn begin_tick(&mut self) {
        self.tick += 1;
        let tick = self.tick;

        // Finish spawn jobs.
        let mut finished: Vec<u64> = Vec::new();
        for (_, facility) in self.ecs.query::<&mut SpawnFacility>().iter() {
            if let Some(job) = facility.job.as_mut() {
                job.remaining = job.remaining.saturating_sub(1);
                if job.remaining == 0 {
                    finished.push(job.creep);
                    facility.job = None;
                }
            }
        }
        for id in finished {
            if let Some(entity) = self.entity(id) {
                if let Ok(c) = self.ecs.query_one_mut::<&mut Creep>(entity) {
                    c.spawning = false;
                }
            }
        }

        for (_, node) in self.ecs.query::<&mut SourceNode>().iter() {
            if node.regen_at.is_some_and(|at| at <= tick) {
                node.energy = node.capacity;
                node.regen_at = None;
            }
        }

        for (_, link) in self.ecs.query::<&mut LinkState>().iter() {
            link.cooldown = link.cooldown.saturating_sub(1);
        }

        // Age creeps; spawning creeps do not burn lifetime.
        let mut dead: Vec<(Entity, String)> = Vec::new();
        for (entity, creep) in self.ecs.query::<&mut Creep>().iter() {
            if creep.spawning {
                continue;
            }
            creep.ticks_to_live = creep.ticks_to_live.saturating_sub(1);
            if creep.ticks_to_live == 0 || creep.hits == 0 {
                dead.push((entity, creep.name.clone()));
            }
        }
        for (entity, name) in dead {
            self.remove_entity(entity);
            self.died.push(name);
        }
    }

    /// Names of creeps that died since the last call.
    pub fn take_dead(&mut self) -> Vec<String> {
        std::mem::take(&mut self.died)
    }

    /// Drop an object from the world and the id index (hostiles leaving
    /// visibility, decayed piles).
    pub fn remove_entity(&mut self, entity: Entity) {
        if let Some(id) = self.id_of(entity) {
            self.index.remove(&id);
        }
        let _ = self.ecs.despawn(entity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world_with_spawn() -> (GameWorld, Entity) {
        let mut w = GameWorld::new("keeper");
        w.add_controller(Pos::new("alpha", 40, 40), 2, Some("keeper"));
        let spawn_id = w.add_structure(StructureKind::Spawn, Pos::new("alpha", 25, 25), Some("keeper"));
        let spawn = w.entity(spawn_id).unwrap();
        // Fill the spawn.
        if let Ok(s) = w.ecs.query_one_mut::<&mut Structure>(spawn) {
            s.store.add(Resource::Energy, 300);
        }
        (w, spawn)
    }

    #[test]
    fn spawn_creep_drains_room_energy_and_assembles() {
        let (mut w, spawn) = world_with_spawn();
        let id = w
            .spawn_creep(spawn, "harvester0001", Role::Harvester,
                vec![Part::Work, Part::Carry, Part::Move], "alpha")
            .unwrap();
        assert_eq!(w.room_energy("alpha").0, 100);
        // Busy until the job completes.
        assert_eq!(
            w.spawn_creep(spawn, "x", Role::Harvester, vec![Part::Move], "alpha"),
            Err(CommandError::Busy)
        );
        let creep = w.entity(id).unwrap();
        assert!(w.creep_data(creep).unwrap().spawning);
        for _ in 0..9 {
            w.begin_tick();
        }
        assert!(!w.creep_data(creep).unwrap().spawning);
    }

    #[test]
    fn spawn_rejects_unaffordable_bodies() {
        let (mut w, spawn) = world_with_spawn();
        let body = vec![Part::Work; 4]; // 400 > 300 available
        assert_eq!(
            w.spawn_creep(spawn, "x", Role::Harvester, body, "alpha"),
            Err(CommandError::NotEnoughEnergy)
        );
        assert_eq!(w.room_energy("alpha").0, 300);
    }

    #[test]
    fn harvest_moves_energy_into_the_creep() {
        let (mut w, _) = world_with_spawn();
        let source_id = w.add_source(Pos::new("alpha", 10, 10), 3_000);
        let creep_id = w.add_creep(
            Creep::new("h1", Role::Harvester, "alpha", vec![Part::Work, Part::Carry, Part::Move]),
            Pos::new("alpha", 10, 11),
        );
        let creep = w.entity(creep_id).unwrap();
        let source = w.entity(source_id).unwrap();
        w.harvest(creep, source).unwrap();
        assert_eq!(w.creep_data(creep).unwrap().store.energy(), 2);

        // Out of range fails.
        if let Ok(p) = w.ecs.query_one_mut::<&mut Pos>(creep) {
            p.x = 20;
        }
        assert_eq!(w.harvest(creep, source), Err(CommandError::NotInRange));
    }

    #[test]
    fn transfer_and_withdraw_respect_capacity() {
        let (mut w, _) = world_with_spawn();
        let container_id = w.add_structure(StructureKind::Container, Pos::new("alpha", 9, 9), None);
        let container = w.entity(container_id).unwrap();
        let creep_id = w.add_creep(
            Creep::new("c1", Role::Hauler, "alpha", vec![Part::Carry, Part::Move]),
            Pos::new("alpha", 9, 10),
        );
        let creep = w.entity(creep_id).unwrap();

        assert_eq!(w.withdraw(creep, container, Resource::Energy), Err(CommandError::NotEnoughResources));
        if let Ok(s) = w.ecs.query_one_mut::<&mut Structure>(container) {
            s.store.add(Resource::Energy, 500);
        }
        w.withdraw(creep, container, Resource::Energy).unwrap();
        assert_eq!(w.creep_data(creep).unwrap().store.energy(), 50);
        w.transfer(creep, container, Resource::Energy).unwrap();
        assert!(w.creep_data(creep).unwrap().store.is_empty());
    }

    #[test]
    fn cross_room_movement_follows_exits() {
        let mut w = GameWorld::new("keeper");
        w.connect("alpha", "beta");
        w.connect("beta", "gamma");
        let creep_id = w.add_creep(
            Creep::new("c1", Role::Harvester, "alpha", vec![Part::Move]),
            Pos::new("alpha", 25, 25),
        );
        let creep = w.entity(creep_id).unwrap();
        w.move_to_room(creep, "gamma", &[]).unwrap();
        assert_eq!(w.pos_of(creep).unwrap().room, "beta");
        w.move_to_room(creep, "gamma", &[]).unwrap();
        assert_eq!(w.pos_of(creep).unwrap().room, "gamma");
    }

    #[test]
    fn avoided_rooms_are_routed_around() {
        let mut w = GameWorld::new("keeper");
        w.connect("alpha", "bad");
        w.connect("bad", "omega");
        w.connect("alpha", "side");
        w.connect("side", "omega");
        let creep_id = w.add_creep(
            Creep::new("c1", Role::Harvester, "alpha", vec![Part::Move]),
            Pos::new("alpha", 25, 25),
        );
        let creep = w.entity(creep_id).unwrap();
        w.move_to_room(creep, "omega", &["bad".to_string()]).unwrap();
        assert_eq!(w.pos_of(creep).unwrap().room, "side");
    }

    #[test]
    fn build_completion_replaces_the_site() {
        let (mut w, _) = world_with_spawn();
        let site_id = w.add_site(Pos::new("alpha", 12, 12), StructureKind::Road, "keeper");
        let site = w.entity(site_id).unwrap();
        let mut builder = Creep::new("b1", Role::Builder, "alpha", vec![Part::Work; 10]);
        builder.capacity = 500;
        builder.store.add(Resource::Energy, 500);
        let creep_id = w.add_creep(builder, Pos::new("alpha", 12, 13));
        let creep = w.entity(creep_id).unwrap();
        // Road costs 300 progress; 10 work parts build 50/tick.
        for _ in 0..6 {
            w.build(creep, site).unwrap();
        }
        assert!(w.entity(site_id).is_none());
        assert_eq!(w.structures_of_kind("alpha", StructureKind::Road).len(), 1);
    }

    #[test]
    fn dead_creeps_land_on_the_dead_list() {
        let mut w = GameWorld::new("keeper");
        let mut creep = Creep::new("d1", Role::Harvester, "alpha", vec![Part::Move]);
        creep.ticks_to_live = 1;
        w.add_creep(creep, Pos::new("alpha", 1, 1));
        w.begin_tick();
        assert_eq!(w.take_dead(), vec!["d1".to_string()]);
        assert!(w.my_creeps().is_empty());
    }
}
