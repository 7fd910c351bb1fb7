//! Behaviors shared across roles.
//!
//! Every worker that hauls energy runs the same two-phase loop: gather
//! until full, act until empty. The phase lives in durable memory under
//! `creeps.<name>.acting` so it survives restarts, and flips only at
//! the empty/full boundaries so creeps finish what they started.

use keeper_logic::config::Config;

use crate::components::{Creep, DroppedResource, Pos, Resource, SourceNode, Structure, StructureKind};
use crate::context::TickCtx;
use crate::flags::markers;
use crate::memory::Memory;
use crate::world::{CommandError, GameWorld};

use super::{act, RoleError, RoleResult};

/// Where a gathering creep may pull energy from.
#[derive(Debug, Clone, Copy)]
pub struct GatherOpts {
    pub withdraw: &'static [StructureKind],
    pub harvest: bool,
    pub pickup: bool,
}

impl GatherOpts {
    /// Withdraw-only: containers and storage.
    pub const HAUL: GatherOpts = GatherOpts {
        withdraw: &[StructureKind::Container, StructureKind::Storage],
        harvest: false,
        pickup: true,
    };

    /// Anything goes, including mining by hand.
    pub const SCROUNGE: GatherOpts = GatherOpts {
        withdraw: &[StructureKind::Container, StructureKind::Storage],
        harvest: true,
        pickup: true,
    };
}

/// True while the creep should be gathering energy rather than spending
/// it. Flips at empty and at full, never in between.
pub fn needs_energy(memory: &mut Memory, creep: &Creep) -> bool {
    let key = ["creeps", creep.name.as_str(), "acting"];
    let mut acting = memory.get_bool(&key);
    if acting && creep.store.is_empty() {
        acting = false;
        memory.set_bool(&key, false);
    } else if !acting && creep.free_capacity() == 0 {
        acting = true;
        memory.set_bool(&key, true);
    }
    !acting
}

/// One tick of energy gathering in the creep's current room: walk to a
/// remembered target and pull from it, or pick a fresh one.
pub fn gather_energy(
    world: &mut GameWorld,
    memory: &mut Memory,
    ctx: &mut TickCtx,
    entity: hecs::Entity,
    creep: &Creep,
    opts: GatherOpts,
) -> RoleResult {
    let Some(pos) = world.pos_of(entity) else { return Ok(()) };
    let key = ["creeps", creep.name.as_str(), "gather"];

    let mut target = match memory.get_u64(&key) {
        0 => None,
        id => world.entity(id).filter(|e| gather_target_valid(world, *e)),
    };
    if target.is_none() {
        memory.delete(&key);
        target = pick_gather_target(world, ctx, &pos, opts);
        if let Some(e) = target {
            if let Some(id) = world.id_of(e) {
                memory.set_u64(&key, id);
            }
        }
    }
    let Some(target) = target else {
        // Nothing to gather; make room for creeps that can act.
        world.random_step(entity);
        return Ok(());
    };

    let Some(target_pos) = world.pos_of(target) else { return Ok(()) };
    if !pos.is_near(&target_pos) {
        return act("move to energy", world.move_toward(entity, &target_pos));
    }

    let done = if world.ecs.get::<&DroppedResource>(target).is_ok() {
        act("pickup", world.pickup(entity, target))
    } else if world.ecs.get::<&SourceNode>(target).is_ok() {
        act("harvest", world.harvest(entity, target))
    } else {
        act("withdraw", world.withdraw(entity, target, Resource::Energy))
    };
    // A drained target is routine; drop it and retry next tick.
    match done {
        Err(RoleError { cause: CommandError::NotEnoughResources, .. }) => {
            memory.delete(&key);
            Ok(())
        }
        other => other,
    }
}

fn gather_target_valid(world: &GameWorld, target: hecs::Entity) -> bool {
    if let Ok(d) = world.ecs.get::<&DroppedResource>(target) {
        return d.resource == Resource::Energy && d.amount > 0;
    }
    if let Ok(s) = world.ecs.get::<&SourceNode>(target) {
        return s.energy > 0;
    }
    if let Ok(s) = world.ecs.get::<&Structure>(target) {
        return s.store.energy() > 0;
    }
    false
}

fn pick_gather_target(
    world: &GameWorld,
    ctx: &mut TickCtx,
    pos: &Pos,
    opts: GatherOpts,
) -> Option<hecs::Entity> {
    if opts.pickup {
        let dropped: Vec<hecs::Entity> = world
            .ecs
            .query::<(&Pos, &DroppedResource)>()
            .iter()
            .filter(|(_, (p, d))| {
                p.room == pos.room && d.resource == Resource::Energy && d.amount >= 50
            })
            .map(|(e, _)| e)
            .collect();
        if let Some(e) = world.closest(pos, &dropped) {
            return Some(e);
        }
    }

    let mut stocked: Vec<hecs::Entity> = Vec::new();
    for kind in opts.withdraw {
        for e in world.structures_of_kind(&pos.room, *kind) {
            if world.structure_data(e).is_some_and(|s| s.store.energy() > 0) {
                stocked.push(e);
            }
        }
    }
    if let Some(e) = world.closest(pos, &stocked) {
        return Some(e);
    }

    if opts.harvest {
        let ignored = markers(world, ctx).ignore_sources.clone();
        let sources: Vec<hecs::Entity> = world
            .sources_in(&pos.room)
            .into_iter()
            .filter(|e| {
                let Some(p) = world.pos_of(*e) else { return false };
                !ignored.contains(&(p.room.clone(), p.x, p.y))
                    && world
                        .ecs
                        .get::<&SourceNode>(*e)
                        .map(|s| s.energy > 0)
                        .unwrap_or(false)
            })
            .collect();
        return world.closest(pos, &sources);
    }
    None
}

/// Deliver carried energy to the nearest structure of the given kinds
/// whose energy is below `fill_below` of capacity. Returns false when no
/// structure qualifies.
pub fn deliver_structure(
    world: &mut GameWorld,
    entity: hecs::Entity,
    kinds: &[StructureKind],
    fill_below: f64,
) -> Result<bool, RoleError> {
    deliver_structure_where(world, entity, kinds, fill_below, |_, _| true)
}

/// [`deliver_structure`] with a per-target predicate, for targets the
/// kind list alone cannot express (e.g. only source-side links).
pub fn deliver_structure_where(
    world: &mut GameWorld,
    entity: hecs::Entity,
    kinds: &[StructureKind],
    fill_below: f64,
    keep: impl Fn(&GameWorld, hecs::Entity) -> bool,
) -> Result<bool, RoleError> {
    let Some(pos) = world.pos_of(entity) else { return Ok(false) };
    let mut hungry: Vec<hecs::Entity> = Vec::new();
    for kind in kinds {
        for e in world.structures_of_kind(&pos.room, *kind) {
            let Some(s) = world.structure_data(e) else { continue };
            if s.free_capacity() > 0 && s.energy_fraction() < fill_below && keep(world, e) {
                hungry.push(e);
            }
        }
    }
    let Some(target) = world.closest(&pos, &hungry) else { return Ok(false) };
    let Some(target_pos) = world.pos_of(target) else { return Ok(false) };
    if pos.is_near(&target_pos) {
        act("transfer", world.transfer(entity, target, Resource::Energy))?;
    } else {
        act("move to deliver", world.move_toward(entity, &target_pos))?;
    }
    Ok(true)
}

/// Scoop up any energy pile the creep is already standing next to.
/// Free movement-wise, so every role does it.
pub fn pickup_adjacent_energy(world: &mut GameWorld, entity: hecs::Entity, creep: &Creep) {
    if creep.free_capacity() == 0 {
        return;
    }
    let Some(pos) = world.pos_of(entity) else { return };
    let adjacent: Option<hecs::Entity> = world
        .ecs
        .query::<(&Pos, &DroppedResource)>()
        .iter()
        .find(|(_, (p, d))| d.resource == Resource::Energy && pos.is_near(p))
        .map(|(e, _)| e);
    if let Some(pile) = adjacent {
        let _ = world.pickup(entity, pile);
    }
}

/// Run from nearby hostiles, and keep running for a while after they
/// leave sight. Returns true while fleeing; the caller skips its normal
/// behavior for the tick.
pub fn retreat_from_enemies(
    world: &mut GameWorld,
    memory: &mut Memory,
    cfg: &Config,
    entity: hecs::Entity,
    creep: &Creep,
) -> Result<bool, RoleError> {
    let Some(pos) = world.pos_of(entity) else { return Ok(false) };
    let key = ["creeps", creep.name.as_str(), "fleeing"];

    let threatened = world.hostiles_in(&pos.room).iter().any(|h| {
        world
            .pos_of(*h)
            .and_then(|p| p.range_to(&pos))
            .is_some_and(|r| r <= 5)
    });
    if threatened {
        memory.set_u64(&key, u64::from(cfg.retreat_ticks));
    }
    let left = memory.get_u64(&key);
    if left == 0 {
        return Ok(false);
    }
    memory.set_u64(&key, left - 1);

    if pos.room != creep.home_room {
        let home = creep.home_room.clone();
        act("flee home", world.move_to_room(entity, &home, &[]))?;
    } else if let Some(spawn) = world.spawns_in(&pos.room).first().copied() {
        if let Some(spawn_pos) = world.pos_of(spawn) {
            let _ = world.move_toward(entity, &spawn_pos);
        }
    }
    Ok(true)
}

/// The creep's sticky remote-room assignment: reuse the remembered room
/// while its marker stands, otherwise pick the least-crowded marked
/// room and remember it.
pub fn assigned_room(
    world: &GameWorld,
    memory: &mut Memory,
    creep: &Creep,
    rooms: &[String],
) -> Option<String> {
    let key = ["creeps", creep.name.as_str(), "target_room"];
    if let Some(room) = memory.get_str(&key) {
        if rooms.iter().any(|r| r == room) {
            return Some(room.to_string());
        }
    }
    let room = crate::flags::assign_room(memory, rooms, creep.role, world)?;
    memory.set_str(&key, &room);
    Some(room)
}

/// Route toward a room, detouring around operator-flagged rooms.
pub fn move_to_room_safe(
    world: &mut GameWorld,
    ctx: &mut TickCtx,
    entity: hecs::Entity,
    room: &str,
) -> RoleResult {
    let avoid = markers(world, ctx).avoid_list();
    act("move to room", world.move_to_room(entity, room, &avoid))
}

/// End-of-life routine: bank whatever the creep carries, then recycle
/// at a home spawn so the parts refund.
pub fn dump_and_despawn(
    world: &mut GameWorld,
    ctx: &mut TickCtx,
    entity: hecs::Entity,
    creep: &Creep,
) -> RoleResult {
    let Some(pos) = world.pos_of(entity) else { return Ok(()) };
    if pos.room != creep.home_room {
        let home = creep.home_room.clone();
        return move_to_room_safe(world, ctx, entity, &home);
    }

    if !creep.store.is_empty() {
        if let Some(storage) = world
            .structures_of_kind(&pos.room, StructureKind::Storage)
            .first()
            .copied()
        {
            let Some(storage_pos) = world.pos_of(storage) else { return Ok(()) };
            if pos.is_near(&storage_pos) {
                for resource in creep.store.kinds() {
                    act("bank load", world.transfer(entity, storage, resource))?;
                }
                return Ok(());
            }
            return act("move to storage", world.move_toward(entity, &storage_pos));
        }
    }

    let spawns = world.spawns_in(&pos.room);
    let Some(spawn) = world.closest(&pos, &spawns) else { return Ok(()) };
    let Some(spawn_pos) = world.pos_of(spawn) else { return Ok(()) };
    if pos.is_near(&spawn_pos) {
        act("recycle", world.recycle(spawn, entity))
    } else {
        act("move to spawn", world.move_toward(entity, &spawn_pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keeper_logic::body::Part;
    use keeper_logic::roles::Role;

    fn hauler(name: &str) -> Creep {
        Creep::new(name, Role::Hauler, "alpha", vec![Part::Carry, Part::Carry, Part::Move])
    }

    #[test]
    fn acting_flag_flips_only_at_the_boundaries() {
        let mut memory = Memory::new();
        let mut c = hauler("hauler0000");

        // Empty: gather.
        assert!(needs_energy(&mut memory, &c));
        // Half full: still gathering.
        c.store.add(Resource::Energy, 50);
        assert!(needs_energy(&mut memory, &c));
        // Full: act.
        c.store.add(Resource::Energy, 50);
        assert!(!needs_energy(&mut memory, &c));
        // Half empty again: keep acting until dry.
        c.store.remove(Resource::Energy, 60);
        assert!(!needs_energy(&mut memory, &c));
        c.store.remove(Resource::Energy, 40);
        assert!(needs_energy(&mut memory, &c));
    }

    #[test]
    fn gather_remembers_its_target() {
        let mut w = GameWorld::new("keeper");
        let container = w.add_structure(
            StructureKind::Container,
            Pos::new("alpha", 10, 10),
            None,
        );
        if let Ok(s) = w
            .ecs
            .query_one_mut::<&mut Structure>(w.entity(container).unwrap())
        {
            s.store.add(Resource::Energy, 500);
        }
        let id = w.add_creep(hauler("hauler0001"), Pos::new("alpha", 20, 10));
        let entity = w.entity(id).unwrap();
        let creep = w.creep_data(entity).unwrap();

        let mut memory = Memory::new();
        let mut ctx = TickCtx::new(1);
        gather_energy(&mut w, &mut memory, &mut ctx, entity, &creep, GatherOpts::HAUL).unwrap();
        assert_eq!(memory.get_u64(&["creeps", "hauler0001", "gather"]), container);
        // One step closer.
        assert_eq!(w.pos_of(entity).unwrap(), Pos::new("alpha", 19, 10));
    }

    #[test]
    fn drained_targets_are_forgotten() {
        let mut w = GameWorld::new("keeper");
        let container =
            w.add_structure(StructureKind::Container, Pos::new("alpha", 10, 10), None);
        let id = w.add_creep(hauler("hauler0002"), Pos::new("alpha", 20, 10));
        let entity = w.entity(id).unwrap();
        let creep = w.creep_data(entity).unwrap();

        let mut memory = Memory::new();
        memory.set_u64(&["creeps", "hauler0002", "gather"], container);
        let mut ctx = TickCtx::new(1);
        // Empty container: invalid, forgotten, and with nothing else in
        // the room the creep just shuffles.
        gather_energy(&mut w, &mut memory, &mut ctx, entity, &creep, GatherOpts::HAUL).unwrap();
        assert_eq!(memory.get_u64(&["creeps", "hauler0002", "gather"]), 0);
    }

    #[test]
    fn fleeing_outlasts_the_sighting() {
        let mut cfg = Config::default();
        cfg.retreat_ticks = 3;
        let mut w = GameWorld::new("keeper");
        w.add_structure(StructureKind::Spawn, Pos::new("alpha", 25, 25), Some("keeper"));
        w.add_hostile(Pos::new("alpha", 12, 10), "raider", 1_000);
        let id = w.add_creep(hauler("hauler0003"), Pos::new("alpha", 10, 10));
        let entity = w.entity(id).unwrap();
        let creep = w.creep_data(entity).unwrap();

        let mut memory = Memory::new();
        assert!(retreat_from_enemies(&mut w, &mut memory, &cfg, entity, &creep).unwrap());

        // Hostile gone; the countdown keeps the creep running.
        for h in w.hostiles_in("alpha") {
            w.remove_entity(h);
        }
        assert!(retreat_from_enemies(&mut w, &mut memory, &cfg, entity, &creep).unwrap());
        assert!(retreat_from_enemies(&mut w, &mut memory, &cfg, entity, &creep).unwrap());
        assert!(!retreat_from_enemies(&mut w, &mut memory, &cfg, entity, &creep).unwrap());
    }
}
