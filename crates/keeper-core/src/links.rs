//! Link relay.
//!
//! Operators mark source-side links in durable memory under
//! `links.<id>.source`. Each tick, every source link that is loaded and
//! off cooldown fires its energy at the hungriest non-source link in
//! the room.

use keeper_logic::config::Config;

use crate::components::{LinkState, StructureKind};
use crate::memory::Memory;
use crate::world::GameWorld;

pub fn is_source_link(memory: &Memory, id: u64) -> bool {
    memory.get_bool(&["links", &id.to_string(), "source"])
}

pub fn set_source_link(memory: &mut Memory, id: u64, source: bool) {
    memory.set_bool(&["links", &id.to_string(), "source"], source);
}

/// True for links that haulage should leave alone. Source links next to
/// a static harvester feed themselves; fillers must not top them up.
pub fn is_nofill(memory: &Memory, id: u64) -> bool {
    memory.get_bool(&["links", &id.to_string(), "nofill"])
}

pub fn set_nofill(memory: &mut Memory, id: u64, nofill: bool) {
    memory.set_bool(&["links", &id.to_string(), "nofill"], nofill);
}

pub fn run(world: &mut GameWorld, memory: &Memory, cfg: &Config) {
    for room in world.my_rooms() {
        let links = world.structures_of_kind(&room, StructureKind::Link);
        for from in &links {
            let Some(from_id) = world.id_of(*from) else { continue };
            if !is_source_link(memory, from_id) {
                continue;
            }
            let ready = world
                .ecs
                .get::<&LinkState>(*from)
                .map(|l| l.cooldown == 0)
                .unwrap_or(false);
            if !ready {
                continue;
            }
            let loaded = world
                .structure_data(*from)
                .map(|s| s.store.energy())
                .unwrap_or(0);
            if loaded < cfg.link_min_transfer {
                continue;
            }

            // Receiver: the non-source link with the most free capacity.
            let to = links
                .iter()
                .filter(|e| **e != *from)
                .filter(|e| {
                    world
                        .id_of(**e)
                        .map_or(false, |id| !is_source_link(memory, id))
                })
                .max_by_key(|e| {
                    world.structure_data(**e).map(|s| s.free_capacity()).unwrap_or(0)
                })
                .copied();
            let Some(to) = to else { continue };
            let has_room = world
                .structure_data(to)
                .map(|s| s.free_capacity() > 0)
                .unwrap_or(false);
            if !has_room {
                continue;
            }
            if let Err(e) = world.link_send(*from, to) {
                log::debug!("room {}: link {} send failed: {}", room, from_id, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Pos, Resource, Structure};

    #[test]
    fn source_links_fire_at_the_emptiest_receiver() {
        let mut w = GameWorld::new("keeper");
        w.add_controller(Pos::new("alpha", 40, 40), 6, Some("keeper"));
        let src = w.add_structure(StructureKind::Link, Pos::new("alpha", 10, 10), Some("keeper"));
        let dst = w.add_structure(StructureKind::Link, Pos::new("alpha", 30, 30), Some("keeper"));
        if let Ok(s) = w.ecs.query_one_mut::<&mut Structure>(w.entity(src).unwrap()) {
            s.store.add(Resource::Energy, 400);
        }

        let mut memory = Memory::new();
        memory.set_bool(&["links", &src.to_string(), "source"], true);

        run(&mut w, &memory, &Config::default());

        let d = w.structure_data(w.entity(dst).unwrap()).unwrap();
        // 3% transit loss.
        assert_eq!(d.store.energy(), 388);
        let s = w.structure_data(w.entity(src).unwrap()).unwrap();
        assert!(s.store.is_empty());
    }

    #[test]
    fn below_threshold_loads_wait() {
        let mut w = GameWorld::new("keeper");
        w.add_controller(Pos::new("alpha", 40, 40), 6, Some("keeper"));
        let src = w.add_structure(StructureKind::Link, Pos::new("alpha", 10, 10), Some("keeper"));
        let dst = w.add_structure(StructureKind::Link, Pos::new("alpha", 30, 30), Some("keeper"));
        if let Ok(s) = w.ecs.query_one_mut::<&mut Structure>(w.entity(src).unwrap()) {
            s.store.add(Resource::Energy, 50);
        }
        let mut memory = Memory::new();
        memory.set_bool(&["links", &src.to_string(), "source"], true);

        run(&mut w, &memory, &Config::default());
        let d = w.structure_data(w.entity(dst).unwrap()).unwrap();
        assert!(d.store.is_empty());
    }
}
