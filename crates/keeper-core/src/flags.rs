//! Operator markers.
//!
//! Markers are the manual steering surface: colored pins placed in the
//! world, read as configuration every tick. The color pair selects the
//! directive; the marker's name and position carry parameters. Parsed
//! once per tick into a [`MarkerSet`] and cached in the tick context.
//!
//! | primary / secondary | directive |
//! |---------------------|-----------|
//! | orange / orange | desired-count override, name `prefix-N-...` |
//! | orange / purple | reverse terminal transfer in this room |
//! | green / yellow | ratchet cap, name is the cap in hits |
//! | red / brown | never repair the structure at this position |
//! | red / red | avoid this room when routing |
//! | red / yellow | do not fund multi-room roles from this room |
//! | brown / brown | ignore the source at this position |
//! | yellow / red | reserve this room |
//! | yellow / white | claim this room |
//! | yellow / yellow | remote-harvest this room |
//! | yellow / green | remote-repair this room |

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use keeper_logic::demand::RemoteTargets;
use keeper_logic::roles::Role;

use crate::components::{DesiredOverride, Marker, MarkerColor, Pos};
use crate::context::TickCtx;
use crate::memory::Memory;
use crate::world::GameWorld;

/// All marker directives in force this tick.
#[derive(Debug, Clone, Default)]
pub struct MarkerSet {
    /// Desired-count overrides for room-scoped roles, by (room, role).
    pub desired_in_room: HashMap<(String, Role), u32>,
    /// Desired-count overrides for multi-room roles.
    pub desired_global: HashMap<Role, u32>,
    /// Ratchet cap per room, in hits.
    pub ratchet_caps: HashMap<String, u32>,
    /// Positions whose structure must never be repaired.
    pub no_repair: HashSet<(String, i32, i32)>,
    /// Rooms routing must avoid.
    pub avoid_rooms: HashSet<String>,
    /// Rooms that do not fund multi-room roles.
    pub no_remote: HashSet<String>,
    /// Source positions harvesting must skip.
    pub ignore_sources: HashSet<(String, i32, i32)>,
    /// Rooms with a reverse terminal-transfer directive.
    pub terminal_reverse: HashSet<String>,
    pub reserve_rooms: Vec<String>,
    pub claim_rooms: Vec<String>,
    pub harvest_rooms: Vec<String>,
    pub repair_rooms: Vec<String>,
}

impl MarkerSet {
    /// Parse every marker currently in the world.
    pub fn build(world: &GameWorld) -> Self {
        let mut set = MarkerSet::default();
        for (_, (pos, marker)) in world.ecs.query::<(&Pos, &Marker)>().iter() {
            set.apply(pos, marker);
        }
        for list in [
            &mut set.reserve_rooms,
            &mut set.claim_rooms,
            &mut set.harvest_rooms,
            &mut set.repair_rooms,
        ] {
            list.sort();
            list.dedup();
        }
        set
    }

    fn apply(&mut self, pos: &Pos, marker: &Marker) {
        use MarkerColor::*;
        match (marker.primary, marker.secondary) {
            (Orange, Orange) => match parse_desired(&marker.name) {
                Some(DesiredOverride { role, count }) => {
                    if role.info().multi_room {
                        self.desired_global.insert(role, count);
                    } else {
                        self.desired_in_room.insert((pos.room.clone(), role), count);
                    }
                }
                None => log::warn!(
                    "marker '{}' in {}: not a desired-count override",
                    marker.name,
                    pos.room
                ),
            },
            (Orange, Purple) => {
                self.terminal_reverse.insert(pos.room.clone());
            }
            (Green, Yellow) => match marker.name.parse::<u32>() {
                Ok(cap) => {
                    self.ratchet_caps.insert(pos.room.clone(), cap);
                }
                Err(_) => log::warn!(
                    "marker '{}' in {}: ratchet cap is not a number",
                    marker.name,
                    pos.room
                ),
            },
            (Red, Brown) => {
                self.no_repair.insert((pos.room.clone(), pos.x, pos.y));
            }
            (Red, Red) => {
                self.avoid_rooms.insert(pos.room.clone());
            }
            (Red, Yellow) => {
                self.no_remote.insert(pos.room.clone());
            }
            (Brown, Brown) => {
                self.ignore_sources.insert((pos.room.clone(), pos.x, pos.y));
            }
            (Yellow, Red) => self.reserve_rooms.push(pos.room.clone()),
            (Yellow, White) => self.claim_rooms.push(pos.room.clone()),
            (Yellow, Yellow) => self.harvest_rooms.push(pos.room.clone()),
            (Yellow, Green) => self.repair_rooms.push(pos.room.clone()),
            _ => {}
        }
    }

    /// Desired-count override for a role, if an operator placed one.
    pub fn desired_override(&self, room: &str, role: Role) -> Option<u32> {
        if role.info().multi_room {
            self.desired_global.get(&role).copied()
        } else {
            self.desired_in_room.get(&(room.to_string(), role)).copied()
        }
    }

    pub fn remote_targets(&self) -> RemoteTargets {
        RemoteTargets {
            reserve_rooms: self.reserve_rooms.len() as u32,
            claim_rooms: self.claim_rooms.len() as u32,
            harvest_rooms: self.harvest_rooms.len() as u32,
            repair_rooms: self.repair_rooms.len() as u32,
        }
    }

    pub fn avoid_list(&self) -> Vec<String> {
        self.avoid_rooms.iter().cloned().collect()
    }
}

/// Parse a `prefix-N-unique` override name.
fn parse_desired(name: &str) -> Option<DesiredOverride> {
    let mut parts = name.splitn(3, '-');
    let role = Role::from_prefix(parts.next()?)?;
    let count = parts.next()?.parse().ok()?;
    Some(DesiredOverride { role, count })
}

/// Markers for the tick, parsed once and cached.
pub fn markers(world: &GameWorld, ctx: &mut TickCtx) -> Rc<MarkerSet> {
    if let Some(set) = &ctx.markers {
        return Rc::clone(set);
    }
    let set = Rc::new(MarkerSet::build(world));
    ctx.markers = Some(Rc::clone(&set));
    set
}

/// Pick a target room for a multi-room creep, balancing the role's live
/// creeps across the marked rooms. Rooms with the fewest assignees win;
/// ties break toward the first marker.
pub fn assign_room(
    memory: &Memory,
    rooms: &[String],
    role: Role,
    world: &GameWorld,
) -> Option<String> {
    if rooms.is_empty() {
        return None;
    }
    let mut counts: HashMap<String, u32> = HashMap::new();
    for entity in world.creeps_of_role(role) {
        let Some(creep) = world.creep_data(entity) else { continue };
        if let Some(target) = memory.get_str(&["creeps", &creep.name, "target_room"]) {
            *counts.entry(target.to_string()).or_insert(0) += 1;
        }
    }
    rooms
        .iter()
        .min_by_key(|r| counts.get(*r).copied().unwrap_or(0))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world_with_markers() -> GameWorld {
        let mut w = GameWorld::new("keeper");
        w.add_marker("upgrader-3-x", Pos::new("alpha", 1, 1), MarkerColor::Orange, MarkerColor::Orange);
        w.add_marker("defender-2-y", Pos::new("alpha", 2, 1), MarkerColor::Orange, MarkerColor::Orange);
        w.add_marker("400000", Pos::new("alpha", 3, 1), MarkerColor::Green, MarkerColor::Yellow);
        w.add_marker("norep", Pos::new("alpha", 7, 7), MarkerColor::Red, MarkerColor::Brown);
        w.add_marker("keepout", Pos::new("badland", 1, 1), MarkerColor::Red, MarkerColor::Red);
        w.add_marker("rh", Pos::new("east", 1, 1), MarkerColor::Yellow, MarkerColor::Yellow);
        w.add_marker("rh", Pos::new("west", 1, 1), MarkerColor::Yellow, MarkerColor::Yellow);
        w.add_marker("rsv", Pos::new("north", 1, 1), MarkerColor::Yellow, MarkerColor::Red);
        w
    }

    #[test]
    fn desired_overrides_parse_by_scope() {
        let set = MarkerSet::build(&world_with_markers());
        // Upgrader is room-scoped, defender is global.
        assert_eq!(set.desired_override("alpha", Role::Upgrader), Some(3));
        assert_eq!(set.desired_override("beta", Role::Upgrader), None);
        assert_eq!(set.desired_override("anywhere", Role::Defender), Some(2));
    }

    #[test]
    fn directive_rooms_and_positions_collect() {
        let set = MarkerSet::build(&world_with_markers());
        assert_eq!(set.ratchet_caps.get("alpha"), Some(&400_000));
        assert!(set.no_repair.contains(&("alpha".to_string(), 7, 7)));
        assert!(set.avoid_rooms.contains("badland"));
        assert_eq!(set.harvest_rooms, vec!["east".to_string(), "west".to_string()]);
        assert_eq!(set.remote_targets().harvest_rooms, 2);
        assert_eq!(set.remote_targets().reserve_rooms, 1);
    }

    #[test]
    fn malformed_override_names_are_ignored() {
        let mut w = GameWorld::new("keeper");
        w.add_marker("nonsense", Pos::new("alpha", 1, 1), MarkerColor::Orange, MarkerColor::Orange);
        w.add_marker("upgrader-x-y", Pos::new("alpha", 2, 1), MarkerColor::Orange, MarkerColor::Orange);
        let set = MarkerSet::build(&w);
        assert!(set.desired_in_room.is_empty());
        assert!(set.desired_global.is_empty());
    }

    #[test]
    fn marker_cache_is_per_tick() {
        let w = world_with_markers();
        let mut ctx = TickCtx::new(1);
        let a = markers(&w, &mut ctx);
        let b = markers(&w, &mut ctx);
        assert!(Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn assign_room_balances_load() {
        use crate::components::Creep;
        use keeper_logic::body::Part;

        let mut w = world_with_markers();
        let mut memory = Memory::new();
        let rooms = vec!["east".to_string(), "west".to_string()];

        // One harvester already working east; the next goes west.
        w.add_creep(
            Creep::new("rmharvester0001", Role::RemoteHarvester, "alpha", vec![Part::Move]),
            Pos::new("east", 5, 5),
        );
        memory.set_str(&["creeps", "rmharvester0001", "target_room"], "east");
        assert_eq!(
            assign_room(&memory, &rooms, Role::RemoteHarvester, &w),
            Some("west".to_string())
        );
    }
}
