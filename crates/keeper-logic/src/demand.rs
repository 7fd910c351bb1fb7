//! Per-role desired worker counts.
//!
//! Pure functions over room snapshots and marker tallies: same inputs,
//! same answer, no side effects. Desired-count markers override these
//! values upstream in the allocator; these are the baseline policy.

use crate::roles::Role;
use crate::snapshot::RoomSnapshot;

/// Tallies of operator-marked remote rooms, fed to the global planners.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoteTargets {
    pub reserve_rooms: u32,
    pub claim_rooms: u32,
    pub harvest_rooms: u32,
    pub repair_rooms: u32,
}

/// Desired count for a room-scoped role in one room.
///
/// Multi-room roles always return 0 here; see [`desired_global`].
pub fn desired_in_room(role: Role, snap: &RoomSnapshot) -> u32 {
    if role.info().multi_room {
        return 0;
    }
    if !snap.owned {
        return 0;
    }
    match role {
        Role::StaticHarvester => snap.sources_with_container,
        Role::Hauler => {
            if snap.has_storage && snap.containers > 0 {
                snap.sources_with_container.clamp(1, 2)
            } else {
                0
            }
        }
        Role::Filler => {
            if snap.has_storage {
                if snap.towers > 0 {
                    2
                } else {
                    1
                }
            } else {
                0
            }
        }
        // Hand harvesting carries the room until container mining is up.
        Role::Harvester => {
            if snap.level >= 3 || snap.sources_with_container > 0 {
                0
            } else {
                snap.sources
            }
        }
        Role::Repairer => {
            if snap.level >= 2 {
                1
            } else {
                0
            }
        }
        Role::Builder => {
            if snap.construction_sites > 0 {
                (1 + snap.construction_sites / 10).min(3)
            } else {
                0
            }
        }
        Role::Extractor => {
            let sink = snap.has_terminal || snap.has_storage;
            if snap.has_extractor && snap.mineral_amount > 0 && sink && snap.level >= 6 {
                1
            } else {
                0
            }
        }
        Role::Upgrader => {
            if snap.level >= 8 {
                1
            } else {
                2
            }
        }
        // Marker-driven only.
        Role::TerminalMover => 0,
        _ => 0,
    }
}

/// Desired count for a multi-room role across the whole colony.
pub fn desired_global(role: Role, snaps: &[&RoomSnapshot], remotes: RemoteTargets) -> u32 {
    if !role.info().multi_room {
        return 0;
    }
    match role {
        Role::Defender => snaps
            .iter()
            .filter(|s| s.enemy_window.ticks_with_enemies > 0)
            .map(|s| s.enemy_window.max_hostiles)
            .sum::<u32>()
            .min(4),
        Role::Reserver => remotes.reserve_rooms,
        Role::Claimer => remotes.claim_rooms,
        Role::RemoteHarvester => remotes.harvest_rooms,
        Role::RemoteRepairer => {
            if remotes.repair_rooms > 0 {
                1
            } else {
                0
            }
        }
        // Only ever spawned via markers or the bootstrap path.
        Role::RemoteUpgrader | Role::Bootstrapper => 0,
        _ => 0,
    }
}
