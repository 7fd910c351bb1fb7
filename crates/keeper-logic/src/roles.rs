//! The closed role catalog.
//!
//! Every worker belongs to exactly one role, fixed at spawn time. The
//! catalog drives three things: spawn priority (the order of
//! [`Role::ALL`]), body planning (each role's [`BodyPlan`]), and dispatch
//! (the engine matches on the enum to pick the routine).

use serde::{Deserialize, Serialize};

use crate::body::{BodyPlan, Part};

/// All worker roles, in spawn priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    /// Sits on a source container and mines continuously.
    StaticHarvester,
    /// Moves energy from source containers to storage.
    Hauler,
    /// Keeps spawns, extensions, and towers fed from storage.
    Filler,
    /// Melee response to hostiles, anywhere.
    Defender,
    /// Low-level all-purpose economy worker.
    Harvester,
    /// Keeps marked remote controllers reserved.
    Reserver,
    /// Claims marked rooms.
    Claimer,
    /// Works the prioritized repair queue.
    Repairer,
    /// Builds construction sites.
    Builder,
    /// Mines the mineral deposit into terminal or storage.
    Extractor,
    /// Upgrades marked remote controllers.
    RemoteUpgrader,
    /// Upgrades the home controller.
    Upgrader,
    /// Shuttles minerals between storage and terminal.
    TerminalMover,
    /// Repairs structures in marked remote rooms.
    RemoteRepairer,
    /// Harvests marked remote rooms and hauls the energy home.
    RemoteHarvester,
    /// Builds up owned rooms that have no spawn yet.
    Bootstrapper,
}

/// Static catalog entry for one role.
#[derive(Debug, Clone, Copy)]
pub struct RoleInfo {
    /// Name prefix used when minting creep names (`prefix` + 4 digits).
    pub prefix: &'static str,
    /// Operates across rooms; counted and provisioned globally.
    pub multi_room: bool,
    /// Bypasses the stored-energy gate on multi-room provisioning.
    pub important: bool,
    /// Allowed to stand on containers indefinitely.
    pub ok_container: bool,
    pub body: BodyPlan,
}

impl Role {
    pub const ALL: [Role; 16] = [
        Role::StaticHarvester,
        Role::Hauler,
        Role::Filler,
        Role::Defender,
        Role::Harvester,
        Role::Reserver,
        Role::Claimer,
        Role::Repairer,
        Role::Builder,
        Role::Extractor,
        Role::RemoteUpgrader,
        Role::Upgrader,
        Role::TerminalMover,
        Role::RemoteRepairer,
        Role::RemoteHarvester,
        Role::Bootstrapper,
    ];

    /// Roles whose absence in an owned room is an emergency.
    pub const CRITICAL: [Role; 3] = [Role::StaticHarvester, Role::Hauler, Role::Filler];

    pub fn info(self) -> &'static RoleInfo {
        match self {
            Role::StaticHarvester => &RoleInfo {
                prefix: "miner",
                multi_room: false,
                important: false,
                ok_container: true,
                body: BodyPlan {
                    base: &[Part::Carry, Part::Move],
                    group: &[Part::Work],
                    max_groups: 6,
                },
            },
            Role::Hauler => &RoleInfo {
                prefix: "hauler",
                multi_room: false,
                important: false,
                ok_container: false,
                body: BodyPlan {
                    base: &[],
                    group: &[Part::Carry, Part::Carry, Part::Move],
                    max_groups: 6,
                },
            },
            Role::Filler => &RoleInfo {
                prefix: "filler",
                multi_room: false,
                important: false,
                ok_container: false,
                body: BodyPlan {
                    base: &[],
                    group: &[Part::Carry, Part::Carry, Part::Move],
                    max_groups: 4,
                },
            },
            Role::Defender => &RoleInfo {
                prefix: "defender",
                multi_room: true,
                important: true,
                ok_container: false,
                body: BodyPlan {
                    base: &[],
                    group: &[Part::Tough, Part::Attack, Part::Move, Part::Move],
                    max_groups: 8,
                },
            },
            Role::Harvester => &RoleInfo {
                prefix: "harvester",
                multi_room: false,
                important: false,
                ok_container: false,
                body: BodyPlan {
                    base: &[],
                    group: &[Part::Work, Part::Carry, Part::Move],
                    max_groups: 4,
                },
            },
            Role::Reserver => &RoleInfo {
                prefix: "reserver",
                multi_room: true,
                important: false,
                ok_container: false,
                body: BodyPlan {
                    base: &[],
                    group: &[Part::Claim, Part::Move],
                    max_groups: 2,
                },
            },
            Role::Claimer => &RoleInfo {
                prefix: "claimer",
                multi_room: true,
                important: false,
                ok_container: false,
                body: BodyPlan {
                    base: &[],
                    group: &[Part::Claim, Part::Move],
                    max_groups: 1,
                },
            },
            Role::Repairer => &RoleInfo {
                prefix: "repairer",
                multi_room: false,
                important: false,
                ok_container: false,
                body: BodyPlan {
                    base: &[],
                    group: &[Part::Work, Part::Carry, Part::Move],
                    max_groups: 5,
                },
            },
            Role::Builder => &RoleInfo {
                prefix: "builder",
                multi_room: false,
                important: false,
                ok_container: false,
                body: BodyPlan {
                    base: &[],
                    group: &[Part::Work, Part::Carry, Part::Move],
                    max_groups: 5,
                },
            },
            Role::Extractor => &RoleInfo {
                prefix: "extractor",
                multi_room: false,
                important: false,
                ok_container: true,
                body: BodyPlan {
                    base: &[Part::Carry, Part::Move],
                    group: &[Part::Work, Part::Work, Part::Move],
                    max_groups: 5,
                },
            },
            Role::RemoteUpgrader => &RoleInfo {
                prefix: "rmupgrader",
                multi_room: true,
                important: false,
                ok_container: false,
                body: BodyPlan {
                    base: &[],
                    group: &[Part::Work, Part::Carry, Part::Move],
                    max_groups: 5,
                },
            },
            Role::Upgrader => &RoleInfo {
                prefix: "upgrader",
                multi_room: false,
                important: false,
                ok_container: true,
                body: BodyPlan {
                    base: &[],
                    group: &[Part::Work, Part::Work, Part::Carry, Part::Move],
                    max_groups: 5,
                },
            },
            Role::TerminalMover => &RoleInfo {
                prefix: "termxfer",
                multi_room: false,
                important: false,
                ok_container: false,
                body: BodyPlan {
                    base: &[],
                    group: &[Part::Carry, Part::Carry, Part::Move],
                    max_groups: 5,
                },
            },
            Role::RemoteRepairer => &RoleInfo {
                prefix: "rmrepairer",
                multi_room: true,
                important: false,
                ok_container: false,
                body: BodyPlan {
                    base: &[],
                    group: &[Part::Work, Part::Carry, Part::Move, Part::Move],
                    max_groups: 4,
                },
            },
            Role::RemoteHarvester => &RoleInfo {
                prefix: "rmharvester",
                multi_room: true,
                important: false,
                ok_container: false,
                body: BodyPlan {
                    base: &[],
                    group: &[Part::Work, Part::Carry, Part::Move, Part::Move],
                    max_groups: 4,
                },
            },
            Role::Bootstrapper => &RoleInfo {
                prefix: "bootstrap",
                multi_room: true,
                important: false,
                ok_container: false,
                body: BodyPlan {
                    base: &[],
                    group: &[Part::Work, Part::Carry, Part::Move],
                    max_groups: 4,
                },
            },
        }
    }

    /// Reverse lookup from a name prefix (used by marker parsing).
    pub fn from_prefix(prefix: &str) -> Option<Role> {
        Role::ALL.iter().copied().find(|r| r.info().prefix == prefix)
    }
}
