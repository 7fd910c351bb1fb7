//! Creep components and cargo stores.

use std::collections::BTreeMap;

use keeper_logic::body::{body_capacity, Part};
use keeper_logic::constants::CREEP_LIFETIME;
use keeper_logic::roles::Role;
use serde::{Deserialize, Serialize};

/// Everything a store can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Resource {
    Energy,
    Hydrogen,
    Oxygen,
    Utrium,
    Keanium,
    Zynthium,
    Lemergium,
    Catalyst,
}

/// Cargo contents of a creep or structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    contents: BTreeMap<Resource, u32>,
}

impl Store {
    pub fn amount(&self, resource: Resource) -> u32 {
        self.contents.get(&resource).copied().unwrap_or(0)
    }

    pub fn energy(&self) -> u32 {
        self.amount(Resource::Energy)
    }

    pub fn total(&self) -> u32 {
        self.contents.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn add(&mut self, resource: Resource, amount: u32) {
        if amount > 0 {
            *self.contents.entry(resource).or_insert(0) += amount;
        }
    }

    /// Remove up to `amount`; returns what was actually removed.
    pub fn remove(&mut self, resource: Resource, amount: u32) -> u32 {
        let have = self.amount(resource);
        let taken = have.min(amount);
        if taken == have {
            self.contents.remove(&resource);
        } else if taken > 0 {
            self.contents.insert(resource, have - taken);
        }
        taken
    }

    /// Resources currently held, stable order.
    pub fn kinds(&self) -> Vec<Resource> {
        self.contents.keys().copied().collect()
    }

    /// Resource with the largest stored amount, if any.
    pub fn largest(&self) -> Option<(Resource, u32)> {
        self.contents
            .iter()
            .max_by_key(|(_, amt)| **amt)
            .map(|(r, amt)| (*r, *amt))
    }
}

/// One of our workers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Creep {
    pub name: String,
    pub role: Role,
    /// Room this creep is provisioned for (spawn room, or the assigned
    /// room for bootstrappers).
    pub home_room: String,
    pub body: Vec<Part>,
    pub hits: u32,
    pub hits_max: u32,
    pub ticks_to_live: u32,
    pub store: Store,
    pub capacity: u32,
    /// Still being assembled; excluded from dispatch but counted by the
    /// allocator.
    pub spawning: bool,
}

impl Creep {
    pub fn new(name: impl Into<String>, role: Role, home_room: impl Into<String>, body: Vec<Part>) -> Self {
        let capacity = body_capacity(&body);
        let hits = body.len() as u32 * 100;
        Self {
            name: name.into(),
            role,
            home_room: home_room.into(),
            body,
            hits,
            hits_max: hits,
            ticks_to_live: CREEP_LIFETIME,
            store: Store::default(),
            capacity,
            spawning: false,
        }
    }

    pub fn free_capacity(&self) -> u32 {
        self.capacity.saturating_sub(self.store.total())
    }

    pub fn count_part(&self, part: Part) -> u32 {
        self.body.iter().filter(|p| **p == part).count() as u32
    }
}

/// A creep that is not ours.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hostile {
    pub owner: String,
    pub hits: u32,
    pub hits_max: u32,
}
