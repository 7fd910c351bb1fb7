//! Creep body parts and greedy group-based body planning.
//!
//! A body plan is a fixed base plus a repeatable group. Planning repeats
//! the whole group while the next copy still fits the energy budget and
//! the group cap is not exceeded. Groups are never split: a body either
//! gains a complete group or stops growing, so part ratios hold at every
//! budget.

use serde::{Deserialize, Serialize};

/// One creep body part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Part {
    Move,
    Work,
    Carry,
    Attack,
    RangedAttack,
    Heal,
    Claim,
    Tough,
}

impl Part {
    /// Energy cost to spawn this part.
    pub fn cost(self) -> u32 {
        match self {
            Part::Move => 50,
            Part::Work => 100,
            Part::Carry => 50,
            Part::Attack => 80,
            Part::RangedAttack => 150,
            Part::Heal => 250,
            Part::Claim => 600,
            Part::Tough => 10,
        }
    }

    /// Cargo capacity contributed by this part.
    pub fn capacity(self) -> u32 {
        match self {
            Part::Carry => 50,
            _ => 0,
        }
    }
}

/// Total spawn cost of a body.
pub fn body_cost(body: &[Part]) -> u32 {
    body.iter().map(|p| p.cost()).sum()
}

/// Total cargo capacity of a body.
pub fn body_capacity(body: &[Part]) -> u32 {
    body.iter().map(|p| p.capacity()).sum()
}

/// Repeatable body recipe for one role.
#[derive(Debug, Clone, Copy)]
pub struct BodyPlan {
    /// Parts always present, spawned once.
    pub base: &'static [Part],
    /// Group repeated while affordable.
    pub group: &'static [Part],
    /// Upper bound on group repetitions.
    pub max_groups: u32,
}

impl BodyPlan {
    /// Build the largest body this plan affords within `energy_budget`.
    ///
    /// Returns `None` when even base + one group does not fit (a plan with
    /// no repetitions is not a viable creep).
    pub fn build(&self, energy_budget: u32) -> Option<Vec<Part>> {
        let base_cost = body_cost(self.base);
        let group_cost = body_cost(self.group);
        if base_cost + group_cost > energy_budget || self.group.is_empty() {
            return None;
        }

        let affordable = (energy_budget - base_cost) / group_cost;
        let groups = affordable.min(self.max_groups).max(1);

        let mut body = Vec::with_capacity(self.base.len() + self.group.len() * groups as usize);
        body.extend_from_slice(self.base);
        for _ in 0..groups {
            body.extend_from_slice(self.group);
        }
        Some(body)
    }
}
