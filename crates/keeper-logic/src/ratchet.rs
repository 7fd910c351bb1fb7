//! Monotone repair-floor raising for fortifications.
//!
//! The ratchet keeps walls and ramparts growing over a colony's lifetime
//! without ever demanding a jump the workforce cannot deliver. Per room
//! and class it holds a floor that only moves up: once every structure in
//! the class has reached the current floor (and the partnered class is
//! not lagging behind), the floor rises by a fixed delta, rounded down to
//! a granularity, respecting a cooldown and a cap.

use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Persisted ratchet state for one room + class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatchetState {
    /// Current repair floor in hits.
    pub floor: u32,
    /// Tick of the most recent raise (or initialization).
    pub raised_at: u64,
}

/// Outcome of one ratchet evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatchetStep {
    /// No state yet; initialize the floor to this value.
    Init(u32),
    /// Floor unchanged this pass.
    Hold,
    /// Floor satisfied but the partnered class is lower; raise that first.
    Deferred,
    /// Raise the floor to this value.
    Raise(u32),
}

/// Evaluate the ratchet for one room + class.
///
/// `observed_min` is the weakest structure of the class in the room
/// (`None` when the class has no structures — nothing to ratchet).
/// `partner_floor` is the partnered class's current floor, if that class
/// has structures. `cap` is the effective maximum (config, possibly
/// lowered by a marker).
pub fn evaluate(
    state: Option<RatchetState>,
    observed_min: Option<u32>,
    partner_floor: Option<u32>,
    cap: u32,
    tick: u64,
    cfg: &Config,
) -> RatchetStep {
    let observed_min = match observed_min {
        Some(v) => v,
        None => return RatchetStep::Hold,
    };

    let state = match state {
        Some(s) => s,
        None => {
            // Start from what already stands, never below the configured
            // minimum, aligned to the rounding grain.
            let floor = observed_min
                .max(cfg.ratchet_min)
                .min(cap)
                / cfg.ratchet_rounding
                * cfg.ratchet_rounding;
            return RatchetStep::Init(floor);
        }
    };

    if state.floor >= cap {
        return RatchetStep::Hold;
    }
    if observed_min < state.floor {
        // Workforce has not caught up to the current floor.
        return RatchetStep::Hold;
    }
    if tick.saturating_sub(state.raised_at) < cfg.ratchet_cooldown {
        return RatchetStep::Hold;
    }
    if let Some(partner) = partner_floor {
        if partner < state.floor {
            return RatchetStep::Deferred;
        }
    }

    let raised = state
        .floor
        .saturating_add(cfg.ratchet_delta)
        .min(cap)
        / cfg.ratchet_rounding
        * cfg.ratchet_rounding;
    if raised <= state.floor {
        return RatchetStep::Hold;
    }
    RatchetStep::Raise(raised)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> Config {
        Config::default()
    }

    #[test]
    fn initializes_from_observed_or_min() {
        // Weak walls: start at the configured minimum.
        assert_eq!(
            evaluate(None, Some(50_000), None, 10_000_000, 0, &cfg()),
            RatchetStep::Init(250_000)
        );
        // Strong walls: start from what stands, rounded down.
        assert_eq!(
            evaluate(None, Some(612_345), None, 10_000_000, 0, &cfg()),
            RatchetStep::Init(612_000)
        );
    }

    #[test]
    fn raises_only_when_floor_is_met() {
        let state = RatchetState { floor: 250_000, raised_at: 0 };
        assert_eq!(
            evaluate(Some(state), Some(240_000), None, 10_000_000, 1_000, &cfg()),
            RatchetStep::Hold
        );
        assert_eq!(
            evaluate(Some(state), Some(250_000), None, 10_000_000, 1_000, &cfg()),
            RatchetStep::Raise(270_000)
        );
    }

    #[test]
    fn cooldown_blocks_back_to_back_raises() {
        let state = RatchetState { floor: 250_000, raised_at: 900 };
        assert_eq!(
            evaluate(Some(state), Some(260_000), None, 10_000_000, 1_000, &cfg()),
            RatchetStep::Hold
        );
        assert_eq!(
            evaluate(Some(state), Some(260_000), None, 10_000_000, 1_400, &cfg()),
            RatchetStep::Raise(270_000)
        );
    }

    #[test]
    fn cap_is_never_exceeded() {
        let state = RatchetState { floor: 290_000, raised_at: 0 };
        assert_eq!(
            evaluate(Some(state), Some(290_000), None, 300_000, 10_000, &cfg()),
            RatchetStep::Raise(300_000)
        );
        let at_cap = RatchetState { floor: 300_000, raised_at: 0 };
        assert_eq!(
            evaluate(Some(at_cap), Some(400_000), None, 300_000, 20_000, &cfg()),
            RatchetStep::Hold
        );
    }

    #[test]
    fn lagging_partner_defers_the_raise() {
        let state = RatchetState { floor: 270_000, raised_at: 0 };
        assert_eq!(
            evaluate(Some(state), Some(280_000), Some(250_000), 10_000_000, 1_000, &cfg()),
            RatchetStep::Deferred
        );
        assert_eq!(
            evaluate(Some(state), Some(280_000), Some(270_000), 10_000_000, 1_000, &cfg()),
            RatchetStep::Raise(290_000)
        );
    }

    #[test]
    fn empty_class_holds() {
        assert_eq!(
            evaluate(None, None, None, 10_000_000, 0, &cfg()),
            RatchetStep::Hold
        );
    }
}
