//! External planning boundary: `plan_movement`, `plan_retreat`, `plan_build`.
//!
//! These are the three library-level entry points a collaborator embeds
//! directly (as opposed to driving the engine through the DUI text
//! protocol). `Engine::handle_go` is a thin caller of these functions, not
//! a separate reimplementation of their logic. The map is not a parameter:
//! the standard seven-power board is the single well-known dataset in
//! `crate::board::adjacency`, so these functions only take the dynamic
//! `BoardState` plus the power being planned for.

use std::io::Write;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use rand::rngs::SmallRng;
use thiserror::Error;

use crate::board::province::Power;
use crate::board::state::{BoardState, Phase};
use crate::board::Order;
use crate::eval::NeuralEvaluator;
use crate::movegen::random_orders;
use crate::search::{heuristic_build_orders, heuristic_retreat_orders, regret_matching_search, search};

/// Errors surfaced by the planning boundary. Everything below this layer
/// (illegal orders, degenerate candidate sets, exhausted search budgets)
/// is handled locally by the decoder/generator/searcher and never reaches
/// the caller as an `Err` — see the resolver and candidate generator for
/// how those are swallowed in place.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    /// `power` has no units and no supply centers in `state` — there is
    /// nothing to plan for.
    #[error("power {0:?} is not present in this position")]
    UnknownPower(Power),

    /// The requested plan kind does not match the state's current phase.
    #[error("wrong phase: expected {expected:?}, position is in {actual:?}")]
    WrongPhase { expected: Phase, actual: Phase },

    /// No position has been set yet (e.g. `go` arrived before `position`).
    #[error("no active position set")]
    NoActivePosition,
}

/// Resolves an optional position into a usable `&BoardState`, or a typed
/// error when the caller has no position set. This is the boundary check
/// `Engine::handle_go` runs before dispatching to the phase-specific
/// planners below.
pub fn require_position(position: Option<&BoardState>) -> Result<&BoardState, PlanError> {
    position.ok_or(PlanError::NoActivePosition)
}

/// Returns true if `power` owns at least one unit or supply center.
fn power_present(state: &BoardState, power: Power) -> bool {
    state
        .units
        .iter()
        .any(|u| matches!(u, Some((p, _)) if *p == power))
        || state.sc_owner.iter().any(|o| *o == Some(power))
}

/// Plans movement orders for `power` in `state`.
///
/// Dispatches to the RM+ searcher at `strength >= 80`, the cheaper
/// Cartesian-product searcher otherwise, and falls back to legal random
/// orders if the search produces nothing. `out` receives `info` progress
/// lines in the same format the DUI driver forwards to stdout.
#[allow(clippy::too_many_arguments)]
pub fn plan_movement<W: Write>(
    state: &BoardState,
    power: Power,
    budget: Duration,
    strength: u64,
    neural: Option<&NeuralEvaluator>,
    rng: &mut SmallRng,
    out: &mut W,
) -> Result<Vec<Order>, PlanError> {
    if state.phase != Phase::Movement {
        return Err(PlanError::WrongPhase {
            expected: Phase::Movement,
            actual: state.phase,
        });
    }
    if !power_present(state, power) {
        return Err(PlanError::UnknownPower(power));
    }

    let result = if strength >= 80 {
        regret_matching_search(power, state, budget, out, neural, strength)
    } else {
        search(power, state, budget, out, &AtomicBool::new(false))
    };

    if result.orders.is_empty() {
        Ok(random_orders(power, state, rng))
    } else {
        Ok(result.orders)
    }
}

/// Plans retreat orders for `power` in `state`.
///
/// Uses heuristic scoring only; there is no neural retreat decoder, so the
/// `policy` parameter described at the planning boundary is accepted for
/// interface symmetry but currently unused here.
pub fn plan_retreat(
    state: &BoardState,
    power: Power,
    rng: &mut SmallRng,
) -> Result<Vec<Order>, PlanError> {
    if state.phase != Phase::Retreat {
        return Err(PlanError::WrongPhase {
            expected: Phase::Retreat,
            actual: state.phase,
        });
    }
    if !power_present(state, power) {
        return Err(PlanError::UnknownPower(power));
    }

    let orders = heuristic_retreat_orders(power, state);
    if orders.is_empty() {
        Ok(random_orders(power, state, rng))
    } else {
        Ok(orders)
    }
}

/// Plans build/disband orders for `power` in `state`.
///
/// Uses heuristic scoring only, for the same reason as [`plan_retreat`].
pub fn plan_build(
    state: &BoardState,
    power: Power,
    rng: &mut SmallRng,
) -> Result<Vec<Order>, PlanError> {
    if state.phase != Phase::Build {
        return Err(PlanError::WrongPhase {
            expected: Phase::Build,
            actual: state.phase,
        });
    }
    if !power_present(state, power) {
        return Err(PlanError::UnknownPower(power));
    }

    let orders = heuristic_build_orders(power, state);
    if orders.is_empty() {
        Ok(random_orders(power, state, rng))
    } else {
        Ok(orders)
    }
}
