//! Media minimization: among a set of candidate exchange-use indicators,
//! find the smallest subset that still supports growth above a threshold.

use crate::analysis::solve;
use crate::context::Context;
use crate::error::MfaResult;
use crate::problem_state::ProblemState;
use crate::solver::SolverFacade;
use crate::variable::{ConstraintMeaning, EqualityKind, LinEquation, OptStatus};
use std::collections::HashMap;

const GROWTH_FLOOR_NAME: &str = "MEDIA_GROWTH_FLOOR";

/// Minimize `sum(exchange_use_vars)` subject to `growth_var >= min_growth`,
/// with every variable in `excluded` pinned to zero first (e.g. components
/// already ruled out, or dead-end compounds the caller wants excluded from
/// consideration). Returns the subset of `exchange_use_vars` active (above
/// the zero tolerance) in the minimal medium found.
///
/// An infeasible solve (no medium within `excluded`'s restrictions supports
/// `min_growth`) returns an empty set and leaves `state` untouched.
pub fn minimize_media(
    state: &mut ProblemState,
    facade: &mut SolverFacade,
    ctx: &Context,
    exchange_use_vars: &[usize],
    growth_var: usize,
    min_growth: f64,
    excluded: &[usize],
) -> MfaResult<Vec<usize>> {
    state.push_state();

    let mut floor = LinEquation::new(state.constraints.len(), GROWTH_FLOOR_NAME, EqualityKind::GreaterEq, min_growth, ConstraintMeaning::GrowthExperiment);
    floor.add_term(growth_var, 1.0);
    state.add_constraint(floor);

    for &v in excluded {
        state.set_bound(v, 0.0, 0.0);
    }

    let terms: HashMap<usize, f64> = exchange_use_vars.iter().map(|&v| (v, 1.0)).collect();
    state.set_objective(terms, false);

    let result = solve(facade, state, ctx, false, false)?;
    let active = if result.status == OptStatus::Optimal {
        exchange_use_vars.iter().copied().filter(|&v| result.value_of(v) > ctx.tolerances.mfa_zero_tolerance).collect()
    } else {
        Vec::new()
    };

    state.pop_state();
    Ok(active)
}
