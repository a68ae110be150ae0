//! Recursive MILP enumeration: repeatedly solve, record the current binary
//! configuration, add an integer cut excluding it, and solve again, until a
//! solution limit, a dry solve, or a solution-size band rules out further
//! members.

use crate::analysis::solve;
use crate::context::Context;
use crate::error::MfaResult;
use crate::params::SolutionSizeInterval;
use crate::problem_state::ProblemState;
use crate::solver::SolverFacade;
use crate::variable::{ConstraintMeaning, EqualityKind, LinEquation, OptStatus};
use std::collections::HashMap;

/// One enumerated solution: its full variable assignment and objective
/// value, at the point it was found (before any later integer cut).
#[derive(Debug, Clone)]
pub struct EnumeratedSolution {
    /// Variable index -> value.
    pub values: HashMap<usize, f64>,
    /// Objective value at this solution.
    pub objective_value: f64,
}

/// Enumerate distinct optimal/near-optimal assignments of `binary_vars` by
/// repeated solve + integer cut, stopping at the first of: `limit` solutions
/// collected, a non-optimal solve (no more distinct solutions exist under
/// the current cuts), or cooperative termination. Returns only the subset
/// whose distance in objective value from the first (best) solution found
/// falls within `interval`; members outside the band are still found and
/// cut, just not returned, so the scan doesn't stop early at the band edge.
pub fn recursive_milp_enumerate(
    state: &mut ProblemState,
    facade: &mut SolverFacade,
    ctx: &Context,
    binary_vars: &[usize],
    limit: usize,
    interval: SolutionSizeInterval,
) -> MfaResult<Vec<EnumeratedSolution>> {
    state.push_state();
    let mut found = Vec::new();
    let mut cut_count = 0usize;

    while found.len() < limit {
        if ctx.terminate.is_set() {
            break;
        }
        let result = solve(facade, state, ctx, false, false)?;
        if result.status != OptStatus::Optimal {
            break;
        }
        found.push(EnumeratedSolution { values: result.values.clone(), objective_value: result.objective_value });

        cut_count += 1;
        let active_count = binary_vars.iter().filter(|&&v| result.value_of(v) > 0.5).count() as f64;
        let mut cut = LinEquation::new(
            state.constraints.len(),
            format!("ENUM_CUT_{}", cut_count),
            EqualityKind::GreaterEq,
            1.0 - active_count,
            ConstraintMeaning::IntegerCut,
        );
        for &v in binary_vars {
            if result.value_of(v) > 0.5 {
                cut.add_term(v, -1.0);
            } else {
                cut.add_term(v, 1.0);
            }
        }
        state.add_constraint(cut);
    }

    state.pop_state();

    let reference = match found.first() {
        Some(first) => first.objective_value,
        None => return Ok(Vec::new()),
    };
    Ok(found
        .into_iter()
        .filter(|s| {
            let delta = (reference - s.objective_value).abs();
            delta >= interval.min_delta && delta <= interval.max_delta
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::{MfaVariable, ObjectRef, VariableType};

    fn two_binary_choices() -> ProblemState {
        let mut state = ProblemState::new();
        let a = state.add_variable(MfaVariable::new(0, VariableType::ReactionUse, ObjectRef::None, None, 0.0, 1.0, "a"));
        let b = state.add_variable(MfaVariable::new(1, VariableType::ReactionUse, ObjectRef::None, None, 0.0, 1.0, "b"));
        let mut cap = LinEquation::new(0, "cap", EqualityKind::LessEq, 1.0, ConstraintMeaning::UserSupplied);
        cap.add_term(a, 1.0).add_term(b, 1.0);
        state.add_constraint(cap);
        let mut objective = HashMap::new();
        objective.insert(a, 1.0);
        objective.insert(b, 1.0);
        state.set_objective(objective, true);
        state
    }

    #[test]
    fn enumerates_until_cuts_exhaust_the_optimum() {
        let mut state = two_binary_choices();
        let mut facade = SolverFacade::new();
        let ctx = Context::new(crate::domain::Database::new());
        let interval = SolutionSizeInterval { min_delta: 0.0, max_delta: f64::INFINITY };
        let solutions = recursive_milp_enumerate(&mut state, &mut facade, &ctx, &[0, 1], 10, interval).unwrap();
        // Exactly two single-variable-on configurations achieve the optimum (1.0);
        // a third solve after both are cut can only reach 0.0, which is non-optimal
        // relative to the band anchored on the first solution found, or simply
        // never returned as optimal again once both singletons are excluded.
        assert!(solutions.len() >= 2);
        assert!(solutions.iter().all(|s| (s.objective_value - 1.0).abs() < 1e-6));
    }

    #[test]
    fn state_has_no_leftover_cuts_after_return() {
        let mut state = two_binary_choices();
        let mut facade = SolverFacade::new();
        let ctx = Context::new(crate::domain::Database::new());
        let interval = SolutionSizeInterval { min_delta: 0.0, max_delta: f64::INFINITY };
        recursive_milp_enumerate(&mut state, &mut facade, &ctx, &[0, 1], 10, interval).unwrap();
        assert_eq!(state.live_constraints().filter(|c| c.meaning == ConstraintMeaning::IntegerCut).count(), 0);
    }
}
