//! Single-knockout essentiality sweeps over reactions, genes, or genomic
//! intervals: pin one candidate's use/flux variable to zero, solve, record
//! the objective, restore.

use crate::analysis::solve;
use crate::context::Context;
use crate::error::MfaResult;
use crate::problem_state::ProblemState;
use crate::solver::SolverFacade;
use crate::variable::OptStatus;

/// One candidate's knockout outcome.
#[derive(Debug, Clone)]
pub struct EssentialityOutcome {
    /// Candidate identifier (reaction id, gene id, interval id).
    pub id: String,
    /// Objective value with the candidate pinned to zero; `NAN` unless
    /// `status == Optimal`.
    pub objective_value: f64,
    /// Solve outcome for this candidate.
    pub status: OptStatus,
}

/// For each `(id, variable)` pair, pin `variable` to `[0, 0]`, solve, record
/// the objective and status, then restore. A candidate whose pin makes the
/// model infeasible is reported as such, not treated as an error — an
/// infeasible knockout is itself the essentiality signal.
pub fn run_essentiality(
    state: &mut ProblemState,
    facade: &mut SolverFacade,
    ctx: &Context,
    candidates: &[(String, usize)],
) -> MfaResult<Vec<EssentialityOutcome>> {
    let mut outcomes = Vec::with_capacity(candidates.len());
    for (id, var) in candidates {
        if ctx.terminate.is_set() {
            break;
        }
        state.push_state();
        state.set_bound(*var, 0.0, 0.0);
        let result = solve(facade, state, ctx, false, false)?;
        outcomes.push(EssentialityOutcome { id: id.clone(), objective_value: result.objective_value, status: result.status });
        state.pop_state();
    }
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::{ConstraintMeaning, EqualityKind, LinEquation, MfaVariable, ObjectRef, VariableType};
    use std::collections::HashMap;

    fn toy_network() -> ProblemState {
        let mut state = ProblemState::new();
        let r1 = state.add_variable(MfaVariable::new(0, VariableType::Flux, ObjectRef::None, None, 0.0, 100.0, "r1"));
        let ex_a = state.add_variable(MfaVariable::new(1, VariableType::DrainFlux, ObjectRef::None, None, -10.0, 0.0, "ex_a"));
        let ex_b = state.add_variable(MfaVariable::new(2, VariableType::DrainFlux, ObjectRef::None, None, 0.0, 100.0, "ex_b"));

        let mut bal_a = LinEquation::new(0, "bal_a", EqualityKind::Equal, 0.0, ConstraintMeaning::MassBalance);
        bal_a.add_term(r1, -1.0).add_term(ex_a, 1.0);
        state.add_constraint(bal_a);
        let mut bal_b = LinEquation::new(1, "bal_b", EqualityKind::Equal, 0.0, ConstraintMeaning::MassBalance);
        bal_b.add_term(r1, 1.0).add_term(ex_b, -1.0);
        state.add_constraint(bal_b);

        let mut objective = HashMap::new();
        objective.insert(ex_b, 1.0);
        state.set_objective(objective, true);
        state
    }

    #[test]
    fn knocking_out_the_sole_reaction_blocks_growth_but_stays_feasible() {
        let mut state = toy_network();
        let mut facade = SolverFacade::new();
        let ctx = Context::new(crate::domain::Database::new());
        let outcomes = run_essentiality(&mut state, &mut facade, &ctx, &[("r1".to_string(), 0)]).unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].status, OptStatus::Optimal);
        assert!(outcomes[0].objective_value.abs() < 1e-9);
    }

    #[test]
    fn state_is_restored_between_candidates() {
        let mut state = toy_network();
        let mut facade = SolverFacade::new();
        let ctx = Context::new(crate::domain::Database::new());
        run_essentiality(&mut state, &mut facade, &ctx, &[("r1".to_string(), 0)]).unwrap();
        assert_eq!(state.variables[0].lower, 0.0);
        assert_eq!(state.variables[0].upper, 100.0);
    }
}
