//! Flux balance analysis: a single solve against whatever objective is
//! already loaded on the problem.

use crate::analysis::solve;
use crate::context::Context;
use crate::error::MfaResult;
use crate::problem_state::ProblemState;
use crate::solver::SolverFacade;
use crate::variable::OptSolutionData;

/// Solve `state` as-is and return the outcome. Does not mutate `state`
/// beyond recording `last_solution`; callers that want a clean baseline to
/// branch further analyses from should `push_state()` first themselves.
pub fn run_fba(state: &mut ProblemState, facade: &mut SolverFacade, ctx: &Context) -> MfaResult<OptSolutionData> {
    solve(facade, state, ctx, false, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::{ConstraintMeaning, EqualityKind, LinEquation, MfaVariable, ObjectRef, OptStatus, VariableType};

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

        let mut objective = std::collections::HashMap::new();
        objective.insert(ex_b, 1.0);
        state.set_objective(objective, true);
        state
    }

    #[test]
    fn maximizes_export_and_reports_optimal() {
        let mut state = toy_network();
        let mut facade = SolverFacade::new();
        let ctx = Context::new(crate::domain::Database::new());
        let result = run_fba(&mut state, &mut facade, &ctx).unwrap();
        assert_eq!(result.status, OptStatus::Optimal);
        assert!((result.objective_value - 10.0).abs() < 1e-6);
    }

    #[test]
    fn contradictory_constraint_reports_infeasible() {
        let mut state = toy_network();
        let mut impossible = LinEquation::new(2, "impossible", EqualityKind::GreaterEq, 1.0, ConstraintMeaning::UserSupplied);
        impossible.add_term(2, 1.0);
        state.add_constraint(impossible);
        let mut blocked = LinEquation::new(3, "blocked", EqualityKind::LessEq, 0.0, ConstraintMeaning::UserSupplied);
        blocked.add_term(2, 1.0);
        state.add_constraint(blocked);
        let mut facade = SolverFacade::new();
        let ctx = Context::new(crate::domain::Database::new());
        let result = run_fba(&mut state, &mut facade, &ctx).unwrap();
        assert_eq!(result.status, OptStatus::Infeasible);
    }
}
