//! Gap filling and gap generation: dual MILP formulations over a candidate
//! set of toggleable reactions.
//!
//! Gap filling asks "what is the smallest set of candidate reactions I must
//! add to restore growth?" (minimize the count turned on, subject to a
//! growth floor). Gap generation asks the opposite question over a set of
//! *existing* reactions: "what is the smallest set I must remove to block
//! growth?" (maximize the count kept on, subject to a growth ceiling — the
//! complement of the kept set is the minimal disabling set).

use crate::analysis::solve;
use crate::context::Context;
use crate::error::MfaResult;
use crate::problem_state::ProblemState;
use crate::solver::SolverFacade;
use crate::variable::{ConstraintMeaning, EqualityKind, LinEquation, OptStatus};
use std::collections::HashMap;

/// Minimize `sum(use_var for (_, use_var) in candidates)` subject to
/// `growth_var >= min_growth`. Returns the ids of candidates whose use
/// variable came out active (above the zero tolerance) — the minimal
/// addition set. Each candidate's reaction/use-variable linking is assumed
/// already present in `state` (built the same way any other reaction is);
/// this function only adds the growth floor and the objective.
pub fn gap_fill(
    state: &mut ProblemState,
    facade: &mut SolverFacade,
    ctx: &Context,
    candidates: &[(String, usize)],
    growth_var: usize,
    min_growth: f64,
) -> MfaResult<Vec<String>> {
    state.push_state();

    let mut floor = LinEquation::new(state.constraints.len(), "GAPFILL_GROWTH_FLOOR", EqualityKind::GreaterEq, min_growth, ConstraintMeaning::GrowthExperiment);
    floor.add_term(growth_var, 1.0);
    state.add_constraint(floor);

    let terms: HashMap<usize, f64> = candidates.iter().map(|(_, v)| (*v, 1.0)).collect();
    state.set_objective(terms, false);

    let result = solve(facade, state, ctx, false, false)?;
    let added = if result.status == OptStatus::Optimal {
        candidates
            .iter()
            .filter(|(_, v)| result.value_of(*v) > ctx.tolerances.mfa_zero_tolerance)
            .map(|(id, _)| id.clone())
            .collect()
    } else {
        Vec::new()
    };

    state.pop_state();
    Ok(added)
}

/// Maximize `sum(use_var for (_, use_var) in targets)` subject to
/// `growth_var <= max_growth` (a ceiling low enough to count as "blocked").
/// Returns the ids of `targets` whose use variable came out *inactive* in
/// that solution — the minimal set that must be disabled to force the
/// growth ceiling.
pub fn gap_generate(
    state: &mut ProblemState,
    facade: &mut SolverFacade,
    ctx: &Context,
    targets: &[(String, usize)],
    growth_var: usize,
    max_growth: f64,
) -> MfaResult<Vec<String>> {
    state.push_state();

    let mut ceiling = LinEquation::new(state.constraints.len(), "GAPGEN_GROWTH_CEILING", EqualityKind::LessEq, max_growth, ConstraintMeaning::GrowthExperiment);
    ceiling.add_term(growth_var, 1.0);
    state.add_constraint(ceiling);

    let terms: HashMap<usize, f64> = targets.iter().map(|(_, v)| (*v, 1.0)).collect();
    state.set_objective(terms, true);

    let result = solve(facade, state, ctx, false, false)?;
    let disabled = if result.status == OptStatus::Optimal {
        targets
            .iter()
            .filter(|(_, v)| result.value_of(*v) <= ctx.tolerances.mfa_zero_tolerance)
            .map(|(id, _)| id.clone())
            .collect()
    } else {
        Vec::new()
    };

    state.pop_state();
    Ok(disabled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::{MfaVariable, ObjectRef, VariableType};

    fn network_with_candidates() -> (ProblemState, usize, Vec<(String, usize)>) {
        let mut state = ProblemState::new();
        let growth = state.add_variable(MfaVariable::new(0, VariableType::Flux, ObjectRef::None, None, 0.0, 100.0, "growth"));
        let c1_flux = state.add_variable(MfaVariable::new(1, VariableType::Flux, ObjectRef::None, None, 0.0, 100.0, "cand1_flux"));
        let c1_use = state.add_variable(MfaVariable::new(2, VariableType::ReactionUse, ObjectRef::None, None, 0.0, 1.0, "cand1_use"));
        let c2_flux = state.add_variable(MfaVariable::new(3, VariableType::Flux, ObjectRef::None, None, 0.0, 100.0, "cand2_flux"));
        let c2_use = state.add_variable(MfaVariable::new(4, VariableType::ReactionUse, ObjectRef::None, None, 0.0, 1.0, "cand2_use"));

        let mut balance = LinEquation::new(0, "bal", EqualityKind::Equal, 0.0, ConstraintMeaning::MassBalance);
        balance.add_term(growth, -1.0).add_term(c1_flux, 1.0).add_term(c2_flux, 1.0);
        state.add_constraint(balance);

        let mut link1 = LinEquation::new(1, "link1", EqualityKind::LessEq, 0.0, ConstraintMeaning::UseLinking);
        link1.add_term(c1_flux, 1.0).add_term(c1_use, -100.0);
        state.add_constraint(link1);
        let mut link2 = LinEquation::new(2, "link2", EqualityKind::LessEq, 0.0, ConstraintMeaning::UseLinking);
        link2.add_term(c2_flux, 1.0).add_term(c2_use, -100.0);
        state.add_constraint(link2);

        (state, growth, vec![("cand1".to_string(), c1_use), ("cand2".to_string(), c2_use)])
    }

    #[test]
    fn gap_fill_adds_a_single_candidate_to_restore_growth() {
        let (mut state, growth, candidates) = network_with_candidates();
        let mut facade = SolverFacade::new();
        let ctx = Context::new(crate::domain::Database::new());
        let added = gap_fill(&mut state, &mut facade, &ctx, &candidates, growth, 5.0).unwrap();
        assert_eq!(added.len(), 1);
    }

    #[test]
    fn gap_generate_disables_enough_to_hit_the_ceiling() {
        let (mut state, growth, candidates) = network_with_candidates();
        let mut facade = SolverFacade::new();
        let ctx = Context::new(crate::domain::Database::new());
        // both candidates start unconstrained; force both active first so
        // there is something to disable.
        state.set_bound(candidates[0].1, 1.0, 1.0);
        state.set_bound(candidates[1].1, 1.0, 1.0);
        let disabled = gap_generate(&mut state, &mut facade, &ctx, &candidates, growth, 0.0).unwrap();
        assert!(disabled.len() >= 1);
    }
}
