//! Flux variability analysis: pin the objective near its optimum, then
//! minimize and maximize each requested variable in turn to find its tight
//! range, classifying the reaction's behavior from the resulting envelope.

use crate::analysis::solve;
use crate::context::Context;
use crate::error::MfaResult;
use crate::problem_state::ProblemState;
use crate::solver::SolverFacade;
use crate::variable::{ConstraintMeaning, EqualityKind, LinEquation, OptStatus};
use std::collections::HashMap;

/// A reaction's steady-state behavior under the fixed, near-optimal
/// objective constraint, from the sign and span of its tight flux range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FluxClass {
    /// Strictly positive at every optimum: `min > 0`.
    Positive,
    /// Strictly negative at every optimum: `max < 0`.
    Negative,
    /// Spans zero with room on both sides: a genuinely variable reaction.
    Variable,
    /// Touches zero from the positive side only (`min == 0`, `max > 0`).
    PositiveOrZero,
    /// Touches zero from the negative side only (`min < 0`, `max == 0`).
    NegativeOrZero,
    /// Pinned at zero in every optimal solution.
    Blocked,
}

/// Classify a tight `[min, max]` range, treating magnitudes under
/// `zero_tolerance` as exactly zero.
pub fn classify_flux(min: f64, max: f64, zero_tolerance: f64) -> FluxClass {
    let min_zero = min.abs() <= zero_tolerance;
    let max_zero = max.abs() <= zero_tolerance;
    if min_zero && max_zero {
        FluxClass::Blocked
    } else if min > zero_tolerance {
        FluxClass::Positive
    } else if max < -zero_tolerance {
        FluxClass::Negative
    } else if min_zero && max > zero_tolerance {
        FluxClass::PositiveOrZero
    } else if max_zero && min < -zero_tolerance {
        FluxClass::NegativeOrZero
    } else {
        FluxClass::Variable
    }
}

/// The tight range found for one variable, plus its classification.
#[derive(Debug, Clone, Copy)]
pub struct TightBound {
    /// Variable index the range applies to.
    pub variable: usize,
    /// Tight minimum.
    pub min: f64,
    /// Tight maximum.
    pub max: f64,
    /// Behavior classification.
    pub class: FluxClass,
}

const OBJECTIVE_PIN_NAME: &str = "FVA_OBJECTIVE_PIN";

/// Run a baseline solve, pin the objective to `omega` times that optimum,
/// then minimize and maximize each of `variables` in turn against the
/// pinned problem. Writes the resulting ranges back onto
/// `state.variables[v].tight_min/tight_max`.
///
/// If the baseline solve is not optimal, returns an empty result and leaves
/// `state` untouched, per the "infeasible solve doesn't mutate tight
/// bounds" failure rule. If a per-variable minimize/maximize solve comes
/// back infeasible against the pinned objective (can happen at `omega`
/// close to 1 with numerical slack), that one side falls back to the
/// variable's original hard bound rather than aborting the whole pass.
pub fn run_fva(
    state: &mut ProblemState,
    facade: &mut SolverFacade,
    ctx: &Context,
    variables: &[usize],
    omega: f64,
) -> MfaResult<Vec<TightBound>> {
    let baseline = solve(facade, state, ctx, false, false)?;
    if baseline.status != OptStatus::Optimal {
        log::warn!("FVA baseline solve did not reach optimality ({:?}); skipping", baseline.status);
        return Ok(Vec::new());
    }
    let optimum = baseline.objective_value;
    let original_objective = state.objective.clone();
    let maximize = state.maximize;

    state.push_state();
    let mut pin = LinEquation::new(
        state.constraints.len(),
        OBJECTIVE_PIN_NAME,
        if maximize { EqualityKind::GreaterEq } else { EqualityKind::LessEq },
        omega * optimum,
        ConstraintMeaning::ObjectivePin,
    );
    for (&var, &coeff) in &original_objective {
        pin.add_term(var, coeff);
    }
    state.add_constraint(pin);

    let mut results = Vec::with_capacity(variables.len());
    for &v in variables {
        if ctx.terminate.is_set() {
            break;
        }
        let lower = state.variables[v].lower;
        let upper = state.variables[v].upper;

        let mut min_terms = HashMap::new();
        min_terms.insert(v, 1.0);
        state.set_objective(min_terms, false);
        let min_sol = solve(facade, state, ctx, false, false)?;
        let min = if min_sol.status == OptStatus::Optimal { min_sol.value_of(v) } else { lower };

        let mut max_terms = HashMap::new();
        max_terms.insert(v, 1.0);
        state.set_objective(max_terms, true);
        let max_sol = solve(facade, state, ctx, false, false)?;
        let max = if max_sol.status == OptStatus::Optimal { max_sol.value_of(v) } else { upper };

        state.variables[v].tight_min = Some(min);
        state.variables[v].tight_max = Some(max);
        results.push(TightBound { variable: v, min, max, class: classify_flux(min, max, ctx.tolerances.mfa_zero_tolerance) });
    }
    state.pop_state();
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::{MfaVariable, ObjectRef, VariableType};

    fn toy_network() -> ProblemState {
        let mut state = ProblemState::new();
        let r1 = state.add_variable(MfaVariable::new(0, VariableType::Flux, ObjectRef::None, None, -100.0, 100.0, "r1"));
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
    fn classify_matches_sign_and_zero_touching() {
        let tol = 1e-7;
        assert_eq!(classify_flux(1.0, 5.0, tol), FluxClass::Positive);
        assert_eq!(classify_flux(-5.0, -1.0, tol), FluxClass::Negative);
        assert_eq!(classify_flux(0.0, 0.0, tol), FluxClass::Blocked);
        assert_eq!(classify_flux(0.0, 5.0, tol), FluxClass::PositiveOrZero);
        assert_eq!(classify_flux(-5.0, 0.0, tol), FluxClass::NegativeOrZero);
        assert_eq!(classify_flux(-5.0, 5.0, tol), FluxClass::Variable);
    }

    #[test]
    fn tight_bound_on_forced_reaction_is_pinned_positive() {
        let mut state = toy_network();
        let mut facade = SolverFacade::new();
        let ctx = Context::new(crate::domain::Database::new());
        let bounds = run_fva(&mut state, &mut facade, &ctx, &[0], 1.0).unwrap();
        assert_eq!(bounds.len(), 1);
        assert_eq!(bounds[0].class, FluxClass::Positive);
        assert!((bounds[0].min - 10.0).abs() < 1e-6);
        assert!((bounds[0].max - 10.0).abs() < 1e-6);
    }

    #[test]
    fn fva_restores_original_objective_after_pop() {
        let mut state = toy_network();
        let mut facade = SolverFacade::new();
        let ctx = Context::new(crate::domain::Database::new());
        run_fva(&mut state, &mut facade, &ctx, &[0], 1.0).unwrap();
        assert!(state.objective.get(&2).copied().unwrap_or(0.0) == 1.0);
        assert!(state.maximize);
        assert_eq!(state.live_constraints().filter(|c| c.name == OBJECTIVE_PIN_NAME).count(), 0);
    }
}
