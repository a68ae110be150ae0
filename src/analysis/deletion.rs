//! Deletion experiments: for each labeled experiment (a medium plus a gene
//! knockout set), load the medium's exchange bounds, pin every knocked-out
//! gene's `GENE_USE` variable to zero, solve, and compare the resulting
//! growth against the experiment's observed value.

use crate::analysis::solve;
use crate::context::Context;
use crate::error::MfaResult;
use crate::problem_state::ProblemState;
use crate::solver::SolverFacade;
use crate::variable::OptStatus;

/// One deletion/media experiment: a named medium (exchange variable ->
/// `[lower, upper]` override) plus a set of gene-use variables pinned to
/// zero, and the growth rate observed in the lab for this condition.
#[derive(Debug, Clone)]
pub struct DeletionExperiment {
    /// Experiment label (e.g. a strain/media combination id).
    pub id: String,
    /// Exchange-flux variable -> `(lower, upper)` override defining the
    /// medium for this experiment.
    pub media_bounds: Vec<(usize, f64, f64)>,
    /// `GENE_USE` variables to pin to zero for this experiment's knockouts.
    pub knockout_genes: Vec<usize>,
    /// Experimentally observed growth rate; compared against the model's
    /// prediction using a growth-floor tolerance, not exact equality.
    pub observed_growth: f64,
}

/// One experiment's predicted-vs-observed outcome.
#[derive(Debug, Clone)]
pub struct DeletionOutcome {
    /// Experiment label, copied from [`DeletionExperiment::id`].
    pub id: String,
    /// Model-predicted growth rate (objective value), `NAN` unless the solve
    /// was optimal.
    pub predicted_growth: f64,
    /// The experiment's observed growth rate.
    pub observed_growth: f64,
    /// Solve outcome for this experiment.
    pub status: OptStatus,
    /// Whether predicted and observed growth agree: both at or below
    /// `growth_floor`, or both strictly above it.
    pub matches: bool,
}

/// Run each experiment in `experiments` against `growth_var` (the model's
/// growth/objective variable), restoring `state` to its pre-experiment form
/// between runs via the usual push/mutate/solve/pop discipline. A solve that
/// comes back non-optimal (typically infeasible, e.g. a lethal double
/// knockout) is recorded with `predicted_growth = NAN` and `matches` true
/// only if the experiment also observed no growth.
pub fn run_deletion_experiments(
    state: &mut ProblemState,
    facade: &mut SolverFacade,
    ctx: &Context,
    experiments: &[DeletionExperiment],
    growth_var: usize,
    growth_floor: f64,
) -> MfaResult<Vec<DeletionOutcome>> {
    let mut outcomes = Vec::with_capacity(experiments.len());
    for exp in experiments {
        if ctx.terminate.is_set() {
            break;
        }
        state.push_state();
        for &(var, lower, upper) in &exp.media_bounds {
            state.set_bound(var, lower, upper);
        }
        for &gene_use in &exp.knockout_genes {
            state.set_bound(gene_use, 0.0, 0.0);
        }

        let result = solve(facade, state, ctx, false, false)?;
        let predicted = if result.status == OptStatus::Optimal { result.value_of(growth_var) } else { f64::NAN };
        let observed_grows = exp.observed_growth > growth_floor;
        let predicted_grows = predicted > growth_floor;
        let matches = observed_grows == predicted_grows;
        outcomes.push(DeletionOutcome {
            id: exp.id.clone(),
            predicted_growth: predicted,
            observed_growth: exp.observed_growth,
            status: result.status,
            matches,
        });

        state.pop_state();
    }
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::{ConstraintMeaning, EqualityKind, LinEquation, MfaVariable, ObjectRef, VariableType};
    use std::collections::HashMap;

    fn toy_network() -> (ProblemState, usize, usize, usize) {
        let mut state = ProblemState::new();
        let growth = state.add_variable(MfaVariable::new(0, VariableType::Flux, ObjectRef::None, None, 0.0, 100.0, "growth"));
        let ex_source = state.add_variable(MfaVariable::new(1, VariableType::DrainFlux, ObjectRef::None, None, 0.0, 0.0, "ex_source"));
        let gene_use = state.add_variable(MfaVariable::new(2, VariableType::GeneUse, ObjectRef::None, None, 0.0, 1.0, "g1_use"));
        let linked_flux = state.add_variable(MfaVariable::new(3, VariableType::Flux, ObjectRef::None, None, 0.0, 100.0, "r1"));

        let mut bal = LinEquation::new(0, "bal", EqualityKind::Equal, 0.0, ConstraintMeaning::MassBalance);
        bal.add_term(growth, -1.0).add_term(linked_flux, 1.0);
        state.add_constraint(bal);

        // r1's flux can't exceed the source uptake or 100*gene_use (gene
        // knockout blocks it entirely).
        let mut cap_source = LinEquation::new(1, "cap_source", EqualityKind::LessEq, 0.0, ConstraintMeaning::UseLinking);
        cap_source.add_term(linked_flux, 1.0).add_term(ex_source, -1.0);
        state.add_constraint(cap_source);
        let mut cap_gene = LinEquation::new(2, "cap_gene", EqualityKind::LessEq, 0.0, ConstraintMeaning::GeneLogic);
        cap_gene.add_term(linked_flux, 1.0).add_term(gene_use, -100.0);
        state.add_constraint(cap_gene);

        let mut objective = HashMap::new();
        objective.insert(growth, 1.0);
        state.set_objective(objective, true);
        (state, growth, ex_source, gene_use)
    }

    #[test]
    fn medium_override_and_gene_knockout_are_both_applied_and_restored() {
        let (mut state, growth, ex_source, gene_use) = toy_network();
        let mut facade = SolverFacade::new();
        let ctx = Context::new(crate::domain::Database::new());
        state.set_bound(gene_use, 1.0, 1.0); // WT: gene present

        let experiments = vec![
            DeletionExperiment {
                id: "wt_on_medium".to_string(),
                media_bounds: vec![(ex_source, 0.0, 10.0)],
                knockout_genes: vec![],
                observed_growth: 10.0,
            },
            DeletionExperiment {
                id: "ko_on_medium".to_string(),
                media_bounds: vec![(ex_source, 0.0, 10.0)],
                knockout_genes: vec![gene_use],
                observed_growth: 0.0,
            },
        ];
        let outcomes = run_deletion_experiments(&mut state, &mut facade, &ctx, &experiments, growth, 1e-7).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].matches);
        assert!(outcomes[1].matches);
        assert!((outcomes[0].predicted_growth - 10.0).abs() < 1e-6);
        assert!(outcomes[1].predicted_growth.abs() < 1e-6);

        // state restored to its pre-experiment (WT, zero-bound medium) form
        assert_eq!(state.variables[ex_source].upper, 0.0);
        assert_eq!(state.variables[gene_use].lower, 1.0);
    }

    #[test]
    fn mismatch_is_flagged_when_prediction_disagrees_with_observation() {
        let (mut state, growth, ex_source, gene_use) = toy_network();
        let mut facade = SolverFacade::new();
        let ctx = Context::new(crate::domain::Database::new());
        state.set_bound(gene_use, 1.0, 1.0);

        let experiments = vec![DeletionExperiment {
            id: "unexpectedly_no_growth".to_string(),
            media_bounds: vec![(ex_source, 0.0, 10.0)],
            knockout_genes: vec![],
            observed_growth: 0.0,
        }];
        let outcomes = run_deletion_experiments(&mut state, &mut facade, &ctx, &experiments, growth, 1e-7).unwrap();
        assert!(!outcomes[0].matches);
    }
}
