//! Mutable problem state: variables, constraints, objective, snapshots.
//! Supports a push-mutate-solve-pop exploration pattern for analyses that
//! try many variants of the same base problem.

use crate::variable::{ConstraintMeaning, LinEquation, MfaVariable, OptSolutionData};
use std::collections::HashMap;

/// A pushed snapshot of the mutable parts of [`ProblemState`], restorable to
/// permit exploratory modifications.
#[derive(Debug, Clone)]
struct Snapshot {
    variables: Vec<MfaVariable>,
    constraints: Vec<Option<LinEquation>>,
    constraint_index: HashMap<String, usize>,
    objective: HashMap<usize, f64>,
    maximize: bool,
}

/// The full mutable state of an in-progress optimization problem.
///
/// Constraint removal tombstones the slot (`constraints[i] = None`) rather
/// than shifting later indices, so any `usize` row index captured elsewhere
/// stays valid across add/remove cycles. Slots are only reclaimed on
/// [`ProblemState::reset`].
#[derive(Debug, Clone, Default)]
pub struct ProblemState {
    /// Every decision variable, indexed by `MfaVariable::index`.
    pub variables: Vec<MfaVariable>,
    /// Every constraint row; `None` marks a removed (tombstoned) row.
    pub constraints: Vec<Option<LinEquation>>,
    /// Constraint name -> row index, so re-adding a constraint under an
    /// existing name rewrites it in place.
    pub constraint_index: HashMap<String, usize>,
    /// Linear objective: variable index -> coefficient.
    pub objective: HashMap<usize, f64>,
    /// Whether the objective is maximized (`false` = minimized).
    pub maximize: bool,
    /// Most recent solve outcome, if any.
    pub last_solution: Option<OptSolutionData>,
    snapshots: Vec<Snapshot>,
}

impl ProblemState {
    /// An empty problem state, minimizing a zero objective.
    pub fn new() -> Self {
        ProblemState::default()
    }

    /// Register a new variable, returning its index. The variable's
    /// `index` field must already equal `self.variables.len()`.
    pub fn add_variable(&mut self, var: MfaVariable) -> usize {
        debug_assert_eq!(var.index, self.variables.len());
        self.variables.push(var);
        self.variables.len() - 1
    }

    /// Insert or, if a row of the same name already exists, overwrite a
    /// constraint in place. Returns the row index.
    pub fn add_constraint(&mut self, constraint: LinEquation) -> usize {
        if let Some(&idx) = self.constraint_index.get(&constraint.name) {
            self.constraints[idx] = Some(constraint);
            idx
        } else {
            let idx = self.constraints.len();
            self.constraint_index.insert(constraint.name.clone(), idx);
            self.constraints.push(Some(constraint));
            idx
        }
    }

    /// Tombstone the row named `name`, if present.
    pub fn remove_constraint(&mut self, name: &str) {
        if let Some(idx) = self.constraint_index.remove(name) {
            self.constraints[idx] = None;
        }
    }

    /// Tombstone every row of the given `meaning` (used by the orchestrator
    /// to drop e.g. a previous FVA objective pin before re-pinning).
    pub fn remove_constraints_by_meaning(&mut self, meaning: ConstraintMeaning) {
        let names: Vec<String> = self
            .constraints
            .iter()
            .flatten()
            .filter(|c| c.meaning == meaning)
            .map(|c| c.name.clone())
            .collect();
        for name in names {
            self.remove_constraint(&name);
        }
    }

    /// Iterator over live (non-tombstoned) constraints.
    pub fn live_constraints(&self) -> impl Iterator<Item = &LinEquation> {
        self.constraints.iter().flatten()
    }

    /// Directly set a variable's hard bounds, supported after the initial
    /// build as well as during it.
    pub fn set_bound(&mut self, var: usize, lower: f64, upper: f64) {
        let v = &mut self.variables[var];
        v.lower = lower;
        v.upper = upper;
    }

    /// Replace the objective with a fresh linear combination.
    pub fn set_objective(&mut self, terms: HashMap<usize, f64>, maximize: bool) {
        self.objective = terms;
        self.maximize = maximize;
    }

    /// Every variable currently holding `lower > upper`; must be reported
    /// as an infeasibility before solve.
    pub fn inverted_bound_variables(&self) -> Vec<usize> {
        self.variables
            .iter()
            .filter(|v| v.bounds_inverted())
            .map(|v| v.index)
            .collect()
    }

    /// Push a deep copy of the current mutable state.
    pub fn push_state(&mut self) {
        self.snapshots.push(Snapshot {
            variables: self.variables.clone(),
            constraints: self.constraints.clone(),
            constraint_index: self.constraint_index.clone(),
            objective: self.objective.clone(),
            maximize: self.maximize,
        });
    }

    /// Restore the most recently pushed snapshot, discarding any mutation
    /// made since. No-op if the snapshot stack is empty.
    pub fn pop_state(&mut self) {
        if let Some(snap) = self.snapshots.pop() {
            self.variables = snap.variables;
            self.constraints = snap.constraints;
            self.constraint_index = snap.constraint_index;
            self.objective = snap.objective;
            self.maximize = snap.maximize;
        }
    }

    /// Discard the whole problem: every variable and constraint.
    pub fn reset(&mut self) {
        self.variables.clear();
        self.constraints.clear();
        self.constraint_index.clear();
        self.objective.clear();
        self.maximize = false;
        self.last_solution = None;
        self.snapshots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::{EqualityKind, ObjectRef, VariableType};

    fn var(idx: usize) -> MfaVariable {
        MfaVariable::new(idx, VariableType::Flux, ObjectRef::None, None, -10.0, 10.0, format!("v{}", idx))
    }

    #[test]
    fn add_constraint_by_new_name_appends() {
        let mut ps = ProblemState::new();
        let c = LinEquation::new(0, "row0", EqualityKind::Equal, 0.0, ConstraintMeaning::MassBalance);
        assert_eq!(ps.add_constraint(c), 0);
        assert_eq!(ps.live_constraints().count(), 1);
    }

    #[test]
    fn add_constraint_with_existing_name_overwrites_in_place() {
        let mut ps = ProblemState::new();
        let c1 = LinEquation::new(0, "row0", EqualityKind::Equal, 0.0, ConstraintMeaning::MassBalance);
        ps.add_constraint(c1);
        let mut c2 = LinEquation::new(0, "row0", EqualityKind::LessEq, 5.0, ConstraintMeaning::MassBalance);
        c2.add_term(1, 2.0);
        let idx = ps.add_constraint(c2);
        assert_eq!(idx, 0);
        assert_eq!(ps.constraints.len(), 1);
        assert_eq!(ps.constraints[0].as_ref().unwrap().rhs, 5.0);
    }

    #[test]
    fn remove_tombstones_without_shifting_indices() {
        let mut ps = ProblemState::new();
        ps.add_constraint(LinEquation::new(0, "a", EqualityKind::Equal, 0.0, ConstraintMeaning::MassBalance));
        ps.add_constraint(LinEquation::new(1, "b", EqualityKind::Equal, 0.0, ConstraintMeaning::MassBalance));
        ps.remove_constraint("a");
        assert_eq!(ps.constraints.len(), 2);
        assert!(ps.constraints[0].is_none());
        assert_eq!(ps.live_constraints().count(), 1);
        // re-adding "a" reuses a fresh slot through the name index, not the
        // tombstoned slot, since constraint_index no longer has "a".
        let idx = ps.add_constraint(LinEquation::new(2, "a", EqualityKind::Equal, 1.0, ConstraintMeaning::MassBalance));
        assert_eq!(idx, 2);
    }

    #[test]
    fn push_pop_restores_exact_prior_state() {
        let mut ps = ProblemState::new();
        ps.add_variable(var(0));
        ps.push_state();
        ps.set_bound(0, -1.0, 1.0);
        ps.add_constraint(LinEquation::new(0, "extra", EqualityKind::Equal, 0.0, ConstraintMeaning::UserSupplied));
        assert_eq!(ps.variables[0].lower, -1.0);
        ps.pop_state();
        assert_eq!(ps.variables[0].lower, -10.0);
        assert_eq!(ps.live_constraints().count(), 0);
    }

    #[test]
    fn inverted_bounds_detected() {
        let mut ps = ProblemState::new();
        ps.add_variable(var(0));
        ps.set_bound(0, 5.0, -5.0);
        assert_eq!(ps.inverted_bound_variables(), vec![0]);
    }

    #[test]
    fn reset_clears_everything_including_snapshots() {
        let mut ps = ProblemState::new();
        ps.add_variable(var(0));
        ps.push_state();
        ps.reset();
        assert!(ps.variables.is_empty());
        ps.pop_state(); // no-op, stack was cleared
        assert!(ps.variables.is_empty());
    }
}
