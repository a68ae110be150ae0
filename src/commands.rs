//! Command dispatch (§6 "Invocation"): a single entry point driven by either
//! a parameter file or a list of named commands, covering `LoadCentralSystem`,
//! `RunFBA`, `FindTightBounds`, `RunMediaExperiments`, `RunDeletionExperiments`,
//! `GapFill`, `GapGenerate`, `MILPRecursive`.
//!
//! This is the library-level entry point only; turning a [`CommandOutcome`]
//! into a process exit code is left to a driver binary, out of scope here.
//! A command whose *analysis step* comes back infeasible is not an error —
//! see [`crate::analysis`]'s failure semantics — but a command that cannot
//! even be attempted (e.g. `RunFBA` before `LoadCentralSystem`) is reported
//! through `MfaError` and aborts the remaining command list, matching the
//! "nonzero on startup failure" contract.

use crate::analysis::{self, DeletionExperiment, DeletionOutcome, EnumeratedSolution, TightBound};
use crate::builder::ProblemBuilder;
use crate::context::Context;
use crate::domain::database::Database;
use crate::error::{MfaError, MfaResult};
use crate::params::{OptimizationParameters, SolutionSizeInterval};
use crate::problem_state::ProblemState;
use crate::solver::SolverFacade;
use crate::variable::OptSolutionData;

/// One driver-level command. Each variant names the parameters that
/// operation needs beyond what a prior `LoadCentralSystem` has already put
/// on the session.
#[derive(Debug, Clone)]
pub enum Command {
    /// Build the problem from `db` (already populated by the caller) and
    /// `params`, replacing whatever problem the session previously held.
    LoadCentralSystem { params: Box<OptimizationParameters> },
    /// A single solve against the objective currently loaded.
    RunFba,
    /// Flux variability analysis over `variables`, objective pinned to
    /// `omega` times its unconstrained optimum.
    FindTightBounds { variables: Vec<usize>, omega: f64 },
    /// Media minimization: smallest active subset of `exchange_use_vars`
    /// that still clears `min_growth` on `growth_var`.
    RunMediaExperiments { exchange_use_vars: Vec<usize>, growth_var: usize, min_growth: f64, excluded: Vec<usize> },
    /// Predicted-vs-observed growth across a labeled experiment set.
    RunDeletionExperiments { experiments: Vec<DeletionExperiment>, growth_var: usize, growth_floor: f64 },
    /// Minimal addition set from `candidates` that restores `min_growth`.
    GapFill { candidates: Vec<(String, usize)>, growth_var: usize, min_growth: f64 },
    /// Minimal disabling set from `targets` that forces growth below `max_growth`.
    GapGenerate { targets: Vec<(String, usize)>, growth_var: usize, max_growth: f64 },
    /// Recursive MILP enumeration over `binary_vars`, capped at `limit`
    /// solutions within `interval` of the first one found.
    MilpRecursive { binary_vars: Vec<usize>, limit: usize, interval: SolutionSizeInterval },
}

/// The result of running one [`Command`].
#[derive(Debug, Clone)]
pub enum CommandOutcome {
    /// `LoadCentralSystem` completed; the session now holds a built problem.
    Loaded,
    /// `RunFba`'s solve result.
    Fba(OptSolutionData),
    /// `FindTightBounds`'s per-variable ranges and classifications.
    TightBounds(Vec<TightBound>),
    /// `RunMediaExperiments`'s minimal active exchange set.
    Media(Vec<usize>),
    /// `RunDeletionExperiments`'s per-experiment outcomes.
    Deletion(Vec<DeletionOutcome>),
    /// `GapFill`'s minimal addition set, by candidate id.
    GapFill(Vec<String>),
    /// `GapGenerate`'s minimal disabling set, by target id.
    GapGenerate(Vec<String>),
    /// `MilpRecursive`'s enumerated solutions.
    Enumeration(Vec<EnumeratedSolution>),
}

/// Everything one command run needs: the domain model and ambient
/// tolerances/clocks/terminate flag (both held by `ctx`), the built problem,
/// and a solver handle. Owns its `ProblemState` outright rather than
/// borrowing one, since `LoadCentralSystem` must be able to replace it
/// wholesale between commands.
pub struct Session {
    /// Domain model plus tolerances, clocks, terminate flag, output paths.
    pub ctx: Context,
    /// The built problem, or `None` before the first `LoadCentralSystem`.
    pub state: Option<ProblemState>,
    /// Shared solver handle, reused across commands.
    pub facade: SolverFacade,
}

impl Session {
    /// A fresh session over `db`, with no problem built yet.
    pub fn new(db: Database) -> Self {
        Session { ctx: Context::new(db), state: None, facade: SolverFacade::new() }
    }

    fn state_mut(&mut self) -> MfaResult<&mut ProblemState> {
        self.state.as_mut().ok_or_else(|| MfaError::ParameterContradiction("no problem built; run LoadCentralSystem first".to_string()))
    }

    /// Run `command` against this session, returning its outcome. A
    /// dispatch-level failure (missing prerequisite, builder contradiction)
    /// is `Err`; an analysis step that solved but came back infeasible is
    /// still `Ok`, carrying that status inside the outcome.
    pub fn run(&mut self, command: &Command) -> MfaResult<CommandOutcome> {
        match command {
            Command::LoadCentralSystem { params } => {
                let builder = ProblemBuilder::build(&mut self.ctx.db, params, &self.ctx.tolerances)?;
                self.state = Some(builder.state);
                Ok(CommandOutcome::Loaded)
            }
            Command::RunFba => {
                let state = self.state_mut()?;
                let result = analysis::run_fba(state, &mut self.facade, &self.ctx)?;
                Ok(CommandOutcome::Fba(result))
            }
            Command::FindTightBounds { variables, omega } => {
                let state = self.state_mut()?;
                let bounds = analysis::run_fva(state, &mut self.facade, &self.ctx, variables, *omega)?;
                Ok(CommandOutcome::TightBounds(bounds))
            }
            Command::RunMediaExperiments { exchange_use_vars, growth_var, min_growth, excluded } => {
                let state = self.state_mut()?;
                let active = analysis::minimize_media(state, &mut self.facade, &self.ctx, exchange_use_vars, *growth_var, *min_growth, excluded)?;
                Ok(CommandOutcome::Media(active))
            }
            Command::RunDeletionExperiments { experiments, growth_var, growth_floor } => {
                let state = self.state_mut()?;
                let outcomes = analysis::run_deletion_experiments(state, &mut self.facade, &self.ctx, experiments, *growth_var, *growth_floor)?;
                Ok(CommandOutcome::Deletion(outcomes))
            }
            Command::GapFill { candidates, growth_var, min_growth } => {
                let state = self.state_mut()?;
                let added = analysis::gap_fill(state, &mut self.facade, &self.ctx, candidates, *growth_var, *min_growth)?;
                Ok(CommandOutcome::GapFill(added))
            }
            Command::GapGenerate { targets, growth_var, max_growth } => {
                let state = self.state_mut()?;
                let disabled = analysis::gap_generate(state, &mut self.facade, &self.ctx, targets, *growth_var, *max_growth)?;
                Ok(CommandOutcome::GapGenerate(disabled))
            }
            Command::MilpRecursive { binary_vars, limit, interval } => {
                let state = self.state_mut()?;
                let solutions = analysis::recursive_milp_enumerate(state, &mut self.facade, &self.ctx, binary_vars, *limit, *interval)?;
                Ok(CommandOutcome::Enumeration(solutions))
            }
        }
    }

    /// Run every command in `commands` in order, stopping at the first
    /// dispatch-level error (per the "nonzero on startup failure" contract)
    /// rather than continuing past a command the session couldn't even
    /// attempt.
    pub fn run_all(&mut self, commands: &[Command]) -> MfaResult<Vec<CommandOutcome>> {
        let mut outcomes = Vec::with_capacity(commands.len());
        for command in commands {
            outcomes.push(self.run(command)?);
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::compound::Compound;
    use crate::domain::reaction::{Directionality, Reaction};
    use crate::params::OptimizationParameters;
    use crate::variable::OptStatus;

    fn toy_db() -> Database {
        let mut db = Database::new();
        db.ensure_default_compartment();
        db.add_compound(Compound::new("A", 0, 0.0, 1.0));
        db.add_compound(Compound::new("B", 0, 0.0, 1.0));
        let mut r1 = Reaction::new("R1", 0, Directionality::Forward);
        r1.add_reactant(0, -1.0, 0, false);
        r1.add_reactant(1, 1.0, 0, false);
        db.add_reaction(r1);
        let mut ex_a = Reaction::new("EX_A", 0, Directionality::Reversible);
        ex_a.add_reactant(0, -1.0, 0, false);
        db.add_reaction(ex_a);
        let mut ex_b = Reaction::new("EX_B", 0, Directionality::Forward);
        ex_b.add_reactant(1, -1.0, 0, false);
        db.add_reaction(ex_b);
        db
    }

    #[test]
    fn running_fba_before_load_is_a_dispatch_error() {
        let mut session = Session::new(toy_db());
        let err = session.run(&Command::RunFba);
        assert!(err.is_err());
    }

    #[test]
    fn load_then_fba_solves_against_the_built_objective() {
        let mut session = Session::new(toy_db());
        let mut params = OptimizationParameters::default();
        params.mass_balance_constraints = true;
        let outcomes = session
            .run_all(&[Command::LoadCentralSystem { params: Box::new(params) }, Command::RunFba])
            .unwrap();
        assert_eq!(outcomes.len(), 2);
        match &outcomes[1] {
            CommandOutcome::Fba(result) => assert!(matches!(result.status, OptStatus::Optimal | OptStatus::Infeasible)),
            _ => panic!("expected an Fba outcome"),
        }
    }
}
