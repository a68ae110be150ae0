//! Analysis orchestrator: the operations run against a built [`ProblemState`]
//! once [`crate::builder::ProblemBuilder`] has populated it.
//!
//! Every operation here follows the same shape: push a snapshot, mutate
//! bounds/objective/constraints for the variant under study, solve, record
//! the outcome, pop back to the shared baseline. None of these functions own
//! a `ProblemState`; they borrow one from the caller so a whole session of
//! analyses can share the same built problem without rebuilding it.
//!
//! A solve that comes back infeasible leaves `state` exactly as it was
//! (the snapshot discipline guarantees this) and is reported as a normal
//! outcome, not an error. A solver backend failure (`MfaError`/`OptStatus::Failed`)
//! is propagated to the caller for that one step; the orchestrator itself
//! never panics or aborts the run. `Context::terminate` is checked between
//! solves, never mid-solve, matching single-threaded cooperative scheduling
//! with suspension points only at `run()`.

pub mod deletion;
pub mod enumeration;
pub mod essentiality;
pub mod fba;
pub mod fva;
pub mod gapfill;
pub mod media;
pub mod minimize;

use crate::context::Context;
use crate::error::MfaResult;
use crate::problem_state::ProblemState;
use crate::solver::SolverFacade;
use crate::variable::{OptSolutionData, ProblemClass};

/// Reload the full variable/constraint/objective table of `state` into
/// `facade`, discarding whatever `facade` held before. Cheap relative to a
/// solve; matches the facade's own "always rebuild `ProblemVariables` on
/// `run()`" stance.
pub(crate) fn sync_to_facade(facade: &mut SolverFacade, state: &ProblemState, relax_integrality: bool, use_tight_bounds: bool) {
    facade.reset();
    for var in &state.variables {
        facade.load_variable(var, relax_integrality, use_tight_bounds);
    }
    for constraint in state.live_constraints() {
        facade.add_constraint(constraint.clone());
    }
    facade.load_objective(state.objective.clone(), Default::default(), state.maximize);
}

/// The problem class `state` would present to a backend, accounting for
/// `relax_integrality` (an LP relaxation has no integer columns regardless
/// of what the variables are tagged as).
fn classify(state: &ProblemState, relax_integrality: bool) -> ProblemClass {
    let has_integer = !relax_integrality && state.variables.iter().any(|v| v.integer);
    let has_quadratic = state.live_constraints().any(|c| c.is_quadratic());
    ProblemClass::classify(has_integer, has_quadratic)
}

/// Pick a backend for the problem class currently reflected by `state`, load
/// it into `facade`, and solve. Records the outcome on `state.last_solution`.
pub(crate) fn solve(
    facade: &mut SolverFacade,
    state: &mut ProblemState,
    ctx: &Context,
    relax_integrality: bool,
    use_tight_bounds: bool,
) -> MfaResult<OptSolutionData> {
    let class = classify(state, relax_integrality);
    facade.init(SolverFacade::select_backend(class, ctx.commercial_license_present()));
    sync_to_facade(facade, state, relax_integrality, use_tight_bounds);
    let result = facade.run(&ctx.tolerances)?;
    state.last_solution = Some(result.clone());
    Ok(result)
}

/// `solve`, but first checks `ctx.clocks` for `clock_key` and returns a
/// timed-out result without touching the backend if the cap has already
/// elapsed. The caller is responsible for `ctx.clocks.start(clock_key)`
/// before the first call in a bounded loop.
pub(crate) fn solve_with_clock(
    facade: &mut SolverFacade,
    state: &mut ProblemState,
    ctx: &Context,
    clock_key: usize,
    relax_integrality: bool,
    use_tight_bounds: bool,
) -> MfaResult<OptSolutionData> {
    if ctx.clocks.expired(clock_key) {
        let timed_out = OptSolutionData::timed_out();
        state.last_solution = Some(timed_out.clone());
        return Ok(timed_out);
    }
    solve(facade, state, ctx, relax_integrality, use_tight_bounds)
}

pub use deletion::{run_deletion_experiments, DeletionExperiment, DeletionOutcome};
pub use enumeration::{recursive_milp_enumerate, EnumeratedSolution};
pub use essentiality::{run_essentiality, EssentialityOutcome};
pub use fba::run_fba;
pub use fva::{classify_flux, run_fva, FluxClass, TightBound};
pub use gapfill::{gap_fill, gap_generate};
pub use media::minimize_media;
pub use minimize::{minimize_flux_sum, minimize_reaction_count};

/// Whether `class` requires an integer-capable backend, used by callers that
/// decide up front whether relaxing integrality is worth attempting.
pub fn requires_milp(class: ProblemClass) -> bool {
    matches!(class, ProblemClass::Milp | ProblemClass::Miqp)
}
