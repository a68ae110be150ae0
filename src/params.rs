//! Run-level optimization parameters and their rectification rules.
//!
//! A single flat record covers every switch the builder and orchestrator
//! consult. Parameters are not independent: some imply others (turning on
//! gene constraints implies per-reaction use variables, which implies
//! decomposed reversible fluxes). [`OptimizationParameters::rectify`] runs
//! those implications to a fixed point so the builder never has to check an
//! implied flag by hand.

use crate::error::{MfaError, MfaResult};
use std::collections::HashMap;

/// Tri-state override for a reaction: inherit the model default, force on,
/// or force off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ternary {
    /// Use whatever the builder would otherwise decide.
    Default,
    /// Force true.
    On,
    /// Force false.
    Off,
}

/// A user-supplied bound override on an existing variable, by name.
#[derive(Debug, Clone)]
pub struct UserBound {
    /// Variable name (decorated or simple, as emitted by the LP writer).
    pub variable: String,
    /// New lower bound.
    pub lower: f64,
    /// New upper bound.
    pub upper: f64,
}

/// Exchange-species override: set explicit drain-flux bounds for a compound
/// in a particular compartment, independent of what reactions already exist.
#[derive(Debug, Clone)]
pub struct ExchangeOverride {
    /// Compound id.
    pub compound: String,
    /// Compartment id this override applies to.
    pub compartment: String,
    /// Minimum (most negative, i.e. maximum uptake) drain flux.
    pub min_flux: f64,
    /// Maximum (most positive, i.e. maximum secretion) drain flux.
    pub max_flux: f64,
}

/// Band describing how many alternate solutions to keep while enumerating,
/// relative to a reference objective value.
#[derive(Debug, Clone, Copy)]
pub struct SolutionSizeInterval {
    /// Smallest acceptable solution-size delta from the reference.
    pub min_delta: f64,
    /// Largest acceptable solution-size delta from the reference.
    pub max_delta: f64,
}

/// The full set of switches and knobs a run of the builder/orchestrator
/// consults. Constructed with sensible defaults via [`Default`], then
/// overridden field-by-field (from a parameter file or programmatically)
/// before a single [`OptimizationParameters::rectify`] call.
#[derive(Debug, Clone)]
pub struct OptimizationParameters {
    /// Emit one mass-balance row per (compound, compartment) pair.
    pub mass_balance_constraints: bool,
    /// Decompose every reversible reaction's flux into
    /// `flux = forward - reverse` with both halves non-negative.
    pub decompose_reversible: bool,
    /// Emit a `REACTION_USE` binary per reaction and Big-M link it to flux.
    pub reactions_use: bool,
    /// `reactions_use`, but forced on for every reaction regardless of
    /// individual reaction flags.
    pub all_reactions_use: bool,
    /// Emit a `DRAIN_USE` binary per drain/exchange reaction.
    pub drain_use_var: bool,
    /// `drain_use_var`, forced on for every drain reaction.
    pub all_drain_use: bool,
    /// Emit full thermodynamic feasibility constraints (ΔG from potentials).
    pub thermo_constraints: bool,
    /// Emit a simplified thermodynamic sign constraint only (no potentials).
    pub simple_thermo_constraints: bool,
    /// Emit a symmetric ΔG error budget per reaction.
    pub delta_g_error: bool,
    /// Gate each reaction's error budget half behind a use variable.
    pub reaction_error_use_variables: bool,
    /// Emit gene-logic constraints (COMPLEX_USE/GENE_USE) linking reaction
    /// use to gene-logic viability.
    pub gene_constraints: bool,
    /// Optimize over genomic intervals (interval knockouts) rather than
    /// individual genes.
    pub interval_optimization: bool,
    /// Optimize over individual gene knockouts.
    pub gene_optimization: bool,
    /// Optimize over reaction deletions.
    pub deletion_optimization: bool,
    /// Relax all integer/binary columns to continuous for the next solve.
    pub relax_integer_variables: bool,
    /// Decompose drain fluxes the same way reversible internal fluxes are
    /// decomposed.
    pub decompose_drain: bool,
    /// Treat every reaction as reversible regardless of its stored
    /// directionality.
    pub all_reversible: bool,
    /// Include reactions whose products have no further consumer
    /// ("dead ends") rather than pruning them.
    pub include_dead_ends: bool,
    /// Default maximum internal flux magnitude.
    pub max_flux: f64,
    /// Default minimum internal flux magnitude (most negative value for a
    /// reversible reaction).
    pub min_flux: f64,
    /// Default maximum drain flux magnitude.
    pub max_drain_flux: f64,
    /// Default minimum drain flux magnitude.
    pub min_drain_flux: f64,
    /// Maximum magnitude of a ΔG error-budget half.
    pub max_error: f64,
    /// Multiplier applied to `max_error` when deriving a reaction's actual
    /// error cap from its computed uncertainty.
    pub error_mult: f64,
    /// Maximum chemical potential.
    pub max_potential: f64,
    /// Minimum chemical potential.
    pub min_potential: f64,
    /// Temperature, Kelvin, used in the RT term of ΔG constraints.
    pub temperature: f64,
    /// Per-compound exchange overrides.
    pub exchange_overrides: Vec<ExchangeOverride>,
    /// Reactions forced knocked out (flux fixed to zero).
    pub ko_reactions: Vec<String>,
    /// Genes forced knocked out.
    pub ko_genes: Vec<String>,
    /// Named sets of reactions/genes to knock out together, for batch
    /// deletion experiments: set name -> member ids.
    pub ko_sets: HashMap<String, Vec<String>>,
    /// Per-reaction override: block a reaction's flux in both directions,
    /// forward only, or reverse only.
    pub blocked_reactions: HashMap<String, Ternary>,
    /// Per-reaction override: force a reaction's use variable on, off, or
    /// leave it to the builder's default.
    pub always_active_reactions: HashMap<String, Ternary>,
    /// Extra constraints to append verbatim after the builder's own rows.
    pub add_constraints: Vec<crate::variable::LinEquation>,
    /// Constraints to replace in place (matched by name against an
    /// existing row).
    pub mod_constraints: Vec<crate::variable::LinEquation>,
    /// Direct bound overrides, applied after the builder's defaults.
    pub user_bounds: Vec<UserBound>,
    /// Fraction of the unconstrained optimum (ω) a downstream analysis must
    /// stay within once an objective has been pinned (e.g. FVA).
    pub optimal_objective_fraction: f64,
    /// Which MILP-requiring features recursive enumeration should keep
    /// active between rounds (kept informational; enumeration consults it
    /// directly).
    pub recursive_milp_types: Vec<String>,
    /// Maximum number of solutions a recursive-MILP enumeration may return.
    pub recursive_milp_solution_limit: usize,
    /// Acceptable solution-size band for enumeration, relative to the
    /// reference objective.
    pub solution_size_interval: SolutionSizeInterval,
}

impl Default for OptimizationParameters {
    fn default() -> Self {
        OptimizationParameters {
            mass_balance_constraints: true,
            decompose_reversible: false,
            reactions_use: false,
            all_reactions_use: false,
            drain_use_var: false,
            all_drain_use: false,
            thermo_constraints: false,
            simple_thermo_constraints: false,
            delta_g_error: false,
            reaction_error_use_variables: false,
            gene_constraints: false,
            interval_optimization: false,
            gene_optimization: false,
            deletion_optimization: false,
            relax_integer_variables: false,
            decompose_drain: false,
            all_reversible: false,
            include_dead_ends: true,
            max_flux: 1000.0,
            min_flux: -1000.0,
            max_drain_flux: 1000.0,
            min_drain_flux: -1000.0,
            max_error: 20.0,
            error_mult: 1.0,
            max_potential: 1000.0,
            min_potential: -1000.0,
            temperature: 298.15,
            exchange_overrides: Vec::new(),
            ko_reactions: Vec::new(),
            ko_genes: Vec::new(),
            ko_sets: HashMap::new(),
            blocked_reactions: HashMap::new(),
            always_active_reactions: HashMap::new(),
            add_constraints: Vec::new(),
            mod_constraints: Vec::new(),
            user_bounds: Vec::new(),
            optimal_objective_fraction: 1.0,
            recursive_milp_types: Vec::new(),
            recursive_milp_solution_limit: 100,
            solution_size_interval: SolutionSizeInterval { min_delta: 0.0, max_delta: f64::INFINITY },
        }
    }
}

impl OptimizationParameters {
    /// Apply every implication rule to a fixed point:
    /// `gene_constraints => all_reactions_use => reactions_use =>
    /// decompose_reversible`, and similarly `all_drain_use => drain_use_var`,
    /// `interval_optimization | gene_optimization => gene_constraints`,
    /// `reaction_error_use_variables => delta_g_error => thermo_constraints`.
    /// Idempotent: calling twice leaves the set unchanged.
    pub fn rectify(&mut self) -> MfaResult<()> {
        loop {
            let before = self.fingerprint();
            if self.interval_optimization || self.gene_optimization {
                self.gene_constraints = true;
            }
            if self.gene_constraints {
                self.all_reactions_use = true;
            }
            if self.all_reactions_use {
                self.reactions_use = true;
            }
            if self.reactions_use {
                self.decompose_reversible = true;
            }
            if self.all_drain_use {
                self.drain_use_var = true;
            }
            if self.drain_use_var && self.decompose_drain {
                // drain use requires a decomposed drain flux to gate.
            } else if self.drain_use_var {
                self.decompose_drain = true;
            }
            if self.reaction_error_use_variables {
                self.delta_g_error = true;
            }
            if self.delta_g_error {
                self.thermo_constraints = true;
            }
            if self.simple_thermo_constraints && self.thermo_constraints {
                // Full thermo constraints subsume the simplified sign
                // check; keep only one active to avoid emitting redundant
                // rows for the same reaction.
                self.simple_thermo_constraints = false;
            }
            if before == self.fingerprint() {
                break;
            }
        }
        if self.min_flux > self.max_flux {
            return Err(MfaError::ParameterContradiction(format!(
                "min_flux ({}) > max_flux ({})",
                self.min_flux, self.max_flux
            )));
        }
        if self.min_drain_flux > self.max_drain_flux {
            return Err(MfaError::ParameterContradiction(format!(
                "min_drain_flux ({}) > max_drain_flux ({})",
                self.min_drain_flux, self.max_drain_flux
            )));
        }
        if self.optimal_objective_fraction < 0.0 || self.optimal_objective_fraction > 1.0 {
            return Err(MfaError::ParameterContradiction(format!(
                "optimal_objective_fraction ({}) out of [0,1]",
                self.optimal_objective_fraction
            )));
        }
        Ok(())
    }

    fn fingerprint(&self) -> (bool, bool, bool, bool, bool, bool, bool, bool, bool) {
        (
            self.decompose_reversible,
            self.reactions_use,
            self.all_reactions_use,
            self.drain_use_var,
            self.all_drain_use,
            self.decompose_drain,
            self.thermo_constraints,
            self.simple_thermo_constraints,
            self.delta_g_error,
        )
    }
}
