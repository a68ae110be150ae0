//! Typed decision variables and linear constraints.
//!
//! Variable and constraint kinds are encoded as tagged enums rather than a
//! trait-object hierarchy, so a `ProblemState` snapshot stays plain data and
//! clones cheaply.

use std::collections::HashMap;
use std::fmt;

/// Stable reference to whichever domain object a variable or constraint is
/// attached to. Arena-indexed rather than a raw pointer/Rc, so snapshots and
/// clones stay cheap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectRef {
    /// Index into the compound arena.
    Compound(usize),
    /// Index into the reaction arena.
    Reaction(usize),
    /// Index into the gene arena.
    Gene(usize),
    /// Index into the gene-interval arena.
    Interval(usize),
    /// A synthetic complex-use node (not a top-level domain object).
    Complex(usize),
    /// A lumped-reaction activation indicator.
    Lump(usize),
    /// No associated domain object (e.g. an error-budget scalar).
    None,
}

/// The union of decision-variable kinds the builder can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableType {
    /// Signed reaction rate, bounds `[min,max]`.
    Flux,
    /// Non-negative forward component of a decomposed flux.
    ForwardFlux,
    /// Non-negative reverse component of a decomposed flux.
    ReverseFlux,
    /// Binary: flux nonzero.
    ReactionUse,
    /// Binary: forward component active.
    ForwardUse,
    /// Binary: reverse component active.
    ReverseUse,
    /// Exchange reaction flux at the system boundary.
    DrainFlux,
    /// Forward component of a decomposed drain flux.
    ForwardDrainFlux,
    /// Reverse component of a decomposed drain flux.
    ReverseDrainFlux,
    /// Binary: drain flux nonzero.
    DrainUse,
    /// Binary: forward drain component active.
    ForwardDrainUse,
    /// Binary: reverse drain component active.
    ReverseDrainUse,
    /// Reaction Gibbs free energy.
    DeltaG,
    /// Symmetric ΔG uncertainty budget (ε = ε+ - ε-).
    ReactionDeltaGError,
    /// Positive half of the error budget.
    ReactionDeltaGErrorPlus,
    /// Negative half of the error budget.
    ReactionDeltaGErrorMinus,
    /// Binary gating which half of the error budget is active.
    ReactionDeltaGErrorUse,
    /// Per-compound per-compartment chemical potential.
    Potential,
    /// Natural-log metabolite concentration.
    LogConc,
    /// Linear-scale metabolite concentration.
    Conc,
    /// Compound formation-energy uncertainty.
    DeltaGfError,
    /// Positive half of formation-energy uncertainty.
    DeltaGfErrorPlus,
    /// Negative half of formation-energy uncertainty.
    DeltaGfErrorMinus,
    /// Binary gating which half of a compound's formation-energy
    /// uncertainty budget is active.
    DeltaGfErrorUse,
    /// Binary gene knock-out/use indicator.
    GeneUse,
    /// Binary complex (gene-logic AND-node) use indicator.
    ComplexUse,
    /// Binary genomic-interval use indicator.
    IntervalUse,
    /// Binary lumped-reaction activation indicator.
    LumpUse,
    /// Integer count of genomic intervals cut.
    GenomeCuts,
}

impl VariableType {
    /// Short, stable tag used to build decorated LP column/row names
    /// (`{TYPE}_{OBJECT_ID}[_{COMPARTMENT}]`).
    pub fn tag(self) -> &'static str {
        use VariableType::*;
        match self {
            Flux => "FLUX",
            ForwardFlux => "FFLUX",
            ReverseFlux => "RFLUX",
            ReactionUse => "RUSE",
            ForwardUse => "FUSE",
            ReverseUse => "RUSE2",
            DrainFlux => "DFLUX",
            ForwardDrainFlux => "FDFLUX",
            ReverseDrainFlux => "RDFLUX",
            DrainUse => "DUSE",
            ForwardDrainUse => "FDUSE",
            ReverseDrainUse => "RDUSE",
            DeltaG => "DELTAG",
            ReactionDeltaGError => "RERR",
            ReactionDeltaGErrorPlus => "RERRP",
            ReactionDeltaGErrorMinus => "RERRN",
            ReactionDeltaGErrorUse => "RERRU",
            Potential => "POT",
            LogConc => "LOGCONC",
            Conc => "CONC",
            DeltaGfError => "FERR",
            DeltaGfErrorPlus => "FERRP",
            DeltaGfErrorMinus => "FERRN",
            DeltaGfErrorUse => "FERRU",
            GeneUse => "GUSE",
            ComplexUse => "CUSE",
            IntervalUse => "IUSE",
            LumpUse => "LUSE",
            GenomeCuts => "GCUTS",
        }
    }

    /// Whether this variable kind is binary (0/1) by construction.
    pub fn is_binary(self) -> bool {
        use VariableType::*;
        matches!(
            self,
            ReactionUse
                | ForwardUse
                | ReverseUse
                | DrainUse
                | ForwardDrainUse
                | ReverseDrainUse
                | ReactionDeltaGErrorUse
                | DeltaGfErrorUse
                | GeneUse
                | ComplexUse
                | IntervalUse
                | LumpUse
        )
    }

    /// Whether this variable kind is integer (including binary).
    pub fn is_integer(self) -> bool {
        self.is_binary() || matches!(self, VariableType::GenomeCuts)
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// A decision variable and its bookkeeping.
///
/// Bounds come in two flavors: `lower`/`upper` are the *hard* bounds fixed by
/// the builder from domain data and parameters; `tight_min`/`tight_max` are
/// populated later by flux variability analysis and start unset.
#[derive(Debug, Clone)]
pub struct MfaVariable {
    /// Stable index into the owning [`crate::problem_state::ProblemState`].
    pub index: usize,
    /// Column index the variable was last loaded under in a solver session,
    /// if any.
    pub solver_column: Option<usize>,
    /// Variable kind.
    pub var_type: VariableType,
    /// Domain object this variable is attached to, if any.
    pub object: ObjectRef,
    /// Compartment this variable is scoped to, if any.
    pub compartment: Option<usize>,
    /// Hard lower bound.
    pub lower: f64,
    /// Hard upper bound.
    pub upper: f64,
    /// Computed tight lower bound (FVA), unset until computed.
    pub tight_min: Option<f64>,
    /// Computed tight upper bound (FVA), unset until computed.
    pub tight_max: Option<f64>,
    /// Whether this column must take integer values.
    pub integer: bool,
    /// Whether this column is constrained to {0,1}.
    pub binary: bool,
    /// Human-readable name (decorated or simple).
    pub name: String,
}

impl MfaVariable {
    /// Construct a variable of `var_type` with hard bounds `[lower, upper]`,
    /// deriving integrality from the type tag.
    pub fn new(
        index: usize,
        var_type: VariableType,
        object: ObjectRef,
        compartment: Option<usize>,
        lower: f64,
        upper: f64,
        name: impl Into<String>,
    ) -> Self {
        MfaVariable {
            index,
            solver_column: None,
            var_type,
            object,
            compartment,
            lower,
            upper,
            tight_min: None,
            tight_max: None,
            integer: var_type.is_integer(),
            binary: var_type.is_binary(),
            name: name.into(),
        }
    }

    /// True if `lower > upper`, an infeasibility the builder must report
    /// before solve.
    pub fn bounds_inverted(&self) -> bool {
        self.lower > self.upper
    }

    /// Tighten the hard bounds in place to `max(lower, lo)..min(upper, hi)`.
    /// Never widens.
    pub fn tighten(&mut self, lo: f64, hi: f64) {
        self.lower = self.lower.max(lo);
        self.upper = self.upper.min(hi);
    }
}

/// Constraint sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EqualityKind {
    /// `<=`
    LessEq,
    /// `>=`
    GreaterEq,
    /// `=`
    Equal,
}

impl EqualityKind {
    /// Render as the conventional LP-format token.
    pub fn as_str(self) -> &'static str {
        match self {
            EqualityKind::LessEq => "<=",
            EqualityKind::GreaterEq => ">=",
            EqualityKind::Equal => "=",
        }
    }
}

/// Tags the semantic role of a constraint, used for reporting and for
/// targeted removal (e.g. "drop the fixed-objective row added for FVA").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintMeaning {
    /// Mass balance for one compound in one compartment.
    MassBalance,
    /// `flux = forward - reverse`.
    DecompositionCoupling,
    /// `reaction_use = forward_use + reverse_use <= 1`.
    UseExclusivity,
    /// Big-M linking a flux to its use indicator.
    UseLinking,
    /// Big-M thermodynamic feasibility constraint.
    ThermoFeasibility,
    /// ΔG definition from potentials and transport term.
    DeltaGDefinition,
    /// Chemical potential definition.
    PotentialDefinition,
    /// Symmetric error-budget constraint.
    ErrorBudget,
    /// Gene-logic OR/AND node constraint.
    GeneLogic,
    /// Experimentally observed growth binding.
    GrowthExperiment,
    /// Objective pinned to a (near-)optimal value (FVA, minimize-flux, etc.).
    ObjectivePin,
    /// Integer cut excluding a previously-seen binary configuration.
    IntegerCut,
    /// Raw constraint supplied directly by the user (`AddConstraints`).
    UserSupplied,
}

/// A linear (or simple quadratic) constraint row.
#[derive(Debug, Clone)]
pub struct LinEquation {
    /// Stable row index / name.
    pub index: usize,
    /// Human-readable name (decorated or simple).
    pub name: String,
    /// Right-hand side.
    pub rhs: f64,
    /// Comparison sense.
    pub kind: EqualityKind,
    /// Linear coefficients: variable index -> coefficient.
    pub coefficients: HashMap<usize, f64>,
    /// Quadratic terms (var_i, var_j) -> coefficient; empty for pure LP rows.
    pub quadratic: HashMap<(usize, usize), f64>,
    /// Semantic role, used for reporting and targeted invalidation.
    pub meaning: ConstraintMeaning,
}

impl LinEquation {
    /// Construct an empty row of the given sense/meaning.
    pub fn new(index: usize, name: impl Into<String>, kind: EqualityKind, rhs: f64, meaning: ConstraintMeaning) -> Self {
        LinEquation {
            index,
            name: name.into(),
            rhs,
            kind,
            coefficients: HashMap::new(),
            quadratic: HashMap::new(),
            meaning,
        }
    }

    /// Add (or accumulate onto) a linear coefficient.
    pub fn add_term(&mut self, var: usize, coeff: f64) -> &mut Self {
        *self.coefficients.entry(var).or_insert(0.0) += coeff;
        self
    }

    /// Add (or accumulate onto) a quadratic coefficient.
    pub fn add_quadratic_term(&mut self, var_i: usize, var_j: usize, coeff: f64) -> &mut Self {
        let key = if var_i <= var_j { (var_i, var_j) } else { (var_j, var_i) };
        *self.quadratic.entry(key).or_insert(0.0) += coeff;
        self
    }

    /// True if this row has any quadratic terms.
    pub fn is_quadratic(&self) -> bool {
        !self.quadratic.is_empty()
    }
}

/// The problem class the solver facade must serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProblemClass {
    /// Linear program, continuous only.
    Lp,
    /// Mixed-integer linear program.
    Milp,
    /// Quadratic program, continuous only.
    Qp,
    /// Mixed-integer quadratic program.
    Miqp,
}

impl ProblemClass {
    /// Classify from whether integer/binary columns and quadratic terms are
    /// present.
    pub fn classify(has_integer: bool, has_quadratic: bool) -> Self {
        match (has_integer, has_quadratic) {
            (false, false) => ProblemClass::Lp,
            (true, false) => ProblemClass::Milp,
            (false, true) => ProblemClass::Qp,
            (true, true) => ProblemClass::Miqp,
        }
    }
}

/// Solve outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptStatus {
    /// Solver found a provably optimal solution.
    Optimal,
    /// Model has no feasible point.
    Infeasible,
    /// Objective is unbounded on the feasible region.
    Unbounded,
    /// Solver backend failed for a reason unrelated to feasibility
    /// (crash, unsupported problem class, parse failure on file-mode output).
    Failed,
    /// Solver hit its wall-clock cap before proving optimality or
    /// infeasibility.
    TimedOut,
}

/// Solution vector plus status and optional per-row annotations.
#[derive(Debug, Clone)]
pub struct OptSolutionData {
    /// Solve outcome.
    pub status: OptStatus,
    /// Objective value; `NAN` when `status != Optimal`.
    pub objective_value: f64,
    /// Primal values indexed by variable index (except in the file-mode
    /// parse path, where the vector is indexed by solver column id).
    pub values: HashMap<usize, f64>,
    /// Optional free-form per-row annotation (e.g. shadow price), keyed by
    /// constraint index.
    pub row_annotations: HashMap<usize, String>,
}

impl OptSolutionData {
    /// An infeasible result with no solution vector.
    pub fn infeasible() -> Self {
        OptSolutionData {
            status: OptStatus::Infeasible,
            objective_value: f64::NAN,
            values: HashMap::new(),
            row_annotations: HashMap::new(),
        }
    }

    /// A failed result (solver crash, unsupported class, etc).
    pub fn failed() -> Self {
        OptSolutionData {
            status: OptStatus::Failed,
            objective_value: f64::NAN,
            values: HashMap::new(),
            row_annotations: HashMap::new(),
        }
    }

    /// A timed-out result.
    pub fn timed_out() -> Self {
        OptSolutionData {
            status: OptStatus::TimedOut,
            objective_value: f64::NAN,
            values: HashMap::new(),
            row_annotations: HashMap::new(),
        }
    }

    /// Fetch a variable's value, defaulting to 0 (consistent with an
    /// omitted/dead column never having been given flux).
    pub fn value_of(&self, var: usize) -> f64 {
        self.values.get(&var).copied().unwrap_or(0.0)
    }
}
