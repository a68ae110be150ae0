//! Crate-wide error types.
//!
//! Builder/solver failures that represent a normal optimization outcome
//! (infeasible, unbounded) surface as [`crate::variable::OptStatus`], not as
//! panics or `Err`. `MfaError` covers the smaller set of failures that *do*
//! need to propagate up through `?`: malformed input, parameter
//! contradictions that can't be rectified, I/O failures writing LP files.

use thiserror::Error;

/// Errors that can surface from the domain model, builder or solver facade.
#[derive(Debug, Error)]
pub enum MfaError {
    /// A reaction, compound, gene or compartment reference does not exist.
    #[error("unknown {kind} id: {id}")]
    UnknownEntity {
        /// Kind of entity that was looked up ("compound", "reaction", ...).
        kind: &'static str,
        /// The id that failed to resolve.
        id: String,
    },

    /// A reaction's stoichiometry does not balance and cannot be
    /// auto-balanced by injecting H+/e-.
    #[error("reaction {reaction} does not balance on {atoms:?} and is not H+/e- fixable")]
    BalanceViolation {
        /// Offending reaction id.
        reaction: String,
        /// Atom types whose counts differ between reactants and products.
        atoms: Vec<String>,
    },

    /// A gene-association string failed to parse.
    #[error("malformed gene association string: {0}")]
    GeneLogicSyntax(String),

    /// A variable has upper bound below lower bound after rectification.
    #[error("variable {0} has upper bound below lower bound")]
    InvertedBounds(String),

    /// An `OptimizationParameter` set could not be rectified into a
    /// consistent configuration.
    #[error("parameter contradiction: {0}")]
    ParameterContradiction(String),

    /// Parameter-file syntax error.
    #[error("parameter file error at line {line}: {message}")]
    ParamFileSyntax {
        /// 1-based line number.
        line: usize,
        /// Description of the problem.
        message: String,
    },

    /// A `{other-parameter}` or `${ENV}` reference could not be resolved.
    #[error("unresolved parameter reference: {0}")]
    UnresolvedReference(String),

    /// Wraps a solver backend's own error.
    #[error("solver backend failure: {0}")]
    Solver(String),

    /// No backend compiled in this binary can serve the requested problem
    /// class.
    #[error("no backend available for problem class {0:?}")]
    NoBackendAvailable(crate::variable::ProblemClass),

    /// I/O failure writing an LP file, solver output, or error log.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type MfaResult<T> = Result<T, MfaError>;
