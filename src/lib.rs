//! `mfa-core`: a metabolic flux analysis engine.
//!
//! The domain model ([`domain`]) is an arena-indexed database of compounds,
//! reactions, genes, and compartments, cross-referenced by plain `usize`
//! indices rather than pointers. [`builder::ProblemBuilder`] turns a
//! database plus [`params::OptimizationParameters`] into a
//! [`problem_state::ProblemState`] — variables, constraints, and an
//! objective. [`analysis`] runs the library's high-level operations (FBA,
//! FVA, essentiality, media minimization, gap filling/generation, deletion
//! experiments, recursive MILP enumeration) against that state, always via
//! push-mutate-solve-pop so a whole analysis session can share one built
//! problem. [`solver::SolverFacade`] is the thin layer over `good_lp`
//! backends that actually runs a solve, in-process or via an LP-file round
//! trip. [`commands`] and [`params_file`] are the external-interface layer:
//! a parameter-file text format and a command-dispatch session wrapping the
//! rest of the crate.

pub mod analysis;
pub mod builder;
pub mod commands;
pub mod context;
pub mod domain;
pub mod error;
pub mod params;
pub mod params_file;
pub mod problem_state;
pub mod report;
pub mod solver;
pub mod variable;

pub use builder::ProblemBuilder;
pub use commands::{Command, CommandOutcome, Session};
pub use context::Context;
pub use domain::Database;
pub use error::{MfaError, MfaResult};
pub use params::OptimizationParameters;
pub use params_file::{apply_to_parameters, RawParameterFile};
pub use problem_state::ProblemState;
pub use solver::SolverFacade;
