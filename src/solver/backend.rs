//! Backend selection: decide which compiled-in LP/MILP/QP backend serves a
//! given problem class, checking the class first and a license probe
//! second rather than the other way around.

use crate::variable::ProblemClass;

/// The backend family a solve is dispatched to.
///
/// `Simplex` and `Mip` are always compiled in (via `good_lp`'s `microlp` and
/// `coin_cbc` features respectively) so every build can serve LP and MILP at
/// minimum. `Qp` (via `clarabel`) handles the continuous relaxation of
/// quadratic problems. `Scip`, the commercial/optional slot, is only present
/// when this crate is built with the `scip` feature and a license file is
/// found; it is never required for correctness, since every constraint kind
/// this crate builds is linear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Pure-LP simplex backend (`good_lp` `microlp`).
    Simplex,
    /// Mixed-integer backend (`good_lp` `coin_cbc`).
    Mip,
    /// Quadratic/continuous backend (`good_lp` `clarabel`).
    Qp,
    /// Commercial/full-MIQP slot (`good_lp` `russcip`, feature-gated).
    Scip,
}

impl Backend {
    /// Whether this backend is compiled into the current binary.
    pub fn available(self) -> bool {
        match self {
            Backend::Simplex | Backend::Mip | Backend::Qp => true,
            Backend::Scip => cfg!(feature = "scip"),
        }
    }
}

/// Select a backend for `class`, given whether the commercial license slot
/// is currently unlocked (`Context::commercial_license_present`).
pub fn select(class: ProblemClass, commercial_license_present: bool) -> Backend {
    let preferred = match class {
        ProblemClass::Lp => Backend::Simplex,
        ProblemClass::Milp => Backend::Mip,
        ProblemClass::Qp => Backend::Qp,
        ProblemClass::Miqp => Backend::Scip,
    };
    if preferred == Backend::Scip && !(commercial_license_present && Backend::Scip.available()) {
        // No commercial slot: MIQP degrades to the best available MIP
        // treatment rather than failing outright.
        return Backend::Mip;
    }
    preferred
}
