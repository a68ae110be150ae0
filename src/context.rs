//! Per-run context threaded through the builder and orchestrator, replacing
//! process-wide globals/singletons with an explicit value every call site
//! takes by reference.

use crate::domain::Database;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Numeric tolerances, never hard-coded at call sites.
#[derive(Debug, Clone, Copy)]
pub struct Tolerances {
    /// Tolerance the solver itself uses for integer feasibility.
    pub solver_tolerance: f64,
    /// Tolerance below which a flux/variable value is treated as zero by
    /// downstream invariants and reports.
    pub mfa_zero_tolerance: f64,
    /// Big-M constant used for use-variable linking and thermodynamic
    /// feasibility constraints.
    pub big_m: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Tolerances {
            solver_tolerance: 1e-9,
            mfa_zero_tolerance: 1e-7,
            big_m: 10_000.0,
        }
    }
}

/// Per-analysis-step wall-clock caps, keyed by an integer index.
#[derive(Debug, Clone, Default)]
pub struct ClockTable {
    caps: HashMap<usize, Duration>,
    started: HashMap<usize, Instant>,
}

impl ClockTable {
    /// Set the wall-clock cap (seconds) for step `key`.
    pub fn set_cap_seconds(&mut self, key: usize, seconds: f64) {
        self.caps.insert(key, Duration::from_secs_f64(seconds.max(0.0)));
    }

    /// Mark step `key` as started now.
    pub fn start(&mut self, key: usize) {
        self.started.insert(key, Instant::now());
    }

    /// Whether step `key` has exceeded its configured cap. Steps with no
    /// configured cap, or that were never started, never expire.
    pub fn expired(&self, key: usize) -> bool {
        match (self.caps.get(&key), self.started.get(&key)) {
            (Some(cap), Some(started)) => started.elapsed() >= *cap,
            _ => false,
        }
    }
}

/// Cooperative cancellation flag, observed only between solves rather than
/// interrupting one in progress.
#[derive(Debug, Clone, Default)]
pub struct TerminateFlag(Arc<AtomicBool>);

impl TerminateFlag {
    /// A fresh, unset flag.
    pub fn new() -> Self {
        TerminateFlag(Arc::new(AtomicBool::new(false)))
    }

    /// Request termination; observed at the next check point.
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether termination has been requested.
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Output-path conventions: LP files and solver output files live under a
/// single configured output directory.
#[derive(Debug, Clone)]
pub struct OutputPaths {
    /// Root output directory.
    pub root: PathBuf,
}

impl OutputPaths {
    /// Path under `root` for LP files written during print-only mode.
    pub fn lp_file_dir(&self) -> PathBuf {
        self.root.join("LPFiles")
    }

    /// Path to the append-only error log.
    pub fn error_log(&self) -> PathBuf {
        self.root.join("error.log")
    }

    /// Path under `root` for a solution report of the given name.
    pub fn report(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.tsv", name))
    }
}

impl Default for OutputPaths {
    fn default() -> Self {
        OutputPaths { root: PathBuf::from("MFAOutput") }
    }
}

/// The per-run context threaded through the builder and orchestrator,
/// replacing file-scope globals.
#[derive(Debug, Clone)]
pub struct Context {
    /// Domain model this run operates on.
    pub db: Database,
    /// Numeric tolerances.
    pub tolerances: Tolerances,
    /// Output path conventions.
    pub output: OutputPaths,
    /// Per-step clock table.
    pub clocks: ClockTable,
    /// Cooperative cancellation flag.
    pub terminate: TerminateFlag,
    /// Name of the environment variable whose value, if it names an
    /// existing file, unlocks the commercial solver slot.
    pub license_env_var: String,
}

impl Context {
    /// A fresh context over `db` with default tolerances and output paths.
    pub fn new(db: Database) -> Self {
        Context {
            db,
            tolerances: Tolerances::default(),
            output: OutputPaths::default(),
            clocks: ClockTable::default(),
            terminate: TerminateFlag::new(),
            license_env_var: "MFA_COMMERCIAL_LICENSE_FILE".to_string(),
        }
    }

    /// Whether the commercial solver slot is currently unlocked.
    pub fn commercial_license_present(&self) -> bool {
        std::env::var_os(&self.license_env_var)
            .map(std::path::PathBuf::from)
            .map(|p| p.is_file())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_table_not_expired_without_cap() {
        let mut clocks = ClockTable::default();
        clocks.start(0);
        assert!(!clocks.expired(0));
    }

    #[test]
    fn clock_table_expires_past_cap() {
        let mut clocks = ClockTable::default();
        clocks.set_cap_seconds(0, 0.0);
        clocks.start(0);
        std::thread::sleep(Duration::from_millis(5));
        assert!(clocks.expired(0));
    }

    #[test]
    fn terminate_flag_is_shared_across_clones() {
        let flag = TerminateFlag::new();
        let clone = flag.clone();
        flag.request();
        assert!(clone.is_set());
    }

    #[test]
    fn license_absent_by_default() {
        let ctx = Context::new(Database::new());
        std::env::remove_var(&ctx.license_env_var);
        assert!(!ctx.commercial_license_present());
    }
}
