//! Solution output (§6 "Solution output"): `|`-delimited text tables, one row
//! per reaction, one column per requested quantity, plus a separate per-run
//! summary line recording objective value and solve status. This is the only
//! place in the crate that turns an [`OptSolutionData`] into text; everything
//! upstream works in variable indices.

use crate::domain::database::Database;
use crate::variable::{OptSolutionData, OptStatus};
use std::fmt::Write as _;

/// One requested column in a flux table, naming the reaction-level quantity
/// to pull out of a solution for every reaction that has it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportColumn {
    /// `ReactionVars::flux`, or `forward_flux - reverse_flux` when the
    /// reaction was decomposed and has no combined flux variable.
    Flux,
    /// `ReactionVars::reaction_use`.
    Use,
    /// `ReactionVars::delta_g`.
    DeltaG,
}

impl ReportColumn {
    fn header(self) -> &'static str {
        match self {
            ReportColumn::Flux => "flux",
            ReportColumn::Use => "use",
            ReportColumn::DeltaG => "delta_g",
        }
    }
}

const CELL_BLANK: &str = "-";

fn format_cell(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.6}", v),
        None => CELL_BLANK.to_string(),
    }
}

/// Render one `|`-delimited table: a header row (`reaction` plus every
/// requested column) followed by one row per reaction in `db.reactions`
/// order. A reaction missing the variable a column asks for renders `-` in
/// that cell rather than omitting the row.
pub fn flux_table(db: &Database, solution: &OptSolutionData, columns: &[ReportColumn]) -> String {
    let mut out = String::new();
    let _ = write!(out, "reaction");
    for col in columns {
        let _ = write!(out, "|{}", col.header());
    }
    out.push('\n');

    for reaction in &db.reactions {
        let _ = write!(out, "{}", reaction.id);
        for col in columns {
            let cell = match col {
                ReportColumn::Flux => reaction
                    .vars
                    .flux
                    .map(|v| solution.value_of(v))
                    .or_else(|| match (reaction.vars.forward_flux, reaction.vars.reverse_flux) {
                        (Some(f), Some(r)) => Some(solution.value_of(f) - solution.value_of(r)),
                        _ => None,
                    }),
                ReportColumn::Use => reaction.vars.reaction_use.map(|v| solution.value_of(v)),
                ReportColumn::DeltaG => reaction.vars.delta_g.map(|v| solution.value_of(v)),
            };
            let _ = write!(out, "|{}", format_cell(cell));
        }
        out.push('\n');
    }
    out
}

/// Render an FVA-style table directly from `bounds` (variable index, tight
/// min, tight max, classification), looking up each variable's owning
/// reaction by scanning `db.reactions` for a matching `vars.flux`. Variables
/// with no owning reaction (e.g. a raw exchange/drain flux) render under
/// their raw variable index instead of a reaction id.
pub fn tight_bound_table(db: &Database, bounds: &[crate::analysis::TightBound]) -> String {
    let mut out = String::new();
    out.push_str("reaction|min|max|class\n");
    for bound in bounds {
        let label = db
            .reactions
            .iter()
            .find(|r| r.vars.flux == Some(bound.variable) || r.vars.forward_flux == Some(bound.variable))
            .map(|r| r.id.clone())
            .unwrap_or_else(|| format!("v{}", bound.variable));
        let _ = writeln!(out, "{}|{:.6}|{:.6}|{:?}", label, bound.min, bound.max, bound.class);
    }
    out
}

/// One line summarizing a solve: the run's label, its status, and its
/// objective value (blank for a non-optimal solve).
pub fn summary_line(label: &str, solution: &OptSolutionData) -> String {
    match solution.status {
        OptStatus::Optimal => format!("{}|{:?}|{:.6}", label, solution.status, solution.objective_value),
        _ => format!("{}|{:?}|{}", label, solution.status, CELL_BLANK),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::compound::Compound;
    use crate::domain::reaction::{Directionality, Reaction};
    use std::collections::HashMap;

    fn toy_db_with_flux_var() -> (Database, OptSolutionData) {
        let mut db = Database::new();
        db.ensure_default_compartment();
        db.add_compound(Compound::new("A", 0, 0.0, 1.0));
        db.add_compound(Compound::new("B", 0, 0.0, 1.0));
        let mut r = Reaction::new("R1", 0, Directionality::Forward);
        r.add_reactant(0, -1.0, 0, false);
        r.add_reactant(1, 1.0, 0, false);
        r.vars.flux = Some(0);
        db.add_reaction(r);

        let mut values = HashMap::new();
        values.insert(0, 4.5);
        let solution = OptSolutionData { status: OptStatus::Optimal, objective_value: 4.5, values, row_annotations: HashMap::new() };
        (db, solution)
    }

    #[test]
    fn flux_table_has_one_row_per_reaction_with_requested_columns() {
        let (db, solution) = toy_db_with_flux_var();
        let table = flux_table(&db, &solution, &[ReportColumn::Flux, ReportColumn::Use]);
        let mut lines = table.lines();
        assert_eq!(lines.next(), Some("reaction|flux|use"));
        assert_eq!(lines.next(), Some("R1|4.500000|-"));
    }

    #[test]
    fn summary_line_blanks_objective_on_non_optimal_status() {
        let infeasible = OptSolutionData::infeasible();
        let line = summary_line("run1", &infeasible);
        assert_eq!(line, "run1|Infeasible|-");
    }

    #[test]
    fn summary_line_reports_objective_on_optimal_status() {
        let solution = OptSolutionData { status: OptStatus::Optimal, objective_value: 12.25, values: HashMap::new(), row_annotations: HashMap::new() };
        let line = summary_line("run1", &solution);
        assert_eq!(line, "run1|Optimal|12.250000");
    }

    #[test]
    fn tight_bound_table_labels_by_owning_reaction() {
        let (db, _) = toy_db_with_flux_var();
        let bounds = vec![crate::analysis::TightBound { variable: 0, min: 1.0, max: 2.0, class: crate::analysis::FluxClass::Positive }];
        let table = tight_bound_table(&db, &bounds);
        assert!(table.contains("R1|1.000000|2.000000"));
    }
}
