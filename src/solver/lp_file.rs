//! LP text format writer and solver-output parser, used both to emit a
//! problem for external inspection and to drive the print-only / file-mode
//! solve dispatch path.

use crate::variable::{EqualityKind, LinEquation, MfaVariable, OptStatus, OptSolutionData};
use std::collections::{HashMap, HashSet};
use std::io::Write;

const MAX_NAME_LEN: usize = 16;

/// Produces LP column/row names: either simple `x<i>` names, or decorated
/// `{TYPE}_{OBJECT_ID}[_{COMPARTMENT}]` names, length-capped at 16
/// characters with a disambiguating numeric suffix on collision.
#[derive(Debug, Default)]
pub struct NameTable {
    used: HashSet<String>,
    assigned: HashMap<usize, String>,
}

impl NameTable {
    /// Create an empty table.
    pub fn new() -> Self {
        NameTable::default()
    }

    /// Assign (and cache) the column name for `var`.
    pub fn variable_name(&mut self, var: &MfaVariable, simple: bool) -> String {
        if let Some(existing) = self.assigned.get(&var.index) {
            return existing.clone();
        }
        let base = if simple {
            format!("x{}", var.index)
        } else {
            decorated_name(var)
        };
        let name = self.disambiguate(base);
        self.assigned.insert(var.index, name.clone());
        name
    }

    fn disambiguate(&mut self, base: String) -> String {
        let truncated: String = base.chars().take(MAX_NAME_LEN).collect();
        if self.used.insert(truncated.clone()) {
            return truncated;
        }
        for suffix in 1u32.. {
            let suffix_str = suffix.to_string();
            let keep = MAX_NAME_LEN.saturating_sub(suffix_str.len());
            let candidate: String = truncated.chars().take(keep).collect::<String>() + &suffix_str;
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
        }
        unreachable!("u32 suffix space exhausted")
    }
}

fn decorated_name(var: &MfaVariable) -> String {
    let object_id = object_label(var);
    match var.compartment {
        Some(c) => format!("{}_{}_{}", var.var_type.tag(), object_id, c),
        None => format!("{}_{}", var.var_type.tag(), object_id),
    }
}

fn object_label(var: &MfaVariable) -> String {
    use crate::variable::ObjectRef::*;
    match var.object {
        Compound(i) => format!("C{}", i),
        Reaction(i) => format!("R{}", i),
        Gene(i) => format!("G{}", i),
        Interval(i) => format!("IV{}", i),
        Complex(i) => format!("CX{}", i),
        Lump(i) => format!("LU{}", i),
        None => format!("V{}", var.index),
    }
}

/// Write `variables`/`constraints`/`objective` to `path` in a standard LP
/// text format.
pub fn write_lp(
    path: &std::path::Path,
    variables: &[MfaVariable],
    constraints: &[&LinEquation],
    objective: &HashMap<usize, f64>,
    maximize: bool,
    simple_names: bool,
) -> std::io::Result<NameTable> {
    let mut names = NameTable::new();
    for v in variables {
        names.variable_name(v, simple_names);
    }

    let mut out = std::fs::File::create(path)?;
    writeln!(out, "\\* MFA problem, {} variables, {} constraints *\\", variables.len(), constraints.len())?;
    writeln!(out, "{}", if maximize { "Maximize" } else { "Minimize" })?;
    write!(out, " obj:")?;
    let mut terms: Vec<(usize, f64)> = objective.iter().map(|(k, v)| (*k, *v)).collect();
    terms.sort_by_key(|(k, _)| *k);
    for (idx, coeff) in &terms {
        write!(out, " {:+} {}", coeff, names.variable_name(&variables[*idx], simple_names))?;
    }
    writeln!(out)?;

    writeln!(out, "Subject To")?;
    for c in constraints {
        write!(out, " {}:", c.name)?;
        let mut coeffs: Vec<(usize, f64)> = c.coefficients.iter().map(|(k, v)| (*k, *v)).collect();
        coeffs.sort_by_key(|(k, _)| *k);
        for (idx, coeff) in &coeffs {
            write!(out, " {:+} {}", coeff, names.variable_name(&variables[*idx], simple_names))?;
        }
        writeln!(out, " {} {}", c.kind.as_str(), c.rhs)?;
    }

    writeln!(out, "Bounds")?;
    for v in variables {
        let name = names.variable_name(v, simple_names);
        writeln!(out, " {} <= {} <= {}", v.lower, name, v.upper)?;
    }

    let binaries: Vec<&MfaVariable> = variables.iter().filter(|v| v.binary).collect();
    if !binaries.is_empty() {
        writeln!(out, "Binaries")?;
        for v in binaries {
            writeln!(out, " {}", names.variable_name(v, simple_names))?;
        }
    }
    let generals: Vec<&MfaVariable> = variables.iter().filter(|v| v.integer && !v.binary).collect();
    if !generals.is_empty() {
        writeln!(out, "Generals")?;
        for v in generals {
            writeln!(out, " {}", names.variable_name(v, simple_names))?;
        }
    }
    writeln!(out, "End")?;
    Ok(names)
}

/// Parse our own solver-output text format back into an [`OptSolutionData`]:
/// a status line, an objective line, then one line per column.
///
/// Expected format, one directive per line:
/// ```text
/// STATUS optimal
/// OBJECTIVE 12.5
/// 0 3.0
/// 1 -1.5
/// ```
pub fn parse_solver_output(text: &str) -> OptSolutionData {
    let mut status = OptStatus::Failed;
    let mut objective_value = f64::NAN;
    let mut values = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("STATUS") {
            status = match rest.trim().to_ascii_lowercase().as_str() {
                "optimal" => OptStatus::Optimal,
                "infeasible" => OptStatus::Infeasible,
                "unbounded" => OptStatus::Unbounded,
                "timeout" | "timed_out" => OptStatus::TimedOut,
                _ => OptStatus::Failed,
            };
        } else if let Some(rest) = line.strip_prefix("OBJECTIVE") {
            objective_value = rest.trim().parse().unwrap_or(f64::NAN);
        } else {
            let mut parts = line.split_whitespace();
            if let (Some(idx), Some(val)) = (parts.next(), parts.next()) {
                if let (Ok(idx), Ok(val)) = (idx.parse::<usize>(), val.parse::<f64>()) {
                    values.insert(idx, val);
                }
            }
        }
    }
    OptSolutionData { status, objective_value, values, row_annotations: HashMap::new() }
}

/// Serialize a solution back to the text format [`parse_solver_output`]
/// reads, used by the print-only dispatch path's companion writer.
pub fn write_solver_output(solution: &OptSolutionData) -> String {
    let mut out = String::new();
    let status = match solution.status {
        OptStatus::Optimal => "optimal",
        OptStatus::Infeasible => "infeasible",
        OptStatus::Unbounded => "unbounded",
        OptStatus::Failed => "failed",
        OptStatus::TimedOut => "timeout",
    };
    out.push_str(&format!("STATUS {}\n", status));
    out.push_str(&format!("OBJECTIVE {}\n", solution.objective_value));
    let mut entries: Vec<(&usize, &f64)> = solution.values.iter().collect();
    entries.sort_by_key(|(k, _)| **k);
    for (idx, val) in entries {
        out.push_str(&format!("{} {}\n", idx, val));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::{ConstraintMeaning, ObjectRef, VariableType};
    use tempfile_placeholder::*;

    // A tiny in-crate temp-path helper so lp_file tests don't need an extra
    // dev-dependency just for "write somewhere and read it back".
    mod tempfile_placeholder {
        use std::path::PathBuf;
        pub fn scratch_path(name: &str) -> PathBuf {
            let mut p = std::env::temp_dir();
            p.push(format!("mfa-core-test-{}-{}", std::process::id(), name));
            p
        }
    }

    #[test]
    fn decorated_names_are_capped_and_disambiguated() {
        let mut names = NameTable::new();
        let v1 = MfaVariable::new(0, VariableType::Flux, ObjectRef::Reaction(0), None, 0.0, 1.0, "");
        let v2 = MfaVariable::new(1, VariableType::Flux, ObjectRef::Reaction(0), None, 0.0, 1.0, "");
        let n1 = names.variable_name(&v1, false);
        let n2 = names.variable_name(&v2, false);
        assert!(n1.len() <= MAX_NAME_LEN);
        assert_ne!(n1, n2);
    }

    #[test]
    fn simple_names_are_x_index() {
        let mut names = NameTable::new();
        let v = MfaVariable::new(5, VariableType::Flux, ObjectRef::None, None, 0.0, 1.0, "");
        assert_eq!(names.variable_name(&v, true), "x5");
    }

    #[test]
    fn write_then_hand_parse_lp_contains_expected_sections() {
        let vars = vec![MfaVariable::new(0, VariableType::Flux, ObjectRef::Reaction(0), None, -5.0, 5.0, "")];
        let mut c = LinEquation::new(0, "row0", EqualityKind::LessEq, 10.0, ConstraintMeaning::UserSupplied);
        c.add_term(0, 1.0);
        let mut objective = HashMap::new();
        objective.insert(0, 1.0);
        let path = scratch_path("write.lp");
        write_lp(&path, &vars, &[&c], &objective, true, true).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert!(content.contains("Maximize"));
        assert!(content.contains("row0"));
        assert!(content.contains("Subject To"));
        assert!(content.contains("Bounds"));
    }

    #[test]
    fn solver_output_roundtrips_through_parser() {
        let mut solution = OptSolutionData {
            status: OptStatus::Optimal,
            objective_value: 8.739,
            values: HashMap::new(),
            row_annotations: HashMap::new(),
        };
        solution.values.insert(0, 10.0);
        solution.values.insert(1, -10.0);
        let text = write_solver_output(&solution);
        let parsed = parse_solver_output(&text);
        assert_eq!(parsed.status, OptStatus::Optimal);
        assert!((parsed.objective_value - 8.739).abs() < 1e-9);
        assert_eq!(parsed.value_of(0), 10.0);
        assert_eq!(parsed.value_of(1), -10.0);
    }

    #[test]
    fn parser_defaults_to_failed_on_unknown_status() {
        let parsed = parse_solver_output("STATUS weird\nOBJECTIVE 1.0\n");
        assert_eq!(parsed.status, OptStatus::Failed);
    }
}
