//! Parameter-file text format (§6 of the external interface): `key|value`
//! lines, `%`-prefixed comments, `${ENV_VAR}` environment expansion, and
//! `{other-parameter-name}` lazy cross-references resolved at first read
//! rather than at parse time.
//!
//! [`RawParameterFile`] only knows about text; mapping the recognized keys
//! onto [`crate::params::OptimizationParameters`] fields is
//! [`apply_to_parameters`]'s job, kept separate so a caller that only wants
//! the raw key/value store (e.g. to resolve a handful of driver-level
//! settings, not the whole option set) doesn't have to pull in the builder's
//! vocabulary.

use crate::error::{MfaError, MfaResult};
use crate::params::{OptimizationParameters, Ternary};
use std::collections::HashMap;

/// A parsed but not-yet-resolved parameter file: an ordered key/value store
/// (later duplicate keys overwrite earlier ones, matching a file being read
/// top to bottom) plus lazy `${ENV}`/`{other-key}` expansion.
#[derive(Debug, Clone, Default)]
pub struct RawParameterFile {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl RawParameterFile {
    /// Parse `text` into a raw key/value store. Lines beginning with `%`
    /// (after trimming) and blank lines are skipped. Every other
    /// non-blank line must contain a `|` separator.
    pub fn parse(text: &str) -> MfaResult<Self> {
        let mut file = RawParameterFile::default();
        for (lineno, line) in text.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('%') {
                continue;
            }
            let mut parts = trimmed.splitn(2, '|');
            let key = parts.next().unwrap().trim().to_string();
            let value = parts
                .next()
                .ok_or_else(|| MfaError::ParamFileSyntax {
                    line: lineno + 1,
                    message: format!("missing '|' separator in {:?}", trimmed),
                })?
                .trim()
                .to_string();
            file.set(key, value);
        }
        Ok(file)
    }

    /// Insert or overwrite a key's raw (unexpanded) value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        if let Some(&idx) = self.index.get(&key) {
            self.entries[idx].1 = value.into();
        } else {
            self.index.insert(key.clone(), self.entries.len());
            self.entries.push((key, value.into()));
        }
    }

    /// The raw, unexpanded value stored for `key`, if any.
    pub fn raw(&self, key: &str) -> Option<&str> {
        self.index.get(key).map(|&i| self.entries[i].1.as_str())
    }

    /// Resolve `key`'s value: expand every `${ENV_VAR}` to the named
    /// environment variable and every `{other-key}` to that key's own
    /// (recursively resolved) value. A reference cycle through `{...}` is
    /// reported rather than looping forever.
    pub fn resolve(&self, key: &str) -> MfaResult<String> {
        let mut seen = Vec::new();
        self.resolve_inner(key, &mut seen)
    }

    fn resolve_inner(&self, key: &str, seen: &mut Vec<String>) -> MfaResult<String> {
        if seen.iter().any(|k| k == key) {
            return Err(MfaError::UnresolvedReference(format!("cyclic parameter reference through {{{}}}", key)));
        }
        let raw = self
            .raw(key)
            .ok_or_else(|| MfaError::UnresolvedReference(format!("{{{}}}", key)))?
            .to_string();
        seen.push(key.to_string());
        self.expand(&raw, seen)
    }

    fn expand(&self, value: &str, seen: &mut Vec<String>) -> MfaResult<String> {
        let mut out = String::with_capacity(value.len());
        let mut chars = value.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '$' if chars.peek() == Some(&'{') => {
                    chars.next();
                    let name: String = chars.by_ref().take_while(|&ch| ch != '}').collect();
                    let resolved = std::env::var(&name)
                        .map_err(|_| MfaError::UnresolvedReference(format!("${{{}}}", name)))?;
                    out.push_str(&resolved);
                }
                '{' => {
                    let name: String = chars.by_ref().take_while(|&ch| ch != '}').collect();
                    out.push_str(&self.resolve_inner(&name, seen)?);
                }
                other => out.push(other),
            }
        }
        Ok(out)
    }

    /// Every key in file order, for callers that want to walk the whole set
    /// (e.g. to apply unrecognized keys as raw user bounds).
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

fn parse_bool(s: &str) -> bool {
    matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn parse_list(s: &str) -> Vec<String> {
    s.split(',').map(|x| x.trim().to_string()).filter(|x| !x.is_empty()).collect()
}

/// Parse a `;,`-separated list of reaction ids, each optionally prefixed
/// with `+` (forward-only) or `-` (reverse-only); a bare id means "both
/// directions". Mirrors the "Reactions that should always be active"/
/// "Reactions that are always blocked" parsing in the original driver.
fn parse_ternary_list(s: &str) -> HashMap<String, Ternary> {
    let mut out = HashMap::new();
    for item in s.split(|c| c == ',' || c == ';').map(|x| x.trim()).filter(|x| !x.is_empty()) {
        let (id, mode) = if let Some(rest) = item.strip_prefix('+') {
            (rest, Ternary::On)
        } else if let Some(rest) = item.strip_prefix('-') {
            (rest, Ternary::Off)
        } else {
            (item, Ternary::Default)
        };
        out.insert(id.to_string(), mode);
    }
    out
}

/// Apply every recognized key in `file` onto `params`, resolving `${ENV}`/
/// `{other-key}` references first. Unrecognized keys are ignored (not an
/// error — a parameter file may carry driver-level settings this core layer
/// doesn't consume). Structured options that aren't representable as a flat
/// scalar/list (`AddConstraints`, `ModConstraints`, raw `UserBounds`,
/// per-compound `ExchangeSpecies`/`ExchangeComp`/`ExchangeMin`/`ExchangeMax`
/// tuples) are intentionally out of scope for the text format and must be
/// built programmatically — see `DESIGN.md`.
pub fn apply_to_parameters(file: &RawParameterFile, params: &mut OptimizationParameters) -> MfaResult<()> {
    macro_rules! bool_key {
        ($key:literal, $field:ident) => {
            if file.raw($key).is_some() {
                params.$field = parse_bool(&file.resolve($key)?);
            }
        };
    }
    macro_rules! f64_key {
        ($key:literal, $field:ident) => {
            if file.raw($key).is_some() {
                let v = file.resolve($key)?;
                params.$field = v.parse::<f64>().map_err(|_| MfaError::ParamFileSyntax {
                    line: 0,
                    message: format!("{} is not a number: {:?}", $key, v),
                })?;
            }
        };
    }
    macro_rules! list_key {
        ($key:literal, $field:ident) => {
            if file.raw($key).is_some() {
                params.$field = parse_list(&file.resolve($key)?);
            }
        };
    }
    macro_rules! ternary_list_key {
        ($key:literal, $field:ident) => {
            if file.raw($key).is_some() {
                params.$field = parse_ternary_list(&file.resolve($key)?);
            }
        };
    }

    bool_key!("MassBalanceConstraints", mass_balance_constraints);
    bool_key!("DecomposeReversible", decompose_reversible);
    bool_key!("ReactionsUse", reactions_use);
    bool_key!("AllReactionsUse", all_reactions_use);
    bool_key!("DrainUseVar", drain_use_var);
    bool_key!("AllDrainUse", all_drain_use);
    bool_key!("ThermoConstraints", thermo_constraints);
    bool_key!("SimpleThermoConstraints", simple_thermo_constraints);
    bool_key!("DeltaGError", delta_g_error);
    bool_key!("ReactionErrorUseVariables", reaction_error_use_variables);
    bool_key!("GeneConstraints", gene_constraints);
    bool_key!("IntervalOptimization", interval_optimization);
    bool_key!("GeneOptimization", gene_optimization);
    bool_key!("DeletionOptimization", deletion_optimization);
    bool_key!("RelaxIntegerVariables", relax_integer_variables);
    bool_key!("DecomposeDrain", decompose_drain);
    bool_key!("AllReversible", all_reversible);
    bool_key!("IncludeDeadEnds", include_dead_ends);

    f64_key!("MaxFlux", max_flux);
    f64_key!("MinFlux", min_flux);
    f64_key!("MaxDrainFlux", max_drain_flux);
    f64_key!("MinDrainFlux", min_drain_flux);
    f64_key!("MaxError", max_error);
    f64_key!("ErrorMult", error_mult);
    f64_key!("MaxPotential", max_potential);
    f64_key!("MinPotential", min_potential);
    f64_key!("Temperature", temperature);
    f64_key!("OptimalObjectiveFraction", optimal_objective_fraction);

    list_key!("KOReactions", ko_reactions);
    list_key!("KOGenes", ko_genes);
    ternary_list_key!("AlwaysActiveReactions", always_active_reactions);
    ternary_list_key!("BlockedReactions", blocked_reactions);
    list_key!("RecursiveMILPTypes", recursive_milp_types);

    if file.raw("RecursiveMILPSolutionLimit").is_some() {
        let v = file.resolve("RecursiveMILPSolutionLimit")?;
        params.recursive_milp_solution_limit = v.parse::<usize>().map_err(|_| MfaError::ParamFileSyntax {
            line: 0,
            message: format!("RecursiveMILPSolutionLimit is not a non-negative integer: {:?}", v),
        })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let file = RawParameterFile::parse("% a comment\n\nMaxFlux|500\n").unwrap();
        assert_eq!(file.raw("MaxFlux"), Some("500"));
    }

    #[test]
    fn missing_separator_is_a_syntax_error() {
        assert!(RawParameterFile::parse("MaxFlux 500").is_err());
    }

    #[test]
    fn duplicate_key_keeps_the_last_value() {
        let file = RawParameterFile::parse("MaxFlux|100\nMaxFlux|200\n").unwrap();
        assert_eq!(file.raw("MaxFlux"), Some("200"));
    }

    #[test]
    fn env_reference_expands() {
        std::env::set_var("MFA_CORE_TEST_ENV_KEY", "123.5");
        let file = RawParameterFile::parse("MaxFlux|${MFA_CORE_TEST_ENV_KEY}\n").unwrap();
        assert_eq!(file.resolve("MaxFlux").unwrap(), "123.5");
        std::env::remove_var("MFA_CORE_TEST_ENV_KEY");
    }

    #[test]
    fn other_parameter_reference_expands_lazily() {
        let file = RawParameterFile::parse("Base|10\nDerived|{Base}\n").unwrap();
        assert_eq!(file.resolve("Derived").unwrap(), "10");
    }

    #[test]
    fn cyclic_reference_is_reported_not_looped() {
        let file = RawParameterFile::parse("A|{B}\nB|{A}\n").unwrap();
        assert!(file.resolve("A").is_err());
    }

    #[test]
    fn apply_to_parameters_sets_recognized_keys() {
        let file = RawParameterFile::parse("MaxFlux|250\nGeneConstraints|true\nKOReactions|R1, R2\n").unwrap();
        let mut params = OptimizationParameters::default();
        apply_to_parameters(&file, &mut params).unwrap();
        assert_eq!(params.max_flux, 250.0);
        assert!(params.gene_constraints);
        assert_eq!(params.ko_reactions, vec!["R1".to_string(), "R2".to_string()]);
    }

    #[test]
    fn ternary_list_parses_prefix_and_bare_ids() {
        let file = RawParameterFile::parse("BlockedReactions|+R1,-R2;R3\n").unwrap();
        let mut params = OptimizationParameters::default();
        apply_to_parameters(&file, &mut params).unwrap();
        assert_eq!(params.blocked_reactions.get("R1"), Some(&Ternary::On));
        assert_eq!(params.blocked_reactions.get("R2"), Some(&Ternary::Off));
        assert_eq!(params.blocked_reactions.get("R3"), Some(&Ternary::Default));
    }

    #[test]
    fn always_active_reactions_key_is_applied() {
        let file = RawParameterFile::parse("AlwaysActiveReactions|+R1\n").unwrap();
        let mut params = OptimizationParameters::default();
        apply_to_parameters(&file, &mut params).unwrap();
        assert_eq!(params.always_active_reactions.get("R1"), Some(&Ternary::On));
    }

    #[test]
    fn unrecognized_keys_are_ignored() {
        let file = RawParameterFile::parse("SomeDriverOnlySetting|whatever\n").unwrap();
        let mut params = OptimizationParameters::default();
        apply_to_parameters(&file, &mut params).unwrap();
        let defaults = OptimizationParameters::default();
        assert_eq!(params.max_flux, defaults.max_flux);
        assert_eq!(params.gene_constraints, defaults.gene_constraints);
    }
}
