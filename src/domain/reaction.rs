//! Reaction: a directed stoichiometric equation.

use crate::domain::gene::GeneLogicTree;
use std::collections::HashMap;

/// Directionality tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directionality {
    /// Forward only, flux >= 0.
    Forward,
    /// Reverse only, flux <= 0.
    Reverse,
    /// Both directions, not decomposed.
    Reversible,
    /// Reversible but biased forward (used by decomposition bookkeeping).
    ForwardReversible,
    /// Reversible but biased reverse.
    ReverseReversible,
}

impl Directionality {
    /// Toggle to the mirror-image tag. Applying this twice returns the
    /// original tag.
    pub fn reversed(self) -> Directionality {
        match self {
            Directionality::Forward => Directionality::Reverse,
            Directionality::Reverse => Directionality::Forward,
            Directionality::Reversible => Directionality::Reversible,
            Directionality::ForwardReversible => Directionality::ReverseReversible,
            Directionality::ReverseReversible => Directionality::ForwardReversible,
        }
    }
}

/// One (compound, coefficient, compartment) entry in a reaction's
/// stoichiometry.
#[derive(Debug, Clone, PartialEq)]
pub struct ReactantRecord {
    /// Index of the compound in the owning [`crate::domain::Database`].
    pub compound: usize,
    /// Signed stoichiometric coefficient: negative for reactants, positive
    /// for products.
    pub coefficient: f64,
    /// Compartment this reactant occurrence is located in.
    pub compartment: usize,
    /// Whether this is a cofactor occurrence (e.g. ATP/ADP pairs), excluded
    /// from some structural bookkeeping but not from mass balance.
    pub is_cofactor: bool,
}

/// Decision-variable handles a reaction owns once built.
#[derive(Debug, Clone, Default)]
pub struct ReactionVars {
    /// `FLUX` variable index.
    pub flux: Option<usize>,
    /// `FORWARD_FLUX` variable index, when decomposed.
    pub forward_flux: Option<usize>,
    /// `REVERSE_FLUX` variable index, when decomposed.
    pub reverse_flux: Option<usize>,
    /// `REACTION_USE` variable index.
    pub reaction_use: Option<usize>,
    /// `FORWARD_USE` variable index.
    pub forward_use: Option<usize>,
    /// `REVERSE_USE` variable index.
    pub reverse_use: Option<usize>,
    /// `DELTAG` variable index.
    pub delta_g: Option<usize>,
    /// Symmetric error-budget variable indices: (epsilon, eps+, eps-, use).
    pub error_vars: Option<(usize, usize, usize, usize)>,
    /// Root gene-logic `COMPLEX_USE`/`REACTION_USE` binding, when
    /// `GeneConstraints` is active.
    pub gene_root_use: Option<usize>,
}

/// A directed stoichiometric equation.
#[derive(Debug, Clone)]
pub struct Reaction {
    /// Stable identifier.
    pub id: String,
    /// Primary compartment (where the reaction is considered to occur).
    pub compartment: usize,
    /// Directionality tag.
    pub directionality: Directionality,
    /// Reactants first (negative coefficients), then products (positive).
    pub reactants: Vec<ReactantRecord>,
    /// Estimated standard reaction Gibbs free energy, kJ/mol.
    pub delta_g: f64,
    /// Uncertainty on `delta_g`; the L2 norm over group contributions
    /// floored at `DELTA_G_UNCERTAINTY_FLOOR`.
    pub delta_g_uncertainty: f64,
    /// Structural-group change vector: group name -> net coefficient change.
    pub group_change: HashMap<String, f64>,
    /// Optional lumped-reaction decomposition: (component reaction index,
    /// coefficient) pairs this reaction is a linear combination of.
    pub lump_of: Option<Vec<(usize, f64)>>,
    /// Gene-to-reaction Boolean logic.
    pub gene_logic: GeneLogicTree,
    /// Explicitly marked as not required to mass-balance.
    pub unbalanced: bool,
    /// Decision-variable handles, populated by the builder.
    pub vars: ReactionVars,
}

/// Floor below which no reaction's ΔG uncertainty may fall.
pub const DELTA_G_UNCERTAINTY_FLOOR: f64 = 0.5;

/// Sentinel uncertainty recorded when group-contribution data is missing.
pub const DELTA_G_UNCERTAINTY_FLAG: f64 = f64::INFINITY;

impl Reaction {
    /// Construct a reaction with no reactants yet and no gene association.
    pub fn new(id: impl Into<String>, compartment: usize, directionality: Directionality) -> Self {
        Reaction {
            id: id.into(),
            compartment,
            directionality,
            reactants: Vec::new(),
            delta_g: 0.0,
            delta_g_uncertainty: DELTA_G_UNCERTAINTY_FLOOR,
            group_change: HashMap::new(),
            lump_of: None,
            gene_logic: GeneLogicTree { root: None, source: String::new() },
            unbalanced: false,
            vars: ReactionVars::default(),
        }
    }

    /// Append a reactant occurrence, keeping reactants (negative
    /// coefficient) ordered before products (positive).
    pub fn add_reactant(&mut self, compound: usize, coefficient: f64, compartment: usize, is_cofactor: bool) {
        let record = ReactantRecord { compound, coefficient, compartment, is_cofactor };
        if coefficient < 0.0 {
            let insert_at = self.reactants.iter().position(|r| r.coefficient >= 0.0).unwrap_or(self.reactants.len());
            self.reactants.insert(insert_at, record);
        } else {
            self.reactants.push(record);
        }
    }

    /// Net stoichiometric coefficient of `element` across the whole
    /// reaction, given each compound's formula.
    pub fn atom_delta(&self, element: &str, formula_of: &dyn Fn(usize) -> i32) -> f64 {
        self.reactants
            .iter()
            .map(|r| r.coefficient * formula_of(r.compound) as f64)
            .sum()
    }

    /// Net charge across the whole reaction.
    pub fn net_charge(&self, charge_of: &dyn Fn(usize) -> i32) -> f64 {
        self.reactants.iter().map(|r| r.coefficient * charge_of(r.compound) as f64).sum()
    }

    /// Reverse the reaction: negate every coefficient, flip the
    /// directionality tag and negate ΔG. Applying this twice must return a
    /// reaction equal to the original.
    pub fn reversed(&self) -> Reaction {
        let mut out = self.clone();
        out.directionality = self.directionality.reversed();
        out.delta_g = -self.delta_g;
        for r in out.reactants.iter_mut() {
            r.coefficient = -r.coefficient;
        }
        // Restore reactants-before-products ordering.
        out.reactants.sort_by(|a, b| {
            a.coefficient
                .partial_cmp(&b.coefficient)
                .unwrap()
                .then(std::cmp::Ordering::Equal)
        });
        out
    }

    /// Compute ΔG uncertainty as the L2 norm over group-contribution
    /// uncertainties, floored at [`DELTA_G_UNCERTAINTY_FLOOR`].
    /// `group_uncertainty` looks up a tabulated per-group standard error.
    pub fn compute_delta_g_uncertainty(&self, group_uncertainty: &dyn Fn(&str) -> Option<f64>) -> f64 {
        let mut sum_sq = 0.0;
        for (group, coeff) in &self.group_change {
            match group_uncertainty(group) {
                Some(u) => sum_sq += (coeff * u).powi(2),
                None => return DELTA_G_UNCERTAINTY_FLAG,
            }
        }
        sum_sq.sqrt().max(DELTA_G_UNCERTAINTY_FLOOR)
    }

    /// Attempt to balance a reaction whose only atom-count mismatches are
    /// exactly `H` alone, or `H` and `e-` together, by injecting a proton
    /// (and electron) reactant. This is a restricted check, not a general
    /// solver for arbitrary atom deficits.
    ///
    /// `mismatched` is the set of atom types (beyond `H`/`e-`) whose counts
    /// differ between reactants and products; `h_deficit`/`e_deficit` are
    /// the (signed) amounts of `H`/`e-` needed on the product side to
    /// balance. Returns `true` if a fix was applied.
    pub fn try_autobalance(
        &mut self,
        mismatched: &[String],
        h_deficit: f64,
        e_deficit: f64,
        proton_compound: usize,
        electron_compound: usize,
    ) -> bool {
        if !mismatched.is_empty() {
            return false;
        }
        if h_deficit != 0.0 {
            self.add_reactant(proton_compound, h_deficit, self.compartment, true);
        }
        if e_deficit != 0.0 {
            self.add_reactant(electron_compound, e_deficit, self.compartment, true);
        }
        true
    }

    /// Build a lumped reaction: a synthetic reaction whose net stoichiometry
    /// is the coefficient-weighted sum of its `components`' stoichiometries.
    pub fn lump(
        id: impl Into<String>,
        compartment: usize,
        components: &[(usize, &Reaction, f64)],
    ) -> Reaction {
        let mut merged: HashMap<(usize, usize), f64> = HashMap::new();
        for (_, reaction, weight) in components {
            for r in &reaction.reactants {
                *merged.entry((r.compound, r.compartment)).or_insert(0.0) += r.coefficient * weight;
            }
        }
        let mut out = Reaction::new(id, compartment, Directionality::Forward);
        let mut entries: Vec<_> = merged.into_iter().filter(|(_, c)| c.abs() > 1e-12).collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        for ((compound, comp), coeff) in entries {
            out.add_reactant(compound, coeff, comp, false);
        }
        out.lump_of = Some(components.iter().map(|(idx, _, w)| (*idx, *w)).collect());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::gene::GeneLogicTree;

    fn simple_reaction() -> Reaction {
        let mut r = Reaction::new("R1", 0, Directionality::Forward);
        r.add_reactant(0, -1.0, 0, false); // A
        r.add_reactant(1, 1.0, 0, false); // B
        r.gene_logic = GeneLogicTree { root: None, source: String::new() };
        r
    }

    #[test]
    fn reactants_precede_products() {
        let r = simple_reaction();
        assert!(r.reactants[0].coefficient < 0.0);
        assert!(r.reactants[1].coefficient > 0.0);
    }

    #[test]
    fn reverse_twice_is_identity() {
        let r = simple_reaction();
        let back = r.reversed().reversed();
        assert_eq!(back.directionality, r.directionality);
        assert_eq!(back.delta_g, r.delta_g);
        let mut orig: Vec<_> = r.reactants.iter().map(|x| (x.compound, x.coefficient)).collect();
        let mut rt: Vec<_> = back.reactants.iter().map(|x| (x.compound, x.coefficient)).collect();
        orig.sort_by(|a, b| a.0.cmp(&b.0));
        rt.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(orig, rt);
    }

    #[test]
    fn reverse_flips_directionality_and_sign() {
        let r = simple_reaction();
        let rev = r.reversed();
        assert_eq!(rev.directionality, Directionality::Reverse);
        assert_eq!(rev.reactants.iter().find(|x| x.compound == 0).unwrap().coefficient, 1.0);
        assert_eq!(rev.reactants.iter().find(|x| x.compound == 1).unwrap().coefficient, -1.0);
    }

    #[test]
    fn atom_delta_zero_for_balanced_identity_formula() {
        let r = simple_reaction();
        // Same formula on both sides (A -> B, both carbon count 1): balances.
        assert_eq!(r.atom_delta("C", &|_| 1), 0.0);
    }

    #[test]
    fn delta_g_uncertainty_floors_at_minimum() {
        let mut r = simple_reaction();
        r.group_change.insert("g1".into(), 0.001);
        let u = r.compute_delta_g_uncertainty(&|_| Some(0.001));
        assert_eq!(u, DELTA_G_UNCERTAINTY_FLOOR);
    }

    #[test]
    fn delta_g_uncertainty_is_l2_norm_when_above_floor() {
        let mut r = simple_reaction();
        r.group_change.insert("g1".into(), 3.0);
        r.group_change.insert("g2".into(), 4.0);
        // group uncertainties both 1.0 => sqrt(3^2+4^2) = 5.0
        let u = r.compute_delta_g_uncertainty(&|_| Some(1.0));
        assert!((u - 5.0).abs() < 1e-9);
    }

    #[test]
    fn missing_group_energy_flags_uncertainty() {
        let mut r = simple_reaction();
        r.group_change.insert("unknown".into(), 1.0);
        let u = r.compute_delta_g_uncertainty(&|_| None);
        assert!(u.is_infinite());
    }

    #[test]
    fn autobalance_only_fires_for_pure_h_e_mismatch() {
        let mut r = simple_reaction();
        assert!(!r.try_autobalance(&["S".to_string()], 1.0, 0.0, 2, 3));
        assert!(r.try_autobalance(&[], 1.0, 0.0, 2, 3));
        assert!(r.reactants.iter().any(|x| x.compound == 2));
    }

    #[test]
    fn lump_sums_weighted_stoichiometry() {
        let mut r1 = Reaction::new("R1", 0, Directionality::Forward);
        r1.add_reactant(0, -1.0, 0, false);
        r1.add_reactant(1, 1.0, 0, false);
        let mut r2 = Reaction::new("R2", 0, Directionality::Forward);
        r2.add_reactant(1, -1.0, 0, false);
        r2.add_reactant(2, 1.0, 0, false);
        let lumped = Reaction::lump("L1", 0, &[(0, &r1, 1.0), (1, &r2, 1.0)]);
        // B cancels out: net A -> C
        assert_eq!(lumped.reactants.len(), 2);
        assert!(lumped.reactants.iter().any(|x| x.compound == 0 && x.coefficient == -1.0));
        assert!(lumped.reactants.iter().any(|x| x.compound == 2 && x.coefficient == 1.0));
        assert_eq!(lumped.lump_of, Some(vec![(0, 1.0), (1, 1.0)]));
    }
}
