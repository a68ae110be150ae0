//! Compound (Species): a chemical entity.

use std::collections::{BTreeSet, HashMap};

/// A pKa or pKb value paired with the atom index it protonates/deprotonates
/// at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PkaSite {
    /// Index of the atom (in the compound's structure) this ionization site
    /// attaches to.
    pub atom_index: usize,
    /// The pKa (or pKb) value itself.
    pub value: f64,
}

/// Per-compartment decision-variable handles attached to a compound.
#[derive(Debug, Clone, Default)]
pub struct CompoundCompartmentRecord {
    /// Index of the `POTENTIAL` variable for this compound in this
    /// compartment, once built.
    pub potential_var: Option<usize>,
    /// Index of the `LOG_CONC` variable, once built.
    pub log_conc_var: Option<usize>,
    /// Index of the `CONC` variable, once built.
    pub conc_var: Option<usize>,
    /// `(eps, eps_plus, eps_minus, eps_use)` formation-energy error-budget
    /// variables for this compound in this compartment, once built.
    pub error_vars: Option<(usize, usize, usize, usize)>,
}

/// A chemical entity.
///
/// Created by a loader, cloneable, destroyed with the owning
/// [`crate::domain::Database`].
#[derive(Debug, Clone)]
pub struct Compound {
    /// Stable identifier (e.g. `"glc__D"`).
    pub id: String,
    /// Molecular formula (e.g. `"C6H12O6"`), used only for balance checks
    /// here — structural parsing is out of scope.
    pub formula: HashMap<String, i32>,
    /// Formal charge at the compound's reference pH.
    pub charge: i32,
    /// Estimated standard Gibbs free energy of formation, kJ/mol.
    pub delta_gf: f64,
    /// Uncertainty (standard error) on `delta_gf`, kJ/mol. Never negative.
    pub delta_gf_uncertainty: f64,
    /// Ordered pKa sites.
    pub pkas: Vec<PkaSite>,
    /// Ordered pKb sites.
    pub pkbs: Vec<PkaSite>,
    /// Group-contribution decomposition: group name -> coefficient, used to
    /// check `energy = sum(coeff * group_energy)` and
    /// `charge = sum(coeff * group_charge)`. Empty when the compound's
    /// energy was not derived by group contribution.
    pub group_coefficients: HashMap<String, f64>,
    /// Compartments this compound may appear in, by compartment index.
    pub compartments: BTreeSet<usize>,
    /// Per-compartment decision-variable handles.
    pub compartment_records: HashMap<usize, CompoundCompartmentRecord>,
}

impl Compound {
    /// Construct a compound present (initially) in no compartments.
    pub fn new(id: impl Into<String>, charge: i32, delta_gf: f64, delta_gf_uncertainty: f64) -> Self {
        Compound {
            id: id.into(),
            formula: HashMap::new(),
            charge,
            delta_gf,
            delta_gf_uncertainty: delta_gf_uncertainty.max(0.0),
            pkas: Vec::new(),
            pkbs: Vec::new(),
            group_coefficients: HashMap::new(),
            compartments: BTreeSet::new(),
            compartment_records: HashMap::new(),
        }
    }

    /// Register this compound as present in `compartment`.
    pub fn add_compartment(&mut self, compartment: usize) {
        self.compartments.insert(compartment);
        self.compartment_records.entry(compartment).or_default();
    }

    /// Verify `energy == sum(coeff * group_energy)` within `tolerance`,
    /// given a lookup of group name -> tabulated group energy. Returns
    /// `true` trivially when the compound carries no group decomposition.
    pub fn energy_consistent(&self, group_energies: &HashMap<String, f64>, tolerance: f64) -> bool {
        if self.group_coefficients.is_empty() {
            return true;
        }
        let sum: f64 = self
            .group_coefficients
            .iter()
            .filter_map(|(g, c)| group_energies.get(g).map(|e| c * e))
            .sum();
        (sum - self.delta_gf).abs() <= tolerance
    }

    /// Number of atoms of `element` in the compound's formula.
    pub fn atom_count(&self, element: &str) -> i32 {
        self.formula.get(element).copied().unwrap_or(0)
    }
}
