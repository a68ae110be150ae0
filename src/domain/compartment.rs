//! Compartment: a physical cellular region.

use std::collections::HashMap;

/// A physical cellular region (cytosol, periplasm, extracellular, ...).
///
/// Declared once at startup from a static table and immutable thereafter. A
/// distinguished *default* compartment exists, conventionally index 0 in
/// [`crate::domain::Database::compartments`].
#[derive(Debug, Clone)]
pub struct Compartment {
    /// Short identifier (e.g. `"c"`, `"e"`, `"p"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// pH of the compartment.
    pub ph: f64,
    /// Ionic strength, mol/L.
    pub ionic_strength: f64,
    /// Maximum permitted free metabolite concentration, mol/L.
    pub max_conc: f64,
    /// Minimum permitted free metabolite concentration, mol/L.
    pub min_conc: f64,
    /// Constant term of the membrane-potential affine model
    /// (`dPsi = potential_const + potential_ph_slope * pH`).
    pub potential_const: f64,
    /// pH-linear coefficient of the membrane-potential affine model.
    pub potential_ph_slope: f64,
    /// Per-metabolite concentration overrides: compound name -> `(min,max)`.
    pub conc_overrides: HashMap<String, (f64, f64)>,
}

impl Compartment {
    /// Construct a compartment with no per-metabolite overrides.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        ph: f64,
        ionic_strength: f64,
        min_conc: f64,
        max_conc: f64,
    ) -> Self {
        Compartment {
            id: id.into(),
            name: name.into(),
            ph,
            ionic_strength,
            max_conc,
            min_conc,
            potential_const: 0.0,
            potential_ph_slope: 0.0,
            conc_overrides: HashMap::new(),
        }
    }

    /// The default (unconstrained membrane potential) compartment, used when
    /// a loader does not specify compartments explicitly.
    pub fn default_compartment() -> Self {
        Compartment::new("c", "cytosol", 7.0, 0.25, 1e-7, 0.02)
    }

    /// Membrane potential (Δψ) at this compartment's reference pH, per the
    /// affine model above.
    pub fn membrane_potential(&self) -> f64 {
        self.potential_const + self.potential_ph_slope * self.ph
    }

    /// Concentration bounds for `compound_name`, falling back to the
    /// compartment-wide `[min_conc, max_conc]` when no override exists.
    pub fn conc_bounds(&self, compound_name: &str) -> (f64, f64) {
        self.conc_overrides
            .get(compound_name)
            .copied()
            .unwrap_or((self.min_conc, self.max_conc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_compartment_wide_bounds() {
        let comp = Compartment::default_compartment();
        assert_eq!(comp.conc_bounds("glc__D"), (1e-7, 0.02));
    }

    #[test]
    fn override_wins_over_default() {
        let mut comp = Compartment::default_compartment();
        comp.conc_overrides.insert("atp".into(), (1e-4, 1e-2));
        assert_eq!(comp.conc_bounds("atp"), (1e-4, 1e-2));
        assert_eq!(comp.conc_bounds("adp"), (1e-7, 0.02));
    }

    #[test]
    fn membrane_potential_is_affine_in_ph() {
        let mut comp = Compartment::default_compartment();
        comp.potential_const = -0.05;
        comp.potential_ph_slope = 0.01;
        assert!((comp.membrane_potential() - (-0.05 + 0.07)).abs() < 1e-12);
    }
}
