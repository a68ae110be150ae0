//! Problem builder: turns a domain model plus [`OptimizationParameters`]
//! into a populated [`ProblemState`] — variables, constraints, and (on a
//! separate call) the objective.
//!
//! Each reaction gets one signed "main" flux variable regardless of
//! decomposition; when a reaction is split into forward/reverse halves, the
//! main variable is coupled to the halves by an equality constraint rather
//! than replaced, so mass balance and the objective always sum over the same
//! variable set whether or not decomposition is active. An exchange/drain
//! reaction is any reaction with exactly one reactant occurrence — it gets
//! `DRAIN_*` variable tags instead of `FLUX`/`*_FLUX` but is otherwise folded
//! into the same mass-balance sum, since the stoichiometric graph already
//! carries its single edge.
//!
//! Callers are expected to have already run [`OptimizationParameters::rectify`]
//! — the builder reads `reactions_use`/`drain_use_var`/`thermo_constraints`
//! etc. directly and does not re-derive the `all_*`/implied flags.

use crate::context::Tolerances;
use crate::domain::compound::Compound;
use crate::domain::database::Database;
use crate::domain::gene::{GeneLogic, GeneLogicNode};
use crate::domain::reaction::{Directionality, Reaction};
use crate::error::{MfaError, MfaResult};
use crate::params::{OptimizationParameters, Ternary};
use crate::problem_state::ProblemState;
use crate::variable::{ConstraintMeaning, EqualityKind, LinEquation, MfaVariable, ObjectRef, VariableType};
use std::collections::HashMap;

/// Ideal gas constant, kJ/(mol*K).
const R_GAS_KJ: f64 = 8.314e-3;
/// Faraday constant, kJ/(V*mol).
const FARADAY_KJ_PER_V: f64 = 96.485;
/// Magnitude bound applied to `DELTAG`/`POTENTIAL` variables when no tighter
/// figure is available from parameters.
const DEFAULT_ENERGY_BOUND: f64 = 1.0e4;

/// One term of a declarative objective: a domain object, which of its
/// variable kinds to reference, and a coefficient.
#[derive(Debug, Clone)]
pub struct ObjectiveTerm {
    /// Domain object the variable is attached to.
    pub object: ObjectRef,
    /// Which variable kind of that object to reference.
    pub var_type: VariableType,
    /// Linear coefficient.
    pub coefficient: f64,
}

/// A declarative objective: either a bare variable reference or a linear
/// combination resolved against the built variable set.
#[derive(Debug, Clone)]
pub enum ObjectiveSpec {
    /// Single variable, coefficient 1.
    Single {
        /// Domain object.
        object: ObjectRef,
        /// Variable kind.
        var_type: VariableType,
    },
    /// Weighted sum of several variables.
    Linear(Vec<ObjectiveTerm>),
}

/// The built problem plus the bookkeeping needed to resolve further
/// objective terms, user bounds, and additive constraints by name.
#[derive(Debug, Default)]
pub struct ProblemBuilder {
    /// The populated variables, constraints, and objective.
    pub state: ProblemState,
    var_lookup: HashMap<(ObjectRef, VariableType), usize>,
    name_lookup: HashMap<String, usize>,
    next_complex_id: usize,
}

impl ProblemBuilder {
    /// Build a full problem from `db` and `params`. Mutates `db` in place to
    /// record the variable handles each reaction/compound/gene now owns.
    pub fn build(db: &mut Database, params: &OptimizationParameters, tolerances: &Tolerances) -> MfaResult<Self> {
        let mut b = ProblemBuilder::default();
        b.build_reaction_variables(db, params)?;
        if params.mass_balance_constraints {
            b.build_mass_balance(db);
        }
        b.build_use_linking(db, tolerances);
        if params.gene_constraints {
            b.build_gene_logic(db);
        }
        if params.thermo_constraints {
            b.build_full_thermo(db, params, tolerances);
        } else if params.simple_thermo_constraints {
            b.build_simple_thermo(db);
        }
        if params.delta_g_error {
            b.build_error_budget(db, params);
            if params.thermo_constraints {
                b.build_compound_error_budget(db, params);
            }
        }
        b.apply_overrides(db, params)?;
        for extra in params.add_constraints.iter().chain(params.mod_constraints.iter()) {
            b.state.add_constraint(extra.clone());
        }
        b.check_consistency()?;
        Ok(b)
    }

    fn add_var(
        &mut self,
        var_type: VariableType,
        object: ObjectRef,
        compartment: Option<usize>,
        lower: f64,
        upper: f64,
        name: impl Into<String>,
    ) -> usize {
        let idx = self.state.variables.len();
        let name = name.into();
        let var = MfaVariable::new(idx, var_type, object, compartment, lower, upper, name.clone());
        self.state.add_variable(var);
        self.var_lookup.insert((object, var_type), idx);
        self.name_lookup.insert(name, idx);
        idx
    }

    fn add_row(&mut self, name: impl Into<String>, kind: EqualityKind, rhs: f64, meaning: ConstraintMeaning) -> LinEquation {
        LinEquation::new(self.state.constraints.len(), name, kind, rhs, meaning)
    }

    /// Resolve an already-built variable by domain object and kind.
    pub fn resolve_variable(&self, object: ObjectRef, var_type: VariableType) -> Option<usize> {
        self.var_lookup.get(&(object, var_type)).copied()
    }

    /// Resolve an already-built variable by its assigned name.
    pub fn resolve_name(&self, name: &str) -> Option<usize> {
        self.name_lookup.get(name).copied()
    }

    /// Replace the objective from a declarative spec, resolving references
    /// against the built variable set.
    pub fn set_objective(&mut self, spec: &ObjectiveSpec, maximize: bool) -> MfaResult<()> {
        let mut terms = HashMap::new();
        match spec {
            ObjectiveSpec::Single { object, var_type } => {
                let idx = self
                    .resolve_variable(*object, *var_type)
                    .ok_or_else(|| MfaError::UnknownEntity { kind: "objective variable", id: format!("{:?}/{:?}", object, var_type) })?;
                terms.insert(idx, 1.0);
            }
            ObjectiveSpec::Linear(ts) => {
                for t in ts {
                    let idx = self
                        .resolve_variable(t.object, t.var_type)
                        .ok_or_else(|| MfaError::UnknownEntity { kind: "objective variable", id: format!("{:?}/{:?}", t.object, t.var_type) })?;
                    *terms.entry(idx).or_insert(0.0) += t.coefficient;
                }
            }
        }
        self.state.set_objective(terms, maximize);
        Ok(())
    }

    /// The building contract: no variable may have upper < lower.
    fn check_consistency(&self) -> MfaResult<()> {
        let bad = self.state.inverted_bound_variables();
        if let Some(&first) = bad.first() {
            return Err(MfaError::InvertedBounds(self.state.variables[first].name.clone()));
        }
        Ok(())
    }

    fn is_exchange(reaction: &Reaction) -> bool {
        reaction.reactants.len() == 1
    }

    fn effective_directionality(reaction: &Reaction, params: &OptimizationParameters) -> Directionality {
        if params.all_reversible {
            Directionality::Reversible
        } else {
            reaction.directionality
        }
    }

    fn effective_bounds(dir: Directionality, is_exchange: bool, params: &OptimizationParameters) -> (f64, f64) {
        let (def_min, def_max) = if is_exchange {
            (params.min_drain_flux, params.max_drain_flux)
        } else {
            (params.min_flux, params.max_flux)
        };
        match dir {
            Directionality::Forward => (0.0, def_max),
            Directionality::Reverse => (def_min, 0.0),
            Directionality::Reversible | Directionality::ForwardReversible | Directionality::ReverseReversible => {
                (def_min, def_max)
            }
        }
    }

    fn build_reaction_variables(&mut self, db: &mut Database, params: &OptimizationParameters) -> MfaResult<()> {
        for r in 0..db.reactions.len() {
            let (id, compartment, is_exchange, eff_dir) = {
                let reaction = &db.reactions[r];
                (
                    reaction.id.clone(),
                    reaction.compartment,
                    Self::is_exchange(reaction),
                    Self::effective_directionality(reaction, params),
                )
            };
            let (lo, hi) = Self::effective_bounds(eff_dir, is_exchange, params);
            let (main_type, fwd_type, rev_type) = if is_exchange {
                (VariableType::DrainFlux, VariableType::ForwardDrainFlux, VariableType::ReverseDrainFlux)
            } else {
                (VariableType::Flux, VariableType::ForwardFlux, VariableType::ReverseFlux)
            };
            let main = self.add_var(main_type, ObjectRef::Reaction(r), Some(compartment), lo, hi, format!("{}_{}", main_type.tag(), id));
            db.reactions[r].vars.flux = Some(main);

            let decompose_flag = if is_exchange { params.decompose_drain } else { params.decompose_reversible };
            let is_reversible_like =
                matches!(eff_dir, Directionality::Reversible | Directionality::ForwardReversible | Directionality::ReverseReversible);
            if decompose_flag && is_reversible_like {
                let fwd = self.add_var(fwd_type, ObjectRef::Reaction(r), Some(compartment), 0.0, hi.max(0.0), format!("{}_{}", fwd_type.tag(), id));
                let rev = self.add_var(rev_type, ObjectRef::Reaction(r), Some(compartment), 0.0, (-lo).max(0.0), format!("{}_{}", rev_type.tag(), id));
                db.reactions[r].vars.forward_flux = Some(fwd);
                db.reactions[r].vars.reverse_flux = Some(rev);
                let mut coupling = self.add_row(format!("DCPL_{}", id), EqualityKind::Equal, 0.0, ConstraintMeaning::DecompositionCoupling);
                coupling.add_term(main, 1.0);
                coupling.add_term(fwd, -1.0);
                coupling.add_term(rev, 1.0);
                self.state.add_constraint(coupling);
            }

            let use_enabled = if is_exchange { params.drain_use_var } else { params.reactions_use };
            if use_enabled {
                let use_type = if is_exchange { VariableType::DrainUse } else { VariableType::ReactionUse };
                let use_var = self.add_var(use_type, ObjectRef::Reaction(r), None, 0.0, 1.0, format!("{}_{}", use_type.tag(), id));
                db.reactions[r].vars.reaction_use = Some(use_var);
                if decompose_flag && is_reversible_like {
                    let fwd_use_type = if is_exchange { VariableType::ForwardDrainUse } else { VariableType::ForwardUse };
                    let rev_use_type = if is_exchange { VariableType::ReverseDrainUse } else { VariableType::ReverseUse };
                    let fwd_use = self.add_var(fwd_use_type, ObjectRef::Reaction(r), None, 0.0, 1.0, format!("{}_{}", fwd_use_type.tag(), id));
                    let rev_use = self.add_var(rev_use_type, ObjectRef::Reaction(r), None, 0.0, 1.0, format!("{}_{}", rev_use_type.tag(), id));
                    db.reactions[r].vars.forward_use = Some(fwd_use);
                    db.reactions[r].vars.reverse_use = Some(rev_use);
                    let mut eq = self.add_row(format!("USEQ_{}", id), EqualityKind::Equal, 0.0, ConstraintMeaning::DecompositionCoupling);
                    eq.add_term(use_var, 1.0);
                    eq.add_term(fwd_use, -1.0);
                    eq.add_term(rev_use, -1.0);
                    self.state.add_constraint(eq);
                    let mut excl = self.add_row(format!("USEX_{}", id), EqualityKind::LessEq, 1.0, ConstraintMeaning::UseExclusivity);
                    excl.add_term(fwd_use, 1.0);
                    excl.add_term(rev_use, 1.0);
                    self.state.add_constraint(excl);
                }
            }
        }
        Ok(())
    }

    fn build_use_linking(&mut self, db: &Database, tolerances: &Tolerances) {
        let m = tolerances.big_m;
        for r in 0..db.reactions.len() {
            let reaction = &db.reactions[r];
            let vars = &reaction.vars;
            if let (Some(fwd), Some(fwd_use)) = (vars.forward_flux, vars.forward_use) {
                let mut c = self.add_row(format!("ULFW_{}", reaction.id), EqualityKind::LessEq, 0.0, ConstraintMeaning::UseLinking);
                c.add_term(fwd, 1.0);
                c.add_term(fwd_use, -m);
                self.state.add_constraint(c);
            }
            if let (Some(rev), Some(rev_use)) = (vars.reverse_flux, vars.reverse_use) {
                let mut c = self.add_row(format!("ULRV_{}", reaction.id), EqualityKind::LessEq, 0.0, ConstraintMeaning::UseLinking);
                c.add_term(rev, 1.0);
                c.add_term(rev_use, -m);
                self.state.add_constraint(c);
            }
            // Undecomposed reaction with a single use variable: link the
            // signed main flux directly, using whichever side(s) of zero the
            // hard bounds actually admit.
            if vars.forward_flux.is_none() && vars.reverse_flux.is_none() {
                if let (Some(main), Some(use_var)) = (vars.flux, vars.reaction_use) {
                    let (lo, hi) = (self.state.variables[main].lower, self.state.variables[main].upper);
                    if hi > 0.0 {
                        let mut c = self.add_row(format!("UL_{}", reaction.id), EqualityKind::LessEq, 0.0, ConstraintMeaning::UseLinking);
                        c.add_term(main, 1.0);
                        c.add_term(use_var, -m);
                        self.state.add_constraint(c);
                    }
                    if lo < 0.0 {
                        let mut c = self.add_row(format!("ULN_{}", reaction.id), EqualityKind::GreaterEq, 0.0, ConstraintMeaning::UseLinking);
                        c.add_term(main, 1.0);
                        c.add_term(use_var, m);
                        self.state.add_constraint(c);
                    }
                }
            }
        }
    }

    fn build_mass_balance(&mut self, db: &Database) {
        let graph = crate::domain::database::StoichiometricGraph::derive(db);
        for (compound, compartment) in graph.compound_compartment_pairs() {
            let compound_id = db.compounds[compound].id.clone();
            let compartment_id = db.compartments[compartment].id.clone();
            let mut row = self.add_row(
                format!("BAL_{}_{}", compound_id, compartment_id),
                EqualityKind::Equal,
                0.0,
                ConstraintMeaning::MassBalance,
            );
            for edge in graph.edges_for_compound(compound, compartment) {
                if let Some(flux_var) = db.reactions[edge.reaction].vars.flux {
                    row.add_term(flux_var, edge.coefficient);
                }
            }
            self.state.add_constraint(row);
        }
    }

    fn gene_use_var(&mut self, db: &mut Database, gene_idx: usize) -> usize {
        if let Some(existing) = db.genes[gene_idx].use_var {
            return existing;
        }
        let id = db.genes[gene_idx].id.clone();
        let idx = self.add_var(VariableType::GeneUse, ObjectRef::Gene(gene_idx), None, 0.0, 1.0, format!("GUSE_{}", id));
        db.genes[gene_idx].use_var = Some(idx);
        idx
    }

    fn build_gene_node(&mut self, db: &mut Database, node: &GeneLogicNode) -> usize {
        match node {
            GeneLogicNode::Leaf(gene_idx) => self.gene_use_var(db, *gene_idx),
            GeneLogicNode::Node { logic, children } => {
                let child_vars: Vec<usize> = children.iter().map(|c| self.build_gene_node(db, c)).collect();
                let k = child_vars.len() as f64;
                let complex_id = self.next_complex_id;
                self.next_complex_id += 1;
                let x = self.add_var(VariableType::ComplexUse, ObjectRef::Complex(complex_id), None, 0.0, 1.0, format!("CUSE_{}", complex_id));
                match logic {
                    GeneLogic::Or => {
                        let mut c1 = self.add_row(format!("GLA_{}", complex_id), EqualityKind::GreaterEq, 0.0, ConstraintMeaning::GeneLogic);
                        for &c in &child_vars {
                            c1.add_term(c, 1.0);
                        }
                        c1.add_term(x, -1.0);
                        self.state.add_constraint(c1);
                        let mut c2 = self.add_row(format!("GLB_{}", complex_id), EqualityKind::LessEq, 0.0, ConstraintMeaning::GeneLogic);
                        for &c in &child_vars {
                            c2.add_term(c, 1.0);
                        }
                        c2.add_term(x, -k);
                        self.state.add_constraint(c2);
                    }
                    GeneLogic::And => {
                        let mut c1 = self.add_row(format!("GLA_{}", complex_id), EqualityKind::GreaterEq, -1.0, ConstraintMeaning::GeneLogic);
                        for &c in &child_vars {
                            c1.add_term(c, 2.0);
                        }
                        c1.add_term(x, -2.0 * k);
                        self.state.add_constraint(c1);
                        let mut c2 = self.add_row(format!("GLB_{}", complex_id), EqualityKind::LessEq, 2.0 * k - 1.0, ConstraintMeaning::GeneLogic);
                        for &c in &child_vars {
                            c2.add_term(c, 2.0);
                        }
                        c2.add_term(x, -2.0 * k);
                        self.state.add_constraint(c2);
                    }
                }
                x
            }
        }
    }

    fn build_gene_logic(&mut self, db: &mut Database) {
        for r in 0..db.reactions.len() {
            let root = db.reactions[r].gene_logic.root.clone();
            let (id, use_var) = (db.reactions[r].id.clone(), db.reactions[r].vars.reaction_use);
            if let Some(root) = root {
                let root_var = self.build_gene_node(db, &root);
                db.reactions[r].vars.gene_root_use = Some(root_var);
                if let Some(use_var) = use_var {
                    let mut c = self.add_row(format!("GLROOT_{}", id), EqualityKind::LessEq, 0.0, ConstraintMeaning::GeneLogic);
                    c.add_term(use_var, 1.0);
                    c.add_term(root_var, -1.0);
                    self.state.add_constraint(c);
                }
            }
        }
    }

    fn build_simple_thermo(&mut self, db: &mut Database) {
        for r in 0..db.reactions.len() {
            let (delta_g, vars) = {
                let reaction = &db.reactions[r];
                (reaction.delta_g, reaction.vars.clone())
            };
            if delta_g > 0.0 {
                if let Some(fwd) = vars.forward_flux {
                    self.state.set_bound(fwd, 0.0, 0.0);
                } else if let Some(main) = vars.flux {
                    if self.state.variables[main].lower >= 0.0 {
                        self.state.set_bound(main, 0.0, 0.0);
                    }
                }
            } else if delta_g < 0.0 {
                if let Some(rev) = vars.reverse_flux {
                    self.state.set_bound(rev, 0.0, 0.0);
                } else if let Some(main) = vars.flux {
                    if self.state.variables[main].upper <= 0.0 {
                        self.state.set_bound(main, 0.0, 0.0);
                    }
                }
            }
        }
    }

    fn potential_var(&mut self, db: &mut Database, compound: usize, compartment: usize, params: &OptimizationParameters) -> usize {
        if let Some(existing) = db.compounds[compound].compartment_records.get(&compartment).and_then(|r| r.potential_var) {
            return existing;
        }
        let compound_id = db.compounds[compound].id.clone();
        let compartment_id = db.compartments[compartment].id.clone();
        let pot = self.add_var(
            VariableType::Potential,
            ObjectRef::Compound(compound),
            Some(compartment),
            params.min_potential,
            params.max_potential,
            format!("POT_{}_{}", compound_id, compartment_id),
        );
        let (min_conc, max_conc) = db.compartments[compartment].conc_bounds(&compound_id);
        let log_conc = self.add_var(
            VariableType::LogConc,
            ObjectRef::Compound(compound),
            Some(compartment),
            min_conc.max(1e-12).ln(),
            max_conc.ln(),
            format!("LOGCONC_{}_{}", compound_id, compartment_id),
        );
        let conc = self.add_var(
            VariableType::Conc,
            ObjectRef::Compound(compound),
            Some(compartment),
            min_conc,
            max_conc,
            format!("CONC_{}_{}", compound_id, compartment_id),
        );
        let record = db.compounds[compound].compartment_records.entry(compartment).or_default();
        record.potential_var = Some(pot);
        record.log_conc_var = Some(log_conc);
        record.conc_var = Some(conc);

        let rt = R_GAS_KJ * params.temperature;
        let mut def = self.add_row(
            format!("POTDEF_{}_{}", compound_id, compartment_id),
            EqualityKind::Equal,
            db.compounds[compound].delta_gf,
            ConstraintMeaning::PotentialDefinition,
        );
        def.add_term(pot, 1.0);
        def.add_term(log_conc, -rt);
        self.state.add_constraint(def);
        pot
    }

    fn transport_term(db: &Database, reaction: &Reaction) -> f64 {
        let dest_psi = db.compartments[reaction.compartment].membrane_potential();
        reaction
            .reactants
            .iter()
            .filter(|r| r.compartment != reaction.compartment)
            .map(|r| {
                let src_psi = db.compartments[r.compartment].membrane_potential();
                let charge = db.compounds[r.compound].charge as f64;
                r.coefficient * charge * FARADAY_KJ_PER_V * (dest_psi - src_psi)
            })
            .sum()
    }

    fn build_full_thermo(&mut self, db: &mut Database, params: &OptimizationParameters, tolerances: &Tolerances) {
        let compound_compartments: Vec<(usize, usize)> = db
            .compounds
            .iter()
            .enumerate()
            .flat_map(|(ci, c): (usize, &Compound)| c.compartments.iter().map(move |&co| (ci, co)))
            .collect();
        for (compound, compartment) in compound_compartments {
            self.potential_var(db, compound, compartment, params);
        }

        for r in 0..db.reactions.len() {
            let (id, transport, reactants, compartment) = {
                let reaction = &db.reactions[r];
                (reaction.id.clone(), Self::transport_term(db, reaction), reaction.reactants.clone(), reaction.compartment)
            };
            let delta_g_var = self.add_var(
                VariableType::DeltaG,
                ObjectRef::Reaction(r),
                Some(compartment),
                -DEFAULT_ENERGY_BOUND,
                DEFAULT_ENERGY_BOUND,
                format!("DELTAG_{}", id),
            );
            db.reactions[r].vars.delta_g = Some(delta_g_var);

            let mut def = self.add_row(format!("DGDEF_{}", id), EqualityKind::Equal, transport, ConstraintMeaning::DeltaGDefinition);
            def.add_term(delta_g_var, 1.0);
            for reactant in &reactants {
                let pot = self.potential_var(db, reactant.compound, reactant.compartment, params);
                def.add_term(pot, -reactant.coefficient);
            }
            self.state.add_constraint(def);

            let m = tolerances.big_m;
            let vars = db.reactions[r].vars.clone();
            if let (Some(fwd_use), Some(rev_use)) = (vars.forward_use, vars.reverse_use) {
                let mut forward_feasible = self.add_row(
                    format!("TFFW_{}", id),
                    EqualityKind::LessEq,
                    m - tolerances.mfa_zero_tolerance,
                    ConstraintMeaning::ThermoFeasibility,
                );
                forward_feasible.add_term(delta_g_var, 1.0);
                forward_feasible.add_term(fwd_use, m);
                self.state.add_constraint(forward_feasible);

                let mut reverse_feasible = self.add_row(
                    format!("TFRV_{}", id),
                    EqualityKind::GreaterEq,
                    tolerances.mfa_zero_tolerance - m,
                    ConstraintMeaning::ThermoFeasibility,
                );
                reverse_feasible.add_term(delta_g_var, 1.0);
                reverse_feasible.add_term(rev_use, -m);
                self.state.add_constraint(reverse_feasible);
            }
        }
    }

    fn build_error_budget(&mut self, db: &mut Database, params: &OptimizationParameters) {
        let bound = params.max_error * params.error_mult;
        for r in 0..db.reactions.len() {
            let (id, delta_g_var) = (db.reactions[r].id.clone(), db.reactions[r].vars.delta_g);
            let Some(delta_g_var) = delta_g_var else { continue };
            let eps = self.add_var(VariableType::ReactionDeltaGError, ObjectRef::Reaction(r), None, -bound, bound, format!("RERR_{}", id));
            let eps_plus = self.add_var(VariableType::ReactionDeltaGErrorPlus, ObjectRef::Reaction(r), None, 0.0, bound, format!("RERRP_{}", id));
            let eps_minus = self.add_var(VariableType::ReactionDeltaGErrorMinus, ObjectRef::Reaction(r), None, 0.0, bound, format!("RERRN_{}", id));
            let eps_use = self.add_var(VariableType::ReactionDeltaGErrorUse, ObjectRef::Reaction(r), None, 0.0, 1.0, format!("RERRU_{}", id));
            db.reactions[r].vars.error_vars = Some((eps, eps_plus, eps_minus, eps_use));

            let mut split = self.add_row(format!("ERRSPLIT_{}", id), EqualityKind::Equal, 0.0, ConstraintMeaning::ErrorBudget);
            split.add_term(eps, 1.0);
            split.add_term(eps_plus, -1.0);
            split.add_term(eps_minus, 1.0);
            self.state.add_constraint(split);

            // Fold the error term into the DeltaG definition: DGDEF already
            // pins delta_g_var == potentials + transport, so add eps on the
            // other side by subtracting it from delta_g_var's own row.
            if let Some(def_row) = self.state.constraint_index.get(&format!("DGDEF_{}", id)).copied() {
                if let Some(row) = self.state.constraints[def_row].as_mut() {
                    row.add_term(eps, -1.0);
                }
            }

            if params.reaction_error_use_variables {
                let mut plus_gate = self.add_row(format!("ERRUP_{}", id), EqualityKind::LessEq, 0.0, ConstraintMeaning::ErrorBudget);
                plus_gate.add_term(eps_plus, 1.0);
                plus_gate.add_term(eps_use, -bound);
                self.state.add_constraint(plus_gate);

                let mut minus_gate = self.add_row(format!("ERRUN_{}", id), EqualityKind::LessEq, bound, ConstraintMeaning::ErrorBudget);
                minus_gate.add_term(eps_minus, 1.0);
                minus_gate.add_term(eps_use, bound);
                self.state.add_constraint(minus_gate);
            }
        }
    }

    /// Compound-level counterpart of [`Self::build_error_budget`]:
    /// `POTDEF` already pins `potential - RT*log_conc == delta_gf`; fold a
    /// symmetric `DELTAGF_ERROR` budget (sized off the compound's own
    /// `delta_gf_uncertainty`, never the reaction error's `max_error`) into
    /// that row the same way the reaction budget folds into `DGDEF`.
    fn build_compound_error_budget(&mut self, db: &mut Database, params: &OptimizationParameters) {
        let targets: Vec<(usize, usize)> = db
            .compounds
            .iter()
            .enumerate()
            .flat_map(|(ci, c)| {
                c.compartment_records
                    .iter()
                    .filter(|(_, r)| r.potential_var.is_some())
                    .map(move |(&co, _)| (ci, co))
                    .collect::<Vec<_>>()
            })
            .collect();
        for (compound, compartment) in targets {
            let bound = (db.compounds[compound].delta_gf_uncertainty * params.error_mult).max(0.0);
            if bound <= 0.0 {
                continue;
            }
            let compound_id = db.compounds[compound].id.clone();
            let compartment_id = db.compartments[compartment].id.clone();
            let suffix = format!("{}_{}", compound_id, compartment_id);

            let eps = self.add_var(VariableType::DeltaGfError, ObjectRef::Compound(compound), Some(compartment), -bound, bound, format!("FERR_{}", suffix));
            let eps_plus = self.add_var(VariableType::DeltaGfErrorPlus, ObjectRef::Compound(compound), Some(compartment), 0.0, bound, format!("FERRP_{}", suffix));
            let eps_minus = self.add_var(VariableType::DeltaGfErrorMinus, ObjectRef::Compound(compound), Some(compartment), 0.0, bound, format!("FERRN_{}", suffix));
            let eps_use = self.add_var(VariableType::DeltaGfErrorUse, ObjectRef::Compound(compound), Some(compartment), 0.0, 1.0, format!("FERRU_{}", suffix));
            if let Some(rec) = db.compounds[compound].compartment_records.get_mut(&compartment) {
                rec.error_vars = Some((eps, eps_plus, eps_minus, eps_use));
            }

            let mut split = self.add_row(format!("FERRSPLIT_{}", suffix), EqualityKind::Equal, 0.0, ConstraintMeaning::ErrorBudget);
            split.add_term(eps, 1.0);
            split.add_term(eps_plus, -1.0);
            split.add_term(eps_minus, 1.0);
            self.state.add_constraint(split);

            if let Some(def_row) = self.state.constraint_index.get(&format!("POTDEF_{}", suffix)).copied() {
                if let Some(row) = self.state.constraints[def_row].as_mut() {
                    row.add_term(eps, -1.0);
                }
            }

            if params.reaction_error_use_variables {
                let mut plus_gate = self.add_row(format!("FERRUP_{}", suffix), EqualityKind::LessEq, 0.0, ConstraintMeaning::ErrorBudget);
                plus_gate.add_term(eps_plus, 1.0);
                plus_gate.add_term(eps_use, -bound);
                self.state.add_constraint(plus_gate);

                let mut minus_gate = self.add_row(format!("FERRUN_{}", suffix), EqualityKind::LessEq, bound, ConstraintMeaning::ErrorBudget);
                minus_gate.add_term(eps_minus, 1.0);
                minus_gate.add_term(eps_use, bound);
                self.state.add_constraint(minus_gate);
            }
        }
    }

    fn apply_overrides(&mut self, db: &Database, params: &OptimizationParameters) -> MfaResult<()> {
        for ov in &params.exchange_overrides {
            for r in 0..db.reactions.len() {
                let reaction = &db.reactions[r];
                if !Self::is_exchange(reaction) {
                    continue;
                }
                let reactant = &reaction.reactants[0];
                if db.compounds[reactant.compound].id == ov.compound && db.compartments[reactant.compartment].id == ov.compartment {
                    if let Some(main) = reaction.vars.flux {
                        self.state.set_bound(main, ov.min_flux, ov.max_flux);
                    }
                }
            }
        }
        for id in &params.ko_reactions {
            if let Some(r) = db.find_reaction(id) {
                if let Some(main) = db.reactions[r].vars.flux {
                    self.state.set_bound(main, 0.0, 0.0);
                }
            }
        }
        // `Ternary::Default` (bare name, no `+`/`-` prefix) blocks both
        // directions; `On` ("+") blocks forward only; `Off` ("-") blocks
        // reverse only. Mirrors the dispatch already used for
        // `always_active_reactions` below.
        for (id, mode) in &params.blocked_reactions {
            let Some(r) = db.find_reaction(id) else { continue };
            let vars = db.reactions[r].vars.clone();
            let Some(main) = vars.flux else { continue };
            let (lower, upper) = (self.state.variables[main].lower, self.state.variables[main].upper);
            match mode {
                Ternary::Default => {
                    self.state.set_bound(main, 0.0, 0.0);
                    if let Some(fwd) = vars.forward_flux {
                        self.state.set_bound(fwd, 0.0, 0.0);
                    }
                    if let Some(rev) = vars.reverse_flux {
                        self.state.set_bound(rev, 0.0, 0.0);
                    }
                }
                Ternary::On => {
                    self.state.set_bound(main, lower.min(0.0), 0.0);
                    if let Some(fwd) = vars.forward_flux {
                        self.state.set_bound(fwd, 0.0, 0.0);
                    }
                }
                Ternary::Off => {
                    self.state.set_bound(main, 0.0, upper.max(0.0));
                    if let Some(rev) = vars.reverse_flux {
                        self.state.set_bound(rev, 0.0, 0.0);
                    }
                }
            }
        }
        for id in &params.ko_genes {
            if let Some(g) = db.find_gene(id) {
                if let Some(use_var) = db.genes[g].use_var {
                    self.state.set_bound(use_var, 0.0, 0.0);
                }
            }
        }
        for (id, mode) in &params.always_active_reactions {
            let Some(r) = db.find_reaction(id) else { continue };
            let Some(use_var) = db.reactions[r].vars.reaction_use else { continue };
            match mode {
                Ternary::Default => {}
                Ternary::On => self.state.set_bound(use_var, 1.0, 1.0),
                Ternary::Off => self.state.set_bound(use_var, 0.0, 0.0),
            }
        }
        for ub in &params.user_bounds {
            let idx = self
                .resolve_name(&ub.variable)
                .ok_or_else(|| MfaError::UnknownEntity { kind: "variable", id: ub.variable.clone() })?;
            self.state.set_bound(idx, ub.lower, ub.upper);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::compartment::Compartment;
    use crate::domain::compound::Compound;
    use crate::domain::reaction::{Directionality, Reaction};

    fn two_reaction_network() -> Database {
        let mut db = Database::new();
        db.add_compartment(Compartment::default_compartment());
        db.add_compound(Compound::new("A", 0, 0.0, 1.0));
        db.add_compound(Compound::new("B", 0, 0.0, 1.0));
        db.compounds[0].add_compartment(0);
        db.compounds[1].add_compartment(0);

        let mut r1 = Reaction::new("R1", 0, Directionality::Forward);
        r1.add_reactant(0, -1.0, 0, false);
        r1.add_reactant(1, 1.0, 0, false);
        db.add_reaction(r1);

        let mut ex_a = Reaction::new("EX_A", 0, Directionality::Reversible);
        ex_a.add_reactant(0, -1.0, 0, false);
        db.add_reaction(ex_a);

        let mut ex_b = Reaction::new("EX_B", 0, Directionality::Reversible);
        ex_b.add_reactant(1, -1.0, 0, false);
        db.add_reaction(ex_b);
        db
    }

    #[test]
    fn exchange_reactions_get_drain_tagged_variables() {
        let mut db = two_reaction_network();
        let params = OptimizationParameters::default();
        let builder = ProblemBuilder::build(&mut db, &params, &Tolerances::default()).unwrap();
        let ex_a_flux = db.reactions[1].vars.flux.unwrap();
        assert_eq!(builder.state.variables[ex_a_flux].var_type, VariableType::DrainFlux);
    }

    #[test]
    fn mass_balance_row_emitted_per_compound_compartment() {
        let mut db = two_reaction_network();
        let params = OptimizationParameters::default();
        let builder = ProblemBuilder::build(&mut db, &params, &Tolerances::default()).unwrap();
        assert!(builder.state.constraint_index.contains_key("BAL_A_c"));
        assert!(builder.state.constraint_index.contains_key("BAL_B_c"));
    }

    #[test]
    fn objective_resolves_exchange_b_and_building_succeeds() {
        let mut db = two_reaction_network();
        let params = OptimizationParameters::default();
        let mut builder = ProblemBuilder::build(&mut db, &params, &Tolerances::default()).unwrap();
        builder
            .set_objective(&ObjectiveSpec::Single { object: ObjectRef::Reaction(2), var_type: VariableType::DrainFlux }, true)
            .unwrap();
        assert_eq!(builder.state.objective.len(), 1);
        assert!(builder.state.maximize);
    }

    #[test]
    fn reactions_use_implies_use_linking_constraints() {
        let mut db = two_reaction_network();
        let mut params = OptimizationParameters { gene_constraints: true, ..Default::default() };
        params.rectify().unwrap();
        let builder = ProblemBuilder::build(&mut db, &params, &Tolerances::default()).unwrap();
        assert!(builder.state.constraint_index.keys().any(|k| k.starts_with("ULFW_") || k.starts_with("UL_")));
    }

    #[test]
    fn gene_logic_or_node_binds_reaction_use() {
        let mut db = two_reaction_network();
        let gene_logic = crate::domain::gene::GeneLogicTree::parse("g1 or g2", |n| db.find_or_add_gene(n)).unwrap();
        db.reactions[0].gene_logic = gene_logic;
        let mut params = OptimizationParameters { gene_constraints: true, ..Default::default() };
        params.rectify().unwrap();
        let builder = ProblemBuilder::build(&mut db, &params, &Tolerances::default()).unwrap();
        assert!(builder.state.constraint_index.contains_key("GLROOT_R1"));
    }

    #[test]
    fn blocked_reaction_is_pinned_to_zero() {
        let mut db = two_reaction_network();
        let mut blocked = HashMap::new();
        blocked.insert("R1".to_string(), Ternary::Default);
        let params = OptimizationParameters { blocked_reactions: blocked, ..Default::default() };
        let builder = ProblemBuilder::build(&mut db, &params, &Tolerances::default()).unwrap();
        let flux = db.reactions[0].vars.flux.unwrap();
        assert_eq!(builder.state.variables[flux].lower, 0.0);
        assert_eq!(builder.state.variables[flux].upper, 0.0);
    }

    #[test]
    fn blocked_reaction_forward_only_leaves_reverse_open() {
        let mut db = two_reaction_network();
        db.reactions[0].directionality = Directionality::Reversible;
        let mut blocked = HashMap::new();
        blocked.insert("R1".to_string(), Ternary::On);
        let params = OptimizationParameters { blocked_reactions: blocked, ..Default::default() };
        let builder = ProblemBuilder::build(&mut db, &params, &Tolerances::default()).unwrap();
        let flux = db.reactions[0].vars.flux.unwrap();
        assert_eq!(builder.state.variables[flux].upper, 0.0);
        assert!(builder.state.variables[flux].lower < 0.0);
    }

    #[test]
    fn exchange_override_widens_bounds() {
        let mut db = two_reaction_network();
        let params = OptimizationParameters {
            exchange_overrides: vec![crate::params::ExchangeOverride {
                compound: "A".to_string(),
                compartment: "c".to_string(),
                min_flux: -50.0,
                max_flux: 0.0,
            }],
            ..Default::default()
        };
        let builder = ProblemBuilder::build(&mut db, &params, &Tolerances::default()).unwrap();
        let flux = db.reactions[1].vars.flux.unwrap();
        assert_eq!(builder.state.variables[flux].lower, -50.0);
    }

    #[test]
    fn inverted_user_bound_is_reported_before_solve() {
        let mut db = two_reaction_network();
        let params = OptimizationParameters {
            user_bounds: vec![crate::params::UserBound { variable: "FLUX_R1".to_string(), lower: 5.0, upper: -5.0 }],
            ..Default::default()
        };
        let result = ProblemBuilder::build(&mut db, &params, &Tolerances::default());
        assert!(result.is_err());
    }
}
