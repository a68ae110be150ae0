//! Arena-allocated domain database and the derived stoichiometric graph.

use crate::domain::compartment::Compartment;
use crate::domain::compound::Compound;
use crate::domain::gene::{Gene, GeneInterval};
use crate::domain::reaction::Reaction;
use std::collections::HashMap;

/// Reference to an entity stored in a [`Database`] arena, returned by the
/// neutral query interface ([`Database::get_object`]/[`Database::get_objects`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityRef {
    /// Index into `Database::compounds`.
    Compound(usize),
    /// Index into `Database::reactions`.
    Reaction(usize),
    /// Index into `Database::genes`.
    Gene(usize),
    /// Index into `Database::compartments`.
    Compartment(usize),
    /// Index into `Database::intervals`.
    Interval(usize),
}

/// Owns every domain object by arena index; back-references (reaction's
/// gene list, gene's reaction list, lump components) are plain `usize`
/// indices into these arenas, never pointers, so the whole database clones
/// and snapshots cheaply.
#[derive(Debug, Clone, Default)]
pub struct Database {
    /// Compartment arena; index 0 is conventionally the default compartment
    /// once `ensure_default_compartment` has run.
    pub compartments: Vec<Compartment>,
    /// Compound arena.
    pub compounds: Vec<Compound>,
    /// Compound id -> arena index.
    pub compound_index: HashMap<String, usize>,
    /// Reaction arena.
    pub reactions: Vec<Reaction>,
    /// Reaction id -> arena index.
    pub reaction_index: HashMap<String, usize>,
    /// Gene arena.
    pub genes: Vec<Gene>,
    /// Gene id -> arena index.
    pub gene_index: HashMap<String, usize>,
    /// Gene-interval arena.
    pub intervals: Vec<GeneInterval>,
}

impl Database {
    /// An empty database.
    pub fn new() -> Self {
        Database::default()
    }

    /// Ensure a default compartment exists, returning its index. Idempotent.
    pub fn ensure_default_compartment(&mut self) -> usize {
        if self.compartments.is_empty() {
            self.compartments.push(Compartment::default_compartment());
        }
        0
    }

    /// Insert a compartment, returning its index.
    pub fn add_compartment(&mut self, compartment: Compartment) -> usize {
        self.compartments.push(compartment);
        self.compartments.len() - 1
    }

    /// Insert a compound, returning its index. Overwrites any previous
    /// compound registered under the same id.
    pub fn add_compound(&mut self, compound: Compound) -> usize {
        let id = compound.id.clone();
        self.compounds.push(compound);
        let idx = self.compounds.len() - 1;
        self.compound_index.insert(id, idx);
        idx
    }

    /// Insert a reaction, returning its index.
    pub fn add_reaction(&mut self, reaction: Reaction) -> usize {
        let id = reaction.id.clone();
        self.reactions.push(reaction);
        let idx = self.reactions.len() - 1;
        self.reaction_index.insert(id, idx);
        idx
    }

    /// Find or create a gene by name, returning its index. This is the
    /// `resolve` callback [`crate::domain::gene::GeneLogicTree::parse`]
    /// expects.
    pub fn find_or_add_gene(&mut self, name: &str) -> usize {
        if let Some(&idx) = self.gene_index.get(name) {
            return idx;
        }
        self.genes.push(Gene::new(name));
        let idx = self.genes.len() - 1;
        self.gene_index.insert(name.to_string(), idx);
        idx
    }

    /// Insert a gene interval, returning its index.
    pub fn add_interval(&mut self, interval: GeneInterval) -> usize {
        self.intervals.push(interval);
        self.intervals.len() - 1
    }

    /// Look up a compound by stable id.
    pub fn find_compound(&self, id: &str) -> Option<usize> {
        self.compound_index.get(id).copied()
    }

    /// Look up a reaction by stable id.
    pub fn find_reaction(&self, id: &str) -> Option<usize> {
        self.reaction_index.get(id).copied()
    }

    /// Look up a gene by stable id.
    pub fn find_gene(&self, id: &str) -> Option<usize> {
        self.gene_index.get(id).copied()
    }

    /// Neutral query interface: fetch the first object in `table` whose
    /// `attribute` equals `value`.
    pub fn get_object(&self, table: &str, attribute: &str, value: &str) -> Option<EntityRef> {
        self.get_objects(table, attribute, value).into_iter().next()
    }

    /// Neutral query interface: fetch every object in `table` whose
    /// `attribute` equals `value`.
    pub fn get_objects(&self, table: &str, attribute: &str, value: &str) -> Vec<EntityRef> {
        match table {
            "compounds" if attribute == "id" => self
                .find_compound(value)
                .into_iter()
                .map(EntityRef::Compound)
                .collect(),
            "reactions" if attribute == "id" => self
                .find_reaction(value)
                .into_iter()
                .map(EntityRef::Reaction)
                .collect(),
            "genes" if attribute == "id" => self.find_gene(value).into_iter().map(EntityRef::Gene).collect(),
            "compartments" if attribute == "id" => self
                .compartments
                .iter()
                .position(|c| c.id == value)
                .into_iter()
                .map(EntityRef::Compartment)
                .collect(),
            "reactions" if attribute == "gene" => self
                .find_gene(value)
                .map(|g| self.genes[g].reactions.iter().copied().map(EntityRef::Reaction).collect())
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }
}

/// One edge of the derived bipartite compound/reaction multigraph. Never
/// stored; recomputed on demand.
#[derive(Debug, Clone, Copy)]
pub struct StoichEdge {
    /// Compound endpoint.
    pub compound: usize,
    /// Reaction endpoint.
    pub reaction: usize,
    /// Compartment the occurrence is in.
    pub compartment: usize,
    /// Signed stoichiometric coefficient.
    pub coefficient: f64,
}

/// The bipartite compound x reaction multigraph with signed coefficients.
/// Derived on demand, never persisted.
#[derive(Debug, Clone, Default)]
pub struct StoichiometricGraph {
    /// Every (compound, reaction) occurrence as one edge.
    pub edges: Vec<StoichEdge>,
}

impl StoichiometricGraph {
    /// Derive the graph from the current reaction set.
    pub fn derive(db: &Database) -> Self {
        let mut edges = Vec::new();
        for (ridx, reaction) in db.reactions.iter().enumerate() {
            for r in &reaction.reactants {
                edges.push(StoichEdge {
                    compound: r.compound,
                    reaction: ridx,
                    compartment: r.compartment,
                    coefficient: r.coefficient,
                });
            }
        }
        StoichiometricGraph { edges }
    }

    /// All edges touching `(compound, compartment)`.
    pub fn edges_for_compound(&self, compound: usize, compartment: usize) -> impl Iterator<Item = &StoichEdge> {
        self.edges
            .iter()
            .filter(move |e| e.compound == compound && e.compartment == compartment)
    }

    /// Every distinct `(compound, compartment)` pair that appears in at
    /// least one reaction — the set the builder must emit a mass-balance
    /// row for.
    pub fn compound_compartment_pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs: Vec<(usize, usize)> = self.edges.iter().map(|e| (e.compound, e.compartment)).collect();
        pairs.sort_unstable();
        pairs.dedup();
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reaction::Directionality;

    fn toy_db() -> Database {
        let mut db = Database::new();
        db.ensure_default_compartment();
        db.add_compound(Compound::new("A", 0, 0.0, 1.0));
        db.add_compound(Compound::new("B", 0, 0.0, 1.0));
        let mut r = Reaction::new("R1", 0, Directionality::Forward);
        r.add_reactant(0, -1.0, 0, false);
        r.add_reactant(1, 1.0, 0, false);
        db.add_reaction(r);
        db
    }

    #[test]
    fn lookup_roundtrips() {
        let db = toy_db();
        assert_eq!(db.find_compound("A"), Some(0));
        assert_eq!(db.find_reaction("R1"), Some(0));
        assert_eq!(db.get_object("compounds", "id", "A"), Some(EntityRef::Compound(0)));
    }

    #[test]
    fn graph_derives_one_edge_per_reactant() {
        let db = toy_db();
        let graph = StoichiometricGraph::derive(&db);
        assert_eq!(graph.edges.len(), 2);
        assert_eq!(graph.compound_compartment_pairs().len(), 2);
    }

    #[test]
    fn find_or_add_gene_is_idempotent() {
        let mut db = Database::new();
        let a = db.find_or_add_gene("g1");
        let b = db.find_or_add_gene("g1");
        assert_eq!(a, b);
        assert_eq!(db.genes.len(), 1);
    }
}
