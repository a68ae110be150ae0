//! The domain model: Compound, Reaction, Gene, Compartment, the gene-logic
//! tree, and the arena that owns them all.

pub mod compartment;
pub mod compound;
pub mod database;
pub mod gene;
pub mod reaction;

pub use compartment::Compartment;
pub use compound::{Compound, CompoundCompartmentRecord, PkaSite};
pub use database::{Database, EntityRef, StoichEdge, StoichiometricGraph};
pub use gene::{Gene, GeneInterval, GeneLogic, GeneLogicNode, GeneLogicTree};
pub use reaction::{Directionality, Reaction, ReactantRecord, ReactionVars};
