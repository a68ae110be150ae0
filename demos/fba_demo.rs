//! Builds the two-reaction network from scenario S1 (A -> B, exchanges for
//! both ends, objective maximizing export of B) and runs a single FBA solve
//! against it, logging through `log4rs` the way a driver binary would.

use mfa_core::domain::reaction::Directionality;
use mfa_core::domain::{Compound, Database, Reaction};
use mfa_core::params::OptimizationParameters;
use mfa_core::{Command, CommandOutcome, Session};
use std::collections::HashMap;

/// Builds the network and also returns the index of `EX_B`, the reaction
/// whose flux the demo maximizes, since that index is only assigned once
/// the problem is built and the caller needs it to set the objective.
fn build_two_reaction_network() -> (Database, usize) {
    let mut db = Database::new();
    db.ensure_default_compartment();
    db.add_compound(Compound::new("A", 0, 0.0, 1.0));
    db.add_compound(Compound::new("B", 0, 0.0, 1.0));

    let mut r1 = Reaction::new("R1", 0, Directionality::Forward);
    r1.add_reactant(0, -1.0, 0, false);
    r1.add_reactant(1, 1.0, 0, false);
    db.add_reaction(r1);

    let mut ex_a = Reaction::new("EX_A", 0, Directionality::Reversible);
    ex_a.add_reactant(0, -1.0, 0, false);
    db.add_reaction(ex_a);

    let mut ex_b = Reaction::new("EX_B", 0, Directionality::Forward);
    ex_b.add_reactant(1, -1.0, 0, false);
    let ex_b_idx = db.add_reaction(ex_b);

    (db, ex_b_idx)
}

fn main() {
    if let Err(e) = log4rs::init_file("log4rs.yml", Default::default()) {
        eprintln!("log4rs.yml not found, logging to stderr only: {}", e);
    }

    let (db, ex_b_idx) = build_two_reaction_network();
    let mut params = OptimizationParameters::default();
    params.mass_balance_constraints = true;
    params.reactions_use = true;

    let mut session = Session::new(db);
    session
        .run(&Command::LoadCentralSystem { params: Box::new(params) })
        .expect("session setup should not fail for a well-formed network");

    let ex_b_flux = session.ctx.db.reactions[ex_b_idx].vars.flux.expect("EX_B should have a flux variable after build");
    let mut objective = HashMap::new();
    objective.insert(ex_b_flux, 1.0);
    session.state.as_mut().expect("LoadCentralSystem just ran").set_objective(objective, true);

    let result = session.run(&Command::RunFba).expect("RunFba should not fail once a problem is loaded");
    if let CommandOutcome::Fba(result) = result {
        log::info!("FBA status: {:?}, objective: {}", result.status, result.objective_value);
        println!("status = {:?}", result.status);
        println!("objective = {}", result.objective_value);
    }
}
