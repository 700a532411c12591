//! SAT oracles
//!
//! The engine only needs `solve(CNF) -> SAT(model) | UNSAT`. Every call
//! receives the complete formula, so an oracle keeps no state between calls.

use super::cnf::{Cnf, Model, SatOutcome};
use thiserror::Error;
use tracing::trace;
use varisat::ExtendFormula;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct OracleError(pub String);

pub trait SatOracle {
    fn name(&self) -> &str;

    fn solve(&mut self, cnf: &Cnf) -> Result<SatOutcome, OracleError>;
}

/// Oracle backed by the varisat CDCL solver
#[derive(Debug, Clone, Copy, Default)]
pub struct VarisatOracle;

impl VarisatOracle {
    pub fn new() -> Self {
        VarisatOracle
    }
}

impl SatOracle for VarisatOracle {
    fn name(&self) -> &str {
        "varisat"
    }

    fn solve(&mut self, cnf: &Cnf) -> Result<SatOutcome, OracleError> {
        let mut solver = varisat::Solver::new();
        let mut buffer = Vec::new();
        for clause in cnf.clauses() {
            buffer.clear();
            buffer.extend(
                clause
                    .iter()
                    .map(|lit| varisat::Lit::from_dimacs(lit.to_dimacs() as isize)),
            );
            solver.add_clause(&buffer);
        }
        trace!(vars = cnf.num_vars(), clauses = cnf.num_clauses(), "varisat solve");

        match solver.solve() {
            Ok(true) => {
                let mut model = Model::new(cnf.num_vars());
                for lit in solver.model().unwrap_or_default() {
                    if lit.is_positive() {
                        model.set(lit.var().index() as u32 + 1, true);
                    }
                }
                Ok(SatOutcome::Satisfiable(model))
            }
            Ok(false) => Ok(SatOutcome::Unsatisfiable),
            Err(err) => Err(OracleError(format!("{:?}", err))),
        }
    }
}
