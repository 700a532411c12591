//! Propositional formulas in conjunctive normal form

use std::ops::Not;

/// A literal in DIMACS convention: variable `v ≥ 1` is `v`, its negation `-v`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Lit(i32);

impl Lit {
    pub fn positive(var: u32) -> Self {
        debug_assert!(var > 0);
        Lit(var as i32)
    }

    pub fn negative(var: u32) -> Self {
        debug_assert!(var > 0);
        Lit(-(var as i32))
    }

    pub fn from_dimacs(value: i32) -> Self {
        debug_assert!(value != 0);
        Lit(value)
    }

    pub fn to_dimacs(self) -> i32 {
        self.0
    }

    pub fn var(self) -> u32 {
        self.0.unsigned_abs()
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl Not for Lit {
    type Output = Lit;

    fn not(self) -> Lit {
        Lit(-self.0)
    }
}

pub type Clause = Vec<Lit>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cnf {
    num_vars: u32,
    clauses: Vec<Clause>,
}

impl Cnf {
    pub fn new() -> Self {
        Cnf::default()
    }

    /// Allocate a fresh variable and return its positive literal
    pub fn new_var(&mut self) -> Lit {
        self.num_vars += 1;
        Lit::positive(self.num_vars)
    }

    pub fn add_clause(&mut self, clause: &[Lit]) {
        debug_assert!(clause.iter().all(|lit| lit.var() <= self.num_vars));
        self.clauses.push(clause.to_vec());
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn num_vars(&self) -> u32 {
        self.num_vars
    }

    pub fn num_clauses(&self) -> usize {
        self.clauses.len()
    }
}

/// Truth values of all variables of a formula
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    /// Indexed by variable, slot 0 unused
    values: Vec<bool>,
}

impl Model {
    /// All variables false
    pub fn new(num_vars: u32) -> Self {
        Model {
            values: vec![false; num_vars as usize + 1],
        }
    }

    pub fn set(&mut self, var: u32, value: bool) {
        let index = var as usize;
        if index >= self.values.len() {
            self.values.resize(index + 1, false);
        }
        self.values[index] = value;
    }

    /// Unknown variables count as false
    pub fn value(&self, lit: Lit) -> bool {
        let value = self.values.get(lit.var() as usize).copied().unwrap_or(false);
        value == lit.is_positive()
    }

    pub fn satisfies(&self, cnf: &Cnf) -> bool {
        cnf.clauses()
            .iter()
            .all(|clause| clause.iter().any(|&lit| self.value(lit)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SatOutcome {
    Satisfiable(Model),
    Unsatisfiable,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literals() {
        let x = Lit::positive(3);
        assert_eq!(x.to_dimacs(), 3);
        assert_eq!((!x).to_dimacs(), -3);
        assert_eq!((!x).var(), 3);
        assert!(x.is_positive() && !(!x).is_positive());
        assert_eq!(Lit::from_dimacs(-3), !x);
    }

    #[test]
    fn test_model_evaluation() {
        let mut cnf = Cnf::new();
        let a = cnf.new_var();
        let b = cnf.new_var();
        cnf.add_clause(&[a, b]);
        cnf.add_clause(&[!a]);

        let mut model = Model::new(cnf.num_vars());
        assert!(!model.satisfies(&cnf));
        model.set(b.var(), true);
        assert!(model.satisfies(&cnf));
        assert!(model.value(!a));
        assert!(!model.value(Lit::positive(9)));
    }
}
