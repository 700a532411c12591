//! Reduction of a flat goal to propositional logic
//!
//! Propositional variables:
//! - `s(X,D)`: the non-variable atom `D` is among the subsumers of `X`
//! - `sub(a,b)`: `σ(a) ⊑ σ(b)` under the substitution read off the `s` literals
//! - `ord(X,Y)`: `Y` occurs in the value of `X`, used to forbid cycles
//! - auxiliary witnesses for quantified definitions
//!
//! `sub` literals are allocated on demand. Every newly allocated pair is
//! queued and later defined by clauses that may allocate further pairs. The
//! closure is finite because there are only `|atoms|²` pairs.

use super::cnf::{Cnf, Lit, Model};
use crate::atoms::{Atom, AtomId, AtomManager};
use crate::goal::{Conjunction, Goal, NegativeConstraint};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Key {
    Subsumer { var: AtomId, atom: AtomId },
    Subsumption { sub: AtomId, sup: AtomId },
    Order { from: AtomId, to: AtomId },
}

/// `s(variable, atom)` and whether the variable is a user variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubsumerLiteral {
    pub variable: AtomId,
    pub atom: AtomId,
    pub lit: Lit,
    pub user: bool,
}

/// The formula of a goal plus what is needed to read models back.
#[derive(Debug, Clone)]
pub struct Encoding {
    cnf: Cnf,
    subsumers: Vec<SubsumerLiteral>,
    subsumption_literals: usize,
}

impl Encoding {
    pub fn encode(goal: &Goal) -> Encoding {
        Encoder::new(goal).run()
    }

    pub fn cnf(&self) -> &Cnf {
        &self.cnf
    }

    pub fn add_clause(&mut self, clause: &[Lit]) {
        self.cnf.add_clause(clause);
    }

    /// All `s` literals, ordered by variable then atom
    pub fn subsumer_literals(&self) -> &[SubsumerLiteral] {
        &self.subsumers
    }

    pub fn subsumption_literals(&self) -> usize {
        self.subsumption_literals
    }

    /// The subsumer sets a model selects
    pub fn decode(&self, model: &Model) -> BTreeMap<AtomId, Conjunction> {
        let mut assignment: BTreeMap<AtomId, Conjunction> = BTreeMap::new();
        for s in &self.subsumers {
            if model.value(s.lit) {
                assignment.entry(s.variable).or_default().insert(s.atom);
            }
        }
        assignment
    }
}

struct Encoder<'g> {
    goal: &'g Goal,
    atoms: &'g AtomManager,
    variables: Vec<AtomId>,
    non_variables: Vec<AtomId>,
    cnf: Cnf,
    literals: HashMap<Key, Lit>,
    pending: Vec<(AtomId, AtomId)>,
    subsumption_literals: usize,
}

impl<'g> Encoder<'g> {
    fn new(goal: &'g Goal) -> Self {
        Encoder {
            goal,
            atoms: goal.atoms(),
            variables: goal.variables().into_iter().collect(),
            non_variables: goal.non_variable_atoms().into_iter().collect(),
            cnf: Cnf::new(),
            literals: HashMap::new(),
            pending: Vec::new(),
            subsumption_literals: 0,
        }
    }

    fn run(mut self) -> Encoding {
        // s literals first so that they get the lowest numbers
        let mut subsumers = Vec::with_capacity(self.variables.len() * self.non_variables.len());
        for &variable in &self.variables.clone() {
            let user = self.atoms.is_user_variable(variable);
            for &atom in &self.non_variables.clone() {
                let lit = self.subsumer(variable, atom);
                subsumers.push(SubsumerLiteral {
                    variable,
                    atom,
                    lit,
                    user,
                });
            }
        }

        self.encode_positive();
        self.encode_negative();
        while let Some((a, b)) = self.pending.pop() {
            self.define_subsumption(a, b);
        }
        self.encode_acyclicity();

        debug!(
            vars = self.cnf.num_vars(),
            clauses = self.cnf.num_clauses(),
            subsumption_literals = self.subsumption_literals,
            "goal encoded"
        );
        Encoding {
            cnf: self.cnf,
            subsumers,
            subsumption_literals: self.subsumption_literals,
        }
    }

    fn literal(&mut self, key: Key) -> (Lit, bool) {
        if let Some(&lit) = self.literals.get(&key) {
            return (lit, false);
        }
        let lit = self.cnf.new_var();
        self.literals.insert(key, lit);
        (lit, true)
    }

    fn subsumer(&mut self, var: AtomId, atom: AtomId) -> Lit {
        self.literal(Key::Subsumer { var, atom }).0
    }

    fn order(&mut self, from: AtomId, to: AtomId) -> Lit {
        self.literal(Key::Order { from, to }).0
    }

    /// `sub(a,b)`, queued for definition when new
    fn subsumption(&mut self, sub: AtomId, sup: AtomId) -> Lit {
        let (lit, fresh) = self.literal(Key::Subsumption { sub, sup });
        if fresh {
            self.subsumption_literals += 1;
            self.pending.push((sub, sup));
        }
        lit
    }

    fn clause(&mut self, clause: &[Lit]) {
        self.cnf.add_clause(clause);
    }

    /// A conjunction is subsumed by a non-variable atom iff one of its
    /// conjuncts is.
    fn some_conjunct_below(&mut self, body: &Conjunction, atom: AtomId) -> Vec<Lit> {
        body.iter().map(|&c| self.subsumption(c, atom)).collect()
    }

    fn encode_positive(&mut self) {
        for sub in self.goal.positive_subsumptions() {
            if sub.body.contains(&sub.head) {
                continue;
            }
            if self.atoms.is_variable(sub.head) {
                // C ⊑ Y iff C ⊑ E for every E ∈ S_Y
                for &e in &self.non_variables.clone() {
                    let mut clause = vec![!self.subsumer(sub.head, e)];
                    clause.extend(self.some_conjunct_below(&sub.body, e));
                    self.clause(&clause);
                }
            } else {
                let clause = self.some_conjunct_below(&sub.body, sub.head);
                self.clause(&clause);
            }
        }
    }

    fn encode_negative(&mut self) {
        let goal = self.goal;
        for constraint in goal.negative_constraints() {
            match constraint {
                NegativeConstraint::Dissubsumption(d) => {
                    let n = self.not_subsumed(&d.body, &d.head);
                    self.clause(&[n]);
                }
                NegativeConstraint::Disequation(d) => {
                    let left = self.not_subsumed(&d.left, &d.right);
                    let right = self.not_subsumed(&d.right, &d.left);
                    self.clause(&[left, right]);
                }
            }
        }
    }

    /// A literal that implies `σ(body) ⋢ σ(head)`.
    fn not_subsumed(&mut self, body: &Conjunction, head: &Conjunction) -> Lit {
        let n = self.cnf.new_var();
        let mut witnesses = vec![!n];
        for &d in head {
            let w = self.cnf.new_var();
            witnesses.push(w);
            if self.atoms.is_variable(d) {
                // some E ∈ S_d is not above the body
                let mut options = vec![!w];
                for &e in &self.non_variables.clone() {
                    let m = self.cnf.new_var();
                    options.push(m);
                    let s = self.subsumer(d, e);
                    self.clause(&[!m, s]);
                    for c in self.some_conjunct_below(body, e) {
                        self.clause(&[!m, !c]);
                    }
                }
                self.clause(&options);
            } else {
                for c in self.some_conjunct_below(body, d) {
                    self.clause(&[!w, !c]);
                }
            }
        }
        self.clause(&witnesses);
        n
    }

    fn define_subsumption(&mut self, a: AtomId, b: AtomId) {
        let lit = self.subsumption(a, b);
        if a == b {
            self.clause(&[lit]);
            return;
        }
        let non_variables = self.non_variables.clone();

        if self.atoms.is_variable(b) {
            // sub(a,Y) ⟺ ∧_E (s(Y,E) → sub(a,E))
            let mut witnesses = vec![lit];
            for &e in &non_variables {
                let s = self.subsumer(b, e);
                let below = self.subsumption(a, e);
                self.clause(&[!lit, !s, below]);
                let w = self.cnf.new_var();
                self.clause(&[!w, s]);
                self.clause(&[!w, !below]);
                witnesses.push(w);
            }
            self.clause(&witnesses);
        } else if self.atoms.is_variable(a) {
            // sub(X,b) ⟺ ∨_F (s(X,F) ∧ sub(F,b))
            let mut witnesses = vec![!lit];
            for &f in &non_variables {
                let s = self.subsumer(a, f);
                let below = self.subsumption(f, b);
                self.clause(&[!s, !below, lit]);
                let u = self.cnf.new_var();
                self.clause(&[!u, s]);
                self.clause(&[!u, below]);
                witnesses.push(u);
            }
            self.clause(&witnesses);
        } else {
            match (self.atoms.get(a), self.atoms.get(b)) {
                (
                    Atom::Existential { role: r, filler: x },
                    Atom::Existential { role: s, filler: y },
                ) if r == s => {
                    let inner = self.subsumption(x, y);
                    self.clause(&[!lit, inner]);
                    self.clause(&[lit, !inner]);
                }
                // distinct constants, a constant and a restriction, or
                // restrictions over different roles
                _ => self.clause(&[!lit]),
            }
        }
    }

    /// `s(X,∃r.Y) → ord(X,Y)`, `ord` transitive and irreflexive.
    ///
    /// Only variables occurring as fillers can lie on a cycle.
    fn encode_acyclicity(&mut self) {
        let fillers: BTreeSet<AtomId> = self
            .non_variables
            .iter()
            .filter_map(|&e| self.atoms.as_existential(e))
            .map(|(_, filler)| filler)
            .filter(|&filler| self.atoms.is_variable(filler))
            .collect();
        if fillers.is_empty() {
            return;
        }
        for &x in &fillers {
            for &e in &self.non_variables.clone() {
                if let Some((_, y)) = self.atoms.as_existential(e) {
                    if fillers.contains(&y) {
                        let s = self.subsumer(x, e);
                        let o = self.order(x, y);
                        self.clause(&[!s, o]);
                    }
                }
            }
        }
        for &x in &fillers {
            let o = self.order(x, x);
            self.clause(&[!o]);
            for &y in &fillers {
                for &z in &fillers {
                    let xy = self.order(x, y);
                    let yz = self.order(y, z);
                    let xz = self.order(x, z);
                    self.clause(&[!xy, !yz, xz]);
                }
            }
        }
    }
}
