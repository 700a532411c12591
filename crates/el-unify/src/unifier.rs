//! Unifiers and their semantics
//!
//! A [`Unifier`] maps every variable of a goal to a flat conjunction of
//! non-variable atoms. The induced substitution is acyclic, so expanding a
//! variable terminates in a variable-free [`NormalConcept`].

use crate::atoms::{Atom, AtomId, AtomManager};
use crate::goal::{Conjunction, Goal, NegativeConstraint};
use crate::normal::NormalConcept;
use std::collections::{BTreeMap, HashMap};

/// `variable ↦ conjunction`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Definition {
    pub variable: AtomId,
    pub conjunction: Conjunction,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Unifier {
    /// One per goal variable, ordered by variable id
    definitions: Vec<Definition>,
}

/// Expanded values of all user variables. Two unifiers with equal keys are
/// equivalent modulo non-user variables.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnifierKey(Vec<(AtomId, NormalConcept)>);

impl Unifier {
    /// Translate a subsumer assignment into a unifier.
    ///
    /// Variables without subsumers are mapped to `⊤`. Atoms implied by
    /// another atom of the same conjunction are dropped.
    pub(crate) fn from_assignment(goal: &Goal, subsumers: &BTreeMap<AtomId, Conjunction>) -> Self {
        let raw = Unifier {
            definitions: goal
                .variables()
                .into_iter()
                .map(|variable| Definition {
                    variable,
                    conjunction: subsumers.get(&variable).cloned().unwrap_or_default(),
                })
                .collect(),
        };

        let mut expander = Expander::new(&raw, goal.atoms());
        let definitions = raw
            .definitions
            .iter()
            .map(|def| {
                let expanded: Vec<(AtomId, NormalConcept)> = def
                    .conjunction
                    .iter()
                    .map(|&atom| (atom, expander.atom(atom)))
                    .collect();
                let conjunction = expanded
                    .iter()
                    .filter(|(atom, value)| {
                        !expanded.iter().any(|(other, other_value)| {
                            other != atom
                                && other_value.is_subsumed_by(value)
                                && !(value.is_subsumed_by(other_value) && atom < other)
                        })
                    })
                    .map(|(atom, _)| *atom)
                    .collect();
                Definition {
                    variable: def.variable,
                    conjunction,
                }
            })
            .collect();
        Unifier { definitions }
    }

    pub fn definitions(&self) -> &[Definition] {
        &self.definitions
    }

    pub fn definition(&self, variable: AtomId) -> Option<&Definition> {
        self.definitions
            .binary_search_by_key(&variable, |def| def.variable)
            .ok()
            .map(|index| &self.definitions[index])
    }

    /// `σ(atom)` as a variable-free normal form
    pub fn expand(&self, atom: AtomId, atoms: &AtomManager) -> NormalConcept {
        Expander::new(self, atoms).atom(atom)
    }

    /// `σ(C1 ⊓ … ⊓ Cn)` as a variable-free normal form
    pub fn expand_conjunction(&self, conjunction: &Conjunction, atoms: &AtomManager) -> NormalConcept {
        Expander::new(self, atoms).conjunction(conjunction)
    }

    /// Check every positive constraint of the goal under this unifier.
    pub fn solves_positive(&self, goal: &Goal) -> bool {
        let mut expander = Expander::new(self, goal.atoms());
        goal.positive_subsumptions().iter().all(|sub| {
            let body = expander.conjunction(&sub.body);
            let head = expander.atom(sub.head);
            body.is_subsumed_by(&head)
        })
    }

    /// Check that no disequation or dissubsumption holds under this unifier.
    pub fn violates_no_negative(&self, goal: &Goal) -> bool {
        let mut expander = Expander::new(self, goal.atoms());
        goal.negative_constraints().all(|constraint| match constraint {
            NegativeConstraint::Disequation(d) => {
                let left = expander.conjunction(&d.left);
                let right = expander.conjunction(&d.right);
                !left.is_equivalent(&right)
            }
            NegativeConstraint::Dissubsumption(d) => {
                let body = expander.conjunction(&d.body);
                let head = expander.conjunction(&d.head);
                !body.is_subsumed_by(&head)
            }
        })
    }

    /// Soundness check: all positive constraints hold, all negative ones fail.
    pub fn satisfies(&self, goal: &Goal) -> bool {
        self.solves_positive(goal) && self.violates_no_negative(goal)
    }

    pub fn user_key(&self, goal: &Goal) -> UnifierKey {
        let mut expander = Expander::new(self, goal.atoms());
        UnifierKey(
            goal.user_variables()
                .into_iter()
                .map(|var| (var, expander.atom(var)))
                .collect(),
        )
    }
}

/// Memoizing substitution of definitions into atoms
struct Expander<'u> {
    unifier: &'u Unifier,
    atoms: &'u AtomManager,
    cache: HashMap<AtomId, NormalConcept>,
}

impl<'u> Expander<'u> {
    fn new(unifier: &'u Unifier, atoms: &'u AtomManager) -> Self {
        Expander {
            unifier,
            atoms,
            cache: HashMap::new(),
        }
    }

    fn conjunction(&mut self, conjunction: &Conjunction) -> NormalConcept {
        let parts: Vec<NormalConcept> = conjunction.iter().map(|&atom| self.atom(atom)).collect();
        NormalConcept::conjunction(parts)
    }

    fn atom(&mut self, atom: AtomId) -> NormalConcept {
        if let Some(value) = self.cache.get(&atom) {
            return value.clone();
        }
        let value = match self.atoms.get(atom) {
            Atom::ConceptName(_) if self.atoms.is_variable(atom) => {
                match self.unifier.definition(atom) {
                    Some(def) => {
                        let conjunction = def.conjunction.clone();
                        self.conjunction(&conjunction)
                    }
                    None => NormalConcept::name(atom),
                }
            }
            Atom::ConceptName(_) => NormalConcept::name(atom),
            Atom::Existential { role, filler } => NormalConcept::exists(role, self.atom(filler)),
        };
        self.cache.insert(atom, value.clone());
        value
    }
}
