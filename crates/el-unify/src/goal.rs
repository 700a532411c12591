//! The flat unification goal
//!
//! A [`Goal`] owns the [`AtomManager`] and every flat constraint produced by
//! the flattener. After construction only the classification of concept
//! names may change, through [`Goal::make_user_variable`] and
//! [`Goal::make_constant`]. The engines borrow the goal immutably.

use crate::atoms::{Atom, AtomId, AtomManager, ConceptKind};
use crate::error::{Result, UnifyError};
use crate::normal::NormalConcept;
use indexmap::IndexSet;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Flat conjunction of atoms
pub type Conjunction = BTreeSet<AtomId>;

/// `left ≡ right`, the right side read as a conjunction
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Equation {
    pub left: AtomId,
    pub right: Conjunction,
    /// Imported from a primitive (subsumption-only) definition
    pub primitive: bool,
}

/// `body ⊑ head`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subsumption {
    pub body: Conjunction,
    pub head: Conjunction,
}

/// `left ≢ right`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Disequation {
    pub left: Conjunction,
    pub right: Conjunction,
}

/// `body ⋢ head`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dissubsumption {
    pub body: Conjunction,
    pub head: Conjunction,
}

/// A constraint no accepted unifier may satisfy
#[derive(Debug, Clone, Copy)]
pub enum NegativeConstraint<'a> {
    Disequation(&'a Disequation),
    Dissubsumption(&'a Dissubsumption),
}

/// Flat subsumption with a single head atom, the unit both engines work on
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlatSubsumption {
    pub body: Conjunction,
    pub head: AtomId,
}

#[derive(Debug, Clone)]
pub struct Goal {
    pub(crate) atoms: AtomManager,
    /// Imported background definitions, in import order
    pub(crate) definitions: Vec<Equation>,
    /// Definitions of auxiliary variables introduced by flattening
    pub(crate) auxiliary: Vec<Equation>,
    pub(crate) equations: Vec<Equation>,
    pub(crate) subsumptions: Vec<Subsumption>,
    pub(crate) disequations: Vec<Disequation>,
    pub(crate) dissubsumptions: Vec<Dissubsumption>,
}

impl Goal {
    pub fn atoms(&self) -> &AtomManager {
        &self.atoms
    }

    pub fn definitions(&self) -> &[Equation] {
        &self.definitions
    }

    pub fn auxiliary_equations(&self) -> &[Equation] {
        &self.auxiliary
    }

    /// Equations added by the caller, after flattening
    pub fn goal_equations(&self) -> &[Equation] {
        &self.equations
    }

    /// Definitions, auxiliary equations and goal equations, in that order
    pub fn equations(&self) -> impl Iterator<Item = &Equation> {
        self.definitions
            .iter()
            .chain(self.auxiliary.iter())
            .chain(self.equations.iter())
    }

    pub fn subsumptions(&self) -> &[Subsumption] {
        &self.subsumptions
    }

    pub fn disequations(&self) -> &[Disequation] {
        &self.disequations
    }

    pub fn dissubsumptions(&self) -> &[Dissubsumption] {
        &self.dissubsumptions
    }

    pub fn negative_constraints(&self) -> impl Iterator<Item = NegativeConstraint<'_>> {
        self.disequations
            .iter()
            .map(NegativeConstraint::Disequation)
            .chain(self.dissubsumptions.iter().map(NegativeConstraint::Dissubsumption))
    }

    pub fn has_negative_constraints(&self) -> bool {
        !self.disequations.is_empty() || !self.dissubsumptions.is_empty()
    }

    /// All positive constraints as flat subsumptions with a single head atom.
    ///
    /// An equation `L ≡ C1 ⊓ … ⊓ Cn` contributes `C1 ⊓ … ⊓ Cn ⊑ L` and
    /// `L ⊑ Ci` for each `i`. Duplicates are dropped, first occurrence wins.
    pub fn positive_subsumptions(&self) -> Vec<FlatSubsumption> {
        let mut result = IndexSet::new();
        for eq in self.equations() {
            result.insert(FlatSubsumption {
                body: eq.right.clone(),
                head: eq.left,
            });
            for &atom in &eq.right {
                result.insert(FlatSubsumption {
                    body: BTreeSet::from([eq.left]),
                    head: atom,
                });
            }
        }
        for sub in &self.subsumptions {
            for &atom in &sub.head {
                result.insert(FlatSubsumption {
                    body: sub.body.clone(),
                    head: atom,
                });
            }
        }
        result.into_iter().collect()
    }

    fn kinds(&self, pred: impl Fn(ConceptKind) -> bool) -> BTreeSet<AtomId> {
        self.atoms
            .ids()
            .filter(|&id| self.atoms.kind(id).is_some_and(&pred))
            .collect()
    }

    pub fn variables(&self) -> BTreeSet<AtomId> {
        self.kinds(ConceptKind::is_variable)
    }

    pub fn user_variables(&self) -> BTreeSet<AtomId> {
        self.kinds(|k| k == ConceptKind::UserVariable)
    }

    pub fn definition_variables(&self) -> BTreeSet<AtomId> {
        self.kinds(|k| k == ConceptKind::DefinitionVariable)
    }

    pub fn auxiliary_variables(&self) -> BTreeSet<AtomId> {
        self.kinds(|k| k == ConceptKind::AuxiliaryVariable)
    }

    pub fn constants(&self) -> BTreeSet<AtomId> {
        self.kinds(|k| k == ConceptKind::Constant)
    }

    pub fn existentials(&self) -> BTreeSet<AtomId> {
        self.atoms
            .ids()
            .filter(|&id| self.atoms.is_existential(id))
            .collect()
    }

    /// Constants and existential restrictions, the candidate subsumers of
    /// every variable
    pub fn non_variable_atoms(&self) -> BTreeSet<AtomId> {
        self.atoms
            .ids()
            .filter(|&id| !self.atoms.is_variable(id))
            .collect()
    }

    fn reclassification_error(&self, id: AtomId, reason: &str) -> UnifyError {
        UnifyError::Reclassification {
            atom: self.atoms.display(id),
            reason: reason.to_string(),
        }
    }

    /// Turn a constant or definition variable into a user variable.
    pub fn make_user_variable(&mut self, id: AtomId) -> Result<()> {
        match self.atoms.kind(id) {
            None => Err(self.reclassification_error(id, "existential restrictions cannot be variables")),
            Some(ConceptKind::AuxiliaryVariable) => {
                Err(self.reclassification_error(id, "auxiliary variables are internal"))
            }
            Some(ConceptKind::UserVariable) => Ok(()),
            Some(ConceptKind::Constant) | Some(ConceptKind::DefinitionVariable) => {
                debug!(atom = %self.atoms.display(id), "make user variable");
                self.atoms.set_kind(id, ConceptKind::UserVariable);
                Ok(())
            }
        }
    }

    /// Turn a user or definition variable back into a constant.
    pub fn make_constant(&mut self, id: AtomId) -> Result<()> {
        match self.atoms.kind(id) {
            None => Err(self.reclassification_error(id, "existential restrictions are not concept names")),
            Some(ConceptKind::AuxiliaryVariable) => {
                Err(self.reclassification_error(id, "auxiliary variables are internal"))
            }
            Some(ConceptKind::Constant) => Ok(()),
            Some(ConceptKind::UserVariable) | Some(ConceptKind::DefinitionVariable) => {
                debug!(atom = %self.atoms.display(id), "make constant");
                self.atoms.set_kind(id, ConceptKind::Constant);
                Ok(())
            }
        }
    }

    /// [`Goal::make_user_variable`] by concept name
    pub fn make_user_variable_named(&mut self, name: &str) -> Result<AtomId> {
        let id = self
            .atoms
            .find_concept_name(name)
            .ok_or_else(|| UnifyError::UnknownConcept(name.to_string()))?;
        self.make_user_variable(id)?;
        Ok(id)
    }

    /// Substitute auxiliary variables by their flattening definitions.
    ///
    /// All other concept names stay as they are, so the result is the
    /// original nested concept in normal form.
    pub fn unfold(&self, conjunction: &Conjunction) -> NormalConcept {
        let defs: HashMap<AtomId, &Conjunction> = self
            .auxiliary
            .iter()
            .map(|eq| (eq.left, &eq.right))
            .collect();
        unfold_with(&self.atoms, &defs, conjunction)
    }
}

fn unfold_with(
    atoms: &AtomManager,
    defs: &HashMap<AtomId, &Conjunction>,
    conjunction: &Conjunction,
) -> NormalConcept {
    NormalConcept::conjunction(conjunction.iter().map(|&id| unfold_atom(atoms, defs, id)))
}

fn unfold_atom(atoms: &AtomManager, defs: &HashMap<AtomId, &Conjunction>, id: AtomId) -> NormalConcept {
    match atoms.get(id) {
        Atom::ConceptName(_) => match defs.get(&id) {
            Some(body) if atoms.is_auxiliary(id) => unfold_with(atoms, defs, body),
            _ => NormalConcept::name(id),
        },
        Atom::Existential { role, filler } => {
            NormalConcept::exists(role, unfold_atom(atoms, defs, filler))
        }
    }
}
