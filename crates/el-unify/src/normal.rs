//! Reduced normal forms of variable-free EL concepts
//!
//! A concept is kept as the set of its top-level atoms, each a concept name or
//! an existential restriction with a normalized filler. After reduction no
//! atom subsumes another, so two concepts are equivalent exactly when their
//! reduced forms are equal. The empty set is `⊤`.

use crate::atoms::{AtomId, RoleId};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NormalAtom {
    Name(AtomId),
    Exists { role: RoleId, filler: NormalConcept },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NormalConcept {
    atoms: BTreeSet<NormalAtom>,
}

impl NormalAtom {
    pub fn is_subsumed_by(&self, other: &NormalAtom) -> bool {
        match (self, other) {
            (NormalAtom::Name(a), NormalAtom::Name(b)) => a == b,
            (
                NormalAtom::Exists { role: r, filler: c },
                NormalAtom::Exists { role: s, filler: d },
            ) => r == s && c.is_subsumed_by(d),
            _ => false,
        }
    }
}

impl NormalConcept {
    pub fn top() -> Self {
        NormalConcept::default()
    }

    pub fn name(id: AtomId) -> Self {
        NormalConcept {
            atoms: BTreeSet::from([NormalAtom::Name(id)]),
        }
    }

    pub fn exists(role: RoleId, filler: NormalConcept) -> Self {
        NormalConcept {
            atoms: BTreeSet::from([NormalAtom::Exists { role, filler }]),
        }
    }

    /// Conjunction of already reduced concepts, reduced again.
    pub fn conjunction<I>(parts: I) -> Self
    where
        I: IntoIterator<Item = NormalConcept>,
    {
        let mut atoms = BTreeSet::new();
        for part in parts {
            atoms.extend(part.atoms);
        }
        Self::reduce(atoms)
    }

    /// Drop every atom that is implied by another one. Fillers must already
    /// be reduced.
    fn reduce(atoms: BTreeSet<NormalAtom>) -> Self {
        let kept = atoms
            .iter()
            .filter(|a| {
                !atoms.iter().any(|b| {
                    b != *a && b.is_subsumed_by(a) && !(a.is_subsumed_by(b) && *a < b)
                })
            })
            .cloned()
            .collect();
        NormalConcept { atoms: kept }
    }

    /// Structural subsumption `self ⊑ other`
    pub fn is_subsumed_by(&self, other: &NormalConcept) -> bool {
        other
            .atoms
            .iter()
            .all(|b| self.atoms.iter().any(|a| a.is_subsumed_by(b)))
    }

    pub fn is_equivalent(&self, other: &NormalConcept) -> bool {
        self.is_subsumed_by(other) && other.is_subsumed_by(self)
    }

    pub fn is_top(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn atoms(&self) -> impl Iterator<Item = &NormalAtom> {
        self.atoms.iter()
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }
}
