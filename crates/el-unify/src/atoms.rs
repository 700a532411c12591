//! Atom interning
//!
//! Every concept name and every flat existential restriction is stored once
//! in an append-only arena. Other components only ever hold the integer ids
//! handed out here:
//! - `AtomId` for atoms (concept names and existential restrictions)
//! - `NameId` for concept-name symbols
//! - `RoleId` for role symbols
//!
//! Ids are dense and never reused, and comparing two ids compares insertion
//! order.

use crate::error::{Result, UnifyError};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// ID of an interned atom
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AtomId(pub(crate) u32);

/// ID of an interned concept-name symbol
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NameId(pub(crate) u32);

/// ID of an interned role symbol
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoleId(pub(crate) u32);

impl AtomId {
    /// Get the raw ID value (for debugging/serialization)
    pub fn as_u32(self) -> u32 {
        self.0
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl NameId {
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl RoleId {
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for AtomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Structural value of an atom.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Atom {
    ConceptName(NameId),
    /// `∃role.filler`, where the filler is always a concept-name atom
    Existential { role: RoleId, filler: AtomId },
}

/// How a concept name takes part in unification.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConceptKind {
    Constant,
    /// A variable the caller wants solved
    UserVariable,
    /// A concept name that has a background definition
    DefinitionVariable,
    /// Introduced by flattening
    AuxiliaryVariable,
}

impl ConceptKind {
    pub fn is_variable(self) -> bool {
        !matches!(self, ConceptKind::Constant)
    }
}

/// Append-only store of atoms plus name and role symbol tables.
#[derive(Debug, Clone, Default)]
pub struct AtomManager {
    names: IndexSet<String>,
    roles: IndexSet<String>,
    atoms: IndexSet<Atom>,
    /// Classification per atom, `None` for existential restrictions
    kinds: Vec<Option<ConceptKind>>,
}

impl AtomManager {
    pub fn new() -> Self {
        AtomManager::default()
    }

    /// Intern an atom value, returning its ID (get-or-create).
    ///
    /// New concept names start out as constants.
    pub fn get_or_create(&mut self, atom: Atom) -> AtomId {
        let (index, inserted) = self.atoms.insert_full(atom);
        if inserted {
            self.kinds.push(match atom {
                Atom::ConceptName(_) => Some(ConceptKind::Constant),
                Atom::Existential { .. } => None,
            });
        }
        AtomId(index as u32)
    }

    /// Intern a concept name atom by its symbol.
    pub fn concept_name(&mut self, name: &str) -> AtomId {
        let (index, _) = self.names.insert_full(name.to_string());
        self.get_or_create(Atom::ConceptName(NameId(index as u32)))
    }

    /// Intern `∃role.filler`. The filler must already be a concept-name atom.
    pub fn existential(&mut self, role: &str, filler: AtomId) -> Result<AtomId> {
        match self.atoms.get_index(filler.index()) {
            Some(Atom::ConceptName(_)) => {}
            Some(Atom::Existential { .. }) => {
                return Err(UnifyError::MalformedTerm(format!(
                    "filler of existential restriction over '{}' is not a concept name",
                    role
                )))
            }
            None => {
                return Err(UnifyError::MalformedTerm(format!(
                    "filler {} of existential restriction is not a known atom",
                    filler
                )))
            }
        }
        let (index, _) = self.roles.insert_full(role.to_string());
        Ok(self.get_or_create(Atom::Existential {
            role: RoleId(index as u32),
            filler,
        }))
    }

    /// Resolve an atom ID to its structural value.
    ///
    /// Panics on ids from a different manager.
    pub fn get(&self, id: AtomId) -> Atom {
        self.atoms[id.index()]
    }

    /// Look up a concept name that is already interned
    pub fn find_concept_name(&self, name: &str) -> Option<AtomId> {
        let name_id = self.names.get_index_of(name)?;
        self.atoms
            .get_index_of(&Atom::ConceptName(NameId(name_id as u32)))
            .map(|index| AtomId(index as u32))
    }

    pub fn find_role(&self, role: &str) -> Option<RoleId> {
        self.roles.get_index_of(role).map(|index| RoleId(index as u32))
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Symbol of a concept-name atom, `None` for existential restrictions
    pub fn name(&self, id: AtomId) -> Option<&str> {
        match self.get(id) {
            Atom::ConceptName(name) => self.names.get_index(name.0 as usize).map(String::as_str),
            Atom::Existential { .. } => None,
        }
    }

    pub fn role_name(&self, role: RoleId) -> &str {
        &self.roles[role.0 as usize]
    }

    /// Classification of a concept name, `None` for existential restrictions
    pub fn kind(&self, id: AtomId) -> Option<ConceptKind> {
        self.kinds.get(id.index()).copied().flatten()
    }

    /// Reclassify a concept name. Existential restrictions are left untouched.
    pub(crate) fn set_kind(&mut self, id: AtomId, kind: ConceptKind) {
        if let Some(slot) = self.kinds.get_mut(id.index()) {
            if slot.is_some() {
                *slot = Some(kind);
            }
        }
    }

    pub fn is_concept_name(&self, id: AtomId) -> bool {
        matches!(self.get(id), Atom::ConceptName(_))
    }

    pub fn is_existential(&self, id: AtomId) -> bool {
        matches!(self.get(id), Atom::Existential { .. })
    }

    pub fn is_variable(&self, id: AtomId) -> bool {
        self.kind(id).is_some_and(ConceptKind::is_variable)
    }

    pub fn is_user_variable(&self, id: AtomId) -> bool {
        self.kind(id) == Some(ConceptKind::UserVariable)
    }

    pub fn is_auxiliary(&self, id: AtomId) -> bool {
        self.kind(id) == Some(ConceptKind::AuxiliaryVariable)
    }

    pub fn is_constant(&self, id: AtomId) -> bool {
        self.kind(id) == Some(ConceptKind::Constant)
    }

    /// An atom is ground if neither it nor its filler is a variable
    pub fn is_ground(&self, id: AtomId) -> bool {
        match self.get(id) {
            Atom::ConceptName(_) => !self.is_variable(id),
            Atom::Existential { filler, .. } => !self.is_variable(filler),
        }
    }

    /// `(role, filler)` of an existential restriction
    pub fn as_existential(&self, id: AtomId) -> Option<(RoleId, AtomId)> {
        match self.get(id) {
            Atom::Existential { role, filler } => Some((role, filler)),
            Atom::ConceptName(_) => None,
        }
    }

    /// Number of interned atoms
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// All atom ids in insertion order
    pub fn ids(&self) -> impl Iterator<Item = AtomId> + '_ {
        (0..self.atoms.len() as u32).map(AtomId)
    }

    /// Render an atom for diagnostics, e.g. `∃r.B`
    pub fn display(&self, id: AtomId) -> String {
        match self.get(id) {
            Atom::ConceptName(_) => self.name(id).unwrap_or("?").to_string(),
            Atom::Existential { role, filler } => {
                format!("∃{}.{}", self.role_name(role), self.name(filler).unwrap_or("?"))
            }
        }
    }
}
