//! Source terms handed to the flattener
//!
//! The flattener only needs three questions answered about a term, captured
//! by [`ConceptTerm`]. [`Concept`] is the crate's own nested representation;
//! callers with their own term type implement the trait instead.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Capabilities the flattener needs from a term representation.
///
/// A well-formed term answers exactly one of the three methods with `Some`.
pub trait ConceptTerm {
    /// The symbol, if the term is a bare concept name
    fn atomic_name(&self) -> Option<&str>;

    /// The conjuncts, if the term is a conjunction
    fn conjuncts(&self) -> Option<Vec<&Self>>;

    /// `(role, filler)`, if the term is an existential restriction
    fn existential(&self) -> Option<(&str, &Self)>;
}

/// Nested EL concept description
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Concept {
    Name { name: String },
    And { conjuncts: Vec<Concept> },
    Exists { role: String, filler: Box<Concept> },
}

impl Concept {
    pub fn name(name: &str) -> Self {
        Concept::Name {
            name: name.to_string(),
        }
    }

    pub fn and(conjuncts: Vec<Concept>) -> Self {
        Concept::And { conjuncts }
    }

    pub fn exists(role: &str, filler: Concept) -> Self {
        Concept::Exists {
            role: role.to_string(),
            filler: Box::new(filler),
        }
    }

    /// `⊤`, the empty conjunction
    pub fn top() -> Self {
        Concept::And { conjuncts: Vec::new() }
    }
}

impl ConceptTerm for Concept {
    fn atomic_name(&self) -> Option<&str> {
        match self {
            Concept::Name { name } => Some(name),
            _ => None,
        }
    }

    fn conjuncts(&self) -> Option<Vec<&Self>> {
        match self {
            Concept::And { conjuncts } => Some(conjuncts.iter().collect()),
            _ => None,
        }
    }

    fn existential(&self) -> Option<(&str, &Self)> {
        match self {
            Concept::Exists { role, filler } => Some((role, filler)),
            _ => None,
        }
    }
}

impl fmt::Display for Concept {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Concept::Name { name } => write!(f, "{}", name),
            Concept::And { conjuncts } if conjuncts.is_empty() => write!(f, "⊤"),
            Concept::And { conjuncts } => {
                write!(f, "(")?;
                for (i, c) in conjuncts.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ⊓ ")?;
                    }
                    write!(f, "{}", c)?;
                }
                write!(f, ")")
            }
            Concept::Exists { role, filler } => write!(f, "∃{}.{}", role, filler),
        }
    }
}
