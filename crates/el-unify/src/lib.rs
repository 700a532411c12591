//! Equational unification in the description logic EL
//!
//! Concept terms are flattened into a [`Goal`] over interned atoms. A
//! [`UnifierSession`] then enumerates the unifiers of the goal with one of
//! two engines: a rule-based backtracking search or a reduction to SAT.
//! Unifiers that agree on every user variable are reported once.

pub mod algorithm;
pub mod atoms;
pub mod config;
pub mod error;
pub mod flatten;
pub mod goal;
pub mod json;
pub mod normal;
pub mod rule;
pub mod sat;
pub mod session;
pub mod stats;
pub mod term;
pub mod unifier;


pub use algorithm::{create_algorithm, CancelToken, UnificationAlgorithm};
pub use atoms::{Atom, AtomId, AtomManager, ConceptKind, NameId, RoleId};
pub use config::{AlgorithmKind, UnificationConfig};
pub use error::{Result, UnifyError};
pub use flatten::{BackgroundDefinition, DefinitionSource, GoalBuilder, NoBackground, Ontology};
pub use goal::{
    Conjunction, Disequation, Dissubsumption, Equation, FlatSubsumption, Goal, NegativeConstraint, Subsumption,
};
pub use json::{AtomJson, DefinitionJson, GoalJson, UnifierJson};
pub use normal::{NormalAtom, NormalConcept};
pub use rule::RuleBasedAlgorithm;
pub use sat::{SatBasedAlgorithm, SatMode, SatOracle, VarisatOracle};
pub use session::UnifierSession;
pub use stats::{RuleStats, SatStats};
pub use term::{Concept, ConceptTerm};
pub use unifier::{Definition, Unifier, UnifierKey};
