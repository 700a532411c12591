//! JSON serialization types for goals and unifiers

use crate::atoms::{Atom, AtomId, AtomManager};
use crate::goal::{Conjunction, Goal};
use crate::normal::{NormalAtom, NormalConcept};
use crate::term::Concept;
use crate::unifier::{Definition, Unifier};
use serde::{Deserialize, Serialize};

/// JSON representation of a flat atom
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AtomJson {
    Name { name: String },
    Exists { role: String, filler: Box<AtomJson> },
}

impl AtomJson {
    pub fn from_atom(id: AtomId, goal: &Goal) -> Self {
        atom_json(id, goal.atoms())
    }

    pub fn from_conjunction(conjunction: &Conjunction, goal: &Goal) -> Vec<Self> {
        conjunction.iter().map(|&id| atom_json(id, goal.atoms())).collect()
    }
}

fn atom_json(id: AtomId, atoms: &AtomManager) -> AtomJson {
    match atoms.get(id) {
        Atom::ConceptName(_) => AtomJson::Name {
            name: atoms.name(id).unwrap_or_default().to_string(),
        },
        Atom::Existential { role, filler } => AtomJson::Exists {
            role: atoms.role_name(role).to_string(),
            filler: Box::new(atom_json(filler, atoms)),
        },
    }
}

/// Nested concept for a normal form. `⊤` becomes [`Concept::top`], which
/// the flattener accepts again.
pub fn concept_from_normal(normal: &NormalConcept, goal: &Goal) -> Concept {
    let mut conjuncts: Vec<Concept> = normal.atoms().map(|atom| normal_atom(atom, goal.atoms())).collect();
    if conjuncts.len() == 1 {
        conjuncts.remove(0)
    } else {
        Concept::and(conjuncts)
    }
}

fn normal_atom(atom: &NormalAtom, atoms: &AtomManager) -> Concept {
    match atom {
        NormalAtom::Name(id) => Concept::name(atoms.name(*id).unwrap_or_default()),
        NormalAtom::Exists { role, filler } => {
            let mut conjuncts: Vec<Concept> = filler.atoms().map(|a| normal_atom(a, atoms)).collect();
            let filler = if conjuncts.len() == 1 {
                conjuncts.remove(0)
            } else {
                Concept::and(conjuncts)
            };
            Concept::exists(atoms.role_name(*role), filler)
        }
    }
}

/// JSON representation of one variable of a unifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefinitionJson {
    pub variable: String,
    pub user: bool,
    /// Flat value, fillers may still be variables
    pub atoms: Vec<AtomJson>,
    /// Value with every variable substituted
    pub expanded: Concept,
}

impl DefinitionJson {
    pub fn from_definition(def: &Definition, unifier: &Unifier, goal: &Goal) -> Self {
        let atoms = goal.atoms();
        DefinitionJson {
            variable: atoms.name(def.variable).unwrap_or_default().to_string(),
            user: atoms.is_user_variable(def.variable),
            atoms: AtomJson::from_conjunction(&def.conjunction, goal),
            expanded: concept_from_normal(&unifier.expand(def.variable, atoms), goal),
        }
    }
}

/// JSON representation of a unifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifierJson {
    pub definitions: Vec<DefinitionJson>,
}

impl UnifierJson {
    pub fn from_unifier(unifier: &Unifier, goal: &Goal) -> Self {
        UnifierJson {
            definitions: unifier
                .definitions()
                .iter()
                .map(|def| DefinitionJson::from_definition(def, unifier, goal))
                .collect(),
        }
    }

    /// Only the user variables, as shown to a user
    pub fn from_unifier_users(unifier: &Unifier, goal: &Goal) -> Self {
        let mut json = Self::from_unifier(unifier, goal);
        json.definitions.retain(|def| def.user);
        json
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationJson {
    Definition,
    PrimitiveDefinition,
    Flattening,
    Equation,
    Subsumption,
    Disequation,
    Dissubsumption,
}

/// JSON representation of one flat constraint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintJson {
    pub relation: RelationJson,
    pub left: Vec<AtomJson>,
    pub right: Vec<AtomJson>,
}

/// JSON representation of a flat goal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalJson {
    pub user_variables: Vec<String>,
    pub constraints: Vec<ConstraintJson>,
}

impl GoalJson {
    pub fn from_goal(goal: &Goal) -> Self {
        let single = |id: AtomId| vec![AtomJson::from_atom(id, goal)];
        let pair = |relation, left: &Conjunction, right: &Conjunction| ConstraintJson {
            relation,
            left: AtomJson::from_conjunction(left, goal),
            right: AtomJson::from_conjunction(right, goal),
        };

        let mut constraints = Vec::new();
        for eq in goal.definitions() {
            constraints.push(ConstraintJson {
                relation: if eq.primitive {
                    RelationJson::PrimitiveDefinition
                } else {
                    RelationJson::Definition
                },
                left: single(eq.left),
                right: AtomJson::from_conjunction(&eq.right, goal),
            });
        }
        for (relation, equations) in [
            (RelationJson::Flattening, goal.auxiliary_equations()),
            (RelationJson::Equation, goal.goal_equations()),
        ] {
            for eq in equations {
                constraints.push(ConstraintJson {
                    relation,
                    left: single(eq.left),
                    right: AtomJson::from_conjunction(&eq.right, goal),
                });
            }
        }
        constraints.extend(
            goal.subsumptions()
                .iter()
                .map(|s| pair(RelationJson::Subsumption, &s.body, &s.head)),
        );
        constraints.extend(
            goal.disequations()
                .iter()
                .map(|d| pair(RelationJson::Disequation, &d.left, &d.right)),
        );
        constraints.extend(
            goal.dissubsumptions()
                .iter()
                .map(|d| pair(RelationJson::Dissubsumption, &d.body, &d.head)),
        );

        GoalJson {
            user_variables: goal
                .user_variables()
                .into_iter()
                .filter_map(|id| goal.atoms().name(id))
                .map(str::to_string)
                .collect(),
            constraints,
        }
    }
}
