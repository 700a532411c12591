//! Goal construction by flattening nested concept terms
//!
//! Every constraint is reduced to flat conjunctions of atoms. A nested
//! conjunction or restriction below a role is abbreviated by a fresh
//! auxiliary variable `V` together with the equation `V ≡ <flat body>`.
//! Concept names with a background definition are imported on first use.

use crate::atoms::{AtomId, AtomManager, ConceptKind};
use crate::config::UnificationConfig;
use crate::error::{Result, UnifyError};
use crate::goal::{Conjunction, Disequation, Dissubsumption, Equation, Goal, Subsumption};
use crate::term::{Concept, ConceptTerm};
use indexmap::IndexMap;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::marker::PhantomData;
use tracing::{debug, trace, warn};

/// A background definition as handed out by a [`DefinitionSource`]
#[derive(Debug)]
pub struct BackgroundDefinition<'a, T> {
    pub body: &'a T,
    /// `name ⊑ body` instead of `name ≡ body`
    pub primitive: bool,
}

/// Lookup of background definitions by concept name
pub trait DefinitionSource<T> {
    fn definition(&self, name: &str) -> Option<BackgroundDefinition<'_, T>>;

    fn has_definition(&self, name: &str) -> bool {
        self.definition(name).is_some()
    }
}

/// The empty background
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBackground;

impl<T> DefinitionSource<T> for NoBackground {
    fn definition(&self, _name: &str) -> Option<BackgroundDefinition<'_, T>> {
        None
    }
}

/// In-memory background ontology over [`Concept`] terms
#[derive(Debug, Clone, Default)]
pub struct Ontology {
    definitions: IndexMap<String, (Concept, bool)>,
}

impl Ontology {
    pub fn new() -> Self {
        Ontology::default()
    }

    /// Add `name ≡ body`
    pub fn define(&mut self, name: &str, body: Concept) -> &mut Self {
        self.insert(name, body, false)
    }

    /// Add `name ⊑ body`
    pub fn define_primitive(&mut self, name: &str, body: Concept) -> &mut Self {
        self.insert(name, body, true)
    }

    fn insert(&mut self, name: &str, body: Concept, primitive: bool) -> &mut Self {
        if self.definitions.insert(name.to_string(), (body, primitive)).is_some() {
            warn!(concept = name, "replacing existing definition");
        }
        self
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl DefinitionSource<Concept> for Ontology {
    fn definition(&self, name: &str) -> Option<BackgroundDefinition<'_, Concept>> {
        self.definitions
            .get(name)
            .map(|(body, primitive)| BackgroundDefinition {
                body,
                primitive: *primitive,
            })
    }
}

/// Builds a [`Goal`] from nested terms.
///
/// Once an `add_*` call fails the builder is poisoned and [`GoalBuilder::build`]
/// reports that first error.
pub struct GoalBuilder<'a, T, D> {
    background: &'a D,
    undef_suffix: String,
    aux_prefix: String,
    atoms: AtomManager,
    definitions: Vec<Equation>,
    auxiliary: Vec<Equation>,
    equations: Vec<Equation>,
    subsumptions: Vec<Subsumption>,
    disequations: Vec<Disequation>,
    dissubsumptions: Vec<Dissubsumption>,
    imported: HashSet<AtomId>,
    aux_by_body: HashMap<Conjunction, AtomId>,
    aux_counter: usize,
    user_variables: Vec<AtomId>,
    error: Option<UnifyError>,
    _term: PhantomData<fn(&T)>,
}

impl<'a, T: ConceptTerm, D: DefinitionSource<T>> GoalBuilder<'a, T, D> {
    pub fn new(background: &'a D) -> Self {
        Self::with_config(background, &UnificationConfig::default())
    }

    pub fn with_config(background: &'a D, config: &UnificationConfig) -> Self {
        GoalBuilder {
            background,
            undef_suffix: config.undef_suffix.clone(),
            aux_prefix: config.aux_prefix.clone(),
            atoms: AtomManager::new(),
            definitions: Vec::new(),
            auxiliary: Vec::new(),
            equations: Vec::new(),
            subsumptions: Vec::new(),
            disequations: Vec::new(),
            dissubsumptions: Vec::new(),
            imported: HashSet::new(),
            aux_by_body: HashMap::new(),
            aux_counter: 0,
            user_variables: Vec::new(),
            error: None,
            _term: PhantomData,
        }
    }

    /// Add `left ≡ right`
    pub fn add_equation(&mut self, left: &T, right: &T) -> Result<()> {
        self.guard(|b| {
            let flat_left = b.flatten(left)?;
            let right = b.flatten(right)?;
            let left = b.single_atom(flat_left);
            b.equations.push(Equation {
                left,
                right,
                primitive: false,
            });
            Ok(())
        })
    }

    /// Add `body ⊑ head`
    pub fn add_subsumption(&mut self, body: &T, head: &T) -> Result<()> {
        self.guard(|b| {
            let body = b.flatten(body)?;
            let head = b.flatten(head)?;
            b.subsumptions.push(Subsumption { body, head });
            Ok(())
        })
    }

    /// Add `left ≢ right`
    pub fn add_disequation(&mut self, left: &T, right: &T) -> Result<()> {
        self.guard(|b| {
            let left = b.flatten(left)?;
            let right = b.flatten(right)?;
            b.disequations.push(Disequation { left, right });
            Ok(())
        })
    }

    /// Add `body ⋢ head`
    pub fn add_dissubsumption(&mut self, body: &T, head: &T) -> Result<()> {
        self.guard(|b| {
            let body = b.flatten(body)?;
            let head = b.flatten(head)?;
            b.dissubsumptions.push(Dissubsumption { body, head });
            Ok(())
        })
    }

    /// Declare a concept name as user variable. Takes effect in
    /// [`GoalBuilder::build`], after all definitions have been imported.
    pub fn user_variable(&mut self, name: &str) -> AtomId {
        let id = self.atoms.concept_name(name);
        self.user_variables.push(id);
        id
    }

    pub fn atoms(&self) -> &AtomManager {
        &self.atoms
    }

    pub fn build(mut self) -> Result<Goal> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        for &id in &self.user_variables {
            self.atoms.set_kind(id, ConceptKind::UserVariable);
        }
        debug!(
            atoms = self.atoms.len(),
            definitions = self.definitions.len(),
            auxiliary = self.auxiliary.len(),
            equations = self.equations.len(),
            subsumptions = self.subsumptions.len(),
            negative = self.disequations.len() + self.dissubsumptions.len(),
            "goal built"
        );
        Ok(Goal {
            atoms: self.atoms,
            definitions: self.definitions,
            auxiliary: self.auxiliary,
            equations: self.equations,
            subsumptions: self.subsumptions,
            disequations: self.disequations,
            dissubsumptions: self.dissubsumptions,
        })
    }

    fn guard(&mut self, f: impl FnOnce(&mut Self) -> Result<()>) -> Result<()> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        let result = f(self);
        if let Err(err) = &result {
            self.error = Some(err.clone());
        }
        result
    }

    /// Flatten a term into a conjunction of flat atoms.
    fn flatten(&mut self, term: &T) -> Result<Conjunction> {
        if let Some(name) = term.atomic_name() {
            let id = self.concept_name(name)?;
            return Ok(BTreeSet::from([id]));
        }
        if let Some(parts) = term.conjuncts() {
            // the empty conjunction is ⊤
            let mut conjunction = BTreeSet::new();
            for part in parts {
                conjunction.extend(self.flatten(part)?);
            }
            return Ok(conjunction);
        }
        if let Some((role, filler)) = term.existential() {
            let flat_filler = self.flatten(filler)?;
            let filler = self.single_name(flat_filler);
            let id = self.atoms.existential(role, filler)?;
            return Ok(BTreeSet::from([id]));
        }
        Err(UnifyError::MalformedTerm(
            "argument is neither a concept name, nor a conjunction, nor an existential restriction"
                .to_string(),
        ))
    }

    fn concept_name(&mut self, name: &str) -> Result<AtomId> {
        let id = self.atoms.concept_name(name);
        self.import_definition(name, id)?;
        Ok(id)
    }

    fn import_definition(&mut self, name: &str, id: AtomId) -> Result<()> {
        if self.imported.contains(&id) {
            return Ok(());
        }
        let background = self.background;
        let Some(definition) = background.definition(name) else {
            return Ok(());
        };
        // mark first so that cyclic definitions terminate
        self.imported.insert(id);
        self.atoms.set_kind(id, ConceptKind::DefinitionVariable);

        let mut right = self.flatten(definition.body)?;
        if definition.primitive {
            let undef = format!("{}{}", name, self.undef_suffix);
            right.insert(self.atoms.concept_name(&undef));
        }
        trace!(concept = name, primitive = definition.primitive, size = right.len(), "imported definition");
        self.definitions.push(Equation {
            left: id,
            right,
            primitive: definition.primitive,
        });
        Ok(())
    }

    /// Any single atom stays as is, larger conjunctions get abbreviated.
    fn single_atom(&mut self, conjunction: Conjunction) -> AtomId {
        match single(&conjunction) {
            Some(id) => id,
            None => self.abbreviate(conjunction),
        }
    }

    /// Only a single concept name stays as is.
    fn single_name(&mut self, conjunction: Conjunction) -> AtomId {
        match single(&conjunction) {
            Some(id) if self.atoms.is_concept_name(id) => id,
            _ => self.abbreviate(conjunction),
        }
    }

    fn abbreviate(&mut self, conjunction: Conjunction) -> AtomId {
        if let Some(&var) = self.aux_by_body.get(&conjunction) {
            return var;
        }
        let var = loop {
            let name = format!("{}{}", self.aux_prefix, self.aux_counter);
            self.aux_counter += 1;
            if !self.atoms.contains_name(&name) {
                break self.atoms.concept_name(&name);
            }
        };
        self.atoms.set_kind(var, ConceptKind::AuxiliaryVariable);
        trace!(var = %self.atoms.display(var), size = conjunction.len(), "auxiliary variable");
        self.aux_by_body.insert(conjunction.clone(), var);
        self.auxiliary.push(Equation {
            left: var,
            right: conjunction,
            primitive: false,
        });
        var
    }
}

fn single(conjunction: &Conjunction) -> Option<AtomId> {
    if conjunction.len() == 1 {
        conjunction.iter().next().copied()
    } else {
        None
    }
}
