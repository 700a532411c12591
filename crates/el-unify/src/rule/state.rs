//! Search state of the rule-based engine

use crate::atoms::{AtomId, AtomManager};
use crate::goal::{Conjunction, FlatSubsumption};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Current guess of the non-variable subsumers `S_X` of every variable `X`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Assignment {
    subsumers: BTreeMap<AtomId, Conjunction>,
}

impl Assignment {
    pub fn new() -> Self {
        Assignment::default()
    }

    pub fn subsumers(&self, var: AtomId) -> Option<&Conjunction> {
        self.subsumers.get(&var)
    }

    pub fn contains(&self, var: AtomId, atom: AtomId) -> bool {
        self.subsumers.get(&var).is_some_and(|s| s.contains(&atom))
    }

    /// Returns `true` if the atom was not yet a subsumer
    pub fn insert(&mut self, var: AtomId, atom: AtomId) -> bool {
        self.subsumers.entry(var).or_default().insert(atom)
    }

    pub fn as_map(&self) -> &BTreeMap<AtomId, Conjunction> {
        &self.subsumers
    }

    /// Would `S_var ∪ {atom}` make the induced substitution cyclic?
    ///
    /// Only a restriction `∃r.Y` over a variable `Y` adds an edge `var → Y`;
    /// it closes a cycle iff `var` is reachable from `Y`.
    pub fn creates_cycle(&self, var: AtomId, atom: AtomId, atoms: &AtomManager) -> bool {
        let Some((_, filler)) = atoms.as_existential(atom) else {
            return false;
        };
        if !atoms.is_variable(filler) {
            return false;
        }
        let mut seen = BTreeSet::new();
        let mut todo = vec![filler];
        while let Some(current) = todo.pop() {
            if current == var {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            if let Some(subsumers) = self.subsumers.get(&current) {
                for &a in subsumers {
                    if let Some((_, next)) = atoms.as_existential(a) {
                        if atoms.is_variable(next) {
                            todo.push(next);
                        }
                    }
                }
            }
        }
        false
    }
}

/// The branch cannot lead to a unifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conflict;

/// One node of the search tree: an assignment plus every subsumption known
/// so far, each flagged solved or pending.
#[derive(Debug, Clone)]
pub struct SearchNode {
    pub(crate) assignment: Assignment,
    subsumptions: Vec<FlatSubsumption>,
    solved: Vec<bool>,
    index: HashMap<FlatSubsumption, usize>,
    /// Position of the last refinement candidate added to the assignment
    refined: Option<usize>,
}

/// Value identity of a node, used to skip states already explored
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeKey {
    assignment: Assignment,
    subsumptions: BTreeSet<(FlatSubsumption, bool)>,
    refined: Option<usize>,
}

impl SearchNode {
    pub fn new(subsumptions: Vec<FlatSubsumption>) -> Self {
        let mut node = SearchNode {
            assignment: Assignment::new(),
            subsumptions: Vec::with_capacity(subsumptions.len()),
            solved: Vec::with_capacity(subsumptions.len()),
            index: HashMap::new(),
            refined: None,
        };
        for sub in subsumptions {
            node.add_subsumption(sub);
        }
        node
    }

    pub fn len(&self) -> usize {
        self.subsumptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subsumptions.is_empty()
    }

    pub fn subsumption(&self, idx: usize) -> &FlatSubsumption {
        &self.subsumptions[idx]
    }

    pub fn is_solved(&self, idx: usize) -> bool {
        self.solved[idx]
    }

    pub fn mark_solved(&mut self, idx: usize) {
        self.solved[idx] = true;
    }

    pub fn first_unsolved(&self) -> Option<usize> {
        self.solved.iter().position(|&s| !s)
    }

    pub fn refined(&self) -> Option<usize> {
        self.refined
    }

    pub fn set_refined(&mut self, position: usize) {
        self.refined = Some(position);
    }

    pub fn unsolved_count(&self) -> usize {
        self.solved.iter().filter(|&&s| !s).count()
    }

    /// Add a pending subsumption unless it is already known.
    pub fn add_subsumption(&mut self, sub: FlatSubsumption) -> bool {
        if self.index.contains_key(&sub) {
            return false;
        }
        self.index.insert(sub.clone(), self.subsumptions.len());
        self.subsumptions.push(sub);
        self.solved.push(false);
        true
    }

    /// Add `atom` to `S_var`.
    ///
    /// Every solved subsumption `C ⊑ var` gets the new obligation
    /// `C ⊑ atom`.
    pub fn extend(&mut self, var: AtomId, atom: AtomId, atoms: &AtomManager) -> Result<bool, Conflict> {
        if self.assignment.contains(var, atom) {
            return Ok(false);
        }
        if self.assignment.creates_cycle(var, atom, atoms) {
            return Err(Conflict);
        }
        self.assignment.insert(var, atom);
        let bodies: Vec<Conjunction> = self
            .subsumptions
            .iter()
            .zip(&self.solved)
            .filter(|(sub, solved)| **solved && sub.head == var)
            .map(|(sub, _)| sub.body.clone())
            .collect();
        for body in bodies {
            self.add_subsumption(FlatSubsumption { body, head: atom });
        }
        Ok(true)
    }

    /// Solve `C ⊑ X` for a variable head by requiring `C ⊑ E` for every
    /// `E ∈ S_X`. Later additions to `S_X` are covered by [`SearchNode::extend`].
    pub fn expand_head(&mut self, idx: usize) {
        self.solved[idx] = true;
        let sub = self.subsumptions[idx].clone();
        let heads: Vec<AtomId> = self
            .assignment
            .subsumers(sub.head)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        for head in heads {
            self.add_subsumption(FlatSubsumption {
                body: sub.body.clone(),
                head,
            });
        }
    }

    pub fn key(&self) -> NodeKey {
        NodeKey {
            assignment: self.assignment.clone(),
            subsumptions: self
                .subsumptions
                .iter()
                .cloned()
                .zip(self.solved.iter().copied())
                .collect(),
            refined: self.refined,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestContext {
        atoms: AtomManager,
    }

    impl TestContext {
        fn new() -> Self {
            TestContext {
                atoms: AtomManager::new(),
            }
        }

        fn var(&mut self, name: &str) -> AtomId {
            let id = self.atoms.concept_name(name);
            self.atoms.set_kind(id, crate::atoms::ConceptKind::UserVariable);
            id
        }

        fn exists(&mut self, role: &str, filler: AtomId) -> AtomId {
            self.atoms.existential(role, filler).unwrap()
        }
    }

    fn sub(body: &[AtomId], head: AtomId) -> FlatSubsumption {
        FlatSubsumption {
            body: body.iter().copied().collect(),
            head,
        }
    }

    #[test]
    fn test_cycle_detection() {
        let mut ctx = TestContext::new();
        let x = ctx.var("X");
        let y = ctx.var("Y");
        let rx = ctx.exists("r", x);
        let ry = ctx.exists("r", y);
        let a = ctx.atoms.concept_name("A");
        let ra = ctx.exists("r", a);

        let mut assignment = Assignment::new();
        assert!(assignment.creates_cycle(x, rx, &ctx.atoms));
        assert!(!assignment.creates_cycle(x, ra, &ctx.atoms));
        assert!(!assignment.creates_cycle(x, ry, &ctx.atoms));
        assignment.insert(x, ry);
        // Y ↦ ∃r.X would close X → Y → X
        assert!(assignment.creates_cycle(y, rx, &ctx.atoms));
        assert!(!assignment.creates_cycle(y, ra, &ctx.atoms));
    }

    #[test]
    fn test_extend_propagates_to_solved_variable_heads() {
        let mut ctx = TestContext::new();
        let x = ctx.var("X");
        let a = ctx.atoms.concept_name("A");
        let b = ctx.atoms.concept_name("B");

        let mut node = SearchNode::new(vec![sub(&[b], x)]);
        node.expand_head(0);
        assert_eq!(node.len(), 1);
        assert!(node.is_solved(0));

        assert_eq!(node.extend(x, a, &ctx.atoms), Ok(true));
        assert_eq!(node.len(), 2);
        assert_eq!(node.subsumption(1), &sub(&[b], a));
        assert!(!node.is_solved(1));
        assert_eq!(node.extend(x, a, &ctx.atoms), Ok(false));
    }

    #[test]
    fn test_extend_rejects_cycles() {
        let mut ctx = TestContext::new();
        let x = ctx.var("X");
        let rx = ctx.exists("r", x);
        let mut node = SearchNode::new(vec![]);
        assert_eq!(node.extend(x, rx, &ctx.atoms), Err(Conflict));
    }

    #[test]
    fn test_duplicate_subsumptions_are_ignored() {
        let mut ctx = TestContext::new();
        let x = ctx.var("X");
        let a = ctx.atoms.concept_name("A");
        let mut node = SearchNode::new(vec![sub(&[x], a), sub(&[x], a)]);
        assert_eq!(node.len(), 1);
        assert!(!node.add_subsumption(sub(&[x], a)));
        assert_eq!(node.first_unsolved(), Some(0));
        node.mark_solved(0);
        assert_eq!(node.first_unsolved(), None);
        assert_eq!(node.unsolved_count(), 0);
    }

    #[test]
    fn test_node_keys_ignore_insertion_order() {
        let mut ctx = TestContext::new();
        let x = ctx.var("X");
        let a = ctx.atoms.concept_name("A");
        let b = ctx.atoms.concept_name("B");
        let n1 = SearchNode::new(vec![sub(&[x], a), sub(&[x], b)]);
        let n2 = SearchNode::new(vec![sub(&[x], b), sub(&[x], a)]);
        assert_eq!(n1.key(), n2.key());

        let mut refined = n1.clone();
        refined.set_refined(0);
        assert_ne!(refined.key(), n2.key());
    }
}
