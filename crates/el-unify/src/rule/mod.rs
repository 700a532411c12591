//! Rule-based unification engine
//!
//! Depth-first search over [`SearchNode`]s. Each node is first saturated
//! under the eager rules. Then the first pending subsumption is branched on,
//! with one child per non-deterministic alternative. Children are explored
//! left to right in the order the rules propose them. A node without
//! pending subsumptions is a leaf. Its assignment becomes a unifier, and the
//! unifier is reported unless it satisfies a negative constraint.
//!
//! A leaf is also refined: each child adds one more candidate subsumer
//! `D ∈ S_X` to the assignment, and the new obligations are searched as
//! before. Candidates are `(variable, non-variable atom)` pairs in a fixed
//! order, and a refined node only tries candidates after its last
//! refinement. Together with the rules this reaches every acyclic
//! assignment over the atoms of the goal that solves it, including the
//! non-minimal ones a negative constraint may require.
//!
//! The stack survives between [`UnificationAlgorithm::compute_next`] calls,
//! so the search resumes where the previous unifier was found.

pub mod rules;
pub mod state;

pub use rules::{Application, EagerRule, NondeterministicRule, Rule, RULE_TABLE};
pub use state::{Assignment, Conflict, NodeKey, SearchNode};

use crate::algorithm::{CancelToken, UnificationAlgorithm};
use crate::config::UnificationConfig;
use crate::error::{Result, UnifyError};
use crate::goal::{FlatSubsumption, Goal};
use crate::stats::RuleStats;
use crate::atoms::AtomId;
use crate::unifier::Unifier;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, trace};

pub struct RuleBasedAlgorithm<'g> {
    goal: &'g Goal,
    stack: Vec<SearchNode>,
    visited: HashSet<NodeKey>,
    /// Refinement candidates, ordered by variable then atom
    candidates: Vec<(AtomId, AtomId)>,
    reported: HashSet<Assignment>,
    cancel: CancelToken,
    step_limit: usize,
    stats: RuleStats,
}

impl<'g> RuleBasedAlgorithm<'g> {
    pub fn new(goal: &'g Goal, config: &UnificationConfig, cancel: CancelToken) -> Self {
        let root = SearchNode::new(goal.positive_subsumptions());
        let non_variables = goal.non_variable_atoms();
        let candidates: Vec<(AtomId, AtomId)> = goal
            .variables()
            .into_iter()
            .flat_map(|var| non_variables.iter().map(move |&atom| (var, atom)))
            .collect();
        debug!(
            subsumptions = root.len(),
            candidates = candidates.len(),
            "rule-based search initialized"
        );
        RuleBasedAlgorithm {
            goal,
            stack: vec![root],
            visited: HashSet::new(),
            candidates,
            reported: HashSet::new(),
            cancel,
            step_limit: config.step_limit,
            stats: RuleStats::default(),
        }
    }

    pub fn stats(&self) -> &RuleStats {
        &self.stats
    }

    /// Apply eager rules until none applies.
    fn saturate(&mut self, node: &mut SearchNode) -> std::result::Result<(), Conflict> {
        let goal = self.goal;
        let atoms = goal.atoms();
        loop {
            let mut changed = false;
            let mut idx = 0;
            while idx < node.len() {
                if !node.is_solved(idx) {
                    let sub = node.subsumption(idx).clone();
                    let found = RULE_TABLE
                        .iter()
                        .take_while(|rule| rule.is_eager())
                        .find_map(|&rule| rule.applications(&sub, node, atoms).first().map(|&app| (rule, app)));
                    if let Some((rule, app)) = found {
                        trace!(rule = rule.name(), ?app, "eager");
                        self.stats.eager_applications += 1;
                        self.stats.record_rule(rule.name());
                        self.apply(node, idx, app)?;
                        changed = true;
                    }
                }
                idx += 1;
            }
            if !changed {
                return Ok(());
            }
        }
    }

    fn apply(&self, node: &mut SearchNode, idx: usize, app: Application) -> std::result::Result<(), Conflict> {
        match app {
            Application::Solve => node.mark_solved(idx),
            Application::Fail => return Err(Conflict),
            Application::Extend { var, atom } => {
                node.extend(var, atom, self.goal.atoms())?;
                node.mark_solved(idx);
            }
            Application::Decompose { body, head } => {
                node.add_subsumption(FlatSubsumption {
                    body: BTreeSet::from([body]),
                    head,
                });
                node.mark_solved(idx);
            }
            Application::ExpandHead => node.expand_head(idx),
        }
        Ok(())
    }

    /// Alternatives for the pending subsumption at `idx`, non-deterministic
    /// rules in table order
    fn alternatives(&self, node: &SearchNode, idx: usize) -> Vec<(Rule, Application)> {
        let sub = node.subsumption(idx);
        RULE_TABLE
            .iter()
            .filter(|rule| !rule.is_eager())
            .flat_map(|&rule| {
                rule.applications(sub, node, self.goal.atoms())
                    .into_iter()
                    .map(move |app| (rule, app))
            })
            .collect()
    }

    /// Push one child per candidate after the last refinement of `node`.
    fn refine(&mut self, node: &SearchNode) {
        let start = node.refined().map_or(0, |last| last + 1);
        for position in (start..self.candidates.len()).rev() {
            let (var, atom) = self.candidates[position];
            if node.assignment.contains(var, atom) {
                continue;
            }
            let mut child = node.clone();
            match child.extend(var, atom, self.goal.atoms()) {
                Ok(_) => {
                    child.set_refined(position);
                    self.stats.refinements += 1;
                    self.stack.push(child);
                }
                Err(Conflict) => self.stats.failed_branches += 1,
            }
        }
        self.stats.record_stack_depth(self.stack.len());
    }

    fn leaf(&mut self, node: &SearchNode) -> Option<Unifier> {
        self.stats.leaves += 1;
        if !self.reported.insert(node.assignment.clone()) {
            self.stats.repeated_leaves += 1;
            return None;
        }
        let unifier = Unifier::from_assignment(self.goal, node.assignment.as_map());
        if self.goal.has_negative_constraints() && !unifier.violates_no_negative(self.goal) {
            self.stats.rejected_leaves += 1;
            trace!("leaf rejected by negative constraint");
            return None;
        }
        debug_assert!(unifier.solves_positive(self.goal));
        Some(unifier)
    }
}

impl UnificationAlgorithm for RuleBasedAlgorithm<'_> {
    fn name(&self) -> &str {
        "rule"
    }

    fn compute_next(&mut self) -> Result<Option<Unifier>> {
        let mut steps = 0;
        loop {
            if self.cancel.is_cancelled() {
                return Err(UnifyError::Interrupted);
            }
            if self.step_limit > 0 && steps >= self.step_limit {
                return Err(UnifyError::LimitExceeded {
                    limit: self.step_limit,
                });
            }
            let Some(mut node) = self.stack.pop() else {
                debug!(nodes = self.stats.nodes_expanded, "rule-based search exhausted");
                return Ok(None);
            };
            steps += 1;
            self.stats.nodes_expanded += 1;

            if self.saturate(&mut node).is_err() {
                self.stats.failed_branches += 1;
                continue;
            }
            if !self.visited.insert(node.key()) {
                self.stats.memoized_skips += 1;
                continue;
            }

            let Some(idx) = node.first_unsolved() else {
                self.refine(&node);
                if let Some(unifier) = self.leaf(&node) {
                    debug!(nodes = self.stats.nodes_expanded, "unifier found");
                    return Ok(Some(unifier));
                }
                continue;
            };

            let alternatives = self.alternatives(&node, idx);
            if alternatives.is_empty() {
                self.stats.failed_branches += 1;
                continue;
            }
            // reversed so that the first alternative is popped first
            for &(rule, app) in alternatives.iter().rev() {
                let mut child = node.clone();
                match self.apply(&mut child, idx, app) {
                    Ok(()) => {
                        trace!(rule = rule.name(), ?app, "branch");
                        self.stats.record_rule(rule.name());
                        self.stats.branches_created += 1;
                        self.stack.push(child);
                    }
                    Err(Conflict) => self.stats.failed_branches += 1,
                }
            }
            self.stats.record_stack_depth(self.stack.len());
        }
    }

    fn info(&self) -> Vec<(String, String)> {
        self.stats.to_info()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::{GoalBuilder, NoBackground};
    use crate::term::Concept;

    fn n(name: &str) -> Concept {
        Concept::name(name)
    }

    fn run(goal: &Goal) -> Vec<Unifier> {
        let mut engine = RuleBasedAlgorithm::new(goal, &UnificationConfig::default(), CancelToken::new());
        let mut found = Vec::new();
        while let Some(u) = engine.compute_next().unwrap() {
            found.push(u);
        }
        found
    }

    #[test]
    fn test_trivial_equation_has_identity_unifier() {
        let mut builder = GoalBuilder::new(&NoBackground);
        builder.user_variable("X");
        builder
            .add_equation(&n("X"), &Concept::and(vec![n("A"), Concept::exists("r", n("B"))]))
            .unwrap();
        let goal = builder.build().unwrap();

        let found = run(&goal);
        assert_eq!(found.len(), 1);
        let x = goal.atoms().find_concept_name("X").unwrap();
        assert_eq!(found[0].definition(x).unwrap().conjunction.len(), 2);
        assert!(found[0].satisfies(&goal));
    }

    #[test]
    fn test_clash_of_constants_has_no_unifier() {
        let mut builder = GoalBuilder::new(&NoBackground);
        builder.add_equation(&n("A"), &n("B")).unwrap();
        let goal = builder.build().unwrap();
        assert!(run(&goal).is_empty());
    }

    #[test]
    fn test_cyclic_goal_has_no_unifier() {
        let mut builder = GoalBuilder::new(&NoBackground);
        builder.user_variable("X");
        builder
            .add_equation(&n("X"), &Concept::exists("r", n("X")))
            .unwrap();
        let goal = builder.build().unwrap();
        assert!(run(&goal).is_empty());
    }

    #[test]
    fn test_cancellation_keeps_search_resumable() {
        let mut builder = GoalBuilder::new(&NoBackground);
        builder.user_variable("X");
        builder.add_equation(&n("X"), &n("A")).unwrap();
        let goal = builder.build().unwrap();

        let cancel = CancelToken::new();
        let mut engine = RuleBasedAlgorithm::new(&goal, &UnificationConfig::default(), cancel.clone());
        cancel.cancel();
        assert_eq!(engine.compute_next(), Err(UnifyError::Interrupted));
        cancel.reset();
        assert!(engine.compute_next().unwrap().is_some());
        assert!(engine.compute_next().unwrap().is_none());
    }

    #[test]
    fn test_step_limit() {
        let mut builder = GoalBuilder::new(&NoBackground);
        builder.user_variable("Y");
        builder.user_variable("Z");
        builder
            .add_subsumption(&Concept::and(vec![n("Y"), n("Z")]), &n("B"))
            .unwrap();
        let goal = builder.build().unwrap();

        let config = UnificationConfig {
            step_limit: 1,
            ..UnificationConfig::default()
        };
        let mut engine = RuleBasedAlgorithm::new(&goal, &config, CancelToken::new());
        // the root only branches, the first leaf needs a second node
        assert_eq!(engine.compute_next(), Err(UnifyError::LimitExceeded { limit: 1 }));
        assert!(engine.compute_next().unwrap().is_some());
    }

    #[test]
    fn test_info_reports_counters() {
        let mut builder = GoalBuilder::new(&NoBackground);
        builder.user_variable("X");
        builder.add_equation(&n("X"), &n("A")).unwrap();
        let goal = builder.build().unwrap();
        let mut engine = RuleBasedAlgorithm::new(&goal, &UnificationConfig::default(), CancelToken::new());
        while engine.compute_next().unwrap().is_some() {}
        let info = engine.info();
        assert!(info.iter().any(|(label, value)| label == "Nodes expanded" && value == "1"));
        assert!(info.iter().any(|(label, _)| label == "Rule Eager Extension"));
        assert_eq!(engine.stats().leaves, 1);
    }

    fn x_values(goal: &Goal, found: &[Unifier]) -> BTreeSet<BTreeSet<AtomId>> {
        let x = goal.atoms().find_concept_name("X").unwrap();
        found
            .iter()
            .map(|u| u.definition(x).unwrap().conjunction.clone())
            .collect()
    }

    #[test]
    fn test_disequation_is_escaped_by_refinement() {
        // ∃r.(X ⊓ B) ≡ ∃r.(A ⊓ B), X ≢ A
        let mut builder = GoalBuilder::new(&NoBackground);
        builder.user_variable("X");
        builder
            .add_equation(
                &Concept::exists("r", Concept::and(vec![n("X"), n("B")])),
                &Concept::exists("r", Concept::and(vec![n("A"), n("B")])),
            )
            .unwrap();
        builder.add_disequation(&n("X"), &n("A")).unwrap();
        let goal = builder.build().unwrap();

        let found = run(&goal);
        assert!(found.iter().all(|u| u.satisfies(&goal)));
        let a = goal.atoms().find_concept_name("A").unwrap();
        let b = goal.atoms().find_concept_name("B").unwrap();
        assert_eq!(x_values(&goal, &found), BTreeSet::from([BTreeSet::from([a, b])]));
    }

    #[test]
    fn test_refinement_keeps_non_minimal_solutions() {
        // X ⊓ Y ≡ A, X ⊑ Y: X = A with Y = ⊤ or Y = A
        let mut builder = GoalBuilder::new(&NoBackground);
        builder.user_variable("X");
        builder.user_variable("Y");
        builder.add_equation(&Concept::and(vec![n("X"), n("Y")]), &n("A")).unwrap();
        builder.add_subsumption(&n("X"), &n("Y")).unwrap();
        let goal = builder.build().unwrap();

        let found = run(&goal);
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|u| u.satisfies(&goal)));
        let y = goal.atoms().find_concept_name("Y").unwrap();
        let sizes: BTreeSet<usize> = found
            .iter()
            .map(|u| u.definition(y).unwrap().conjunction.len())
            .collect();
        assert_eq!(sizes, BTreeSet::from([0, 1]));
    }

    #[test]
    fn test_unconstrained_variable_takes_every_value() {
        // A ⊓ B ≡ A ⊓ B, A ⊑ X, and Y occurs nowhere
        let mut builder = GoalBuilder::new(&NoBackground);
        builder.user_variable("X");
        builder.user_variable("Y");
        let ab = Concept::and(vec![n("A"), n("B")]);
        builder.add_equation(&ab, &ab).unwrap();
        builder.add_subsumption(&n("A"), &n("X")).unwrap();
        let goal = builder.build().unwrap();

        let mut engine = RuleBasedAlgorithm::new(&goal, &UnificationConfig::default(), CancelToken::new());
        let mut found = Vec::new();
        while let Some(u) = engine.compute_next().unwrap() {
            found.push(u);
        }
        // X ∈ {⊤, A} and Y ∈ {⊤, A, B, A ⊓ B}
        assert_eq!(found.len(), 8);
        let keys: HashSet<_> = found.iter().map(|u| u.user_key(&goal)).collect();
        assert_eq!(keys.len(), 8);
        assert!(engine.stats().refinements > 0);
    }
}
