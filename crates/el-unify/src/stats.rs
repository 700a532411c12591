//! Search statistics
//!
//! Counters are plain fields bumped by the engines. They serialize to JSON
//! and flatten into the `(label, value)` pairs of
//! [`UnificationAlgorithm::info`](crate::algorithm::UnificationAlgorithm::info).

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Counters of the rule-based engine.
#[derive(Debug, Clone, Default)]
pub struct RuleStats {
    pub nodes_expanded: usize,
    pub eager_applications: usize,
    pub branches_created: usize,
    pub failed_branches: usize,
    pub memoized_skips: usize,
    pub leaves: usize,
    pub rejected_leaves: usize,
    /// Leaves whose assignment was already reported on another path
    pub repeated_leaves: usize,
    pub refinements: usize,
    pub max_stack_depth: usize,
    /// Applications per rule name
    pub rule_counts: BTreeMap<&'static str, usize>,
}

impl RuleStats {
    pub fn record_rule(&mut self, name: &'static str) {
        *self.rule_counts.entry(name).or_default() += 1;
    }

    pub fn record_stack_depth(&mut self, depth: usize) {
        self.max_stack_depth = self.max_stack_depth.max(depth);
    }

    pub fn to_info(&self) -> Vec<(String, String)> {
        let mut info = vec![
            ("Nodes expanded".to_string(), self.nodes_expanded.to_string()),
            ("Eager rule applications".to_string(), self.eager_applications.to_string()),
            ("Branches created".to_string(), self.branches_created.to_string()),
            ("Failed branches".to_string(), self.failed_branches.to_string()),
            ("Memoized states skipped".to_string(), self.memoized_skips.to_string()),
            ("Leaves reached".to_string(), self.leaves.to_string()),
            ("Leaves rejected".to_string(), self.rejected_leaves.to_string()),
            ("Leaves repeated".to_string(), self.repeated_leaves.to_string()),
            ("Refinements".to_string(), self.refinements.to_string()),
            ("Maximum stack depth".to_string(), self.max_stack_depth.to_string()),
        ];
        info.extend(
            self.rule_counts
                .iter()
                .map(|(name, count)| (format!("Rule {}", name), count.to_string())),
        );
        info
    }
}

impl Serialize for RuleStats {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("RuleStats", 11)?;
        s.serialize_field("nodes_expanded", &self.nodes_expanded)?;
        s.serialize_field("eager_applications", &self.eager_applications)?;
        s.serialize_field("branches_created", &self.branches_created)?;
        s.serialize_field("failed_branches", &self.failed_branches)?;
        s.serialize_field("memoized_skips", &self.memoized_skips)?;
        s.serialize_field("leaves", &self.leaves)?;
        s.serialize_field("rejected_leaves", &self.rejected_leaves)?;
        s.serialize_field("repeated_leaves", &self.repeated_leaves)?;
        s.serialize_field("refinements", &self.refinements)?;
        s.serialize_field("max_stack_depth", &self.max_stack_depth)?;
        s.serialize_field("rule_counts", &self.rule_counts)?;
        s.end()
    }
}

/// Counters of the SAT-based engine.
#[derive(Debug, Clone, Default)]
pub struct SatStats {
    pub variables: usize,
    pub clauses: usize,
    pub subsumption_literals: usize,
    pub oracle_calls: usize,
    pub minimization_calls: usize,
    pub models: usize,
    pub blocking_clauses: usize,
}

impl SatStats {
    pub fn to_info(&self) -> Vec<(String, String)> {
        vec![
            ("Propositional variables".to_string(), self.variables.to_string()),
            ("Clauses".to_string(), self.clauses.to_string()),
            ("Subsumption literals".to_string(), self.subsumption_literals.to_string()),
            ("Oracle calls".to_string(), self.oracle_calls.to_string()),
            ("Minimization calls".to_string(), self.minimization_calls.to_string()),
            ("Models found".to_string(), self.models.to_string()),
            ("Blocking clauses".to_string(), self.blocking_clauses.to_string()),
        ]
    }
}

impl Serialize for SatStats {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("SatStats", 7)?;
        s.serialize_field("variables", &self.variables)?;
        s.serialize_field("clauses", &self.clauses)?;
        s.serialize_field("subsumption_literals", &self.subsumption_literals)?;
        s.serialize_field("oracle_calls", &self.oracle_calls)?;
        s.serialize_field("minimization_calls", &self.minimization_calls)?;
        s.serialize_field("models", &self.models)?;
        s.serialize_field("blocking_clauses", &self.blocking_clauses)?;
        s.end()
    }
}
