//! Unification configuration types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Configuration shared by goal construction and the engines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnificationConfig {
    pub algorithm: AlgorithmKind,
    /// Search nodes (rule-based) or oracle calls (SAT-based) allowed per
    /// `compute_next` call
    pub step_limit: usize,
    /// Suffix of the constant standing for the undefined part of a
    /// primitive definition
    pub undef_suffix: String,
    /// Prefix of variables introduced by flattening
    pub aux_prefix: String,
}

/// Available unification engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlgorithmKind {
    /// Backtracking search with eager and non-deterministic rules
    #[serde(rename = "rule")]
    RuleBased,
    /// SAT encoding, every satisfying assignment
    #[serde(rename = "sat")]
    SatBased,
    /// SAT encoding, subset-minimal assignments only
    #[serde(rename = "sat-minimal")]
    SatBasedMinimal,
}

impl AlgorithmKind {
    pub const ALL: [AlgorithmKind; 3] = [
        AlgorithmKind::RuleBased,
        AlgorithmKind::SatBased,
        AlgorithmKind::SatBasedMinimal,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AlgorithmKind::RuleBased => "rule",
            AlgorithmKind::SatBased => "sat",
            AlgorithmKind::SatBasedMinimal => "sat-minimal",
        }
    }
}

impl fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AlgorithmKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AlgorithmKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| format!("unknown algorithm '{}', expected one of rule, sat, sat-minimal", s))
    }
}

impl Default for UnificationConfig {
    fn default() -> Self {
        UnificationConfig {
            algorithm: AlgorithmKind::RuleBased,
            step_limit: 0, // 0 means no limit
            undef_suffix: "_UNDEF".to_string(),
            aux_prefix: "VAR".to_string(),
        }
    }
}

impl UnificationConfig {
    pub fn with_algorithm(algorithm: AlgorithmKind) -> Self {
        UnificationConfig {
            algorithm,
            ..UnificationConfig::default()
        }
    }
}
