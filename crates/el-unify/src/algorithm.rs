//! Common interface of the unification engines

use crate::config::{AlgorithmKind, UnificationConfig};
use crate::error::Result;
use crate::goal::Goal;
use crate::rule::RuleBasedAlgorithm;
use crate::sat::{SatBasedAlgorithm, SatMode};
use crate::unifier::Unifier;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A resumable unifier search over one goal.
pub trait UnificationAlgorithm {
    fn name(&self) -> &str;

    /// Continue the search until the next unifier is found.
    ///
    /// Returns `Ok(None)` once the search space is exhausted. An error leaves
    /// earlier results untouched; after `Interrupted` the search can be
    /// resumed.
    fn compute_next(&mut self) -> Result<Option<Unifier>>;

    /// Statistics as `(label, value)` pairs
    fn info(&self) -> Vec<(String, String)>;
}

/// Cooperative cancellation flag shared between a caller and an engine
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Create the engine selected by `config.algorithm`.
pub fn create_algorithm<'g>(
    goal: &'g Goal,
    config: &UnificationConfig,
    cancel: CancelToken,
) -> Box<dyn UnificationAlgorithm + 'g> {
    match config.algorithm {
        AlgorithmKind::RuleBased => Box::new(RuleBasedAlgorithm::new(goal, config, cancel)),
        AlgorithmKind::SatBased => Box::new(SatBasedAlgorithm::new(goal, config, SatMode::All, cancel)),
        AlgorithmKind::SatBasedMinimal => {
            Box::new(SatBasedAlgorithm::new(goal, config, SatMode::Minimal, cancel))
        }
    }
}
