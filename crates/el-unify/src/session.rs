//! Enumeration of unifiers for one goal
//!
//! [`UnifierSession`] pulls unifiers from an engine, drops those that agree
//! with an earlier one on every user variable, and keeps the rest in an
//! append-only list with a cursor.

use crate::algorithm::{create_algorithm, CancelToken, UnificationAlgorithm};
use crate::config::UnificationConfig;
use crate::error::{Result, UnifyError};
use crate::goal::Goal;
use crate::unifier::{Unifier, UnifierKey};
use std::collections::HashSet;
use tracing::{debug, info};

pub struct UnifierSession<'g> {
    goal: &'g Goal,
    algorithm: Box<dyn UnificationAlgorithm + 'g>,
    unifiers: Vec<Unifier>,
    seen: HashSet<UnifierKey>,
    current_index: Option<usize>,
    all_found: bool,
    duplicates_skipped: usize,
    cancel: CancelToken,
}

impl<'g> UnifierSession<'g> {
    pub fn new(goal: &'g Goal, config: &UnificationConfig) -> Self {
        let cancel = CancelToken::new();
        let algorithm = create_algorithm(goal, config, cancel.clone());
        Self::build(goal, algorithm, cancel)
    }

    /// Session over a caller-supplied engine. `cancel` should be the token
    /// the engine checks, [`UnifierSession::cancel_token`] hands it out.
    pub fn with_algorithm(
        goal: &'g Goal,
        algorithm: Box<dyn UnificationAlgorithm + 'g>,
        cancel: CancelToken,
    ) -> Self {
        Self::build(goal, algorithm, cancel)
    }

    fn build(goal: &'g Goal, algorithm: Box<dyn UnificationAlgorithm + 'g>, cancel: CancelToken) -> Self {
        UnifierSession {
            goal,
            algorithm,
            unifiers: Vec::new(),
            seen: HashSet::new(),
            current_index: None,
            all_found: false,
            duplicates_skipped: 0,
            cancel,
        }
    }

    pub fn goal(&self) -> &'g Goal {
        self.goal
    }

    pub fn algorithm_name(&self) -> &str {
        self.algorithm.name()
    }

    /// Pull the engine until it yields a unifier that is new modulo non-user
    /// variables. Returns `false` once the engine is exhausted.
    ///
    /// Errors leave the list untouched. `all_found` is only set by
    /// exhaustion, so an interrupted session can be resumed.
    pub fn compute_next(&mut self) -> Result<bool> {
        if self.all_found {
            return Ok(false);
        }
        loop {
            match self.algorithm.compute_next()? {
                Some(unifier) => {
                    if self.seen.insert(unifier.user_key(self.goal)) {
                        self.unifiers.push(unifier);
                        debug!(count = self.unifiers.len(), "new unifier");
                        return Ok(true);
                    }
                    self.duplicates_skipped += 1;
                }
                None => {
                    self.all_found = true;
                    info!(
                        unifiers = self.unifiers.len(),
                        duplicates = self.duplicates_skipped,
                        algorithm = self.algorithm.name(),
                        "all unifiers found"
                    );
                    return Ok(false);
                }
            }
        }
    }

    pub fn compute_all(&mut self) -> Result<usize> {
        while self.compute_next()? {}
        Ok(self.unifiers.len())
    }

    pub fn current(&self) -> Option<&Unifier> {
        self.current_index.and_then(|idx| self.unifiers.get(idx))
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn all_found(&self) -> bool {
        self.all_found
    }

    pub fn unifiers(&self) -> &[Unifier] {
        &self.unifiers
    }

    pub fn len(&self) -> usize {
        self.unifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unifiers.is_empty()
    }

    pub fn duplicates_skipped(&self) -> usize {
        self.duplicates_skipped
    }

    /// Move to the first unifier, computing it if necessary.
    pub fn first(&mut self) -> Result<Option<&Unifier>> {
        if self.unifiers.is_empty() {
            self.compute_next()?;
        }
        if !self.unifiers.is_empty() {
            self.current_index = Some(0);
        }
        Ok(self.current())
    }

    /// Step back, staying on the first unifier.
    pub fn previous(&mut self) -> Option<&Unifier> {
        self.current_index = self.current_index.map(|idx| idx.saturating_sub(1));
        self.current()
    }

    /// Advance, computing one more unifier at the end of the list. Stays on
    /// the last unifier once all have been found.
    pub fn next(&mut self) -> Result<Option<&Unifier>> {
        let target = self.current_index.map_or(0, |idx| idx + 1);
        if target >= self.unifiers.len() {
            self.compute_next()?;
        }
        if target < self.unifiers.len() {
            self.current_index = Some(target);
        }
        Ok(self.current())
    }

    /// Compute everything and move to the last unifier.
    pub fn last(&mut self) -> Result<Option<&Unifier>> {
        self.compute_all()?;
        self.current_index = self.unifiers.len().checked_sub(1);
        Ok(self.current())
    }

    /// Move the cursor to an already computed unifier.
    pub fn set_current_index(&mut self, index: usize) -> Result<&Unifier> {
        match self.unifiers.get(index) {
            Some(unifier) => {
                self.current_index = Some(index);
                Ok(unifier)
            }
            None => Err(UnifyError::IndexOutOfRange {
                index,
                len: self.unifiers.len(),
            }),
        }
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Engine statistics plus session counters
    pub fn info(&self) -> Vec<(String, String)> {
        let mut info = vec![
            ("Algorithm".to_string(), self.algorithm.name().to_string()),
            ("Unifiers".to_string(), self.unifiers.len().to_string()),
            ("Duplicates skipped".to_string(), self.duplicates_skipped.to_string()),
            ("All found".to_string(), self.all_found.to_string()),
        ];
        info.extend(self.algorithm.info());
        info
    }

    /// Pull iterator over unifiers computed from now on
    pub fn iter(&mut self) -> NewUnifiers<'_, 'g> {
        NewUnifiers {
            session: self,
            done: false,
        }
    }
}

/// Iterator returned by [`UnifierSession::iter`]
pub struct NewUnifiers<'s, 'g> {
    session: &'s mut UnifierSession<'g>,
    done: bool,
}

impl Iterator for NewUnifiers<'_, '_> {
    type Item = Result<Unifier>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.session.compute_next() {
            Ok(true) => self.session.unifiers.last().cloned().map(Ok),
            Ok(false) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
