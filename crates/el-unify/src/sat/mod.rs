//! SAT-based unification engine
//!
//! The goal is encoded once by [`Encoding::encode`]. Each call to
//! [`UnificationAlgorithm::compute_next`] asks the oracle for a model,
//! optionally shrinks it to a subset-minimal one, decodes it into a unifier
//! and adds a blocking clause so the next call finds something else.

pub mod cnf;
pub mod encoder;
pub mod oracle;

pub use cnf::{Clause, Cnf, Lit, Model, SatOutcome};
pub use encoder::{Encoding, SubsumerLiteral};
pub use oracle::{OracleError, SatOracle, VarisatOracle};

use crate::algorithm::{CancelToken, UnificationAlgorithm};
use crate::config::UnificationConfig;
use crate::error::{Result, UnifyError};
use crate::goal::Goal;
use crate::stats::SatStats;
use crate::unifier::Unifier;
use tracing::{debug, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SatMode {
    /// Every model, blocked on the values of the user variables.
    ///
    /// Every other variable is the left side of an equation, so the user
    /// `s` literals fix the unifier up to equivalence. The result is one
    /// unifier per class of local unifiers, the same set the rule-based
    /// engine reaches.
    All,
    /// Only models whose set of true `s` literals is subset-minimal. A
    /// subset of what `All` reports, nonempty iff that is.
    Minimal,
}

pub struct SatBasedAlgorithm<'g> {
    goal: &'g Goal,
    mode: SatMode,
    encoding: Encoding,
    oracle: Box<dyn SatOracle + 'g>,
    cancel: CancelToken,
    step_limit: usize,
    exhausted: bool,
    /// First oracle error, repeated on every later call
    failure: Option<String>,
    stats: SatStats,
}

impl<'g> SatBasedAlgorithm<'g> {
    pub fn new(goal: &'g Goal, config: &UnificationConfig, mode: SatMode, cancel: CancelToken) -> Self {
        Self::with_oracle(goal, config, mode, Box::new(VarisatOracle::new()), cancel)
    }

    pub fn with_oracle(
        goal: &'g Goal,
        config: &UnificationConfig,
        mode: SatMode,
        oracle: Box<dyn SatOracle + 'g>,
        cancel: CancelToken,
    ) -> Self {
        let encoding = Encoding::encode(goal);
        let stats = SatStats {
            variables: encoding.cnf().num_vars() as usize,
            clauses: encoding.cnf().num_clauses(),
            subsumption_literals: encoding.subsumption_literals(),
            ..SatStats::default()
        };
        debug!(?mode, oracle = oracle.name(), "SAT-based search initialized");
        SatBasedAlgorithm {
            goal,
            mode,
            encoding,
            oracle,
            cancel,
            step_limit: config.step_limit,
            exhausted: false,
            failure: None,
            stats,
        }
    }

    pub fn mode(&self) -> SatMode {
        self.mode
    }

    pub fn stats(&self) -> &SatStats {
        &self.stats
    }

    pub fn encoding(&self) -> &Encoding {
        &self.encoding
    }

    /// One oracle call, guarded by cancellation and the step limit.
    fn call_oracle(&mut self, cnf: Option<&Cnf>, steps: &mut usize) -> Result<SatOutcome> {
        if self.cancel.is_cancelled() {
            return Err(UnifyError::Interrupted);
        }
        if self.step_limit > 0 && *steps >= self.step_limit {
            return Err(UnifyError::LimitExceeded {
                limit: self.step_limit,
            });
        }
        *steps += 1;
        self.stats.oracle_calls += 1;
        let outcome = match cnf {
            Some(cnf) => self.oracle.solve(cnf),
            None => self.oracle.solve(self.encoding.cnf()),
        };
        outcome.map_err(|err| {
            warn!(error = %err, "SAT oracle failed");
            self.failure = Some(err.0.clone());
            UnifyError::OracleFailure(err.0)
        })
    }

    /// True `s` literals of a model
    fn true_subsumers(&self, model: &Model) -> Vec<Lit> {
        self.encoding
            .subsumer_literals()
            .iter()
            .filter(|s| model.value(s.lit))
            .map(|s| s.lit)
            .collect()
    }

    /// Shrink `model` until no model with strictly fewer true `s` literals
    /// exists.
    fn minimize(&mut self, mut model: Model, steps: &mut usize) -> Result<Model> {
        loop {
            let true_lits = self.true_subsumers(&model);
            if true_lits.is_empty() {
                return Ok(model);
            }
            let mut trial = self.encoding.cnf().clone();
            for s in self.encoding.subsumer_literals() {
                if !model.value(s.lit) {
                    trial.add_clause(&[!s.lit]);
                }
            }
            let smaller: Clause = true_lits.iter().map(|&lit| !lit).collect();
            trial.add_clause(&smaller);

            self.stats.minimization_calls += 1;
            match self.call_oracle(Some(&trial), steps)? {
                SatOutcome::Satisfiable(next) => {
                    trace!(before = true_lits.len(), "model shrunk");
                    model = next;
                }
                SatOutcome::Unsatisfiable => return Ok(model),
            }
        }
    }

    /// Clause excluding `model` (and, in minimal mode, all its supersets)
    fn blocking_clause(&self, model: &Model) -> Clause {
        match self.mode {
            SatMode::Minimal => self.true_subsumers(model).into_iter().map(|lit| !lit).collect(),
            SatMode::All => self
                .encoding
                .subsumer_literals()
                .iter()
                .filter(|s| s.user)
                .map(|s| if model.value(s.lit) { !s.lit } else { s.lit })
                .collect(),
        }
    }
}

impl UnificationAlgorithm for SatBasedAlgorithm<'_> {
    fn name(&self) -> &str {
        match self.mode {
            SatMode::All => "sat",
            SatMode::Minimal => "sat-minimal",
        }
    }

    fn compute_next(&mut self) -> Result<Option<Unifier>> {
        if let Some(msg) = &self.failure {
            return Err(UnifyError::OracleFailure(msg.clone()));
        }
        if self.exhausted {
            return Ok(None);
        }

        let mut steps = 0;
        let mut model = match self.call_oracle(None, &mut steps)? {
            SatOutcome::Satisfiable(model) => model,
            SatOutcome::Unsatisfiable => {
                debug!(calls = self.stats.oracle_calls, "SAT-based search exhausted");
                self.exhausted = true;
                return Ok(None);
            }
        };
        if self.mode == SatMode::Minimal {
            model = self.minimize(model, &mut steps)?;
        }
        self.stats.models += 1;

        let unifier = Unifier::from_assignment(self.goal, &self.encoding.decode(&model));
        debug_assert!(unifier.satisfies(self.goal));

        let blocking = self.blocking_clause(&model);
        if blocking.is_empty() {
            // nothing left to distinguish further models by
            self.exhausted = true;
        } else {
            self.encoding.add_clause(&blocking);
            self.stats.blocking_clauses += 1;
            self.stats.clauses = self.encoding.cnf().num_clauses();
        }
        debug!(models = self.stats.models, "unifier found");
        Ok(Some(unifier))
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

    struct FailingOracle;

    impl SatOracle for FailingOracle {
        fn name(&self) -> &str {
            "failing"
        }

        fn solve(&mut self, _cnf: &Cnf) -> std::result::Result<SatOutcome, OracleError> {
            Err(OracleError("solver crashed".to_string()))
        }
    }

    fn run(goal: &Goal, mode: SatMode) -> Vec<Unifier> {
        let mut engine = SatBasedAlgorithm::new(goal, &UnificationConfig::default(), mode, CancelToken::new());
        let mut found = Vec::new();
        while let Some(u) = engine.compute_next().unwrap() {
            found.push(u);
        }
        found
    }

    /// `Y ⊓ Z ⊑ B` with only `Y` a user variable
    fn split_goal() -> Goal {
        let mut builder = GoalBuilder::new(&NoBackground);
        builder.user_variable("Y");
        builder.user_variable("Z");
        builder
            .add_subsumption(&Concept::and(vec![n("Y"), n("Z")]), &n("B"))
            .unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn test_single_solution_in_both_modes() {
        let mut builder = GoalBuilder::new(&NoBackground);
        builder.user_variable("X");
        builder
            .add_equation(&n("X"), &Concept::and(vec![n("A"), Concept::exists("r", n("B"))]))
            .unwrap();
        let goal = builder.build().unwrap();

        for mode in [SatMode::All, SatMode::Minimal] {
            let found = run(&goal, mode);
            assert_eq!(found.len(), 1, "{:?}", mode);
            assert!(found[0].satisfies(&goal));
        }
    }

    #[test]
    fn test_minimal_mode_drops_supersets() {
        let goal = split_goal();
        let minimal = run(&goal, SatMode::Minimal);
        // Y = B or Z = B
        assert_eq!(minimal.len(), 2);
        // additionally Y = Z = B
        let all = run(&goal, SatMode::All);
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|u| u.satisfies(&goal)));
    }

    #[test]
    fn test_all_mode_keeps_non_minimal_solutions() {
        // X ⊓ Y ≡ A, X ⊑ Y
        let mut builder = GoalBuilder::new(&NoBackground);
        builder.user_variable("X");
        builder.user_variable("Y");
        builder.add_equation(&Concept::and(vec![n("X"), n("Y")]), &n("A")).unwrap();
        builder.add_subsumption(&n("X"), &n("Y")).unwrap();
        let goal = builder.build().unwrap();

        assert_eq!(run(&goal, SatMode::All).len(), 2);
        let minimal = run(&goal, SatMode::Minimal);
        assert_eq!(minimal.len(), 1);
        let y = goal.atoms().find_concept_name("Y").unwrap();
        assert!(minimal[0].definition(y).unwrap().conjunction.is_empty());
    }

    #[test]
    fn test_unsatisfiable_goal() {
        let mut builder = GoalBuilder::new(&NoBackground);
        builder.add_equation(&n("A"), &n("B")).unwrap();
        let goal = builder.build().unwrap();
        let mut engine =
            SatBasedAlgorithm::new(&goal, &UnificationConfig::default(), SatMode::All, CancelToken::new());
        assert_eq!(engine.compute_next(), Ok(None));
        // exhausted engines stay silent and do not consult the oracle
        let calls = engine.stats().oracle_calls;
        assert_eq!(engine.compute_next(), Ok(None));
        assert_eq!(engine.stats().oracle_calls, calls);
    }

    #[test]
    fn test_oracle_failure_is_sticky() {
        let goal = split_goal();
        let mut engine = SatBasedAlgorithm::with_oracle(
            &goal,
            &UnificationConfig::default(),
            SatMode::All,
            Box::new(FailingOracle),
            CancelToken::new(),
        );
        let expected = Err(UnifyError::OracleFailure("solver crashed".to_string()));
        assert_eq!(engine.compute_next(), expected);
        assert_eq!(engine.compute_next(), expected);
        assert_eq!(engine.stats().oracle_calls, 1);
    }

    #[test]
    fn test_cancellation_before_oracle_call() {
        let goal = split_goal();
        let cancel = CancelToken::new();
        let mut engine = SatBasedAlgorithm::new(&goal, &UnificationConfig::default(), SatMode::Minimal, cancel.clone());
        cancel.cancel();
        assert_eq!(engine.compute_next(), Err(UnifyError::Interrupted));
        assert_eq!(engine.stats().oracle_calls, 0);
        cancel.reset();
        assert!(engine.compute_next().unwrap().is_some());
    }

    #[test]
    fn test_step_limit_counts_minimization_calls() {
        let goal = split_goal();
        let config = UnificationConfig {
            step_limit: 1,
            ..UnificationConfig::default()
        };
        let mut engine = SatBasedAlgorithm::new(&goal, &config, SatMode::Minimal, CancelToken::new());
        // the first model is known to be minimal only after a second call
        assert_eq!(engine.compute_next(), Err(UnifyError::LimitExceeded { limit: 1 }));
    }

    #[test]
    fn test_names_and_info() {
        let goal = split_goal();
        let engine = SatBasedAlgorithm::new(&goal, &UnificationConfig::default(), SatMode::All, CancelToken::new());
        assert_eq!(engine.name(), "sat");
        assert_eq!(engine.mode(), SatMode::All);
        assert!(engine.info().iter().any(|(label, value)| label == "Oracle calls" && value == "0"));
        let engine = SatBasedAlgorithm::new(&goal, &UnificationConfig::default(), SatMode::Minimal, CancelToken::new());
        assert_eq!(engine.name(), "sat-minimal");
    }
}
