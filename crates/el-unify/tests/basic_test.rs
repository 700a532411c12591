//! Integration tests for unifier enumeration

use el_unify::{AlgorithmKind, AtomId, Concept, Goal, GoalBuilder, NoBackground, UnificationConfig, UnifierSession};
use std::collections::BTreeSet;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn n(name: &str) -> Concept {
    Concept::name(name)
}

fn and(parts: Vec<Concept>) -> Concept {
    Concept::and(parts)
}

fn ex(role: &str, filler: Concept) -> Concept {
    Concept::exists(role, filler)
}

fn count(goal: &Goal, kind: AlgorithmKind) -> usize {
    let mut session = UnifierSession::new(goal, &UnificationConfig::with_algorithm(kind));
    let found = session.compute_all().unwrap();
    assert!(session.all_found());
    for unifier in session.unifiers() {
        assert!(unifier.satisfies(goal), "{} produced a non-unifier", kind);
    }
    found
}

fn counts(goal: &Goal) -> [usize; 3] {
    AlgorithmKind::ALL.map(|kind| count(goal, kind))
}

#[test]
fn test_single_equation_has_one_unifier() {
    init_tracing();
    let mut builder = GoalBuilder::new(&NoBackground);
    builder.user_variable("X");
    builder.add_equation(&n("X"), &and(vec![n("A"), ex("r", n("B"))])).unwrap();
    let goal = builder.build().unwrap();

    let mut session = UnifierSession::new(&goal, &UnificationConfig::default());
    assert!(session.compute_next().unwrap());
    assert!(!session.all_found());
    assert!(!session.compute_next().unwrap());
    assert!(session.all_found());
    assert_eq!(session.len(), 1);

    assert_eq!(counts(&goal), [1, 1, 1]);
}

#[test]
fn test_split_conjunction_below_restriction() {
    init_tracing();
    let mut builder = GoalBuilder::new(&NoBackground);
    for var in ["X", "Y", "Z"] {
        builder.user_variable(var);
    }
    builder.add_equation(&n("X"), &and(vec![n("A"), ex("r", n("Y"))])).unwrap();
    builder.add_equation(&and(vec![n("Y"), n("Z")]), &n("B")).unwrap();
    let goal = builder.build().unwrap();

    // Y = B, Z = B, or both; the minimal engine drops Y = Z = B
    assert_eq!(counts(&goal), [3, 3, 2]);
}

#[test]
fn test_alternative_fillers_give_two_unifiers() {
    init_tracing();
    let mut builder = GoalBuilder::new(&NoBackground);
    for var in ["X", "Y", "Z"] {
        builder.user_variable(var);
    }
    builder.add_equation(&n("X"), &and(vec![n("A"), ex("r", n("Y"))])).unwrap();
    builder
        .add_equation(&and(vec![ex("r", n("Y")), ex("r", n("Z"))]), &and(vec![ex("r", n("B")), ex("r", n("C"))]))
        .unwrap();
    let goal = builder.build().unwrap();

    // Y = B or Y = C, Z takes the other one
    assert_eq!(counts(&goal), [2, 2, 2]);
}

#[test]
fn test_disequation_removes_only_unifier() {
    init_tracing();
    let rhs = and(vec![n("A"), ex("r", n("B"))]);
    let mut builder = GoalBuilder::new(&NoBackground);
    builder.user_variable("X");
    builder.add_equation(&n("X"), &rhs).unwrap();
    builder.add_disequation(&n("X"), &rhs).unwrap();
    let goal = builder.build().unwrap();

    assert_eq!(counts(&goal), [0, 0, 0]);
}

#[test]
fn test_dissubsumption_rules_out_one_side() {
    init_tracing();
    let mut builder = GoalBuilder::new(&NoBackground);
    builder.user_variable("Y");
    builder.user_variable("Z");
    builder.add_equation(&and(vec![n("Y"), n("Z")]), &n("B")).unwrap();
    builder.add_dissubsumption(&n("Y"), &n("B")).unwrap();
    let goal = builder.build().unwrap();

    assert_eq!(counts(&goal), [1, 1, 1]);

    let mut session = UnifierSession::new(&goal, &UnificationConfig::default());
    let unifier = session.first().unwrap().unwrap().clone();
    let atoms = goal.atoms();
    let y = atoms.find_concept_name("Y").unwrap();
    let z = atoms.find_concept_name("Z").unwrap();
    assert!(unifier.definition(y).unwrap().conjunction.is_empty());
    assert_eq!(unifier.definition(z).unwrap().conjunction.len(), 1);
}

#[test]
fn test_unsolvable_goals() {
    init_tracing();
    // clash of constants
    let mut builder = GoalBuilder::new(&NoBackground);
    builder.add_equation(&n("A"), &n("B")).unwrap();
    let clash = builder.build().unwrap();
    assert_eq!(counts(&clash), [0, 0, 0]);

    // X would have to contain ∃r.X
    let mut builder = GoalBuilder::new(&NoBackground);
    builder.user_variable("X");
    builder.add_equation(&n("X"), &and(vec![n("A"), ex("r", n("X"))])).unwrap();
    let cyclic = builder.build().unwrap();
    assert_eq!(counts(&cyclic), [0, 0, 0]);

    // different roles never match
    let mut builder = GoalBuilder::new(&NoBackground);
    builder.user_variable("X");
    builder.add_equation(&ex("r", n("X")), &ex("s", n("A"))).unwrap();
    let roles = builder.build().unwrap();
    assert_eq!(counts(&roles), [0, 0, 0]);
}

#[test]
fn test_ground_goal_without_variables() {
    init_tracing();
    let mut builder = GoalBuilder::new(&NoBackground);
    builder
        .add_subsumption(&and(vec![n("A"), ex("r", n("B"))]), &ex("r", n("B")))
        .unwrap();
    let goal = builder.build().unwrap();
    // the empty unifier
    assert_eq!(counts(&goal), [1, 1, 1]);
}

fn nested_filler_builder() -> GoalBuilder<'static, Concept, NoBackground> {
    // ∃r.(X ⊓ B) ≡ ∃r.(A ⊓ B)
    let mut builder = GoalBuilder::new(&NoBackground);
    builder.user_variable("X");
    builder
        .add_equation(&ex("r", and(vec![n("X"), n("B")])), &ex("r", and(vec![n("A"), n("B")])))
        .unwrap();
    builder
}

fn x_values(goal: &Goal, kind: AlgorithmKind) -> BTreeSet<BTreeSet<AtomId>> {
    let mut session = UnifierSession::new(goal, &UnificationConfig::with_algorithm(kind));
    session.compute_all().unwrap();
    let x = goal.atoms().find_concept_name("X").unwrap();
    session
        .unifiers()
        .iter()
        .map(|u| u.definition(x).unwrap().conjunction.clone())
        .collect()
}

#[test]
fn test_nested_filler_is_unified() {
    init_tracing();
    let goal = nested_filler_builder().build().unwrap();
    let a = goal.atoms().find_concept_name("A").unwrap();
    let b = goal.atoms().find_concept_name("B").unwrap();

    // X = A or X = A ⊓ B
    let both = BTreeSet::from([BTreeSet::from([a]), BTreeSet::from([a, b])]);
    assert_eq!(x_values(&goal, AlgorithmKind::RuleBased), both);
    assert_eq!(x_values(&goal, AlgorithmKind::SatBased), both);
    assert_eq!(
        x_values(&goal, AlgorithmKind::SatBasedMinimal),
        BTreeSet::from([BTreeSet::from([a])])
    );
}

#[test]
fn test_disequation_forces_larger_value() {
    init_tracing();
    let mut builder = nested_filler_builder();
    builder.add_disequation(&n("X"), &n("A")).unwrap();
    let goal = builder.build().unwrap();
    assert_eq!(counts(&goal), [1, 1, 1]);

    let a = goal.atoms().find_concept_name("A").unwrap();
    let b = goal.atoms().find_concept_name("B").unwrap();
    for kind in AlgorithmKind::ALL {
        assert_eq!(x_values(&goal, kind), BTreeSet::from([BTreeSet::from([a, b])]), "{}", kind);
    }
}

#[test]
fn test_free_user_variable_multiplies_unifiers() {
    init_tracing();
    // A ⊓ B ≡ A ⊓ B, A ⊑ X, and Y occurs nowhere
    let mut builder = GoalBuilder::new(&NoBackground);
    builder.user_variable("X");
    builder.user_variable("Y");
    let ab = and(vec![n("A"), n("B")]);
    builder.add_equation(&ab, &ab).unwrap();
    builder.add_subsumption(&n("A"), &n("X")).unwrap();
    let goal = builder.build().unwrap();

    // X ∈ {⊤, A}, Y ∈ {⊤, A, B, A ⊓ B}; minimal means both ⊤
    assert_eq!(counts(&goal), [8, 8, 1]);
}
