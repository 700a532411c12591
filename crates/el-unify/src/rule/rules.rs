//! Rule table of the rule-based engine
//!
//! Rules are plain tagged values. [`RULE_TABLE`] lists them in priority
//! order: every eager rule comes before every non-deterministic one. Each rule
//! inspects one pending subsumption `C1 ⊓ … ⊓ Cn ⊑ D` and proposes
//! [`Application`]s. Eager rules propose at most one. Non-deterministic rules
//! propose one alternative per way of solving the subsumption.

use super::state::SearchNode;
use crate::atoms::{AtomId, AtomManager};
use crate::goal::FlatSubsumption;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EagerRule {
    /// No variables at all: holds iff `D` is one of the `Ci`
    GroundSolving,
    /// `D` is one of the `Ci`
    Solving,
    /// Some body variable `X` already has `D ∈ S_X`
    AssignmentSolving,
    /// `D` is a variable: require `C ⊑ E` for every `E ∈ S_D`
    Expansion,
    /// Body variable `X` with every other `Ci ∈ S_X`: add `D` to `S_X`
    Extension,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NondeterministicRule {
    /// `D = ∃r.Y` and some `Ci = ∃r.Z`: require `Z ⊑ Y`
    Decomposition,
    /// Some `Ci = X` is a variable: add `D` to `S_X`
    Extension,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    Eager(EagerRule),
    NonDeterministic(NondeterministicRule),
}

pub const RULE_TABLE: [Rule; 7] = [
    Rule::Eager(EagerRule::GroundSolving),
    Rule::Eager(EagerRule::Solving),
    Rule::Eager(EagerRule::AssignmentSolving),
    Rule::Eager(EagerRule::Expansion),
    Rule::Eager(EagerRule::Extension),
    Rule::NonDeterministic(NondeterministicRule::Decomposition),
    Rule::NonDeterministic(NondeterministicRule::Extension),
];

/// Effect of applying a rule to one subsumption. Every application except
/// `Fail` marks that subsumption solved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Application {
    Solve,
    Fail,
    Extend { var: AtomId, atom: AtomId },
    Decompose { body: AtomId, head: AtomId },
    ExpandHead,
}

impl Rule {
    pub fn name(self) -> &'static str {
        match self {
            Rule::Eager(EagerRule::GroundSolving) => "Eager Ground Solving",
            Rule::Eager(EagerRule::Solving) => "Eager Solving",
            Rule::Eager(EagerRule::AssignmentSolving) => "Eager Assignment Solving",
            Rule::Eager(EagerRule::Expansion) => "Eager Expansion",
            Rule::Eager(EagerRule::Extension) => "Eager Extension",
            Rule::NonDeterministic(NondeterministicRule::Decomposition) => "Decomposition",
            Rule::NonDeterministic(NondeterministicRule::Extension) => "Extension",
        }
    }

    pub fn is_eager(self) -> bool {
        matches!(self, Rule::Eager(_))
    }

    /// All ways this rule applies to `sub` in `node`, in body order.
    pub fn applications(self, sub: &FlatSubsumption, node: &SearchNode, atoms: &AtomManager) -> Vec<Application> {
        match self {
            Rule::Eager(rule) => eager(rule, sub, node, atoms).into_iter().collect(),
            Rule::NonDeterministic(rule) => nondeterministic(rule, sub, atoms),
        }
    }
}

fn body_variables<'s>(sub: &'s FlatSubsumption, atoms: &'s AtomManager) -> impl Iterator<Item = AtomId> + 's {
    sub.body.iter().copied().filter(|&a| atoms.is_variable(a))
}

fn eager(rule: EagerRule, sub: &FlatSubsumption, node: &SearchNode, atoms: &AtomManager) -> Option<Application> {
    let head = sub.head;
    match rule {
        EagerRule::GroundSolving => {
            let ground = atoms.is_ground(head) && sub.body.iter().all(|&a| atoms.is_ground(a));
            if !ground {
                None
            } else if sub.body.contains(&head) {
                Some(Application::Solve)
            } else {
                Some(Application::Fail)
            }
        }
        EagerRule::Solving => sub.body.contains(&head).then_some(Application::Solve),
        EagerRule::AssignmentSolving => body_variables(sub, atoms)
            .any(|x| node.assignment.contains(x, head))
            .then_some(Application::Solve),
        EagerRule::Expansion => atoms.is_variable(head).then_some(Application::ExpandHead),
        EagerRule::Extension => {
            if atoms.is_variable(head) {
                return None;
            }
            body_variables(sub, atoms)
                .find(|&x| {
                    sub.body
                        .iter()
                        .filter(|&&c| c != x)
                        .all(|&c| node.assignment.contains(x, c))
                })
                .map(|var| Application::Extend { var, atom: head })
        }
    }
}

fn nondeterministic(rule: NondeterministicRule, sub: &FlatSubsumption, atoms: &AtomManager) -> Vec<Application> {
    let head = sub.head;
    if atoms.is_variable(head) {
        return Vec::new();
    }
    match rule {
        NondeterministicRule::Decomposition => {
            let Some((role, head_filler)) = atoms.as_existential(head) else {
                return Vec::new();
            };
            sub.body
                .iter()
                .filter_map(|&c| atoms.as_existential(c))
                .filter(|&(r, _)| r == role)
                .map(|(_, filler)| Application::Decompose {
                    body: filler,
                    head: head_filler,
                })
                .collect()
        }
        NondeterministicRule::Extension => body_variables(sub, atoms)
            .map(|var| Application::Extend { var, atom: head })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::ConceptKind;

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
            self.atoms.set_kind(id, ConceptKind::UserVariable);
            id
        }

        fn name(&mut self, name: &str) -> AtomId {
            self.atoms.concept_name(name)
        }

        fn exists(&mut self, role: &str, filler: AtomId) -> AtomId {
            self.atoms.existential(role, filler).unwrap()
        }

        fn apps(&self, rule: Rule, sub: &FlatSubsumption, node: &SearchNode) -> Vec<Application> {
            rule.applications(sub, node, &self.atoms)
        }
    }

    fn sub(body: &[AtomId], head: AtomId) -> FlatSubsumption {
        FlatSubsumption {
            body: body.iter().copied().collect(),
            head,
        }
    }

    #[test]
    fn test_table_puts_eager_rules_first() {
        let first_nd = RULE_TABLE.iter().position(|r| !r.is_eager()).unwrap();
        assert!(RULE_TABLE[first_nd..].iter().all(|r| !r.is_eager()));
        assert_eq!(first_nd, 5);
    }

    #[test]
    fn test_ground_solving() {
        let mut ctx = TestContext::new();
        let a = ctx.name("A");
        let b = ctx.name("B");
        let node = SearchNode::new(vec![]);
        let rule = Rule::Eager(EagerRule::GroundSolving);
        assert_eq!(ctx.apps(rule, &sub(&[a, b], a), &node), vec![Application::Solve]);
        assert_eq!(ctx.apps(rule, &sub(&[a], b), &node), vec![Application::Fail]);

        let x = ctx.var("X");
        let rx = ctx.exists("r", x);
        assert!(ctx.apps(rule, &sub(&[rx], a), &node).is_empty());
    }

    #[test]
    fn test_assignment_solving_and_extension() {
        let mut ctx = TestContext::new();
        let x = ctx.var("X");
        let a = ctx.name("A");
        let b = ctx.name("B");
        let mut node = SearchNode::new(vec![]);

        let extension = Rule::Eager(EagerRule::Extension);
        // X ⊓ A ⊑ B: eager extension needs A ∈ S_X
        assert!(ctx.apps(extension, &sub(&[x, a], b), &node).is_empty());
        node.extend(x, a, &ctx.atoms).unwrap();
        assert_eq!(
            ctx.apps(extension, &sub(&[x, a], b), &node),
            vec![Application::Extend { var: x, atom: b }]
        );

        let solving = Rule::Eager(EagerRule::AssignmentSolving);
        assert_eq!(ctx.apps(solving, &sub(&[x], a), &node), vec![Application::Solve]);
        assert!(ctx.apps(solving, &sub(&[x], b), &node).is_empty());
    }

    #[test]
    fn test_decomposition_matches_roles() {
        let mut ctx = TestContext::new();
        let x = ctx.var("X");
        let y = ctx.var("Y");
        let a = ctx.name("A");
        let ry = ctx.exists("r", y);
        let sa = ctx.exists("s", a);
        let ra = ctx.exists("r", a);
        let node = SearchNode::new(vec![]);

        // X ⊓ ∃s.A ⊓ ∃r.A ⊑ ∃r.Y
        let s = sub(&[x, sa, ra], ry);
        assert_eq!(
            ctx.apps(Rule::NonDeterministic(NondeterministicRule::Decomposition), &s, &node),
            vec![Application::Decompose { body: a, head: y }]
        );
        assert_eq!(
            ctx.apps(Rule::NonDeterministic(NondeterministicRule::Extension), &s, &node),
            vec![Application::Extend { var: x, atom: ry }]
        );
    }

    #[test]
    fn test_variable_heads_are_expanded_not_branched() {
        let mut ctx = TestContext::new();
        let x = ctx.var("X");
        let y = ctx.var("Y");
        let node = SearchNode::new(vec![]);
        let s = sub(&[y], x);
        assert_eq!(
            ctx.apps(Rule::Eager(EagerRule::Expansion), &s, &node),
            vec![Application::ExpandHead]
        );
        assert!(ctx
            .apps(Rule::NonDeterministic(NondeterministicRule::Extension), &s, &node)
            .is_empty());
    }
}
