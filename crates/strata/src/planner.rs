//! Fixed-point planner: turns a strategy and a set of available artifacts
//! into an ordered `Plan` of `PLANNED` actions.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::address::Address;
use crate::error::{Result, StrataError};
use crate::graph::Strategy;
use crate::plan::{Action, ActionType, Plan};
use crate::resolve::Results;
use crate::shape::leaf_addresses_map;

/// Produces a plan of `PLANNED` actions in dependency order.
///
/// `available_artifacts` names the artifact addresses known to exist for
/// the current revision; any node whose dependency chain runs through an
/// artifact absent from this set fails to resolve during the fixed-point
/// loop and is reported via `UnknownAddresses`.
pub fn plan(strategy: &Strategy, available_artifacts: &BTreeSet<Address>) -> Result<Plan> {
    let mut results: Results = Results::new();
    for addr in available_artifacts {
        results.insert(addr.without_attr(), Value::Null);
    }
    for (addr, _) in strategy.resources() {
        results.insert(addr.without_attr(), Value::Null);
    }

    let mut pending: BTreeMap<Address, ActionType> = BTreeMap::new();
    for (addr, _) in strategy.steps() {
        pending.insert(addr.clone(), ActionType::Run);
    }
    for (addr, _) in strategy.checks() {
        pending.insert(addr.clone(), ActionType::Check);
    }

    let mut actions = Vec::new();

    loop {
        if pending.is_empty() {
            break;
        }

        let ordered: Vec<Address> = pending.keys().cloned().collect();
        let mut progressed = false;

        for addr in ordered {
            let deps = strategy.dependencies(&addr);
            let leaves = leaf_addresses_map(&deps);
            let after = strategy.after(&addr);

            let ready = leaves.iter().all(|leaf| results.contains_key(leaf))
                && after.iter().all(|a| results.contains_key(a));

            if ready {
                let action_type = *pending.get(&addr).expect("address drawn from pending");
                pending.remove(&addr);
                results.insert(addr.without_attr(), Value::Null);
                actions.push(Action::planned(action_type, addr));
                progressed = true;
            }
        }

        if !progressed {
            let mut unresolved: BTreeSet<Address> = BTreeSet::new();
            for addr in pending.keys() {
                let deps = strategy.dependencies(addr);
                for leaf in leaf_addresses_map(&deps) {
                    if !results.contains_key(&leaf) {
                        unresolved.insert(leaf.without_attr());
                    }
                }
                for a in strategy.after(addr) {
                    if !results.contains_key(a) {
                        unresolved.insert(a.without_attr());
                    }
                }
            }
            return Err(StrataError::UnknownAddresses(unresolved.into_iter().collect()));
        }
    }

    Ok(Plan { actions })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Shape;
    use crate::spec::{CheckOutcome, Context, SpecNode};
    use crate::spec::{ArtifactSpec, CheckSpec, StepSpec};

    struct Artifact(&'static str);
    impl SpecNode for Artifact {
        fn name(&self) -> &str {
            self.0
        }
    }
    impl ArtifactSpec for Artifact {
        fn exists(&self, _ctx: &Context) -> bool {
            true
        }
        fn resolve(&self, _ctx: &Context) -> Option<Value> {
            Some(Value::Null)
        }
    }

    struct Step {
        name: &'static str,
        deps: BTreeMap<String, Shape>,
        after: Vec<Address>,
    }
    impl SpecNode for Step {
        fn name(&self) -> &str {
            self.name
        }
        fn after(&self) -> &[Address] {
            &self.after
        }
        fn dependencies(&self) -> BTreeMap<String, Shape> {
            self.deps.clone()
        }
    }
    impl StepSpec for Step {
        fn snapshot(&self, _ctx: &Context, _deps: &Value) -> anyhow::Result<Value> {
            Ok(Value::Null)
        }
        fn run(&self, _ctx: &Context, _deps: &Value, _snapshot: &Value) -> anyhow::Result<Value> {
            Ok(Value::Null)
        }
        fn rollback(&self, _ctx: &Context, _deps: &Value, _snapshot: &Value) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct Check {
        name: &'static str,
        after: Vec<Address>,
    }
    impl SpecNode for Check {
        fn name(&self) -> &str {
            self.name
        }
        fn after(&self) -> &[Address] {
            &self.after
        }
    }
    impl CheckSpec for Check {
        fn check(&self, _ctx: &Context, _deps: &Value) -> anyhow::Result<CheckOutcome> {
            Ok(CheckOutcome::Passed(Value::Null))
        }
    }

    fn addr(base: &str, name: &str) -> Address {
        Address::new(base, name).unwrap()
    }

    #[test]
    fn empty_strategy_produces_empty_plan() {
        let strategy = Strategy::new();
        let result = plan(&strategy, &BTreeSet::new()).unwrap();
        assert!(result.actions.is_empty());
    }

    #[test]
    fn single_run_depends_on_available_artifact() {
        let mut strategy = Strategy::new();
        strategy.register_artifact("root", Artifact("artifact")).unwrap();
        strategy
            .register_step(
                "root",
                Step {
                    name: "step",
                    deps: BTreeMap::from([("artifact".to_string(), Shape::Addr(addr("root", "artifact")))]),
                    after: vec![],
                },
            )
            .unwrap();

        let available = BTreeSet::from([addr("root", "artifact")]);
        let result = plan(&strategy, &available).unwrap();

        assert_eq!(result.actions.len(), 1);
        assert_eq!(result.actions[0].action_type, ActionType::Run);
        assert_eq!(result.actions[0].address, addr("root", "step"));
    }

    #[test]
    fn diamond_ordering_respects_after_and_dependencies() {
        let mut strategy = Strategy::new();
        strategy.register_artifact("r", Artifact("artifact")).unwrap();
        strategy
            .register_step(
                "r",
                Step {
                    name: "step-foo",
                    deps: BTreeMap::from([("artifact".to_string(), Shape::Addr(addr("r", "artifact")))]),
                    after: vec![],
                },
            )
            .unwrap();
        strategy
            .register_step(
                "r",
                Step {
                    name: "step-bar",
                    deps: BTreeMap::from([("artifact".to_string(), Shape::Addr(addr("r", "artifact")))]),
                    after: vec![],
                },
            )
            .unwrap();
        strategy
            .register_check(
                "r",
                Check {
                    name: "check",
                    after: vec![addr("r", "step-bar"), addr("r", "step-foo")],
                },
            )
            .unwrap();

        let available = BTreeSet::from([addr("r", "artifact")]);
        let result = plan(&strategy, &available).unwrap();

        let order: Vec<&str> = result.actions.iter().map(|a| a.address.name()).collect();
        assert_eq!(order, vec!["step-bar", "step-foo", "check"]);
    }

    #[test]
    fn transitive_chain_is_ordered() {
        let mut strategy = Strategy::new();
        strategy
            .register_step(
                "r",
                Step {
                    name: "step-one",
                    deps: BTreeMap::new(),
                    after: vec![],
                },
            )
            .unwrap();
        strategy
            .register_step(
                "r",
                Step {
                    name: "step-two",
                    deps: BTreeMap::new(),
                    after: vec![addr("r", "step-one")],
                },
            )
            .unwrap();
        strategy
            .register_step(
                "r",
                Step {
                    name: "step-three",
                    deps: BTreeMap::new(),
                    after: vec![addr("r", "step-two")],
                },
            )
            .unwrap();

        let result = plan(&strategy, &BTreeSet::new()).unwrap();
        let order: Vec<&str> = result.actions.iter().map(|a| a.address.name()).collect();
        assert_eq!(order, vec!["step-one", "step-two", "step-three"]);
    }

    #[test]
    fn unknown_address_is_reported() {
        let mut strategy = Strategy::new();
        strategy
            .register_step(
                "r",
                Step {
                    name: "x",
                    deps: BTreeMap::from([("artifact".to_string(), Shape::Addr(addr("r", "missing")))]),
                    after: vec![],
                },
            )
            .unwrap();

        let err = plan(&strategy, &BTreeSet::new()).unwrap_err();
        match err {
            StrataError::UnknownAddresses(addrs) => assert_eq!(addrs, vec![addr("r", "missing")]),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
