//! Executor: drives a plan action-by-action through the state machine in
//! §4.5, yielding a fresh `Plan` value after every transition.

use serde_json::{json, Value};

use crate::error::{Result, StrataError};
use crate::graph::Strategy;
use crate::observe::Reporter;
use crate::plan::{Action, ActionState, ActionType, Plan};
use crate::resolve::{resolve_map, Results};
use crate::spec::{CheckOutcome, Context};

/// A lazy, caller-driven sequence of plan snapshots. Each call to `next`
/// performs at most one state transition and returns the resulting plan.
/// The correctness boundary from §5 is the caller's: persist the yielded
/// plan before calling `next` again.
pub struct Executor<'a> {
    strategy: &'a Strategy,
    ctx: Context,
    reporter: &'a dyn Reporter,
    results: Results,
    plan: Plan,
    idx: usize,
}

impl<'a> Executor<'a> {
    /// Builds an executor seeded with existing artifacts/resources and a
    /// plan to run. `plan` is normally the output of [`crate::planner::plan`]
    /// or a previously persisted, partially-executed plan (resumption).
    pub fn new(strategy: &'a Strategy, ctx: Context, plan: Plan, reporter: &'a dyn Reporter) -> Self {
        let mut results = Results::new();

        for (addr, artifact) in strategy.artifacts() {
            if artifact.exists(&ctx) {
                if let Some(value) = artifact.resolve(&ctx) {
                    results.insert(addr.without_attr(), value);
                }
            }
        }

        for (addr, resource) in strategy.resources() {
            let value = resource.state(&ctx).unwrap_or(Value::Null);
            results.insert(addr.without_attr(), value);
        }

        Self {
            strategy,
            ctx,
            reporter,
            results,
            plan,
            idx: 0,
        }
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    fn advance_planned(&mut self) -> Result<Plan> {
        let action = self.plan.actions[self.idx].clone();
        let mut new_action = action.clone();
        new_action.state = ActionState::InProgress;

        if action.action_type == ActionType::Run {
            let step = self
                .strategy
                .specs()
                .get(&action.address)
                .and_then(|s| s.as_step())
                .ok_or_else(|| StrataError::SpecNotFound(action.address.clone()))?;

            let deps_shape = self.strategy.dependencies(&action.address);
            let deps = resolve_map(&deps_shape, &self.results)?;

            let snapshot = step
                .snapshot(&self.ctx, &deps)
                .map_err(|e| StrataError::StepError {
                    address: action.address.clone(),
                    message: e.to_string(),
                })?;
            new_action.snapshot = Some(snapshot);
        }

        self.reporter
            .info(&format!("{} {} planned -> in_progress", action.action_type_label(), action.address));

        let mut actions = self.plan.actions.clone();
        actions[self.idx] = new_action;
        Ok(Plan { actions })
    }

    fn advance_in_progress(&mut self) -> Result<(Plan, bool)> {
        let action = self.plan.actions[self.idx].clone();

        let spec = self
            .strategy
            .specs()
            .get(&action.address)
            .ok_or_else(|| StrataError::SpecNotFound(action.address.clone()))?;

        let deps_shape = self.strategy.dependencies(&action.address);
        let deps = resolve_map(&deps_shape, &self.results)?;

        let mut new_action = action.clone();
        let mut start_rollback = false;

        match action.action_type {
            ActionType::Run => {
                let step = spec
                    .as_step()
                    .ok_or_else(|| StrataError::SpecNotFound(action.address.clone()))?;
                let snapshot = action.snapshot.clone().unwrap_or(Value::Null);

                match step.run(&self.ctx, &deps, &snapshot) {
                    Ok(result) => {
                        new_action.state = ActionState::Done;
                        new_action.result = Some(result.clone());
                        self.results.insert(action.address.without_attr(), result);
                        self.reporter.info(&format!("step {} done", action.address));
                    }
                    Err(e) => {
                        new_action.state = ActionState::Failed;
                        new_action.error = Some(json!(e.to_string()));
                        start_rollback = true;
                        self.reporter.error(&format!("step {} failed: {e}", action.address));
                    }
                }
            }
            ActionType::Rollback => {
                let step = spec
                    .as_step()
                    .ok_or_else(|| StrataError::SpecNotFound(action.address.clone()))?;
                let snapshot = action.snapshot.clone().unwrap_or(Value::Null);

                match step.rollback(&self.ctx, &deps, &snapshot) {
                    Ok(()) => {
                        new_action.state = ActionState::Done;
                        self.reporter.info(&format!("rollback {} done", action.address));
                    }
                    Err(e) => {
                        new_action.state = ActionState::Failed;
                        new_action.error = Some(json!(e.to_string()));
                        self.reporter.error(&format!("rollback {} failed: {e}", action.address));
                    }
                }
            }
            ActionType::Check => {
                let check = spec
                    .as_check()
                    .ok_or_else(|| StrataError::SpecNotFound(action.address.clone()))?;

                match check.check(&self.ctx, &deps) {
                    Ok(CheckOutcome::Passed(result)) => {
                        new_action.state = ActionState::Done;
                        new_action.result = Some(result.clone());
                        self.results.insert(action.address.without_attr(), result);
                        self.reporter.info(&format!("check {} passed", action.address));
                    }
                    Ok(CheckOutcome::Failed(result)) => {
                        new_action.state = ActionState::Done;
                        new_action.result = Some(result.clone());
                        self.results.insert(action.address.without_attr(), result);
                        start_rollback = true;
                        self.reporter.warn(&format!("check {} failed", action.address));
                    }
                    Err(e) => {
                        new_action.state = ActionState::Failed;
                        new_action.error = Some(json!(e.to_string()));
                        start_rollback = true;
                        self.reporter.error(&format!("check {} errored: {e}", action.address));
                    }
                }
            }
        }

        let mut actions = self.plan.actions.clone();
        actions[self.idx] = new_action;
        let mut plan = Plan { actions };

        if start_rollback {
            plan = apply_rollback_cascade(plan, self.idx);
            self.reporter
                .warn(&format!("rollback cascade triggered at {}", action.address));
        }

        Ok((plan, start_rollback))
    }
}

impl<'a> Iterator for Executor<'a> {
    type Item = Result<Plan>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.idx >= self.plan.actions.len() {
                return None;
            }

            let state = self.plan.actions[self.idx].state;

            match state {
                ActionState::Planned => {
                    return Some(self.advance_planned().map(|plan| {
                        self.plan = plan.clone();
                        plan
                    }));
                }
                ActionState::InProgress => {
                    return Some(self.advance_in_progress().map(|(plan, _)| {
                        self.plan = plan.clone();
                        self.idx += 1;
                        plan
                    }));
                }
                ActionState::Done | ActionState::Failed | ActionState::Cancelled => {
                    self.idx += 1;
                    continue;
                }
            }
        }
    }
}

/// Rollback cascade per §4.5: cancel forward work, append reverse-order
/// rollbacks for previously `DONE` `RUN` actions up to and including the
/// failed one.
fn apply_rollback_cascade(plan: Plan, idx: usize) -> Plan {
    let done: Vec<Action> = plan.actions[..=idx].to_vec();

    let cancelled: Vec<Action> = plan.actions[idx + 1..]
        .iter()
        .map(|a| {
            let mut c = a.clone();
            if c.state == ActionState::Planned {
                c.state = ActionState::Cancelled;
            }
            c
        })
        .collect();

    let rollbacks: Vec<Action> = done
        .iter()
        .rev()
        .filter(|a| a.action_type == ActionType::Run && a.state == ActionState::Done)
        .map(|a| Action {
            action_type: ActionType::Rollback,
            address: a.address.clone(),
            state: ActionState::Planned,
            snapshot: a.snapshot.clone(),
            result: None,
            error: None,
        })
        .collect();

    let mut actions = done;
    actions.extend(cancelled);
    actions.extend(rollbacks);
    Plan { actions }
}

impl ActionType {
    fn action_type_label(self) -> &'static str {
        match self {
            ActionType::Run => "run",
            ActionType::Check => "check",
            ActionType::Rollback => "rollback",
        }
    }
}

impl Action {
    fn action_type_label(&self) -> &'static str {
        self.action_type.action_type_label()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::NullReporter;
    use crate::spec::{ArtifactSpec, CheckSpec, SpecNode, StepSpec};
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use crate::address::Address;
    use crate::shape::Shape;

    struct Artifact;
    impl SpecNode for Artifact {
        fn name(&self) -> &str {
            "artifact"
        }
    }
    impl ArtifactSpec for Artifact {
        fn exists(&self, _ctx: &Context) -> bool {
            true
        }
        fn resolve(&self, _ctx: &Context) -> Option<Value> {
            Some(json!("artifact-value"))
        }
    }

    struct OkStep {
        name: &'static str,
        deps: BTreeMap<String, Shape>,
    }
    impl SpecNode for OkStep {
        fn name(&self) -> &str {
            self.name
        }
        fn dependencies(&self) -> BTreeMap<String, Shape> {
            self.deps.clone()
        }
    }
    impl StepSpec for OkStep {
        fn snapshot(&self, _ctx: &Context, _deps: &Value) -> anyhow::Result<Value> {
            Ok(json!({"pre": true}))
        }
        fn run(&self, _ctx: &Context, _deps: &Value, _snapshot: &Value) -> anyhow::Result<Value> {
            Ok(json!({"done": true}))
        }
        fn rollback(&self, _ctx: &Context, _deps: &Value, _snapshot: &Value) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct RolledBackStep(&'static str, std::sync::Arc<Mutex<bool>>);
    impl SpecNode for RolledBackStep {
        fn name(&self) -> &str {
            self.0
        }
    }
    impl StepSpec for RolledBackStep {
        fn snapshot(&self, _ctx: &Context, _deps: &Value) -> anyhow::Result<Value> {
            Ok(Value::Null)
        }
        fn run(&self, _ctx: &Context, _deps: &Value, _snapshot: &Value) -> anyhow::Result<Value> {
            Ok(Value::Null)
        }
        fn rollback(&self, _ctx: &Context, _deps: &Value, _snapshot: &Value) -> anyhow::Result<()> {
            *self.1.lock().unwrap() = true;
            Ok(())
        }
    }

    struct FailingCheck;
    impl SpecNode for FailingCheck {
        fn name(&self) -> &str {
            "check"
        }
    }
    impl CheckSpec for FailingCheck {
        fn check(&self, _ctx: &Context, _deps: &Value) -> anyhow::Result<CheckOutcome> {
            Ok(CheckOutcome::Failed(json!({"passed": false})))
        }
    }

    fn addr(base: &str, name: &str) -> Address {
        Address::new(base, name).unwrap()
    }

    #[test]
    fn single_run_transitions_planned_in_progress_done() {
        let mut strategy = Strategy::new();
        strategy.register_artifact("root", Artifact).unwrap();
        strategy
            .register_step(
                "root",
                OkStep {
                    name: "step",
                    deps: BTreeMap::from([("artifact".to_string(), Shape::Addr(addr("root", "artifact")))]),
                },
            )
            .unwrap();

        let plan = Plan {
            actions: vec![Action::planned(ActionType::Run, addr("root", "step"))],
        };

        let reporter = NullReporter;
        let mut executor = Executor::new(&strategy, Context::new("rev"), plan, &reporter);

        let first = executor.next().unwrap().unwrap();
        assert_eq!(first.actions[0].state, ActionState::InProgress);
        assert!(first.actions[0].snapshot.is_some());

        let second = executor.next().unwrap().unwrap();
        assert_eq!(second.actions[0].state, ActionState::Done);
        assert_eq!(second.actions[0].result, Some(json!({"done": true})));

        assert!(executor.next().is_none());
    }

    #[test]
    fn failed_check_cascades_into_cancel_and_rollback() {
        let rolled_back = std::sync::Arc::new(Mutex::new(false));
        let mut strategy = Strategy::new();
        strategy
            .register_step("r", RolledBackStep("step", rolled_back.clone()))
            .unwrap();
        strategy.register_check("r", FailingCheck).unwrap();
        strategy
            .register_step(
                "r",
                OkStep {
                    name: "step-two",
                    deps: BTreeMap::new(),
                },
            )
            .unwrap();

        let initial = Plan {
            actions: vec![
                Action::planned(ActionType::Run, addr("r", "step")),
                Action::planned(ActionType::Check, addr("r", "check")),
                Action::planned(ActionType::Run, addr("r", "step-two")),
            ],
        };

        let reporter = NullReporter;
        let mut executor = Executor::new(&strategy, Context::new("rev"), initial, &reporter);

        // step: PLANNED -> IN_PROGRESS -> DONE
        executor.next().unwrap().unwrap();
        let after_step = executor.next().unwrap().unwrap();
        assert_eq!(after_step.actions[0].state, ActionState::Done);

        // check: PLANNED -> IN_PROGRESS
        executor.next().unwrap().unwrap();
        // check: IN_PROGRESS -> DONE (failed), cascade cancels the planned
        // trailing RUN and appends exactly one reverse-order rollback.
        let after_check = executor.next().unwrap().unwrap();
        assert_eq!(after_check.actions[1].state, ActionState::Done);
        assert_eq!(after_check.actions[1].result, Some(json!({"passed": false})));
        assert_eq!(after_check.actions[2].state, ActionState::Cancelled);
        assert_eq!(after_check.actions.len(), 4);
        assert_eq!(after_check.actions[3].action_type, ActionType::Rollback);
        assert_eq!(after_check.actions[3].address, addr("r", "step"));
        assert_eq!(after_check.actions[3].state, ActionState::Planned);

        // rollback runs to completion
        executor.next().unwrap().unwrap();
        let after_rollback = executor.next().unwrap().unwrap();
        assert_eq!(after_rollback.actions[3].state, ActionState::Done);
        assert!(*rolled_back.lock().unwrap());

        assert!(executor.next().is_none());
    }
}
