//! The closed Artifact/Resource/Step/Check kind taxonomy.
//!
//! Each kind is represented as a behavior trait (not a class hierarchy);
//! [`Spec`] is the tagged variant that lets the graph builder, planner,
//! and executor hold heterogeneous nodes uniformly while still dispatching
//! to kind-specific behavior.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::address::Address;
use crate::shape::Shape;

/// Execution context threaded through every hook call. Deliberately thin:
/// the revision identifier plus free-form config vars is enough for the
/// core; richer context (credentials, clients) is a plugin concern.
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub revision: String,
    pub vars: BTreeMap<String, Value>,
}

impl Context {
    pub fn new(revision: impl Into<String>) -> Self {
        Self {
            revision: revision.into(),
            vars: BTreeMap::new(),
        }
    }

    pub fn with_vars(mut self, vars: BTreeMap<String, Value>) -> Self {
        self.vars = vars;
        self
    }
}

/// Shared declaration surface every spec kind implements.
pub trait SpecNode {
    fn name(&self) -> &str;

    /// Extra ordering edges beyond those implied by `dependencies()`.
    fn after(&self) -> &[Address] {
        &[]
    }

    /// Field name -> dependency shape, excluding the `name` identity field.
    fn dependencies(&self) -> BTreeMap<String, Shape> {
        BTreeMap::new()
    }
}

pub trait ArtifactSpec: SpecNode {
    fn exists(&self, ctx: &Context) -> bool;
    fn resolve(&self, ctx: &Context) -> Option<Value>;
}

pub trait ResourceSpec: SpecNode {
    fn state(&self, ctx: &Context) -> Option<Value>;
}

pub trait StepSpec: SpecNode {
    /// Captures pre-state so `rollback` can reverse `run`. `deps` is the
    /// already-resolved `dependencies()` map, keyed by field name.
    fn snapshot(&self, ctx: &Context, deps: &Value) -> anyhow::Result<Value>;
    fn run(&self, ctx: &Context, deps: &Value, snapshot: &Value) -> anyhow::Result<Value>;
    fn rollback(&self, ctx: &Context, deps: &Value, snapshot: &Value) -> anyhow::Result<()>;
}

/// The outcome of a check, carrying its verdict as an opaque result value
/// either way — a check does not raise an exception to reject a
/// deployment, it reports `Failed` and the executor encodes that as a
/// `DONE` action with the cascade triggered.
pub enum CheckOutcome {
    Passed(Value),
    Failed(Value),
}

pub trait CheckSpec: SpecNode {
    fn check(&self, ctx: &Context, deps: &Value) -> anyhow::Result<CheckOutcome>;
}

/// The tagged union of the four kinds, as stored in the strategy graph.
pub enum Spec {
    Artifact(Box<dyn ArtifactSpec>),
    Resource(Box<dyn ResourceSpec>),
    Step(Box<dyn StepSpec>),
    Check(Box<dyn CheckSpec>),
}

impl Spec {
    pub fn name(&self) -> &str {
        match self {
            Spec::Artifact(s) => s.name(),
            Spec::Resource(s) => s.name(),
            Spec::Step(s) => s.name(),
            Spec::Check(s) => s.name(),
        }
    }

    pub fn after(&self) -> &[Address] {
        match self {
            Spec::Artifact(s) => s.after(),
            Spec::Resource(s) => s.after(),
            Spec::Step(s) => s.after(),
            Spec::Check(s) => s.after(),
        }
    }

    pub fn dependencies(&self) -> BTreeMap<String, Shape> {
        match self {
            Spec::Artifact(s) => s.dependencies(),
            Spec::Resource(s) => s.dependencies(),
            Spec::Step(s) => s.dependencies(),
            Spec::Check(s) => s.dependencies(),
        }
    }

    pub fn as_step(&self) -> Option<&dyn StepSpec> {
        match self {
            Spec::Step(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    pub fn as_check(&self) -> Option<&dyn CheckSpec> {
        match self {
            Spec::Check(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    pub fn as_artifact(&self) -> Option<&dyn ArtifactSpec> {
        match self {
            Spec::Artifact(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    pub fn as_resource(&self) -> Option<&dyn ResourceSpec> {
        match self {
            Spec::Resource(s) => Some(s.as_ref()),
            _ => None,
        }
    }
}
