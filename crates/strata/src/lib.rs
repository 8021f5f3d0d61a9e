//! strata: a deployment orchestrator's core graph and execution engine.
//!
//! Given a declarative description of artifacts (immutable, revision-bound
//! build outputs), resources (external stateful systems), steps (mutating
//! actions), and checks (observations that can reject a deployment),
//! `strata` builds a dependency graph, plans a topologically ordered
//! sequence of actions bound to a source revision, executes that sequence
//! through an immutable-plan state machine, persists every transition to a
//! Git-backed revision store, and rolls back completed steps in reverse
//! order when a check fails.
//!
//! Pipeline: a [`graph::Strategy`] is built from spec registrations, fed
//! to [`planner::plan`] to produce an ordered [`plan::Plan`], which
//! [`exec::Executor`] then drives one transition at a time. Each yielded
//! plan is handed to a [`store::RevisionStore`] implementation before the
//! next action runs — the correctness boundary described in §5 of this
//! crate's design notes.
#![forbid(unsafe_code)]

pub mod address;
pub mod config;
pub mod error;
pub mod exec;
pub mod git;
pub mod graph;
pub mod observe;
pub mod plan;
pub mod planner;
pub mod resolve;
pub mod shape;
pub mod spec;
pub mod store;

pub use address::Address;
pub use error::{Result, StrataError};
pub use exec::Executor;
pub use graph::Strategy;
pub use plan::{Action, ActionState, ActionType, Plan, Revision};
pub use spec::{ArtifactSpec, CheckOutcome, CheckSpec, Context, ResourceSpec, SpecNode, StepSpec};
pub use store::{GitRevisionStore, RevisionStore};
