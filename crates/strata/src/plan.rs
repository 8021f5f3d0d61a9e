//! Plan and Action: the immutable value the planner produces and the
//! executor evolves one state transition at a time.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::address::Address;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActionType {
    Run,
    Check,
    Rollback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActionState {
    Planned,
    InProgress,
    Done,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub address: Address,
    pub state: ActionState,
    #[serde(default)]
    pub snapshot: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

impl Action {
    pub fn planned(action_type: ActionType, address: Address) -> Self {
        Self {
            action_type,
            address,
            state: ActionState::Planned,
            snapshot: None,
            result: None,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Plan {
    pub actions: Vec<Action>,
}

impl Plan {
    pub fn empty() -> Self {
        Self { actions: Vec::new() }
    }
}

/// The persisted per-revision record: currently just the plan, but a
/// distinct type from `Plan` so the on-disk schema (`{"plan": {...}}`)
/// can grow fields (e.g. timestamps) without reshaping `Plan` itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Revision {
    pub plan: Plan,
}
