#![forbid(unsafe_code)]

//! Which item the stack-trace panel follows.

use serde::{Deserialize, Serialize};

use crate::graph::GraphOpKey;

/// Kind of code location currently followed by the stack-trace panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeLocationType {
    /// The call stack of a top-level execution.
    Execution,
    /// The call stack that created a graph op.
    GraphOpCreation,
}

/// The item whose call stack is "the current stack trace".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FocusOrigin {
    Execution { index: usize },
    GraphOpCreation { graph_id: String, op_name: String },
}

impl FocusOrigin {
    #[must_use]
    pub fn graph_op(key: &GraphOpKey) -> Self {
        Self::GraphOpCreation {
            graph_id: key.graph_id.clone(),
            op_name: key.op_name.clone(),
        }
    }

    #[must_use]
    pub const fn location_type(&self) -> CodeLocationType {
        match self {
            Self::Execution { .. } => CodeLocationType::Execution,
            Self::GraphOpCreation { .. } => CodeLocationType::GraphOpCreation,
        }
    }
}
