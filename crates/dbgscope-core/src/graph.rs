#![forbid(unsafe_code)]

//! Graph-op records.

use serde::{Deserialize, Serialize};

use crate::model::StackFrameId;

/// Identifies an op inside a graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GraphOpKey {
    pub graph_id: String,
    pub op_name: String,
}

impl GraphOpKey {
    #[must_use]
    pub fn new(graph_id: impl Into<String>, op_name: impl Into<String>) -> Self {
        Self {
            graph_id: graph_id.into(),
            op_name: op_name.into(),
        }
    }
}

/// An input edge of an op: which output slot of which op feeds it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphOpInputSpec {
    pub op_name: String,
    pub output_slot: u32,
    /// The input op itself, when the data source embedded it or it is
    /// already loaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Box<GraphOpInfo>>,
}

/// A consumer edge of one output slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphOpConsumerSpec {
    pub op_name: String,
    pub input_slot: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Box<GraphOpInfo>>,
}

/// Detailed information about an op in a graph, including the call stack
/// that created it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphOpInfo {
    pub op_type: String,
    pub op_name: String,
    /// Enclosing graphs, outermost first.
    pub graph_ids: Vec<String>,
    #[serde(default)]
    pub num_outputs: u32,
    #[serde(default)]
    pub host_name: String,
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(default)]
    pub stack_frame_ids: Vec<StackFrameId>,
    #[serde(default)]
    pub inputs: Vec<GraphOpInputSpec>,
    /// Consumers, one list per output slot.
    #[serde(default)]
    pub consumers: Vec<Vec<GraphOpConsumerSpec>>,
}

impl GraphOpInfo {
    /// The immediately-enclosing graph, i.e. the innermost one.
    #[must_use]
    pub fn immediate_graph_id(&self) -> Option<&str> {
        self.graph_ids.last().map(String::as_str)
    }

    /// Copy of this op with embedded input/consumer data removed.
    #[must_use]
    pub fn stripped(&self) -> Self {
        let mut op = self.clone();
        for input in &mut op.inputs {
            input.data = None;
        }
        for slot in &mut op.consumers {
            for consumer in slot {
                consumer.data = None;
            }
        }
        op
    }
}
