#![forbid(unsafe_code)]

//! Wire records for runs, executions, and stack frames.
//!
//! Field names follow the data source's snake_case JSON so records can be
//! deserialized straight from a response body.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::source::{SourceFileSpec, SourceLineSpec};

/// Identifier of a debugger run.
pub type RunId = String;

/// Metadata of one run as listed by the data source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Seconds since the epoch at which the run started.
    pub start_time: f64,
}

/// How much tensor data was captured for an execution.
///
/// Codes match the numeric values used by the instrumented program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum TensorDebugMode {
    #[default]
    Unspecified,
    NoTensor,
    CurtHealth,
    ConciseHealth,
    FullHealth,
    Shape,
    FullNumerics,
    FullTensor,
    ReduceInfNanThreeSlots,
}

impl TensorDebugMode {
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Unspecified => 0,
            Self::NoTensor => 1,
            Self::CurtHealth => 2,
            Self::ConciseHealth => 3,
            Self::FullHealth => 4,
            Self::Shape => 5,
            Self::FullNumerics => 6,
            Self::FullTensor => 7,
            Self::ReduceInfNanThreeSlots => 8,
        }
    }
}

impl TryFrom<i32> for TensorDebugMode {
    type Error = String;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        Ok(match code {
            0 => Self::Unspecified,
            1 => Self::NoTensor,
            2 => Self::CurtHealth,
            3 => Self::ConciseHealth,
            4 => Self::FullHealth,
            5 => Self::Shape,
            6 => Self::FullNumerics,
            7 => Self::FullTensor,
            8 => Self::ReduceInfNanThreeSlots,
            other => return Err(format!("unknown tensor debug mode: {other}")),
        })
    }
}

impl From<TensorDebugMode> for i32 {
    fn from(mode: TensorDebugMode) -> Self {
        mode.code()
    }
}

/// Digest of a top-level (eager) execution: the cheap record shown in the
/// timeline before the detailed [`Execution`] is fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionDigest {
    pub op_type: String,
    #[serde(default)]
    pub output_tensor_device_ids: Vec<String>,
}

/// Detailed record of a top-level execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub op_type: String,
    #[serde(default)]
    pub output_tensor_device_ids: Vec<String>,
    pub host_name: String,
    pub stack_frame_ids: Vec<StackFrameId>,
    #[serde(default)]
    pub tensor_debug_mode: TensorDebugMode,
    /// Set when the execution ran a compiled graph.
    #[serde(default)]
    pub graph_id: Option<String>,
    #[serde(default)]
    pub input_tensor_ids: Vec<i64>,
    #[serde(default)]
    pub output_tensor_ids: Vec<i64>,
    #[serde(default)]
    pub debug_tensor_values: Option<Vec<Option<Vec<f64>>>>,
}

impl Execution {
    #[must_use]
    pub fn digest(&self) -> ExecutionDigest {
        ExecutionDigest {
            op_type: self.op_type.clone(),
            output_tensor_device_ids: self.output_tensor_device_ids.clone(),
        }
    }
}

/// Digest of one tensor produced inside a graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphExecutionDigest {
    /// Innermost enclosing graph.
    pub graph_id: String,
    pub op_name: String,
    pub op_type: String,
    pub output_slot: u32,
}

/// Detailed record of one intra-graph tensor execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphExecution {
    pub graph_id: String,
    pub op_name: String,
    pub op_type: String,
    pub output_slot: u32,
    /// Enclosing graphs, outermost first.
    #[serde(default)]
    pub graph_ids: Vec<String>,
    #[serde(default)]
    pub tensor_debug_mode: TensorDebugMode,
    #[serde(default)]
    pub debug_tensor_value: Option<Vec<f64>>,
    #[serde(default)]
    pub device_name: String,
}

impl GraphExecution {
    #[must_use]
    pub fn digest(&self) -> GraphExecutionDigest {
        GraphExecutionDigest {
            graph_id: self.graph_id.clone(),
            op_name: self.op_name.clone(),
            op_type: self.op_type.clone(),
            output_slot: self.output_slot,
        }
    }
}

/// Opaque id of a stack frame, shared by execution and graph-op records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StackFrameId(pub String);

impl StackFrameId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StackFrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StackFrameId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for StackFrameId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// One frame of a call stack.
///
/// Accepts both the object form and the compact
/// `[host_name, file_path, lineno, function_name]` array form on input;
/// always serializes as an object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "StackFrameRepr")]
pub struct StackFrame {
    pub host_name: String,
    pub file_path: String,
    pub lineno: u32,
    pub function_name: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StackFrameRepr {
    Compact(String, String, u32, String),
    Object {
        host_name: String,
        file_path: String,
        lineno: u32,
        function_name: String,
    },
}

impl From<StackFrameRepr> for StackFrame {
    fn from(repr: StackFrameRepr) -> Self {
        match repr {
            StackFrameRepr::Compact(host_name, file_path, lineno, function_name)
            | StackFrameRepr::Object {
                host_name,
                file_path,
                lineno,
                function_name,
            } => Self {
                host_name,
                file_path,
                lineno,
                function_name,
            },
        }
    }
}

impl StackFrame {
    #[must_use]
    pub fn new(
        host_name: impl Into<String>,
        file_path: impl Into<String>,
        lineno: u32,
        function_name: impl Into<String>,
    ) -> Self {
        Self {
            host_name: host_name.into(),
            file_path: file_path.into(),
            lineno,
            function_name: function_name.into(),
        }
    }

    #[must_use]
    pub fn file_spec(&self) -> SourceFileSpec {
        SourceFileSpec {
            host_name: self.host_name.clone(),
            file_path: self.file_path.clone(),
        }
    }

    #[must_use]
    pub fn line_spec(&self) -> SourceLineSpec {
        SourceLineSpec {
            host_name: self.host_name.clone(),
            file_path: self.file_path.clone(),
            lineno: self.lineno,
        }
    }

    /// Whether this frame lives in the given file.
    #[must_use]
    pub fn is_in_file(&self, host_name: &str, file_path: &str) -> bool {
        self.host_name == host_name && self.file_path == file_path
    }

    /// Whether this frame points at exactly the given line.
    #[must_use]
    pub fn is_at_line(&self, line: &SourceLineSpec) -> bool {
        self.is_in_file(&line.host_name, &line.file_path) && self.lineno == line.lineno
    }
}
