#![forbid(unsafe_code)]

//! Core: data model, load states, errors, and configuration for dbgscope.
//!
//! Everything in this crate is a plain value type. The paging and runtime
//! crates build the windowed cache and the session state machine on top of
//! these types; nothing here performs I/O.

pub mod alert;
pub mod config;
pub mod error;
pub mod focus;
pub mod graph;
pub mod load_state;
pub mod model;
pub mod source;

pub use alert::{
    Alert, AlertType, FunctionRecompilesAlert, InfNanAlert, TensorShapeAlert,
};
pub use config::{SequenceConfig, ViewerConfig};
pub use error::{ViewError, ViewResult};
pub use focus::{CodeLocationType, FocusOrigin};
pub use graph::{GraphOpConsumerSpec, GraphOpInfo, GraphOpInputSpec, GraphOpKey};
pub use load_state::{DataLoadState, LoadState};
pub use model::{
    Execution, ExecutionDigest, GraphExecution, GraphExecutionDigest, RunId, RunMetadata,
    StackFrame, StackFrameId, TensorDebugMode,
};
pub use source::{SourceFileContent, SourceFileSpec, SourceLineSpec, concise_file_path};
