#![forbid(unsafe_code)]

//! dbgscope public facade crate.
//!
//! This crate provides the stable surface of the debugger-viewer state
//! layer. It re-exports the common types of the core, paging and runtime
//! crates, adds a blocking [`Session`] driver, and offers a prelude for
//! day-to-day usage.

use std::fmt;

pub mod session;

// --- Core re-exports -------------------------------------------------------

pub use dbgscope_core::{
    Alert, AlertType, CodeLocationType, DataLoadState, Execution, ExecutionDigest, FocusOrigin,
    GraphExecution, GraphOpInfo, GraphOpKey, LoadState, RunId, RunMetadata, SequenceConfig,
    SourceFileSpec, SourceLineSpec, StackFrame, StackFrameId, ViewError, ViewResult,
    ViewerConfig,
};

// --- Paging re-exports -----------------------------------------------------

pub use dbgscope_paging::{PagedView, PaginatedSequence, ScrollWindow};

// --- Runtime re-exports ----------------------------------------------------

pub use dbgscope_runtime::{
    Cmd, DataSource, DebuggerState, FetchRequest, FetchResponse, Msg, SequenceKind,
    StackFrameForDisplay, TransportError,
};

pub use session::{DispatchReport, Session};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for dbgscope callers.
#[derive(Debug)]
pub enum Error {
    /// The session rejected an event or a response.
    View(ViewError),
    /// The data source could not answer.
    Transport(TransportError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::View(err) => write!(f, "{err}"),
            Self::Transport(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::View(err) => Some(err),
            Self::Transport(err) => Some(err),
        }
    }
}

impl From<ViewError> for Error {
    fn from(err: ViewError) -> Self {
        Self::View(err)
    }
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        Self::Transport(err)
    }
}

/// Standard result type for dbgscope APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        AlertType, DataSource, DebuggerState, Error, Msg, Result, SequenceKind, Session,
        SourceFileSpec, StackFrame, ViewerConfig,
    };

    pub use crate::{core, paging, runtime};
}

pub use dbgscope_core as core;
pub use dbgscope_paging as paging;
pub use dbgscope_runtime as runtime;

#[cfg(feature = "tracing-json")]
pub use dbgscope_runtime::logging;
