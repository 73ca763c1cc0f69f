#![forbid(unsafe_code)]

//! Error taxonomy of the viewer core.
//!
//! | Error | Cause | Behavior |
//! |-------|-------|----------|
//! | `ViewError::InvalidArgument` | Malformed window request (coordinator bug) | Operation fails, logged at `error` |
//! | `ViewError::OutOfRange` | Scroll target beyond the valid range | Operation rejected, state unchanged |
//! | `ViewError::ConsistencyViolation` | Data source reported a shrinking total | Batch rejected, prior data kept |
//! | `ViewError::UnknownSourceFile` | Source-file event for a file not in the list | Event rejected, state unchanged |

use std::fmt;

use crate::source::SourceFileSpec;

/// Errors produced by the paging cache and the session state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    /// A caller passed arguments that can never be valid.
    InvalidArgument(String),
    /// A scroll target lies beyond the valid scroll range.
    OutOfRange {
        index: usize,
        /// Largest accepted index.
        max: usize,
    },
    /// The data source reported fewer items than it did before.
    ConsistencyViolation { known: usize, reported: usize },
    /// A source-file event referenced a file missing from the file list.
    UnknownSourceFile(SourceFileSpec),
}

impl fmt::Display for ViewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewError::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            ViewError::OutOfRange { index, max } => {
                write!(f, "scroll index {index} exceeds maximum allowed index {max}")
            }
            ViewError::ConsistencyViolation { known, reported } => write!(
                f,
                "data source reported {reported} items after previously reporting {known}"
            ),
            ViewError::UnknownSourceFile(spec) => write!(
                f,
                "cannot find file in file list: host_name=\"{}\", file_path=\"{}\"",
                spec.host_name, spec.file_path
            ),
        }
    }
}

impl std::error::Error for ViewError {}

/// Result type for viewer operations.
pub type ViewResult<T> = Result<T, ViewError>;
