#![forbid(unsafe_code)]

//! The data-source boundary.
//!
//! A [`DataSource`] answers the fetches a session issues. Implementations
//! may sit on top of an HTTP endpoint, an RPC channel, or plain memory; the
//! session never sees the transport, only [`FetchResponse`] payloads and
//! failures.
//!
//! # Example
//!
//! ```ignore
//! let response = source.fetch("run_a", &FetchRequest::NumExecutions)?;
//! state.update(Msg::Loaded { run: "run_a".into(), response })?;
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use dbgscope_core::{
    Alert, AlertType, Execution, ExecutionDigest, GraphExecution, GraphOpInfo, GraphOpKey,
    RunId, RunMetadata, SourceFileSpec, StackFrame, StackFrameId,
};

use crate::msg::{AlertsBreakdown, FetchRequest, FetchResponse, PageResponse, SequenceKind};

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Errors raised by a data source.
#[derive(Debug)]
pub enum TransportError {
    /// The run or record does not exist.
    NotFound(String),
    /// The source could not be reached or refused the request.
    Unavailable(String),
    /// The source answered with something that could not be decoded.
    Malformed(String),
    /// Decoding a JSON body failed.
    Json(serde_json::Error),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::NotFound(what) => write!(f, "not found: {what}"),
            TransportError::Unavailable(msg) => write!(f, "data source unavailable: {msg}"),
            TransportError::Malformed(msg) => write!(f, "malformed response: {msg}"),
            TransportError::Json(e) => write!(f, "JSON error: {e}"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::Json(e) => Some(e),
            TransportError::NotFound(_)
            | TransportError::Unavailable(_)
            | TransportError::Malformed(_) => None,
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(e: serde_json::Error) -> Self {
        TransportError::Json(e)
    }
}

/// Result type for data-source calls.
pub type TransportResult<T> = Result<T, TransportError>;

// ─────────────────────────────────────────────────────────────────────────────
// DataSource Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Read access to the debugger data of one or more runs.
///
/// Totals reported for a run may only grow between calls. Paged calls
/// return the items of `[begin, end)` that exist, together with the total
/// at response time.
pub trait DataSource {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    fn list_runs(&self) -> TransportResult<BTreeMap<RunId, RunMetadata>>;

    fn num_executions(&self, run: &str) -> TransportResult<usize>;

    fn num_graph_executions(&self, run: &str) -> TransportResult<usize>;

    fn execution_digests(
        &self,
        run: &str,
        begin: usize,
        end: usize,
    ) -> TransportResult<PageResponse<ExecutionDigest>>;

    fn graph_executions(
        &self,
        run: &str,
        begin: usize,
        end: usize,
    ) -> TransportResult<PageResponse<GraphExecution>>;

    /// Detailed records of top-level executions `[begin, end)`.
    fn executions(&self, run: &str, begin: usize, end: usize) -> TransportResult<Vec<Execution>>;

    /// Frames for `ids`. Unknown ids are an error.
    fn stack_frames(
        &self,
        run: &str,
        ids: &[StackFrameId],
    ) -> TransportResult<HashMap<StackFrameId, StackFrame>>;

    /// The op with its immediate inputs and consumers embedded.
    fn graph_op_info(&self, run: &str, key: &GraphOpKey) -> TransportResult<GraphOpInfo>;

    fn source_file_list(&self, run: &str) -> TransportResult<Vec<SourceFileSpec>>;

    fn source_file(&self, run: &str, file: &SourceFileSpec) -> TransportResult<Vec<String>>;

    fn num_alerts_and_breakdown(&self, run: &str) -> TransportResult<AlertsBreakdown>;

    fn alerts_of_type(
        &self,
        run: &str,
        alert_type: AlertType,
        begin: usize,
        end: usize,
    ) -> TransportResult<Vec<Alert>>;

    /// Answer a session fetch.
    fn fetch(&self, run: &str, request: &FetchRequest) -> TransportResult<FetchResponse> {
        Ok(match request {
            FetchRequest::NumExecutions => FetchResponse::NumExecutions {
                total: self.num_executions(run)?,
            },
            FetchRequest::NumGraphExecutions => FetchResponse::NumGraphExecutions {
                total: self.num_graph_executions(run)?,
            },
            FetchRequest::Page {
                sequence: SequenceKind::Executions,
                begin,
                end,
            } => FetchResponse::ExecutionDigests(self.execution_digests(run, *begin, *end)?),
            FetchRequest::Page {
                sequence: SequenceKind::GraphExecutions,
                begin,
                end,
            } => FetchResponse::GraphExecutions(self.graph_executions(run, *begin, *end)?),
            FetchRequest::ExecutionData { begin, end } => FetchResponse::ExecutionData {
                begin: *begin,
                end: *end,
                executions: self.executions(run, *begin, *end)?,
            },
            FetchRequest::StackFrames { ids } => FetchResponse::StackFrames {
                frames: self.stack_frames(run, ids)?,
            },
            FetchRequest::GraphOpInfo { key } => FetchResponse::GraphOpInfo {
                op: self.graph_op_info(run, key)?,
            },
            FetchRequest::SourceFileList => FetchResponse::SourceFileList {
                files: self.source_file_list(run)?,
            },
            FetchRequest::SourceFile { file } => FetchResponse::SourceFile {
                file: file.clone(),
                lines: self.source_file(run, file)?,
            },
            FetchRequest::NumAlertsAndBreakdown => {
                FetchResponse::NumAlertsAndBreakdown(self.num_alerts_and_breakdown(run)?)
            }
            FetchRequest::AlertsOfType {
                alert_type,
                begin,
                end,
            } => FetchResponse::AlertsOfType {
                alert_type: *alert_type,
                begin: *begin,
                end: *end,
                breakdown: self.num_alerts_and_breakdown(run)?,
                alerts: self.alerts_of_type(run, *alert_type, *begin, *end)?,
            },
        })
    }
}
