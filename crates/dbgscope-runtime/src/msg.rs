#![forbid(unsafe_code)]

//! Events into the session and fetch commands out of it.
//!
//! Every state change enters as a [`Msg`]. A transition may answer with a
//! [`Cmd`] naming data that must be fetched; the fetch's completion comes
//! back later as another `Msg`.

use std::collections::{BTreeMap, HashMap};

use dbgscope_core::{
    Alert, AlertType, Execution, ExecutionDigest, GraphExecution, GraphOpInfo, GraphOpKey,
    RunId, RunMetadata, SourceFileSpec, StackFrame, StackFrameId,
};
use serde::{Deserialize, Serialize};

/// Which paged sequence an event or request refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceKind {
    /// Top-level (eager) execution digests.
    Executions,
    /// Intra-graph executions.
    GraphExecutions,
}

impl SequenceKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Executions => "executions",
            Self::GraphExecutions => "graph_executions",
        }
    }
}

/// A run-scoped fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchRequest {
    NumExecutions,
    NumGraphExecutions,
    /// One page-aligned range of a sequence.
    Page {
        sequence: SequenceKind,
        begin: usize,
        end: usize,
    },
    /// Detailed records of top-level executions `[begin, end)`.
    ExecutionData { begin: usize, end: usize },
    StackFrames { ids: Vec<StackFrameId> },
    GraphOpInfo { key: GraphOpKey },
    SourceFileList,
    SourceFile { file: SourceFileSpec },
    NumAlertsAndBreakdown,
    AlertsOfType {
        alert_type: AlertType,
        begin: usize,
        end: usize,
    },
}

impl FetchRequest {
    /// Stable name for logs and the command log.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::NumExecutions => "NumExecutions",
            Self::NumGraphExecutions => "NumGraphExecutions",
            Self::Page { .. } => "Page",
            Self::ExecutionData { .. } => "ExecutionData",
            Self::StackFrames { .. } => "StackFrames",
            Self::GraphOpInfo { .. } => "GraphOpInfo",
            Self::SourceFileList => "SourceFileList",
            Self::SourceFile { .. } => "SourceFile",
            Self::NumAlertsAndBreakdown => "NumAlertsAndBreakdown",
            Self::AlertsOfType { .. } => "AlertsOfType",
        }
    }
}

/// One page of a sequence as returned by the data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResponse<T> {
    pub begin: usize,
    pub end: usize,
    pub items: Vec<T>,
    /// Total items in the sequence at the time of the response.
    pub total: usize,
}

/// Alert counts for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertsBreakdown {
    pub num_alerts: usize,
    pub per_type: BTreeMap<AlertType, usize>,
}

/// Payload of a completed run-scoped fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchResponse {
    NumExecutions {
        total: usize,
    },
    NumGraphExecutions {
        total: usize,
    },
    ExecutionDigests(PageResponse<ExecutionDigest>),
    GraphExecutions(PageResponse<GraphExecution>),
    ExecutionData {
        begin: usize,
        end: usize,
        executions: Vec<Execution>,
    },
    StackFrames {
        frames: HashMap<StackFrameId, StackFrame>,
    },
    GraphOpInfo {
        op: GraphOpInfo,
    },
    SourceFileList {
        files: Vec<SourceFileSpec>,
    },
    SourceFile {
        file: SourceFileSpec,
        lines: Vec<String>,
    },
    NumAlertsAndBreakdown(AlertsBreakdown),
    AlertsOfType {
        alert_type: AlertType,
        begin: usize,
        end: usize,
        breakdown: AlertsBreakdown,
        alerts: Vec<Alert>,
    },
}

/// Events handled by [`DebuggerState::update`](crate::DebuggerState::update).
#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// Ask for the run listing.
    RunsRequested,
    RunsLoaded(BTreeMap<RunId, RunMetadata>),
    RunsFailed,
    /// Select a run (or none). All run-scoped data is discarded.
    ActiveRunChanged(Option<RunId>),
    /// A polling round started.
    PollStarted,
    /// Re-fetch totals and the alert breakdown of the active run.
    Refresh,

    ScrollLeft(SequenceKind),
    ScrollRight(SequenceKind),
    ScrollToIndex(SequenceKind, usize),
    /// Focus the item at this offset within the visible window.
    FocusByDisplayOffset(SequenceKind, usize),

    /// Toggle the alert type the timeline highlights (`None <-> type`).
    AlertTypeFocusToggled(AlertType),

    GraphOpFocused(GraphOpKey),
    GraphOpInfoRequested(GraphOpKey),

    /// The user clicked a frame of the current stack trace.
    SourceLineClicked(StackFrame),
    SourceFileRequested(SourceFileSpec),
    StickyFocusSet(bool),

    /// A run-scoped fetch completed.
    Loaded {
        run: RunId,
        response: FetchResponse,
    },
    /// A run-scoped fetch failed in transport.
    FetchFailed {
        run: RunId,
        request: FetchRequest,
    },
}

impl Msg {
    /// Stable name for logs.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::RunsRequested => "RunsRequested",
            Self::RunsLoaded(_) => "RunsLoaded",
            Self::RunsFailed => "RunsFailed",
            Self::ActiveRunChanged(_) => "ActiveRunChanged",
            Self::PollStarted => "PollStarted",
            Self::Refresh => "Refresh",
            Self::ScrollLeft(_) => "ScrollLeft",
            Self::ScrollRight(_) => "ScrollRight",
            Self::ScrollToIndex(..) => "ScrollToIndex",
            Self::FocusByDisplayOffset(..) => "FocusByDisplayOffset",
            Self::AlertTypeFocusToggled(_) => "AlertTypeFocusToggled",
            Self::GraphOpFocused(_) => "GraphOpFocused",
            Self::GraphOpInfoRequested(_) => "GraphOpInfoRequested",
            Self::SourceLineClicked(_) => "SourceLineClicked",
            Self::SourceFileRequested(_) => "SourceFileRequested",
            Self::StickyFocusSet(_) => "StickyFocusSet",
            Self::Loaded { .. } => "Loaded",
            Self::FetchFailed { .. } => "FetchFailed",
        }
    }
}

/// Work requested by a transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Cmd {
    /// No operation.
    #[default]
    None,
    /// Fetch the run listing.
    FetchRuns,
    /// Fetch run-scoped data.
    Fetch { run: RunId, request: FetchRequest },
    /// Several commands, in emission order.
    Batch(Vec<Cmd>),
}

impl Cmd {
    #[inline]
    pub fn none() -> Self {
        Self::None
    }

    #[inline]
    pub fn fetch(run: impl Into<RunId>, request: FetchRequest) -> Self {
        Self::Fetch {
            run: run.into(),
            request,
        }
    }

    /// Combine commands, dropping no-ops.
    pub fn batch(cmds: Vec<Self>) -> Self {
        let mut cmds: Vec<Self> = cmds.into_iter().filter(|c| !c.is_none()).collect();
        match cmds.len() {
            0 => Self::None,
            1 => cmds.pop().unwrap_or_default(),
            _ => Self::Batch(cmds),
        }
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Stable name for tracing.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::FetchRuns => "FetchRuns",
            Self::Fetch { .. } => "Fetch",
            Self::Batch(_) => "Batch",
        }
    }

    /// All fetch requests in this command, flattened in order.
    #[must_use]
    pub fn fetches(&self) -> Vec<(&str, &FetchRequest)> {
        let mut out = Vec::new();
        self.collect_fetches(&mut out);
        out
    }

    fn collect_fetches<'a>(&'a self, out: &mut Vec<(&'a str, &'a FetchRequest)>) {
        match self {
            Self::Fetch { run, request } => out.push((run.as_str(), request)),
            Self::Batch(cmds) => cmds.iter().for_each(|c| c.collect_fetches(out)),
            Self::None | Self::FetchRuns => {}
        }
    }
}
