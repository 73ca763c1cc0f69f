#![forbid(unsafe_code)]

//! The session aggregate.
//!
//! [`DebuggerState`] owns every slice of a viewer session: the run listing,
//! the two paged sequences, alerts, graph ops, stack frames and source code.
//! Slices scoped to a run live in one `RunScope` that is rebuilt whenever
//! the active run changes. This module holds construction and the derived
//! read-only views; transitions go through [`DebuggerState::update`].

use std::collections::{BTreeMap, HashMap, HashSet};

use dbgscope_core::{
    AlertType, CodeLocationType, FocusOrigin, LoadState, RunId, RunMetadata, StackFrame,
    StackFrameId, ViewResult, ViewerConfig,
};

use crate::alerts::AlertsState;
use crate::graphs::{GraphsState, input_execution_indices};
use crate::msg::SequenceKind;
use crate::sequences::{ExecutionsState, GraphExecutionsState, SequenceState};
use crate::source::SourceCodeState;
use crate::stack_trace::{StackFrameForDisplay, frames_for_display, resolve_stack_frames};

/// Slices discarded when the active run changes.
#[derive(Debug, Clone)]
pub(crate) struct RunScope {
    pub(crate) alerts: AlertsState,
    pub(crate) executions: ExecutionsState,
    pub(crate) graph_executions: GraphExecutionsState,
    pub(crate) graphs: GraphsState,
    pub(crate) stack_frames: HashMap<StackFrameId, StackFrame>,
    pub(crate) stack_frames_in_flight: HashSet<StackFrameId>,
    pub(crate) code_location_focus_type: Option<CodeLocationType>,
    pub(crate) source_code: SourceCodeState,
}

impl RunScope {
    pub(crate) fn new(config: &ViewerConfig) -> ViewResult<Self> {
        Ok(Self {
            alerts: AlertsState::default(),
            executions: ExecutionsState::new(config.executions)?,
            graph_executions: SequenceState::new(
                SequenceKind::GraphExecutions,
                config.graph_executions,
            )?,
            graphs: GraphsState::default(),
            stack_frames: HashMap::new(),
            stack_frames_in_flight: HashSet::new(),
            code_location_focus_type: None,
            source_code: SourceCodeState::default(),
        })
    }
}

/// State of one viewer session.
#[derive(Debug, Clone)]
pub struct DebuggerState {
    pub(crate) config: ViewerConfig,
    pub(crate) runs: BTreeMap<RunId, RunMetadata>,
    pub(crate) runs_load: LoadState,
    pub(crate) active_run: Option<RunId>,
    pub(crate) poll_onset_ms: u64,
    pub(crate) last_non_empty_poll_ms: u64,
    pub(crate) sticky_focus: bool,
    pub(crate) scope: RunScope,
}

impl DebuggerState {
    /// A session with no run selected.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when either sequence geometry is invalid.
    pub fn new(config: ViewerConfig) -> ViewResult<Self> {
        config.validate()?;
        let scope = RunScope::new(&config)?;
        Ok(Self {
            sticky_focus: config.sticky_focus,
            config,
            runs: BTreeMap::new(),
            runs_load: LoadState::not_loaded(),
            active_run: None,
            poll_onset_ms: 0,
            last_non_empty_poll_ms: 0,
            scope,
        })
    }

    #[must_use]
    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    #[must_use]
    pub fn runs(&self) -> &BTreeMap<RunId, RunMetadata> {
        &self.runs
    }

    #[must_use]
    pub fn runs_load(&self) -> LoadState {
        self.runs_load
    }

    #[must_use]
    pub fn active_run(&self) -> Option<&str> {
        self.active_run.as_deref()
    }

    #[must_use]
    pub fn sticky_focus(&self) -> bool {
        self.sticky_focus
    }

    #[must_use]
    pub fn alerts(&self) -> &AlertsState {
        &self.scope.alerts
    }

    #[must_use]
    pub fn executions(&self) -> &ExecutionsState {
        &self.scope.executions
    }

    #[must_use]
    pub fn graph_executions(&self) -> &GraphExecutionsState {
        &self.scope.graph_executions
    }

    #[must_use]
    pub fn graphs(&self) -> &GraphsState {
        &self.scope.graphs
    }

    /// Every stack frame loaded for the active run, by id.
    #[must_use]
    pub fn stack_frames(&self) -> &HashMap<StackFrameId, StackFrame> {
        &self.scope.stack_frames
    }

    #[must_use]
    pub fn source_code(&self) -> &SourceCodeState {
        &self.scope.source_code
    }

    #[must_use]
    pub fn code_location_focus_type(&self) -> Option<CodeLocationType> {
        self.scope.code_location_focus_type
    }

    #[must_use]
    pub fn poll_onset_ms(&self) -> u64 {
        self.poll_onset_ms
    }

    #[must_use]
    pub fn last_non_empty_poll_ms(&self) -> u64 {
        self.last_non_empty_poll_ms
    }

    /// Time since the last poll that brought new data, as of the latest
    /// poll onset.
    #[must_use]
    pub fn poll_silence_ms(&self) -> u64 {
        self.poll_onset_ms.saturating_sub(self.last_non_empty_poll_ms)
    }

    /// Scroll start of `kind`.
    #[must_use]
    pub fn scroll_begin(&self, kind: SequenceKind) -> usize {
        match kind {
            SequenceKind::Executions => self.scope.executions.digests().view().scroll_begin(),
            SequenceKind::GraphExecutions => self.scope.graph_executions.view().scroll_begin(),
        }
    }

    #[must_use]
    pub fn focus_index(&self, kind: SequenceKind) -> Option<usize> {
        match kind {
            SequenceKind::Executions => self.scope.executions.digests().focus_index(),
            SequenceKind::GraphExecutions => self.scope.graph_executions.focus_index(),
        }
    }

    /// Offset of the focused item within the visible window of `kind`.
    #[must_use]
    pub fn focused_display_offset(&self, kind: SequenceKind) -> Option<usize> {
        match kind {
            SequenceKind::Executions => self
                .scope
                .executions
                .digests()
                .view()
                .focused_display_offset(),
            SequenceKind::GraphExecutions => {
                self.scope.graph_executions.view().focused_display_offset()
            }
        }
    }

    /// The item whose call stack is the current stack trace, loaded or not.
    #[must_use]
    pub fn focus_origin(&self) -> Option<FocusOrigin> {
        match self.scope.code_location_focus_type? {
            CodeLocationType::Execution => self
                .scope
                .executions
                .digests()
                .focus_index()
                .map(|index| FocusOrigin::Execution { index }),
            CodeLocationType::GraphOpCreation => {
                self.scope.graphs.focused_op().map(FocusOrigin::graph_op)
            }
        }
    }

    /// The current stack trace, when every frame of it is loaded.
    #[must_use]
    pub fn focused_stack_frames(&self) -> Option<Vec<StackFrame>> {
        resolve_stack_frames(self.focus_origin().as_ref(), self)
    }

    #[must_use]
    pub fn stack_frames_for_display(&self) -> Option<Vec<StackFrameForDisplay>> {
        self.focused_stack_frames()
            .map(|frames| frames_for_display(&frames, self.scope.source_code.focus_line()))
    }

    /// For each visible top-level execution, the focused alert type when an
    /// alert of that type points at it.
    #[must_use]
    pub fn focus_alert_types_of_visible_executions(&self) -> Vec<Option<AlertType>> {
        let range = self.scope.executions.digests().view().visible_range();
        self.scope.alerts.focus_types_for(range)
    }

    /// Intra-graph execution indices of the focused execution's inputs.
    #[must_use]
    pub fn focused_graph_execution_input_indices(&self) -> Option<Vec<usize>> {
        let graph_executions = &self.scope.graph_executions;
        input_execution_indices(
            graph_executions.focus_index(),
            graph_executions.view().sequence(),
            self.scope
                .graphs
                .focused_op_info()
                .map(|op| op.inputs.as_slice()),
            self.config.max_look_back,
        )
    }
}
