#![forbid(unsafe_code)]

//! The session reducer.
//!
//! [`DebuggerState::update_at`] applies one [`Msg`] and returns the fetches
//! it needs. Every transition is synchronous; a fetch completes later as a
//! separate `Msg::Loaded` or `Msg::FetchFailed`.
//!
//! After each transition except a fetch failure, a settle pass requests
//! what the current focus is missing (the focused execution's record, the
//! focused op, unloaded stack frames, the focused file's content) and
//! applies the sticky source-line policy. Failed fetches are therefore
//! retried on the next event, never from the failure itself.

use std::time::{SystemTime, UNIX_EPOCH};

use dbgscope_core::{AlertType, CodeLocationType, FocusOrigin, GraphOpKey, RunId, ViewResult};
use tracing::{debug, debug_span, warn};

use crate::alerts::AlertsState;
use crate::msg::{Cmd, FetchRequest, FetchResponse, Msg, SequenceKind};
use crate::sequences::ScrollOp;
use crate::stack_trace::{click_is_sticky, missing_frame_ids, origin_frame_ids, sticky_follow};
use crate::state::{DebuggerState, RunScope};

/// Wall-clock milliseconds since the Unix epoch.
fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

impl DebuggerState {
    /// Apply `msg` at the current wall-clock time.
    pub fn update(&mut self, msg: Msg) -> ViewResult<Cmd> {
        self.update_at(msg, now_ms())
    }

    /// Apply `msg` as of `now_ms` and return the fetches it requires.
    ///
    /// # Errors
    ///
    /// - `OutOfRange` for a scroll target past the last full window; the
    ///   window is unchanged.
    /// - `ConsistencyViolation` when a response reports a shrinking total;
    ///   the response is dropped and its in-flight markers released.
    /// - `UnknownSourceFile` for a source-file event naming an unlisted file.
    /// - `InvalidArgument` for malformed responses.
    pub fn update_at(&mut self, msg: Msg, now_ms: u64) -> ViewResult<Cmd> {
        let span = debug_span!("dbgscope.update", msg = msg.type_name());
        let _guard = span.enter();

        let settle = !matches!(msg, Msg::FetchFailed { .. });
        let cmd = self.reduce(msg, now_ms)?;
        if !settle {
            return Ok(cmd);
        }
        Ok(Cmd::batch(vec![cmd, self.settle()]))
    }

    fn reduce(&mut self, msg: Msg, now_ms: u64) -> ViewResult<Cmd> {
        match msg {
            Msg::RunsRequested => {
                self.runs_load.start_loading();
                Ok(Cmd::FetchRuns)
            }
            Msg::RunsLoaded(runs) => {
                self.runs = runs;
                self.runs_load.finish_loading(now_ms);
                let first = self.runs.keys().next().cloned();
                if first == self.active_run {
                    return Ok(Cmd::none());
                }
                self.change_run(first)
            }
            Msg::RunsFailed => {
                self.runs_load.fail();
                warn!("run listing failed");
                Ok(Cmd::none())
            }
            Msg::ActiveRunChanged(run) => self.change_run(run),
            Msg::PollStarted => {
                self.poll_onset_ms = now_ms;
                Ok(self.refresh())
            }
            Msg::Refresh => Ok(self.refresh()),
            Msg::ScrollLeft(kind) => self.scroll(kind, ScrollOp::Left),
            Msg::ScrollRight(kind) => self.scroll(kind, ScrollOp::Right),
            Msg::ScrollToIndex(kind, index) => self.scroll(kind, ScrollOp::ToIndex(index)),
            Msg::FocusByDisplayOffset(kind, offset) => {
                self.focus_by_display_offset(kind, offset);
                Ok(Cmd::none())
            }
            Msg::AlertTypeFocusToggled(alert_type) => self.toggle_alert_focus(alert_type),
            Msg::GraphOpFocused(key) => {
                self.focus_graph_op(key);
                Ok(Cmd::none())
            }
            Msg::GraphOpInfoRequested(key) => Ok(self.request_graph_op(&key)),
            Msg::SourceLineClicked(frame) => {
                let frames = self.focused_stack_frames().unwrap_or_default();
                self.sticky_focus = click_is_sticky(&frame, &frames);
                debug!(
                    file_path = %frame.file_path,
                    lineno = frame.lineno,
                    sticky = self.sticky_focus,
                    "source line focused"
                );
                self.scope.source_code.set_focus_line(frame);
                Ok(Cmd::none())
            }
            Msg::SourceFileRequested(file) => {
                let Some(run) = self.active_run.clone() else {
                    return Ok(Cmd::none());
                };
                if self.scope.source_code.request_file(&file)? {
                    Ok(Cmd::fetch(run, FetchRequest::SourceFile { file }))
                } else {
                    Ok(Cmd::none())
                }
            }
            Msg::StickyFocusSet(sticky) => {
                self.sticky_focus = sticky;
                Ok(Cmd::none())
            }
            Msg::Loaded { run, response } => {
                if self.active_run.as_ref() != Some(&run) {
                    debug!(run = %run, "dropping response for inactive run");
                    return Ok(Cmd::none());
                }
                self.on_loaded(run, response, now_ms)
            }
            Msg::FetchFailed { run, request } => {
                if self.active_run.as_ref() != Some(&run) {
                    return Ok(Cmd::none());
                }
                self.on_fetch_failed(&request);
                Ok(Cmd::none())
            }
        }
    }

    /// Discard run-scoped state and issue the new run's initial fetches.
    fn change_run(&mut self, run: Option<RunId>) -> ViewResult<Cmd> {
        self.scope = RunScope::new(&self.config)?;
        self.active_run = run;
        debug!(run = ?self.active_run, "active run changed");
        Ok(self.refresh())
    }

    /// Fetch everything that grows while the debugged program runs.
    fn refresh(&mut self) -> Cmd {
        let Some(run) = self.active_run.clone() else {
            return Cmd::none();
        };
        self.scope.alerts.start_loading();
        self.scope.source_code.start_list_loading();
        Cmd::batch(vec![
            self.scope.executions.digests_mut().request_total(&run),
            self.scope.graph_executions.request_total(&run),
            Cmd::fetch(run.clone(), FetchRequest::NumAlertsAndBreakdown),
            Cmd::fetch(run, FetchRequest::SourceFileList),
        ])
    }

    fn scroll(&mut self, kind: SequenceKind, op: ScrollOp) -> ViewResult<Cmd> {
        let Some(run) = self.active_run.clone() else {
            return Ok(Cmd::none());
        };
        match kind {
            SequenceKind::Executions => self.scope.executions.digests_mut().scroll(&run, op),
            SequenceKind::GraphExecutions => self.scope.graph_executions.scroll(&run, op),
        }
    }

    fn focus_by_display_offset(&mut self, kind: SequenceKind, offset: usize) {
        if self.active_run.is_none() {
            return;
        }
        match kind {
            SequenceKind::Executions => {
                self.scope
                    .executions
                    .digests_mut()
                    .focus_by_display_offset(offset);
                self.scope.code_location_focus_type = Some(CodeLocationType::Execution);
            }
            SequenceKind::GraphExecutions => {
                let index = self.scope.graph_executions.focus_by_display_offset(offset);
                let key = self
                    .scope
                    .graph_executions
                    .view()
                    .sequence()
                    .get(index)
                    .map(|exec| GraphOpKey::new(exec.graph_id.clone(), exec.op_name.clone()));
                if let Some(key) = key {
                    self.focus_graph_op(key);
                }
            }
        }
    }

    fn focus_graph_op(&mut self, key: GraphOpKey) {
        if self.active_run.is_none() {
            return;
        }
        debug!(graph_id = %key.graph_id, op_name = %key.op_name, "graph op focused");
        self.scope.graphs.focus(key);
        self.scope.code_location_focus_type = Some(CodeLocationType::GraphOpCreation);
    }

    fn request_graph_op(&mut self, key: &GraphOpKey) -> Cmd {
        let Some(run) = self.active_run.clone() else {
            return Cmd::none();
        };
        if self.scope.graphs.request(key) {
            Cmd::fetch(run, FetchRequest::GraphOpInfo { key: key.clone() })
        } else {
            Cmd::none()
        }
    }

    fn toggle_alert_focus(&mut self, alert_type: AlertType) -> ViewResult<Cmd> {
        let Some(run) = self.active_run.clone() else {
            return Ok(Cmd::none());
        };
        let Some(focus) = self.scope.alerts.toggle_focus(alert_type) else {
            return Ok(Cmd::none());
        };
        let recenter = match self.scope.alerts.first_execution_index(focus) {
            Some(index) => self
                .scope
                .executions
                .digests_mut()
                .scroll(&run, ScrollOp::Recenter(index))?,
            None => Cmd::none(),
        };
        let fetch = match self.scope.alerts.request_of_type(focus) {
            Some((begin, end)) => Cmd::fetch(
                run,
                FetchRequest::AlertsOfType {
                    alert_type: focus,
                    begin,
                    end,
                },
            ),
            None => Cmd::none(),
        };
        Ok(Cmd::batch(vec![recenter, fetch]))
    }

    fn on_loaded(&mut self, run: RunId, response: FetchResponse, now_ms: u64) -> ViewResult<Cmd> {
        match response {
            FetchResponse::NumExecutions { total } => {
                let executions = self.scope.executions.digests_mut();
                let (cmd, grew) = executions.on_total(&run, total, now_ms)?;
                if total > 0 && executions.focus_index().is_none() {
                    executions.set_focus(Some(0));
                    if self.scope.code_location_focus_type.is_none() {
                        self.scope.code_location_focus_type = Some(CodeLocationType::Execution);
                    }
                }
                self.note_poll_data(grew, now_ms);
                Ok(cmd)
            }
            FetchResponse::NumGraphExecutions { total } => {
                let (cmd, grew) = self.scope.graph_executions.on_total(&run, total, now_ms)?;
                self.note_poll_data(grew, now_ms);
                Ok(cmd)
            }
            FetchResponse::ExecutionDigests(page) => {
                let (cmd, grew) = self
                    .scope
                    .executions
                    .digests_mut()
                    .on_page(&run, page, now_ms)?;
                self.note_poll_data(grew, now_ms);
                Ok(cmd)
            }
            FetchResponse::GraphExecutions(page) => {
                let (cmd, grew) = self.scope.graph_executions.on_page(&run, page, now_ms)?;
                self.note_poll_data(grew, now_ms);
                Ok(cmd)
            }
            FetchResponse::ExecutionData {
                begin,
                end,
                executions,
            } => {
                self.scope.executions.on_data(begin, end, executions)?;
                Ok(Cmd::none())
            }
            FetchResponse::StackFrames { frames } => {
                for (id, frame) in frames {
                    self.scope.stack_frames_in_flight.remove(&id);
                    self.scope.stack_frames.entry(id).or_insert(frame);
                }
                Ok(Cmd::none())
            }
            FetchResponse::GraphOpInfo { op } => {
                self.scope.graphs.on_loaded(op)?;
                Ok(Cmd::none())
            }
            FetchResponse::SourceFileList { files } => {
                self.scope.source_code.on_list_loaded(files, now_ms);
                Ok(Cmd::none())
            }
            FetchResponse::SourceFile { file, lines } => {
                self.scope.source_code.on_file_loaded(&file, lines)?;
                Ok(Cmd::none())
            }
            FetchResponse::NumAlertsAndBreakdown(breakdown) => {
                let grew = self.scope.alerts.on_breakdown(breakdown, now_ms);
                self.note_poll_data(grew, now_ms);
                let Some(alert_type) = self.scope.alerts.focus_type() else {
                    return Ok(Cmd::none());
                };
                Ok(match self.scope.alerts.request_of_type(alert_type) {
                    Some((begin, end)) => Cmd::fetch(
                        run,
                        FetchRequest::AlertsOfType {
                            alert_type,
                            begin,
                            end,
                        },
                    ),
                    None => Cmd::none(),
                })
            }
            FetchResponse::AlertsOfType {
                alert_type,
                begin,
                end,
                breakdown,
                alerts,
            } => {
                if let Err(err) = AlertsState::check_batch(begin, end, &alerts) {
                    warn!(alert_type = alert_type.as_str(), begin, end, %err, "alert batch rejected");
                    self.scope.alerts.on_failed(Some(alert_type));
                    return Err(err);
                }
                let Some(jump) =
                    self.scope
                        .alerts
                        .merge_batch(alert_type, begin, breakdown, alerts, now_ms)
                else {
                    return Ok(Cmd::none());
                };
                debug!(
                    alert_type = alert_type.as_str(),
                    execution_index = jump.execution_index,
                    graph_execution_index = ?jump.graph_execution_index,
                    "jumping to first alert"
                );
                let cmd = self
                    .scope
                    .executions
                    .digests_mut()
                    .scroll(&run, ScrollOp::Recenter(jump.execution_index))?;
                if let Some(index) = jump.graph_execution_index {
                    self.scope.graph_executions.set_focus(Some(index));
                }
                Ok(cmd)
            }
        }
    }

    fn on_fetch_failed(&mut self, request: &FetchRequest) {
        warn!(request = request.type_name(), "fetch failed");
        let scope = &mut self.scope;
        match request {
            FetchRequest::NumExecutions => scope.executions.digests_mut().on_total_failed(),
            FetchRequest::NumGraphExecutions => scope.graph_executions.on_total_failed(),
            FetchRequest::Page {
                sequence: SequenceKind::Executions,
                begin,
                end,
            } => scope.executions.digests_mut().on_page_failed(*begin, *end),
            FetchRequest::Page {
                sequence: SequenceKind::GraphExecutions,
                begin,
                end,
            } => scope.graph_executions.on_page_failed(*begin, *end),
            FetchRequest::ExecutionData { begin, end } => {
                scope.executions.on_data_failed(*begin, *end);
            }
            FetchRequest::StackFrames { ids } => {
                for id in ids {
                    scope.stack_frames_in_flight.remove(id);
                }
            }
            FetchRequest::GraphOpInfo { key } => scope.graphs.on_failed(key),
            FetchRequest::SourceFileList => scope.source_code.on_list_failed(),
            FetchRequest::SourceFile { file } => scope.source_code.on_file_failed(file),
            FetchRequest::NumAlertsAndBreakdown => scope.alerts.on_failed(None),
            FetchRequest::AlertsOfType { alert_type, .. } => {
                scope.alerts.on_failed(Some(*alert_type));
            }
        }
    }

    fn note_poll_data(&mut self, grew: bool, now_ms: u64) {
        if grew {
            self.last_non_empty_poll_ms = now_ms;
        }
    }

    /// Request what the current focus is missing and apply the sticky policy.
    fn settle(&mut self) -> Cmd {
        let Some(run) = self.active_run.clone() else {
            return Cmd::none();
        };
        let mut cmds = Vec::new();

        match self.focus_origin() {
            Some(FocusOrigin::Execution { index }) => {
                cmds.push(self.scope.executions.request_data(&run, index));
            }
            Some(FocusOrigin::GraphOpCreation { graph_id, op_name }) => {
                cmds.push(self.request_graph_op(&GraphOpKey::new(graph_id, op_name)));
            }
            None => {}
        }
        cmds.push(self.request_missing_frames(&run));

        if self.sticky_focus {
            self.follow_bottommost_frame();
        }

        // An unlisted file is fetched once the file list catches up.
        if let Some(file) = self.scope.source_code.focus_line().map(|l| l.file_spec()) {
            if matches!(self.scope.source_code.request_file(&file), Ok(true)) {
                cmds.push(Cmd::fetch(run, FetchRequest::SourceFile { file }));
            }
        }
        Cmd::batch(cmds)
    }

    fn request_missing_frames(&mut self, run: &str) -> Cmd {
        let Some(origin) = self.focus_origin() else {
            return Cmd::none();
        };
        let missing = match origin_frame_ids(&origin, self) {
            Some(ids) => missing_frame_ids(
                ids,
                &self.scope.stack_frames,
                &self.scope.stack_frames_in_flight,
            ),
            None => return Cmd::none(),
        };
        if missing.is_empty() {
            return Cmd::none();
        }
        self.scope
            .stack_frames_in_flight
            .extend(missing.iter().cloned());
        Cmd::fetch(run, FetchRequest::StackFrames { ids: missing })
    }

    fn follow_bottommost_frame(&mut self) {
        let Some(frames) = self.focused_stack_frames() else {
            return;
        };
        let Some(line) = self.scope.source_code.focus_line() else {
            return;
        };
        if let Some(target) = sticky_follow(&frames, line) {
            debug!(
                file_path = %target.file_path,
                from = line.lineno,
                to = target.lineno,
                "sticky focus moved"
            );
            self.scope.source_code.set_focus_line(target);
        }
    }
}
