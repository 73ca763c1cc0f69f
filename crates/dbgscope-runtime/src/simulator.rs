#![forbid(unsafe_code)]

//! Deterministic session simulator for testing.
//!
//! `SessionSimulator` drives a [`DebuggerState`] against a [`DataSource`]
//! without any real transport. Fetches requested by the session are queued
//! instead of executed, so tests decide when each completes: in order, out
//! of order, twice, or not at all.
//!
//! # Example
//!
//! ```ignore
//! use dbgscope_runtime::simulator::SessionSimulator;
//!
//! let mut sim = SessionSimulator::new(state, source);
//! sim.init();
//! sim.deliver_all();
//! sim.send(Msg::ScrollRight(SequenceKind::Executions));
//! assert_eq!(sim.pending().len(), 1);
//! ```

use dbgscope_core::{RunId, ViewError};
use serde::Serialize;
use tracing::warn;

use crate::data_source::DataSource;
use crate::msg::{Cmd, FetchRequest, Msg};
use crate::state::DebuggerState;

/// Upper bound on deliveries in one [`SessionSimulator::deliver_all`] call.
const MAX_DELIVERIES: usize = 10_000;

/// A fetch the session asked for that has not completed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "pending", rename_all = "snake_case")]
pub enum PendingFetch {
    Runs,
    Data { run: RunId, request: FetchRequest },
}

impl PendingFetch {
    /// The run-scoped request, if any.
    #[must_use]
    pub fn request(&self) -> Option<&FetchRequest> {
        match self {
            PendingFetch::Runs => None,
            PendingFetch::Data { request, .. } => Some(request),
        }
    }
}

/// Record of what happened during simulation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum CmdRecord {
    /// A transition returned no work.
    None,
    /// Batch of commands.
    Batch { count: usize },
    /// A fetch was queued.
    Queued { fetch: PendingFetch },
    /// A queued fetch completed and its result was sent to the session.
    Delivered { fetch: PendingFetch },
    /// A queued fetch failed and the failure was sent to the session.
    Failed { fetch: PendingFetch },
    /// The session rejected a message.
    Rejected { msg: &'static str, error: String },
}

/// Deterministic driver for [`DebuggerState`].
pub struct SessionSimulator<S: DataSource> {
    state: DebuggerState,
    source: S,
    pending: Vec<PendingFetch>,
    command_log: Vec<CmdRecord>,
    errors: Vec<ViewError>,
    clock_ms: u64,
}

impl<S: DataSource> SessionSimulator<S> {
    /// Create a simulator over `state` and `source`. Nothing is requested
    /// until [`init`](Self::init) or [`send`](Self::send).
    pub fn new(state: DebuggerState, source: S) -> Self {
        Self {
            state,
            source,
            pending: Vec::new(),
            command_log: Vec::new(),
            errors: Vec::new(),
            clock_ms: 0,
        }
    }

    /// Ask for the run listing.
    pub fn init(&mut self) {
        self.send(Msg::RunsRequested);
    }

    /// Dispatch `msg` at the simulated clock and queue the fetches it
    /// requests. A rejected message is recorded in [`errors`](Self::errors).
    pub fn send(&mut self, msg: Msg) {
        let name = msg.type_name();
        match self.state.update_at(msg, self.clock_ms) {
            Ok(cmd) => self.execute_cmd(cmd),
            Err(err) => {
                crate::debug_trace!("rejected {}: {}", name, err);
                self.command_log.push(CmdRecord::Rejected {
                    msg: name,
                    error: err.to_string(),
                });
                self.errors.push(err);
            }
        }
    }

    /// Complete the oldest pending fetch. Returns `false` when none is pending.
    pub fn deliver_next(&mut self) -> bool {
        if self.pending.is_empty() {
            return false;
        }
        self.deliver_at(0)
    }

    /// Complete pending fetches, including the ones they trigger, until
    /// nothing is pending. Returns the number delivered.
    pub fn deliver_all(&mut self) -> usize {
        let mut delivered = 0;
        while delivered < MAX_DELIVERIES && self.deliver_next() {
            delivered += 1;
        }
        if !self.pending.is_empty() {
            warn!(pending = self.pending.len(), "delivery limit reached");
        }
        delivered
    }

    /// Complete the pending fetch at `index`. Returns `false` if out of range.
    pub fn deliver_at(&mut self, index: usize) -> bool {
        if index >= self.pending.len() {
            return false;
        }
        let fetch = self.pending.remove(index);
        self.complete(fetch);
        true
    }

    /// Complete the pending fetch at `index` but keep it queued, so it will
    /// be delivered again.
    pub fn duplicate_at(&mut self, index: usize) -> bool {
        let Some(fetch) = self.pending.get(index).cloned() else {
            return false;
        };
        self.complete(fetch);
        true
    }

    /// Fail the pending fetch at `index` without asking the source.
    pub fn fail_at(&mut self, index: usize) -> bool {
        if index >= self.pending.len() {
            return false;
        }
        let fetch = self.pending.remove(index);
        crate::debug_trace!("fail {:?}", fetch);
        self.command_log.push(CmdRecord::Failed {
            fetch: fetch.clone(),
        });
        self.send(failure_msg(fetch));
        true
    }

    /// Index of the first pending fetch matching `pred`.
    pub fn find_pending<F>(&self, pred: F) -> Option<usize>
    where
        F: Fn(&PendingFetch) -> bool,
    {
        self.pending.iter().position(pred)
    }

    pub fn pending(&self) -> &[PendingFetch] {
        &self.pending
    }

    pub fn state(&self) -> &DebuggerState {
        &self.state
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Mutable access to the source, e.g. to append data between polls.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Errors returned by the session, oldest first.
    pub fn errors(&self) -> &[ViewError] {
        &self.errors
    }

    pub fn command_log(&self) -> &[CmdRecord] {
        &self.command_log
    }

    pub fn clock_ms(&self) -> u64 {
        self.clock_ms
    }

    /// Move the simulated clock forward.
    pub fn advance(&mut self, ms: u64) {
        self.clock_ms = self.clock_ms.saturating_add(ms);
    }

    /// The command log as JSON Lines, one record per line.
    pub fn export_command_log_jsonl(&self) -> serde_json::Result<String> {
        let mut out = String::new();
        for record in &self.command_log {
            out.push_str(&serde_json::to_string(record)?);
            out.push('\n');
        }
        Ok(out)
    }

    fn complete(&mut self, fetch: PendingFetch) {
        let msg = match &fetch {
            PendingFetch::Runs => match self.source.list_runs() {
                Ok(runs) => Msg::RunsLoaded(runs),
                Err(err) => {
                    warn!(source = self.source.name(), %err, "run listing failed");
                    Msg::RunsFailed
                }
            },
            PendingFetch::Data { run, request } => match self.source.fetch(run, request) {
                Ok(response) => Msg::Loaded {
                    run: run.clone(),
                    response,
                },
                Err(err) => {
                    warn!(
                        source = self.source.name(),
                        request = request.type_name(),
                        %err,
                        "fetch failed"
                    );
                    Msg::FetchFailed {
                        run: run.clone(),
                        request: request.clone(),
                    }
                }
            },
        };
        crate::debug_trace!("deliver {:?}", fetch);
        self.command_log.push(CmdRecord::Delivered { fetch });
        self.send(msg);
    }

    fn execute_cmd(&mut self, cmd: Cmd) {
        match cmd {
            Cmd::None => self.command_log.push(CmdRecord::None),
            Cmd::FetchRuns => self.queue(PendingFetch::Runs),
            Cmd::Fetch { run, request } => self.queue(PendingFetch::Data { run, request }),
            Cmd::Batch(cmds) => {
                self.command_log.push(CmdRecord::Batch { count: cmds.len() });
                for c in cmds {
                    self.execute_cmd(c);
                }
            }
        }
    }

    fn queue(&mut self, fetch: PendingFetch) {
        crate::debug_trace!("queue {:?}", fetch);
        self.command_log.push(CmdRecord::Queued {
            fetch: fetch.clone(),
        });
        self.pending.push(fetch);
    }
}

fn failure_msg(fetch: PendingFetch) -> Msg {
    match fetch {
        PendingFetch::Runs => Msg::RunsFailed,
        PendingFetch::Data { run, request } => Msg::FetchFailed { run, request },
    }
}
