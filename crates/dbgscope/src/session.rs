#![forbid(unsafe_code)]

//! Synchronous session driver.
//!
//! [`Session`] owns a [`DebuggerState`] and a [`DataSource`] and runs every
//! fetch a transition asks for immediately, feeding the result back in until
//! nothing is left to do. It is the blocking counterpart of the runtime's
//! `SessionSimulator`, for tools that read a data source directly.
//!
//! ```ignore
//! let mut session = Session::new(ViewerConfig::from_env(), source)?;
//! session.open()?;
//! session.dispatch(Msg::ScrollRight(SequenceKind::Executions))?;
//! ```

use std::collections::VecDeque;

use dbgscope_core::ViewerConfig;
use dbgscope_runtime::{Cmd, DataSource, DebuggerState, Msg, TransportError};
use tracing::{debug, warn};

use crate::{Error, Result};

/// Upper bound on messages processed by one [`Session::dispatch`].
const MAX_MESSAGES_PER_DISPATCH: usize = 10_000;

/// What one [`Session::dispatch`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Messages applied, including fetch results.
    pub messages: usize,
    /// Fetches executed against the source.
    pub fetches: usize,
    /// Fetches the source failed.
    pub failed_fetches: usize,
}

/// A debugger session bound to a data source.
pub struct Session<S: DataSource> {
    state: DebuggerState,
    source: S,
    listing_error: Option<TransportError>,
}

impl<S: DataSource> Session<S> {
    /// Validate `config` and bind a fresh session to `source`.
    pub fn new(config: ViewerConfig, source: S) -> Result<Self> {
        Ok(Self {
            state: DebuggerState::new(config)?,
            source,
            listing_error: None,
        })
    }

    pub fn state(&self) -> &DebuggerState {
        &self.state
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn into_parts(self) -> (DebuggerState, S) {
        (self.state, self.source)
    }

    /// List runs and load the first one.
    ///
    /// # Errors
    ///
    /// [`Error::Transport`] when the run listing failed; the session stays
    /// usable and a later `open` retries.
    pub fn open(&mut self) -> Result<DispatchReport> {
        let report = self.dispatch(Msg::RunsRequested)?;
        match self.listing_error.take() {
            Some(err) => Err(Error::Transport(err)),
            None => Ok(report),
        }
    }

    /// Re-fetch everything that grows while the debugged program runs.
    pub fn poll(&mut self) -> Result<DispatchReport> {
        self.dispatch(Msg::PollStarted)
    }

    /// Apply `msg` and every fetch result it leads to.
    ///
    /// Processing continues past a rejected message so no fetch is left
    /// marked in flight; the first rejection is returned.
    pub fn dispatch(&mut self, msg: Msg) -> Result<DispatchReport> {
        let mut report = DispatchReport::default();
        let mut queue = VecDeque::from([msg]);
        let mut first_error = None;

        while let Some(msg) = queue.pop_front() {
            if report.messages == MAX_MESSAGES_PER_DISPATCH {
                warn!(
                    queued = queue.len() + 1,
                    "dispatch limit reached; dropping follow-up messages"
                );
                break;
            }
            report.messages += 1;
            let name = msg.type_name();
            match self.state.update(msg) {
                Ok(cmd) => self.execute(cmd, &mut queue, &mut report),
                Err(err) => {
                    debug!(msg = name, %err, "message rejected");
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(Error::View(err)),
            None => Ok(report),
        }
    }

    fn execute(&mut self, cmd: Cmd, queue: &mut VecDeque<Msg>, report: &mut DispatchReport) {
        match cmd {
            Cmd::None => {}
            Cmd::Batch(cmds) => {
                for cmd in cmds {
                    self.execute(cmd, queue, report);
                }
            }
            Cmd::FetchRuns => {
                report.fetches += 1;
                match self.source.list_runs() {
                    Ok(runs) => {
                        self.listing_error = None;
                        queue.push_back(Msg::RunsLoaded(runs));
                    }
                    Err(err) => {
                        report.failed_fetches += 1;
                        warn!(source = self.source.name(), %err, "run listing failed");
                        self.listing_error = Some(err);
                        queue.push_back(Msg::RunsFailed);
                    }
                }
            }
            Cmd::Fetch { run, request } => {
                report.fetches += 1;
                match self.source.fetch(&run, &request) {
                    Ok(response) => queue.push_back(Msg::Loaded { run, response }),
                    Err(err) => {
                        report.failed_fetches += 1;
                        warn!(
                            source = self.source.name(),
                            request = request.type_name(),
                            %err,
                            "fetch failed"
                        );
                        queue.push_back(Msg::FetchFailed { run, request });
                    }
                }
            }
        }
    }
}
