#![forbid(unsafe_code)]

//! Per-sequence session slices.
//!
//! [`SequenceState<T>`] wraps a [`PagedView<T>`] with the load states the
//! session tracks for it and turns window requests into fetch commands.
//! [`ExecutionsState`] adds the detailed execution records fetched for the
//! focused top-level execution.

use std::collections::{BTreeMap, BTreeSet};

use dbgscope_core::{
    Execution, ExecutionDigest, GraphExecution, LoadState, SequenceConfig, ViewError, ViewResult,
};
use dbgscope_paging::{PagedView, WindowRequest};
use tracing::{debug, warn};

use crate::msg::{Cmd, FetchRequest, PageResponse, SequenceKind};

/// Window-level operation on a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScrollOp {
    Left,
    Right,
    ToIndex(usize),
    Recenter(usize),
}

/// A paged sequence plus its load bookkeeping.
#[derive(Debug, Clone)]
pub struct SequenceState<T> {
    kind: SequenceKind,
    num_load: LoadState,
    pages_load: LoadState,
    view: PagedView<T>,
}

impl<T> SequenceState<T> {
    pub(crate) fn new(kind: SequenceKind, config: SequenceConfig) -> ViewResult<Self> {
        Ok(Self {
            kind,
            num_load: LoadState::not_loaded(),
            pages_load: LoadState::not_loaded(),
            view: PagedView::new(config)?,
        })
    }

    #[must_use]
    pub fn kind(&self) -> SequenceKind {
        self.kind
    }

    #[must_use]
    pub fn view(&self) -> &PagedView<T> {
        &self.view
    }

    /// Load state of the total count.
    #[must_use]
    pub fn num_load(&self) -> LoadState {
        self.num_load
    }

    /// Load state of the paged items.
    #[must_use]
    pub fn pages_load(&self) -> LoadState {
        self.pages_load
    }

    #[must_use]
    pub fn num_items(&self) -> usize {
        self.view.num_items()
    }

    #[must_use]
    pub fn focus_index(&self) -> Option<usize> {
        self.view.focus_index()
    }

    pub(crate) fn set_focus(&mut self, index: Option<usize>) {
        self.view.set_focus(index);
    }

    pub(crate) fn focus_by_display_offset(&mut self, offset: usize) -> usize {
        self.view.focus_by_display_offset(offset)
    }

    pub(crate) fn request_total(&mut self, run: &str) -> Cmd {
        self.num_load.start_loading();
        let request = match self.kind {
            SequenceKind::Executions => FetchRequest::NumExecutions,
            SequenceKind::GraphExecutions => FetchRequest::NumGraphExecutions,
        };
        Cmd::fetch(run, request)
    }

    pub(crate) fn scroll(&mut self, run: &str, op: ScrollOp) -> ViewResult<Cmd> {
        let request = match op {
            ScrollOp::Left => self.view.scroll_left()?,
            ScrollOp::Right => self.view.scroll_right()?,
            ScrollOp::ToIndex(index) => self.view.scroll_to_index(index)?,
            ScrollOp::Recenter(index) => self.view.recenter_on(index)?,
        };
        debug!(
            sequence = self.kind.as_str(),
            ?op,
            scroll_begin = self.view.scroll_begin(),
            "window moved"
        );
        Ok(self.page_fetches(run, request))
    }

    /// Record a new total. Returns the page fetches the window now needs and
    /// whether the total grew.
    pub(crate) fn on_total(&mut self, run: &str, total: usize, now_ms: u64) -> ViewResult<(Cmd, bool)> {
        let before = self.view.num_items();
        match self.view.set_num_items(total) {
            Ok(request) => {
                self.num_load.finish_loading(now_ms);
                debug!(sequence = self.kind.as_str(), num_items = total, "total updated");
                Ok((self.page_fetches(run, request), total > before))
            }
            Err(err) => {
                self.num_load.fail();
                Err(err)
            }
        }
    }

    /// Merge a fetched page. Returns follow-up page fetches and whether the
    /// total grew.
    pub(crate) fn on_page(
        &mut self,
        run: &str,
        page: PageResponse<T>,
        now_ms: u64,
    ) -> ViewResult<(Cmd, bool)> {
        let PageResponse {
            begin,
            end,
            items,
            total,
        } = page;
        let outcome = match self.view.apply_fetch_result(begin, end, items, total) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(sequence = self.kind.as_str(), begin, end, %err, "page rejected");
                if self.view.sequence().in_flight_pages().next().is_none() {
                    self.pages_load.fail();
                }
                return Err(err);
            }
        };
        if self.view.sequence().in_flight_pages().next().is_none() {
            self.pages_load.finish_loading(now_ms);
        }
        let follow_up = if outcome.total_grew {
            let request = self.view.resolve_window()?;
            self.page_fetches(run, request)
        } else {
            Cmd::none()
        };
        Ok((follow_up, outcome.total_grew))
    }

    pub(crate) fn on_page_failed(&mut self, begin: usize, end: usize) {
        self.view.fail_fetch(begin, end);
        self.pages_load.fail();
    }

    pub(crate) fn on_total_failed(&mut self) {
        self.num_load.fail();
    }

    fn page_fetches(&mut self, run: &str, request: WindowRequest) -> Cmd {
        if request.is_empty() {
            return Cmd::none();
        }
        self.pages_load.start_loading();
        let kind = self.kind;
        Cmd::batch(
            request
                .ranges
                .into_iter()
                .map(|range| {
                    Cmd::fetch(
                        run,
                        FetchRequest::Page {
                            sequence: kind,
                            begin: range.start,
                            end: range.end,
                        },
                    )
                })
                .collect(),
        )
    }
}

/// Top-level executions: digests plus detailed records.
#[derive(Debug, Clone)]
pub struct ExecutionsState {
    digests: SequenceState<ExecutionDigest>,
    execution_data: BTreeMap<usize, Execution>,
    data_in_flight: BTreeSet<usize>,
}

impl ExecutionsState {
    pub(crate) fn new(config: SequenceConfig) -> ViewResult<Self> {
        Ok(Self {
            digests: SequenceState::new(SequenceKind::Executions, config)?,
            execution_data: BTreeMap::new(),
            data_in_flight: BTreeSet::new(),
        })
    }

    #[must_use]
    pub fn digests(&self) -> &SequenceState<ExecutionDigest> {
        &self.digests
    }

    pub(crate) fn digests_mut(&mut self) -> &mut SequenceState<ExecutionDigest> {
        &mut self.digests
    }

    /// Detailed records loaded so far, by execution index.
    #[must_use]
    pub fn execution_data(&self) -> &BTreeMap<usize, Execution> {
        &self.execution_data
    }

    #[must_use]
    pub fn focused_execution_data(&self) -> Option<&Execution> {
        self.digests
            .focus_index()
            .and_then(|i| self.execution_data.get(&i))
    }

    /// Request the detailed record of `index` unless loaded or in flight.
    pub(crate) fn request_data(&mut self, run: &str, index: usize) -> Cmd {
        if index >= self.digests.num_items()
            || self.execution_data.contains_key(&index)
            || !self.data_in_flight.insert(index)
        {
            return Cmd::none();
        }
        Cmd::fetch(
            run,
            FetchRequest::ExecutionData {
                begin: index,
                end: index + 1,
            },
        )
    }

    pub(crate) fn on_data(
        &mut self,
        begin: usize,
        end: usize,
        executions: Vec<Execution>,
    ) -> ViewResult<()> {
        if begin > end || executions.len() != end - begin {
            for index in begin..end {
                self.data_in_flight.remove(&index);
            }
            return Err(ViewError::InvalidArgument(format!(
                "execution data [{begin}, {end}) carries {} records",
                executions.len()
            )));
        }
        for (index, execution) in (begin..end).zip(executions) {
            self.data_in_flight.remove(&index);
            self.execution_data.insert(index, execution);
        }
        Ok(())
    }

    pub(crate) fn on_data_failed(&mut self, begin: usize, end: usize) {
        for index in begin..end {
            self.data_in_flight.remove(&index);
        }
    }
}

/// Intra-graph executions.
pub type GraphExecutionsState = SequenceState<GraphExecution>;
