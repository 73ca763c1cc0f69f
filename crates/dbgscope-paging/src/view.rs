#![forbid(unsafe_code)]

//! Scroll/window coordinator.
//!
//! [`PagedView<T>`] pairs a [`PaginatedSequence<T>`] with a
//! [`ScrollWindow`]. Every operation that moves the window or changes the
//! total re-resolves the visible window and hands back the pages that now
//! need fetching. The view never fetches anything itself.

use std::ops::Range;

use dbgscope_core::{SequenceConfig, ViewError, ViewResult};
use tracing::error;

use crate::sequence::{MergeOutcome, PaginatedSequence, WindowRequest};
use crate::window::ScrollWindow;

/// A paged remote sequence seen through a scrollable window.
#[derive(Debug, Clone)]
pub struct PagedView<T> {
    sequence: PaginatedSequence<T>,
    window: ScrollWindow,
}

impl<T> PagedView<T> {
    /// # Errors
    ///
    /// `InvalidArgument` when `config` fails [`SequenceConfig::validate`].
    pub fn new(config: SequenceConfig) -> ViewResult<Self> {
        config.validate()?;
        Ok(Self {
            sequence: PaginatedSequence::new(config.page_size)?,
            window: ScrollWindow::new(config.display_count),
        })
    }

    #[must_use]
    pub fn sequence(&self) -> &PaginatedSequence<T> {
        &self.sequence
    }

    #[must_use]
    pub fn window(&self) -> &ScrollWindow {
        &self.window
    }

    #[must_use]
    pub fn num_items(&self) -> usize {
        self.sequence.num_items()
    }

    #[must_use]
    pub fn scroll_begin(&self) -> usize {
        self.window.scroll_begin()
    }

    #[must_use]
    pub fn display_count(&self) -> usize {
        self.window.display_count()
    }

    #[must_use]
    pub fn focus_index(&self) -> Option<usize> {
        self.window.focus_index()
    }

    #[must_use]
    pub fn focused_item(&self) -> Option<&T> {
        self.focus_index().and_then(|i| self.sequence.get(i))
    }

    #[must_use]
    pub fn focused_display_offset(&self) -> Option<usize> {
        self.window.focused_display_offset()
    }

    /// Indices currently on screen.
    #[must_use]
    pub fn visible_range(&self) -> Range<usize> {
        self.window.visible_range(self.sequence.num_items())
    }

    /// `display_count` slots starting at the scroll position.
    #[must_use]
    pub fn visible_slice(&self) -> Vec<Option<&T>> {
        self.sequence
            .visible_slice(self.window.scroll_begin(), self.window.display_count())
    }

    /// Pages the current window still needs, marked in flight.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if the window geometry is inconsistent with the
    /// store. That indicates a bug in the caller and is logged at `error`.
    pub fn resolve_window(&mut self) -> ViewResult<WindowRequest> {
        let range = self.visible_range();
        if range.is_empty() {
            return Ok(WindowRequest::default());
        }
        self.sequence
            .request_window(range.start, range.end)
            .inspect_err(|err| {
                error!(
                    begin = range.start,
                    end = range.end,
                    %err,
                    "window resolution rejected"
                );
            })
    }

    pub fn scroll_left(&mut self) -> ViewResult<WindowRequest> {
        if self.window.scroll_left() {
            self.resolve_window()
        } else {
            Ok(WindowRequest::default())
        }
    }

    pub fn scroll_right(&mut self) -> ViewResult<WindowRequest> {
        if self.window.scroll_right(self.sequence.num_items()) {
            self.resolve_window()
        } else {
            Ok(WindowRequest::default())
        }
    }

    /// # Errors
    ///
    /// `OutOfRange` when `index` exceeds `max(0, num_items - display_count)`;
    /// the window is left unchanged.
    pub fn scroll_to_index(&mut self, index: usize) -> ViewResult<WindowRequest> {
        self.window
            .scroll_to_index(index, self.sequence.num_items())?;
        self.resolve_window()
    }

    /// Center on `index` without the upper-bound check of
    /// [`scroll_to_index`](Self::scroll_to_index).
    pub fn recenter_on(&mut self, index: usize) -> ViewResult<WindowRequest> {
        self.window.recenter_on(index);
        self.resolve_window()
    }

    pub fn focus_by_display_offset(&mut self, offset: usize) -> usize {
        self.window.focus_by_display_offset(offset)
    }

    pub fn set_focus(&mut self, index: Option<usize>) {
        self.window.set_focus(index);
    }

    /// Record a new total and resolve the window against it.
    ///
    /// # Errors
    ///
    /// `ConsistencyViolation` when the total shrank.
    pub fn set_num_items(&mut self, total: usize) -> ViewResult<WindowRequest> {
        self.sequence.set_num_items(total)?;
        self.resolve_window()
    }

    /// Check that a batch would be accepted, without merging it.
    pub fn check_batch(&self, begin: usize, end: usize, len: usize, total: usize) -> ViewResult<()> {
        if total < self.sequence.num_items() {
            return Err(ViewError::ConsistencyViolation {
                known: self.sequence.num_items(),
                reported: total,
            });
        }
        if begin > end || len != end - begin || end > total {
            return Err(ViewError::InvalidArgument(format!(
                "batch [{begin}, {end}) with {len} items does not fit total {total}"
            )));
        }
        Ok(())
    }

    pub fn apply_fetch_result(
        &mut self,
        begin: usize,
        end: usize,
        items: Vec<T>,
        total: usize,
    ) -> ViewResult<MergeOutcome> {
        self.sequence.apply_fetch_result(begin, end, items, total)
    }

    pub fn fail_fetch(&mut self, begin: usize, end: usize) -> usize {
        self.sequence.fail_fetch(begin, end)
    }
}
