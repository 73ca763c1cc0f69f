#![forbid(unsafe_code)]

//! Scroll window over a sequence of known length.
//!
//! [`ScrollWindow`] tracks where the viewport starts, how many items it
//! shows, and which item has focus. It knows nothing about loading; the
//! [`PagedView`](crate::PagedView) coordinator pairs it with a store.

use std::ops::Range;

use dbgscope_core::{ViewError, ViewResult};

/// Viewport position and focus over one sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollWindow {
    scroll_begin: usize,
    display_count: usize,
    focus_index: Option<usize>,
}

impl ScrollWindow {
    #[must_use]
    pub const fn new(display_count: usize) -> Self {
        Self {
            scroll_begin: 0,
            display_count,
            focus_index: None,
        }
    }

    #[must_use]
    pub const fn scroll_begin(&self) -> usize {
        self.scroll_begin
    }

    #[must_use]
    pub const fn display_count(&self) -> usize {
        self.display_count
    }

    #[must_use]
    pub const fn focus_index(&self) -> Option<usize> {
        self.focus_index
    }

    /// Largest valid scroll start for a sequence of `num_items`.
    #[must_use]
    pub const fn max_scroll_begin(&self, num_items: usize) -> usize {
        num_items.saturating_sub(self.display_count)
    }

    /// Indices shown for a sequence of `num_items`, clipped to the sequence.
    #[must_use]
    pub fn visible_range(&self, num_items: usize) -> Range<usize> {
        let start = self.scroll_begin.min(num_items);
        let end = (self.scroll_begin + self.display_count).min(num_items);
        start..end
    }

    /// Scroll back by one. Returns whether the window moved.
    pub fn scroll_left(&mut self) -> bool {
        if self.scroll_begin == 0 {
            return false;
        }
        self.scroll_begin -= 1;
        true
    }

    /// Scroll forward by one while items remain past the window.
    pub fn scroll_right(&mut self, num_items: usize) -> bool {
        if self.scroll_begin + self.display_count >= num_items {
            return false;
        }
        self.scroll_begin += 1;
        true
    }

    /// Move the window to start at `index`.
    ///
    /// # Errors
    ///
    /// `OutOfRange` when `index` exceeds [`max_scroll_begin`](Self::max_scroll_begin).
    pub fn scroll_to_index(&mut self, index: usize, num_items: usize) -> ViewResult<()> {
        let max = self.max_scroll_begin(num_items);
        if index > max {
            return Err(ViewError::OutOfRange { index, max });
        }
        self.scroll_begin = index;
        Ok(())
    }

    /// Center the window on `index` without bound checks.
    ///
    /// The start may land past the last full window; [`visible_range`]
    /// clips it.
    ///
    /// [`visible_range`]: Self::visible_range
    pub fn recenter_on(&mut self, index: usize) {
        self.scroll_begin = index.saturating_sub(self.display_count / 2);
    }

    pub fn set_focus(&mut self, index: Option<usize>) {
        self.focus_index = index;
    }

    /// Focus the item shown at `offset` within the window.
    pub fn focus_by_display_offset(&mut self, offset: usize) -> usize {
        let index = self.scroll_begin + offset;
        self.focus_index = Some(index);
        index
    }

    /// Offset of the focused item within the window, when it is visible.
    #[must_use]
    pub fn focused_display_offset(&self) -> Option<usize> {
        let focus = self.focus_index?;
        (focus >= self.scroll_begin && focus < self.scroll_begin + self.display_count)
            .then(|| focus - self.scroll_begin)
    }
}
