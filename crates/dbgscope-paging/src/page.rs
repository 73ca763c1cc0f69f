#![forbid(unsafe_code)]

//! Page arithmetic.
//!
//! A remote sequence is fetched in fixed-size, page-aligned pages. These
//! functions are pure: they decide which pages a window needs and how pages
//! map back to item ranges, without touching any store.
//!
//! # Invariants
//!
//! 1. `resolve_missing_pages` returns at most two pages, ascending, each
//!    below `num_pages(num_items, page_size)`.
//! 2. Preconditions are checked, never clamped: a bad request is a caller
//!    bug and comes back as `ViewError::InvalidArgument`.

use std::collections::BTreeMap;
use std::ops::Range;

use dbgscope_core::{ViewError, ViewResult};
use smallvec::SmallVec;

/// Known item counts per page index.
pub type PageLoadedSizes = BTreeMap<usize, usize>;

/// Up to two page indices.
pub type MissingPages = SmallVec<[usize; 2]>;

/// Page holding `index`. `page_size` must be non-zero.
#[inline]
#[must_use]
pub fn page_of(index: usize, page_size: usize) -> usize {
    index / page_size
}

/// Number of pages needed to hold `num_items`.
#[inline]
#[must_use]
pub fn num_pages(num_items: usize, page_size: usize) -> usize {
    num_items.div_ceil(page_size)
}

/// Number of items page `page` holds once complete.
#[inline]
#[must_use]
pub fn expected_page_len(page: usize, page_size: usize, num_items: usize) -> usize {
    num_items.saturating_sub(page * page_size).min(page_size)
}

/// Item range of `page`, clipped to `num_items`.
#[must_use]
pub fn page_span(page: usize, page_size: usize, num_items: usize) -> Range<usize> {
    let start = page * page_size;
    let end = (start + page_size).min(num_items).max(start);
    start..end
}

/// Pages whose first index lies in `[begin, end)`.
///
/// An empty range still names the page starting at `begin` when `begin` is
/// page-aligned, so an empty response to a page request releases that page.
#[must_use]
pub fn pages_starting_in(begin: usize, end: usize, page_size: usize) -> Range<usize> {
    let first = begin.div_ceil(page_size);
    let stop = if end > begin {
        (end - 1) / page_size + 1
    } else if begin % page_size == 0 {
        first + 1
    } else {
        first
    };
    first..stop.max(first)
}

/// Determine which pages must be fetched to show the window `[begin, end)`.
///
/// The first page is missing when it has no recorded size, or when it is
/// partial and more items exist past what it holds. A second page (when the
/// window straddles a page boundary) is missing when it has no recorded
/// size or does not yet reach `end`.
///
/// # Errors
///
/// `InvalidArgument` when `page_size` is zero, `begin > end`,
/// `end > num_items`, or the window is wider than one page.
pub fn resolve_missing_pages(
    begin: usize,
    end: usize,
    page_size: usize,
    num_items: usize,
    page_loaded_sizes: &PageLoadedSizes,
) -> ViewResult<MissingPages> {
    if page_size == 0 {
        return Err(ViewError::InvalidArgument(format!(
            "Invalid pageSize: {page_size}"
        )));
    }
    if begin > end {
        return Err(ViewError::InvalidArgument(format!(
            "begin index ({begin}) exceeds end index ({end})"
        )));
    }
    if end > num_items {
        return Err(ViewError::InvalidArgument(format!(
            "end index ({end}) exceeds total number of items ({num_items})"
        )));
    }
    if end - begin > page_size {
        return Err(ViewError::InvalidArgument(format!(
            "begin-end span ({}) exceeds page size ({page_size})",
            end - begin
        )));
    }

    let mut missing = MissingPages::new();
    if begin == end {
        return Ok(missing);
    }

    let first = page_of(begin, page_size);
    let first_missing = match page_loaded_sizes.get(&first) {
        None => true,
        Some(&loaded) => loaded < page_size && first * page_size + loaded < num_items,
    };
    if first_missing {
        missing.push(first);
    }

    let last = page_of(end - 1, page_size);
    if last != first {
        let last_missing = match page_loaded_sizes.get(&last) {
            None => true,
            Some(&loaded) => last * page_size + loaded < end,
        };
        if last_missing {
            missing.push(last);
        }
    }
    Ok(missing)
}

/// Position of the range exactly equal to `[begin, end)`.
#[must_use]
pub fn find_range(ranges: &[Range<usize>], begin: usize, end: usize) -> Option<usize> {
    ranges.iter().position(|r| r.start == begin && r.end == end)
}

/// Merge ascending page indices into page-aligned fetch ranges.
///
/// Adjacent pages become one range; the last range is clipped to
/// `num_items`.
#[must_use]
pub fn coalesce_pages(pages: &[usize], page_size: usize, num_items: usize) -> Vec<Range<usize>> {
    let mut ranges: Vec<Range<usize>> = Vec::with_capacity(pages.len());
    for &page in pages {
        let span = page_span(page, page_size, num_items);
        if span.is_empty() {
            continue;
        }
        match ranges.last_mut() {
            Some(last) if last.end == span.start => last.end = span.end,
            _ => ranges.push(span),
        }
    }
    ranges
}
