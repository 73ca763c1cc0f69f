#![forbid(unsafe_code)]

//! Sparse, page-accounted store for one remote sequence.
//!
//! [`PaginatedSequence<T>`] holds whatever part of an append-only remote
//! sequence has been fetched so far. It knows the total reported by the
//! source, which indices are loaded, how many items each page holds, and
//! which pages are currently being fetched.
//!
//! # Invariants
//!
//! 1. `items[i]` defined implies `i < num_items`.
//! 2. `num_items` never decreases.
//! 3. `page_loaded_sizes[p]` never decreases and equals the number of
//!    defined indices in page `p`.
//! 4. A page is never handed out for fetching while it is in flight.
//! 5. An in-flight page is released only by a completion or failure that
//!    reaches the end of the span it was requested for, or by a merge that
//!    leaves the page complete. A stale duplicate of an earlier, shorter
//!    request leaves the marker alone.

use std::collections::BTreeMap;
use std::ops::Range;

use dbgscope_core::{ViewError, ViewResult};
use tracing::{debug, trace, warn};

use crate::page::{
    MissingPages, PageLoadedSizes, coalesce_pages, expected_page_len, page_of, page_span,
    pages_starting_in, resolve_missing_pages,
};

/// Pages that must be fetched for a window, with their fetch ranges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowRequest {
    /// Pages newly marked in flight, ascending.
    pub pages: MissingPages,
    /// Page-aligned item ranges covering `pages`, adjacent pages merged.
    pub ranges: Vec<Range<usize>>,
}

impl WindowRequest {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Outcome of merging one fetched batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Indices that were undefined before this batch.
    pub newly_loaded: usize,
    /// In-flight pages released by this batch.
    pub released_pages: usize,
    /// Whether the batch grew the total.
    pub total_grew: bool,
}

/// A sparse local copy of one paged remote sequence.
#[derive(Debug, Clone)]
pub struct PaginatedSequence<T> {
    page_size: usize,
    num_items: usize,
    items: BTreeMap<usize, T>,
    page_loaded_sizes: PageLoadedSizes,
    /// In-flight page -> end of the span it was requested for.
    in_flight: BTreeMap<usize, usize>,
}

impl<T> PaginatedSequence<T> {
    /// Create an empty sequence.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when `page_size` is zero.
    pub fn new(page_size: usize) -> ViewResult<Self> {
        if page_size == 0 {
            return Err(ViewError::InvalidArgument(
                "Invalid pageSize: 0".to_string(),
            ));
        }
        Ok(Self {
            page_size,
            num_items: 0,
            items: BTreeMap::new(),
            page_loaded_sizes: PageLoadedSizes::new(),
            in_flight: BTreeMap::new(),
        })
    }

    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Total number of items reported by the source.
    #[must_use]
    pub fn num_items(&self) -> usize {
        self.num_items
    }

    /// Number of indices loaded so far.
    #[must_use]
    pub fn loaded_len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn page_loaded_sizes(&self) -> &PageLoadedSizes {
        &self.page_loaded_sizes
    }

    #[must_use]
    pub fn page_loaded_size(&self, page: usize) -> Option<usize> {
        self.page_loaded_sizes.get(&page).copied()
    }

    /// Whether `page` holds every item it will ever hold at the current total.
    #[must_use]
    pub fn is_page_complete(&self, page: usize) -> bool {
        let expected = expected_page_len(page, self.page_size, self.num_items);
        self.page_loaded_size(page).unwrap_or(0) >= expected && expected > 0
    }

    #[must_use]
    pub fn is_in_flight(&self, page: usize) -> bool {
        self.in_flight.contains_key(&page)
    }

    pub fn in_flight_pages(&self) -> impl Iterator<Item = usize> + '_ {
        self.in_flight.keys().copied()
    }

    /// End of the span `page` was requested for, while it is in flight.
    #[must_use]
    pub fn requested_end(&self, page: usize) -> Option<usize> {
        self.in_flight.get(&page).copied()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(&index)
    }

    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        self.items.contains_key(&index)
    }

    /// Loaded items in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        self.items.iter().map(|(&i, item)| (i, item))
    }

    /// Loaded items with index in `range`, highest index first.
    pub fn iter_back_from(&self, range: Range<usize>) -> impl Iterator<Item = (usize, &T)> + '_ {
        self.items.range(range).rev().map(|(&i, item)| (i, item))
    }

    /// Record a new total from the source.
    ///
    /// Returns whether the total grew.
    ///
    /// # Errors
    ///
    /// `ConsistencyViolation` when `total` is below the known total; the
    /// known total is kept.
    pub fn set_num_items(&mut self, total: usize) -> ViewResult<bool> {
        if total < self.num_items {
            warn!(
                known = self.num_items,
                reported = total,
                "data source reported a shrinking total"
            );
            return Err(ViewError::ConsistencyViolation {
                known: self.num_items,
                reported: total,
            });
        }
        let grew = total > self.num_items;
        self.num_items = total;
        Ok(grew)
    }

    /// Resolve the pages missing for `[begin, end)` and mark them in flight.
    ///
    /// Pages already in flight are skipped. Repeating the call for the same
    /// window returns an empty request until those pages complete or fail.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a malformed window (see
    /// [`resolve_missing_pages`]).
    pub fn request_window(&mut self, begin: usize, end: usize) -> ViewResult<WindowRequest> {
        let missing = resolve_missing_pages(
            begin,
            end,
            self.page_size,
            self.num_items,
            &self.page_loaded_sizes,
        )?;
        let pages: MissingPages = missing
            .into_iter()
            .filter(|page| !self.in_flight.contains_key(page))
            .collect();
        if pages.is_empty() {
            trace!(begin, end, "window satisfied or already in flight");
            return Ok(WindowRequest::default());
        }
        for &page in &pages {
            let span = page_span(page, self.page_size, self.num_items);
            self.in_flight.insert(page, span.end);
        }
        let ranges = coalesce_pages(&pages, self.page_size, self.num_items);
        debug!(begin, end, ?pages, ?ranges, "requesting pages");
        Ok(WindowRequest { pages, ranges })
    }

    /// Merge a fetched batch covering `[begin, end)`.
    ///
    /// Writing an index that is already defined replaces the item but does
    /// not bump the page's loaded size, so merging is idempotent and
    /// order-independent per index.
    ///
    /// # Errors
    ///
    /// - `ConsistencyViolation` when `new_total` is below the known total.
    /// - `InvalidArgument` when the item count does not match the range or
    ///   the range lies past `new_total`.
    ///
    /// Either way no item is written, but the in-flight markers of pages
    /// starting inside `[begin, end)` whose requested span the batch covers
    /// are released.
    pub fn apply_fetch_result(
        &mut self,
        begin: usize,
        end: usize,
        items: Vec<T>,
        new_total: usize,
    ) -> ViewResult<MergeOutcome> {
        if new_total < self.num_items {
            let released = self.release_in_flight(begin, end);
            warn!(
                begin,
                end,
                known = self.num_items,
                reported = new_total,
                released,
                "rejecting batch: data source reported a shrinking total"
            );
            return Err(ViewError::ConsistencyViolation {
                known: self.num_items,
                reported: new_total,
            });
        }
        if begin > end || items.len() != end - begin || end > new_total {
            self.release_in_flight(begin, end);
            return Err(ViewError::InvalidArgument(format!(
                "batch [{begin}, {end}) with {} items does not fit total {new_total}",
                items.len()
            )));
        }

        let total_grew = new_total > self.num_items;
        self.num_items = new_total;

        let mut newly_loaded = 0;
        for (index, item) in (begin..end).zip(items) {
            if self.items.insert(index, item).is_none() {
                *self
                    .page_loaded_sizes
                    .entry(page_of(index, self.page_size))
                    .or_insert(0) += 1;
                newly_loaded += 1;
            }
        }
        let released_pages = self.release_in_flight(begin, end);
        debug!(
            begin,
            end,
            newly_loaded,
            released_pages,
            num_items = self.num_items,
            "merged batch"
        );
        Ok(MergeOutcome {
            newly_loaded,
            released_pages,
            total_grew,
        })
    }

    /// Forget that the pages starting in `[begin, end)` are being fetched.
    ///
    /// A failure reported for a shorter span than a page's current request
    /// belongs to an earlier request and releases nothing. Returns the
    /// number of pages released.
    pub fn fail_fetch(&mut self, begin: usize, end: usize) -> usize {
        let released = self.release_in_flight(begin, end);
        warn!(begin, end, released, "page fetch failed");
        released
    }

    /// Exactly `display_count` slots starting at `scroll_begin`.
    ///
    /// Never triggers a fetch; unloaded or out-of-range slots are `None`.
    #[must_use]
    pub fn visible_slice(&self, scroll_begin: usize, display_count: usize) -> Vec<Option<&T>> {
        (scroll_begin..scroll_begin + display_count)
            .map(|index| self.items.get(&index))
            .collect()
    }

    fn release_in_flight(&mut self, begin: usize, end: usize) -> usize {
        let mut released = 0;
        for page in pages_starting_in(begin, end, self.page_size) {
            let Some(&requested_end) = self.in_flight.get(&page) else {
                continue;
            };
            if end >= requested_end || self.is_page_complete(page) {
                self.in_flight.remove(&page);
                released += 1;
            } else {
                trace!(page, end, requested_end, "stale completion; page stays in flight");
            }
        }
        released
    }
}
