//! Property-based invariant tests for the pagination cache.
//!
//! These tests verify invariants that must hold for any valid inputs:
//!
//! 1. Missing-page resolution returns at most two ascending pages, each
//!    below `ceil(num_items / page_size)`.
//! 2. Merging the same batch twice changes nothing the second time.
//! 3. Merge order does not affect the page accounting.
//! 4. `page_loaded_sizes[p]` equals the number of loaded indices in page `p`.
//! 5. The total never decreases.
//! 6. A window covered by complete pages has no empty slot.
//! 7. A page handed out by `request_window` is never handed out again while
//!    its request is outstanding, even as the source grows and responses
//!    arrive late, twice, or not at all.
//! 8. `scroll_left` at 0 and `scroll_right` at the last full window are
//!    no-ops.

use std::collections::BTreeMap;
use std::ops::Range;

use dbgscope_core::SequenceConfig;
use dbgscope_paging::{
    PagedView, PaginatedSequence, WindowRequest, num_pages, page_of, resolve_missing_pages,
};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

/// `(page_size, num_items, begin, end)` with a valid window.
fn window_strategy() -> impl Strategy<Value = (usize, usize, usize, usize)> {
    (1usize..=64, 0usize..=1000).prop_flat_map(|(page_size, num_items)| {
        (0..=num_items).prop_flat_map(move |begin| {
            let max_end = (begin + page_size).min(num_items);
            (begin..=max_end).prop_map(move |end| (page_size, num_items, begin, end))
        })
    })
}

/// Loaded sizes that could have been produced by merging batches.
fn loaded_sizes_strategy(
    page_size: usize,
    num_items: usize,
) -> impl Strategy<Value = BTreeMap<usize, usize>> {
    let pages = num_pages(num_items, page_size).max(1);
    prop::collection::btree_map(0..pages, 0..=page_size, 0..8)
}

/// Batches `(begin, end)` inside `[0, total)`.
fn batches_strategy(total: usize) -> impl Strategy<Value = Vec<(usize, usize)>> {
    prop::collection::vec(
        (0..total).prop_flat_map(move |b| (Just(b), b + 1..=total.min(b + 40))),
        1..10,
    )
}

fn merge_all(page_size: usize, total: usize, batches: &[(usize, usize)]) -> PaginatedSequence<usize> {
    let mut seq = PaginatedSequence::new(page_size).unwrap();
    seq.set_num_items(total).unwrap();
    for &(b, e) in batches {
        seq.apply_fetch_result(b, e, (b..e).collect(), total).unwrap();
    }
    seq
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Resolution is bounded and ascending
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn resolution_bounded(
        (page_size, num_items, begin, end, sizes) in window_strategy()
            .prop_flat_map(|(ps, n, b, e)| {
                loaded_sizes_strategy(ps, n).prop_map(move |s| (ps, n, b, e, s))
            })
    ) {
        let pages = resolve_missing_pages(begin, end, page_size, num_items, &sizes).unwrap();
        prop_assert!(pages.len() <= 2);
        prop_assert!(pages.windows(2).all(|w| w[0] < w[1]));
        for &p in &pages {
            prop_assert!(p < num_pages(num_items, page_size), "page {} out of range", p);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Merge idempotence
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn merge_idempotent((total, batches) in (1usize..=300).prop_flat_map(|t| (Just(t), batches_strategy(t)))) {
        let once = merge_all(16, total, &batches);
        let mut twice_batches = batches.clone();
        twice_batches.extend(batches.iter().copied());
        let twice = merge_all(16, total, &twice_batches);
        prop_assert_eq!(once.page_loaded_sizes(), twice.page_loaded_sizes());
        prop_assert_eq!(once.loaded_len(), twice.loaded_len());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Merge order independence
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn merge_order_independent((total, batches) in (1usize..=300).prop_flat_map(|t| (Just(t), batches_strategy(t)))) {
        let forward = merge_all(10, total, &batches);
        let reversed: Vec<_> = batches.iter().rev().copied().collect();
        let backward = merge_all(10, total, &reversed);
        prop_assert_eq!(forward.page_loaded_sizes(), backward.page_loaded_sizes());
        let f: Vec<_> = forward.iter().map(|(i, v)| (i, *v)).collect();
        let b: Vec<_> = backward.iter().map(|(i, v)| (i, *v)).collect();
        prop_assert_eq!(f, b);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Page accounting matches loaded indices
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn page_sizes_match_items(
        page_size in 1usize..=32,
        (total, batches) in (1usize..=300).prop_flat_map(|t| (Just(t), batches_strategy(t))),
    ) {
        let seq = merge_all(page_size, total, &batches);
        let mut counted: BTreeMap<usize, usize> = BTreeMap::new();
        for (i, _) in seq.iter() {
            prop_assert!(i < seq.num_items());
            *counted.entry(page_of(i, page_size)).or_insert(0) += 1;
        }
        prop_assert_eq!(&counted, seq.page_loaded_sizes());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Totals are monotonic
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn totals_monotonic(reports in prop::collection::vec(0usize..1000, 1..30)) {
        let mut seq = PaginatedSequence::<u8>::new(10).unwrap();
        let mut high = 0;
        for total in reports {
            let result = seq.set_num_items(total);
            if total < high {
                prop_assert!(result.is_err());
            } else {
                high = total;
            }
            prop_assert_eq!(seq.num_items(), high);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. Complete pages leave no holes in the window
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn complete_pages_fill_window(
        page_size in 1usize..=50,
        total in 1usize..=500,
        frac in 0.0f64..1.0,
    ) {
        let display = page_size;
        let mut view = PagedView::new(SequenceConfig::new(page_size, display)).unwrap();
        view.set_num_items(total).unwrap();
        let mut begin = 0;
        while begin < total {
            let end = (begin + page_size).min(total);
            view.apply_fetch_result(begin, end, (begin..end).collect(), total).unwrap();
            begin = end;
        }
        let max = total.saturating_sub(display);
        let target = (max as f64 * frac) as usize;
        let req = view.scroll_to_index(target).unwrap();
        prop_assert!(req.is_empty());
        let visible = view.visible_range();
        let slice = view.visible_slice();
        prop_assert!(slice[..visible.len()].iter().all(Option::is_some));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 7. In-flight pages are never requested twice
// ═════════════════════════════════════════════════════════════════════════

/// One step against a view whose source keeps growing.
#[derive(Debug, Clone)]
enum Step {
    Scroll(usize),
    Grow(usize),
    Deliver(usize),
    /// Deliver a pending response but leave it queued, so it arrives again.
    Duplicate(usize),
    Fail(usize),
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => (0usize..2000).prop_map(Step::Scroll),
        2 => (1usize..300).prop_map(Step::Grow),
        3 => any::<usize>().prop_map(Step::Deliver),
        2 => any::<usize>().prop_map(Step::Duplicate),
        1 => any::<usize>().prop_map(Step::Fail),
    ]
}

/// Queue every range of `req` and mark its pages as owned by that range.
///
/// Fails if a page is handed out while an earlier request for it is live.
fn record_request(
    req: &WindowRequest,
    next_id: &mut usize,
    queue: &mut Vec<(usize, Range<usize>)>,
    live: &mut BTreeMap<usize, usize>,
) -> Result<(), TestCaseError> {
    for range in &req.ranges {
        let id = *next_id;
        *next_id += 1;
        for page in page_of(range.start, 100)..=page_of(range.end - 1, 100) {
            prop_assert!(
                live.insert(page, id).is_none(),
                "page {} requested twice",
                page
            );
        }
        queue.push((id, range.clone()));
    }
    Ok(())
}

proptest! {
    #[test]
    fn no_double_request(
        initial in 1usize..=2000,
        steps in prop::collection::vec(step_strategy(), 1..60),
    ) {
        let mut view = PagedView::<usize>::new(SequenceConfig::new(100, 50)).unwrap();
        let mut source_total = initial;
        let mut next_id = 0;
        let mut queue: Vec<(usize, Range<usize>)> = Vec::new();
        // Page -> request id whose response has not arrived yet.
        let mut live: BTreeMap<usize, usize> = BTreeMap::new();

        let first = view.set_num_items(source_total).unwrap();
        record_request(&first, &mut next_id, &mut queue, &mut live)?;

        for step in steps {
            match step {
                Step::Scroll(m) => {
                    let max = view.num_items().saturating_sub(50);
                    let req = view.scroll_to_index(m % (max + 1)).unwrap();
                    record_request(&req, &mut next_id, &mut queue, &mut live)?;
                }
                Step::Grow(k) => {
                    source_total += k;
                    let req = view.set_num_items(source_total).unwrap();
                    record_request(&req, &mut next_id, &mut queue, &mut live)?;
                }
                Step::Deliver(i) | Step::Duplicate(i) | Step::Fail(i) if !queue.is_empty() => {
                    let at = i % queue.len();
                    let (id, range) = if matches!(step, Step::Duplicate(_)) {
                        queue[at].clone()
                    } else {
                        queue.remove(at)
                    };
                    if matches!(step, Step::Fail(_)) {
                        view.fail_fetch(range.start, range.end);
                    } else {
                        view.apply_fetch_result(
                            range.start,
                            range.end,
                            range.clone().collect(),
                            source_total,
                        )
                        .unwrap();
                    }
                    live.retain(|_, owner| *owner != id);
                }
                _ => {}
            }
            let in_flight: Vec<usize> = view.sequence().in_flight_pages().collect();
            let expected: Vec<usize> = live.keys().copied().collect();
            prop_assert_eq!(in_flight, expected);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 8. Scroll boundaries
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn scroll_boundaries_are_noops(total in 0usize..=500, display in 1usize..=50) {
        let mut view = PagedView::<usize>::new(SequenceConfig::new(50, display)).unwrap();
        view.set_num_items(total).unwrap();

        prop_assert!(view.scroll_left().unwrap().is_empty());
        prop_assert_eq!(view.scroll_begin(), 0);

        let max = total.saturating_sub(display);
        view.scroll_to_index(max).unwrap();
        view.scroll_right().unwrap();
        prop_assert_eq!(view.scroll_begin(), max);
    }
}
