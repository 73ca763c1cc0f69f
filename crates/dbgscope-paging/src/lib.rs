#![forbid(unsafe_code)]

//! Windowed pagination cache for append-only remote sequences.
//!
//! # Core Types
//!
//! - [`page`] - pure page arithmetic and missing-page resolution
//! - [`PaginatedSequence<T>`] - sparse store with per-page accounting and
//!   in-flight tracking
//! - [`ScrollWindow`] - viewport position and focus
//! - [`PagedView<T>`] - coordinator that turns window moves into page requests
//!
//! # Example
//!
//! ```
//! use dbgscope_core::SequenceConfig;
//! use dbgscope_paging::PagedView;
//!
//! let mut view: PagedView<u64> = PagedView::new(SequenceConfig::new(100, 50)).unwrap();
//! let request = view.set_num_items(240).unwrap();
//! assert_eq!(request.ranges, vec![0..100]);
//!
//! view.apply_fetch_result(0, 100, (0..100).collect(), 240).unwrap();
//! assert!(view.visible_slice().iter().all(Option::is_some));
//! ```

pub mod page;
pub mod sequence;
pub mod view;
pub mod window;

pub use page::{
    MissingPages, PageLoadedSizes, find_range, num_pages, page_of, page_span,
    resolve_missing_pages,
};
pub use sequence::{MergeOutcome, PaginatedSequence, WindowRequest};
pub use view::PagedView;
pub use window::ScrollWindow;
