#![forbid(unsafe_code)]

//! Load-state bookkeeping shared by every fetched slice.

use serde::{Deserialize, Serialize};

/// Where a piece of remote data is in its loading lifecycle.
///
/// A slice may move from `Loaded` back to `Loading`: totals and paged data
/// are refreshed as the data source keeps growing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataLoadState {
    #[default]
    NotLoaded,
    Loading,
    Loaded,
    Failed,
}

/// Load state plus the time of the last successful load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LoadState {
    pub state: DataLoadState,
    /// Milliseconds since the Unix epoch of the last successful load.
    pub last_loaded_ms: Option<u64>,
}

impl LoadState {
    #[must_use]
    pub const fn not_loaded() -> Self {
        Self {
            state: DataLoadState::NotLoaded,
            last_loaded_ms: None,
        }
    }

    /// Mark as loading, keeping the previous load time.
    pub fn start_loading(&mut self) {
        self.state = DataLoadState::Loading;
    }

    pub fn finish_loading(&mut self, now_ms: u64) {
        self.state = DataLoadState::Loaded;
        self.last_loaded_ms = Some(now_ms);
    }

    pub fn fail(&mut self) {
        self.state = DataLoadState::Failed;
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state == DataLoadState::Loading
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.state == DataLoadState::Loaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loading_keeps_last_load_time() {
        let mut ls = LoadState::not_loaded();
        ls.finish_loading(1_000);
        ls.start_loading();
        assert!(ls.is_loading());
        assert_eq!(ls.last_loaded_ms, Some(1_000));
    }

    #[test]
    fn failure_does_not_touch_timestamp() {
        let mut ls = LoadState::default();
        ls.start_loading();
        ls.fail();
        assert_eq!(ls.state, DataLoadState::Failed);
        assert_eq!(ls.last_loaded_ms, None);
    }
}
