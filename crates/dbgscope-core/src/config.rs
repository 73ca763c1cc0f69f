#![forbid(unsafe_code)]

//! Viewer configuration with environment overrides.
//!
//! Defaults are compiled in; every field can be overridden through an
//! environment variable. Parsing is deterministic given the lookup function,
//! so tests pass a map instead of touching the process environment.

use crate::error::{ViewError, ViewResult};

/// Environment variable overriding the top-level execution page size.
const ENV_EXECUTION_PAGE_SIZE: &str = "DBGSCOPE_EXECUTION_PAGE_SIZE";
/// Environment variable overriding the top-level execution display count.
const ENV_EXECUTION_DISPLAY_COUNT: &str = "DBGSCOPE_EXECUTION_DISPLAY_COUNT";
/// Environment variable overriding the intra-graph execution page size.
const ENV_GRAPH_EXECUTION_PAGE_SIZE: &str = "DBGSCOPE_GRAPH_EXECUTION_PAGE_SIZE";
/// Environment variable overriding the intra-graph execution display count.
const ENV_GRAPH_EXECUTION_DISPLAY_COUNT: &str = "DBGSCOPE_GRAPH_EXECUTION_DISPLAY_COUNT";
/// Environment variable overriding the graph-input look-back (in indices).
const ENV_MAX_LOOK_BACK: &str = "DBGSCOPE_MAX_LOOK_BACK";
/// Environment variable setting the initial sticky-focus flag (`1/0/true/false`).
const ENV_STICKY_FOCUS: &str = "DBGSCOPE_STICKY_FOCUS";
/// Environment variable holding the tracing filter directive.
const ENV_LOG: &str = "DBGSCOPE_LOG";

/// Paging geometry of one sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceConfig {
    /// Items per fetched page.
    pub page_size: usize,
    /// Items visible in the viewport at once. Must not exceed `page_size`.
    pub display_count: usize,
}

impl SequenceConfig {
    #[must_use]
    pub const fn new(page_size: usize, display_count: usize) -> Self {
        Self {
            page_size,
            display_count,
        }
    }

    /// Reject geometries the page resolver cannot serve.
    pub fn validate(&self) -> ViewResult<()> {
        if self.page_size == 0 {
            return Err(ViewError::InvalidArgument(
                "Invalid pageSize: 0".to_string(),
            ));
        }
        if self.display_count > self.page_size {
            return Err(ViewError::InvalidArgument(format!(
                "display count ({}) exceeds page size ({})",
                self.display_count, self.page_size
            )));
        }
        Ok(())
    }
}

/// Configuration of a viewer session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerConfig {
    /// Top-level (eager) executions.
    pub executions: SequenceConfig,
    /// Intra-graph executions.
    pub graph_executions: SequenceConfig,
    /// How far back to look for the inputs of a focused intra-graph execution.
    pub max_look_back: usize,
    /// Initial value of the stick-to-bottommost-frame flag.
    pub sticky_focus: bool,
    /// Tracing filter directive used by `logging::init`.
    pub log_directive: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            executions: SequenceConfig::new(100, 50),
            graph_executions: SequenceConfig::new(200, 100),
            max_look_back: 200,
            sticky_focus: false,
            log_directive: "info".to_string(),
        }
    }
}

impl ViewerConfig {
    /// Defaults overridden by the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Defaults overridden through a custom environment lookup (for tests).
    ///
    /// Unparseable values are ignored and the default kept.
    #[must_use]
    pub fn from_env_with<F>(get_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(v) = env_usize(&get_env, ENV_EXECUTION_PAGE_SIZE) {
            config.executions.page_size = v;
        }
        if let Some(v) = env_usize(&get_env, ENV_EXECUTION_DISPLAY_COUNT) {
            config.executions.display_count = v;
        }
        if let Some(v) = env_usize(&get_env, ENV_GRAPH_EXECUTION_PAGE_SIZE) {
            config.graph_executions.page_size = v;
        }
        if let Some(v) = env_usize(&get_env, ENV_GRAPH_EXECUTION_DISPLAY_COUNT) {
            config.graph_executions.display_count = v;
        }
        if let Some(v) = env_usize(&get_env, ENV_MAX_LOOK_BACK) {
            config.max_look_back = v;
        }
        if let Some(v) = env_bool(&get_env, ENV_STICKY_FOCUS) {
            config.sticky_focus = v;
        }
        if let Some(v) = get_env(ENV_LOG).filter(|v| !v.trim().is_empty()) {
            config.log_directive = v;
        }
        config
    }

    #[must_use]
    pub fn with_executions(mut self, page_size: usize, display_count: usize) -> Self {
        self.executions = SequenceConfig::new(page_size, display_count);
        self
    }

    #[must_use]
    pub fn with_graph_executions(mut self, page_size: usize, display_count: usize) -> Self {
        self.graph_executions = SequenceConfig::new(page_size, display_count);
        self
    }

    #[must_use]
    pub fn with_max_look_back(mut self, max_look_back: usize) -> Self {
        self.max_look_back = max_look_back;
        self
    }

    #[must_use]
    pub fn with_sticky_focus(mut self, sticky: bool) -> Self {
        self.sticky_focus = sticky;
        self
    }

    pub fn validate(&self) -> ViewResult<()> {
        self.executions.validate()?;
        self.graph_executions.validate()
    }
}

fn env_usize<F>(get_env: &F, key: &str) -> Option<usize>
where
    F: Fn(&str) -> Option<String>,
{
    get_env(key).and_then(|v| v.trim().parse().ok())
}

fn env_bool<F>(get_env: &F, key: &str) -> Option<bool>
where
    F: Fn(&str) -> Option<String>,
{
    let value = get_env(key)?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
