#![forbid(unsafe_code)]

//! Env-gated stderr tracing for the simulator loop.
//!
//! Set `DBGSCOPE_DEBUG_TRACE=1` to print every queued, delivered and failed
//! fetch with a timestamp relative to process start. When unset, each call
//! site costs one static bool load.
//!
//! ```bash
//! DBGSCOPE_DEBUG_TRACE=1 cargo test -p dbgscope-harness
//! ```

use std::sync::LazyLock;
use std::time::Instant;

static DEBUG_TRACE_ENABLED: LazyLock<bool> = LazyLock::new(|| {
    std::env::var("DBGSCOPE_DEBUG_TRACE")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
});

static START_TIME: LazyLock<Instant> = LazyLock::new(Instant::now);

#[inline]
pub fn is_enabled() -> bool {
    *DEBUG_TRACE_ENABLED
}

/// Milliseconds since the first trace call.
#[inline]
pub fn elapsed_ms() -> u64 {
    u64::try_from(START_TIME.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Print a timestamped line to stderr when `DBGSCOPE_DEBUG_TRACE` is set.
///
/// ```ignore
/// debug_trace!("deliver {} for run {}", request.type_name(), run);
/// ```
#[macro_export]
macro_rules! debug_trace {
    ($($arg:tt)*) => {
        if $crate::debug_trace::is_enabled() {
            eprintln!(
                "[DBGSCOPE {:>8}ms] {}",
                $crate::debug_trace::elapsed_ms(),
                format_args!($($arg)*)
            );
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_is_monotonic() {
        let t1 = elapsed_ms();
        let t2 = elapsed_ms();
        assert!(t2 >= t1);
        let _ = is_enabled();
    }
}
