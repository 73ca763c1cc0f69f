#![forbid(unsafe_code)]

//! Test harness for dbgscope sessions.
//!
//! - **[`MemorySource`]**: a [`DataSource`](dbgscope_runtime::DataSource)
//!   over in-memory runs that tests grow between polls.
//! - **[`fixtures`]**: record builders and canned runs.
//! - **[`delivery_storm`]**: seeded out-of-order, duplicate and failed
//!   deliveries with replay checksums.
//!
//! # Quick Start
//!
//! ```ignore
//! use dbgscope_harness::{fixtures, session};
//!
//! let mut sim = session(fixtures::linear_run("run_a", 250), ViewerConfig::default())?;
//! sim.init();
//! sim.deliver_all();
//! assert_eq!(sim.state().executions().digests().num_items(), 250);
//! ```
//!
//! Set `DBGSCOPE_DEBUG_TRACE=1` to watch every queued and delivered fetch.

pub mod delivery_storm;
pub mod fixtures;
pub mod memory_source;

use dbgscope_core::{ViewResult, ViewerConfig};
use dbgscope_runtime::{DebuggerState, SessionSimulator};

pub use delivery_storm::{DeliveryStorm, StormAction, StormConfig, StormReport};
pub use memory_source::{MemorySource, RunData};

/// A simulator over a fresh session with `config`.
pub fn session(
    source: MemorySource,
    config: ViewerConfig,
) -> ViewResult<SessionSimulator<MemorySource>> {
    Ok(SessionSimulator::new(DebuggerState::new(config)?, source))
}

/// A simulator that has listed runs and loaded everything the first run
/// needs on open.
pub fn opened_session(
    source: MemorySource,
    config: ViewerConfig,
) -> ViewResult<SessionSimulator<MemorySource>> {
    let mut sim = session(source, config)?;
    sim.init();
    sim.deliver_all();
    Ok(sim)
}
