#![forbid(unsafe_code)]

//! dbgscope Runtime
//!
//! The session state machine of the debugger viewer. Every user action and
//! every completed fetch enters as a [`Msg`]; [`DebuggerState::update`]
//! applies it and answers with a [`Cmd`] naming the data still needed.
//!
//! # Key Components
//!
//! - [`DebuggerState`] - the session aggregate and its selectors
//! - [`Msg`] / [`Cmd`] - events in, fetches out
//! - [`DataSource`] - the boundary to whatever serves debugger data
//! - [`SessionSimulator`] - deterministic driver with a controllable fetch queue
//! - [`stack_trace`] - focus resolution and the sticky source-line policy
//!
//! # Logging
//! Transitions log through `tracing`: `debug` for paging and focus changes,
//! `warn` for rejected batches and failed fetches, `error` for window
//! requests the paging layer refuses. Enable the `tracing-json` feature and
//! call [`logging::init`] to install a JSON subscriber.

pub mod alerts;
pub mod data_source;
pub mod debug_trace;
pub mod graphs;
#[cfg(feature = "tracing-json")]
pub mod logging;
pub mod msg;
pub mod sequences;
pub mod simulator;
pub mod source;
pub mod stack_trace;
pub mod state;
mod update;

pub use alerts::AlertsState;
pub use data_source::{DataSource, TransportError, TransportResult};
pub use graphs::{GraphsState, input_execution_indices};
pub use msg::{
    AlertsBreakdown, Cmd, FetchRequest, FetchResponse, Msg, PageResponse, SequenceKind,
};
pub use sequences::{ExecutionsState, GraphExecutionsState, SequenceState};
pub use simulator::{CmdRecord, PendingFetch, SessionSimulator};
pub use source::SourceCodeState;
pub use stack_trace::{
    StackFrameForDisplay, bottommost_in_file, click_is_sticky, resolve_stack_frames,
    sticky_follow,
};
pub use state::DebuggerState;
