#![forbid(unsafe_code)]

//! Stack-trace focus resolution.
//!
//! Resolves the call stack of whatever has code-location focus and
//! implements the sticky policy: while sticky, the focused source line
//! follows the bottommost frame of the stack that lies in the focused file.
//!
//! # Invariants
//!
//! 1. Resolution is all-or-nothing: one unresolved frame id yields `None`.
//! 2. Sticky follow never moves the focused line to another file.

use std::collections::{HashMap, HashSet};

use dbgscope_core::{FocusOrigin, SourceFileSpec, StackFrame, StackFrameId, concise_file_path};
use serde::Serialize;

use crate::state::DebuggerState;

/// Frames for `ids`, in order, or `None` if any id is not loaded.
#[must_use]
pub fn frames_by_ids(
    ids: &[StackFrameId],
    table: &HashMap<StackFrameId, StackFrame>,
) -> Option<Vec<StackFrame>> {
    ids.iter().map(|id| table.get(id).cloned()).collect()
}

/// Frame ids the origin needs, as recorded on its owning record.
#[must_use]
pub fn origin_frame_ids<'a>(
    origin: &FocusOrigin,
    state: &'a DebuggerState,
) -> Option<&'a [StackFrameId]> {
    match origin {
        FocusOrigin::Execution { index } => state
            .executions()
            .execution_data()
            .get(index)
            .map(|e| e.stack_frame_ids.as_slice()),
        FocusOrigin::GraphOpCreation { graph_id, op_name } => state
            .graphs()
            .op(graph_id, op_name)
            .map(|op| op.stack_frame_ids.as_slice()),
    }
}

/// The call stack of `origin`.
///
/// `None` when there is no origin, its record is not loaded, or any of its
/// frames is not loaded.
#[must_use]
pub fn resolve_stack_frames(
    origin: Option<&FocusOrigin>,
    state: &DebuggerState,
) -> Option<Vec<StackFrame>> {
    let ids = origin_frame_ids(origin?, state)?;
    frames_by_ids(ids, state.stack_frames())
}

/// Ids in `ids` that are neither loaded nor in flight, without duplicates.
#[must_use]
pub fn missing_frame_ids(
    ids: &[StackFrameId],
    table: &HashMap<StackFrameId, StackFrame>,
    in_flight: &HashSet<StackFrameId>,
) -> Vec<StackFrameId> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| !table.contains_key(*id) && !in_flight.contains(*id))
        .filter(|id| seen.insert(*id))
        .cloned()
        .collect()
}

/// The last frame of `frames` that lies in `file`.
#[must_use]
pub fn bottommost_in_file<'a>(
    frames: &'a [StackFrame],
    file: &SourceFileSpec,
) -> Option<&'a StackFrame> {
    frames
        .iter()
        .rev()
        .find(|f| f.is_in_file(&file.host_name, &file.file_path))
}

/// Where a sticky focused line moves for `frames`.
///
/// Returns `None` when it stays put: no frame of `frames` lies in the
/// line's file, or the line already is that frame.
#[must_use]
pub fn sticky_follow(frames: &[StackFrame], line: &StackFrame) -> Option<StackFrame> {
    let target = bottommost_in_file(frames, &line.file_spec())?;
    (target != line).then(|| target.clone())
}

/// Whether clicking `clicked` turns sticky focus on: true iff it is the
/// bottommost frame of its file in `frames`.
#[must_use]
pub fn click_is_sticky(clicked: &StackFrame, frames: &[StackFrame]) -> bool {
    bottommost_in_file(frames, &clicked.file_spec()) == Some(clicked)
}

/// One stack frame, prepared for the stack-trace panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackFrameForDisplay {
    pub host_name: String,
    pub file_path: String,
    pub concise_file_path: String,
    pub lineno: u32,
    pub function_name: String,
    /// Whether the frame lies in the file of the focused line.
    pub belongs_to_focused_file: bool,
    /// Whether the frame is the focused line.
    pub focused: bool,
}

#[must_use]
pub fn frames_for_display(
    frames: &[StackFrame],
    focus_line: Option<&StackFrame>,
) -> Vec<StackFrameForDisplay> {
    frames
        .iter()
        .map(|f| {
            let belongs_to_focused_file =
                focus_line.is_some_and(|l| f.is_in_file(&l.host_name, &l.file_path));
            StackFrameForDisplay {
                host_name: f.host_name.clone(),
                file_path: f.file_path.clone(),
                concise_file_path: concise_file_path(&f.file_path).to_string(),
                lineno: f.lineno,
                function_name: f.function_name.clone(),
                belongs_to_focused_file,
                focused: belongs_to_focused_file
                    && focus_line.is_some_and(|l| l.lineno == f.lineno),
            }
        })
        .collect()
}
