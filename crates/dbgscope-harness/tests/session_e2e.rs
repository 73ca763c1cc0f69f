#![forbid(unsafe_code)]

//! End-to-end session tests.
//!
//! Each test drives a `DebuggerState` through `SessionSimulator` over a
//! `MemorySource`, controlling when (and whether) each fetch completes.
//!
//!   cargo test -p dbgscope-harness --test session_e2e

use dbgscope_core::{AlertType, CodeLocationType, GraphOpKey, ViewError, ViewerConfig};
use dbgscope_harness::{MemorySource, fixtures, opened_session};
use dbgscope_runtime::{CmdRecord, FetchRequest, Msg, PendingFetch, SequenceKind, SessionSimulator};

const RUN: &str = "run_a";

fn small_config() -> ViewerConfig {
    ViewerConfig::default().with_executions(10, 4)
}

fn open(source: MemorySource) -> SessionSimulator<MemorySource> {
    opened_session(source, small_config()).unwrap()
}

/// Op types of the visible top-level window; `None` for unloaded slots.
fn visible_ops(sim: &SessionSimulator<MemorySource>) -> Vec<Option<String>> {
    sim.state()
        .executions()
        .digests()
        .view()
        .visible_slice()
        .into_iter()
        .map(|d| d.map(|d| d.op_type.clone()))
        .collect()
}

fn ops(range: std::ops::Range<usize>) -> Vec<Option<String>> {
    range.map(|i| Some(format!("Op{i}"))).collect()
}

fn is_page(fetch: &PendingFetch, begin: usize) -> bool {
    matches!(
        fetch.request(),
        Some(FetchRequest::Page { sequence: SequenceKind::Executions, begin: b, .. }) if *b == begin
    )
}

// ============================================================================
// Opening and scrolling
// ============================================================================

#[test]
fn open_loads_first_window_and_focused_record() {
    let sim = open(fixtures::linear_run(RUN, 25));

    assert!(sim.errors().is_empty());
    assert!(sim.pending().is_empty());
    let state = sim.state();
    assert_eq!(state.active_run(), Some(RUN));
    assert_eq!(state.executions().digests().num_items(), 25);
    assert_eq!(visible_ops(&sim), ops(0..4));
    assert_eq!(state.focus_index(SequenceKind::Executions), Some(0));
    assert_eq!(
        state.code_location_focus_type(),
        Some(CodeLocationType::Execution)
    );
    assert!(state.executions().execution_data().contains_key(&0));
}

#[test]
fn scrolling_across_a_page_boundary_fetches_one_page() {
    let mut sim = open(fixtures::linear_run(RUN, 25));

    sim.send(Msg::ScrollToIndex(SequenceKind::Executions, 8));
    assert_eq!(
        sim.pending(),
        &[PendingFetch::Data {
            run: RUN.into(),
            request: FetchRequest::Page {
                sequence: SequenceKind::Executions,
                begin: 10,
                end: 20,
            },
        }]
    );
    assert_eq!(visible_ops(&sim)[..2], ops(8..10)[..]);
    assert_eq!(visible_ops(&sim)[2], None);

    sim.deliver_all();
    assert_eq!(visible_ops(&sim), ops(8..12));
}

#[test]
fn scroll_past_last_window_is_rejected() {
    let mut sim = open(fixtures::linear_run(RUN, 25));
    sim.send(Msg::ScrollToIndex(SequenceKind::Executions, 22));
    assert_eq!(sim.errors().len(), 1);
    assert_eq!(sim.state().scroll_begin(SequenceKind::Executions), 0);
    assert!(sim.pending().is_empty());
}

#[test]
fn graph_scroll_past_last_window_is_rejected() {
    let mut source = fixtures::linear_run(RUN, 5);
    for i in 0..20 {
        source.push_graph_execution(RUN, fixtures::graph_execution("g1", &format!("n{i}"), 0));
    }
    let config = small_config().with_graph_executions(8, 3);
    let mut sim = opened_session(source, config).unwrap();
    assert_eq!(sim.state().graph_executions().num_items(), 20);

    sim.send(Msg::ScrollToIndex(SequenceKind::GraphExecutions, 17));
    sim.deliver_all();
    assert!(sim.errors().is_empty());
    assert_eq!(sim.state().scroll_begin(SequenceKind::GraphExecutions), 17);

    sim.send(Msg::ScrollToIndex(SequenceKind::GraphExecutions, 18));
    assert_eq!(
        sim.errors(),
        &[ViewError::OutOfRange { index: 18, max: 17 }]
    );
    assert_eq!(sim.state().scroll_begin(SequenceKind::GraphExecutions), 17);
    assert_eq!(sim.state().graph_executions().view().visible_range(), 17..20);
    assert!(sim.pending().is_empty());
}

// ============================================================================
// Delivery order
// ============================================================================

#[test]
fn out_of_order_and_duplicate_deliveries_converge() {
    let mut sim = open(fixtures::linear_run(RUN, 40));

    for begin in [8, 18, 28] {
        sim.send(Msg::ScrollToIndex(SequenceKind::Executions, begin));
    }
    assert_eq!(sim.pending().len(), 3);
    for (i, begin) in [10, 20, 30].into_iter().enumerate() {
        assert!(is_page(&sim.pending()[i], begin));
    }

    assert!(sim.deliver_at(2));
    assert!(sim.duplicate_at(1));
    assert!(sim.deliver_at(1));
    assert!(sim.deliver_at(0));
    sim.deliver_all();

    assert!(sim.errors().is_empty());
    let sequence = sim.state().executions().digests().view().sequence();
    assert_eq!(sequence.loaded_len(), 40);
    for page in 0..4 {
        assert_eq!(sequence.page_loaded_size(page), Some(10));
    }
    assert!(sequence.in_flight_pages().next().is_none());
    assert_eq!(visible_ops(&sim), ops(28..32));
}

#[test]
fn response_for_previous_run_is_dropped() {
    let mut source = fixtures::linear_run(RUN, 25);
    source.add_run("run_b", 1.0);
    for i in 0..3 {
        source.push_execution("run_b", fixtures::execution(&format!("B{i}"), &[]));
    }
    let mut sim = open(source);

    sim.send(Msg::ScrollToIndex(SequenceKind::Executions, 12));
    assert!(is_page(&sim.pending()[0], 10));
    sim.send(Msg::ActiveRunChanged(Some("run_b".into())));
    assert_eq!(sim.state().executions().digests().num_items(), 0);
    assert!(sim.state().executions().execution_data().is_empty());

    sim.deliver_all();
    assert!(sim.errors().is_empty());
    let state = sim.state();
    assert_eq!(state.active_run(), Some("run_b"));
    assert_eq!(state.executions().digests().num_items(), 3);
    assert_eq!(state.executions().digests().view().sequence().loaded_len(), 3);
    assert_eq!(state.scroll_begin(SequenceKind::Executions), 0);
}

#[test]
fn failed_fetch_is_retried_on_the_next_event() {
    let mut sim = open(fixtures::stacked_run(RUN, 4));

    sim.send(Msg::FocusByDisplayOffset(SequenceKind::Executions, 1));
    let index = sim
        .find_pending(|f| {
            matches!(
                f.request(),
                Some(FetchRequest::ExecutionData { begin: 1, end: 2 })
            )
        })
        .unwrap();
    assert!(sim.fail_at(index));
    assert!(sim.pending().is_empty());
    assert!(!sim.state().executions().execution_data().contains_key(&1));

    sim.send(Msg::Refresh);
    assert!(
        sim.find_pending(|f| matches!(f.request(), Some(FetchRequest::ExecutionData { begin: 1, .. })))
            .is_some()
    );
    sim.deliver_all();
    assert!(sim.state().executions().execution_data().contains_key(&1));
    assert_eq!(
        sim.state().focused_stack_frames().map(|f| f.len()),
        Some(2)
    );
}

// ============================================================================
// Polling
// ============================================================================

#[test]
fn growing_source_is_picked_up_by_polls() {
    let mut sim = open(fixtures::linear_run(RUN, 5));
    assert_eq!(visible_ops(&sim), ops(0..4));

    for i in 5..15 {
        sim.source_mut()
            .push_execution(RUN, fixtures::execution(&format!("Op{i}"), &[]));
    }
    sim.advance(1000);
    sim.send(Msg::PollStarted);
    sim.deliver_all();

    let state = sim.state();
    assert_eq!(state.executions().digests().num_items(), 15);
    assert_eq!(
        state.executions().digests().view().sequence().page_loaded_size(0),
        Some(10)
    );
    assert_eq!(state.poll_onset_ms(), 1000);
    assert_eq!(state.last_non_empty_poll_ms(), 1000);
    assert_eq!(state.poll_silence_ms(), 0);

    sim.send(Msg::ScrollToIndex(SequenceKind::Executions, 11));
    sim.deliver_all();
    assert_eq!(visible_ops(&sim), ops(11..15));

    sim.advance(500);
    sim.send(Msg::PollStarted);
    sim.deliver_all();
    assert_eq!(sim.state().poll_silence_ms(), 500);
    assert!(sim.errors().is_empty());
}

// ============================================================================
// Alerts
// ============================================================================

#[test]
fn first_alert_recenters_and_focuses_graph_execution() {
    let mut source = fixtures::linear_run(RUN, 100);
    for i in 0..5 {
        source.push_graph_execution(RUN, fixtures::graph_execution("g1", &format!("n{i}"), 0));
    }
    source.push_alert(RUN, fixtures::inf_nan_alert(10, Some(3)));
    source.push_alert(RUN, fixtures::inf_nan_alert(20, None));
    source.push_alert(RUN, fixtures::recompile_alert("train_step"));
    let mut sim = open(source);
    assert_eq!(sim.state().alerts().num_alerts(), 3);

    sim.send(Msg::AlertTypeFocusToggled(AlertType::InfNan));
    assert!(sim.find_pending(|f| matches!(
        f.request(),
        Some(FetchRequest::AlertsOfType { alert_type: AlertType::InfNan, begin: 0, end: 2 })
    ))
    .is_some());
    sim.deliver_all();

    let state = sim.state();
    assert!(sim.errors().is_empty());
    assert_eq!(state.scroll_begin(SequenceKind::Executions), 8);
    assert_eq!(state.focus_index(SequenceKind::GraphExecutions), Some(3));
    assert_eq!(state.alerts().num_alerts_of_focused_type(), 2);
    assert_eq!(visible_ops(&sim), ops(8..12));
    assert_eq!(
        state.focus_alert_types_of_visible_executions(),
        vec![None, None, Some(AlertType::InfNan), None]
    );
}

#[test]
fn refocusing_a_loaded_alert_type_recenters_without_fetching() {
    let mut source = fixtures::linear_run(RUN, 100);
    source.push_alert(RUN, fixtures::inf_nan_alert(30, None));
    let mut sim = open(source);

    sim.send(Msg::AlertTypeFocusToggled(AlertType::InfNan));
    sim.deliver_all();
    assert_eq!(sim.state().scroll_begin(SequenceKind::Executions), 28);

    sim.send(Msg::ScrollToIndex(SequenceKind::Executions, 0));
    sim.send(Msg::AlertTypeFocusToggled(AlertType::InfNan));
    assert_eq!(sim.state().alerts().focus_type(), None);
    sim.send(Msg::AlertTypeFocusToggled(AlertType::InfNan));
    assert_eq!(sim.state().scroll_begin(SequenceKind::Executions), 28);
    assert!(
        sim.find_pending(|f| matches!(f.request(), Some(FetchRequest::AlertsOfType { .. })))
            .is_none()
    );
}

// ============================================================================
// Stack frames and source code
// ============================================================================

#[test]
fn sticky_focus_follows_bottommost_frame() {
    let mut sim = open(fixtures::stacked_run(RUN, 4));
    assert_eq!(
        sim.state().focused_stack_frames(),
        Some(vec![
            fixtures::frame("/file1.py", 5, "main"),
            fixtures::frame("/file2.py", 10, "inner"),
        ])
    );

    sim.send(Msg::SourceLineClicked(fixtures::frame("/file2.py", 10, "inner")));
    assert!(sim.state().sticky_focus());
    sim.deliver_all();
    let content = sim.state().source_code().focused_file_content().unwrap();
    assert_eq!(content.lines.as_ref().map(Vec::len), Some(30));

    sim.send(Msg::FocusByDisplayOffset(SequenceKind::Executions, 1));
    sim.deliver_all();

    let state = sim.state();
    assert!(sim.errors().is_empty());
    assert_eq!(
        state.source_code().focus_line(),
        Some(&fixtures::frame("/file2.py", 20, "inner"))
    );
    let display = state.stack_frames_for_display().unwrap();
    assert_eq!(display.len(), 2);
    assert!(!display[0].belongs_to_focused_file);
    assert!(display[1].belongs_to_focused_file);
    assert!(display[1].focused);
    assert_eq!(display[1].concise_file_path, "file2.py");
}

#[test]
fn without_sticky_focus_the_line_stays_put() {
    let mut sim = open(fixtures::stacked_run(RUN, 4));
    sim.send(Msg::SourceLineClicked(fixtures::frame("/file2.py", 10, "inner")));
    sim.send(Msg::StickyFocusSet(false));
    sim.send(Msg::FocusByDisplayOffset(SequenceKind::Executions, 1));
    sim.deliver_all();

    let state = sim.state();
    assert_eq!(
        state.source_code().focus_line(),
        Some(&fixtures::frame("/file2.py", 10, "inner"))
    );
    let display = state.stack_frames_for_display().unwrap();
    assert!(display[1].belongs_to_focused_file);
    assert!(!display[1].focused);
}

#[test]
fn graph_op_focus_loads_op_with_neighbors() {
    let mut source = fixtures::linear_run(RUN, 3);
    source.insert_graph_op(RUN, fixtures::graph_op("g1", "x", &[], &["y"]));
    source.insert_graph_op(RUN, fixtures::graph_op("g1", "y", &["x"], &[]));
    let mut sim = open(source);

    sim.send(Msg::GraphOpFocused(GraphOpKey::new("g1", "y")));
    sim.deliver_all();

    let state = sim.state();
    assert_eq!(
        state.code_location_focus_type(),
        Some(CodeLocationType::GraphOpCreation)
    );
    assert_eq!(
        state.graphs().focused_op_info().map(|op| op.op_name.as_str()),
        Some("y")
    );
    assert!(state.graphs().op("g1", "x").is_some());
    let inputs = state.graphs().focused_op_inputs().unwrap();
    assert_eq!(inputs[0].data.as_ref().map(|d| d.op_name.as_str()), Some("x"));
}

// ============================================================================
// Command log
// ============================================================================

#[test]
fn command_log_exports_as_jsonl() {
    let sim = open(fixtures::linear_run(RUN, 5));
    let jsonl = sim.export_command_log_jsonl().unwrap();
    let records: Vec<serde_json::Value> = jsonl
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(records.len(), sim.command_log().len());
    assert_eq!(records[0]["record"], "queued");
    assert_eq!(records[0]["fetch"]["pending"], "runs");
    assert!(
        sim.command_log()
            .iter()
            .any(|r| matches!(r, CmdRecord::Delivered { fetch } if fetch.request() == Some(&FetchRequest::NumExecutions)))
    );
}
