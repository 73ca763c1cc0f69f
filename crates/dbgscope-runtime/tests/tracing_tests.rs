#![forbid(unsafe_code)]

//! Tracing integration tests.
//!
//! These tests verify that session transitions emit the spans and events
//! operators rely on: one `dbgscope.update` span per message, `warn` for
//! rejected data, and structured paging fields.
//!
//!   cargo test -p dbgscope-runtime --test tracing_tests

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use dbgscope_core::{DataLoadState, ViewerConfig};
use dbgscope_runtime::{DebuggerState, FetchRequest, FetchResponse, Msg};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;

// ============================================================================
// Test Infrastructure
// ============================================================================

#[derive(Debug, Clone)]
struct CapturedSpan {
    name: String,
    fields: HashMap<String, String>,
}

#[derive(Debug, Clone)]
struct CapturedEvent {
    level: tracing::Level,
    message: String,
    fields: HashMap<String, String>,
    parent_span: Option<String>,
}

/// A tracing Layer that records spans and events.
struct Capture {
    spans: Arc<Mutex<Vec<CapturedSpan>>>,
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

struct CaptureHandle {
    spans: Arc<Mutex<Vec<CapturedSpan>>>,
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl CaptureHandle {
    fn spans(&self) -> Vec<CapturedSpan> {
        self.spans.lock().unwrap().clone()
    }

    fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().unwrap().clone()
    }

    fn events_at(&self, level: tracing::Level) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.level == level)
            .collect()
    }
}

struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

impl<S> tracing_subscriber::Layer<S> for Capture
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        _id: &tracing::span::Id,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut visitor = FieldVisitor(Vec::new());
        attrs.record(&mut visitor);
        self.spans.lock().unwrap().push(CapturedSpan {
            name: attrs.metadata().name().to_string(),
            fields: visitor.0.into_iter().collect(),
        });
    }

    fn on_event(&self, event: &tracing::Event<'_>, ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = FieldVisitor(Vec::new());
        event.record(&mut visitor);
        let mut fields: HashMap<String, String> = visitor.0.into_iter().collect();
        let message = fields.remove("message").unwrap_or_default();
        let parent_span = ctx
            .event_span(event)
            .map(|span_ref| span_ref.name().to_string());
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            message,
            fields,
            parent_span,
        });
    }
}

fn with_capture<F>(f: F) -> CaptureHandle
where
    F: FnOnce(),
{
    let spans = Arc::new(Mutex::new(Vec::new()));
    let events = Arc::new(Mutex::new(Vec::new()));
    let layer = Capture {
        spans: spans.clone(),
        events: events.clone(),
    };
    let subscriber = tracing_subscriber::registry().with(layer);
    tracing::subscriber::with_default(subscriber, f);
    CaptureHandle { spans, events }
}

fn loaded(response: FetchResponse) -> Msg {
    Msg::Loaded {
        run: "run_a".into(),
        response,
    }
}

fn session() -> DebuggerState {
    let mut state = DebuggerState::new(ViewerConfig::default().with_executions(10, 4)).unwrap();
    state
        .update_at(Msg::ActiveRunChanged(Some("run_a".into())), 0)
        .unwrap();
    state
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn every_update_opens_a_span() {
    let handle = with_capture(|| {
        let mut state = session();
        state
            .update_at(loaded(FetchResponse::NumExecutions { total: 30 }), 1)
            .unwrap();
    });
    let update_spans: Vec<_> = handle
        .spans()
        .into_iter()
        .filter(|s| s.name == "dbgscope.update")
        .collect();
    assert_eq!(update_spans.len(), 2);
    assert_eq!(
        update_spans[0].fields.get("msg").map(String::as_str),
        Some("ActiveRunChanged")
    );
    assert_eq!(
        update_spans[1].fields.get("msg").map(String::as_str),
        Some("Loaded")
    );
}

#[test]
fn total_update_logs_paging_fields() {
    let handle = with_capture(|| {
        let mut state = session();
        state
            .update_at(loaded(FetchResponse::NumExecutions { total: 30 }), 1)
            .unwrap();
    });
    let total = handle
        .events_at(tracing::Level::DEBUG)
        .into_iter()
        .find(|e| e.message == "total updated")
        .expect("total update event");
    assert_eq!(total.fields.get("num_items").map(String::as_str), Some("30"));
    assert_eq!(
        total.fields.get("sequence").map(String::as_str),
        Some("executions")
    );
    assert_eq!(total.parent_span.as_deref(), Some("dbgscope.update"));
}

#[test]
fn shrinking_total_warns() {
    let handle = with_capture(|| {
        let mut state = session();
        state
            .update_at(loaded(FetchResponse::NumExecutions { total: 30 }), 1)
            .unwrap();
        assert!(
            state
                .update_at(loaded(FetchResponse::NumExecutions { total: 20 }), 2)
                .is_err()
        );
    });
    let warnings = handle.events_at(tracing::Level::WARN);
    assert!(!warnings.is_empty(), "expected a warning, got {:?}", handle.events());
}

#[test]
fn stale_run_response_is_only_logged() {
    let handle = with_capture(|| {
        let mut state = session();
        let cmd = state
            .update_at(
                Msg::Loaded {
                    run: "run_b".into(),
                    response: FetchResponse::NumExecutions { total: 5 },
                },
                1,
            )
            .unwrap();
        assert!(cmd.is_none());
    });
    assert!(
        handle
            .events_at(tracing::Level::DEBUG)
            .iter()
            .any(|e| e.message == "dropping response for inactive run")
    );
}

#[test]
fn failed_fetch_warns_with_request_name() {
    let handle = with_capture(|| {
        let mut state = session();
        state
            .update_at(
                Msg::FetchFailed {
                    run: "run_a".into(),
                    request: FetchRequest::SourceFileList,
                },
                1,
            )
            .unwrap();
        assert!(state.source_code().list_load().state == DataLoadState::Failed);
    });
    let warning = handle
        .events_at(tracing::Level::WARN)
        .into_iter()
        .find(|e| e.message == "fetch failed")
        .expect("fetch failure warning");
    assert_eq!(
        warning.fields.get("request").map(String::as_str),
        Some("SourceFileList")
    );
}
