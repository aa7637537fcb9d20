#![forbid(unsafe_code)]

//! Tracing contract of the render cycle: every executed cycle runs inside a
//! `chorecard.render_cycle` span carrying `forced` and `outcome`, and the
//! work done during the cycle is logged beneath it.
//!
//! Run:
//!   cargo test -p chorecard-runtime --test tracing_spans

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chorecard_core::{Dispatch, RenderFingerprint};
use chorecard_runtime::{Cmd, CardRuntime, RenderContext, RenderError, RuntimeConfig, Widget};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;

// ============================================================================
// Capture layer
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
    parent_span_name: Option<String>,
}

#[derive(Default)]
struct Captured {
    spans: Vec<CapturedSpan>,
    events: Vec<CapturedEvent>,
    span_index: HashMap<u64, usize>,
}

#[derive(Clone, Default)]
struct SpanCapture(Arc<Mutex<Captured>>);

impl SpanCapture {
    fn spans(&self, name: &str) -> Vec<CapturedSpan> {
        let captured = self.0.lock().unwrap();
        captured
            .spans
            .iter()
            .filter(|s| s.name == name)
            .cloned()
            .collect()
    }

    fn events(&self) -> Vec<CapturedEvent> {
        self.0.lock().unwrap().events.clone()
    }
}

struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

impl<S> tracing_subscriber::Layer<S> for SpanCapture
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        id: &tracing::span::Id,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut visitor = FieldVisitor(Vec::new());
        attrs.record(&mut visitor);
        let mut fields: HashMap<String, String> = visitor.0.into_iter().collect();
        for field in attrs.metadata().fields() {
            fields.entry(field.name().to_string()).or_default();
        }
        let mut captured = self.0.lock().unwrap();
        let index = captured.spans.len();
        captured.spans.push(CapturedSpan {
            name: attrs.metadata().name().to_string(),
            fields,
        });
        captured.span_index.insert(id.into_u64(), index);
    }

    fn on_record(
        &self,
        id: &tracing::span::Id,
        values: &tracing::span::Record<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut visitor = FieldVisitor(Vec::new());
        values.record(&mut visitor);
        let mut guard = self.0.lock().unwrap();
        let captured = &mut *guard;
        if let Some(&index) = captured.span_index.get(&id.into_u64())
            && let Some(span) = captured.spans.get_mut(index)
        {
            span.fields.extend(visitor.0);
        }
    }

    fn on_event(&self, event: &tracing::Event<'_>, ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = FieldVisitor(Vec::new());
        event.record(&mut visitor);
        let message = visitor
            .0
            .iter()
            .find(|(k, _)| k == "message")
            .map(|(_, v)| v.clone())
            .unwrap_or_default();
        let parent_span_name = ctx
            .current_span()
            .id()
            .and_then(|id| ctx.span(id))
            .map(|span| span.name().to_string());
        self.0.lock().unwrap().events.push(CapturedEvent {
            level: *event.metadata().level(),
            message,
            parent_span_name,
        });
    }
}

fn with_captured<F: FnOnce()>(f: F) -> SpanCapture {
    let capture = SpanCapture::default();
    let subscriber = tracing_subscriber::registry()
        .with(tracing_subscriber::filter::LevelFilter::TRACE)
        .with(capture.clone());
    tracing::subscriber::with_default(subscriber, f);
    capture
}

// ============================================================================
// Test widget
// ============================================================================

struct Counter {
    value: u32,
    fail: bool,
}

impl Widget for Counter {
    fn render(&mut self) -> Result<String, RenderError> {
        if self.fail {
            return Err(RenderError::new("counter unavailable"));
        }
        Ok(format!(r#"<p data-id="counter">{}</p>"#, self.value))
    }

    fn fingerprint(&self, ctx: &RenderContext) -> Option<RenderFingerprint> {
        Some(ctx.fingerprint().observe(self.value.to_string()).finish())
    }

    fn dispatch(&mut self, _: &Dispatch) -> Cmd {
        Cmd::None
    }
}

const CYCLE: &str = "chorecard.render_cycle";

// ============================================================================
// Tests
// ============================================================================

#[test]
fn successful_cycle_records_forced_and_outcome() {
    let capture = with_captured(|| {
        let mut rt = CardRuntime::new(Counter { value: 1, fail: false }, RuntimeConfig::default());
        rt.step();
        rt.widget_mut().value = 2;
        rt.notify_state_changed();
        rt.advance_time(Duration::from_millis(16));
        rt.step();
    });

    let spans = capture.spans(CYCLE);
    assert_eq!(spans.len(), 2);
    assert_eq!(spans[0].fields["forced"], "true");
    assert_eq!(spans[0].fields["outcome"], "applied");
    assert_eq!(spans[1].fields["forced"], "false");
    assert_eq!(spans[1].fields["outcome"], "applied");
}

#[test]
fn diff_is_logged_inside_the_cycle() {
    let capture = with_captured(|| {
        let mut rt = CardRuntime::new(Counter { value: 1, fail: false }, RuntimeConfig::default());
        rt.step();
    });
    let diff_events: Vec<CapturedEvent> = capture
        .events()
        .into_iter()
        .filter(|e| e.message == "diff applied")
        .collect();
    assert_eq!(diff_events.len(), 1);
    assert_eq!(diff_events[0].parent_span_name.as_deref(), Some(CYCLE));
}

#[test]
fn skipped_cycle_opens_no_span() {
    let capture = with_captured(|| {
        let mut rt = CardRuntime::new(Counter { value: 1, fail: false }, RuntimeConfig::default());
        rt.step();
        rt.notify_state_changed();
        rt.advance_time(Duration::from_millis(16));
        rt.step();
    });
    assert_eq!(capture.spans(CYCLE).len(), 1);
    assert!(
        capture
            .events()
            .iter()
            .any(|e| e.message == "render skipped: fingerprint unchanged")
    );
}

#[test]
fn failure_is_an_error_event_inside_the_cycle() {
    let capture = with_captured(|| {
        let mut rt = CardRuntime::new(Counter { value: 1, fail: true }, RuntimeConfig::default());
        rt.step();
    });
    let spans = capture.spans(CYCLE);
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].fields["outcome"], "failed");

    let errors: Vec<CapturedEvent> = capture
        .events()
        .into_iter()
        .filter(|e| e.level == tracing::Level::ERROR)
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].parent_span_name.as_deref(), Some(CYCLE));
}
