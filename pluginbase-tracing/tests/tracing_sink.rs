use std::{
    collections::BTreeMap,
    fmt,
    sync::{Arc, Mutex},
};

use pluginbase::{
    event::ErrorEvent,
    handlers::{Disposition, ErrorHandler, Identity},
    interception::InterceptionStack,
    severity::{ReportingMask, Severity},
    sinks::Recorder,
    soft_handler::{Markup, SoftErrorHandler},
};
use pluginbase_tracing::{TracingFallback, TracingSink};
use tracing::{
    Event, Level, Subscriber,
    field::{Field, Visit},
};
use tracing_subscriber::{
    Layer,
    layer::{Context, SubscriberExt},
};

#[derive(Debug, Clone)]
struct Captured {
    level: Level,
    target: String,
    fields: BTreeMap<String, String>,
}

#[derive(Clone, Default)]
struct RecordingLayer {
    events: Arc<Mutex<Vec<Captured>>>,
}

impl RecordingLayer {
    fn events(&self) -> Vec<Captured> {
        self.events.lock().unwrap().clone()
    }
}

#[derive(Default)]
struct FieldVisitor(BTreeMap<String, String>);

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_owned(), value.to_owned());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_owned(), format!("{value:?}"));
    }
}

impl<S: Subscriber> Layer<S> for RecordingLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        self.events.lock().unwrap().push(Captured {
            level: *event.metadata().level(),
            target: event.metadata().target().to_owned(),
            fields: visitor.0,
        });
    }
}

fn pluginbase_events(layer: &RecordingLayer) -> Vec<Captured> {
    layer
        .events()
        .into_iter()
        .filter(|event| event.target == "pluginbase")
        .collect()
}

#[test]
fn test_sink_maps_severity_to_level() {
    let layer = RecordingLayer::default();
    let subscriber = tracing_subscriber::registry().with(layer.clone());

    tracing::subscriber::with_default(subscriber, || {
        let handler = SoftErrorHandler::new()
            .with_markup(Markup::Plain)
            .with_output(TracingSink { composed: false })
            .with_fatal(Recorder::new());

        for severity in [
            Severity::Notice,
            Severity::Warning,
            Severity::Deprecated,
            Severity::Error,
        ] {
            let event = ErrorEvent::new("Demo", severity, "hello").at("plugin.rs", 7);
            assert_eq!(
                handler.handle(&event, ReportingMask::ALL_CODES),
                Disposition::Handled
            );
        }
    });

    let events = pluginbase_events(&layer);
    let levels: Vec<_> = events.iter().map(|event| event.level).collect();
    assert_eq!(levels, [Level::INFO, Level::WARN, Level::WARN, Level::ERROR]);

    let notice = &events[0].fields;
    assert_eq!(notice["message"], "hello");
    assert_eq!(notice["owner"], "Demo");
    assert_eq!(notice["file"], "plugin.rs");
    assert_eq!(notice["line"], "7");
    assert_eq!(notice["code"], "1024");
}

#[test]
fn test_composed_sink_logs_composed_line() {
    let layer = RecordingLayer::default();
    let subscriber = tracing_subscriber::registry().with(layer.clone());

    tracing::subscriber::with_default(subscriber, || {
        let handler = SoftErrorHandler::new()
            .with_markup(Markup::Html)
            .with_output(TracingSink { composed: true });
        let event = ErrorEvent::new("Demo", Severity::Warning, "low on widgets");
        handler.handle(&event, ReportingMask::SOFT);
    });

    let events = pluginbase_events(&layer);
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0].fields["message"],
        "<b>Demo WARNING:</b> low on widgets"
    );
}

#[test]
fn test_fallback_logs_unhandled_events() {
    let layer = RecordingLayer::default();
    let subscriber = tracing_subscriber::registry().with(layer.clone());

    let stack = InterceptionStack::new();
    stack.set_fallback(TracingFallback);
    let declining = |_: &ErrorEvent, _: ReportingMask| Disposition::Unhandled;
    let _guard = stack.scoped(
        Identity::new("Demo", "error_handler"),
        declining,
        ReportingMask::SOFT,
    );

    tracing::subscriber::with_default(subscriber, || {
        let unknown = ErrorEvent::new("Demo", Severity::from_code(8), "odd");
        assert_eq!(stack.trigger(&unknown), Disposition::Handled);

        stack.set_reporting_mask(ReportingMask::ERROR);
        let notice = ErrorEvent::new("Demo", Severity::Notice, "quiet");
        assert_eq!(stack.trigger(&notice), Disposition::Unhandled);
    });

    let events = pluginbase_events(&layer);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].level, Level::DEBUG);
    assert_eq!(events[0].fields["message"], "Demo: [8]: odd");
    assert_eq!(events[0].fields["code"], "8");
}
