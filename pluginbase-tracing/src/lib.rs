#![deny(
    missing_docs,
    unsafe_code,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]

//! Routes pluginbase soft errors into `tracing`.
//!
//! # How It Works
//!
//! [`TracingSink`] is an [`OutputSink`]: give it to a
//! [`SoftErrorHandler`](pluginbase::soft_handler::SoftErrorHandler) and every
//! composed message becomes a `tracing` event, with its level taken from the
//! soft error's severity. [`TracingFallback`] is an [`ErrorHandler`] meant for
//! [`InterceptionStack::set_fallback`]: events no active interception
//! handled are logged instead of dropped.
//!
//! # Quick Start
//!
//! ```
//! use pluginbase::{
//!     event::ErrorEvent,
//!     handlers::Identity,
//!     interception::InterceptionStack,
//!     severity::{ReportingMask, Severity},
//!     soft_handler::SoftErrorHandler,
//! };
//! use pluginbase_tracing::{TracingFallback, TracingSink};
//!
//! let stack = InterceptionStack::new();
//! stack.set_fallback(TracingFallback);
//!
//! let handler = SoftErrorHandler::new().with_output(TracingSink::new());
//! let _guard = stack.scoped(Identity::new("Demo", "error_handler"), handler, ReportingMask::SOFT);
//! stack.trigger(&ErrorEvent::new("Demo", Severity::Warning, "low on widgets"));
//! ```
//!
//! # Fields
//!
//! Every event carries `owner`, `file`, `line` and `code` fields. The event
//! message is the raw soft-error message unless `composed` is set.
//!
//! # Environment Variables
//!
//! - `PLUGINBASE_TRACING` - Comma-separated options:
//!   - `composed` - Log the composed line (`"Demo WARNING: ..."`) instead of
//!     the raw message
//!
//! [`InterceptionStack::set_fallback`]: pluginbase::interception::InterceptionStack::set_fallback

use std::sync::OnceLock;

use pluginbase::{
    event::ErrorEvent,
    handlers::{Disposition, ErrorHandler},
    severity::{ReportingMask, Severity},
    sinks::OutputSink,
};
use tracing::Level;

/// The `tracing` level soft errors of `severity` are logged at.
///
/// ```
/// use pluginbase::severity::Severity;
/// use tracing::Level;
///
/// assert_eq!(pluginbase_tracing::level_for(Severity::Deprecated), Level::WARN);
/// ```
#[must_use]
pub const fn level_for(severity: Severity) -> Level {
    match severity {
        Severity::Error => Level::ERROR,
        Severity::Warning | Severity::Deprecated => Level::WARN,
        Severity::Notice => Level::INFO,
        Severity::Unrecognized(_) => Level::DEBUG,
    }
}

// Keep in sync with `level_for`.
macro_rules! log_event {
    ($event:expr, $text:expr) => {{
        let event: &ErrorEvent = $event;
        let text: &str = $text;
        match event.severity {
            Severity::Error => log_event!(@at error, event, text),
            Severity::Warning | Severity::Deprecated => log_event!(@at warn, event, text),
            Severity::Notice => log_event!(@at info, event, text),
            Severity::Unrecognized(_) => log_event!(@at debug, event, text),
        }
    }};
    (@at $level:ident, $event:expr, $text:expr) => {
        tracing::$level!(
            target: "pluginbase",
            owner = %$event.owner_label,
            file = %$event.location.file,
            line = $event.location.line,
            code = $event.severity.code(),
            "{}",
            $text
        )
    };
}

#[derive(Debug)]
struct PluginbaseTracingEnvOptions {
    composed: bool,
}

impl PluginbaseTracingEnvOptions {
    fn get() -> &'static Self {
        static PLUGINBASE_TRACING_FLAGS: OnceLock<PluginbaseTracingEnvOptions> = OnceLock::new();

        PLUGINBASE_TRACING_FLAGS.get_or_init(|| match std::env::var_os("PLUGINBASE_TRACING") {
            Some(var) => Self::parse(&var.to_string_lossy()),
            None => Self::parse(""),
        })
    }

    fn parse(var: &str) -> Self {
        let mut composed = false;

        for v in var.split(',') {
            if v.trim().eq_ignore_ascii_case("composed") {
                composed = true;
            }
        }

        PluginbaseTracingEnvOptions { composed }
    }
}

/// Output sink that logs each soft error as a `tracing` event.
#[derive(Copy, Clone, Debug)]
pub struct TracingSink {
    /// Whether to log the composed line instead of the raw message.
    pub composed: bool,
}

impl TracingSink {
    /// Creates a sink configured by `PLUGINBASE_TRACING`.
    ///
    /// # Environment Variables
    ///
    /// - `PLUGINBASE_TRACING` - Comma-separated options:
    ///   - `composed` - Log the composed line instead of the raw message
    #[must_use]
    pub fn new() -> Self {
        Self {
            composed: PluginbaseTracingEnvOptions::get().composed,
        }
    }
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputSink for TracingSink {
    fn emit(&self, event: &ErrorEvent, message: &str) {
        let text = if self.composed {
            message
        } else {
            &*event.message
        };
        log_event!(event, text);
    }
}

/// Fallback handler that logs events nobody else handled.
///
/// Events whose severity the reporting mask excludes are declined. Every
/// other event, including unrecognized severities, is logged in the
/// `"<owner>: [<code>]: <message>"` form and reported as handled.
#[derive(Copy, Clone, Debug, Default)]
pub struct TracingFallback;

impl ErrorHandler for TracingFallback {
    fn handle(&self, event: &ErrorEvent, reporting: ReportingMask) -> Disposition {
        if !reporting.includes(event.severity) {
            return Disposition::Unhandled;
        }

        let line = event.to_string();
        log_event!(event, &line);
        Disposition::Handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_options_parse() {
        assert!(!PluginbaseTracingEnvOptions::parse("").composed);
        assert!(PluginbaseTracingEnvOptions::parse("composed").composed);
        assert!(PluginbaseTracingEnvOptions::parse("other, Composed").composed);
        assert!(!PluginbaseTracingEnvOptions::parse("compose,raw").composed);
    }
}
