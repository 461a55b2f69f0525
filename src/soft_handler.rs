//! The standard soft-error handler: classify, compose, emit.
//!
//! [`SoftErrorHandler`] understands the four soft severities. For each event
//! it is offered it:
//!
//! 1. declines if the reporting mask excludes the event's severity,
//! 2. declines if the severity has no label (see [`Severity::label`]),
//! 3. composes `"<Owner> <LABEL>: <message>"`, emphasizing the
//!    `"<Owner> <LABEL>:"` segment according to its [`Markup`],
//! 4. for [`Severity::Error`], emits the message and calls its
//!    [`FatalSink`], which ends the process,
//! 5. otherwise emits the message and reports the event as handled.
//!
//! [`Severity::label`]: crate::severity::Severity::label
//! [`Severity::Error`]: crate::severity::Severity::Error
//!
//! ```
//! use pluginbase::{
//!     event::ErrorEvent,
//!     handlers::{Disposition, ErrorHandler},
//!     severity::{ReportingMask, Severity},
//!     sinks::Recorder,
//!     soft_handler::{Markup, SoftErrorHandler},
//! };
//!
//! let recorder = Recorder::new();
//! let handler = SoftErrorHandler::new()
//!     .with_markup(Markup::Plain)
//!     .with_output(recorder.clone())
//!     .with_fatal(recorder.clone());
//!
//! let event = ErrorEvent::new("Demo", Severity::Notice, "hello");
//! assert_eq!(handler.handle(&event, ReportingMask::SOFT), Disposition::Handled);
//! assert_eq!(recorder.lines(), ["Demo NOTICE: hello"]);
//! ```

use core::fmt;

use triomphe::Arc;
use unsize::CoerceUnsize;

use crate::{
    event::ErrorEvent,
    handlers::{Disposition, ErrorHandler},
    severity::ReportingMask,
    sinks::{FatalSink, OutputSink},
};

/// How the `"<Owner> <LABEL>:"` segment of a composed message is emphasized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Markup {
    /// No emphasis.
    #[default]
    Plain,
    /// Wrapped in `<b>` and `</b>`, for rich-text consumers.
    Html,
    /// Wrapped in ANSI bold escapes, for terminals.
    Ansi,
}

impl Markup {
    /// The markup selected by the environment.
    ///
    /// # Environment Variables
    ///
    /// - `PLUGINBASE_MARKUP` - one of `plain`, `html` or `ansi` (case
    ///   insensitive). Unset or unknown values select [`Markup::Plain`].
    ///
    /// The variable is read once per process.
    #[cfg(feature = "std")]
    #[must_use]
    pub fn from_env() -> Self {
        static PLUGINBASE_MARKUP: std::sync::OnceLock<Markup> = std::sync::OnceLock::new();

        *PLUGINBASE_MARKUP.get_or_init(|| {
            let var = std::env::var_os("PLUGINBASE_MARKUP")
                .map(|var| var.to_string_lossy().into_owned());
            Self::from_var(var.as_deref())
        })
    }

    #[cfg(feature = "std")]
    fn from_var(var: Option<&str>) -> Self {
        var.and_then(Self::parse).unwrap_or_default()
    }

    /// Parses a markup name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.eq_ignore_ascii_case("plain") {
            Some(Self::Plain)
        } else if name.eq_ignore_ascii_case("html") {
            Some(Self::Html)
        } else if name.eq_ignore_ascii_case("ansi") {
            Some(Self::Ansi)
        } else {
            None
        }
    }

    const fn delimiters(self) -> (&'static str, &'static str) {
        match self {
            Self::Plain => ("", ""),
            Self::Html => ("<b>", "</b>"),
            Self::Ansi => ("\x1b[1m", "\x1b[0m"),
        }
    }
}

/// A composed soft-error message, formatted lazily.
#[derive(Debug, Clone, Copy)]
pub struct ComposedMessage<'a> {
    owner_label: &'a str,
    label: &'static str,
    message: &'a str,
    markup: Markup,
}

impl fmt::Display for ComposedMessage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (open, close) = self.markup.delimiters();
        write!(
            f,
            "{open}{} {}:{close} {}",
            self.owner_label, self.label, self.message
        )
    }
}

/// Composes the message for `event`, or returns `None` if its severity has
/// no label.
///
/// ```
/// use pluginbase::{event::ErrorEvent, severity::Severity, soft_handler::{Markup, compose}};
///
/// let event = ErrorEvent::new("Demo", Severity::Warning, "low disk");
/// let message = compose(&event, Markup::Html).unwrap();
/// assert_eq!(message.to_string(), "<b>Demo WARNING:</b> low disk");
/// ```
#[must_use]
pub fn compose(event: &ErrorEvent, markup: Markup) -> Option<ComposedMessage<'_>> {
    Some(ComposedMessage {
        owner_label: &event.owner_label,
        label: event.severity.label()?,
        message: &event.message,
        markup,
    })
}

/// Handler that turns soft errors into visible messages.
///
/// With the `std` feature, [`SoftErrorHandler::new`] writes to standard
/// output, exits with status 1 on [`Severity::Error`](crate::severity::Severity::Error) and takes its markup
/// from [`Markup::from_env`]. Without it, the output and fatal sinks must be
/// supplied; until they are, messages are dropped and fatal events are only
/// reported as handled.
#[derive(Clone)]
pub struct SoftErrorHandler {
    output: Arc<dyn OutputSink>,
    fatal: Arc<dyn FatalSink>,
    markup: Markup,
}

impl Default for SoftErrorHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftErrorHandler {
    /// Creates a handler with the default sinks and markup.
    #[must_use]
    pub fn new() -> Self {
        #[cfg(feature = "std")]
        let handler = Self {
            output: erase_output(crate::sinks::StdoutSink),
            fatal: erase_fatal(crate::sinks::ExitProcess::default()),
            markup: Markup::from_env(),
        };

        #[cfg(not(feature = "std"))]
        let handler = Self {
            output: erase_output(Discard),
            fatal: erase_fatal(Discard),
            markup: Markup::Plain,
        };

        handler
    }

    /// Replaces the output sink.
    #[must_use]
    pub fn with_output<S: OutputSink>(mut self, sink: S) -> Self {
        self.output = erase_output(sink);
        self
    }

    /// Replaces the fatal sink.
    #[must_use]
    pub fn with_fatal<S: FatalSink>(mut self, sink: S) -> Self {
        self.fatal = erase_fatal(sink);
        self
    }

    /// Replaces the markup.
    #[must_use]
    pub fn with_markup(mut self, markup: Markup) -> Self {
        self.markup = markup;
        self
    }

    /// The markup in use.
    #[must_use]
    pub fn markup(&self) -> Markup {
        self.markup
    }
}

impl ErrorHandler for SoftErrorHandler {
    fn handle(&self, event: &ErrorEvent, reporting: ReportingMask) -> Disposition {
        if !reporting.includes(event.severity) {
            return Disposition::Unhandled;
        }

        let Some(composed) = compose(event, self.markup) else {
            return Disposition::Unhandled;
        };
        let message = alloc::format!("{composed}");

        self.output.emit(event, &message);
        if event.severity.is_fatal() {
            self.fatal.terminate(event, &message);
        }

        Disposition::Handled
    }
}

impl fmt::Debug for SoftErrorHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoftErrorHandler")
            .field("markup", &self.markup)
            .finish_non_exhaustive()
    }
}

fn erase_output<S: OutputSink>(sink: S) -> Arc<dyn OutputSink> {
    Arc::new(sink).unsize(unsize::Coercion!(to dyn OutputSink))
}

fn erase_fatal<S: FatalSink>(sink: S) -> Arc<dyn FatalSink> {
    Arc::new(sink).unsize(unsize::Coercion!(to dyn FatalSink))
}

#[cfg(not(feature = "std"))]
struct Discard;

#[cfg(not(feature = "std"))]
impl OutputSink for Discard {
    fn emit(&self, _event: &ErrorEvent, _message: &str) {}
}

#[cfg(not(feature = "std"))]
impl FatalSink for Discard {
    fn terminate(&self, _event: &ErrorEvent, _message: &str) {}
}
