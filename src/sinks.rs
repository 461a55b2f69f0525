//! Where composed soft-error messages go.
//!
//! A [`SoftErrorHandler`](crate::soft_handler::SoftErrorHandler) never writes
//! to the terminal or ends the process by itself. It emits every message to
//! an [`OutputSink`] and, for fatal severities, then calls a [`FatalSink`].
//! The defaults with the `std` feature are [`StdoutSink`] and
//! [`ExitProcess`]; [`Recorder`] stands in for both when the messages should
//! be inspected instead.

use alloc::{string::String, vec::Vec};

use triomphe::Arc;

use crate::{event::ErrorEvent, lock::ExclusiveLock, severity::Severity};

/// Receives composed messages.
pub trait OutputSink: 'static + Send + Sync {
    /// Emits the composed `message` for `event`.
    fn emit(&self, event: &ErrorEvent, message: &str);
}

/// Ends the process after a fatal soft error.
///
/// Production implementations do not return. Substitutes used in tests may
/// return, in which case the handler reports the event as handled.
pub trait FatalSink: 'static + Send + Sync {
    /// Called after `message` has been emitted for the fatal `event`.
    fn terminate(&self, event: &ErrorEvent, message: &str);
}

/// Writes each message as one line on standard output.
#[cfg(feature = "std")]
#[derive(Copy, Clone, Debug, Default)]
pub struct StdoutSink;

#[cfg(feature = "std")]
impl OutputSink for StdoutSink {
    fn emit(&self, event: &ErrorEvent, message: &str) {
        write_line(std::io::stdout().lock(), event, message);
    }
}

#[cfg(feature = "std")]
fn write_line(mut out: impl std::io::Write, event: &ErrorEvent, message: &str) {
    if let Err(error) = writeln!(out, "{message}") {
        tracing::debug!(
            owner = %event.owner_label,
            %error,
            "failed to write soft error"
        );
    }
}

/// Exits the process with a fixed status code.
#[cfg(feature = "std")]
#[derive(Copy, Clone, Debug)]
pub struct ExitProcess {
    /// Exit status passed to [`std::process::exit`].
    pub code: i32,
}

#[cfg(feature = "std")]
impl Default for ExitProcess {
    fn default() -> Self {
        Self { code: 1 }
    }
}

#[cfg(feature = "std")]
impl FatalSink for ExitProcess {
    fn terminate(&self, event: &ErrorEvent, _message: &str) {
        use std::io::Write;

        tracing::debug!(
            owner = %event.owner_label,
            code = self.code,
            "terminating after fatal soft error"
        );
        let _ = std::io::stdout().flush();
        std::process::exit(self.code);
    }
}

/// One message captured by a [`Recorder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Severity of the event the message was composed for.
    pub severity: Severity,
    /// The composed message.
    pub message: String,
    /// Whether this record comes from [`FatalSink::terminate`].
    pub fatal: bool,
}

/// Records messages in memory instead of printing them or exiting.
///
/// Clones share the same records, so one clone can be handed to a handler
/// while another is kept for inspection.
///
/// ```
/// use pluginbase::{
///     event::ErrorEvent,
///     severity::Severity,
///     sinks::{FatalSink, OutputSink, Recorder},
/// };
///
/// let recorder = Recorder::new();
/// let event = ErrorEvent::new("Demo", Severity::Error, "hello");
/// recorder.emit(&event, "Demo ERROR: hello");
/// recorder.terminate(&event, "Demo ERROR: hello");
///
/// assert_eq!(recorder.lines(), ["Demo ERROR: hello"]);
/// assert!(recorder.terminated());
/// ```
#[derive(Clone, Default)]
pub struct Recorder {
    records: Arc<ExclusiveLock<Vec<Record>>>,
}

impl Recorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All records so far, in order.
    #[must_use]
    pub fn records(&self) -> Vec<Record> {
        self.records.lock().clone()
    }

    /// The emitted (non-fatal-sink) messages, in order.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .filter(|record| !record.fatal)
            .map(|record| record.message.clone())
            .collect()
    }

    /// Whether [`FatalSink::terminate`] has been called.
    #[must_use]
    pub fn terminated(&self) -> bool {
        self.records.lock().iter().any(|record| record.fatal)
    }

    /// Removes and returns all records.
    pub fn take(&self) -> Vec<Record> {
        core::mem::take(&mut *self.records.lock())
    }

    fn push(&self, event: &ErrorEvent, message: &str, fatal: bool) {
        self.records.lock().push(Record {
            severity: event.severity,
            message: String::from(message),
            fatal,
        });
    }
}

impl core::fmt::Debug for Recorder {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Recorder")
            .field("records", &*self.records.lock())
            .finish()
    }
}

impl OutputSink for Recorder {
    fn emit(&self, event: &ErrorEvent, message: &str) {
        self.push(event, message, false);
    }
}

impl FatalSink for Recorder {
    fn terminate(&self, event: &ErrorEvent, message: &str) {
        self.push(event, message, true);
    }
}

impl<S> OutputSink for Arc<S>
where
    S: OutputSink + ?Sized,
{
    fn emit(&self, event: &ErrorEvent, message: &str) {
        (**self).emit(event, message);
    }
}

impl<S> FatalSink for Arc<S>
where
    S: FatalSink + ?Sized,
{
    fn terminate(&self, event: &ErrorEvent, message: &str) {
        (**self).terminate(event, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_clones_share_records() {
        let recorder = Recorder::new();
        let handle = recorder.clone();
        let event = ErrorEvent::new("Demo", Severity::Notice, "hello");

        handle.emit(&event, "Demo NOTICE: hello");

        assert_eq!(recorder.lines(), ["Demo NOTICE: hello"]);
        assert!(!recorder.terminated());
        assert_eq!(recorder.take().len(), 1);
        assert!(handle.records().is_empty());
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_write_line_survives_failing_writer() {
        use std::io;

        struct Broken;

        impl io::Write for Broken {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                Err(io::Error::from(io::ErrorKind::BrokenPipe))
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let event = ErrorEvent::new("Demo", Severity::Notice, "hello");
        write_line(Broken, &event, "Demo NOTICE: hello");

        let mut buffer = Vec::new();
        write_line(&mut buffer, &event, "Demo NOTICE: hello");
        assert_eq!(buffer, b"Demo NOTICE: hello\n");
    }

    #[test]
    fn test_sinks_send_sync() {
        static_assertions::assert_impl_all!(Recorder: Send, Sync, Clone);
    }
}
