//! The unit of classification: one triggered soft error.

use alloc::borrow::Cow;
use core::{fmt, panic::Location};

use crate::{
    handlers::Owner,
    severity::{FaultKind, Severity},
};

/// Where a soft error was raised.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    /// The source file path.
    pub file: Cow<'static, str>,
    /// The line number.
    pub line: u32,
}

impl SourceLocation {
    /// The location of the caller.
    #[track_caller]
    #[must_use]
    pub fn caller() -> Self {
        let location = Location::caller();
        Self {
            file: Cow::Borrowed(location.file()),
            line: location.line(),
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// A triggered soft error.
///
/// Events are created where the problem is noticed and handed to
/// [`InterceptionStack::trigger`](crate::interception::InterceptionStack::trigger).
///
/// ```
/// use pluginbase::{event::ErrorEvent, severity::Severity};
///
/// let event = ErrorEvent::new("Demo", Severity::Notice, "hello");
/// assert_eq!(event.owner_label, "Demo");
/// assert_eq!(event.to_string(), "Demo: [1024]: hello");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEvent {
    /// How bad it is.
    pub severity: Severity,
    /// What happened.
    pub message: Cow<'static, str>,
    /// Where it was raised.
    pub location: SourceLocation,
    /// Name of the component raising it.
    pub owner_label: Cow<'static, str>,
}

impl ErrorEvent {
    /// Creates an event located at the caller.
    #[track_caller]
    pub fn new(
        owner_label: impl Into<Cow<'static, str>>,
        severity: Severity,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            severity,
            message: message.into(),
            location: SourceLocation::caller(),
            owner_label: owner_label.into(),
        }
    }

    /// Creates an event labelled with the name of owner `O`.
    #[track_caller]
    pub fn from_owner<O: Owner>(severity: Severity, message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(O::NAME, severity, message)
    }

    /// Creates an event that reroutes a hard fault through the soft channel.
    #[track_caller]
    pub fn from_fault(
        owner_label: impl Into<Cow<'static, str>>,
        fault: FaultKind,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::new(owner_label, fault.into(), message)
    }

    /// Overrides the captured location.
    #[must_use]
    pub fn at(mut self, file: impl Into<Cow<'static, str>>, line: u32) -> Self {
        self.location = SourceLocation {
            file: file.into(),
            line,
        };
        self
    }
}

impl fmt::Display for ErrorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: [{}]: {}",
            self.owner_label,
            self.severity.code(),
            self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;

    #[test]
    fn test_event_captures_caller_location() {
        let line = line!() + 1;
        let event = ErrorEvent::new("Demo", Severity::Warning, "careful");
        assert_eq!(event.location.line, line);
        assert!(event.location.file.ends_with("event.rs"));
    }

    #[test]
    fn test_event_location_override() {
        let event = ErrorEvent::new("Demo", Severity::Warning, "careful").at("plugin.rs", 12);
        assert_eq!(event.location.to_string(), "plugin.rs:12");
    }

    #[test]
    fn test_fault_event_is_softened() {
        let event = ErrorEvent::from_fault("Demo", FaultKind::Other(8192), "strict");
        assert_eq!(event.severity, Severity::Notice);
    }
}
