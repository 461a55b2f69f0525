//! Error handlers and the identities that own them.
//!
//! An [`ErrorHandler`] is what an interception installs into the active
//! handler slot. Each activation is owned by an [`Identity`], which is how
//! the interception stack tells one owner's activation from another's.
//!
//! Most owners are plain types implementing [`Owner`]:
//!
//! ```
//! use pluginbase::{handlers::{Identity, Owner}, severity::ReportingMask};
//!
//! struct Demo;
//!
//! impl Owner for Demo {
//!     const NAME: &'static str = "Demo";
//!     const SCOPE: &'static str = "app.plugins.demo";
//! }
//!
//! let identity = Identity::of::<Demo>();
//! assert_eq!(identity.handler(), "error_handler");
//! assert_eq!(Demo::REPORTING, ReportingMask::SOFT);
//! ```

use alloc::borrow::Cow;
use core::fmt;

use triomphe::Arc;
use unsize::CoerceUnsize;

use crate::{event::ErrorEvent, severity::ReportingMask};

/// Outcome of offering an event to a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Disposition {
    /// The handler dealt with the event.
    Handled,
    /// The handler declined; the event goes to the next handler in line.
    Unhandled,
}

impl Disposition {
    /// Returns `true` for [`Disposition::Handled`].
    #[inline]
    #[must_use]
    pub const fn is_handled(self) -> bool {
        matches!(self, Self::Handled)
    }
}

/// A handler for triggered soft errors.
///
/// `reporting` is the process-wide reporting mask at the time the event was
/// triggered. Handlers are expected to decline events whose bit it excludes.
///
/// Closures with the matching signature are handlers too:
///
/// ```
/// use pluginbase::{
///     event::ErrorEvent,
///     handlers::{Disposition, ErrorHandler},
///     severity::{ReportingMask, Severity},
/// };
///
/// let handler = |event: &ErrorEvent, reporting: ReportingMask| {
///     if reporting.includes(event.severity) {
///         Disposition::Handled
///     } else {
///         Disposition::Unhandled
///     }
/// };
///
/// let event = ErrorEvent::new("Demo", Severity::Notice, "hello");
/// assert_eq!(handler.handle(&event, ReportingMask::SOFT), Disposition::Handled);
/// ```
pub trait ErrorHandler: 'static + Send + Sync {
    /// Offers `event` to the handler.
    fn handle(&self, event: &ErrorEvent, reporting: ReportingMask) -> Disposition;
}

impl<F> ErrorHandler for F
where
    F: 'static + Send + Sync + Fn(&ErrorEvent, ReportingMask) -> Disposition,
{
    fn handle(&self, event: &ErrorEvent, reporting: ReportingMask) -> Disposition {
        (self)(event, reporting)
    }
}

pub(crate) type HandlerRef = Arc<dyn ErrorHandler>;

pub(crate) fn handler_to_untyped<H>(handler: H) -> HandlerRef
where
    H: ErrorHandler,
{
    Arc::new(handler).unsize(unsize::Coercion!(to dyn ErrorHandler))
}

/// Opaque token naming the logical owner of an activation.
///
/// Two identities are equal when both the owner and the handler name match,
/// so one owner can hold several independent activations by using different
/// handler names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    owner: Cow<'static, str>,
    handler: Cow<'static, str>,
}

impl Identity {
    /// Handler name used when none is given.
    pub const DEFAULT_HANDLER: &'static str = "error_handler";

    /// Creates an identity from an owner name and a handler name.
    pub fn new(
        owner: impl Into<Cow<'static, str>>,
        handler: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            owner: owner.into(),
            handler: handler.into(),
        }
    }

    /// The identity of owner type `O` with the default handler name.
    #[must_use]
    pub fn of<O: ?Sized + 'static>() -> Self {
        Self::with_handler::<O>(Self::DEFAULT_HANDLER)
    }

    /// The identity of owner type `O` with a custom handler name.
    pub fn with_handler<O: ?Sized + 'static>(handler: impl Into<Cow<'static, str>>) -> Self {
        Self::new(core::any::type_name::<O>(), handler)
    }

    /// The owner part.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// The handler part.
    #[must_use]
    pub fn handler(&self) -> &str {
        &self.handler
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.owner, self.handler)
    }
}

/// A component that raises and intercepts soft errors and takes part in
/// cascading resolution.
pub trait Owner: 'static {
    /// Label used when composing messages.
    const NAME: &'static str;

    /// The resolver scope this owner's overrides live in.
    const SCOPE: &'static str;

    /// Severities this owner intercepts when activated.
    const REPORTING: ReportingMask = ReportingMask::SOFT;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::severity::Severity;

    struct Demo;

    #[test]
    fn test_identity_of_owner_type() {
        let identity = Identity::of::<Demo>();
        assert!(identity.owner().ends_with("Demo"));
        assert_eq!(identity.handler(), Identity::DEFAULT_HANDLER);
        assert_eq!(identity, Identity::of::<Demo>());
        assert_ne!(identity, Identity::with_handler::<Demo>("other_handler"));
    }

    #[test]
    fn test_closure_is_handler() {
        let handler = handler_to_untyped(|_: &ErrorEvent, _: ReportingMask| Disposition::Handled);
        let event = ErrorEvent::new("Demo", Severity::Notice, "hello");
        assert!(handler.handle(&event, ReportingMask::SOFT).is_handled());
    }

    #[test]
    fn test_identity_send_sync() {
        static_assertions::assert_impl_all!(Identity: Send, Sync, Clone);
        static_assertions::assert_impl_all!(HandlerRef: Send, Sync, Clone);
    }
}
