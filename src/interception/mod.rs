//! Scoped interception of triggered soft errors.
//!
//! An [`InterceptionStack`] owns the active handler slot and the reporting
//! mask. Activating an interception installs a handler and remembers what it
//! displaced; deactivating it puts the displaced handler and reporting mask
//! back. Activations nest as a strict LIFO stack:
//!
//! - activating with the identity already on top is a no-op, so reentrant
//!   activation by the same owner never stacks twice,
//! - deactivating with an identity that is not on top is a no-op, so one
//!   owner cannot unwind another owner's activation.
//!
//! All operations on one stack are serialized by a single lock and never
//! block on anything else. Handlers run after the lock has been released, so
//! a handler may itself activate, deactivate or trigger.
//!
//! # Quick Start
//!
//! ```
//! use pluginbase::{
//!     event::ErrorEvent,
//!     handlers::{Disposition, Identity},
//!     interception::InterceptionStack,
//!     severity::{ReportingMask, Severity},
//!     sinks::Recorder,
//!     soft_handler::{Markup, SoftErrorHandler},
//! };
//!
//! let stack = InterceptionStack::new();
//! let recorder = Recorder::new();
//! let handler = SoftErrorHandler::new()
//!     .with_markup(Markup::Plain)
//!     .with_output(recorder.clone())
//!     .with_fatal(recorder.clone());
//!
//! {
//!     let _guard = stack.scoped(Identity::new("Demo", "error_handler"), handler, ReportingMask::SOFT);
//!     let event = ErrorEvent::new("Demo", Severity::Notice, "hello");
//!     assert_eq!(stack.trigger(&event), Disposition::Handled);
//! }
//!
//! assert_eq!(stack.depth(), 0);
//! assert_eq!(recorder.lines(), ["Demo NOTICE: hello"]);
//! ```
//!
//! Most programs use the process-wide stack returned by [`global`] through
//! the free functions of this module.

mod guard;

use alloc::vec::Vec;
use core::{fmt, panic::Location};

pub use self::guard::InterceptionGuard;
use crate::{
    event::ErrorEvent,
    handlers::{Disposition, ErrorHandler, HandlerRef, Identity, Owner, handler_to_untyped},
    lock::ExclusiveLock,
    severity::ReportingMask,
    soft_handler::SoftErrorHandler,
};

/// A handler occupying the active handler slot.
#[derive(Clone)]
pub struct InstalledHandler {
    identity: Identity,
    handler: HandlerRef,
    filter: ReportingMask,
    installed_at: &'static Location<'static>,
}

impl InstalledHandler {
    /// The identity that installed the handler.
    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Severities the handler is offered.
    #[must_use]
    pub fn filter(&self) -> ReportingMask {
        self.filter
    }

    /// Where the activation that installed the handler happened.
    #[must_use]
    pub fn installed_at(&self) -> &'static Location<'static> {
        self.installed_at
    }
}

impl fmt::Display for InstalledHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Handler {} for mask {:#x} installed at {}:{}",
            self.identity,
            self.filter.bits(),
            self.installed_at.file(),
            self.installed_at.line()
        )
    }
}

impl fmt::Debug for InstalledHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstalledHandler")
            .field("identity", &self.identity)
            .field("filter", &self.filter)
            .field("installed_at", &self.installed_at)
            .finish_non_exhaustive()
    }
}

/// One activation on the stack, holding what it displaced.
#[derive(Clone, Debug)]
pub struct HandlerStackEntry {
    identity: Identity,
    previous_handler: Option<InstalledHandler>,
    previous_reporting_mask: ReportingMask,
}

impl HandlerStackEntry {
    /// The owner of the activation.
    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The handler that was active when the activation happened.
    #[must_use]
    pub fn previous_handler(&self) -> Option<&InstalledHandler> {
        self.previous_handler.as_ref()
    }

    /// The reporting mask in effect when the activation happened.
    #[must_use]
    pub fn previous_reporting_mask(&self) -> ReportingMask {
        self.previous_reporting_mask
    }
}

impl fmt::Display for HandlerStackEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Interception by {} displacing ", self.identity)?;
        match &self.previous_handler {
            Some(previous) => write!(f, "{}", previous.identity)?,
            None => write!(f, "no handler")?,
        }
        write!(
            f,
            " with reporting mask {:#x}",
            self.previous_reporting_mask.bits()
        )
    }
}

/// Result of [`InterceptionStack::activate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Activation {
    /// A new entry was pushed and the handler installed.
    Pushed,
    /// The identity was already on top; nothing changed.
    AlreadyActive,
}

/// Result of [`InterceptionStack::deactivate`].
#[derive(Debug, Clone)]
pub enum Deactivation {
    /// The identity was on top. Its entry was popped and the displaced
    /// handler and reporting mask were restored.
    Restored(HandlerStackEntry),
    /// The identity was not on top and nothing changed. `top` is the entry
    /// that is on top, if any. Callers seeing this should assume their own
    /// activation was already unwound by someone else.
    NotOnTop {
        /// The current top entry.
        top: Option<HandlerStackEntry>,
    },
}

impl Deactivation {
    /// Returns `true` for [`Deactivation::Restored`].
    #[must_use]
    pub fn is_restored(&self) -> bool {
        matches!(self, Self::Restored(_))
    }
}

struct StackState {
    entries: Vec<HandlerStackEntry>,
    active: Option<InstalledHandler>,
    reporting: ReportingMask,
    fallback: Option<HandlerRef>,
}

impl StackState {
    fn top_identity(&self) -> Option<&Identity> {
        self.entries.last().map(|entry| &entry.identity)
    }
}

/// The interception context: handler stack, active handler slot, reporting
/// mask and fallback handler behind one lock.
pub struct InterceptionStack {
    state: ExclusiveLock<StackState>,
}

impl Default for InterceptionStack {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InterceptionStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("InterceptionStack")
            .field("entries", &state.entries)
            .field("active", &state.active)
            .field("reporting", &state.reporting)
            .field("has_fallback", &state.fallback.is_some())
            .finish()
    }
}

impl InterceptionStack {
    /// Creates an empty stack with no active handler, no fallback and a
    /// reporting mask of [`ReportingMask::ALL_CODES`].
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: ExclusiveLock::new(StackState {
                entries: Vec::new(),
                active: None,
                reporting: ReportingMask::ALL_CODES,
                fallback: None,
            }),
        }
    }

    /// Installs `handler` for the severities in `mask` on behalf of
    /// `identity`.
    ///
    /// If `identity` is already on top this does nothing and returns
    /// [`Activation::AlreadyActive`]. Otherwise the currently active handler
    /// and reporting mask are recorded in a new top entry.
    #[track_caller]
    pub fn activate<H>(&self, identity: Identity, handler: H, mask: ReportingMask) -> Activation
    where
        H: ErrorHandler,
    {
        let installed_at = Location::caller();
        let mut state = self.state.lock();

        if state.top_identity() == Some(&identity) {
            drop(state);
            tracing::debug!(%identity, "interception already active");
            return Activation::AlreadyActive;
        }

        let installed = InstalledHandler {
            identity: identity.clone(),
            handler: handler_to_untyped(handler),
            filter: mask,
            installed_at,
        };
        let previous_handler = state.active.replace(installed);
        let previous_reporting_mask = state.reporting;
        state.entries.push(HandlerStackEntry {
            identity,
            previous_handler,
            previous_reporting_mask,
        });
        let depth = state.entries.len();
        drop(state);

        tracing::debug!(depth, mask = mask.bits(), "interception activated");
        Activation::Pushed
    }

    /// Removes the activation of `identity` if it is on top, restoring the
    /// handler and reporting mask it displaced.
    pub fn deactivate(&self, identity: &Identity) -> Deactivation {
        let mut state = self.state.lock();

        let Some(entry) = state.entries.pop_if(|top| top.identity == *identity) else {
            let top = state.entries.last().cloned();
            drop(state);
            tracing::debug!(
                %identity,
                top = top.as_ref().map(|top| tracing::field::display(&top.identity)),
                "deactivation ignored, identity is not on top"
            );
            return Deactivation::NotOnTop { top };
        };

        let displaced = core::mem::replace(&mut state.active, entry.previous_handler.clone());
        state.reporting = entry.previous_reporting_mask;
        let depth = state.entries.len();
        drop(state);
        drop(displaced);

        tracing::debug!(%identity, depth, "interception deactivated");
        Deactivation::Restored(entry)
    }

    /// Activates like [`activate`](Self::activate) and returns a guard that
    /// deactivates when dropped, including during unwinding.
    #[track_caller]
    pub fn scoped<H>(
        &self,
        identity: Identity,
        handler: H,
        mask: ReportingMask,
    ) -> InterceptionGuard<'_>
    where
        H: ErrorHandler,
    {
        let activation = self.activate(identity.clone(), handler, mask);
        InterceptionGuard::new(self, identity, activation)
    }

    /// Dispatches `event`.
    ///
    /// The active handler is offered the event if its filter includes the
    /// event's severity. If there is no such handler, or it declines, the
    /// fallback handler is offered the event. Returns
    /// [`Disposition::Unhandled`] if nobody handled it.
    pub fn trigger(&self, event: &ErrorEvent) -> Disposition {
        let (active, fallback, reporting) = {
            let state = self.state.lock();
            let active = state
                .active
                .as_ref()
                .filter(|active| active.filter.includes(event.severity))
                .map(|active| active.handler.clone());
            (active, state.fallback.clone(), state.reporting)
        };

        if let Some(handler) = active
            && handler.handle(event, reporting).is_handled()
        {
            return Disposition::Handled;
        }

        if let Some(fallback) = fallback {
            return fallback.handle(event, reporting);
        }

        tracing::trace!(
            owner = %event.owner_label,
            code = event.severity.code(),
            "soft error left unhandled"
        );
        Disposition::Unhandled
    }

    /// The process-wide reporting mask handlers consult.
    #[must_use]
    pub fn reporting_mask(&self) -> ReportingMask {
        self.state.lock().reporting
    }

    /// Replaces the reporting mask, returning the previous one.
    ///
    /// A change made while an interception is active is undone when that
    /// interception is deactivated.
    pub fn set_reporting_mask(&self, mask: ReportingMask) -> ReportingMask {
        core::mem::replace(&mut self.state.lock().reporting, mask)
    }

    /// Installs the handler offered events nobody else handled.
    pub fn set_fallback<H>(&self, handler: H)
    where
        H: ErrorHandler,
    {
        let handler = handler_to_untyped(handler);
        let previous = self.state.lock().fallback.replace(handler);
        drop(previous);
    }

    /// Removes the fallback handler.
    pub fn clear_fallback(&self) {
        let previous = self.state.lock().fallback.take();
        drop(previous);
    }

    /// Number of entries on the stack.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Identity of the top entry.
    #[must_use]
    pub fn top(&self) -> Option<Identity> {
        self.state.lock().top_identity().cloned()
    }

    /// Identity that installed the currently active handler.
    #[must_use]
    pub fn active_identity(&self) -> Option<Identity> {
        self.state
            .lock()
            .active
            .as_ref()
            .map(|active| active.identity.clone())
    }

    /// Calls `f` with every entry, bottom first.
    pub fn debug_entries(&self, mut f: impl FnMut(&dyn fmt::Display)) {
        let entries = self.state.lock().entries.clone();
        for entry in &entries {
            f(entry);
        }
    }
}

/// The process-wide interception stack.
///
/// It is empty at process start and is never torn down; matched
/// activations and deactivations keep it balanced.
#[must_use]
pub fn global() -> &'static InterceptionStack {
    static GLOBAL: InterceptionStack = InterceptionStack::new();
    &GLOBAL
}

/// [`InterceptionStack::activate`] on the [`global`] stack.
#[track_caller]
pub fn activate<H>(identity: Identity, handler: H, mask: ReportingMask) -> Activation
where
    H: ErrorHandler,
{
    global().activate(identity, handler, mask)
}

/// [`InterceptionStack::deactivate`] on the [`global`] stack.
pub fn deactivate(identity: &Identity) -> Deactivation {
    global().deactivate(identity)
}

/// [`InterceptionStack::scoped`] on the [`global`] stack.
#[track_caller]
pub fn scoped<H>(identity: Identity, handler: H, mask: ReportingMask) -> InterceptionGuard<'static>
where
    H: ErrorHandler,
{
    global().scoped(identity, handler, mask)
}

/// [`InterceptionStack::trigger`] on the [`global`] stack.
pub fn trigger(event: &ErrorEvent) -> Disposition {
    global().trigger(event)
}

/// Starts intercepting on the [`global`] stack with a [`SoftErrorHandler`]
/// for owner `O`, filtered by [`Owner::REPORTING`].
#[track_caller]
pub fn resume_error_handling<O: Owner>() -> Activation {
    activate(Identity::of::<O>(), SoftErrorHandler::new(), O::REPORTING)
}

/// Stops the interception started by [`resume_error_handling`] for `O`.
pub fn suspend_error_handling<O: Owner>() -> Deactivation {
    deactivate(&Identity::of::<O>())
}

/// Like [`resume_error_handling`], returning a guard that suspends on drop.
#[track_caller]
pub fn intercept<O: Owner>() -> InterceptionGuard<'static> {
    scoped(Identity::of::<O>(), SoftErrorHandler::new(), O::REPORTING)
}

#[cfg(test)]
mod tests {
    use alloc::{string::String, vec};

    use super::*;

    fn declining() -> impl ErrorHandler {
        |_: &ErrorEvent, _: ReportingMask| Disposition::Unhandled
    }

    #[test]
    fn test_stack_send_sync() {
        static_assertions::assert_impl_all!(InterceptionStack: Send, Sync);
        static_assertions::assert_impl_all!(HandlerStackEntry: Send, Sync, Clone);
    }

    #[test]
    fn test_entry_records_displaced_state() {
        let stack = InterceptionStack::new();
        let outer = Identity::new("Outer", "error_handler");
        let inner = Identity::new("Inner", "error_handler");

        stack.activate(outer.clone(), declining(), ReportingMask::SOFT);
        stack.set_reporting_mask(ReportingMask::WARNING);
        stack.activate(inner.clone(), declining(), ReportingMask::NOTICE);

        let Deactivation::Restored(entry) = stack.deactivate(&inner) else {
            panic!("inner activation should be on top");
        };
        assert_eq!(entry.identity(), &inner);
        assert_eq!(entry.previous_reporting_mask(), ReportingMask::WARNING);
        assert_eq!(
            entry.previous_handler().map(InstalledHandler::identity),
            Some(&outer)
        );
        assert_eq!(stack.active_identity(), Some(outer));
    }

    #[test]
    fn test_debug_entries_lists_bottom_first() {
        let stack = InterceptionStack::new();
        stack.activate(Identity::new("A", "h"), declining(), ReportingMask::SOFT);
        stack.activate(Identity::new("B", "h"), declining(), ReportingMask::SOFT);

        let mut lines = vec![];
        stack.debug_entries(|entry| lines.push(alloc::format!("{entry}")));

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Interception by A::h displacing no handler"));
        assert!(lines[1].starts_with("Interception by B::h displacing A::h"));
    }

    #[test]
    fn test_handler_may_reenter_stack() {
        let stack = triomphe::Arc::new(InterceptionStack::new());
        let seen = triomphe::Arc::new(ExclusiveLock::new(Vec::<String>::new()));

        let reentrant = {
            let stack = stack.clone();
            let seen = seen.clone();
            move |event: &ErrorEvent, _: ReportingMask| {
                seen.lock().push(String::from(&*event.message));
                let depth = stack.depth();
                seen.lock().push(alloc::format!("depth {depth}"));
                Disposition::Handled
            }
        };

        stack.activate(Identity::new("Demo", "h"), reentrant, ReportingMask::SOFT);
        let event = ErrorEvent::new("Demo", crate::severity::Severity::Notice, "hello");
        assert_eq!(stack.trigger(&event), Disposition::Handled);
        assert_eq!(*seen.lock(), ["hello", "depth 1"]);

        assert!(stack.deactivate(&Identity::new("Demo", "h")).is_restored());
    }
}
