use crate::{
    handlers::Identity,
    interception::{Activation, Deactivation, InterceptionStack},
};

/// Deactivates an interception when dropped.
///
/// Returned by [`InterceptionStack::scoped`]. If the activation was a no-op
/// because the same identity was already on top, the guard leaves the stack
/// alone on drop: the entry belongs to the outer activation.
#[must_use = "dropping the guard deactivates the interception immediately"]
pub struct InterceptionGuard<'a> {
    stack: &'a InterceptionStack,
    identity: Identity,
    activation: Activation,
    armed: bool,
}

impl<'a> InterceptionGuard<'a> {
    pub(super) fn new(stack: &'a InterceptionStack, identity: Identity, activation: Activation) -> Self {
        Self {
            stack,
            identity,
            activation,
            armed: activation == Activation::Pushed,
        }
    }

    /// The identity the guard deactivates.
    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// What the activation did.
    #[must_use]
    pub fn activation(&self) -> Activation {
        self.activation
    }

    /// Deactivates now and returns the result, or `None` if this guard's
    /// activation was a no-op.
    pub fn finish(mut self) -> Option<Deactivation> {
        self.disarm()
    }

    fn disarm(&mut self) -> Option<Deactivation> {
        if core::mem::take(&mut self.armed) {
            Some(self.stack.deactivate(&self.identity))
        } else {
            None
        }
    }
}

impl Drop for InterceptionGuard<'_> {
    fn drop(&mut self) {
        if let Some(Deactivation::NotOnTop { .. }) = self.disarm() {
            tracing::debug!(
                identity = %self.identity,
                "interception guard found its entry already unwound"
            );
        }
    }
}

impl core::fmt::Debug for InterceptionGuard<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InterceptionGuard")
            .field("identity", &self.identity)
            .field("activation", &self.activation)
            .field("armed", &self.armed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        event::ErrorEvent,
        handlers::Disposition,
        severity::ReportingMask,
    };

    fn noop(_: &ErrorEvent, _: ReportingMask) -> Disposition {
        Disposition::Handled
    }

    #[test]
    fn test_guard_pops_on_drop() {
        let stack = InterceptionStack::new();
        {
            let guard = stack.scoped(Identity::new("Demo", "h"), noop, ReportingMask::SOFT);
            assert_eq!(guard.activation(), Activation::Pushed);
            assert_eq!(stack.depth(), 1);
        }
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn test_noop_guard_leaves_outer_entry() {
        let stack = InterceptionStack::new();
        let outer = stack.scoped(Identity::new("Demo", "h"), noop, ReportingMask::SOFT);
        {
            let inner = stack.scoped(Identity::new("Demo", "h"), noop, ReportingMask::SOFT);
            assert_eq!(inner.activation(), Activation::AlreadyActive);
        }
        assert_eq!(stack.depth(), 1);

        assert!(matches!(outer.finish(), Some(Deactivation::Restored(_))));
        assert_eq!(stack.depth(), 0);
    }
}
