//! Severity codes and the reporting mask.
//!
//! Soft errors are classified by a [`Severity`], each of which owns one bit
//! in a [`ReportingMask`]. The numeric codes are the ones plugin hosts
//! traditionally use for user-triggered diagnostics, so events coming from a
//! host can be converted with [`Severity::from_code`] without a lookup table.
//!
//! ```
//! use pluginbase::severity::{ReportingMask, Severity};
//!
//! let mask = ReportingMask::SOFT - ReportingMask::NOTICE;
//! assert!(!mask.includes(Severity::Notice));
//! assert!(mask.includes(Severity::Warning));
//! assert_eq!(Severity::from_code(1024), Severity::Notice);
//! ```

use bitflags::bitflags;

bitflags! {
    /// Bitset controlling which severities are observed.
    ///
    /// Two masks are in play during dispatch: the filter an interception
    /// handler was activated with, and the process-wide reporting mask that
    /// the handler itself consults.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ReportingMask: u32 {
        /// Fatal soft error.
        const ERROR      = 0x0100;
        /// Warning.
        const WARNING    = 0x0200;
        /// Notice.
        const NOTICE     = 0x0400;
        /// Deprecation notice.
        const DEPRECATED = 0x4000;

        /// Every soft severity. This is the default activation mask.
        const SOFT = Self::ERROR.bits()
            | Self::WARNING.bits()
            | Self::NOTICE.bits()
            | Self::DEPRECATED.bits();
    }
}

impl ReportingMask {
    /// Every bit set, including bits with no named severity.
    ///
    /// This is the reporting mask in effect at process start.
    pub const ALL_CODES: Self = Self::from_bits_retain(u32::MAX);

    /// Returns `true` if the bit of `severity` is part of this mask.
    ///
    /// An [`Unrecognized`](Severity::Unrecognized) severity with code `0` is
    /// never included.
    #[inline]
    #[must_use]
    pub const fn includes(self, severity: Severity) -> bool {
        self.intersects(severity.bit())
    }
}

impl Default for ReportingMask {
    fn default() -> Self {
        Self::SOFT
    }
}

/// Severity of a soft error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// Informational, never fatal.
    Notice,
    /// Something is wrong but execution can continue.
    Warning,
    /// As bad as a hard fault. Handling an error terminates the process.
    Error,
    /// Use of something scheduled for removal.
    Deprecated,
    /// Any code outside the four soft severities. Soft-error handlers defer
    /// these to the next handler in line.
    Unrecognized(u32),
}

impl Severity {
    /// Code of [`Severity::Error`].
    pub const ERROR_CODE: u32 = ReportingMask::ERROR.bits();
    /// Code of [`Severity::Warning`].
    pub const WARNING_CODE: u32 = ReportingMask::WARNING.bits();
    /// Code of [`Severity::Notice`].
    pub const NOTICE_CODE: u32 = ReportingMask::NOTICE.bits();
    /// Code of [`Severity::Deprecated`].
    pub const DEPRECATED_CODE: u32 = ReportingMask::DEPRECATED.bits();

    /// Classifies a raw severity code.
    #[must_use]
    pub const fn from_code(code: u32) -> Self {
        match code {
            Self::ERROR_CODE => Self::Error,
            Self::WARNING_CODE => Self::Warning,
            Self::NOTICE_CODE => Self::Notice,
            Self::DEPRECATED_CODE => Self::Deprecated,
            other => Self::Unrecognized(other),
        }
    }

    /// The raw code of this severity.
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::Error => Self::ERROR_CODE,
            Self::Warning => Self::WARNING_CODE,
            Self::Notice => Self::NOTICE_CODE,
            Self::Deprecated => Self::DEPRECATED_CODE,
            Self::Unrecognized(code) => code,
        }
    }

    /// The bits of this severity within a [`ReportingMask`].
    #[must_use]
    pub const fn bit(self) -> ReportingMask {
        ReportingMask::from_bits_retain(self.code())
    }

    /// The label used when composing a message, or `None` for severities a
    /// soft-error handler does not understand.
    #[must_use]
    pub const fn label(self) -> Option<&'static str> {
        match self {
            Self::Notice => Some("NOTICE"),
            Self::Error => Some("ERROR"),
            Self::Warning => Some("WARNING"),
            Self::Deprecated => Some("DEPRECATED"),
            Self::Unrecognized(_) => None,
        }
    }

    /// Whether handling this severity ends the process.
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::Error)
    }
}

impl core::fmt::Display for Severity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.label() {
            Some(label) => f.write_str(label),
            None => write!(f, "UNRECOGNIZED({})", self.code()),
        }
    }
}

/// Kind of a hard runtime fault that a host wants to report through the soft
/// channel instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// A fatal fault.
    Error,
    /// A recoverable fault.
    Warning,
    /// An informational fault.
    Notice,
    /// Any other fault code.
    Other(u32),
}

impl From<FaultKind> for Severity {
    /// Maps a fault onto its soft counterpart. Faults without a direct
    /// counterpart are downgraded to notices.
    fn from(kind: FaultKind) -> Self {
        match kind {
            FaultKind::Error => Severity::Error,
            FaultKind::Warning => Severity::Warning,
            FaultKind::Notice | FaultKind::Other(_) => Severity::Notice,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip_through_classification() {
        for severity in [
            Severity::Notice,
            Severity::Warning,
            Severity::Error,
            Severity::Deprecated,
        ] {
            assert_eq!(Severity::from_code(severity.code()), severity);
            assert!(ReportingMask::SOFT.includes(severity));
        }
    }

    #[test]
    fn test_unrecognized_codes() {
        assert_eq!(Severity::from_code(2), Severity::Unrecognized(2));
        assert_eq!(Severity::Unrecognized(2).label(), None);
        assert!(!ReportingMask::SOFT.includes(Severity::Unrecognized(2)));
        assert!(ReportingMask::ALL_CODES.includes(Severity::Unrecognized(2)));
        assert!(!ReportingMask::ALL_CODES.includes(Severity::Unrecognized(0)));
    }

    #[test]
    fn test_only_error_is_fatal() {
        assert!(Severity::Error.is_fatal());
        assert!(!Severity::Warning.is_fatal());
        assert!(!Severity::Notice.is_fatal());
        assert!(!Severity::Deprecated.is_fatal());
    }

    #[test]
    fn test_faults_soften() {
        assert_eq!(Severity::from(FaultKind::Error), Severity::Error);
        assert_eq!(Severity::from(FaultKind::Warning), Severity::Warning);
        assert_eq!(Severity::from(FaultKind::Notice), Severity::Notice);
        assert_eq!(Severity::from(FaultKind::Other(4096)), Severity::Notice);
    }

    #[test]
    fn test_severity_send_sync_copy() {
        static_assertions::assert_impl_all!(Severity: Send, Sync, Copy);
        static_assertions::assert_impl_all!(ReportingMask: Send, Sync, Copy);
    }
}
