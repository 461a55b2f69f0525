use alloc::{string::String, vec::Vec};
use core::fmt;

/// No scope of a search contained the requested short name.
///
/// This is an ordinary failure: the caller decides whether to fall back to
/// something else or give up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionError {
    short_name: String,
    searched: Vec<String>,
    rejected: Option<RegistrationError>,
}

impl ResolutionError {
    pub(crate) fn new(short_name: &str, searched: Vec<String>) -> Self {
        Self {
            short_name: String::from(short_name),
            searched,
            rejected: None,
        }
    }

    pub(crate) fn rejected_name(short_name: &str, reason: RegistrationError) -> Self {
        Self {
            short_name: String::from(short_name),
            searched: Vec::new(),
            rejected: Some(reason),
        }
    }

    /// Why the short name was rejected before any scope was searched.
    #[must_use]
    pub fn rejection(&self) -> Option<&RegistrationError> {
        self.rejected.as_ref()
    }

    /// The short name that could not be resolved.
    #[must_use]
    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    /// The qualified names that were tried, in order.
    #[must_use]
    pub fn searched(&self) -> &[String] {
        &self.searched
    }
}

impl fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unable to locate cascading type '{}'", self.short_name)?;
        if let Some(reason) = &self.rejected {
            write!(f, " (name rejected: {reason})")
        } else if self.searched.is_empty() {
            write!(f, " (no scopes searched)")
        } else {
            write!(f, " (searched {})", self.searched.join(", "))
        }
    }
}

impl core::error::Error for ResolutionError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        self.rejected
            .as_ref()
            .map(|reason| reason as &(dyn core::error::Error + 'static))
    }
}

/// A factory could not be registered under the given short name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// The short name was empty.
    EmptyName,
    /// The short name contained the scope separator.
    QualifiedName {
        /// The rejected name.
        name: String,
    },
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "short names must not be empty"),
            Self::QualifiedName { name } => write!(
                f,
                "short name '{name}' must not contain the scope separator '{}'",
                super::SEPARATOR
            ),
        }
    }
}

impl core::error::Error for RegistrationError {}
