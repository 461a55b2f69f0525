use alloc::{borrow::Cow, string::String};
use core::fmt;

use indexmap::IndexSet;
use rustc_hash::FxBuildHasher;

use crate::handlers::Owner;

/// Separator between a scope prefix and a short name.
pub const SEPARATOR: char = '.';

/// A namespace-like prefix under which short names are looked up.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    /// The designated global scope. Names in it are not prefixed.
    Global,
    /// A named scope such as `app.framework`.
    Named(Cow<'static, str>),
}

impl Scope {
    /// A named scope. An empty prefix is the global scope.
    pub fn named(prefix: impl Into<Cow<'static, str>>) -> Self {
        let prefix = prefix.into();
        if prefix.is_empty() {
            Self::Global
        } else {
            Self::Named(prefix)
        }
    }

    /// The scope of owner `O`.
    #[must_use]
    pub fn of<O: Owner>() -> Self {
        Self::named(O::SCOPE)
    }

    /// The fully qualified name of `short_name` in this scope.
    ///
    /// ```
    /// use pluginbase::resolver::Scope;
    ///
    /// assert_eq!(Scope::named("app.framework").qualify("Widget"), "app.framework.Widget");
    /// assert_eq!(Scope::Global.qualify("Widget"), "Widget");
    /// ```
    #[must_use]
    pub fn qualify(&self, short_name: &str) -> String {
        match self {
            Self::Global => String::from(short_name),
            Self::Named(prefix) => {
                let mut qualified = String::with_capacity(prefix.len() + 1 + short_name.len());
                qualified.push_str(prefix);
                qualified.push(SEPARATOR);
                qualified.push_str(short_name);
                qualified
            }
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => f.write_str("<global>"),
            Self::Named(prefix) => f.write_str(prefix),
        }
    }
}

impl From<&'static str> for Scope {
    fn from(prefix: &'static str) -> Self {
        Self::named(prefix)
    }
}

/// An ordered list of scopes to search, most specific first.
///
/// A scope appears at most once; pushing it again keeps its first position.
#[derive(Debug, Clone, Default)]
pub struct ScopeChain {
    scopes: IndexSet<Scope, FxBuildHasher>,
}

impl ScopeChain {
    /// An empty chain. Resolving against it always fails.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The usual cascade: `own`, then `framework`, then the global scope.
    ///
    /// ```
    /// use pluginbase::resolver::ScopeChain;
    ///
    /// let chain = ScopeChain::cascade("app.plugins.demo", "app.framework");
    /// let scopes: Vec<_> = chain.iter().map(ToString::to_string).collect();
    /// assert_eq!(scopes, ["app.plugins.demo", "app.framework", "<global>"]);
    /// ```
    pub fn cascade(own: impl Into<Scope>, framework: impl Into<Scope>) -> Self {
        Self::new().then(own).then(framework).then(Scope::Global)
    }

    /// The cascade for owner `O` on top of `framework`.
    pub fn for_owner<O: Owner>(framework: impl Into<Scope>) -> Self {
        Self::cascade(Scope::of::<O>(), framework)
    }

    /// Appends `scope` as the least specific scope so far.
    #[must_use]
    pub fn then(mut self, scope: impl Into<Scope>) -> Self {
        self.push(scope);
        self
    }

    /// Appends `scope` in place. Returns `false` if it was already present.
    pub fn push(&mut self, scope: impl Into<Scope>) -> bool {
        self.scopes.insert(scope.into())
    }

    /// The scopes, most specific first.
    pub fn iter(&self) -> impl Iterator<Item = &Scope> {
        self.scopes.iter()
    }

    /// Number of scopes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// Whether the chain has no scopes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

impl<'a> IntoIterator for &'a ScopeChain {
    type Item = &'a Scope;
    type IntoIter = indexmap::set::Iter<'a, Scope>;

    fn into_iter(self) -> Self::IntoIter {
        self.scopes.iter()
    }
}

impl<S: Into<Scope>> FromIterator<S> for ScopeChain {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut chain = Self::new();
        for scope in iter {
            chain.push(scope);
        }
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_keeps_first_position_of_duplicates() {
        let chain: ScopeChain = ["app.a", "app.b", "app.a", ""].into_iter().collect();
        let scopes: alloc::vec::Vec<_> = chain.iter().cloned().collect();
        assert_eq!(
            scopes,
            [Scope::named("app.a"), Scope::named("app.b"), Scope::Global]
        );
    }

    #[test]
    fn test_empty_prefix_is_global() {
        assert_eq!(Scope::named(""), Scope::Global);
    }
}
