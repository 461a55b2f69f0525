//! Cascading resolution of short names to constructible types.
//!
//! A [`TypeRegistry`] maps fully qualified names (`scope.ShortName`, or just
//! `ShortName` in the global scope) to factories. Resolving a short name
//! walks a list of scopes, most specific first, and constructs the first
//! match. A plugin overrides a framework type by registering the same short
//! name in its own scope and putting that scope first.
//!
//! ```
//! use pluginbase::resolver::{Scope, ScopeChain, TypeRegistry};
//!
//! trait Widget {
//!     fn origin(&self) -> &'static str;
//! }
//!
//! struct FrameworkWidget;
//! impl Widget for FrameworkWidget {
//!     fn origin(&self) -> &'static str {
//!         "framework"
//!     }
//! }
//!
//! struct DemoWidget;
//! impl Widget for DemoWidget {
//!     fn origin(&self) -> &'static str {
//!         "demo"
//!     }
//! }
//!
//! let registry: TypeRegistry<dyn Widget> = TypeRegistry::new();
//! registry.register("app.framework", "Widget", |()| -> Box<dyn Widget> { Box::new(FrameworkWidget) })?;
//! registry.register("app.plugins.demo", "Widget", |()| -> Box<dyn Widget> { Box::new(DemoWidget) })?;
//!
//! let chain = ScopeChain::cascade("app.plugins.demo", "app.framework");
//! assert_eq!(registry.resolve("Widget", &chain, ())?.origin(), "demo");
//!
//! let framework_only = [Scope::named("app.framework")];
//! assert_eq!(registry.resolve("Widget", &framework_only, ())?.origin(), "framework");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod scope;

use alloc::{borrow::Cow, boxed::Box, string::String, vec::Vec};
use core::{borrow::Borrow, fmt, panic::Location};

use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;
use triomphe::Arc;

pub use self::{
    error::{RegistrationError, ResolutionError},
    scope::{SEPARATOR, Scope, ScopeChain},
};
use crate::lock::SharedLock;

/// Constructs an instance from constructor arguments.
///
/// Implemented for every `Fn(A) -> Box<T>` closure.
pub trait Factory<T: ?Sized, A>: 'static + Send + Sync {
    /// Constructs a new instance from `args`.
    fn construct(&self, args: A) -> Box<T>;
}

impl<T, A, F> Factory<T, A> for F
where
    T: ?Sized,
    F: 'static + Send + Sync + Fn(A) -> Box<T>,
{
    fn construct(&self, args: A) -> Box<T> {
        (self)(args)
    }
}

struct StoredFactory<T: ?Sized + 'static, A: 'static> {
    factory: Box<dyn Factory<T, A>>,
    qualified: String,
    factory_type: &'static str,
    added_at: &'static Location<'static>,
}

impl<T: ?Sized, A> fmt::Display for StoredFactory<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Factory {} for {} registered at {}:{}",
            self.factory_type,
            self.qualified,
            self.added_at.file(),
            self.added_at.line()
        )
    }
}

type FactoryMap<T, A> = HashMap<String, Arc<StoredFactory<T, A>>, FxBuildHasher>;

/// The three inputs of a resolution, bundled.
#[derive(Debug, Clone)]
pub struct ResolutionRequest<A = ()> {
    /// Name to resolve.
    pub short_name: Cow<'static, str>,
    /// Scopes to try, most specific first.
    pub search_scopes: ScopeChain,
    /// Arguments handed to the constructor of the match.
    pub constructor_args: A,
}

impl<A> ResolutionRequest<A> {
    /// Bundles a request.
    pub fn new(
        short_name: impl Into<Cow<'static, str>>,
        search_scopes: ScopeChain,
        constructor_args: A,
    ) -> Self {
        Self {
            short_name: short_name.into(),
            search_scopes,
            constructor_args,
        }
    }
}

/// Registry of factories keyed by qualified name.
///
/// `T` is what resolution produces, usually a trait object; `A` is the
/// constructor argument type, `()` when constructors take nothing. Use a
/// tuple to pass several arguments positionally.
pub struct TypeRegistry<T: ?Sized + 'static, A: 'static = ()> {
    factories: SharedLock<FactoryMap<T, A>>,
}

impl<T: ?Sized, A> Default for TypeRegistry<T, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized, A> fmt::Debug for TypeRegistry<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let factories = self.factories.read();
        f.debug_set().entries(factories.keys()).finish()
    }
}

impl<T: ?Sized, A> TypeRegistry<T, A> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            factories: SharedLock::new(HashMap::with_hasher(FxBuildHasher)),
        }
    }

    /// Registers `factory` under `short_name` in `scope`.
    ///
    /// Registering the same qualified name again replaces the earlier
    /// factory.
    #[track_caller]
    pub fn register<F>(
        &self,
        scope: impl Into<Scope>,
        short_name: &str,
        factory: F,
    ) -> Result<(), RegistrationError>
    where
        F: 'static + Send + Sync + Fn(A) -> Box<T>,
    {
        validate(short_name)?;

        let qualified = scope.into().qualify(short_name);
        let stored = Arc::new(StoredFactory {
            factory: Box::new(factory),
            qualified: qualified.clone(),
            factory_type: core::any::type_name::<F>(),
            added_at: Location::caller(),
        });

        let replaced = self.factories.write().insert(qualified, stored);
        if let Some(replaced) = replaced {
            tracing::debug!(%replaced, "factory replaced");
        }
        Ok(())
    }

    /// Resolves `short_name` against `scopes` and constructs the first match
    /// with `args`.
    ///
    /// Fails with [`ResolutionError`] if no scope has a factory for the
    /// name, including when `scopes` is empty. An empty or qualified
    /// `short_name` fails without searching.
    pub fn resolve<I>(&self, short_name: &str, scopes: I, args: A) -> Result<Box<T>, ResolutionError>
    where
        I: IntoIterator,
        I::Item: Borrow<Scope>,
    {
        if let Err(reason) = validate(short_name) {
            return Err(ResolutionError::rejected_name(short_name, reason));
        }

        let mut searched = Vec::new();
        let found = {
            let factories = self.factories.read();
            scopes.into_iter().find_map(|scope| {
                let qualified = scope.borrow().qualify(short_name);
                match factories.get(&qualified) {
                    Some(stored) => Some(stored.clone()),
                    None => {
                        tracing::trace!(%qualified, "cascading lookup missed");
                        searched.push(qualified);
                        None
                    }
                }
            })
        };

        let Some(stored) = found else {
            return Err(ResolutionError::new(short_name, searched));
        };

        tracing::debug!(
            short_name,
            qualified = %stored.qualified,
            "cascading lookup resolved"
        );
        Ok(stored.factory.construct(args))
    }

    /// Resolves a bundled request.
    pub fn resolve_request(&self, request: ResolutionRequest<A>) -> Result<Box<T>, ResolutionError> {
        let ResolutionRequest {
            short_name,
            search_scopes,
            constructor_args,
        } = request;
        self.resolve(&short_name, &search_scopes, constructor_args)
    }

    /// Whether `scope` itself has a factory for `short_name`.
    #[must_use]
    pub fn contains(&self, scope: &Scope, short_name: &str) -> bool {
        self.factories
            .read()
            .contains_key(&scope.qualify(short_name))
    }

    /// Number of registered factories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.read().len()
    }

    /// Whether no factories are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.read().is_empty()
    }

    /// Calls `f` with a description of every registered factory, in no
    /// particular order.
    pub fn debug_factories(&self, mut f: impl FnMut(&dyn fmt::Display)) {
        let factories: Vec<_> = self.factories.read().values().cloned().collect();
        for stored in &factories {
            f(&**stored);
        }
    }
}

fn validate(short_name: &str) -> Result<(), RegistrationError> {
    if short_name.is_empty() {
        Err(RegistrationError::EmptyName)
    } else if short_name.contains(SEPARATOR) {
        Err(RegistrationError::QualifiedName {
            name: String::from(short_name),
        })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;

    trait Named {
        fn name(&self) -> String;
    }

    struct Plain(String);

    impl Named for Plain {
        fn name(&self) -> String {
            self.0.clone()
        }
    }

    #[test]
    fn test_registry_send_sync() {
        static_assertions::assert_impl_all!(TypeRegistry<dyn Named>: Send, Sync);
        static_assertions::assert_impl_all!(ResolutionError: Send, Sync);
    }

    #[test]
    fn test_register_rejects_bad_names() {
        let registry: TypeRegistry<dyn Named> = TypeRegistry::new();
        let factory = |()| -> Box<dyn Named> { Box::new(Plain(String::new())) };

        assert_eq!(
            registry.register("app", "", factory),
            Err(RegistrationError::EmptyName)
        );
        assert_eq!(
            registry.register("app", "a.b", factory),
            Err(RegistrationError::QualifiedName {
                name: "a.b".to_string()
            })
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_reregistering_replaces() {
        let registry: TypeRegistry<dyn Named, &'static str> = TypeRegistry::new();
        registry
            .register("app", "Thing", |name: &'static str| -> Box<dyn Named> {
                Box::new(Plain(alloc::format!("first {name}")))
            })
            .unwrap();
        registry
            .register("app", "Thing", |name: &'static str| -> Box<dyn Named> {
                Box::new(Plain(alloc::format!("second {name}")))
            })
            .unwrap();

        assert_eq!(registry.len(), 1);
        let thing = registry.resolve("Thing", [Scope::named("app")], "x").unwrap();
        assert_eq!(thing.name(), "second x");
    }

    #[test]
    fn test_misses_are_reported_in_search_order() {
        let registry: TypeRegistry<dyn Named> = TypeRegistry::new();
        let chain = ScopeChain::cascade("app.plugins.demo", "app.framework");

        let error = registry.resolve("Ghost", &chain, ()).err().unwrap();
        assert_eq!(error.short_name(), "Ghost");
        assert_eq!(
            error.searched(),
            ["app.plugins.demo.Ghost", "app.framework.Ghost", "Ghost"]
        );
        assert_eq!(
            error.to_string(),
            "unable to locate cascading type 'Ghost' (searched app.plugins.demo.Ghost, app.framework.Ghost, Ghost)"
        );
    }

    #[test]
    fn test_debug_factories_describes_registration() {
        let registry: TypeRegistry<dyn Named> = TypeRegistry::new();
        registry
            .register("app", "Thing", |()| -> Box<dyn Named> {
                Box::new(Plain(String::new()))
            })
            .unwrap();

        let mut descriptions = Vec::new();
        registry.debug_factories(|factory| descriptions.push(factory.to_string()));

        assert_eq!(descriptions.len(), 1);
        assert!(descriptions[0].contains("for app.Thing registered at"));
        assert!(descriptions[0].contains("mod.rs"));
    }
}
