//! Commonly used items for convenient importing.
//!
//! ```rust
//! use pluginbase::prelude::*;
//!
//! let registry: TypeRegistry<str> = TypeRegistry::new();
//! registry.register(Scope::Global, "Greeting", |()| Box::<str>::from("hello"))?;
//!
//! let chain = ScopeChain::cascade("app.plugins.demo", "app.framework");
//! assert_eq!(&*registry.resolve("Greeting", &chain, ())?, "hello");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub use crate::{
    event::ErrorEvent,
    handlers::{Disposition, ErrorHandler, Identity, Owner},
    interception::{Activation, Deactivation, InterceptionGuard, InterceptionStack},
    resolver::{Scope, ScopeChain, TypeRegistry},
    severity::{ReportingMask, Severity},
    sinks::Recorder,
    soft_handler::{Markup, SoftErrorHandler},
};
