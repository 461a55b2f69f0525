#![cfg_attr(not(doc), no_std)]
#![deny(
    missing_docs,
    clippy::alloc_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::std_instead_of_core,
    clippy::missing_safety_doc,
    clippy::undocumented_unsafe_blocks,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]
#![forbid(unsafe_code)]
// Make docs.rs generate better docs
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Building blocks for plugin hosts: scoped soft-error interception and
//! cascading type resolution.
//!
//! ## Overview
//!
//! Plugins running inside a host raise *soft errors*: notices, warnings,
//! deprecations and user-level errors that the host wants reported in a
//! uniform, labelled way while a plugin is running, and left alone
//! otherwise. Plugins also want to override the host's building blocks by
//! name without the host knowing about them in advance.
//!
//! This crate provides both:
//!
//! - **[`interception`]**: a LIFO stack of interceptions. Activating one
//!   installs a handler and remembers what it displaced; deactivating it
//!   restores the displaced handler and reporting mask. Triggered events go
//!   to the active handler, whose default implementation,
//!   [`SoftErrorHandler`](soft_handler::SoftErrorHandler), prints a labelled
//!   line and terminates the process on errors.
//! - **[`resolver`]**: a registry of factories keyed by qualified name,
//!   resolved by trying the plugin's own scope, then the framework's, then
//!   the global one.
//!
//! ## Quick Example
//!
//! ```
//! use pluginbase::prelude::*;
//!
//! struct Demo;
//!
//! impl Owner for Demo {
//!     const NAME: &'static str = "Demo";
//!     const SCOPE: &'static str = "app.plugins.demo";
//! }
//!
//! let stack = InterceptionStack::new();
//! let recorder = Recorder::new();
//! let handler = SoftErrorHandler::new()
//!     .with_markup(Markup::Plain)
//!     .with_output(recorder.clone())
//!     .with_fatal(recorder.clone());
//!
//! let guard = stack.scoped(Identity::of::<Demo>(), handler, Demo::REPORTING);
//! stack.trigger(&ErrorEvent::from_owner::<Demo>(Severity::Warning, "low on widgets"));
//! drop(guard);
//!
//! assert_eq!(recorder.lines(), ["Demo WARNING: low on widgets"]);
//! assert_eq!(stack.depth(), 0);
//! ```
//!
//! ## Features
//!
//! - `std` (default): standard library locks, the [`StdoutSink`] and
//!   [`ExitProcess`] sinks and configuration through environment variables.
//!   Without it the crate is `no_std` + `alloc`, uses spin locks, and the
//!   default soft handler discards its output.
//!
//! ## Configuration
//!
//! - `PLUGINBASE_MARKUP` (`plain`, `html` or `ansi`) selects the default
//!   emphasis of the label segment. Read once per process.
//!
//! ## Logging
//!
//! The crate logs through [`tracing`] at `debug` and `trace` level and never
//! installs a subscriber. The `pluginbase-tracing` crate routes the soft
//! errors themselves into `tracing`.
//!
//! [`StdoutSink`]: sinks::StdoutSink
//! [`ExitProcess`]: sinks::ExitProcess

extern crate alloc;
#[cfg(any(test, feature = "std"))]
extern crate std;

mod lock;

pub mod event;
pub mod handlers;
pub mod interception;
pub mod prelude;
pub mod resolver;
pub mod severity;
pub mod sinks;
pub mod soft_handler;

pub use self::{
    event::ErrorEvent,
    handlers::{Disposition, ErrorHandler, Identity, Owner},
    interception::InterceptionStack,
    resolver::{ResolutionError, TypeRegistry},
    severity::{ReportingMask, Severity},
};
