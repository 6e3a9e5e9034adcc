//! Shadow Core - shadow-execution comparison engine
//!
//! Wraps a reference implementation of a named API so that every call:
//! - runs the reference with the caller's arguments and returns its result
//! - runs the candidate implementation on an independent copy of the arguments
//! - compares both results and reports divergences once per distinct message
//!
//! # Example
//!
//! ```rust
//! use shadow_core::prelude::*;
//! use std::sync::Arc;
//!
//! let legacy = Surface::builder("lib", "1.0.0")
//!     .function("contains", ResultShape::Unwrapped, |args| {
//!         let items = args[0].as_array().map(|a| a.snapshot()).unwrap_or_default();
//!         Ok(Value::Bool(items.contains(&args[1])))
//!     })
//!     .build();
//! let modern = Surface::builder("lib", "2.0.0")
//!     .function("includes", ResultShape::Unwrapped, |args| {
//!         let items = args[0].as_array().map(|a| a.snapshot()).unwrap_or_default();
//!         Ok(Value::Bool(items.contains(&args[1])))
//!     })
//!     .build();
//!
//! let reporter = Arc::new(Reporter::new());
//! reporter.configure(ConfigPatch::new().with_log(|message| eprintln!("{message}")));
//!
//! let shadow = ShadowSurface::install(
//!     Arc::new(legacy),
//!     Arc::new(modern),
//!     Arc::new(OperationRegistry::new().with_rename("contains", "includes")),
//!     Arc::clone(&reporter),
//! );
//!
//! let found = shadow.call("contains", &[Value::array([1, 2, 3]), Value::from(2)]).unwrap();
//! assert_eq!(found, Value::Bool(true));
//! assert_eq!(reporter.seen_count(), 1); // the rename notice
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod binding;
pub mod compare;
pub mod config;
pub mod error;
pub mod intercept;
pub mod invocation;
pub mod render;
pub mod report;
pub mod surface;
pub mod telemetry;
pub mod value;

// Re-exports for convenience
pub use binding::{BindingTable, MethodBinding};
pub use compare::{
    deep_clone, deep_clone_all, structurally_equal, Comparability, DeepCloner,
    DefaultComparability,
};
pub use config::{configure, ConfigPatch, ShadowConfig};
pub use error::{CallError, ResolutionError, TelemetryError};
pub use intercept::{install, Interceptor, ShadowSurface};
pub use invocation::Invocation;
pub use report::{DivergenceNotice, RenameNotice, Reporter};
pub use surface::{CallContext, Chain, Dispatch, ResultShape, Surface, SurfaceBuilder};
pub use telemetry::{init_tracing, LogFormat};
pub use value::{ArrayRef, Callback, Instance, ObjectRef, Returns, Value, Wrapped};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for wrapping and calling surfaces
    pub use crate::{
        Callback, CallContext, CallError, ConfigPatch, Dispatch, Interceptor, Reporter,
        ResultShape, ShadowSurface, Surface, Value, Wrapped,
    };
    pub use shadow_registry::{IterationMeta, OperationRegistry};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
