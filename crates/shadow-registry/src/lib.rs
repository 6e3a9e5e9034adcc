//! Shadow Operation Registry
//!
//! Static per-operation metadata consumed by the shadow comparison engine.
//!
//! # Overview
//!
//! The registry answers, for an operation name:
//! - **rename**: which name the candidate implementation uses
//! - **ignored**: whether renames or result differences are never reported
//! - **iteration**: whether the operation takes a per-element callback, and
//!   whether that callback's return value matters (`mappable`)
//! - **kind**: whether the operation lives on the chain (sequence) surface
//!
//! # Example
//!
//! ```rust
//! use shadow_registry::{IterationMeta, OperationRegistry};
//!
//! let registry = OperationRegistry::new()
//!     .with_rename("contains", "includes")
//!     .with_iteration("each", IterationMeta::effect_only());
//!
//! assert_eq!(registry.rename_target("contains"), Some("includes"));
//! assert!(registry.iteration("each").is_some());
//! ```

#![warn(missing_docs)]

pub mod descriptor;
pub mod error;
pub mod registry;
pub mod tables;

// Re-exports
pub use descriptor::{IterationMeta, OperationDescriptor, OperationKind};
pub use error::RegistryError;
pub use registry::OperationRegistry;
pub use tables::{IgnoredTables, RegistryTables, TableFormat};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
