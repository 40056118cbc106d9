//! Component lifecycle module.
//!
//! Component descriptors, the lifecycle manager and the built-in decorator
//! plugins (guard, resolver, watch, mount).
//!
//! # Examples
//!
//! ```rust,no_run
//! # #[cfg(feature = "lifecycle")]
//! use halcyon::lifecycle::{ComponentDescriptor, LifecycleManager, PluginRegistry};
//! ```

#[cfg(feature = "lifecycle")]
pub use halcyon_lifecycle::*;
