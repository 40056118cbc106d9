//! Reactive values module.
//!
//! Replay-latest signals, derived views, combinators and persistence adapters.
//!
//! # Examples
//!
//! ```rust,no_run
//! # #[cfg(feature = "reactive")]
//! use halcyon::reactive::{Signal, combine_latest};
//! ```

#[cfg(feature = "reactive")]
pub use halcyon_reactive::*;
