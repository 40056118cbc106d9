//! # Halcyon Reactive
//!
//! Replay-latest reactive values for the Halcyon component runtime.
//!
//! ## Features
//!
//! - **Signal**: a hot container whose subscribers receive the current value
//!   immediately, then every later value in emission order
//! - **Derived views**: [`Signal::map`] and [`Signal::select`] recompute from the
//!   parent without storing a copy
//! - **Terminal states**: completion and an error channel, each delivered once
//! - **Operators**: [`combine_latest`] and type erasure through [`AnySignal`]
//! - **Persistence**: [`PersistenceAdapter`] keeps signals in step with an
//!   external store
//!
//! Everything here is single-threaded (`Rc`/`RefCell`); signals are not `Send`.
//!
//! ## Example
//!
//! ```
//! use halcyon_reactive::Signal;
//! use serde::Serialize;
//! use serde_json::json;
//!
//! #[derive(Serialize)]
//! struct User {
//!     name: String,
//! }
//!
//! let user = Signal::new(User { name: "ada".to_string() });
//! let name = user.select("name");
//!
//! assert_eq!(name.value(), Some(json!("ada")));
//! user.set(User { name: "grace".to_string() });
//! assert_eq!(name.value(), Some(json!("grace")));
//! ```

pub mod derived;
pub mod erased;
pub mod error;
pub mod observer;
pub mod operators;
pub mod path;
pub mod persistence;
pub mod signal;

pub use derived::Derived;
pub use erased::AnySignal;
pub use error::SignalError;
pub use observer::{Observer, Subscription, SubscriptionBag};
pub use operators::combine_latest;
pub use persistence::{MemoryAdapter, PersistenceAdapter};
pub use signal::{Signal, SignalId, SignalStatus};
