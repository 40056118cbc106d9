//! # Halcyon
//!
//! Runtime core for Halcyon components.
//!
//! Halcyon components get their dependencies from a hierarchical injector,
//! hold state in replay-latest signals and are driven through their lifecycle
//! by a manager that applies decorator plugins at each phase.
//!
//! ## Core Principles
//!
//! - **Explicit metadata**: decorator behavior is declared on a typed
//!   [`ComponentDescriptor`](lifecycle::ComponentDescriptor), once per component type
//! - **Identity-based injection**: dependencies are addressed by token identity
//! - **Local failures**: a failing hook or watcher is reported, never fatal to its siblings
//! - **Single-threaded**: everything is `Rc`-based and runs on one thread
//!
//! ## Feature Flags
//!
//! - `full` (default) - every runtime crate
//! - `di` - dependency injection ([`di`])
//! - `reactive` - signals ([`reactive`])
//! - `lifecycle` - lifecycle manager and plugins ([`lifecycle`]) plus [`settings`];
//!   enables `di` and `reactive`
//!
//! ## Quick Example
//!
//! ```rust
//! # #[cfg(feature = "lifecycle")]
//! # {
//! use std::rc::Rc;
//!
//! use halcyon::di::{Provider, Token};
//! use halcyon::lifecycle::{Component, ComponentDescriptor, LifecycleManager};
//! use halcyon::settings::Settings;
//!
//! struct Greeting {
//!     text: Rc<String>,
//! }
//!
//! impl Component for Greeting {
//!     type View = String;
//!
//!     fn render(&self) -> String {
//!         self.text.to_string()
//!     }
//! }
//!
//! let settings = Settings::from_toml_str("[lifecycle]\ndiagnostics_level = \"info\"").unwrap();
//! let text: Token<String> = Token::new("text");
//! let descriptor = Rc::new(
//!     ComponentDescriptor::<Greeting>::builder("Greeting")
//!         .provider(Provider::value(&text, "hello".to_string()))
//!         .build()
//!         .unwrap(),
//! );
//!
//! let manager = LifecycleManager::with_defaults().with_config(settings.lifecycle_config());
//! let host = manager
//!     .create(&descriptor, None, |cx| Ok(Greeting { text: cx.inject(&text)? }))
//!     .unwrap();
//! host.mount();
//!
//! assert_eq!(host.view().as_deref(), Some("hello"));
//! # }
//! ```

pub mod di;
pub mod lifecycle;
pub mod reactive;
#[cfg(feature = "lifecycle")]
pub mod settings;
