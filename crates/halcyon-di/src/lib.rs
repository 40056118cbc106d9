//! # Halcyon Dependency Injection
//!
//! Hierarchical, scope-aware dependency injection for Halcyon components.
//!
//! ## Features
//!
//! - **Identity tokens**: dependencies are addressed by [`Token`] identity, never by structure
//! - **Three provider kinds**: fixed values, factories with declared dependencies, and
//!   [`Injectable`] types with constructor dependencies
//! - **Scoped**: container-wide singletons or one instance per requesting component
//! - **Hierarchical**: child injectors delegate unknown tokens to their parent
//! - **Cycle detection**: circular provider chains fail with the full resolution path
//!
//! ## Example
//!
//! ```rust
//! use halcyon_di::{Arguments, DiResult, ErasedToken, Injectable, Injector, Provider, Token, provide_as};
//! use std::rc::Rc;
//!
//! trait Logger {
//!     fn log(&self, message: &str);
//! }
//!
//! struct ConsoleLogger;
//! impl Logger for ConsoleLogger {
//!     fn log(&self, message: &str) {
//!         println!("{message}");
//!     }
//! }
//! impl Injectable for ConsoleLogger {
//!     fn construct(_args: &mut Arguments<'_>) -> DiResult<Self> {
//!         Ok(ConsoleLogger)
//!     }
//! }
//! provide_as!(ConsoleLogger => dyn Logger);
//!
//! struct Service {
//!     logger: Rc<dyn Logger>,
//! }
//! impl Injectable for Service {
//!     fn dependencies() -> Vec<ErasedToken> {
//!         vec![Token::<dyn Logger>::of().erased()]
//!     }
//!     fn construct(args: &mut Arguments<'_>) -> DiResult<Self> {
//!         Ok(Service { logger: args.next()? })
//!     }
//! }
//!
//! let injector = Injector::builder()
//!     .provider(Provider::class_as::<dyn Logger, ConsoleLogger>(&Token::of()))
//!     .provider(Provider::class(&Token::<Service>::of()))
//!     .build();
//!
//! let service = injector.get(&Token::<Service>::of(), None).unwrap();
//! let logger = injector.get(&Token::<dyn Logger>::of(), None).unwrap();
//! assert!(Rc::ptr_eq(&service.logger, &logger));
//! ```

pub mod component;
pub mod cycle_detection;
pub mod error;
pub mod injector;
pub mod provider;
pub mod token;

pub use component::ComponentId;
pub use cycle_detection::DEFAULT_MAX_RESOLUTION_DEPTH;
pub use error::{DiError, DiResult};
pub use injector::{Injector, InjectorBuilder};
pub use provider::{Arguments, Dependencies, Injectable, Provider, Scope, Upcast};
pub use token::{ErasedToken, Token, TokenKey};
