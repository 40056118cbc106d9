//! Dependency injection module.
//!
//! Tokens, providers and hierarchical injectors with cycle detection.
//!
//! # Examples
//!
//! ```rust
//! # #[cfg(feature = "di")]
//! # {
//! use halcyon::di::{Injector, Provider, Token};
//!
//! let port: Token<u16> = Token::new("port");
//! let injector = Injector::new([Provider::value(&port, 8080)]);
//! assert_eq!(*injector.get(&port, None).unwrap(), 8080);
//! # }
//! ```

#[cfg(feature = "di")]
pub use halcyon_di::*;
