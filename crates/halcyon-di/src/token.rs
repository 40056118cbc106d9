//! Tokens address dependencies by identity.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of a token.
///
/// Type tokens are keyed by [`TypeId`]; symbolic tokens get a process-unique
/// number at creation, so two symbols with the same name never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TokenKey {
	/// Token derived from a Rust type.
	Type(TypeId),
	/// Token created from a symbolic name.
	Symbol(u64),
}

impl TokenKey {
	fn next_symbol() -> Self {
		static COUNTER: AtomicU64 = AtomicU64::new(0);
		Self::Symbol(COUNTER.fetch_add(1, Ordering::Relaxed))
	}
}

/// A typed handle used to register and resolve a dependency.
///
/// `T` is the type handed out by the injector (as `Rc<T>`). It may be a
/// trait object, e.g. `Token<dyn Logger>`.
///
/// # Examples
///
/// ```
/// use halcyon_di::Token;
///
/// let a: Token<String> = Token::new("greeting");
/// let b: Token<String> = Token::new("greeting");
///
/// // Same name, different identity
/// assert_ne!(a, b);
/// assert_eq!(a, a.clone());
/// ```
pub struct Token<T: ?Sized + 'static> {
	key: TokenKey,
	name: &'static str,
	_marker: PhantomData<fn() -> Rc<T>>,
}

impl<T: ?Sized + 'static> Token<T> {
	/// Creates a symbolic token with a fresh identity.
	pub fn new(name: &'static str) -> Self {
		Self {
			key: TokenKey::next_symbol(),
			name,
			_marker: PhantomData,
		}
	}

	/// Creates the type token for `T`.
	///
	/// Every call returns a token with the same identity.
	pub fn of() -> Self {
		Self {
			key: TokenKey::Type(TypeId::of::<T>()),
			name: std::any::type_name::<T>(),
			_marker: PhantomData,
		}
	}

	/// Returns the identity of this token.
	pub fn key(&self) -> TokenKey {
		self.key
	}

	/// Returns the display name of this token.
	pub fn name(&self) -> &'static str {
		self.name
	}

	/// Drops the type parameter, keeping identity and name.
	pub fn erased(&self) -> ErasedToken {
		ErasedToken {
			key: self.key,
			name: self.name,
		}
	}
}

impl<T: ?Sized + 'static> Clone for Token<T> {
	fn clone(&self) -> Self {
		Self {
			key: self.key,
			name: self.name,
			_marker: PhantomData,
		}
	}
}

impl<T: ?Sized + 'static> PartialEq for Token<T> {
	fn eq(&self, other: &Self) -> bool {
		self.key == other.key
	}
}

impl<T: ?Sized + 'static> Eq for Token<T> {}

impl<T: ?Sized + 'static> Hash for Token<T> {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.key.hash(state);
	}
}

impl<T: ?Sized + 'static> fmt::Debug for Token<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Token")
			.field("name", &self.name)
			.field("key", &self.key)
			.finish()
	}
}

impl<T: ?Sized + 'static> fmt::Display for Token<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name)
	}
}

/// A token without its type parameter, used for dependency lists.
#[derive(Debug, Clone, Copy)]
pub struct ErasedToken {
	key: TokenKey,
	name: &'static str,
}

impl ErasedToken {
	/// Returns the identity of this token.
	pub fn key(&self) -> TokenKey {
		self.key
	}

	/// Returns the display name of this token.
	pub fn name(&self) -> &'static str {
		self.name
	}
}

impl PartialEq for ErasedToken {
	fn eq(&self, other: &Self) -> bool {
		self.key == other.key
	}
}

impl Eq for ErasedToken {}

impl Hash for ErasedToken {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.key.hash(state);
	}
}

impl fmt::Display for ErasedToken {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name)
	}
}

impl<T: ?Sized + 'static> From<&Token<T>> for ErasedToken {
	fn from(token: &Token<T>) -> Self {
		token.erased()
	}
}

impl<T: ?Sized + 'static> From<Token<T>> for ErasedToken {
	fn from(token: Token<T>) -> Self {
		token.erased()
	}
}
