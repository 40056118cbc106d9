//! Dependency providers

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::component::ComponentId;
use crate::error::{DiError, DiResult};
use crate::token::{ErasedToken, Token};

/// Type-erased instance as stored in injector caches.
///
/// The payload is always an `Rc<T>` for the token's `T`, which keeps trait
/// object tokens (`Token<dyn Logger>`) working.
pub(crate) type Instance = Rc<dyn Any>;

type FactoryFn = Rc<dyn Fn(&Dependencies<'_>) -> DiResult<Instance>>;
type ConstructFn = Rc<dyn Fn(&mut Arguments<'_>) -> DiResult<Instance>>;

pub(crate) fn wrap<T: ?Sized + 'static>(value: Rc<T>) -> Instance {
	Rc::new(value)
}

pub(crate) fn unwrap<T: ?Sized + 'static>(instance: &Instance, token: &str) -> DiResult<Rc<T>> {
	instance
		.downcast_ref::<Rc<T>>()
		.cloned()
		.ok_or_else(|| DiError::TypeMismatch {
			token: token.to_string(),
			expected: std::any::type_name::<T>(),
		})
}

/// Where instances of a provider are cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
	/// One instance per injector.
	#[default]
	Singleton,
	/// One instance per requesting component.
	Component,
}

/// A constructible type with declared constructor dependencies.
///
/// # Examples
///
/// ```
/// use halcyon_di::{Arguments, DiResult, ErasedToken, Injectable, Token};
/// use std::rc::Rc;
///
/// struct Config { url: String }
/// struct Client { config: Rc<Config> }
///
/// impl Injectable for Client {
///     fn dependencies() -> Vec<ErasedToken> {
///         vec![Token::<Config>::of().erased()]
///     }
///
///     fn construct(args: &mut Arguments<'_>) -> DiResult<Self> {
///         Ok(Client { config: args.next()? })
///     }
/// }
/// ```
pub trait Injectable: Sized + 'static {
	/// Constructor dependencies, in declaration order.
	fn dependencies() -> Vec<ErasedToken> {
		Vec::new()
	}

	/// Builds the instance from the resolved constructor arguments.
	fn construct(args: &mut Arguments<'_>) -> DiResult<Self>;
}

/// Converts a shared concrete instance into the type a token addresses.
///
/// Implemented for every type onto itself; implement it (or use
/// [`provide_as!`](crate::provide_as)) to bind an implementation to a
/// trait object token.
pub trait Upcast<S: ?Sized> {
	/// Performs the conversion.
	fn upcast(self: Rc<Self>) -> Rc<S>;
}

impl<T: 'static> Upcast<T> for T {
	fn upcast(self: Rc<Self>) -> Rc<T> {
		self
	}
}

/// Implements [`Upcast`] from a concrete type to a trait object.
///
/// ```
/// use halcyon_di::provide_as;
///
/// trait Logger { fn log(&self, msg: &str); }
/// struct ConsoleLogger;
/// impl Logger for ConsoleLogger { fn log(&self, _msg: &str) {} }
///
/// provide_as!(ConsoleLogger => dyn Logger);
/// ```
#[macro_export]
macro_rules! provide_as {
	($implementation:ty => $interface:ty) => {
		impl $crate::Upcast<$interface> for $implementation {
			fn upcast(self: ::std::rc::Rc<Self>) -> ::std::rc::Rc<$interface> {
				self
			}
		}
	};
}

#[derive(Clone)]
pub(crate) enum Strategy {
	Value(Instance),
	Factory {
		deps: Vec<ErasedToken>,
		factory: FactoryFn,
	},
	Class {
		deps: Vec<ErasedToken>,
		construct: ConstructFn,
	},
}

/// Binds a token to an instantiation strategy.
///
/// # Examples
///
/// ```
/// use halcyon_di::{Injector, Provider, Token};
///
/// let port: Token<u16> = Token::new("port");
/// let address: Token<String> = Token::new("address");
///
/// let injector = Injector::builder()
///     .provider(Provider::value(&port, 8080))
///     .provider(Provider::factory(&address, [port.erased()], {
///         let port = port.clone();
///         move |deps| Ok(format!("127.0.0.1:{}", deps.get(&port)?))
///     }))
///     .build();
///
/// assert_eq!(*injector.get(&address, None).unwrap(), "127.0.0.1:8080");
/// ```
#[derive(Clone)]
pub struct Provider {
	pub(crate) token: ErasedToken,
	pub(crate) scope: Scope,
	pub(crate) strategy: Strategy,
}

impl Provider {
	/// Binds a fixed value.
	pub fn value<T: 'static>(token: &Token<T>, value: T) -> Self {
		Self::value_rc(token, Rc::new(value))
	}

	/// Binds an already shared value, e.g. an `Rc<dyn Trait>`.
	pub fn value_rc<T: ?Sized + 'static>(token: &Token<T>, value: Rc<T>) -> Self {
		Self {
			token: token.erased(),
			scope: Scope::Singleton,
			strategy: Strategy::Value(wrap(value)),
		}
	}

	/// Binds a factory that receives its declared dependencies.
	pub fn factory<T, D, F>(token: &Token<T>, deps: D, factory: F) -> Self
	where
		T: 'static,
		D: IntoIterator<Item = ErasedToken>,
		F: Fn(&Dependencies<'_>) -> DiResult<T> + 'static,
	{
		Self::factory_rc(token, deps, move |resolved| factory(resolved).map(Rc::new))
	}

	/// Binds a factory returning a shared value, e.g. an `Rc<dyn Trait>`.
	pub fn factory_rc<T, D, F>(token: &Token<T>, deps: D, factory: F) -> Self
	where
		T: ?Sized + 'static,
		D: IntoIterator<Item = ErasedToken>,
		F: Fn(&Dependencies<'_>) -> DiResult<Rc<T>> + 'static,
	{
		Self {
			token: token.erased(),
			scope: Scope::Singleton,
			strategy: Strategy::Factory {
				deps: deps.into_iter().collect(),
				factory: Rc::new(move |resolved: &Dependencies<'_>| factory(resolved).map(wrap)),
			},
		}
	}

	/// Binds a constructible type to its own token.
	pub fn class<T: Injectable>(token: &Token<T>) -> Self {
		Self::class_as::<T, T>(token)
	}

	/// Binds a constructible implementation to a (usually trait object) token.
	pub fn class_as<S, I>(token: &Token<S>) -> Self
	where
		S: ?Sized + 'static,
		I: Injectable + Upcast<S>,
	{
		Self {
			token: token.erased(),
			scope: Scope::Singleton,
			strategy: Strategy::Class {
				deps: I::dependencies(),
				construct: Rc::new(|args: &mut Arguments<'_>| {
					let instance = <I as Upcast<S>>::upcast(Rc::new(I::construct(args)?));
					Ok(wrap(instance))
				}),
			},
		}
	}

	/// Sets the caching scope.
	pub fn in_scope(mut self, scope: Scope) -> Self {
		self.scope = scope;
		self
	}

	/// Shorthand for `in_scope(Scope::Component)`.
	pub fn component_scoped(self) -> Self {
		self.in_scope(Scope::Component)
	}

	/// Returns the token this provider is bound to.
	pub fn token(&self) -> ErasedToken {
		self.token
	}

	/// Returns the caching scope.
	pub fn scope(&self) -> Scope {
		self.scope
	}

	/// Returns the declared dependencies (empty for value providers).
	pub fn dependencies(&self) -> &[ErasedToken] {
		match &self.strategy {
			Strategy::Value(_) => &[],
			Strategy::Factory { deps, .. } | Strategy::Class { deps, .. } => deps.as_slice(),
		}
	}

	/// Returns true for fixed-value providers.
	pub fn is_value(&self) -> bool {
		matches!(self.strategy, Strategy::Value(_))
	}
}

impl fmt::Debug for Provider {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let kind = match self.strategy {
			Strategy::Value(_) => "value",
			Strategy::Factory { .. } => "factory",
			Strategy::Class { .. } => "class",
		};
		f.debug_struct("Provider")
			.field("token", &self.token)
			.field("scope", &self.scope)
			.field("kind", &kind)
			.field("dependencies", &self.dependencies())
			.finish()
	}
}

/// Resolved dependencies handed to a factory provider.
pub struct Dependencies<'a> {
	provider: &'a ErasedToken,
	resolved: Vec<(ErasedToken, Instance)>,
}

impl<'a> Dependencies<'a> {
	pub(crate) fn new(provider: &'a ErasedToken, resolved: Vec<(ErasedToken, Instance)>) -> Self {
		Self { provider, resolved }
	}

	/// Returns the resolved instance for a declared dependency.
	pub fn get<T: ?Sized + 'static>(&self, token: &Token<T>) -> DiResult<Rc<T>> {
		let (_, instance) = self
			.resolved
			.iter()
			.find(|(declared, _)| declared.key() == token.key())
			.ok_or_else(|| DiError::UndeclaredDependency {
				token: self.provider.name().to_string(),
				dependency: token.name().to_string(),
			})?;
		unwrap(instance, token.name())
	}

	/// Number of resolved dependencies.
	pub fn len(&self) -> usize {
		self.resolved.len()
	}

	/// Whether the provider declared no dependencies.
	pub fn is_empty(&self) -> bool {
		self.resolved.is_empty()
	}
}

/// Positional constructor arguments for an [`Injectable`].
pub struct Arguments<'a> {
	provider: &'a ErasedToken,
	values: std::vec::IntoIter<(ErasedToken, Instance)>,
	owner: Option<ComponentId>,
}

impl<'a> Arguments<'a> {
	pub(crate) fn new(
		provider: &'a ErasedToken,
		resolved: Vec<(ErasedToken, Instance)>,
		owner: Option<ComponentId>,
	) -> Self {
		Self {
			provider,
			values: resolved.into_iter(),
			owner,
		}
	}

	/// Takes the next argument in declaration order.
	pub fn next<T: ?Sized + 'static>(&mut self) -> DiResult<Rc<T>> {
		let (declared, instance) = self.values.next().ok_or_else(|| {
			DiError::construction(
				self.provider.name(),
				"constructor asked for more arguments than it declared",
			)
		})?;
		unwrap(&instance, declared.name())
	}

	/// Trailing argument: the requesting component, present only for
	/// component-scoped providers.
	pub fn owner(&self) -> Option<ComponentId> {
		self.owner
	}

	/// Number of arguments not yet taken.
	pub fn remaining(&self) -> usize {
		self.values.len()
	}
}
