//! Hierarchical injector

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::component::ComponentId;
use crate::cycle_detection::{DEFAULT_MAX_RESOLUTION_DEPTH, ResolutionState};
use crate::error::{DiError, DiResult};
use crate::provider::{Arguments, Dependencies, Instance, Provider, Scope, Strategy, unwrap};
use crate::token::{ErasedToken, Token, TokenKey};

/// A hierarchical, scope-aware dependency container.
///
/// `Injector` is a cheap handle (`Rc`) to shared state. Children hold a weak
/// link to their parent, so a parent must be kept alive by its owner for
/// delegation to work.
///
/// # Examples
///
/// ```
/// use halcyon_di::{Injector, Provider, Token};
///
/// let name: Token<String> = Token::new("name");
/// let root = Injector::builder()
///     .provider(Provider::value(&name, "root".to_string()))
///     .build();
/// let child = root.child().build();
///
/// assert!(child.has(&name));
/// assert_eq!(*child.get(&name, None).unwrap(), "root");
/// ```
#[derive(Clone)]
pub struct Injector {
	inner: Rc<InjectorInner>,
}

struct InjectorInner {
	name: Option<String>,
	providers: HashMap<TokenKey, Provider>,
	singletons: RefCell<HashMap<TokenKey, Instance>>,
	component_instances: RefCell<HashMap<ComponentId, HashMap<TokenKey, Instance>>>,
	resolution: ResolutionState,
	parent: Option<Weak<InjectorInner>>,
}

impl Injector {
	/// Creates a builder for a root injector.
	pub fn builder() -> InjectorBuilder {
		InjectorBuilder::new()
	}

	/// Creates a root injector from a set of providers.
	pub fn new(providers: impl IntoIterator<Item = Provider>) -> Self {
		Self::builder().providers(providers).build()
	}

	/// Creates a builder whose injector delegates to `self`.
	///
	/// The child inherits this injector's resolution depth limit.
	pub fn child(&self) -> InjectorBuilder {
		Self::builder()
			.parent(self)
			.max_resolution_depth(self.inner.resolution_max_depth())
	}

	/// Resolves `token`.
	///
	/// `requester` identifies the component asking; it selects the private
	/// instance map for component-scoped providers.
	///
	/// # Errors
	///
	/// [`DiError::ProviderNotFound`] when neither this injector nor any
	/// ancestor provides the token, [`DiError::CircularDependency`] when the
	/// token is already being resolved, and any error raised by the provider.
	pub fn get<T: ?Sized + 'static>(
		&self,
		token: &Token<T>,
		requester: Option<ComponentId>,
	) -> DiResult<Rc<T>> {
		let instance = self.inner.resolve(token.erased(), requester)?;
		unwrap(&instance, token.name())
	}

	/// Like [`get`](Self::get), but a missing provider yields `Ok(None)`.
	pub fn try_get<T: ?Sized + 'static>(
		&self,
		token: &Token<T>,
		requester: Option<ComponentId>,
	) -> DiResult<Option<Rc<T>>> {
		if !self.has(token) {
			return Ok(None);
		}
		self.get(token, requester).map(Some)
	}

	/// Returns true if a provider for `token` exists here or in any ancestor.
	pub fn has<T: ?Sized + 'static>(&self, token: &Token<T>) -> bool {
		self.inner.has(token.key())
	}

	/// Returns true if this injector itself declares a provider for `token`.
	pub fn provides<T: ?Sized + 'static>(&self, token: &Token<T>) -> bool {
		self.inner.providers.contains_key(&token.key())
	}

	/// Returns the parent injector, if it is still alive.
	pub fn parent(&self) -> Option<Injector> {
		self.inner
			.parent
			.as_ref()
			.and_then(Weak::upgrade)
			.map(|inner| Injector { inner })
	}

	/// Returns the debug name given at construction.
	pub fn name(&self) -> Option<&str> {
		self.inner.name.as_deref()
	}

	/// Number of providers declared by this injector.
	pub fn provider_count(&self) -> usize {
		self.inner.providers.len()
	}

	/// Drops every component-scoped instance created for `component`, in
	/// this injector and its ancestors.
	pub fn release_component(&self, component: ComponentId) {
		let mut current = Some(Rc::clone(&self.inner));
		while let Some(inner) = current {
			let removed = inner.component_instances.borrow_mut().remove(&component);
			if let Some(instances) = removed {
				tracing::trace!(
					injector = inner.label(),
					%component,
					released = instances.len(),
					"released component-scoped instances"
				);
			}
			current = inner.parent.as_ref().and_then(Weak::upgrade);
		}
	}

	/// Returns true if both handles point at the same injector.
	pub fn ptr_eq(&self, other: &Injector) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}
}

impl fmt::Debug for Injector {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Injector")
			.field("name", &self.inner.name)
			.field("providers", &self.inner.providers.len())
			.field("singletons", &self.inner.singletons.borrow().len())
			.field("has_parent", &self.inner.parent.is_some())
			.finish()
	}
}

impl InjectorInner {
	fn label(&self) -> &str {
		self.name.as_deref().unwrap_or("<anonymous>")
	}

	fn resolution_max_depth(&self) -> usize {
		self.resolution.max_depth()
	}

	fn has(&self, key: TokenKey) -> bool {
		if self.providers.contains_key(&key) {
			return true;
		}
		self.parent
			.as_ref()
			.and_then(Weak::upgrade)
			.is_some_and(|parent| parent.has(key))
	}

	fn resolve(&self, token: ErasedToken, requester: Option<ComponentId>) -> DiResult<Instance> {
		let Some(provider) = self.providers.get(&token.key()) else {
			return self.delegate(token, requester);
		};

		if provider.scope == Scope::Component
			&& let Some(owner) = requester
		{
			return self.resolve_component_scoped(provider, owner);
		}

		// Value providers are their own cache entry.
		if let Strategy::Value(value) = &provider.strategy {
			return Ok(Rc::clone(value));
		}

		if let Some(cached) = self.singletons.borrow().get(&token.key()) {
			tracing::trace!(injector = self.label(), token = %token, "singleton cache hit");
			return Ok(Rc::clone(cached));
		}

		let instance = {
			let _guard = self.resolution.begin(token)?;
			tracing::debug!(injector = self.label(), token = %token, "instantiating singleton");
			self.instantiate(provider, None)?
		};
		self.singletons
			.borrow_mut()
			.insert(token.key(), Rc::clone(&instance));
		Ok(instance)
	}

	fn resolve_component_scoped(
		&self,
		provider: &Provider,
		owner: ComponentId,
	) -> DiResult<Instance> {
		let token = provider.token;
		let cached = self
			.component_instances
			.borrow()
			.get(&owner)
			.and_then(|instances| instances.get(&token.key()).cloned());
		if let Some(cached) = cached {
			tracing::trace!(injector = self.label(), token = %token, %owner, "component cache hit");
			return Ok(cached);
		}

		let instance = {
			let _guard = self.resolution.begin(token)?;
			tracing::debug!(
				injector = self.label(),
				token = %token,
				%owner,
				"instantiating component-scoped instance"
			);
			self.instantiate(provider, Some(owner))?
		};
		self.component_instances
			.borrow_mut()
			.entry(owner)
			.or_default()
			.insert(token.key(), Rc::clone(&instance));
		Ok(instance)
	}

	fn delegate(&self, token: ErasedToken, requester: Option<ComponentId>) -> DiResult<Instance> {
		match self.parent.as_ref().and_then(Weak::upgrade) {
			Some(parent) => {
				tracing::trace!(injector = self.label(), token = %token, "delegating to parent");
				parent.resolve(token, requester)
			}
			None => Err(DiError::ProviderNotFound {
				token: token.name().to_string(),
			}),
		}
	}

	fn instantiate(&self, provider: &Provider, owner: Option<ComponentId>) -> DiResult<Instance> {
		match &provider.strategy {
			Strategy::Value(value) => Ok(Rc::clone(value)),
			Strategy::Factory { deps, factory } => {
				let resolved = self.resolve_all(deps, owner)?;
				factory(&Dependencies::new(&provider.token, resolved))
			}
			Strategy::Class { deps, construct } => {
				let resolved = self.resolve_all(deps, owner)?;
				let trailing = match provider.scope {
					Scope::Component => owner,
					Scope::Singleton => None,
				};
				construct(&mut Arguments::new(&provider.token, resolved, trailing))
			}
		}
	}

	fn resolve_all(
		&self,
		deps: &[ErasedToken],
		owner: Option<ComponentId>,
	) -> DiResult<Vec<(ErasedToken, Instance)>> {
		deps.iter()
			.map(|dep| self.resolve(*dep, owner).map(|instance| (*dep, instance)))
			.collect()
	}
}

/// Builder for [`Injector`].
pub struct InjectorBuilder {
	name: Option<String>,
	providers: Vec<Provider>,
	parent: Option<Injector>,
	max_depth: usize,
}

impl InjectorBuilder {
	/// Creates an empty builder.
	pub fn new() -> Self {
		Self {
			name: None,
			providers: Vec::new(),
			parent: None,
			max_depth: DEFAULT_MAX_RESOLUTION_DEPTH,
		}
	}

	/// Sets a debug name used in logs.
	pub fn name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	/// Adds a provider.
	pub fn provider(mut self, provider: Provider) -> Self {
		self.providers.push(provider);
		self
	}

	/// Adds several providers.
	pub fn providers(mut self, providers: impl IntoIterator<Item = Provider>) -> Self {
		self.providers.extend(providers);
		self
	}

	/// Sets the parent injector.
	pub fn parent(mut self, parent: &Injector) -> Self {
		self.parent = Some(parent.clone());
		self
	}

	/// Sets the maximum resolution depth.
	pub fn max_resolution_depth(mut self, depth: usize) -> Self {
		self.max_depth = depth;
		self
	}

	/// Builds the injector. A later provider for the same token replaces an
	/// earlier one.
	pub fn build(self) -> Injector {
		let mut providers = HashMap::with_capacity(self.providers.len());
		for provider in self.providers {
			let token = provider.token;
			if providers.insert(token.key(), provider).is_some() {
				tracing::warn!(token = %token, "provider registered twice, keeping the last one");
			}
		}

		Injector {
			inner: Rc::new(InjectorInner {
				name: self.name,
				providers,
				singletons: RefCell::new(HashMap::new()),
				component_instances: RefCell::new(HashMap::new()),
				resolution: ResolutionState::new(self.max_depth),
				parent: self.parent.as_ref().map(|p| Rc::downgrade(&p.inner)),
			}),
		}
	}
}

impl Default for InjectorBuilder {
	fn default() -> Self {
		Self::new()
	}
}
