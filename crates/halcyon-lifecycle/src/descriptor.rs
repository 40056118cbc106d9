//! Component descriptors
//!
//! A [`ComponentDescriptor`] is the decorator metadata of a component type:
//! providers, mount hooks, watched properties, watch handlers, guards and
//! resolvers. It is built once per type and shared by every instance.

use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use halcyon_di::{DiResult, Provider, Token};
use halcyon_reactive::AnySignal;

use crate::component::Component;
use crate::context::{ComponentContext, EmptyFn};
use crate::error::{HookResult, LifecycleError, LifecycleResult};
use crate::plugins::guard::CanActivate;
use crate::plugins::resolver::{ErasedResolution, Resolve};
use crate::plugins::watch::WatchValues;

/// Cleanup returned by a mount hook, run once on unmount.
pub type Cleanup = Box<dyn FnOnce()>;

type MountFn<C> = Rc<dyn Fn(&C, &Rc<ComponentContext>) -> HookResult<Option<Cleanup>>>;
type PropertyFn<C> = Rc<dyn Fn(&C) -> AnySignal>;
type HandlerFn<C> = Rc<dyn Fn(&C, &WatchValues) -> HookResult>;
type FallbackFn<C> = Rc<dyn Fn(&C) -> <C as Component>::View>;
pub(crate) type ResolveFn = Rc<dyn Fn(&ComponentContext) -> DiResult<ErasedResolution>>;

/// A mount hook.
pub struct MountHook<C: Component> {
	pub(crate) name: String,
	pub(crate) hook: MountFn<C>,
}

impl<C: Component> MountHook<C> {
	/// Hook name used in reports.
	pub fn name(&self) -> &str {
		&self.name
	}
}

/// A property that can be watched.
pub struct PropertyDecl<C: Component> {
	pub(crate) name: String,
	pub(crate) read: PropertyFn<C>,
}

impl<C: Component> PropertyDecl<C> {
	/// Property name.
	pub fn name(&self) -> &str {
		&self.name
	}
}

/// One watched source of a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchDecl {
	pub(crate) property: String,
	pub(crate) path: Option<String>,
	pub(crate) handler: String,
}

impl WatchDecl {
	/// Watched property.
	pub fn property(&self) -> &str {
		&self.property
	}

	/// Nested path inside the property, if any.
	pub fn path(&self) -> Option<&str> {
		self.path.as_deref()
	}

	/// Handler receiving the values.
	pub fn handler(&self) -> &str {
		&self.handler
	}
}

/// A watch handler.
pub struct HandlerDecl<C: Component> {
	pub(crate) name: String,
	pub(crate) skip_initial: bool,
	pub(crate) call: HandlerFn<C>,
}

impl<C: Component> HandlerDecl<C> {
	/// Handler name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Whether the emission produced while the watch is established is dropped.
	pub fn skip_initial(&self) -> bool {
		self.skip_initial
	}
}

/// A guard binding.
pub struct GuardDecl<C: Component> {
	pub(crate) token: Token<dyn CanActivate>,
	pub(crate) fallback: Option<FallbackFn<C>>,
}

impl<C: Component> GuardDecl<C> {
	/// Token the guard is resolved with.
	pub fn token(&self) -> &Token<dyn CanActivate> {
		&self.token
	}

	/// Renders the fallback for a blocked component.
	pub fn fallback(&self, component: &C) -> Option<C::View> {
		self.fallback.as_ref().map(|fallback| fallback(component))
	}
}

/// A resolver binding.
pub struct ResolverDecl {
	pub(crate) key: String,
	pub(crate) run: ResolveFn,
	pub(crate) is_empty: Option<EmptyFn>,
}

impl ResolverDecl {
	/// Key the value is published under.
	pub fn key(&self) -> &str {
		&self.key
	}
}

macro_rules! impl_rc_clone {
	($name:ident { $($field:ident),* }) => {
		impl<C: Component> Clone for $name<C> {
			fn clone(&self) -> Self {
				Self { $($field: self.$field.clone()),* }
			}
		}
	};
}

impl_rc_clone!(MountHook { name, hook });
impl_rc_clone!(PropertyDecl { name, read });
impl_rc_clone!(HandlerDecl { name, skip_initial, call });
impl_rc_clone!(GuardDecl { token, fallback });

impl Clone for ResolverDecl {
	fn clone(&self) -> Self {
		Self {
			key: self.key.clone(),
			run: Rc::clone(&self.run),
			is_empty: self.is_empty.clone(),
		}
	}
}

/// Decorator metadata of a component type.
pub struct ComponentDescriptor<C: Component> {
	name: String,
	providers: Vec<Provider>,
	mounts: Vec<MountHook<C>>,
	properties: Vec<PropertyDecl<C>>,
	watches: Vec<WatchDecl>,
	handlers: Vec<HandlerDecl<C>>,
	guards: Vec<GuardDecl<C>>,
	resolvers: Vec<ResolverDecl>,
}

impl<C: Component> ComponentDescriptor<C> {
	/// Starts a descriptor for the component called `name`.
	pub fn builder(name: impl Into<String>) -> ComponentDescriptorBuilder<C> {
		ComponentDescriptorBuilder::new(name)
	}

	/// Component name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Providers of the component injector.
	pub fn providers(&self) -> &[Provider] {
		&self.providers
	}

	/// Mount hooks in declaration order.
	pub fn mount_hooks(&self) -> &[MountHook<C>] {
		&self.mounts
	}

	/// Watchable properties.
	pub fn properties(&self) -> &[PropertyDecl<C>] {
		&self.properties
	}

	/// Watch declarations in declaration order.
	pub fn watches(&self) -> &[WatchDecl] {
		&self.watches
	}

	/// Watch handlers.
	pub fn handlers(&self) -> &[HandlerDecl<C>] {
		&self.handlers
	}

	/// Guards in evaluation order.
	pub fn guards(&self) -> &[GuardDecl<C>] {
		&self.guards
	}

	/// Resolvers in declaration order.
	pub fn resolvers(&self) -> &[ResolverDecl] {
		&self.resolvers
	}

	/// Looks up a property by name.
	pub fn property(&self, name: &str) -> Option<&PropertyDecl<C>> {
		self.properties.iter().find(|property| property.name == name)
	}

	/// Looks up a handler by name.
	pub fn handler(&self, name: &str) -> Option<&HandlerDecl<C>> {
		self.handlers.iter().find(|handler| handler.name == name)
	}
}

impl<C: Component> fmt::Debug for ComponentDescriptor<C> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ComponentDescriptor")
			.field("name", &self.name)
			.field("providers", &self.providers.len())
			.field("mounts", &self.mounts.len())
			.field("watches", &self.watches)
			.field("guards", &self.guards.len())
			.field(
				"resolvers",
				&self.resolvers.iter().map(ResolverDecl::key).collect::<Vec<_>>(),
			)
			.finish()
	}
}

/// Builder for [`ComponentDescriptor`].
///
/// # Examples
///
/// ```
/// use halcyon_lifecycle::{Component, ComponentDescriptor};
/// use halcyon_reactive::Signal;
///
/// struct Counter {
///     count: Signal<u32>,
/// }
///
/// impl Component for Counter {
///     type View = String;
///
///     fn render(&self) -> String {
///         format!("{}", self.count.value().unwrap_or_default())
///     }
/// }
///
/// let descriptor = ComponentDescriptor::<Counter>::builder("Counter")
///     .property("count", |c: &Counter| c.count.erase_json())
///     .handler("log_count", |_c: &Counter, values| {
///         println!("count is now {:?}", values.json(0));
///         Ok(())
///     })
///     .watch("count", "log_count")
///     .build()
///     .unwrap();
///
/// assert_eq!(descriptor.watches().len(), 1);
/// ```
pub struct ComponentDescriptorBuilder<C: Component> {
	descriptor: ComponentDescriptor<C>,
}

impl<C: Component> ComponentDescriptorBuilder<C> {
	fn new(name: impl Into<String>) -> Self {
		Self {
			descriptor: ComponentDescriptor {
				name: name.into(),
				providers: Vec::new(),
				mounts: Vec::new(),
				properties: Vec::new(),
				watches: Vec::new(),
				handlers: Vec::new(),
				guards: Vec::new(),
				resolvers: Vec::new(),
			},
		}
	}

	/// Adds a provider to the component injector.
	pub fn provider(mut self, provider: Provider) -> Self {
		self.descriptor.providers.push(provider);
		self
	}

	/// Adds a mount hook. A returned cleanup runs once on unmount.
	pub fn mount<F>(mut self, name: impl Into<String>, hook: F) -> Self
	where
		F: Fn(&C, &Rc<ComponentContext>) -> HookResult<Option<Cleanup>> + 'static,
	{
		self.descriptor.mounts.push(MountHook {
			name: name.into(),
			hook: Rc::new(hook),
		});
		self
	}

	/// Declares a watchable property.
	pub fn property<F>(mut self, name: impl Into<String>, read: F) -> Self
	where
		F: Fn(&C) -> AnySignal + 'static,
	{
		self.descriptor.properties.push(PropertyDecl {
			name: name.into(),
			read: Rc::new(read),
		});
		self
	}

	/// Watches a property with a handler.
	pub fn watch(mut self, property: impl Into<String>, handler: impl Into<String>) -> Self {
		self.descriptor.watches.push(WatchDecl {
			property: property.into(),
			path: None,
			handler: handler.into(),
		});
		self
	}

	/// Watches a nested path (e.g. `"filter.page"`) of a property with a handler.
	pub fn watch_path(
		mut self,
		property: impl Into<String>,
		path: impl Into<String>,
		handler: impl Into<String>,
	) -> Self {
		self.descriptor.watches.push(WatchDecl {
			property: property.into(),
			path: Some(path.into()),
			handler: handler.into(),
		});
		self
	}

	/// Declares a watch handler.
	pub fn handler<F>(self, name: impl Into<String>, call: F) -> Self
	where
		F: Fn(&C, &WatchValues) -> HookResult + 'static,
	{
		self.push_handler(name.into(), false, Rc::new(call))
	}

	/// Declares a watch handler that ignores the emission produced while the
	/// watch is being established.
	pub fn handler_skip_initial<F>(self, name: impl Into<String>, call: F) -> Self
	where
		F: Fn(&C, &WatchValues) -> HookResult + 'static,
	{
		self.push_handler(name.into(), true, Rc::new(call))
	}

	fn push_handler(mut self, name: String, skip_initial: bool, call: HandlerFn<C>) -> Self {
		self.descriptor.handlers.push(HandlerDecl {
			name,
			skip_initial,
			call,
		});
		self
	}

	/// Adds a guard without a fallback view.
	pub fn guard(mut self, token: Token<dyn CanActivate>) -> Self {
		self.descriptor.guards.push(GuardDecl {
			token,
			fallback: None,
		});
		self
	}

	/// Adds a guard rendering `fallback` when it denies activation.
	pub fn guard_with_fallback<F>(mut self, token: Token<dyn CanActivate>, fallback: F) -> Self
	where
		F: Fn(&C) -> C::View + 'static,
	{
		self.descriptor.guards.push(GuardDecl {
			token,
			fallback: Some(Rc::new(fallback)),
		});
		self
	}

	/// Adds a resolver publishing its value under `key`.
	pub fn resolver<T: 'static>(
		mut self,
		key: impl Into<String>,
		token: Token<dyn Resolve<Output = T>>,
	) -> Self {
		self.descriptor.resolvers.push(ResolverDecl {
			key: key.into(),
			run: erase_resolver(token),
			is_empty: None,
		});
		self
	}

	/// Adds a resolver whose value renders the empty state when `is_empty` holds.
	pub fn resolver_with_empty<T: 'static, F>(
		mut self,
		key: impl Into<String>,
		token: Token<dyn Resolve<Output = T>>,
		is_empty: F,
	) -> Self
	where
		F: Fn(&T) -> bool + 'static,
	{
		let is_empty: EmptyFn = Rc::new(move |value: &dyn Any| {
			value.downcast_ref::<T>().is_some_and(|value| is_empty(value))
		});
		self.descriptor.resolvers.push(ResolverDecl {
			key: key.into(),
			run: erase_resolver(token),
			is_empty: Some(is_empty),
		});
		self
	}

	/// Validates the metadata and builds the descriptor.
	///
	/// # Errors
	///
	/// [`LifecycleError::UnknownProperty`] or [`LifecycleError::UnknownHandler`]
	/// for dangling watch declarations, and
	/// [`LifecycleError::DuplicateResolver`] for repeated resolver keys.
	pub fn build(self) -> LifecycleResult<ComponentDescriptor<C>> {
		let descriptor = self.descriptor;
		for watch in &descriptor.watches {
			if descriptor.property(&watch.property).is_none() {
				return Err(LifecycleError::UnknownProperty {
					component: descriptor.name.clone(),
					property: watch.property.clone(),
				});
			}
			if descriptor.handler(&watch.handler).is_none() {
				return Err(LifecycleError::UnknownHandler {
					component: descriptor.name.clone(),
					handler: watch.handler.clone(),
				});
			}
		}

		let mut keys = HashSet::new();
		for resolver in &descriptor.resolvers {
			if !keys.insert(resolver.key.as_str()) {
				return Err(LifecycleError::DuplicateResolver {
					component: descriptor.name.clone(),
					key: resolver.key.clone(),
				});
			}
		}

		Ok(descriptor)
	}
}

fn erase_resolver<T: 'static>(token: Token<dyn Resolve<Output = T>>) -> ResolveFn {
	Rc::new(move |context: &ComponentContext| {
		let resolver = context.inject(&token)?;
		Ok(ErasedResolution::from(resolver.resolve(context)))
	})
}
