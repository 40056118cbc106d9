//! Lifecycle manager
//!
//! The manager owns the plugin registry and the runtime configuration, and
//! creates [`ComponentHost`]s. Creating a component builds its injector,
//! picks a diagnostics sink, runs the factory and then the `Created` plugins.

use std::fmt;
use std::rc::Rc;

use halcyon_di::{ComponentId, DiResult, Injector};

use crate::component::Component;
use crate::config::LifecycleConfig;
use crate::context::ComponentContext;
use crate::descriptor::ComponentDescriptor;
use crate::diagnostics::{Diagnostics, TracingDiagnostics, diagnostics_token};
use crate::error::{LifecycleError, LifecycleResult};
use crate::host::ComponentHost;
use crate::registry::PluginRegistry;
use crate::spawner::{Spawner, TokioSpawner};

/// Creates components and drives them through their lifecycle.
pub struct LifecycleManager<C: Component> {
	registry: Rc<PluginRegistry<C>>,
	config: LifecycleConfig,
	spawner: Rc<dyn Spawner>,
	diagnostics: Option<Rc<dyn Diagnostics>>,
}

impl<C: Component> LifecycleManager<C> {
	/// Creates a manager applying the plugins of `registry`.
	pub fn new(registry: PluginRegistry<C>) -> Self {
		Self {
			registry: Rc::new(registry),
			config: LifecycleConfig::default(),
			spawner: Rc::new(TokioSpawner),
			diagnostics: None,
		}
	}

	/// Creates a manager with the built-in plugins.
	pub fn with_defaults() -> Self {
		Self::new(PluginRegistry::with_defaults())
	}

	/// Replaces the configuration.
	pub fn with_config(mut self, config: LifecycleConfig) -> Self {
		self.config = config;
		self
	}

	/// Replaces the spawner used for deferred guards and resolvers.
	///
	/// Defaults to [`TokioSpawner`].
	pub fn with_spawner(mut self, spawner: impl Spawner + 'static) -> Self {
		self.spawner = Rc::new(spawner);
		self
	}

	/// Sets the diagnostics sink used when a component injector provides none.
	pub fn with_diagnostics(mut self, diagnostics: Rc<dyn Diagnostics>) -> Self {
		self.diagnostics = Some(diagnostics);
		self
	}

	/// The configuration in use.
	pub fn config(&self) -> &LifecycleConfig {
		&self.config
	}

	/// The plugin registry.
	pub fn registry(&self) -> &PluginRegistry<C> {
		&self.registry
	}

	/// Creates a component instance and runs its `Created` phase.
	///
	/// The component injector is a child of `parent` holding the descriptor's
	/// providers. Without providers the component shares `parent` (or an empty
	/// root injector). `factory` receives the context before the instance exists,
	/// so it can inject the component's dependencies.
	///
	/// # Errors
	///
	/// [`LifecycleError::Creation`] if the factory fails to resolve a dependency.
	pub fn create<F>(
		&self,
		descriptor: &Rc<ComponentDescriptor<C>>,
		parent: Option<&Injector>,
		factory: F,
	) -> LifecycleResult<ComponentHost<C>>
	where
		F: FnOnce(&Rc<ComponentContext>) -> DiResult<C>,
	{
		let injector = self.component_injector(descriptor, parent);
		let diagnostics = self.diagnostics_for(&injector);
		let context = Rc::new(ComponentContext::new(
			ComponentId::next(),
			descriptor.name(),
			injector,
			diagnostics,
		));

		let component = match factory(&context) {
			Ok(component) => Rc::new(component),
			Err(source) => {
				context.injector().release_component(context.id());
				tracing::warn!(component = descriptor.name(), error = %source, "component creation failed");
				return Err(LifecycleError::Creation {
					component: descriptor.name().to_string(),
					source,
				});
			}
		};

		tracing::debug!(component = descriptor.name(), id = %context.id(), "component created");
		let host = ComponentHost::new(
			component,
			Rc::clone(descriptor),
			context,
			Rc::clone(&self.registry),
			self.config.clone(),
			Rc::clone(&self.spawner),
		);
		host.run_created();
		Ok(host)
	}

	fn component_injector(
		&self,
		descriptor: &ComponentDescriptor<C>,
		parent: Option<&Injector>,
	) -> Injector {
		if descriptor.providers().is_empty()
			&& let Some(parent) = parent
		{
			return parent.clone();
		}

		let builder = match parent {
			Some(parent) => parent.child(),
			None => Injector::builder(),
		};
		builder
			.name(descriptor.name())
			.providers(descriptor.providers().iter().cloned())
			.max_resolution_depth(self.config.max_resolution_depth)
			.build()
	}

	fn diagnostics_for(&self, injector: &Injector) -> Rc<dyn Diagnostics> {
		match injector.try_get(&diagnostics_token(), None) {
			Ok(Some(diagnostics)) => return diagnostics,
			Ok(None) => {}
			Err(error) => {
				tracing::warn!(%error, "diagnostics provider failed, using the default sink");
			}
		}
		match &self.diagnostics {
			Some(diagnostics) => Rc::clone(diagnostics),
			None => Rc::new(TracingDiagnostics::new(self.config.diagnostics_level)),
		}
	}
}

impl<C: Component> fmt::Debug for LifecycleManager<C> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LifecycleManager")
			.field("registry", &self.registry)
			.field("config", &self.config)
			.finish_non_exhaustive()
	}
}
