//! Plugin registry
//!
//! Plugins are registered once and applied to every component created by the
//! manager owning the registry.

use std::fmt;
use std::rc::Rc;

use crate::component::Component;
use crate::error::{LifecycleError, LifecycleResult};
use crate::phase::Phase;
use crate::plugin::DecoratorPlugin;
use crate::plugins::{GuardPlugin, MountPlugin, ResolverPlugin, WatchPlugin};

/// Ordered set of decorator plugins, keyed by id.
///
/// # Examples
///
/// ```
/// use halcyon_lifecycle::{Component, Phase, PluginRegistry};
///
/// struct Label;
///
/// impl Component for Label {
///     type View = &'static str;
///
///     fn render(&self) -> &'static str {
///         "label"
///     }
/// }
///
/// let registry = PluginRegistry::<Label>::with_defaults();
/// let ids: Vec<String> = registry
///     .plugins_for(Phase::AfterMount)
///     .iter()
///     .map(|plugin| plugin.id().to_string())
///     .collect();
///
/// assert_eq!(ids, ["watch", "mount"]);
/// ```
pub struct PluginRegistry<C: Component> {
	plugins: Vec<Rc<dyn DecoratorPlugin<C>>>,
}

impl<C: Component> PluginRegistry<C> {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self {
			plugins: Vec::new(),
		}
	}

	/// Creates a registry holding the guard, resolver, watch and mount plugins.
	pub fn with_defaults() -> Self {
		let plugins: Vec<Rc<dyn DecoratorPlugin<C>>> = vec![
			Rc::new(GuardPlugin),
			Rc::new(ResolverPlugin),
			Rc::new(WatchPlugin),
			Rc::new(MountPlugin),
		];
		Self { plugins }
	}

	/// Registers a plugin.
	///
	/// # Errors
	///
	/// [`LifecycleError::AlreadyRegistered`] if a plugin with the same id exists.
	pub fn register(&mut self, plugin: impl DecoratorPlugin<C> + 'static) -> LifecycleResult<()> {
		if self.contains(plugin.id()) {
			return Err(LifecycleError::AlreadyRegistered(plugin.id().to_string()));
		}
		tracing::debug!(
			plugin = plugin.id(),
			phase = %plugin.phase(),
			priority = plugin.priority(),
			"plugin registered"
		);
		self.plugins.push(Rc::new(plugin));
		Ok(())
	}

	/// Removes the plugin with `id`. Returns true if it was registered.
	pub fn unregister(&mut self, id: &str) -> bool {
		let before = self.plugins.len();
		self.plugins.retain(|plugin| plugin.id() != id);
		self.plugins.len() != before
	}

	/// Returns true if a plugin with `id` is registered.
	pub fn contains(&self, id: &str) -> bool {
		self.plugins.iter().any(|plugin| plugin.id() == id)
	}

	/// Registered ids, in registration order.
	pub fn ids(&self) -> Vec<String> {
		self.plugins.iter().map(|plugin| plugin.id().to_string()).collect()
	}

	/// Number of registered plugins.
	pub fn len(&self) -> usize {
		self.plugins.len()
	}

	/// Returns true if no plugin is registered.
	pub fn is_empty(&self) -> bool {
		self.plugins.is_empty()
	}

	/// Plugins of `phase` in ascending priority. Ties keep registration order.
	pub fn plugins_for(&self, phase: Phase) -> Vec<Rc<dyn DecoratorPlugin<C>>> {
		let mut plugins: Vec<_> = self
			.plugins
			.iter()
			.filter(|plugin| plugin.phase() == phase)
			.cloned()
			.collect();
		plugins.sort_by_key(|plugin| plugin.priority());
		plugins
	}
}

impl<C: Component> Default for PluginRegistry<C> {
	fn default() -> Self {
		Self::new()
	}
}

impl<C: Component> fmt::Debug for PluginRegistry<C> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PluginRegistry")
			.field("plugins", &self.ids())
			.finish()
	}
}
