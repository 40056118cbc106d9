//! Lifecycle error types.
//!
//! Registry and host misuse surfaces as [`LifecycleError`]. Failures inside
//! plugins never propagate: they become [`PluginExecutionError`] values that
//! are reported and forwarded to the component. Guard and resolver outcomes
//! are render states, with [`ResolverError`] describing a failed resolver.

use std::fmt;

use halcyon_di::DiError;
use thiserror::Error;

/// Result type for lifecycle operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Result type returned by user hooks and handlers.
pub type HookResult<T = ()> = Result<T, HookError>;

/// Lifecycle errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum LifecycleError {
	/// Plugin id already present in the registry.
	#[error("plugin already registered: {0}")]
	AlreadyRegistered(String),

	/// A watch declaration names a property the descriptor does not declare.
	#[error("component '{component}' watches unknown property '{property}'")]
	UnknownProperty {
		/// Component name.
		component: String,
		/// Property name.
		property: String,
	},

	/// A watch declaration names a handler the descriptor does not declare.
	#[error("component '{component}' watches with unknown handler '{handler}'")]
	UnknownHandler {
		/// Component name.
		component: String,
		/// Handler name.
		handler: String,
	},

	/// Two resolvers share the same key.
	#[error("component '{component}' declares resolver '{key}' twice")]
	DuplicateResolver {
		/// Component name.
		component: String,
		/// Resolver key.
		key: String,
	},

	/// The component factory failed to resolve a dependency.
	#[error("failed to create component '{component}': {source}")]
	Creation {
		/// Component name.
		component: String,
		/// Underlying injection error.
		#[source]
		source: DiError,
	},
}

/// Failure of a plugin, caught at the plugin boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("plugin '{plugin}' failed in component '{component}': {message}")]
pub struct PluginExecutionError {
	plugin: String,
	component: String,
	message: String,
	panicked: bool,
}

impl PluginExecutionError {
	/// Creates an error for a failure returned by a hook or handler.
	pub fn new(
		plugin: impl Into<String>,
		component: impl Into<String>,
		message: impl Into<String>,
	) -> Self {
		Self {
			plugin: plugin.into(),
			component: component.into(),
			message: message.into(),
			panicked: false,
		}
	}

	/// Creates an error for a panic caught at the plugin boundary.
	pub fn panicked(
		plugin: impl Into<String>,
		component: impl Into<String>,
		message: impl Into<String>,
	) -> Self {
		Self {
			panicked: true,
			..Self::new(plugin, component, message)
		}
	}

	/// Id of the plugin that failed.
	pub fn plugin(&self) -> &str {
		&self.plugin
	}

	/// Name of the component the plugin ran for.
	pub fn component(&self) -> &str {
		&self.component
	}

	/// Failure description.
	pub fn message(&self) -> &str {
		&self.message
	}

	/// Whether the failure was a panic.
	pub fn is_panic(&self) -> bool {
		self.panicked
	}
}

/// A resolver that ended in failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("resolver '{key}' failed: {message}")]
pub struct ResolverError {
	key: String,
	message: String,
}

impl ResolverError {
	/// Creates a resolver failure.
	pub fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			key: key.into(),
			message: message.into(),
		}
	}

	/// Key of the failed resolver.
	pub fn key(&self) -> &str {
		&self.key
	}

	/// Failure description.
	pub fn message(&self) -> &str {
		&self.message
	}
}

/// Error returned by user hooks, handlers and resolvers.
///
/// Any [`std::error::Error`] converts into it, so `?` works inside hooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookError {
	message: String,
}

impl HookError {
	/// Creates an error from a message.
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
		}
	}

	/// Failure description.
	pub fn message(&self) -> &str {
		&self.message
	}
}

impl fmt::Display for HookError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.message)
	}
}

impl<E: std::error::Error> From<E> for HookError {
	fn from(error: E) -> Self {
		Self::new(error.to_string())
	}
}
