//! Decorator plugin contract
//!
//! A plugin is a stateless descriptor `{id, phase, priority, execute}`. The
//! host runs the plugins of a phase in ascending priority and interprets the
//! returned [`PluginFlow`]. Failures returned from `execute` (or panics, when
//! enabled) are caught here and never reach sibling plugins.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::{Rc, Weak};

use futures::FutureExt;
use futures::future::{LocalBoxFuture, abortable};

use crate::component::Component;
use crate::config::LifecycleConfig;
use crate::context::ComponentContext;
use crate::descriptor::ComponentDescriptor;
use crate::diagnostics::{Report, Severity};
use crate::error::{HookResult, PluginExecutionError};
use crate::phase::Phase;
use crate::spawner::Spawner;

/// What the host does after a plugin ran.
pub enum PluginFlow {
	/// Run the next plugin.
	Continue,
	/// Stop the phase sequence for this component.
	Halt,
	/// Suspend the phase sequence until the future settles, then apply its flow.
	Suspend(LocalBoxFuture<'static, PluginFlow>),
}

impl fmt::Debug for PluginFlow {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			PluginFlow::Continue => f.write_str("Continue"),
			PluginFlow::Halt => f.write_str("Halt"),
			PluginFlow::Suspend(_) => f.write_str("Suspend(..)"),
		}
	}
}

/// Behavior bound to a lifecycle phase of every component of type `C`.
///
/// # Examples
///
/// ```
/// use halcyon_lifecycle::{
///     Component, DecoratorPlugin, Phase, PluginContext, PluginExecutionError, PluginFlow,
/// };
///
/// struct Announce;
///
/// impl<C: Component> DecoratorPlugin<C> for Announce {
///     fn id(&self) -> &str {
///         "announce"
///     }
///
///     fn phase(&self) -> Phase {
///         Phase::Mounted
///     }
///
///     fn execute(&self, cx: &PluginContext<'_, C>) -> Result<PluginFlow, PluginExecutionError> {
///         cx.context().report(halcyon_lifecycle::Severity::Info, "mounted");
///         Ok(PluginFlow::Continue)
///     }
/// }
/// ```
pub trait DecoratorPlugin<C: Component> {
	/// Unique id within a registry.
	fn id(&self) -> &str;

	/// Phase the plugin runs in.
	fn phase(&self) -> Phase;

	/// Order within the phase; lower runs first.
	fn priority(&self) -> i32 {
		0
	}

	/// Runs the plugin for one component instance.
	fn execute(&self, cx: &PluginContext<'_, C>) -> Result<PluginFlow, PluginExecutionError>;
}

/// Everything a plugin may touch while executing.
pub struct PluginContext<'a, C: Component> {
	plugin: &'a str,
	component: &'a Rc<C>,
	descriptor: &'a ComponentDescriptor<C>,
	context: &'a Rc<ComponentContext>,
	config: &'a LifecycleConfig,
	spawner: &'a Rc<dyn Spawner>,
}

impl<'a, C: Component> PluginContext<'a, C> {
	pub(crate) fn new(
		plugin: &'a str,
		component: &'a Rc<C>,
		descriptor: &'a ComponentDescriptor<C>,
		context: &'a Rc<ComponentContext>,
		config: &'a LifecycleConfig,
		spawner: &'a Rc<dyn Spawner>,
	) -> Self {
		Self {
			plugin,
			component,
			descriptor,
			context,
			config,
			spawner,
		}
	}

	/// Id of the executing plugin.
	pub fn plugin_id(&self) -> &str {
		self.plugin
	}

	/// The component instance.
	pub fn component(&self) -> &Rc<C> {
		self.component
	}

	/// Metadata declared for the component type.
	pub fn descriptor(&self) -> &ComponentDescriptor<C> {
		self.descriptor
	}

	/// The component context.
	pub fn context(&self) -> &Rc<ComponentContext> {
		self.context
	}

	/// Manager configuration.
	pub fn config(&self) -> &LifecycleConfig {
		self.config
	}

	/// Spawns `task`; it is aborted when the component unmounts.
	pub fn spawn(&self, task: impl Future<Output = ()> + 'static) {
		let (task, handle) = abortable(task);
		self.context.on_unmount(move || handle.abort());
		self.spawner.spawn(task.map(|_| ()).boxed_local());
	}

	/// Returns a sink for failures of user code run by this plugin.
	pub fn error_sink(&self) -> ErrorSink<C> {
		ErrorSink {
			plugin: self.plugin.to_string(),
			component: Rc::downgrade(self.component),
			context: Rc::clone(self.context),
			catch_panics: self.config.catch_panics,
			forward: self.config.forward_errors_to_component,
		}
	}
}

/// Runs user code at the plugin boundary and reports its failures.
///
/// Holds the component weakly, so it can live inside subscriptions.
pub struct ErrorSink<C: Component> {
	plugin: String,
	component: Weak<C>,
	context: Rc<ComponentContext>,
	catch_panics: bool,
	forward: bool,
}

impl<C: Component> ErrorSink<C> {
	/// Runs `f` with the component. Failures are reported and yield `None`.
	///
	/// Returns `None` without running `f` once the component is gone.
	pub fn run<T>(&self, label: &str, f: impl FnOnce(&C) -> HookResult<T>) -> Option<T> {
		let component = self.component.upgrade()?;
		let outcome = if self.catch_panics {
			match catch_unwind(AssertUnwindSafe(|| f(&*component))) {
				Ok(outcome) => outcome,
				Err(payload) => {
					self.report(PluginExecutionError::panicked(
						&self.plugin,
						self.context.name(),
						format!("{label}: {}", panic_message(payload.as_ref())),
					));
					return None;
				}
			}
		} else {
			f(&*component)
		};

		match outcome {
			Ok(value) => Some(value),
			Err(error) => {
				self.report(PluginExecutionError::new(
					&self.plugin,
					self.context.name(),
					format!("{label}: {error}"),
				));
				None
			}
		}
	}

	/// Logs `error` and forwards it to the component when enabled.
	pub fn report(&self, error: PluginExecutionError) {
		self.context.diagnostics().report(
			&Report::new(Severity::Error, error.component(), error.to_string())
				.with_plugin(error.plugin()),
		);
		if self.forward
			&& let Some(component) = self.component.upgrade()
		{
			component.report_error(&error);
		}
	}
}

impl<C: Component> Clone for ErrorSink<C> {
	fn clone(&self) -> Self {
		Self {
			plugin: self.plugin.clone(),
			component: Weak::clone(&self.component),
			context: Rc::clone(&self.context),
			catch_panics: self.catch_panics,
			forward: self.forward,
		}
	}
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(message) = payload.downcast_ref::<&str>() {
		(*message).to_string()
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message.clone()
	} else {
		"unknown panic".to_string()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(Box::new("static message"), "static message")]
	#[case(Box::new("owned".to_string()), "owned")]
	#[case(Box::new(42u8), "unknown panic")]
	fn test_panic_message(#[case] payload: Box<dyn Any + Send>, #[case] expected: &str) {
		assert_eq!(panic_message(payload.as_ref()), expected);
	}

	#[rstest]
	fn test_plugin_flow_debug() {
		assert_eq!(format!("{:?}", PluginFlow::Halt), "Halt");
		let suspended = PluginFlow::Suspend(async { PluginFlow::Continue }.boxed_local());
		assert_eq!(format!("{:?}", suspended), "Suspend(..)");
	}
}
