//! Component hosts
//!
//! A [`ComponentHost`] owns one component instance and walks it through
//! `Created -> BeforeMount -> Mounted -> AfterMount`, then `Unmount`. Within a
//! phase the plugins run in ascending priority. A plugin may halt the sequence
//! (a denied guard) or suspend it until a future settles (a deferred guard);
//! suspended work is aborted when the component unmounts.

use std::cell::Cell;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use futures::FutureExt;
use futures::future::{LocalBoxFuture, abortable};

use crate::component::Component;
use crate::config::LifecycleConfig;
use crate::context::{ComponentContext, GuardState};
use crate::descriptor::ComponentDescriptor;
use crate::error::PluginExecutionError;
use crate::phase::{Phase, RenderState};
use crate::plugin::{DecoratorPlugin, PluginContext, PluginFlow, panic_message};
use crate::registry::PluginRegistry;
use crate::spawner::Spawner;

/// Progress of a host through its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostStatus {
	/// Created, not mounted yet.
	Created,
	/// Running mount phases.
	Mounting,
	/// Waiting for a plugin future before continuing.
	Suspended,
	/// A plugin stopped the phase sequence.
	Halted,
	/// Every mount phase ran.
	Active,
	/// Unmounted. Terminal.
	Unmounted,
}

struct HostInner<C: Component> {
	component: Rc<C>,
	descriptor: Rc<ComponentDescriptor<C>>,
	context: Rc<ComponentContext>,
	registry: Rc<PluginRegistry<C>>,
	config: LifecycleConfig,
	spawner: Rc<dyn Spawner>,
	phase: Cell<Phase>,
	status: Cell<HostStatus>,
}

/// A live component instance.
///
/// Dropping the host unmounts the component.
pub struct ComponentHost<C: Component> {
	inner: Rc<HostInner<C>>,
}

impl<C: Component> ComponentHost<C> {
	pub(crate) fn new(
		component: Rc<C>,
		descriptor: Rc<ComponentDescriptor<C>>,
		context: Rc<ComponentContext>,
		registry: Rc<PluginRegistry<C>>,
		config: LifecycleConfig,
		spawner: Rc<dyn Spawner>,
	) -> Self {
		Self {
			inner: Rc::new(HostInner {
				component,
				descriptor,
				context,
				registry,
				config,
				spawner,
				phase: Cell::new(Phase::Created),
				status: Cell::new(HostStatus::Created),
			}),
		}
	}

	pub(crate) fn run_created(&self) {
		let inner = &self.inner;
		for plugin in inner.registry.plugins_for(Phase::Created) {
			if let PluginFlow::Halt | PluginFlow::Suspend(_) = inner.execute(plugin.as_ref()) {
				tracing::debug!(
					component = inner.context.name(),
					plugin = plugin.id(),
					"creation halted"
				);
				inner.status.set(HostStatus::Halted);
				return;
			}
		}
	}

	/// Runs the mount phases.
	///
	/// Only the first call has an effect; later calls (re-renders) are ignored.
	pub fn mount(&self) {
		let inner = &self.inner;
		match inner.status.get() {
			HostStatus::Created => {
				inner.status.set(HostStatus::Mounting);
				inner.drive(Phase::BeforeMount, 0);
			}
			HostStatus::Unmounted => {
				tracing::warn!(component = inner.context.name(), "mount after unmount ignored");
			}
			status => {
				tracing::trace!(component = inner.context.name(), ?status, "mount ignored");
			}
		}
	}

	/// Unmounts the component. Safe to call more than once.
	pub fn unmount(&self) {
		self.inner.unmount();
	}

	/// The component instance.
	pub fn component(&self) -> &Rc<C> {
		&self.inner.component
	}

	/// The component context.
	pub fn context(&self) -> &Rc<ComponentContext> {
		&self.inner.context
	}

	/// The component descriptor.
	pub fn descriptor(&self) -> &ComponentDescriptor<C> {
		&self.inner.descriptor
	}

	/// Last phase entered.
	pub fn phase(&self) -> Phase {
		self.inner.phase.get()
	}

	/// Lifecycle progress.
	pub fn status(&self) -> HostStatus {
		self.inner.status.get()
	}

	/// What the component should show right now.
	pub fn render_state(&self) -> RenderState {
		self.inner.context.render_state()
	}

	/// Renders the view matching [`render_state`](Self::render_state).
	///
	/// Returns `None` once unmounted, or when the matching fallback renders nothing.
	pub fn view(&self) -> Option<C::View> {
		let inner = &self.inner;
		if inner.context.is_unmounted() {
			return None;
		}
		let component = inner.component.as_ref();
		match self.render_state() {
			RenderState::Pending | RenderState::Loading => component.render_loading(),
			RenderState::Blocked { guard } => inner
				.descriptor
				.guards()
				.get(guard)
				.and_then(|guard| guard.fallback(component)),
			RenderState::Failed(error) => component.render_error(&error),
			RenderState::Empty => component.render_empty(),
			RenderState::Ready => Some(component.render()),
		}
	}
}

impl<C: Component> Drop for ComponentHost<C> {
	fn drop(&mut self) {
		self.inner.unmount();
	}
}

impl<C: Component> fmt::Debug for ComponentHost<C> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ComponentHost")
			.field("component", &self.inner.context.name())
			.field("id", &self.inner.context.id())
			.field("phase", &self.inner.phase.get())
			.field("status", &self.inner.status.get())
			.finish()
	}
}

impl<C: Component> HostInner<C> {
	fn drive(self: &Rc<Self>, mut phase: Phase, mut index: usize) {
		loop {
			if index == 0 {
				self.enter(phase);
			}

			let plugins = self.registry.plugins_for(phase);
			while let Some(plugin) = plugins.get(index) {
				match self.execute(plugin.as_ref()) {
					PluginFlow::Continue => index += 1,
					PluginFlow::Halt => {
						tracing::debug!(
							component = self.context.name(),
							plugin = plugin.id(),
							%phase,
							"phase sequence halted"
						);
						self.status.set(HostStatus::Halted);
						return;
					}
					PluginFlow::Suspend(future) => {
						self.suspend(phase, index + 1, future);
						return;
					}
				}
				if self.context.is_unmounted() {
					return;
				}
			}

			if phase == Phase::BeforeMount
				&& matches!(
					self.context.guard_state(),
					GuardState::Unchecked | GuardState::Checking
				) {
				self.context.set_guard_state(GuardState::Allowed);
			}

			match phase.next_mount_phase() {
				Some(next) => {
					phase = next;
					index = 0;
				}
				None => {
					self.status.set(HostStatus::Active);
					tracing::debug!(component = self.context.name(), "component mounted");
					return;
				}
			}
		}
	}

	fn enter(&self, phase: Phase) {
		self.phase.set(phase);
		tracing::trace!(component = self.context.name(), %phase, "entering phase");
		if phase == Phase::Mounted {
			self.context.mounted().set(());
		}
	}

	fn suspend(self: &Rc<Self>, phase: Phase, resume_at: usize, future: LocalBoxFuture<'static, PluginFlow>) {
		self.status.set(HostStatus::Suspended);
		tracing::debug!(component = self.context.name(), %phase, "phase sequence suspended");

		let host = Rc::downgrade(self);
		let (task, handle) = abortable(async move {
			let flow = future.await;
			if let Some(host) = host.upgrade() {
				host.resume(flow, phase, resume_at);
			}
		});
		self.context.on_unmount(move || handle.abort());
		self.spawner.spawn(task.map(|_| ()).boxed_local());
	}

	fn resume(self: &Rc<Self>, flow: PluginFlow, phase: Phase, resume_at: usize) {
		if self.context.is_unmounted() {
			return;
		}
		match flow {
			PluginFlow::Continue => {
				self.status.set(HostStatus::Mounting);
				self.drive(phase, resume_at);
			}
			PluginFlow::Halt => {
				tracing::debug!(component = self.context.name(), %phase, "phase sequence halted");
				self.status.set(HostStatus::Halted);
			}
			PluginFlow::Suspend(future) => self.suspend(phase, resume_at, future),
		}
	}

	fn execute(&self, plugin: &dyn DecoratorPlugin<C>) -> PluginFlow {
		let cx = PluginContext::new(
			plugin.id(),
			&self.component,
			&self.descriptor,
			&self.context,
			&self.config,
			&self.spawner,
		);

		let outcome = if self.config.catch_panics {
			catch_unwind(AssertUnwindSafe(|| plugin.execute(&cx))).unwrap_or_else(|payload| {
				Err(PluginExecutionError::panicked(
					plugin.id(),
					self.context.name(),
					panic_message(payload.as_ref()),
				))
			})
		} else {
			plugin.execute(&cx)
		};

		match outcome {
			Ok(flow) => flow,
			Err(error) => {
				cx.error_sink().report(error);
				PluginFlow::Continue
			}
		}
	}

	fn unmount(&self) {
		if !self.context.begin_unmount() {
			return;
		}
		self.phase.set(Phase::Unmount);
		tracing::debug!(component = self.context.name(), id = %self.context.id(), "unmounting");

		for plugin in self.registry.plugins_for(Phase::Unmount) {
			match self.execute(plugin.as_ref()) {
				PluginFlow::Continue => {}
				PluginFlow::Halt => break,
				PluginFlow::Suspend(_) => {
					tracing::warn!(
						component = self.context.name(),
						plugin = plugin.id(),
						"unmount plugins cannot suspend; future dropped"
					);
				}
			}
		}

		let unmount = self.context.unmount();
		unmount.set(());
		unmount.complete();
		self.context.mounted().complete();
		self.context.dispose();
		self.context.complete_resolvers();
		self.context.injector().release_component(self.context.id());
		self.status.set(HostStatus::Unmounted);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::diagnostics::MemoryDiagnostics;
	use crate::manager::LifecycleManager;
	use rstest::rstest;
	use std::cell::RefCell;

	struct Probe {
		log: Rc<RefCell<Vec<String>>>,
	}

	impl Component for Probe {
		type View = String;

		fn render(&self) -> String {
			"probe".to_string()
		}

		fn report_error(&self, error: &PluginExecutionError) {
			self.log.borrow_mut().push(format!("error:{}", error.message()));
		}
	}

	struct Step {
		id: &'static str,
		phase: Phase,
		halt: bool,
		fail: bool,
	}

	impl DecoratorPlugin<Probe> for Step {
		fn id(&self) -> &str {
			self.id
		}

		fn phase(&self) -> Phase {
			self.phase
		}

		fn execute(&self, cx: &PluginContext<'_, Probe>) -> Result<PluginFlow, PluginExecutionError> {
			cx.component().log.borrow_mut().push(self.id.to_string());
			if self.fail {
				panic!("{} exploded", self.id);
			}
			Ok(if self.halt { PluginFlow::Halt } else { PluginFlow::Continue })
		}
	}

	fn step(id: &'static str, phase: Phase) -> Step {
		Step {
			id,
			phase,
			halt: false,
			fail: false,
		}
	}

	fn host_with(steps: Vec<Step>) -> (ComponentHost<Probe>, Rc<RefCell<Vec<String>>>) {
		let mut registry = PluginRegistry::<Probe>::new();
		for step in steps {
			registry.register(step).unwrap();
		}
		let log = Rc::new(RefCell::new(Vec::new()));
		let manager =
			LifecycleManager::new(registry).with_diagnostics(Rc::new(MemoryDiagnostics::new()));
		let descriptor = Rc::new(ComponentDescriptor::<Probe>::builder("Probe").build().unwrap());
		let host = manager
			.create(&descriptor, None, |_| Ok(Probe { log: Rc::clone(&log) }))
			.unwrap();
		(host, log)
	}

	#[rstest]
	fn test_phases_run_in_order() {
		// Arrange
		let (host, log) = host_with(vec![
			step("after", Phase::AfterMount),
			step("unmount", Phase::Unmount),
			step("mounted", Phase::Mounted),
			step("before", Phase::BeforeMount),
			step("created", Phase::Created),
		]);
		assert_eq!(*log.borrow(), ["created"]);

		// Act
		host.mount();
		host.mount();

		// Assert
		assert_eq!(*log.borrow(), ["created", "before", "mounted", "after"]);
		assert_eq!(host.status(), HostStatus::Active);
		assert!(host.context().is_mounted());

		host.unmount();
		host.unmount();
		assert_eq!(*log.borrow(), ["created", "before", "mounted", "after", "unmount"]);
		assert_eq!(host.status(), HostStatus::Unmounted);
		assert!(host.view().is_none());
	}

	#[rstest]
	fn test_halt_stops_the_sequence() {
		let (host, log) = host_with(vec![
			Step {
				halt: true,
				..step("gate", Phase::BeforeMount)
			},
			step("mounted", Phase::Mounted),
		]);

		host.mount();

		assert_eq!(*log.borrow(), ["gate"]);
		assert_eq!(host.status(), HostStatus::Halted);
		assert!(!host.context().mounted().is_initialized());
	}

	#[rstest]
	fn test_plugin_panic_is_reported_and_sequence_continues() {
		let (host, log) = host_with(vec![
			Step {
				fail: true,
				..step("boom", Phase::BeforeMount)
			},
			step("mounted", Phase::Mounted),
		]);

		host.mount();

		assert_eq!(
			*log.borrow(),
			["boom", "error:boom exploded", "mounted"]
		);
		assert_eq!(host.status(), HostStatus::Active);
	}

	#[rstest]
	fn test_drop_unmounts() {
		let (host, _log) = host_with(vec![]);
		host.mount();
		let unmount = host.context().unmount().clone();

		drop(host);

		assert!(unmount.is_closed());
	}
}
