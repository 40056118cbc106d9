//! Per-instance component context
//!
//! A [`ComponentContext`] is created before the component itself and handed to
//! its factory. It carries the component identity, the injector, the lifecycle
//! signals, resolver state and the disposers that run on unmount.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use halcyon_di::{ComponentId, DiResult, Injector, Token};
use halcyon_reactive::{Signal, Subscription, SubscriptionBag};

use crate::diagnostics::{Diagnostics, Report, Severity};
use crate::error::ResolverError;
use crate::phase::RenderState;

pub(crate) type EmptyFn = Rc<dyn Fn(&dyn Any) -> bool>;

/// State of one resolver.
#[derive(Clone)]
pub enum ResolverState {
	/// No value yet.
	Pending,
	/// The resolver produced a value.
	Resolved(Rc<dyn Any>),
	/// The resolver failed.
	Failed(ResolverError),
}

impl ResolverState {
	/// Returns true while no outcome is known.
	pub fn is_pending(&self) -> bool {
		matches!(self, ResolverState::Pending)
	}

	/// Returns the resolved value if it has type `T`.
	pub fn value<T: 'static>(&self) -> Option<Rc<T>> {
		match self {
			ResolverState::Resolved(value) => Rc::clone(value).downcast::<T>().ok(),
			_ => None,
		}
	}

	/// Returns the failure, if any.
	pub fn error(&self) -> Option<&ResolverError> {
		match self {
			ResolverState::Failed(error) => Some(error),
			_ => None,
		}
	}
}

impl fmt::Debug for ResolverState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ResolverState::Pending => f.write_str("Pending"),
			ResolverState::Resolved(_) => f.write_str("Resolved(..)"),
			ResolverState::Failed(error) => f.debug_tuple("Failed").field(error).finish(),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GuardState {
	Unchecked,
	Checking,
	Allowed,
	Blocked(usize),
}

struct ResolverSlot {
	key: String,
	state: Signal<ResolverState>,
	is_empty: Option<EmptyFn>,
}

/// Per-instance runtime state shared by the host, the plugins and the component.
pub struct ComponentContext {
	id: ComponentId,
	name: String,
	injector: Injector,
	mounted: Signal<()>,
	unmount: Signal<()>,
	disposers: SubscriptionBag,
	guard: Cell<GuardState>,
	resolvers: RefCell<Vec<ResolverSlot>>,
	diagnostics: Rc<dyn Diagnostics>,
	mount_hooks_ran: Cell<bool>,
	unmounted: Cell<bool>,
}

impl ComponentContext {
	pub(crate) fn new(
		id: ComponentId,
		name: impl Into<String>,
		injector: Injector,
		diagnostics: Rc<dyn Diagnostics>,
	) -> Self {
		Self {
			id,
			name: name.into(),
			injector,
			mounted: Signal::uninit(),
			unmount: Signal::uninit(),
			disposers: SubscriptionBag::new(),
			guard: Cell::new(GuardState::Unchecked),
			resolvers: RefCell::new(Vec::new()),
			diagnostics,
			mount_hooks_ran: Cell::new(false),
			unmounted: Cell::new(false),
		}
	}

	/// Identity of the component instance.
	pub fn id(&self) -> ComponentId {
		self.id
	}

	/// Name from the component descriptor.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// The injector serving this component.
	pub fn injector(&self) -> &Injector {
		&self.injector
	}

	/// Resolves `token` on behalf of this component.
	///
	/// Component-scoped providers hand out this component's private instance.
	pub fn inject<T: ?Sized + 'static>(&self, token: &Token<T>) -> DiResult<Rc<T>> {
		self.injector.get(token, Some(self.id))
	}

	/// Like [`inject`](Self::inject), yielding `Ok(None)` when nothing provides `token`.
	pub fn try_inject<T: ?Sized + 'static>(&self, token: &Token<T>) -> DiResult<Option<Rc<T>>> {
		self.injector.try_get(token, Some(self.id))
	}

	/// Fires once when the component reaches the mounted phase.
	pub fn mounted(&self) -> &Signal<()> {
		&self.mounted
	}

	/// Fires and completes once when the component unmounts.
	pub fn unmount(&self) -> &Signal<()> {
		&self.unmount
	}

	/// Returns true between the mounted phase and unmount.
	pub fn is_mounted(&self) -> bool {
		self.mounted.is_initialized() && !self.is_unmounted()
	}

	/// Returns true once unmount has started.
	pub fn is_unmounted(&self) -> bool {
		self.unmounted.get()
	}

	/// Registers a cleanup that runs exactly once on unmount.
	///
	/// After unmount the cleanup runs immediately.
	pub fn on_unmount(&self, cleanup: impl FnOnce() + 'static) {
		self.disposers.add(Subscription::new(cleanup));
	}

	/// Closes `subscription` on unmount.
	pub fn track(&self, subscription: Subscription) {
		self.disposers.add(subscription);
	}

	/// Returns the state signal of the resolver registered under `key`.
	pub fn resolver_state(&self, key: &str) -> Option<Signal<ResolverState>> {
		self.resolvers
			.borrow()
			.iter()
			.find(|slot| slot.key == key)
			.map(|slot| slot.state.clone())
	}

	/// Returns the resolved value of `key` if it is ready and has type `T`.
	pub fn resolved<T: 'static>(&self, key: &str) -> Option<Rc<T>> {
		self.resolver_state(key)?.value_rc()?.value::<T>()
	}

	/// Keys of the registered resolvers, in declaration order.
	pub fn resolver_keys(&self) -> Vec<String> {
		self.resolvers
			.borrow()
			.iter()
			.map(|slot| slot.key.clone())
			.collect()
	}

	/// The diagnostics sink in use for this component.
	pub fn diagnostics(&self) -> &Rc<dyn Diagnostics> {
		&self.diagnostics
	}

	/// Sends a report about this component to the diagnostics sink.
	pub fn report(&self, severity: Severity, message: impl Into<String>) {
		self.diagnostics
			.report(&Report::new(severity, self.name.clone(), message));
	}

	pub(crate) fn guard_state(&self) -> GuardState {
		self.guard.get()
	}

	pub(crate) fn set_guard_state(&self, state: GuardState) {
		self.guard.set(state);
	}

	pub(crate) fn add_resolver(&self, key: &str, is_empty: Option<EmptyFn>) -> Signal<ResolverState> {
		let state = Signal::new(ResolverState::Pending);
		self.resolvers.borrow_mut().push(ResolverSlot {
			key: key.to_string(),
			state: state.clone(),
			is_empty,
		});
		state
	}

	/// Marks mount hooks as run. Returns false if they already ran.
	pub(crate) fn claim_mount_hooks(&self) -> bool {
		!self.mount_hooks_ran.replace(true)
	}

	/// Marks the start of unmount. Returns false if it already started.
	pub(crate) fn begin_unmount(&self) -> bool {
		!self.unmounted.replace(true)
	}

	pub(crate) fn dispose(&self) {
		self.disposers.dispose();
	}

	/// Completes every resolver state signal, keeping its last state.
	pub(crate) fn complete_resolvers(&self) {
		let states: Vec<Signal<ResolverState>> = self
			.resolvers
			.borrow()
			.iter()
			.map(|slot| slot.state.clone())
			.collect();
		for state in states {
			state.complete();
		}
	}

	pub(crate) fn render_state(&self) -> RenderState {
		match self.guard.get() {
			GuardState::Unchecked | GuardState::Checking => return RenderState::Pending,
			GuardState::Blocked(guard) => return RenderState::Blocked { guard },
			GuardState::Allowed => {}
		}

		let states: Vec<(ResolverState, Option<EmptyFn>)> = self
			.resolvers
			.borrow()
			.iter()
			.map(|slot| {
				(
					slot.state.value().unwrap_or(ResolverState::Pending),
					slot.is_empty.clone(),
				)
			})
			.collect();

		if let Some(error) = states.iter().find_map(|(state, _)| state.error()) {
			return RenderState::Failed(error.clone());
		}
		if states.iter().any(|(state, _)| state.is_pending()) {
			return RenderState::Loading;
		}
		let empty = states.iter().any(|(state, is_empty)| match (state, is_empty) {
			(ResolverState::Resolved(value), Some(is_empty)) => is_empty(&**value),
			_ => false,
		});
		if empty {
			RenderState::Empty
		} else {
			RenderState::Ready
		}
	}
}

impl fmt::Debug for ComponentContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ComponentContext")
			.field("id", &self.id)
			.field("name", &self.name)
			.field("guard", &self.guard.get())
			.field("resolvers", &self.resolver_keys())
			.field("unmounted", &self.unmounted.get())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::diagnostics::MemoryDiagnostics;
	use halcyon_di::Provider;
	use rstest::{fixture, rstest};

	#[fixture]
	fn context() -> ComponentContext {
		ComponentContext::new(
			ComponentId::next(),
			"Test",
			Injector::builder().build(),
			Rc::new(MemoryDiagnostics::new()),
		)
	}

	#[rstest]
	fn test_render_state_waits_for_guards(context: ComponentContext) {
		assert_eq!(context.render_state(), RenderState::Pending);

		context.set_guard_state(GuardState::Blocked(1));
		assert_eq!(context.render_state(), RenderState::Blocked { guard: 1 });
	}

	#[rstest]
	fn test_render_state_follows_resolvers(context: ComponentContext) {
		// Arrange
		context.set_guard_state(GuardState::Allowed);
		let empty: EmptyFn = Rc::new(|value: &dyn Any| {
			value.downcast_ref::<Vec<u8>>().is_some_and(Vec::is_empty)
		});
		let items = context.add_resolver("items", Some(empty));
		let user = context.add_resolver("user", None);

		// Act & Assert
		assert_eq!(context.render_state(), RenderState::Loading);
		user.set(ResolverState::Resolved(Rc::new("ada".to_string())));
		items.set(ResolverState::Resolved(Rc::new(Vec::<u8>::new())));
		assert_eq!(context.render_state(), RenderState::Empty);
		items.set(ResolverState::Resolved(Rc::new(vec![1u8])));
		assert_eq!(context.render_state(), RenderState::Ready);
		user.set(ResolverState::Failed(ResolverError::new("user", "gone")));
		assert_eq!(
			context.render_state(),
			RenderState::Failed(ResolverError::new("user", "gone"))
		);
	}

	#[rstest]
	fn test_resolved_value_lookup(context: ComponentContext) {
		let state = context.add_resolver("count", None);
		state.set(ResolverState::Resolved(Rc::new(3u32)));

		assert_eq!(context.resolved::<u32>("count").as_deref(), Some(&3));
		assert!(context.resolved::<String>("count").is_none());
		assert!(context.resolved::<u32>("missing").is_none());
	}

	#[rstest]
	fn test_cleanups_run_once_and_late_ones_immediately(context: ComponentContext) {
		let runs = Rc::new(Cell::new(0));
		context.on_unmount({
			let runs = Rc::clone(&runs);
			move || runs.set(runs.get() + 1)
		});

		context.dispose();
		context.dispose();
		assert_eq!(runs.get(), 1);

		context.on_unmount({
			let runs = Rc::clone(&runs);
			move || runs.set(runs.get() + 1)
		});
		assert_eq!(runs.get(), 2);
	}

	#[rstest]
	fn test_inject_uses_component_identity() {
		let token: Token<String> = Token::new("scoped");
		let injector =
			Injector::new([Provider::factory(&token, [], |_| Ok("x".to_string())).component_scoped()]);
		let first = ComponentContext::new(
			ComponentId::next(),
			"A",
			injector.clone(),
			Rc::new(MemoryDiagnostics::new()),
		);
		let second = ComponentContext::new(
			ComponentId::next(),
			"B",
			injector,
			Rc::new(MemoryDiagnostics::new()),
		);

		let a1 = first.inject(&token).unwrap();
		let a2 = first.inject(&token).unwrap();
		let b = second.inject(&token).unwrap();

		assert!(Rc::ptr_eq(&a1, &a2));
		assert!(!Rc::ptr_eq(&a1, &b));
	}
}
