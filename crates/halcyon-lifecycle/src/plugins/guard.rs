//! Guards
//!
//! Guards run in declaration order before a component mounts. A guard answers
//! synchronously, with a future, or with a signal whose first value settles it.
//! The first denial blocks the component: the phase sequence halts and the
//! guard's fallback is rendered in place of the component.

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use futures::FutureExt;
use futures::channel::oneshot;
use futures::future::LocalBoxFuture;
use halcyon_di::Token;
use halcyon_reactive::{Derived, Observer, Subscription};

use crate::component::Component;
use crate::context::{ComponentContext, GuardState};
use crate::diagnostics::Severity;
use crate::error::PluginExecutionError;
use crate::phase::Phase;
use crate::plugin::{DecoratorPlugin, ErrorSink, PluginContext, PluginFlow};

use super::GUARD_PLUGIN_ID;

/// Answer of a guard.
pub enum GuardResult {
	/// Settled immediately.
	Ready(bool),
	/// Settles when the future completes.
	Deferred(LocalBoxFuture<'static, bool>),
	/// Settles on the first value of the signal; completing without a value denies.
	Stream(Derived<bool>),
}

impl GuardResult {
	/// Wraps a future answer.
	pub fn deferred(future: impl Future<Output = bool> + 'static) -> Self {
		GuardResult::Deferred(future.boxed_local())
	}
}

impl From<bool> for GuardResult {
	fn from(allowed: bool) -> Self {
		GuardResult::Ready(allowed)
	}
}

impl fmt::Debug for GuardResult {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			GuardResult::Ready(allowed) => f.debug_tuple("Ready").field(allowed).finish(),
			GuardResult::Deferred(_) => f.write_str("Deferred(..)"),
			GuardResult::Stream(stream) => f.debug_tuple("Stream").field(stream).finish(),
		}
	}
}

/// Decides whether a component may mount.
///
/// Guards are resolved from the component injector, so they can depend on
/// other services.
pub trait CanActivate {
	/// Checks activation for the component owning `context`.
	fn can_activate(&self, context: &ComponentContext) -> GuardResult;
}

/// Evaluates the guards of a component.
#[derive(Debug, Default, Clone, Copy)]
pub struct GuardPlugin;

impl<C: Component> DecoratorPlugin<C> for GuardPlugin {
	fn id(&self) -> &str {
		GUARD_PLUGIN_ID
	}

	fn phase(&self) -> Phase {
		Phase::BeforeMount
	}

	fn execute(&self, cx: &PluginContext<'_, C>) -> Result<PluginFlow, PluginExecutionError> {
		let context = cx.context();
		match context.guard_state() {
			GuardState::Allowed => return Ok(PluginFlow::Continue),
			GuardState::Blocked(_) => return Ok(PluginFlow::Halt),
			GuardState::Checking | GuardState::Unchecked => {}
		}

		let tokens: Rc<[Token<dyn CanActivate>]> = cx
			.descriptor()
			.guards()
			.iter()
			.map(|guard| guard.token().clone())
			.collect();
		context.set_guard_state(GuardState::Checking);

		let run = GuardRun {
			context: Rc::clone(context),
			tokens,
			sink: cx.error_sink(),
		};
		Ok(run.evaluate_from(0))
	}
}

enum Verdict {
	Allow,
	Deny,
	Pending(LocalBoxFuture<'static, bool>),
}

struct GuardRun<C: Component> {
	context: Rc<ComponentContext>,
	tokens: Rc<[Token<dyn CanActivate>]>,
	sink: ErrorSink<C>,
}

impl<C: Component> GuardRun<C> {
	fn evaluate_from(self, start: usize) -> PluginFlow {
		for index in start..self.tokens.len() {
			match self.check(index) {
				Verdict::Allow => {}
				Verdict::Deny => return self.block(index),
				Verdict::Pending(answer) => {
					tracing::debug!(
						component = self.context.name(),
						guard = self.tokens[index].name(),
						"guard deferred"
					);
					return PluginFlow::Suspend(
						async move {
							let allowed = answer.await;
							if self.context.is_unmounted() {
								PluginFlow::Halt
							} else if allowed {
								self.evaluate_from(index + 1)
							} else {
								self.block(index)
							}
						}
						.boxed_local(),
					);
				}
			}
		}

		self.context.set_guard_state(GuardState::Allowed);
		PluginFlow::Continue
	}

	fn check(&self, index: usize) -> Verdict {
		let token = &self.tokens[index];
		let guard = match self.context.inject(token) {
			Ok(guard) => guard,
			Err(error) => {
				self.sink.report(PluginExecutionError::new(
					GUARD_PLUGIN_ID,
					self.context.name(),
					format!("guard '{token}' could not be resolved: {error}"),
				));
				return Verdict::Deny;
			}
		};

		let label = format!("guard '{token}'");
		let Some(answer) = self
			.sink
			.run(&label, |_| Ok(guard.can_activate(&self.context)))
		else {
			return Verdict::Deny;
		};

		match answer {
			GuardResult::Ready(true) => Verdict::Allow,
			GuardResult::Ready(false) => Verdict::Deny,
			GuardResult::Deferred(answer) => Verdict::Pending(answer),
			GuardResult::Stream(stream) => {
				let mut answer = first_value(&stream);
				match (&mut answer).now_or_never() {
					Some(true) => Verdict::Allow,
					Some(false) => Verdict::Deny,
					None => Verdict::Pending(answer),
				}
			}
		}
	}

	fn block(&self, index: usize) -> PluginFlow {
		self.context.set_guard_state(GuardState::Blocked(index));
		self.context.report(
			Severity::Info,
			format!("guard '{}' denied activation", self.tokens[index]),
		);
		PluginFlow::Halt
	}
}

struct UnsubscribeOnDrop(Subscription);

impl Drop for UnsubscribeOnDrop {
	fn drop(&mut self) {
		self.0.unsubscribe();
	}
}

/// Resolves with the first value of `stream`, or `false` if it terminates first.
fn first_value(stream: &Derived<bool>) -> LocalBoxFuture<'static, bool> {
	let (sender, receiver) = oneshot::channel();
	let sender = Rc::new(RefCell::new(Some(sender)));
	let settle = Rc::new(move |allowed: bool| {
		if let Some(sender) = sender.borrow_mut().take() {
			let _ = sender.send(allowed);
		}
	});

	let observer = Observer::new({
		let settle = Rc::clone(&settle);
		move |allowed: &bool| settle(*allowed)
	})
	.on_error({
		let settle = Rc::clone(&settle);
		move |_| settle(false)
	})
	.on_complete(move || settle(false));
	let subscription = UnsubscribeOnDrop(stream.subscribe_with(observer));

	async move {
		let _subscription = subscription;
		receiver.await.unwrap_or(false)
	}
	.boxed_local()
}
