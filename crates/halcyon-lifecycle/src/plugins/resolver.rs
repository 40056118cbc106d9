//! Resolvers
//!
//! A resolver loads data a component needs before it renders. Each resolver
//! publishes a [`ResolverState`] under its key; the component renders its
//! loading view until every resolver settled, its error view when one failed
//! and its empty view when a value matched the declared emptiness check.
//! Resolvers never suspend the phase sequence.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use halcyon_reactive::{Derived, Observer, Signal};

use crate::component::Component;
use crate::context::{ComponentContext, ResolverState};
use crate::diagnostics::Severity;
use crate::error::{HookResult, PluginExecutionError, ResolverError};
use crate::phase::Phase;
use crate::plugin::{DecoratorPlugin, PluginContext, PluginFlow, panic_message};

use super::RESOLVER_PLUGIN_ID;

/// Outcome of [`Resolve::resolve`].
pub enum Resolution<T: 'static> {
	/// The value (or failure) is known now.
	Ready(HookResult<T>),
	/// The value arrives later.
	Future(LocalBoxFuture<'static, HookResult<T>>),
	/// Every emission replaces the resolved value; an error fails the resolver.
	Stream(Derived<T>),
}

impl<T: 'static> Resolution<T> {
	/// Resolves to `value` immediately.
	pub fn ready(value: T) -> Self {
		Resolution::Ready(Ok(value))
	}

	/// Resolves when `future` completes.
	pub fn future(future: impl Future<Output = HookResult<T>> + 'static) -> Self {
		Resolution::Future(future.boxed_local())
	}
}

impl<T: 'static> From<Signal<T>> for Resolution<T> {
	fn from(signal: Signal<T>) -> Self {
		Resolution::Stream(signal.as_derived())
	}
}

impl<T: 'static> fmt::Debug for Resolution<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Resolution::Ready(Ok(_)) => f.write_str("Ready(Ok(..))"),
			Resolution::Ready(Err(error)) => f.debug_tuple("Ready").field(error).finish(),
			Resolution::Future(_) => f.write_str("Future(..)"),
			Resolution::Stream(_) => f.write_str("Stream(..)"),
		}
	}
}

/// Loads a value for a component.
///
/// Resolvers are resolved from the component injector.
pub trait Resolve {
	/// Type of the resolved value.
	type Output: 'static;

	/// Starts resolution for the component owning `context`.
	fn resolve(&self, context: &ComponentContext) -> Resolution<Self::Output>;
}

pub(crate) enum ErasedResolution {
	Ready(HookResult<Rc<dyn Any>>),
	Future(LocalBoxFuture<'static, HookResult<Rc<dyn Any>>>),
	Stream(Derived<dyn Any>),
}

impl<T: 'static> From<Resolution<T>> for ErasedResolution {
	fn from(resolution: Resolution<T>) -> Self {
		match resolution {
			Resolution::Ready(outcome) => {
				ErasedResolution::Ready(outcome.map(|value| Rc::new(value) as Rc<dyn Any>))
			}
			Resolution::Future(future) => ErasedResolution::Future(
				future
					.map(|outcome| outcome.map(|value| Rc::new(value) as Rc<dyn Any>))
					.boxed_local(),
			),
			Resolution::Stream(stream) => {
				ErasedResolution::Stream(stream.map_rc(|value: &Rc<T>| -> Rc<dyn Any> {
					Rc::clone(value) as Rc<dyn Any>
				}))
			}
		}
	}
}

/// Runs the resolvers of a component and publishes their states.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResolverPlugin;

impl<C: Component> DecoratorPlugin<C> for ResolverPlugin {
	fn id(&self) -> &str {
		RESOLVER_PLUGIN_ID
	}

	fn phase(&self) -> Phase {
		Phase::BeforeMount
	}

	fn priority(&self) -> i32 {
		10
	}

	fn execute(&self, cx: &PluginContext<'_, C>) -> Result<PluginFlow, PluginExecutionError> {
		let context = cx.context();
		for resolver in cx.descriptor().resolvers() {
			let key = resolver.key().to_string();
			let state = context.add_resolver(&key, resolver.is_empty.clone());

			let outcome = if cx.config().catch_panics {
				match catch_unwind(AssertUnwindSafe(|| (resolver.run)(context))) {
					Ok(outcome) => outcome,
					Err(payload) => {
						let message = format!("panicked: {}", panic_message(payload.as_ref()));
						fail(context, &state, ResolverError::new(key, message));
						continue;
					}
				}
			} else {
				(resolver.run)(context)
			};
			let resolution = match outcome {
				Ok(resolution) => resolution,
				Err(error) => {
					fail(context, &state, ResolverError::new(key, error.to_string()));
					continue;
				}
			};

			match resolution {
				ErasedResolution::Ready(Ok(value)) => state.set(ResolverState::Resolved(value)),
				ErasedResolution::Ready(Err(error)) => {
					fail(context, &state, ResolverError::new(key, error.message()));
				}
				ErasedResolution::Future(future) => {
					let context = Rc::clone(context);
					cx.spawn(async move {
						match future.await {
							Ok(value) => state.set(ResolverState::Resolved(value)),
							Err(error) => {
								fail(&context, &state, ResolverError::new(key, error.message()));
							}
						}
					});
				}
				ErasedResolution::Stream(stream) => {
					let subscription = stream.subscribe_with(stream_observer(context, state, key));
					context.track(subscription);
				}
			}
		}
		Ok(PluginFlow::Continue)
	}
}

fn stream_observer(
	context: &Rc<ComponentContext>,
	state: Signal<ResolverState>,
	key: String,
) -> Observer<dyn Any> {
	let on_error = {
		let context = Rc::clone(context);
		let state = state.clone();
		let key = key.clone();
		move |error: &halcyon_reactive::SignalError| {
			fail(&context, &state, ResolverError::new(key.clone(), error.to_string()));
		}
	};
	let on_complete = {
		let context = Rc::clone(context);
		let state = state.clone();
		move || {
			let pending = state.value_rc().is_none_or(|state| state.is_pending());
			if pending {
				fail(
					&context,
					&state,
					ResolverError::new(key.clone(), "completed without a value"),
				);
			}
		}
	};

	Observer::shared(move |value: &Rc<dyn Any>| {
		state.set(ResolverState::Resolved(Rc::clone(value)));
	})
	.on_error(on_error)
	.on_complete(on_complete)
}

fn fail(context: &ComponentContext, state: &Signal<ResolverState>, error: ResolverError) {
	context.report(Severity::Warn, error.to_string());
	state.set(ResolverState::Failed(error));
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::HookError;
	use rstest::rstest;

	#[rstest]
	fn test_erased_ready_keeps_value() {
		let erased = ErasedResolution::from(Resolution::ready(5u8));

		match erased {
			ErasedResolution::Ready(Ok(value)) => {
				assert_eq!(value.downcast_ref::<u8>(), Some(&5));
			}
			_ => panic!("expected a ready value"),
		}
	}

	#[rstest]
	fn test_erased_stream_follows_signal() {
		let signal = Signal::new("a".to_string());

		let ErasedResolution::Stream(stream) = ErasedResolution::from(Resolution::from(signal.clone()))
		else {
			panic!("expected a stream");
		};
		signal.set("b".to_string());

		let current = stream.value_rc().unwrap();
		assert_eq!(current.downcast_ref::<String>().map(String::as_str), Some("b"));
	}

	#[rstest]
	fn test_resolution_debug() {
		let failed: Resolution<u8> = Resolution::Ready(Err(HookError::new("nope")));

		assert_eq!(format!("{:?}", Resolution::ready(1u8)), "Ready(Ok(..))");
		assert!(format!("{:?}", failed).contains("nope"));
	}
}
