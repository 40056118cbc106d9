//! Derived views
//!
//! A [`Derived`] owns no storage: its current value is recomputed from the
//! parent's current value on demand, and subscribing to it subscribes to the
//! parent through the projection. A derived view completes or errors when its
//! parent does.

use std::any::Any;
use std::rc::Rc;

use serde::Serialize;

use crate::erased::AnySignal;
use crate::observer::{Observer, Subscription};
use crate::path;
use crate::signal::SignalStatus;

/// Anything a [`Derived`] can read from and subscribe to.
pub(crate) trait Source<T: ?Sized + 'static> {
	fn current(&self) -> Option<Rc<T>>;
	fn observe(&self, observer: Observer<T>) -> Subscription;
	fn status(&self) -> SignalStatus;
}

type Projection<S, T> = Rc<dyn Fn(&Rc<S>) -> Rc<T>>;

struct MapSource<S: ?Sized + 'static, T: ?Sized + 'static> {
	parent: Rc<dyn Source<S>>,
	project: Projection<S, T>,
}

impl<S: ?Sized + 'static, T: ?Sized + 'static> Source<T> for MapSource<S, T> {
	fn current(&self) -> Option<Rc<T>> {
		self.parent.current().map(|value| (self.project)(&value))
	}

	fn observe(&self, observer: Observer<T>) -> Subscription {
		self.parent
			.observe(observer.contramap(Rc::clone(&self.project)))
	}

	fn status(&self) -> SignalStatus {
		self.parent.status()
	}
}

/// A read-only view computed from another signal.
///
/// # Examples
///
/// ```
/// use halcyon_reactive::Signal;
///
/// let celsius = Signal::new(20.0_f64);
/// let fahrenheit = celsius.map(|c| c * 9.0 / 5.0 + 32.0);
///
/// assert_eq!(fahrenheit.value(), Some(68.0));
/// celsius.set(100.0);
/// assert_eq!(fahrenheit.value(), Some(212.0));
/// ```
pub struct Derived<T: ?Sized + 'static> {
	source: Rc<dyn Source<T>>,
}

impl<T: ?Sized + 'static> Derived<T> {
	pub(crate) fn from_source(source: impl Source<T> + 'static) -> Self {
		Self {
			source: Rc::new(source),
		}
	}

	/// Recomputes the current value from the parent.
	pub fn value_rc(&self) -> Option<Rc<T>> {
		self.source.current()
	}

	/// Returns the terminal state of the parent.
	pub fn status(&self) -> SignalStatus {
		self.source.status()
	}

	/// Returns true once the parent has completed or errored.
	pub fn is_closed(&self) -> bool {
		self.status() != SignalStatus::Active
	}

	/// Subscribes to values, replaying the current one.
	pub fn subscribe(&self, next: impl Fn(&T) + 'static) -> Subscription {
		self.subscribe_with(Observer::new(next))
	}

	/// Subscribes with a full observer.
	pub fn subscribe_with(&self, observer: Observer<T>) -> Subscription {
		self.source.observe(observer)
	}

	/// Returns a view applying `project` to every value of this one.
	pub fn map<U: 'static>(&self, project: impl Fn(&T) -> U + 'static) -> Derived<U> {
		self.map_rc(move |value: &Rc<T>| Rc::new(project(&**value)))
	}

	/// Like [`map`](Self::map), with access to the shared value handle.
	pub fn map_rc<U: ?Sized + 'static>(
		&self,
		project: impl Fn(&Rc<T>) -> Rc<U> + 'static,
	) -> Derived<U> {
		Derived::from_source(MapSource {
			parent: Rc::clone(&self.source),
			project: Rc::new(project),
		})
	}
}

impl<T: 'static> Derived<T> {
	/// Recomputes and clones the current value.
	pub fn value(&self) -> Option<T>
	where
		T: Clone,
	{
		self.value_rc().map(|value| (*value).clone())
	}

	/// Returns a view of the JSON value at `path`.
	///
	/// Missing segments yield `Null`.
	pub fn select(&self, path: &str) -> Derived<serde_json::Value>
	where
		T: Serialize,
	{
		let path = path.to_string();
		self.map(move |value: &T| path::project(&path::to_json(value), &path))
	}

	/// Erases the value type.
	pub fn erase(&self) -> AnySignal {
		let values = self.map_rc(|value: &Rc<T>| -> Rc<dyn Any> { Rc::clone(value) as Rc<dyn Any> });
		AnySignal::new::<T>(values)
	}

	/// Erases the value type, keeping a JSON view for path projection.
	pub fn erase_json(&self) -> AnySignal
	where
		T: Serialize,
	{
		self.erase().with_json(|value: &dyn Any| {
			value
				.downcast_ref::<T>()
				.map_or(serde_json::Value::Null, path::to_json)
		})
	}
}

impl<T: ?Sized + 'static> Clone for Derived<T> {
	fn clone(&self) -> Self {
		Self {
			source: Rc::clone(&self.source),
		}
	}
}

impl<T: ?Sized + 'static> std::fmt::Debug for Derived<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Derived")
			.field("status", &self.status())
			.finish_non_exhaustive()
	}
}
