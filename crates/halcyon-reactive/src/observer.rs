//! Observers, subscriptions and subscription bags.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::error::SignalError;

type NextFn<T> = Rc<dyn Fn(&Rc<T>)>;
type ErrorFn = Rc<dyn Fn(&SignalError)>;
type CompleteFn = Rc<dyn Fn()>;

/// A set of callbacks receiving a signal's values, its error and its completion.
///
/// # Examples
///
/// ```
/// use halcyon_reactive::{Observer, Signal};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let done = Rc::new(Cell::new(false));
/// let signal = Signal::new(1);
/// signal.subscribe_with(
///     Observer::new(|_: &i32| {}).on_complete({
///         let done = Rc::clone(&done);
///         move || done.set(true)
///     }),
/// );
///
/// signal.complete();
/// assert!(done.get());
/// ```
pub struct Observer<T: ?Sized + 'static> {
	next: NextFn<T>,
	error: Option<ErrorFn>,
	complete: Option<CompleteFn>,
}

impl<T: ?Sized + 'static> Observer<T> {
	/// Creates an observer from a value callback.
	pub fn new(next: impl Fn(&T) + 'static) -> Self {
		Self::shared(move |value: &Rc<T>| next(&**value))
	}

	/// Creates an observer that receives the shared value handle.
	pub fn shared(next: impl Fn(&Rc<T>) + 'static) -> Self {
		Self {
			next: Rc::new(next),
			error: None,
			complete: None,
		}
	}

	/// Sets the error callback.
	pub fn on_error(mut self, error: impl Fn(&SignalError) + 'static) -> Self {
		self.error = Some(Rc::new(error));
		self
	}

	/// Sets the completion callback.
	pub fn on_complete(mut self, complete: impl Fn() + 'static) -> Self {
		self.complete = Some(Rc::new(complete));
		self
	}

	pub(crate) fn next(&self, value: &Rc<T>) {
		(self.next)(value)
	}

	pub(crate) fn error(&self, error: &SignalError) {
		match &self.error {
			Some(handler) => handler(error),
			None => tracing::warn!(%error, "signal error without an error handler"),
		}
	}

	pub(crate) fn complete(&self) {
		if let Some(handler) = &self.complete {
			handler()
		}
	}

	/// Adapts this observer to a source of `S` through `project`.
	pub(crate) fn contramap<S: ?Sized + 'static>(
		self,
		project: Rc<dyn Fn(&Rc<S>) -> Rc<T>>,
	) -> Observer<S> {
		let next = self.next;
		Observer {
			next: Rc::new(move |value: &Rc<S>| next(&project(value))),
			error: self.error,
			complete: self.complete,
		}
	}
}

impl<T: ?Sized + 'static> Clone for Observer<T> {
	fn clone(&self) -> Self {
		Self {
			next: Rc::clone(&self.next),
			error: self.error.clone(),
			complete: self.complete.clone(),
		}
	}
}

impl<T: ?Sized + 'static> fmt::Debug for Observer<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Observer")
			.field("error", &self.error.is_some())
			.field("complete", &self.complete.is_some())
			.finish()
	}
}

/// Handle to an active subscription.
///
/// Clones share state. [`unsubscribe`](Self::unsubscribe) is idempotent and may be called
/// from inside the subscriber's own callback. Dropping the handle does not unsubscribe.
#[derive(Clone)]
pub struct Subscription {
	inner: Rc<SubscriptionInner>,
}

struct SubscriptionInner {
	closed: Cell<bool>,
	teardown: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl Subscription {
	/// Creates a subscription that runs `teardown` when first unsubscribed.
	pub fn new(teardown: impl FnOnce() + 'static) -> Self {
		Self {
			inner: Rc::new(SubscriptionInner {
				closed: Cell::new(false),
				teardown: RefCell::new(Some(Box::new(teardown))),
			}),
		}
	}

	/// Creates a subscription that is already closed.
	pub fn closed() -> Self {
		Self {
			inner: Rc::new(SubscriptionInner {
				closed: Cell::new(true),
				teardown: RefCell::new(None),
			}),
		}
	}

	/// Closes the subscription, running its teardown exactly once.
	pub fn unsubscribe(&self) {
		if self.inner.closed.replace(true) {
			return;
		}
		let teardown = self.inner.teardown.borrow_mut().take();
		if let Some(teardown) = teardown {
			teardown();
		}
	}

	/// Returns true once the subscription has been closed.
	pub fn is_closed(&self) -> bool {
		self.inner.closed.get()
	}

	/// Returns true if both handles refer to the same subscription.
	pub fn ptr_eq(&self, other: &Subscription) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}
}

impl fmt::Debug for Subscription {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Subscription")
			.field("closed", &self.is_closed())
			.finish()
	}
}

/// A collection of subscriptions disposed together.
///
/// Subscriptions added after [`dispose`](Self::dispose) are closed immediately.
#[derive(Default)]
pub struct SubscriptionBag {
	subscriptions: RefCell<Vec<Subscription>>,
	disposed: Cell<bool>,
}

impl SubscriptionBag {
	/// Creates an empty bag.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a subscription to the bag.
	pub fn add(&self, subscription: Subscription) {
		if self.disposed.get() {
			subscription.unsubscribe();
			return;
		}
		self.subscriptions.borrow_mut().push(subscription);
	}

	/// Closes every subscription in the bag. Later calls do nothing.
	pub fn dispose(&self) {
		if self.disposed.replace(true) {
			return;
		}
		let subscriptions = std::mem::take(&mut *self.subscriptions.borrow_mut());
		for subscription in subscriptions {
			subscription.unsubscribe();
		}
	}

	/// Returns true once [`dispose`](Self::dispose) has run.
	pub fn is_disposed(&self) -> bool {
		self.disposed.get()
	}

	/// Number of subscriptions held.
	pub fn len(&self) -> usize {
		self.subscriptions.borrow().len()
	}

	/// Returns true when the bag holds no subscriptions.
	pub fn is_empty(&self) -> bool {
		self.subscriptions.borrow().is_empty()
	}
}

impl fmt::Debug for SubscriptionBag {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SubscriptionBag")
			.field("len", &self.len())
			.field("disposed", &self.is_disposed())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn counting(counter: &Rc<Cell<u32>>) -> Subscription {
		let counter = Rc::clone(counter);
		Subscription::new(move || counter.set(counter.get() + 1))
	}

	#[rstest]
	fn test_unsubscribe_is_idempotent() {
		// Arrange
		let runs = Rc::new(Cell::new(0));
		let subscription = counting(&runs);
		let clone = subscription.clone();

		// Act
		subscription.unsubscribe();
		subscription.unsubscribe();
		clone.unsubscribe();

		// Assert
		assert_eq!(runs.get(), 1);
		assert!(clone.is_closed());
	}

	#[rstest]
	fn test_closed_subscription_has_no_teardown() {
		let subscription = Subscription::closed();
		assert!(subscription.is_closed());
		subscription.unsubscribe();
	}

	#[rstest]
	fn test_bag_disposes_each_once() {
		// Arrange
		let runs = Rc::new(Cell::new(0));
		let bag = SubscriptionBag::new();
		bag.add(counting(&runs));
		bag.add(counting(&runs));

		// Act
		bag.dispose();
		bag.dispose();

		// Assert
		assert_eq!(runs.get(), 2);
		assert!(bag.is_disposed());
		assert!(bag.is_empty());
	}

	#[rstest]
	fn test_bag_closes_late_additions() {
		let runs = Rc::new(Cell::new(0));
		let bag = SubscriptionBag::new();
		bag.dispose();

		let late = counting(&runs);
		bag.add(late.clone());

		assert!(late.is_closed());
		assert_eq!(runs.get(), 1);
		assert_eq!(bag.len(), 0);
	}

	#[rstest]
	fn test_contramap_projects_values() {
		let seen = Rc::new(Cell::new(0usize));
		let observer = Observer::new({
			let seen = Rc::clone(&seen);
			move |len: &usize| seen.set(*len)
		});

		let projected: Observer<String> =
			observer.contramap(Rc::new(|value: &Rc<String>| Rc::new(value.len())));
		projected.next(&Rc::new("four".to_string()));

		assert_eq!(seen.get(), 4);
	}
}
