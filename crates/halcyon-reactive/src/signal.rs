//! Signal - replay-latest reactive container
//!
//! `Signal<T>` holds the latest value of a stream and pushes every new value
//! to its subscribers synchronously, in subscription order.
//!
//! ## Key Features
//!
//! - **Replay-latest**: a new subscriber immediately receives the current value
//! - **Uninitialized state**: `Signal::uninit()` has no value until the first `set`
//! - **Terminal states**: `complete()` and `error()` end the stream exactly once
//! - **Reentrancy**: subscribers may subscribe, unsubscribe or emit from inside
//!   their own callbacks
//! - **Cheap handles**: clones share the same storage
//!
//! ## Example
//!
//! ```
//! use halcyon_reactive::Signal;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let count = Signal::new(0);
//! let seen = Rc::new(RefCell::new(Vec::new()));
//!
//! let subscription = count.subscribe({
//!     let seen = Rc::clone(&seen);
//!     move |value: &i32| seen.borrow_mut().push(*value)
//! });
//!
//! count.set(1);
//! count.update(|n| *n += 1);
//! subscription.unsubscribe();
//! count.set(100);
//!
//! assert_eq!(*seen.borrow(), vec![0, 1, 2]);
//! assert_eq!(count.value(), Some(100));
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;

use crate::derived::{Derived, Source};
use crate::erased::AnySignal;
use crate::error::SignalError;
use crate::observer::{Observer, Subscription};

/// Unique identifier of a signal, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignalId(usize);

impl SignalId {
	fn next() -> Self {
		static COUNTER: AtomicUsize = AtomicUsize::new(0);
		Self(COUNTER.fetch_add(1, Ordering::Relaxed))
	}
}

impl fmt::Display for SignalId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "signal#{}", self.0)
	}
}

/// Whether a signal still accepts values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalStatus {
	/// Emitting values.
	Active,
	/// Ended through `complete()`.
	Completed,
	/// Ended through `error()`.
	Errored,
}

#[derive(Debug, Clone)]
enum Terminal {
	Completed,
	Errored(SignalError),
}

impl Terminal {
	fn status(&self) -> SignalStatus {
		match self {
			Terminal::Completed => SignalStatus::Completed,
			Terminal::Errored(_) => SignalStatus::Errored,
		}
	}

	fn deliver<T: ?Sized + 'static>(&self, observer: &Observer<T>) {
		match self {
			Terminal::Completed => observer.complete(),
			Terminal::Errored(error) => observer.error(error),
		}
	}
}

struct Subscriber<T: 'static> {
	id: u64,
	observer: Observer<T>,
	subscription: Subscription,
}

impl<T: 'static> Clone for Subscriber<T> {
	fn clone(&self) -> Self {
		Self {
			id: self.id,
			observer: self.observer.clone(),
			subscription: self.subscription.clone(),
		}
	}
}

struct SignalInner<T: 'static> {
	id: SignalId,
	value: RefCell<Option<Rc<T>>>,
	subscribers: RefCell<Vec<Subscriber<T>>>,
	terminal: RefCell<Option<Terminal>>,
	next_subscriber: Cell<u64>,
}

/// A hot, replay-latest reactive value.
///
/// ## Cloning
///
/// `Signal<T>` implements `Clone`; all clones share the value, the subscriber
/// list and the terminal state.
pub struct Signal<T: 'static> {
	inner: Rc<SignalInner<T>>,
}

impl<T: 'static> Signal<T> {
	/// Creates a signal holding `value`.
	pub fn new(value: T) -> Self {
		Self::from_state(Some(Rc::new(value)))
	}

	/// Creates a signal with no value yet.
	pub fn uninit() -> Self {
		Self::from_state(None)
	}

	fn from_state(value: Option<Rc<T>>) -> Self {
		Self {
			inner: Rc::new(SignalInner {
				id: SignalId::next(),
				value: RefCell::new(value),
				subscribers: RefCell::new(Vec::new()),
				terminal: RefCell::new(None),
				next_subscriber: Cell::new(0),
			}),
		}
	}

	/// Returns the identifier of this signal.
	pub fn id(&self) -> SignalId {
		self.inner.id
	}

	/// Returns the current value, `None` while uninitialized.
	pub fn value(&self) -> Option<T>
	where
		T: Clone,
	{
		self.value_rc().map(|value| (*value).clone())
	}

	/// Returns the shared current value, `None` while uninitialized.
	pub fn value_rc(&self) -> Option<Rc<T>> {
		self.inner.value.borrow().clone()
	}

	/// Calls `f` with a reference to the current value.
	pub fn with_value<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
		let current = self.value_rc();
		f(current.as_deref())
	}

	/// Returns true once a value has been set.
	pub fn is_initialized(&self) -> bool {
		self.inner.value.borrow().is_some()
	}

	/// Stores `value` and notifies subscribers in subscription order.
	///
	/// Equal consecutive values are delivered too. Ignored once the signal
	/// has completed or errored.
	pub fn set(&self, value: T) {
		self.emit(Rc::new(value));
	}

	/// Computes the next value from the previous one and sets it.
	pub fn set_with(&self, f: impl FnOnce(Option<&T>) -> T) {
		let next = {
			let current = self.value_rc();
			f(current.as_deref())
		};
		self.set(next);
	}

	/// Modifies a copy of the current value in place and sets it.
	///
	/// Does nothing while the signal is uninitialized.
	pub fn update(&self, f: impl FnOnce(&mut T))
	where
		T: Clone,
	{
		let Some(mut next) = self.value() else {
			tracing::debug!(signal = %self.inner.id, "update on uninitialized signal ignored");
			return;
		};
		f(&mut next);
		self.set(next);
	}

	/// Ends the stream. Every current subscriber gets one completion notice.
	pub fn complete(&self) {
		self.finish(Terminal::Completed);
	}

	/// Ends the stream with `error`, delivered to every current subscriber.
	pub fn error(&self, error: SignalError) {
		self.finish(Terminal::Errored(error));
	}

	/// Returns the terminal state of the signal.
	pub fn status(&self) -> SignalStatus {
		self.inner
			.terminal
			.borrow()
			.as_ref()
			.map_or(SignalStatus::Active, Terminal::status)
	}

	/// Returns true once the signal has completed or errored.
	pub fn is_closed(&self) -> bool {
		self.status() != SignalStatus::Active
	}

	/// Number of active subscribers.
	pub fn subscriber_count(&self) -> usize {
		self.inner.subscribers.borrow().len()
	}

	/// Subscribes to values. The current value, if any, is delivered immediately.
	pub fn subscribe(&self, next: impl Fn(&T) + 'static) -> Subscription {
		self.subscribe_with(Observer::new(next))
	}

	/// Subscribes with a full observer.
	///
	/// After a terminal state the observer receives the last value (if any)
	/// and the terminal notice, and the returned subscription is already closed.
	pub fn subscribe_with(&self, observer: Observer<T>) -> Subscription {
		let current = self.value_rc();
		let terminal = self.inner.terminal.borrow().clone();
		if let Some(terminal) = terminal {
			if let Some(value) = &current {
				observer.next(value);
			}
			terminal.deliver(&observer);
			return Subscription::closed();
		}

		let id = self.inner.next_subscriber.get();
		self.inner.next_subscriber.set(id + 1);

		let weak: Weak<SignalInner<T>> = Rc::downgrade(&self.inner);
		let subscription = Subscription::new(move || {
			if let Some(inner) = weak.upgrade() {
				inner.subscribers.borrow_mut().retain(|s| s.id != id);
			}
		});
		self.inner.subscribers.borrow_mut().push(Subscriber {
			id,
			observer: observer.clone(),
			subscription: subscription.clone(),
		});
		tracing::trace!(signal = %self.inner.id, subscriber = id, "subscribed");

		if let Some(value) = current {
			observer.next(&value);
		}
		subscription
	}

	/// Returns a derived view of this signal.
	pub fn as_derived(&self) -> Derived<T> {
		Derived::from_source(self.clone())
	}

	/// Returns a derived view that applies `project` to every value.
	pub fn map<U: 'static>(&self, project: impl Fn(&T) -> U + 'static) -> Derived<U> {
		self.as_derived().map(project)
	}

	/// Returns a derived view of the JSON value at `path` (e.g. `"user.tags.0"`).
	pub fn select(&self, path: &str) -> Derived<serde_json::Value>
	where
		T: Serialize,
	{
		self.as_derived().select(path)
	}

	/// Erases the value type.
	pub fn erase(&self) -> AnySignal {
		self.as_derived().erase()
	}

	/// Erases the value type, keeping a JSON view for path projection.
	pub fn erase_json(&self) -> AnySignal
	where
		T: Serialize,
	{
		self.as_derived().erase_json()
	}

	/// Returns true if both handles share the same storage.
	pub fn ptr_eq(&self, other: &Signal<T>) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}

	fn emit(&self, value: Rc<T>) {
		if self.inner.terminal.borrow().is_some() {
			tracing::debug!(signal = %self.inner.id, "emission on closed signal ignored");
			return;
		}
		*self.inner.value.borrow_mut() = Some(Rc::clone(&value));

		let snapshot = self.inner.subscribers.borrow().clone();
		for subscriber in snapshot {
			if subscriber.subscription.is_closed() {
				continue;
			}
			subscriber.observer.next(&value);
		}
	}

	fn finish(&self, terminal: Terminal) {
		{
			let mut state = self.inner.terminal.borrow_mut();
			if state.is_some() {
				tracing::debug!(signal = %self.inner.id, "signal already closed");
				return;
			}
			*state = Some(terminal.clone());
		}
		tracing::trace!(signal = %self.inner.id, status = ?terminal.status(), "signal closed");

		let subscribers = std::mem::take(&mut *self.inner.subscribers.borrow_mut());
		for subscriber in subscribers {
			if subscriber.subscription.is_closed() {
				continue;
			}
			subscriber.subscription.unsubscribe();
			terminal.deliver(&subscriber.observer);
		}
	}
}

impl<T: 'static> Source<T> for Signal<T> {
	fn current(&self) -> Option<Rc<T>> {
		self.value_rc()
	}

	fn observe(&self, observer: Observer<T>) -> Subscription {
		self.subscribe_with(observer)
	}

	fn status(&self) -> SignalStatus {
		Signal::status(self)
	}
}

impl<T: 'static> Clone for Signal<T> {
	fn clone(&self) -> Self {
		Self {
			inner: Rc::clone(&self.inner),
		}
	}
}

impl<T: Default + 'static> Default for Signal<T> {
	fn default() -> Self {
		Self::new(T::default())
	}
}

impl<T: 'static> From<Signal<T>> for Derived<T> {
	fn from(signal: Signal<T>) -> Self {
		Derived::from_source(signal)
	}
}

impl<T: fmt::Debug + 'static> fmt::Debug for Signal<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Signal")
			.field("id", &self.inner.id)
			.field("value", &self.value_rc())
			.field("status", &self.status())
			.field("subscribers", &self.subscriber_count())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn recorder<T: Clone + 'static>(signal: &Signal<T>) -> (Rc<RefCell<Vec<T>>>, Subscription) {
		let seen = Rc::new(RefCell::new(Vec::new()));
		let subscription = signal.subscribe({
			let seen = Rc::clone(&seen);
			move |value: &T| seen.borrow_mut().push(value.clone())
		});
		(seen, subscription)
	}

	#[rstest]
	fn test_uninitialized_value_is_none() {
		let signal: Signal<u32> = Signal::uninit();

		assert_eq!(signal.value(), None);
		assert!(!signal.is_initialized());
		assert!(signal.with_value(|value| value.is_none()));
	}

	#[rstest]
	fn test_subscriber_receives_current_then_updates() {
		// Arrange
		let signal = Signal::new(1);

		// Act
		let (seen, _subscription) = recorder(&signal);
		signal.set(2);
		signal.set(2);

		// Assert: no deduplication
		assert_eq!(*seen.borrow(), vec![1, 2, 2]);
	}

	#[rstest]
	fn test_uninitialized_signal_does_not_replay() {
		let signal: Signal<&'static str> = Signal::uninit();
		let (seen, _subscription) = recorder(&signal);
		assert!(seen.borrow().is_empty());

		signal.set("first");

		assert_eq!(*seen.borrow(), vec!["first"]);
	}

	#[rstest]
	fn test_set_with_and_update() {
		let signal: Signal<u32> = Signal::uninit();

		signal.update(|n| *n += 1);
		assert_eq!(signal.value(), None);

		signal.set_with(|prev| prev.copied().unwrap_or(10) + 1);
		signal.update(|n| *n *= 2);

		assert_eq!(signal.value(), Some(22));
	}

	#[rstest]
	fn test_unsubscribe_removes_subscriber() {
		let signal = Signal::new(0);
		let (seen, subscription) = recorder(&signal);
		assert_eq!(signal.subscriber_count(), 1);

		subscription.unsubscribe();
		signal.set(1);

		assert_eq!(signal.subscriber_count(), 0);
		assert_eq!(*seen.borrow(), vec![0]);
	}

	#[rstest]
	fn test_subscriber_can_unsubscribe_itself() {
		// Arrange
		let signal = Signal::new(0);
		let calls = Rc::new(Cell::new(0));
		let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
		let subscription = signal.subscribe({
			let calls = Rc::clone(&calls);
			let slot = Rc::clone(&slot);
			move |value: &i32| {
				calls.set(calls.get() + 1);
				if *value == 1 {
					let own = slot.borrow().clone();
					if let Some(own) = own {
						own.unsubscribe();
					}
				}
			}
		});
		*slot.borrow_mut() = Some(subscription);

		// Act
		signal.set(1);
		signal.set(2);

		// Assert: initial replay plus the emission that unsubscribed
		assert_eq!(calls.get(), 2);
		assert_eq!(signal.subscriber_count(), 0);
	}

	#[rstest]
	fn test_subscriber_removed_mid_emission_is_skipped() {
		// Arrange: the first subscriber removes the second one
		let signal: Signal<u8> = Signal::uninit();
		let second_calls = Rc::new(Cell::new(0));
		let second_slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
		let _first = signal.subscribe({
			let second_slot = Rc::clone(&second_slot);
			move |_: &u8| {
				let second = second_slot.borrow().clone();
				if let Some(second) = second {
					second.unsubscribe();
				}
			}
		});
		let second = signal.subscribe({
			let second_calls = Rc::clone(&second_calls);
			move |_: &u8| second_calls.set(second_calls.get() + 1)
		});
		*second_slot.borrow_mut() = Some(second);

		// Act
		signal.set(1);

		// Assert
		assert_eq!(second_calls.get(), 0);
	}

	#[rstest]
	fn test_complete_notifies_once_and_ignores_later_values() {
		// Arrange
		let signal = Signal::new(5);
		let completions = Rc::new(Cell::new(0));
		let subscription = signal.subscribe_with(Observer::new(|_: &i32| {}).on_complete({
			let completions = Rc::clone(&completions);
			move || completions.set(completions.get() + 1)
		}));

		// Act
		signal.complete();
		signal.complete();
		signal.set(6);

		// Assert
		assert_eq!(completions.get(), 1);
		assert!(subscription.is_closed());
		assert_eq!(signal.value(), Some(5));
		assert_eq!(signal.status(), SignalStatus::Completed);
	}

	#[rstest]
	fn test_late_subscriber_gets_last_value_then_completion() {
		// Arrange
		let signal = Signal::new("last");
		signal.complete();
		let events = Rc::new(RefCell::new(Vec::new()));

		// Act
		let subscription = signal.subscribe_with(
			Observer::new({
				let events = Rc::clone(&events);
				move |value: &&str| events.borrow_mut().push(value.to_string())
			})
			.on_complete({
				let events = Rc::clone(&events);
				move || events.borrow_mut().push("complete".to_string())
			}),
		);

		// Assert
		assert_eq!(*events.borrow(), vec!["last", "complete"]);
		assert!(subscription.is_closed());
		assert_eq!(signal.subscriber_count(), 0);
	}

	#[rstest]
	fn test_error_is_routed_to_error_handler() {
		let signal: Signal<u32> = Signal::uninit();
		let received = Rc::new(RefCell::new(None));
		signal.subscribe_with(Observer::new(|_: &u32| {}).on_error({
			let received = Rc::clone(&received);
			move |error: &SignalError| *received.borrow_mut() = Some(error.clone())
		}));

		signal.error(SignalError::msg("boom"));

		assert_eq!(*received.borrow(), Some(SignalError::msg("boom")));
		assert_eq!(signal.status(), SignalStatus::Errored);
	}

	#[rstest]
	fn test_emission_from_inside_subscriber() {
		let signal = Signal::new(0);
		let _echo = signal.subscribe({
			let signal = signal.clone();
			move |value: &i32| {
				if *value == 1 {
					signal.set(2);
				}
			}
		});

		signal.set(1);

		assert_eq!(signal.value(), Some(2));
	}
}
