//! Signal combinators.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::derived::{Derived, Source};
use crate::error::SignalError;
use crate::observer::{Observer, Subscription};
use crate::signal::SignalStatus;

/// Combines the latest values of several signals.
///
/// The result emits once every source has emitted at least once, then again on
/// every emission from any source, carrying the latest value of each source in
/// source order. It completes when all sources have completed (or when a source
/// completes without ever emitting) and errors as soon as any source errors.
///
/// # Examples
///
/// ```
/// use halcyon_reactive::{Signal, combine_latest};
///
/// let first = Signal::new(1);
/// let second: Signal<i32> = Signal::uninit();
/// let sum = combine_latest([first.as_derived(), second.as_derived()])
///     .map(|values| values.iter().map(|v| **v).sum::<i32>());
///
/// assert_eq!(sum.value(), None);
/// second.set(2);
/// assert_eq!(sum.value(), Some(3));
/// ```
pub fn combine_latest<T: ?Sized + 'static>(
	sources: impl IntoIterator<Item = Derived<T>>,
) -> Derived<Vec<Rc<T>>> {
	Derived::from_source(CombineLatest {
		sources: sources.into_iter().collect(),
	})
}

struct CombineLatest<T: ?Sized + 'static> {
	sources: Vec<Derived<T>>,
}

impl<T: ?Sized + 'static> Source<Vec<Rc<T>>> for CombineLatest<T> {
	fn current(&self) -> Option<Rc<Vec<Rc<T>>>> {
		if self.sources.is_empty() {
			return None;
		}
		self.sources
			.iter()
			.map(Derived::value_rc)
			.collect::<Option<Vec<_>>>()
			.map(Rc::new)
	}

	fn observe(&self, observer: Observer<Vec<Rc<T>>>) -> Subscription {
		let count = self.sources.len();
		if count == 0 {
			observer.complete();
			return Subscription::closed();
		}

		let state = Rc::new(CombineState {
			latest: RefCell::new(vec![None; count]),
			completed: RefCell::new(vec![false; count]),
			done: Cell::new(false),
			inner: RefCell::new(Vec::new()),
			outer: RefCell::new(None),
		});
		let weak: Weak<CombineState<T>> = Rc::downgrade(&state);
		let outer = Subscription::new(move || {
			if let Some(state) = weak.upgrade() {
				state.done.set(true);
				state.release();
			}
		});
		*state.outer.borrow_mut() = Some(outer.clone());

		for (index, source) in self.sources.iter().enumerate() {
			if state.done.get() {
				break;
			}
			let inner = Observer::shared({
				let state = Rc::clone(&state);
				let observer = observer.clone();
				move |value: &Rc<T>| state.on_next(index, value, &observer)
			})
			.on_error({
				let state = Rc::clone(&state);
				let observer = observer.clone();
				move |error: &SignalError| state.on_error(error, &observer)
			})
			.on_complete({
				let state = Rc::clone(&state);
				let observer = observer.clone();
				move || state.on_complete(index, &observer)
			});

			let subscription = source.subscribe_with(inner);
			if state.done.get() {
				subscription.unsubscribe();
			} else {
				state.inner.borrow_mut().push(subscription);
			}
		}
		outer
	}

	fn status(&self) -> SignalStatus {
		let statuses: Vec<SignalStatus> = self.sources.iter().map(Derived::status).collect();
		if statuses.contains(&SignalStatus::Errored) {
			SignalStatus::Errored
		} else if !statuses.is_empty() && statuses.iter().all(|s| *s == SignalStatus::Completed) {
			SignalStatus::Completed
		} else {
			SignalStatus::Active
		}
	}
}

struct CombineState<T: ?Sized + 'static> {
	latest: RefCell<Vec<Option<Rc<T>>>>,
	completed: RefCell<Vec<bool>>,
	done: Cell<bool>,
	inner: RefCell<Vec<Subscription>>,
	outer: RefCell<Option<Subscription>>,
}

impl<T: ?Sized + 'static> CombineState<T> {
	fn on_next(&self, index: usize, value: &Rc<T>, observer: &Observer<Vec<Rc<T>>>) {
		if self.done.get() {
			return;
		}
		let combined = {
			let mut latest = self.latest.borrow_mut();
			latest[index] = Some(Rc::clone(value));
			latest.iter().cloned().collect::<Option<Vec<_>>>()
		};
		if let Some(values) = combined {
			observer.next(&Rc::new(values));
		}
	}

	fn on_error(&self, error: &SignalError, observer: &Observer<Vec<Rc<T>>>) {
		if self.done.replace(true) {
			return;
		}
		self.release();
		observer.error(error);
	}

	fn on_complete(&self, index: usize, observer: &Observer<Vec<Rc<T>>>) {
		if self.done.get() {
			return;
		}
		let finished = {
			let mut completed = self.completed.borrow_mut();
			completed[index] = true;
			let never_emitted = self.latest.borrow()[index].is_none();
			never_emitted || completed.iter().all(|done| *done)
		};
		if finished {
			self.done.set(true);
			self.release();
			observer.complete();
		}
	}

	fn release(&self) {
		let inner = std::mem::take(&mut *self.inner.borrow_mut());
		for subscription in inner {
			subscription.unsubscribe();
		}
		let outer = self.outer.borrow_mut().take();
		if let Some(outer) = outer {
			outer.unsubscribe();
		}
	}
}
