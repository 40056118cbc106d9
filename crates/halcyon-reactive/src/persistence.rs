//! Persistence adapters
//!
//! An adapter keeps a signal and an external key/value store in step: every
//! emission of the signal is written to the store, and [`PersistenceAdapter::sync`]
//! pushes values changed externally back into the linked signals. A link lives
//! until its owner signal (typically a component's `unmount` signal) completes,
//! or until the linked signal itself completes or errors.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::SignalError;
use crate::observer::{Observer, Subscription};
use crate::signal::Signal;

/// Bidirectional binding between signals and an external store.
pub trait PersistenceAdapter {
	/// Links `signal` to `key` until `owner` completes.
	///
	/// A value already stored under `key` is pushed into the signal; otherwise
	/// the signal's current value, if any, is written to the store.
	///
	/// # Errors
	///
	/// [`SignalError::Serialization`] when the stored value does not
	/// deserialize into `T`.
	fn link<T>(
		&self,
		key: &str,
		signal: &Signal<T>,
		owner: &Signal<()>,
	) -> Result<Subscription, SignalError>
	where
		T: Serialize + DeserializeOwned + 'static;

	/// Pushes the stored value of every linked key into its signal.
	///
	/// # Errors
	///
	/// The first deserialization failure; remaining links are still synced.
	fn sync(&self) -> Result<(), SignalError>;
}

type Push = Rc<dyn Fn(&Value) -> Result<(), SignalError>>;

struct Link {
	key: String,
	push: Push,
	subscription: Subscription,
}

/// In-memory adapter backed by a JSON map.
///
/// # Examples
///
/// ```
/// use halcyon_reactive::{MemoryAdapter, PersistenceAdapter, Signal};
/// use serde_json::json;
///
/// let adapter = MemoryAdapter::new();
/// let owner: Signal<()> = Signal::uninit();
/// let page = Signal::new(1u32);
///
/// adapter.link("page", &page, &owner).unwrap();
/// page.set(2);
/// assert_eq!(adapter.get("page"), Some(json!(2)));
///
/// adapter.set_external("page", json!(7));
/// adapter.sync().unwrap();
/// assert_eq!(page.value(), Some(7));
/// ```
#[derive(Clone, Default)]
pub struct MemoryAdapter {
	inner: Rc<MemoryAdapterInner>,
}

#[derive(Default)]
struct MemoryAdapterInner {
	store: RefCell<BTreeMap<String, Value>>,
	links: RefCell<Vec<Link>>,
}

impl MemoryAdapter {
	/// Creates an empty adapter.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the stored value for `key`.
	pub fn get(&self, key: &str) -> Option<Value> {
		self.inner.store.borrow().get(key).cloned()
	}

	/// Changes a stored value without notifying linked signals, as an
	/// external writer would. Call [`sync`](PersistenceAdapter::sync) to propagate.
	pub fn set_external(&self, key: impl Into<String>, value: Value) {
		self.inner.store.borrow_mut().insert(key.into(), value);
	}

	/// Keys with a live link.
	pub fn linked_keys(&self) -> Vec<String> {
		self.inner
			.links
			.borrow()
			.iter()
			.map(|link| link.key.clone())
			.collect()
	}

	/// Snapshot of the whole store.
	pub fn snapshot(&self) -> BTreeMap<String, Value> {
		self.inner.store.borrow().clone()
	}

	fn prune(inner: &MemoryAdapterInner) {
		let removed = {
			let mut links = inner.links.borrow_mut();
			let before = links.len();
			links.retain(|link| !link.subscription.is_closed());
			before - links.len()
		};
		if removed > 0 {
			tracing::trace!(removed, "closed persistence links pruned");
		}
	}

	fn unlink(&self, subscription: &Subscription) {
		subscription.unsubscribe();
		let removed = {
			let mut links = self.inner.links.borrow_mut();
			let before = links.len();
			links.retain(|link| !link.subscription.ptr_eq(subscription));
			before - links.len()
		};
		if removed > 0 {
			tracing::trace!(removed, "persistence link released");
		}
	}
}

impl PersistenceAdapter for MemoryAdapter {
	fn link<T>(
		&self,
		key: &str,
		signal: &Signal<T>,
		owner: &Signal<()>,
	) -> Result<Subscription, SignalError>
	where
		T: Serialize + DeserializeOwned + 'static,
	{
		let stored = self.get(key);
		match stored {
			Some(value) => {
				let value = serde_json::from_value::<T>(value)
					.map_err(|error| SignalError::serialization(key, error))?;
				signal.set(value);
			}
			None => {
				if let Some(current) = signal.value_rc() {
					let value = serde_json::to_value(&*current)
						.map_err(|error| SignalError::serialization(key, error))?;
					self.set_external(key, value);
				}
			}
		}

		let write = {
			let inner = Rc::downgrade(&self.inner);
			let key = key.to_string();
			move |value: &T| {
				let Some(inner) = inner.upgrade() else {
					return;
				};
				match serde_json::to_value(value) {
					Ok(json) => {
						inner.store.borrow_mut().insert(key.clone(), json);
					}
					Err(error) => tracing::warn!(%error, key = %key, "failed to persist value"),
				}
			}
		};
		let prune = {
			let inner = Rc::downgrade(&self.inner);
			move || {
				if let Some(inner) = inner.upgrade() {
					Self::prune(&inner);
				}
			}
		};
		let on_error = {
			let prune = prune.clone();
			move |_: &SignalError| prune()
		};
		let subscription =
			signal.subscribe_with(Observer::new(write).on_error(on_error).on_complete(prune));
		if subscription.is_closed() {
			tracing::debug!(key, "signal already closed, link not established");
			return Ok(subscription);
		}

		let push: Push = {
			let signal = signal.clone();
			let key = key.to_string();
			Rc::new(move |value: &Value| {
				let value = serde_json::from_value::<T>(value.clone())
					.map_err(|error| SignalError::serialization(key.as_str(), error))?;
				signal.set(value);
				Ok(())
			})
		};
		self.inner.links.borrow_mut().push(Link {
			key: key.to_string(),
			push,
			subscription: subscription.clone(),
		});
		tracing::debug!(key, "persistence link established");

		let adapter = self.clone();
		let linked = subscription.clone();
		owner.subscribe_with(Observer::new(|_: &()| {}).on_complete(move || adapter.unlink(&linked)));

		Ok(subscription)
	}

	fn sync(&self) -> Result<(), SignalError> {
		let pending: Vec<(Push, Value)> = {
			let store = self.inner.store.borrow();
			self.inner
				.links
				.borrow()
				.iter()
				.filter(|link| !link.subscription.is_closed())
				.filter_map(|link| {
					store
						.get(&link.key)
						.map(|value| (Rc::clone(&link.push), value.clone()))
				})
				.collect()
		};

		let mut first_error = None;
		for (push, value) in pending {
			if let Err(error) = push(&value) {
				tracing::warn!(%error, "failed to sync persisted value");
				first_error.get_or_insert(error);
			}
		}
		first_error.map_or(Ok(()), Err)
	}
}

impl fmt::Debug for MemoryAdapter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MemoryAdapter")
			.field("store", &self.inner.store.borrow())
			.field("links", &self.linked_keys())
			.finish()
	}
}
