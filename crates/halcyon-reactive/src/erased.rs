//! Type-erased signals for consumers that handle heterogeneous values.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::derived::Derived;
use crate::error::SignalError;
use crate::observer::{Observer, Subscription};
use crate::path;

type JsonProjector = Rc<dyn Fn(&dyn Any) -> Value>;

/// A derived view whose value type has been erased.
///
/// Created by [`Signal::erase`](crate::Signal::erase) or
/// [`Signal::erase_json`](crate::Signal::erase_json). The latter keeps a JSON
/// view of the values so that [`select`](Self::select) can project nested fields.
#[derive(Clone)]
pub struct AnySignal {
	values: Derived<dyn Any>,
	json: Option<JsonProjector>,
	type_name: &'static str,
}

impl AnySignal {
	pub(crate) fn new<T: 'static>(values: Derived<dyn Any>) -> Self {
		Self {
			values,
			json: None,
			type_name: std::any::type_name::<T>(),
		}
	}

	pub(crate) fn with_json(mut self, project: impl Fn(&dyn Any) -> Value + 'static) -> Self {
		self.json = Some(Rc::new(project));
		self
	}

	/// The underlying erased view.
	pub fn values(&self) -> &Derived<dyn Any> {
		&self.values
	}

	/// Name of the erased value type.
	pub fn type_name(&self) -> &'static str {
		self.type_name
	}

	/// Returns true if values can be projected to JSON.
	pub fn has_json(&self) -> bool {
		self.json.is_some()
	}

	/// Returns the current value.
	pub fn current(&self) -> Option<Rc<dyn Any>> {
		self.values.value_rc()
	}

	/// Returns the current value if it has type `T`.
	pub fn downcast<T: 'static>(&self) -> Option<Rc<T>> {
		self.current()?.downcast::<T>().ok()
	}

	/// Projects a value carried by this signal to JSON.
	pub fn to_json(&self, value: &dyn Any) -> Option<Value> {
		self.json.as_ref().map(|project| project(value))
	}

	/// Subscribes to the erased values.
	pub fn subscribe_with(&self, observer: Observer<dyn Any>) -> Subscription {
		self.values.subscribe_with(observer)
	}

	/// Returns an erased view of the JSON value at `path`.
	///
	/// # Errors
	///
	/// [`SignalError::PathUnsupported`] when this signal carries no JSON view.
	pub fn select(&self, path: &str) -> Result<AnySignal, SignalError> {
		let project = self.json.clone().ok_or(SignalError::PathUnsupported {
			type_name: self.type_name,
		})?;
		let path = path.to_string();
		let selected: Derived<Value> = self
			.values
			.map(move |value: &dyn Any| path::project(&project(value), &path));
		Ok(selected.erase_json())
	}
}

impl fmt::Debug for AnySignal {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("AnySignal")
			.field("type_name", &self.type_name)
			.field("json", &self.has_json())
			.field("status", &self.values.status())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::signal::Signal;
	use rstest::rstest;
	use serde::Serialize;
	use serde_json::json;
	use std::cell::RefCell;

	#[derive(Serialize)]
	struct Point {
		x: i32,
		y: i32,
	}

	struct Opaque;

	#[rstest]
	fn test_erase_keeps_values_reachable() {
		let signal = Signal::new(7u16);
		let erased = signal.erase();

		assert_eq!(erased.downcast::<u16>().as_deref(), Some(&7));
		assert!(erased.downcast::<u32>().is_none());
		assert!(!erased.has_json());
	}

	#[rstest]
	fn test_erase_json_projects_path() {
		// Arrange
		let signal = Signal::new(Point { x: 1, y: 2 });
		let erased = signal.erase_json();
		let y = erased.select("y").unwrap();
		let seen = Rc::new(RefCell::new(Vec::new()));
		y.subscribe_with(Observer::new({
			let seen = Rc::clone(&seen);
			move |value: &dyn Any| {
				if let Some(value) = value.downcast_ref::<Value>() {
					seen.borrow_mut().push(value.clone());
				}
			}
		}));

		// Act
		signal.set(Point { x: 1, y: 5 });

		// Assert
		assert_eq!(*seen.borrow(), vec![json!(2), json!(5)]);
		assert!(y.has_json());
	}

	#[rstest]
	fn test_select_without_json_fails() {
		let erased = Signal::new(Opaque).erase();

		let err = erased.select("field").unwrap_err();

		assert!(matches!(err, SignalError::PathUnsupported { .. }));
		assert!(err.to_string().contains("Opaque"));
	}
}
