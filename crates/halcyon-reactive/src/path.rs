//! Dotted path projection over JSON values.
//!
//! A path such as `"user.addresses.0.city"` walks object keys and array
//! indices. Segments that do not exist yield `Null` instead of an error, so a
//! projection stays valid while the shape of the parent value changes.

use serde::Serialize;
use serde_json::Value;

/// Returns the value at `path` inside `value`.
///
/// An empty path returns the whole value.
///
/// ```
/// use halcyon_reactive::path::project;
/// use serde_json::json;
///
/// let value = json!({"user": {"tags": ["a", "b"]}});
/// assert_eq!(project(&value, "user.tags.1"), json!("b"));
/// assert_eq!(project(&value, "user.name"), json!(null));
/// ```
pub fn project(value: &Value, path: &str) -> Value {
	let mut current = value;
	for segment in segments(path) {
		let next = match current {
			Value::Object(map) => map.get(segment),
			Value::Array(items) => segment.parse::<usize>().ok().and_then(|index| items.get(index)),
			_ => None,
		};
		match next {
			Some(next) => current = next,
			None => return Value::Null,
		}
	}
	current.clone()
}

/// Serializes `value`, yielding `Null` (with a warning) when serialization fails.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Value {
	serde_json::to_value(value).unwrap_or_else(|error| {
		tracing::warn!(
			%error,
			type_name = std::any::type_name::<T>(),
			"value could not be projected to JSON"
		);
		Value::Null
	})
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
	path.split('.').filter(|segment| !segment.is_empty())
}
