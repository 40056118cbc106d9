//! Error values carried on a signal's error channel.

use thiserror::Error;

/// Terminal error delivered to observers of a signal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum SignalError {
	/// Error raised by the producer of the values.
	#[error("{0}")]
	Message(String),

	/// A value could not be converted to or from JSON.
	#[error("serialization failed for {context}: {message}")]
	Serialization {
		/// What was being converted (a persistence key, a type name).
		context: String,
		/// The underlying serde error.
		message: String,
	},

	/// Path projection was requested on a signal that carries no JSON view.
	#[error("path projection requires a serializable signal, got {type_name}")]
	PathUnsupported {
		/// Type of the values carried by the signal.
		type_name: &'static str,
	},
}

impl SignalError {
	/// Creates a producer error from a message.
	pub fn msg(message: impl Into<String>) -> Self {
		Self::Message(message.into())
	}

	pub(crate) fn serialization(context: impl Into<String>, error: serde_json::Error) -> Self {
		Self::Serialization {
			context: context.into(),
			message: error.to_string(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_message_display() {
		assert_eq!(SignalError::msg("backend offline").to_string(), "backend offline");
	}

	#[rstest]
	fn test_path_unsupported_display() {
		let err = SignalError::PathUnsupported { type_name: "Foo" };
		assert_eq!(
			err.to_string(),
			"path projection requires a serializable signal, got Foo"
		);
	}

	#[rstest]
	fn test_serialization_display() {
		let source = serde_json::from_str::<u32>("\"x\"").unwrap_err();
		let err = SignalError::serialization("page", source);
		assert!(err.to_string().starts_with("serialization failed for page: "));
	}
}
