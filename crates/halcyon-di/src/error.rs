//! Dependency injection error types.

use thiserror::Error;

/// Result type for dependency resolution.
pub type DiResult<T> = Result<T, DiError>;

/// Errors raised while resolving a token.
///
/// Every variant is fatal to the single `get` call that produced it and never
/// leaves the injector in a corrupted state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum DiError {
	/// No provider exists for the token in the injector or any ancestor.
	#[error("no provider registered for token: {token}")]
	ProviderNotFound {
		/// Name of the requested token.
		token: String,
	},

	/// The token is already being resolved further up the current resolution path.
	#[error("circular dependency detected: {token}\n  Path: {path}")]
	CircularDependency {
		/// Name of the token that closed the cycle.
		token: String,
		/// Resolution path (format: A -> B -> A).
		path: String,
	},

	/// Resolution nested deeper than the configured limit.
	#[error("maximum resolution depth exceeded: {0}")]
	MaxDepthExceeded(usize),

	/// The provider produced a value of a different type than the token addresses.
	#[error("token {token} resolved to a value that is not a {expected}")]
	TypeMismatch {
		/// Name of the token.
		token: String,
		/// Expected Rust type.
		expected: &'static str,
	},

	/// A factory asked for a token it did not declare as a dependency.
	#[error("provider for {token} did not declare a dependency on {dependency}")]
	UndeclaredDependency {
		/// Token whose provider is running.
		token: String,
		/// Token that was requested but not declared.
		dependency: String,
	},

	/// A factory or constructor reported a failure.
	#[error("failed to construct {token}: {message}")]
	Construction {
		/// Token whose provider failed.
		token: String,
		/// Failure description.
		message: String,
	},
}

impl DiError {
	/// Builds a [`DiError::Construction`] from any displayable failure.
	pub fn construction(token: impl Into<String>, message: impl std::fmt::Display) -> Self {
		Self::Construction {
			token: token.into(),
			message: message.to_string(),
		}
	}

	/// Returns the token name carried by this error, if any.
	pub fn token(&self) -> Option<&str> {
		match self {
			Self::ProviderNotFound { token }
			| Self::CircularDependency { token, .. }
			| Self::TypeMismatch { token, .. }
			| Self::UndeclaredDependency { token, .. }
			| Self::Construction { token, .. } => Some(token),
			Self::MaxDepthExceeded(_) => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_provider_not_found_display() {
		let err = DiError::ProviderNotFound {
			token: "Logger".to_string(),
		};
		assert_eq!(err.to_string(), "no provider registered for token: Logger");
	}

	#[rstest]
	fn test_circular_dependency_display() {
		let err = DiError::CircularDependency {
			token: "A".to_string(),
			path: "A -> B -> A".to_string(),
		};
		let msg = err.to_string();
		assert!(msg.contains("circular dependency detected: A"));
		assert!(msg.contains("A -> B -> A"));
	}

	#[rstest]
	fn test_construction_helper() {
		let err = DiError::construction("Service", "socket closed");
		assert_eq!(err.to_string(), "failed to construct Service: socket closed");
		assert_eq!(err.token(), Some("Service"));
	}

	#[rstest]
	fn test_depth_error_has_no_token() {
		assert_eq!(DiError::MaxDepthExceeded(101).token(), None);
	}
}
