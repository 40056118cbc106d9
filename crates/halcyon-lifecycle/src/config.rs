//! Lifecycle manager configuration.

use halcyon_di::DEFAULT_MAX_RESOLUTION_DEPTH;

use crate::diagnostics::Severity;

/// Tunables applied by a [`LifecycleManager`](crate::LifecycleManager).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleConfig {
	/// Catch panics raised by plugins, mount hooks and watch handlers.
	pub catch_panics: bool,
	/// Forward plugin failures to [`Component::report_error`](crate::Component::report_error).
	pub forward_errors_to_component: bool,
	/// Minimum severity logged by the default diagnostics sink.
	pub diagnostics_level: Severity,
	/// Resolution depth limit for component injectors.
	pub max_resolution_depth: usize,
}

impl Default for LifecycleConfig {
	fn default() -> Self {
		Self {
			catch_panics: true,
			forward_errors_to_component: true,
			diagnostics_level: Severity::Warn,
			max_resolution_depth: DEFAULT_MAX_RESOLUTION_DEPTH,
		}
	}
}
