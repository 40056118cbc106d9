//! The component contract.

use crate::error::{PluginExecutionError, ResolverError};

/// A unit of UI driven by the lifecycle manager.
///
/// Only [`render`](Component::render) is required. The fallback renderers
/// return `None` by default, which means "render nothing".
pub trait Component: 'static {
	/// Output of rendering.
	type View;

	/// Renders the component once guards allowed and resolvers are ready.
	fn render(&self) -> Self::View;

	/// Rendered while guards or resolvers are outstanding.
	fn render_loading(&self) -> Option<Self::View> {
		None
	}

	/// Rendered when a resolver failed.
	fn render_error(&self, error: &ResolverError) -> Option<Self::View> {
		let _ = error;
		None
	}

	/// Rendered when a resolver produced an empty value.
	fn render_empty(&self) -> Option<Self::View> {
		None
	}

	/// Receives failures of mount hooks, watch handlers and plugins.
	fn report_error(&self, error: &PluginExecutionError) {
		let _ = error;
	}
}
