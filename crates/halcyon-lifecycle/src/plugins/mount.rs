//! Mount hooks
//!
//! Hooks run once per component lifetime, in declaration order. A cleanup
//! returned by a hook is registered against unmount.

use crate::component::Component;
use crate::error::PluginExecutionError;
use crate::phase::Phase;
use crate::plugin::{DecoratorPlugin, PluginContext, PluginFlow};

use super::MOUNT_PLUGIN_ID;

/// Runs mount hooks.
#[derive(Debug, Default, Clone, Copy)]
pub struct MountPlugin;

impl<C: Component> DecoratorPlugin<C> for MountPlugin {
	fn id(&self) -> &str {
		MOUNT_PLUGIN_ID
	}

	fn phase(&self) -> Phase {
		Phase::AfterMount
	}

	fn priority(&self) -> i32 {
		10
	}

	fn execute(&self, cx: &PluginContext<'_, C>) -> Result<PluginFlow, PluginExecutionError> {
		let context = cx.context();
		if !context.claim_mount_hooks() {
			tracing::trace!(component = context.name(), "mount hooks already ran");
			return Ok(PluginFlow::Continue);
		}

		let sink = cx.error_sink();
		for hook in cx.descriptor().mount_hooks() {
			let label = format!("mount hook '{}'", hook.name());
			if let Some(Some(cleanup)) = sink.run(&label, |component| (hook.hook)(component, context)) {
				context.on_unmount(cleanup);
			}
		}
		Ok(PluginFlow::Continue)
	}
}
