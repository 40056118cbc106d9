//! # Halcyon Lifecycle
//!
//! Drives component instances through their lifecycle and applies decorator
//! plugins at each phase.
//!
//! ## Phases
//!
//! `Created -> BeforeMount -> Mounted -> AfterMount -> (active) -> Unmount`
//!
//! ## Built-in plugins
//!
//! - **Guard** (`BeforeMount`): gates mounting; a denial renders the guard fallback
//! - **Resolver** (`BeforeMount`): loads data and drives loading, error and empty views
//! - **Watch** (`AfterMount`): calls handlers with the latest values of watched signals
//! - **Mount** (`AfterMount`): runs mount hooks once and their cleanups on unmount
//!
//! Failures inside plugins are caught at the plugin boundary, reported to the
//! diagnostics sink and forwarded to [`Component::report_error`]. They never
//! stop sibling plugins or the phase sequence.
//!
//! ## Example
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! use halcyon_lifecycle::{Component, ComponentDescriptor, LifecycleManager, RenderState};
//! use halcyon_reactive::Signal;
//!
//! struct Clock {
//!     ticks: Signal<u32>,
//!     seen: Rc<Cell<u32>>,
//! }
//!
//! impl Component for Clock {
//!     type View = String;
//!
//!     fn render(&self) -> String {
//!         format!("ticks: {}", self.ticks.value().unwrap_or_default())
//!     }
//! }
//!
//! let descriptor = Rc::new(
//!     ComponentDescriptor::<Clock>::builder("Clock")
//!         .property("ticks", |clock: &Clock| clock.ticks.erase())
//!         .handler("on_tick", |clock: &Clock, values| {
//!             clock.seen.set(*values.get::<u32>(0).unwrap_or_default());
//!             Ok(())
//!         })
//!         .watch("ticks", "on_tick")
//!         .build()
//!         .unwrap(),
//! );
//!
//! let seen = Rc::new(Cell::new(0));
//! let manager = LifecycleManager::with_defaults();
//! let host = manager
//!     .create(&descriptor, None, |_| {
//!         Ok(Clock { ticks: Signal::new(1), seen: Rc::clone(&seen) })
//!     })
//!     .unwrap();
//!
//! host.mount();
//! host.component().ticks.set(2);
//!
//! assert_eq!(seen.get(), 2);
//! assert_eq!(host.render_state(), RenderState::Ready);
//! assert_eq!(host.view().as_deref(), Some("ticks: 2"));
//! ```

pub mod component;
pub mod config;
pub mod context;
pub mod descriptor;
pub mod diagnostics;
pub mod error;
pub mod host;
pub mod manager;
pub mod phase;
pub mod plugin;
pub mod plugins;
pub mod registry;
pub mod spawner;

pub use component::Component;
pub use config::LifecycleConfig;
pub use context::{ComponentContext, ResolverState};
pub use descriptor::{Cleanup, ComponentDescriptor, ComponentDescriptorBuilder};
pub use diagnostics::{
	Diagnostics, MemoryDiagnostics, Report, Severity, TracingDiagnostics, diagnostics_token,
};
pub use error::{
	HookError, HookResult, LifecycleError, LifecycleResult, PluginExecutionError, ResolverError,
};
pub use host::{ComponentHost, HostStatus};
pub use manager::LifecycleManager;
pub use phase::{Phase, RenderState};
pub use plugin::{DecoratorPlugin, ErrorSink, PluginContext, PluginFlow};
pub use plugins::{
	CanActivate, GuardPlugin, GuardResult, MountPlugin, Resolution, Resolve, ResolverPlugin,
	WatchEntry, WatchPlugin, WatchValues,
};
pub use registry::PluginRegistry;
pub use spawner::{Spawner, TokioSpawner};
