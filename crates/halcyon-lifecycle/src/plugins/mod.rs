//! Built-in decorator plugins
//!
//! | Plugin | Phase | Priority |
//! |--------|-------|----------|
//! | [`GuardPlugin`] | `BeforeMount` | 0 |
//! | [`ResolverPlugin`] | `BeforeMount` | 10 |
//! | [`WatchPlugin`] | `AfterMount` | 0 |
//! | [`MountPlugin`] | `AfterMount` | 10 |
//!
//! Watchers are established before mount hooks run, so a hook that changes a
//! watched signal is observed by its handler.

pub mod guard;
pub mod mount;
pub mod resolver;
pub mod watch;

pub use guard::{CanActivate, GuardPlugin, GuardResult};
pub use mount::MountPlugin;
pub use resolver::{Resolution, Resolve, ResolverPlugin};
pub use watch::{WatchEntry, WatchPlugin, WatchValues};

/// Id of the guard plugin.
pub const GUARD_PLUGIN_ID: &str = "guard";
/// Id of the resolver plugin.
pub const RESOLVER_PLUGIN_ID: &str = "resolver";
/// Id of the watch plugin.
pub const WATCH_PLUGIN_ID: &str = "watch";
/// Id of the mount plugin.
pub const MOUNT_PLUGIN_ID: &str = "mount";
