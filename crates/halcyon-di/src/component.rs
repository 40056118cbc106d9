//! Component identity used for component-scoped resolution.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of a component instance.
///
/// Component-scoped providers keep one instance per `(token, ComponentId)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(u64);

impl ComponentId {
	/// Allocates a new unique identity.
	pub fn next() -> Self {
		static COUNTER: AtomicU64 = AtomicU64::new(1);
		Self(COUNTER.fetch_add(1, Ordering::Relaxed))
	}

	/// Returns the raw numeric identity.
	pub fn as_u64(self) -> u64 {
		self.0
	}
}

impl fmt::Display for ComponentId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "component#{}", self.0)
	}
}
