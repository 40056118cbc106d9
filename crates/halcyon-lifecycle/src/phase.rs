//! Lifecycle phases and render states.

use std::fmt;

use crate::error::ResolverError;

/// A lifecycle phase. Each phase runs at most once per instance, in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
	/// Injector and component instance exist.
	Created,
	/// Guards and resolvers run.
	BeforeMount,
	/// The `mounted` signal fires.
	Mounted,
	/// Watchers and mount hooks are installed.
	AfterMount,
	/// Teardown. Terminal.
	Unmount,
}

impl Phase {
	/// Every phase in execution order.
	pub const ALL: [Phase; 5] = [
		Phase::Created,
		Phase::BeforeMount,
		Phase::Mounted,
		Phase::AfterMount,
		Phase::Unmount,
	];

	/// The phase run after this one while mounting, if any.
	///
	/// `Unmount` is only reached through an explicit unmount.
	pub fn next_mount_phase(self) -> Option<Phase> {
		match self {
			Phase::Created => Some(Phase::BeforeMount),
			Phase::BeforeMount => Some(Phase::Mounted),
			Phase::Mounted => Some(Phase::AfterMount),
			Phase::AfterMount | Phase::Unmount => None,
		}
	}

	/// Lower-case phase name.
	pub fn as_str(self) -> &'static str {
		match self {
			Phase::Created => "created",
			Phase::BeforeMount => "before_mount",
			Phase::Mounted => "mounted",
			Phase::AfterMount => "after_mount",
			Phase::Unmount => "unmount",
		}
	}
}

impl fmt::Display for Phase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// What a component should currently display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderState {
	/// Guards have not settled yet.
	Pending,
	/// A guard denied activation.
	Blocked {
		/// Declaration index of the denying guard.
		guard: usize,
	},
	/// At least one resolver is still pending.
	Loading,
	/// A resolver failed.
	Failed(ResolverError),
	/// Every resolver finished and at least one produced an empty value.
	Empty,
	/// Ready to render.
	Ready,
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_mount_sequence_stops_before_unmount() {
		let mut sequence = vec![Phase::Created];
		while let Some(next) = sequence.last().and_then(|p| p.next_mount_phase()) {
			sequence.push(next);
		}

		assert_eq!(
			sequence,
			vec![
				Phase::Created,
				Phase::BeforeMount,
				Phase::Mounted,
				Phase::AfterMount
			]
		);
	}

	#[rstest]
	fn test_phases_are_ordered() {
		let mut sorted = Phase::ALL;
		sorted.sort();
		assert_eq!(sorted, Phase::ALL);
		assert_eq!(Phase::BeforeMount.to_string(), "before_mount");
	}
}
