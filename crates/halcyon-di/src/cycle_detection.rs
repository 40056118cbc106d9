//! Per-injector circular dependency detection
//!
//! Each injector tracks the tokens it is currently instantiating. Entering a
//! token that is already on the path is a cycle; leaving is handled by
//! [`ResolutionGuard`] on drop, so the set is restored even when a provider
//! fails or panics.
//!
//! ## Features
//!
//! - **O(1) Circular Detection**: `HashSet<TokenKey>` lookup
//! - **Depth Limiting**: configurable maximum nesting
//! - **RAII**: automatic cleanup via `ResolutionGuard`

use std::cell::RefCell;
use std::collections::HashSet;

use crate::error::{DiError, DiResult};
use crate::token::{ErasedToken, TokenKey};

/// Default maximum resolution depth.
pub const DEFAULT_MAX_RESOLUTION_DEPTH: usize = 100;

/// Tokens currently being resolved by one injector.
#[derive(Debug)]
pub(crate) struct ResolutionState {
	resolving: RefCell<HashSet<TokenKey>>,
	path: RefCell<Vec<ErasedToken>>,
	max_depth: usize,
}

impl ResolutionState {
	pub(crate) fn new(max_depth: usize) -> Self {
		Self {
			resolving: RefCell::new(HashSet::new()),
			path: RefCell::new(Vec::new()),
			max_depth,
		}
	}

	/// Records the start of resolution for `token`.
	pub(crate) fn begin(&self, token: ErasedToken) -> DiResult<ResolutionGuard<'_>> {
		if self.resolving.borrow().contains(&token.key()) {
			return Err(DiError::CircularDependency {
				token: token.name().to_string(),
				path: self.cycle_path(token),
			});
		}

		let depth = self.path.borrow().len() + 1;
		if depth > self.max_depth {
			return Err(DiError::MaxDepthExceeded(depth));
		}

		self.resolving.borrow_mut().insert(token.key());
		self.path.borrow_mut().push(token);

		Ok(ResolutionGuard { state: self, token })
	}

	#[cfg(test)]
	pub(crate) fn is_resolving(&self, key: TokenKey) -> bool {
		self.resolving.borrow().contains(&key)
	}

	pub(crate) fn max_depth(&self) -> usize {
		self.max_depth
	}

	pub(crate) fn depth(&self) -> usize {
		self.path.borrow().len()
	}

	fn cycle_path(&self, closing: ErasedToken) -> String {
		let path = self.path.borrow();
		match path.iter().position(|t| t.key() == closing.key()) {
			Some(start) => {
				let names: Vec<&str> = path[start..].iter().map(|t| t.name()).collect();
				format!("{} -> {}", names.join(" -> "), closing.name())
			}
			None => format!("Unknown cycle involving {}", closing.name()),
		}
	}

	fn end(&self, token: ErasedToken) {
		self.resolving.borrow_mut().remove(&token.key());
		let mut path = self.path.borrow_mut();
		if let Some(pos) = path.iter().rposition(|t| t.key() == token.key()) {
			path.remove(pos);
		}
	}
}

/// RAII guard: removes the token from the resolving set on drop.
#[derive(Debug)]
pub(crate) struct ResolutionGuard<'a> {
	state: &'a ResolutionState,
	token: ErasedToken,
}

impl Drop for ResolutionGuard<'_> {
	fn drop(&mut self) {
		self.state.end(self.token);
	}
}
