//! Local task spawning for deferred guards and resolvers.

use futures::future::LocalBoxFuture;
use futures::task::LocalSpawnExt;

/// Runs `'static` non-`Send` futures on the current thread.
pub trait Spawner {
	/// Spawns `task`. The task is detached.
	fn spawn(&self, task: LocalBoxFuture<'static, ()>);
}

/// Spawns onto tokio's local task set.
///
/// Tasks are spawned with [`tokio::task::spawn_local`], so every mount that
/// defers a guard or resolver must run inside a [`tokio::task::LocalSet`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSpawner;

impl Spawner for TokioSpawner {
	fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
		tokio::task::spawn_local(task);
	}
}

impl Spawner for futures::executor::LocalSpawner {
	fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
		if let Err(error) = LocalSpawnExt::spawn_local(self, task) {
			tracing::error!(%error, "local executor refused a lifecycle task");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use futures::FutureExt;
	use futures::executor::LocalPool;
	use rstest::rstest;
	use std::cell::Cell;
	use std::rc::Rc;

	#[rstest]
	fn test_local_pool_spawner_runs_task() {
		let mut pool = LocalPool::new();
		let spawner = pool.spawner();
		let ran = Rc::new(Cell::new(false));

		Spawner::spawn(
			&spawner,
			{
				let ran = Rc::clone(&ran);
				async move { ran.set(true) }
			}
			.boxed_local(),
		);
		pool.run_until_stalled();

		assert!(ran.get());
	}

	#[tokio::test(flavor = "current_thread")]
	async fn test_tokio_spawner_inside_local_set() {
		let local = tokio::task::LocalSet::new();
		let ran = Rc::new(Cell::new(false));

		local
			.run_until({
				let ran = Rc::clone(&ran);
				async move {
					TokioSpawner.spawn(async move { ran.set(true) }.boxed_local());
				}
			})
			.await;
		local.await;

		assert!(ran.get());
	}
}
