//! Background execution of cache write-back.
//!
//! Callers never wait for write-back; the scheduler decides when it runs.

use futures::future::BoxFuture;
use std::sync::Mutex;
use tracing::warn;

/// Runs write-back tasks without the caller awaiting them.
pub trait WriteBackScheduler: Send + Sync {
  fn schedule(&self, task: BoxFuture<'static, ()>);
}

/// Detaches each task onto the tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpawnScheduler;

impl WriteBackScheduler for SpawnScheduler {
  fn schedule(&self, task: BoxFuture<'static, ()>) {
    tokio::spawn(task);
  }
}

/// Holds tasks until [`QueuedScheduler::run_pending`] is awaited.
///
/// Makes write-back deterministic: nothing is written until the owner says
/// so, and the owner can wait for it to finish.
#[derive(Default)]
pub struct QueuedScheduler {
  pending: Mutex<Vec<BoxFuture<'static, ()>>>,
}

impl QueuedScheduler {
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of tasks waiting to run.
  pub fn pending(&self) -> usize {
    self.pending.lock().map(|p| p.len()).unwrap_or(0)
  }

  /// Run every queued task in the order it was scheduled.
  pub async fn run_pending(&self) {
    let tasks = match self.pending.lock() {
      Ok(mut pending) => std::mem::take(&mut *pending),
      Err(e) => {
        warn!("write-back queue poisoned: {}", e);
        return;
      }
    };

    for task in tasks {
      task.await;
    }
  }
}

impl WriteBackScheduler for QueuedScheduler {
  fn schedule(&self, task: BoxFuture<'static, ()>) {
    match self.pending.lock() {
      Ok(mut pending) => pending.push(task),
      Err(e) => warn!("write-back queue poisoned, dropping task: {}", e),
    }
  }
}
