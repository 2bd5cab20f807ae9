use std::sync::Arc;

use parking_lot::Mutex;

use super::{Batch, BatchState};
use crate::error::{Error, Result};

/// Upper bound on how often [`BatchAggregator::enqueue`] chases a batch that
/// closed underneath it.
const MAX_ENQUEUE_ATTEMPTS: usize = 16;

/// Hands out the current open batch, replacing it once it starts executing.
///
/// Owned by a session. Concurrent callers that see an open batch all get the
/// same one; the first caller to see a closed batch installs its successor.
#[derive(Debug, Default)]
pub struct BatchAggregator {
	current: Mutex<Option<Arc<Batch>>>,
}

impl BatchAggregator {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the current batch if it is still open, otherwise a fresh one.
	pub fn ensure_batch(&self) -> Arc<Batch> {
		let mut current = self.current.lock();
		if let Some(batch) = current.as_ref().filter(|b| b.state() == BatchState::Open) {
			return Arc::clone(batch);
		}

		let batch = Arc::new(Batch::new());
		if let Some(previous) = current.replace(Arc::clone(&batch)) {
			tracing::debug!(previous = previous.id(), next = batch.id(), "Rolling over to new batch");
		}
		batch
	}

	/// The most recently handed-out batch, in whatever state it is.
	pub fn current(&self) -> Option<Arc<Batch>> {
		self.current.lock().clone()
	}

	/// Creates a batch that is never handed out by [`ensure_batch`](Self::ensure_batch).
	pub fn detached(&self) -> Arc<Batch> {
		Arc::new(Batch::new())
	}

	/// Runs `append` against the current open batch.
	///
	/// If the batch closes between lookup and append, the append is retried on
	/// its successor, so the caller never sees [`Error::BatchClosed`] unless
	/// batches keep closing faster than it can append.
	pub fn enqueue<T, F>(&self, mut append: F) -> Result<(Arc<Batch>, T)>
	where
		F: FnMut(&Batch) -> Result<T>,
	{
		let mut last = None;
		for attempt in 0..MAX_ENQUEUE_ATTEMPTS {
			let batch = self.ensure_batch();
			match append(&batch) {
				Ok(value) => return Ok((batch, value)),
				Err(err) if err.is_batch_closed() => {
					tracing::debug!(batch_id = batch.id(), attempt, "Batch closed during append; retrying");
					last = Some(err);
				}
				Err(err) => return Err(err),
			}
		}
		Err(last.unwrap_or(Error::BatchClosed { batch_id: 0 }))
	}
}
