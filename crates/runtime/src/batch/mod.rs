//! Batches of pending operations.
//!
//! A [`Batch`] accumulates operations of either protocol, is executed once,
//! and is immutable afterwards:
//!
//! ```text
//! Open ──execute──▶ Executing ──all partitions dispatched──▶ Executed
//! ```
//!
//! Appends are only accepted while `Open`. Batches are created through
//! [`BatchAggregator`]; there is no public constructor.

mod aggregator;


use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use pathbatch_protocol::{Declaration, RestCall};
use tokio::sync::OnceCell;

pub use aggregator::BatchAggregator;

use crate::error::{Error, Result};
use crate::graph::{GraphBuilder, ObjectPathArena, OperationDescriptor};
use crate::operation::{Completion, Decoder, OperationHandle, OperationKind, OperationRequest, OperationState, PendingOperation};

/// Process-unique batch identifier.
pub type BatchId = u64;

static NEXT_BATCH_ID: AtomicU64 = AtomicU64::new(1);

fn next_batch_id() -> BatchId {
	NEXT_BATCH_ID.fetch_add(1, Ordering::SeqCst)
}

/// Lifecycle state of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
	Open,
	Executing,
	Executed,
}

impl fmt::Display for BatchState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Open => write!(f, "open"),
			Self::Executing => write!(f, "executing"),
			Self::Executed => write!(f, "executed"),
		}
	}
}

/// Operation taken out of a batch for execution.
pub struct QueuedOperation {
	pub index: usize,
	pub request: OperationRequest,
	pub completion: Box<dyn Completion>,
}

impl fmt::Debug for QueuedOperation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("QueuedOperation")
			.field("index", &self.index)
			.field("request", &self.request)
			.finish_non_exhaustive()
	}
}

/// Outcome counts of one batch execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionSummary {
	pub batch_id: BatchId,
	pub completed: usize,
	pub failed: usize,
	pub http_calls: usize,
}

/// Result of dispatching a batch's operations.
#[derive(Debug)]
pub struct DispatchReport {
	/// Terminal state per operation, indexed like the batch.
	pub states: Vec<(usize, OperationState)>,
	pub http_calls: usize,
}

struct BatchInner {
	state: BatchState,
	arena: ObjectPathArena,
	queued: Vec<QueuedOperation>,
	kinds: Vec<OperationKind>,
	states: Vec<OperationState>,
}

/// Ordered collection of pending operations plus its lifecycle state.
pub struct Batch {
	id: BatchId,
	inner: Mutex<BatchInner>,
	summary: OnceCell<ExecutionSummary>,
}

impl fmt::Debug for Batch {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let inner = self.inner.lock();
		f.debug_struct("Batch")
			.field("id", &self.id)
			.field("state", &inner.state)
			.field("operations", &inner.states.len())
			.finish()
	}
}

impl Batch {
	pub(crate) fn new() -> Self {
		let id = next_batch_id();
		tracing::debug!(batch_id = id, "Created batch");
		Self {
			id,
			inner: Mutex::new(BatchInner {
				state: BatchState::Open,
				arena: ObjectPathArena::new(),
				queued: Vec::new(),
				kinds: Vec::new(),
				states: Vec::new(),
			}),
			summary: OnceCell::new(),
		}
	}

	pub fn id(&self) -> BatchId {
		self.id
	}

	pub fn state(&self) -> BatchState {
		self.inner.lock().state
	}

	pub fn is_open(&self) -> bool {
		self.state() == BatchState::Open
	}

	pub fn is_executed(&self) -> bool {
		self.state() == BatchState::Executed
	}

	/// Number of operations appended.
	pub fn len(&self) -> usize {
		self.inner.lock().states.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Protocol kind of each operation, in append order.
	pub fn kinds(&self) -> Vec<OperationKind> {
		self.inner.lock().kinds.clone()
	}

	/// Snapshot of every operation's state, in append order.
	pub fn operation_states(&self) -> Vec<OperationState> {
		self.inner.lock().states.clone()
	}

	/// Every object-path declaration emitted so far, in emission order.
	pub fn declarations(&self) -> Vec<Declaration> {
		self.inner.lock().arena.declarations().to_vec()
	}

	/// Appends a legacy-protocol operation.
	///
	/// The graph is built immediately, so a malformed descriptor fails here
	/// with [`Error::Build`] and never reaches the network.
	pub fn append_legacy<T: Send + 'static>(
		&self,
		descriptor: &OperationDescriptor,
		decoder: Decoder<T>,
	) -> Result<OperationHandle<T>> {
		let mut inner = self.inner.lock();
		self.ensure_open(&inner)?;
		let graph = GraphBuilder::new(&mut inner.arena).build(descriptor)?;
		tracing::debug!(
			batch_id = self.id,
			identity_path = graph.identity_path,
			"Appended legacy operation"
		);
		Ok(self.push(&mut inner, OperationRequest::Legacy(graph), decoder))
	}

	/// Appends a REST-style operation.
	pub fn append_rest<T: Send + 'static>(&self, call: RestCall, decoder: Decoder<T>) -> Result<OperationHandle<T>> {
		let mut inner = self.inner.lock();
		self.ensure_open(&inner)?;
		tracing::debug!(batch_id = self.id, method = ?call.method, url = %call.url, "Appended REST operation");
		Ok(self.push(&mut inner, OperationRequest::Rest(call), decoder))
	}

	fn ensure_open(&self, inner: &BatchInner) -> Result<()> {
		if inner.state != BatchState::Open {
			tracing::debug!(batch_id = self.id, state = %inner.state, "Rejected append to closed batch");
			return Err(Error::BatchClosed { batch_id: self.id });
		}
		Ok(())
	}

	fn push<T: Send + 'static>(
		&self,
		inner: &mut BatchInner,
		request: OperationRequest,
		decoder: Decoder<T>,
	) -> OperationHandle<T> {
		let index = inner.states.len();
		let (pending, handle) = PendingOperation::new(decoder, self.id, index);
		inner.kinds.push(request.kind());
		inner.states.push(OperationState::Pending);
		inner.queued.push(QueuedOperation {
			index,
			request,
			completion: Box::new(pending),
		});
		handle
	}

	/// Runs `dispatch` at most once for this batch.
	///
	/// The first caller moves the batch to `Executing`, hands the queued
	/// operations to `dispatch`, records the returned states and moves the
	/// batch to `Executed`. Concurrent and later callers wait for that and
	/// get the same summary.
	pub async fn execute_once<F, Fut>(&self, dispatch: F) -> ExecutionSummary
	where
		F: FnOnce(Vec<QueuedOperation>) -> Fut,
		Fut: Future<Output = DispatchReport>,
	{
		self.summary
			.get_or_init(|| async {
				let queued = self.begin_execution();
				let report = match queued {
					Some(queued) => dispatch(queued).await,
					None => DispatchReport {
						states: Vec::new(),
						http_calls: 0,
					},
				};
				self.finish_execution(report)
			})
			.await
			.clone()
	}

	/// Moves `Open` to `Executing` and takes the queued operations.
	///
	/// Returns `None` if an earlier execution attempt was abandoned midway.
	fn begin_execution(&self) -> Option<Vec<QueuedOperation>> {
		let mut inner = self.inner.lock();
		if inner.state != BatchState::Open {
			tracing::warn!(batch_id = self.id, state = %inner.state, "Resuming abandoned batch execution");
			return None;
		}
		inner.state = BatchState::Executing;
		tracing::debug!(batch_id = self.id, operations = inner.queued.len(), "Executing batch");
		Some(std::mem::take(&mut inner.queued))
	}

	fn finish_execution(&self, report: DispatchReport) -> ExecutionSummary {
		let mut inner = self.inner.lock();
		for (index, state) in report.states {
			if let Some(slot) = inner.states.get_mut(index) {
				*slot = state;
			}
		}
		// Anything still pending lost its completion with an abandoned attempt.
		for state in inner.states.iter_mut().filter(|s| s.is_pending()) {
			*state = OperationState::Failed(Error::ChannelClosed);
		}
		inner.state = BatchState::Executed;

		let completed = inner.states.iter().filter(|s| s.is_completed()).count();
		let summary = ExecutionSummary {
			batch_id: self.id,
			completed,
			failed: inner.states.len() - completed,
			http_calls: report.http_calls,
		};
		tracing::debug!(
			batch_id = self.id,
			completed = summary.completed,
			failed = summary.failed,
			http_calls = summary.http_calls,
			"Batch executed"
		);
		summary
	}
}
