//! Pending operations and their result slots.
//!
//! Appending an operation to a batch yields an [`OperationHandle`] the caller
//! awaits, and leaves a type-erased [`Completion`] inside the batch. The
//! executor later feeds the completion the raw response value (or an error);
//! the completion runs the decoder and sends the typed outcome through a
//! oneshot channel to the handle.
//!
//! # Message Flow
//!
//! 1. Model layer appends a descriptor plus a [`Decoder`]
//! 2. Batch stores the completion and returns the handle
//! 3. Executor sends the batch and decodes the response
//! 4. Executor calls [`Completion::complete`] or [`Completion::fail`]
//! 5. Handle resolves to `Result<T>`

use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::Pin;
use std::task::{Context, Poll};

use pathbatch_protocol::RestCall;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::{Error, Result};
use crate::graph::Graph;

/// Turns the raw response value of one operation into its typed result.
pub type Decoder<T> = Box<dyn FnOnce(Value) -> Result<T> + Send>;

/// Which protocol an operation is sent over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
	Legacy,
	Rest,
}

/// Wire-level request of one operation.
#[derive(Debug, Clone)]
pub enum OperationRequest {
	/// Object-path graph; the result is reported under `graph.identity_path`.
	Legacy(Graph),
	/// One entry of a REST batch.
	Rest(RestCall),
}

impl OperationRequest {
	pub fn kind(&self) -> OperationKind {
		match self {
			OperationRequest::Legacy(_) => OperationKind::Legacy,
			OperationRequest::Rest(_) => OperationKind::Rest,
		}
	}
}

/// Lifecycle of one operation.
#[derive(Debug, Clone)]
pub enum OperationState {
	Pending,
	Completed,
	Failed(Error),
}

impl OperationState {
	pub fn is_pending(&self) -> bool {
		matches!(self, OperationState::Pending)
	}

	pub fn is_completed(&self) -> bool {
		matches!(self, OperationState::Completed)
	}

	pub fn error(&self) -> Option<&Error> {
		match self {
			OperationState::Failed(err) => Some(err),
			_ => None,
		}
	}
}

/// Type-erased writer side of a result slot.
///
/// Each method consumes the completion, so a slot is written at most once.
pub trait Completion: Send {
	/// Decodes `value` and delivers the outcome.
	fn complete(self: Box<Self>, value: Value) -> OperationState;

	/// Delivers `error` without decoding.
	fn fail(self: Box<Self>, error: Error) -> OperationState;
}

/// Decoder plus result slot for one operation.
pub struct PendingOperation<T> {
	decoder: Decoder<T>,
	slot: oneshot::Sender<Result<T>>,
}

impl<T: Send + 'static> PendingOperation<T> {
	/// Creates the pending operation and the handle that observes it.
	pub fn new(decoder: Decoder<T>, batch_id: u64, index: usize) -> (Self, OperationHandle<T>) {
		let (slot, rx) = oneshot::channel();
		let handle = OperationHandle { rx, batch_id, index };
		(Self { decoder, slot }, handle)
	}
}

impl<T: Send + 'static> Completion for PendingOperation<T> {
	fn complete(self: Box<Self>, value: Value) -> OperationState {
		let PendingOperation { decoder, slot } = *self;
		let outcome = catch_unwind(AssertUnwindSafe(move || decoder(value)))
			.unwrap_or_else(|_| Err(Error::Decode("decoder panicked".to_string())));
		deliver(slot, outcome)
	}

	fn fail(self: Box<Self>, error: Error) -> OperationState {
		deliver(self.slot, Err(error))
	}
}

fn deliver<T>(slot: oneshot::Sender<Result<T>>, outcome: Result<T>) -> OperationState {
	let state = match &outcome {
		Ok(_) => OperationState::Completed,
		Err(err) => OperationState::Failed(err.clone()),
	};
	if slot.send(outcome).is_err() {
		tracing::debug!("Operation handle dropped before delivery");
	}
	state
}

/// Future resolving to an operation's typed result once its batch executes.
///
/// Resolves to [`Error::ChannelClosed`] if the batch is dropped without
/// executing.
#[must_use = "an operation handle does nothing unless awaited"]
#[derive(Debug)]
pub struct OperationHandle<T> {
	rx: oneshot::Receiver<Result<T>>,
	batch_id: u64,
	index: usize,
}

impl<T> OperationHandle<T> {
	/// Batch this operation was appended to.
	pub fn batch_id(&self) -> u64 {
		self.batch_id
	}

	/// Position of the operation within its batch.
	pub fn index(&self) -> usize {
		self.index
	}
}

impl<T> Future for OperationHandle<T> {
	type Output = Result<T>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		match Pin::new(&mut self.rx).poll(cx) {
			Poll::Ready(result) => Poll::Ready(result.map_err(|_| Error::ChannelClosed).and_then(|r| r)),
			Poll::Pending => Poll::Pending,
		}
	}
}
