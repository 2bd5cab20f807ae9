//! Batch execution.
//!
//! [`BatchExecutor`] partitions a batch's operations by protocol, sends each
//! partition in a single round trip (REST partitions are split into chunks of
//! at most `rest_batch_limit` requests), and routes every response entry back
//! to the operation that produced it.
//!
//! Failure scoping:
//!
//! | Failure | Affects |
//! |---------|---------|
//! | transport error, timeout, unreadable response | every operation in that partition (or REST chunk) |
//! | legacy header `ErrorInfo` | every legacy operation |
//! | per-entry error marker or REST status >= 400 | that operation only |
//! | decoder error | that operation only |

use std::sync::Arc;

use futures_util::future::join_all;
use parking_lot::RwLock;
use pathbatch_protocol::{RequestHeader, RestCall};
use serde_json::Value;
use url::Url;

use crate::batch::{Batch, DispatchReport, ExecutionSummary, QueuedOperation};
use crate::codec::{action_ids, decode_legacy, decode_rest, encode_legacy, encode_rest};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::operation::{Completion, OperationRequest, OperationState};
use crate::transport::Transport;

type Slot = (usize, Box<dyn Completion>);

/// Outcome of one partition.
#[derive(Default)]
struct PartitionReport {
	states: Vec<(usize, OperationState)>,
	http_calls: usize,
}

impl PartitionReport {
	fn merge(&mut self, other: PartitionReport) {
		self.states.extend(other.states);
		self.http_calls += other.http_calls;
	}
}

/// Sends batches through a [`Transport`] using the current [`ClientConfig`].
pub struct BatchExecutor {
	transport: Arc<dyn Transport>,
	config: RwLock<ClientConfig>,
}

impl std::fmt::Debug for BatchExecutor {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("BatchExecutor")
			.field("config", &*self.config.read())
			.finish_non_exhaustive()
	}
}

impl BatchExecutor {
	/// Creates an executor after validating `config`.
	pub fn new(transport: Arc<dyn Transport>, config: ClientConfig) -> Result<Self> {
		config.validate()?;
		Ok(Self {
			transport,
			config: RwLock::new(config),
		})
	}

	/// Snapshot of the current configuration.
	pub fn config(&self) -> ClientConfig {
		self.config.read().clone()
	}

	/// Applies `change` to a copy of the configuration and keeps it only if
	/// both `change` and validation succeed.
	///
	/// Batches already executing keep the configuration they started with.
	pub fn update_config<F>(&self, change: F) -> Result<()>
	where
		F: FnOnce(&mut ClientConfig) -> Result<()>,
	{
		let mut config = self.config.write();
		let mut next = config.clone();
		change(&mut next)?;
		next.validate()?;
		*config = next;
		Ok(())
	}

	/// Executes `batch` exactly once.
	///
	/// Concurrent or repeated calls for the same batch wait for the first
	/// execution and return its summary. Outcomes are delivered through the
	/// operations' handles; this call itself does not fail.
	pub async fn execute(&self, batch: &Batch) -> ExecutionSummary {
		batch.execute_once(|queued| self.dispatch(batch.id(), queued)).await
	}

	async fn dispatch(&self, batch_id: u64, queued: Vec<QueuedOperation>) -> DispatchReport {
		let config = self.config();

		let mut legacy = Vec::new();
		let mut rest = Vec::new();
		for op in queued {
			match op.request {
				OperationRequest::Legacy(graph) => legacy.push((graph, (op.index, op.completion))),
				OperationRequest::Rest(call) => rest.push((call, (op.index, op.completion))),
			}
		}
		tracing::debug!(batch_id, legacy = legacy.len(), rest = rest.len(), "Dispatching batch");

		let (mut report, rest_report) = tokio::join!(
			self.run_legacy(&config, batch_id, legacy),
			self.run_rest(&config, batch_id, rest)
		);
		report.merge(rest_report);

		DispatchReport {
			states: report.states,
			http_calls: report.http_calls,
		}
	}

	async fn run_legacy(&self, config: &ClientConfig, batch_id: u64, ops: Vec<(Graph, Slot)>) -> PartitionReport {
		if ops.is_empty() {
			return PartitionReport::default();
		}
		let (graphs, slots): (Vec<Graph>, Vec<Slot>) = ops.into_iter().unzip();

		let prepared = config.process_query_url().and_then(|url| {
			let header = RequestHeader::new(&config.library_version, &config.application_name);
			Ok((url, encode_legacy(&header, &graphs)?))
		});
		let (url, document) = match prepared {
			Ok(prepared) => prepared,
			Err(err) => return fail_all(slots, err, 0),
		};

		let actions = action_ids(&graphs);
		let mut response = match self
			.round_trip(config, url, document)
			.await
			.and_then(|body| decode_legacy(body, &actions))
		{
			Ok(response) => response,
			Err(err) => {
				tracing::warn!(batch_id, error = %err, "Legacy partition failed");
				return fail_all(slots, err, 1);
			}
		};
		if let Some(err) = response.header_error() {
			tracing::warn!(batch_id, error = %err, "Legacy request rejected by server");
			return fail_all(slots, err, 1);
		}

		let states = graphs
			.iter()
			.zip(slots)
			.map(|(graph, (index, completion))| {
				let state = match response.take(graph.identity_path) {
					Ok(value) => completion.complete(value),
					Err(err) => completion.fail(err),
				};
				(index, state)
			})
			.collect();
		PartitionReport { states, http_calls: 1 }
	}

	async fn run_rest(&self, config: &ClientConfig, batch_id: u64, ops: Vec<(RestCall, Slot)>) -> PartitionReport {
		if ops.is_empty() {
			return PartitionReport::default();
		}
		let url = match config.rest_batch_url() {
			Ok(url) => url,
			Err(err) => return fail_all(ops.into_iter().map(|(_, slot)| slot).collect(), err, 0),
		};

		let mut chunks: Vec<Vec<(RestCall, Slot)>> = Vec::new();
		let mut ops = ops.into_iter().peekable();
		while ops.peek().is_some() {
			chunks.push(ops.by_ref().take(config.rest_batch_limit).collect());
		}
		if chunks.len() > 1 {
			tracing::debug!(batch_id, chunks = chunks.len(), "Splitting REST partition");
		}

		let reports = join_all(
			chunks
				.into_iter()
				.map(|chunk| self.run_rest_chunk(config, batch_id, url.clone(), chunk)),
		)
		.await;

		reports.into_iter().fold(PartitionReport::default(), |mut acc, report| {
			acc.merge(report);
			acc
		})
	}

	async fn run_rest_chunk(
		&self,
		config: &ClientConfig,
		batch_id: u64,
		url: Url,
		chunk: Vec<(RestCall, Slot)>,
	) -> PartitionReport {
		let (calls, slots): (Vec<RestCall>, Vec<Slot>) = chunk.into_iter().unzip();
		let expected = calls.len();

		let body = match serde_json::to_value(encode_rest(calls)) {
			Ok(body) => body,
			Err(err) => return fail_all(slots, err.into(), 0),
		};

		let outcomes = match self
			.round_trip(config, url, body)
			.await
			.and_then(|body| decode_rest(body, expected))
		{
			Ok(outcomes) => outcomes,
			Err(err) => {
				tracing::warn!(batch_id, requests = expected, error = %err, "REST chunk failed");
				return fail_all(slots, err, 1);
			}
		};

		let states = outcomes
			.into_iter()
			.zip(slots)
			.map(|(outcome, (index, completion))| {
				let state = match outcome {
					Ok(value) => completion.complete(value),
					Err(err) => completion.fail(err),
				};
				(index, state)
			})
			.collect();
		PartitionReport { states, http_calls: 1 }
	}

	async fn round_trip(&self, config: &ClientConfig, url: Url, body: Value) -> Result<Value> {
		let timeout = config.request_timeout();
		let endpoint = url.to_string();
		tracing::trace!(%endpoint, payload = %body, "Sending request");
		match tokio::time::timeout(timeout, self.transport.post_json(url, body)).await {
			Ok(result) => {
				if let Ok(response) = &result {
					tracing::trace!(%endpoint, payload = %response, "Received response");
				}
				result
			}
			Err(_) => Err(Error::Timeout(format!(
				"no response from {endpoint} within {}ms",
				timeout.as_millis()
			))),
		}
	}
}

fn fail_all(slots: Vec<Slot>, err: Error, http_calls: usize) -> PartitionReport {
	let states = slots
		.into_iter()
		.map(|(index, completion)| (index, completion.fail(err.clone())))
		.collect();
	PartitionReport { states, http_calls }
}
