//! Session: the owner of a batch pipeline and its entity handles.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use pathbatch_protocol::RestCall;
use pathbatch_runtime::{
	Batch, BatchAggregator, BatchExecutor, ClientConfig, Decoder, ExecutionSummary, HttpTransport, OperationDescriptor,
	OperationHandle, Result, Transport,
};

use crate::{Group, Site, Team, Web};

/// Shared state every entity handle reaches the pipeline through.
#[derive(Debug)]
pub(crate) struct Context {
	executor: BatchExecutor,
	aggregator: BatchAggregator,
}

impl Context {
	/// Appends to the session's current batch.
	///
	/// `decoder` builds a fresh decoder per attempt, since an attempt that
	/// lands on a batch closing underneath it is retried on the next batch.
	pub(crate) fn enqueue_legacy<T, D>(&self, descriptor: OperationDescriptor, decoder: D) -> Result<OperationHandle<T>>
	where
		T: Send + 'static,
		D: Fn() -> Decoder<T>,
	{
		let (_, handle) = self
			.aggregator
			.enqueue(|batch| batch.append_legacy(&descriptor, decoder()))?;
		Ok(handle)
	}

	pub(crate) fn enqueue_rest<T, D>(&self, call: RestCall, decoder: D) -> Result<OperationHandle<T>>
	where
		T: Send + 'static,
		D: Fn() -> Decoder<T>,
	{
		let (_, handle) = self
			.aggregator
			.enqueue(|batch| batch.append_rest(call.clone(), decoder()))?;
		Ok(handle)
	}

	/// Sends one legacy operation in a batch of its own and waits for it.
	pub(crate) async fn run_legacy<T, D>(&self, descriptor: OperationDescriptor, decoder: D) -> Result<T>
	where
		T: Send + 'static,
		D: FnOnce() -> Decoder<T>,
	{
		let batch = self.aggregator.detached();
		let handle = batch.append_legacy(&descriptor, decoder())?;
		self.executor.execute(&batch).await;
		handle.await
	}

	/// Sends one REST operation in a batch of its own and waits for it.
	pub(crate) async fn run_rest<T, D>(&self, call: RestCall, decoder: D) -> Result<T>
	where
		T: Send + 'static,
		D: FnOnce() -> Decoder<T>,
	{
		let batch = self.aggregator.detached();
		let handle = batch.append_rest(call, decoder())?;
		self.executor.execute(&batch).await;
		handle.await
	}
}

/// Entry point: one site, one batch pipeline, cached entity handles.
///
/// Entity handles are built on first access and reused for the lifetime of
/// the session. `*_batched` methods on them enqueue onto the session's
/// current batch; [`execute`](Self::execute) sends it. Non-batched methods
/// send their operation immediately in a one-shot batch.
///
/// # Example
///
/// ```ignore
/// use pathbatch::Session;
///
/// #[tokio::main]
/// async fn main() -> pathbatch::Result<()> {
///     let session = Session::connect("https://contoso.sharepoint.com/sites/dev")?;
///
///     let web = session.web().load_batched()?;
///     let team = session.team("02bd9fd6-8f93-4758-87c3-1fb73740a315").load_batched()?;
///     session.execute().await;
///
///     println!("{} / {}", web.await?.title, team.await?.display_name);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct Session {
	ctx: Arc<Context>,
	web: OnceLock<Web>,
	site: OnceLock<Site>,
	teams: Mutex<HashMap<String, Team>>,
	groups: Mutex<HashMap<String, Group>>,
}

impl Session {
	/// Opens a session for `site_url` with default settings over HTTP.
	pub fn connect(site_url: &str) -> Result<Self> {
		Self::new(ClientConfig::for_site(site_url)?)
	}

	/// Opens a session with `config` over HTTP.
	pub fn new(config: ClientConfig) -> Result<Self> {
		Self::with_transport(config, Arc::new(HttpTransport::new()?))
	}

	/// Opens a session over a caller-supplied transport.
	pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
		let executor = BatchExecutor::new(transport, config)?;
		tracing::debug!(site = %executor.config().site_url, "Opened session");
		Ok(Self {
			ctx: Arc::new(Context {
				executor,
				aggregator: BatchAggregator::new(),
			}),
			web: OnceLock::new(),
			site: OnceLock::new(),
			teams: Mutex::new(HashMap::new()),
			groups: Mutex::new(HashMap::new()),
		})
	}

	/// The site's root web.
	pub fn web(&self) -> &Web {
		self.web.get_or_init(|| Web::new(Arc::clone(&self.ctx)))
	}

	/// The site collection.
	pub fn site(&self) -> &Site {
		self.site.get_or_init(|| Site::new(Arc::clone(&self.ctx)))
	}

	/// Handle for the team with `id`.
	pub fn team(&self, id: &str) -> Team {
		self.teams
			.lock()
			.entry(id.to_string())
			.or_insert_with(|| Team::new(Arc::clone(&self.ctx), id))
			.clone()
	}

	/// Handle for the group with `id`.
	pub fn group(&self, id: &str) -> Group {
		self.groups
			.lock()
			.entry(id.to_string())
			.or_insert_with(|| Group::new(Arc::clone(&self.ctx), id))
			.clone()
	}

	/// The batch `*_batched` calls currently append to.
	pub fn current_batch(&self) -> Arc<Batch> {
		self.ctx.aggregator.ensure_batch()
	}

	/// Sends the current batch.
	///
	/// Operations enqueued while this runs go to the next batch.
	pub async fn execute(&self) -> ExecutionSummary {
		let batch = self.ctx.aggregator.ensure_batch();
		self.ctx.executor.execute(&batch).await
	}

	/// Snapshot of the session configuration.
	pub fn config(&self) -> ClientConfig {
		self.ctx.executor.config()
	}

	/// Switches REST calls between the stable and beta channels.
	///
	/// Fails with [`Error::InvalidTransition`](crate::Error::InvalidTransition)
	/// when asked to leave beta after [`pin_beta`](Self::pin_beta).
	pub fn set_beta(&self, beta: bool) -> Result<()> {
		self.ctx.executor.update_config(|config| config.set_beta(beta))
	}

	/// Moves REST calls to beta permanently.
	pub fn pin_beta(&self) -> Result<()> {
		self.ctx.executor.update_config(|config| {
			config.pin_beta();
			Ok(())
		})
	}
}
