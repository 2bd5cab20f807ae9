//! Scripted transport shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use pathbatch_runtime::{BatchExecutor, ClientConfig, Result, Transport, TransportFuture};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;
use url::Url;

type Handler = dyn Fn(&Url, &Value) -> Result<Value> + Send + Sync;

/// Transport that records every request and answers through a handler.
pub struct MockTransport {
	handler: Box<Handler>,
	delay: Option<Duration>,
	requests: Mutex<Vec<(Url, Value)>>,
}

impl MockTransport {
	pub fn new<F>(handler: F) -> Arc<Self>
	where
		F: Fn(&Url, &Value) -> Result<Value> + Send + Sync + 'static,
	{
		Arc::new(Self {
			handler: Box::new(handler),
			delay: None,
			requests: Mutex::new(Vec::new()),
		})
	}

	/// Like [`new`](Self::new) but sleeps before answering.
	pub fn delayed<F>(delay: Duration, handler: F) -> Arc<Self>
	where
		F: Fn(&Url, &Value) -> Result<Value> + Send + Sync + 'static,
	{
		Arc::new(Self {
			handler: Box::new(handler),
			delay: Some(delay),
			requests: Mutex::new(Vec::new()),
		})
	}

	pub fn requests(&self) -> Vec<(Url, Value)> {
		self.requests.lock().clone()
	}

	pub fn calls(&self) -> usize {
		self.requests.lock().len()
	}
}

impl Transport for MockTransport {
	fn post_json(&self, endpoint: Url, body: Value) -> TransportFuture<'_> {
		Box::pin(async move {
			self.requests.lock().push((endpoint.clone(), body.clone()));
			if let Some(delay) = self.delay {
				tokio::time::sleep(delay).await;
			}
			(self.handler)(&endpoint, &body)
		})
	}
}

pub fn config() -> ClientConfig {
	ClientConfig::for_site("https://contoso.example.com/sites/dev").unwrap()
}

pub fn executor(transport: Arc<MockTransport>, config: ClientConfig) -> BatchExecutor {
	BatchExecutor::new(transport, config).unwrap()
}

pub fn is_legacy(url: &Url) -> bool {
	url.path().ends_with("/ProcessQuery")
}

/// `(id, node)` of every non-identity action in a legacy request, in order.
pub fn legacy_actions(document: &Value) -> Vec<(u64, Value)> {
	let items = document.as_array().expect("legacy request is an array");
	items[1..]
		.chunks(2)
		.filter_map(|pair| {
			let action = pair[1].get("Action")?;
			(action["Kind"] != "ObjectPath").then(|| (pair[0].as_u64().unwrap(), action.clone()))
		})
		.collect()
}

pub fn legacy_response(entries: impl IntoIterator<Item = (u64, Value)>) -> Value {
	let mut items = vec![json!({"SchemaVersion": "15.0.0.0", "LibraryVersion": "16.0.0.0", "ErrorInfo": null})];
	for (id, value) in entries {
		items.push(json!(id));
		items.push(value);
	}
	Value::Array(items)
}

pub fn error_info(code: i64, message: &str) -> Value {
	json!({"ErrorInfo": {"ErrorCode": code, "ErrorMessage": message, "ErrorTypeName": "Microsoft.SharePoint.SPException"}})
}

/// Answers every REST request in a batch body with 200 and its url.
pub fn echo_rest(body: &Value) -> Value {
	let responses: Vec<Value> = body["requests"]
		.as_array()
		.expect("rest request has requests")
		.iter()
		.map(|r| json!({"id": r["id"], "status": 200, "body": {"url": r["url"]}}))
		.collect();
	json!({"responses": responses})
}

/// Installs a test subscriber; `RUST_LOG=pathbatch_runtime=trace` shows payloads.
pub fn init_tracing() {
	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
	let _ = tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_test_writer()
		.with_target(true)
		.compact()
		.try_init();
}
