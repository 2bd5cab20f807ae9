//! Transport layer for batch round trips.
//!
//! A transport posts one JSON document to an endpoint and returns the JSON
//! document the endpoint answered with. It knows nothing about either batch
//! protocol; status handling beyond "2xx or not" belongs to the codecs.
//!
//! [`HttpTransport`] is the production implementation on top of `reqwest`.
//! Tests and embedders can supply their own [`Transport`].

use std::future::Future;
use std::pin::Pin;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use url::Url;

use crate::error::{Error, Result};


/// Boxed future returned by [`Transport::post_json`].
pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = Result<Value>> + Send + 'a>>;

/// One request/response exchange with a batch endpoint.
pub trait Transport: Send + Sync {
	/// Posts `body` to `endpoint` and returns the parsed response body.
	///
	/// Connection failures map to [`Error::Transport`], non-2xx answers to
	/// [`Error::Http`], and unparsable bodies to [`Error::Protocol`].
	fn post_json(&self, endpoint: Url, body: Value) -> TransportFuture<'_>;
}

/// HTTP transport backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
	client: reqwest::Client,
	headers: HeaderMap,
}

impl HttpTransport {
	pub fn new() -> Result<Self> {
		let client = reqwest::Client::builder()
			.user_agent(concat!("pathbatch/", env!("CARGO_PKG_VERSION")))
			.build()?;
		Ok(Self::from_client(client))
	}

	/// Wraps an existing client, e.g. one configured with proxies or TLS roots.
	pub fn from_client(client: reqwest::Client) -> Self {
		Self {
			client,
			headers: HeaderMap::new(),
		}
	}

	/// Adds a header sent with every request, such as `Authorization`.
	pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
		let name = HeaderName::from_bytes(name.as_bytes())
			.map_err(|e| Error::InvalidConfig(format!("header name '{name}': {e}")))?;
		let value = HeaderValue::from_str(value).map_err(|e| Error::InvalidConfig(format!("header '{name}': {e}")))?;
		self.headers.insert(name, value);
		Ok(self)
	}

	async fn send(&self, endpoint: Url, body: Value) -> Result<Value> {
		tracing::debug!(%endpoint, "POST batch");
		let response = self
			.client
			.post(endpoint.clone())
			.headers(self.headers.clone())
			.header(reqwest::header::ACCEPT, "application/json")
			.json(&body)
			.send()
			.await?;

		let status = response.status();
		let text = response.text().await?;
		if !status.is_success() {
			tracing::warn!(%endpoint, status = status.as_u16(), "Batch endpoint returned error status");
			return Err(Error::Http {
				status: status.as_u16(),
				body: text,
			});
		}

		serde_json::from_str(&text).map_err(|e| Error::Protocol(format!("response body is not JSON: {e}")))
	}
}

impl Transport for HttpTransport {
	fn post_json(&self, endpoint: Url, body: Value) -> TransportFuture<'_> {
		Box::pin(self.send(endpoint, body))
	}
}
