//! REST-style JSON batch descriptors.
//!
//! A batch request body is `{"requests": [...]}`, the response body is
//! `{"responses": [...]}` with one entry per request in the same order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// HTTP verb of a batched request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
	Get,
	Post,
	Patch,
	Put,
	Delete,
}

/// One request inside a batch body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestRequest {
	/// Batch-relative id, the decimal index of the entry.
	pub id: String,
	pub method: HttpMethod,
	/// Path relative to the versioned service root (e.g., `/teams/{id}`).
	pub url: String,
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub headers: BTreeMap<String, String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub body: Option<Value>,
}

/// Request descriptor as supplied by the model layer, before it has a batch id.
#[derive(Debug, Clone, PartialEq)]
pub struct RestCall {
	pub method: HttpMethod,
	pub url: String,
	pub body: Option<Value>,
}

impl RestCall {
	pub fn get(url: impl Into<String>) -> Self {
		Self {
			method: HttpMethod::Get,
			url: url.into(),
			body: None,
		}
	}

	pub fn with_body(method: HttpMethod, url: impl Into<String>, body: Value) -> Self {
		Self {
			method,
			url: url.into(),
			body: Some(body),
		}
	}

	/// Assigns the batch-relative id; requests with a body get a JSON content type.
	pub fn into_request(self, index: usize) -> RestRequest {
		let mut headers = BTreeMap::new();
		if self.body.is_some() {
			headers.insert("Content-Type".to_string(), "application/json".to_string());
		}
		RestRequest {
			id: index.to_string(),
			method: self.method,
			url: self.url,
			headers,
			body: self.body,
		}
	}
}

/// Batch request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
	pub requests: Vec<RestRequest>,
}

/// One entry of a batch response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestResponse {
	pub id: String,
	pub status: u16,
	#[serde(default)]
	pub headers: BTreeMap<String, String>,
	#[serde(default)]
	pub body: Option<Value>,
}

impl RestResponse {
	/// Returns true for 2xx/3xx statuses.
	pub fn is_success(&self) -> bool {
		self.status < 400
	}

	/// Returns the service error message (`body.error.message`), if present.
	pub fn error_message(&self) -> Option<&str> {
		self.body.as_ref()?.get("error")?.get("message")?.as_str()
	}
}

/// Batch response body.
///
/// `BatchResponse<Value>` reads the envelope while leaving each entry unparsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResponse<T = RestResponse> {
	pub responses: Vec<T>,
}
