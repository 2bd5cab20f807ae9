//! Legacy request/response envelope.
//!
//! Request document: `[RequestHeader, id, node, id, node, ...]`.
//! Response document: `[ResponseHeader, id, value, id, value, ...]` where each
//! value is a scalar, a resolved object, or `{"ErrorInfo": {...}}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Schema version sent in every request header.
pub const SCHEMA_VERSION: &str = "15.0.0.0";

/// Major schema versions this client can parse.
pub const SUPPORTED_SCHEMA_MAJORS: &[u32] = &[15, 16];

/// Key under which a per-action failure is reported.
pub const ERROR_INFO_KEY: &str = "ErrorInfo";

/// First element of a legacy request document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RequestHeader {
	pub schema_version: String,
	pub library_version: String,
	pub application_name: String,
}

impl RequestHeader {
	pub fn new(library_version: impl Into<String>, application_name: impl Into<String>) -> Self {
		Self {
			schema_version: SCHEMA_VERSION.to_string(),
			library_version: library_version.into(),
			application_name: application_name.into(),
		}
	}
}

/// First element of a legacy response document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResponseHeader {
	pub schema_version: String,
	#[serde(default)]
	pub library_version: Option<String>,
	/// Set when the server rejected the whole request.
	#[serde(default)]
	pub error_info: Option<ErrorInfo>,
	#[serde(default)]
	pub trace_correlation_id: Option<String>,
}

impl ResponseHeader {
	/// Returns true if the schema version's major component is one this client parses.
	pub fn is_supported(&self) -> bool {
		self.schema_version
			.split('.')
			.next()
			.and_then(|major| major.parse::<u32>().ok())
			.is_some_and(|major| SUPPORTED_SCHEMA_MAJORS.contains(&major))
	}
}

/// Server-side failure details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorInfo {
	pub error_code: i64,
	pub error_message: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error_type_name: Option<String>,
}

impl ErrorInfo {
	/// Extracts error details from a response value of the form `{"ErrorInfo": {...}}`.
	///
	/// Returns `None` for ordinary values, including objects whose `ErrorInfo` is null.
	/// Any other `ErrorInfo` counts as a failure: fields that cannot be read
	/// default to code `0` and the raw `ErrorInfo` text as the message.
	pub fn from_entry(value: &Value) -> Option<Self> {
		let info = value.as_object()?.get(ERROR_INFO_KEY)?;
		if info.is_null() {
			return None;
		}
		Some(serde_json::from_value(info.clone()).unwrap_or_else(|_| Self::salvage(info)))
	}

	fn salvage(info: &Value) -> Self {
		Self {
			error_code: info.get("ErrorCode").and_then(Value::as_i64).unwrap_or(0),
			error_message: info
				.get("ErrorMessage")
				.and_then(Value::as_str)
				.map_or_else(|| info.to_string(), str::to_string),
			error_type_name: info.get("ErrorTypeName").and_then(Value::as_str).map(str::to_string),
		}
	}
}
