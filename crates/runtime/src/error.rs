//! Error types for the batching runtime.

use pathbatch_protocol::ErrorInfo;
use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building, executing or decoding a batch.
///
/// Cloneable so a partition-wide failure can be handed to every operation
/// of that partition.
#[derive(Debug, Clone, Error)]
pub enum Error {
	/// Operation descriptor was malformed. Raised before anything is sent.
	#[error("Build error: {0}")]
	Build(#[from] BuildError),

	/// Append attempted on a batch that is executing or already executed.
	#[error("Batch {batch_id} is closed; request a new batch")]
	BatchClosed { batch_id: u64 },

	/// Response was unparsable at the top level or broke the batch contract.
	#[error("Protocol error: {0}")]
	Protocol(String),

	/// Server reported a failure for one operation (or for the whole request).
	#[error("Server error {code}: {message}")]
	Server {
		/// Machine code (legacy error code or HTTP status)
		code: i64,
		/// Human-readable error message
		message: String,
		/// Server-side exception type, when reported
		type_name: Option<String>,
	},

	/// Response was well formed but carried nothing for this operation.
	#[error("No result for action {id} in response")]
	MissingResult { id: u32 },

	/// Transport call did not finish within the configured timeout.
	#[error("Timeout: {0}")]
	Timeout(String),

	/// Connection-level failure.
	#[error("Transport error: {0}")]
	Transport(String),

	/// Endpoint answered with a non-success HTTP status.
	#[error("HTTP {status}: {body}")]
	Http { status: u16, body: String },

	/// Value could not be turned into the requested type.
	#[error("Decode error: {0}")]
	Decode(String),

	/// Result slot was dropped before the operation completed.
	#[error("Result channel closed before the operation completed")]
	ChannelClosed,

	/// Configuration failed validation.
	#[error("Invalid configuration: {0}")]
	InvalidConfig(String),

	/// Configuration value cannot move between these states.
	#[error("Invalid transition from {from} to {to}")]
	InvalidTransition { from: &'static str, to: &'static str },
}

/// Reasons an operation descriptor cannot be turned into a graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
	#[error("root property name is empty")]
	EmptyRootName,

	#[error("root type id '{0}' is not a braced GUID")]
	InvalidTypeId(String),

	#[error("unknown root '{name}' on type {type_id}")]
	UnknownRoot { type_id: String, name: String },

	#[error("property name at chain index {index} is empty")]
	EmptyPropertyName { index: usize },

	#[error("selected field at index {index} is empty")]
	EmptyFieldName { index: usize },

	#[error("method name is empty")]
	EmptyMethodName,
}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		Error::Decode(err.to_string())
	}
}

impl From<reqwest::Error> for Error {
	fn from(err: reqwest::Error) -> Self {
		if err.is_timeout() {
			Error::Timeout(err.to_string())
		} else if let Some(status) = err.status() {
			Error::Http {
				status: status.as_u16(),
				body: err.to_string(),
			}
		} else {
			Error::Transport(err.to_string())
		}
	}
}

impl From<ErrorInfo> for Error {
	fn from(info: ErrorInfo) -> Self {
		Error::Server {
			code: info.error_code,
			message: info.error_message,
			type_name: info.error_type_name,
		}
	}
}

impl Error {
	/// Returns true if this is a timeout error.
	pub fn is_timeout(&self) -> bool {
		matches!(self, Error::Timeout(_))
	}

	/// Returns true if the server rejected the operation.
	pub fn is_server_error(&self) -> bool {
		matches!(self, Error::Server { .. })
	}

	/// Returns the server error code if this is a Server error.
	pub fn server_code(&self) -> Option<i64> {
		match self {
			Error::Server { code, .. } => Some(*code),
			_ => None,
		}
	}

	/// Returns true if the batch was closed when the append was attempted.
	pub fn is_batch_closed(&self) -> bool {
		matches!(self, Error::BatchClosed { .. })
	}
}
