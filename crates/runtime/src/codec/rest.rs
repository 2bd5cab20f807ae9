//! REST batch codec.

use pathbatch_protocol::{BatchRequest, BatchResponse, RestCall, RestResponse};
use serde_json::Value;

use crate::error::{Error, Result};

/// Builds a batch body; entry ids are the call's index within the chunk.
pub fn encode_rest(calls: Vec<RestCall>) -> BatchRequest {
	BatchRequest {
		requests: calls
			.into_iter()
			.enumerate()
			.map(|(index, call)| call.into_request(index))
			.collect(),
	}
}

/// Parses a batch response body into one outcome per request, by index.
///
/// The outer `Err` means the whole chunk is unusable: unreadable envelope, a
/// response count that differs from `expected`, or an entry whose id does
/// not match its position. An entry that cannot be read at all fails only
/// its own request.
pub fn decode_rest(body: Value, expected: usize) -> Result<Vec<Result<Value>>> {
	let response: BatchResponse<Value> =
		serde_json::from_value(body).map_err(|e| Error::Protocol(format!("batch response unreadable: {e}")))?;

	if response.responses.len() != expected {
		return Err(Error::Protocol(format!(
			"batch response has {} entries, expected {expected}",
			response.responses.len()
		)));
	}

	let mut outcomes = Vec::with_capacity(expected);
	for (index, raw) in response.responses.into_iter().enumerate() {
		let entry = match serde_json::from_value::<RestResponse>(raw) {
			Ok(entry) => entry,
			Err(e) => {
				tracing::warn!(index, error = %e, "Unreadable batch response entry");
				outcomes.push(Err(Error::Protocol(format!(
					"batch response entry {index} unreadable: {e}"
				))));
				continue;
			}
		};
		if entry.id != index.to_string() {
			return Err(Error::Protocol(format!(
				"batch response entry {index} carries id '{}'",
				entry.id
			)));
		}
		outcomes.push(entry_outcome(entry));
	}
	Ok(outcomes)
}

fn entry_outcome(entry: RestResponse) -> Result<Value> {
	if entry.is_success() {
		return Ok(entry.body.unwrap_or(Value::Null));
	}
	let message = entry
		.error_message()
		.map(str::to_string)
		.unwrap_or_else(|| format!("request failed with HTTP {}", entry.status));
	let type_name = entry
		.body
		.as_ref()
		.and_then(|b| b.get("error"))
		.and_then(|e| e.get("code"))
		.and_then(Value::as_str)
		.map(str::to_string);
	Err(Error::Server {
		code: i64::from(entry.status),
		message,
		type_name,
	})
}
