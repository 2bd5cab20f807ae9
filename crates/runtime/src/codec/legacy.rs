//! Legacy object-path document codec.

use std::collections::{HashMap, HashSet};

use pathbatch_protocol::{ErrorInfo, NodeId, RequestHeader, ResponseHeader};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::graph::Graph;

/// Serializes graphs into one request document.
///
/// Graphs keep their internal order and are concatenated in the order given,
/// which must be the order they were built in.
pub fn encode_legacy<'a, I>(header: &RequestHeader, graphs: I) -> Result<Value>
where
	I: IntoIterator<Item = &'a Graph>,
{
	let mut document = vec![serde_json::to_value(header)?];
	for graph in graphs {
		for declaration in &graph.declarations {
			document.push(Value::from(declaration.id));
			document.push(serde_json::to_value(&declaration.node)?);
		}
	}
	Ok(Value::Array(document))
}

/// Result slot for one action id in a decoded response.
#[derive(Debug, Clone, PartialEq)]
pub enum LegacyEntry {
	Value(Value),
	Failed(ErrorInfo),
}

/// Decoded legacy response: the header plus every `id -> entry` pair found.
#[derive(Debug, Clone)]
pub struct LegacyResponse {
	header: ResponseHeader,
	entries: HashMap<NodeId, LegacyEntry>,
}

impl LegacyResponse {
	pub fn header(&self) -> &ResponseHeader {
		&self.header
	}

	/// Request-wide failure reported in the header, if any.
	pub fn header_error(&self) -> Option<Error> {
		self.header.error_info.clone().map(Error::from)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Removes and resolves the entry for `id`.
	///
	/// Error markers become [`Error::Server`], absent ids [`Error::MissingResult`].
	pub fn take(&mut self, id: NodeId) -> Result<Value> {
		match self.entries.remove(&id) {
			Some(LegacyEntry::Value(value)) => Ok(value),
			Some(LegacyEntry::Failed(info)) => Err(info.into()),
			None => Err(Error::MissingResult { id }),
		}
	}
}

/// Action ids declared across `graphs`; only these are read as response markers.
pub fn action_ids<'a, I>(graphs: I) -> HashSet<NodeId>
where
	I: IntoIterator<Item = &'a Graph>,
{
	graphs
		.into_iter()
		.flat_map(|graph| &graph.declarations)
		.filter(|declaration| declaration.node.is_action())
		.map(|declaration| declaration.id)
		.collect()
}

/// Parses a legacy response document.
///
/// Fails with [`Error::Protocol`] only when the document itself is unusable:
/// not an array, or missing/unsupported schema header. Everything after the
/// header is read leniently so one bad entry cannot fail its siblings.
/// Values pair with the preceding marker only when it is one of `actions`;
/// any other element in marker position is skipped.
pub fn decode_legacy(body: Value, actions: &HashSet<NodeId>) -> Result<LegacyResponse> {
	let Value::Array(items) = body else {
		return Err(Error::Protocol("response is not a JSON array".to_string()));
	};
	let mut items = items.into_iter();

	let header_value = items
		.next()
		.ok_or_else(|| Error::Protocol("response is empty; schema header missing".to_string()))?;
	let header: ResponseHeader = serde_json::from_value(header_value)
		.map_err(|e| Error::Protocol(format!("schema header unreadable: {e}")))?;
	if !header.is_supported() {
		return Err(Error::Protocol(format!(
			"unsupported schema version '{}'",
			header.schema_version
		)));
	}

	let mut entries = HashMap::new();
	while let Some(item) = items.next() {
		let Some(id) = as_marker(&item, actions) else {
			tracing::debug!(entry = %item, "Skipping response entry without a known id marker");
			continue;
		};
		let Some(value) = items.next() else {
			tracing::warn!(id, "Response ended after id marker; treating as missing");
			break;
		};
		let entry = match ErrorInfo::from_entry(&value) {
			Some(info) => LegacyEntry::Failed(info),
			None => LegacyEntry::Value(value),
		};
		if entries.contains_key(&id) {
			tracing::warn!(id, "Duplicate id marker in response; keeping the first value");
			continue;
		}
		entries.insert(id, entry);
	}

	tracing::debug!(entries = entries.len(), "Decoded legacy response");
	Ok(LegacyResponse { header, entries })
}

fn as_marker(value: &Value, actions: &HashSet<NodeId>) -> Option<NodeId> {
	value
		.as_u64()
		.and_then(|id| NodeId::try_from(id).ok())
		.filter(|id| actions.contains(id))
}
