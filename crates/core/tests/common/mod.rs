#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use pathbatch::{ClientConfig, Result, Session, Transport};
use pathbatch_runtime::{TransportFuture, Url};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

type Handler = dyn Fn(&Url, &Value) -> Result<Value> + Send + Sync;

/// In-memory site: records requests and answers through a handler.
pub struct FakeSite {
	handler: Box<Handler>,
	requests: Mutex<Vec<(Url, Value)>>,
}

impl FakeSite {
	pub fn new<F>(handler: F) -> Arc<Self>
	where
		F: Fn(&Url, &Value) -> Result<Value> + Send + Sync + 'static,
	{
		Arc::new(Self {
			handler: Box::new(handler),
			requests: Mutex::new(Vec::new()),
		})
	}

	pub fn requests(&self) -> Vec<(Url, Value)> {
		self.requests.lock().clone()
	}
}

impl Transport for FakeSite {
	fn post_json(&self, endpoint: Url, body: Value) -> TransportFuture<'_> {
		Box::pin(async move {
			self.requests.lock().push((endpoint.clone(), body.clone()));
			(self.handler)(&endpoint, &body)
		})
	}
}

pub fn session(site: Arc<FakeSite>) -> Session {
	let config = ClientConfig::for_site("https://contoso.example.com/sites/dev").unwrap();
	Session::with_transport(config, site).unwrap()
}

/// `(id, action)` of every non-identity action in a legacy request.
pub fn legacy_actions(document: &Value) -> Vec<(u64, Value)> {
	document.as_array().unwrap()[1..]
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

/// Answers queries from a small fixture keyed by the first selected field.
pub fn answer_legacy(body: &Value) -> Value {
	let entries = legacy_actions(body).into_iter().map(|(id, action)| {
		let value = match action["Kind"].as_str() {
			Some("Method") => Value::Null,
			_ => match action["Select"][0].as_str() {
				Some("Id") if action["Select"][1] == "Title" && action["Select"][2] == "Url" => json!({
					"_ObjectType_": "SP.Web",
					"Id": "7a2b3c4d-0000-4000-8000-000000000001",
					"Title": "Engineering",
					"Url": "https://contoso.example.com/sites/dev",
					"Description": "Team site"
				}),
				Some("Id") if action["Select"][1] == "Url" => json!({
					"_ObjectType_": "SP.Site",
					"Id": "7a2b3c4d-0000-4000-8000-000000000002",
					"Url": "https://contoso.example.com/sites/dev"
				}),
				_ => json!({
					"_ObjectType_": "SP.User",
					"Id": 11,
					"Title": "Dana Reyes",
					"LoginName": "i:0#.f|membership|dana@contoso.example.com",
					"Email": "dana@contoso.example.com"
				}),
			},
		};
		(id, value)
	});
	legacy_response(entries)
}

/// Answers `/teams/{id}` and `/groups/{id}` with the id echoed back.
pub fn answer_rest(body: &Value) -> Value {
	let responses: Vec<Value> = body["requests"]
		.as_array()
		.unwrap()
		.iter()
		.map(|r| {
			let url = r["url"].as_str().unwrap();
			let (kind, id) = url.trim_start_matches('/').split_once('/').unwrap();
			let body = match kind {
				"teams" => json!({"id": id, "displayName": format!("Team {id}"), "isArchived": false}),
				_ => json!({"id": id, "displayName": format!("Group {id}"), "groupTypes": ["Unified"]}),
			};
			json!({"id": r["id"], "status": 200, "body": body})
		})
		.collect();
	json!({"responses": responses})
}

pub fn answer(url: &Url, body: &Value) -> Result<Value> {
	if url.path().ends_with("/ProcessQuery") {
		Ok(answer_legacy(body))
	} else {
		Ok(answer_rest(body))
	}
}

pub fn init_tracing() {
	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
	let _ = tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_test_writer()
		.compact()
		.try_init();
}
