//! End-to-end batch execution against a scripted transport.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use pathbatch_protocol::{HttpMethod, REQUEST_CONTEXT_CURRENT, RestCall};
use pathbatch_runtime::decode;
use pathbatch_runtime::{BatchAggregator, BatchState, Error, OperationDescriptor, OperationState};
use serde_json::{Value, json};

fn query(chain: &[&str], fields: &[&str]) -> OperationDescriptor {
	let mut desc = OperationDescriptor::at(REQUEST_CONTEXT_CURRENT);
	for property in chain {
		desc = desc.property(*property);
	}
	desc.query(fields.iter().copied())
}

#[tokio::test]
async fn test_middle_failure_is_isolated() {
	init_tracing();
	let transport = MockTransport::new(|_, body| {
		let actions = legacy_actions(body);
		assert_eq!(actions.len(), 3);
		Ok(legacy_response([
			(actions[0].0, json!({"Title": "Engineering"})),
			(actions[1].0, error_info(-2147024891, "Access denied.")),
			(actions[2].0, json!({"Description": "Team site"})),
		]))
	});
	let exec = executor(Arc::clone(&transport), config());
	let aggregator = BatchAggregator::new();
	let batch = aggregator.ensure_batch();

	let title = batch
		.append_legacy(&query(&["Web"], &["Title"]), decode::field::<String>("Title"))
		.unwrap();
	let site = batch
		.append_legacy(&query(&["Site"], &["Url"]), decode::field::<String>("Url"))
		.unwrap();
	let description = batch
		.append_legacy(&query(&["Web"], &["Description"]), decode::field::<String>("Description"))
		.unwrap();

	let summary = exec.execute(&batch).await;
	assert_eq!(summary.completed, 2);
	assert_eq!(summary.failed, 1);
	assert_eq!(summary.http_calls, 1);

	assert_eq!(title.await.unwrap(), "Engineering");
	let err = site.await.unwrap_err();
	assert_eq!(err.server_code(), Some(-2147024891));
	assert_eq!(description.await.unwrap(), "Team site");
	assert_eq!(batch.state(), BatchState::Executed);
}

#[tokio::test]
async fn test_shared_path_declared_once() {
	let transport = MockTransport::new(|_, body| {
		let ids = legacy_actions(body).into_iter().map(|(id, _)| (id, json!({})));
		Ok(legacy_response(ids))
	});
	let exec = executor(Arc::clone(&transport), config());
	let batch = BatchAggregator::new().ensure_batch();

	let a = batch.append_legacy(&query(&["Web"], &["Title"]), decode::unit()).unwrap();
	let b = batch.append_legacy(&query(&["Web"], &["Url"]), decode::unit()).unwrap();
	exec.execute(&batch).await;
	a.await.unwrap();
	b.await.unwrap();

	let (_, document) = &transport.requests()[0];
	let nodes: Vec<&Value> = document.as_array().unwrap()[1..].iter().skip(1).step_by(2).collect();
	let statics = nodes.iter().filter(|n| n.get("StaticProperty").is_some()).count();
	let webs = nodes
		.iter()
		.filter(|n| n.pointer("/Property/Name") == Some(&json!("Web")))
		.count();
	assert_eq!(statics, 1);
	assert_eq!(webs, 1);

	let ids: Vec<u64> = document.as_array().unwrap()[1..]
		.iter()
		.step_by(2)
		.map(|v| v.as_u64().unwrap())
		.collect();
	let mut unique = ids.clone();
	unique.sort_unstable();
	unique.dedup();
	assert_eq!(unique.len(), ids.len(), "ids must be unique within a request");
}

#[tokio::test]
async fn test_rest_length_mismatch_fails_whole_chunk() {
	let transport = MockTransport::new(|url, body| {
		if is_legacy(url) {
			let ids = legacy_actions(body).into_iter().map(|(id, _)| (id, json!({"Title": "ok"})));
			return Ok(legacy_response(ids));
		}
		Ok(json!({"responses": [{"id": "0", "status": 200, "body": {}}]}))
	});
	let exec = executor(Arc::clone(&transport), config());
	let batch = BatchAggregator::new().ensure_batch();

	let legacy = batch
		.append_legacy(&query(&["Web"], &["Title"]), decode::field::<String>("Title"))
		.unwrap();
	let team = batch.append_rest(RestCall::get("/teams/a"), decode::json::<Value>()).unwrap();
	let group = batch.append_rest(RestCall::get("/groups/b"), decode::json::<Value>()).unwrap();

	let summary = exec.execute(&batch).await;
	assert_eq!(summary.http_calls, 2);
	assert_eq!(summary.failed, 2);

	assert_eq!(legacy.await.unwrap(), "ok");
	assert!(matches!(team.await, Err(Error::Protocol(_))));
	assert!(matches!(group.await, Err(Error::Protocol(_))));
}

#[tokio::test]
async fn test_rest_entries_correlate_by_index() {
	let transport = MockTransport::new(|_, body| {
		let requests = body["requests"].as_array().unwrap();
		assert_eq!(requests[1]["method"], "POST");
		assert_eq!(requests[1]["headers"]["Content-Type"], "application/json");
		Ok(json!({"responses": [
			{"id": "0", "status": 200, "body": {"displayName": "Alpha"}},
			{"id": "1", "status": 404, "body": {"error": {"code": "NotFound", "message": "Group missing"}}}
		]}))
	});
	let exec = executor(Arc::clone(&transport), config());
	let batch = BatchAggregator::new().ensure_batch();

	let team = batch
		.append_rest(RestCall::get("/teams/a"), decode::field::<String>("displayName"))
		.unwrap();
	let created = batch
		.append_rest(
			RestCall::with_body(HttpMethod::Post, "/groups", json!({"displayName": "g"})),
			decode::json::<Value>(),
		)
		.unwrap();

	exec.execute(&batch).await;
	assert_eq!(team.await.unwrap(), "Alpha");
	match created.await.unwrap_err() {
		Error::Server { code, message, .. } => {
			assert_eq!(code, 404);
			assert_eq!(message, "Group missing");
		}
		other => panic!("Expected Server error, got {other:?}"),
	}

	let (url, _) = &transport.requests()[0];
	assert_eq!(url.as_str(), "https://graph.microsoft.com/v1.0/$batch");
}

#[tokio::test]
async fn test_malformed_rest_entry_fails_only_its_operation() {
	init_tracing();
	let transport = MockTransport::new(|_, _| {
		Ok(json!({"responses": [
			{"id": "0", "status": 200, "body": {"displayName": "Alpha"}},
			{"id": "1", "body": {"displayName": "Beta"}},
			{"id": "2", "status": 200, "body": {"displayName": "Gamma"}}
		]}))
	});
	let exec = executor(Arc::clone(&transport), config());
	let batch = BatchAggregator::new().ensure_batch();

	let [a, b, c] = ["/teams/a", "/teams/b", "/teams/c"].map(|url| {
		batch
			.append_rest(RestCall::get(url), decode::field::<String>("displayName"))
			.unwrap()
	});

	let summary = exec.execute(&batch).await;
	assert_eq!(summary.completed, 2);
	assert_eq!(summary.failed, 1);
	assert_eq!(a.await.unwrap(), "Alpha");
	assert!(matches!(b.await, Err(Error::Protocol(_))));
	assert_eq!(c.await.unwrap(), "Gamma");
}

#[tokio::test]
async fn test_rest_partition_is_chunked() {
	let transport = MockTransport::new(|_, body| Ok(echo_rest(body)));
	let mut cfg = config();
	cfg.rest_batch_limit = 2;
	let exec = executor(Arc::clone(&transport), cfg);
	let batch = BatchAggregator::new().ensure_batch();

	let handles: Vec<_> = (0..5)
		.map(|i| {
			batch
				.append_rest(RestCall::get(format!("/teams/{i}")), decode::field::<String>("url"))
				.unwrap()
		})
		.collect();

	let summary = exec.execute(&batch).await;
	assert_eq!(summary.http_calls, 3);
	assert_eq!(summary.completed, 5);

	for (i, handle) in handles.into_iter().enumerate() {
		assert_eq!(handle.await.unwrap(), format!("/teams/{i}"));
	}

	let mut sizes: Vec<usize> = transport
		.requests()
		.iter()
		.map(|(_, body)| body["requests"].as_array().unwrap().len())
		.collect();
	sizes.sort_unstable();
	assert_eq!(sizes, vec![1, 2, 2]);
	for (_, body) in transport.requests() {
		let ids: Vec<&str> = body["requests"]
			.as_array()
			.unwrap()
			.iter()
			.map(|r| r["id"].as_str().unwrap())
			.collect();
		let expected: Vec<String> = (0..ids.len()).map(|i| i.to_string()).collect();
		assert_eq!(ids, expected);
	}
}

#[tokio::test]
async fn test_timeout_fails_partition_and_closes_batch() {
	let transport = MockTransport::delayed(Duration::from_secs(5), |_, _| Ok(json!([])));
	let mut cfg = config();
	cfg.request_timeout_ms = 50;
	let exec = executor(Arc::clone(&transport), cfg);
	let batch = BatchAggregator::new().ensure_batch();

	let a = batch.append_legacy(&query(&["Web"], &["Title"]), decode::unit()).unwrap();
	let b = batch.append_legacy(&query(&["Site"], &["Id"]), decode::unit()).unwrap();

	let summary = exec.execute(&batch).await;
	assert_eq!(summary.failed, 2);
	assert!(a.await.unwrap_err().is_timeout());
	assert!(b.await.unwrap_err().is_timeout());
	assert_eq!(batch.state(), BatchState::Executed);
}

#[tokio::test]
async fn test_transport_failure_still_executes_batch() {
	let transport = MockTransport::new(|_, _| Err(Error::Transport("connection reset".to_string())));
	let exec = executor(Arc::clone(&transport), config());
	let aggregator = BatchAggregator::new();
	let batch = aggregator.ensure_batch();

	let handle = batch.append_legacy(&query(&["Web"], &["Title"]), decode::unit()).unwrap();
	exec.execute(&batch).await;

	assert!(matches!(handle.await, Err(Error::Transport(_))));
	assert!(batch.is_executed());
	assert!(matches!(batch.operation_states()[0], OperationState::Failed(Error::Transport(_))));
	assert!(
		batch
			.append_legacy(&query(&["Web"], &["Title"]), decode::unit())
			.unwrap_err()
			.is_batch_closed()
	);
	assert_ne!(aggregator.ensure_batch().id(), batch.id());
}

#[tokio::test]
async fn test_header_error_fails_every_legacy_operation() {
	let transport = MockTransport::new(|_, _| {
		Ok(json!([{
			"SchemaVersion": "15.0.0.0",
			"ErrorInfo": {"ErrorCode": -2130575338, "ErrorMessage": "List does not exist."}
		}]))
	});
	let exec = executor(Arc::clone(&transport), config());
	let batch = BatchAggregator::new().ensure_batch();

	let a = batch.append_legacy(&query(&["Web"], &["Title"]), decode::unit()).unwrap();
	let b = batch.append_legacy(&query(&["Site"], &["Url"]), decode::unit()).unwrap();
	exec.execute(&batch).await;

	assert_eq!(a.await.unwrap_err().server_code(), Some(-2130575338));
	assert_eq!(b.await.unwrap_err().server_code(), Some(-2130575338));
}

#[tokio::test]
async fn test_incomplete_error_marker_fails_method_call() {
	let transport = MockTransport::new(|_, body| {
		let id = legacy_actions(body)[0].0;
		Ok(legacy_response([(id, json!({"ErrorInfo": {"ErrorMessage": "Access denied."}}))]))
	});
	let exec = executor(Arc::clone(&transport), config());
	let batch = BatchAggregator::new().ensure_batch();

	let rename = OperationDescriptor::at(REQUEST_CONTEXT_CURRENT)
		.property("Web")
		.method("SetTitle", vec![json!("Renamed")]);
	let handle = batch.append_legacy(&rename, decode::unit()).unwrap();
	exec.execute(&batch).await;

	let err = handle.await.unwrap_err();
	assert!(err.is_server_error());
	assert_eq!(err.to_string(), "Server error 0: Access denied.");
}

#[tokio::test]
async fn test_unknown_schema_is_protocol_error() {
	let transport = MockTransport::new(|_, _| Ok(json!([{"SchemaVersion": "2.0.0.0"}, 2, {}])));
	let exec = executor(Arc::clone(&transport), config());
	let batch = BatchAggregator::new().ensure_batch();

	let handle = batch.append_legacy(&query(&["Web"], &["Title"]), decode::unit()).unwrap();
	exec.execute(&batch).await;
	assert!(matches!(handle.await, Err(Error::Protocol(_))));
}

#[tokio::test]
async fn test_absent_result_is_missing() {
	let transport = MockTransport::new(|_, _| Ok(legacy_response([])));
	let exec = executor(Arc::clone(&transport), config());
	let batch = BatchAggregator::new().ensure_batch();

	let handle = batch.append_legacy(&query(&["Web"], &["Title"]), decode::unit()).unwrap();
	exec.execute(&batch).await;
	assert!(matches!(handle.await, Err(Error::MissingResult { .. })));
}

#[tokio::test]
async fn test_concurrent_execute_sends_once() {
	let transport = MockTransport::delayed(Duration::from_millis(20), |_, body| {
		let ids = legacy_actions(body).into_iter().map(|(id, _)| (id, json!({})));
		Ok(legacy_response(ids))
	});
	let exec = executor(Arc::clone(&transport), config());
	let batch = BatchAggregator::new().ensure_batch();
	let handle = batch.append_legacy(&query(&["Web"], &["Title"]), decode::unit()).unwrap();

	let (first, second) = tokio::join!(exec.execute(&batch), exec.execute(&batch));
	assert_eq!(first, second);
	assert_eq!(transport.calls(), 1);
	handle.await.unwrap();

	assert_eq!(exec.execute(&batch).await, first);
	assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_empty_batch_makes_no_calls() {
	let transport = MockTransport::new(|_, _| panic!("no request expected"));
	let exec = executor(Arc::clone(&transport), config());
	let batch = BatchAggregator::new().ensure_batch();

	let summary = exec.execute(&batch).await;
	assert_eq!(summary.http_calls, 0);
	assert_eq!(summary.completed + summary.failed, 0);
	assert!(batch.is_executed());
}

#[tokio::test]
async fn test_decoder_failure_does_not_touch_siblings() {
	let transport = MockTransport::new(|_, body| {
		let actions = legacy_actions(body);
		Ok(legacy_response([
			(actions[0].0, json!({"Title": 42})),
			(actions[1].0, json!({"Url": "https://contoso.example.com"})),
		]))
	});
	let exec = executor(Arc::clone(&transport), config());
	let batch = BatchAggregator::new().ensure_batch();

	let title = batch
		.append_legacy(&query(&["Web"], &["Title"]), decode::field::<String>("Title"))
		.unwrap();
	let url = batch
		.append_legacy(&query(&["Site"], &["Url"]), decode::field::<String>("Url"))
		.unwrap();
	exec.execute(&batch).await;

	assert!(matches!(title.await, Err(Error::Decode(_))));
	assert_eq!(url.await.unwrap(), "https://contoso.example.com");
}

#[tokio::test]
async fn test_beta_channel_changes_rest_endpoint() {
	let transport = MockTransport::new(|_, body| Ok(echo_rest(body)));
	let exec = executor(Arc::clone(&transport), config());
	exec.update_config(|cfg| cfg.set_beta(true)).unwrap();

	let batch = BatchAggregator::new().ensure_batch();
	let handle = batch.append_rest(RestCall::get("/me"), decode::unit()).unwrap();
	exec.execute(&batch).await;
	handle.await.unwrap();

	assert_eq!(transport.requests()[0].0.as_str(), "https://graph.microsoft.com/beta/$batch");
}

#[test]
fn test_update_config_rejects_invalid_values() {
	let exec = executor(MockTransport::new(|_, _| Ok(Value::Null)), config());
	let err = exec
		.update_config(|cfg| {
			cfg.rest_batch_limit = 0;
			Ok(())
		})
		.unwrap_err();
	assert!(matches!(err, Error::InvalidConfig(_)));
	assert_eq!(exec.config().rest_batch_limit, 20);

	exec.update_config(|cfg| {
		cfg.pin_beta();
		Ok(())
	})
	.unwrap();
	let err = exec.update_config(|cfg| cfg.set_beta(false)).unwrap_err();
	assert!(matches!(err, Error::InvalidTransition { .. }));
	assert!(exec.config().channel.is_beta());
}
