//! Team - a REST resource addressed by id.

use std::sync::Arc;

use pathbatch_protocol::RestCall;
use pathbatch_runtime::{OperationHandle, Result, decode};
use serde::{Deserialize, Serialize};

use crate::session::Context;

/// Team properties returned by `GET /teams/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamInfo {
	pub id: String,
	pub display_name: String,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default)]
	pub is_archived: bool,
}

/// Handle for one team. Cheap to clone; obtained from
/// [`Session::team`](crate::Session::team).
#[derive(Debug, Clone)]
pub struct Team {
	ctx: Arc<Context>,
	id: String,
}

impl Team {
	pub(crate) fn new(ctx: Arc<Context>, id: &str) -> Self {
		Self { ctx, id: id.to_string() }
	}

	pub fn id(&self) -> &str {
		&self.id
	}

	fn load_call(&self) -> RestCall {
		RestCall::get(format!("/teams/{}", self.id))
	}

	pub async fn load(&self) -> Result<TeamInfo> {
		self.ctx.run_rest(self.load_call(), decode::json::<TeamInfo>).await
	}

	pub fn load_batched(&self) -> Result<OperationHandle<TeamInfo>> {
		self.ctx.enqueue_rest(self.load_call(), decode::json::<TeamInfo>)
	}
}
