use std::sync::Arc;

use pathbatch_protocol::RestCall;
use pathbatch_runtime::{OperationHandle, Result, decode};
use serde::{Deserialize, Serialize};

use crate::session::Context;

/// Group properties returned by `GET /groups/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupInfo {
	pub id: String,
	pub display_name: String,
	#[serde(default)]
	pub mail: Option<String>,
	#[serde(default)]
	pub group_types: Vec<String>,
}

impl GroupInfo {
	/// True for Microsoft 365 ("Unified") groups.
	pub fn is_unified(&self) -> bool {
		self.group_types.iter().any(|t| t == "Unified")
	}
}

#[derive(Debug, Clone)]
pub struct Group {
	ctx: Arc<Context>,
	id: String,
}

impl Group {
	pub(crate) fn new(ctx: Arc<Context>, id: &str) -> Self {
		Self { ctx, id: id.to_string() }
	}

	pub fn id(&self) -> &str {
		&self.id
	}

	fn load_call(&self) -> RestCall {
		RestCall::get(format!("/groups/{}", self.id))
	}

	pub async fn load(&self) -> Result<GroupInfo> {
		self.ctx.run_rest(self.load_call(), decode::json::<GroupInfo>).await
	}

	pub fn load_batched(&self) -> Result<OperationHandle<GroupInfo>> {
		self.ctx.enqueue_rest(self.load_call(), decode::json::<GroupInfo>)
	}
}
