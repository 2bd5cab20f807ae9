use std::sync::Arc;

use pathbatch_protocol::REQUEST_CONTEXT_CURRENT;
use pathbatch_runtime::{OperationDescriptor, OperationHandle, Result, decode};
use serde::{Deserialize, Serialize};

use crate::session::Context;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SiteInfo {
	pub id: String,
	pub url: String,
}

/// Handle for `Current.Site`, the site collection.
#[derive(Debug, Clone)]
pub struct Site {
	ctx: Arc<Context>,
}

impl Site {
	pub(crate) fn new(ctx: Arc<Context>) -> Self {
		Self { ctx }
	}

	fn load_descriptor() -> OperationDescriptor {
		OperationDescriptor::at(REQUEST_CONTEXT_CURRENT)
			.property("Site")
			.query(["Id", "Url"])
	}

	pub async fn load(&self) -> Result<SiteInfo> {
		self.ctx.run_legacy(Self::load_descriptor(), decode::json::<SiteInfo>).await
	}

	pub fn load_batched(&self) -> Result<OperationHandle<SiteInfo>> {
		self.ctx.enqueue_legacy(Self::load_descriptor(), decode::json::<SiteInfo>)
	}
}
