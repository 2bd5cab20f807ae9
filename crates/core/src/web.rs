//! Web - the site's root web, reached through the legacy protocol.

use std::sync::Arc;

use pathbatch_protocol::REQUEST_CONTEXT_CURRENT;
use pathbatch_runtime::{OperationDescriptor, OperationHandle, Result, decode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::session::Context;

/// Fields loaded by [`Web::load`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WebInfo {
	pub id: String,
	pub title: String,
	pub url: String,
	#[serde(default)]
	pub description: String,
}

/// Fields loaded by [`Web::current_user`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserInfo {
	pub id: i64,
	pub title: String,
	pub login_name: String,
	#[serde(default)]
	pub email: String,
}

/// Handle for `Current.Web`.
#[derive(Debug, Clone)]
pub struct Web {
	ctx: Arc<Context>,
}

impl Web {
	pub(crate) fn new(ctx: Arc<Context>) -> Self {
		Self { ctx }
	}

	fn path() -> OperationDescriptor {
		OperationDescriptor::at(REQUEST_CONTEXT_CURRENT).property("Web")
	}

	fn load_descriptor() -> OperationDescriptor {
		Self::path().query(["Id", "Title", "Url", "Description"])
	}

	fn set_title_descriptor(title: &str) -> OperationDescriptor {
		Self::path().method("SetTitle", vec![Value::from(title)])
	}

	fn current_user_descriptor() -> OperationDescriptor {
		Self::path()
			.property("CurrentUser")
			.query(["Id", "Title", "LoginName", "Email"])
	}

	/// Loads id, title, url and description.
	pub async fn load(&self) -> Result<WebInfo> {
		self.ctx.run_legacy(Self::load_descriptor(), decode::json::<WebInfo>).await
	}

	pub fn load_batched(&self) -> Result<OperationHandle<WebInfo>> {
		self.ctx.enqueue_legacy(Self::load_descriptor(), decode::json::<WebInfo>)
	}

	/// Renames the web.
	pub async fn set_title(&self, title: &str) -> Result<()> {
		self.ctx.run_legacy(Self::set_title_descriptor(title), decode::unit).await
	}

	pub fn set_title_batched(&self, title: &str) -> Result<OperationHandle<()>> {
		self.ctx.enqueue_legacy(Self::set_title_descriptor(title), decode::unit)
	}

	/// The user the session is authenticated as.
	pub async fn current_user(&self) -> Result<UserInfo> {
		self.ctx
			.run_legacy(Self::current_user_descriptor(), decode::json::<UserInfo>)
			.await
	}

	pub fn current_user_batched(&self) -> Result<OperationHandle<UserInfo>> {
		self.ctx
			.enqueue_legacy(Self::current_user_descriptor(), decode::json::<UserInfo>)
	}
}
