//! Client configuration.
//!
//! [`ClientConfig`] is the owned settings value a session and its executor
//! share. It can be built in code or read from a JSON file.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// Default REST service root.
pub const DEFAULT_GRAPH_URL: &str = "https://graph.microsoft.com";

/// Upper bound on REST requests per batch call enforced by the service.
pub const MAX_REST_BATCH_LIMIT: usize = 20;

/// Relative path of the legacy query endpoint under a site.
const PROCESS_QUERY_PATH: &str = "_vti_bin/client.svc/ProcessQuery";

/// Which REST service version requests go to.
///
/// `PinnedBeta` is terminal for the stable direction: once pinned, the
/// channel can never go back to `Stable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GraphChannel {
	#[default]
	Stable,
	Beta,
	PinnedBeta,
}

impl GraphChannel {
	/// Version segment used in REST urls.
	pub fn version_segment(self) -> &'static str {
		match self {
			GraphChannel::Stable => "v1.0",
			GraphChannel::Beta | GraphChannel::PinnedBeta => "beta",
		}
	}

	pub fn is_beta(self) -> bool {
		!matches!(self, GraphChannel::Stable)
	}

	fn name(self) -> &'static str {
		match self {
			GraphChannel::Stable => "stable",
			GraphChannel::Beta => "beta",
			GraphChannel::PinnedBeta => "pinned-beta",
		}
	}

	/// Switches between stable and beta.
	///
	/// Requesting stable while pinned fails; requesting beta while pinned keeps the pin.
	pub fn set_beta(self, beta: bool) -> Result<GraphChannel> {
		match (self, beta) {
			(GraphChannel::PinnedBeta, false) => Err(Error::InvalidTransition {
				from: self.name(),
				to: GraphChannel::Stable.name(),
			}),
			(GraphChannel::PinnedBeta, true) => Ok(GraphChannel::PinnedBeta),
			(_, true) => Ok(GraphChannel::Beta),
			(_, false) => Ok(GraphChannel::Stable),
		}
	}

	/// Pins the beta channel.
	pub fn pin_beta(self) -> GraphChannel {
		GraphChannel::PinnedBeta
	}
}

/// Settings for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
	/// Site the legacy endpoint lives under.
	pub site_url: Url,
	/// REST service root.
	#[serde(default = "default_graph_url")]
	pub graph_url: Url,
	/// REST version channel.
	#[serde(default)]
	pub channel: GraphChannel,
	/// Reported in the legacy request header.
	#[serde(default = "default_application_name")]
	pub application_name: String,
	/// Reported in the legacy request header.
	#[serde(default = "default_library_version")]
	pub library_version: String,
	/// Per-call timeout applied by the executor.
	#[serde(default = "default_request_timeout_ms")]
	pub request_timeout_ms: u64,
	/// Maximum REST requests per batch call.
	#[serde(default = "default_rest_batch_limit")]
	pub rest_batch_limit: usize,
}

fn default_graph_url() -> Url {
	Url::parse(DEFAULT_GRAPH_URL).expect("DEFAULT_GRAPH_URL is a valid url")
}

fn default_application_name() -> String {
	"pathbatch".to_string()
}

fn default_library_version() -> String {
	"16.0.0.0".to_string()
}

fn default_request_timeout_ms() -> u64 {
	100_000
}

fn default_rest_batch_limit() -> usize {
	MAX_REST_BATCH_LIMIT
}

impl ClientConfig {
	/// Creates a config for a site with default REST settings.
	pub fn new(site_url: Url) -> Self {
		Self {
			site_url,
			graph_url: default_graph_url(),
			channel: GraphChannel::default(),
			application_name: default_application_name(),
			library_version: default_library_version(),
			request_timeout_ms: default_request_timeout_ms(),
			rest_batch_limit: default_rest_batch_limit(),
		}
	}

	/// Parses a site url and creates a config for it.
	pub fn for_site(site_url: &str) -> Result<Self> {
		let url = Url::parse(site_url).map_err(|e| Error::InvalidConfig(format!("site url '{site_url}': {e}")))?;
		let config = Self::new(url);
		config.validate()?;
		Ok(config)
	}

	/// Loads and validates a JSON config file.
	pub fn from_path(path: &Path) -> Result<Self> {
		let raw = std::fs::read_to_string(path)
			.map_err(|e| Error::InvalidConfig(format!("failed to read {}: {e}", path.display())))?;
		let config: ClientConfig = serde_json::from_str(&raw)
			.map_err(|e| Error::InvalidConfig(format!("failed to parse {}: {e}", path.display())))?;
		config.validate()?;
		Ok(config)
	}

	/// Checks value ranges and url schemes.
	pub fn validate(&self) -> Result<()> {
		for (label, url) in [("siteUrl", &self.site_url), ("graphUrl", &self.graph_url)] {
			if !matches!(url.scheme(), "http" | "https") {
				return Err(Error::InvalidConfig(format!("{label} must be http(s), got '{url}'")));
			}
		}
		if self.request_timeout_ms == 0 {
			return Err(Error::InvalidConfig("requestTimeoutMs must be greater than zero".to_string()));
		}
		if self.rest_batch_limit == 0 || self.rest_batch_limit > MAX_REST_BATCH_LIMIT {
			return Err(Error::InvalidConfig(format!(
				"restBatchLimit must be between 1 and {MAX_REST_BATCH_LIMIT}, got {}",
				self.rest_batch_limit
			)));
		}
		Ok(())
	}

	pub fn request_timeout(&self) -> Duration {
		Duration::from_millis(self.request_timeout_ms)
	}

	/// Switches the REST channel, honoring the pin.
	pub fn set_beta(&mut self, beta: bool) -> Result<()> {
		self.channel = self.channel.set_beta(beta)?;
		Ok(())
	}

	pub fn pin_beta(&mut self) {
		self.channel = self.channel.pin_beta();
	}

	/// Legacy endpoint for the configured site.
	pub fn process_query_url(&self) -> Result<Url> {
		join_path(&self.site_url, PROCESS_QUERY_PATH)
	}

	/// REST batch endpoint for the configured channel.
	pub fn rest_batch_url(&self) -> Result<Url> {
		join_path(&self.graph_url, &format!("{}/$batch", self.channel.version_segment()))
	}
}

/// Joins `path` under `base`, treating `base` as a directory.
fn join_path(base: &Url, path: &str) -> Result<Url> {
	let mut base = base.clone();
	if !base.path().ends_with('/') {
		let dir = format!("{}/", base.path());
		base.set_path(&dir);
	}
	base.join(path)
		.map_err(|e| Error::InvalidConfig(format!("cannot join '{path}' onto '{base}': {e}")))
}
