//! pathbatch: batched model operations for SharePoint-style sites
//!
//! This crate is the model layer over `pathbatch-runtime`. A [`Session`]
//! owns one batch pipeline and hands out entity handles ([`Web`], [`Site`],
//! [`Team`], [`Group`]) whose methods turn into legacy object-path or REST
//! operations.
//!
//! # Examples
//!
//! ## Batching several reads into one round trip per protocol
//!
//! ```ignore
//! use pathbatch::Session;
//!
//! #[tokio::main]
//! async fn main() -> pathbatch::Result<()> {
//!     let session = Session::connect("https://contoso.sharepoint.com/sites/dev")?;
//!
//!     // Nothing is sent yet
//!     let web = session.web().load_batched()?;
//!     let site = session.site().load_batched()?;
//!     let group = session.group("1ee4c4ae-7a43-4dd2-9d4a-b2f4a3c5e6d7").load_batched()?;
//!
//!     // One legacy call, one REST call
//!     let summary = session.execute().await;
//!     assert_eq!(summary.http_calls, 2);
//!
//!     println!("{} at {}", web.await?.title, site.await?.url);
//!     println!("group {}", group.await?.display_name);
//!     Ok(())
//! }
//! ```
//!
//! ## One-shot calls
//!
//! ```ignore
//! let session = Session::connect("https://contoso.sharepoint.com/sites/dev")?;
//! session.web().set_title("Engineering").await?;
//! ```

mod group;
mod session;
mod site;
mod team;
mod web;

pub use group::{Group, GroupInfo};
pub use pathbatch_runtime::{
	Batch, BatchState, ClientConfig, Error, ExecutionSummary, GraphChannel, HttpTransport, OperationHandle, Result,
	Transport,
};
pub use session::Session;
pub use site::{Site, SiteInfo};
pub use team::{Team, TeamInfo};
pub use web::{UserInfo, Web, WebInfo};
