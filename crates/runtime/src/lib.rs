//! pathbatch runtime - graph building, batching, and response correlation
//!
//! This crate turns typed operations into batched round trips against two
//! backends and routes every response entry back to its operation:
//!
//! - **Graph**: object-path declarations with per-batch id allocation and dedup
//! - **Batch**: ordered pending operations with an Open/Executing/Executed lifecycle
//! - **Codec**: legacy object-path documents and REST JSON batches
//! - **Executor**: partitioning, chunking, timeouts, and failure scoping
//! - **Transport**: one JSON POST per round trip over HTTP
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │  pathbatch   │  Model objects (Session, Web, Team, ...)
//! └──────┬───────┘
//!        │ appends descriptors + decoders
//! ┌──────▼───────┐
//! │   runtime    │  This crate
//! │  ┌────────┐  │
//! │  │ Batch  │  │  Operations, result slots
//! │  └────────┘  │
//! │  ┌────────┐  │
//! │  │ Graph  │  │  Object paths, identities
//! │  └────────┘  │
//! │  ┌────────┐  │
//! │  │ Exec   │  │  Codecs, correlation
//! │  └────────┘  │
//! │  ┌────────┐  │
//! │  │ Trans  │  │  HTTP
//! │  └────────┘  │
//! └──────────────┘
//! ```

pub mod batch;
pub mod codec;
pub mod config;
pub mod decode;
pub mod error;
pub mod executor;
pub mod graph;
pub mod identity;
pub mod operation;
pub mod transport;

// Re-export key types at crate root
pub use batch::{Batch, BatchAggregator, BatchId, BatchState, ExecutionSummary};
pub use config::{ClientConfig, GraphChannel, MAX_REST_BATCH_LIMIT};
pub use error::{BuildError, Error, Result};
pub use executor::BatchExecutor;
pub use graph::{ActionRequest, Graph, GraphBuilder, ObjectPathArena, OperationDescriptor, RootRef};
pub use operation::{Decoder, OperationHandle, OperationKind, OperationState};
pub use transport::{HttpTransport, Transport, TransportFuture};
pub use url::Url;
