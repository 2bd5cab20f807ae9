//! Wire types for the object-path and REST batch protocols.
//!
//! This crate contains the serde-serializable types exchanged with the two
//! backends a batch can target. These types represent the "protocol layer" -
//! the shapes of data as they appear on the wire.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! - **Pure data**: No behavior beyond serialization/deserialization and small constructors
//! - **1:1 with protocol**: Field names match what the servers send and expect
//! - **Stable**: Changes only when a wire protocol changes
//!
//! Graph construction, correlation and batching live in `pathbatch-runtime`.

pub mod legacy;
pub mod object_path;
pub mod rest;
pub mod roots;

pub use legacy::*;
pub use object_path::*;
pub use rest::*;
pub use roots::*;
