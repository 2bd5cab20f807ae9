//! Request encoding and response decoding for both protocols.
//!
//! - [`legacy`]: object-path documents, positional `id, value` responses
//! - [`rest`]: JSON batch bodies, index-correlated responses

pub mod legacy;
pub mod rest;


pub use legacy::{LegacyEntry, LegacyResponse, action_ids, decode_legacy, encode_legacy};
pub use rest::{decode_rest, encode_rest};
