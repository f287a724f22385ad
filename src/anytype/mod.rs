//! Client core for the local Anytype HTTP API: request builder, transport,
//! response normalizer and the operation façade composed from them.

pub mod client;
pub mod endpoints;
pub mod error;
pub mod normalize;
pub mod transport;

pub use client::AnytypeClient;
pub use error::ApiError;
