//! HTTP handlers for declared SQL endpoints.

pub mod endpoint;
pub use endpoint::*;
