//! Data Transfer Objects for REST request/response serialization.
//!
//! Timestamps in session listings are RFC 3339 strings; timestamps inside
//! replay documents are epoch milliseconds.

pub mod common_dto;
pub mod ingest_dto;
pub mod session_dto;

pub use common_dto::*;
pub use ingest_dto::*;
pub use session_dto::*;
