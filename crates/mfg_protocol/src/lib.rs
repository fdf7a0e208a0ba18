//! Shared protocol types for the manufacturing traceability service.
//!
//! Every crate in the workspace speaks this vocabulary: the closed
//! [`error::ErrorCode`] taxonomy, the [`types::TableCode`] enum that tags
//! which of the three record kinds a row belongs to, and the
//! [`config::AppConfig`] assembled once from the environment at startup.
//!
//! This crate intentionally carries no transport: no HTTP router, no wire
//! codec. The core talks in plain Rust types; an external transport layer
//! is responsible for putting them on the wire.

pub mod config;
pub mod defaults;
pub mod error;
pub mod types;

pub use error::{ErrorCode, ProtocolError};
pub use types::{DataType, Pagination, ResolvedCaller, TableCode};
