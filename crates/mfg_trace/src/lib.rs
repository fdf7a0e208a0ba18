//! Stateless traceability flattener: joins P3 inspection rows to their
//! P2 winder and P1 lot and emits a flat, tenant-configurable column
//! layout. Every call opens its own ephemeral join maps; nothing here
//! is shared across requests beyond the DB pool and the schema
//! registry's own read-through cache.

pub mod columns;
pub mod compression;
pub mod error;
pub mod flatten;

pub use columns::{FlattenerColumnMap, DEFAULT_COLUMNS};
pub use compression::{gzip, Compression};
pub use error::{Result, TraceError};
pub use flatten::{flatten, FlatRow, FlattenMetadata, FlattenOutcome, FlattenQuery, MAX_PRODUCT_IDS};
