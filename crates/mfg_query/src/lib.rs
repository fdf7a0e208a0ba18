//! Advanced search, trace-key resolution, and options enumerations over
//! the P1/P2/P3 record store. Read-only: nothing here writes to the
//! database.

pub mod error;
pub mod options;
pub mod search;
pub mod trace;
pub mod trace_key;

pub use error::{QueryError, Result};
pub use options::{options, OPTIONS_CAP};
pub use search::{search, SearchQuery, SearchRecord, SearchResult};
pub use trace::{trace, TraceDetail};
pub use trace_key::{decode_trace_key, encode_trace_key};
