//! Database connection pool factories.

pub mod postgres;

#[cfg(feature = "mssql")]
pub mod mssql;
