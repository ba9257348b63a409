//! keel-db - Database connection layer for Keel
//!
//! This crate provides the [`Connection`] trait the migration engine talks to,
//! a thin row container ([`Rows`] / [`SqlValue`]), and a DuckDB
//! implementation.

pub mod duckdb;
pub mod error;
pub mod rows;
pub mod traits;

pub use crate::duckdb::DuckDbBackend;
pub use error::{DbError, DbResult};
pub use rows::{Rows, SqlValue};
pub use traits::Connection;
