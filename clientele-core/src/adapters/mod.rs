//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the repository, transaction and id-batch ports
//! - An in-memory store for the same ports
//! - Argon2 and SHA-256 password encoders
//! - Compile-time entity factories

pub mod duckdb;
pub mod entity;
pub mod memory;
pub mod password;
