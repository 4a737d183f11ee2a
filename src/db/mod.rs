//! Database module: the security data source and the user store behind it.
//!
//! Layout:
//! - `pool.rs`: driver registry and connection pool provisioning
//! - `schema.rs`: DDL for the default users/authorities layout
//! - `models.rs`: row structs mirroring the two tables
//! - `users.rs`: read-only user-details lookup over the pool

pub mod models;
pub mod pool;
pub mod schema;
pub mod users;

pub use pool::{DataSource, DriverKind, PoolBounds};
pub use schema::SECURITY_SCHEMA;
pub use users::JdbcUserDetailsService;
