//! # boxoffice-database
//!
//! PostgreSQL connection management and repositories for resources and
//! holds.

pub mod connection;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
