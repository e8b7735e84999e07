//! Database layer
//!
//! Storage runs on SQLite by default (single-binary deployment) or MySQL
//! for larger installs, behind a trait-based pool abstraction so the rest
//! of the application never names a concrete backend. Schema changes are
//! applied through versioned migrations at startup.

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
