//! Storage layer
//!
//! SQLite (embedded) behind the storage ports of `rating-core`.

pub mod db;

pub use db::Database;
