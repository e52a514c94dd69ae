//! Rating Core Library
//!
//! Schema and relationship layer for the customer / item / review model:
//! table metadata, relationship wiring, storage ports, the cycle-truncating
//! serializer and the service facade built on top of them.

// Re-export pure types from rating-types
pub use rating_types::*;

pub mod config;
pub mod error;
pub mod graph;
pub mod memory;
pub mod ports;
pub mod relations;
pub mod schema;
pub mod serialize;
pub mod service;
pub mod validation;

pub use config::{DeletePolicy, StoreConfig};
pub use error::{RatingError, Result};
pub use graph::Graph;
pub use memory::MemoryStore;
pub use ports::{CustomerStore, ItemStore, RatingStore, ReviewStore};
pub use serialize::{SerializeOptions, Serializer};
pub use service::RatingService;
pub use validation::{ValidationMode, Validator};
