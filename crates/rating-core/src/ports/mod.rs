//! Port traits (interfaces) for storage adapters

pub mod storage;

pub use storage::{CustomerStore, ItemStore, RatingStore, ReviewStore};
