//! Storage traits for persistence
//!
//! Adapters own integrity: primary-key uniqueness, foreign keys on reviews and
//! the delete policy for customers and items that still have reviews. Lists
//! are ordered by id.

use crate::Result;
use async_trait::async_trait;
use rating_types::{Customer, Item, NewCustomer, NewItem, NewReview, Review};

/// Customer store
#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn create_customer(&self, customer: &NewCustomer) -> Result<Customer>;
    async fn insert_customer(&self, customer: &Customer) -> Result<()>;
    async fn get_customer(&self, id: i64) -> Result<Option<Customer>>;
    async fn list_customers(&self) -> Result<Vec<Customer>>;
    async fn update_customer(&self, customer: &Customer) -> Result<()>;
    async fn delete_customer(&self, id: i64) -> Result<()>;
}

/// Item store
#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn create_item(&self, item: &NewItem) -> Result<Item>;
    async fn insert_item(&self, item: &Item) -> Result<()>;
    async fn get_item(&self, id: i64) -> Result<Option<Item>>;
    async fn list_items(&self) -> Result<Vec<Item>>;
    async fn update_item(&self, item: &Item) -> Result<()>;
    async fn delete_item(&self, id: i64) -> Result<()>;
}

/// Review store
#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn create_review(&self, review: &NewReview) -> Result<Review>;
    async fn insert_review(&self, review: &Review) -> Result<()>;
    async fn get_review(&self, id: i64) -> Result<Option<Review>>;
    async fn list_reviews(&self) -> Result<Vec<Review>>;
    async fn list_reviews_by_customer(&self, customer_id: i64) -> Result<Vec<Review>>;
    async fn list_reviews_by_item(&self, item_id: i64) -> Result<Vec<Review>>;
    /// Only the comment is mutable; a review keeps its owners for life
    async fn update_review_comment(&self, id: i64, comment: &str) -> Result<()>;
    async fn delete_review(&self, id: i64) -> Result<()>;
}

/// Everything the rating model needs from a backend
pub trait RatingStore: CustomerStore + ItemStore + ReviewStore {}

impl<T: CustomerStore + ItemStore + ReviewStore + ?Sized> RatingStore for T {}
