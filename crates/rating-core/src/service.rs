//! Rating service
//!
//! Explicit queries in place of lazily loaded relationship attributes, plus
//! validation and serialization entry points. Store errors pass through
//! unchanged.

use crate::error::{RatingError, Result};
use crate::graph::{fetch_related, Graph};
use crate::ports::RatingStore;
use crate::relations::relationship;
use crate::serialize::{SerializeOptions, Serializer};
use crate::validation::Validator;
use rating_types::{
    Customer, EntityKind, Item, NewCustomer, NewItem, NewReview, Record, Review,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

pub struct RatingService<S: RatingStore + ?Sized> {
    store: Arc<S>,
    validator: Validator,
}

impl<S: RatingStore + ?Sized> RatingService<S> {
    pub fn new(store: Arc<S>, validator: Validator) -> Self {
        Self { store, validator }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    // Customer operations
    pub async fn create_customer(&self, name: &str) -> Result<Customer> {
        self.validator.name("name", name)?;
        let customer = self
            .store
            .create_customer(&NewCustomer {
                name: name.to_string(),
            })
            .await?;
        info!("Created {}", customer);
        Ok(customer)
    }

    pub async fn add_customer(&self, customer: &Customer) -> Result<()> {
        self.validator.name("name", &customer.name)?;
        self.store.insert_customer(customer).await?;
        info!("Inserted {}", customer);
        Ok(())
    }

    pub async fn get_customer(&self, id: i64) -> Result<Customer> {
        self.store
            .get_customer(id)
            .await?
            .ok_or_else(|| RatingError::not_found(EntityKind::Customer, id))
    }

    pub async fn list_customers(&self) -> Result<Vec<Customer>> {
        self.store.list_customers().await
    }

    pub async fn rename_customer(&self, id: i64, name: &str) -> Result<Customer> {
        self.validator.name("name", name)?;
        let customer = Customer::new(id, name);
        self.store.update_customer(&customer).await?;
        debug!("Renamed customer {} to {}", id, name);
        Ok(customer)
    }

    pub async fn delete_customer(&self, id: i64) -> Result<()> {
        info!("Deleting customer {}", id);
        self.store.delete_customer(id).await
    }

    // Item operations
    pub async fn create_item(&self, name: &str, price: f64) -> Result<Item> {
        self.validator.name("name", name)?;
        self.validator.price(price)?;
        let item = self
            .store
            .create_item(&NewItem {
                name: name.to_string(),
                price,
            })
            .await?;
        info!("Created {}", item);
        Ok(item)
    }

    pub async fn add_item(&self, item: &Item) -> Result<()> {
        self.validator.name("name", &item.name)?;
        self.validator.price(item.price)?;
        self.store.insert_item(item).await?;
        info!("Inserted {}", item);
        Ok(())
    }

    pub async fn get_item(&self, id: i64) -> Result<Item> {
        self.store
            .get_item(id)
            .await?
            .ok_or_else(|| RatingError::not_found(EntityKind::Item, id))
    }

    pub async fn list_items(&self) -> Result<Vec<Item>> {
        self.store.list_items().await
    }

    pub async fn update_item(&self, item: &Item) -> Result<()> {
        self.validator.name("name", &item.name)?;
        self.validator.price(item.price)?;
        self.store.update_item(item).await?;
        debug!("Updated {}", item);
        Ok(())
    }

    pub async fn delete_item(&self, id: i64) -> Result<()> {
        info!("Deleting item {}", id);
        self.store.delete_item(id).await
    }

    // Review operations
    pub async fn create_review(&self, comment: &str, customer_id: i64, item_id: i64) -> Result<Review> {
        self.validator.name("comment", comment)?;
        let review = self
            .store
            .create_review(&NewReview {
                comment: comment.to_string(),
                customer_id,
                item_id,
            })
            .await?;
        info!("Created {}", review);
        Ok(review)
    }

    pub async fn add_review(&self, review: &Review) -> Result<()> {
        self.validator.name("comment", &review.comment)?;
        self.store.insert_review(review).await?;
        info!("Inserted {}", review);
        Ok(())
    }

    pub async fn get_review(&self, id: i64) -> Result<Review> {
        self.store
            .get_review(id)
            .await?
            .ok_or_else(|| RatingError::not_found(EntityKind::Review, id))
    }

    pub async fn list_reviews(&self) -> Result<Vec<Review>> {
        self.store.list_reviews().await
    }

    pub async fn update_review_comment(&self, id: i64, comment: &str) -> Result<()> {
        self.validator.name("comment", comment)?;
        self.store.update_review_comment(id, comment).await?;
        debug!("Updated comment of review {}", id);
        Ok(())
    }

    pub async fn delete_review(&self, id: i64) -> Result<()> {
        info!("Deleting review {}", id);
        self.store.delete_review(id).await
    }

    // Relationship queries
    pub async fn customer_reviews(&self, customer_id: i64) -> Result<Vec<Review>> {
        self.get_customer(customer_id).await?;
        self.store.list_reviews_by_customer(customer_id).await
    }

    pub async fn item_reviews(&self, item_id: i64) -> Result<Vec<Review>> {
        self.get_item(item_id).await?;
        self.store.list_reviews_by_item(item_id).await
    }

    /// Items reviewed by a customer, one entry per review
    pub async fn items_for_customer(&self, customer_id: i64) -> Result<Vec<Item>> {
        let customer = Record::from(self.get_customer(customer_id).await?);
        let rows = self.follow(&customer, "items").await?;
        Ok(rows.into_iter().filter_map(Record::into_item).collect())
    }

    /// Customers who reviewed an item, one entry per review
    pub async fn customers_for_item(&self, item_id: i64) -> Result<Vec<Customer>> {
        let item = Record::from(self.get_item(item_id).await?);
        let rows = self.follow(&item, "customers").await?;
        Ok(rows.into_iter().filter_map(Record::into_customer).collect())
    }

    pub async fn review_customer(&self, review_id: i64) -> Result<Customer> {
        let review = Record::from(self.get_review(review_id).await?);
        self.follow(&review, "customer")
            .await?
            .into_iter()
            .find_map(Record::into_customer)
            .ok_or_else(|| {
                RatingError::ReferentialIntegrity(format!("review {} has no customer", review_id))
            })
    }

    pub async fn review_item(&self, review_id: i64) -> Result<Item> {
        let review = Record::from(self.get_review(review_id).await?);
        self.follow(&review, "item")
            .await?
            .into_iter()
            .find_map(Record::into_item)
            .ok_or_else(|| {
                RatingError::ReferentialIntegrity(format!("review {} has no item", review_id))
            })
    }

    async fn follow(&self, record: &Record, name: &str) -> Result<Vec<Record>> {
        let rel = relationship(record.kind(), name).ok_or_else(|| {
            RatingError::Config(format!("{} has no relationship {}", record.kind(), name))
        })?;
        fetch_related(self.store.as_ref(), record, rel).await
    }

    // Serialization
    pub async fn serialize_customer(&self, id: i64, options: &SerializeOptions) -> Result<Value> {
        self.serialize(EntityKind::Customer, id, options).await
    }

    pub async fn serialize_item(&self, id: i64, options: &SerializeOptions) -> Result<Value> {
        self.serialize(EntityKind::Item, id, options).await
    }

    pub async fn serialize_review(&self, id: i64, options: &SerializeOptions) -> Result<Value> {
        self.serialize(EntityKind::Review, id, options).await
    }

    async fn serialize(&self, kind: EntityKind, id: i64, options: &SerializeOptions) -> Result<Value> {
        let graph = Graph::load(self.store.as_ref(), kind, id, options).await?;
        let root = graph
            .get(kind, id)
            .ok_or_else(|| RatingError::not_found(kind, id))?;
        Serializer::new(&graph, options).serialize(root)
    }
}
