//! In-memory store
//!
//! Keeps the three tables behind a single lock so every operation, including
//! a cascading delete, is applied atomically. Integrity rules match the SQLite
//! adapter: unique ids, review foreign keys checked on write, a price that is
//! never NaN (SQLite stores NaN as NULL), and the configured [`DeletePolicy`]
//! for owners that still have reviews.

use crate::config::DeletePolicy;
use crate::error::{RatingError, Result};
use crate::ports::{CustomerStore, ItemStore, ReviewStore};
use async_trait::async_trait;
use rating_types::{Customer, EntityKind, Item, NewCustomer, NewItem, NewReview, Review};
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::{debug, warn};

pub struct MemoryStore {
    tables: RwLock<Tables>,
    delete_policy: DeletePolicy,
}

#[derive(Default)]
struct Tables {
    customers: BTreeMap<i64, Customer>,
    items: BTreeMap<i64, Item>,
    reviews: BTreeMap<i64, Review>,
}

/// Next surrogate key: one past the largest id in use
fn next_id<T>(kind: EntityKind, rows: &BTreeMap<i64, T>) -> Result<i64> {
    match rows.keys().next_back() {
        None => Ok(1),
        Some(last) => last.checked_add(1).ok_or_else(|| {
            RatingError::ConstraintViolation(format!(
                "no id left after {}.id = {}",
                kind.table_name(),
                last
            ))
        }),
    }
}

fn check_price(price: f64) -> Result<()> {
    if price.is_nan() {
        return Err(RatingError::ConstraintViolation(
            "NOT NULL constraint failed: items.price".to_string(),
        ));
    }
    Ok(())
}

fn duplicate(kind: EntityKind, id: i64) -> RatingError {
    RatingError::ConstraintViolation(format!("duplicate primary key {}.id = {}", kind.table_name(), id))
}

impl Tables {
    fn check_review_owners(&self, customer_id: i64, item_id: i64) -> Result<()> {
        if !self.customers.contains_key(&customer_id) {
            return Err(RatingError::ReferentialIntegrity(format!(
                "reviews.customer_id = {} does not reference an existing customer",
                customer_id
            )));
        }
        if !self.items.contains_key(&item_id) {
            return Err(RatingError::ReferentialIntegrity(format!(
                "reviews.item_id = {} does not reference an existing item",
                item_id
            )));
        }
        Ok(())
    }

    /// Apply the delete policy to the reviews matching `owned`
    fn release_reviews<F>(
        &mut self,
        policy: DeletePolicy,
        kind: EntityKind,
        id: i64,
        owned: F,
    ) -> Result<()>
    where
        F: Fn(&Review) -> bool,
    {
        let dependent: Vec<i64> = self
            .reviews
            .values()
            .filter(|r| owned(r))
            .map(|r| r.id)
            .collect();

        if dependent.is_empty() {
            return Ok(());
        }

        let message = policy.describe(kind, id, dependent.len());
        match policy {
            DeletePolicy::Restrict => {
                warn!("{}", message);
                Err(RatingError::ReferentialIntegrity(message))
            }
            DeletePolicy::Cascade => {
                debug!("{}", message);
                for review_id in dependent {
                    self.reviews.remove(&review_id);
                }
                Ok(())
            }
        }
    }
}

impl MemoryStore {
    pub fn new(delete_policy: DeletePolicy) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            delete_policy,
        }
    }

    pub fn delete_policy(&self) -> DeletePolicy {
        self.delete_policy
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DeletePolicy::default())
    }
}

#[async_trait]
impl CustomerStore for MemoryStore {
    async fn create_customer(&self, customer: &NewCustomer) -> Result<Customer> {
        let mut tables = self.tables.write().await;
        let id = next_id(EntityKind::Customer, &tables.customers)?;
        let row = Customer::new(id, customer.name.clone());
        tables.customers.insert(id, row.clone());
        Ok(row)
    }

    async fn insert_customer(&self, customer: &Customer) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.customers.contains_key(&customer.id) {
            return Err(duplicate(EntityKind::Customer, customer.id));
        }
        tables.customers.insert(customer.id, customer.clone());
        Ok(())
    }

    async fn get_customer(&self, id: i64) -> Result<Option<Customer>> {
        Ok(self.tables.read().await.customers.get(&id).cloned())
    }

    async fn list_customers(&self) -> Result<Vec<Customer>> {
        Ok(self.tables.read().await.customers.values().cloned().collect())
    }

    async fn update_customer(&self, customer: &Customer) -> Result<()> {
        let mut tables = self.tables.write().await;
        match tables.customers.get_mut(&customer.id) {
            Some(row) => {
                *row = customer.clone();
                Ok(())
            }
            None => Err(RatingError::not_found(EntityKind::Customer, customer.id)),
        }
    }

    async fn delete_customer(&self, id: i64) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.customers.contains_key(&id) {
            return Err(RatingError::not_found(EntityKind::Customer, id));
        }
        tables.release_reviews(self.delete_policy, EntityKind::Customer, id, |r| {
            r.customer_id == id
        })?;
        tables.customers.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn create_item(&self, item: &NewItem) -> Result<Item> {
        check_price(item.price)?;
        let mut tables = self.tables.write().await;
        let id = next_id(EntityKind::Item, &tables.items)?;
        let row = Item::new(id, item.name.clone(), item.price);
        tables.items.insert(id, row.clone());
        Ok(row)
    }

    async fn insert_item(&self, item: &Item) -> Result<()> {
        check_price(item.price)?;
        let mut tables = self.tables.write().await;
        if tables.items.contains_key(&item.id) {
            return Err(duplicate(EntityKind::Item, item.id));
        }
        tables.items.insert(item.id, item.clone());
        Ok(())
    }

    async fn get_item(&self, id: i64) -> Result<Option<Item>> {
        Ok(self.tables.read().await.items.get(&id).cloned())
    }

    async fn list_items(&self) -> Result<Vec<Item>> {
        Ok(self.tables.read().await.items.values().cloned().collect())
    }

    async fn update_item(&self, item: &Item) -> Result<()> {
        check_price(item.price)?;
        let mut tables = self.tables.write().await;
        match tables.items.get_mut(&item.id) {
            Some(row) => {
                *row = item.clone();
                Ok(())
            }
            None => Err(RatingError::not_found(EntityKind::Item, item.id)),
        }
    }

    async fn delete_item(&self, id: i64) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.items.contains_key(&id) {
            return Err(RatingError::not_found(EntityKind::Item, id));
        }
        tables.release_reviews(self.delete_policy, EntityKind::Item, id, |r| r.item_id == id)?;
        tables.items.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn create_review(&self, review: &NewReview) -> Result<Review> {
        let mut tables = self.tables.write().await;
        tables.check_review_owners(review.customer_id, review.item_id)?;
        let id = next_id(EntityKind::Review, &tables.reviews)?;
        let row = Review::new(id, review.comment.clone(), review.customer_id, review.item_id);
        tables.reviews.insert(id, row.clone());
        Ok(row)
    }

    async fn insert_review(&self, review: &Review) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.reviews.contains_key(&review.id) {
            return Err(duplicate(EntityKind::Review, review.id));
        }
        tables.check_review_owners(review.customer_id, review.item_id)?;
        tables.reviews.insert(review.id, review.clone());
        Ok(())
    }

    async fn get_review(&self, id: i64) -> Result<Option<Review>> {
        Ok(self.tables.read().await.reviews.get(&id).cloned())
    }

    async fn list_reviews(&self) -> Result<Vec<Review>> {
        Ok(self.tables.read().await.reviews.values().cloned().collect())
    }

    async fn list_reviews_by_customer(&self, customer_id: i64) -> Result<Vec<Review>> {
        let tables = self.tables.read().await;
        Ok(tables
            .reviews
            .values()
            .filter(|r| r.customer_id == customer_id)
            .cloned()
            .collect())
    }

    async fn list_reviews_by_item(&self, item_id: i64) -> Result<Vec<Review>> {
        let tables = self.tables.read().await;
        Ok(tables
            .reviews
            .values()
            .filter(|r| r.item_id == item_id)
            .cloned()
            .collect())
    }

    async fn update_review_comment(&self, id: i64, comment: &str) -> Result<()> {
        let mut tables = self.tables.write().await;
        match tables.reviews.get_mut(&id) {
            Some(row) => {
                row.comment = comment.to_string();
                Ok(())
            }
            None => Err(RatingError::not_found(EntityKind::Review, id)),
        }
    }

    async fn delete_review(&self, id: i64) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables
            .reviews
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| RatingError::not_found(EntityKind::Review, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded(policy: DeletePolicy) -> Result<MemoryStore> {
        let store = MemoryStore::new(policy);
        store.insert_customer(&Customer::new(1, "Ana")).await?;
        store.insert_item(&Item::new(1, "Widget", 9.99)).await?;
        store.insert_review(&Review::new(1, "Great", 1, 1)).await?;
        Ok(store)
    }

    #[tokio::test]
    async fn test_create_assigns_sequential_ids() -> Result<()> {
        let store = seeded(DeletePolicy::Restrict).await?;
        let bob = store
            .create_customer(&NewCustomer {
                name: "Bob".to_string(),
            })
            .await?;
        assert_eq!(bob.id, 2);

        let review = store
            .create_review(&NewReview {
                comment: "Meh".to_string(),
                customer_id: bob.id,
                item_id: 1,
            })
            .await?;
        assert_eq!(review.id, 2);
        assert_eq!(store.list_reviews_by_item(1).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_dangling_review_is_rejected() -> Result<()> {
        let store = seeded(DeletePolicy::Restrict).await?;
        let result = store
            .create_review(&NewReview {
                comment: "?".to_string(),
                customer_id: 42,
                item_id: 1,
            })
            .await;
        assert!(matches!(result, Err(RatingError::ReferentialIntegrity(_))));

        let result = store.insert_review(&Review::new(9, "?", 1, 42)).await;
        assert!(matches!(result, Err(RatingError::ReferentialIntegrity(_))));
        assert_eq!(store.list_reviews().await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_primary_key() -> Result<()> {
        let store = seeded(DeletePolicy::Restrict).await?;
        let result = store.insert_item(&Item::new(1, "Other", 1.0)).await;
        assert!(matches!(result, Err(RatingError::ConstraintViolation(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_restrict_blocks_owner_delete() -> Result<()> {
        let store = seeded(DeletePolicy::Restrict).await?;
        let result = store.delete_item(1).await;
        assert!(matches!(result, Err(RatingError::ReferentialIntegrity(_))));
        assert!(store.get_item(1).await?.is_some());
        assert!(store.get_review(1).await?.is_some());

        store.delete_review(1).await?;
        store.delete_item(1).await?;
        assert!(store.get_item(1).await?.is_none());
        assert!(store.get_customer(1).await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_cascade_removes_dependent_reviews() -> Result<()> {
        let store = seeded(DeletePolicy::Cascade).await?;
        store.delete_customer(1).await?;
        assert!(store.get_customer(1).await?.is_none());
        assert!(store.list_reviews().await?.is_empty());
        assert!(store.get_item(1).await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_rows_are_not_found() -> Result<()> {
        let store = MemoryStore::default();
        assert!(matches!(
            store.delete_review(3).await,
            Err(RatingError::NotFound { entity: EntityKind::Review, id: 3 })
        ));
        assert!(matches!(
            store.update_customer(&Customer::new(5, "x")).await,
            Err(RatingError::NotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_after_largest_id_fails_cleanly() -> Result<()> {
        let store = MemoryStore::default();
        store.insert_customer(&Customer::new(i64::MAX, "Max")).await?;
        let result = store
            .create_customer(&NewCustomer {
                name: "Next".to_string(),
            })
            .await;
        assert!(matches!(result, Err(RatingError::ConstraintViolation(_))));
        assert_eq!(store.list_customers().await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_nan_price_is_rejected() -> Result<()> {
        let store = seeded(DeletePolicy::Restrict).await?;
        let result = store
            .create_item(&NewItem {
                name: "Widget".to_string(),
                price: f64::NAN,
            })
            .await;
        assert!(matches!(result, Err(RatingError::ConstraintViolation(_))));

        let result = store.update_item(&Item::new(1, "Widget", f64::NAN)).await;
        assert!(matches!(result, Err(RatingError::ConstraintViolation(_))));
        assert_eq!(store.get_item(1).await?.map(|i| i.price), Some(9.99));

        // Negative and infinite prices are left to strict validation
        store.insert_item(&Item::new(2, "Refund", -1.0)).await?;
        store.insert_item(&Item::new(3, "Priceless", f64::INFINITY)).await?;
        Ok(())
    }
}
