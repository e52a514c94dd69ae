//! SQLite database layer (embedded, no external dependencies)

use anyhow::Context;
use async_trait::async_trait;
use rating_core::schema::{ForeignKey, NamingConvention, FK_REVIEW_CUSTOMER, FK_REVIEW_ITEM};
use rating_core::{
    Customer, CustomerStore, DeletePolicy, EntityKind, Item, ItemStore, NewCustomer, NewItem,
    NewReview, RatingError, Result, Review, ReviewStore, StoreConfig,
};
use sqlx::error::ErrorKind;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::sync::Arc;

pub struct Database {
    pool: Arc<SqlitePool>,
    delete_policy: DeletePolicy,
}

impl Database {
    pub async fn new(config: &StoreConfig) -> anyhow::Result<Self> {
        let database_path = config.database_path.as_str();
        tracing::info!("Opening SQLite database at: {}", database_path);

        // Create parent directory if needed
        if let Some(parent) = std::path::Path::new(database_path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.with_context(|| {
                    format!("Failed to create database directory: {}", parent.display())
                })?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .with_context(|| {
                format!("Failed to connect to SQLite database at: {}", database_path)
            })?;

        let db = Self::with_pool(pool, config.delete_policy)
            .await
            .context("Failed to run database migrations")?;

        tracing::info!(
            "Database initialization complete (delete policy: {})",
            config.delete_policy
        );
        Ok(db)
    }

    /// Private in-memory database; one connection keeps it alive
    #[cfg(test)]
    pub async fn in_memory(delete_policy: DeletePolicy) -> Result<Self> {
        let options = <SqliteConnectOptions as std::str::FromStr>::from_str("sqlite::memory:")
            .map_err(db_error)?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(db_error)?;

        Self::with_pool(pool, delete_policy).await
    }

    async fn with_pool(pool: SqlitePool, delete_policy: DeletePolicy) -> Result<Self> {
        Self::run_migrations(&pool).await?;
        Ok(Self {
            pool: Arc::new(pool),
            delete_policy,
        })
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<()> {
        // Tables come from the shared schema metadata, in dependency order
        for statement in NamingConvention::default().create_statements() {
            sqlx::query(&statement)
                .execute(pool)
                .await
                .map_err(db_error)?;
        }
        Ok(())
    }

    pub fn delete_policy(&self) -> DeletePolicy {
        self.delete_policy
    }

    /// Delete a customer or item, applying the delete policy to its reviews
    async fn delete_owner(&self, kind: EntityKind, fk: &ForeignKey, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let reviews: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {} WHERE {} = ?1",
            fk.table, fk.column
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        if reviews > 0 {
            let message = self.delete_policy.describe(kind, id, reviews as usize);
            match self.delete_policy {
                DeletePolicy::Restrict => tracing::warn!("{}", message),
                DeletePolicy::Cascade => {
                    tracing::debug!("{}", message);
                    sqlx::query(&format!("DELETE FROM {} WHERE {} = ?1", fk.table, fk.column))
                        .bind(id)
                        .execute(&mut *tx)
                        .await
                        .map_err(db_error)?;
                }
            }
        }

        // Under restrict the foreign key itself refuses the delete
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = ?1", kind.table_name()))
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(RatingError::not_found(kind, id));
        }

        tx.commit().await.map_err(db_error)?;
        Ok(())
    }
}

/// Map sqlx errors onto the rating error taxonomy
fn db_error(e: sqlx::Error) -> RatingError {
    match &e {
        sqlx::Error::Database(db) => match db.kind() {
            ErrorKind::ForeignKeyViolation => {
                RatingError::ReferentialIntegrity(db.message().to_string())
            }
            ErrorKind::UniqueViolation | ErrorKind::NotNullViolation | ErrorKind::CheckViolation => {
                RatingError::ConstraintViolation(db.message().to_string())
            }
            _ if db.message().starts_with("FOREIGN KEY constraint failed") => {
                RatingError::ReferentialIntegrity(db.message().to_string())
            }
            _ if db.message().starts_with("UNIQUE constraint failed") => {
                RatingError::ConstraintViolation(db.message().to_string())
            }
            _ => RatingError::Database(e.to_string()),
        },
        _ => RatingError::Database(e.to_string()),
    }
}

fn affected(rows: u64, kind: EntityKind, id: i64) -> Result<()> {
    if rows == 0 {
        Err(RatingError::not_found(kind, id))
    } else {
        Ok(())
    }
}

#[async_trait]
impl CustomerStore for Database {
    async fn create_customer(&self, customer: &NewCustomer) -> Result<Customer> {
        let result = sqlx::query(
            r#"
            INSERT INTO customers (name) VALUES (?1)
            "#,
        )
        .bind(&customer.name)
        .execute(&*self.pool)
        .await
        .map_err(db_error)?;

        Ok(Customer::new(result.last_insert_rowid(), customer.name.clone()))
    }

    async fn insert_customer(&self, customer: &Customer) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO customers (id, name) VALUES (?1, ?2)
            "#,
        )
        .bind(customer.id)
        .bind(&customer.name)
        .execute(&*self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn get_customer(&self, id: i64) -> Result<Option<Customer>> {
        let row: Option<CustomerRow> = sqlx::query_as(
            r#"
            SELECT id, name FROM customers WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(|r| r.into()))
    }

    async fn list_customers(&self) -> Result<Vec<Customer>> {
        let rows: Vec<CustomerRow> = sqlx::query_as(
            r#"
            SELECT id, name FROM customers ORDER BY id
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn update_customer(&self, customer: &Customer) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE customers SET name = ?1 WHERE id = ?2
            "#,
        )
        .bind(&customer.name)
        .bind(customer.id)
        .execute(&*self.pool)
        .await
        .map_err(db_error)?;

        affected(result.rows_affected(), EntityKind::Customer, customer.id)
    }

    async fn delete_customer(&self, id: i64) -> Result<()> {
        self.delete_owner(EntityKind::Customer, &FK_REVIEW_CUSTOMER, id)
            .await
    }
}

#[async_trait]
impl ItemStore for Database {
    async fn create_item(&self, item: &NewItem) -> Result<Item> {
        let result = sqlx::query(
            r#"
            INSERT INTO items (name, price) VALUES (?1, ?2)
            "#,
        )
        .bind(&item.name)
        .bind(item.price)
        .execute(&*self.pool)
        .await
        .map_err(db_error)?;

        Ok(Item::new(result.last_insert_rowid(), item.name.clone(), item.price))
    }

    async fn insert_item(&self, item: &Item) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO items (id, name, price) VALUES (?1, ?2, ?3)
            "#,
        )
        .bind(item.id)
        .bind(&item.name)
        .bind(item.price)
        .execute(&*self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn get_item(&self, id: i64) -> Result<Option<Item>> {
        let row: Option<ItemRow> = sqlx::query_as(
            r#"
            SELECT id, name, price FROM items WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(|r| r.into()))
    }

    async fn list_items(&self) -> Result<Vec<Item>> {
        let rows: Vec<ItemRow> = sqlx::query_as(
            r#"
            SELECT id, name, price FROM items ORDER BY id
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn update_item(&self, item: &Item) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE items SET name = ?1, price = ?2 WHERE id = ?3
            "#,
        )
        .bind(&item.name)
        .bind(item.price)
        .bind(item.id)
        .execute(&*self.pool)
        .await
        .map_err(db_error)?;

        affected(result.rows_affected(), EntityKind::Item, item.id)
    }

    async fn delete_item(&self, id: i64) -> Result<()> {
        self.delete_owner(EntityKind::Item, &FK_REVIEW_ITEM, id).await
    }
}

#[async_trait]
impl ReviewStore for Database {
    async fn create_review(&self, review: &NewReview) -> Result<Review> {
        let result = sqlx::query(
            r#"
            INSERT INTO reviews (comment, customer_id, item_id) VALUES (?1, ?2, ?3)
            "#,
        )
        .bind(&review.comment)
        .bind(review.customer_id)
        .bind(review.item_id)
        .execute(&*self.pool)
        .await
        .map_err(db_error)?;

        Ok(Review::new(
            result.last_insert_rowid(),
            review.comment.clone(),
            review.customer_id,
            review.item_id,
        ))
    }

    async fn insert_review(&self, review: &Review) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reviews (id, comment, customer_id, item_id) VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(review.id)
        .bind(&review.comment)
        .bind(review.customer_id)
        .bind(review.item_id)
        .execute(&*self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn get_review(&self, id: i64) -> Result<Option<Review>> {
        let row: Option<ReviewRow> = sqlx::query_as(
            r#"
            SELECT id, comment, customer_id, item_id FROM reviews WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(|r| r.into()))
    }

    async fn list_reviews(&self) -> Result<Vec<Review>> {
        let rows: Vec<ReviewRow> = sqlx::query_as(
            r#"
            SELECT id, comment, customer_id, item_id FROM reviews ORDER BY id
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn list_reviews_by_customer(&self, customer_id: i64) -> Result<Vec<Review>> {
        let rows: Vec<ReviewRow> = sqlx::query_as(
            r#"
            SELECT id, comment, customer_id, item_id FROM reviews
            WHERE customer_id = ?1
            ORDER BY id
            "#,
        )
        .bind(customer_id)
        .fetch_all(&*self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn list_reviews_by_item(&self, item_id: i64) -> Result<Vec<Review>> {
        let rows: Vec<ReviewRow> = sqlx::query_as(
            r#"
            SELECT id, comment, customer_id, item_id FROM reviews
            WHERE item_id = ?1
            ORDER BY id
            "#,
        )
        .bind(item_id)
        .fetch_all(&*self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn update_review_comment(&self, id: i64, comment: &str) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE reviews SET comment = ?1 WHERE id = ?2
            "#,
        )
        .bind(comment)
        .bind(id)
        .execute(&*self.pool)
        .await
        .map_err(db_error)?;

        affected(result.rows_affected(), EntityKind::Review, id)
    }

    async fn delete_review(&self, id: i64) -> Result<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM reviews WHERE id = ?1
            "#,
        )
        .bind(id)
        .execute(&*self.pool)
        .await
        .map_err(db_error)?;

        affected(result.rows_affected(), EntityKind::Review, id)
    }
}

// Helper structs for sqlx query_as
#[derive(sqlx::FromRow)]
struct CustomerRow {
    id: i64,
    name: String,
}

impl From<CustomerRow> for Customer {
    fn from(r: CustomerRow) -> Self {
        Customer {
            id: r.id,
            name: r.name,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    id: i64,
    name: String,
    price: f64,
}

impl From<ItemRow> for Item {
    fn from(r: ItemRow) -> Self {
        Item {
            id: r.id,
            name: r.name,
            price: r.price,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: i64,
    comment: String,
    customer_id: i64,
    item_id: i64,
}

impl From<ReviewRow> for Review {
    fn from(r: ReviewRow) -> Self {
        Review {
            id: r.id,
            comment: r.comment,
            customer_id: r.customer_id,
            item_id: r.item_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rating_core::{MemoryStore, RatingService, RatingStore, SerializeOptions, Validator};
    use serde_json::json;

    async fn seeded(policy: DeletePolicy) -> Result<Database> {
        let db = Database::in_memory(policy).await?;
        db.insert_customer(&Customer::new(1, "Ana")).await?;
        db.insert_item(&Item::new(1, "Widget", 9.99)).await?;
        db.insert_review(&Review::new(1, "Great", 1, 1)).await?;
        Ok(db)
    }

    #[tokio::test]
    async fn test_schema_has_named_foreign_keys() -> Result<()> {
        let db = Database::in_memory(DeletePolicy::Restrict).await?;
        let tables: Vec<(String, String)> = sqlx::query_as(
            "SELECT name, sql FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(&*db.pool)
        .await
        .map_err(db_error)?;

        let names: Vec<&str> = tables.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["customers", "items", "reviews"]);

        let reviews_sql = &tables[2].1;
        assert!(reviews_sql.contains("fk_reviews_customer_id_customers"));
        assert!(reviews_sql.contains("fk_reviews_item_id_items"));
        Ok(())
    }

    #[tokio::test]
    async fn test_review_visible_from_both_owners() -> Result<()> {
        let db = seeded(DeletePolicy::Restrict).await?;
        let review = db
            .create_review(&NewReview {
                comment: "Again".to_string(),
                customer_id: 1,
                item_id: 1,
            })
            .await?;
        assert_eq!(review.id, 2);
        assert_eq!(db.list_reviews_by_customer(1).await?.len(), 2);
        assert_eq!(db.list_reviews_by_item(1).await?[1], review);
        Ok(())
    }

    #[tokio::test]
    async fn test_dangling_foreign_key() -> Result<()> {
        let db = seeded(DeletePolicy::Restrict).await?;
        let result = db
            .create_review(&NewReview {
                comment: "Ghost".to_string(),
                customer_id: 1,
                item_id: 404,
            })
            .await;
        assert!(matches!(result, Err(RatingError::ReferentialIntegrity(_))));
        assert_eq!(db.list_reviews().await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_primary_key() -> Result<()> {
        let db = seeded(DeletePolicy::Restrict).await?;
        let result = db.insert_customer(&Customer::new(1, "Imposter")).await;
        assert!(matches!(result, Err(RatingError::ConstraintViolation(_))));
        assert_eq!(db.get_customer(1).await?.map(|c| c.name), Some("Ana".to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn test_restrict_blocks_delete() -> Result<()> {
        let db = seeded(DeletePolicy::Restrict).await?;
        let result = db.delete_item(1).await;
        assert!(matches!(result, Err(RatingError::ReferentialIntegrity(_))));
        assert!(db.get_item(1).await?.is_some());
        assert!(db.get_review(1).await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_cascade_removes_reviews() -> Result<()> {
        let db = seeded(DeletePolicy::Cascade).await?;
        db.delete_item(1).await?;
        assert!(db.get_item(1).await?.is_none());
        assert!(db.list_reviews().await?.is_empty());
        assert!(db.get_customer(1).await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_rows() -> Result<()> {
        let db = Database::in_memory(DeletePolicy::Cascade).await?;
        assert!(db.get_item(1).await?.is_none());
        assert!(matches!(
            db.delete_customer(1).await,
            Err(RatingError::NotFound { entity: EntityKind::Customer, id: 1 })
        ));
        assert!(matches!(
            db.update_review_comment(1, "x").await,
            Err(RatingError::NotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_service_over_sqlite() -> Result<()> {
        let db = Arc::new(seeded(DeletePolicy::Restrict).await?);
        let svc = RatingService::new(db, Validator::default());

        let value = svc.serialize_item(1, &SerializeOptions::default()).await?;
        assert_eq!(
            value,
            json!({
                "id": 1,
                "name": "Widget",
                "price": 9.99,
                "reviews": [{
                    "id": 1,
                    "comment": "Great",
                    "customer_id": 1,
                    "item_id": 1,
                    "customer": {"id": 1, "name": "Ana"}
                }]
            })
        );

        let customers = svc.customers_for_item(1).await?;
        assert_eq!(customers, vec![Customer::new(1, "Ana")]);
        Ok(())
    }

    #[tokio::test]
    async fn test_nan_price_rejected_by_both_stores() -> Result<()> {
        let stores: Vec<Arc<dyn RatingStore>> = vec![
            Arc::new(MemoryStore::default()),
            Arc::new(Database::in_memory(DeletePolicy::Restrict).await?),
        ];

        for store in stores {
            let svc = RatingService::new(store, Validator::default());
            let result = svc.create_item("Widget", f64::NAN).await;
            assert!(matches!(result, Err(RatingError::ConstraintViolation(_))));

            let item = svc.create_item("Widget", 9.99).await?;
            let result = svc.update_item(&Item::new(item.id, "Widget", f64::NAN)).await;
            assert!(matches!(result, Err(RatingError::ConstraintViolation(_))));
            assert_eq!(svc.get_item(item.id).await?.price, 9.99);

            // Permissive mode still takes a negative price
            assert_eq!(svc.create_item("Refund", -1.0).await?.price, -1.0);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_file_database_persists() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let config = StoreConfig {
            database_path: dir
                .path()
                .join("nested/ratings.db")
                .to_string_lossy()
                .to_string(),
            ..StoreConfig::default()
        };

        {
            let db = Database::new(&config).await?;
            db.create_customer(&NewCustomer {
                name: "Ana".to_string(),
            })
            .await?;
            db.pool.close().await;
        }

        let db = Database::new(&config).await?;
        assert_eq!(db.list_customers().await?, vec![Customer::new(1, "Ana")]);
        Ok(())
    }
}
