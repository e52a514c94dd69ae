//! Review types
//!
//! A review is the join row between one customer and one item.

use serde::{Deserialize, Serialize};

/// A customer's review of an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub comment: String,
    pub customer_id: i64,
    pub item_id: i64,
}

impl Review {
    pub fn new(id: i64, comment: impl Into<String>, customer_id: i64, item_id: i64) -> Self {
        Self {
            id,
            comment: comment.into(),
            customer_id,
            item_id,
        }
    }
}

impl std::fmt::Display for Review {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "<Review {}, Customer {}, Item {}>",
            self.id, self.customer_id, self.item_id
        )
    }
}

/// Review creation request; both owners must already exist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReview {
    pub comment: String,
    pub customer_id: i64,
    pub item_id: i64,
}
