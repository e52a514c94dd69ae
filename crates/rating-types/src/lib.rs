//! Rating Types - Pure record definitions
//!
//! Plain data for customers, items and the reviews joining them. No storage,
//! no async runtime.

pub mod customer;
pub mod item;
pub mod review;

pub use customer::*;
pub use item::*;
pub use review::*;

use serde::{Deserialize, Serialize};

/// The three record kinds of the rating schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Customer,
    Item,
    Review,
}

impl EntityKind {
    /// Name of the backing table
    pub fn table_name(&self) -> &'static str {
        match self {
            EntityKind::Customer => "customers",
            EntityKind::Item => "items",
            EntityKind::Review => "reviews",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Customer => write!(f, "Customer"),
            EntityKind::Item => write!(f, "Item"),
            EntityKind::Review => write!(f, "Review"),
        }
    }
}

/// Any stored row, tagged with its kind
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Customer(Customer),
    Item(Item),
    Review(Review),
}

impl Record {
    pub fn kind(&self) -> EntityKind {
        match self {
            Record::Customer(_) => EntityKind::Customer,
            Record::Item(_) => EntityKind::Item,
            Record::Review(_) => EntityKind::Review,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Record::Customer(c) => c.id,
            Record::Item(i) => i.id,
            Record::Review(r) => r.id,
        }
    }

    pub fn into_customer(self) -> Option<Customer> {
        match self {
            Record::Customer(c) => Some(c),
            _ => None,
        }
    }

    pub fn into_item(self) -> Option<Item> {
        match self {
            Record::Item(i) => Some(i),
            _ => None,
        }
    }

    pub fn into_review(self) -> Option<Review> {
        match self {
            Record::Review(r) => Some(r),
            _ => None,
        }
    }

    /// Scalar columns as a JSON value, in declared column order
    pub fn columns(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            Record::Customer(c) => serde_json::to_value(c),
            Record::Item(i) => serde_json::to_value(i),
            Record::Review(r) => serde_json::to_value(r),
        }
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Record::Customer(c) => std::fmt::Display::fmt(c, f),
            Record::Item(i) => std::fmt::Display::fmt(i, f),
            Record::Review(r) => std::fmt::Display::fmt(r, f),
        }
    }
}

impl From<Customer> for Record {
    fn from(c: Customer) -> Self {
        Record::Customer(c)
    }
}

impl From<Item> for Record {
    fn from(i: Item) -> Self {
        Record::Item(i)
    }
}

impl From<Review> for Record {
    fn from(r: Review) -> Self {
        Record::Review(r)
    }
}
