//! JSON serialization with cycle truncation
//!
//! A record serializes to its scalar columns plus one nested value per
//! relationship. Traversal never enters a kind already on the current path,
//! so a customer's reviews carry their item but not their customer, and that
//! item carries neither its reviews nor its customers.

use crate::error::{RatingError, Result};
use crate::graph::Graph;
use crate::relations::{relationships_of, Cardinality, Relationship};
use rating_types::{EntityKind, Record};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializeOptions {
    /// Also emit association proxies (`Customer.items`, `Item.customers`)
    pub include_derived: bool,
    /// Maximum number of relationship hops below the root
    pub max_depth: Option<usize>,
    /// Dotted paths to leave out, e.g. `-reviews.item` or `reviews.comment`
    pub exclude: Vec<String>,
}

impl SerializeOptions {
    pub fn with_derived(mut self) -> Self {
        self.include_derived = true;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn exclude(mut self, rule: impl Into<String>) -> Self {
        self.exclude.push(rule.into());
        self
    }

    fn is_excluded(&self, path: &[&str], field: &str) -> bool {
        self.exclude.iter().any(|rule| {
            let mut parts = rule.trim_start_matches('-').split('.');
            path.iter()
                .chain(std::iter::once(&field))
                .all(|segment| parts.next() == Some(*segment))
                && parts.next().is_none()
        })
    }

    /// Relationships to follow from a `kind` row sitting at `path`
    pub fn hops(&self, kind: EntityKind, path: &TraversalPath) -> Vec<&'static Relationship> {
        if self.max_depth.is_some_and(|max| path.depth() >= max) {
            return Vec::new();
        }
        relationships_of(kind)
            .filter(|rel| self.include_derived || !rel.is_derived())
            .filter(|rel| !path.visits(rel.target))
            .filter(|rel| !self.is_excluded(&path.names, rel.name))
            .collect()
    }
}

/// Kinds and relationship names from the root down to the current row
#[derive(Debug, Clone)]
pub struct TraversalPath {
    kinds: Vec<EntityKind>,
    names: Vec<&'static str>,
}

impl TraversalPath {
    pub fn root(kind: EntityKind) -> Self {
        Self {
            kinds: vec![kind],
            names: Vec::new(),
        }
    }

    pub fn child(&self, rel: &'static Relationship) -> Self {
        let mut next = self.clone();
        next.kinds.push(rel.target);
        next.names.push(rel.name);
        next
    }

    pub fn depth(&self) -> usize {
        self.names.len()
    }

    pub fn visits(&self, kind: EntityKind) -> bool {
        self.kinds.contains(&kind)
    }
}

pub struct Serializer<'a> {
    graph: &'a Graph,
    options: &'a SerializeOptions,
}

impl<'a> Serializer<'a> {
    pub fn new(graph: &'a Graph, options: &'a SerializeOptions) -> Self {
        Self { graph, options }
    }

    pub fn serialize(&self, record: &Record) -> Result<Value> {
        self.serialize_at(record, &TraversalPath::root(record.kind()))
    }

    fn serialize_at(&self, record: &Record, path: &TraversalPath) -> Result<Value> {
        let mut map = columns_only(record)?;
        map.retain(|column, _| !self.options.is_excluded(&path.names, column));

        for rel in self.options.hops(record.kind(), path) {
            let child_path = path.child(rel);
            let related = self.graph.related(record, rel);
            let value = match rel.cardinality {
                Cardinality::Many => Value::Array(
                    related
                        .into_iter()
                        .map(|row| self.serialize_at(row, &child_path))
                        .collect::<Result<Vec<_>>>()?,
                ),
                Cardinality::One => match related.first() {
                    Some(row) => self.serialize_at(row, &child_path)?,
                    None => Value::Null,
                },
            };
            map.insert(rel.name.to_string(), value);
        }

        Ok(Value::Object(map))
    }
}

/// Serialize a single row with no relationships
pub fn columns_only(record: &Record) -> Result<Map<String, Value>> {
    match record.columns()? {
        Value::Object(columns) => Ok(columns),
        other => Err(RatingError::Serialization(format!(
            "{} did not serialize to an object: {}",
            record, other
        ))),
    }
}
