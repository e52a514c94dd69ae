//! Loaded record graphs
//!
//! A [`Graph`] holds the rows reachable from one root under a set of
//! [`SerializeOptions`]. Loading follows exactly the hops the serializer will
//! take, so serialization itself never touches the store.

use crate::error::{RatingError, Result};
use crate::ports::RatingStore;
use crate::relations::{relationship, Link, Relationship};
use crate::serialize::{SerializeOptions, TraversalPath};
use rating_types::{EntityKind, Record};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Default)]
pub struct Graph {
    rows: BTreeMap<EntityKind, BTreeMap<i64, Record>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: Record) {
        self.rows
            .entry(record.kind())
            .or_default()
            .insert(record.id(), record);
    }

    pub fn get(&self, kind: EntityKind, id: i64) -> Option<&Record> {
        self.rows.get(&kind).and_then(|rows| rows.get(&id))
    }

    /// Rows of one kind, ordered by id
    pub fn rows(&self, kind: EntityKind) -> impl Iterator<Item = &Record> {
        self.rows.get(&kind).into_iter().flat_map(|rows| rows.values())
    }

    pub fn len(&self) -> usize {
        self.rows.values().map(|rows| rows.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rows reached from `record` through `rel`, among the rows loaded
    pub fn related(&self, record: &Record, rel: &Relationship) -> Vec<&Record> {
        match &rel.link {
            Link::References(fk) => fk
                .value_in(record)
                .and_then(|id| self.get(rel.target, id))
                .into_iter()
                .collect(),
            Link::Referenced(fk) => self
                .rows(rel.target)
                .filter(|row| fk.value_in(row) == Some(record.id()))
                .collect(),
            Link::Proxy { through, attr } => {
                let Some(first) = relationship(record.kind(), through) else {
                    return Vec::new();
                };
                let Some(second) = relationship(first.target, attr) else {
                    return Vec::new();
                };
                self.related(record, first)
                    .into_iter()
                    .flat_map(|mid| self.related(mid, second))
                    .collect()
            }
        }
    }

    /// Load `kind`/`id` and everything the serializer will visit from it
    pub async fn load<S>(
        store: &S,
        kind: EntityKind,
        id: i64,
        options: &SerializeOptions,
    ) -> Result<Self>
    where
        S: RatingStore + ?Sized,
    {
        let root = fetch_record(store, kind, id)
            .await?
            .ok_or_else(|| RatingError::not_found(kind, id))?;

        let mut graph = Graph::new();
        let mut pending = vec![(root.clone(), TraversalPath::root(kind))];
        graph.insert(root);

        while let Some((record, path)) = pending.pop() {
            for rel in options.hops(record.kind(), &path) {
                let targets = match &rel.link {
                    Link::Proxy { through, attr } => {
                        let (first, second) = proxy_hops(record.kind(), through, attr)?;
                        let mids = fetch_direct(store, &record, first).await?;
                        let mut targets = Vec::new();
                        for mid in mids {
                            targets.extend(fetch_direct(store, &mid, second).await?);
                            graph.insert(mid);
                        }
                        targets
                    }
                    _ => fetch_direct(store, &record, rel).await?,
                };

                let child_path = path.child(rel);
                for target in targets {
                    graph.insert(target.clone());
                    pending.push((target, child_path.clone()));
                }
            }
        }

        debug!("Loaded {} row(s) around {} {}", graph.len(), kind, id);
        Ok(graph)
    }
}

fn proxy_hops(
    owner: EntityKind,
    through: &str,
    attr: &str,
) -> Result<(&'static Relationship, &'static Relationship)> {
    let first = relationship(owner, through).ok_or_else(|| {
        RatingError::Config(format!("{} has no relationship {}", owner, through))
    })?;
    let second = relationship(first.target, attr).ok_or_else(|| {
        RatingError::Config(format!("{} has no relationship {}", first.target, attr))
    })?;
    Ok((first, second))
}

/// Fetch one row of any kind
pub async fn fetch_record<S>(store: &S, kind: EntityKind, id: i64) -> Result<Option<Record>>
where
    S: RatingStore + ?Sized,
{
    Ok(match kind {
        EntityKind::Customer => store.get_customer(id).await?.map(Record::from),
        EntityKind::Item => store.get_item(id).await?.map(Record::from),
        EntityKind::Review => store.get_review(id).await?.map(Record::from),
    })
}

/// Rows reached from `record` through `rel`, queried from the store
pub async fn fetch_related<S>(store: &S, record: &Record, rel: &Relationship) -> Result<Vec<Record>>
where
    S: RatingStore + ?Sized,
{
    match &rel.link {
        Link::Proxy { through, attr } => {
            let (first, second) = proxy_hops(record.kind(), through, attr)?;
            let mut targets = Vec::new();
            for mid in fetch_direct(store, record, first).await? {
                targets.extend(fetch_direct(store, &mid, second).await?);
            }
            Ok(targets)
        }
        _ => fetch_direct(store, record, rel).await,
    }
}

/// Follow one stored foreign-key hop
async fn fetch_direct<S>(store: &S, record: &Record, rel: &Relationship) -> Result<Vec<Record>>
where
    S: RatingStore + ?Sized,
{
    match &rel.link {
        Link::References(fk) => {
            let Some(id) = fk.value_in(record) else {
                return Ok(Vec::new());
            };
            let target = fetch_record(store, rel.target, id).await?.ok_or_else(|| {
                RatingError::ReferentialIntegrity(format!(
                    "{}.{} = {} has no matching {}",
                    fk.table,
                    fk.column,
                    id,
                    fk.referred_table()
                ))
            })?;
            Ok(vec![target])
        }
        Link::Referenced(fk) => {
            let rows = match (rel.target, fk.referred) {
                (EntityKind::Review, EntityKind::Customer) => {
                    store.list_reviews_by_customer(record.id()).await?
                }
                (EntityKind::Review, EntityKind::Item) => {
                    store.list_reviews_by_item(record.id()).await?
                }
                (target, referred) => {
                    return Err(RatingError::Config(format!(
                        "no query for {} rows referencing {}",
                        target, referred
                    )))
                }
            };
            Ok(rows.into_iter().map(Record::from).collect())
        }
        Link::Proxy { .. } => Err(RatingError::Config(format!(
            "{}.{} is derived and cannot be queried directly",
            rel.owner, rel.name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::ports::{CustomerStore, ItemStore, ReviewStore};
    use rating_types::{Customer, Item, Review};

    async fn store() -> Result<MemoryStore> {
        let store = MemoryStore::default();
        store.insert_customer(&Customer::new(1, "Ana")).await?;
        store.insert_customer(&Customer::new(2, "Bob")).await?;
        store.insert_item(&Item::new(1, "Widget", 9.99)).await?;
        store.insert_item(&Item::new(2, "Gadget", 20.0)).await?;
        store.insert_review(&Review::new(1, "Great", 1, 1)).await?;
        store.insert_review(&Review::new(2, "Again", 1, 1)).await?;
        store.insert_review(&Review::new(3, "Fine", 2, 2)).await?;
        Ok(store)
    }

    #[tokio::test]
    async fn test_load_only_reachable_rows() -> Result<()> {
        let store = store().await?;
        let graph = Graph::load(&store, EntityKind::Customer, 1, &SerializeOptions::default()).await?;

        assert!(graph.get(EntityKind::Customer, 1).is_some());
        assert!(graph.get(EntityKind::Customer, 2).is_none());
        assert_eq!(graph.rows(EntityKind::Review).count(), 2);
        assert_eq!(graph.rows(EntityKind::Item).count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_load_missing_root() -> Result<()> {
        let store = store().await?;
        let result = Graph::load(&store, EntityKind::Item, 99, &SerializeOptions::default()).await;
        assert!(matches!(
            result,
            Err(RatingError::NotFound { entity: EntityKind::Item, id: 99 })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_proxy_keeps_one_entry_per_review() -> Result<()> {
        let store = store().await?;
        let ana = Record::from(Customer::new(1, "Ana"));
        let items = relationship(EntityKind::Customer, "items").unwrap();

        let fetched = fetch_related(&store, &ana, items).await?;
        assert_eq!(fetched.len(), 2);
        assert!(fetched.iter().all(|r| r.id() == 1));

        let graph =
            Graph::load(&store, EntityKind::Customer, 1, &SerializeOptions::default().with_derived())
                .await?;
        let root = graph.get(EntityKind::Customer, 1).unwrap();
        assert_eq!(graph.related(root, items).len(), 2);
        Ok(())
    }
}
