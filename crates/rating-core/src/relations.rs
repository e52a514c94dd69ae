//! Relationship wiring between customers, items and reviews
//!
//! Relationships are plain metadata. Stored relationships follow a foreign
//! key in either direction; derived ones (association proxies) chain two
//! stored hops and are never persisted.

use crate::schema::{ForeignKey, FK_REVIEW_CUSTOMER, FK_REVIEW_ITEM};
use rating_types::EntityKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

#[derive(Debug)]
pub enum Link {
    /// Rows of the target whose foreign key points at the owner
    Referenced(&'static ForeignKey),
    /// The row the owner's foreign key points at
    References(&'static ForeignKey),
    /// Follow `through` on the owner, then `attr` on every row reached
    Proxy {
        through: &'static str,
        attr: &'static str,
    },
}

#[derive(Debug)]
pub struct Relationship {
    pub owner: EntityKind,
    pub name: &'static str,
    pub target: EntityKind,
    pub cardinality: Cardinality,
    pub back_populates: Option<&'static str>,
    pub link: Link,
}

impl Relationship {
    pub fn is_derived(&self) -> bool {
        matches!(self.link, Link::Proxy { .. })
    }

    /// The relationship on the target pointing back at the owner
    pub fn inverse(&self) -> Option<&'static Relationship> {
        self.back_populates
            .and_then(|name| relationship(self.target, name))
    }
}

pub static RELATIONSHIPS: [Relationship; 6] = [
    Relationship {
        owner: EntityKind::Customer,
        name: "reviews",
        target: EntityKind::Review,
        cardinality: Cardinality::Many,
        back_populates: Some("customer"),
        link: Link::Referenced(&FK_REVIEW_CUSTOMER),
    },
    Relationship {
        owner: EntityKind::Customer,
        name: "items",
        target: EntityKind::Item,
        cardinality: Cardinality::Many,
        back_populates: None,
        link: Link::Proxy {
            through: "reviews",
            attr: "item",
        },
    },
    Relationship {
        owner: EntityKind::Item,
        name: "reviews",
        target: EntityKind::Review,
        cardinality: Cardinality::Many,
        back_populates: Some("item"),
        link: Link::Referenced(&FK_REVIEW_ITEM),
    },
    Relationship {
        owner: EntityKind::Item,
        name: "customers",
        target: EntityKind::Customer,
        cardinality: Cardinality::Many,
        back_populates: None,
        link: Link::Proxy {
            through: "reviews",
            attr: "customer",
        },
    },
    Relationship {
        owner: EntityKind::Review,
        name: "customer",
        target: EntityKind::Customer,
        cardinality: Cardinality::One,
        back_populates: Some("reviews"),
        link: Link::References(&FK_REVIEW_CUSTOMER),
    },
    Relationship {
        owner: EntityKind::Review,
        name: "item",
        target: EntityKind::Item,
        cardinality: Cardinality::One,
        back_populates: Some("reviews"),
        link: Link::References(&FK_REVIEW_ITEM),
    },
];

/// Relationships declared on `kind`, in declaration order
pub fn relationships_of(kind: EntityKind) -> impl Iterator<Item = &'static Relationship> {
    RELATIONSHIPS.iter().filter(move |r| r.owner == kind)
}

pub fn relationship(owner: EntityKind, name: &str) -> Option<&'static Relationship> {
    relationships_of(owner).find(|r| r.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_relationships_are_bidirectional() {
        for rel in RELATIONSHIPS.iter().filter(|r| !r.is_derived()) {
            let inverse = rel.inverse().expect("stored relationship has an inverse");
            assert_eq!(inverse.owner, rel.target);
            assert_eq!(inverse.target, rel.owner);
            assert_eq!(inverse.back_populates, Some(rel.name));
        }
    }

    #[test]
    fn test_proxies_chain_stored_hops() {
        for rel in RELATIONSHIPS.iter().filter(|r| r.is_derived()) {
            let Link::Proxy { through, attr } = rel.link else {
                unreachable!()
            };
            let first = relationship(rel.owner, through).unwrap();
            let second = relationship(first.target, attr).unwrap();
            assert!(!first.is_derived() && !second.is_derived());
            assert_eq!(second.target, rel.target);
        }
    }

    #[test]
    fn test_review_owns_exactly_one_of_each() {
        let rels: Vec<_> = relationships_of(EntityKind::Review).collect();
        assert_eq!(rels.len(), 2);
        assert!(rels.iter().all(|r| r.cardinality == Cardinality::One));
    }
}
