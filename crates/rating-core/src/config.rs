//! Store configuration
//!
//! Defaults, then an optional YAML/JSON file, then `RATINGS_*` environment
//! variables.

use crate::error::{RatingError, Result};
use crate::validation::ValidationMode;
use rating_types::EntityKind;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// What happens to reviews when their customer or item is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletePolicy {
    /// Refuse with a referential integrity error while reviews remain
    #[default]
    Restrict,
    /// Delete the dependent reviews in the same transaction
    Cascade,
}

impl std::fmt::Display for DeletePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeletePolicy::Restrict => write!(f, "restrict"),
            DeletePolicy::Cascade => write!(f, "cascade"),
        }
    }
}

impl DeletePolicy {
    /// Message for a delete that meets `reviews` dependent reviews
    pub fn describe(&self, entity: EntityKind, id: i64, reviews: usize) -> String {
        match self {
            DeletePolicy::Restrict => format!(
                "{} {} is still referenced by {} review(s)",
                entity, id, reviews
            ),
            DeletePolicy::Cascade => format!(
                "deleting {} {} cascades to {} review(s)",
                entity, id, reviews
            ),
        }
    }
}

impl FromStr for DeletePolicy {
    type Err = RatingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "restrict" => Ok(DeletePolicy::Restrict),
            "cascade" => Ok(DeletePolicy::Cascade),
            other => Err(RatingError::Config(format!("unknown delete policy: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub database_path: String,
    pub max_connections: u32,
    pub delete_policy: DeletePolicy,
    pub validation: ValidationMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: "ratings.db".to_string(),
            max_connections: 5,
            delete_policy: DeletePolicy::Restrict,
            validation: ValidationMode::Permissive,
        }
    }
}

impl StoreConfig {
    /// Defaults overridden by the process environment
    pub fn from_env() -> Result<Self> {
        Self::default().with_env(|key| std::env::var(key).ok())
    }

    /// Load from a YAML or JSON file (by extension)
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = if path.extension().map(|e| e == "json").unwrap_or(false) {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };
        Ok(config)
    }

    /// Apply `RATINGS_*` overrides read through `lookup`
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("RATINGS_DATABASE_PATH") {
            self.database_path = path;
        }
        if let Some(max) = lookup("RATINGS_MAX_CONNECTIONS") {
            self.max_connections = max.parse().map_err(|_| {
                RatingError::Config(format!("invalid RATINGS_MAX_CONNECTIONS: {}", max))
            })?;
        }
        if let Some(policy) = lookup("RATINGS_DELETE_POLICY") {
            self.delete_policy = policy.parse()?;
        }
        if let Some(mode) = lookup("RATINGS_VALIDATION") {
            self.validation = mode.parse()?;
        }
        if self.max_connections == 0 {
            return Err(RatingError::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }
        Ok(self)
    }
}
