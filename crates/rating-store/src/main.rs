//! Ratings
//!
//! Command-line front end for the customer / item / review store. Opens (and
//! if needed creates) an SQLite database and runs one command against it.

mod commands;
mod storage;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rating_core::{DeletePolicy, StoreConfig, ValidationMode};
use std::path::PathBuf;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ratings")]
#[command(author, version, about = "Customers, items and the reviews between them", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// SQLite database file
    #[arg(short, long, global = true)]
    database: Option<String>,

    /// Configuration file (YAML or JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Delete reviews together with their customer or item
    #[arg(long, global = true)]
    cascade: bool,

    /// Reject blank names and negative prices
    #[arg(long, global = true)]
    strict: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the tables if they do not exist
    Init,

    /// Manage customers
    Customer {
        #[command(subcommand)]
        action: CustomerAction,
    },

    /// Manage items
    Item {
        #[command(subcommand)]
        action: ItemAction,
    },

    /// Manage reviews
    Review {
        #[command(subcommand)]
        action: ReviewAction,
    },
}

#[derive(Subcommand)]
enum CustomerAction {
    /// Add a customer
    Add { name: String },
    /// List customers
    List,
    /// Print a customer as JSON
    Show(ShowArgs),
    /// Rename a customer
    Rename { id: i64, name: String },
    /// Delete a customer
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum ItemAction {
    /// Add an item
    Add { name: String, price: f64 },
    /// List items
    List,
    /// Print an item as JSON
    Show(ShowArgs),
    /// Replace an item's name and price
    Update { id: i64, name: String, price: f64 },
    /// Delete an item
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum ReviewAction {
    /// Add a review of an item by a customer
    Add {
        customer_id: i64,
        item_id: i64,
        comment: String,
    },
    /// List reviews, optionally for one customer or item
    List {
        #[arg(long, conflicts_with = "item")]
        customer: Option<i64>,
        #[arg(long)]
        item: Option<i64>,
    },
    /// Print a review as JSON
    Show(ShowArgs),
    /// Change a review's comment
    Comment { id: i64, comment: String },
    /// Delete a review
    Delete { id: i64 },
}

#[derive(Args)]
struct ShowArgs {
    id: i64,

    /// Include derived views (items of a customer, customers of an item)
    #[arg(long)]
    derived: bool,

    /// Maximum nesting depth
    #[arg(long)]
    depth: Option<usize>,

    /// Extra paths to leave out, e.g. -reviews.item
    #[arg(long, allow_hyphen_values = true)]
    exclude: Vec<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr, leaving stdout for command output
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("rating_core=debug,ratings=debug,info")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli).context("Failed to load configuration")?;
    debug!(
        "Config loaded: db={}, delete_policy={}, validation={:?}",
        config.database_path, config.delete_policy, config.validation
    );

    commands::execute(cli.command, &config).await
}

fn load_config(cli: &Cli) -> Result<StoreConfig> {
    layered_config(cli, |key| std::env::var(key).ok())
}

/// Defaults, then the config file, then `RATINGS_*` variables, then flags
fn layered_config<F>(cli: &Cli, lookup: F) -> Result<StoreConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let config = match &cli.config {
        Some(path) => StoreConfig::load(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?,
        None => StoreConfig::default(),
    };

    let config = config.with_env(lookup)?;
    Ok(apply_flags(config, cli))
}

fn apply_flags(mut config: StoreConfig, cli: &Cli) -> StoreConfig {
    if let Some(database) = &cli.database {
        config.database_path = database.clone();
    }
    if cli.cascade {
        config.delete_policy = DeletePolicy::Cascade;
    }
    if cli.strict {
        config.validation = ValidationMode::Strict;
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_precedence() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("ratings.yaml");
        std::fs::write(
            &path,
            "database_path: file.db\nmax_connections: 2\ndelete_policy: cascade\n",
        )?;
        let config_arg = path.to_string_lossy().to_string();
        let env: HashMap<&str, &str> = [
            ("RATINGS_DATABASE_PATH", "env.db"),
            ("RATINGS_MAX_CONNECTIONS", "3"),
        ]
        .into_iter()
        .collect();
        let lookup = |k: &str| env.get(k).map(|v| v.to_string());

        // File beats defaults, env beats file
        let cli = Cli::parse_from(["ratings", "--config", config_arg.as_str(), "customer", "list"]);
        let config = layered_config(&cli, lookup)?;
        assert_eq!(config.database_path, "env.db");
        assert_eq!(config.max_connections, 3);
        assert_eq!(config.delete_policy, DeletePolicy::Cascade);
        assert_eq!(config.validation, ValidationMode::Permissive);

        // Flags beat everything
        let cli = Cli::parse_from([
            "ratings",
            "--config",
            config_arg.as_str(),
            "--database",
            "flag.db",
            "--strict",
            "init",
        ]);
        let config = layered_config(&cli, lookup)?;
        assert_eq!(config.database_path, "flag.db");
        assert_eq!(config.max_connections, 3);
        assert_eq!(config.validation, ValidationMode::Strict);
        Ok(())
    }

    #[test]
    fn test_flags_leave_unset_values_alone() {
        let cli = Cli::parse_from(["ratings", "init"]);
        let config = apply_flags(StoreConfig::default(), &cli);
        assert_eq!(config.database_path, "ratings.db");
        assert_eq!(config.delete_policy, DeletePolicy::Restrict);
        assert_eq!(config.validation, ValidationMode::Permissive);
    }
}
