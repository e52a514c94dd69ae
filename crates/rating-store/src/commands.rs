//! Command handlers

use crate::storage::Database;
use crate::{Commands, CustomerAction, ItemAction, ReviewAction, ShowArgs};
use anyhow::{Context, Result};
use rating_core::{Item, RatingService, SerializeOptions, StoreConfig, Validator};
use std::fmt::Display;
use std::sync::Arc;
use tracing::info;

pub async fn execute(command: Commands, config: &StoreConfig) -> Result<()> {
    let db = Arc::new(
        Database::new(config)
            .await
            .context("Failed to initialize database")?,
    );

    let delete_policy = db.delete_policy();
    let service = RatingService::new(db, Validator::new(config.validation));

    match command {
        Commands::Init => {
            info!("Schema ready at {}", config.database_path);
            println!(
                "Initialized {} (delete policy: {})",
                config.database_path, delete_policy
            );
        }
        Commands::Customer { action } => customer(&service, action).await?,
        Commands::Item { action } => item(&service, action).await?,
        Commands::Review { action } => review(&service, action).await?,
    }

    Ok(())
}

async fn customer(service: &RatingService<Database>, action: CustomerAction) -> Result<()> {
    match action {
        CustomerAction::Add { name } => println!("{}", service.create_customer(&name).await?),
        CustomerAction::List => print_rows(service.list_customers().await?),
        CustomerAction::Show(args) => {
            let value = service.serialize_customer(args.id, &options(&args)).await?;
            print_json(&value)?;
        }
        CustomerAction::Rename { id, name } => {
            println!("{}", service.rename_customer(id, &name).await?)
        }
        CustomerAction::Delete { id } => {
            service.delete_customer(id).await?;
            println!("Deleted customer {}", id);
        }
    }
    Ok(())
}

async fn item(service: &RatingService<Database>, action: ItemAction) -> Result<()> {
    match action {
        ItemAction::Add { name, price } => {
            println!("{}", service.create_item(&name, price).await?)
        }
        ItemAction::List => print_rows(service.list_items().await?),
        ItemAction::Show(args) => {
            let value = service.serialize_item(args.id, &options(&args)).await?;
            print_json(&value)?;
        }
        ItemAction::Update { id, name, price } => {
            let item = Item::new(id, name, price);
            service.update_item(&item).await?;
            println!("{}", item);
        }
        ItemAction::Delete { id } => {
            service.delete_item(id).await?;
            println!("Deleted item {}", id);
        }
    }
    Ok(())
}

async fn review(service: &RatingService<Database>, action: ReviewAction) -> Result<()> {
    match action {
        ReviewAction::Add {
            customer_id,
            item_id,
            comment,
        } => println!(
            "{}",
            service.create_review(&comment, customer_id, item_id).await?
        ),
        ReviewAction::List { customer, item } => {
            let reviews = match (customer, item) {
                (Some(id), _) => service.customer_reviews(id).await?,
                (None, Some(id)) => service.item_reviews(id).await?,
                (None, None) => service.list_reviews().await?,
            };
            print_rows(reviews);
        }
        ReviewAction::Show(args) => {
            let value = service.serialize_review(args.id, &options(&args)).await?;
            print_json(&value)?;
        }
        ReviewAction::Comment { id, comment } => {
            service.update_review_comment(id, &comment).await?;
            println!("{}", service.get_review(id).await?);
        }
        ReviewAction::Delete { id } => {
            service.delete_review(id).await?;
            println!("Deleted review {}", id);
        }
    }
    Ok(())
}

fn options(args: &ShowArgs) -> SerializeOptions {
    SerializeOptions {
        include_derived: args.derived,
        max_depth: args.depth,
        exclude: args.exclude.clone(),
    }
}

fn print_rows<T: Display>(rows: Vec<T>) {
    for row in rows {
        println!("{}", row);
    }
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
