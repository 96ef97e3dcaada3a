//! Seeds a QuickDesk database with the fixed category list and the demo users.
//!
//! Usage: `seed [--reset-tickets]`

use anyhow::Context;
use di::Ref;
use log::info;
use quickdesk::core::seed;
use quickdesk::infrastructure::database::DatabaseConnection;
use quickdesk::infrastructure::repositories::{
    DbCategoryRepository, DbTicketRepository, DbUserRepository,
};
use quickdesk::infrastructure::settings;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use tokio::runtime::Builder;

const RESET_TICKETS: &str = "--reset-tickets";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut reset_tickets = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            RESET_TICKETS => reset_tickets = true,
            other => anyhow::bail!("unknown argument {other:?}, expected {RESET_TICKETS}"),
        }
    }

    let runtime = Builder::new_current_thread().enable_all().build()?;
    runtime.block_on(seed_database(reset_tickets))
}

async fn seed_database(reset_tickets: bool) -> anyhow::Result<()> {
    let options = SqliteConnectOptions::from_str(&settings::database_url()?)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .context("cannot open database")?;
    sqlx::migrate!().run(&pool).await?;

    let connection = Ref::new(DatabaseConnection::from_pool(pool));

    info!("Syncing categories...");
    let report = seed::sync_categories(
        &DbCategoryRepository::new(connection.clone()),
        &seed::DEFAULT_CATEGORIES,
    )
    .await?;
    info!(
        "Category sync complete: {} added, {} deleted, {} skipped",
        report.added.len(),
        report.deleted.len(),
        report.skipped.len()
    );

    info!("Seeding users...");
    let added = seed::seed_users(&DbUserRepository::new(connection.clone()), &seed::DEMO_USERS).await?;
    info!("{added} users added");

    if reset_tickets {
        seed::clear_tickets(&DbTicketRepository::new(connection)).await?;
    }

    info!("Seed complete");
    Ok(())
}
