use registry_common::database;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    domain::migration::Migration,
    infrastructure::{persistence::PersistenceAdapter, settings::Settings},
};

pub mod domain;
pub mod infrastructure;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database = database::connect(&settings.database).await?;
    tracing::info!(schema = database.database_schema(), "connected to database");
    let persistence = PersistenceAdapter::new(database);

    // create the research tables missing from the database schema
    let migration = Migration::new(persistence);
    let created = migration.migrate().await?;
    tracing::info!(created, "research schema migrated");

    Ok(())
}
