use registry_common::database;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::domain::research::ResearchService;
use crate::infrastructure::AppStateImpl;
use crate::infrastructure::http::auth::JwtSessionVerifier;
use crate::infrastructure::http::{HttpServer, HttpServerConfig};
use crate::infrastructure::persistence::PostgresResearchRepository;
use crate::infrastructure::settings::Settings;

mod domain;
mod infrastructure;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database = database::connect(&settings.database).await?;
    tracing::info!(schema = database.database_schema(), "connected to database");

    let research = ResearchService::new(
        PostgresResearchRepository::new(database),
        settings.pagination,
        settings.access.into(),
    );
    let sessions = JwtSessionVerifier::new(&settings.auth.jwt_secret);
    let state = AppStateImpl::new(research, sessions);

    let server_config = HttpServerConfig {
        port: &settings.server_port,
    };
    let http_server = HttpServer::new(state, server_config).await?;
    http_server.run().await
}
