mod auth;
mod config;
mod error;
mod routes;
mod state;
#[cfg(test)]
mod testing;

use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use crate::auth::{PgUserStore, TokenKeys};
use crate::routes::tasks::queries::PgTaskStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("todo_api=info,tower_http=info")),
        )
        .init();

    let db = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .context("Error connecting DB")?;

    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .context("Error running migrations")?;

    let state = state::AppState {
        tasks: Arc::new(PgTaskStore::new(db.clone())),
        users: Arc::new(PgUserStore::new(db)),
        tokens: Arc::new(TokenKeys::new(
            &config.jwt_secret,
            config.access_token_ttl_secs,
            config.refresh_token_ttl_secs,
        )),
        page_size: config.page_size,
        public_base_url: config.public_base_url.clone(),
    };

    let app = routes::routes(state);

    let listener = tokio::net::TcpListener::bind(config.addr())
        .await
        .with_context(|| format!("failed to bind {}", config.addr()))?;

    tracing::info!("listening on http://{}", config.addr());

    axum::serve(listener, app).await?;

    Ok(())
}
