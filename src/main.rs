use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use groupchat::{auth, chat, config::Config, groups, profiles, res, store::SqliteStore, AppState};
use tower_http::trace::TraceLayer;
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(config.session_minutes)));

    let store = SqliteStore::connect(&config.database_url)
        .await
        .with_context(|| format!("opening {}", config.database_url))?;

    let secrets = std::fs::read_to_string(&config.client_secrets)
        .with_context(|| format!("reading {}", config.client_secrets.display()))?;
    let clients = auth::Clients::from_json(serde_json::from_str(&secrets)?, &config.public_url)
        .map_err(|err| err.0)?;

    let app_state = AppState {
        store: Arc::new(store),
        clients,
        delete_policy: config.delete_policy,
    };

    let app = Router::new()
        .route("/style.css", axum::routing::get(res::stylesheet))

        .merge(auth::router())
        .merge(groups::router())
        .nest("/g", chat::router())
        .nest("/p", profiles::router())

        .with_state(app_state)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, delete_policy = ?config.delete_policy, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
