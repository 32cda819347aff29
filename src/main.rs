mod config;
mod routes;
mod store;

use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::routes::AppState;
use crate::store::ReactionStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "news_reactions=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path =
        std::env::var("REACTIONS_CONFIG").unwrap_or_else(|_| "reactions.toml".to_string());
    let config = if std::path::Path::new(&config_path).exists() {
        Config::load(&config_path)?
    } else {
        info!("No config file at {}, using defaults", config_path);
        Config::default()
    };

    // Create the store and app state
    let store = Arc::new(ReactionStore::new(config.max_page_size));
    let state = Arc::new(AppState {
        store,
        default_page_size: config.default_page_size,
    });

    // Build router
    let app = routes::router(state).layer(TraceLayer::new_for_http());

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Server starting on http://{}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
