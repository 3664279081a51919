mod config;
mod game;
mod levels;
mod routes;
mod websocket;

use std::sync::Arc;

use anyhow::Result;
use axum::{routing::get, Router};
use config::Config;
use dashmap::DashMap;
use game::PuzzleSession;
use levels::LevelCatalog;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Application state shared across all handlers
pub struct AppState {
    pub config: Config,
    pub catalog: Arc<LevelCatalog>,
    /// One puzzle session per open WebSocket, keyed by connection id
    pub sessions: DashMap<Uuid, PuzzleSession>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "word_circle_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Word Circle backend server...");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    let catalog = load_catalog(&config.game.levels_path).await?;

    // Create application state
    let state = Arc::new(AppState {
        config: config.clone(),
        catalog: Arc::new(catalog),
        sessions: DashMap::new(),
    });

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Serve frontend static files
    let frontend_service = ServeDir::new(&config.server.frontend_dir);

    // Build router
    let app = Router::new()
        // WebSocket endpoint
        .route("/ws", get(websocket::handle_websocket))
        // API routes
        .merge(routes::create_routes())
        .fallback_service(frontend_service)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("WebSocket endpoint: ws://{}/ws", addr);
    tracing::info!("Health check: http://{}/health", addr);
    tracing::info!("Game frontend: http://{}/", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Load the levels file, falling back to the built-in levels
async fn load_catalog(path: &str) -> Result<LevelCatalog> {
    match LevelCatalog::load(path).await {
        Ok(catalog) => {
            tracing::info!("Levels loaded successfully");
            Ok(catalog)
        }
        Err(e) => {
            tracing::warn!(
                "Failed to load levels: {}. Using built-in levels for now.",
                e
            );
            tracing::warn!("Write a levels file to {} to customise the puzzle", path);
            Ok(LevelCatalog::builtin()?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_missing_levels_file_falls_back_to_builtin() {
        let catalog = assert_ok!(load_catalog("/nonexistent/levels.json").await);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.first().name(), "Make It So");
    }

    #[tokio::test]
    async fn test_invalid_levels_file_falls_back_to_builtin() {
        let path = std::env::temp_dir().join(format!("levels-{}.json", Uuid::new_v4()));
        tokio::fs::write(&path, "[]").await.unwrap();

        let catalog = assert_ok!(load_catalog(path.to_str().unwrap()).await);
        assert_eq!(catalog.first().tile_count(), 7);

        tokio::fs::remove_file(&path).await.unwrap();
    }
}
