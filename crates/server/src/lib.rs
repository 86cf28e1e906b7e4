// crates/server/src/lib.rs
//! Feed aggregation HTTP service
//!
//! Serves a configured table of upstream podcast/video feeds behind
//! per-client rate limiting and a single-flight TTL cache. Each feed is
//! either normalized to a JSON episode list or passed through as raw XML.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod router;
pub mod state;

pub use config::{
    youtube_feed_url, Config, ConfigError, ConfigResult, FeedConfig, FeedMode, ServerConfig,
};
pub use error::{AppError, AppResult, RefreshError};
pub use router::create_router;
pub use state::{AppState, FeedCache, FeedPayload, FeedRuntime};

// convenience re-exports for embedders and tests
pub use podrelay_feed_parser::{Episode, FeedFormat};

use std::net::SocketAddr;

/// Builds the application state and serves it until shutdown
pub async fn run_server(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let bind = config.server.bind;
    let state = AppState::new(&config)?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
