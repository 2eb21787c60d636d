/// Mediagate API Server
///
/// HTTP surface for the media fetch gateway. Accepts a locator (URL or
/// free-text query) per request, delegates to the gateway core, and
/// streams the resulting media file back with attachment headers.
mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use mediagate_gateway::downloader::{MediaDownloader, YtDlpDownloader};
use mediagate_gateway::fetch::MediaGateway;
use mediagate_gateway::search::HttpSearchResolver;

/// Shared application state for all API handlers.
pub struct AppState {
    pub gateway: MediaGateway,
    pub lyrics_base: String,
    pub http: reqwest::Client,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env
    dotenvy::dotenv().ok();

    // Init tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mediagate_api=info,mediagate_gateway=info".into()),
        )
        .init();

    // Config
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .unwrap_or(8080);
    let scratch_dir = std::env::var("SCRATCH_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| std::env::temp_dir().join("mediagate"));
    let ytdlp_bin = std::env::var("YTDLP_BIN").unwrap_or_else(|_| "yt-dlp".to_string());
    let fallback_bin = std::env::var("FALLBACK_DOWNLOADER_BIN").ok();
    let search_base = std::env::var("SEARCH_API_BASE").expect("SEARCH_API_BASE must be set");
    let lyrics_base = std::env::var("LYRICS_API_BASE")
        .unwrap_or_else(|_| "https://api.lyrics.ovh/v1".to_string());

    // Gateway with explicitly constructed collaborators; tool paths
    // and endpoints only enter here, never via globals.
    let downloader: Arc<dyn MediaDownloader> = Arc::new(YtDlpDownloader::new(ytdlp_bin));
    let fallback = fallback_bin
        .map(|bin| Arc::new(YtDlpDownloader::new(bin)) as Arc<dyn MediaDownloader>);
    let gateway = MediaGateway::new(
        scratch_dir.clone(),
        Arc::new(HttpSearchResolver::new(search_base)),
        downloader,
        fallback,
    );

    let state = Arc::new(AppState {
        gateway,
        lyrics_base,
        http: reqwest::Client::new(),
    });

    // CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Router
    let app = Router::new()
        .route("/health", get(routes::health))
        .route("/api/audio", get(routes::fetch_audio))
        .route("/api/video", get(routes::fetch_video))
        .route("/api/tiktok", get(routes::fetch_tiktok))
        .route("/api/facebook", get(routes::fetch_facebook))
        .route("/api/lyrics", get(routes::lyrics))
        .layer(cors)
        .with_state(state);

    // Bind
    let addr = format!("{}:{}", host, port);
    info!("Mediagate API listening on {} (scratch: {})", addr, scratch_dir.display());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
