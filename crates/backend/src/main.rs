mod config;
mod error;
mod places;

use std::path::{Path, PathBuf};

use axum::http::HeaderValue;
use axum::{response::Html, routing::get, Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use config::Config;
use places::{places_handler, PlacesClient};

#[derive(Clone)]
pub struct AppState {
    pub places: PlacesClient,
}

/// Build a cache-controlled static file router.
///
/// Separated so tests can exercise the caching layer with arbitrary directories.
fn cached_static_router(dir: &Path, cache_header: &'static str) -> Router {
    let layer = SetResponseHeaderLayer::overriding(
        axum::http::header::CACHE_CONTROL,
        HeaderValue::from_static(cache_header),
    );
    Router::new()
        .fallback_service(ServeDir::new(dir))
        .layer(layer)
}

const CACHE_1DAY: &str = "public, max-age=86400, must-revalidate";
const CACHE_IMMUTABLE: &str = "public, max-age=31536000, immutable";

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// JSON endpoints, with CORS and request tracing.
fn build_api(state: AppState) -> Router {
    Router::new()
        .route("/api/places", get(places_handler))
        .route("/api/health", get(health))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Build the full application router.
fn build_app(state: AppState, data_dir: &Path, dist_dir: &Path) -> Router {
    let static_files = Router::new()
        .nest("/data", cached_static_router(data_dir, CACHE_1DAY))
        .nest("/dist", cached_static_router(dist_dir, CACHE_IMMUTABLE))
        .nest(
            "/assets",
            cached_static_router(&dist_dir.join("assets"), CACHE_IMMUTABLE),
        );

    let index_path = dist_dir.join("index.html");
    Router::new()
        .route("/", get(move || serve_index(index_path.clone())))
        .merge(static_files)
        .layer(CorsLayer::permissive())
        .merge(build_api(state))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    let places = PlacesClient::new(&config.places)?;
    let app = build_app(AppState { places }, &config.data_dir, &config.dist_dir);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        port = config.port,
        data_dir = %config.data_dir.display(),
        places_api = %config.places.api_base,
        "Server running at http://localhost:{}",
        config.port
    );

    axum::serve(listener, app).await?;
    Ok(())
}

async fn serve_index(index_path: PathBuf) -> Html<String> {
    // Try to serve the built frontend, fall back to a simple message
    match tokio::fs::read_to_string(&index_path).await {
        Ok(html) => Html(html),
        Err(_) => Html(
            r#"<!DOCTYPE html>
<html>
<head><title>Estate Map</title></head>
<body>
<h1>Estate Map</h1>
<p>Frontend not built yet. Static geodata is served under <a href="/data/projects.json">/data</a>.</p>
</body>
</html>"#
                .to_string(),
        ),
    }
}
