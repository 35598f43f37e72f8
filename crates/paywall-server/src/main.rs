//! Daily Breathing Paywall dev server
//!
//! Serves the built widget bundle under its fixed artifact names, plus the
//! demo page, so the embed can be tried against a real origin.
//!
//! Build the bundle first:
//!
//! ```text
//! wasm-pack build crates/paywall-widget --target no-modules --out-name paywall --out-dir ../../dist
//! ```
//!
//! On startup the server appends a loader to `paywall.js`, so host pages
//! embed the widget with a single classic `<script>` tag.

mod assets;
mod config;
mod handlers;
mod state;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeFile,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::assets::{stage, BUNDLE_CSS, BUNDLE_JS, BUNDLE_WASM, INDEX_HTML};
use crate::config::ServerConfig;
use crate::handlers::health_check;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();
    let config = ServerConfig::from_env();

    for (source, name) in [(&config.index_html, INDEX_HTML), (&config.stylesheet, BUNDLE_CSS)] {
        match stage(source, &config.dist_dir, name) {
            Ok(path) => tracing::info!("✓ Copied {} to {}", source.display(), path.display()),
            Err(e) => tracing::error!(error = %format!("{e:#}"), "Error copying {}", name),
        }
    }

    if assets::bundle_present(&config.dist_dir) {
        match assets::append_loader(&config.dist_dir) {
            Ok(true) => tracing::info!("✓ Added loader to {}", BUNDLE_JS),
            Ok(false) => tracing::debug!("Loader already present in {}", BUNDLE_JS),
            Err(e) => tracing::error!(error = %format!("{e:#}"), "Error adding loader"),
        }
    } else {
        tracing::warn!("⚠ {} not found in {}", BUNDLE_JS, config.dist_dir.display());
        tracing::warn!("  Build the widget first with wasm-pack (--target no-modules --out-name paywall)");
    }

    let app = router(AppState::new(config.dist_dir.clone()));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 paywall server running on http://{}", config.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /             - Demo page");
    tracing::info!("  GET  /{}   - Widget script", BUNDLE_JS);
    tracing::info!("  GET  /{} - Widget module", BUNDLE_WASM);
    tracing::info!("  GET  /{}  - Widget styles", BUNDLE_CSS);
    tracing::info!("  GET  /health       - Health check");
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    let dist = state.dist_dir.clone();

    // The bundle is embedded into arbitrary host pages
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route_service("/", ServeFile::new(dist.join(INDEX_HTML)))
        .route_service(&format!("/{BUNDLE_JS}"), ServeFile::new(dist.join(BUNDLE_JS)))
        .route_service(&format!("/{BUNDLE_WASM}"), ServeFile::new(dist.join(BUNDLE_WASM)))
        .route_service(&format!("/{BUNDLE_CSS}"), ServeFile::new(dist.join(BUNDLE_CSS)))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
