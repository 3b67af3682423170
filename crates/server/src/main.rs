use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use audio_core::WavSpeedProcessor;
use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    middleware,
    routing::{get, post},
    Router,
};
use shared::protocol::{HEALTH_ROUTE, PROCESS_AUDIO_ROUTE};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod api;
mod app_state;
mod config;

use app_state::AppState;
use config::{load_settings, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let settings = load_settings();
    let state = AppState {
        processor: Arc::new(WavSpeedProcessor::new(settings.max_output_samples)),
    };
    let app = build_router(Arc::new(state), &settings)?;

    let addr: SocketAddr = settings
        .server_bind
        .parse()
        .with_context(|| format!("invalid bind address '{}'", settings.server_bind))?;
    info!(
        %addr,
        max_upload_bytes = settings.max_upload_bytes,
        max_output_samples = settings.max_output_samples,
        "server listening"
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>, settings: &Settings) -> anyhow::Result<Router> {
    let mut router = Router::new()
        .route(HEALTH_ROUTE, get(api::health))
        .route(PROCESS_AUDIO_ROUTE, post(api::process_audio))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(settings.max_upload_bytes))
        .layer(middleware::map_response(api::payload_too_large_as_json))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if let Some(origin) = settings.cors_origin()? {
        info!(?origin, "enabling CORS");
        router = router.layer(
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers(Any),
        );
    }

    Ok(router)
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
