use crate::config::Config;
use crate::handlers;
use crate::state::AppState;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

pub fn router(state: AppState, config: &Config) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/import", post(handlers::import))
        .route("/getdata", get(handlers::get_data))
        .route("/dashboard", get(handlers::dashboard))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors_layer(&config.cors_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    match HeaderValue::from_str(origin) {
        Ok(value) => layer.allow_origin(value),
        Err(err) => {
            warn!("ignoring invalid CORS origin {origin:?}: {err}");
            layer
        }
    }
}
