pub mod config;
pub mod routes;

use crate::config::ServerConfig;
use crate::routes::{gateway_router, SharedGateway};
use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// The proxy service: gateway routes plus CORS and request tracing.
pub fn build_app(gateway: SharedGateway, config: &ServerConfig) -> Router {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any);

    gateway_router(gateway)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
