pub mod cars;
pub mod error;
pub mod middleware;
pub mod reconcile;
pub mod service;
pub mod state;
pub mod storage;

use axum::{Router, extract::DefaultBodyLimit, middleware::from_fn_with_state, routing::get};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use garage_types::models::MAX_IMAGES;

use crate::middleware::require_auth;
use crate::state::AppState;

/// Headroom for text parts and multipart framing on top of the image bytes.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Build the full HTTP surface: authenticated car routes, static image
/// serving and the health check.
pub fn router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes * MAX_IMAGES + FORM_OVERHEAD_BYTES;

    let car_routes = Router::new()
        .route("/api/cars", get(cars::list_cars).post(cars::create_car))
        .route(
            "/api/cars/{id}",
            get(cars::get_car)
                .put(cars::update_car)
                .delete(cars::delete_car),
        )
        .layer(from_fn_with_state(state.clone(), require_auth))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state.clone());

    Router::new()
        .merge(car_routes)
        .nest_service(
            &format!("/{}", storage::UPLOADS_PREFIX),
            ServeDir::new(state.storage.dir()),
        )
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// GET /health — liveness check (no auth).
pub async fn health() -> &'static str {
    "ok"
}
