use axum::{middleware, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::request_id::{make_span_with_request_id, request_id_middleware};

use super::handlers;
use super::AppState;

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Catalog explorer
        .route("/anime", get(handlers::list_anime))
        .route("/anime/stats", get(handlers::anime_stats))
        .route("/anime/search", get(handlers::search_anime))
        .route("/anime/:id", get(handlers::get_anime))
        // Recommendations
        .route(
            "/anime/:id/recommendations/user",
            get(handlers::user_recommendations),
        )
        .route(
            "/anime/:id/recommendations/genre",
            get(handlers::genre_recommendations),
        )
        .route(
            "/anime/:id/recommendations/hybrid",
            get(handlers::hybrid_recommendations),
        )
        // Precomputed lists
        .route("/genres/:genre", get(handlers::genre_top))
        .route("/discover", get(handlers::discover))
}
