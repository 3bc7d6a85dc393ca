pub mod auth;
mod error;
mod sessions;
mod spaces;
mod stats;
mod validation;
mod vehicles;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

pub use error::{ApiError, ErrorCode};

pub fn create_router(state: Arc<AppState>) -> Router {
    // Auth routes; register/login/logout are public, profile authenticates
    // through the User extractor
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/profile", get(auth::get_profile).put(auth::update_profile));

    // Protected API routes
    let api_routes = Router::new()
        // Space registry
        .route("/spaces", get(spaces::list_spaces))
        .route("/spaces/free", get(spaces::list_free_spaces))
        .route("/spaces/occupied", get(spaces::list_occupied_spaces))
        .route("/spaces/:id", get(spaces::get_space))
        // Sessions
        .route("/sessions/park", post(sessions::park))
        .route("/sessions/unpark/:plate", post(sessions::unpark))
        .route("/sessions/my-sessions", get(sessions::my_sessions))
        .route("/sessions/my-history", get(sessions::my_history))
        .route("/sessions/all-sessions", get(sessions::all_sessions))
        .route("/sessions/all-history", get(sessions::all_history))
        // Statistics
        .route("/parking/statistics", get(stats::statistics))
        .route("/parking/recent-entries", get(stats::recent_entries))
        .route("/parking/next-free-space", get(stats::next_free_space))
        // Vehicles
        .route("/vehicles", get(vehicles::list_vehicles))
        .route("/vehicles/:plate", get(vehicles::get_vehicle))
        // Protected by auth
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/auth", auth_routes)
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
