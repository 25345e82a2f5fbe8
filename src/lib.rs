//! Real-time social activity coordination service built with Rust.
//!
//! A typed command/query dispatcher with validation and authorization
//! staging, a group-scoped real-time hub with at-most-once broadcast, and
//! a keyed reactive store for the client side.

pub mod auth;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod hub;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod store;

pub use config::Config;
pub use dispatch::{build_dispatcher, Dispatcher};
pub use error::{AppError, AppResult};
pub use handlers::http::AppState;
pub use hub::{CommentFanout, Hub};
pub use store::Store;

use axum::routing::{get, post, put};
use handlers::http;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the API router (ws, activities, profiles, photos, auth, health).
/// Used by main and by integration tests.
pub fn create_app(state: AppState) -> axum::Router {
    let auth_routes = axum::Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let api_routes = axum::Router::new()
        .route(
            "/activities",
            get(http::list_activities).post(http::create_activity),
        )
        .route(
            "/activities/:id",
            get(http::get_activity)
                .put(http::edit_activity)
                .delete(http::delete_activity),
        )
        .route(
            "/activities/:id/attend",
            post(http::attend).delete(http::unattend),
        )
        .route("/user", get(http::current_user))
        .route("/profiles", put(http::edit_profile))
        .route("/profiles/:username", get(http::get_profile))
        .route("/photos", post(http::add_photo))
        .route("/photos/:id", axum::routing::delete(http::delete_photo))
        .route("/photos/:id/main", post(http::set_main_photo));

    axum::Router::new()
        .route("/ws", get(handlers::ws_handler))
        .route("/health", get(http::health))
        .nest("/auth", auth_routes)
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
