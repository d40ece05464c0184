use std::sync::Arc;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::{auth, request_handler};
use crate::core::AppState;

/**
 * Initializing the api routes.
 */
pub fn init_router(app_state: Arc<AppState>) -> Router {
    let public_routing = Router::new()
        .route("/health", get(request_handler::health))
        .with_state(app_state.clone());

    let protected_routing = Router::new()
        .route("/api/stats", get(request_handler::get_stats))
        .route("/api/chats", get(request_handler::get_chats))
        .route("/api/chats/{chat_id}/messages", get(request_handler::get_chat_messages))
        .route("/api/chats/{chat_id}/messages/daily", get(request_handler::get_chat_messages_daily))
        .route("/api/chats/{chat_id}/summary", post(request_handler::generate_chat_summary))
        .route("/api/chats/{chat_id}/strategy", post(request_handler::generate_chat_strategy))
        .route("/api/chats/{chat_id}/analytics", get(request_handler::get_chat_analytics))
        .route("/api/chats/{chat_id}/join-requests", get(request_handler::get_join_requests))
        .route("/api/join-requests/clean", post(request_handler::trigger_join_request_cleanup))
        .route("/api/dashboard", get(request_handler::get_dashboard))
        .route("/api/users", get(request_handler::get_users))
        //layering bottom to top middleware
        .layer(
            ServiceBuilder::new() //layering top to bottom middleware
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn_with_state(app_state.clone(), auth::require_admin)),
        )
        .with_state(app_state);

    public_routing.merge(protected_routing)
}
