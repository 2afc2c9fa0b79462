use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use super::{audit, demos, draw, handlers, members, middleware::metrics_middleware};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health, config and metrics
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/metrics", get(handlers::get_metrics))
        // Audit
        .route("/audit", get(audit::query_audit))
        // Demos
        .route("/demos", get(demos::list_demos).post(demos::create_demo))
        .route(
            "/demos/{id}",
            get(demos::get_demo)
                .put(demos::update_demo)
                .delete(demos::delete_demo),
        )
        .route("/demos/{id}/tasks", post(demos::submit_task))
        .route("/demos/{id}/tasks/{task_id}", delete(demos::delete_task))
        // Draw
        .route("/demos/{id}/draw/start", post(draw::start_draw))
        .route("/demos/{id}/draw", post(draw::draw))
        .route("/demos/{id}/draw/reset", post(draw::reset_draw))
        .route("/demos/{id}/tasks/{task_id}/draw", post(draw::draw_task))
        // Members
        .route(
            "/members",
            get(members::list_members).post(members::create_member),
        )
        .route("/members/{id}/active", put(members::set_member_active))
        .layer(middleware::from_fn(metrics_middleware))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
}
