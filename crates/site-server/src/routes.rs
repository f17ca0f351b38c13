use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use px_session::session_middleware;
use tower_http::trace::{DefaultMakeSpan, TraceLayer};

use crate::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    // No session involvement
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/health/ready", get(handlers::health::readiness_check))
        .route("/stats", get(handlers::stats::stats_handler));

    // Session-aware routes
    let session_routes = Router::new()
        .route("/", get(handlers::visit::index_handler))
        .route("/login", post(handlers::login::request_code_handler))
        .route("/login/verify", post(handlers::login::verify_code_handler))
        .route("/logout", post(handlers::login::logout_handler))
        .route("/me", get(handlers::login::me_handler))
        .layer(middleware::from_fn_with_state(
            state.sessions.clone(),
            session_middleware,
        ));

    let mut app = Router::new().merge(public_routes).merge(session_routes);

    if state.settings.server.enable_admin {
        app = app.route(
            "/admin/bans",
            post(handlers::admin::add_ban_handler).delete(handlers::admin::remove_ban_handler),
        );
    }

    app
        // Tracing
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        .with_state(state)
}
