use crate::handlers::{self, AppState};
use crate::submission;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Request size limit for form submissions (1MB).
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Every `/api` route, without middleware.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Assessment wizard
        .route("/api/assessment", post(handlers::create_assessment))
        .route(
            "/api/assessment/:id",
            get(handlers::get_assessment).patch(handlers::update_assessment),
        )
        // Bot-protected pipeline
        .route("/api/assessments", post(submission::submit_assessment))
        .route("/api/intake", post(submission::submit_intake))
        .route(
            "/api/general-contact",
            post(submission::submit_general_contact),
        )
        // Simple forms
        .route("/api/contact", post(handlers::create_contact))
        .route("/api/newsletter", post(handlers::subscribe_newsletter))
        .route("/api/booking", post(handlers::create_booking))
        .route(
            "/api/booking/available-slots",
            get(handlers::get_available_slots),
        )
        .route("/api/config/recaptcha", get(handlers::recaptcha_config))
        .route("/api/health", get(handlers::health))
}

/// Wraps already-layered API routes with the liveness check, tracing and CORS.
///
/// `/health` is merged outside `protected` so it bypasses whatever limits
/// were applied there.
pub fn assemble(protected: Router<Arc<AppState>>, state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .merge(protected)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// The application router with the body limit but no rate limiting.
pub fn router(state: Arc<AppState>) -> Router {
    assemble(
        api_routes().layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES)),
        state,
    )
}
