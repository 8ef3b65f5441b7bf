use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler::{self, AppState};

/// Build the axum router with all Conclave endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route("/v1/info", get(handler::info_handler))
        .route("/v1/reference", get(handler::reference_handler))
        .route(
            "/v1/conferences",
            get(handler::list_conferences_handler).post(handler::schedule_handler),
        )
        .route("/v1/conferences/lists", get(handler::standard_lists_handler))
        .route("/v1/conferences/:id", get(handler::get_conference_handler))
        .route(
            "/v1/conferences/:id/tickets",
            get(handler::available_tickets_handler),
        )
        .route("/v1/tickets/:id/buy", post(handler::buy_ticket_handler))
        .route(
            "/v1/profile",
            get(handler::get_profile_handler).put(handler::save_profile_handler),
        )
        .route("/v1/announcements", post(handler::post_announcement_handler))
        .route(
            "/v1/announcements/latest",
            get(handler::latest_announcement_handler),
        )
        .route("/v1/reviews/lease", post(handler::lease_reviews_handler))
        .route("/v1/reviews/:id", delete(handler::ack_review_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
