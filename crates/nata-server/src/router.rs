use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::state::AppState;
use crate::{governance, handler, records};

/// Build the axum router with all NataCoin endpoints.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origin);
    Router::new()
        .route("/health", get(handler::health_handler))
        .route("/integrations/status", get(handler::integrations_status))
        .route("/network/node", get(handler::node_info))
        .route(
            "/records/proposals",
            post(records::create_proposal_record),
        )
        .route("/records/proposals/:cid", get(records::get_proposal_record))
        .route(
            "/records/properties",
            post(records::create_property),
        )
        .route("/records/properties/:id", get(records::get_property))
        .route(
            "/records/properties/:id/attestations",
            get(records::list_attestations).post(records::create_attestation),
        )
        .route(
            "/governance/proposals",
            get(governance::list_proposals).post(governance::create_proposal),
        )
        .route("/governance/proposals/:id", get(governance::get_proposal))
        .route(
            "/governance/proposals/:id/votes",
            get(governance::get_votes).post(governance::cast_vote),
        )
        .route("/governance/proposals/:id/tally", get(governance::get_tally))
        .route(
            "/identity/residency",
            post(handler::verify_residency),
        )
        .route(
            "/identity/residency/:address",
            get(handler::get_residency).delete(handler::revoke_residency),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
    match HeaderValue::from_str(origin) {
        Ok(value) => base
            .allow_origin(AllowOrigin::exact(value))
            .allow_credentials(true),
        Err(e) => {
            warn!(origin, error = %e, "invalid CORS origin; cross-origin requests disabled");
            base
        }
    }
}
