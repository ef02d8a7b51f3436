use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{ServerError, ServerResult};
use crate::residency::DEFAULT_LOCALITY;
use crate::state::AppState;

/// Treat absent, blank, and whitespace-only strings alike.
pub(crate) fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Health check handler.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Backends behind each subsystem and the node's state.
pub async fn integrations_status(State(state): State<AppState>) -> Json<Value> {
    let gossip = match &state.node {
        Some(node) => {
            let status = if node.is_running() { "running" } else { "stopped" };
            json!({
                "status": status,
                "state": node.state(),
                "topic": node.topic(),
            })
        }
        None => json!({
            "status": "disabled",
            "topic": state.config.gossip.topic,
        }),
    };
    Json(json!({
        "storage": { "status": "ok", "backend": state.store.backend() },
        "gossip": gossip,
        "governance": { "status": "ok", "backend": state.governance.ledger().backend() },
        "residency": { "status": "ok", "backend": state.residency.backend() },
    }))
}

pub async fn node_info(State(state): State<AppState>) -> Json<Value> {
    let node = state.node.as_ref().map(|node| node.node_info());
    Json(json!({ "success": true, "node": node }))
}

#[derive(Debug, Deserialize)]
pub struct VerifyResidencyRequest {
    pub address: Option<String>,
    pub locality: Option<String>,
}

pub async fn verify_residency(
    State(state): State<AppState>,
    payload: Result<Json<VerifyResidencyRequest>, JsonRejection>,
) -> ServerResult<Json<Value>> {
    let Json(body) = payload?;
    let address = present(body.address).ok_or(ServerError::MissingFields("address"))?;
    let locality = present(body.locality).unwrap_or_else(|| DEFAULT_LOCALITY.to_owned());
    let proof = state.residency.verify(&address, &locality).await?;
    Ok(Json(json!({ "success": true, "proof": proof })))
}

pub async fn get_residency(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ServerResult<Json<Value>> {
    let proof = state
        .residency
        .get(&address)
        .await?
        .ok_or(ServerError::NotFound("Residency proof not found"))?;
    Ok(Json(json!({ "success": true, "proof": proof })))
}

pub async fn revoke_residency(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ServerResult<Json<Value>> {
    let revoked = state.residency.revoke(&address).await?;
    Ok(Json(json!({ "success": true, "revoked": revoked })))
}
