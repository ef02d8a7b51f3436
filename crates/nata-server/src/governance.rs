//! Governance endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use nata_types::{Address, ProposalId};

use crate::error::{ServerError, ServerResult};
use crate::handler::present;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateProposalRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub proposer: Option<String>,
    /// Voting window length in seconds.
    pub duration: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct CastVoteRequest {
    pub voter: Option<String>,
    pub support: Option<bool>,
    pub weight: Option<f64>,
}

/// Ids that do not parse cannot name a proposal.
fn proposal_id(raw: &str) -> ServerResult<ProposalId> {
    raw.parse()
        .map_err(|_| ServerError::NotFound("Proposal not found"))
}

pub async fn list_proposals(State(state): State<AppState>) -> ServerResult<Json<Value>> {
    let proposals = state.governance.proposals()?;
    Ok(Json(json!({ "success": true, "proposals": proposals })))
}

pub async fn create_proposal(
    State(state): State<AppState>,
    payload: Result<Json<CreateProposalRequest>, JsonRejection>,
) -> ServerResult<Json<Value>> {
    let Json(body) = payload?;
    let (Some(title), Some(description), Some(proposer)) = (
        present(body.title),
        present(body.description),
        present(body.proposer),
    ) else {
        return Err(ServerError::MissingFields("title, description, proposer"));
    };
    let proposal = state
        .governance
        .create_proposal(title, description, Address::new(proposer), body.duration)
        .await?;
    Ok(Json(json!({ "success": true, "proposal": proposal })))
}

pub async fn get_proposal(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Json<Value>> {
    let proposal = state.governance.get_proposal(&proposal_id(&id)?)?;
    Ok(Json(json!({ "success": true, "proposal": proposal })))
}

pub async fn cast_vote(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<CastVoteRequest>, JsonRejection>,
) -> ServerResult<Json<Value>> {
    let id = proposal_id(&id)?;
    let Json(body) = payload?;
    let (Some(voter), Some(support), Some(weight)) = (present(body.voter), body.support, body.weight)
    else {
        return Err(ServerError::MissingFields("voter, support, weight"));
    };
    let vote = state
        .governance
        .cast_vote(&id, Address::new(voter), support, weight)
        .await?;
    Ok(Json(json!({ "success": true, "vote": vote })))
}

pub async fn get_votes(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Json<Value>> {
    let votes = state.governance.get_votes(&proposal_id(&id)?)?;
    Ok(Json(json!({ "success": true, "votes": votes })))
}

pub async fn get_tally(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Json<Value>> {
    let id = proposal_id(&id)?;
    let tally = state.governance.tally(&id)?;
    Ok(Json(json!({
        "success": true,
        "proposalId": id,
        "tally": tally,
        "totalVotes": tally.total_votes(),
        "totalWeight": tally.total_weight(),
        "passes": tally.passes(),
    })))
}
