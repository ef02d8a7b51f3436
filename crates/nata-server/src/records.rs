//! Content-addressed record endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use nata_gossip::Announcement;
use nata_records::{
    AttestationRecord, CodecError, PropertyRecord, ProposalRecord, Record, RecordCodec,
};
use nata_types::{Address, Cid};

use crate::error::{ServerError, ServerResult};
use crate::handler::present;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProposalRecordRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub proposer: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyRecordRequest {
    pub property_id: Option<String>,
    pub address: Option<String>,
    pub owner: Option<String>,
    /// Accepted as a JSON string or number.
    pub value: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct AttestationRequest {
    pub attester: Option<String>,
    pub attestation: Option<String>,
    pub signature: Option<String>,
}

fn value_text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) => present(Some(s)),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Read `cid` from the store. Unparseable ids, missing records, and records
/// of another kind all come back as `None`.
fn load<T>(
    state: &AppState,
    cid: &str,
    decode: fn(&[u8]) -> Result<T, CodecError>,
) -> ServerResult<Option<(Cid, T)>> {
    let Ok(cid) = cid.parse::<Cid>() else {
        return Ok(None);
    };
    let Some(bytes) = state.store.get(&cid)? else {
        return Ok(None);
    };
    match decode(&bytes) {
        Ok(record) => Ok(Some((cid, record))),
        Err(CodecError::UnexpectedKind { .. }) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Store a proposal text. Not disseminated.
pub async fn create_proposal_record(
    State(state): State<AppState>,
    payload: Result<Json<ProposalRecordRequest>, JsonRejection>,
) -> ServerResult<Json<Value>> {
    let Json(body) = payload?;
    let (Some(title), Some(description), Some(proposer)) = (
        present(body.title),
        present(body.description),
        present(body.proposer),
    ) else {
        return Err(ServerError::MissingFields("title, description, proposer"));
    };

    let proposal = ProposalRecord::new(title, description, proposer, state.clock.now_secs());
    let cid = state
        .store
        .put(&RecordCodec::encode(&Record::Proposal(proposal.clone()))?)?;
    info!(%cid, "proposal record stored");
    Ok(Json(json!({ "success": true, "cid": cid, "proposal": proposal })))
}

pub async fn get_proposal_record(
    State(state): State<AppState>,
    Path(cid): Path<String>,
) -> ServerResult<Json<Value>> {
    let (cid, proposal) = load(&state, &cid, RecordCodec::decode_proposal)?
        .ok_or(ServerError::NotFound("Proposal not found"))?;
    Ok(Json(json!({ "success": true, "cid": cid, "proposal": proposal })))
}

/// Store a property record and announce it when the node is running.
pub async fn create_property(
    State(state): State<AppState>,
    payload: Result<Json<PropertyRecordRequest>, JsonRejection>,
) -> ServerResult<Json<Value>> {
    let Json(body) = payload?;
    let (Some(property_id), Some(address), Some(owner), Some(value)) = (
        present(body.property_id),
        present(body.address),
        present(body.owner),
        value_text(body.value),
    ) else {
        return Err(ServerError::MissingFields("propertyId, address, owner, value"));
    };

    let property = PropertyRecord {
        property_id,
        address,
        owner: Address::new(owner),
        value,
        timestamp: state.clock.now_secs(),
    };
    let cid = state
        .store
        .put(&RecordCodec::encode(&Record::PropertyRecord(property.clone()))?)?;
    info!(%cid, property = %property.property_id, "property record stored");

    if let Some(node) = state.running_node() {
        let announcement = Announcement::PropertyRecord {
            data: property.clone(),
            cid,
        };
        if let Err(e) = node.publish(&announcement).await {
            warn!(%cid, error = %e, "property record not announced");
        }
    }
    Ok(Json(json!({ "success": true, "cid": cid, "property": property })))
}

pub async fn get_property(
    State(state): State<AppState>,
    Path(cid): Path<String>,
) -> ServerResult<Json<Value>> {
    let (cid, property) = load(&state, &cid, RecordCodec::decode_property)?
        .ok_or(ServerError::NotFound("Property record not found"))?;
    Ok(Json(json!({ "success": true, "cid": cid, "property": property })))
}

/// Build an attestation; publish and record it when the node is running.
pub async fn create_attestation(
    State(state): State<AppState>,
    Path(property_id): Path<String>,
    payload: Result<Json<AttestationRequest>, JsonRejection>,
) -> ServerResult<Json<Value>> {
    let Json(body) = payload?;
    let (Some(attester), Some(attestation)) = (present(body.attester), present(body.attestation))
    else {
        return Err(ServerError::MissingFields("attester, attestation"));
    };

    let record = AttestationRecord {
        property_id,
        attester: Address::new(attester),
        attestation,
        signature: present(body.signature),
        timestamp: state.clock.now_secs(),
    };
    match state.running_node() {
        Some(node) => {
            node.publish(&Announcement::PropertyAttestation(record.clone()))
                .await?;
            state.attestations.record(record.clone());
        }
        None => warn!(property = %record.property_id, "gossip node not running; attestation not published"),
    }
    let body = Announcement::PropertyAttestation(record);
    Ok(Json(json!({ "success": true, "attestation": body })))
}

pub async fn list_attestations(
    State(state): State<AppState>,
    Path(property_id): Path<String>,
) -> Json<Value> {
    let attestations = state.attestations.for_property(&property_id);
    Json(json!({
        "success": true,
        "propertyId": property_id,
        "attestations": attestations,
    }))
}
