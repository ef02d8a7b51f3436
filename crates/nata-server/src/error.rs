use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use nata_gossip::GossipError;
use nata_governance::GovernanceError;
use nata_records::CodecError;
use nata_store::StoreError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Missing required fields: {0}")]
    MissingFields(&'static str),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(&'static str),

    #[error(transparent)]
    Governance(#[from] GovernanceError),

    #[error(transparent)]
    Gossip(#[from] GossipError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingFields(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Governance(e) => match e {
                GovernanceError::NotFound(_) => StatusCode::NOT_FOUND,
                GovernanceError::DuplicateVote { .. } => StatusCode::CONFLICT,
                GovernanceError::VotingClosed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                GovernanceError::InvalidWeight(_) | GovernanceError::InvalidProposal(_) => {
                    StatusCode::BAD_REQUEST
                }
                GovernanceError::Store(_) | GovernanceError::Codec(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Gossip(GossipError::NotRunning) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Gossip(_)
            | Self::Store(_)
            | Self::Codec(_)
            | Self::Config(_)
            | Self::Io(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
