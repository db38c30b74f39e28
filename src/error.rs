use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

pub type Result<T> = std::result::Result<T, Error>;

/// Every outcome of the candidate workflow is one of these variants; nothing
/// else crosses the service boundary.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Forbidden: Invalid API Key.")]
    Forbidden,

    #[error("Validation failed")]
    Validation(Vec<String>),

    #[error("Candidate with this email already exists.")]
    DuplicateEmail,

    #[error("Legacy API key is not configured.")]
    LegacyKeyMissing,

    #[error("Legacy API URL is invalid.")]
    LegacyUrlInvalid,

    #[error("Communication with legacy API failed.")]
    LegacyUnreachable,

    /// The legacy system answered with a non-success status. `status` is
    /// already clamped to 400..=599 (502 otherwise) by the workflow.
    #[error("{message}")]
    LegacyRejected { status: u16, message: String },

    #[error("Unable to determine created candidate identifier.")]
    MissingCandidateId,

    #[error("Unable to load created candidate.")]
    CandidateNotPersisted,

    #[error("Failed to create candidate.")]
    CreateFailed,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Forbidden => StatusCode::FORBIDDEN,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::DuplicateEmail => StatusCode::CONFLICT,
            Error::LegacyRejected { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Error::Config(_)
            | Error::LegacyKeyMissing
            | Error::LegacyUrlInvalid
            | Error::LegacyUnreachable
            | Error::MissingCandidateId
            | Error::CandidateNotPersisted
            | Error::CreateFailed
            | Error::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let body = match &self {
            Error::Validation(errors) => {
                json!({ "message": "Validation failed", "errors": errors })
            }
            other => json!({ "message": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
