use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use actix_web::ResponseError;

use crate::domain::validation::ValidationErrors;

/// Errors raised by `Repository` operations. Distinguishes `NothingToUpdate` (a caller
/// mistake: the row the caller is updating doesn't exist) from genuine storage failures,
/// which are treated as fatal per SPEC_FULL.md §7 ("atomicity violations are fatal").
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("a row with the same (owner, id) or sdesCorrelationId already exists")]
    Duplicate,
    #[error("no matching row to update")]
    NothingToUpdate,
    #[error(transparent)]
    Storage(#[from] sqlx::Error),
}

/// Errors raised by the submit pipeline, surfaced to the HTTP layer via `ResponseError`.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("validation failed")]
    Validation(ValidationErrors),
    #[error("a submission with this reference already exists for this owner")]
    Duplicate,
    #[error("upstream object store or SDES call failed")]
    Transient(#[source] anyhow::Error),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl From<RepositoryError> for SubmitError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Duplicate => SubmitError::Duplicate,
            RepositoryError::NothingToUpdate => {
                SubmitError::Unexpected(anyhow::anyhow!("unexpected NothingToUpdate on insert"))
            }
            RepositoryError::Storage(e) => SubmitError::Unexpected(e.into()),
        }
    }
}

impl ResponseError for SubmitError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Duplicate => StatusCode::CONFLICT,
            Self::Transient(_) => StatusCode::BAD_GATEWAY,
            Self::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            Self::Validation(errors) => HttpResponse::BadRequest().json(errors),
            other => HttpResponse::build(other.status_code()).json(serde_json::json!({
                "error": other.to_string(),
            })),
        }
    }
}

/// Errors raised by the inbound `/sdes-callback` endpoint.
#[derive(Debug, thiserror::Error)]
pub enum SdesCallbackError {
    #[error("unknown correlation id")]
    NotFound,
    #[error("illegal status transition")]
    IllegalTransition,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ResponseError for SdesCallbackError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::IllegalTransition => StatusCode::CONFLICT,
            Self::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.to_string(),
        }))
    }
}
