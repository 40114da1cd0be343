use actix_web::web;
use actix_web::HttpResponse;
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::SubmissionStatus;
use crate::errors::RepositoryError;
use crate::errors::SdesCallbackError;
use crate::repository::SubmissionRepository;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdesCallbackBody {
    correlation_id: Uuid,
    status: SubmissionStatus,
    failure_reason: Option<String>,
}

/// `POST /sdes-callback`: SDES reports the outcome of a previously forwarded
/// submission. Only `Processed`/`Failed` are legal inbound statuses; anything else
/// is rejected as an illegal transition before the repository is even consulted.
pub async fn sdes_callback_handler(
    repository: web::Data<SubmissionRepository>,
    body: web::Json<SdesCallbackBody>,
) -> Result<HttpResponse, SdesCallbackError> {
    if !matches!(body.status, SubmissionStatus::Processed | SubmissionStatus::Failed) {
        return Err(SdesCallbackError::IllegalTransition);
    }

    let existing = repository
        .get_by_correlation_id(body.correlation_id)
        .await
        .map_err(SdesCallbackError::Repository)?
        .ok_or(SdesCallbackError::NotFound)?;

    if !existing.status.can_transition_to(body.status) {
        return Err(SdesCallbackError::IllegalTransition);
    }

    match repository
        .update_by_correlation_id(body.correlation_id, body.status, body.failure_reason.clone())
        .await
    {
        Ok(_) => Ok(HttpResponse::Ok().finish()),
        Err(RepositoryError::NothingToUpdate) => Err(SdesCallbackError::NotFound),
        Err(e) => Err(SdesCallbackError::Repository(e)),
    }
}
