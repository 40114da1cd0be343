use uuid::Uuid;

use crate::domain::CallbackUrl;
use crate::domain::NewSubmissionItem;
use crate::domain::RawSubmissionMetadata;
use crate::domain::SubmissionMetadata;
use crate::domain::SubmissionStatus;
use crate::domain::ValidationErrors;
use crate::errors::SubmitError;
use crate::packaging;
use crate::repository::SubmissionRepository;
use crate::services::ObjectStoreClient;

/// Everything the HTTP layer extracted from the multipart request, before
/// validation or packaging.
pub struct SubmissionRequest {
    pub submission_reference: Option<String>,
    pub callback_url: String,
    pub metadata: RawSubmissionMetadata,
    pub pdf_bytes: Vec<u8>,
}

pub struct SubmitOutcome {
    pub id: String,
    pub status: SubmissionStatus,
}

/// Validate, package, upload, and durably record one submission.
#[tracing::instrument(skip_all, fields(owner = %owner))]
pub async fn submit(
    repository: &SubmissionRepository,
    object_store: &ObjectStoreClient,
    owner: String,
    request: SubmissionRequest,
    allow_localhost_callbacks: bool,
) -> Result<SubmitOutcome, SubmitError> {
    let mut errors = ValidationErrors::default();

    let callback_url = match CallbackUrl::parse(&request.callback_url, allow_localhost_callbacks) {
        Ok(url) => Some(url),
        Err(e) => {
            errors.push("callbackUrl", e.code());
            None
        }
    };

    let metadata = match SubmissionMetadata::parse(request.metadata) {
        Ok(metadata) => Some(metadata),
        Err(metadata_errors) => {
            errors.errors.extend(metadata_errors.errors);
            None
        }
    };

    if !errors.is_empty() {
        return Err(SubmitError::Validation(errors));
    }
    let callback_url = callback_url.expect("validated");
    let metadata = metadata.expect("validated");

    let id = request
        .submission_reference
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let sdes_correlation_id = Uuid::new_v4();

    let zip_bytes = {
        let scratch_dir = tempfile::tempdir().map_err(|e| SubmitError::Unexpected(e.into()))?;

        let metadata_xml = packaging::metadata_to_xml(&metadata).map_err(SubmitError::Unexpected)?;
        let metadata_path = scratch_dir.path().join("metadata.xml");
        tokio::fs::write(&metadata_path, &metadata_xml).await.map_err(|e| SubmitError::Unexpected(e.into()))?;

        let pdf_path = scratch_dir.path().join("form.pdf");
        tokio::fs::write(&pdf_path, &request.pdf_bytes).await.map_err(|e| SubmitError::Unexpected(e.into()))?;

        let bytes = packaging::build_submission_zip(&pdf_path, &metadata_path).map_err(SubmitError::Unexpected)?;
        scratch_dir.close().map_err(|e| SubmitError::Unexpected(e.into()))?;
        bytes
    };

    let location = format!("{sdes_correlation_id}.zip");
    let object_summary =
        object_store.upload(&location, zip_bytes).await.map_err(SubmitError::Transient)?;

    let item = repository
        .insert(NewSubmissionItem {
            id: id.clone(),
            owner,
            sdes_correlation_id,
            callback_url: callback_url.as_ref().to_string(),
            object_summary,
        })
        .await?;

    Ok(SubmitOutcome { id: item.id, status: item.status })
}

