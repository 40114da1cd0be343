use actix_multipart::form::tempfile::TempFile;
use actix_multipart::form::text::Text;
use actix_multipart::form::MultipartForm;
use actix_web::web;
use actix_web::HttpResponse;

use crate::authentication::Owner;
use crate::domain::RawSubmissionMetadata;
use crate::errors::SubmitError;
use crate::repository::SubmissionRepository;
use crate::services::ObjectStoreClient;
use crate::submit::submit;
use crate::submit::SubmissionRequest;

#[derive(MultipartForm)]
pub struct SubmitMultipartForm {
    #[multipart(rename = "submissionReference")]
    submission_reference: Option<Text<String>>,
    #[multipart(rename = "callbackUrl")]
    callback_url: Text<String>,
    #[multipart(rename = "metadata.store")]
    metadata_store: Text<String>,
    #[multipart(rename = "metadata.source")]
    metadata_source: Text<String>,
    #[multipart(rename = "metadata.timeOfReceipt")]
    metadata_time_of_receipt: Text<String>,
    #[multipart(rename = "metadata.formId")]
    metadata_form_id: Text<String>,
    #[multipart(rename = "metadata.customerId")]
    metadata_customer_id: Text<String>,
    #[multipart(rename = "metadata.submissionMark")]
    metadata_submission_mark: Text<String>,
    #[multipart(rename = "metadata.casKey")]
    metadata_cas_key: Text<String>,
    #[multipart(rename = "metadata.classificationType")]
    metadata_classification_type: Text<String>,
    #[multipart(rename = "metadata.businessArea")]
    metadata_business_area: Text<String>,
    form: TempFile,
}

/// `POST /dms-submission/submit`. Parses the multipart request and delegates
/// everything else — validation, packaging, upload, persistence — to
/// `submit::submit`.
pub async fn submit_handler(
    owner: web::ReqData<Owner>,
    repository: web::Data<SubmissionRepository>,
    object_store: web::Data<ObjectStoreClient>,
    allow_localhost_callbacks: web::Data<bool>,
    MultipartForm(form): MultipartForm<SubmitMultipartForm>,
) -> Result<HttpResponse, SubmitError> {
    let pdf_bytes = tokio::fs::read(form.form.file.path())
        .await
        .map_err(|e| SubmitError::Unexpected(e.into()))?;

    let request = SubmissionRequest {
        submission_reference: form.submission_reference.map(|t| t.into_inner()),
        callback_url: form.callback_url.into_inner(),
        metadata: RawSubmissionMetadata {
            store: form.metadata_store.into_inner(),
            source: form.metadata_source.into_inner(),
            time_of_receipt: form.metadata_time_of_receipt.into_inner(),
            form_id: form.metadata_form_id.into_inner(),
            customer_id: form.metadata_customer_id.into_inner(),
            submission_mark: form.metadata_submission_mark.into_inner(),
            cas_key: form.metadata_cas_key.into_inner(),
            classification_type: form.metadata_classification_type.into_inner(),
            business_area: form.metadata_business_area.into_inner(),
        },
        pdf_bytes,
    };

    let outcome = submit(
        &repository,
        &object_store,
        owner.0.clone(),
        request,
        *allow_localhost_callbacks.get_ref(),
    )
    .await?;

    Ok(HttpResponse::Accepted().json(serde_json::json!({
        "id": outcome.id,
        "status": outcome.status,
    })))
}
