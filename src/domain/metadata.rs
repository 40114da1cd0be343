use chrono::DateTime;
use chrono::Utc;

use super::validation::ValidationErrors;

/// The metadata fields exactly as they arrive over the wire (multipart text parts), before
/// any parsing or validation.
#[derive(Debug, Clone, Default)]
pub struct RawSubmissionMetadata {
    pub store: String,
    pub source: String,
    pub time_of_receipt: String,
    pub form_id: String,
    pub customer_id: String,
    pub submission_mark: String,
    pub cas_key: String,
    pub classification_type: String,
    pub business_area: String,
}

/// The routing metadata that ends up in the XML packaged alongside the PDF.
#[derive(Debug, Clone)]
pub struct SubmissionMetadata {
    pub store: bool,
    pub source: String,
    pub time_of_receipt: DateTime<Utc>,
    pub form_id: String,
    pub customer_id: String,
    pub submission_mark: String,
    pub cas_key: String,
    pub classification_type: String,
    pub business_area: String,
}

fn require_non_empty(
    errors: &mut ValidationErrors,
    field: &str,
    value: String,
) -> Option<String> {
    if value.trim().is_empty() {
        errors.push(field, format!("{field}.required"));
        None
    } else {
        Some(value)
    }
}

impl SubmissionMetadata {
    /// Validate every field, accumulating all failures rather than stopping at the first
    /// one, so a single `400` response can report every offending field at once.
    pub fn parse(raw: RawSubmissionMetadata) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let store = match raw.store.trim().parse::<bool>() {
            Ok(b) => Some(b),
            Err(_) => {
                errors.push("metadata.store", "metadata.store.invalid");
                None
            }
        };

        let time_of_receipt = match DateTime::parse_from_rfc3339(raw.time_of_receipt.trim()) {
            Ok(dt) => Some(dt.with_timezone(&Utc)),
            Err(_) => {
                errors.push("metadata.timeOfReceipt", "metadata.timeOfReceipt.invalid");
                None
            }
        };

        let source = require_non_empty(&mut errors, "metadata.source", raw.source);
        let form_id = require_non_empty(&mut errors, "metadata.formId", raw.form_id);
        let customer_id = require_non_empty(&mut errors, "metadata.customerId", raw.customer_id);
        let submission_mark =
            require_non_empty(&mut errors, "metadata.submissionMark", raw.submission_mark);
        let cas_key = require_non_empty(&mut errors, "metadata.casKey", raw.cas_key);
        let classification_type = require_non_empty(
            &mut errors,
            "metadata.classificationType",
            raw.classification_type,
        );
        let business_area =
            require_non_empty(&mut errors, "metadata.businessArea", raw.business_area);

        if !errors.is_empty() {
            return Err(errors);
        }

        // Every `Option` above is `Some` once `errors` is empty.
        Ok(Self {
            store: store.expect("validated"),
            source: source.expect("validated"),
            time_of_receipt: time_of_receipt.expect("validated"),
            form_id: form_id.expect("validated"),
            customer_id: customer_id.expect("validated"),
            submission_mark: submission_mark.expect("validated"),
            cas_key: cas_key.expect("validated"),
            classification_type: classification_type.expect("validated"),
            business_area: business_area.expect("validated"),
        })
    }
}
