mod callback_url;
mod metadata;
mod submission_item;
mod submission_status;
pub mod validation;

pub use callback_url::CallbackUrl;
pub use callback_url::CallbackUrlError;
pub use metadata::RawSubmissionMetadata;
pub use metadata::SubmissionMetadata;
pub use submission_item::NewSubmissionItem;
pub use submission_item::ObjectSummary;
pub use submission_item::SubmissionItem;
pub use submission_status::SubmissionStatus;
pub use validation::FieldError;
pub use validation::ValidationErrors;
