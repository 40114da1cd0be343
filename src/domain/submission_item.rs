use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use super::SubmissionStatus;

/// Snapshot of the uploaded object, as reported by the object store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSummary {
    pub location: String,
    pub content_length: i64,
    /// Base64-encoded MD5 digest, as returned by the object store.
    pub content_md5: String,
    pub last_modified: DateTime<Utc>,
}

/// The durable entity tracked by the repository. Mutated only by workers or by the
/// inbound SDES status-update endpoint; never directly by the caller who submitted it.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionItem {
    pub id: String,
    pub owner: String,
    pub sdes_correlation_id: Uuid,
    pub callback_url: String,
    pub status: SubmissionStatus,
    pub object_summary: Option<ObjectSummary>,
    pub failure_reason: Option<String>,
    pub last_updated: DateTime<Utc>,
    pub locked_at: Option<DateTime<Utc>>,
    pub failure_count: i32,
}

impl SubmissionItem {
    /// Build the replacement the SDES worker hands back to
    /// `lock_and_replace_oldest_by_status` on a successful notify.
    pub fn forwarded(&self) -> Self {
        Self {
            status: SubmissionStatus::Forwarded,
            ..self.clone()
        }
    }

    pub fn completed(&self) -> Self {
        Self {
            status: SubmissionStatus::Completed,
            ..self.clone()
        }
    }

    pub fn with_incremented_failure_count(&self) -> Self {
        Self {
            failure_count: self.failure_count + 1,
            ..self.clone()
        }
    }
}

/// The shape the submit pipeline passes to `Repository::insert`; `last_updated` and
/// `locked_at` are stamped by the repository, never supplied by the caller.
#[derive(Debug, Clone)]
pub struct NewSubmissionItem {
    pub id: String,
    pub owner: String,
    pub sdes_correlation_id: Uuid,
    pub callback_url: String,
    pub object_summary: ObjectSummary,
}
