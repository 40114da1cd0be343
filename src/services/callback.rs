use std::time::Duration;

use reqwest::Client;
use serde::Serialize;

use crate::domain::ObjectSummary;
use crate::domain::SubmissionStatus;

/// Thin HTTP adapter for the outbound client callback. A non-`200` response, or
/// any network-level failure, is surfaced to the caller as an error; the callback
/// worker interprets either as a failed attempt.
pub struct CallbackClient {
    http_client: Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CallbackPayload<'a> {
    id: &'a str,
    status: SubmissionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    object_summary: Option<&'a ObjectSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure_reason: Option<&'a str>,
}

impl CallbackClient {
    pub fn new(timeout: Duration) -> Self {
        let http_client = Client::builder().timeout(timeout).build().expect("failed to build reqwest client");
        Self { http_client }
    }

    #[tracing::instrument(skip(self, object_summary), fields(id = %id, callback_url = %callback_url))]
    pub async fn notify(
        &self,
        callback_url: &str,
        id: &str,
        status: SubmissionStatus,
        object_summary: Option<&ObjectSummary>,
        failure_reason: Option<&str>,
    ) -> Result<(), anyhow::Error> {
        let payload = CallbackPayload { id, status, object_summary, failure_reason };

        self.http_client.post(callback_url).json(&payload).send().await?.error_for_status()?;
        Ok(())
    }
}
