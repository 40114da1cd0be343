use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::ObjectSummary;

/// Thin HTTP adapter for the downstream Secure Data Exchange Service. `notify`
/// hands SDES the object-store location of a freshly uploaded submission; SDES
/// reports the processing outcome asynchronously via the inbound `/sdes-callback`
/// endpoint, not as this call's response.
pub struct SdesClient {
    http_client: Client,
    base_url: String,
    information_type: String,
    recipient_or_sender: String,
    object_store_location_prefix: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NotifyRequest<'a> {
    correlation_id: Uuid,
    information_type: &'a str,
    recipient_or_sender: &'a str,
    object_store_location: String,
    content_length: i64,
    content_md5: &'a str,
}

impl SdesClient {
    pub fn new(
        base_url: String,
        timeout: Duration,
        information_type: String,
        recipient_or_sender: String,
        object_store_location_prefix: String,
    ) -> Self {
        let http_client = Client::builder().timeout(timeout).build().expect("failed to build reqwest client");
        Self { http_client, base_url, information_type, recipient_or_sender, object_store_location_prefix }
    }

    #[tracing::instrument(skip(self, object_summary), fields(correlation_id = %correlation_id))]
    pub async fn notify(
        &self,
        correlation_id: Uuid,
        object_summary: &ObjectSummary,
    ) -> Result<(), anyhow::Error> {
        let request = NotifyRequest {
            correlation_id,
            information_type: &self.information_type,
            recipient_or_sender: &self.recipient_or_sender,
            object_store_location: format!("{}/{}", self.object_store_location_prefix, object_summary.location),
            content_length: object_summary.content_length,
            content_md5: &object_summary.content_md5,
        };

        self.http_client
            .post(format!("{}/notify", self.base_url))
            .json(&request)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
