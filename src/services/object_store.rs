use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use md5::Digest;
use md5::Md5;
use reqwest::Client;

use crate::domain::ObjectSummary;

/// Thin HTTP adapter over the external object store. Establishing a connection is
/// expensive, so `Client` is kept at the top level (in `web::Data`) and cloned into
/// each `ObjectStoreClient`, same as the teacher's `EmailClient`.
pub struct ObjectStoreClient {
    http_client: Client,
    base_url: String,
}

impl ObjectStoreClient {
    pub fn new(
        base_url: String,
        timeout: Duration,
    ) -> Self {
        let http_client = Client::builder().timeout(timeout).build().expect("failed to build reqwest client");
        Self { http_client, base_url }
    }

    /// Upload `bytes` at `{base_url}/{location}`, returning the summary the
    /// repository stores on the `SubmissionItem`.
    #[tracing::instrument(skip(self, bytes), fields(location = %location, bytes = bytes.len()))]
    pub async fn upload(
        &self,
        location: &str,
        bytes: Vec<u8>,
    ) -> Result<ObjectSummary, anyhow::Error> {
        let content_length = bytes.len() as i64;
        let content_md5 = STANDARD.encode(Md5::digest(&bytes));

        let response = self
            .http_client
            .put(format!("{}/{}", self.base_url, location))
            .header("Content-MD5", &content_md5)
            .body(bytes)
            .send()
            .await?
            .error_for_status()?;

        let last_modified = response
            .headers()
            .get(reqwest::header::LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| chrono::DateTime::parse_from_rfc2822(v).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        Ok(ObjectSummary {
            location: location.to_string(),
            content_length,
            content_md5,
            last_modified,
        })
    }
}
