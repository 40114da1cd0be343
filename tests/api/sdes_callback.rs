use uuid::Uuid;
use wiremock::matchers::method;
use wiremock::matchers::path_regex;
use wiremock::Mock;
use wiremock::ResponseTemplate;

use crate::helpers::spawn_app;

#[tokio::test]
async fn unknown_correlation_id_returns_404() {
    let app = spawn_app().await;

    let resp = app
        .post_sdes_callback(serde_json::json!({
            "correlationId": Uuid::new_v4(),
            "status": "Processed",
        }))
        .await;

    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn submitted_to_completed_is_illegal_and_returns_409() {
    let app = spawn_app().await;

    Mock::given(method("PUT"))
        .and(path_regex(r"^/.+\.zip$"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&app.object_store_server)
        .await;

    let submit_resp = app.post_submit().send().await;
    assert_eq!(submit_resp.status().as_u16(), 202);
    let body: serde_json::Value = submit_resp.json().await.unwrap();
    let id = body["id"].as_str().unwrap();

    let row = sqlx::query!(
        "SELECT sdes_correlation_id FROM submission_item WHERE id = $1",
        id
    )
    .fetch_one(&app.pool)
    .await
    .unwrap();

    let resp = app
        .post_sdes_callback(serde_json::json!({
            "correlationId": row.sdes_correlation_id,
            "status": "Completed",
        }))
        .await;

    // "Completed" isn't a legal inbound SDES status at all.
    assert_eq!(resp.status().as_u16(), 409);
}

#[tokio::test]
async fn processed_to_failed_after_forwarded_is_accepted() {
    let app = spawn_app().await;

    Mock::given(method("PUT"))
        .and(path_regex(r"^/.+\.zip$"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&app.object_store_server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/notify$"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&app.sdes_server)
        .await;

    let submit_resp = app.post_submit().send().await;
    let body: serde_json::Value = submit_resp.json().await.unwrap();
    let id = body["id"].as_str().unwrap();

    let row = sqlx::query!(
        "SELECT sdes_correlation_id FROM submission_item WHERE id = $1",
        id
    )
    .fetch_one(&app.pool)
    .await
    .unwrap();

    // wait for the SDES worker to forward the item before it can legally accept
    // the inbound Processed/Failed report.
    wait_for_status(&app, id, "Forwarded").await;

    let resp = app
        .post_sdes_callback(serde_json::json!({
            "correlationId": row.sdes_correlation_id,
            "status": "Failed",
            "failureReason": "rejected by downstream validation",
        }))
        .await;

    assert_eq!(resp.status().as_u16(), 200);
    let (status, failure_reason) = app.get_submission("internal", id).await.unwrap();
    assert_eq!(status, "Failed");
    assert_eq!(failure_reason, "rejected by downstream validation");
}

async fn wait_for_status(
    app: &crate::helpers::TestApp,
    id: &str,
    expected: &str,
) {
    for _ in 0..20 {
        if let Some((status, _)) = app.get_submission("internal", id).await {
            if status == expected {
                return;
            }
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
    panic!("timed out waiting for submission {id} to reach status {expected}");
}
