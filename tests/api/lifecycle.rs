use std::time::Duration;

use wiremock::matchers::method;
use wiremock::matchers::path;
use wiremock::matchers::path_regex;
use wiremock::Mock;
use wiremock::ResponseTemplate;

use crate::helpers::spawn_app;
use crate::helpers::TestApp;

async fn wait_for_status(
    app: &TestApp,
    id: &str,
    expected: &str,
) -> String {
    let mut last_seen = "<never observed>".to_string();
    for _ in 0..40 {
        if let Some((status, reason)) = app.get_submission("internal", id).await {
            last_seen = status.clone();
            if status == expected {
                return reason;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("timed out waiting for submission {id} to reach {expected}; last seen: {last_seen}");
}

/// Scenario 1: happy path. SDES accepts the hand-off, then (simulating SDES's
/// asynchronous report) the test itself posts the `Processed` outcome to
/// `/sdes-callback`; the callback worker should then deliver it to the client's
/// callback endpoint and the item should land in `Completed`.
#[tokio::test]
async fn happy_path_ends_completed_with_processed_callback() {
    let app = spawn_app().await;

    Mock::given(method("PUT"))
        .and(path_regex(r"^/.+\.zip$"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&app.object_store_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/notify"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&app.sdes_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/cb"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&app.callback_server)
        .await;

    let submit_resp = app.post_submit().callback_url(&format!("{}/cb", app.callback_server.uri())).send().await;
    assert_eq!(submit_resp.status().as_u16(), 202);
    let body: serde_json::Value = submit_resp.json().await.unwrap();
    let id = body["id"].as_str().unwrap().to_string();

    wait_for_status(&app, &id, "Forwarded").await;

    let row = sqlx::query!("SELECT sdes_correlation_id FROM submission_item WHERE id = $1", id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    let callback_resp = app
        .post_sdes_callback(serde_json::json!({
            "correlationId": row.sdes_correlation_id,
            "status": "Processed",
        }))
        .await;
    assert_eq!(callback_resp.status().as_u16(), 200);

    wait_for_status(&app, &id, "Completed").await;

    let requests = app.callback_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let sent: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(sent["status"], "Processed");
}

/// Scenario 3: the callback endpoint never answers successfully. Once
/// `failedItemWorkerMaxFailures` attempts have been recorded, the failure worker
/// promotes the item to `CallbackFailed` and the callback worker stops retrying.
#[tokio::test]
async fn exhausted_callback_retries_promote_to_callback_failed() {
    let app = spawn_app().await;

    Mock::given(method("PUT"))
        .and(path_regex(r"^/.+\.zip$"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&app.object_store_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/notify"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&app.sdes_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/cb"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&app.callback_server)
        .await;

    let submit_resp = app.post_submit().callback_url(&format!("{}/cb", app.callback_server.uri())).send().await;
    let body: serde_json::Value = submit_resp.json().await.unwrap();
    let id = body["id"].as_str().unwrap().to_string();

    wait_for_status(&app, &id, "Forwarded").await;

    let row = sqlx::query!("SELECT sdes_correlation_id FROM submission_item WHERE id = $1", id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    app.post_sdes_callback(serde_json::json!({
        "correlationId": row.sdes_correlation_id,
        "status": "Processed",
    }))
    .await;

    wait_for_status(&app, &id, "CallbackFailed").await;

    let attempts_before = app.callback_server.received_requests().await.unwrap().len();
    tokio::time::sleep(Duration::from_millis(200)).await;
    let attempts_after = app.callback_server.received_requests().await.unwrap().len();
    assert_eq!(attempts_before, attempts_after, "callback worker must not retry a CallbackFailed item");
}

/// Scenario 5: an item whose lock has expired (e.g. its worker crashed
/// mid-attempt) is picked up again by the next tick rather than starved forever.
#[tokio::test]
async fn item_with_expired_lock_is_retried() {
    let app = spawn_app().await;

    Mock::given(method("PUT"))
        .and(path_regex(r"^/.+\.zip$"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&app.object_store_server)
        .await;

    let submit_resp = app.post_submit().send().await;
    let body: serde_json::Value = submit_resp.json().await.unwrap();
    let id = body["id"].as_str().unwrap().to_string();

    // Simulate a crashed worker: lock the row far enough in the past that its TTL
    // has already elapsed, without ever notifying SDES.
    sqlx::query!(
        "UPDATE submission_item SET locked_at = now() - interval '1 hour' WHERE id = $1",
        id,
    )
    .execute(&app.pool)
    .await
    .unwrap();

    Mock::given(method("POST"))
        .and(path("/notify"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&app.sdes_server)
        .await;

    wait_for_status(&app, &id, "Forwarded").await;
}
