mod common;

use common::mock_server::{unreachable_client, AgriMock};

#[tokio::test]
async fn test_crop_history_in_server_order() {
    let mock = AgriMock::start().await;
    mock.mount_fixture("history/crop_valid.json").await;

    let history = mock.authed_client().crop_history(None).await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].prediction["crop"], "Rice");
    assert_eq!(history[1].prediction["crop"], "Mango");
    assert_eq!(history[0].input_data["N"], 90);
    assert!(history[0].created_at > history[1].created_at);
}

#[tokio::test]
async fn test_history_limit_is_forwarded() {
    let mock = AgriMock::start().await;
    mock.mount_fixture("history/crop_valid.json").await;

    mock.authed_client().crop_history(Some(5)).await;
    let requests = mock.server.received_requests().await.unwrap();
    assert_eq!(requests[0].url.query(), Some("limit=5"));
}

#[tokio::test]
async fn test_history_server_error_is_empty() {
    let mock = AgriMock::start().await;
    mock.mount_fixture("history/fertilizer_error.json").await;

    let history = mock.authed_client().fertilizer_history(None).await;
    assert!(history.is_empty());
}

#[tokio::test]
async fn test_history_network_failure_is_empty() {
    let client = unreachable_client().with_token("test_token");

    assert!(client.crop_history(None).await.is_empty());
}

#[tokio::test]
async fn test_disease_history_reads_detections() {
    let mock = AgriMock::start().await;
    mock.mount_fixture("history/disease_valid.json").await;

    let history = mock.authed_client().disease_history(None).await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].prediction["plant"], "Potato");
    assert_eq!(history[0].extra["image_name"], "leaf.jpg");
    assert!(history[0].input_data.is_null());
}
