mod common;

use agridoctor::guard::{guard, GuardDecision, Route};
use agridoctor::session::{AuthSession, MemoryTokenStore};
use agridoctor::types::{Credentials, Registration};
use agridoctor::Error;
use common::mock_server::{unreachable_client, AgriMock};

fn credentials() -> Credentials {
    Credentials::new("farmer@example.com", "hunter22")
}

#[tokio::test]
async fn test_login_sets_user_and_persists_token() {
    let mock = AgriMock::start().await;
    mock.mount_fixture("auth/login_valid.json").await;

    let store = MemoryTokenStore::default();
    let mut session = AuthSession::new(mock.client(), store.clone());
    let user = session.login(&credentials()).await.unwrap();
    assert_eq!(user.email, "farmer@example.com");

    assert_eq!(
        session.current_user().map(|u| u.username.as_str()),
        Some("farmer")
    );
    assert_eq!(session.token(), Some("test_token"));
    assert_eq!(store.peek().as_deref(), Some("test_token"));
}

#[tokio::test]
async fn test_session_survives_reload() {
    let mock = AgriMock::start().await;
    mock.mount_fixture("auth/login_valid.json").await;
    mock.mount_fixture("auth/me_valid.json").await;

    let store = MemoryTokenStore::default();
    let mut first = AuthSession::new(mock.client(), store.clone());
    let logged_in = first.login(&credentials()).await.unwrap().clone();
    drop(first);

    let mut reloaded = AuthSession::new(mock.client(), store.clone());
    assert!(!reloaded.is_resolved());
    let restored = reloaded.restore().await.unwrap().cloned();

    assert_eq!(restored, Some(logged_in));
    assert!(reloaded.is_resolved());
    assert_eq!(reloaded.token(), Some("test_token"));
}

#[tokio::test]
async fn test_restore_without_token_sends_nothing() {
    let mock = AgriMock::start().await;
    mock.forbid_requests().await;

    let mut session = AuthSession::new(mock.client(), MemoryTokenStore::default());
    assert!(session.restore().await.unwrap().is_none());
    assert!(session.is_resolved());
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_restore_with_rejected_token_clears_storage() {
    let mock = AgriMock::start().await;
    mock.mount_fixture("auth/me_expired.json").await;

    let store = MemoryTokenStore::with_token("stale_token");
    let mut session = AuthSession::new(mock.client(), store.clone());
    assert!(session.restore().await.unwrap().is_none());

    assert!(store.peek().is_none());
    assert!(session.token().is_none());
    assert!(session.is_resolved());
}

#[tokio::test]
async fn test_restore_with_deleted_user_clears_storage() {
    let mock = AgriMock::start().await;
    mock.mount_fixture("auth/me_user_missing.json").await;

    let store = MemoryTokenStore::with_token("orphan_token");
    let mut session = AuthSession::new(mock.client(), store.clone());
    assert!(session.restore().await.unwrap().is_none());

    assert!(store.peek().is_none());
    assert!(session.token().is_none());
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_logged_in_user_reaches_protected_pages() {
    let mock = AgriMock::start().await;
    mock.mount_fixture("auth/login_valid.json").await;

    let mut session = AuthSession::new(mock.client(), MemoryTokenStore::default());
    session.login(&credentials()).await.unwrap();

    for route in [
        Route::Dashboard,
        Route::CropRecommendation,
        Route::FertilizerRecommendation,
        Route::DiseaseDetection,
    ] {
        assert_eq!(guard(route, &session), GuardDecision::Render(route));
    }
    assert_eq!(guard(Route::Login, &session), GuardDecision::Render(Route::Login));
}

#[tokio::test]
async fn test_restore_keeps_token_when_service_unreachable() {
    let store = MemoryTokenStore::with_token("test_token");
    let mut session = AuthSession::new(unreachable_client(), store.clone());
    let err = session.restore().await.unwrap_err();

    assert!(matches!(err, Error::Network(_)));
    assert!(session.is_resolved());
    assert!(!session.is_authenticated());
    assert_eq!(store.peek().as_deref(), Some("test_token"));
}

#[tokio::test]
async fn test_login_rejected_is_auth_error() {
    let mock = AgriMock::start().await;
    mock.mount_fixture("auth/login_invalid.json").await;

    let store = MemoryTokenStore::default();
    let mut session = AuthSession::new(mock.client(), store.clone());
    let err = session.login(&credentials()).await.unwrap_err();

    assert!(err.is_auth());
    assert_eq!(
        err.detail_message().as_deref(),
        Some("Incorrect email or password")
    );
    assert!(session.current_user().is_none());
    assert!(store.peek().is_none());
}

#[tokio::test]
async fn test_register_password_mismatch_sends_nothing() {
    let mock = AgriMock::start().await;
    mock.forbid_requests().await;

    let mut session = AuthSession::new(mock.client(), MemoryTokenStore::default());
    let registration = Registration::new("new@example.com", "newfarmer", "secret1", "secret2");
    let err = session.register(&registration).await.unwrap_err();

    assert!(matches!(&err, Error::Validation(msg) if msg == "Passwords do not match"));
}

#[tokio::test]
async fn test_register_short_password_sends_nothing() {
    let mock = AgriMock::start().await;
    mock.forbid_requests().await;

    let mut session = AuthSession::new(mock.client(), MemoryTokenStore::default());
    let registration = Registration::new("new@example.com", "newfarmer", "abc", "abc");
    let err = session.register(&registration).await.unwrap_err();

    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn test_register_valid_logs_in() {
    let mock = AgriMock::start().await;
    mock.mount_fixture_expect("auth/register_valid.json", 1).await;

    let store = MemoryTokenStore::default();
    let mut session = AuthSession::new(mock.client(), store.clone());
    let registration = Registration::new("new@example.com", "newfarmer", "secret1", "secret1");
    let user = session.register(&registration).await.unwrap();

    assert_eq!(user.username, "newfarmer");
    assert!(user.full_name.is_none());
    assert_eq!(store.peek().as_deref(), Some("fresh_token"));
}

#[tokio::test]
async fn test_register_duplicate_is_auth_error() {
    let mock = AgriMock::start().await;
    mock.mount_fixture("auth/register_duplicate.json").await;

    let mut session = AuthSession::new(mock.client(), MemoryTokenStore::default());
    let registration = Registration::new("farmer@example.com", "farmer", "secret1", "secret1")
        .with_full_name("Asha Farmer");
    let err = session.register(&registration).await.unwrap_err();

    assert!(matches!(
        &err,
        Error::Auth { status: 400, message } if message == "Email already registered"
    ));
}

#[tokio::test]
async fn test_logout_twice_matches_logout_once() {
    let mock = AgriMock::start().await;
    mock.mount_fixture("auth/login_valid.json").await;

    let store = MemoryTokenStore::default();
    let mut session = AuthSession::new(mock.client(), store.clone());
    session.login(&credentials()).await.unwrap();

    session.logout().unwrap();
    assert!(session.current_user().is_none());
    assert!(session.token().is_none());
    assert!(store.peek().is_none());

    session.logout().unwrap();
    assert!(session.current_user().is_none());
    assert!(session.token().is_none());
    assert!(store.peek().is_none());
}
