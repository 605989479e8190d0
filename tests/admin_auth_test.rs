mod support;

use std::sync::Arc;

use pixo_backend::config::AdminConfig;
use pixo_backend::error::ErrorCode;
use pixo_backend::services::{AdminAuthService, NotificationService, OtpEngine};

use support::InMemoryOtpStore;

const ADMIN_EMAIL: &str = "admin@pixo.shop";
const PASSWORD: &str = "correct-password";

fn admin_service() -> (Arc<InMemoryOtpStore>, AdminAuthService) {
    let store = Arc::new(InMemoryOtpStore::new());
    let engine = OtpEngine::new(store.clone(), 600);
    let config = AdminConfig {
        password: PASSWORD.to_string(),
        admin_email: ADMIN_EMAIL.to_string(),
        session_secret: "an-admin-session-secret-of-32-chars!".to_string(),
        session_ttl_secs: 3600,
        otp_ttl_secs: 600,
    };
    let service = AdminAuthService::new(engine, NotificationService::new(), config);
    (store, service)
}

#[tokio::test]
async fn wrong_password_issues_nothing() {
    let (store, service) = admin_service();

    let err = service.login("wrong-password").await.unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::Unauthorized);
    assert_eq!(err.user_message(), "Unauthorized");
    assert_eq!(store.len(), 0);
}

#[tokio::test]
async fn full_two_factor_flow_grants_a_session() {
    let (store, service) = admin_service();

    service.login(PASSWORD).await.expect("login should succeed");
    let code = store.live_code(ADMIN_EMAIL).expect("challenge issued");

    // Wrong guess first: no session, challenge survives.
    let wrong = if code == "000000" { "000001" } else { "000000" };
    let err = service.verify(wrong).await.unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::Unauthorized);

    let grant = service.verify(&code).await.expect("correct code grants a session");
    assert!(grant.expires_at > chrono::Utc::now());

    let session = service
        .authorize(&grant.token)
        .expect("granted token should authorize");
    assert_eq!(session.expires_at.timestamp(), grant.expires_at.timestamp());

    // Single-use: replaying the consumed code is rejected.
    let err = service.verify(&code).await.unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::Unauthorized);
}

#[tokio::test]
async fn otp_failure_reasons_are_not_distinguishable_by_callers() {
    let (store, service) = admin_service();
    service.login(PASSWORD).await.unwrap();
    let code = store.live_code(ADMIN_EMAIL).unwrap();

    let wrong = if code == "000000" { "000001" } else { "000000" };
    let mismatch = service.verify(wrong).await.unwrap_err();

    store.expire_live(ADMIN_EMAIL);
    let expired = service.verify(&code).await.unwrap_err();

    assert_eq!(mismatch.user_message(), expired.user_message());
    assert_eq!(mismatch.status_code(), expired.status_code());
}

#[tokio::test]
async fn relogin_supersedes_the_previous_challenge() {
    let (store, service) = admin_service();

    service.login(PASSWORD).await.unwrap();
    let first = store.live_code(ADMIN_EMAIL).unwrap();

    service.login(PASSWORD).await.unwrap();
    let second = store.live_code(ADMIN_EMAIL).unwrap();

    if first != second {
        let err = service.verify(&first).await.unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::Unauthorized);
    }
    service.verify(&second).await.expect("latest code should work");
}

#[tokio::test]
async fn tampered_session_tokens_are_rejected() {
    let (store, service) = admin_service();
    service.login(PASSWORD).await.unwrap();
    let code = store.live_code(ADMIN_EMAIL).unwrap();
    let grant = service.verify(&code).await.unwrap();

    let mut tampered = grant.token.clone();
    let replacement = if tampered.ends_with('A') { 'B' } else { 'A' };
    tampered.pop();
    tampered.push(replacement);

    let err = service.authorize(&tampered).unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::Unauthorized);

    assert!(service.authorize("garbage").is_err());
    assert!(service.authorize("").is_err());
}
