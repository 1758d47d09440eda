//! Credential flows through the authenticator collaborator

mod common;

use alsession::{
    AimsAccount, AuthenticationOptions, ConsoleSession, MemoryCabinet, SessionClients,
    SessionConfig, SessionError,
};
use common::*;
use std::sync::atomic::Ordering;
use std::sync::Arc;

#[tokio::test]
async fn test_authenticate_with_credentials() {
    let h = harness();
    assert!(!h.session.is_active());

    h.session
        .authenticate(
            "mcnielsen@alertlogic.com",
            "b1gB1rdL!ves!",
            None,
            AuthenticationOptions::default(),
        )
        .await
        .unwrap();

    assert!(h.session.is_active());
    assert_eq!(h.backend.auth_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.session.resolved().await.unwrap().user.id, "12345-ABCDE");
}

#[tokio::test]
async fn test_authenticate_with_session_token() {
    let h = harness();

    h.session
        .authenticate_with_session_token(
            "SOME_ARBITRARY_SESSION_TOKEN",
            "123456",
            AuthenticationOptions::default(),
        )
        .await
        .unwrap();

    assert!(h.session.is_active());
    h.session.deactivate_session();
    assert!(!h.session.is_active());
}

#[tokio::test]
async fn test_authenticate_with_access_token() {
    let h = harness();

    h.session
        .authenticate_with_access_token(
            "SOME_ARBITRARY_ACCESS_TOKEN",
            AuthenticationOptions::default(),
        )
        .await
        .unwrap();

    assert!(h.session.is_active());
    // Token info omits the token; the one presented is kept
    assert_eq!(
        h.session.get_token().as_deref(),
        Some("SOME_ARBITRARY_ACCESS_TOKEN")
    );
}

#[tokio::test]
async fn test_acting_account_and_location_override() {
    let h = harness();
    let fake_account = AimsAccount::new("6710880", "Big Bird & Friends, Inc.");

    h.session
        .authenticate(
            "mcnielsen@alertlogic.com",
            "b1gB1rdL!ves!",
            None,
            AuthenticationOptions {
                acting_account: Some(fake_account.into()),
                location_id: Some("defender-uk-newport".to_string()),
            },
        )
        .await
        .unwrap();

    assert!(h.session.is_active());
    assert_eq!(h.session.get_acting_account_id().as_deref(), Some("6710880"));
    assert_eq!(
        h.session.get_active_datacenter().as_deref(),
        Some("defender-uk-newport")
    );

    let metadata = h.session.resolved().await.unwrap();
    assert_eq!(metadata.acting_account.id, "6710880");
    assert!(metadata.effective_entitlements.has("product-6710880"));
}

#[tokio::test]
async fn test_set_active_datacenter() {
    let h = harness();
    h.session.set_authentication(&example_session()).unwrap();
    assert_eq!(h.session.get_active_datacenter().as_deref(), Some("location-a"));

    h.session.set_active_datacenter("defender-us-ashburn").unwrap();
    assert_eq!(
        h.session.get_active_datacenter().as_deref(),
        Some("defender-us-ashburn")
    );
    assert_eq!(
        h.session.get_session().unwrap().bound_location_id.as_deref(),
        Some("defender-us-ashburn")
    );
}

#[tokio::test]
async fn test_authentication_requires_authenticator() {
    let backend = FakeBackend::new();
    let clients = SessionClients::new(backend.clone(), backend.clone(), backend.clone());
    let session = ConsoleSession::new(
        SessionConfig::default(),
        clients,
        Arc::new(MemoryCabinet::new("al_session")),
    )
    .unwrap();

    let error = session
        .authenticate("user", "password", None, AuthenticationOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(error, SessionError::Authentication { .. }));
    assert_eq!(backend.auth_calls.load(Ordering::SeqCst), 0);
    assert!(!session.is_active());
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let backend = FakeBackend::new();
    let config = SessionConfig {
        resolution_timeout_ms: Some(0),
        ..SessionConfig::default()
    };

    let result = ConsoleSession::new(
        config,
        backend.clients(),
        Arc::new(MemoryCabinet::new("al_session")),
    );
    assert!(result.is_err());
}
