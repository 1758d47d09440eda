//! Detection cycle, readiness and epoch supersession

mod common;

use alsession::{ActingAccountRef, ActingAccountResolvedEvent, SessionError};
use common::*;
use std::sync::{Arc, Mutex};
use tokio_test::{assert_pending, assert_ready_ok};

#[tokio::test]
async fn test_detection_blocks_initially() {
    let h = harness();
    assert!(!h.session.is_detection_complete());

    let mut ready = tokio_test::task::spawn(h.session.ready());
    assert_pending!(ready.poll());
}

#[tokio::test]
async fn test_detection_cycle_without_session() {
    let h = harness();

    h.session.start_detection();
    h.session.end_detection();

    assert!(h.session.is_detection_complete());
    // Nothing to resolve without a session
    let mut ready = tokio_test::task::spawn(h.session.ready());
    assert_ready_ok!(ready.poll());
}

#[tokio::test]
async fn test_restarting_detection_blocks_again() {
    let h = harness();
    h.session.start_detection();
    h.session.end_detection();

    h.session.start_detection();
    assert!(!h.session.is_detection_complete());
    let mut ready = tokio_test::task::spawn(h.session.ready());
    assert_pending!(ready.poll());

    h.session.end_detection();
    assert!(ready.is_woken());
    assert_ready_ok!(ready.poll());
}

#[tokio::test]
async fn test_ready_waits_for_detection_and_resolution() {
    let h = harness();
    h.backend.hold("2");

    h.session.start_detection();
    settle().await;
    h.session.set_authentication(&example_session()).unwrap();
    h.session.end_detection();

    let mut ready = tokio_test::task::spawn(h.session.ready());
    assert_pending!(ready.poll());
    settle().await;
    assert_pending!(ready.poll());

    h.backend.release("2");
    settle().await;
    assert!(ready.is_woken());
    assert_ready_ok!(ready.poll());
    assert!(h.session.is_resolved());
}

#[tokio::test]
async fn test_ready_surfaces_resolution_failure() {
    let h = harness();
    h.backend.fail_for("2");
    h.session.start_detection();
    h.session.set_authentication(&example_session()).unwrap();
    h.session.end_detection();

    let error = h.session.ready().await.unwrap_err();
    assert!(matches!(*error, SessionError::Collaborator { .. }));
}

#[tokio::test]
async fn test_resolution_not_fulfilled_when_unauthenticated() {
    let h = harness();
    assert!(!h.session.is_resolved());

    h.session.set_authentication(&example_session()).unwrap();
    h.session.resolved().await.unwrap();
    assert!(h.session.is_active());
    assert!(h.session.is_resolved());
}

#[tokio::test]
async fn test_waiters_after_rescind_see_only_new_epoch() {
    let h = harness();
    h.session.set_authentication(&example_session()).unwrap();
    let first = h.session.resolved().await.unwrap();
    assert_eq!(first.acting_account.id, "2");

    h.backend.hold("5");
    let change = tokio::spawn({
        let session = h.session.clone();
        async move {
            session
                .set_acting_account(Some(acting_account().into()))
                .await
        }
    });
    settle().await;

    assert!(!h.session.is_resolved());
    assert!(h.session.get_resolved_metadata().is_none());
    let mut waiter = tokio_test::task::spawn(h.session.resolved());
    assert_pending!(waiter.poll());

    h.backend.release("5");
    settle().await;

    let metadata = assert_ready_ok!(waiter.poll());
    assert_eq!(metadata.acting_account.id, "5");
    assert_eq!(change.await.unwrap().unwrap().acting_account.id, "5");
}

#[tokio::test]
async fn test_superseded_resolution_is_discarded() {
    let h = harness();
    h.session.set_authentication(&example_session()).unwrap();
    h.session.resolved().await.unwrap();

    let resolved_events = Arc::new(Mutex::new(Vec::new()));
    {
        let resolved_events = resolved_events.clone();
        h.session
            .notify_stream()
            .attach(move |event: &mut ActingAccountResolvedEvent| {
                resolved_events
                    .lock()
                    .unwrap()
                    .push(event.metadata.acting_account.id.clone());
            });
    }

    // First change stalls on its feature fetch
    h.backend.hold("5");
    let stale = tokio::spawn({
        let session = h.session.clone();
        async move {
            session
                .set_acting_account(Some(acting_account().into()))
                .await
        }
    });
    settle().await;

    // Second change completes while the first is still in flight
    let current = h
        .session
        .set_acting_account(Some(ActingAccountRef::from("67")))
        .await
        .unwrap();
    assert_eq!(current.acting_account.id, "67");

    // The first caller was still waiting; it settles with the newer epoch
    let carried = stale.await.unwrap().unwrap();
    assert_eq!(carried.acting_account.id, "67");

    // Let the stalled fetch finish; its result must have no effect
    h.backend.release("5");
    settle().await;

    let metadata = h.session.get_resolved_metadata().unwrap();
    assert_eq!(metadata.acting_account.id, "67");
    assert_eq!(h.session.get_acting_account_id().as_deref(), Some("67"));
    assert_eq!(*resolved_events.lock().unwrap(), vec!["67".to_string()]);
}
