//! Nil markers keep repeated lookups for absent records off the store.

mod common;

use common::{Harness, PASSWORD, login_request};
use talenthub_auth::{AuthError, CandidateStore, keys};
use talenthub_cache::CachedValue;

#[tokio::test]
async fn test_unknown_email_queries_store_once() {
    let h = Harness::new();

    for _ in 0..2 {
        let err = h
            .sessions
            .login(login_request("ghost@test.com", PASSWORD))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized));
    }

    assert_eq!(h.store.query_counts().candidate_by_email, 1);
    assert_eq!(
        h.cache.get(&keys::candidate_email("ghost@test.com")).await,
        Some(CachedValue::Nil)
    );
}

#[tokio::test]
async fn test_unknown_token_queries_store_once() {
    let h = Harness::new();

    for _ in 0..3 {
        let err = h.sessions.authenticate("no-such-token").await.unwrap_err();
        assert!(matches!(err, AuthError::NotFound { .. }));
    }

    // One miss looks in both token columns, later reads hit the nil marker.
    assert_eq!(h.store.query_counts().session_by_token, 2);
}

#[tokio::test]
async fn test_registration_clears_nil_marker() {
    let h = Harness::new();

    let err = h
        .sessions
        .login(login_request("late@test.com", PASSWORD))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Unauthorized));

    let candidate = h.register("late@test.com", "").await;

    let session = h
        .sessions
        .login(login_request("late@test.com", PASSWORD))
        .await
        .unwrap();
    assert_eq!(session.candidate_id, candidate.id);
}

#[tokio::test]
async fn test_repeated_lookups_served_from_cache() {
    let h = Harness::new();
    let candidate = h.register("user@test.com", "").await;
    let before = h.store.query_counts();

    for _ in 0..3 {
        let found = h.candidate_repo.find_by_email("user@test.com").await.unwrap();
        assert_eq!(found.map(|c| c.id), Some(candidate.id));
    }

    let after = h.store.query_counts();
    assert_eq!(after.candidate_by_email - before.candidate_by_email, 1);
    // The record itself was cached when registration read it back.
    assert_eq!(after.candidate_by_id, before.candidate_by_id);
}

#[tokio::test]
async fn test_disabled_cache_always_queries_store() {
    let h = Harness::uncached();

    for _ in 0..2 {
        let err = h
            .sessions
            .login(login_request("ghost@test.com", PASSWORD))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized));
    }

    assert_eq!(h.store.query_counts().candidate_by_email, 2);
    assert_eq!(h.cache.backend_name(), "disabled");
}

#[tokio::test]
async fn test_update_invalidates_old_and_new_identifiers() {
    let h = Harness::new();
    let candidate = h.register("old@test.com", "").await;

    // Cache the old address and a nil marker for the new one.
    assert!(h.candidate_repo.find_by_email("old@test.com").await.unwrap().is_some());
    assert!(h.candidate_repo.find_by_email("new@test.com").await.unwrap().is_none());

    let mut changed = candidate.clone();
    changed.email = Some("new@test.com".to_string());
    h.candidate_repo.update(&changed).await.unwrap();

    assert!(h.candidate_repo.find_by_email("old@test.com").await.unwrap().is_none());
    let found = h
        .candidate_repo
        .find_by_email("new@test.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, candidate.id);
    assert_eq!(found.email.as_deref(), Some("new@test.com"));
}

#[tokio::test]
async fn test_update_of_missing_candidate() {
    let h = Harness::new();
    let candidate = h.register("user@test.com", "").await;

    let mut ghost = candidate.clone();
    ghost.id = uuid::Uuid::new_v4();
    let err = h.candidate_repo.update(&ghost).await.unwrap_err();
    assert!(matches!(err, AuthError::NotFound { .. }));

    // The real record is untouched.
    let stored = CandidateStore::find_by_id(&h.store, candidate.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.email.as_deref(), Some("user@test.com"));
}
