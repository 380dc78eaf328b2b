//! Login, authentication, refresh and logout over the in-memory store.

mod common;

use common::{Harness, PASSWORD, client, login_request};
use std::time::Duration as StdDuration;
use talenthub_auth::{AuthError, RefreshRequest, Session, SessionConfig, SessionStore, TokenKind};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

fn stored_session(candidate_id: Uuid, access_in: Duration, refresh_in: Duration) -> Session {
    let now = OffsetDateTime::now_utc();
    Session {
        id: Uuid::new_v4(),
        candidate_id,
        access_token: format!("access-{}", Uuid::new_v4().simple()),
        refresh_token: format!("refresh-{}", Uuid::new_v4().simple()),
        access_token_expires_at: now + access_in,
        refresh_token_expires_at: now + refresh_in,
        client: client("stored"),
        created_at: now - Duration::days(1),
        updated_at: now - Duration::days(1),
    }
}

#[tokio::test]
async fn test_login_then_authenticate() {
    let h = Harness::new();
    let candidate = h.register("user@test.com", "").await;

    let session = h
        .sessions
        .login(login_request("user@test.com", PASSWORD))
        .await
        .unwrap();
    assert_eq!(session.candidate_id, candidate.id);
    assert_ne!(session.access_token, session.refresh_token);
    assert_eq!(session.client.user_agent, "test-agent/1.0");

    let authenticated = h.sessions.authenticate(&session.access_token).await.unwrap();
    assert_eq!(authenticated.candidate.id, candidate.id);
    assert_eq!(authenticated.session_id, session.id);
}

#[tokio::test]
async fn test_login_identifier_is_normalized() {
    let h = Harness::new();
    let candidate = h.register("user@test.com", "0812-3456-7890").await;

    let by_email = h
        .sessions
        .login(login_request("  USER@Test.com ", PASSWORD))
        .await
        .unwrap();
    assert_eq!(by_email.candidate_id, candidate.id);

    let by_phone = h
        .sessions
        .login(login_request("0812 3456 7890", PASSWORD))
        .await
        .unwrap();
    assert_eq!(by_phone.candidate_id, candidate.id);

    let international = h
        .sessions
        .login(login_request("+6281234567890", PASSWORD))
        .await
        .unwrap();
    assert_eq!(international.candidate_id, candidate.id);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let h = Harness::new();
    h.register("user@test.com", "").await;

    let wrong_password = h
        .sessions
        .login(login_request("user@test.com", "not-the-password"))
        .await
        .unwrap_err();
    let unknown = h
        .sessions
        .login(login_request("nobody@test.com", PASSWORD))
        .await
        .unwrap_err();

    assert!(matches!(wrong_password, AuthError::Unauthorized));
    assert!(matches!(unknown, AuthError::Unauthorized));
    assert_eq!(wrong_password.public_message(), unknown.public_message());
    assert_eq!(h.store.session_count(), 0);
}

#[tokio::test]
async fn test_login_rejects_malformed_identifier() {
    let h = Harness::new();

    let err = h
        .sessions
        .login(login_request("not an email@", PASSWORD))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidInput { .. }));

    let err = h.sessions.login(login_request("  ", PASSWORD)).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidInput { .. }));
}

#[tokio::test]
async fn test_access_token_expiry_follows_configured_duration() {
    let h = Harness::with_config(SessionConfig {
        access_token_duration: StdDuration::from_secs(3600),
        ..SessionConfig::default()
    });
    h.register("user@test.com", "").await;

    let session = h
        .sessions
        .login(login_request("user@test.com", PASSWORD))
        .await
        .unwrap();

    let expected = OffsetDateTime::now_utc() + Duration::hours(1);
    assert!((session.access_token_expires_at - expected).abs() < Duration::seconds(1));
    assert!(session.refresh_token_expires_at > session.access_token_expires_at);
}

#[tokio::test]
async fn test_refresh_token_does_not_authenticate() {
    let h = Harness::new();
    h.register("user@test.com", "").await;
    let session = h
        .sessions
        .login(login_request("user@test.com", PASSWORD))
        .await
        .unwrap();

    let err = h
        .sessions
        .authenticate(&session.refresh_token)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::NotFound { .. }));
}

#[tokio::test]
async fn test_refresh_rotates_the_pair() {
    let h = Harness::new();
    h.register("user@test.com", "").await;
    let original = h
        .sessions
        .login(login_request("user@test.com", PASSWORD))
        .await
        .unwrap();

    let rotated = h
        .sessions
        .refresh(RefreshRequest {
            refresh_token: original.refresh_token.clone(),
            client: client("test-agent/2.0"),
        })
        .await
        .unwrap();

    assert_eq!(rotated.id, original.id);
    assert_ne!(rotated.access_token, original.access_token);
    assert_ne!(rotated.refresh_token, original.refresh_token);
    assert_eq!(rotated.client.user_agent, "test-agent/2.0");
    assert!(rotated.refresh_token_expires_at >= original.refresh_token_expires_at);

    let old_access = h
        .sessions
        .authenticate(&original.access_token)
        .await
        .unwrap_err();
    assert!(matches!(
        old_access,
        AuthError::NotFound { .. } | AuthError::TokenExpired { .. }
    ));

    let authenticated = h.sessions.authenticate(&rotated.access_token).await.unwrap();
    assert_eq!(authenticated.session_id, original.id);

    let replay = h
        .sessions
        .refresh(RefreshRequest {
            refresh_token: original.refresh_token.clone(),
            client: client("replay"),
        })
        .await
        .unwrap_err();
    assert!(matches!(replay, AuthError::NotFound { .. }));
}

#[tokio::test]
async fn test_refresh_with_expired_token_leaves_row_unchanged() {
    let h = Harness::new();
    let candidate = h.register("user@test.com", "").await;
    let expired = stored_session(candidate.id, -Duration::hours(2), -Duration::seconds(1));
    SessionStore::create(&h.store, &expired).await.unwrap();

    let err = h
        .sessions
        .refresh(RefreshRequest {
            refresh_token: expired.refresh_token.clone(),
            client: client("late"),
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AuthError::TokenExpired {
            kind: TokenKind::Refresh
        }
    ));

    let rows = h.store.sessions_of(candidate.id);
    assert_eq!(rows, vec![expired]);
}

#[tokio::test]
async fn test_expired_access_token_is_rejected() {
    let h = Harness::new();
    let candidate = h.register("user@test.com", "").await;
    let stale = stored_session(candidate.id, -Duration::seconds(1), Duration::days(30));
    SessionStore::create(&h.store, &stale).await.unwrap();

    let err = h.sessions.authenticate(&stale.access_token).await.unwrap_err();
    assert!(matches!(
        err,
        AuthError::TokenExpired {
            kind: TokenKind::Access
        }
    ));

    // The refresh token is still good.
    let rotated = h
        .sessions
        .refresh(RefreshRequest {
            refresh_token: stale.refresh_token.clone(),
            client: client("renewed"),
        })
        .await
        .unwrap();
    h.sessions.authenticate(&rotated.access_token).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_refresh_has_one_winner() {
    let h = Harness::new();
    h.register("user@test.com", "").await;
    let session = h
        .sessions
        .login(login_request("user@test.com", PASSWORD))
        .await
        .unwrap();

    let request = || RefreshRequest {
        refresh_token: session.refresh_token.clone(),
        client: client("racer"),
    };
    let (a, b) = tokio::join!(h.sessions.refresh(request()), h.sessions.refresh(request()));

    let outcomes = [a, b];
    let winners = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(
        outcomes
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, AuthError::NotFound { .. }))
    );
}

#[tokio::test]
async fn test_logout_revokes_session() {
    let h = Harness::new();
    h.register("user@test.com", "").await;
    let session = h
        .sessions
        .login(login_request("user@test.com", PASSWORD))
        .await
        .unwrap();

    h.sessions.logout(session.id).await.unwrap();

    let err = h.sessions.authenticate(&session.access_token).await.unwrap_err();
    assert!(matches!(err, AuthError::NotFound { .. }));

    let err = h
        .sessions
        .refresh(RefreshRequest {
            refresh_token: session.refresh_token.clone(),
            client: client("after-logout"),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::NotFound { .. }));

    let err = h.sessions.logout(session.id).await.unwrap_err();
    assert!(matches!(err, AuthError::NotFound { .. }));
}

#[tokio::test]
async fn test_logout_unknown_session() {
    let h = Harness::new();
    let err = h.sessions.logout(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AuthError::NotFound { .. }));
    assert!(err.is_client_error());
}

#[tokio::test]
async fn test_cached_session_authenticates_while_store_is_down() {
    let h = Harness::new();
    h.register("user@test.com", "").await;
    let session = h
        .sessions
        .login(login_request("user@test.com", PASSWORD))
        .await
        .unwrap();

    h.store.set_unavailable(true);

    let authenticated = h.sessions.authenticate(&session.access_token).await.unwrap();
    assert_eq!(authenticated.session_id, session.id);

    let err = h
        .sessions
        .login(login_request("other@test.com", PASSWORD))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Storage { .. }));
    assert!(err.is_server_error());
    assert_eq!(err.public_message(), "internal server error");
}

#[tokio::test]
async fn test_lifecycle_without_cache() {
    let h = Harness::uncached();
    h.register("user@test.com", "").await;

    let session = h
        .sessions
        .login(login_request("user@test.com", PASSWORD))
        .await
        .unwrap();
    h.sessions.authenticate(&session.access_token).await.unwrap();

    let rotated = h
        .sessions
        .refresh(RefreshRequest {
            refresh_token: session.refresh_token.clone(),
            client: client("uncached"),
        })
        .await
        .unwrap();
    assert!(h.sessions.authenticate(&session.access_token).await.is_err());
    h.sessions.authenticate(&rotated.access_token).await.unwrap();

    h.sessions.logout(rotated.id).await.unwrap();
    assert_eq!(h.store.session_count(), 0);
}
