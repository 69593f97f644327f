//! End-to-end session flows against the in-memory providers.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use staffdesk_auth::SessionService;
use staffdesk_auth::memory::{LookupBehavior, MemoryIdentityProvider, MemoryPermissionLookup};
use staffdesk_auth::permission::RecordState;
use staffdesk_core::config::SessionConfig;
use staffdesk_core::error::ErrorKind;
use staffdesk_core::types::{AuthErrorTag, AuthStatus, PermissionRow, StaffId, StaffStatus, UserId};

fn row(staff_id: &str, reply: bool, content: bool, meetings: bool) -> PermissionRow {
    PermissionRow {
        staff_id: Some(staff_id.to_string()),
        can_reply_tickets: Some(reply),
        can_manage_content: Some(content),
        can_attend_meetings: Some(meetings),
    }
}

struct Env {
    identity: Arc<MemoryIdentityProvider>,
    lookup: Arc<MemoryPermissionLookup>,
}

impl Env {
    async fn new() -> Self {
        let identity = Arc::new(MemoryIdentityProvider::new(16));
        identity.add_account("agent@example.com", "hunter2", "U1").await;
        identity.add_account("second@example.com", "hunter3", "U2").await;
        Self {
            identity,
            lookup: Arc::new(MemoryPermissionLookup::new().with_latency(Duration::from_millis(50))),
        }
    }

    fn start(&self, config: &SessionConfig) -> SessionService {
        SessionService::start(self.identity.clone(), self.lookup.clone(), config)
            .expect("service should start")
    }
}

/// Lets spawned tasks run; with paused time this also advances the clock.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

#[tokio::test(start_paused = true)]
async fn test_no_session_bootstrap() {
    let env = Env::new().await;
    let service = env.start(&SessionConfig::default());

    let snapshot = service.ready().await.unwrap();
    assert_eq!(snapshot.status, AuthStatus::Unauthenticated);
    assert!(!snapshot.loading);
    assert!(!snapshot.is_staff());
    assert_eq!(env.lookup.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_persisted_staff_session_bootstrap() {
    let env = Env::new().await;
    env.identity.restore_session("agent@example.com").await.unwrap();
    env.lookup.set_rows("U1", vec![row("S1", true, false, false)]).await;
    let service = env.start(&SessionConfig::default());

    let snapshot = service.ready().await.unwrap();
    assert_eq!(snapshot.status, AuthStatus::Authenticated);
    assert!(snapshot.is_staff());
    assert_eq!(snapshot.permissions.staff_id, Some(StaffId::new("S1")));
    assert!(snapshot.permissions.can_reply_tickets);
    assert!(!snapshot.permissions.can_manage_content);
    assert!(!snapshot.permissions.can_attend_meetings);
}

#[tokio::test(start_paused = true)]
async fn test_hanging_lookup_fails_closed_at_permission_ceiling() {
    let env = Env::new().await;
    env.identity.restore_session("agent@example.com").await.unwrap();
    env.lookup.set_behavior(LookupBehavior::Hang).await;

    let started = Instant::now();
    let service = env.start(&SessionConfig::default());
    let snapshot = service.ready().await.unwrap();

    assert_eq!(started.elapsed(), Duration::from_millis(5_000));
    assert_eq!(snapshot.status, AuthStatus::Error);
    assert_eq!(snapshot.error, Some(AuthErrorTag::Timeout));
    assert!(!snapshot.is_staff());
}

#[tokio::test(start_paused = true)]
async fn test_bootstrap_ceiling_releases_loading() {
    let env = Env::new().await;
    env.identity.restore_session("agent@example.com").await.unwrap();
    env.lookup.set_behavior(LookupBehavior::Hang).await;
    let config = SessionConfig {
        permission_timeout_ms: 20_000,
        ..SessionConfig::default()
    };

    let started = Instant::now();
    let service = env.start(&config);
    let snapshot = service.ready().await.unwrap();

    assert_eq!(started.elapsed(), Duration::from_millis(8_000));
    assert!(!snapshot.loading);
    assert_eq!(snapshot.status, AuthStatus::Authenticated);
    assert_eq!(
        service.resolver().record_state(&UserId::new("U1")),
        RecordState::InFlight
    );
}

#[tokio::test(start_paused = true)]
async fn test_explicit_sign_in_then_refocus_makes_one_call() {
    let env = Env::new().await;
    env.lookup.set_rows("U2", vec![row("S2", true, true, false)]).await;
    let service = env.start(&SessionConfig::default());
    service.ready().await.unwrap();

    let principal = service.sign_in("second@example.com", "hunter3").await.unwrap();
    assert_eq!(principal.user_id, UserId::new("U2"));
    assert!(service.snapshot().loading);

    let snapshot = service.ready().await.unwrap();
    assert!(snapshot.is_staff());
    assert_eq!(snapshot.permissions.staff_id, Some(StaffId::new("S2")));

    // Tab refocus: the provider replays the session and the consumer
    // revalidates. Both are served from the resolved record.
    env.identity.replay_session().await.unwrap();
    settle().await;
    assert!(service.revalidate().await.unwrap());
    settle().await;

    assert!(!service.snapshot().loading);
    assert_eq!(env.lookup.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_sign_out_during_in_flight_resolution() {
    let env = Env::new().await;
    let slow = Arc::new(MemoryPermissionLookup::new().with_latency(Duration::from_millis(2_000)));
    slow.set_rows("U1", vec![row("S1", true, true, true)]).await;
    let service = SessionService::start(env.identity.clone(), slow.clone(), &SessionConfig::default())
        .unwrap();
    service.ready().await.unwrap();

    service.sign_in("agent@example.com", "hunter2").await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(service.resolver().record_state(&UserId::new("U1")), RecordState::InFlight);

    service.sign_out().await.unwrap();
    let snapshot = service.snapshot();
    assert_eq!(snapshot.status, AuthStatus::Unauthenticated);
    assert!(snapshot.principal.is_none());
    assert!(!snapshot.is_staff());

    tokio::time::sleep(Duration::from_millis(2_000)).await;
    let snapshot = service.snapshot();
    assert_eq!(snapshot.status, AuthStatus::Unauthenticated);
    assert!(!snapshot.is_staff());
    assert_eq!(snapshot.permissions, Default::default());
    assert_eq!(service.resolver().record_state(&UserId::new("U1")), RecordState::NotStarted);
}

#[tokio::test(start_paused = true)]
async fn test_soft_failure_keeps_staff_status() {
    let env = Env::new().await;
    env.identity.restore_session("agent@example.com").await.unwrap();
    env.lookup.set_rows("U1", vec![row("S1", true, false, false)]).await;
    let service = env.start(&SessionConfig::default());
    assert!(service.ready().await.unwrap().is_staff());

    env.lookup.set_behavior(LookupBehavior::Fail).await;
    service.resolver().invalidate(&UserId::new("U1"));
    assert!(service.revalidate().await.unwrap());

    let snapshot = service.snapshot();
    assert!(snapshot.is_staff());
    assert_eq!(snapshot.status, AuthStatus::Authenticated);
    assert_eq!(snapshot.error, None);
}

#[tokio::test(start_paused = true)]
async fn test_token_refresh_keeps_ui_quiet() {
    let env = Env::new().await;
    env.identity.restore_session("agent@example.com").await.unwrap();
    env.lookup.set_rows("U1", vec![row("S1", true, false, false)]).await;
    let service = env.start(&SessionConfig::default());
    let before = service.ready().await.unwrap();

    let refreshed = env.identity.refresh_token().await.unwrap();
    settle().await;

    let after = service.snapshot();
    assert_eq!(after.principal, Some(refreshed));
    assert_ne!(after.principal, before.principal);
    assert!(!after.loading);
    assert!(after.is_staff());
    assert_eq!(env.lookup.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_retry_recovers_after_timeout() {
    let env = Env::new().await;
    env.identity.restore_session("agent@example.com").await.unwrap();
    env.lookup.set_behavior(LookupBehavior::Hang).await;
    let service = env.start(&SessionConfig::default());
    assert_eq!(service.ready().await.unwrap().error, Some(AuthErrorTag::Timeout));

    env.lookup.set_behavior(LookupBehavior::Respond).await;
    env.lookup.set_rows("U1", vec![row("S1", false, false, true)]).await;
    assert!(service.retry_permissions().await.unwrap());

    let snapshot = service.snapshot();
    assert_eq!(snapshot.status, AuthStatus::Authenticated);
    assert_eq!(snapshot.error, None);
    assert!(!snapshot.loading);
    assert!(snapshot.permissions.can_attend_meetings);
}

#[tokio::test(start_paused = true)]
async fn test_retry_without_session_is_rejected() {
    let env = Env::new().await;
    let service = env.start(&SessionConfig::default());
    service.ready().await.unwrap();

    let err = service.retry_permissions().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Session);
    assert_eq!(env.lookup.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_credentials_never_reach_provider() {
    let env = Env::new().await;
    let service = env.start(&SessionConfig::default());
    service.ready().await.unwrap();

    let err = service.sign_in("not-an-email", "pw").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    let err = service.sign_in("agent@example.com", "").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    let snapshot = service.snapshot();
    assert!(!snapshot.loading);
    assert_eq!(snapshot.status, AuthStatus::Unauthenticated);
}

#[tokio::test(start_paused = true)]
async fn test_wrong_password_leaves_status_untouched() {
    let env = Env::new().await;
    let service = env.start(&SessionConfig::default());
    service.ready().await.unwrap();

    let err = service.sign_in("agent@example.com", "wrong").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Authentication);

    let snapshot = service.snapshot();
    assert!(!snapshot.loading);
    assert_eq!(snapshot.status, AuthStatus::Unauthenticated);
    assert_eq!(snapshot.error, None);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_config_is_rejected() {
    let env = Env::new().await;
    let config = SessionConfig {
        permission_timeout_ms: 0,
        ..SessionConfig::default()
    };
    let err = SessionService::start(env.identity.clone(), env.lookup.clone(), &config).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test(start_paused = true)]
async fn test_teardown_drops_later_events() {
    let env = Env::new().await;
    let service = env.start(&SessionConfig::default());
    let snapshot = service.ready().await.unwrap();

    service.teardown();
    service.teardown();

    env.identity.restore_session("agent@example.com").await.unwrap();
    env.identity.replay_session().await.unwrap();
    settle().await;

    assert_eq!(service.snapshot(), snapshot);
    assert_eq!(env.lookup.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_switching_back_to_cached_user_drops_other_users_permissions() {
    let env = Env::new().await;
    env.lookup.set_rows("U1", vec![row("S1", true, true, true)]).await;
    let service = env.start(&SessionConfig::default());
    service.ready().await.unwrap();

    service.sign_in("second@example.com", "hunter3").await.unwrap();
    let snapshot = service.ready().await.unwrap();
    assert_eq!(snapshot.staff, StaffStatus::NotStaff);

    service.sign_in("agent@example.com", "hunter2").await.unwrap();
    assert!(service.ready().await.unwrap().is_staff());
    assert_eq!(env.lookup.calls(), 2);

    // The provider switches back to U2 without a sign-out in between.
    env.identity.restore_session("second@example.com").await.unwrap();
    env.identity.replay_session().await.unwrap();
    settle().await;

    let snapshot = service.snapshot();
    assert_eq!(snapshot.user_id(), Some(&UserId::new("U2")));
    assert_eq!(snapshot.staff, StaffStatus::NotStaff);
    assert!(!snapshot.is_staff());
    assert_eq!(snapshot.permissions, Default::default());
    assert_eq!(env.lookup.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_sign_in_waits_for_latest_resolution() {
    let env = Env::new().await;
    env.lookup.set_latency(Duration::from_millis(1_000));
    env.lookup.set_rows("U1", vec![row("S1", true, false, false)]).await;
    let service = env.start(&SessionConfig::default());
    service.ready().await.unwrap();

    let started = Instant::now();
    service.sign_in("agent@example.com", "hunter2").await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    service.sign_in("agent@example.com", "hunter2").await.unwrap();

    let snapshot = service.ready().await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(1_300));
    assert!(snapshot.is_staff());
    assert_eq!(snapshot.status, AuthStatus::Authenticated);
    assert_eq!(env.lookup.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_retry_during_sign_in_keeps_loading_until_retry_settles() {
    let env = Env::new().await;
    env.lookup.set_latency(Duration::from_millis(1_000));
    env.lookup.set_rows("U1", vec![row("S1", true, false, false)]).await;
    let service = env.start(&SessionConfig::default());
    service.ready().await.unwrap();

    service.sign_in("agent@example.com", "hunter2").await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    // The sign-in resolution ends at 1000ms, the retry at 1300ms.
    let (retried, _) = tokio::join!(service.retry_permissions(), async {
        tokio::time::sleep(Duration::from_millis(800)).await;
        assert!(service.snapshot().loading);
    });
    assert!(retried.unwrap());

    let snapshot = service.snapshot();
    assert!(!snapshot.loading);
    assert!(snapshot.is_staff());
    assert_eq!(env.lookup.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_revalidate_joins_in_flight_explicit_resolution() {
    let env = Env::new().await;
    env.lookup.set_latency(Duration::from_millis(1_000));
    env.lookup.set_rows("U1", vec![row("S1", true, false, false)]).await;
    let service = env.start(&SessionConfig::default());
    service.ready().await.unwrap();

    service.sign_in("agent@example.com", "hunter2").await.unwrap();
    settle().await;
    assert_eq!(service.resolver().record_state(&UserId::new("U1")), RecordState::InFlight);

    assert!(service.revalidate().await.unwrap());
    let snapshot = service.ready().await.unwrap();
    assert!(snapshot.is_staff());
    assert_eq!(env.lookup.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_sign_in_lost_to_event_overflow_still_settles() {
    let identity = Arc::new(MemoryIdentityProvider::new(1));
    identity.add_account("agent@example.com", "hunter2", "U1").await;
    let lookup = Arc::new(MemoryPermissionLookup::new().with_latency(Duration::from_millis(50)));
    lookup.set_rows("U1", vec![row("S1", true, false, false)]).await;
    let service = SessionService::start(identity.clone(), lookup.clone(), &SessionConfig::default())
        .unwrap();
    service.ready().await.unwrap();

    // Both events land before the reactor runs; the one-slot channel keeps
    // only the refresh.
    service.sign_in("agent@example.com", "hunter2").await.unwrap();
    identity.refresh_token().await.unwrap();

    let snapshot = tokio::time::timeout(Duration::from_secs(30), service.ready())
        .await
        .expect("loading should clear")
        .unwrap();
    assert_eq!(snapshot.user_id(), Some(&UserId::new("U1")));
    assert!(snapshot.is_staff());
}

#[tokio::test(start_paused = true)]
async fn test_teardown_forgets_permission_records() {
    let env = Env::new().await;
    env.identity.restore_session("agent@example.com").await.unwrap();
    env.lookup.set_rows("U1", vec![row("S1", true, false, false)]).await;
    let service = env.start(&SessionConfig::default());
    service.ready().await.unwrap();
    assert_eq!(
        service.resolver().record_state(&UserId::new("U1")),
        RecordState::Resolved { staff: true }
    );

    service.teardown();
    assert_eq!(service.resolver().record_state(&UserId::new("U1")), RecordState::NotStarted);
}
