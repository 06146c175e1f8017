//! Two devices sharing one account through a single session record.

use chrono::{Duration, Utc};
use std::sync::Arc;
use study_tracker_core::memory::InMemorySessionStore;
use study_tracker_core::{
    DeviceSession, DeviceType, GuardState, GuardTimings, HeartbeatOutcome, SessionGuard,
    SessionStore,
};

#[tokio::test]
async fn second_login_evicts_the_first_device_on_its_next_heartbeat() {
    let store = Arc::new(InMemorySessionStore::default());
    let timings = GuardTimings::default();
    let now = Utc::now();

    let mut device_a = SessionGuard::new(store.clone(), timings);
    device_a
        .claim(DeviceSession::with_device_id("asha", "a1", DeviceType::Web, now))
        .await
        .unwrap();

    let tick = now + Duration::seconds(15);
    assert!(matches!(
        device_a.heartbeat(tick).await.unwrap(),
        HeartbeatOutcome::Renewed(_)
    ));

    let mut device_b = SessionGuard::new(store.clone(), timings);
    device_b
        .claim(DeviceSession::with_device_id("asha", "b2", DeviceType::Mobile, tick))
        .await
        .unwrap();

    let outcome = device_a.heartbeat(tick + Duration::seconds(15)).await.unwrap();
    assert_eq!(
        outcome,
        HeartbeatOutcome::Conflict {
            current_device_id: "b2".to_string()
        }
    );
    assert_eq!(device_a.state(), GuardState::Conflicted);

    // A conflicted guard stops touching the shared record.
    assert_eq!(
        device_a.heartbeat(tick + Duration::seconds(30)).await.unwrap(),
        HeartbeatOutcome::Inactive
    );

    // Forced logout after the delay.
    assert_eq!(timings.logout_delay, std::time::Duration::from_secs(3));
    device_a.logout().await.unwrap();
    assert_eq!(device_a.state(), GuardState::NoSession);
    assert!(device_a.session().is_none());

    // Device B keeps working undisturbed.
    assert!(matches!(
        device_b.heartbeat(tick + Duration::seconds(30)).await.unwrap(),
        HeartbeatOutcome::Renewed(_)
    ));
    assert_eq!(
        store.load("asha").await.unwrap().map(|s| s.device_id),
        Some("b2".to_string())
    );
}

#[tokio::test]
async fn sessions_of_different_users_do_not_interfere() {
    let store = Arc::new(InMemorySessionStore::default());
    let now = Utc::now();

    let mut asha = SessionGuard::new(store.clone(), GuardTimings::default());
    asha.enter("asha", DeviceType::Web, now).await.unwrap();
    let mut ravi = SessionGuard::new(store.clone(), GuardTimings::default());
    ravi.enter("ravi", DeviceType::Web, now).await.unwrap();

    assert!(matches!(
        asha.heartbeat(now).await.unwrap(),
        HeartbeatOutcome::Renewed(_)
    ));
    assert!(matches!(
        ravi.heartbeat(now).await.unwrap(),
        HeartbeatOutcome::Renewed(_)
    ));
}
