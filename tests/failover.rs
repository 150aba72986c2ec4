//! Failover behaviour of the storage router against fault-injected stores.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;

use store_router::failover::SwitchReason;
use store_router::router::ExecutorSettings;
use store_router::store::{FaultyStore, LocalStore, PropertyFilter};
use store_router::{Role, RouterConfig, StorageRouter, Store, StoreError};

mod common;

use common::{harness, property, user, CHECK_INTERVAL};

#[tokio::test(start_paused = true)]
async fn test_healthy_primary_never_touches_fallback() {
    let h = harness(true);

    h.router.create_user(&user("alice")).await.unwrap();
    h.router.create_property(&property(1)).await.unwrap();
    let listed = h.router.list_properties(&PropertyFilter::default()).await.unwrap();

    assert_eq!(listed.len(), 1);
    assert_eq!(h.router.active_role(), Role::Primary);
    assert_eq!(h.fallback.total_calls(), 0);
    assert_eq!(h.primary.inner().count_properties().await.unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_connectivity_failure_fails_over_and_retries_once() {
    let h = harness(true);
    h.router.count_properties().await.unwrap();
    assert_eq!(h.router.active_role(), Role::Primary);

    let mut events = h.router.subscribe();
    h.primary.set_down(true);

    let created = h.router.create_property(&property(7)).await.unwrap();
    assert_eq!(created.parcel_id, property(7).parcel_id);

    assert_eq!(h.router.active_role(), Role::Fallback);
    assert_eq!(h.primary.calls("create_property"), 1);
    assert_eq!(h.fallback.calls("create_property"), 1);
    assert_eq!(h.fallback.total_calls(), 1);

    let event = events.try_recv().unwrap();
    assert_eq!((event.from, event.to), (Role::Primary, Role::Fallback));
    assert_eq!(event.reason, SwitchReason::OperationError);
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test(start_paused = true)]
async fn test_operation_error_does_not_fail_over() {
    let h = harness(true);
    h.router.create_user(&user("bob")).await.unwrap();
    let mut events = h.router.subscribe();

    let err = h.router.create_user(&user("bob")).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));

    let err = h.router.update_user(9_999, &user("carol")).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));

    assert_eq!(h.router.active_role(), Role::Primary);
    assert_eq!(h.fallback.total_calls(), 0);
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test(start_paused = true)]
async fn test_fallback_failure_is_not_retried() {
    let h = harness(false);
    h.fallback.set_down(true);

    let err = h.router.list_users().await.unwrap_err();
    assert!(matches!(err, StoreError::Connectivity(_)));
    assert_eq!(h.fallback.calls("list_users"), 1);
    assert_eq!(h.primary.total_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_both_stores_down_reports_unavailable() {
    let h = harness(true);
    h.router.count_users().await.unwrap();

    h.primary.set_down(true);
    h.fallback.set_down(true);

    let err = h.router.get_property(1).await.unwrap_err();
    match err {
        StoreError::Unavailable { primary, fallback } => {
            assert!(primary.is_connectivity());
            assert!(fallback.is_connectivity());
        }
        other => panic!("expected Unavailable, got {other:?}"),
    }
    // Exactly two invocations for the logical operation.
    assert_eq!(h.primary.calls("get_property"), 1);
    assert_eq!(h.fallback.calls("get_property"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_operation_error_on_retry_is_returned_as_is() {
    let h = harness(true);
    h.router.count_users().await.unwrap();
    h.fallback.inner().create_user(&user("dave")).await.unwrap();

    h.primary.set_down(true);
    let err = h.router.create_user(&user("dave")).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));
    assert_eq!(h.router.active_role(), Role::Fallback);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_counts_as_connectivity() {
    let h = harness(true);
    h.router.count_users().await.unwrap();

    h.primary.set_latency(Duration::from_secs(10));
    let users = h.router.list_users().await.unwrap();

    assert!(users.is_empty());
    assert_eq!(h.router.active_role(), Role::Fallback);
    assert_eq!(h.fallback.calls("list_users"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_probes_are_rate_limited_under_load() {
    let h = harness(true);

    for n in 0..50 {
        h.router.create_property(&property(n)).await.unwrap();
    }
    assert_eq!(h.primary.calls("count_users"), 1);

    tokio::time::advance(CHECK_INTERVAL + Duration::from_secs(1)).await;
    h.router.count_properties().await.unwrap();
    assert_eq!(h.primary.calls("count_users"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_probe_demotes_unreachable_primary() {
    let h = harness(true);
    h.router.count_properties().await.unwrap();
    let mut events = h.router.subscribe();

    h.primary.set_down(true);
    tokio::time::advance(CHECK_INTERVAL + Duration::from_secs(1)).await;

    h.router.create_user(&user("erin")).await.unwrap();

    let event = events.try_recv().unwrap();
    assert_eq!(event.reason, SwitchReason::Probe);
    assert_eq!(event.to, Role::Fallback);
    // The probe caught it; the data call went straight to the fallback.
    assert_eq!(h.primary.data_calls(), 1);
    assert_eq!(h.fallback.calls("create_user"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_no_promotion_without_fresh_probe() {
    let h = harness(true);
    h.router.count_users().await.unwrap();
    h.primary.set_down(true);
    h.router.count_users().await.unwrap();
    assert_eq!(h.router.active_role(), Role::Fallback);

    // Primary is back, but the window has not elapsed.
    h.primary.set_down(false);
    tokio::time::advance(CHECK_INTERVAL / 2).await;
    for _ in 0..5 {
        h.router.list_users().await.unwrap();
    }
    assert_eq!(h.router.active_role(), Role::Fallback);
    assert_eq!(h.primary.calls("list_users"), 0);
}

/// Scenario A: primary unconfigured at start.
#[tokio::test(start_paused = true)]
async fn test_unconfigured_primary_stays_on_fallback() {
    let h = harness(false);

    let created = h.router.create_property(&property(1)).await.unwrap();
    assert_eq!(created.parcel_id, property(1).parcel_id);

    for _ in 0..3 {
        tokio::time::advance(CHECK_INTERVAL * 2).await;
        h.router.count_properties().await.unwrap();
    }

    assert_eq!(h.router.active_role(), Role::Fallback);
    assert_eq!(h.router.failover_state().switch_count, 0);
    assert_eq!(h.primary.total_calls(), 0);
}

/// Scenario B: outage on the 5th call moves calls 5 onward to the fallback.
#[tokio::test(start_paused = true)]
async fn test_outage_mid_stream() {
    let h = harness(true);

    h.router.create_property(&property(1)).await.unwrap();
    assert_eq!(h.router.active_role(), Role::Primary);
    let mut events = h.router.subscribe();

    for n in 2..=4 {
        h.router.create_property(&property(n)).await.unwrap();
        assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    }
    assert_eq!(h.fallback.total_calls(), 0);

    h.primary.set_down(true);
    for n in 5..=10 {
        h.router.create_property(&property(n)).await.unwrap();
        assert_eq!(h.router.active_role(), Role::Fallback);
        if n == 5 {
            let event = events.try_recv().unwrap();
            assert_eq!(event.reason, SwitchReason::OperationError);
        } else {
            assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
        }
    }

    assert_eq!(h.primary.inner().count_properties().await.unwrap(), 4);
    assert_eq!(h.fallback.inner().count_properties().await.unwrap(), 6);
    // Calls 6..=10 never reached the primary.
    assert_eq!(h.primary.calls("create_property"), 5);
}

/// Scenario C: primary recovers and the next due probe promotes it.
#[tokio::test(start_paused = true)]
async fn test_recovery_promotes_on_same_call() {
    let h = harness(true);
    h.router.count_users().await.unwrap();
    h.primary.set_down(true);
    h.router.count_users().await.unwrap();
    assert_eq!(h.router.active_role(), Role::Fallback);

    h.primary.set_down(false);
    tokio::time::advance(CHECK_INTERVAL + Duration::from_secs(1)).await;
    let mut events = h.router.subscribe();
    let fallback_before = h.fallback.total_calls();

    h.router.create_user(&user("frank")).await.unwrap();

    assert_eq!(h.router.active_role(), Role::Primary);
    assert_eq!(h.primary.calls("create_user"), 1);
    assert_eq!(h.fallback.total_calls(), fallback_before);

    let event = events.try_recv().unwrap();
    assert_eq!((event.from, event.to), (Role::Fallback, Role::Primary));
    assert_eq!(event.reason, SwitchReason::Probe);
}

/// Scenario D: concurrent calls racing into a primary failure.
#[tokio::test(start_paused = true)]
async fn test_concurrent_failures_converge() {
    let h = harness(true);
    h.router.count_users().await.unwrap();
    let mut events = h.router.subscribe();

    h.primary.set_latency(Duration::from_millis(100));
    h.primary.set_down(true);

    let tasks: Vec<_> = (1..=2)
        .map(|n| {
            let router = h.router.clone();
            tokio::spawn(async move { router.create_property(&property(n)).await })
        })
        .collect();

    for task in tasks {
        let created = task.await.unwrap().unwrap();
        assert!(created.parcel_id.starts_with("1-0000"));
    }

    assert_eq!(h.router.active_role(), Role::Fallback);
    assert_eq!(h.router.failover_state().switch_count, 2);
    assert_eq!(h.primary.calls("create_property"), 2);
    assert_eq!(h.fallback.inner().count_properties().await.unwrap(), 2);

    let event = events.try_recv().unwrap();
    assert_eq!(event.reason, SwitchReason::OperationError);
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test(start_paused = true)]
async fn test_backend_check_acts_on_fresh_probe() {
    let h = harness(true);
    let mut events = h.router.subscribe();

    let [primary, fallback] = h.router.check_backends().await;
    assert!(primary.configured);
    assert_eq!(primary.probes, 1);
    assert_eq!(fallback.probes, 1);

    assert_eq!(h.router.active_role(), Role::Primary);
    assert_eq!(events.try_recv().unwrap().reason, SwitchReason::Probe);

    // Inside the window the next call neither probes nor switches.
    h.router.list_users().await.unwrap();
    assert_eq!(h.primary.calls("count_users"), 1);
    assert_eq!(h.primary.calls("list_users"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_fallback_only_router_never_uses_primary_slot() {
    let local = Arc::new(FaultyStore::new("local", LocalStore::default()));
    let router = StorageRouter::fallback_only(local.clone(), ExecutorSettings::default());

    router.create_user(&user("heidi")).await.unwrap();
    tokio::time::advance(Duration::from_secs(120)).await;
    router.list_users().await.unwrap();

    assert_eq!(router.active_role(), Role::Fallback);
    assert_eq!(router.failover_state().switch_count, 0);
    // Only the two data calls; no reachability check through the primary slot.
    assert_eq!(local.calls("count_users"), 0);
    assert_eq!(local.total_calls(), 2);

    let [primary, _] = router.health();
    assert!(!primary.configured);
    assert_eq!(primary.probes, 0);
}

#[tokio::test(start_paused = true)]
async fn test_from_config_honours_primary_url() {
    let primary = Arc::new(FaultyStore::new("primary", LocalStore::default()));
    let fallback = Arc::new(FaultyStore::new("fallback", LocalStore::default()));

    let unset = StorageRouter::from_config(&RouterConfig::default(), primary.clone(), fallback.clone());
    unset.count_properties().await.unwrap();
    assert_eq!(unset.active_role(), Role::Fallback);
    assert_eq!(primary.total_calls(), 0);

    let mut config = RouterConfig::default();
    config.primary.url = Some("postgres://assessor@db.internal/costs".to_string());
    let set = StorageRouter::from_config(&config, primary.clone(), fallback);
    set.count_properties().await.unwrap();
    assert_eq!(set.active_role(), Role::Primary);
    assert_eq!(primary.calls("count_properties"), 1);
}
