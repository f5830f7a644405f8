//! End-to-end lifecycle scenarios through the public API.

pub mod common;

use common::harness::TestHarness;
use futures::future::join_all;
use peer_lifecycle::{
    Config, DeviceState, PeerId, StateSet,
    status::{Intent, Status},
    tracker::StateEvent,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn fast_backoff(max_attempts: Option<u32>) -> Config {
    let mut config = Config::default();
    config.reconnect.initial_delay = Duration::from_millis(100);
    config.reconnect.max_delay = Duration::from_secs(1);
    config.reconnect.max_attempts = max_attempts;
    config
}

#[tokio::test(start_paused = true)]
async fn test_many_peers_connect_in_parallel() {
    let harness = TestHarness::new();
    let handles: Vec<_> = (0..16)
        .map(|i| harness.lifecycle.discover(format!("00:00:00:00:00:{:02X}", i)).unwrap())
        .collect();

    let connects = join_all(handles.iter().map(|handle| handle.connect())).await;
    assert!(connects.iter().all(|result| result.is_ok()));

    let states = join_all(handles.iter().map(|handle| handle.wait_for(DeviceState::Initialized))).await;
    for state in states {
        let state = state.unwrap();
        assert!(state.contains(DeviceState::Connected));
        assert!(!state.contains(DeviceState::ConnectingOverall));
    }

    let registry = harness.lifecycle.registry();
    assert_eq!(registry.len(), 16);
    assert!(registry.purgeable_peers().is_empty());
    assert_eq!(harness.transport.connects(), 16);
}

#[tokio::test(start_paused = true)]
async fn test_reconnects_with_backoff_after_link_drop() {
    let harness = TestHarness::with_config(fast_backoff(Some(8)));
    let handle = harness.lifecycle.discover("AA:BB:CC:DD:EE:FF").unwrap();
    let events: Arc<Mutex<Vec<StateEvent<DeviceState>>>> = Arc::default();
    {
        let events = events.clone();
        handle
            .set_observer(move |event: &StateEvent<DeviceState>| events.lock().unwrap().push(*event))
            .await
            .unwrap();
    }

    handle.connect().await.unwrap();
    handle.wait_for(DeviceState::Initialized).await.unwrap();

    harness.transport.fail_next_connects(2);
    harness.drop_link(handle.id(), 8).await;
    handle
        .wait_until(|state| state.contains(DeviceState::AttemptingReconnect))
        .await
        .unwrap();
    let state = handle.wait_for(DeviceState::Initialized).await.unwrap();

    assert!(!state.contains(DeviceState::AttemptingReconnect));
    assert_eq!(harness.transport.connects(), 4);

    let events = events.lock().unwrap();
    let drop = events
        .iter()
        .find(|event| event.status == Status::UnexpectedDisconnect { code: 8 })
        .unwrap();
    assert_eq!(drop.intent, Intent::Unintentional);
    assert!(drop.did_enter(DeviceState::AttemptingReconnect));
    // Each failed attempt goes back to waiting for the next one.
    let retries = events
        .iter()
        .filter(|event| event.did_enter(DeviceState::AttemptingReconnect))
        .count();
    assert_eq!(retries, 3);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_gives_up_after_max_attempts() {
    let harness = TestHarness::with_config(fast_backoff(Some(2)));
    let handle = harness.lifecycle.discover("AA:BB:CC:DD:EE:01").unwrap();

    handle.connect().await.unwrap();
    handle.wait_for(DeviceState::Initialized).await.unwrap();

    harness.transport.fail_next_connects(10);
    harness.drop_link(handle.id(), 8).await;
    let state = handle
        .wait_until(|state| {
            state.contains(DeviceState::Disconnected)
                && !state.contains(DeviceState::AttemptingReconnect)
        })
        .await
        .unwrap();

    assert!(!state.contains(DeviceState::Connected));
    assert_eq!(harness.transport.connects(), 3);
    assert!(harness.lifecycle.registry().is_purgeable(handle.id()).unwrap());

    // Nothing else is scheduled.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(harness.transport.connects(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_purge_idle_then_rediscover() {
    let harness = TestHarness::new();
    let peer = PeerId::from("AA:BB:CC:DD:EE:02");
    let handle = harness.lifecycle.discover(peer.clone()).unwrap();

    handle.connect().await.unwrap();
    handle.wait_for(DeviceState::Initialized).await.unwrap();
    assert!(harness.lifecycle.purge_idle().await.is_empty());

    handle.disconnect().await.unwrap();
    handle.wait_for(DeviceState::Disconnected).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(harness.transport.disconnects(), 1);
    assert_eq!(harness.lifecycle.purge_idle().await, vec![peer.clone()]);
    assert_eq!(handle.state(), StateSet::from(DeviceState::Undiscovered));
    assert!(handle.connect().await.is_err());

    let fresh = harness.lifecycle.discover(peer).unwrap();
    assert!(fresh.is(DeviceState::Discovered));
    assert!(!fresh.is(DeviceState::Undiscovered));
}
