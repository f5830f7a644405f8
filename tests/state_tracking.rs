//! The tracker and purge policy are generic over any state enumeration.

use peer_lifecycle::{
    ServerState, StateSet,
    purge::PurgePolicy,
    status::{Intent, Status},
    tracker::{StateEvent, StateTracker},
};
use std::sync::{Arc, Mutex};

#[test]
fn test_server_state_tracking() {
    let events: Arc<Mutex<Vec<StateEvent<ServerState>>>> = Arc::default();
    let mut tracker = StateTracker::new(StateSet::from(ServerState::Disconnected));
    {
        let events = events.clone();
        tracker.set_observer(Box::new(move |event: &StateEvent<ServerState>| {
            events.lock().unwrap().push(*event)
        }));
    }

    let diff = tracker.update(
        ServerState::Connecting.into(),
        ServerState::Disconnected.into(),
        Intent::Intentional,
        Status::Success,
    );
    assert!(diff.entered(ServerState::Connecting));
    assert!(diff.exited(ServerState::Disconnected));

    // Re-applying the same set is silent.
    tracker.apply(tracker.current(), Intent::Intentional, Status::Success);
    assert_eq!(events.lock().unwrap().len(), 1);

    // Forcing notifies even without a change.
    tracker.apply_forced(tracker.current(), Intent::Unintentional, Status::Success);
    assert_eq!(events.lock().unwrap().len(), 2);
    assert!(events.lock().unwrap()[1].changed().is_empty());

    let policy = PurgePolicy::<ServerState>::default();
    assert!(!policy.is_purgeable(tracker.current()));
    tracker.apply(
        ServerState::Disconnected.into(),
        Intent::Unintentional,
        Status::UnexpectedDisconnect { code: 8 },
    );
    assert!(policy.is_purgeable(tracker.current()));
    assert_eq!(format!("{:?}", tracker.current()), "{DISCONNECTED}");
    assert_eq!(ServerState::Connected.bit(), 1 << 4);
}
