use super::*;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

fn open_connection(notifier: &PeerDeathNotifier) -> ConnectionId {
    let connection = ConnectionId::next();
    notifier.connection_opened(connection);
    connection
}

fn counting_callback(counter: &Arc<AtomicUsize>) -> DeathCallback {
    let counter = counter.clone();
    Box::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    })
}

#[test]
fn callback_fires_once_on_peer_death() {
    let notifier = PeerDeathNotifier::new();
    let peer = PeerHandle::root_of(open_connection(&notifier));
    let fired = Arc::new(AtomicUsize::new(0));

    notifier
        .register(peer, counting_callback(&fired))
        .expect("peer is alive");

    notifier.notify_peer_died(peer);
    notifier.notify_peer_died(peer);

    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert_eq!(notifier.registration_count(&peer), 0);
}

#[test]
fn unregistered_callback_never_fires() {
    let notifier = PeerDeathNotifier::new();
    let peer = PeerHandle::root_of(open_connection(&notifier));
    let fired = Arc::new(AtomicUsize::new(0));

    let registration = notifier.register(peer, counting_callback(&fired)).unwrap();
    notifier.unregister(&registration);
    // Unregistering twice is harmless.
    notifier.unregister(&registration);
    notifier.notify_peer_died(peer);

    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[test]
fn stale_unregister_keeps_newer_registration() {
    let notifier = PeerDeathNotifier::new();
    let peer = PeerHandle::root_of(open_connection(&notifier));
    let old_fired = Arc::new(AtomicUsize::new(0));
    let new_fired = Arc::new(AtomicUsize::new(0));

    let old = notifier.register(peer, counting_callback(&old_fired)).unwrap();
    let _new = notifier.register(peer, counting_callback(&new_fired)).unwrap();
    notifier.unregister(&old);

    notifier.notify_peer_died(peer);
    assert_eq!(old_fired.load(Ordering::SeqCst), 0);
    assert_eq!(new_fired.load(Ordering::SeqCst), 1);
}

#[test]
fn connection_close_fires_all_peers_on_that_connection() {
    let notifier = PeerDeathNotifier::new();
    let conn = open_connection(&notifier);
    let other_conn = open_connection(&notifier);
    let a = PeerHandle::new_local().adopted_from(conn);
    let b = PeerHandle::new_local().adopted_from(conn);
    let elsewhere = PeerHandle::new_local().adopted_from(other_conn);

    let fired = Arc::new(AtomicUsize::new(0));
    let untouched = Arc::new(AtomicUsize::new(0));
    notifier.register(a, counting_callback(&fired)).unwrap();
    notifier.register(b, counting_callback(&fired)).unwrap();
    notifier
        .register(elsewhere, counting_callback(&untouched))
        .unwrap();

    notifier.notify_connection_closed(conn);

    assert_eq!(fired.load(Ordering::SeqCst), 2);
    assert_eq!(untouched.load(Ordering::SeqCst), 0);
    assert_eq!(notifier.registration_count(&elsewhere), 1);
}

#[test]
fn registering_for_dead_peer_fails() {
    let notifier = PeerDeathNotifier::new();
    let conn = open_connection(&notifier);
    let peer = PeerHandle::new_local().adopted_from(conn);

    notifier.notify_connection_closed(conn);
    let fired = Arc::new(AtomicUsize::new(0));
    assert!(notifier.register(peer, counting_callback(&fired)).is_none());

    let single = PeerHandle::root_of(open_connection(&notifier));
    notifier.notify_peer_died(single);
    assert!(notifier.register(single, counting_callback(&fired)).is_none());
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[test]
fn callback_may_reenter_notifier() {
    let notifier = Arc::new(PeerDeathNotifier::new());
    let peer = PeerHandle::root_of(open_connection(&notifier));
    let other = PeerHandle::root_of(open_connection(&notifier));

    let reentrant = notifier.clone();
    notifier
        .register(
            peer,
            Box::new(move || {
                // Would deadlock if callbacks ran under the notifier lock.
                let _ = reentrant.register(other, Box::new(|| {}));
            }),
        )
        .unwrap();

    notifier.notify_peer_died(peer);
    assert_eq!(notifier.registration_count(&other), 1);
}

#[test]
fn unopened_connection_counts_as_dead() {
    let notifier = PeerDeathNotifier::new();
    let peer = PeerHandle::root_of(ConnectionId::next());
    let fired = Arc::new(AtomicUsize::new(0));

    assert!(notifier.is_connection_closed(peer.connection()));
    assert!(notifier.register(peer, counting_callback(&fired)).is_none());

    // Local objects don't depend on any connection.
    let local = PeerHandle::new_local();
    assert!(!notifier.is_connection_closed(local.connection()));
    assert!(notifier.register(local, counting_callback(&fired)).is_some());
}

#[test]
fn closed_connections_leave_no_state_behind() {
    let notifier = PeerDeathNotifier::new();
    let fired = Arc::new(AtomicUsize::new(0));

    for _ in 0..1000 {
        let conn = open_connection(&notifier);
        let root = PeerHandle::root_of(conn);
        let object = PeerHandle::new_local().adopted_from(conn);
        notifier.register(root, counting_callback(&fired)).unwrap();
        notifier.register(object, counting_callback(&fired)).unwrap();
        notifier.notify_peer_died(object);
        notifier.notify_connection_closed(conn);

        assert!(notifier.register(root, counting_callback(&fired)).is_none());
        assert!(notifier.register(object, counting_callback(&fired)).is_none());
    }

    assert_eq!(fired.load(Ordering::SeqCst), 2000);
    let state = notifier.state();
    assert!(state.callbacks.is_empty());
    assert!(state.live_connections.is_empty());
    assert!(state.dead_peers.is_empty());
}
