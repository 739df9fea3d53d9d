use super::*;
use crate::ipc::{ConnectionId, PeerDeathNotifier};
use crate::power::property::MemoryPropertySetter;

struct Fixture {
    notifier: Arc<PeerDeathNotifier>,
    properties: Arc<MemoryPropertySetter>,
    manager: PowerManagerService,
}

fn fixture() -> Fixture {
    let notifier = Arc::new(PeerDeathNotifier::new());
    let properties = Arc::new(MemoryPropertySetter::new());
    let registry = WakeLockRegistry::new(notifier.clone());
    let manager = PowerManagerService::new(registry, properties.clone());
    Fixture {
        notifier,
        properties,
        manager,
    }
}

fn remote_peer(notifier: &PeerDeathNotifier) -> PeerHandle {
    let connection = ConnectionId::next();
    notifier.connection_opened(connection);
    PeerHandle::new_local().adopted_from(connection)
}

#[tokio::test]
async fn acquire_and_release_toggle_held() {
    let f = fixture();
    let lock = remote_peer(&f.notifier);

    assert_eq!(
        f.manager.acquire_wake_lock(0, lock, "foo", "bar").await,
        Status::Ok
    );
    assert!(f.manager.registry().is_held());
    assert_eq!(
        f.manager.registry().request_for(&lock).unwrap().lock_string(),
        "foo,bar,-1"
    );

    assert_eq!(f.manager.release_wake_lock(lock, 0).await, Status::Ok);
    assert!(!f.manager.registry().is_held());
}

#[tokio::test]
async fn acquire_with_uid_records_uid() {
    let f = fixture();
    let lock = remote_peer(&f.notifier);

    assert_eq!(
        f.manager
            .acquire_wake_lock_with_uid(0, lock, "foo", "bar", 1234)
            .await,
        Status::Ok
    );
    assert_eq!(f.manager.registry().lock_strings(), vec!["foo,bar,1234"]);
}

#[tokio::test]
async fn protocol_violations_report_unknown_error() {
    let f = fixture();
    let lock = remote_peer(&f.notifier);

    assert_eq!(f.manager.release_wake_lock(lock, 0).await, Status::UnknownError);

    assert_eq!(
        f.manager.acquire_wake_lock(0, lock, "a", "b").await,
        Status::Ok
    );
    assert_eq!(
        f.manager.acquire_wake_lock(0, lock, "a", "b").await,
        Status::UnknownError
    );
    assert_eq!(f.manager.registry().len(), 1);
}

#[tokio::test]
async fn client_death_releases_lock() {
    let f = fixture();
    let lock = remote_peer(&f.notifier);

    assert_eq!(
        f.manager.acquire_wake_lock(0, lock, "foo", "bar").await,
        Status::Ok
    );
    f.notifier.notify_connection_closed(lock.connection());

    assert!(!f.manager.registry().is_held());
    assert_eq!(f.manager.release_wake_lock(lock, 0).await, Status::UnknownError);
    assert!(f.manager.dump().contains("reclaimed: 1"));
}

#[tokio::test]
async fn reboot_validates_reason() {
    let f = fixture();

    assert_eq!(f.manager.reboot(false, "", false).await, Status::Ok);
    assert_eq!(f.properties.value(POWERCTL_PROPERTY), "reboot,");

    f.properties.set_property(POWERCTL_PROPERTY, "").unwrap();
    assert_eq!(
        f.manager.reboot(false, "unrecognized", false).await,
        Status::BadValue
    );
    assert_eq!(f.properties.value(POWERCTL_PROPERTY), "");

    assert_eq!(
        f.manager
            .reboot(false, REBOOT_REASON_RECOVERY, false)
            .await,
        Status::Ok
    );
    assert_eq!(f.properties.value(POWERCTL_PROPERTY), "reboot,recovery");
}

#[tokio::test]
async fn shutdown_validates_reason() {
    let f = fixture();

    assert_eq!(f.manager.shutdown(false, "", false).await, Status::Ok);
    assert_eq!(f.properties.value(POWERCTL_PROPERTY), "shutdown,");

    f.properties.set_property(POWERCTL_PROPERTY, "").unwrap();
    // Reboot reasons aren't valid for shutdown.
    assert_eq!(
        f.manager
            .shutdown(false, REBOOT_REASON_RECOVERY, false)
            .await,
        Status::BadValue
    );
    assert_eq!(f.properties.value(POWERCTL_PROPERTY), "");

    assert_eq!(
        f.manager
            .shutdown(false, SHUTDOWN_REASON_USER_REQUESTED, false)
            .await,
        Status::Ok
    );
    assert_eq!(
        f.properties.value(POWERCTL_PROPERTY),
        "shutdown,userrequested"
    );
}

#[tokio::test]
async fn property_failure_is_unknown_error() {
    let f = fixture();
    f.properties.set_fail_writes(true);

    assert_eq!(f.manager.reboot(false, "", false).await, Status::UnknownError);
    assert_eq!(
        f.manager.shutdown(true, "", true).await,
        Status::UnknownError
    );
}

#[tokio::test]
async fn unimplemented_calls_succeed_without_effect() {
    let f = fixture();
    let lock = remote_peer(&f.notifier);

    assert_eq!(
        f.manager.update_wake_lock_uids(lock, &[1, 2, 3]).await,
        Status::Ok
    );
    assert_eq!(f.manager.power_hint(1, 2).await, Status::Ok);
    assert_eq!(f.manager.go_to_sleep(1000, 2, 3).await, Status::Ok);
    assert_eq!(f.manager.crash("boom").await, Status::Ok);

    assert!(!f.manager.registry().is_held());
    assert_eq!(f.properties.value(POWERCTL_PROPERTY), "");
}

#[tokio::test]
async fn dump_lists_requests() {
    let f = fixture();
    let lock = remote_peer(&f.notifier);
    f.manager.acquire_wake_lock(0, lock, "foo", "bar").await;

    let dump = f.manager.dump();
    assert!(dump.contains("held: true"));
    assert!(dump.contains("requests: 1"));
    assert!(dump.contains("reclaimed: 0"));
    assert!(dump.contains("foo,bar,-1"));
}

#[test]
fn reason_allow_lists() {
    assert!(is_allowed_reason("", REBOOT_REASONS));
    assert!(is_allowed_reason("recovery", REBOOT_REASONS));
    assert!(!is_allowed_reason("Recovery", REBOOT_REASONS));
    assert!(!is_allowed_reason("userrequested", REBOOT_REASONS));
    assert!(is_allowed_reason("userrequested", SHUTDOWN_REASONS));
}
