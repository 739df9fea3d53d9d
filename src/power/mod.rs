//! Wake lock arbitration: the arbiter-side registry and service, the
//! client-side handle, and the glue that puts them on the wire.

pub mod daemon;
pub mod dispatch;
pub mod interface;
pub mod manager;
pub mod property;
pub mod proxy;
pub mod registry;
pub mod stub;
pub mod wake_lock;

pub use daemon::{run_arbiter, Arbiter};
pub use dispatch::PowerManagerBinder;
pub use interface::{
    PowerManager, PowerTransaction, DESCRIPTOR, PARTIAL_WAKE_LOCK, SERVICE_NAME, UID_UNSPECIFIED,
};
pub use manager::PowerManagerService;
pub use property::{FilePropertySetter, MemoryPropertySetter, PropertySetter, POWERCTL_PROPERTY};
pub use proxy::PowerManagerProxy;
pub use registry::{construct_lock_string, Request, WakeLockRegistry};
pub use stub::{construct_suspend_request_string, PowerManagerStub};
pub use wake_lock::WakeLock;
