//! tarpc service carrying transactions between processes.

use crate::ipc::{Parcel, TransactResult};

/// Service exposed by every process that hosts a binder object.
#[tarpc::service]
pub trait TransactService {
    /// Delivers one transaction to the hosted object.
    ///
    /// Local binders in `data` are rebound to the caller's connection
    /// before the object sees them.
    async fn transact(code: u32, data: Parcel, flags: u32) -> TransactResult<Parcel>;
}
