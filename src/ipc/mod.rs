//! Transport layer shared by the arbiter and its clients.
//!
//! ## Architecture
//!
//! - **Peer handles (`peer.rs`)**: opaque identities for objects reached
//!   over a connection.
//! - **Parcels (`parcel.rs`)**: typed argument lists carried by a
//!   transaction.
//! - **Binder objects (`binder.rs`)**: anything that answers transactions,
//!   local or remote.
//! - **Death notifications (`death.rs`)**: callbacks fired when a peer or
//!   its connection goes away.
//! - **Server / client (`server.rs`, `client.rs`)**: tarpc over TCP, one
//!   `ConnectionId` per connection.
//! - **Service directory (`directory.rs`)**: well-known names to ports.

pub mod binder;
pub mod client;
pub mod death;
pub mod directory;
pub mod parcel;
pub mod peer;
pub mod server;
pub mod service;
pub mod status;

#[cfg(test)]
pub mod testing;

pub use binder::{default_transact, BinderObject};
pub use client::{RemoteBinder, RpcServiceManager, ServiceHandle, ServiceManager};
pub use death::{DeathCallback, DeathNotifier, DeathRegistration, PeerDeathNotifier};
pub use directory::{ServiceDirectory, ServiceRecord};
pub use parcel::{Parcel, ParcelValue};
pub use peer::{ConnectionId, PeerHandle};
pub use server::serve_binder;
pub use status::{Status, TransactResult};
