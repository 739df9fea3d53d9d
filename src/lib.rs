//! Wake lock arbitration between independent clients and a single arbiter
//! process.

pub mod config;
pub mod ipc;
pub mod logging;
pub mod paths;
pub mod power;

/// Git commit the binary was built from.
pub const BUILD_SHA: &str = env!("POWERD_GIT_SHA");
