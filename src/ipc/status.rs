//! Status codes carried back to callers of a transaction.

use serde::{Deserialize, Serialize};

/// Outcome of a transaction, as seen by the caller.
///
/// Numeric codes are stable so that callers on either side of the wire can
/// log and compare them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Ok,
    UnknownError,
    BadValue,
    BadType,
    NotEnoughData,
    PermissionDenied,
    UnknownTransaction,
    DeadObject,
    FailedTransaction,
}

impl Status {
    pub fn code(&self) -> i32 {
        match self {
            Status::Ok => 0,
            Status::UnknownError => i32::MIN,
            Status::BadType => i32::MIN + 1,
            Status::FailedTransaction => i32::MIN + 2,
            Status::BadValue => -22,
            Status::NotEnoughData => -61,
            Status::PermissionDenied => -1,
            Status::UnknownTransaction => -74,
            Status::DeadObject => -32,
        }
    }

    pub fn is_ok(&self) -> bool {
        *self == Status::Ok
    }

    /// Collapses a transaction result into a bare status.
    pub fn from_result<T>(result: &Result<T, Status>) -> Status {
        match result {
            Ok(_) => Status::Ok,
            Err(status) => *status,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Status::Ok => "OK",
            Status::UnknownError => "UNKNOWN_ERROR",
            Status::BadValue => "BAD_VALUE",
            Status::BadType => "BAD_TYPE",
            Status::NotEnoughData => "NOT_ENOUGH_DATA",
            Status::PermissionDenied => "PERMISSION_DENIED",
            Status::UnknownTransaction => "UNKNOWN_TRANSACTION",
            Status::DeadObject => "DEAD_OBJECT",
            Status::FailedTransaction => "FAILED_TRANSACTION",
        };
        write!(f, "{} ({})", name, self.code())
    }
}

impl std::error::Error for Status {}

/// Result type for transactions.
pub type TransactResult<T> = Result<T, Status>;
