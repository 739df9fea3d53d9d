//! Objects that answer transactions.

use crate::ipc::{Parcel, Status, TransactResult};
use async_trait::async_trait;

/// First code available to interfaces; lower values are never used.
pub const FIRST_CALL_TRANSACTION: u32 = 1;

const fn pack_chars(c1: u8, c2: u8, c3: u8, c4: u8) -> u32 {
    ((c1 as u32) << 24) | ((c2 as u32) << 16) | ((c3 as u32) << 8) | (c4 as u32)
}

/// Liveness probe; answered with an empty reply.
pub const PING_TRANSACTION: u32 = pack_chars(b'_', b'P', b'N', b'G');
/// Diagnostic dump; answered with the object's `dump()` text.
pub const DUMP_TRANSACTION: u32 = pack_chars(b'_', b'D', b'M', b'P');
/// Interface query; answered with the object's descriptor.
pub const INTERFACE_TRANSACTION: u32 = pack_chars(b'_', b'N', b'T', b'F');

/// An object that can receive transactions, either in this process or
/// behind a connection.
#[async_trait]
pub trait BinderObject: Send + Sync {
    /// Interface descriptor checked by `Parcel::enforce_interface`.
    fn descriptor(&self) -> &str;

    /// Handles one transaction. Implementations should pass codes they do
    /// not recognize to [`default_transact`].
    async fn on_transact(&self, code: u32, data: Parcel, flags: u32) -> TransactResult<Parcel>;

    /// Human-readable state for the dump transaction.
    fn dump(&self) -> String {
        String::new()
    }
}

/// Handles the reserved transaction codes shared by every object.
///
/// Anything else is rejected with `UnknownTransaction`.
pub fn default_transact<B>(object: &B, code: u32) -> TransactResult<Parcel>
where
    B: BinderObject + ?Sized,
{
    match code {
        PING_TRANSACTION => Ok(Parcel::new()),
        INTERFACE_TRANSACTION => {
            let mut reply = Parcel::new();
            reply.write_string(object.descriptor());
            Ok(reply)
        }
        DUMP_TRANSACTION => {
            let mut reply = Parcel::new();
            reply.write_string(&object.dump());
            Ok(reply)
        }
        _ => {
            tracing::warn!(
                "Unknown transaction code {} for {}",
                code,
                object.descriptor()
            );
            Err(Status::UnknownTransaction)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl BinderObject for Echo {
        fn descriptor(&self) -> &str {
            "test.IEcho"
        }

        async fn on_transact(
            &self,
            code: u32,
            _data: Parcel,
            _flags: u32,
        ) -> TransactResult<Parcel> {
            default_transact(self, code)
        }

        fn dump(&self) -> String {
            "echo state".to_string()
        }
    }

    #[tokio::test]
    async fn reserved_codes_are_answered() {
        let echo = Echo;

        let mut reply = echo
            .on_transact(INTERFACE_TRANSACTION, Parcel::new(), 0)
            .await
            .unwrap();
        assert_eq!(reply.read_string().unwrap(), "test.IEcho");

        let mut reply = echo
            .on_transact(DUMP_TRANSACTION, Parcel::new(), 0)
            .await
            .unwrap();
        assert_eq!(reply.read_string().unwrap(), "echo state");

        let reply = echo.on_transact(PING_TRANSACTION, Parcel::new(), 0).await;
        assert!(reply.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_code_is_rejected() {
        let result = Echo.on_transact(9999, Parcel::new(), 0).await;
        assert_eq!(result, Err(Status::UnknownTransaction));
    }
}
