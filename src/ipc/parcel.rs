//! Typed argument container for transactions.
//!
//! A parcel is an ordered list of values. Writers append, readers consume in
//! the same order. The wire format is whatever the transport's codec makes
//! of the serde representation; nothing here depends on it.

use crate::ipc::{ConnectionId, PeerHandle, Status, TransactResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParcelValue {
    InterfaceToken(String),
    Int32(i32),
    Int64(i64),
    Bool(bool),
    Str(String),
    Int32Array(Vec<i32>),
    Binder(PeerHandle),
}

impl ParcelValue {
    fn kind(&self) -> &'static str {
        match self {
            ParcelValue::InterfaceToken(_) => "interface token",
            ParcelValue::Int32(_) => "int32",
            ParcelValue::Int64(_) => "int64",
            ParcelValue::Bool(_) => "bool",
            ParcelValue::Str(_) => "string",
            ParcelValue::Int32Array(_) => "int32 array",
            ParcelValue::Binder(_) => "binder",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parcel {
    values: Vec<ParcelValue>,
    #[serde(skip)]
    position: usize,
}

impl Parcel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a request parcel for the given interface.
    pub fn for_interface(descriptor: &str) -> Self {
        let mut parcel = Self::new();
        parcel.write_interface_token(descriptor);
        parcel
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Rebinds every binder in this parcel to `connection`.
    ///
    /// Called on the receiving side of a connection before the parcel is
    /// handed to any object.
    pub fn adopt_from(&mut self, connection: ConnectionId) {
        for value in &mut self.values {
            if let ParcelValue::Binder(handle) = value {
                *handle = handle.adopted_from(connection);
            }
        }
    }

    pub fn write_interface_token(&mut self, descriptor: &str) {
        self.values
            .push(ParcelValue::InterfaceToken(descriptor.to_string()));
    }

    pub fn write_i32(&mut self, value: i32) {
        self.values.push(ParcelValue::Int32(value));
    }

    pub fn write_i64(&mut self, value: i64) {
        self.values.push(ParcelValue::Int64(value));
    }

    pub fn write_bool(&mut self, value: bool) {
        self.values.push(ParcelValue::Bool(value));
    }

    pub fn write_string(&mut self, value: &str) {
        self.values.push(ParcelValue::Str(value.to_string()));
    }

    pub fn write_i32_array(&mut self, values: &[i32]) {
        self.values.push(ParcelValue::Int32Array(values.to_vec()));
    }

    pub fn write_binder(&mut self, handle: PeerHandle) {
        self.values.push(ParcelValue::Binder(handle));
    }

    /// Reads the interface token and checks it against `descriptor`.
    pub fn enforce_interface(&mut self, descriptor: &str) -> TransactResult<()> {
        match self.next_value()? {
            ParcelValue::InterfaceToken(token) if token == descriptor => Ok(()),
            ParcelValue::InterfaceToken(token) => {
                tracing::warn!(
                    "Interface mismatch: expected \"{}\", got \"{}\"",
                    descriptor,
                    token
                );
                Err(Status::PermissionDenied)
            }
            other => {
                tracing::warn!("Expected interface token, got {}", other.kind());
                Err(Status::PermissionDenied)
            }
        }
    }

    pub fn read_i32(&mut self) -> TransactResult<i32> {
        match self.next_value()? {
            ParcelValue::Int32(v) => Ok(*v),
            other => Err(type_mismatch("int32", other)),
        }
    }

    pub fn read_i64(&mut self) -> TransactResult<i64> {
        match self.next_value()? {
            ParcelValue::Int64(v) => Ok(*v),
            other => Err(type_mismatch("int64", other)),
        }
    }

    pub fn read_bool(&mut self) -> TransactResult<bool> {
        match self.next_value()? {
            ParcelValue::Bool(v) => Ok(*v),
            other => Err(type_mismatch("bool", other)),
        }
    }

    pub fn read_string(&mut self) -> TransactResult<String> {
        match self.next_value()? {
            ParcelValue::Str(v) => Ok(v.clone()),
            other => Err(type_mismatch("string", other)),
        }
    }

    pub fn read_i32_array(&mut self) -> TransactResult<Vec<i32>> {
        match self.next_value()? {
            ParcelValue::Int32Array(v) => Ok(v.clone()),
            other => Err(type_mismatch("int32 array", other)),
        }
    }

    pub fn read_binder(&mut self) -> TransactResult<PeerHandle> {
        match self.next_value()? {
            ParcelValue::Binder(handle) => Ok(*handle),
            other => Err(type_mismatch("binder", other)),
        }
    }

    fn next_value(&mut self) -> TransactResult<&ParcelValue> {
        let value = self.values.get(self.position).ok_or(Status::NotEnoughData)?;
        self.position += 1;
        Ok(value)
    }
}

fn type_mismatch(expected: &str, got: &ParcelValue) -> Status {
    tracing::debug!("Parcel type mismatch: expected {}, got {}", expected, got.kind());
    Status::BadType
}
