use thiserror::Error;

use super::{FieldValue, NativeHandle, NativeKind};
use crate::dispatch::DispatchError;

/// Contract implemented by the host engine.
///
/// Every method is called on the designated thread only; implementations may
/// rely on that and need no locking of their own.
pub trait NativeHost: Send + 'static {
    /// Instantiates a native object of `kind`.
    fn create(&mut self, kind: NativeKind) -> Result<NativeHandle, HostError>;

    /// Reads a named field.
    fn read_field(&self, handle: NativeHandle, field: &str) -> Result<FieldValue, HostError>;

    /// Writes a named field.
    fn write_field(&mut self, handle: NativeHandle, field: &str, value: FieldValue) -> Result<(), HostError>;

    /// Releases a native object. Destroying an unknown or already destroyed
    /// handle is a no-op.
    fn destroy(&mut self, handle: NativeHandle);

    /// Hints that derived visual state (e.g. mesh geometry) must be recomputed.
    fn mark_dirty(&mut self, handle: NativeHandle);
}

/// Errors crossing the host boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HostError {
    #[error("native object {0} does not exist")]
    UnknownHandle(NativeHandle),
    #[error("native object {handle} has no field `{field}`")]
    UnknownField { handle: NativeHandle, field: String },
    #[error("native host does not support `{0}`")]
    Unsupported(NativeKind),
    #[error("native host accessed off the designated thread")]
    WrongThread,
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}
