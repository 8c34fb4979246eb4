//! Host component boundary.
//!
//! The host engine owns the real UI objects. Nabu only reaches them through
//! the [`NativeHost`] trait, and only on the designated thread: the
//! [`NativeBridge`] wraps a host together with a [`Dispatcher`] and marshals
//! every call.
//!
//! | Type | Role |
//! |------|------|
//! | [`NativeHandle`], [`NativeKind`] | opaque object identity and object kind |
//! | [`FieldValue`] | dynamic value crossing the boundary |
//! | [`NativeHost`] | the engine-side contract |
//! | [`NativeBridge`] | thread-marshaling front for a host |
//! | [`MemoryHost`] | in-process recording host (headless runs, tests) |
//!
//! [`Dispatcher`]: crate::dispatch::Dispatcher

mod bridge;
mod handle;
mod memory;
mod native;
mod value;

pub use bridge::NativeBridge;
pub use handle::{NativeHandle, NativeKind};
pub use memory::{HostCall, HostCallKind, MemoryHost, MemoryObject};
pub use native::{HostError, NativeHost};
pub use value::FieldValue;
