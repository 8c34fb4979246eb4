//! Bindable properties.
//!
//! A component declares its properties as [`PropertyKey`] constants and
//! instantiates one [`Property`] cell per key. The key carries the name, the
//! value type and the [`BindingMode`]; there is no reflection and no string
//! lookup at runtime.
//!
//! | Direction | Entry point | Notifies |
//! |-----------|-------------|----------|
//! | model → engine | [`Property::set`] | listeners, then engine sinks (if the mode allows) |
//! | engine → model | [`Property::push_from_engine`] | listeners only |
//!
//! The engine path never reaches the engine sinks again, so a value read
//! back from a native object is not written straight back to it.
//!
//! [`PropertyBinding`] links two cells (e.g. a view-model value and a
//! component property) under a binding mode.

mod binding;
mod cell;
mod key;

pub use binding::PropertyBinding;
pub use cell::Property;
pub use key::{BindingMode, PropertyKey};
