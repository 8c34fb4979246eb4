//! Observable sequences that can drive a templatable collection.
//!
//! [`ObservableList`] reports every mutation as one [`ListChange`],
//! synchronously and in mutation order, on the mutating thread. A collection
//! attaches with [`ObservableList::try_attach`], which takes the snapshot and
//! registers the listener under the list's lock so no change falls between
//! the two.

mod list;

pub use list::{ListChange, ObservableList, SourceId};
