//! Nabu engine crate.
//!
//! This crate owns the pieces that sit between the binding layer and the host
//! engine: the designated-thread dispatcher, the native host boundary, and
//! logger setup. It knows nothing about properties or collections.

pub mod dispatch;
pub mod host;
pub mod logging;
