//! Components backed by native objects.
//!
//! Every component owns a [`NativeComponent`] (one native object) and adds
//! its own properties or collection on top:
//!
//! | Component | Native kind | Collection → field |
//! |-----------|-------------|--------------------|
//! | [`Slider`] | `Slider` | (none; `value`, `min`, `max` properties) |
//! | [`Dropdown`] | `Dropdown` | [`DropdownOption`]s → `options` (marks dirty) |
//! | [`EventTrigger`] | `EventTrigger` | [`TriggerEntry`] handles → `triggers` |
//! | [`UiMesh`] | `UIMesh` | [`MeshItem`]s → `items` (marks dirty) |
//!
//! Collection fields are rewritten on the designated thread by the
//! collection's [`NativeMirror`](crate::collection::NativeMirror), after the
//! change has been committed.

mod dropdown;
mod mesh;
mod native;
mod slider;
mod trigger;

pub use dropdown::{Dropdown, DropdownOption};
pub use mesh::{MeshItem, MeshShape, UiMesh};
pub use native::NativeComponent;
pub use slider::Slider;
pub use trigger::{EventTrigger, TriggerEntry};
