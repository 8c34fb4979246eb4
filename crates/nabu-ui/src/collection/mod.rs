//! Templatable collections.
//!
//! A [`TemplatableCollection`] holds the authoritative, ordered list of
//! [`TemplatedItem`]s and a projected list derived from it. Items come from
//! one of two places, never both at once:
//!
//! | Mode | Fed by | Structural API |
//! |------|--------|----------------|
//! | direct | `insert_range`, `push`, ... | allowed |
//! | source-driven | an attached [`ObservableList`](crate::source::ObservableList) | refused with `SourceDriven` |
//!
//! In source-driven mode each element goes through the item template (a
//! single [`Template`] or a [`TemplateSelector`]); an element no template
//! applies to is converted with `T: From<S>`.
//!
//! Committed changes reach [`CollectionObserver`]s as [`CollectionChange`]s.
//! A [`NativeMirror`] is such an observer: it replays changes on the
//! designated thread.

mod adapter;
mod change;
mod item;
mod mirror;
mod templatable;
mod template;

pub(crate) use change::move_within;
pub use change::{CollectionChange, CollectionObserver, ItemLifecycle};
pub use item::{BindingContext, TemplatedItem};
pub use mirror::NativeMirror;
pub use templatable::TemplatableCollection;
pub use template::{ItemTemplate, Template, TemplateId, TemplateSelector};
