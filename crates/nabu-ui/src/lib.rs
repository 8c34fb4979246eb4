//! Nabu UI: the binding layer between a declarative UI description and the
//! host engine's native objects.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use nabu_ui::prelude::*;
//!
//! let (dispatcher, thread) = Dispatcher::spawn(DispatcherConfig::default())?;
//! let bridge = NativeBridge::new(dispatcher, MemoryHost::new());
//!
//! let levels = ObservableList::from_vec(vec![1u32, 2, 3]);
//! let dropdown = Dropdown::<u32>::new(&bridge)?;
//! dropdown.set_item_template(Some(
//!     Template::new("level", |n: &u32| DropdownOption::new(format!("Level {n}"))).into(),
//! ))?;
//! dropdown.set_items_source(Some(&levels))?;
//!
//! // Any thread may mutate the source; the native `options` field follows.
//! levels.push(4);
//! ```
//!
//! # Modules
//!
//! - [`property`]: typed, bindable value cells.
//! - [`source`]: observable sequences.
//! - [`collection`]: templatable collections and their native mirror.
//! - [`component`]: native-backed components built from the above.

pub mod collection;
pub mod component;
pub mod error;
pub mod property;
pub mod source;
pub mod subscription;

pub use error::{CollectionError, TemplateError};
pub use subscription::Subscription;

/// Everything needed to bind components, in one import.
pub mod prelude {
    pub use crate::collection::{
        BindingContext, CollectionChange, CollectionObserver, ItemLifecycle, ItemTemplate, NativeMirror,
        TemplatableCollection, TemplatedItem, Template, TemplateId, TemplateSelector,
    };
    pub use crate::component::{
        Dropdown, DropdownOption, EventTrigger, MeshItem, MeshShape, NativeComponent, Slider, TriggerEntry, UiMesh,
    };
    pub use crate::error::{CollectionError, TemplateError};
    pub use crate::property::{BindingMode, Property, PropertyBinding, PropertyKey};
    pub use crate::source::{ListChange, ObservableList, SourceId};
    pub use crate::subscription::Subscription;

    // Engine primitives everyone needs.
    pub use nabu_engine::dispatch::{DispatchError, DispatchLoop, DispatchThread, Dispatcher, DispatcherConfig};
    pub use nabu_engine::host::{FieldValue, HostError, MemoryHost, NativeBridge, NativeHandle, NativeHost, NativeKind};
}
