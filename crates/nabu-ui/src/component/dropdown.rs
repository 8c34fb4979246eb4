use std::sync::Arc;

use nabu_engine::host::{FieldValue, HostError, NativeBridge, NativeKind};

use super::NativeComponent;
use crate::collection::{CollectionChange, ItemTemplate, NativeMirror, TemplatableCollection};
use crate::error::CollectionError;
use crate::property::{BindingMode, Property, PropertyKey};
use crate::source::ObservableList;

/// One entry of a [`Dropdown`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DropdownOption {
    pub text: String,
    /// Host-side image reference, if any.
    pub image: Option<String>,
}

impl DropdownOption {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), image: None }
    }

    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    fn to_field(&self) -> FieldValue {
        FieldValue::record([
            ("text", FieldValue::from(self.text.as_str())),
            ("image", FieldValue::from(self.image.clone())),
        ])
    }
}

impl From<&str> for DropdownOption {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for DropdownOption {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

/// A native dropdown whose options come from a templatable collection.
///
/// Options are added directly or generated from an items source of `S`
/// through an optional template. After every option change the `options`
/// field is rewritten on the designated thread and the object is marked
/// dirty. The selected index (`value`) is two-way and always kept within
/// the option range.
pub struct Dropdown<S = DropdownOption> {
    native: NativeComponent,
    options: Arc<TemplatableCollection<DropdownOption, S, FieldValue>>,
    mirror: NativeMirror<FieldValue>,
    value: Property<i64>,
}

impl<S> Dropdown<S>
where
    DropdownOption: From<S>,
    S: Clone + Send + 'static,
{
    pub const VALUE: PropertyKey<i64> = PropertyKey::new("value", BindingMode::TwoWay);

    pub fn new(bridge: &NativeBridge) -> Result<Self, HostError> {
        let native = NativeComponent::create(bridge, NativeKind::DROPDOWN)?;
        let value = Property::new(Self::VALUE, 0);
        native.bind(&value, Self::VALUE.name());

        let options = Arc::new(TemplatableCollection::with_projection(DropdownOption::to_field));
        let mirror = options.mirror_with(bridge.dispatcher(), Some(native.list_writer("options", true)));

        // Observers run under the collection's lock; the length is current.
        let weak = Arc::downgrade(&options);
        let selected = value.clone();
        options.add_observer(move |_: &CollectionChange<FieldValue>| {
            let Some(options) = weak.upgrade() else {
                return;
            };
            let current = selected.get();
            let clamped = clamp_index(current, options.len());
            if clamped != current {
                selected.set(clamped);
            }
        });

        Ok(Self { native, options, mirror, value })
    }

    #[inline]
    pub fn value(&self) -> &Property<i64> {
        &self.value
    }

    #[inline]
    pub fn options(&self) -> &TemplatableCollection<DropdownOption, S, FieldValue> {
        self.options.as_ref()
    }

    #[inline]
    pub fn mirror(&self) -> &NativeMirror<FieldValue> {
        &self.mirror
    }

    #[inline]
    pub fn native(&self) -> &NativeComponent {
        &self.native
    }

    pub fn set_items_source(&self, source: Option<&ObservableList<S>>) -> Result<(), CollectionError> {
        self.options.change_source(source)
    }

    pub fn set_item_template(&self, template: Option<ItemTemplate<S, DropdownOption>>) -> Result<(), CollectionError> {
        self.options.change_template(template)
    }

    pub fn add_option(&self, option: impl Into<Arc<DropdownOption>>) -> Result<(), CollectionError> {
        self.options.push(option)
    }

    pub fn clear_options(&self) -> Result<(), CollectionError> {
        self.options.clear()
    }

    /// Model-side selection, clamped to the option range.
    pub fn select(&self, index: i64) -> bool {
        self.value.set(clamp_index(index, self.options.len()))
    }

    /// The engine changed the selection; accepted without echo.
    pub fn engine_value_changed(&self, index: i64) -> bool {
        self.value.push_from_engine(clamp_index(index, self.options.len()))
    }

    pub fn selected(&self) -> Option<Arc<DropdownOption>> {
        let index = usize::try_from(self.value.get()).ok()?;
        self.options.get(index).map(|item| Arc::clone(item.content()))
    }
}

/// Clamps a selection index into `0..len` (to 0 when empty).
fn clamp_index(index: i64, len: usize) -> i64 {
    let last = i64::try_from(len).unwrap_or(i64::MAX).saturating_sub(1).max(0);
    index.clamp(0, last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::Template;
    use nabu_engine::dispatch::{Dispatcher, DispatcherConfig};
    use nabu_engine::host::MemoryHost;

    #[test]
    fn clamp_index_bounds() {
        assert_eq!(clamp_index(5, 3), 2);
        assert_eq!(clamp_index(-2, 3), 0);
        assert_eq!(clamp_index(4, 0), 0);
    }

    #[test]
    fn options_reach_native_field() {
        let (dispatcher, _thread) = Dispatcher::spawn(DispatcherConfig::default()).unwrap();
        let host = MemoryHost::new();
        let bridge = NativeBridge::new(dispatcher, host.clone());

        let dropdown = Dropdown::<u32>::new(&bridge).unwrap();
        dropdown
            .set_item_template(Some(
                Template::new("level", |n: &u32| DropdownOption::new(format!("Level {n}"))).into(),
            ))
            .unwrap();
        let levels = ObservableList::from_vec(vec![1, 2, 3]);
        dropdown.set_items_source(Some(&levels)).unwrap();
        dropdown.select(2);
        levels.remove(1, 2).unwrap();
        assert_eq!(dropdown.value().get(), 0);

        let handle = dropdown.native().handle();
        let options = dropdown.mirror().read().unwrap();
        assert_eq!(host.field(handle, "options"), Some(FieldValue::List(options.clone())));
        assert_eq!(options[0].get("text").and_then(FieldValue::as_text), Some("Level 1"));
        assert!(host.dirty_count(handle) >= 1);
    }

    #[test]
    fn selection_follows_option_count() {
        let (dispatcher, _thread) = Dispatcher::spawn(DispatcherConfig::default()).unwrap();
        let bridge = NativeBridge::new(dispatcher, MemoryHost::new());
        let dropdown = Dropdown::<DropdownOption>::new(&bridge).unwrap();

        for text in ["a", "b", "c", "d"] {
            dropdown.add_option(DropdownOption::new(text)).unwrap();
        }
        assert!(dropdown.select(9));
        assert_eq!(dropdown.value().get(), 3);

        // Two options become one: the length shrinks by one.
        dropdown.options().replace_range(2, 2, [DropdownOption::new("e")]).unwrap();
        assert_eq!(dropdown.value().get(), 2);
        assert_eq!(dropdown.selected().map(|o| o.text.clone()), Some(String::from("e")));

        dropdown.engine_value_changed(-4);
        assert_eq!(dropdown.value().get(), 0);
        dropdown.clear_options().unwrap();
        assert_eq!(dropdown.value().get(), 0);
        assert!(dropdown.selected().is_none());
    }

    impl From<u32> for DropdownOption {
        fn from(n: u32) -> Self {
            DropdownOption::new(n.to_string())
        }
    }
}
