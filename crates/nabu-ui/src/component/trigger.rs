use std::fmt;
use std::sync::Arc;

use nabu_engine::host::{FieldValue, HostError, NativeBridge, NativeHandle, NativeKind};
use parking_lot::Mutex;

use super::NativeComponent;
use crate::collection::{ItemLifecycle, NativeMirror, TemplatableCollection, TemplatedItem};
use crate::error::CollectionError;
use crate::source::ObservableList;

type TriggerCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// One event → callbacks entry of an [`EventTrigger`].
///
/// Backed by its own native object. Clones share the native object and the
/// callback list; the object is destroyed with the last clone.
#[derive(Clone)]
pub struct TriggerEntry {
    event: Arc<str>,
    native: Arc<NativeComponent>,
    callbacks: Arc<Mutex<Vec<TriggerCallback>>>,
}

impl TriggerEntry {
    pub fn new(bridge: &NativeBridge, event: impl Into<Arc<str>>) -> Result<Self, HostError> {
        let event = event.into();
        let native = NativeComponent::create(bridge, NativeKind::TRIGGER_ENTRY)?;
        native.write("event", FieldValue::from(&*event))?;
        Ok(Self {
            event,
            native: Arc::new(native),
            callbacks: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn on_fire(self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.add_callback(f);
        self
    }

    pub fn add_callback(&self, f: impl Fn(&str) + Send + Sync + 'static) {
        self.callbacks.lock().push(Arc::new(f));
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    #[inline]
    pub fn handle(&self) -> NativeHandle {
        self.native.handle()
    }

    pub fn callback_count(&self) -> usize {
        self.callbacks.lock().len()
    }

    /// Drops every callback. Called when the entry leaves its trigger.
    pub fn release_callbacks(&self) {
        self.callbacks.lock().clear();
    }

    fn invoke(&self) -> usize {
        let callbacks = self.callbacks.lock().clone();
        for callback in &callbacks {
            callback(self.event());
        }
        callbacks.len()
    }
}

impl fmt::Debug for TriggerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerEntry")
            .field("event", &self.event)
            .field("handle", &self.native.handle())
            .field("callbacks", &self.callback_count())
            .finish()
    }
}

struct ReleaseCallbacks;

impl ItemLifecycle<TriggerEntry> for ReleaseCallbacks {
    fn teardown(&self, item: &TemplatedItem<TriggerEntry>) {
        item.content().release_callbacks();
    }
}

/// A native event trigger holding a list of [`TriggerEntry`]s.
///
/// The `triggers` field of the native object lists the entry handles in
/// order and is rewritten on the designated thread after every change.
pub struct EventTrigger {
    native: NativeComponent,
    entries: TemplatableCollection<TriggerEntry, TriggerEntry, FieldValue>,
    mirror: NativeMirror<FieldValue>,
}

impl EventTrigger {
    pub fn new(bridge: &NativeBridge) -> Result<Self, HostError> {
        let native = NativeComponent::create(bridge, NativeKind::EVENT_TRIGGER)?;
        let entries = TemplatableCollection::with_projection(|e: &TriggerEntry| FieldValue::Handle(e.handle()));
        entries.add_lifecycle(ReleaseCallbacks);
        let mirror = entries.mirror_with(bridge.dispatcher(), Some(native.list_writer("triggers", false)));
        Ok(Self { native, entries, mirror })
    }

    #[inline]
    pub fn entries(&self) -> &TemplatableCollection<TriggerEntry, TriggerEntry, FieldValue> {
        &self.entries
    }

    #[inline]
    pub fn mirror(&self) -> &NativeMirror<FieldValue> {
        &self.mirror
    }

    #[inline]
    pub fn native(&self) -> &NativeComponent {
        &self.native
    }

    pub fn add_entry(&self, entry: TriggerEntry) -> Result<(), CollectionError> {
        self.entries.push(entry)
    }

    pub fn remove_entry(&self, index: usize) -> Result<(), CollectionError> {
        self.entries.remove_at(index)
    }

    pub fn set_items_source(&self, source: Option<&ObservableList<TriggerEntry>>) -> Result<(), CollectionError> {
        self.entries.change_source(source)
    }

    /// Runs the callbacks of every entry listening for `event`, in entry
    /// order. Returns how many callbacks ran.
    pub fn fire(&self, event: &str) -> usize {
        self.entries
            .contents()
            .iter()
            .filter(|entry| entry.event() == event)
            .map(|entry| entry.invoke())
            .sum()
    }
}
