use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::{BindingMode, PropertyKey};
use crate::subscription::Subscription;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct PropertyState<T> {
    value: T,
    default: T,
    version: u64,
    next_id: u64,
    /// Model-side listeners, notified on every change.
    listeners: Vec<(u64, Callback<T>)>,
    /// Engine-side writers, notified on model → engine changes only.
    sinks: Vec<(u64, Callback<T>)>,
}

impl<T> PropertyState<T> {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// One bindable value cell.
///
/// Cheap to clone; clones share the same cell. Callbacks run on the thread
/// that changed the value, after the internal lock has been released, so a
/// callback may read or even set the property again.
pub struct Property<T> {
    key: PropertyKey<T>,
    state: Arc<Mutex<PropertyState<T>>>,
}

impl<T> Property<T>
where
    T: Clone + PartialEq + Send + 'static,
{
    pub fn new(key: PropertyKey<T>, default: T) -> Self {
        Self {
            key,
            state: Arc::new(Mutex::new(PropertyState {
                value: default.clone(),
                default,
                version: 0,
                next_id: 0,
                listeners: Vec::new(),
                sinks: Vec::new(),
            })),
        }
    }

    // ── Reads ─────────────────────────────────────────────────────────────

    pub fn get(&self) -> T {
        self.state.lock().value.clone()
    }

    /// Reads the value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.state.lock().value)
    }

    /// Incremented on every accepted change.
    pub fn version(&self) -> u64 {
        self.state.lock().version
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.key.name()
    }

    #[inline]
    pub fn mode(&self) -> BindingMode {
        self.key.mode()
    }

    #[inline]
    pub fn key(&self) -> PropertyKey<T> {
        self.key
    }

    // ── Writes ────────────────────────────────────────────────────────────

    /// Sets the value from the model side.
    ///
    /// Returns `false` (and notifies nobody) when the value is unchanged.
    /// Engine sinks are notified only when the binding mode writes to the
    /// engine.
    pub fn set(&self, value: T) -> bool {
        let writes_to_target = self.mode().writes_to_target();
        let Some((listeners, sinks)) = self.store(value.clone(), writes_to_target) else {
            return false;
        };
        for listener in &listeners {
            listener(&value);
        }
        for sink in &sinks {
            sink(&value);
        }
        true
    }

    /// Accepts a value that originated in the engine.
    ///
    /// Listeners are notified; engine sinks are not, so the change does not
    /// bounce back to the native object. Ignored when the binding mode does
    /// not read from the engine.
    pub fn push_from_engine(&self, value: T) -> bool {
        if !self.mode().reads_from_target() {
            log::trace!("`{}`: engine value ignored in {:?} mode", self.name(), self.mode());
            return false;
        }
        let Some((listeners, _)) = self.store(value.clone(), false) else {
            return false;
        };
        for listener in &listeners {
            listener(&value);
        }
        true
    }

    /// Restores the default value through [`set`](Self::set).
    pub fn reset(&self) -> bool {
        let default = self.state.lock().default.clone();
        self.set(default)
    }

    fn store(&self, value: T, with_sinks: bool) -> Option<(Vec<Callback<T>>, Vec<Callback<T>>)> {
        let mut state = self.state.lock();
        if state.value == value {
            return None;
        }
        state.value = value;
        state.version += 1;
        let listeners = state.listeners.iter().map(|(_, f)| Arc::clone(f)).collect();
        let sinks = if with_sinks {
            state.sinks.iter().map(|(_, f)| Arc::clone(f)).collect()
        } else {
            Vec::new()
        };
        Some((listeners, sinks))
    }

    // ── Observation ───────────────────────────────────────────────────────

    /// Calls `f` with every new value, whichever side it came from.
    pub fn subscribe(&self, f: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let id = {
            let mut state = self.state.lock();
            let id = state.next_id();
            state.listeners.push((id, Arc::new(f)));
            id
        };
        let weak = Arc::downgrade(&self.state);
        Subscription::new(move || remove(&weak, id, |s| &mut s.listeners))
    }

    /// Registers the engine-side writer for this property.
    ///
    /// When the mode writes to the engine, `sink` is called immediately with
    /// the current value and afterwards on every model-side change.
    pub fn bind_engine(&self, sink: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let sink: Callback<T> = Arc::new(sink);
        let (id, current) = {
            let mut state = self.state.lock();
            let id = state.next_id();
            state.sinks.push((id, Arc::clone(&sink)));
            (id, state.value.clone())
        };
        if self.mode().writes_to_target() {
            sink(&current);
        }
        let weak = Arc::downgrade(&self.state);
        Subscription::new(move || remove(&weak, id, |s| &mut s.sinks))
    }
}

fn remove<T>(
    state: &Weak<Mutex<PropertyState<T>>>,
    id: u64,
    list: impl FnOnce(&mut PropertyState<T>) -> &mut Vec<(u64, Callback<T>)>,
) {
    if let Some(state) = state.upgrade() {
        let mut state = state.lock();
        list(&mut state).retain(|(i, _)| *i != id);
    }
}

impl<T> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            state: Arc::clone(&self.state),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Property")
            .field("name", &self.key.name())
            .field("mode", &self.key.mode())
            .field("value", &state.value)
            .field("version", &state.version)
            .finish()
    }
}
