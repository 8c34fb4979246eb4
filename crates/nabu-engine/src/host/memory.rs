use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use super::{FieldValue, HostError, NativeHandle, NativeHost, NativeKind};

/// Which host entry point a [`HostCall`] went through.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum HostCallKind {
    Create,
    Read,
    Write,
    Destroy,
    MarkDirty,
}

/// One journal entry: what was called, on which object, from which thread.
#[derive(Debug, Clone, PartialEq)]
pub struct HostCall {
    pub kind: HostCallKind,
    pub handle: Option<NativeHandle>,
    pub field: Option<String>,
    pub thread: ThreadId,
}

/// State of one object held by a [`MemoryHost`].
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryObject {
    pub kind: NativeKind,
    pub fields: HashMap<String, FieldValue>,
    /// How many dirty hints the object received.
    pub dirty: u32,
}

#[derive(Debug, Default)]
struct MemoryState {
    next_handle: u64,
    objects: HashMap<NativeHandle, MemoryObject>,
    destroyed: Vec<NativeHandle>,
    journal: Vec<HostCall>,
    /// Kinds refused by `create`. Empty means everything is accepted.
    rejected: Vec<NativeKind>,
}

impl MemoryState {
    fn record(&mut self, kind: HostCallKind, handle: Option<NativeHandle>, field: Option<&str>) {
        self.journal.push(HostCall {
            kind,
            handle,
            field: field.map(str::to_string),
            thread: thread::current().id(),
        });
    }
}

// ── MemoryHost ────────────────────────────────────────────────────────────

/// A headless [`NativeHost`] that keeps objects in memory.
///
/// Clones share the same object table, so one clone can be handed to a
/// [`NativeBridge`](super::NativeBridge) while another is kept for
/// inspection. Every call is journaled together with the calling thread.
///
/// Reading fields never fails for a live object: unset fields read as
/// [`FieldValue::Null`].
#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `create` refuse `kind` with [`HostError::Unsupported`].
    pub fn reject_kind(self, kind: NativeKind) -> Self {
        self.state.lock().rejected.push(kind);
        self
    }

    // ── Inspection ────────────────────────────────────────────────────────

    pub fn object(&self, handle: NativeHandle) -> Option<MemoryObject> {
        self.state.lock().objects.get(&handle).cloned()
    }

    pub fn field(&self, handle: NativeHandle, field: &str) -> Option<FieldValue> {
        self.state.lock().objects.get(&handle).and_then(|o| o.fields.get(field).cloned())
    }

    pub fn dirty_count(&self, handle: NativeHandle) -> u32 {
        self.state.lock().objects.get(&handle).map_or(0, |o| o.dirty)
    }

    pub fn is_destroyed(&self, handle: NativeHandle) -> bool {
        self.state.lock().destroyed.contains(&handle)
    }

    /// Number of objects created and not yet destroyed.
    pub fn live_count(&self) -> usize {
        self.state.lock().objects.len()
    }

    /// Live objects of `kind`.
    pub fn live_of(&self, kind: NativeKind) -> Vec<NativeHandle> {
        let state = self.state.lock();
        let mut handles: Vec<_> = state
            .objects
            .iter()
            .filter(|(_, o)| o.kind == kind)
            .map(|(h, _)| *h)
            .collect();
        handles.sort();
        handles
    }

    pub fn journal(&self) -> Vec<HostCall> {
        self.state.lock().journal.clone()
    }

    /// Number of journaled writes of `field` on `handle`.
    pub fn writes_to(&self, handle: NativeHandle, field: &str) -> usize {
        self.state
            .lock()
            .journal
            .iter()
            .filter(|c| c.kind == HostCallKind::Write && c.handle == Some(handle) && c.field.as_deref() == Some(field))
            .count()
    }
}

impl NativeHost for MemoryHost {
    fn create(&mut self, kind: NativeKind) -> Result<NativeHandle, HostError> {
        let mut state = self.state.lock();
        if state.rejected.contains(&kind) {
            return Err(HostError::Unsupported(kind));
        }
        state.next_handle += 1;
        let handle = NativeHandle::from_raw(state.next_handle);
        state.objects.insert(handle, MemoryObject { kind, fields: HashMap::new(), dirty: 0 });
        state.record(HostCallKind::Create, Some(handle), None);
        Ok(handle)
    }

    fn read_field(&self, handle: NativeHandle, field: &str) -> Result<FieldValue, HostError> {
        let mut state = self.state.lock();
        state.record(HostCallKind::Read, Some(handle), Some(field));
        let object = state.objects.get(&handle).ok_or(HostError::UnknownHandle(handle))?;
        Ok(object.fields.get(field).cloned().unwrap_or_default())
    }

    fn write_field(&mut self, handle: NativeHandle, field: &str, value: FieldValue) -> Result<(), HostError> {
        let mut state = self.state.lock();
        state.record(HostCallKind::Write, Some(handle), Some(field));
        let object = state.objects.get_mut(&handle).ok_or(HostError::UnknownHandle(handle))?;
        object.fields.insert(field.to_string(), value);
        Ok(())
    }

    fn destroy(&mut self, handle: NativeHandle) {
        let mut state = self.state.lock();
        state.record(HostCallKind::Destroy, Some(handle), None);
        if state.objects.remove(&handle).is_some() {
            state.destroyed.push(handle);
        }
    }

    fn mark_dirty(&mut self, handle: NativeHandle) {
        let mut state = self.state.lock();
        state.record(HostCallKind::MarkDirty, Some(handle), None);
        if let Some(object) = state.objects.get_mut(&handle) {
            object.dirty += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_write_read() {
        let mut host = MemoryHost::new();
        let h = host.create(NativeKind::SLIDER).unwrap();
        host.write_field(h, "value", FieldValue::Float(2.0)).unwrap();
        assert_eq!(host.read_field(h, "value").unwrap(), FieldValue::Float(2.0));
        assert_eq!(host.read_field(h, "unset").unwrap(), FieldValue::Null);
        assert_eq!(host.live_of(NativeKind::SLIDER), vec![h]);
    }

    #[test]
    fn unknown_handle_is_reported() {
        let mut host = MemoryHost::new();
        let ghost = NativeHandle::from_raw(99);
        assert_eq!(host.write_field(ghost, "x", FieldValue::Null), Err(HostError::UnknownHandle(ghost)));
    }

    #[test]
    fn rejected_kind() {
        let mut host = MemoryHost::new().reject_kind(NativeKind::MESH);
        assert_eq!(host.create(NativeKind::MESH), Err(HostError::Unsupported(NativeKind::MESH)));
        assert!(host.create(NativeKind::CANVAS).is_ok());
    }

    #[test]
    fn clones_share_objects() {
        let mut host = MemoryHost::new();
        let view = host.clone();
        let h = host.create(NativeKind::CANVAS).unwrap();
        host.mark_dirty(h);
        host.mark_dirty(h);
        assert_eq!(view.dirty_count(h), 2);
        host.destroy(h);
        assert!(view.is_destroyed(h));
        assert_eq!(view.live_count(), 0);
    }
}
