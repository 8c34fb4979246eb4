use std::fmt;
use std::sync::Arc;

use nabu_engine::host::{FieldValue, HostError, NativeBridge, NativeHandle, NativeKind};
use parking_lot::Mutex;

use crate::property::Property;
use crate::subscription::Subscription;

/// Ownership of one native object.
///
/// Creation waits for the designated thread; writes, dirty hints and the
/// final destroy are posted. The native object is destroyed when the
/// component is dropped.
pub struct NativeComponent {
    bridge: NativeBridge,
    kind: NativeKind,
    handle: NativeHandle,
    bindings: Mutex<Vec<Subscription>>,
}

impl NativeComponent {
    pub fn create(bridge: &NativeBridge, kind: NativeKind) -> Result<Self, HostError> {
        let handle = bridge.create(kind)?;
        log::trace!("created {kind} {handle}");
        Ok(Self {
            bridge: bridge.clone(),
            kind,
            handle,
            bindings: Mutex::new(Vec::new()),
        })
    }

    #[inline]
    pub fn handle(&self) -> NativeHandle {
        self.handle
    }

    #[inline]
    pub fn kind(&self) -> NativeKind {
        self.kind
    }

    #[inline]
    pub fn bridge(&self) -> &NativeBridge {
        &self.bridge
    }

    /// Queues a field write.
    pub fn write(&self, field: &str, value: impl Into<FieldValue>) -> Result<(), HostError> {
        self.bridge.post_write(self.handle, field, value.into())
    }

    /// Reads a field, waiting for the designated thread.
    pub fn read(&self, field: &str) -> Result<FieldValue, HostError> {
        self.bridge.read(self.handle, field)
    }

    pub fn mark_dirty(&self) {
        self.bridge.mark_dirty(self.handle);
    }

    /// Writes `field` whenever `property` changes on the model side, starting
    /// with its current value. The binding lives as long as the component.
    pub fn bind<T>(&self, property: &Property<T>, field: &'static str)
    where
        T: Clone + PartialEq + Send + Into<FieldValue> + 'static,
    {
        let bridge = self.bridge.clone();
        let handle = self.handle;
        let subscription = property.bind_engine(move |value| {
            if let Err(e) = bridge.post_write(handle, field, value.clone().into()) {
                log::warn!("`{field}` not written to {handle}: {e}");
            }
        });
        self.bindings.lock().push(subscription);
    }

    /// Callback for [`NativeMirror`](crate::collection::NativeMirror) that
    /// writes the mirrored list into `field` on the designated thread and
    /// optionally marks the object dirty.
    pub(crate) fn list_writer(&self, field: &'static str, mark_dirty: bool) -> Arc<dyn Fn(&[FieldValue]) + Send + Sync> {
        let bridge = self.bridge.clone();
        let handle = self.handle;
        Arc::new(move |values: &[FieldValue]| {
            let written = bridge
                .with_host(|host| {
                    host.write_field(handle, field, FieldValue::List(values.to_vec()))?;
                    if mark_dirty {
                        host.mark_dirty(handle);
                    }
                    Ok::<(), HostError>(())
                })
                .and_then(|result| result);
            if let Err(e) = written {
                log::warn!("`{field}` not refreshed on {handle}: {e}");
            }
        })
    }
}

impl Drop for NativeComponent {
    fn drop(&mut self) {
        self.bindings.get_mut().clear();
        self.bridge.destroy(self.handle);
    }
}

impl fmt::Debug for NativeComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeComponent")
            .field("kind", &self.kind)
            .field("handle", &self.handle)
            .finish()
    }
}
