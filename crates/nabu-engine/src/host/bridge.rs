use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{FieldValue, HostError, NativeHandle, NativeHost, NativeKind};
use crate::dispatch::Dispatcher;

/// Thread-marshaling front for a [`NativeHost`].
///
/// Cheap to clone. Every call reaches the host on the dispatcher's designated
/// thread: blocking calls go through [`Dispatcher::send`], fire-and-forget
/// calls through [`Dispatcher::post`].
///
/// The host sits behind a mutex only so the bridge can be shared between
/// threads; the mutex is taken on the designated thread exclusively and is
/// therefore never contended.
#[derive(Clone)]
pub struct NativeBridge {
    dispatcher: Dispatcher,
    host: Arc<Mutex<Box<dyn NativeHost>>>,
}

impl NativeBridge {
    pub fn new<H: NativeHost>(dispatcher: Dispatcher, host: H) -> Self {
        Self {
            dispatcher,
            host: Arc::new(Mutex::new(Box::new(host))),
        }
    }

    #[inline]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Runs `f` against the host. Only allowed on the designated thread.
    ///
    /// This is the entry point for code that already runs there, e.g. actions
    /// posted by the binding layer. Must not be nested.
    pub fn with_host<R>(&self, f: impl FnOnce(&mut dyn NativeHost) -> R) -> Result<R, HostError> {
        if !self.dispatcher.is_dispatch_thread() {
            return Err(HostError::WrongThread);
        }
        let mut host = self.host.lock();
        Ok(f(host.as_mut()))
    }

    // ── Blocking calls ────────────────────────────────────────────────────

    /// Creates a native object and waits for its handle.
    pub fn create(&self, kind: NativeKind) -> Result<NativeHandle, HostError> {
        let host = Arc::clone(&self.host);
        self.dispatcher.send(move || host.lock().create(kind))?
    }

    /// Reads a field and waits for the value.
    pub fn read(&self, handle: NativeHandle, field: &str) -> Result<FieldValue, HostError> {
        let host = Arc::clone(&self.host);
        let field = field.to_string();
        self.dispatcher.send(move || host.lock().read_field(handle, &field))?
    }

    /// Writes a field and waits until the host has accepted or rejected it.
    pub fn write(&self, handle: NativeHandle, field: &str, value: FieldValue) -> Result<(), HostError> {
        let host = Arc::clone(&self.host);
        let field = field.to_string();
        self.dispatcher
            .send(move || host.lock().write_field(handle, &field, value))?
    }

    // ── Fire-and-forget calls ─────────────────────────────────────────────

    /// Queues a field write. Host errors are logged on the designated thread.
    pub fn post_write(&self, handle: NativeHandle, field: &str, value: FieldValue) -> Result<(), HostError> {
        let host = Arc::clone(&self.host);
        let field = field.to_string();
        self.dispatcher.post(move || {
            if let Err(e) = host.lock().write_field(handle, &field, value) {
                log::warn!("write of `{field}` on {handle} failed: {e}");
            }
        })?;
        Ok(())
    }

    /// Queues a dirty hint.
    pub fn mark_dirty(&self, handle: NativeHandle) {
        let host = Arc::clone(&self.host);
        if self.dispatcher.post(move || host.lock().mark_dirty(handle)).is_err() {
            log::debug!("mark_dirty({handle}) dropped: dispatch loop is gone");
        }
    }

    /// Queues destruction of a native object.
    ///
    /// When the dispatch loop is already gone the host is gone with it, so the
    /// request is dropped.
    pub fn destroy(&self, handle: NativeHandle) {
        let host = Arc::clone(&self.host);
        if self.dispatcher.post(move || host.lock().destroy(handle)).is_err() {
            log::debug!("destroy({handle}) dropped: dispatch loop is gone");
        }
    }
}

impl fmt::Debug for NativeBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeBridge")
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}
