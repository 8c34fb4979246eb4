use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{Receiver, Sender, TryRecvError};

use super::error::DispatchError;

type Job = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Job),
    Shutdown,
}

// ── DispatcherConfig ──────────────────────────────────────────────────────

/// Configuration for a dedicated dispatch thread.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub thread_name: String,
    /// Stack size for the spawned thread. `None` uses the platform default.
    pub stack_size: Option<usize>,
}

impl DispatcherConfig {
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            thread_name: "nabu-dispatch".to_string(),
            stack_size: None,
        }
    }
}

// ── Dispatcher ────────────────────────────────────────────────────────────

/// Handle to the designated thread.
///
/// Cheap to clone and safe to share across threads. The designated thread is
/// chosen at construction and never changes.
///
/// ```rust,ignore
/// let (dispatcher, thread) = Dispatcher::spawn(DispatcherConfig::default())?;
///
/// let answer = dispatcher.send(|| 6 * 7)?;
/// dispatcher.post(move || log::info!("answer was {answer}"))?;
///
/// thread.shutdown()?;
/// ```
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

struct Inner {
    tx: Sender<Message>,
    thread_id: ThreadId,
}

impl Dispatcher {
    /// Makes the calling thread the designated thread.
    ///
    /// The returned [`DispatchLoop`] must be driven on this same thread, either
    /// with [`DispatchLoop::run`] or by calling [`DispatchLoop::run_pending`]
    /// from the thread's own event loop.
    pub fn current() -> (Dispatcher, DispatchLoop) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let thread_id = thread::current().id();
        let dispatcher = Dispatcher {
            inner: Arc::new(Inner { tx, thread_id }),
        };
        (dispatcher, DispatchLoop::new(rx, thread_id))
    }

    /// Spawns a dedicated designated thread running the dispatch loop.
    pub fn spawn(config: DispatcherConfig) -> Result<(Dispatcher, DispatchThread)> {
        let (tx, rx) = crossbeam_channel::unbounded();

        let mut builder = thread::Builder::new().name(config.thread_name.clone());
        if let Some(bytes) = config.stack_size {
            builder = builder.stack_size(bytes);
        }

        let handle = builder
            .spawn(move || {
                let dispatch_loop = DispatchLoop::new(rx, thread::current().id());
                dispatch_loop.run();
            })
            .with_context(|| format!("failed to spawn dispatch thread '{}'", config.thread_name))?;

        let thread_id = handle.thread().id();
        log::debug!("dispatch thread '{}' started", config.thread_name);

        let dispatcher = Dispatcher {
            inner: Arc::new(Inner { tx: tx.clone(), thread_id }),
        };
        let thread = DispatchThread {
            name: config.thread_name,
            control: tx,
            handle: Some(handle),
        };
        Ok((dispatcher, thread))
    }

    /// Returns `true` when called on the designated thread.
    #[inline]
    pub fn is_dispatch_thread(&self) -> bool {
        thread::current().id() == self.inner.thread_id
    }

    /// Identifier of the designated thread.
    #[inline]
    pub fn thread_id(&self) -> ThreadId {
        self.inner.thread_id
    }

    /// Runs `action` on the designated thread and waits for its result.
    ///
    /// Called on the designated thread itself, the action runs inline. A panic
    /// inside the action is resumed on the calling thread.
    pub fn send<R, F>(&self, action: F) -> Result<R, DispatchError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.is_dispatch_thread() {
            return Ok(action());
        }

        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        self.enqueue(Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(action));
            // The caller may have given up waiting only if its thread died.
            let _ = reply_tx.send(outcome);
        }))?;

        match reply_rx.recv() {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(payload)) => panic::resume_unwind(payload),
            // The job was dropped unexecuted: the loop stopped first.
            Err(_) => Err(DispatchError::Disconnected),
        }
    }

    /// Queues `action` for the designated thread and returns immediately.
    ///
    /// Posting from the designated thread also queues; it never runs inline,
    /// so ordering with earlier posts is kept.
    pub fn post<F>(&self, action: F) -> Result<(), DispatchError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.enqueue(Box::new(action))
    }

    fn enqueue(&self, job: Job) -> Result<(), DispatchError> {
        self.inner
            .tx
            .send(Message::Run(job))
            .map_err(|_| DispatchError::Disconnected)
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("thread_id", &self.inner.thread_id)
            .field("queued", &self.inner.tx.len())
            .finish()
    }
}

// ── DispatchLoop ──────────────────────────────────────────────────────────

/// Receiving end of a dispatcher, bound to the designated thread.
///
/// Not `Send`: it can only be driven from the thread that created it.
pub struct DispatchLoop {
    rx: Receiver<Message>,
    thread_id: ThreadId,
    // Raw pointer marker: the loop stays on its thread.
    _marker: PhantomData<*const ()>,
}

impl DispatchLoop {
    fn new(rx: Receiver<Message>, thread_id: ThreadId) -> Self {
        Self { rx, thread_id, _marker: PhantomData }
    }

    /// Runs actions until every [`Dispatcher`] is dropped or a shutdown is requested.
    pub fn run(self) {
        debug_assert_eq!(thread::current().id(), self.thread_id);
        while let Ok(message) = self.rx.recv() {
            match message {
                Message::Run(job) => run_job(job),
                Message::Shutdown => break,
            }
        }
        log::debug!("dispatch loop stopped");
    }

    /// Runs every action queued so far without blocking.
    ///
    /// Actions queued by the actions themselves also run before this returns.
    /// Returns the number of actions executed.
    pub fn run_pending(&self) -> usize {
        debug_assert_eq!(thread::current().id(), self.thread_id);
        let mut executed = 0;
        loop {
            match self.rx.try_recv() {
                Ok(Message::Run(job)) => {
                    run_job(job);
                    executed += 1;
                }
                Ok(Message::Shutdown) | Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {
                    return executed;
                }
            }
        }
    }

    /// Number of actions waiting in the queue.
    pub fn queued(&self) -> usize {
        self.rx.len()
    }
}

fn run_job(job: Job) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
        log::error!("posted action panicked: {}", panic_message(payload.as_ref()));
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}

// ── DispatchThread ────────────────────────────────────────────────────────

/// Owner of a dedicated dispatch thread started by [`Dispatcher::spawn`].
///
/// Dropping it stops the loop after the actions already queued and joins the
/// thread. Actions queued after that fail with [`DispatchError::Disconnected`].
pub struct DispatchThread {
    name: String,
    control: Sender<Message>,
    handle: Option<JoinHandle<()>>,
}

impl DispatchThread {
    /// Stops the loop once the queue ahead of the request drains, then joins.
    pub fn shutdown(mut self) -> Result<()> {
        self.stop()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn stop(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        // Already gone if the loop panicked; join reports that below.
        let _ = self.control.send(Message::Shutdown);

        if handle.thread().id() == thread::current().id() {
            // Joining ourselves would deadlock; the loop exits on its own.
            return Ok(());
        }
        handle
            .join()
            .map_err(|payload| anyhow!("dispatch thread '{}' panicked: {}", self.name, panic_message(payload.as_ref())))?;
        log::debug!("dispatch thread '{}' joined", self.name);
        Ok(())
    }
}

impl Drop for DispatchThread {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::error!("{e:#}");
        }
    }
}

impl fmt::Debug for DispatchThread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchThread")
            .field("name", &self.name)
            .field("running", &self.handle.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn spawn() -> (Dispatcher, DispatchThread) {
        Dispatcher::spawn(DispatcherConfig::default().thread_name("dispatch-test")).unwrap()
    }

    // ── send ──────────────────────────────────────────────────────────────

    #[test]
    fn send_runs_on_designated_thread() {
        let (dispatcher, thread) = spawn();
        let expected = dispatcher.thread_id();
        let ran_on = dispatcher.send(|| thread::current().id()).unwrap();
        assert_eq!(ran_on, expected);
        assert_ne!(ran_on, thread::current().id());
        thread.shutdown().unwrap();
    }

    #[test]
    fn send_returns_value() {
        let (dispatcher, _thread) = spawn();
        assert_eq!(dispatcher.send(|| 6 * 7).unwrap(), 42);
    }

    #[test]
    fn send_inline_on_designated_thread() {
        let (dispatcher, dispatch_loop) = Dispatcher::current();
        // No loop is running, so this would hang if it were queued.
        assert_eq!(dispatcher.send(|| "inline").unwrap(), "inline");
        assert_eq!(dispatch_loop.queued(), 0);
    }

    #[test]
    fn send_resumes_panic_on_caller() {
        let (dispatcher, _thread) = spawn();
        let d = dispatcher.clone();
        let result = thread::spawn(move || d.send(|| -> u32 { panic!("boom") })).join();
        assert!(result.is_err());
        // The loop survives the panic.
        assert_eq!(dispatcher.send(|| 1).unwrap(), 1);
    }

    #[test]
    fn send_after_shutdown_is_disconnected() {
        let (dispatcher, thread) = spawn();
        thread.shutdown().unwrap();
        assert_eq!(dispatcher.send(|| 1), Err(DispatchError::Disconnected));
        assert_eq!(dispatcher.post(|| {}), Err(DispatchError::Disconnected));
    }

    // ── post ──────────────────────────────────────────────────────────────

    #[test]
    fn post_preserves_fifo_order() {
        let (dispatcher, _thread) = spawn();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for i in 0..100 {
            let seen = Arc::clone(&seen);
            dispatcher.post(move || seen.lock().unwrap().push(i)).unwrap();
        }
        let seen_now = Arc::clone(&seen);
        let order = dispatcher.send(move || seen_now.lock().unwrap().clone()).unwrap();
        assert_eq!(order, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn post_panic_is_contained() {
        let (dispatcher, _thread) = spawn();
        dispatcher.post(|| panic!("lost")).unwrap();
        assert_eq!(dispatcher.send(|| 7).unwrap(), 7);
    }

    #[test]
    fn post_from_designated_thread_is_queued() {
        let (dispatcher, dispatch_loop) = Dispatcher::current();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        dispatcher.post(move || s.lock().unwrap().push("posted")).unwrap();
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(dispatch_loop.run_pending(), 1);
        assert_eq!(*seen.lock().unwrap(), vec!["posted"]);
    }

    #[test]
    fn run_pending_drains_nested_posts() {
        let (dispatcher, dispatch_loop) = Dispatcher::current();
        let count = Arc::new(Mutex::new(0));
        let (d, c) = (dispatcher.clone(), Arc::clone(&count));
        dispatcher
            .post(move || {
                *c.lock().unwrap() += 1;
                let c = Arc::clone(&c);
                d.post(move || *c.lock().unwrap() += 1).unwrap();
            })
            .unwrap();
        assert_eq!(dispatch_loop.run_pending(), 2);
        assert_eq!(*count.lock().unwrap(), 2);
    }

    #[test]
    fn is_dispatch_thread_reports_affinity() {
        let (dispatcher, _thread) = spawn();
        assert!(!dispatcher.is_dispatch_thread());
        let d = dispatcher.clone();
        assert!(dispatcher.send(move || d.is_dispatch_thread()).unwrap());
    }
}
