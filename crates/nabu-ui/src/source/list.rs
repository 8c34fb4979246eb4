use std::cell::RefCell;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::ReentrantMutex;

use crate::collection::move_within;
use crate::error::CollectionError;
use crate::subscription::Subscription;

static NEXT_SOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of an [`ObservableList`], shared by all of its clones.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct SourceId(u64);

impl SourceId {
    fn next() -> Self {
        SourceId(NEXT_SOURCE_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source#{}", self.0)
    }
}

/// One mutation of an [`ObservableList`].
#[derive(Debug, Clone, PartialEq)]
pub enum ListChange<S> {
    /// `items` now occupy `index..index + items.len()`.
    Inserted { index: usize, items: Vec<S> },
    Removed { index: usize, count: usize },
    /// `items` replaced the same number of elements starting at `index`.
    Replaced { index: usize, items: Vec<S> },
    /// The block `from..from + count` now starts at `to` (final indexing).
    Moved { from: usize, to: usize, count: usize },
    /// The whole content was replaced by `items`.
    Reset { items: Vec<S> },
}

impl<S: Clone> ListChange<S> {
    /// Replays the change on `list`, which must hold what the source held
    /// right before it.
    pub fn apply_to(&self, list: &mut Vec<S>) -> Result<(), CollectionError> {
        match self {
            ListChange::Inserted { index, items } => {
                CollectionError::check_range("insert", *index, 0, list.len())?;
                list.splice(*index..*index, items.iter().cloned());
            }
            ListChange::Removed { index, count } => {
                CollectionError::check_range("remove", *index, *count, list.len())?;
                list.drain(*index..*index + *count);
            }
            ListChange::Replaced { index, items } => {
                CollectionError::check_range("replace", *index, items.len(), list.len())?;
                list.splice(*index..*index + items.len(), items.iter().cloned());
            }
            ListChange::Moved { from, to, count } => {
                CollectionError::check_range("move", *from, *count, list.len())?;
                CollectionError::check_range("move", *to, *count, list.len())?;
                move_within(list, *from, *to, *count);
            }
            ListChange::Reset { items } => *list = items.clone(),
        }
        Ok(())
    }
}

type Callback<S> = Box<dyn Fn(&ListChange<S>) + Send + Sync>;

struct Listener<S> {
    id: u64,
    active: AtomicBool,
    /// Held while the callback runs; unsubscribing waits for it.
    gate: ReentrantMutex<()>,
    callback: Callback<S>,
}

impl<S> Listener<S> {
    fn notify(&self, change: &ListChange<S>) {
        let _gate = self.gate.lock();
        if self.active.load(Ordering::Acquire) {
            (self.callback)(change);
        }
    }

    fn deactivate(&self) {
        let _gate = self.gate.lock();
        self.active.store(false, Ordering::Release);
    }
}

/// A change waiting to be announced, with the listeners registered when
/// it happened.
type Pending<S> = (ListChange<S>, Vec<Arc<Listener<S>>>);

struct ListState<S> {
    items: Vec<S>,
    listeners: Vec<Arc<Listener<S>>>,
    next_listener: u64,
    /// Announced in FIFO order by the outermost mutation.
    pending: VecDeque<Pending<S>>,
    delivering: bool,
}

struct ListShared<S> {
    id: SourceId,
    // Notifications are sent with the lock held and the RefCell released, so
    // listeners may read the list from the same thread. A mutation made from
    // inside a listener is queued behind the change being announced.
    state: ReentrantMutex<RefCell<ListState<S>>>,
}

/// Clears the delivering flag even if a listener panics.
struct Delivering<'a, S>(&'a RefCell<ListState<S>>);

impl<S> Drop for Delivering<'_, S> {
    fn drop(&mut self) {
        let mut state = self.0.borrow_mut();
        state.delivering = false;
        state.pending.clear();
    }
}

// ── ObservableList ────────────────────────────────────────────────────────

/// A thread-safe observable sequence.
///
/// Cheap to clone; clones share content, listeners and [`SourceId`].
/// Mutations from different threads are serialized, and each one is fully
/// announced before the next one starts. A listener may mutate the list it
/// observes; that change is announced to everyone once the current one has
/// reached every listener.
pub struct ObservableList<S> {
    shared: Arc<ListShared<S>>,
}

impl<S> ObservableList<S>
where
    S: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    pub fn from_vec(items: Vec<S>) -> Self {
        Self {
            shared: Arc::new(ListShared {
                id: SourceId::next(),
                state: ReentrantMutex::new(RefCell::new(ListState {
                    items,
                    listeners: Vec::new(),
                    next_listener: 0,
                    pending: VecDeque::new(),
                    delivering: false,
                })),
            }),
        }
    }

    #[inline]
    pub fn id(&self) -> SourceId {
        self.shared.id
    }

    // ── Reads ─────────────────────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.shared.state.lock().borrow().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<S> {
        self.shared.state.lock().borrow().items.get(index).cloned()
    }

    pub fn snapshot(&self) -> Vec<S> {
        self.shared.state.lock().borrow().items.clone()
    }

    pub fn listener_count(&self) -> usize {
        self.shared.state.lock().borrow().listeners.len()
    }

    // ── Mutations ─────────────────────────────────────────────────────────

    /// Inserts `items` so that the first one lands at `index`.
    pub fn insert(&self, index: usize, items: Vec<S>) -> Result<(), CollectionError> {
        self.mutate(|list| {
            CollectionError::check_range("insert", index, 0, list.len())?;
            if items.is_empty() {
                return Ok(None);
            }
            list.splice(index..index, items.iter().cloned());
            Ok(Some(ListChange::Inserted { index, items }))
        })
    }

    pub fn push(&self, item: S) {
        let result = self.mutate(|list| {
            let index = list.len();
            list.push(item.clone());
            Ok(Some(ListChange::Inserted { index, items: vec![item] }))
        });
        debug_assert!(result.is_ok());
    }

    pub fn remove(&self, index: usize, count: usize) -> Result<(), CollectionError> {
        self.mutate(|list| {
            CollectionError::check_range("remove", index, count, list.len())?;
            if count == 0 {
                return Ok(None);
            }
            list.drain(index..index + count);
            Ok(Some(ListChange::Removed { index, count }))
        })
    }

    /// Overwrites `items.len()` elements starting at `index`.
    pub fn replace(&self, index: usize, items: Vec<S>) -> Result<(), CollectionError> {
        self.mutate(|list| {
            CollectionError::check_range("replace", index, items.len(), list.len())?;
            if items.is_empty() {
                return Ok(None);
            }
            list.splice(index..index + items.len(), items.iter().cloned());
            Ok(Some(ListChange::Replaced { index, items }))
        })
    }

    /// Moves `count` elements from `from` so that the block starts at `to`
    /// in the resulting list.
    pub fn move_range(&self, from: usize, to: usize, count: usize) -> Result<(), CollectionError> {
        self.mutate(|list| {
            CollectionError::check_range("move", from, count, list.len())?;
            CollectionError::check_range("move", to, count, list.len())?;
            if count == 0 || from == to {
                return Ok(None);
            }
            move_within(list, from, to, count);
            Ok(Some(ListChange::Moved { from, to, count }))
        })
    }

    /// Replaces the whole content and announces a single reset.
    pub fn reset(&self, items: Vec<S>) {
        let result = self.mutate(|list| {
            *list = items.clone();
            Ok(Some(ListChange::Reset { items }))
        });
        debug_assert!(result.is_ok());
    }

    /// Removes everything, announced as one removal.
    pub fn clear(&self) {
        let result = self.mutate(|list| {
            let count = list.len();
            if count == 0 {
                return Ok(None);
            }
            list.clear();
            Ok(Some(ListChange::Removed { index: 0, count }))
        });
        debug_assert!(result.is_ok());
    }

    fn mutate(
        &self,
        f: impl FnOnce(&mut Vec<S>) -> Result<Option<ListChange<S>>, CollectionError>,
    ) -> Result<(), CollectionError> {
        let guard = self.shared.state.lock();
        {
            let mut state = guard.borrow_mut();
            let Some(change) = f(&mut state.items)? else {
                return Ok(());
            };
            let listeners = state.listeners.clone();
            state.pending.push_back((change, listeners));
            if state.delivering {
                // Nested in a listener; the outer mutation announces it.
                return Ok(());
            }
            state.delivering = true;
        }

        let _delivering = Delivering(&*guard);
        loop {
            let Some((change, listeners)) = guard.borrow_mut().pending.pop_front() else {
                break;
            };
            for listener in &listeners {
                listener.notify(&change);
            }
        }
        Ok(())
    }

    // ── Observation ───────────────────────────────────────────────────────

    /// Registers `callback` for future changes.
    pub fn subscribe(&self, callback: impl Fn(&ListChange<S>) + Send + Sync + 'static) -> Subscription {
        match self.try_attach(callback, |_| Ok::<(), Infallible>(())) {
            Ok(((), subscription)) => subscription,
            Err(never) => match never {},
        }
    }

    /// Runs `init` on the current content and registers `callback`, both
    /// under the list's lock.
    ///
    /// No mutation can happen between the snapshot and the registration.
    /// When `init` fails nothing is registered.
    pub fn try_attach<R, E>(
        &self,
        callback: impl Fn(&ListChange<S>) + Send + Sync + 'static,
        init: impl FnOnce(&[S]) -> Result<R, E>,
    ) -> Result<(R, Subscription), E> {
        let guard = self.shared.state.lock();
        let snapshot = guard.borrow().items.clone();
        let value = init(&snapshot)?;

        let listener = {
            let mut state = guard.borrow_mut();
            state.next_listener += 1;
            let listener = Arc::new(Listener {
                id: state.next_listener,
                active: AtomicBool::new(true),
                gate: ReentrantMutex::new(()),
                callback: Box::new(callback),
            });
            state.listeners.push(Arc::clone(&listener));
            listener
        };
        drop(guard);

        let shared = Arc::downgrade(&self.shared);
        Ok((value, Subscription::new(move || detach(&shared, &listener))))
    }
}

fn detach<S>(shared: &Weak<ListShared<S>>, listener: &Listener<S>) {
    // Wait out an in-flight callback first; the list lock is taken after the
    // gate is released.
    listener.deactivate();
    if let Some(shared) = shared.upgrade() {
        let guard = shared.state.lock();
        guard.borrow_mut().listeners.retain(|l| l.id != listener.id);
    }
}

impl<S> Clone for ObservableList<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S: Clone + Send + 'static> Default for ObservableList<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Clone + Send + 'static> From<Vec<S>> for ObservableList<S> {
    fn from(items: Vec<S>) -> Self {
        Self::from_vec(items)
    }
}

impl<S: fmt::Debug> fmt::Debug for ObservableList<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.shared.state.lock();
        let state = guard.borrow();
        f.debug_struct("ObservableList")
            .field("id", &self.shared.id)
            .field("items", &state.items)
            .field("listeners", &state.listeners.len())
            .finish()
    }
}
