use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use nabu_engine::dispatch::Dispatcher;
use parking_lot::{Mutex, ReentrantMutex, RwLock};

use super::change::move_within;
use super::mirror::NativeMirror;
use super::{
    BindingContext, CollectionChange, CollectionObserver, ItemLifecycle, ItemTemplate, Template, TemplateId,
    TemplatedItem,
};
use crate::error::{CollectionError, TemplateError};
use crate::source::{ListChange, ObservableList, SourceId};
use crate::subscription::Subscription;

type Projection<T, P> = Box<dyn Fn(&T) -> P + Send + Sync>;

/// Who asked for a structural operation.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(super) enum Origin {
    /// The public API.
    Direct,
    /// A notification from the attached items source.
    Source(SourceId),
}

/// New content for a spliced range.
pub(super) enum Payload<T, S> {
    Direct(Vec<Arc<T>>),
    Source(Vec<S>),
}

struct Splice<T, S, P> {
    op: &'static str,
    index: usize,
    remove: usize,
    items: Vec<TemplatedItem<T>>,
    projected: Vec<P>,
    /// Replacement for the backing range. `None` leaves the backing list
    /// alone (direct mode keeps it empty).
    backing: Option<Vec<S>>,
}

struct State<T, S, P> {
    items: Vec<TemplatedItem<T>>,
    /// Source elements parallel to `items` while source-driven, else empty.
    backing: Vec<S>,
    projected: Vec<P>,
    template: Option<ItemTemplate<S, T>>,
    context: Option<BindingContext>,
    source: Option<SourceId>,
    last_error: Option<CollectionError>,
    /// Set once a source change could not be applied; `backing` keeps
    /// following the source, `items` do not.
    stale: bool,
    /// Committed changes not yet handed to the observers, in commit order.
    pending: VecDeque<CollectionChange<P>>,
    notifying: bool,
}

/// Clears the notifying flag even if an observer panics.
struct Notifying<'a, T, S, P>(&'a RefCell<State<T, S, P>>);

impl<T, S, P> Drop for Notifying<'_, T, S, P> {
    fn drop(&mut self) {
        let mut state = self.0.borrow_mut();
        state.notifying = false;
        state.pending.clear();
    }
}

pub(super) struct Core<T, S, P> {
    // Locked for the whole of every operation, hooks and observers
    // included. The RefCell is never borrowed across user code.
    state: ReentrantMutex<RefCell<State<T, S, P>>>,
    projection: Projection<T, P>,
    lifecycle: RwLock<Vec<Arc<dyn ItemLifecycle<T>>>>,
    observers: RwLock<Vec<Arc<dyn CollectionObserver<P>>>>,
}

fn template_id<S, T>(template: Option<&ItemTemplate<S, T>>) -> Option<TemplateId> {
    template.map(ItemTemplate::id)
}

fn build_item<T, S>(
    resolved: Option<Template<S, T>>,
    element: &S,
    context: Option<BindingContext>,
) -> Result<TemplatedItem<T>, TemplateError>
where
    T: From<S>,
    S: Clone,
{
    Ok(match resolved {
        Some(template) => TemplatedItem::new(Arc::new(template.materialize(element)?), Some(template.id()), context),
        None => TemplatedItem::new(Arc::new(T::from(element.clone())), None, context),
    })
}

impl<T, S, P> Core<T, S, P>
where
    T: From<S> + Send + Sync + 'static,
    S: Clone + Send + 'static,
    P: Clone + Send + 'static,
{
    fn new(project: Projection<T, P>) -> Self {
        Self {
            state: ReentrantMutex::new(RefCell::new(State {
                items: Vec::new(),
                backing: Vec::new(),
                projected: Vec::new(),
                template: None,
                context: None,
                source: None,
                last_error: None,
                stale: false,
                pending: VecDeque::new(),
                notifying: false,
            })),
            projection: project,
            lifecycle: RwLock::new(Vec::new()),
            observers: RwLock::new(Vec::new()),
        }
    }

    fn project(&self, content: &T) -> P {
        (self.projection)(content)
    }

    /// Decides whether an operation may run. `Ok(false)` means the request
    /// comes from a source that is no longer attached and must be ignored.
    fn admit(state: &RefCell<State<T, S, P>>, op: &'static str, origin: Origin) -> Result<bool, CollectionError> {
        let source = state.borrow().source;
        match origin {
            Origin::Direct if source.is_some() => Err(CollectionError::SourceDriven { op }),
            Origin::Direct => Ok(true),
            Origin::Source(id) => {
                if source != Some(id) {
                    log::trace!("{op}: ignoring notification from detached {id}");
                }
                Ok(source == Some(id))
            }
        }
    }

    // ── Materialization ───────────────────────────────────────────────────

    fn direct_items(&self, state: &RefCell<State<T, S, P>>, contents: Vec<Arc<T>>) -> (Vec<TemplatedItem<T>>, Vec<P>) {
        let context = state.borrow().context.clone();
        let projected = contents.iter().map(|c| self.project(c)).collect();
        let items = contents
            .into_iter()
            .map(|c| TemplatedItem::new(c, None, context.clone()))
            .collect();
        (items, projected)
    }

    /// Builds items for `elements` under the current template. Nothing is
    /// changed when any element fails.
    fn materialize(
        &self,
        state: &RefCell<State<T, S, P>>,
        elements: &[S],
    ) -> Result<(Vec<TemplatedItem<T>>, Vec<P>), TemplateError> {
        let (template, context) = {
            let state = state.borrow();
            (state.template.clone(), state.context.clone())
        };
        let items = elements
            .iter()
            .map(|e| build_item(template.as_ref().and_then(|t| t.resolve(e)), e, context.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        let projected = items.iter().map(|i| self.project(i.content())).collect();
        Ok((items, projected))
    }

    // ── Commit ────────────────────────────────────────────────────────────

    /// Applies a validated splice, then runs hooks and observers.
    ///
    /// A hook may start another operation on this collection; its change is
    /// committed right away but reaches the observers after this one.
    fn commit(&self, state: &RefCell<State<T, S, P>>, splice: Splice<T, S, P>) {
        let Splice { op, index, remove, items, projected, backing } = splice;
        let inserted = items.clone();
        let change = match (remove, items.len()) {
            (_, 0) => CollectionChange::Removed { index, count: remove },
            (0, _) => CollectionChange::Inserted { index, values: projected.clone() },
            _ => CollectionChange::Replaced { index, count: remove, values: projected.clone() },
        };

        let removed: Vec<TemplatedItem<T>> = {
            let mut state = state.borrow_mut();
            let range = index..index + remove;
            if let Some(backing) = backing {
                state.backing.splice(range.clone(), backing);
            }
            state.projected.splice(range.clone(), projected);
            state.pending.push_back(change);
            state.items.splice(range, items).collect()
        };
        log::trace!("{op} at {index}: -{} +{}", removed.len(), inserted.len());

        let hooks = self.lifecycle.read().clone();
        for item in &removed {
            for hook in &hooks {
                hook.teardown(item);
            }
        }
        for (offset, item) in inserted.iter().enumerate() {
            for hook in &hooks {
                hook.attached(item, index + offset);
            }
        }
        self.flush(state);
    }

    /// Hands pending changes to the observers. Only the outermost caller
    /// drains the queue.
    fn flush(&self, state: &RefCell<State<T, S, P>>) {
        if std::mem::replace(&mut state.borrow_mut().notifying, true) {
            return;
        }
        let _notifying = Notifying(state);
        loop {
            let Some(change) = state.borrow_mut().pending.pop_front() else {
                break;
            };
            let observers = self.observers.read().clone();
            for observer in &observers {
                observer.changed(&change);
            }
        }
    }

    // ── Structural operations ─────────────────────────────────────────────

    /// Replaces `remove` items at `index` with `payload`. Insert, remove and
    /// replace all come down to this.
    pub(super) fn splice(
        &self,
        op: &'static str,
        origin: Origin,
        index: usize,
        remove: usize,
        payload: Payload<T, S>,
    ) -> Result<(), CollectionError> {
        let guard = self.state.lock();
        if !Self::admit(&guard, op, origin)? {
            return Ok(());
        }
        let len = guard.borrow().items.len();
        CollectionError::check_range(op, index, remove, len)?;

        let (items, projected, backing) = match payload {
            Payload::Direct(contents) => {
                let (items, projected) = self.direct_items(&guard, contents);
                (items, projected, None)
            }
            Payload::Source(elements) => {
                let (items, projected) = self.materialize(&guard, &elements)?;
                (items, projected, Some(elements))
            }
        };
        if remove == 0 && items.is_empty() {
            return Ok(());
        }
        self.commit(&guard, Splice { op, index, remove, items, projected, backing });
        Ok(())
    }

    pub(super) fn move_range(&self, origin: Origin, from: usize, to: usize, count: usize) -> Result<(), CollectionError> {
        let guard = self.state.lock();
        if !Self::admit(&guard, "move", origin)? {
            return Ok(());
        }
        let len = guard.borrow().items.len();
        CollectionError::check_range("move", from, count, len)?;
        CollectionError::check_range("move", to, count, len)?;
        if count == 0 || from == to {
            return Ok(());
        }
        {
            let mut state = guard.borrow_mut();
            let state = &mut *state;
            move_within(&mut state.items, from, to, count);
            move_within(&mut state.projected, from, to, count);
            if state.source.is_some() {
                move_within(&mut state.backing, from, to, count);
            }
            state.pending.push_back(CollectionChange::Moved { from, to, count });
        }
        log::trace!("move {from}..{} to {to}", from + count);
        self.flush(&guard);
        Ok(())
    }

    pub(super) fn clear(&self, origin: Origin) -> Result<(), CollectionError> {
        let guard = self.state.lock();
        if !Self::admit(&guard, "clear", origin)? {
            return Ok(());
        }
        self.remove_all(&guard, "clear");
        Ok(())
    }

    /// Remove-all followed by insert-all, both under one lock hold.
    pub(super) fn reset(&self, origin: Origin, elements: Vec<S>) -> Result<(), CollectionError> {
        let guard = self.state.lock();
        if !Self::admit(&guard, "reset", origin)? {
            return Ok(());
        }
        let (items, projected) = self.materialize(&guard, &elements)?;
        self.remove_all(&guard, "reset");
        if !items.is_empty() {
            self.commit(
                &guard,
                Splice { op: "reset", index: 0, remove: 0, items, projected, backing: Some(elements) },
            );
        }
        Ok(())
    }

    fn remove_all(&self, state: &RefCell<State<T, S, P>>, op: &'static str) {
        let len = {
            // The backing list may be out of step with the items.
            let mut state = state.borrow_mut();
            state.backing.clear();
            state.items.len()
        };
        if len == 0 {
            return;
        }
        self.commit(
            state,
            Splice {
                op,
                index: 0,
                remove: len,
                items: Vec::new(),
                projected: Vec::new(),
                backing: None,
            },
        );
    }

    // ── Mode switches ─────────────────────────────────────────────────────

    /// Replaces the whole content with `snapshot` and marks the collection
    /// as driven by `id`. Runs under the source's lock.
    fn attach_source(&self, id: SourceId, snapshot: &[S]) -> Result<(), CollectionError> {
        let guard = self.state.lock();
        let (items, projected) = self.materialize(&guard, snapshot)?;
        self.remove_all(&guard, "attach");
        {
            let mut state = guard.borrow_mut();
            state.backing.clear();
            state.source = Some(id);
            state.last_error = None;
            state.stale = false;
        }
        if !items.is_empty() {
            self.commit(
                &guard,
                Splice {
                    op: "attach",
                    index: 0,
                    remove: 0,
                    items,
                    projected,
                    backing: Some(snapshot.to_vec()),
                },
            );
        }
        Ok(())
    }

    fn detach_source(&self) {
        let guard = self.state.lock();
        self.remove_all(&guard, "detach");
        let mut state = guard.borrow_mut();
        state.backing.clear();
        state.source = None;
        state.stale = false;
    }

    fn change_template(&self, template: Option<ItemTemplate<S, T>>) -> Result<(), CollectionError> {
        let guard = self.state.lock();
        let (unchanged, source, stale) = {
            let state = guard.borrow();
            (
                template_id(state.template.as_ref()) == template_id(template.as_ref()),
                state.source,
                state.stale,
            )
        };
        if unchanged {
            return Ok(());
        }
        let Some(source) = source else {
            guard.borrow_mut().template = template;
            return Ok(());
        };
        if stale {
            // Items no longer line up with the backing list: rebuild them all.
            let previous = std::mem::replace(&mut guard.borrow_mut().template, template);
            let elements = guard.borrow().backing.clone();
            if let Err(e) = self.reset(Origin::Source(source), elements) {
                guard.borrow_mut().template = previous;
                return Err(e);
            }
            guard.borrow_mut().stale = false;
            return Ok(());
        }

        let (backing, used, context) = {
            let state = guard.borrow();
            let used: Vec<_> = state.items.iter().map(TemplatedItem::template_used).collect();
            (state.backing.clone(), used, state.context.clone())
        };

        // Build every replacement before touching anything.
        let mut rebuilt = Vec::new();
        for (index, element) in backing.iter().enumerate() {
            let resolved = template.as_ref().and_then(|t| t.resolve(element));
            if resolved.as_ref().map(Template::id) == used[index] {
                continue;
            }
            rebuilt.push((index, build_item(resolved, element, context.clone())?));
        }

        guard.borrow_mut().template = template;
        log::debug!("template changed: rebuilding {} of {} items", rebuilt.len(), backing.len());

        // One replace per contiguous run.
        let mut rebuilt = rebuilt.into_iter().peekable();
        while let Some((start, first)) = rebuilt.next() {
            let mut items = vec![first];
            while let Some((next, _)) = rebuilt.peek() {
                if *next != start + items.len() {
                    break;
                }
                if let Some((_, item)) = rebuilt.next() {
                    items.push(item);
                }
            }
            let end = start + items.len();
            let projected = items.iter().map(|i| self.project(i.content())).collect();
            self.commit(
                &guard,
                Splice {
                    op: "rebuild",
                    index: start,
                    remove: items.len(),
                    items,
                    projected,
                    backing: Some(backing[start..end].to_vec()),
                },
            );
        }
        Ok(())
    }

    fn set_binding_context(&self, context: Option<BindingContext>) {
        let guard = self.state.lock();
        let items = {
            let mut state = guard.borrow_mut();
            state.context = context.clone();
            for item in &mut state.items {
                item.set_context(context.clone());
            }
            state.items.clone()
        };
        let hooks = self.lifecycle.read().clone();
        for (index, item) in items.iter().enumerate() {
            for hook in &hooks {
                hook.attached(item, index);
            }
        }
    }

    pub(super) fn record_error(&self, error: CollectionError) {
        self.state.lock().borrow_mut().last_error = Some(error);
    }

    // ── Source drift ──────────────────────────────────────────────────────

    /// Runs `f` with the operation lock held.
    pub(super) fn exclusive<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.state.lock();
        f()
    }

    pub(super) fn is_stale(&self) -> bool {
        self.state.lock().borrow().stale
    }

    /// Records that `change` from `id` was not applied to the items. The
    /// backing list still takes it, so a later resync starts from what the
    /// source really holds.
    pub(super) fn mark_stale(&self, id: SourceId, change: &ListChange<S>) {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        if state.source != Some(id) {
            return;
        }
        if let Err(e) = change.apply_to(&mut state.backing) {
            log::error!("backing list of {id} lost track: {e}");
        }
        state.stale = true;
    }

    /// Applies `change` to the backing list and rebuilds every item from it.
    /// The collection stays stale when the rebuild fails.
    pub(super) fn resync(&self, id: SourceId, change: &ListChange<S>) -> Result<(), CollectionError> {
        let guard = self.state.lock();
        let origin = Origin::Source(id);
        if !Self::admit(&guard, "resync", origin)? {
            return Ok(());
        }
        let elements = {
            let mut state = guard.borrow_mut();
            change.apply_to(&mut state.backing)?;
            state.backing.clone()
        };
        self.reset(origin, elements)?;
        guard.borrow_mut().stale = false;
        log::debug!("items resynchronized with {id}");
        Ok(())
    }
}

struct Attachment {
    source: SourceId,
    _subscription: Subscription,
}

// ── TemplatableCollection ─────────────────────────────────────────────────

/// Ordered item list with a projected list kept in lockstep.
///
/// Items either come from the public API (direct mode) or from an attached
/// [`ObservableList`] run through an optional [`ItemTemplate`]
/// (source-driven mode). Structural operations are serialized by a reentrant
/// lock; each one validates, updates items and projection together, runs
/// the [`ItemLifecycle`] hooks and then notifies the
/// [`CollectionObserver`]s before returning. A hook or observer may call
/// back into the collection; observers see that change after the one being
/// delivered.
///
/// | Type parameter | Meaning |
/// |----------------|---------|
/// | `T` | item content |
/// | `S` | source element (`T: From<S>` is used when no template applies) |
/// | `P` | projected value, one per item |
///
/// Sharing one item between two collections is not detected.
pub struct TemplatableCollection<T, S = T, P = ()> {
    core: Arc<Core<T, S, P>>,
    attachment: Mutex<Option<Attachment>>,
}

impl<T, S> TemplatableCollection<T, S, ()>
where
    T: From<S> + Send + Sync + 'static,
    S: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self::with_projection(|_| ())
    }
}

impl<T, S> Default for TemplatableCollection<T, S, ()>
where
    T: From<S> + Send + Sync + 'static,
    S: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, S, P> TemplatableCollection<T, S, P>
where
    T: From<S> + Send + Sync + 'static,
    S: Clone + Send + 'static,
    P: Clone + Send + 'static,
{
    /// A collection whose projected list holds `project(content)` per item.
    pub fn with_projection(project: impl Fn(&T) -> P + Send + Sync + 'static) -> Self {
        Self {
            core: Arc::new(Core::new(Box::new(project))),
            attachment: Mutex::new(None),
        }
    }

    // ── Reads ─────────────────────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.core.state.lock().borrow().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn items(&self) -> Vec<TemplatedItem<T>> {
        self.core.state.lock().borrow().items.clone()
    }

    pub fn get(&self, index: usize) -> Option<TemplatedItem<T>> {
        self.core.state.lock().borrow().items.get(index).cloned()
    }

    pub fn contents(&self) -> Vec<Arc<T>> {
        let guard = self.core.state.lock();
        let state = guard.borrow();
        state.items.iter().map(|i| Arc::clone(i.content())).collect()
    }

    pub fn projected(&self) -> Vec<P> {
        self.core.state.lock().borrow().projected.clone()
    }

    pub fn template(&self) -> Option<ItemTemplate<S, T>> {
        self.core.state.lock().borrow().template.clone()
    }

    pub fn binding_context(&self) -> Option<BindingContext> {
        self.core.state.lock().borrow().context.clone()
    }

    pub fn source_id(&self) -> Option<SourceId> {
        self.core.state.lock().borrow().source
    }

    pub fn is_source_driven(&self) -> bool {
        self.source_id().is_some()
    }

    /// Last error hit while applying a source notification.
    pub fn last_source_error(&self) -> Option<CollectionError> {
        self.core.state.lock().borrow().last_error.clone()
    }

    // ── Direct structural operations ──────────────────────────────────────

    /// Inserts `items` so the first one lands at `index`.
    pub fn insert_range<I>(&self, index: usize, items: impl IntoIterator<Item = I>) -> Result<(), CollectionError>
    where
        I: Into<Arc<T>>,
    {
        let contents = items.into_iter().map(Into::into).collect();
        self.core.splice("insert", Origin::Direct, index, 0, Payload::Direct(contents))
    }

    pub fn remove_range(&self, index: usize, count: usize) -> Result<(), CollectionError> {
        self.core.splice("remove", Origin::Direct, index, count, Payload::Direct(Vec::new()))
    }

    /// Replaces `count` items at `index` with `items`. The lengths may differ.
    pub fn replace_range<I>(
        &self,
        index: usize,
        count: usize,
        items: impl IntoIterator<Item = I>,
    ) -> Result<(), CollectionError>
    where
        I: Into<Arc<T>>,
    {
        let contents = items.into_iter().map(Into::into).collect();
        self.core.splice("replace", Origin::Direct, index, count, Payload::Direct(contents))
    }

    /// Moves `count` items from `from` so the block starts at `to` in the
    /// resulting list. Items keep their identity and are not torn down.
    pub fn move_range(&self, from: usize, to: usize, count: usize) -> Result<(), CollectionError> {
        self.core.move_range(Origin::Direct, from, to, count)
    }

    pub fn clear(&self) -> Result<(), CollectionError> {
        self.core.clear(Origin::Direct)
    }

    pub fn push(&self, item: impl Into<Arc<T>>) -> Result<(), CollectionError> {
        let index = self.len();
        self.insert(index, item)
    }

    pub fn insert(&self, index: usize, item: impl Into<Arc<T>>) -> Result<(), CollectionError> {
        self.insert_range(index, [item.into()])
    }

    pub fn remove_at(&self, index: usize) -> Result<(), CollectionError> {
        self.remove_range(index, 1)
    }

    pub fn replace_at(&self, index: usize, item: impl Into<Arc<T>>) -> Result<(), CollectionError> {
        self.replace_range(index, 1, [item.into()])
    }

    pub fn move_item(&self, from: usize, to: usize) -> Result<(), CollectionError> {
        self.move_range(from, to, 1)
    }

    // ── Source and template ───────────────────────────────────────────────

    /// Attaches `source` (or detaches with `None`).
    ///
    /// Attaching replaces every current item, direct ones included, with one
    /// item per source element. If the template fails on any element the
    /// call returns the error and nothing changes, the previous attachment
    /// included. Passing the source that is already attached does nothing.
    pub fn change_source(&self, source: Option<&ObservableList<S>>) -> Result<(), CollectionError> {
        let mut attachment = self.attachment.lock();
        let current = attachment.as_ref().map(|a| a.source);
        if current == source.map(ObservableList::id) {
            return Ok(());
        }

        let Some(list) = source else {
            // Unsubscribe before clearing: nothing from the old source may
            // arrive once the items are gone.
            drop(attachment.take());
            self.core.detach_source();
            log::debug!("items source detached");
            return Ok(());
        };

        let id = list.id();
        let weak = Arc::downgrade(&self.core);
        let core = &self.core;
        let ((), subscription) = list.try_attach(
            move |change| {
                if let Some(core) = weak.upgrade() {
                    core.on_source_change(id, change);
                }
            },
            |snapshot| core.attach_source(id, snapshot),
        )?;

        // The old source's notifications are already ignored by id.
        let previous = attachment.replace(Attachment { source: id, _subscription: subscription });
        drop(previous);
        log::debug!("items source {id} attached ({} items)", self.len());
        Ok(())
    }

    /// Sets the item template.
    ///
    /// While source-driven, every item whose resolved template differs from
    /// the one that built it is rebuilt (torn down and replaced). All
    /// replacements are built first; on failure nothing changes.
    pub fn change_template(&self, template: Option<ItemTemplate<S, T>>) -> Result<(), CollectionError> {
        self.core.change_template(template)
    }

    /// Sets the binding context for current and future items. Attach hooks
    /// run again for every current item.
    pub fn set_binding_context(&self, context: Option<BindingContext>) {
        self.core.set_binding_context(context);
    }

    // ── Hooks ─────────────────────────────────────────────────────────────

    pub fn add_lifecycle(&self, hook: impl ItemLifecycle<T> + 'static) {
        self.core.lifecycle.write().push(Arc::new(hook));
    }

    pub fn add_observer(&self, observer: impl CollectionObserver<P> + 'static) {
        self.core.observers.write().push(Arc::new(observer));
    }

    /// Creates a mirror of the projected list on `dispatcher`'s designated
    /// thread.
    pub fn mirror(&self, dispatcher: &Dispatcher) -> NativeMirror<P> {
        self.mirror_with(dispatcher, None)
    }

    /// Like [`mirror`](Self::mirror); `on_applied` runs on the designated
    /// thread with the mirror's content after every applied change.
    pub fn mirror_with(
        &self,
        dispatcher: &Dispatcher,
        on_applied: Option<Arc<dyn Fn(&[P]) + Send + Sync>>,
    ) -> NativeMirror<P> {
        // Seed and register under the lock so no change slips in between.
        let guard = self.core.state.lock();
        let seed = guard.borrow().projected.clone();
        let (mirror, sink) = NativeMirror::seeded(dispatcher.clone(), seed, on_applied);
        self.core.observers.write().push(Arc::new(sink) as Arc<dyn CollectionObserver<P>>);
        drop(guard);
        mirror
    }
}

impl<T, S, P> Drop for TemplatableCollection<T, S, P> {
    fn drop(&mut self) {
        drop(self.attachment.get_mut().take());
        self.core.release_items();
    }
}

impl<T, S, P> Core<T, S, P> {
    /// Takes every item out and runs teardown, without notifying observers.
    fn release_items(&self) {
        let guard = self.state.lock();
        let removed = {
            let mut state = guard.borrow_mut();
            state.projected.clear();
            state.backing.clear();
            state.pending.clear();
            std::mem::take(&mut state.items)
        };
        let hooks = self.lifecycle.read().clone();
        for item in &removed {
            for hook in &hooks {
                hook.teardown(item);
            }
        }
    }
}

impl<T, S, P> fmt::Debug for TemplatableCollection<T, S, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.core.state.lock();
        let state = guard.borrow();
        f.debug_struct("TemplatableCollection")
            .field("len", &state.items.len())
            .field("source", &state.source)
            .field("template", &template_id(state.template.as_ref()))
            .finish_non_exhaustive()
    }
}
