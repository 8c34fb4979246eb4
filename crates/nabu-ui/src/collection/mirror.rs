use std::fmt;
use std::sync::Arc;

use nabu_engine::dispatch::{DispatchError, Dispatcher};
use parking_lot::Mutex;

use super::{CollectionChange, CollectionObserver};

type OnApplied<P> = Arc<dyn Fn(&[P]) + Send + Sync>;

/// Copy of a collection's projected list that lives on the designated
/// thread.
///
/// Created by [`TemplatableCollection::mirror`](super::TemplatableCollection::mirror).
/// Every committed change is posted to the dispatcher and replayed there,
/// so once the queue has drained the mirror equals the projected list.
pub struct NativeMirror<P> {
    dispatcher: Dispatcher,
    slots: Arc<Mutex<Vec<P>>>,
}

/// The observer half, registered on the collection.
pub(super) struct MirrorSink<P> {
    dispatcher: Dispatcher,
    slots: Arc<Mutex<Vec<P>>>,
    on_applied: Option<OnApplied<P>>,
}

impl<P: Clone + Send + 'static> NativeMirror<P> {
    pub(super) fn seeded(
        dispatcher: Dispatcher,
        seed: Vec<P>,
        on_applied: Option<OnApplied<P>>,
    ) -> (NativeMirror<P>, MirrorSink<P>) {
        let slots = Arc::new(Mutex::new(Vec::new()));
        let sink = MirrorSink {
            dispatcher: dispatcher.clone(),
            slots: Arc::clone(&slots),
            on_applied,
        };
        if !seed.is_empty() {
            sink.apply(CollectionChange::Inserted { index: 0, values: seed });
        }
        (NativeMirror { dispatcher, slots }, sink)
    }

    /// Reads the mirror on the designated thread.
    pub fn read(&self) -> Result<Vec<P>, DispatchError> {
        let slots = Arc::clone(&self.slots);
        self.dispatcher.send(move || slots.lock().clone())
    }

    pub fn len(&self) -> Result<usize, DispatchError> {
        let slots = Arc::clone(&self.slots);
        self.dispatcher.send(move || slots.lock().len())
    }

    pub fn is_empty(&self) -> Result<bool, DispatchError> {
        Ok(self.len()? == 0)
    }
}

impl<P: Clone + Send + 'static> MirrorSink<P> {
    fn apply(&self, change: CollectionChange<P>) {
        let slots = Arc::clone(&self.slots);
        let on_applied = self.on_applied.clone();
        let posted = self.dispatcher.post(move || {
            let snapshot = {
                let mut slots = slots.lock();
                change.apply_to(&mut slots);
                on_applied.as_ref().map(|_| slots.clone())
            };
            if let (Some(on_applied), Some(snapshot)) = (on_applied, snapshot) {
                on_applied(snapshot.as_slice());
            }
        });
        if let Err(e) = posted {
            log::warn!("native mirror update lost: {e}");
        }
    }
}

impl<P: Clone + Send + 'static> CollectionObserver<P> for MirrorSink<P> {
    fn changed(&self, change: &CollectionChange<P>) {
        self.apply(change.clone());
    }
}

impl<P> fmt::Debug for NativeMirror<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeMirror")
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}
