use super::templatable::{Core, Origin, Payload};
use crate::error::CollectionError;
use crate::source::{ListChange, SourceId};

impl<T, S, P> Core<T, S, P>
where
    T: From<S> + Send + Sync + 'static,
    S: Clone + Send + 'static,
    P: Clone + Send + 'static,
{
    /// Applies one notification from the items source `id`.
    ///
    /// Runs on the mutating thread, under the source's lock. Every change
    /// maps onto exactly one structural operation; a reset becomes
    /// remove-all followed by insert-all. Failures cannot be returned to the
    /// source, so they are logged and kept as the last source error.
    ///
    /// Once a change has been dropped the items no longer line up with the
    /// source. Later changes are then not applied positionally: each one
    /// rebuilds the items from the backing list until that succeeds.
    pub(super) fn on_source_change(&self, id: SourceId, change: &ListChange<S>) {
        self.exclusive(|| {
            let result = if self.is_stale() {
                self.resync(id, change)
            } else {
                self.apply_change(id, change).inspect_err(|_| self.mark_stale(id, change))
            };
            if let Err(e) = result {
                log::error!("dropped change from {id}: {e}");
                self.record_error(e);
            }
        });
    }

    fn apply_change(&self, id: SourceId, change: &ListChange<S>) -> Result<(), CollectionError> {
        let origin = Origin::Source(id);
        match change {
            ListChange::Inserted { index, items } => {
                self.splice("insert", origin, *index, 0, Payload::Source(items.clone()))
            }
            ListChange::Removed { index, count } => {
                self.splice("remove", origin, *index, *count, Payload::Source(Vec::new()))
            }
            ListChange::Replaced { index, items } => {
                self.splice("replace", origin, *index, items.len(), Payload::Source(items.clone()))
            }
            ListChange::Moved { from, to, count } => self.move_range(origin, *from, *to, *count),
            ListChange::Reset { items } => self.reset(origin, items.clone()),
        }
    }
}
