use super::TemplatedItem;

/// One structural change of the projected list, as seen by observers.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionChange<P> {
    Inserted { index: usize, values: Vec<P> },
    Removed { index: usize, count: usize },
    /// `count` values starting at `index` were replaced by `values`.
    Replaced { index: usize, count: usize, values: Vec<P> },
    /// The block `from..from + count` now starts at `to` (final indexing).
    Moved { from: usize, to: usize, count: usize },
}

impl<P: Clone> CollectionChange<P> {
    /// Replays the change on a mirror of the projected list.
    ///
    /// Panics if `target` does not mirror the list the change was made on.
    pub fn apply_to(&self, target: &mut Vec<P>) {
        match self {
            CollectionChange::Inserted { index, values } => {
                target.splice(*index..*index, values.iter().cloned());
            }
            CollectionChange::Removed { index, count } => {
                target.drain(*index..*index + *count);
            }
            CollectionChange::Replaced { index, count, values } => {
                target.splice(*index..*index + *count, values.iter().cloned());
            }
            CollectionChange::Moved { from, to, count } => move_within(target, *from, *to, *count),
        }
    }
}

/// Moves `count` elements starting at `from` so the block starts at `to`
/// afterwards. Both ranges must be in bounds.
pub(crate) fn move_within<X>(list: &mut Vec<X>, from: usize, to: usize, count: usize) {
    if count == 0 || from == to {
        return;
    }
    let block: Vec<X> = list.drain(from..from + count).collect();
    list.splice(to..to, block);
}

/// Per-item hooks.
///
/// Called synchronously, with the collection's operation lock held, on the
/// thread that performed the operation. Native work must be posted, not
/// sent.
pub trait ItemLifecycle<T>: Send + Sync {
    /// The item entered the collection at `index`, or its binding context
    /// changed.
    fn attached(&self, _item: &TemplatedItem<T>, _index: usize) {}

    /// The item left the collection.
    fn teardown(&self, _item: &TemplatedItem<T>) {}
}

/// Receives every committed change of the projected list, in order.
///
/// Same calling rules as [`ItemLifecycle`].
pub trait CollectionObserver<P>: Send + Sync {
    fn changed(&self, change: &CollectionChange<P>);
}

impl<P, F> CollectionObserver<P> for F
where
    F: Fn(&CollectionChange<P>) + Send + Sync,
{
    fn changed(&self, change: &CollectionChange<P>) {
        self(change)
    }
}
