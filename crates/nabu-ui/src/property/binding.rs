use std::fmt;

use super::{BindingMode, Property};
use crate::subscription::Subscription;

/// Live link between two property cells.
///
/// `source` is the model side, `target` the component side. On creation the
/// side that the mode reads from is copied to the other one; afterwards
/// changes flow in the directions the mode allows. Echoes stop at the first
/// hop because [`Property::set`] ignores unchanged values.
///
/// Drop the binding to disconnect both directions.
pub struct PropertyBinding {
    mode: BindingMode,
    _forward: Option<Subscription>,
    _backward: Option<Subscription>,
}

impl PropertyBinding {
    pub fn new<T>(source: &Property<T>, target: &Property<T>, mode: BindingMode) -> Self
    where
        T: Clone + PartialEq + Send + 'static,
    {
        if mode == BindingMode::OneWayToSource {
            source.set(target.get());
        } else {
            target.set(source.get());
        }

        let forward = mode.writes_to_target().then(|| {
            let target = target.clone();
            source.subscribe(move |v| {
                target.set(v.clone());
            })
        });
        let backward = mode.reads_from_target().then(|| {
            let source = source.clone();
            target.subscribe(move |v| {
                source.set(v.clone());
            })
        });

        Self {
            mode,
            _forward: forward,
            _backward: backward,
        }
    }

    #[inline]
    pub fn mode(&self) -> BindingMode {
        self.mode
    }
}

impl fmt::Debug for PropertyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyBinding").field("mode", &self.mode).finish()
    }
}
