use std::fmt;
use std::marker::PhantomData;

/// Direction in which a property value flows.
///
/// The "target" is the native engine object the property is bound to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum BindingMode {
    /// Model → engine.
    #[default]
    OneWay,
    /// Engine → model.
    OneWayToSource,
    /// Both directions.
    TwoWay,
}

impl BindingMode {
    /// Model changes are pushed to the engine.
    #[inline]
    pub fn writes_to_target(self) -> bool {
        matches!(self, BindingMode::OneWay | BindingMode::TwoWay)
    }

    /// Engine changes are accepted into the model.
    #[inline]
    pub fn reads_from_target(self) -> bool {
        matches!(self, BindingMode::OneWayToSource | BindingMode::TwoWay)
    }
}

/// Typed, named property declaration.
///
/// ```rust,ignore
/// pub const VALUE: PropertyKey<f64> = PropertyKey::new("value", BindingMode::TwoWay);
/// ```
pub struct PropertyKey<T> {
    name: &'static str,
    mode: BindingMode,
    _marker: PhantomData<fn() -> T>,
}

impl<T> PropertyKey<T> {
    pub const fn new(name: &'static str, mode: BindingMode) -> Self {
        Self { name, mode, _marker: PhantomData }
    }

    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub const fn mode(&self) -> BindingMode {
        self.mode
    }
}

// Manual impls: `T` itself need not be Copy/Clone/Debug.
impl<T> Clone for PropertyKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for PropertyKey<T> {}

impl<T> fmt::Debug for PropertyKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyKey")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_directions() {
        assert!(BindingMode::OneWay.writes_to_target());
        assert!(!BindingMode::OneWay.reads_from_target());
        assert!(!BindingMode::OneWayToSource.writes_to_target());
        assert!(BindingMode::OneWayToSource.reads_from_target());
        assert!(BindingMode::TwoWay.writes_to_target() && BindingMode::TwoWay.reads_from_target());
    }

    #[test]
    fn key_is_copy_for_any_t() {
        struct NotCopy;
        const KEY: PropertyKey<NotCopy> = PropertyKey::new("thing", BindingMode::TwoWay);
        let a = KEY;
        let b = a;
        assert_eq!(a.name(), b.name());
        assert_eq!(KEY.mode(), BindingMode::TwoWay);
    }
}
