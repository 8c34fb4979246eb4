use nabu_engine::host::{HostError, NativeBridge, NativeKind};

use super::NativeComponent;
use crate::property::{BindingMode, Property, PropertyKey};

/// A native slider bound to three properties.
///
/// `value` is two-way: the model writes it to the native object, and the
/// engine reports user drags back through [`Slider::engine_value_changed`].
///
/// # Example
/// ```rust,ignore
/// let slider = Slider::new(&bridge)?.range(0.0, 100.0);
/// slider.set_value(50.0);
/// let _s = slider.value().subscribe(|v| log::info!("slider: {v}"));
/// ```
pub struct Slider {
    native: NativeComponent,
    value: Property<f64>,
    min: Property<f64>,
    max: Property<f64>,
}

impl Slider {
    pub const VALUE: PropertyKey<f64> = PropertyKey::new("value", BindingMode::TwoWay);
    pub const MIN: PropertyKey<f64> = PropertyKey::new("min", BindingMode::OneWay);
    pub const MAX: PropertyKey<f64> = PropertyKey::new("max", BindingMode::OneWay);

    pub fn new(bridge: &NativeBridge) -> Result<Self, HostError> {
        let native = NativeComponent::create(bridge, NativeKind::SLIDER)?;
        let min = Property::new(Self::MIN, 0.0);
        let max = Property::new(Self::MAX, 1.0);
        let value = Property::new(Self::VALUE, 0.0);
        native.bind(&min, Self::MIN.name());
        native.bind(&max, Self::MAX.name());
        native.bind(&value, Self::VALUE.name());
        Ok(Self { native, value, min, max })
    }

    /// Sets the range and pulls the value back into it.
    pub fn range(self, min: f64, max: f64) -> Self {
        self.min.set(min);
        self.max.set(max);
        self.set_value(self.value.get());
        self
    }

    #[inline]
    pub fn value(&self) -> &Property<f64> {
        &self.value
    }

    #[inline]
    pub fn min(&self) -> &Property<f64> {
        &self.min
    }

    #[inline]
    pub fn max(&self) -> &Property<f64> {
        &self.max
    }

    #[inline]
    pub fn native(&self) -> &NativeComponent {
        &self.native
    }

    /// Model-side write, clamped to `[min, max]`.
    pub fn set_value(&self, v: f64) -> bool {
        self.value.set(self.clamp(v))
    }

    /// The engine moved the slider. The clamped value reaches the model
    /// without being written back to the native object.
    pub fn engine_value_changed(&self, v: f64) -> bool {
        self.value.push_from_engine(self.clamp(v))
    }

    fn clamp(&self, v: f64) -> f64 {
        clamp_to(v, self.min.get(), self.max.get())
    }
}

/// Like `f64::clamp`, but an inverted range collapses to `min` instead of
/// panicking.
pub(crate) fn clamp_to(v: f64, min: f64, max: f64) -> f64 {
    if min > max { min } else { v.max(min).min(max) }
}
