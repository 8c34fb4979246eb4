use std::fmt;

/// Opaque identity of a native object, issued by the host.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct NativeHandle(u64);

impl NativeHandle {
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of native object to create, e.g. `NativeKind::DROPDOWN`.
///
/// The host decides which kinds it supports; unknown kinds are rejected by
/// [`NativeHost::create`](super::NativeHost::create).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct NativeKind(&'static str);

impl NativeKind {
    pub const CANVAS: NativeKind = NativeKind("Canvas");
    pub const SLIDER: NativeKind = NativeKind("Slider");
    pub const DROPDOWN: NativeKind = NativeKind("Dropdown");
    pub const EVENT_TRIGGER: NativeKind = NativeKind("EventTrigger");
    pub const TRIGGER_ENTRY: NativeKind = NativeKind("EventTrigger.Entry");
    pub const MESH: NativeKind = NativeKind("UIMesh");

    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub const fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for NativeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}
