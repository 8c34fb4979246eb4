use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::TemplateError;

static NEXT_TEMPLATE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a [`Template`] or [`TemplateSelector`].
///
/// Allocated once per construction; clones keep the id. Two templates built
/// from the same closure are still different templates.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TemplateId(u64);

impl TemplateId {
    fn next() -> Self {
        TemplateId(NEXT_TEMPLATE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

type Build<S, T> = Arc<dyn Fn(&S) -> Result<T, TemplateError> + Send + Sync>;
type Select<S, T> = Arc<dyn Fn(&S) -> Option<Template<S, T>> + Send + Sync>;

// ── Template ──────────────────────────────────────────────────────────────

/// Turns one source element into one item.
pub struct Template<S, T> {
    id: TemplateId,
    name: Arc<str>,
    build: Build<S, T>,
}

impl<S, T> Template<S, T> {
    /// A template that cannot fail.
    pub fn new(name: impl Into<Arc<str>>, build: impl Fn(&S) -> T + Send + Sync + 'static) -> Self {
        Self::fallible(name, move |s| Ok(build(s)))
    }

    pub fn fallible(
        name: impl Into<Arc<str>>,
        build: impl Fn(&S) -> Result<T, TemplateError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: TemplateId::next(),
            name: name.into(),
            build: Arc::new(build),
        }
    }

    #[inline]
    pub fn id(&self) -> TemplateId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn materialize(&self, element: &S) -> Result<T, TemplateError> {
        (self.build)(element)
    }
}

impl<S, T> Clone for Template<S, T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: Arc::clone(&self.name),
            build: Arc::clone(&self.build),
        }
    }
}

impl<S, T> PartialEq for Template<S, T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<S, T> fmt::Debug for Template<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

// ── TemplateSelector ──────────────────────────────────────────────────────

/// Picks a template per element. Returning `None` means the element itself
/// is used as the item.
pub struct TemplateSelector<S, T> {
    id: TemplateId,
    select: Select<S, T>,
}

impl<S, T> TemplateSelector<S, T> {
    pub fn new(select: impl Fn(&S) -> Option<Template<S, T>> + Send + Sync + 'static) -> Self {
        Self {
            id: TemplateId::next(),
            select: Arc::new(select),
        }
    }

    #[inline]
    pub fn id(&self) -> TemplateId {
        self.id
    }

    pub fn select(&self, element: &S) -> Option<Template<S, T>> {
        (self.select)(element)
    }
}

impl<S, T> Clone for TemplateSelector<S, T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            select: Arc::clone(&self.select),
        }
    }
}

impl<S, T> fmt::Debug for TemplateSelector<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateSelector").field("id", &self.id).finish()
    }
}

// ── ItemTemplate ──────────────────────────────────────────────────────────

/// What a source-driven collection applies to each element.
pub enum ItemTemplate<S, T> {
    Single(Template<S, T>),
    Selector(TemplateSelector<S, T>),
}

impl<S, T> ItemTemplate<S, T> {
    /// Identity used to decide whether a template change is a no-op.
    pub fn id(&self) -> TemplateId {
        match self {
            ItemTemplate::Single(t) => t.id(),
            ItemTemplate::Selector(s) => s.id(),
        }
    }

    /// The template that applies to `element`, if any.
    pub fn resolve(&self, element: &S) -> Option<Template<S, T>> {
        match self {
            ItemTemplate::Single(t) => Some(t.clone()),
            ItemTemplate::Selector(s) => s.select(element),
        }
    }
}

impl<S, T> From<Template<S, T>> for ItemTemplate<S, T> {
    fn from(t: Template<S, T>) -> Self {
        ItemTemplate::Single(t)
    }
}

impl<S, T> From<TemplateSelector<S, T>> for ItemTemplate<S, T> {
    fn from(s: TemplateSelector<S, T>) -> Self {
        ItemTemplate::Selector(s)
    }
}

impl<S, T> Clone for ItemTemplate<S, T> {
    fn clone(&self) -> Self {
        match self {
            ItemTemplate::Single(t) => ItemTemplate::Single(t.clone()),
            ItemTemplate::Selector(s) => ItemTemplate::Selector(s.clone()),
        }
    }
}

impl<S, T> fmt::Debug for ItemTemplate<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemTemplate::Single(t) => f.debug_tuple("Single").field(t).finish(),
            ItemTemplate::Selector(s) => f.debug_tuple("Selector").field(s).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_identity() {
        let t = Template::new("double", |x: &i32| x * 2);
        let u = t.clone();
        assert_eq!(t.id(), u.id());
        assert_ne!(t.id(), Template::new("double", |x: &i32| x * 2).id());
        assert_eq!(u.materialize(&4), Ok(8));
    }

    #[test]
    fn fallible_reports_error() {
        let t = Template::fallible("positive", |x: &i32| {
            if *x > 0 { Ok(*x) } else { Err(TemplateError::new("positive", "not positive")) }
        });
        assert!(t.materialize(&-1).is_err());
    }

    #[test]
    fn selector_resolves_per_element() {
        let even = Template::new("even", |x: &i32| x * 10);
        let selector = TemplateSelector::new(move |x: &i32| (x % 2 == 0).then(|| even.clone()));
        let item: ItemTemplate<i32, i32> = selector.into();
        assert!(item.resolve(&1).is_none());
        assert_eq!(item.resolve(&2).map(|t| t.materialize(&2)), Some(Ok(20)));
    }
}
