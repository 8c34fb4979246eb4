use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::TemplateId;

/// Opaque data an item is bound against (typically a view model).
#[derive(Clone)]
pub struct BindingContext(Arc<dyn Any + Send + Sync>);

impl BindingContext {
    pub fn new<C: Any + Send + Sync>(context: C) -> Self {
        Self(Arc::new(context))
    }

    pub fn downcast_ref<C: Any>(&self) -> Option<&C> {
        self.0.downcast_ref::<C>()
    }

    pub fn ptr_eq(a: &BindingContext, b: &BindingContext) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl fmt::Debug for BindingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BindingContext(..)")
    }
}

/// One element of a [`TemplatableCollection`](super::TemplatableCollection).
///
/// Cloning is cheap and keeps the identity of the content.
pub struct TemplatedItem<T> {
    content: Arc<T>,
    template_used: Option<TemplateId>,
    context: Option<BindingContext>,
}

impl<T> TemplatedItem<T> {
    pub(crate) fn new(content: Arc<T>, template_used: Option<TemplateId>, context: Option<BindingContext>) -> Self {
        Self { content, template_used, context }
    }

    #[inline]
    pub fn content(&self) -> &Arc<T> {
        &self.content
    }

    /// Template that produced the content. `None` for items supplied
    /// directly and for source elements used as-is.
    #[inline]
    pub fn template_used(&self) -> Option<TemplateId> {
        self.template_used
    }

    #[inline]
    pub fn context(&self) -> Option<&BindingContext> {
        self.context.as_ref()
    }

    pub(crate) fn set_context(&mut self, context: Option<BindingContext>) {
        self.context = context;
    }

    /// `true` when both items hold the same content object.
    pub fn same_content(&self, other: &TemplatedItem<T>) -> bool {
        Arc::ptr_eq(&self.content, &other.content)
    }
}

impl<T> Clone for TemplatedItem<T> {
    fn clone(&self) -> Self {
        Self {
            content: Arc::clone(&self.content),
            template_used: self.template_used,
            context: self.context.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for TemplatedItem<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplatedItem")
            .field("content", &self.content)
            .field("template_used", &self.template_used)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_downcasts() {
        let ctx = BindingContext::new(String::from("vm"));
        assert_eq!(ctx.downcast_ref::<String>().map(String::as_str), Some("vm"));
        assert!(ctx.downcast_ref::<u32>().is_none());
        assert!(BindingContext::ptr_eq(&ctx, &ctx.clone()));
    }

    #[test]
    fn clone_keeps_identity() {
        let item = TemplatedItem::new(Arc::new(1), None, None);
        assert!(item.same_content(&item.clone()));
        assert!(!item.same_content(&TemplatedItem::new(Arc::new(1), None, None)));
    }
}
