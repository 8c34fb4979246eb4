use thiserror::Error;

/// Errors returned by structural collection operations.
///
/// A call that returns an error has not changed the collection.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CollectionError {
    #[error("{op}: range {index}..{index}+{count} is out of bounds for length {len}")]
    OutOfRange {
        op: &'static str,
        index: usize,
        count: usize,
        len: usize,
    },
    #[error("{op}: collection is driven by an items source")]
    SourceDriven { op: &'static str },
    #[error(transparent)]
    Template(#[from] TemplateError),
}

impl CollectionError {
    pub(crate) fn check_range(op: &'static str, index: usize, count: usize, len: usize) -> Result<(), Self> {
        match index.checked_add(count) {
            Some(end) if end <= len => Ok(()),
            _ => Err(CollectionError::OutOfRange { op, index, count, len }),
        }
    }
}

/// An item template failed to materialize a source element.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("template `{template}` failed: {reason}")]
pub struct TemplateError {
    pub template: String,
    pub reason: String,
}

impl TemplateError {
    pub fn new(template: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            reason: reason.into(),
        }
    }
}
