use std::fmt;

/// Keeps a listener registered for as long as it is alive.
///
/// Dropping the subscription unsubscribes. What "unsubscribed" guarantees
/// depends on the issuer: [`ObservableList`](crate::source::ObservableList)
/// waits for an in-flight callback, property listeners do not.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub(crate) fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A subscription that holds nothing.
    pub fn empty() -> Self {
        Self { release: None }
    }

    /// Unsubscribes now. Same as dropping.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}
