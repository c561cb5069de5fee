//! Disposable subscription handles shared by every push-style boundary.

use std::fmt;
use std::sync::Arc;

/// A listener invoked with each pushed value.
pub type Callback<T> = Arc<dyn Fn(T) + Send + Sync>;

/// Handle to an active subscription.
///
/// Disposing (explicitly or by dropping) unregisters the listener. Disposal
/// runs at most once.
#[must_use = "dropping a subscription unsubscribes immediately"]
pub struct Subscription {
    dispose: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Wraps the function that unregisters the listener.
    pub fn new(dispose: impl FnOnce() + Send + 'static) -> Self {
        Self {
            dispose: Some(Box::new(dispose)),
        }
    }

    /// A subscription with nothing to release.
    pub fn noop() -> Self {
        Self { dispose: None }
    }

    /// Unregisters the listener now.
    pub fn dispose(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(dispose) = self.dispose.take() {
            dispose();
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
            .field("active", &self.dispose.is_some())
            .finish()
    }
}
