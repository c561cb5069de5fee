//! The signed-in principal, observed by subscription.

use crate::lock;
use crate::subscription::{Callback, Subscription};
use profilecloud_types::PrincipalId;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// A reactive source of the active account id (`None` when signed out).
pub trait PrincipalSource: Send + Sync {
    /// Registers a listener. Implementations deliver the current value
    /// immediately, then every subsequent change.
    fn subscribe(&self, listener: Callback<Option<PrincipalId>>) -> Subscription;
}

/// An in-process principal value that notifies listeners on change.
#[derive(Clone, Default)]
pub struct PrincipalCell {
    inner: Arc<Mutex<CellInner>>,
}

#[derive(Default)]
struct CellInner {
    current: Option<PrincipalId>,
    listeners: BTreeMap<u64, Callback<Option<PrincipalId>>>,
    next_id: u64,
}

impl PrincipalCell {
    /// Creates a cell with an initial value.
    pub fn new(initial: Option<PrincipalId>) -> Self {
        let cell = Self::default();
        lock(&cell.inner).current = initial;
        cell
    }

    /// Returns the current principal.
    pub fn get(&self) -> Option<PrincipalId> {
        lock(&self.inner).current.clone()
    }

    /// Sets the principal, notifying listeners if it changed.
    pub fn set(&self, principal: Option<PrincipalId>) {
        let listeners: Vec<_> = {
            let mut inner = lock(&self.inner);
            if inner.current == principal {
                return;
            }
            inner.current = principal.clone();
            inner.listeners.values().cloned().collect()
        };
        for listener in listeners {
            listener(principal.clone());
        }
    }
}

impl PrincipalSource for PrincipalCell {
    fn subscribe(&self, listener: Callback<Option<PrincipalId>>) -> Subscription {
        let (id, current) = {
            let mut inner = lock(&self.inner);
            let id = inner.next_id;
            inner.next_id += 1;
            inner.listeners.insert(id, listener.clone());
            (id, inner.current.clone())
        };
        listener(current);
        let weak = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                lock(&inner).listeners.remove(&id);
            }
        })
    }
}
