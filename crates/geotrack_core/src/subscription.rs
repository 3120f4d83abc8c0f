use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscriptionError {
    #[error("subscription revoke failed: {0}")]
    RevokeFailed(String),
}

type RevokeFn = Box<dyn FnOnce() -> Result<(), SubscriptionError> + Send>;

/// A revocable handle for a live event registration.
///
/// `remove` runs the underlying revoke exactly once; calling it again is a
/// no-op that reports success.
pub struct Subscription {
    revoke: Option<RevokeFn>,
}

impl Subscription {
    pub fn new(revoke: impl FnOnce() -> Result<(), SubscriptionError> + Send + 'static) -> Self {
        Self {
            revoke: Some(Box::new(revoke)),
        }
    }

    pub fn remove(&mut self) -> Result<(), SubscriptionError> {
        match self.revoke.take() {
            Some(revoke) => revoke(),
            None => Ok(()),
        }
    }

    /// True until `remove` has run.
    pub fn is_active(&self) -> bool {
        self.revoke.is_some()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Ordered collection of live subscriptions, torn down as a unit.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    handles: Vec<Subscription>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, handle: Subscription) {
        self.handles.push(handle);
    }

    pub fn extend(&mut self, handles: impl IntoIterator<Item = Subscription>) {
        self.handles.extend(handles);
    }

    pub fn handles(&self) -> &[Subscription] {
        &self.handles
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Revokes every handle in insertion order, then clears the registry.
    ///
    /// A failing revoke does not abort the pass; its error is collected and
    /// the remaining handles are still removed. Calling this on an empty
    /// registry returns no errors, so a second call is a no-op.
    pub fn remove_all(&mut self) -> Vec<SubscriptionError> {
        let mut failures = Vec::new();
        for mut handle in self.handles.drain(..) {
            if let Err(err) = handle.remove() {
                failures.push(err);
            }
        }
        failures
    }
}
