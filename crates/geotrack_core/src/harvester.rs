use std::sync::Arc;

use serde::Serialize;

/// A single latitude/longitude reading handed to the harvester.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
}

/// Late-bound consumer of location data; arrives after store initialization.
pub trait Harvester: Send + Sync {
    fn consume(&self, fix: &LocationFix);
}

pub type HarvesterRef = Arc<dyn Harvester>;

type ReadyFn = Box<dyn FnOnce(&HarvesterRef) + Send>;

/// Single-resolution slot for the harvester dependency.
///
/// Callbacks registered before the harvester arrives are queued and drained
/// exactly once, in FIFO order, when `set` first runs. Callbacks registered
/// afterwards run synchronously with whichever reference is current at
/// registration time. A missing harvester is never an error.
#[derive(Default)]
pub struct HarvesterSlot {
    harvester: Option<HarvesterRef>,
    pending: Vec<ReadyFn>,
}

impl HarvesterSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the reference and drains any queued callbacks.
    ///
    /// The reference is stored before the drain, so a callback that
    /// re-registers during the drain observes the harvester and runs
    /// immediately. A later `set` overwrites the stored reference but
    /// re-invokes nothing; the queue is already permanently empty.
    pub fn set(&mut self, harvester: HarvesterRef) {
        self.harvester = Some(harvester.clone());
        let pending = std::mem::take(&mut self.pending);
        for callback in pending {
            callback(&harvester);
        }
    }

    /// Runs `callback` with the harvester: synchronously now if one is
    /// stored, otherwise once `set` delivers it.
    pub fn when_ready(&mut self, callback: impl FnOnce(&HarvesterRef) + Send + 'static) {
        match &self.harvester {
            Some(harvester) => callback(harvester),
            None => self.pending.push(Box::new(callback)),
        }
    }

    pub fn get(&self) -> Option<&HarvesterRef> {
        self.harvester.as_ref()
    }
}
