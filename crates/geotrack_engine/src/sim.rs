use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use async_trait::async_trait;
use serde_json::Value;
use track_logging::track_debug;

use geotrack_core::{LocationFix, Subscription, SubscriptionError, TrackingConfig};

use crate::plugin::{
    EventHandler, GeofenceEvent, GeofenceHandler, LocationHandler, MotionChange, MotionHandler,
    PluginError, PluginErrorHandler, PluginState, TrackingPlugin,
};

// Handlers are kept behind `Arc` so dispatch can snapshot the list and run
// callbacks without holding the registry lock.
#[derive(Default)]
struct Handlers {
    next_id: u64,
    location: Vec<(u64, Arc<LocationHandler>)>,
    error: Vec<(u64, Arc<PluginErrorHandler>)>,
    motion: Vec<(u64, Arc<MotionHandler>)>,
    geofence: Vec<(u64, Arc<GeofenceHandler>)>,
    named: Vec<(u64, String, Arc<EventHandler>)>,
}

struct SimInner {
    enabled: AtomicBool,
    applied_config: Mutex<Option<TrackingConfig>>,
    position: Mutex<LocationFix>,
    records: AtomicU64,
    handlers: Mutex<Handlers>,
}

/// In-memory [`TrackingPlugin`] used by the demo binary and integration
/// tests. Commands resolve immediately; `emit_*` methods play the part of
/// the native event sources.
pub struct SimulatedPlugin {
    inner: Arc<SimInner>,
}

impl Default for SimulatedPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedPlugin {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SimInner {
                enabled: AtomicBool::new(false),
                applied_config: Mutex::new(None),
                position: Mutex::new(LocationFix {
                    latitude: 0.0,
                    longitude: 0.0,
                }),
                records: AtomicU64::new(0),
                handlers: Mutex::new(Handlers::default()),
            }),
        }
    }

    /// The position reported by `current_position` and carried by emitted
    /// fixes until changed again.
    pub fn set_position(&self, fix: LocationFix) {
        *self.inner.position.lock().expect("lock sim position") = fix;
    }

    /// The configuration most recently applied via `configure`/`set_config`.
    pub fn applied_config(&self) -> Option<TrackingConfig> {
        self.inner
            .applied_config
            .lock()
            .expect("lock sim config")
            .clone()
    }

    /// Delivers a location update to live subscribers. Suppressed while
    /// tracking is disabled, as the native plugin would.
    pub fn emit_location(&self, fix: LocationFix) {
        if !self.inner.enabled.load(Ordering::SeqCst) {
            track_debug!("simulated plugin suppressing location fix while disabled");
            return;
        }
        self.set_position(fix);
        self.inner.records.fetch_add(1, Ordering::SeqCst);
        let targets = {
            let handlers = self.inner.handlers.lock().expect("lock sim handlers");
            handlers
                .location
                .iter()
                .map(|(_, handler)| handler.clone())
                .collect::<Vec<_>>()
        };
        for handler in targets {
            handler(&fix);
        }
    }

    pub fn emit_error(&self, error: PluginError) {
        let targets = {
            let handlers = self.inner.handlers.lock().expect("lock sim handlers");
            handlers
                .error
                .iter()
                .map(|(_, handler)| handler.clone())
                .collect::<Vec<_>>()
        };
        for handler in targets {
            handler(&error);
        }
    }

    pub fn emit_motion(&self, motion: MotionChange) {
        let targets = {
            let handlers = self.inner.handlers.lock().expect("lock sim handlers");
            handlers
                .motion
                .iter()
                .map(|(_, handler)| handler.clone())
                .collect::<Vec<_>>()
        };
        for handler in targets {
            handler(&motion);
        }
    }

    pub fn emit_geofence(&self, fence: GeofenceEvent) {
        let targets = {
            let handlers = self.inner.handlers.lock().expect("lock sim handlers");
            handlers
                .geofence
                .iter()
                .map(|(_, handler)| handler.clone())
                .collect::<Vec<_>>()
        };
        for handler in targets {
            handler(&fence);
        }
    }

    pub fn emit_event(&self, event: &str, payload: Value) {
        let targets = {
            let handlers = self.inner.handlers.lock().expect("lock sim handlers");
            handlers
                .named
                .iter()
                .filter(|(_, name, _)| name == event)
                .map(|(_, _, handler)| handler.clone())
                .collect::<Vec<_>>()
        };
        for handler in targets {
            handler(&payload);
        }
    }

    fn register<F>(&self, insert: F) -> Subscription
    where
        F: FnOnce(&mut Handlers, u64),
    {
        let id = {
            let mut handlers = self.inner.handlers.lock().expect("lock sim handlers");
            handlers.next_id += 1;
            let id = handlers.next_id;
            insert(&mut handlers, id);
            id
        };

        let weak: Weak<SimInner> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            let Some(inner) = weak.upgrade() else {
                return Ok(());
            };
            // Bound to a local so the guard drops before `inner` does.
            let outcome = match inner.handlers.lock() {
                Ok(mut handlers) => {
                    handlers.location.retain(|(hid, _)| *hid != id);
                    handlers.error.retain(|(hid, _)| *hid != id);
                    handlers.motion.retain(|(hid, _)| *hid != id);
                    handlers.geofence.retain(|(hid, _)| *hid != id);
                    handlers.named.retain(|(hid, _, _)| *hid != id);
                    Ok(())
                }
                Err(_) => Err(SubscriptionError::RevokeFailed(
                    "simulated plugin handler list poisoned".to_string(),
                )),
            };
            outcome
        })
    }
}

#[async_trait]
impl TrackingPlugin for SimulatedPlugin {
    async fn configure(&self, config: &TrackingConfig) -> Result<PluginState, PluginError> {
        *self.inner.applied_config.lock().expect("lock sim config") = Some(config.clone());
        Ok(PluginState {
            enabled: self.inner.enabled.load(Ordering::SeqCst),
        })
    }

    async fn set_config(&self, config: &TrackingConfig) -> Result<PluginState, PluginError> {
        *self.inner.applied_config.lock().expect("lock sim config") = Some(config.clone());
        Ok(PluginState {
            enabled: self.inner.enabled.load(Ordering::SeqCst),
        })
    }

    async fn start(&self) -> Result<(), PluginError> {
        self.inner.enabled.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<(), PluginError> {
        self.inner.enabled.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn state(&self) -> Result<PluginState, PluginError> {
        Ok(PluginState {
            enabled: self.inner.enabled.load(Ordering::SeqCst),
        })
    }

    async fn current_position(&self) -> Result<LocationFix, PluginError> {
        Ok(*self.inner.position.lock().expect("lock sim position"))
    }

    async fn record_count(&self) -> Result<u64, PluginError> {
        Ok(self.inner.records.load(Ordering::SeqCst))
    }

    async fn clear_records(&self) -> Result<(), PluginError> {
        self.inner.records.store(0, Ordering::SeqCst);
        Ok(())
    }

    async fn log_dump(&self) -> Result<String, PluginError> {
        Ok(format!(
            "simulated plugin: enabled={} records={}",
            self.inner.enabled.load(Ordering::SeqCst),
            self.inner.records.load(Ordering::SeqCst)
        ))
    }

    fn on_location(&self, handler: LocationHandler) -> Subscription {
        self.register(|handlers, id| handlers.location.push((id, Arc::new(handler))))
    }

    fn on_error(&self, handler: PluginErrorHandler) -> Subscription {
        self.register(|handlers, id| handlers.error.push((id, Arc::new(handler))))
    }

    fn on_event(&self, event: &str, handler: EventHandler) -> Subscription {
        let event = event.to_string();
        self.register(|handlers, id| handlers.named.push((id, event, Arc::new(handler))))
    }

    fn on_motion_change(&self, handler: MotionHandler) -> Subscription {
        self.register(|handlers, id| handlers.motion.push((id, Arc::new(handler))))
    }

    fn on_geofence(&self, handler: GeofenceHandler) -> Subscription {
        self.register(|handlers, id| handlers.geofence.push((id, Arc::new(handler))))
    }
}
