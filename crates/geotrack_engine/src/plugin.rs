use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use geotrack_core::{LocationFix, Subscription, TrackingConfig};

/// Tracking state as reported by the plugin. Never cached by this crate;
/// queried fresh wherever a decision depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluginState {
    pub enabled: bool,
}

/// Error reported by the plugin itself. Surfaced to callers as values,
/// never panics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PluginError {
    #[error("position fetch failed with code {code}")]
    Position { code: i32 },
    #[error("plugin command failed: {0}")]
    Command(String),
}

/// A detected motion-state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionChange {
    pub is_moving: bool,
}

/// A geofence crossing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeofenceEvent {
    pub identifier: String,
    pub action: String,
}

pub type LocationHandler = Box<dyn Fn(&LocationFix) + Send + Sync>;
pub type PluginErrorHandler = Box<dyn Fn(&PluginError) + Send + Sync>;
pub type EventHandler = Box<dyn Fn(&Value) + Send + Sync>;
pub type MotionHandler = Box<dyn Fn(&MotionChange) + Send + Sync>;
pub type GeofenceHandler = Box<dyn Fn(&GeofenceEvent) + Send + Sync>;

/// The external background-tracking collaborator.
///
/// The real system implements this with a native plugin; everything behind
/// it (motion detection, geofencing, persistence, HTTP batching) is opaque
/// to this crate. Command methods resolve once per call; event registration
/// returns a revocable [`Subscription`].
#[async_trait]
pub trait TrackingPlugin: Send + Sync {
    /// One-shot setup; resolves with the resulting reported state.
    async fn configure(&self, config: &TrackingConfig) -> Result<PluginState, PluginError>;

    /// Reconfiguration without a full restart.
    async fn set_config(&self, config: &TrackingConfig) -> Result<PluginState, PluginError>;

    async fn start(&self) -> Result<(), PluginError>;

    async fn stop(&self) -> Result<(), PluginError>;

    /// Fresh state query.
    async fn state(&self) -> Result<PluginState, PluginError>;

    /// One-shot position fetch.
    async fn current_position(&self) -> Result<LocationFix, PluginError>;

    /// Number of location records the plugin currently holds for upload.
    async fn record_count(&self) -> Result<u64, PluginError>;

    /// Drops the plugin's buffered location records.
    async fn clear_records(&self) -> Result<(), PluginError>;

    /// The plugin's own internal log, for diagnostics.
    async fn log_dump(&self) -> Result<String, PluginError>;

    fn on_location(&self, handler: LocationHandler) -> Subscription;

    fn on_error(&self, handler: PluginErrorHandler) -> Subscription;

    /// Free-form named events, e.g. `activitychange` or `providerchange`.
    fn on_event(&self, event: &str, handler: EventHandler) -> Subscription;

    fn on_motion_change(&self, handler: MotionHandler) -> Subscription;

    fn on_geofence(&self, handler: GeofenceHandler) -> Subscription;
}
