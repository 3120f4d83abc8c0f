//! Geotrack engine: the external tracking-plugin boundary and the
//! reconciler that drives it.
mod listeners;
mod plugin;
mod reconciler;
mod sim;

pub use listeners::{attach_listeners, detach_listeners};
pub use plugin::{
    EventHandler, GeofenceEvent, GeofenceHandler, LocationHandler, MotionChange, MotionHandler,
    PluginError, PluginErrorHandler, PluginState, TrackingPlugin,
};
pub use reconciler::{ReconcileError, ReconcileOutcome, Reconciler};
pub use sim::SimulatedPlugin;
