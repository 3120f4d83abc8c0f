//! Geotrack core: pure preference/state bookkeeping and log recording.
mod config;
mod harvester;
mod level;
mod prefs;
mod reconcile;
mod recorder;
mod subscription;

pub use config::{ConfigPatch, TrackingConfig};
pub use harvester::{Harvester, HarvesterRef, HarvesterSlot, LocationFix};
pub use level::Level;
pub use prefs::PreferenceStore;
pub use reconcile::{plan, ReconcileAction};
pub use recorder::{LogEntry, LogRecorder};
pub use subscription::{Subscription, SubscriptionError, SubscriptionRegistry};
pub use url::Url;
