use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

/// Tracking configuration forwarded verbatim to the external plugin.
///
/// The fields are opaque pass-through values; the core only stores and
/// forwards them. `datum_id`/`datum_type` tag outgoing location payloads.
/// Options the named fields do not cover go into `extras` and ride along
/// unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingConfig {
    // Geolocation
    pub desired_accuracy: i64,
    pub stationary_radius: u32,
    pub distance_filter: u32,
    pub stop_after_elapsed_minutes: u32,
    pub activity_type: String,
    pub disable_elasticity: bool,
    // Activity recognition
    pub activity_recognition_interval_ms: u64,
    // Minutes of stillness allowed before the GPS is turned off.
    pub stop_timeout_minutes: u32,
    pub stop_detection_delay: u32,
    // Application
    pub debug: bool,
    pub prevent_suspend: bool,
    // Keep tracking in the background when the user closes the app.
    pub stop_on_terminate: bool,
    // Auto start tracking when the device is powered up.
    pub start_on_boot: bool,
    pub heartbeat_interval_secs: u32,
    pub max_records_to_persist: i64,
    pub max_days_to_persist: u32,
    // HTTP sync
    pub sync_url: Option<Url>,
    pub auto_sync: bool,
    pub batch_sync: bool,
    pub max_batch_sync: u32,
    // Payload tagging
    pub datum_id: Option<String>,
    pub datum_type: Option<String>,
    /// Free-form pass-through options.
    #[serde(default)]
    pub extras: Map<String, Value>,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            desired_accuracy: 0,
            stationary_radius: 10,
            distance_filter: 20,
            stop_after_elapsed_minutes: 0,
            activity_type: "Other".to_string(),
            disable_elasticity: false,
            activity_recognition_interval_ms: 10_000,
            stop_timeout_minutes: 1,
            stop_detection_delay: 0,
            debug: true,
            prevent_suspend: false,
            stop_on_terminate: false,
            start_on_boot: true,
            heartbeat_interval_secs: 60,
            max_records_to_persist: -1,
            max_days_to_persist: 1,
            sync_url: None,
            auto_sync: true,
            batch_sync: false,
            max_batch_sync: 250,
            datum_id: None,
            datum_type: None,
            extras: Map::new(),
        }
    }
}

impl TrackingConfig {
    /// Merges a patch: `Some` fields overwrite, `None` fields are left
    /// untouched. Patch extras merge key-by-key, last write wins, without
    /// disturbing the position of keys already present.
    pub fn apply(&mut self, patch: ConfigPatch) {
        macro_rules! merge {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = patch.$field {
                    self.$field = value;
                })*
            };
        }
        merge!(
            desired_accuracy,
            stationary_radius,
            distance_filter,
            stop_after_elapsed_minutes,
            activity_type,
            disable_elasticity,
            activity_recognition_interval_ms,
            stop_timeout_minutes,
            stop_detection_delay,
            debug,
            prevent_suspend,
            stop_on_terminate,
            start_on_boot,
            heartbeat_interval_secs,
            max_records_to_persist,
            max_days_to_persist,
        );
        if let Some(url) = patch.sync_url {
            self.sync_url = Some(url);
        }
        merge!(auto_sync, batch_sync, max_batch_sync);
        if let Some(id) = patch.datum_id {
            self.datum_id = Some(id);
        }
        if let Some(kind) = patch.datum_type {
            self.datum_type = Some(kind);
        }
        for (key, value) in patch.extras {
            self.extras.insert(key, value);
        }
    }
}

/// Partial update for [`TrackingConfig`]; unset fields leave the target
/// alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigPatch {
    pub desired_accuracy: Option<i64>,
    pub stationary_radius: Option<u32>,
    pub distance_filter: Option<u32>,
    pub stop_after_elapsed_minutes: Option<u32>,
    pub activity_type: Option<String>,
    pub disable_elasticity: Option<bool>,
    pub activity_recognition_interval_ms: Option<u64>,
    pub stop_timeout_minutes: Option<u32>,
    pub stop_detection_delay: Option<u32>,
    pub debug: Option<bool>,
    pub prevent_suspend: Option<bool>,
    pub stop_on_terminate: Option<bool>,
    pub start_on_boot: Option<bool>,
    pub heartbeat_interval_secs: Option<u32>,
    pub max_records_to_persist: Option<i64>,
    pub max_days_to_persist: Option<u32>,
    pub sync_url: Option<Url>,
    pub auto_sync: Option<bool>,
    pub batch_sync: Option<bool>,
    pub max_batch_sync: Option<u32>,
    pub datum_id: Option<String>,
    pub datum_type: Option<String>,
    pub extras: Map<String, Value>,
}
