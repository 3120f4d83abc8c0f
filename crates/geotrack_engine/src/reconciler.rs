use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use thiserror::Error;

use geotrack_core::{plan, LocationFix, LogRecorder, PreferenceStore, ReconcileAction, TrackingConfig};

use crate::plugin::{PluginError, PluginState, TrackingPlugin};

/// What a reconciliation pass ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Desired and actual already agreed; zero commands issued.
    AlreadyReconciled,
    /// Configuration was pushed and the plugin came up enabled on its own.
    Reconfigured,
    /// Configuration was pushed, the plugin stayed disabled, and an explicit
    /// start was issued.
    Started,
    /// A stop command was issued.
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Plugin(#[from] PluginError),
    /// A plugin callback did not resolve within the configured deadline.
    #[error("plugin command {command:?} timed out")]
    Timeout { command: &'static str },
}

/// Drives the desired-vs-actual tracking state machine against the plugin.
///
/// Actual state is queried fresh on every call; nothing is trusted across a
/// plugin boundary crossing. Store and recorder locks are never held across
/// an await.
pub struct Reconciler {
    plugin: Arc<dyn TrackingPlugin>,
    store: Arc<Mutex<PreferenceStore>>,
    recorder: Arc<Mutex<LogRecorder>>,
    command_timeout: Option<Duration>,
}

impl Reconciler {
    pub fn new(
        plugin: Arc<dyn TrackingPlugin>,
        store: Arc<Mutex<PreferenceStore>>,
        recorder: Arc<Mutex<LogRecorder>>,
    ) -> Self {
        Self {
            plugin,
            store,
            recorder,
            command_timeout: None,
        }
    }

    /// Caps the wait on each individual plugin callback. The default is no
    /// timeout; the plugin contract gives no deadline, so none is assumed.
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }

    /// One-shot plugin setup with the store's current configuration. Marks
    /// the store configured on success.
    pub async fn configure(&self) -> Result<PluginState, ReconcileError> {
        let config = self.snapshot_config();
        let state = self
            .guarded("configure", self.plugin.configure(&config))
            .await?;
        self.store
            .lock()
            .expect("lock preference store")
            .set_configured(true);
        self.debug(format!("plugin configured, enabled -> {}", state.enabled));
        Ok(state)
    }

    /// Compares `desired` against the plugin's reported state and issues the
    /// minimal corrective command sequence.
    pub async fn reconcile(&self, desired: bool) -> Result<ReconcileOutcome, ReconcileError> {
        let actual = self.guarded("getState", self.plugin.state()).await?;
        self.debug(format!(
            "toggle tracking to {desired}, plugin reports {}",
            actual.enabled
        ));

        match plan(desired, actual.enabled) {
            ReconcileAction::Nothing => Ok(ReconcileOutcome::AlreadyReconciled),
            ReconcileAction::Reconfigure => {
                // Snapshot after the state query so a config update that
                // interleaved with the round trip is picked up.
                let config = self.snapshot_config();
                let state = self
                    .guarded("setConfig", self.plugin.set_config(&config))
                    .await?;
                self.debug(format!("plugin enabled -> {}", state.enabled));
                if state.enabled {
                    Ok(ReconcileOutcome::Reconfigured)
                } else {
                    self.debug("tracking wanted but plugin disabled, starting".to_string());
                    self.guarded("start", self.plugin.start()).await?;
                    Ok(ReconcileOutcome::Started)
                }
            }
            ReconcileAction::Stop => {
                self.guarded("stop", self.plugin.stop()).await?;
                self.debug("tracking stop acknowledged".to_string());
                Ok(ReconcileOutcome::Stopped)
            }
        }
    }

    /// One-shot position fetch. Failures are recorded at warn level and
    /// surfaced to the caller.
    pub async fn current_position(&self) -> Result<LocationFix, ReconcileError> {
        match self
            .guarded("getCurrentPosition", self.plugin.current_position())
            .await
        {
            Ok(fix) => Ok(fix),
            Err(err) => {
                self.recorder
                    .lock()
                    .expect("lock log recorder")
                    .warn_with("get current position failed", &json!({"error": err.to_string()}));
                Err(err)
            }
        }
    }

    /// Asks the plugin how many location records it is holding and records
    /// the answer.
    pub async fn record_count(&self) -> Result<u64, ReconcileError> {
        let count = self
            .guarded("getCount", self.plugin.record_count())
            .await?;
        self.debug(format!("background location record count {count}"));
        Ok(count)
    }

    /// Drops the plugin's buffered location records.
    pub async fn clear_records(&self) -> Result<(), ReconcileError> {
        self.guarded("clearDatabase", self.plugin.clear_records())
            .await?;
        self.debug("background location records cleared".to_string());
        Ok(())
    }

    /// Pulls the plugin's internal log into the recorder for diagnostics.
    pub async fn dump_plugin_log(&self) -> Result<(), ReconcileError> {
        let dump = self.guarded("getLog", self.plugin.log_dump()).await?;
        self.recorder
            .lock()
            .expect("lock log recorder")
            .debug_with("plugin log", &json!({"log": dump}));
        Ok(())
    }

    async fn guarded<T>(
        &self,
        command: &'static str,
        call: impl Future<Output = Result<T, PluginError>>,
    ) -> Result<T, ReconcileError> {
        match self.command_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result.map_err(ReconcileError::from),
                Err(_) => Err(ReconcileError::Timeout { command }),
            },
            None => call.await.map_err(ReconcileError::from),
        }
    }

    fn snapshot_config(&self) -> TrackingConfig {
        self.store
            .lock()
            .expect("lock preference store")
            .config()
            .clone()
    }

    fn debug(&self, message: String) {
        self.recorder
            .lock()
            .expect("lock log recorder")
            .debug(message);
    }
}
