use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;

use geotrack_core::{
    ConfigPatch, LocationFix, LogRecorder, PreferenceStore, Subscription, TrackingConfig,
};
use geotrack_engine::{
    EventHandler, GeofenceHandler, LocationHandler, MotionHandler, PluginError,
    PluginErrorHandler, PluginState, ReconcileError, ReconcileOutcome, Reconciler,
    SimulatedPlugin, TrackingPlugin,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(track_logging::initialize_for_tests);
}

/// Plugin double that records every issued command and plays back scripted
/// state responses.
struct ScriptedPlugin {
    commands: Mutex<Vec<&'static str>>,
    state_replies: Mutex<VecDeque<bool>>,
    set_config_reports_enabled: bool,
    hang_on_start: bool,
}

impl ScriptedPlugin {
    fn new(state_replies: Vec<bool>) -> Self {
        Self {
            commands: Mutex::new(Vec::new()),
            state_replies: Mutex::new(state_replies.into_iter().collect()),
            set_config_reports_enabled: false,
            hang_on_start: false,
        }
    }

    fn commands(&self) -> Vec<&'static str> {
        self.commands.lock().unwrap().clone()
    }

    fn record(&self, command: &'static str) {
        self.commands.lock().unwrap().push(command);
    }
}

#[async_trait]
impl TrackingPlugin for ScriptedPlugin {
    async fn configure(&self, _config: &TrackingConfig) -> Result<PluginState, PluginError> {
        self.record("configure");
        Ok(PluginState { enabled: false })
    }

    async fn set_config(&self, _config: &TrackingConfig) -> Result<PluginState, PluginError> {
        self.record("setConfig");
        Ok(PluginState {
            enabled: self.set_config_reports_enabled,
        })
    }

    async fn start(&self) -> Result<(), PluginError> {
        self.record("start");
        if self.hang_on_start {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn stop(&self) -> Result<(), PluginError> {
        self.record("stop");
        Ok(())
    }

    async fn state(&self) -> Result<PluginState, PluginError> {
        self.record("getState");
        let enabled = self
            .state_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(false);
        Ok(PluginState { enabled })
    }

    async fn current_position(&self) -> Result<LocationFix, PluginError> {
        self.record("getCurrentPosition");
        Err(PluginError::Position { code: 1 })
    }

    async fn record_count(&self) -> Result<u64, PluginError> {
        self.record("getCount");
        Ok(0)
    }

    async fn clear_records(&self) -> Result<(), PluginError> {
        self.record("clearDatabase");
        Ok(())
    }

    async fn log_dump(&self) -> Result<String, PluginError> {
        self.record("getLog");
        Ok(String::new())
    }

    fn on_location(&self, _handler: LocationHandler) -> Subscription {
        Subscription::new(|| Ok(()))
    }

    fn on_error(&self, _handler: PluginErrorHandler) -> Subscription {
        Subscription::new(|| Ok(()))
    }

    fn on_event(&self, _event: &str, _handler: EventHandler) -> Subscription {
        Subscription::new(|| Ok(()))
    }

    fn on_motion_change(&self, _handler: MotionHandler) -> Subscription {
        Subscription::new(|| Ok(()))
    }

    fn on_geofence(&self, _handler: GeofenceHandler) -> Subscription {
        Subscription::new(|| Ok(()))
    }
}

fn reconciler_for(plugin: Arc<dyn TrackingPlugin>) -> Reconciler {
    Reconciler::new(
        plugin,
        Arc::new(Mutex::new(PreferenceStore::new())),
        Arc::new(Mutex::new(LogRecorder::new())),
    )
}

#[tokio::test]
async fn wanted_but_disabled_reconfigures_then_starts() {
    init_logging();
    let plugin = Arc::new(ScriptedPlugin::new(vec![false]));
    let reconciler = reconciler_for(plugin.clone());

    let outcome = reconciler.reconcile(true).await.expect("reconcile");

    assert_eq!(outcome, ReconcileOutcome::Started);
    assert_eq!(plugin.commands(), vec!["getState", "setConfig", "start"]);
}

#[tokio::test]
async fn wanted_and_reconfigure_brings_plugin_up_without_start() {
    init_logging();
    let mut plugin = ScriptedPlugin::new(vec![false]);
    plugin.set_config_reports_enabled = true;
    let plugin = Arc::new(plugin);
    let reconciler = reconciler_for(plugin.clone());

    let outcome = reconciler.reconcile(true).await.expect("reconcile");

    assert_eq!(outcome, ReconcileOutcome::Reconfigured);
    assert_eq!(plugin.commands(), vec!["getState", "setConfig"]);
}

#[tokio::test]
async fn wanted_and_already_enabled_issues_nothing() {
    init_logging();
    let plugin = Arc::new(ScriptedPlugin::new(vec![true]));
    let reconciler = reconciler_for(plugin.clone());

    let outcome = reconciler.reconcile(true).await.expect("reconcile");

    assert_eq!(outcome, ReconcileOutcome::AlreadyReconciled);
    assert_eq!(plugin.commands(), vec!["getState"]);
}

#[tokio::test]
async fn unwanted_but_enabled_stops() {
    init_logging();
    let plugin = Arc::new(ScriptedPlugin::new(vec![true]));
    let reconciler = reconciler_for(plugin.clone());

    let outcome = reconciler.reconcile(false).await.expect("reconcile");

    assert_eq!(outcome, ReconcileOutcome::Stopped);
    assert_eq!(plugin.commands(), vec!["getState", "stop"]);
}

#[tokio::test]
async fn unwanted_and_disabled_completes_without_action() {
    init_logging();
    let plugin = Arc::new(ScriptedPlugin::new(vec![false]));
    let reconciler = reconciler_for(plugin.clone());

    let outcome = reconciler.reconcile(false).await.expect("reconcile");

    assert_eq!(outcome, ReconcileOutcome::AlreadyReconciled);
    assert_eq!(plugin.commands(), vec!["getState"]);
}

#[tokio::test]
async fn hung_plugin_callback_surfaces_timeout() {
    init_logging();
    let mut plugin = ScriptedPlugin::new(vec![false]);
    plugin.hang_on_start = true;
    let plugin = Arc::new(plugin);
    let reconciler = reconciler_for(plugin.clone()).with_command_timeout(Duration::from_millis(25));

    let err = reconciler.reconcile(true).await.expect_err("must time out");

    assert_eq!(err, ReconcileError::Timeout { command: "start" });
    assert_eq!(plugin.commands(), vec!["getState", "setConfig", "start"]);
}

#[tokio::test]
async fn position_failure_is_surfaced_and_recorded() {
    init_logging();
    let plugin = Arc::new(ScriptedPlugin::new(Vec::new()));
    let recorder = Arc::new(Mutex::new(LogRecorder::new()));
    let reconciler = Reconciler::new(
        plugin,
        Arc::new(Mutex::new(PreferenceStore::new())),
        recorder.clone(),
    );

    let err = reconciler.current_position().await.expect_err("scripted failure");

    assert_eq!(
        err,
        ReconcileError::Plugin(PluginError::Position { code: 1 })
    );
    let logs = recorder.lock().unwrap().logs();
    assert!(logs
        .iter()
        .any(|line| line.starts_with("get current position failed")));
}

#[tokio::test]
async fn configure_pushes_store_config_and_marks_configured() {
    init_logging();
    let plugin = Arc::new(SimulatedPlugin::new());
    let store = Arc::new(Mutex::new(PreferenceStore::new()));
    store.lock().unwrap().update(ConfigPatch {
        distance_filter: Some(42),
        ..Default::default()
    });
    let reconciler = Reconciler::new(
        plugin.clone(),
        store.clone(),
        Arc::new(Mutex::new(LogRecorder::new())),
    );

    let state = reconciler.configure().await.expect("configure");

    assert!(!state.enabled);
    assert!(store.lock().unwrap().is_configured());
    let applied = plugin.applied_config().expect("config applied");
    assert_eq!(applied.distance_filter, 42);
}

#[tokio::test]
async fn record_count_follows_emitted_fixes() {
    init_logging();
    let plugin = Arc::new(SimulatedPlugin::new());
    let recorder = Arc::new(Mutex::new(LogRecorder::new()));
    let store = Arc::new(Mutex::new(PreferenceStore::new()));
    let reconciler = Reconciler::new(plugin.clone(), store, recorder.clone());

    reconciler.reconcile(true).await.expect("toggle on");
    plugin.emit_location(LocationFix {
        latitude: 1.0,
        longitude: 2.0,
    });
    plugin.emit_location(LocationFix {
        latitude: 1.1,
        longitude: 2.1,
    });

    assert_eq!(reconciler.record_count().await.expect("count"), 2);
    reconciler.clear_records().await.expect("clear");
    assert_eq!(reconciler.record_count().await.expect("count"), 0);

    reconciler.dump_plugin_log().await.expect("dump");
    let logs = recorder.lock().unwrap().logs();
    assert!(logs
        .iter()
        .any(|line| line.contains("background location record count 2")));
    assert!(logs.iter().any(|line| line.starts_with("plugin log")));
}

#[tokio::test]
async fn toggle_cycle_against_simulated_plugin() {
    init_logging();
    let plugin = Arc::new(SimulatedPlugin::new());
    let recorder = Arc::new(Mutex::new(LogRecorder::new()));
    let reconciler = Reconciler::new(
        plugin.clone(),
        Arc::new(Mutex::new(PreferenceStore::new())),
        recorder.clone(),
    );

    assert_eq!(
        reconciler.reconcile(true).await.expect("toggle on"),
        ReconcileOutcome::Started
    );
    assert_eq!(
        reconciler.reconcile(true).await.expect("toggle on again"),
        ReconcileOutcome::AlreadyReconciled
    );
    assert_eq!(
        reconciler.reconcile(false).await.expect("toggle off"),
        ReconcileOutcome::Stopped
    );

    let logs = recorder.lock().unwrap().logs();
    assert!(logs
        .iter()
        .any(|line| line.contains("toggle tracking to true")));
    assert!(logs
        .iter()
        .any(|line| line.contains("tracking stop acknowledged")));
}
