use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use track_logging::track_info;

use geotrack_core::{
    ConfigPatch, Harvester, LocationFix, LogRecorder, PreferenceStore, Url,
};
use geotrack_engine::{
    attach_listeners, detach_listeners, GeofenceEvent, MotionChange, Reconciler, SimulatedPlugin,
};

use crate::log_view::LogView;
use crate::logging::{self, LogDestination};

/// Demo harvester: announces each consumed fix on the console.
struct ConsoleHarvester;

impl Harvester for ConsoleHarvester {
    fn consume(&self, fix: &LocationFix) {
        track_info!(
            "harvester consumed fix at {:.4},{:.4}",
            fix.latitude,
            fix.longitude
        );
    }
}

pub fn run() -> anyhow::Result<()> {
    logging::initialize(LogDestination::Terminal);
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run_session())
}

/// Scripted stand-in for the demo UI: configure, listen, toggle tracking on,
/// receive a few fixes, toggle off, tear down, dump the recorded log.
async fn run_session() -> anyhow::Result<()> {
    let recorder = Arc::new(Mutex::new(LogRecorder::new()));
    let store = Arc::new(Mutex::new(PreferenceStore::new()));
    store
        .lock()
        .expect("lock preference store")
        .update(demo_config());

    let mut view = LogView::attach(&recorder);

    let plugin = Arc::new(SimulatedPlugin::new());
    let reconciler = Reconciler::new(plugin.clone(), store.clone(), recorder.clone())
        .with_command_timeout(Duration::from_secs(5));

    reconciler.configure().await?;
    attach_listeners(plugin.as_ref(), &store, &recorder);

    // The harvester arrives late; the ready callback is queued until then.
    {
        let mut store = store.lock().expect("lock preference store");
        store.on_harvester_ready(|_| track_info!("harvester became available"));
        store.set_harvester(Arc::new(ConsoleHarvester));
    }

    reconciler.reconcile(true).await?;
    view.refresh(&recorder);

    plugin.emit_location(LocationFix {
        latitude: 59.3293,
        longitude: 18.0686,
    });
    plugin.emit_motion(MotionChange { is_moving: true });
    plugin.emit_event("activitychange", json!({"activity": "on_foot"}));
    plugin.emit_location(LocationFix {
        latitude: 59.3326,
        longitude: 18.0649,
    });
    plugin.emit_geofence(GeofenceEvent {
        identifier: "old-town".to_string(),
        action: "ENTER".to_string(),
    });
    view.refresh(&recorder);

    let fix = reconciler.current_position().await?;
    recorder
        .lock()
        .expect("lock log recorder")
        .debug_with("current position", &fix);

    reconciler.record_count().await?;
    reconciler.dump_plugin_log().await?;
    reconciler.clear_records().await?;

    reconciler.reconcile(false).await?;
    detach_listeners(&store, &recorder);
    view.refresh(&recorder);
    view.detach();

    println!("--- recorded log ---");
    for line in recorder.lock().expect("lock log recorder").logs() {
        println!("{line}");
    }
    Ok(())
}

/// The demo's tracking preferences, applied over the defaults.
fn demo_config() -> ConfigPatch {
    ConfigPatch {
        datum_id: Some("demo-device".to_string()),
        datum_type: Some("walker".to_string()),
        sync_url: Url::parse("http://posttestserver.example/post.php?dir=geotrack-demo").ok(),
        heartbeat_interval_secs: Some(60),
        max_days_to_persist: Some(1),
        ..Default::default()
    }
}
