use std::sync::{Arc, Mutex};

use serde_json::json;
use track_logging::track_warn;

use geotrack_core::{LogRecorder, PreferenceStore};

use crate::plugin::TrackingPlugin;

/// Registers the demo's event subscriptions on the plugin and parks the
/// handles in the store's registry, in registration order.
pub fn attach_listeners(
    plugin: &dyn TrackingPlugin,
    store: &Arc<Mutex<PreferenceStore>>,
    recorder: &Arc<Mutex<LogRecorder>>,
) {
    let mut handles = Vec::with_capacity(6);

    // Fires whenever the plugin reports a location update.
    let location_store = store.clone();
    let location_recorder = recorder.clone();
    handles.push(plugin.on_location(Box::new(move |fix| {
        // Snapshot under the store lock, consume after releasing it; the
        // harvester is free to read the store from inside `consume`.
        let (payload, harvester) = {
            let store = location_store.lock().expect("lock preference store");
            let payload = json!({
                "datum_id": store.datum_id(),
                "datum_type": store.datum_type(),
                "lat": fix.latitude,
                "lon": fix.longitude,
            });
            (payload, store.harvester().cloned())
        };
        if let Some(harvester) = harvester {
            harvester.consume(fix);
        }
        location_recorder
            .lock()
            .expect("lock log recorder")
            .debug_with("on background location", &payload);
    })));

    // Fires whenever the plugin reports an error.
    let error_recorder = recorder.clone();
    handles.push(plugin.on_error(Box::new(move |err| {
        error_recorder
            .lock()
            .expect("lock log recorder")
            .warn_with("error from tracking plugin", &json!({"error": err.to_string()}));
    })));

    // Fires on a change in motion activity, e.g. 'on_foot', 'still'.
    let activity_recorder = recorder.clone();
    handles.push(plugin.on_event(
        "activitychange",
        Box::new(move |payload| {
            activity_recorder
                .lock()
                .expect("lock log recorder")
                .debug_with("current motion activity", payload);
        }),
    ));

    // Fires when the user toggles location services.
    let provider_recorder = recorder.clone();
    handles.push(plugin.on_event(
        "providerchange",
        Box::new(move |payload| {
            provider_recorder
                .lock()
                .expect("lock log recorder")
                .debug_with("location provider changed", payload);
        }),
    ));

    let motion_recorder = recorder.clone();
    handles.push(plugin.on_motion_change(Box::new(move |motion| {
        motion_recorder
            .lock()
            .expect("lock log recorder")
            .debug_with("location motion changed", &json!({"is_moving": motion.is_moving}));
    })));

    let geofence_recorder = recorder.clone();
    handles.push(plugin.on_geofence(Box::new(move |fence| {
        geofence_recorder.lock().expect("lock log recorder").debug_with(
            "location geofence changed",
            &json!({"identifier": fence.identifier, "action": fence.action}),
        );
    })));

    store
        .lock()
        .expect("lock preference store")
        .add_subscriptions(handles);
}

/// Tears down every subscription held by the store. A handle that fails to
/// revoke is logged and skipped; the rest still come down.
pub fn detach_listeners(store: &Arc<Mutex<PreferenceStore>>, recorder: &Arc<Mutex<LogRecorder>>) {
    let failures = store
        .lock()
        .expect("lock preference store")
        .remove_subscriptions();
    for failure in failures {
        track_warn!("listener teardown failure: {failure}");
        recorder
            .lock()
            .expect("lock log recorder")
            .warn_with("listener teardown failed", &json!({"error": failure.to_string()}));
    }
}
