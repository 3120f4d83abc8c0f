use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use geotrack_core::{
    ConfigPatch, Harvester, HarvesterRef, LocationFix, PreferenceStore, Subscription,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(track_logging::initialize_for_tests);
}

struct CountingHarvester {
    fixes: AtomicUsize,
}

impl CountingHarvester {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            fixes: AtomicUsize::new(0),
        })
    }
}

impl Harvester for CountingHarvester {
    fn consume(&self, _fix: &LocationFix) {
        self.fixes.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn datum_fields_merge_independently() {
    init_logging();
    let mut store = PreferenceStore::new();
    store.update(ConfigPatch {
        datum_id: Some("A".to_string()),
        ..Default::default()
    });
    store.update(ConfigPatch {
        datum_type: Some("B".to_string()),
        ..Default::default()
    });

    assert_eq!(store.datum_id(), Some("A"));
    assert_eq!(store.datum_type(), Some("B"));
}

#[test]
fn configured_flag_round_trips() {
    init_logging();
    let mut store = PreferenceStore::new();
    assert!(!store.is_configured());
    store.set_configured(true);
    assert!(store.is_configured());
}

#[test]
fn harvester_callback_registered_before_set_runs_once_on_set() {
    init_logging();
    let mut store = PreferenceStore::new();
    let delivered: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));

    for tag in 0..3 {
        let delivered = delivered.clone();
        store.on_harvester_ready(move |_harvester| {
            delivered.lock().unwrap().push(tag);
        });
    }
    assert!(delivered.lock().unwrap().is_empty());

    let harvester: HarvesterRef = CountingHarvester::new();
    store.set_harvester(harvester);

    // Drained exactly once, in enqueue order.
    assert_eq!(*delivered.lock().unwrap(), vec![0, 1, 2]);
}

#[test]
fn harvester_callback_after_set_runs_synchronously() {
    init_logging();
    let mut store = PreferenceStore::new();
    let harvester: HarvesterRef = CountingHarvester::new();
    store.set_harvester(harvester.clone());

    let ran = Arc::new(AtomicUsize::new(0));
    let counter = ran.clone();
    store.on_harvester_ready(move |got| {
        counter.fetch_add(1, Ordering::SeqCst);
        got.consume(&LocationFix {
            latitude: 0.0,
            longitude: 0.0,
        });
    });
    assert_eq!(ran.load(Ordering::SeqCst), 1);
}

#[test]
fn second_set_overwrites_without_reinvoking() {
    init_logging();
    let mut store = PreferenceStore::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = calls.clone();
    store.on_harvester_ready(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let first = CountingHarvester::new();
    let second = CountingHarvester::new();
    store.set_harvester(first.clone());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Registered between the two sets: sees the first harvester, immediately.
    let first_tag = data_addr(&first);
    store.on_harvester_ready(move |got| {
        assert_eq!(Arc::as_ptr(got) as *const () as usize, first_tag);
    });

    store.set_harvester(second.clone());
    // The queue was drained on the first set; nothing re-fires.
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Registered after the second set: sees the current reference.
    let second_tag = data_addr(&second);
    store.on_harvester_ready(move |got| {
        assert_eq!(Arc::as_ptr(got) as *const () as usize, second_tag);
    });
}

/// Address of the harvester allocation, usable as an identity tag across the
/// concrete and trait-object views of the same `Arc`.
fn data_addr(harvester: &Arc<CountingHarvester>) -> usize {
    Arc::as_ptr(harvester) as usize
}

#[test]
fn subscriptions_are_removed_in_insertion_order() {
    init_logging();
    let mut store = PreferenceStore::new();
    let order: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));

    let handles: Vec<Subscription> = (0..4)
        .map(|id| {
            let order = order.clone();
            Subscription::new(move || {
                order.lock().unwrap().push(id);
                Ok(())
            })
        })
        .collect();
    store.add_subscriptions(handles);
    assert_eq!(store.subscription_count(), 4);

    let failures = store.remove_subscriptions();
    assert!(failures.is_empty());
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
    assert_eq!(store.subscription_count(), 0);

    // Idempotent: a second teardown touches nothing.
    assert!(store.remove_subscriptions().is_empty());
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
}
