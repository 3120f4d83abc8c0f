//! Console substitute for the demo's scrolling log list.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use track_logging::track_warn;

use geotrack_core::{LogRecorder, Subscription};

/// Subscribes to the recorder's change notifications and prints newly
/// appended entries on `refresh`.
///
/// The change callback only marks the view dirty; the recorder is re-read
/// outside the notification path, the way the list view re-reads `logs()`
/// on each change event.
pub struct LogView {
    subscription: Subscription,
    dirty: Arc<AtomicBool>,
    printed: usize,
}

impl LogView {
    pub fn attach(recorder: &Arc<Mutex<LogRecorder>>) -> Self {
        let dirty = Arc::new(AtomicBool::new(false));
        let flag = dirty.clone();
        let subscription = recorder
            .lock()
            .expect("lock log recorder")
            .on_change(move || {
                flag.store(true, Ordering::SeqCst);
            });
        Self {
            subscription,
            dirty,
            printed: 0,
        }
    }

    /// Prints anything appended since the previous refresh.
    pub fn refresh(&mut self, recorder: &Arc<Mutex<LogRecorder>>) {
        if !self.dirty.swap(false, Ordering::SeqCst) {
            return;
        }
        let logs = recorder.lock().expect("lock log recorder").logs();
        for line in &logs[self.printed..] {
            println!("{} | {line}", Utc::now().format("%H:%M:%S%.3f"));
        }
        self.printed = logs.len();
    }

    pub fn detach(mut self) {
        if let Err(err) = self.subscription.remove() {
            track_warn!("log view teardown failed: {err}");
        }
    }
}
