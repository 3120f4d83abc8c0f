use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use serde::Serialize;
use serde_json::Value;

use crate::level::Level;
use crate::subscription::{Subscription, SubscriptionError};

const LOG_TARGET: &str = "geotrack";

/// One appended log row. Immutable once recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub message: String,
    pub extras: Option<Value>,
    pub level: Level,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.extras {
            Some(extras) => write!(f, "{} {}", self.message, extras),
            None => f.write_str(&self.message),
        }
    }
}

type ChangeFn = Box<dyn FnMut() + Send>;

// Callbacks sit behind their own `Arc<Mutex<..>>` so dispatch can snapshot
// the list and run them without holding the registry lock; a callback may
// revoke or register subscriptions while it runs.
#[derive(Default)]
struct Listeners {
    next_id: u64,
    active: Vec<(u64, Arc<Mutex<ChangeFn>>)>,
}

/// Append-only log buffer with independently filtered storage and console
/// sinks, plus change notification for a log view.
///
/// The console sink forwards through the `log` facade; the storage sink
/// appends to the in-memory buffer returned by [`LogRecorder::logs`]. Each
/// sink has its own minimum severity, and changing a level never removes
/// entries that were already appended.
pub struct LogRecorder {
    storage_level: Level,
    console_level: Level,
    bypass_rsod: bool,
    entries: Vec<LogEntry>,
    listeners: Arc<Mutex<Listeners>>,
}

impl Default for LogRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl LogRecorder {
    pub fn new() -> Self {
        Self {
            storage_level: Level::Debug,
            console_level: Level::Debug,
            bypass_rsod: true,
            entries: Vec::new(),
            listeners: Arc::new(Mutex::new(Listeners::default())),
        }
    }

    /// Minimum severity appended to the in-memory buffer.
    pub fn set_storage_level(&mut self, level: Level) {
        self.storage_level = level;
    }

    /// Minimum severity forwarded to the console sink.
    pub fn set_console_level(&mut self, level: Level) {
        self.console_level = level;
    }

    /// In interactive development, error-level console output can trigger an
    /// obtrusive error overlay. Enable this to route errors through the warn
    /// sink instead.
    pub fn bypass_rsod(&mut self, flag: bool) {
        self.bypass_rsod = flag;
    }

    /// Registers for change notifications; the returned handle revokes the
    /// registration.
    pub fn on_change(&self, callback: impl FnMut() + Send + 'static) -> Subscription {
        let callback: ChangeFn = Box::new(callback);
        let id = match self.listeners.lock() {
            Ok(mut listeners) => {
                listeners.next_id += 1;
                let id = listeners.next_id;
                listeners.active.push((id, Arc::new(Mutex::new(callback))));
                id
            }
            // A poisoned listener list drops the registration; logging must
            // not propagate failures.
            Err(_) => return Subscription::new(|| Ok(())),
        };

        let weak: Weak<Mutex<Listeners>> = Arc::downgrade(&self.listeners);
        Subscription::new(move || {
            let Some(listeners) = weak.upgrade() else {
                // Recorder is gone; nothing left to revoke.
                return Ok(());
            };
            // Bound to a local so the guard drops before `listeners` does.
            let outcome = match listeners.lock() {
                Ok(mut listeners) => {
                    listeners.active.retain(|(lid, _)| *lid != id);
                    Ok(())
                }
                Err(_) => Err(SubscriptionError::RevokeFailed(
                    "log listener list poisoned".to_string(),
                )),
            };
            outcome
        })
    }

    pub fn debug(&mut self, message: impl Into<String>) {
        self.report(message, None, Level::Debug, false);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.report(message, None, Level::Info, false);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.report(message, None, Level::Warn, false);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.report(message, None, Level::Error, false);
    }

    pub fn debug_with<T: Serialize + ?Sized>(&mut self, message: impl Into<String>, extras: &T) {
        self.report_with(message, extras, Level::Debug);
    }

    pub fn info_with<T: Serialize + ?Sized>(&mut self, message: impl Into<String>, extras: &T) {
        self.report_with(message, extras, Level::Info);
    }

    pub fn warn_with<T: Serialize + ?Sized>(&mut self, message: impl Into<String>, extras: &T) {
        self.report_with(message, extras, Level::Warn);
    }

    pub fn error_with<T: Serialize + ?Sized>(&mut self, message: impl Into<String>, extras: &T) {
        self.report_with(message, extras, Level::Error);
    }

    fn report_with<T: Serialize + ?Sized>(
        &mut self,
        message: impl Into<String>,
        extras: &T,
        level: Level,
    ) {
        let message = message.into();
        match serde_json::to_value(extras) {
            Ok(value) => {
                self.report(message, Some(value), level, false);
            }
            Err(err) => {
                // Extras that cannot be serialized only cost us the payload;
                // the message itself is still recorded.
                log::warn!(target: LOG_TARGET, "dropping unserializable log extras for {message:?}: {err}");
                self.report(message, None, level, false);
            }
        }
    }

    /// Records one entry. Each sink applies its own filter; `quiet`
    /// suppresses the change notification. Never fails.
    pub fn report(
        &mut self,
        message: impl Into<String>,
        extras: Option<Value>,
        level: Level,
        quiet: bool,
    ) -> bool {
        let message = message.into();
        if level >= self.console_level {
            self.emit_console(level, &render(&message, extras.as_ref()));
        }
        if level >= self.storage_level {
            self.entries.push(LogEntry {
                message,
                extras,
                level,
            });
        }
        if !quiet {
            self.notify_change();
        }
        true
    }

    fn emit_console(&self, level: Level, line: &str) {
        match level {
            Level::Debug => log::debug!(target: LOG_TARGET, "{line}"),
            Level::Info => log::info!(target: LOG_TARGET, "{line}"),
            Level::Warn => log::warn!(target: LOG_TARGET, "{line}"),
            Level::Error if self.bypass_rsod => log::warn!(target: LOG_TARGET, "{line}"),
            Level::Error => log::error!(target: LOG_TARGET, "{line}"),
        }
    }

    fn notify_change(&self) {
        let targets = match self.listeners.lock() {
            Ok(listeners) => listeners
                .active
                .iter()
                .map(|(_, callback)| callback.clone())
                .collect::<Vec<_>>(),
            Err(_) => return,
        };
        for callback in targets {
            if let Ok(mut callback) = callback.lock() {
                callback();
            }
        }
    }

    /// Rendered snapshot of the stored entries, in append order.
    pub fn logs(&self) -> Vec<String> {
        self.entries.iter().map(ToString::to_string).collect()
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }
}

fn render(message: &str, extras: Option<&Value>) -> String {
    match extras {
        Some(extras) => format!("{message} {extras}"),
        None => message.to_string(),
    }
}
