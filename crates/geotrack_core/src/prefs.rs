use crate::config::{ConfigPatch, TrackingConfig};
use crate::harvester::{HarvesterRef, HarvesterSlot};
use crate::subscription::{Subscription, SubscriptionError, SubscriptionRegistry};

/// In-memory preference/state store shared by the reconciler and the app.
///
/// Construct one explicitly at application start and pass it by reference;
/// independent instances keep tests isolated.
#[derive(Default)]
pub struct PreferenceStore {
    configured: bool,
    config: TrackingConfig,
    harvester: HarvesterSlot,
    subscriptions: SubscriptionRegistry,
}

impl PreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges a partial configuration; see [`TrackingConfig::apply`].
    pub fn update(&mut self, patch: ConfigPatch) {
        self.config.apply(patch);
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    /// Whether the external plugin has been successfully configured.
    pub fn is_configured(&self) -> bool {
        self.configured
    }

    pub fn set_configured(&mut self, flag: bool) {
        self.configured = flag;
    }

    pub fn set_harvester(&mut self, harvester: HarvesterRef) {
        self.harvester.set(harvester);
    }

    /// See [`HarvesterSlot::when_ready`].
    pub fn on_harvester_ready(&mut self, callback: impl FnOnce(&HarvesterRef) + Send + 'static) {
        self.harvester.when_ready(callback);
    }

    pub fn harvester(&self) -> Option<&HarvesterRef> {
        self.harvester.get()
    }

    pub fn datum_id(&self) -> Option<&str> {
        self.config.datum_id.as_deref()
    }

    pub fn datum_type(&self) -> Option<&str> {
        self.config.datum_type.as_deref()
    }

    pub fn add_subscriptions(&mut self, handles: impl IntoIterator<Item = Subscription>) {
        self.subscriptions.extend(handles);
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Tears down every live subscription; see
    /// [`SubscriptionRegistry::remove_all`].
    pub fn remove_subscriptions(&mut self) -> Vec<SubscriptionError> {
        self.subscriptions.remove_all()
    }
}
