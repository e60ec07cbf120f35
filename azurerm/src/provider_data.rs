//! Provider data structure passed to resources and data sources

use crate::api::Client;
use crate::config::Features;
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Clone)]
pub struct AzureRmProviderData {
    pub client: Arc<Client>,
    pub subscription_id: String,
    pub features: Features,
    /// Resource providers registered automatically on configure. Fixed for
    /// the lifetime of the provider instance.
    pub managed_providers: Arc<BTreeSet<String>>,
}

impl AzureRmProviderData {
    pub fn new(
        client: Client,
        subscription_id: impl Into<String>,
        features: Features,
        managed_providers: BTreeSet<String>,
    ) -> Self {
        Self {
            client: Arc::new(client),
            subscription_id: subscription_id.into(),
            features,
            managed_providers: Arc::new(managed_providers),
        }
    }

    pub fn is_managed_provider(&self, namespace: &str) -> bool {
        self.managed_providers
            .iter()
            .any(|p| p.eq_ignore_ascii_case(namespace))
    }
}
