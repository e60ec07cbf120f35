//! Test helpers for the Azure Resource Manager API

use super::{Client, ClientConfig, RetryConfig};
use crate::auth::Credentials;
use crate::config::Features;
use crate::provider_data::AzureRmProviderData;
use crate::registration::default_managed_providers;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

pub const TEST_SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000000";

/// Short back-off and poll intervals so mocked LROs finish quickly
pub fn test_client_config() -> ClientConfig {
    ClientConfig {
        retry: RetryConfig {
            max_retries: 2,
            initial_backoff_ms: 1,
            max_backoff_ms: 5,
            timeout_seconds: 5,
        },
        lro_poll_interval: Duration::from_millis(10),
        registration_poll_interval: Duration::from_millis(10),
    }
}

#[allow(clippy::disallowed_methods)]
pub fn create_test_client(url: &str) -> Client {
    Client::with_config(url, Credentials::AccessToken("tok".into()), test_client_config()).unwrap()
}

pub fn create_test_provider_data(url: &str, features: Features) -> AzureRmProviderData {
    AzureRmProviderData::new(
        create_test_client(url),
        TEST_SUBSCRIPTION,
        features,
        default_managed_providers(),
    )
}

/// Provider data as the host hands it to `configure`
pub fn provider_data_any(url: &str) -> Option<Arc<dyn Any + Send + Sync>> {
    Some(Arc::new(create_test_provider_data(url, Features::default())))
}
