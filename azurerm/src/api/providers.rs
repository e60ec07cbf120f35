//! Resource provider registration (`Microsoft.Resources/providers`)

use super::{ApiError, Client};
use crate::ids::ResourceProviderId;
use serde::Deserialize;
use tfplug::Context;

pub const API_VERSION: &str = "2022-09-01";

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceProvider {
    #[serde(default)]
    pub id: Option<String>,
    pub namespace: String,
    #[serde(rename = "registrationState", default)]
    pub registration_state: String,
    #[serde(rename = "resourceTypes", default)]
    pub resource_types: Vec<ProviderResourceType>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderResourceType {
    #[serde(rename = "resourceType")]
    pub resource_type: String,
    #[serde(rename = "apiVersions", default)]
    pub api_versions: Vec<String>,
}

pub struct ProvidersApi<'a> {
    client: &'a Client,
}

impl<'a> ProvidersApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn get(
        &self,
        ctx: &Context,
        id: &ResourceProviderId,
    ) -> Result<ResourceProvider, ApiError> {
        self.client.get(ctx, &id.to_string(), API_VERSION).await
    }

    pub async fn list(
        &self,
        ctx: &Context,
        subscription_id: &str,
    ) -> Result<Vec<ResourceProvider>, ApiError> {
        let path = format!("/subscriptions/{}/providers", subscription_id);
        self.client.list(ctx, &path, API_VERSION).await
    }

    /// Starts registration; the state moves through `Registering` afterwards
    pub async fn register(&self, ctx: &Context, id: &ResourceProviderId) -> Result<(), ApiError> {
        tracing::info!("Registering resource provider {}", id.namespace);
        let path = format!("{}/register", id);
        self.client
            .post::<serde_json::Value, ()>(ctx, &path, API_VERSION, None)
            .await?;
        Ok(())
    }

    pub async fn unregister(&self, ctx: &Context, id: &ResourceProviderId) -> Result<(), ApiError> {
        tracing::info!("Unregistering resource provider {}", id.namespace);
        let path = format!("{}/unregister", id);
        self.client
            .post::<serde_json::Value, ()>(ctx, &path, API_VERSION, None)
            .await?;
        Ok(())
    }
}
