//! Preview feature registration (`Microsoft.Features`)

use super::{ApiError, Client};
use crate::ids::FeatureId;
use serde::Deserialize;
use tfplug::Context;

pub const API_VERSION: &str = "2021-07-01";

#[derive(Debug, Clone, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub properties: Option<FeatureProperties>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeatureProperties {
    #[serde(default)]
    pub state: String,
}

impl Feature {
    pub fn state(&self) -> &str {
        self.properties.as_ref().map_or("", |p| p.state.as_str())
    }
}

pub struct FeaturesApi<'a> {
    client: &'a Client,
}

impl<'a> FeaturesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn get(&self, ctx: &Context, id: &FeatureId) -> Result<Feature, ApiError> {
        self.client.get(ctx, &id.to_string(), API_VERSION).await
    }

    pub async fn register(&self, ctx: &Context, id: &FeatureId) -> Result<(), ApiError> {
        tracing::info!(
            "Registering feature {} of {}",
            id.name,
            id.provider_namespace
        );
        let path = format!("{}/register", id);
        self.client
            .post::<serde_json::Value, ()>(ctx, &path, API_VERSION, None)
            .await?;
        Ok(())
    }

    pub async fn unregister(&self, ctx: &Context, id: &FeatureId) -> Result<(), ApiError> {
        tracing::info!(
            "Unregistering feature {} of {}",
            id.name,
            id.provider_namespace
        );
        let path = format!("{}/unregister", id);
        self.client
            .post::<serde_json::Value, ()>(ctx, &path, API_VERSION, None)
            .await?;
        Ok(())
    }
}
