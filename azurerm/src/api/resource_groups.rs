//! Resource groups (`Microsoft.Resources/resourceGroups`)

use super::common::Tags;
use super::{ApiError, Client};
use crate::ids::ResourceGroupId;
use serde::{Deserialize, Serialize};
use tfplug::Context;

pub const API_VERSION: &str = "2022-09-01";

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceGroup {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub location: String,
    #[serde(rename = "managedBy", default)]
    pub managed_by: Option<String>,
    #[serde(default)]
    pub tags: Option<Tags>,
    #[serde(default)]
    pub properties: Option<ResourceGroupProperties>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceGroupProperties {
    #[serde(rename = "provisioningState", default)]
    pub provisioning_state: Option<String>,
}

/// Request body for creating or replacing a resource group
#[derive(Debug, Serialize)]
pub struct ResourceGroupPayload {
    pub location: String,
    #[serde(rename = "managedBy", skip_serializing_if = "Option::is_none")]
    pub managed_by: Option<String>,
    pub tags: Tags,
}

/// Fields a resource group can change in place
#[derive(Debug, Serialize)]
pub struct ResourceGroupPatch {
    #[serde(rename = "managedBy", skip_serializing_if = "Option::is_none")]
    pub managed_by: Option<String>,
    pub tags: Tags,
}

/// A resource contained in a group
#[derive(Debug, Clone, Deserialize)]
pub struct GenericResource {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub resource_type: String,
}

pub struct ResourceGroupsApi<'a> {
    client: &'a Client,
}

impl<'a> ResourceGroupsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn get(&self, ctx: &Context, id: &ResourceGroupId) -> Result<ResourceGroup, ApiError> {
        self.client.get(ctx, &id.to_string(), API_VERSION).await
    }

    pub async fn create_or_update(
        &self,
        ctx: &Context,
        id: &ResourceGroupId,
        payload: &ResourceGroupPayload,
    ) -> Result<ResourceGroup, ApiError> {
        tracing::debug!("Creating or updating resource group {}", id);
        self.client
            .put(ctx, &id.to_string(), API_VERSION, payload)
            .await
    }

    /// Updates tags and `managedBy` without recreating the group
    pub async fn update(
        &self,
        ctx: &Context,
        id: &ResourceGroupId,
        patch: &ResourceGroupPatch,
    ) -> Result<ResourceGroup, ApiError> {
        self.client
            .patch(ctx, &id.to_string(), API_VERSION, patch)
            .await
    }

    pub async fn delete(&self, ctx: &Context, id: &ResourceGroupId) -> Result<(), ApiError> {
        tracing::debug!("Deleting resource group {}", id);
        self.client.delete(ctx, &id.to_string(), API_VERSION).await
    }

    pub async fn list_resources(
        &self,
        ctx: &Context,
        id: &ResourceGroupId,
    ) -> Result<Vec<GenericResource>, ApiError> {
        let path = format!("{}/resources", id);
        self.client.list(ctx, &path, API_VERSION).await
    }
}
