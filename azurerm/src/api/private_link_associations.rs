//! Resource management private link associations

use super::{ApiError, Client};
use crate::ids::PrivateLinkAssociationId;
use serde::{Deserialize, Serialize};
use tfplug::Context;

pub const API_VERSION: &str = "2020-05-01";

#[derive(Debug, Clone, Deserialize)]
pub struct PrivateLinkAssociation {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub properties: Option<PrivateLinkAssociationProperties>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrivateLinkAssociationProperties {
    #[serde(rename = "privateLink", default)]
    pub private_link: Option<String>,
    #[serde(rename = "publicNetworkAccess", default)]
    pub public_network_access: Option<String>,
    #[serde(rename = "tenantID", default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PrivateLinkAssociationPayload {
    pub properties: PrivateLinkAssociationPayloadProperties,
}

#[derive(Debug, Serialize)]
pub struct PrivateLinkAssociationPayloadProperties {
    #[serde(rename = "privateLink")]
    pub private_link: String,
    #[serde(rename = "publicNetworkAccess")]
    pub public_network_access: String,
}

pub struct PrivateLinkAssociationsApi<'a> {
    client: &'a Client,
}

impl<'a> PrivateLinkAssociationsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn get(
        &self,
        ctx: &Context,
        id: &PrivateLinkAssociationId,
    ) -> Result<PrivateLinkAssociation, ApiError> {
        self.client.get(ctx, &id.to_string(), API_VERSION).await
    }

    pub async fn put(
        &self,
        ctx: &Context,
        id: &PrivateLinkAssociationId,
        payload: &PrivateLinkAssociationPayload,
    ) -> Result<PrivateLinkAssociation, ApiError> {
        self.client
            .put(ctx, &id.to_string(), API_VERSION, payload)
            .await
    }

    pub async fn delete(
        &self,
        ctx: &Context,
        id: &PrivateLinkAssociationId,
    ) -> Result<(), ApiError> {
        self.client.delete(ctx, &id.to_string(), API_VERSION).await
    }
}
