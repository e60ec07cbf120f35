//! Resource group template deployments (`Microsoft.Resources/deployments`)

use super::common::{ErrorDetail, Tags};
use super::{ApiError, Client};
use crate::ids::ResourceGroupDeploymentId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tfplug::Context;

pub const API_VERSION: &str = "2020-06-01";

#[derive(Debug, Clone, Deserialize)]
pub struct Deployment {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tags: Option<Tags>,
    #[serde(default)]
    pub properties: DeploymentProperties,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeploymentProperties {
    #[serde(rename = "provisioningState", default)]
    pub provisioning_state: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub parameters: Option<Value>,
    #[serde(default)]
    pub outputs: Option<Value>,
    #[serde(rename = "templateLink", default)]
    pub template_link: Option<Value>,
    #[serde(rename = "debugSetting", default)]
    pub debug_setting: Option<DebugSetting>,
    #[serde(default)]
    pub providers: Vec<DeploymentProvider>,
    #[serde(rename = "outputResources", default)]
    pub output_resources: Vec<ResourceReference>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DebugSetting {
    #[serde(rename = "detailLevel", default)]
    pub detail_level: String,
}

/// A namespace and the resource types a deployment touched in it
#[derive(Debug, Clone, Deserialize)]
pub struct DeploymentProvider {
    #[serde(default)]
    pub namespace: String,
    #[serde(rename = "resourceTypes", default)]
    pub resource_types: Vec<DeploymentResourceType>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeploymentResourceType {
    #[serde(rename = "resourceType", default)]
    pub resource_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceReference {
    pub id: String,
}

/// Request body for creating, updating or validating a deployment
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentPayload {
    pub properties: DeploymentPayloadProperties,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeploymentPayloadProperties {
    pub mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<Value>,
    #[serde(rename = "templateLink", skip_serializing_if = "Option::is_none")]
    pub template_link: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
    #[serde(rename = "debugSetting", skip_serializing_if = "Option::is_none")]
    pub debug_setting: Option<DebugSetting>,
}

#[derive(Debug, Deserialize)]
struct ValidateResult {
    #[serde(default)]
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ExportResult {
    #[serde(default)]
    template: Option<Value>,
}

pub struct DeploymentsApi<'a> {
    client: &'a Client,
}

impl<'a> DeploymentsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn get(
        &self,
        ctx: &Context,
        id: &ResourceGroupDeploymentId,
    ) -> Result<Deployment, ApiError> {
        self.client.get(ctx, &id.to_string(), API_VERSION).await
    }

    /// Runs the template through ARM's pre-flight validation without deploying
    pub async fn validate(
        &self,
        ctx: &Context,
        id: &ResourceGroupDeploymentId,
        payload: &DeploymentPayload,
    ) -> Result<(), ApiError> {
        let path = format!("{}/validate", id);
        let result: Option<ValidateResult> = self
            .client
            .post(ctx, &path, API_VERSION, Some(payload))
            .await?;

        match result.and_then(|r| r.error) {
            Some(error) => Err(ApiError::ApiError {
                status: 400,
                code: error.code.clone(),
                message: error.message.clone(),
                details: Some(Box::new(error)),
            }),
            None => Ok(()),
        }
    }

    pub async fn create_or_update(
        &self,
        ctx: &Context,
        id: &ResourceGroupDeploymentId,
        payload: &DeploymentPayload,
    ) -> Result<Deployment, ApiError> {
        tracing::debug!("Deploying {}", id);
        self.client
            .put(ctx, &id.to_string(), API_VERSION, payload)
            .await
    }

    /// The template as ARM stored it
    pub async fn export_template(
        &self,
        ctx: &Context,
        id: &ResourceGroupDeploymentId,
    ) -> Result<Value, ApiError> {
        let path = format!("{}/exportTemplate", id);
        let result: Option<ExportResult> = self
            .client
            .post::<ExportResult, ()>(ctx, &path, API_VERSION, None)
            .await?;
        Ok(result.and_then(|r| r.template).unwrap_or(Value::Null))
    }

    /// Removes the deployment record only; deployed resources are untouched
    pub async fn delete(
        &self,
        ctx: &Context,
        id: &ResourceGroupDeploymentId,
    ) -> Result<(), ApiError> {
        tracing::debug!("Deleting deployment {}", id);
        self.client.delete(ctx, &id.to_string(), API_VERSION).await
    }
}
