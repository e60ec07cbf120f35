//! API versions for deleting the resources a deployment created
//!
//! A generic delete by ID still needs an `api-version` the owning resource
//! provider accepts. The deployment lists the namespaces and resource types
//! it touched; each namespace's metadata is fetched once and every type is
//! matched against it.

use crate::api::deployments::DeploymentProvider;
use crate::api::providers::ProviderResourceType;
use crate::api::{ApiError, Client};
use crate::ids::{NestedResourceId, ResourceProviderId};
use async_trait::async_trait;
use std::collections::HashMap;
use tfplug::Context;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiVersionError {
    #[error("retrieving metadata for Resource Provider {namespace:?}: {source}")]
    Metadata {
        namespace: String,
        #[source]
        source: ApiError,
    },

    #[error("Resource Provider {namespace:?} has no resource type matching {resource_type:?}")]
    UnresolvedType {
        namespace: String,
        resource_type: String,
    },

    #[error("Resource Provider {namespace:?} lists no API versions for {resource_type:?}")]
    NoVersions {
        namespace: String,
        resource_type: String,
    },
}

/// Where resource provider metadata comes from
#[async_trait]
pub trait ProviderMetadataSource: Send + Sync {
    async fn resource_types(
        &self,
        ctx: &Context,
        namespace: &str,
    ) -> Result<Vec<ProviderResourceType>, ApiError>;
}

/// Provider metadata for one subscription, read through the REST client
pub struct SubscriptionProviders<'a> {
    client: &'a Client,
    subscription_id: &'a str,
}

impl<'a> SubscriptionProviders<'a> {
    pub fn new(client: &'a Client, subscription_id: &'a str) -> Self {
        Self {
            client,
            subscription_id,
        }
    }
}

#[async_trait]
impl ProviderMetadataSource for SubscriptionProviders<'_> {
    async fn resource_types(
        &self,
        ctx: &Context,
        namespace: &str,
    ) -> Result<Vec<ProviderResourceType>, ApiError> {
        let id = ResourceProviderId::new(self.subscription_id, namespace);
        Ok(self.client.providers().get(ctx, &id).await?.resource_types)
    }
}

/// Resolved versions keyed by lower-cased `namespace/type`
#[derive(Debug, Default, Clone)]
pub struct ApiVersions {
    versions: HashMap<String, String>,
}

fn key(namespace: &str, resource_type: &str) -> String {
    format!("{}/{}", namespace, resource_type).to_ascii_lowercase()
}

impl ApiVersions {
    pub fn insert(&mut self, namespace: &str, resource_type: &str, version: impl Into<String>) {
        self.versions
            .insert(key(namespace, resource_type), version.into());
    }

    /// Exact type first, then its parents, so `storageAccounts/blobServices`
    /// falls back to `storageAccounts`
    pub fn for_type(&self, namespace: &str, resource_type: &str) -> Option<&str> {
        let mut candidate = resource_type;
        loop {
            if let Some(version) = self.versions.get(&key(namespace, candidate)) {
                return Some(version.as_str());
            }
            candidate = &candidate[..candidate.rfind('/')?];
        }
    }

    pub fn for_resource(&self, id: &NestedResourceId) -> Option<&str> {
        self.for_type(id.namespace(), &id.resource_type())
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

/// Exact match, else the longest metadata type that is a segment prefix
fn best_match<'a>(
    available: &'a [ProviderResourceType],
    wanted: &str,
) -> Option<&'a ProviderResourceType> {
    if let Some(exact) = available
        .iter()
        .find(|t| t.resource_type.eq_ignore_ascii_case(wanted))
    {
        return Some(exact);
    }

    let wanted = wanted.to_ascii_lowercase();
    available
        .iter()
        .filter(|t| wanted.starts_with(&format!("{}/", t.resource_type.to_ascii_lowercase())))
        .max_by_key(|t| t.resource_type.len())
}

/// Resolves an API version for every resource type the deployment lists.
/// Any namespace that cannot be read, or type that cannot be matched, fails
/// the whole resolution.
pub async fn resolve_api_versions(
    source: &dyn ProviderMetadataSource,
    ctx: &Context,
    providers: &[DeploymentProvider],
) -> Result<ApiVersions, ApiVersionError> {
    let mut metadata: HashMap<String, Vec<ProviderResourceType>> = HashMap::new();
    let mut resolved = ApiVersions::default();

    for provider in providers {
        let namespace_key = provider.namespace.to_ascii_lowercase();
        if !metadata.contains_key(&namespace_key) {
            tracing::debug!("Retrieving metadata for Resource Provider {}", provider.namespace);
            let types = source
                .resource_types(ctx, &provider.namespace)
                .await
                .map_err(|source| ApiVersionError::Metadata {
                    namespace: provider.namespace.clone(),
                    source,
                })?;
            metadata.insert(namespace_key.clone(), types);
        }
        let available = metadata
            .get(&namespace_key)
            .map(Vec::as_slice)
            .unwrap_or_default();

        for wanted in &provider.resource_types {
            let matched = best_match(available, &wanted.resource_type).ok_or_else(|| {
                ApiVersionError::UnresolvedType {
                    namespace: provider.namespace.clone(),
                    resource_type: wanted.resource_type.clone(),
                }
            })?;
            let version = matched.api_versions.first().ok_or_else(|| {
                ApiVersionError::NoVersions {
                    namespace: provider.namespace.clone(),
                    resource_type: matched.resource_type.clone(),
                }
            })?;
            resolved.insert(&provider.namespace, &wanted.resource_type, version.clone());
        }
    }

    Ok(resolved)
}
