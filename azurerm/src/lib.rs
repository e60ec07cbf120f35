//! Terraform provider for Azure Resource Manager
//!
//! [`AzureRmProvider`] reads its settings from the provider block or `ARM_*`
//! environment variables, registers the Resource Providers it relies on,
//! and hands an [`provider_data::AzureRmProviderData`] to every resource
//! and data source it creates.

pub mod api;
pub mod auth;
pub mod config;
pub mod data_sources;
pub mod ids;
pub mod provider_data;
pub mod registration;
pub mod resources;

use crate::api::{Client, ClientConfig};
use crate::config::{Features, ProviderConfig};
use crate::provider_data::AzureRmProviderData;
use async_trait::async_trait;
use std::any::Any;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tfplug::context::Context;
use tfplug::data_source::DataSourceWithConfigure;
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, DataSourceFactory, Provider,
    ProviderMetadataRequest, ProviderMetadataResponse, ProviderSchemaRequest,
    ProviderSchemaResponse, ResourceFactory, ValidateProviderConfigRequest,
    ValidateProviderConfigResponse,
};
use tfplug::resource::ResourceWithConfigure;
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{Diagnostic, DynamicValue, ServerCapabilities};

pub const PROVIDER_NAME: &str = "azurerm";

/// Upper bound for starting provider registrations during configure
const REGISTRATION_TIMEOUT: Duration = Duration::from_secs(5 * 60);

#[derive(Default)]
pub struct AzureRmProvider {
    client_config: ClientConfig,
    provider_data: Option<Arc<AzureRmProviderData>>,
}

impl AzureRmProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `config` for the retry and polling behaviour of the REST client
    pub fn with_client_config(config: ClientConfig) -> Self {
        Self {
            client_config: config,
            provider_data: None,
        }
    }

    /// The data handed to resources, once the provider is configured
    pub fn provider_data(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        self.provider_data
            .clone()
            .map(|data| data as Arc<dyn Any + Send + Sync>)
    }

    pub fn schema_definition() -> Schema {
        let optional_string = |name: &str, description: &str| {
            AttributeBuilder::new(name, AttributeType::String)
                .description(description)
                .optional()
                .build()
        };
        let secret = |name: &str, description: &str| {
            AttributeBuilder::new(name, AttributeType::String)
                .description(description)
                .optional()
                .sensitive()
                .build()
        };

        SchemaBuilder::new()
            .version(0)
            .description("Azure Resource Manager")
            .attribute(optional_string(
                "subscription_id",
                "The Subscription ID to manage. Falls back to ARM_SUBSCRIPTION_ID",
            ))
            .attribute(optional_string(
                "tenant_id",
                "The Tenant ID of the service principal. Falls back to ARM_TENANT_ID",
            ))
            .attribute(optional_string(
                "client_id",
                "The Client ID of the service principal. Falls back to ARM_CLIENT_ID",
            ))
            .attribute(secret(
                "client_secret",
                "The Client Secret of the service principal. Falls back to ARM_CLIENT_SECRET",
            ))
            .attribute(secret(
                "access_token",
                "A bearer token used instead of the service principal. Falls back to ARM_ACCESS_TOKEN",
            ))
            .attribute(optional_string(
                "resource_manager_endpoint",
                "The Resource Manager endpoint. Falls back to ARM_RESOURCE_MANAGER_ENDPOINT",
            ))
            .attribute(optional_string(
                "authority_host",
                "The Azure AD authority host. Falls back to ARM_AUTHORITY_HOST",
            ))
            .attribute(
                AttributeBuilder::new("skip_provider_registration", AttributeType::Bool)
                    .description(
                        "Do not register the Resource Providers this provider relies on. \
                         Falls back to ARM_SKIP_PROVIDER_REGISTRATION",
                    )
                    .optional()
                    .build(),
            )
            .attribute(Features::attribute())
            .build()
    }

    async fn configure_provider(
        &self,
        ctx: Context,
        config: &DynamicValue,
    ) -> Result<AzureRmProviderData, Diagnostic> {
        let config = ProviderConfig::from_config(config)
            .map_err(|e| Diagnostic::error("Invalid provider configuration", e.to_string()))?;

        let client = Client::with_config(
            &config.resource_manager_endpoint,
            config.credentials.clone(),
            self.client_config.clone(),
        )
        .map_err(|e| Diagnostic::error("Failed to create API client", e.to_string()))?;

        let managed = if config.skip_provider_registration {
            tracing::info!("Skipping Resource Provider registration");
            BTreeSet::new()
        } else {
            registration::default_managed_providers()
        };

        if !managed.is_empty() {
            let ctx = ctx.with_default_timeout(REGISTRATION_TIMEOUT);
            let started =
                registration::ensure_registered(&client, &ctx, &config.subscription_id, &managed)
                    .await
                    .map_err(|e| {
                        Diagnostic::error(
                            "Failed registering Resource Providers",
                            format!(
                                "{}\n\nIf the credentials are not permitted to register \
                                 Resource Providers, set `skip_provider_registration = true` \
                                 and register them out of band.",
                                e
                            ),
                        )
                    })?;
            if !started.is_empty() {
                tracing::info!("Started registration of {}", started.join(", "));
            }
        }

        Ok(AzureRmProviderData::new(
            client,
            config.subscription_id,
            config.features,
            managed,
        ))
    }
}

fn insert_resource<R>(factories: &mut HashMap<String, ResourceFactory>)
where
    R: ResourceWithConfigure + Default + 'static,
{
    let type_name = R::default().type_name().to_string();
    factories.insert(
        type_name,
        Box::new(|| Box::new(R::default()) as Box<dyn ResourceWithConfigure>),
    );
}

fn insert_data_source<D>(factories: &mut HashMap<String, DataSourceFactory>)
where
    D: DataSourceWithConfigure + Default + 'static,
{
    let type_name = D::default().type_name().to_string();
    factories.insert(
        type_name,
        Box::new(|| Box::new(D::default()) as Box<dyn DataSourceWithConfigure>),
    );
}

#[async_trait]
impl Provider for AzureRmProvider {
    fn type_name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: PROVIDER_NAME.to_string(),
            server_capabilities: ServerCapabilities {
                plan_destroy: false,
                get_provider_schema_optional: true,
                move_resource_state: false,
            },
        }
    }

    async fn schema(&self, _ctx: Context, _request: ProviderSchemaRequest) -> ProviderSchemaResponse {
        ProviderSchemaResponse {
            schema: Self::schema_definition(),
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        match self.configure_provider(ctx, &request.config).await {
            Ok(data) => {
                let data = Arc::new(data);
                self.provider_data = Some(data.clone());
                ConfigureProviderResponse {
                    diagnostics: vec![],
                    provider_data: Some(data),
                }
            }
            Err(diag) => ConfigureProviderResponse {
                diagnostics: vec![diag],
                provider_data: None,
            },
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        ValidateProviderConfigResponse {
            diagnostics: tfplug::plan::validate_config(&Self::schema_definition(), &request.config),
        }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut factories = HashMap::new();
        insert_resource::<resources::ResourceGroupResource>(&mut factories);
        insert_resource::<resources::ResourceProviderRegistrationResource>(&mut factories);
        insert_resource::<resources::FeatureRegistrationResource>(&mut factories);
        insert_resource::<resources::ManagementLockResource>(&mut factories);
        insert_resource::<resources::TemplateDeploymentResource>(&mut factories);
        insert_resource::<resources::PrivateLinkAssociationResource>(&mut factories);
        factories
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut factories = HashMap::new();
        insert_data_source::<data_sources::ResourceGroupDataSource>(&mut factories);
        factories
    }
}
