//! The provider itself, and the factory plumbing the host runs through it
//!
//! A provider is configured once per plan/apply cycle. Whatever it returns as
//! `provider_data` is handed to every resource and data source instance the
//! factories create, through their `configure` methods.

use crate::context::Context;
use crate::data_source::{
    ConfigureDataSourceRequest, DataSourceWithConfigure, ReadDataSourceRequest,
    ReadDataSourceResponse,
};
use crate::resource::{ConfigureResourceRequest, ResourceWithConfigure};
use crate::schema::Schema;
use crate::types::{ClientCapabilities, Diagnostic, DynamicValue, ServerCapabilities};
use crate::TfplugError;
use async_trait::async_trait;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Creates a fresh, unconfigured resource instance
pub type ResourceFactory = Box<dyn Fn() -> Box<dyn ResourceWithConfigure> + Send + Sync>;

/// Creates a fresh, unconfigured data source instance
pub type DataSourceFactory = Box<dyn Fn() -> Box<dyn DataSourceWithConfigure> + Send + Sync>;

#[async_trait]
pub trait Provider: Send + Sync {
    /// Prefix of every resource type name, e.g. `azurerm`
    fn type_name(&self) -> &str;

    async fn metadata(
        &self,
        ctx: Context,
        request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse;

    async fn schema(&self, ctx: Context, request: ProviderSchemaRequest) -> ProviderSchemaResponse;

    /// Runs once before any resource operation. The returned `provider_data`
    /// is what resources downcast in their own `configure`.
    async fn configure(
        &mut self,
        ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse;

    async fn validate(
        &self,
        ctx: Context,
        request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse;

    /// Keyed by each resource's `type_name()`
    fn resources(&self) -> HashMap<String, ResourceFactory>;

    fn data_sources(&self) -> HashMap<String, DataSourceFactory>;
}

pub struct ProviderMetadataRequest;

pub struct ProviderMetadataResponse {
    pub type_name: String,
    pub server_capabilities: ServerCapabilities,
}

pub struct ProviderSchemaRequest;

pub struct ProviderSchemaResponse {
    pub schema: Schema,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ConfigureProviderRequest {
    pub terraform_version: String,
    pub config: DynamicValue,
    pub client_capabilities: ClientCapabilities,
}

pub struct ConfigureProviderResponse {
    pub diagnostics: Vec<Diagnostic>,
    pub provider_data: Option<Arc<dyn Any + Send + Sync>>,
}

pub struct ValidateProviderConfigRequest {
    pub config: DynamicValue,
}

pub struct ValidateProviderConfigResponse {
    pub diagnostics: Vec<Diagnostic>,
}

/// Builds a configured resource instance the way the host does before
/// dispatching a CRUD call: factory, then configure with the provider data.
pub async fn configured_resource(
    provider: &dyn Provider,
    type_name: &str,
    provider_data: Option<Arc<dyn Any + Send + Sync>>,
) -> Result<Box<dyn ResourceWithConfigure>, Vec<Diagnostic>> {
    let factories = provider.resources();
    let Some(factory) = factories.get(type_name) else {
        let err = TfplugError::ResourceNotFound(type_name.to_string());
        return Err(vec![Diagnostic::error("Unknown resource type", err.to_string())]);
    };

    let mut resource = factory();
    let response = resource
        .configure(Context::new(), ConfigureResourceRequest { provider_data })
        .await;
    if crate::types::has_errors(&response.diagnostics) {
        return Err(response.diagnostics);
    }
    Ok(resource)
}

/// Data source counterpart of [`configured_resource`], followed by the read
pub async fn read_data_source(
    provider: &dyn Provider,
    ctx: Context,
    request: ReadDataSourceRequest,
    provider_data: Option<Arc<dyn Any + Send + Sync>>,
) -> ReadDataSourceResponse {
    let factories = provider.data_sources();
    let Some(factory) = factories.get(&request.type_name) else {
        let err = TfplugError::DataSourceNotFound(request.type_name.clone());
        return ReadDataSourceResponse::with_error(
            request.config,
            Diagnostic::error("Unknown data source", err.to_string()),
        );
    };

    let mut data_source = factory();
    let configured = data_source
        .configure(ctx, ConfigureDataSourceRequest { provider_data })
        .await;
    if crate::types::has_errors(&configured.diagnostics) {
        return ReadDataSourceResponse {
            state: request.config,
            diagnostics: configured.diagnostics,
            deferred: None,
        };
    }

    data_source.read(ctx, request).await
}
