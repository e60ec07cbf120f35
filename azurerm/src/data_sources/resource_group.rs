//! Resource group data source

use crate::api::normalize_location;
use crate::ids::{ResourceGroupId, ResourceIdentifier};
use crate::provider_data::AzureRmProviderData;
use crate::resources::{api_failure, provider_data_from, require_configured, required_string};
use async_trait::async_trait;
use std::time::Duration;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
    ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

const TYPE_NAME: &str = "azurerm_resource_group";
const READ_TIMEOUT: Duration = Duration::from_secs(5 * 60);

#[derive(Default)]
pub struct ResourceGroupDataSource {
    provider_data: Option<AzureRmProviderData>,
}

impl ResourceGroupDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_definition() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Gets information about an existing Resource Group")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("The ID of the Resource Group")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the Resource Group")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("location", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("managed_by", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("tags", AttributeType::Map(Box::new(AttributeType::String)))
                    .computed()
                    .build(),
            )
            .build()
    }

    async fn read_group(
        &self,
        ctx: Context,
        config: &DynamicValue,
    ) -> Result<DynamicValue, Diagnostic> {
        let data = require_configured(&self.provider_data)?;
        let ctx = ctx.with_default_timeout(READ_TIMEOUT);
        let id = ResourceGroupId::new(&data.subscription_id, required_string(config, "name")?);

        let group = match data.client.resource_groups().get(&ctx, &id).await {
            Ok(group) => group,
            Err(e) if e.is_not_found() => {
                return Err(Diagnostic::error(
                    "Resource Group not found",
                    format!("Resource Group {:?} was not found", id.resource_group_name),
                ))
            }
            Err(e) => return Err(api_failure("reading", TYPE_NAME, &id, &e)),
        };

        let mut state = config.clone();
        let _ = state.set_string(&AttributePath::new("id"), id.id());
        let _ = state.set_string(
            &AttributePath::new("location"),
            normalize_location(&group.location),
        );
        let _ = state.set_string(
            &AttributePath::new("managed_by"),
            group.managed_by.unwrap_or_default(),
        );
        let _ = state.set_string_map(&AttributePath::new("tags"), &group.tags.unwrap_or_default());
        Ok(state)
    }
}

#[async_trait]
impl DataSource for ResourceGroupDataSource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: DataSourceMetadataRequest,
    ) -> DataSourceMetadataResponse {
        DataSourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: Self::schema_definition(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        ValidateDataSourceConfigResponse {
            diagnostics: tfplug::plan::validate_config(&Self::schema_definition(), &request.config),
        }
    }

    async fn read(&self, ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        tracing::debug!("Reading resource group data source");
        match self.read_group(ctx, &request.config).await {
            Ok(state) => ReadDataSourceResponse::new(state),
            Err(diag) => ReadDataSourceResponse::with_error(request.config, diag),
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for ResourceGroupDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        let mut diagnostics = vec![];
        match provider_data_from(request.provider_data) {
            Ok(data) => self.provider_data = data,
            Err(diag) => diagnostics.push(diag),
        }
        ConfigureDataSourceResponse { diagnostics }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::api::test_helpers::{create_test_provider_data, TEST_SUBSCRIPTION};
    use crate::config::Features;
    use mockito::{Matcher, Server};
    use tfplug::types::ClientCapabilities;

    fn request(name: &str) -> ReadDataSourceRequest {
        let mut config = DynamicValue::null();
        config
            .set_string(&AttributePath::new("name"), name.to_string())
            .unwrap();
        ReadDataSourceRequest {
            type_name: TYPE_NAME.to_string(),
            config,
            provider_meta: None,
            client_capabilities: ClientCapabilities::default(),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn reads_existing_group() {
        let mut server = Server::new_async().await;
        server
            .mock(
                "GET",
                format!("/subscriptions/{}/resourceGroups/Prod-RG", TEST_SUBSCRIPTION).as_str(),
            )
            .match_query(Matcher::UrlEncoded("api-version".into(), "2022-09-01".into()))
            .with_status(200)
            .with_body(r#"{"id":"x","name":"Prod-RG","location":"West Europe","tags":{"env":"prod"}}"#)
            .create_async()
            .await;

        let data_source = ResourceGroupDataSource {
            provider_data: Some(create_test_provider_data(&server.url(), Features::default())),
        };
        let response = data_source.read(Context::new(), request("Prod-RG")).await;

        assert!(response.diagnostics.is_empty());
        let state = response.state;
        assert_eq!(
            state.get_string(&AttributePath::new("id")).unwrap(),
            format!("/subscriptions/{}/resourceGroups/Prod-RG", TEST_SUBSCRIPTION)
        );
        assert_eq!(
            state.get_string(&AttributePath::new("location")).unwrap(),
            "westeurope"
        );
        assert_eq!(
            state.get_string_map(&AttributePath::new("tags")).unwrap()["env"],
            "prod"
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_group_is_an_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", Matcher::Any)
            .with_status(404)
            .with_body(r#"{"error":{"code":"ResourceGroupNotFound","message":"nope"}}"#)
            .create_async()
            .await;

        let data_source = ResourceGroupDataSource {
            provider_data: Some(create_test_provider_data(&server.url(), Features::default())),
        };
        let response = data_source.read(Context::new(), request("gone")).await;

        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Resource Group not found");
    }
}
