//! Resource group resource

use super::{
    api_failure, id_attribute, location_attribute, provider_data_from, require_configured,
    required_string, resolve_timeouts, set_tags, tags_attribute, tags_from,
};
use crate::api::resource_groups::{ResourceGroup, ResourceGroupPatch, ResourceGroupPayload};
use crate::api::normalize_location;
use crate::ids::{self, ResourceGroupId, ResourceIdentifier};
use crate::provider_data::AzureRmProviderData;
use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::import::{import_as_exists_error, import_state_validated_id};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure, ResourceWithImportState,
    UpdateResourceRequest, UpdateResourceResponse, ValidateResourceConfigRequest,
    ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::{StringLengthValidator, StringPatternValidator};
use tfplug::Timeouts;

const TYPE_NAME: &str = "azurerm_resource_group";
const TIMEOUTS: Timeouts = Timeouts::minutes(90, 5, 90, 90);

#[derive(Default)]
pub struct ResourceGroupResource {
    provider_data: Option<AzureRmProviderData>,
}

impl ResourceGroupResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_definition() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a Resource Group")
            .attribute(id_attribute())
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the Resource Group")
                    .required()
                    .validator(StringLengthValidator::between(1, 90))
                    .validator(StringPatternValidator::create(
                        r"^[-\w\.\(\)]*[-\w\(\)]$",
                        "alphanumerics, underscores, parentheses, hyphens and periods, not ending in a period",
                    ))
                    .force_new()
                    .build(),
            )
            .attribute(location_attribute())
            .attribute(
                AttributeBuilder::new("managed_by", AttributeType::String)
                    .description("The ID of the resource or application that manages this Resource Group")
                    .optional()
                    .build(),
            )
            .attribute(tags_attribute())
            .attribute(Timeouts::attribute())
            .build()
    }

    fn id_from_state(&self, state: &DynamicValue) -> Result<ResourceGroupId, Diagnostic> {
        let raw = required_string(state, "id")?;
        ResourceGroupId::parse(&raw).map_err(|e| {
            Diagnostic::error(format!("Invalid {} ID", TYPE_NAME), e.to_string())
        })
    }

    async fn create_group(
        &self,
        ctx: Context,
        request: &CreateResourceRequest,
    ) -> Result<DynamicValue, Diagnostic> {
        let data = require_configured(&self.provider_data)?;
        let ctx = ctx.with_default_timeout(resolve_timeouts(TIMEOUTS, &request.config)?.create);
        let groups = data.client.resource_groups();

        let id = ResourceGroupId::new(
            &data.subscription_id,
            required_string(&request.planned_state, "name")?,
        );

        match groups.get(&ctx, &id).await {
            Ok(_) => return Err(import_as_exists_error(TYPE_NAME, &id.id())),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(api_failure("checking for existing", TYPE_NAME, &id, &e)),
        }

        let payload = ResourceGroupPayload {
            location: normalize_location(&required_string(&request.planned_state, "location")?),
            managed_by: request
                .planned_state
                .get_string_opt(&AttributePath::new("managed_by")),
            tags: tags_from(&request.planned_state)?,
        };

        tracing::info!("Creating resource group {} in {}", id, payload.location);
        let group = groups
            .create_or_update(&ctx, &id, &payload)
            .await
            .map_err(|e| api_failure("creating", TYPE_NAME, &id, &e))?;

        let mut state = request.planned_state.clone();
        apply_remote(&mut state, &id, &group);
        Ok(state)
    }

    async fn read_group(
        &self,
        ctx: Context,
        request: &ReadResourceRequest,
    ) -> Result<Option<DynamicValue>, Diagnostic> {
        let data = require_configured(&self.provider_data)?;
        let ctx =
            ctx.with_default_timeout(resolve_timeouts(TIMEOUTS, &request.current_state)?.read);
        let id = self.id_from_state(&request.current_state)?;

        match data.client.resource_groups().get(&ctx, &id).await {
            Ok(group) => {
                let mut state = request.current_state.clone();
                apply_remote(&mut state, &id, &group);
                Ok(Some(state))
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!("Resource group {} was not found - removing from state", id);
                Ok(None)
            }
            Err(e) => Err(api_failure("reading", TYPE_NAME, &id, &e)),
        }
    }

    async fn update_group(
        &self,
        ctx: Context,
        request: &UpdateResourceRequest,
    ) -> Result<DynamicValue, Diagnostic> {
        let data = require_configured(&self.provider_data)?;
        let ctx = ctx.with_default_timeout(resolve_timeouts(TIMEOUTS, &request.config)?.update);
        let id = self.id_from_state(&request.prior_state)?;

        let patch = ResourceGroupPatch {
            managed_by: request
                .planned_state
                .get_string_opt(&AttributePath::new("managed_by")),
            tags: tags_from(&request.planned_state)?,
        };

        let group = data
            .client
            .resource_groups()
            .update(&ctx, &id, &patch)
            .await
            .map_err(|e| api_failure("updating", TYPE_NAME, &id, &e))?;

        let mut state = request.planned_state.clone();
        apply_remote(&mut state, &id, &group);
        Ok(state)
    }

    async fn delete_group(
        &self,
        ctx: Context,
        request: &DeleteResourceRequest,
    ) -> Result<(), Diagnostic> {
        let data = require_configured(&self.provider_data)?;
        let ctx =
            ctx.with_default_timeout(resolve_timeouts(TIMEOUTS, &request.prior_state)?.delete);
        let id = self.id_from_state(&request.prior_state)?;
        let groups = data.client.resource_groups();

        if data.features.prevent_deletion_if_contains_resources {
            let nested = match groups.list_resources(&ctx, &id).await {
                Ok(nested) => nested,
                Err(e) if e.is_not_found() => {
                    tracing::info!("Resource group {} is already gone", id);
                    return Ok(());
                }
                Err(e) => {
                    return Err(api_failure("listing resources in", TYPE_NAME, &id, &e));
                }
            };
            if !nested.is_empty() {
                return Err(contains_resources_error(
                    &id,
                    nested.iter().map(|r| r.id.as_str()),
                ));
            }
        }

        match groups.delete(&ctx, &id).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => {
                tracing::info!("Resource group {} is already gone", id);
                Ok(())
            }
            Err(e) => Err(api_failure("deleting", TYPE_NAME, &id, &e)),
        }
    }
}

/// Overwrites the remote-owned attributes of `state`. The name comes from the
/// ID so it keeps the user's casing.
fn apply_remote(state: &mut DynamicValue, id: &ResourceGroupId, group: &ResourceGroup) {
    let _ = state.set_string(&AttributePath::new("id"), id.id());
    let _ = state.set_string(&AttributePath::new("name"), id.resource_group_name.clone());
    let _ = state.set_string(
        &AttributePath::new("location"),
        normalize_location(&group.location),
    );
    match &group.managed_by {
        Some(managed_by) if !managed_by.is_empty() => {
            let _ = state.set_string(&AttributePath::new("managed_by"), managed_by.clone());
        }
        _ => {
            let _ = state.set_dynamic(&AttributePath::new("managed_by"), tfplug::Dynamic::Null);
        }
    }
    set_tags(state, group.tags.as_ref());
}

fn contains_resources_error<'a>(
    id: &ResourceGroupId,
    resources: impl Iterator<Item = &'a str>,
) -> Diagnostic {
    let listed: Vec<&str> = resources.collect();
    Diagnostic::error(
        format!("Failed deleting {}", TYPE_NAME),
        format!(
            "deleting {}: the Resource Group still contains {} Resources:\n\n{}\n\n\
             These may have been provisioned outside of this configuration, for example \
             by a template deployment. Remove them first, or disable this check with \
             `prevent_deletion_if_contains_resources` in the provider's `features` block.",
            id,
            listed.len(),
            listed.join("\n"),
        ),
    )
}

#[async_trait]
impl Resource for ResourceGroupResource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: Self::schema_definition(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: tfplug::plan::validate_config(&Self::schema_definition(), &request.config),
        }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        match self.create_group(ctx, &request).await {
            Ok(state) => CreateResourceResponse::new(state),
            Err(diag) => CreateResourceResponse::with_error(request.planned_state, diag),
        }
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        match self.read_group(ctx, &request).await {
            Ok(Some(state)) => ReadResourceResponse::found(state, request.private),
            Ok(None) => ReadResourceResponse::gone(request.private),
            Err(diag) => {
                ReadResourceResponse::with_error(request.current_state, request.private, diag)
            }
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        match self.update_group(ctx, &request).await {
            Ok(state) => UpdateResourceResponse::new(state),
            Err(diag) => UpdateResourceResponse::with_error(request.prior_state, diag),
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        match self.delete_group(ctx, &request).await {
            Ok(()) => DeleteResourceResponse::ok(),
            Err(diag) => DeleteResourceResponse::with_error(diag),
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for ResourceGroupResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];
        match provider_data_from(request.provider_data) {
            Ok(data) => self.provider_data = data,
            Err(diag) => diagnostics.push(diag),
        }
        ConfigureResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithImportState for ResourceGroupResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
            deferred: None,
        };
        import_state_validated_id(
            &ctx,
            AttributePath::new("id"),
            &request,
            &mut response,
            ids::validate::<ResourceGroupId>,
        );
        response
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::api::test_helpers::{create_test_provider_data, TEST_SUBSCRIPTION};
    use crate::config::Features;
    use mockito::{Matcher, Server};
    use tfplug::types::{ClientCapabilities, Dynamic};

    fn group_path(name: &str) -> String {
        format!("/subscriptions/{}/resourceGroups/{}", TEST_SUBSCRIPTION, name)
    }

    fn resource(url: &str, features: Features) -> ResourceGroupResource {
        ResourceGroupResource {
            provider_data: Some(create_test_provider_data(url, features)),
        }
    }

    fn prior_state(name: &str) -> DynamicValue {
        let mut state = DynamicValue::null();
        state
            .set_string(&AttributePath::new("id"), group_path(name))
            .unwrap();
        state
    }

    fn delete_request(name: &str) -> DeleteResourceRequest {
        DeleteResourceRequest {
            type_name: TYPE_NAME.to_string(),
            prior_state: prior_state(name),
            planned_private: vec![],
            provider_meta: None,
        }
    }

    #[test]
    fn name_validation() {
        let schema = ResourceGroupResource::schema_definition();
        let config = |name: &str| {
            let mut config = DynamicValue::null();
            config
                .set_string(&AttributePath::new("name"), name.to_string())
                .unwrap();
            config
                .set_string(&AttributePath::new("location"), "westeurope".to_string())
                .unwrap();
            config
        };

        assert!(tfplug::plan::validate_config(&schema, &config("acctestRG-1")).is_empty());
        assert!(!tfplug::plan::validate_config(&schema, &config("ends.with.period.")).is_empty());
        assert!(!tfplug::plan::validate_config(&schema, &config(&"a".repeat(91))).is_empty());
    }

    #[test]
    fn location_change_in_case_only_is_not_a_replacement() {
        let schema = ResourceGroupResource::schema_definition();
        let mut prior = prior_state("rg");
        prior
            .set_string(&AttributePath::new("name"), "rg".to_string())
            .unwrap();
        prior
            .set_string(&AttributePath::new("location"), "westeurope".to_string())
            .unwrap();

        let mut config = DynamicValue::null();
        config
            .set_string(&AttributePath::new("name"), "rg".to_string())
            .unwrap();
        config
            .set_string(&AttributePath::new("location"), "West Europe".to_string())
            .unwrap();

        let plan = tfplug::plan::plan_resource_change(&schema, &prior, &config, &config);
        assert!(plan.requires_replace.is_empty());
        assert_eq!(
            plan.planned_state.get_value(&AttributePath::new("location")),
            Dynamic::String("westeurope".into())
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn delete_refuses_group_with_resources() {
        let mut server = Server::new_async().await;
        let list = server
            .mock("GET", format!("{}/resources", group_path("rg")).as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"value":[{"id":"/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/vnet","name":"vnet","type":"Microsoft.Network/virtualNetworks"}]}"#,
            )
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", group_path("rg").as_str())
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let response = resource(&server.url(), Features::default())
            .delete(Context::new(), delete_request("rg"))
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].detail.contains("virtualNetworks/vnet"));
        list.assert_async().await;
        delete.assert_async().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn delete_skips_listing_when_feature_disabled() {
        let mut server = Server::new_async().await;
        let delete = server
            .mock("DELETE", group_path("rg").as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .create_async()
            .await;

        let features = Features {
            prevent_deletion_if_contains_resources: false,
            ..Features::default()
        };
        let response = resource(&server.url(), features)
            .delete(Context::new(), delete_request("rg"))
            .await;

        assert!(response.diagnostics.is_empty());
        delete.assert_async().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn create_fails_when_group_already_exists() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", group_path("rg").as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"id":"x","name":"rg","location":"westeurope"}"#)
            .create_async()
            .await;

        let mut planned = DynamicValue::null();
        planned
            .set_string(&AttributePath::new("name"), "rg".to_string())
            .unwrap();
        planned
            .set_string(&AttributePath::new("location"), "westeurope".to_string())
            .unwrap();

        let response = resource(&server.url(), Features::default())
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: TYPE_NAME.to_string(),
                    planned_state: planned.clone(),
                    config: planned,
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(
            response.diagnostics[0].summary,
            "azurerm_resource_group already exists"
        );
    }

    #[tokio::test]
    async fn unconfigured_read_keeps_state_and_errors() {
        let response = ResourceGroupResource::new()
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: TYPE_NAME.to_string(),
                    current_state: prior_state("rg"),
                    private: vec![],
                    provider_meta: None,
                    client_capabilities: ClientCapabilities::default(),
                    current_identity: None,
                },
            )
            .await;

        assert!(response.new_state.is_some());
        assert_eq!(response.diagnostics[0].summary, "Provider not configured");
    }

    #[tokio::test]
    async fn import_rejects_malformed_ids() {
        let resource = ResourceGroupResource::new();
        let request = |id: &str| ImportResourceStateRequest {
            type_name: TYPE_NAME.to_string(),
            id: id.to_string(),
            client_capabilities: ClientCapabilities::default(),
            identity: None,
        };

        let ok = resource
            .import_state(Context::new(), request("/subscriptions/s/resourcegroups/rg"))
            .await;
        assert!(ok.diagnostics.is_empty());
        assert_eq!(ok.imported_resources.len(), 1);

        let bad = resource
            .import_state(Context::new(), request("/subscriptions/s/rg"))
            .await;
        assert_eq!(bad.diagnostics.len(), 1);
        assert!(bad.imported_resources.is_empty());
    }
}
