//! Resource group template deployment resource
//!
//! Deleting the deployment record does not delete what the template
//! created. When `delete_nested_items_during_deletion` is on, the output
//! resources are removed first through [`cleanup::delete_nested_resources`],
//! using API versions picked by [`api_versions::resolve_api_versions`].

pub mod api_versions;
pub mod cleanup;

use self::api_versions::{resolve_api_versions, SubscriptionProviders};
use self::cleanup::{delete_nested_resources, plan_nested_resources};
use super::{
    api_failure, id_attribute, provider_data_from, require_configured, required_string,
    resolve_timeouts, set_tags, tags_attribute, tags_from,
};
use crate::api::deployments::{
    DebugSetting, Deployment, DeploymentPayload, DeploymentPayloadProperties,
};
use crate::ids::{self, ResourceGroupDeploymentId, ResourceIdentifier};
use crate::provider_data::AzureRmProviderData;
use async_trait::async_trait;
use serde_json::{json, Value};
use tfplug::context::Context;
use tfplug::import::{import_as_exists_error, import_state_validated_id};
use tfplug::plan_modifier::SuppressDiff;
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
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::{
    JsonStringValidator, OneOfValidator, StringLengthValidator, StringPatternValidator,
};
use tfplug::Timeouts;

const TYPE_NAME: &str = "azurerm_resource_group_template_deployment";
const TIMEOUTS: Timeouts = Timeouts::minutes(180, 5, 180, 180);

pub const DEPLOYMENT_MODES: &[&str] = &["Incremental", "Complete"];
pub const DEBUG_LEVELS: &[&str] = &[
    "none",
    "requestContent",
    "responseContent",
    "requestContent, responseContent",
];

#[derive(Default)]
pub struct TemplateDeploymentResource {
    provider_data: Option<AzureRmProviderData>,
}

impl TemplateDeploymentResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_definition() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages an ARM template deployment scoped to a Resource Group")
            .attribute(id_attribute())
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the deployment")
                    .required()
                    .validator(StringLengthValidator::between(1, 64))
                    .validator(StringPatternValidator::create(
                        r"^[-\w\.\(\)]+$",
                        "alphanumerics, underscores, parentheses, hyphens and periods",
                    ))
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("resource_group_name", AttributeType::String)
                    .description("The Resource Group to deploy into")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("deployment_mode", AttributeType::String)
                    .description("Incremental or Complete")
                    .required()
                    .validator(OneOfValidator::create(DEPLOYMENT_MODES))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("template_content", AttributeType::String)
                    .description("The template as a JSON string")
                    .optional_computed()
                    .validator(Box::new(JsonStringValidator))
                    .plan_modifier(Box::new(SuppressDiff::new(
                        same_json,
                        "templates are compared as JSON documents",
                    )))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("template_spec_version_id", AttributeType::String)
                    .description("The ID of a Template Spec version to deploy instead of template_content")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("parameters_content", AttributeType::String)
                    .description("Parameter values as a JSON string")
                    .optional_computed()
                    .validator(Box::new(JsonStringValidator))
                    .plan_modifier(Box::new(SuppressDiff::new(
                        same_json,
                        "parameters are compared as JSON documents",
                    )))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("debug_level", AttributeType::String)
                    .description("What ARM records about the deployment for debugging")
                    .optional()
                    .validator(OneOfValidator::create(DEBUG_LEVELS))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("output_content", AttributeType::String)
                    .description("The template outputs as a JSON string")
                    .computed()
                    .build(),
            )
            .attribute(tags_attribute())
            .attribute(Timeouts::attribute())
            .build()
    }

    fn id_from_state(&self, state: &DynamicValue) -> Result<ResourceGroupDeploymentId, Diagnostic> {
        let raw = required_string(state, "id")?;
        ResourceGroupDeploymentId::parse(&raw).map_err(|e| {
            Diagnostic::error(format!("Invalid {} ID", TYPE_NAME), e.to_string())
        })
    }

    /// Validates and submits the deployment, then refreshes `planned` from
    /// what ARM stored
    async fn deploy(
        &self,
        ctx: &Context,
        data: &AzureRmProviderData,
        id: &ResourceGroupDeploymentId,
        planned: &DynamicValue,
        operation: &str,
    ) -> Result<DynamicValue, Diagnostic> {
        let deployments = data.client.deployments();
        let payload = build_payload(planned)?;

        deployments
            .validate(ctx, id, &payload)
            .await
            .map_err(|e| api_failure("validating", TYPE_NAME, id, &e))?;

        tracing::info!("Submitting template deployment {}", id);
        let deployment = deployments
            .create_or_update(ctx, id, &payload)
            .await
            .map_err(|e| api_failure(operation, TYPE_NAME, id, &e))?;

        if let Some(state) = deployment.properties.provisioning_state.as_deref() {
            if state.eq_ignore_ascii_case("Failed") || state.eq_ignore_ascii_case("Canceled") {
                return Err(Diagnostic::error(
                    format!("Failed {} {}", operation, TYPE_NAME),
                    format!("{} {}: deployment finished in state {:?}", operation, id, state),
                ));
            }
        }

        let mut state = planned.clone();
        self.refresh(ctx, data, id, &deployment, &mut state).await?;
        Ok(state)
    }

    async fn refresh(
        &self,
        ctx: &Context,
        data: &AzureRmProviderData,
        id: &ResourceGroupDeploymentId,
        deployment: &Deployment,
        state: &mut DynamicValue,
    ) -> Result<(), Diagnostic> {
        apply_remote(state, id, deployment)?;

        // A Template Spec deployment has no inline template to export
        if deployment.properties.template_link.is_none() {
            let template = data
                .client
                .deployments()
                .export_template(ctx, id)
                .await
                .map_err(|e| api_failure("exporting template for", TYPE_NAME, id, &e))?;
            let _ = state.set_string(&AttributePath::new("template_content"), to_json(&template)?);
        }
        Ok(())
    }

    async fn create_deployment(
        &self,
        ctx: Context,
        request: &CreateResourceRequest,
    ) -> Result<DynamicValue, Diagnostic> {
        let data = require_configured(&self.provider_data)?;
        let ctx = ctx.with_default_timeout(resolve_timeouts(TIMEOUTS, &request.config)?.create);

        let id = ResourceGroupDeploymentId::new(
            &data.subscription_id,
            required_string(&request.planned_state, "resource_group_name")?,
            required_string(&request.planned_state, "name")?,
        );

        match data.client.deployments().get(&ctx, &id).await {
            Ok(_) => return Err(import_as_exists_error(TYPE_NAME, &id.id())),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(api_failure("checking for existing", TYPE_NAME, &id, &e)),
        }

        self.deploy(&ctx, data, &id, &request.planned_state, "creating")
            .await
    }

    async fn read_deployment(
        &self,
        ctx: Context,
        request: &ReadResourceRequest,
    ) -> Result<Option<DynamicValue>, Diagnostic> {
        let data = require_configured(&self.provider_data)?;
        let ctx =
            ctx.with_default_timeout(resolve_timeouts(TIMEOUTS, &request.current_state)?.read);
        let id = self.id_from_state(&request.current_state)?;

        let deployment = match data.client.deployments().get(&ctx, &id).await {
            Ok(deployment) => deployment,
            Err(e) if e.is_not_found() => {
                tracing::warn!("Deployment {} was not found - removing from state", id);
                return Ok(None);
            }
            Err(e) => return Err(api_failure("reading", TYPE_NAME, &id, &e)),
        };

        let mut state = request.current_state.clone();
        self.refresh(&ctx, data, &id, &deployment, &mut state).await?;
        Ok(Some(state))
    }

    async fn update_deployment(
        &self,
        ctx: Context,
        request: &UpdateResourceRequest,
    ) -> Result<DynamicValue, Diagnostic> {
        let data = require_configured(&self.provider_data)?;
        let ctx = ctx.with_default_timeout(resolve_timeouts(TIMEOUTS, &request.config)?.update);
        let id = self.id_from_state(&request.prior_state)?;

        self.deploy(&ctx, data, &id, &request.planned_state, "updating")
            .await
    }

    async fn delete_deployment(
        &self,
        ctx: Context,
        request: &DeleteResourceRequest,
    ) -> Result<(), Diagnostic> {
        let data = require_configured(&self.provider_data)?;
        let ctx =
            ctx.with_default_timeout(resolve_timeouts(TIMEOUTS, &request.prior_state)?.delete);
        let id = self.id_from_state(&request.prior_state)?;
        let deployments = data.client.deployments();

        let deployment = match deployments.get(&ctx, &id).await {
            Ok(deployment) => deployment,
            Err(e) if e.is_not_found() => {
                tracing::info!("Deployment {} is already gone", id);
                return Ok(());
            }
            Err(e) => return Err(api_failure("retrieving", TYPE_NAME, &id, &e)),
        };

        if data.features.delete_nested_items_during_deletion {
            let source = SubscriptionProviders::new(&data.client, &id.subscription_id);
            let versions = resolve_api_versions(&source, &ctx, &deployment.properties.providers)
                .await
                .map_err(|e| api_failure("resolving API versions for", TYPE_NAME, &id, &e))?;
            let nested = plan_nested_resources(&deployment.properties.output_resources, &versions)
                .map_err(|e| api_failure("removing nested items of", TYPE_NAME, &id, &e))?;

            let report = delete_nested_resources(data.client.as_ref(), &ctx, &nested)
                .await
                .map_err(|e| api_failure("removing nested items of", TYPE_NAME, &id, &e))?;
            tracing::info!(
                "Removed {} nested items of {} in {} rounds",
                report.deleted.len(),
                id,
                report.rounds
            );
        }

        match deployments.delete(&ctx, &id).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(api_failure("deleting", TYPE_NAME, &id, &e)),
        }
    }
}

fn same_json(old: &str, new: &str) -> bool {
    match (
        serde_json::from_str::<Value>(old),
        serde_json::from_str::<Value>(new),
    ) {
        (Ok(old), Ok(new)) => old == new,
        _ => false,
    }
}

fn to_json(value: &Value) -> Result<String, Diagnostic> {
    serde_json::to_string(value)
        .map_err(|e| Diagnostic::error("Unable to encode JSON", e.to_string()))
}

fn parse_json(name: &str, raw: &str) -> Result<Value, Diagnostic> {
    serde_json::from_str(raw).map_err(|e| {
        Diagnostic::error(format!("Invalid JSON in {}", name), e.to_string())
            .with_attribute(AttributePath::new(name))
    })
}

/// Accepts both bare parameter values and a full deployment parameters
/// file, which wraps them in `parameters` next to `$schema`
pub fn expand_parameters(value: Value) -> Value {
    match value {
        Value::Object(mut map)
            if map.contains_key("$schema") || map.contains_key("contentVersion") =>
        {
            map.remove("parameters")
                .unwrap_or_else(|| Value::Object(Default::default()))
        }
        other => other,
    }
}

/// ARM echoes each parameter back with its declared `type`, which the
/// user never wrote
pub fn flatten_parameters(parameters: &Value) -> Value {
    match parameters {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(name, parameter)| {
                    let mut parameter = parameter.clone();
                    if let Value::Object(fields) = &mut parameter {
                        fields.remove("type");
                    }
                    (name.clone(), parameter)
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

fn build_payload(planned: &DynamicValue) -> Result<DeploymentPayload, Diagnostic> {
    let path = |name: &str| AttributePath::new(name);

    let template_spec = planned.get_string_opt(&path("template_spec_version_id"));
    let (template, template_link) = match template_spec {
        Some(spec_id) => (None, Some(json!({ "id": spec_id }))),
        None => {
            let raw = required_string(planned, "template_content")?;
            (Some(parse_json("template_content", &raw)?), None)
        }
    };

    let parameters = match planned.get_string_opt(&path("parameters_content")) {
        Some(raw) => Some(expand_parameters(parse_json("parameters_content", &raw)?)),
        None => None,
    };

    let debug_setting = planned
        .get_string_opt(&path("debug_level"))
        .map(|detail_level| DebugSetting { detail_level });

    Ok(DeploymentPayload {
        properties: DeploymentPayloadProperties {
            mode: required_string(planned, "deployment_mode")?,
            template,
            template_link,
            parameters,
            debug_setting,
        },
        tags: Some(tags_from(planned)?),
    })
}

fn apply_remote(
    state: &mut DynamicValue,
    id: &ResourceGroupDeploymentId,
    deployment: &Deployment,
) -> Result<(), Diagnostic> {
    let path = |name: &str| AttributePath::new(name);
    let properties = &deployment.properties;

    let _ = state.set_string(&path("id"), id.id());
    let _ = state.set_string(&path("name"), id.deployment_name.clone());
    let _ = state.set_string(&path("resource_group_name"), id.resource_group_name.clone());
    if let Some(mode) = &properties.mode {
        let _ = state.set_string(&path("deployment_mode"), mode.clone());
    }

    match properties.debug_setting.as_ref() {
        Some(debug) if !debug.detail_level.is_empty() => {
            let _ = state.set_string(&path("debug_level"), debug.detail_level.clone());
        }
        _ => {
            let _ = state.set_dynamic(&path("debug_level"), Dynamic::Null);
        }
    }

    let spec_id = properties
        .template_link
        .as_ref()
        .and_then(|link| link.get("id"))
        .and_then(Value::as_str);
    match spec_id {
        Some(spec_id) => {
            let _ = state.set_string(&path("template_spec_version_id"), spec_id.to_string());
        }
        None => {
            let _ = state.set_dynamic(&path("template_spec_version_id"), Dynamic::Null);
        }
    }

    let parameters = properties
        .parameters
        .as_ref()
        .map(flatten_parameters)
        .unwrap_or_else(|| json!({}));
    let _ = state.set_string(&path("parameters_content"), to_json(&parameters)?);

    let outputs = properties.outputs.clone().unwrap_or_else(|| json!({}));
    let _ = state.set_string(&path("output_content"), to_json(&outputs)?);

    set_tags(state, deployment.tags.as_ref());
    Ok(())
}

/// A deployment takes its template from exactly one place
fn template_source_diagnostics(config: &DynamicValue) -> Vec<Diagnostic> {
    let is_set = |name: &str| !matches!(config.get_value(&AttributePath::new(name)), Dynamic::Null);

    match (is_set("template_content"), is_set("template_spec_version_id")) {
        (true, true) => vec![Diagnostic::error(
            "Conflicting template sources",
            "only one of template_content and template_spec_version_id can be set",
        )
        .with_attribute(AttributePath::new("template_spec_version_id"))],
        (false, false) => vec![Diagnostic::error(
            "Missing template",
            "one of template_content or template_spec_version_id must be set",
        )],
        _ => vec![],
    }
}

#[async_trait]
impl Resource for TemplateDeploymentResource {
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
        let mut diagnostics =
            tfplug::plan::validate_config(&Self::schema_definition(), &request.config);
        diagnostics.extend(template_source_diagnostics(&request.config));
        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        match self.create_deployment(ctx, &request).await {
            Ok(state) => CreateResourceResponse::new(state),
            Err(diag) => CreateResourceResponse::with_error(request.planned_state, diag),
        }
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        match self.read_deployment(ctx, &request).await {
            Ok(Some(state)) => ReadResourceResponse::found(state, request.private),
            Ok(None) => ReadResourceResponse::gone(request.private),
            Err(diag) => {
                ReadResourceResponse::with_error(request.current_state, request.private, diag)
            }
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        match self.update_deployment(ctx, &request).await {
            Ok(state) => UpdateResourceResponse::new(state),
            Err(diag) => UpdateResourceResponse::with_error(request.prior_state, diag),
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        match self.delete_deployment(ctx, &request).await {
            Ok(()) => DeleteResourceResponse::ok(),
            Err(diag) => DeleteResourceResponse::with_error(diag),
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for TemplateDeploymentResource {
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
impl ResourceWithImportState for TemplateDeploymentResource {
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
            ids::validate::<ResourceGroupDeploymentId>,
        );
        response
    }
}
