//! Resource provider registration resource
//!
//! Registers a resource provider namespace with the subscription and waits for
//! the registration to settle. Namespaces the provider registers on its own at
//! configure time are refused here, so the two never fight over one namespace.

use super::{
    api_failure, id_attribute, provider_data_from, require_configured, required_string,
    resolve_timeouts,
};
use crate::ids::{self, ResourceIdentifier, ResourceProviderId};
use crate::provider_data::AzureRmProviderData;
use crate::registration::{self, RegistrationError, RegistrationState, RegistrationTarget};
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
use tfplug::validator::StringPatternValidator;
use tfplug::Timeouts;

const TYPE_NAME: &str = "azurerm_resource_provider_registration";
const TIMEOUTS: Timeouts = Timeouts::minutes(120, 5, 120, 120);

#[derive(Default)]
pub struct ResourceProviderRegistrationResource {
    provider_data: Option<AzureRmProviderData>,
}

impl ResourceProviderRegistrationResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_definition() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages the registration of a Resource Provider with the Subscription")
            .attribute(id_attribute())
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The namespace of the Resource Provider, e.g. Microsoft.Databricks")
                    .required()
                    .validator(StringPatternValidator::create(
                        r"^[A-Za-z][A-Za-z0-9]*\.[A-Za-z0-9.]+$",
                        "a namespace such as Microsoft.Compute",
                    ))
                    .force_new()
                    .build(),
            )
            .attribute(Timeouts::attribute())
            .build()
    }

    fn id_from_state(&self, state: &DynamicValue) -> Result<ResourceProviderId, Diagnostic> {
        let raw = required_string(state, "id")?;
        ResourceProviderId::parse(&raw)
            .map_err(|e| Diagnostic::error(format!("Invalid {} ID", TYPE_NAME), e.to_string()))
    }

    async fn register_provider(
        &self,
        ctx: Context,
        request: &CreateResourceRequest,
    ) -> Result<DynamicValue, Diagnostic> {
        let data = require_configured(&self.provider_data)?;
        let ctx = ctx.with_default_timeout(resolve_timeouts(TIMEOUTS, &request.config)?.create);
        let name = required_string(&request.planned_state, "name")?;

        if data.is_managed_provider(&name) {
            return Err(managed_by_provider_error(&name));
        }

        let id = ResourceProviderId::new(&data.subscription_id, &name);
        let provider = match data.client.providers().get(&ctx, &id).await {
            Ok(provider) => provider,
            Err(e) if e.is_not_found() => {
                return Err(Diagnostic::error(
                    format!("Failed registering {}", TYPE_NAME),
                    format!("Resource Provider {:?} was not found in the subscription", name),
                )
                .with_attribute(AttributePath::new("name")))
            }
            Err(e) => return Err(api_failure("retrieving", TYPE_NAME, &id, &e)),
        };

        if RegistrationState::parse(&provider.registration_state) == RegistrationState::Registered {
            return Err(import_as_exists_error(TYPE_NAME, &id.id()));
        }

        registration::register(&data.client, &ctx, &RegistrationTarget::Provider(id.clone()))
            .await
            .map_err(|e| api_failure("registering", TYPE_NAME, &id, &e))?;

        let mut state = request.planned_state.clone();
        let _ = state.set_string(&AttributePath::new("id"), id.id());
        Ok(state)
    }

    async fn read_provider(
        &self,
        ctx: Context,
        request: &ReadResourceRequest,
    ) -> Result<Option<DynamicValue>, Diagnostic> {
        let data = require_configured(&self.provider_data)?;
        let ctx =
            ctx.with_default_timeout(resolve_timeouts(TIMEOUTS, &request.current_state)?.read);
        let id = self.id_from_state(&request.current_state)?;

        let provider = match data.client.providers().get(&ctx, &id).await {
            Ok(provider) => provider,
            Err(e) if e.is_not_found() => {
                tracing::warn!("Resource provider {} was not found - removing from state", id);
                return Ok(None);
            }
            Err(e) => return Err(api_failure("reading", TYPE_NAME, &id, &e)),
        };

        let state = RegistrationState::parse(&provider.registration_state);
        if state != RegistrationState::Registered {
            tracing::warn!(
                "Resource provider {} is {} - removing from state",
                id.namespace,
                state
            );
            return Ok(None);
        }

        let mut new_state = request.current_state.clone();
        let _ = new_state.set_string(&AttributePath::new("id"), id.id());
        let _ = new_state.set_string(&AttributePath::new("name"), provider.namespace);
        Ok(Some(new_state))
    }

    async fn unregister_provider(
        &self,
        ctx: Context,
        request: &DeleteResourceRequest,
    ) -> Result<(), Diagnostic> {
        let data = require_configured(&self.provider_data)?;
        let ctx =
            ctx.with_default_timeout(resolve_timeouts(TIMEOUTS, &request.prior_state)?.delete);
        let id = self.id_from_state(&request.prior_state)?;

        match registration::unregister(&data.client, &ctx, &RegistrationTarget::Provider(id.clone()))
            .await
        {
            Ok(_) => Ok(()),
            Err(RegistrationError::Api { source, .. }) if source.is_not_found() => {
                tracing::info!("Resource provider {} is already gone", id.namespace);
                Ok(())
            }
            Err(e) => Err(api_failure("unregistering", TYPE_NAME, &id, &e)),
        }
    }
}

fn managed_by_provider_error(namespace: &str) -> Diagnostic {
    Diagnostic::error(
        format!("Failed registering {}", TYPE_NAME),
        format!(
            "The Resource Provider {:?} is automatically registered by the azurerm provider. \
             To manage this Resource Provider Registration yourself, opt out of automatic \
             registration by setting `skip_provider_registration` to `true` in the provider block.",
            namespace
        ),
    )
    .with_attribute(AttributePath::new("name"))
}

#[async_trait]
impl Resource for ResourceProviderRegistrationResource {
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
        match self.register_provider(ctx, &request).await {
            Ok(state) => CreateResourceResponse::new(state),
            Err(diag) => CreateResourceResponse::with_error(request.planned_state, diag),
        }
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        match self.read_provider(ctx, &request).await {
            Ok(Some(state)) => ReadResourceResponse::found(state, request.private),
            Ok(None) => ReadResourceResponse::gone(request.private),
            Err(diag) => {
                ReadResourceResponse::with_error(request.current_state, request.private, diag)
            }
        }
    }

    /// Only `timeouts` can change without replacement
    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        UpdateResourceResponse::new(request.planned_state)
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        match self.unregister_provider(ctx, &request).await {
            Ok(()) => DeleteResourceResponse::ok(),
            Err(diag) => DeleteResourceResponse::with_error(diag),
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for ResourceProviderRegistrationResource {
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
impl ResourceWithImportState for ResourceProviderRegistrationResource {
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
            ids::validate::<ResourceProviderId>,
        );
        response
    }
}
