//! Resource management private link association resource

use super::{
    api_failure, id_attribute, provider_data_from, require_configured, required_string,
    resolve_timeouts,
};
use crate::api::private_link_associations::{
    PrivateLinkAssociation, PrivateLinkAssociationPayload, PrivateLinkAssociationPayloadProperties,
};
use crate::ids::{self, parse_management_group_id, PrivateLinkAssociationId, ResourceIdentifier};
use crate::provider_data::AzureRmProviderData;
use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::defaults::UuidDefault;
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
use tfplug::schema::Default as _;
use tfplug::schema::{AttributeBuilder, AttributeType, DefaultRequest, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::StringPatternValidator;
use tfplug::Timeouts;

const TYPE_NAME: &str = "azurerm_resource_management_private_link_association";
const TIMEOUTS: Timeouts = Timeouts::minutes(30, 5, 30, 30);
const UUID_PATTERN: &str =
    r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$";

#[derive(Default)]
pub struct PrivateLinkAssociationResource {
    provider_data: Option<AzureRmProviderData>,
}

impl PrivateLinkAssociationResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_definition() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Associates a Resource Management Private Link with a Management Group")
            .attribute(id_attribute())
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("A UUID naming the association; generated when omitted")
                    .optional_computed()
                    .default(UuidDefault::create())
                    .validator(StringPatternValidator::create(UUID_PATTERN, "a UUID"))
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("management_group_id", AttributeType::String)
                    .description("The ID of the Management Group to associate with")
                    .required()
                    .validator(StringPatternValidator::create(
                        r"(?i)^/providers/Microsoft\.Management/managementGroups/[^/]+$",
                        "a Management Group ID",
                    ))
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("resource_management_private_link_id", AttributeType::String)
                    .description("The ID of the Resource Management Private Link")
                    .required()
                    .validator(StringPatternValidator::create(
                        r"(?i)^/subscriptions/[^/]+/resourceGroups/[^/]+/providers/Microsoft\.Authorization/resourceManagementPrivateLinks/[^/]+$",
                        "a Resource Management Private Link ID",
                    ))
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("public_network_access_enabled", AttributeType::Bool)
                    .description("Whether public network access is allowed for the Management Group")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("tenant_id", AttributeType::String)
                    .description("The Tenant ID of the association")
                    .computed()
                    .build(),
            )
            .attribute(Timeouts::attribute())
            .build()
    }

    fn id_from_state(&self, state: &DynamicValue) -> Result<PrivateLinkAssociationId, Diagnostic> {
        let raw = required_string(state, "id")?;
        PrivateLinkAssociationId::parse(&raw)
            .map_err(|e| Diagnostic::error(format!("Invalid {} ID", TYPE_NAME), e.to_string()))
    }

    async fn create_association(
        &self,
        ctx: Context,
        request: &CreateResourceRequest,
    ) -> Result<DynamicValue, Diagnostic> {
        let data = require_configured(&self.provider_data)?;
        let ctx = ctx.with_default_timeout(resolve_timeouts(TIMEOUTS, &request.config)?.create);
        let planned = &request.planned_state;

        let management_group = parse_management_group_id(&required_string(
            planned,
            "management_group_id",
        )?)
        .map_err(|e| {
            Diagnostic::error("Invalid management_group_id", e.to_string())
                .with_attribute(AttributePath::new("management_group_id"))
        })?;
        let name = planned
            .get_string_opt(&AttributePath::new("name"))
            .unwrap_or_else(generated_name);
        let id = PrivateLinkAssociationId::new(management_group, name);
        let associations = data.client.private_link_associations();

        match associations.get(&ctx, &id).await {
            Ok(_) => return Err(import_as_exists_error(TYPE_NAME, &id.id())),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(api_failure("checking for existing", TYPE_NAME, &id, &e)),
        }

        let public_network_access = planned
            .get_bool(&AttributePath::new("public_network_access_enabled"))
            .map_err(|e| {
                Diagnostic::error("Missing value for public_network_access_enabled", e.to_string())
            })?;
        let payload = PrivateLinkAssociationPayload {
            properties: PrivateLinkAssociationPayloadProperties {
                private_link: required_string(planned, "resource_management_private_link_id")?,
                public_network_access: if public_network_access {
                    "Enabled".to_string()
                } else {
                    "Disabled".to_string()
                },
            },
        };

        let created = associations
            .put(&ctx, &id, &payload)
            .await
            .map_err(|e| api_failure("creating", TYPE_NAME, &id, &e))?;

        let mut state = planned.clone();
        apply_remote(&mut state, &id, &created);
        Ok(state)
    }

    async fn read_association(
        &self,
        ctx: Context,
        request: &ReadResourceRequest,
    ) -> Result<Option<DynamicValue>, Diagnostic> {
        let data = require_configured(&self.provider_data)?;
        let ctx =
            ctx.with_default_timeout(resolve_timeouts(TIMEOUTS, &request.current_state)?.read);
        let id = self.id_from_state(&request.current_state)?;

        match data.client.private_link_associations().get(&ctx, &id).await {
            Ok(association) => {
                let mut state = request.current_state.clone();
                apply_remote(&mut state, &id, &association);
                Ok(Some(state))
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!("Private link association {} was not found - removing from state", id);
                Ok(None)
            }
            Err(e) => Err(api_failure("reading", TYPE_NAME, &id, &e)),
        }
    }

    async fn delete_association(
        &self,
        ctx: Context,
        request: &DeleteResourceRequest,
    ) -> Result<(), Diagnostic> {
        let data = require_configured(&self.provider_data)?;
        let ctx =
            ctx.with_default_timeout(resolve_timeouts(TIMEOUTS, &request.prior_state)?.delete);
        let id = self.id_from_state(&request.prior_state)?;

        match data.client.private_link_associations().delete(&ctx, &id).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(api_failure("deleting", TYPE_NAME, &id, &e)),
        }
    }
}

/// The same UUID default planning would have filled in
fn generated_name() -> String {
    let value = UuidDefault
        .default_value(DefaultRequest {
            path: AttributePath::new("name"),
        })
        .value;
    value.value.as_str().unwrap_or_default().to_string()
}

fn apply_remote(
    state: &mut DynamicValue,
    id: &PrivateLinkAssociationId,
    association: &PrivateLinkAssociation,
) {
    let _ = state.set_string(&AttributePath::new("id"), id.id());
    let _ = state.set_string(&AttributePath::new("name"), id.name.clone());
    let _ = state.set_string(
        &AttributePath::new("management_group_id"),
        id.management_group_scope(),
    );

    let Some(properties) = &association.properties else {
        return;
    };
    if let Some(private_link) = &properties.private_link {
        let _ = state.set_string(
            &AttributePath::new("resource_management_private_link_id"),
            private_link.clone(),
        );
    }
    if let Some(access) = &properties.public_network_access {
        let _ = state.set_bool(
            &AttributePath::new("public_network_access_enabled"),
            access.eq_ignore_ascii_case("Enabled"),
        );
    }
    let _ = state.set_string(
        &AttributePath::new("tenant_id"),
        properties.tenant_id.clone().unwrap_or_default(),
    );
}

#[async_trait]
impl Resource for PrivateLinkAssociationResource {
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
        match self.create_association(ctx, &request).await {
            Ok(state) => CreateResourceResponse::new(state),
            Err(diag) => CreateResourceResponse::with_error(request.planned_state, diag),
        }
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        match self.read_association(ctx, &request).await {
            Ok(Some(state)) => ReadResourceResponse::found(state, request.private),
            Ok(None) => ReadResourceResponse::gone(request.private),
            Err(diag) => {
                ReadResourceResponse::with_error(request.current_state, request.private, diag)
            }
        }
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        UpdateResourceResponse::new(request.planned_state)
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        match self.delete_association(ctx, &request).await {
            Ok(()) => DeleteResourceResponse::ok(),
            Err(diag) => DeleteResourceResponse::with_error(diag),
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for PrivateLinkAssociationResource {
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
impl ResourceWithImportState for PrivateLinkAssociationResource {
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
            ids::validate::<PrivateLinkAssociationId>,
        );
        response
    }
}
