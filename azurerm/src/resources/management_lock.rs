//! Management lock resource

use super::{
    api_failure, id_attribute, provider_data_from, require_configured, required_string,
    resolve_timeouts,
};
use crate::api::locks::{LockProperties, ManagementLock};
use crate::ids::{self, ResourceIdentifier, ScopedLockId};
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
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::{OneOfValidator, StringLengthValidator, StringPatternValidator};
use tfplug::Timeouts;

const TYPE_NAME: &str = "azurerm_management_lock";
const TIMEOUTS: Timeouts = Timeouts::minutes(30, 5, 30, 30);

pub const LOCK_LEVEL_CAN_NOT_DELETE: &str = "CanNotDelete";
pub const LOCK_LEVEL_READ_ONLY: &str = "ReadOnly";

#[derive(Default)]
pub struct ManagementLockResource {
    provider_data: Option<AzureRmProviderData>,
}

impl ManagementLockResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_definition() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a Management Lock scoped to a Subscription, Resource Group or Resource")
            .attribute(id_attribute())
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the Management Lock")
                    .required()
                    .validator(StringLengthValidator::between(1, 260))
                    .validator(StringPatternValidator::create(
                        r"^[^<>*%&:\\?+/]*[^<>*%&:\\?+/.\s]$",
                        "no <, >, *, %, &, :, \\, ?, + or / and not ending in a period or space",
                    ))
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("scope", AttributeType::String)
                    .description("The ID of the Subscription, Resource Group or Resource to lock")
                    .required()
                    .validator(StringPatternValidator::create(
                        r"^/.+",
                        "an Azure Resource Manager ID",
                    ))
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("lock_level", AttributeType::String)
                    .description("CanNotDelete or ReadOnly")
                    .required()
                    .validator(OneOfValidator::create(&[
                        LOCK_LEVEL_CAN_NOT_DELETE,
                        LOCK_LEVEL_READ_ONLY,
                    ]))
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("notes", AttributeType::String)
                    .description("Notes about the lock")
                    .optional()
                    .validator(StringLengthValidator::at_most(512))
                    .force_new()
                    .build(),
            )
            .attribute(Timeouts::attribute())
            .build()
    }

    fn id_from_state(&self, state: &DynamicValue) -> Result<ScopedLockId, Diagnostic> {
        let raw = required_string(state, "id")?;
        ScopedLockId::parse(&raw)
            .map_err(|e| Diagnostic::error(format!("Invalid {} ID", TYPE_NAME), e.to_string()))
    }

    async fn create_lock(
        &self,
        ctx: Context,
        request: &CreateResourceRequest,
    ) -> Result<DynamicValue, Diagnostic> {
        let data = require_configured(&self.provider_data)?;
        let ctx = ctx.with_default_timeout(resolve_timeouts(TIMEOUTS, &request.config)?.create);
        let planned = &request.planned_state;

        let scope = required_string(planned, "scope")?;
        let id = ScopedLockId::new(
            scope.trim_end_matches('/'),
            required_string(planned, "name")?,
        );
        let locks = data.client.locks();

        match locks.get(&ctx, &id).await {
            Ok(_) => return Err(import_as_exists_error(TYPE_NAME, &id.id())),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(api_failure("checking for existing", TYPE_NAME, &id, &e)),
        }

        let lock = ManagementLock {
            id: String::new(),
            name: String::new(),
            properties: LockProperties {
                level: required_string(planned, "lock_level")?,
                notes: planned
                    .get_string_opt(&AttributePath::new("notes"))
                    .filter(|n| !n.is_empty()),
            },
        };

        tracing::info!("Creating {} lock {}", lock.properties.level, id);
        let created = locks
            .create_or_update(&ctx, &id, &lock)
            .await
            .map_err(|e| api_failure("creating", TYPE_NAME, &id, &e))?;

        let mut state = planned.clone();
        apply_remote(&mut state, &id, &created);
        Ok(state)
    }

    async fn read_lock(
        &self,
        ctx: Context,
        request: &ReadResourceRequest,
    ) -> Result<Option<DynamicValue>, Diagnostic> {
        let data = require_configured(&self.provider_data)?;
        let ctx =
            ctx.with_default_timeout(resolve_timeouts(TIMEOUTS, &request.current_state)?.read);
        let id = self.id_from_state(&request.current_state)?;

        match data.client.locks().get(&ctx, &id).await {
            Ok(lock) => {
                let mut state = request.current_state.clone();
                apply_remote(&mut state, &id, &lock);
                Ok(Some(state))
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!("Management lock {} was not found - removing from state", id);
                Ok(None)
            }
            Err(e) => Err(api_failure("reading", TYPE_NAME, &id, &e)),
        }
    }

    async fn delete_lock(
        &self,
        ctx: Context,
        request: &DeleteResourceRequest,
    ) -> Result<(), Diagnostic> {
        let data = require_configured(&self.provider_data)?;
        let ctx =
            ctx.with_default_timeout(resolve_timeouts(TIMEOUTS, &request.prior_state)?.delete);
        let id = self.id_from_state(&request.prior_state)?;

        match data.client.locks().delete(&ctx, &id).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(api_failure("deleting", TYPE_NAME, &id, &e)),
        }
    }
}

fn apply_remote(state: &mut DynamicValue, id: &ScopedLockId, lock: &ManagementLock) {
    let _ = state.set_string(&AttributePath::new("id"), id.id());
    let _ = state.set_string(&AttributePath::new("name"), id.name.clone());
    let _ = state.set_string(&AttributePath::new("scope"), id.scope.clone());
    let _ = state.set_string(
        &AttributePath::new("lock_level"),
        lock.properties.level.clone(),
    );
    let notes = match &lock.properties.notes {
        Some(notes) if !notes.is_empty() => Dynamic::String(notes.clone()),
        _ => Dynamic::Null,
    };
    let _ = state.set_dynamic(&AttributePath::new("notes"), notes);
}

#[async_trait]
impl Resource for ManagementLockResource {
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
        match self.create_lock(ctx, &request).await {
            Ok(state) => CreateResourceResponse::new(state),
            Err(diag) => CreateResourceResponse::with_error(request.planned_state, diag),
        }
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        match self.read_lock(ctx, &request).await {
            Ok(Some(state)) => ReadResourceResponse::found(state, request.private),
            Ok(None) => ReadResourceResponse::gone(request.private),
            Err(diag) => {
                ReadResourceResponse::with_error(request.current_state, request.private, diag)
            }
        }
    }

    /// Every attribute forces replacement
    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        UpdateResourceResponse::new(request.planned_state)
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        match self.delete_lock(ctx, &request).await {
            Ok(()) => DeleteResourceResponse::ok(),
            Err(diag) => DeleteResourceResponse::with_error(diag),
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for ManagementLockResource {
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
impl ResourceWithImportState for ManagementLockResource {
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
            ids::validate::<ScopedLockId>,
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

    fn config(pairs: &[(&str, &str)]) -> DynamicValue {
        let mut value = DynamicValue::null();
        for (k, v) in pairs {
            value
                .set_string(&AttributePath::new(k), v.to_string())
                .unwrap();
        }
        value
    }

    #[test]
    fn lock_level_and_notes_are_validated() {
        let schema = ManagementLockResource::schema_definition();
        let base = [
            ("name", "lock"),
            ("scope", "/subscriptions/s/resourceGroups/rg"),
        ];

        let valid = config(&[base[0], base[1], ("lock_level", "ReadOnly")]);
        assert!(tfplug::plan::validate_config(&schema, &valid).is_empty());

        let bad_level = config(&[base[0], base[1], ("lock_level", "NoTouching")]);
        assert_eq!(tfplug::plan::validate_config(&schema, &bad_level).len(), 1);

        let long_notes = "n".repeat(513);
        let bad_notes = config(&[
            base[0],
            base[1],
            ("lock_level", "CanNotDelete"),
            ("notes", long_notes.as_str()),
        ]);
        assert_eq!(tfplug::plan::validate_config(&schema, &bad_notes).len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn create_puts_lock_at_scope() {
        let mut server = Server::new_async().await;
        let lock_path = format!(
            "/subscriptions/{}/resourceGroups/rg/providers/Microsoft.Authorization/locks/lock",
            TEST_SUBSCRIPTION
        );
        server
            .mock("GET", lock_path.as_str())
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"error":{"code":"LockNotFound","message":"no lock"}}"#)
            .create_async()
            .await;
        let put = server
            .mock("PUT", lock_path.as_str())
            .match_query(Matcher::UrlEncoded("api-version".into(), "2020-05-01".into()))
            .match_body(Matcher::PartialJsonString(
                r#"{"properties":{"level":"CanNotDelete","notes":"keep"}}"#.into(),
            ))
            .with_status(200)
            .with_body(r#"{"id":"x","name":"lock","properties":{"level":"CanNotDelete","notes":"keep"}}"#)
            .create_async()
            .await;

        let scope = format!("/subscriptions/{}/resourceGroups/rg", TEST_SUBSCRIPTION);
        let planned = config(&[
            ("name", "lock"),
            ("scope", scope.as_str()),
            ("lock_level", "CanNotDelete"),
            ("notes", "keep"),
        ]);
        let resource = ManagementLockResource {
            provider_data: Some(create_test_provider_data(&server.url(), Features::default())),
        };
        let response = resource
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

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(
            response
                .new_state
                .get_string(&AttributePath::new("id"))
                .unwrap(),
            lock_path
        );
        put.assert_async().await;
    }
}
