//! Preview feature registration resource

use super::{
    api_failure, id_attribute, provider_data_from, require_configured, required_string,
    resolve_timeouts,
};
use crate::ids::{self, FeatureId, ResourceIdentifier};
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
use tfplug::validator::StringLengthValidator;
use tfplug::Timeouts;

const TYPE_NAME: &str = "azurerm_resource_provider_feature_registration";
const TIMEOUTS: Timeouts = Timeouts::minutes(120, 5, 120, 120);

#[derive(Default)]
pub struct FeatureRegistrationResource {
    provider_data: Option<AzureRmProviderData>,
}

impl FeatureRegistrationResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_definition() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages the registration of a Resource Provider preview feature")
            .attribute(id_attribute())
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the feature, e.g. EncryptionAtHost")
                    .required()
                    .validator(StringLengthValidator::between(1, 256))
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("provider_name", AttributeType::String)
                    .description("The namespace of the Resource Provider the feature belongs to")
                    .required()
                    .validator(StringLengthValidator::between(1, 256))
                    .force_new()
                    .build(),
            )
            .attribute(Timeouts::attribute())
            .build()
    }

    fn id_from_state(&self, state: &DynamicValue) -> Result<FeatureId, Diagnostic> {
        let raw = required_string(state, "id")?;
        FeatureId::parse(&raw)
            .map_err(|e| Diagnostic::error(format!("Invalid {} ID", TYPE_NAME), e.to_string()))
    }

    async fn register_feature(
        &self,
        ctx: Context,
        request: &CreateResourceRequest,
    ) -> Result<DynamicValue, Diagnostic> {
        let data = require_configured(&self.provider_data)?;
        let ctx = ctx.with_default_timeout(resolve_timeouts(TIMEOUTS, &request.config)?.create);
        let id = FeatureId::new(
            &data.subscription_id,
            required_string(&request.planned_state, "provider_name")?,
            required_string(&request.planned_state, "name")?,
        );

        let feature = match data.client.features().get(&ctx, &id).await {
            Ok(feature) => feature,
            Err(e) if e.is_not_found() => {
                return Err(Diagnostic::error(
                    format!("Failed registering {}", TYPE_NAME),
                    format!(
                        "feature {:?} was not found for Resource Provider {:?}",
                        id.name, id.provider_namespace
                    ),
                ))
            }
            Err(e) => return Err(api_failure("retrieving", TYPE_NAME, &id, &e)),
        };

        if RegistrationState::parse(feature.state()) == RegistrationState::Registered {
            return Err(import_as_exists_error(TYPE_NAME, &id.id()));
        }

        registration::register(&data.client, &ctx, &RegistrationTarget::Feature(id.clone()))
            .await
            .map_err(|e| api_failure("registering", TYPE_NAME, &id, &e))?;

        let mut state = request.planned_state.clone();
        let _ = state.set_string(&AttributePath::new("id"), id.id());
        Ok(state)
    }

    async fn read_feature(
        &self,
        ctx: Context,
        request: &ReadResourceRequest,
    ) -> Result<Option<DynamicValue>, Diagnostic> {
        let data = require_configured(&self.provider_data)?;
        let ctx =
            ctx.with_default_timeout(resolve_timeouts(TIMEOUTS, &request.current_state)?.read);
        let id = self.id_from_state(&request.current_state)?;

        let feature = match data.client.features().get(&ctx, &id).await {
            Ok(feature) => feature,
            Err(e) if e.is_not_found() => {
                tracing::warn!("Feature {} was not found - removing from state", id);
                return Ok(None);
            }
            Err(e) => return Err(api_failure("reading", TYPE_NAME, &id, &e)),
        };

        let state = RegistrationState::parse(feature.state());
        if state != RegistrationState::Registered {
            tracing::warn!("Feature {} is {} - removing from state", id.name, state);
            return Ok(None);
        }

        let mut new_state = request.current_state.clone();
        let _ = new_state.set_string(&AttributePath::new("id"), id.id());
        let _ = new_state.set_string(&AttributePath::new("name"), id.name.clone());
        let _ = new_state.set_string(
            &AttributePath::new("provider_name"),
            id.provider_namespace.clone(),
        );
        Ok(Some(new_state))
    }

    async fn unregister_feature(
        &self,
        ctx: Context,
        request: &DeleteResourceRequest,
    ) -> Result<(), Diagnostic> {
        let data = require_configured(&self.provider_data)?;
        let ctx =
            ctx.with_default_timeout(resolve_timeouts(TIMEOUTS, &request.prior_state)?.delete);
        let id = self.id_from_state(&request.prior_state)?;

        match registration::unregister(&data.client, &ctx, &RegistrationTarget::Feature(id.clone()))
            .await
        {
            Ok(_) => Ok(()),
            Err(RegistrationError::Api { source, .. }) if source.is_not_found() => Ok(()),
            Err(e) => Err(api_failure("unregistering", TYPE_NAME, &id, &e)),
        }
    }
}

#[async_trait]
impl Resource for FeatureRegistrationResource {
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
        match self.register_feature(ctx, &request).await {
            Ok(state) => CreateResourceResponse::new(state),
            Err(diag) => CreateResourceResponse::with_error(request.planned_state, diag),
        }
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        match self.read_feature(ctx, &request).await {
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
        match self.unregister_feature(ctx, &request).await {
            Ok(()) => DeleteResourceResponse::ok(),
            Err(diag) => DeleteResourceResponse::with_error(diag),
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for FeatureRegistrationResource {
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
impl ResourceWithImportState for FeatureRegistrationResource {
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
            ids::validate::<FeatureId>,
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
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn feature_path() -> String {
        format!(
            "/subscriptions/{}/providers/Microsoft.Features/providers/Microsoft.Compute/features/EncryptionAtHost",
            TEST_SUBSCRIPTION
        )
    }

    fn feature_body(state: &str) -> Vec<u8> {
        format!(
            r#"{{"id":"{}","name":"Microsoft.Compute/EncryptionAtHost","properties":{{"state":"{}"}}}}"#,
            feature_path(),
            state
        )
        .into_bytes()
    }

    fn create_request() -> CreateResourceRequest {
        let mut planned = DynamicValue::null();
        planned
            .set_string(&AttributePath::new("name"), "EncryptionAtHost".to_string())
            .unwrap();
        planned
            .set_string(
                &AttributePath::new("provider_name"),
                "Microsoft.Compute".to_string(),
            )
            .unwrap();
        CreateResourceRequest {
            type_name: TYPE_NAME.to_string(),
            planned_state: planned.clone(),
            config: planned,
            planned_private: vec![],
            provider_meta: None,
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn pending_approval_fails_without_waiting_for_timeout() {
        let mut server = Server::new_async().await;
        let polls = Arc::new(AtomicUsize::new(0));
        let counter = polls.clone();
        server
            .mock("GET", feature_path().as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body_from_request(move |_| {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    feature_body("NotRegistered")
                } else {
                    feature_body("Pending")
                }
            })
            .create_async()
            .await;
        server
            .mock("POST", format!("{}/register", feature_path()).as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(feature_body("Pending"))
            .create_async()
            .await;

        let resource = FeatureRegistrationResource {
            provider_data: Some(create_test_provider_data(&server.url(), Features::default())),
        };
        let response = resource.create(Context::new(), create_request()).await;

        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0]
            .detail
            .contains("pending manual approval"));
        assert_eq!(polls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn delete_of_missing_feature_succeeds() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", format!("{}/unregister", feature_path()).as_str())
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"error":{"code":"FeatureNotFound","message":"gone"}}"#)
            .create_async()
            .await;

        let mut prior = DynamicValue::null();
        prior
            .set_string(&AttributePath::new("id"), feature_path())
            .unwrap();
        let resource = FeatureRegistrationResource {
            provider_data: Some(create_test_provider_data(&server.url(), Features::default())),
        };
        let response = resource
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: TYPE_NAME.to_string(),
                    prior_state: prior,
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    }
}
