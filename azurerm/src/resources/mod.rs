//! Resource implementations
//!
//! Every resource keys its state by the canonical ARM ID in `id`. The helpers
//! here cover what they all share: picking up the provider data, per-operation
//! timeouts, and turning API failures into diagnostics that name the resource
//! type, the ID and the operation.

pub mod feature_registration;
pub mod management_lock;
pub mod private_link_association;
pub mod resource_group;
pub mod resource_provider_registration;
pub mod template_deployment;

pub use feature_registration::FeatureRegistrationResource;
pub use management_lock::ManagementLockResource;
pub use private_link_association::PrivateLinkAssociationResource;
pub use resource_group::ResourceGroupResource;
pub use resource_provider_registration::ResourceProviderRegistrationResource;
pub use template_deployment::TemplateDeploymentResource;

use crate::api::{normalize_location, Tags};
use crate::provider_data::AzureRmProviderData;
use std::any::Any;
use std::fmt::Display;
use std::sync::Arc;
use tfplug::plan_modifier::{SuppressDiff, UseStateForUnknown};
use tfplug::schema::{Attribute, AttributeBuilder, AttributeType};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::Timeouts;

/// Downcasts the provider data handed to `configure`. `None` is fine: the
/// host configures instances before the provider itself is configured.
pub(crate) fn provider_data_from(
    provider_data: Option<Arc<dyn Any + Send + Sync>>,
) -> Result<Option<AzureRmProviderData>, Diagnostic> {
    match provider_data {
        None => Ok(None),
        Some(data) => data
            .downcast_ref::<AzureRmProviderData>()
            .cloned()
            .map(Some)
            .ok_or_else(|| {
                Diagnostic::error(
                    "Unexpected provider data type",
                    "Expected AzureRmProviderData from the azurerm provider",
                )
            }),
    }
}

pub(crate) fn require_configured(
    provider_data: &Option<AzureRmProviderData>,
) -> Result<&AzureRmProviderData, Diagnostic> {
    provider_data.as_ref().ok_or_else(|| {
        Diagnostic::error(
            "Provider not configured",
            "Provider data was not properly configured",
        )
    })
}

/// Diagnostic for a failed remote call, e.g. summary
/// `Failed deleting azurerm_resource_group` with detail
/// `deleting /subscriptions/.../resourceGroups/rg: <cause>`
pub(crate) fn api_failure(
    operation: &str,
    type_name: &str,
    id: &impl Display,
    error: &impl Display,
) -> Diagnostic {
    Diagnostic::error(
        format!("Failed {} {}", operation, type_name),
        format!("{} {}: {}", operation, id, error),
    )
}

pub(crate) fn resolve_timeouts(
    defaults: Timeouts,
    value: &DynamicValue,
) -> Result<Timeouts, Diagnostic> {
    defaults.resolve(value).map_err(|e| {
        Diagnostic::error("Invalid timeouts", e.to_string())
            .with_attribute(AttributePath::new(tfplug::timeouts::TIMEOUTS_ATTRIBUTE))
    })
}

pub(crate) fn required_string(value: &DynamicValue, name: &str) -> Result<String, Diagnostic> {
    value.get_string(&AttributePath::new(name)).map_err(|e| {
        Diagnostic::error(format!("Missing value for {}", name), e.to_string())
            .with_attribute(AttributePath::new(name))
    })
}

pub(crate) fn tags_from(value: &DynamicValue) -> Result<Tags, Diagnostic> {
    value.get_string_map(&AttributePath::new("tags")).map_err(|e| {
        Diagnostic::error("Invalid tags", e.to_string()).with_attribute(AttributePath::new("tags"))
    })
}

pub(crate) fn set_tags(state: &mut DynamicValue, tags: Option<&Tags>) {
    let empty = Tags::new();
    let _ = state.set_string_map(&AttributePath::new("tags"), tags.unwrap_or(&empty));
}

pub(crate) fn id_attribute() -> Attribute {
    AttributeBuilder::new("id", AttributeType::String)
        .description("The canonical Azure Resource Manager ID")
        .computed()
        .plan_modifier(Box::new(UseStateForUnknown))
        .build()
}

fn same_location(old: &str, new: &str) -> bool {
    normalize_location(old) == normalize_location(new)
}

/// `West Europe` and `westeurope` name the same region
pub(crate) fn location_attribute() -> Attribute {
    AttributeBuilder::new("location", AttributeType::String)
        .description("The Azure region, e.g. westeurope")
        .required()
        .plan_modifier(Box::new(SuppressDiff::new(
            same_location,
            "location is compared after normalisation",
        )))
        .force_new()
        .build()
}

pub(crate) fn tags_attribute() -> Attribute {
    AttributeBuilder::new("tags", AttributeType::Map(Box::new(AttributeType::String)))
        .description("Tags to assign")
        .optional()
        .build()
}
