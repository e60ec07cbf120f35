//! `terraform import` support
//!
//! Import only needs to put the ID in state; the read that follows fills in
//! everything else.

use crate::context::Context;
use crate::resource::{ImportResourceStateRequest, ImportResourceStateResponse, ImportedResource};
use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use std::collections::HashMap;

/// Stores the import ID verbatim at `attr_path`
pub fn import_state_passthrough_id(
    _ctx: &Context,
    attr_path: AttributePath,
    request: &ImportResourceStateRequest,
    response: &mut ImportResourceStateResponse,
) {
    let mut state = DynamicValue::new(Dynamic::Map(HashMap::new()));

    if let Err(e) = state.set_string(&attr_path, request.id.clone()) {
        response.diagnostics.push(
            Diagnostic::error(
                format!("Failed to set import ID: {}", e),
                format!(
                    "Could not set attribute {} to {:?}",
                    attr_path, request.id
                ),
            )
            .with_attribute(attr_path),
        );
        return;
    }

    response.imported_resources.push(ImportedResource {
        type_name: request.type_name.clone(),
        state,
        private: Vec::new(),
        identity: request.identity.clone(),
    });
}

/// Rejects an import ID that the resource's parser does not accept, so a
/// malformed ID never reaches state
pub fn import_state_validated_id<E: std::fmt::Display>(
    ctx: &Context,
    attr_path: AttributePath,
    request: &ImportResourceStateRequest,
    response: &mut ImportResourceStateResponse,
    parse: impl FnOnce(&str) -> Result<(), E>,
) {
    if let Err(e) = parse(&request.id) {
        response.diagnostics.push(Diagnostic::error(
            format!("Invalid import ID for {}", request.type_name),
            format!("{:?} could not be parsed: {}", request.id, e),
        ));
        return;
    }
    import_state_passthrough_id(ctx, attr_path, request, response);
}

/// The error returned when Create finds that the object already exists
pub fn import_as_exists_error(type_name: &str, id: &str) -> Diagnostic {
    Diagnostic::error(
        format!("{} already exists", type_name),
        format!(
            "A resource with the ID {:?} already exists - to be managed via Terraform this \
             resource needs to be imported into the State. Please see the resource \
             documentation for {:?} for more information.",
            id, type_name
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClientCapabilities;

    fn request(id: &str) -> ImportResourceStateRequest {
        ImportResourceStateRequest {
            type_name: "azurerm_resource_group".to_string(),
            id: id.to_string(),
            client_capabilities: ClientCapabilities {
                deferral_allowed: false,
                write_only_attributes_allowed: false,
            },
            identity: None,
        }
    }

    fn empty_response() -> ImportResourceStateResponse {
        ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
            deferred: None,
        }
    }

    #[test]
    fn passthrough_sets_id_attribute() {
        let mut response = empty_response();
        import_state_passthrough_id(
            &Context::new(),
            AttributePath::new("id"),
            &request("/subscriptions/x/resourceGroups/rg"),
            &mut response,
        );

        assert!(response.diagnostics.is_empty());
        assert_eq!(response.imported_resources.len(), 1);
        assert_eq!(
            response.imported_resources[0]
                .state
                .get_string(&AttributePath::new("id"))
                .unwrap(),
            "/subscriptions/x/resourceGroups/rg"
        );
    }

    #[test]
    fn validated_import_rejects_bad_id() {
        let mut response = empty_response();
        import_state_validated_id(
            &Context::new(),
            AttributePath::new("id"),
            &request("not-an-id"),
            &mut response,
            |id| {
                if id.starts_with('/') {
                    Ok(())
                } else {
                    Err("missing leading slash")
                }
            },
        );

        assert!(response.imported_resources.is_empty());
        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].detail.contains("missing leading slash"));
    }

    #[test]
    fn exists_error_points_at_import() {
        let diag = import_as_exists_error("azurerm_resource_group", "/subscriptions/x");
        assert!(diag.detail.contains("needs to be imported into the State"));
        assert!(diag.detail.contains("/subscriptions/x"));
    }
}
