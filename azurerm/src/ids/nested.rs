use super::parser::Segments;
use super::{IdParseError, ResourceIdentifier};
use std::fmt;

/// `providers/{namespace}/{type}/{name}[/{childType}/{childName}...]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSegment {
    pub namespace: String,
    /// `(type, name)` pairs, outermost first
    pub resources: Vec<(String, String)>,
}

/// Any resource below a subscription, as found in a deployment's output
/// resources. Extension resources carry one provider segment per level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedResourceId {
    pub subscription_id: String,
    pub resource_group_name: Option<String>,
    pub providers: Vec<ProviderSegment>,
}

impl NestedResourceId {
    fn innermost(&self) -> Option<&ProviderSegment> {
        self.providers.last()
    }

    /// Namespace that owns the resource, e.g. `Microsoft.Storage`
    pub fn namespace(&self) -> &str {
        self.innermost().map_or("", |p| p.namespace.as_str())
    }

    /// Full type path, e.g. `storageAccounts/blobServices`
    pub fn resource_type(&self) -> String {
        self.innermost()
            .map(|p| {
                p.resources
                    .iter()
                    .map(|(t, _)| t.as_str())
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        self.innermost()
            .and_then(|p| p.resources.last())
            .map_or("", |(_, n)| n.as_str())
    }
}

impl fmt::Display for NestedResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/subscriptions/{}", self.subscription_id)?;
        if let Some(rg) = &self.resource_group_name {
            write!(f, "/resourceGroups/{}", rg)?;
        }
        for provider in &self.providers {
            write!(f, "/providers/{}", provider.namespace)?;
            for (resource_type, name) in &provider.resources {
                write!(f, "/{}/{}", resource_type, name)?;
            }
        }
        Ok(())
    }
}

impl ResourceIdentifier for NestedResourceId {
    fn parse(id: &str) -> Result<Self, IdParseError> {
        let mut segments = Segments::new(id)?;
        let subscription_id = segments.keyed("subscriptions", "subscriptionId")?;
        let resource_group_name = if segments.peek_is("resourceGroups") {
            Some(segments.keyed("resourceGroups", "resourceGroupName")?)
        } else {
            None
        };

        let mut providers = Vec::new();
        while !segments.is_done() {
            let namespace = segments.keyed("providers", "providerNamespace")?;
            let mut resources = Vec::new();
            while !segments.is_done() && !segments.peek_is("providers") {
                let resource_type = segments.value("resourceType")?;
                let name = segments.value("resourceName")?;
                resources.push((resource_type, name));
            }
            if resources.is_empty() {
                return Err(IdParseError::MissingSegment {
                    id: id.to_string(),
                    expected: "resourceType".to_string(),
                });
            }
            providers.push(ProviderSegment {
                namespace,
                resources,
            });
        }

        if providers.is_empty() {
            return Err(IdParseError::MissingSegment {
                id: id.to_string(),
                expected: "providers".to_string(),
            });
        }
        segments.finish()?;

        Ok(Self {
            subscription_id,
            resource_group_name,
            providers,
        })
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn parses_child_resources() {
        let id = NestedResourceId::parse(
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Storage/storageAccounts/sa/blobServices/default",
        )
        .unwrap();
        assert_eq!(id.namespace(), "Microsoft.Storage");
        assert_eq!(id.resource_type(), "storageAccounts/blobServices");
        assert_eq!(id.name(), "default");
        assert_eq!(id.resource_group_name.as_deref(), Some("rg"));
    }

    #[test]
    fn extension_resources_use_innermost_provider() {
        let raw = "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Storage/storageAccounts/sa/providers/Microsoft.Authorization/roleAssignments/ra1";
        let id = NestedResourceId::parse(raw).unwrap();
        assert_eq!(id.namespace(), "Microsoft.Authorization");
        assert_eq!(id.resource_type(), "roleAssignments");
        assert_eq!(id.to_string(), raw);
    }

    #[test]
    fn subscription_level_resources_have_no_group() {
        let id = NestedResourceId::parse(
            "/subscriptions/sub/providers/Microsoft.Insights/actionGroups/ag",
        )
        .unwrap();
        assert!(id.resource_group_name.is_none());
        assert_eq!(id.resource_type(), "actionGroups");
    }

    #[test]
    fn canonicalises_fixed_segments() {
        let id = NestedResourceId::parse(
            "/SUBSCRIPTIONS/sub/resourcegroups/RG/Providers/Microsoft.Web/sites/app",
        )
        .unwrap();
        assert_eq!(
            id.to_string(),
            "/subscriptions/sub/resourceGroups/RG/providers/Microsoft.Web/sites/app"
        );
    }

    #[test]
    fn rejects_dangling_type_or_provider() {
        assert!(NestedResourceId::parse("/subscriptions/sub/resourceGroups/rg").is_err());
        assert!(NestedResourceId::parse(
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Web/sites"
        )
        .is_err());
        assert!(NestedResourceId::parse("/subscriptions/sub/providers/Microsoft.Web").is_err());
    }
}
