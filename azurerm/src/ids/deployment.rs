use super::parser::Segments;
use super::{IdParseError, ResourceGroupId, ResourceIdentifier};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceGroupDeploymentId {
    pub subscription_id: String,
    pub resource_group_name: String,
    pub deployment_name: String,
}

impl ResourceGroupDeploymentId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group_name: impl Into<String>,
        deployment_name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group_name: resource_group_name.into(),
            deployment_name: deployment_name.into(),
        }
    }

    pub fn resource_group_id(&self) -> ResourceGroupId {
        ResourceGroupId::new(&self.subscription_id, &self.resource_group_name)
    }
}

impl fmt::Display for ResourceGroupDeploymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Resources/deployments/{}",
            self.subscription_id, self.resource_group_name, self.deployment_name
        )
    }
}

impl ResourceIdentifier for ResourceGroupDeploymentId {
    fn parse(id: &str) -> Result<Self, IdParseError> {
        let mut segments = Segments::new(id)?;
        let subscription_id = segments.keyed("subscriptions", "subscriptionId")?;
        let resource_group_name = segments.keyed("resourceGroups", "resourceGroupName")?;
        segments.literal("providers")?;
        segments.literal("Microsoft.Resources")?;
        let deployment_name = segments.keyed("deployments", "deploymentName")?;
        segments.finish()?;
        Ok(Self {
            subscription_id,
            resource_group_name,
            deployment_name,
        })
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let id = ResourceGroupDeploymentId::new("sub", "rg", "deploy1");
        assert_eq!(ResourceGroupDeploymentId::parse(&id.id()).unwrap(), id);
        assert_eq!(id.resource_group_id().to_string(), "/subscriptions/sub/resourceGroups/rg");
    }

    #[test]
    fn mixed_case_is_canonicalised() {
        let parsed = ResourceGroupDeploymentId::parse(
            "/subscriptions/sub/resourcegroups/RG/providers/microsoft.resources/Deployments/Deploy1",
        )
        .unwrap();
        assert_eq!(
            parsed.to_string(),
            "/subscriptions/sub/resourceGroups/RG/providers/Microsoft.Resources/deployments/Deploy1"
        );
    }

    #[test]
    fn rejects_other_providers() {
        assert!(ResourceGroupDeploymentId::parse(
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Web/deployments/x"
        )
        .is_err());
    }
}
