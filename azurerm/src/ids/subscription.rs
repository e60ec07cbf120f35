use super::parser::Segments;
use super::{IdParseError, ResourceIdentifier};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionId {
    pub subscription_id: String,
}

impl SubscriptionId {
    pub fn new(subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
        }
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/subscriptions/{}", self.subscription_id)
    }
}

impl ResourceIdentifier for SubscriptionId {
    fn parse(id: &str) -> Result<Self, IdParseError> {
        let mut segments = Segments::new(id)?;
        let subscription_id = segments.keyed("subscriptions", "subscriptionId")?;
        segments.finish()?;
        Ok(Self { subscription_id })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceGroupId {
    pub subscription_id: String,
    pub resource_group_name: String,
}

impl ResourceGroupId {
    pub fn new(subscription_id: impl Into<String>, resource_group_name: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group_name: resource_group_name.into(),
        }
    }
}

impl fmt::Display for ResourceGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}",
            self.subscription_id, self.resource_group_name
        )
    }
}

impl ResourceIdentifier for ResourceGroupId {
    fn parse(id: &str) -> Result<Self, IdParseError> {
        let mut segments = Segments::new(id)?;
        let subscription_id = segments.keyed("subscriptions", "subscriptionId")?;
        let resource_group_name = segments.keyed("resourceGroups", "resourceGroupName")?;
        segments.finish()?;
        Ok(Self {
            subscription_id,
            resource_group_name,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceProviderId {
    pub subscription_id: String,
    pub namespace: String,
}

impl ResourceProviderId {
    pub fn new(subscription_id: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            namespace: namespace.into(),
        }
    }
}

impl fmt::Display for ResourceProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/providers/{}",
            self.subscription_id, self.namespace
        )
    }
}

impl ResourceIdentifier for ResourceProviderId {
    fn parse(id: &str) -> Result<Self, IdParseError> {
        let mut segments = Segments::new(id)?;
        let subscription_id = segments.keyed("subscriptions", "subscriptionId")?;
        let namespace = segments.keyed("providers", "providerNamespace")?;
        segments.finish()?;
        Ok(Self {
            subscription_id,
            namespace,
        })
    }
}

/// A preview feature of a resource provider, e.g.
/// `/subscriptions/{s}/providers/Microsoft.Features/providers/Microsoft.Compute/features/EncryptionAtHost`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureId {
    pub subscription_id: String,
    pub provider_namespace: String,
    pub name: String,
}

impl FeatureId {
    pub fn new(
        subscription_id: impl Into<String>,
        provider_namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            provider_namespace: provider_namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/providers/Microsoft.Features/providers/{}/features/{}",
            self.subscription_id, self.provider_namespace, self.name
        )
    }
}

impl ResourceIdentifier for FeatureId {
    fn parse(id: &str) -> Result<Self, IdParseError> {
        let mut segments = Segments::new(id)?;
        let subscription_id = segments.keyed("subscriptions", "subscriptionId")?;
        segments.literal("providers")?;
        segments.literal("Microsoft.Features")?;
        let provider_namespace = segments.keyed("providers", "providerNamespace")?;
        let name = segments.keyed("features", "featureName")?;
        segments.finish()?;
        Ok(Self {
            subscription_id,
            provider_namespace,
            name,
        })
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    const SUB: &str = "12345678-1234-9876-4563-123456789012";

    #[test]
    fn resource_group_round_trip() {
        let id = ResourceGroupId::new(SUB, "acctestRG-1");
        let formatted = id.to_string();
        assert_eq!(
            formatted,
            format!("/subscriptions/{}/resourceGroups/acctestRG-1", SUB)
        );
        assert_eq!(ResourceGroupId::parse(&formatted).unwrap(), id);
    }

    #[test]
    fn resource_group_accepts_mixed_case_and_emits_canonical() {
        let parsed =
            ResourceGroupId::parse(&format!("/SUBSCRIPTIONS/{}/resourcegroups/MyGroup", SUB))
                .unwrap();
        assert_eq!(parsed.resource_group_name, "MyGroup");
        assert_eq!(
            parsed.to_string(),
            format!("/subscriptions/{}/resourceGroups/MyGroup", SUB)
        );
    }

    #[test]
    fn resource_group_rejects_malformed_ids() {
        assert_eq!(ResourceGroupId::parse(""), Err(IdParseError::Empty));
        assert!(matches!(
            ResourceGroupId::parse("subscriptions/x/resourceGroups/y"),
            Err(IdParseError::MissingLeadingSlash { .. })
        ));
        assert!(matches!(
            ResourceGroupId::parse(&format!("/subscriptions/{}", SUB)),
            Err(IdParseError::MissingSegment { .. })
        ));
        assert!(matches!(
            ResourceGroupId::parse(&format!("/subscriptions/{}/resourceGroups/", SUB)),
            Err(IdParseError::EmptySegment { .. })
        ));
        assert!(matches!(
            ResourceGroupId::parse(&format!(
                "/subscriptions/{}/resourceGroups/rg/providers/Microsoft.Web",
                SUB
            )),
            Err(IdParseError::TrailingSegments { .. })
        ));
        assert!(matches!(
            ResourceGroupId::parse(&format!("/subscriptions/{}/groups/rg", SUB)),
            Err(IdParseError::UnexpectedSegment { .. })
        ));
    }

    #[test]
    fn provider_and_subscription_round_trip() {
        let provider = ResourceProviderId::new(SUB, "Microsoft.PolicyInsights");
        assert_eq!(ResourceProviderId::parse(&provider.id()).unwrap(), provider);

        let parsed = ResourceProviderId::parse(&format!("/subscriptions/{}/PROVIDERS/Microsoft.Web", SUB))
            .unwrap();
        assert_eq!(parsed.to_string(), format!("/subscriptions/{}/providers/Microsoft.Web", SUB));

        let sub = SubscriptionId::new(SUB);
        assert_eq!(SubscriptionId::parse(&sub.id()).unwrap(), sub);
    }

    #[test]
    fn feature_round_trip_and_case() {
        let feature = FeatureId::new(SUB, "Microsoft.Compute", "EncryptionAtHost");
        assert_eq!(FeatureId::parse(&feature.id()).unwrap(), feature);

        let mixed = format!(
            "/subscriptions/{}/providers/microsoft.features/Providers/Microsoft.Compute/FEATURES/EncryptionAtHost",
            SUB
        );
        assert_eq!(FeatureId::parse(&mixed).unwrap().to_string(), feature.to_string());
    }

    #[test]
    fn feature_requires_features_namespace() {
        let wrong = format!(
            "/subscriptions/{}/providers/Microsoft.Web/providers/Microsoft.Compute/features/x",
            SUB
        );
        assert!(matches!(
            FeatureId::parse(&wrong),
            Err(IdParseError::UnexpectedSegment { .. })
        ));
    }
}
