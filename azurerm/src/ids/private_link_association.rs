use super::parser::Segments;
use super::{IdParseError, ResourceIdentifier};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateLinkAssociationId {
    pub management_group_id: String,
    pub name: String,
}

impl PrivateLinkAssociationId {
    pub fn new(management_group_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            management_group_id: management_group_id.into(),
            name: name.into(),
        }
    }

    /// `/providers/Microsoft.Management/managementGroups/{mg}`
    pub fn management_group_scope(&self) -> String {
        format!(
            "/providers/Microsoft.Management/managementGroups/{}",
            self.management_group_id
        )
    }
}

impl fmt::Display for PrivateLinkAssociationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/providers/Microsoft.Authorization/privateLinkAssociations/{}",
            self.management_group_scope(),
            self.name
        )
    }
}

impl ResourceIdentifier for PrivateLinkAssociationId {
    fn parse(id: &str) -> Result<Self, IdParseError> {
        let mut segments = Segments::new(id)?;
        segments.literal("providers")?;
        segments.literal("Microsoft.Management")?;
        let management_group_id = segments.keyed("managementGroups", "managementGroupId")?;
        segments.literal("providers")?;
        segments.literal("Microsoft.Authorization")?;
        let name = segments.keyed("privateLinkAssociations", "privateLinkAssociationName")?;
        segments.finish()?;
        Ok(Self {
            management_group_id,
            name,
        })
    }
}

/// Parses a management group ID into its name
pub fn parse_management_group_id(id: &str) -> Result<String, IdParseError> {
    let mut segments = Segments::new(id)?;
    segments.literal("providers")?;
    segments.literal("Microsoft.Management")?;
    let name = segments.keyed("managementGroups", "managementGroupId")?;
    segments.finish()?;
    Ok(name)
}
