use super::parser::Segments;
use super::{IdParseError, ResourceIdentifier};
use std::fmt;

const LOCKS_SEGMENT: &str = "/providers/Microsoft.Authorization/locks/";

/// A management lock at any scope: subscription, resource group or resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedLockId {
    pub scope: String,
    pub name: String,
}

impl ScopedLockId {
    pub fn new(scope: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ScopedLockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.scope, LOCKS_SEGMENT, self.name)
    }
}

impl ResourceIdentifier for ScopedLockId {
    fn parse(id: &str) -> Result<Self, IdParseError> {
        // Validates the overall shape before splitting off the scope
        Segments::new(id)?;

        let lowered = id.to_ascii_lowercase();
        let needle = LOCKS_SEGMENT.to_ascii_lowercase();
        let Some(start) = lowered.rfind(&needle) else {
            return Err(IdParseError::MissingSegment {
                id: id.to_string(),
                expected: LOCKS_SEGMENT.trim_matches('/').to_string(),
            });
        };

        let scope = &id[..start];
        let name = &id[start + needle.len()..];
        if scope.is_empty() {
            return Err(IdParseError::MissingSegment {
                id: id.to_string(),
                expected: "scope".to_string(),
            });
        }
        if name.contains('/') {
            return Err(IdParseError::TrailingSegments {
                id: id.to_string(),
                extra: name.to_string(),
            });
        }

        Ok(Self {
            scope: scope.to_string(),
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_at_each_scope() {
        for scope in [
            "/subscriptions/sub",
            "/subscriptions/sub/resourceGroups/rg",
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Storage/storageAccounts/sa",
        ] {
            let id = ScopedLockId::new(scope, "lock1");
            assert_eq!(ScopedLockId::parse(&id.id()).unwrap(), id);
        }
    }

    #[test]
    fn lock_segment_is_case_insensitive() {
        let parsed = ScopedLockId::parse(
            "/subscriptions/sub/resourceGroups/rg/PROVIDERS/microsoft.authorization/Locks/keep",
        )
        .unwrap();
        assert_eq!(parsed.scope, "/subscriptions/sub/resourceGroups/rg");
        assert_eq!(parsed.name, "keep");
        assert_eq!(
            parsed.to_string(),
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Authorization/locks/keep"
        );
    }

    #[test]
    fn rejects_missing_scope_or_name() {
        assert!(ScopedLockId::parse("/providers/Microsoft.Authorization/locks/x").is_err());
        assert!(ScopedLockId::parse("/subscriptions/sub/resourceGroups/rg").is_err());
        assert!(ScopedLockId::parse("/subscriptions/sub/providers/Microsoft.Authorization/locks/").is_err());
    }
}
