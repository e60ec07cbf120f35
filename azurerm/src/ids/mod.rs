//! Resource ID codecs
//!
//! Every managed object is keyed in state by its canonical ARM path. Parsing
//! accepts any casing of the fixed segments (`resourcegroups`, `PROVIDERS`)
//! and formatting re-emits the canonical casing. Names keep their case.

mod deployment;
mod lock;
mod nested;
mod parser;
mod private_link_association;
mod subscription;

pub use deployment::ResourceGroupDeploymentId;
pub use lock::ScopedLockId;
pub use nested::{NestedResourceId, ProviderSegment};
pub use private_link_association::{parse_management_group_id, PrivateLinkAssociationId};
pub use subscription::{FeatureId, ResourceGroupId, ResourceProviderId, SubscriptionId};

use std::fmt::Display;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdParseError {
    #[error("ID cannot be empty")]
    Empty,

    #[error("ID {id:?} must start with '/'")]
    MissingLeadingSlash { id: String },

    #[error("ID {id:?} contains an empty segment")]
    EmptySegment { id: String },

    #[error("ID {id:?} is missing the {expected:?} segment")]
    MissingSegment { id: String, expected: String },

    #[error("ID {id:?}: expected segment {expected:?}, found {found:?}")]
    UnexpectedSegment {
        id: String,
        expected: String,
        found: String,
    },

    #[error("ID {id:?} has unexpected trailing segments {extra:?}")]
    TrailingSegments { id: String, extra: String },
}

/// A typed ARM resource ID. `Display` produces the canonical form.
pub trait ResourceIdentifier: Sized + Display {
    fn parse(id: &str) -> Result<Self, IdParseError>;

    fn id(&self) -> String {
        self.to_string()
    }
}

/// Parses `id` as `T`, discarding the value. Used to validate import IDs.
pub fn validate<T: ResourceIdentifier>(id: &str) -> Result<(), IdParseError> {
    T::parse(id).map(|_| ())
}
