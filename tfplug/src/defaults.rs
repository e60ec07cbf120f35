//! Planned values for optional attributes left out of configuration
//!
//! ```no_run
//! use tfplug::schema::{AttributeBuilder, AttributeType};
//! use tfplug::defaults::StaticDefault;
//!
//! let mode = AttributeBuilder::new("deployment_mode", AttributeType::String)
//!     .optional_computed()
//!     .default(StaticDefault::string("Incremental"))
//!     .build();
//! ```

use crate::schema::{Default, DefaultRequest, DefaultResponse};
use crate::types::{Dynamic, DynamicValue};
use std::collections::HashMap;
use uuid::Uuid;

/// The same value every plan
pub struct StaticDefault {
    value: Dynamic,
}

impl StaticDefault {
    pub fn create(value: Dynamic) -> Box<dyn Default> {
        Box::new(Self { value })
    }

    pub fn string(value: &str) -> Box<dyn Default> {
        Self::create(Dynamic::String(value.to_string()))
    }

    pub fn bool(value: bool) -> Box<dyn Default> {
        Self::create(Dynamic::Bool(value))
    }

    /// An empty map, for attributes like `tags` that are never null in state
    pub fn empty_map() -> Box<dyn Default> {
        Self::create(Dynamic::Map(HashMap::new()))
    }
}

impl Default for StaticDefault {
    fn description(&self) -> String {
        format!("defaults to {:?}", self.value)
    }

    fn default_value(&self, _request: DefaultRequest) -> DefaultResponse {
        DefaultResponse {
            value: DynamicValue::new(self.value.clone()),
        }
    }
}

/// Generates a random v4 UUID, e.g. for resource names that may be omitted
pub struct UuidDefault;

impl UuidDefault {
    pub fn create() -> Box<dyn Default> {
        Box::new(Self)
    }
}

impl Default for UuidDefault {
    fn description(&self) -> String {
        "defaults to a random UUID".to_string()
    }

    fn default_value(&self, _request: DefaultRequest) -> DefaultResponse {
        DefaultResponse {
            value: DynamicValue::new(Dynamic::String(Uuid::new_v4().hyphenated().to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttributePath;

    fn request() -> DefaultRequest {
        DefaultRequest {
            path: AttributePath::new("test"),
        }
    }

    #[test]
    fn static_default_string() {
        let default = StaticDefault::string("Incremental");
        let response = default.default_value(request());
        assert_eq!(
            response.value.value,
            Dynamic::String("Incremental".to_string())
        );
        assert!(default.description().contains("Incremental"));
    }

    #[test]
    fn static_default_empty_map() {
        let response = StaticDefault::empty_map().default_value(request());
        assert_eq!(response.value.value, Dynamic::Map(HashMap::new()));
    }

    #[test]
    fn uuid_default_generates_distinct_values() {
        let default = UuidDefault::create();
        let first = default.default_value(request()).value.value;
        let second = default.default_value(request()).value.value;

        match (&first, &second) {
            (Dynamic::String(a), Dynamic::String(b)) => {
                assert!(Uuid::parse_str(a).is_ok());
                assert_eq!(a.len(), 36);
                assert_ne!(a, b);
            }
            other => panic!("expected two strings, got {:?}", other),
        }
    }
}
