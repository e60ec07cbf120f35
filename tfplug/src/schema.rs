//! Schemas for providers, resources and data sources
//!
//! A schema is a flat list of attributes. Each attribute carries its type,
//! its required/optional/computed flags and the hooks the planner runs for
//! it: validators, plan modifiers and a default.

use crate::types::{AttributePath, Diagnostic, DynamicValue};
use std::collections::HashMap;

/// Terraform's attribute type system. Numbers are always `f64`.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Number,
    Bool,
    List(Box<AttributeType>),
    Set(Box<AttributeType>),
    /// String keys, uniform element type
    Map(Box<AttributeType>),
    /// Fixed field names, one type per field
    Object(HashMap<String, AttributeType>),
}

#[derive(Debug)]
pub struct Schema {
    /// Bumped when stored state needs migrating
    pub version: i64,
    pub description: String,
    pub attributes: Vec<Attribute>,
}

impl Schema {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Attributes whose change replaces the resource
    pub fn force_new_attributes(&self) -> Vec<&str> {
        self.attributes
            .iter()
            .filter(|a| a.force_new)
            .map(|a| a.name.as_str())
            .collect()
    }
}

pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    /// Redacted from plan output
    pub sensitive: bool,
    pub force_new: bool,
    pub validators: Vec<Box<dyn Validator>>,
    pub plan_modifiers: Vec<Box<dyn PlanModifier>>,
    pub default: Option<Box<dyn Default>>,
}

impl std::fmt::Debug for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("type", &self.r#type)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("sensitive", &self.sensitive)
            .field("force_new", &self.force_new)
            .field("validators", &self.validators.len())
            .field("plan_modifiers", &self.plan_modifiers.len())
            .field("has_default", &self.default.is_some())
            .finish_non_exhaustive()
    }
}

/// Checks a known, non-null configured value
pub trait Validator: Send + Sync {
    fn description(&self) -> String;
    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse;
}

pub struct ValidatorRequest {
    pub config_value: DynamicValue,
    pub path: AttributePath,
}

pub struct ValidatorResponse {
    pub diagnostics: Vec<Diagnostic>,
}

/// Rewrites the planned value of one attribute, optionally flagging that
/// the change needs a replacement
pub trait PlanModifier: Send + Sync {
    fn description(&self) -> String;
    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse;
}

pub struct PlanModifierRequest {
    pub config_value: DynamicValue,
    pub state_value: DynamicValue,
    pub plan_value: DynamicValue,
    pub path: AttributePath,
}

pub struct PlanModifierResponse {
    pub plan_value: DynamicValue,
    pub requires_replace: bool,
    pub diagnostics: Vec<Diagnostic>,
}

/// Value planned for a computed attribute the configuration leaves unset
pub trait Default: Send + Sync {
    fn description(&self) -> String;
    fn default_value(&self, request: DefaultRequest) -> DefaultResponse;
}

pub struct DefaultRequest {
    pub path: AttributePath,
}

pub struct DefaultResponse {
    pub value: DynamicValue,
}

pub struct AttributeBuilder {
    attribute: Attribute,
}

impl AttributeBuilder {
    pub fn new(name: &str, r#type: AttributeType) -> Self {
        Self {
            attribute: Attribute {
                name: name.to_string(),
                r#type,
                description: String::new(),
                required: false,
                optional: false,
                computed: false,
                sensitive: false,
                force_new: false,
                validators: Vec::new(),
                plan_modifiers: Vec::new(),
                default: None,
            },
        }
    }

    pub fn description(mut self, description: &str) -> Self {
        self.attribute.description = description.to_string();
        self
    }

    pub fn required(mut self) -> Self {
        self.attribute.required = true;
        self.attribute.optional = false;
        self
    }

    pub fn optional(mut self) -> Self {
        self.attribute.optional = true;
        self.attribute.required = false;
        self
    }

    /// Set by the provider; configuring it is an error unless also optional
    pub fn computed(mut self) -> Self {
        self.attribute.computed = true;
        self
    }

    /// Optional, and filled in by the provider when not configured
    pub fn optional_computed(self) -> Self {
        self.optional().computed()
    }

    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    pub fn validator(mut self, validator: Box<dyn Validator>) -> Self {
        self.attribute.validators.push(validator);
        self
    }

    /// Modifiers run in the order they are added
    pub fn plan_modifier(mut self, modifier: Box<dyn PlanModifier>) -> Self {
        self.attribute.plan_modifiers.push(modifier);
        self
    }

    pub fn default(mut self, default: Box<dyn Default>) -> Self {
        self.attribute.default = Some(default);
        self
    }

    /// Appends `RequiresReplace`, so add diff suppressors before calling this
    pub fn force_new(mut self) -> Self {
        self.attribute.force_new = true;
        self.attribute
            .plan_modifiers
            .push(Box::new(crate::plan_modifier::RequiresReplace));
        self
    }

    pub fn build(self) -> Attribute {
        self.attribute
    }
}

#[derive(std::default::Default)]
pub struct SchemaBuilder {
    schema: Schema,
}

impl std::default::Default for Schema {
    fn default() -> Self {
        Self {
            version: 0,
            description: String::new(),
            attributes: Vec::new(),
        }
    }
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(mut self, version: i64) -> Self {
        self.schema.version = version;
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.schema.description = description.to_string();
        self
    }

    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.schema.attributes.push(attribute);
        self
    }

    pub fn build(self) -> Schema {
        self.schema
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn optional_computed_sets_both_flags() {
        let attribute = AttributeBuilder::new("template_content", AttributeType::String)
            .required()
            .optional_computed()
            .build();

        assert!(attribute.optional);
        assert!(attribute.computed);
        assert!(!attribute.required);
    }

    #[test]
    fn force_new_registers_requires_replace() {
        let schema = SchemaBuilder::new()
            .version(1)
            .description("A resource group")
            .attribute(
                AttributeBuilder::new("location", AttributeType::String)
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("tags", AttributeType::Map(Box::new(AttributeType::String)))
                    .optional()
                    .build(),
            )
            .build();

        assert_eq!(schema.version, 1);
        assert_eq!(schema.description, "A resource group");
        assert_eq!(schema.force_new_attributes(), vec!["location"]);
        let location = schema.attribute("location").unwrap();
        assert_eq!(location.plan_modifiers.len(), 1);
        assert!(schema.attribute("missing").is_none());
    }

    #[test]
    fn object_type_keeps_field_types() {
        let features = AttributeType::Object(HashMap::from([(
            "resource_group".to_string(),
            AttributeType::Object(HashMap::from([(
                "prevent_deletion_if_contains_resources".to_string(),
                AttributeType::Bool,
            )])),
        )]));

        let attribute = AttributeBuilder::new("features", features).optional().build();

        let AttributeType::Object(fields) = &attribute.r#type else {
            panic!("expected an object type");
        };
        assert!(matches!(
            fields.get("resource_group"),
            Some(AttributeType::Object(inner)) if inner.get("prevent_deletion_if_contains_resources") == Some(&AttributeType::Bool)
        ));
    }
}
