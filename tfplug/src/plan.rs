//! Schema-driven config validation and planning
//!
//! What a host asks of the provider before apply, run in-process:
//! required/unknown/type checks plus attribute validators, then
//! planning with defaults and plan modifiers.

use crate::schema::{
    Attribute, AttributeType, DefaultRequest, PlanModifierRequest, Schema, ValidatorRequest,
};
use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use std::collections::HashMap;

pub struct PlanResult {
    pub planned_state: DynamicValue,
    pub requires_replace: Vec<AttributePath>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Validates a configuration object against the schema
pub fn validate_config(schema: &Schema, config: &DynamicValue) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let values = match &config.value {
        Dynamic::Map(values) => values.clone(),
        Dynamic::Null => HashMap::new(),
        // Whole-object unknowns are validated again once known
        Dynamic::Unknown => return diagnostics,
        other => {
            diagnostics.push(Diagnostic::error(
                "Invalid configuration",
                format!("Expected an object, got {}", other.type_name()),
            ));
            return diagnostics;
        }
    };

    for attr in &schema.attributes {
        let value = values.get(&attr.name).unwrap_or(&Dynamic::Null);
        if attr.required && value.is_null() {
            diagnostics.push(
                Diagnostic::error(
                    format!("Missing required field: {}", attr.name),
                    format!("The field '{}' is required but was not provided", attr.name),
                )
                .with_attribute(AttributePath::new(&attr.name)),
            );
        }
        if !attr.required && !attr.optional && attr.computed && !value.is_null() {
            diagnostics.push(
                Diagnostic::error(
                    format!("Computed field set: {}", attr.name),
                    format!("The field '{}' is read-only and cannot be configured", attr.name),
                )
                .with_attribute(AttributePath::new(&attr.name)),
            );
        }
    }

    for (field_name, value) in &values {
        let Some(attr) = schema.attribute(field_name) else {
            diagnostics.push(
                Diagnostic::error(
                    format!("Unknown field: {}", field_name),
                    format!(
                        "The field '{}' is not defined in the resource schema",
                        field_name
                    ),
                )
                .with_attribute(AttributePath::new(field_name)),
            );
            continue;
        };

        if !value_matches_type(value, &attr.r#type) {
            diagnostics.push(
                Diagnostic::error(
                    format!("Type mismatch for field: {}", field_name),
                    format!(
                        "Field '{}' expects type {:?} but got {}",
                        field_name,
                        attr.r#type,
                        value.type_name()
                    ),
                )
                .with_attribute(AttributePath::new(field_name)),
            );
            continue;
        }

        run_validators(attr, value, &mut diagnostics);
    }

    diagnostics
}

fn run_validators(attr: &Attribute, value: &Dynamic, diagnostics: &mut Vec<Diagnostic>) {
    if matches!(value, Dynamic::Null | Dynamic::Unknown) {
        return;
    }
    for validator in &attr.validators {
        let response = validator.validate(ValidatorRequest {
            config_value: DynamicValue::new(value.clone()),
            path: AttributePath::new(&attr.name),
        });
        diagnostics.extend(response.diagnostics);
    }
}

/// Plans a resource change from prior state, config and the host's proposed
/// new state. A null proposed state plans a destroy.
pub fn plan_resource_change(
    schema: &Schema,
    prior_state: &DynamicValue,
    config: &DynamicValue,
    proposed_new_state: &DynamicValue,
) -> PlanResult {
    if proposed_new_state.is_null() {
        return PlanResult {
            planned_state: DynamicValue::null(),
            requires_replace: vec![],
            diagnostics: vec![],
        };
    }

    let prior = object_values(prior_state);
    let config_values = object_values(config);
    let mut planned = object_values(proposed_new_state);
    let is_create = prior_state.is_null();

    let mut requires_replace = Vec::new();
    let mut diagnostics = Vec::new();

    for attr in &schema.attributes {
        let config_value = config_values.get(&attr.name).cloned().unwrap_or(Dynamic::Null);
        let mut plan_value = planned.get(&attr.name).cloned().unwrap_or(Dynamic::Null);

        if config_value.is_null() && attr.computed {
            if let Some(default) = &attr.default {
                if is_create || prior.get(&attr.name).map_or(true, Dynamic::is_null) {
                    plan_value = default
                        .default_value(DefaultRequest {
                            path: AttributePath::new(&attr.name),
                        })
                        .value
                        .value;
                } else if let Some(prior_value) = prior.get(&attr.name) {
                    plan_value = prior_value.clone();
                }
            } else if is_create && plan_value.is_null() {
                plan_value = Dynamic::Unknown;
            } else if let Some(prior_value) = prior.get(&attr.name) {
                plan_value = prior_value.clone();
            }
        }

        let state_value = prior.get(&attr.name).cloned().unwrap_or(Dynamic::Null);
        for modifier in &attr.plan_modifiers {
            let response = modifier.modify(PlanModifierRequest {
                config_value: DynamicValue::new(config_value.clone()),
                state_value: DynamicValue::new(state_value.clone()),
                plan_value: DynamicValue::new(plan_value),
                path: AttributePath::new(&attr.name),
            });
            plan_value = response.plan_value.value;
            if response.requires_replace
                && !requires_replace
                    .iter()
                    .any(|p: &AttributePath| *p == AttributePath::new(&attr.name))
            {
                requires_replace.push(AttributePath::new(&attr.name));
            }
            diagnostics.extend(response.diagnostics);
        }

        match plan_value {
            Dynamic::Null => {
                planned.remove(&attr.name);
            }
            value => {
                planned.insert(attr.name.clone(), value);
            }
        }
    }

    PlanResult {
        planned_state: DynamicValue::new(Dynamic::Map(planned)),
        requires_replace,
        diagnostics,
    }
}

fn object_values(value: &DynamicValue) -> HashMap<String, Dynamic> {
    match &value.value {
        Dynamic::Map(values) => values.clone(),
        _ => HashMap::new(),
    }
}

fn value_matches_type(value: &Dynamic, expected: &AttributeType) -> bool {
    match (value, expected) {
        (Dynamic::Null, _) | (Dynamic::Unknown, _) => true,
        (Dynamic::String(_), AttributeType::String) => true,
        (Dynamic::Number(_), AttributeType::Number) => true,
        (Dynamic::Bool(_), AttributeType::Bool) => true,
        (Dynamic::List(items), AttributeType::List(elem))
        | (Dynamic::List(items), AttributeType::Set(elem)) => {
            items.iter().all(|item| value_matches_type(item, elem))
        }
        (Dynamic::Map(map), AttributeType::Map(elem)) => {
            map.values().all(|item| value_matches_type(item, elem))
        }
        (Dynamic::Map(map), AttributeType::Object(fields)) => map.iter().all(|(k, v)| {
            fields
                .get(k)
                .is_some_and(|field_type| value_matches_type(v, field_type))
        }),
        _ => false,
    }
}
