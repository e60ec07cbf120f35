//! Validation and planning of a resource schema across create, update and
//! destroy, the way a host drives them

#![allow(clippy::disallowed_methods)]

use std::collections::HashMap;
use std::time::Duration;
use tfplug::defaults::StaticDefault;
use tfplug::plan::{plan_resource_change, validate_config};
use tfplug::plan_modifier::{SuppressDiff, UseStateForUnknown};
use tfplug::types::AttributePath;
use tfplug::validator::{OneOfValidator, StringLengthValidator};
use tfplug::{AttributeBuilder, AttributeType, Dynamic, DynamicValue, Schema, SchemaBuilder, Timeouts};

fn schema() -> Schema {
    SchemaBuilder::new()
        .version(0)
        .description("A lock on a resource group")
        .attribute(
            AttributeBuilder::new("id", AttributeType::String)
                .computed()
                .plan_modifier(Box::new(UseStateForUnknown))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("name", AttributeType::String)
                .required()
                .validator(StringLengthValidator::between(1, 90))
                .force_new()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("location", AttributeType::String)
                .required()
                .plan_modifier(Box::new(SuppressDiff::case_insensitive()))
                .force_new()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("lock_level", AttributeType::String)
                .optional_computed()
                .validator(OneOfValidator::create(&["CanNotDelete", "ReadOnly"]))
                .default(StaticDefault::string("CanNotDelete"))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("tags", AttributeType::Map(Box::new(AttributeType::String)))
                .optional()
                .build(),
        )
        .attribute(Timeouts::attribute())
        .build()
}

fn object(pairs: &[(&str, Dynamic)]) -> DynamicValue {
    DynamicValue::new(Dynamic::Map(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect(),
    ))
}

fn string(value: &str) -> Dynamic {
    Dynamic::String(value.to_string())
}

fn prior_state() -> DynamicValue {
    object(&[
        ("id", string("/subscriptions/s/resourceGroups/rg")),
        ("name", string("rg")),
        ("location", string("westeurope")),
        ("lock_level", string("ReadOnly")),
    ])
}

#[test]
fn create_plans_defaults_and_unknown_computed_values() {
    let config = object(&[("name", string("rg")), ("location", string("westeurope"))]);

    let plan = plan_resource_change(&schema(), &DynamicValue::null(), &config, &config);

    assert!(plan.diagnostics.is_empty());
    assert!(plan.requires_replace.is_empty());
    assert_eq!(
        plan.planned_state.get_value(&AttributePath::new("id")),
        Dynamic::Unknown
    );
    assert_eq!(
        plan.planned_state
            .get_string(&AttributePath::new("lock_level"))
            .unwrap(),
        "CanNotDelete"
    );
}

#[test]
fn update_keeps_computed_values_and_flags_replacements() {
    let config = object(&[
        ("name", string("rg-renamed")),
        ("location", string("westeurope")),
        ("lock_level", string("ReadOnly")),
    ]);
    let mut proposed = config.clone();
    proposed
        .set_dynamic(&AttributePath::new("id"), Dynamic::Unknown)
        .unwrap();

    let plan = plan_resource_change(&schema(), &prior_state(), &config, &proposed);

    assert_eq!(plan.requires_replace, vec![AttributePath::new("name")]);
    assert_eq!(
        plan.planned_state.get_string(&AttributePath::new("id")).unwrap(),
        "/subscriptions/s/resourceGroups/rg"
    );
}

#[test]
fn suppressed_difference_neither_changes_nor_replaces() {
    let config = object(&[
        ("name", string("rg")),
        ("location", string("WestEurope")),
        ("lock_level", string("ReadOnly")),
    ]);

    let plan = plan_resource_change(&schema(), &prior_state(), &config, &config);

    assert!(plan.requires_replace.is_empty());
    assert_eq!(
        plan.planned_state
            .get_string(&AttributePath::new("location"))
            .unwrap(),
        "westeurope"
    );
}

#[test]
fn destroy_plans_null_state() {
    let plan = plan_resource_change(
        &schema(),
        &prior_state(),
        &DynamicValue::null(),
        &DynamicValue::null(),
    );

    assert!(plan.planned_state.is_null());
    assert!(plan.requires_replace.is_empty());
}

#[test]
fn validation_reports_each_problem_against_its_attribute() {
    let config = object(&[
        ("location", Dynamic::Bool(true)),
        ("lock_level", string("Frozen")),
        ("colour", string("blue")),
    ]);

    let diagnostics = validate_config(&schema(), &config);
    let attributes: Vec<Option<AttributePath>> =
        diagnostics.iter().map(|d| d.attribute.clone()).collect();

    assert_eq!(diagnostics.len(), 4, "{:?}", diagnostics);
    for name in ["name", "location", "lock_level", "colour"] {
        assert!(
            attributes.contains(&Some(AttributePath::new(name))),
            "no diagnostic for {}",
            name
        );
    }
}

#[test]
fn unknown_values_pass_validation() {
    let config = object(&[
        ("name", Dynamic::Unknown),
        ("location", string("westeurope")),
        ("lock_level", Dynamic::Unknown),
    ]);

    assert!(validate_config(&schema(), &config).is_empty());
}

#[test]
fn configured_timeouts_override_defaults() {
    let defaults = Timeouts::minutes(30, 5, 30, 30);
    let config = object(&[(
        "timeouts",
        Dynamic::Map(HashMap::from([
            ("create".to_string(), string("1h30m")),
            ("delete".to_string(), string("45s")),
        ])),
    )]);

    let resolved = defaults.resolve(&config).unwrap();

    assert_eq!(resolved.create, Duration::from_secs(90 * 60));
    assert_eq!(resolved.read, Duration::from_secs(5 * 60));
    assert_eq!(resolved.delete, Duration::from_secs(45));

    let invalid = object(&[(
        "timeouts",
        Dynamic::Map(HashMap::from([("read".to_string(), string("soon"))])),
    )]);
    assert!(defaults.resolve(&invalid).is_err());
}
