//! Built-in plan modifiers
//!
//! Modifiers run in the order they were added to the attribute. A diff
//! suppressor must come before `RequiresReplace` so a suppressed change does
//! not force replacement.

use crate::schema::{PlanModifier, PlanModifierRequest, PlanModifierResponse};
use crate::types::{Diagnostic, Dynamic, DynamicValue};

/// Marks an attribute as requiring replacement when it changes
pub struct RequiresReplace;

impl PlanModifier for RequiresReplace {
    fn description(&self) -> String {
        "changing this value forces a new resource".to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let requires_replace = value_changed(&request.state_value, &request.plan_value);

        PlanModifierResponse {
            plan_value: request.plan_value,
            requires_replace,
            diagnostics: vec![],
        }
    }
}

/// Uses the prior state when the planned value is unknown
///
/// Keeps computed attributes such as IDs stable across updates instead of
/// showing them as "known after apply".
pub struct UseStateForUnknown;

impl PlanModifier for UseStateForUnknown {
    fn description(&self) -> String {
        "keeps the prior state value while the planned value is unknown".to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let plan_value = match (&request.plan_value.value, &request.state_value.value) {
            (Dynamic::Unknown | Dynamic::Null, Dynamic::Null) => request.plan_value,
            (Dynamic::Unknown | Dynamic::Null, _) => request.state_value.clone(),
            _ => request.plan_value,
        };

        PlanModifierResponse {
            plan_value,
            requires_replace: false,
            diagnostics: vec![],
        }
    }
}

pub struct RequiresReplaceIf<F>
where
    F: Fn(&PlanModifierRequest) -> bool + Send + Sync,
{
    predicate: F,
    description: String,
}

impl<F> RequiresReplaceIf<F>
where
    F: Fn(&PlanModifierRequest) -> bool + Send + Sync,
{
    pub fn new(predicate: F, description: impl Into<String>) -> Self {
        Self {
            predicate,
            description: description.into(),
        }
    }
}

impl<F> PlanModifier for RequiresReplaceIf<F>
where
    F: Fn(&PlanModifierRequest) -> bool + Send + Sync,
{
    fn description(&self) -> String {
        self.description.clone()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let mut diagnostics = vec![];
        let requires_replace = (self.predicate)(&request);

        if requires_replace {
            diagnostics.push(
                Diagnostic::warning(
                    "Attribute requires resource replacement",
                    self.description.clone(),
                )
                .with_attribute(request.path.clone()),
            );
        }

        PlanModifierResponse {
            plan_value: request.plan_value,
            requires_replace,
            diagnostics,
        }
    }
}

/// Keeps the prior string value when the new one only differs in ways the
/// remote API ignores
pub struct SuppressDiff {
    equivalent: fn(&str, &str) -> bool,
    description: String,
}

impl SuppressDiff {
    pub fn new(equivalent: fn(&str, &str) -> bool, description: impl Into<String>) -> Self {
        Self {
            equivalent,
            description: description.into(),
        }
    }

    pub fn case_insensitive() -> Self {
        Self::new(
            |old, new| old.eq_ignore_ascii_case(new),
            "differences in letter case are ignored",
        )
    }
}

impl PlanModifier for SuppressDiff {
    fn description(&self) -> String {
        self.description.clone()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let plan_value = match (&request.state_value.value, &request.plan_value.value) {
            (Dynamic::String(old), Dynamic::String(new))
                if old != new && (self.equivalent)(old, new) =>
            {
                DynamicValue::new(Dynamic::String(old.clone()))
            }
            _ => request.plan_value,
        };

        PlanModifierResponse {
            plan_value,
            requires_replace: false,
            diagnostics: vec![],
        }
    }
}

/// A real change between prior state and plan. Creates, deletes and unknown
/// values never count.
fn value_changed(state: &DynamicValue, plan: &DynamicValue) -> bool {
    match (&state.value, &plan.value) {
        (Dynamic::Null, _) | (Dynamic::Unknown, _) | (_, Dynamic::Unknown) => false,
        (old, new) => !old.semantically_equal(new),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttributePath;

    fn request(state: Dynamic, plan: Dynamic) -> PlanModifierRequest {
        PlanModifierRequest {
            config_value: DynamicValue::new(plan.clone()),
            state_value: DynamicValue::new(state),
            plan_value: DynamicValue::new(plan),
            path: AttributePath::new("field"),
        }
    }

    fn string(s: &str) -> Dynamic {
        Dynamic::String(s.to_string())
    }

    #[test]
    fn requires_replace_ignores_same_value() {
        let response = RequiresReplace.modify(request(string("hello"), string("hello")));
        assert!(!response.requires_replace);
    }

    #[test]
    fn requires_replace_triggers_on_different_value() {
        let response = RequiresReplace.modify(request(string("hello"), string("world")));
        assert!(response.requires_replace);
        assert!(response.diagnostics.is_empty());
    }

    #[test]
    fn requires_replace_ignores_create_and_unknown() {
        assert!(
            !RequiresReplace
                .modify(request(Dynamic::Null, string("new")))
                .requires_replace
        );
        assert!(
            !RequiresReplace
                .modify(request(string("old"), Dynamic::Unknown))
                .requires_replace
        );
    }

    #[test]
    fn use_state_for_unknown_preserves_state() {
        let response = UseStateForUnknown.modify(request(string("existing"), Dynamic::Unknown));
        assert_eq!(response.plan_value.value, string("existing"));

        let response = UseStateForUnknown.modify(request(string("existing"), string("new")));
        assert_eq!(response.plan_value.value, string("new"));
    }

    #[test]
    fn requires_replace_if_warns_when_triggered() {
        let modifier = RequiresReplaceIf::new(
            |req| {
                matches!((&req.state_value.value, &req.plan_value.value),
                    (Dynamic::String(old), Dynamic::String(new)) if !old.is_empty() && new.is_empty())
            },
            "Cannot clear this value without replacement",
        );

        let response = modifier.modify(request(string("has-value"), string("")));
        assert!(response.requires_replace);
        assert_eq!(response.diagnostics.len(), 1);

        let response = modifier.modify(request(string(""), string("value")));
        assert!(!response.requires_replace);
        assert!(response.diagnostics.is_empty());
    }

    #[test]
    fn suppress_diff_keeps_equivalent_prior_value() {
        let modifier = SuppressDiff::case_insensitive();

        let response = modifier.modify(request(string("WestEurope"), string("westeurope")));
        assert_eq!(response.plan_value.value, string("WestEurope"));

        let response = modifier.modify(request(string("westeurope"), string("northeurope")));
        assert_eq!(response.plan_value.value, string("northeurope"));
    }
}
