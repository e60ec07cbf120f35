//! Values, attribute paths and diagnostics
//!
//! Configuration, plans and state all travel as a [`DynamicValue`]: an
//! object whose attributes are read and written by path. Missing attributes
//! read as null, so handlers never need to match on the raw tree.

use crate::error::{Result, TfplugError};
use std::collections::HashMap;

/// A Terraform value. Objects and maps share the `Map` variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Dynamic {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Dynamic>),
    Map(HashMap<String, Dynamic>),
    /// Known only after apply
    Unknown,
}

impl Dynamic {
    pub fn type_name(&self) -> &'static str {
        match self {
            Dynamic::Null => "null",
            Dynamic::Bool(_) => "bool",
            Dynamic::Number(_) => "number",
            Dynamic::String(_) => "string",
            Dynamic::List(_) => "list",
            Dynamic::Map(_) => "map",
            Dynamic::Unknown => "unknown",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Dynamic::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Dynamic::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Dynamic::Null)
    }

    /// Structural equality that tolerates float rounding
    pub fn semantically_equal(&self, other: &Dynamic) -> bool {
        match (self, other) {
            (Dynamic::Number(a), Dynamic::Number(b)) => (a - b).abs() < f64::EPSILON,
            (Dynamic::List(a), Dynamic::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.semantically_equal(y))
            }
            (Dynamic::Map(a), Dynamic::Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).is_some_and(|other| v.semantically_equal(other)))
            }
            (a, b) => a == b,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DynamicValue {
    pub value: Dynamic,
}

impl DynamicValue {
    pub fn new(value: Dynamic) -> Self {
        Self { value }
    }

    pub fn null() -> Self {
        Self::new(Dynamic::Null)
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    pub fn get_string(&self, path: &AttributePath) -> Result<String> {
        match self.lookup(path)? {
            Dynamic::String(s) => Ok(s.clone()),
            other => Err(mismatch("string", other)),
        }
    }

    pub fn get_bool(&self, path: &AttributePath) -> Result<bool> {
        match self.lookup(path)? {
            Dynamic::Bool(b) => Ok(*b),
            other => Err(mismatch("bool", other)),
        }
    }

    /// Missing, null and unknown all read as `None`
    pub fn get_string_opt(&self, path: &AttributePath) -> Option<String> {
        self.lookup(path).ok()?.as_str().map(str::to_string)
    }

    pub fn get_bool_or(&self, path: &AttributePath, fallback: bool) -> bool {
        self.lookup(path)
            .ok()
            .and_then(Dynamic::as_bool)
            .unwrap_or(fallback)
    }

    /// Reads a `map(string)`. Null, unknown or missing yields an empty map.
    pub fn get_string_map(&self, path: &AttributePath) -> Result<HashMap<String, String>> {
        match self.lookup(path) {
            Ok(Dynamic::Map(m)) => m
                .iter()
                .map(|(k, v)| match v {
                    Dynamic::String(s) => Ok((k.clone(), s.clone())),
                    other => Err(mismatch("string", other)),
                })
                .collect(),
            Ok(Dynamic::Null | Dynamic::Unknown) | Err(_) => Ok(HashMap::new()),
            Ok(other) => Err(mismatch("map", other)),
        }
    }

    /// Raw value at `path`, `Null` when absent
    pub fn get_value(&self, path: &AttributePath) -> Dynamic {
        self.lookup(path).cloned().unwrap_or(Dynamic::Null)
    }

    pub fn set_string(&mut self, path: &AttributePath, value: String) -> Result<()> {
        self.set_dynamic(path, Dynamic::String(value))
    }

    pub fn set_bool(&mut self, path: &AttributePath, value: bool) -> Result<()> {
        self.set_dynamic(path, Dynamic::Bool(value))
    }

    pub fn set_string_map(
        &mut self,
        path: &AttributePath,
        value: &HashMap<String, String>,
    ) -> Result<()> {
        let map = value
            .iter()
            .map(|(k, v)| (k.clone(), Dynamic::String(v.clone())))
            .collect();
        self.set_dynamic(path, Dynamic::Map(map))
    }

    /// Writes `value` at `path`, creating intermediate objects. A null or
    /// missing parent becomes an empty object first.
    pub fn set_dynamic(&mut self, path: &AttributePath, value: Dynamic) -> Result<()> {
        let Some((last, parents)) = path.steps.split_last() else {
            self.value = value;
            return Ok(());
        };

        let mut current = &mut self.value;
        for name in parents {
            current = object_mut(current, name)?
                .entry(name.clone())
                .or_insert(Dynamic::Null);
        }
        object_mut(current, last)?.insert(last.clone(), value);
        Ok(())
    }

    fn lookup(&self, path: &AttributePath) -> Result<&Dynamic> {
        path.steps.iter().try_fold(&self.value, |current, name| match current {
            Dynamic::Map(m) => m
                .get(name)
                .ok_or_else(|| TfplugError::AttributeNotFound(path.to_string())),
            Dynamic::Null | Dynamic::Unknown => {
                Err(TfplugError::AttributeNotFound(path.to_string()))
            }
            other => Err(mismatch("object", other)),
        })
    }
}

fn object_mut<'a>(
    value: &'a mut Dynamic,
    name: &str,
) -> Result<&'a mut HashMap<String, Dynamic>> {
    if matches!(value, Dynamic::Null | Dynamic::Unknown) {
        *value = Dynamic::Map(HashMap::new());
    }
    match value {
        Dynamic::Map(m) => Ok(m),
        other => Err(TfplugError::Custom(format!(
            "cannot set {:?} inside a {}",
            name,
            other.type_name()
        ))),
    }
}

fn mismatch(expected: &str, actual: &Dynamic) -> TfplugError {
    TfplugError::TypeMismatch {
        expected: expected.to_string(),
        actual: actual.type_name().to_string(),
    }
}

/// Attribute names from the root of an object, e.g. `features.resource_group`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributePath {
    pub steps: Vec<String>,
}

impl AttributePath {
    pub fn new(name: &str) -> Self {
        Self {
            steps: vec![name.to_string()],
        }
    }

    pub fn attribute(mut self, name: &str) -> Self {
        self.steps.push(name.to_string());
        self
    }
}

impl std::fmt::Display for AttributePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.steps.join("."))
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub summary: String,
    pub detail: String,
    pub attribute: Option<AttributePath>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            ..Self::error(summary, detail)
        }
    }

    pub fn with_attribute(mut self, path: AttributePath) -> Self {
        self.attribute = Some(path);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}

pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics
        .iter()
        .any(|d| d.severity == DiagnosticSeverity::Error)
}

/// What the provider tells the host it supports
#[derive(Debug, Clone)]
pub struct ServerCapabilities {
    pub plan_destroy: bool,
    pub get_provider_schema_optional: bool,
    pub move_resource_state: bool,
}

/// What the host tells the provider it supports
#[derive(Debug, Clone, Default)]
pub struct ClientCapabilities {
    pub deferral_allowed: bool,
    pub write_only_attributes_allowed: bool,
}

/// A change the provider cannot plan or apply yet
#[derive(Debug, Clone)]
pub struct Deferred {
    pub reason: DeferredReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredReason {
    Unknown,
    ResourceConfigUnknown,
    ProviderConfigUnknown,
    AbsentPrereq,
}

#[derive(Debug, Clone)]
pub struct ResourceIdentityData {
    pub identity_data: DynamicValue,
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn nested_paths_create_intermediate_objects() {
        let mut value = DynamicValue::null();
        let path = AttributePath::new("features")
            .attribute("template_deployment")
            .attribute("delete_nested_items_during_deletion");

        value.set_bool(&path, false).unwrap();

        assert!(!value.get_bool(&path).unwrap());
        assert!(!value.get_bool_or(&path, true));
        assert!(value.get_bool_or(&AttributePath::new("missing"), true));
        assert_eq!(path.to_string(), "features.template_deployment.delete_nested_items_during_deletion");
    }

    #[test]
    fn missing_and_mistyped_attributes() {
        let mut value = DynamicValue::null();
        value
            .set_string(&AttributePath::new("name"), "rg".to_string())
            .unwrap();

        assert!(matches!(
            value.get_string(&AttributePath::new("location")),
            Err(TfplugError::AttributeNotFound(_))
        ));
        assert!(matches!(
            value.get_bool(&AttributePath::new("name")),
            Err(TfplugError::TypeMismatch { .. })
        ));
        assert_eq!(value.get_value(&AttributePath::new("location")), Dynamic::Null);
        assert!(value
            .set_string(&AttributePath::new("name").attribute("inner"), "x".to_string())
            .is_err());
    }

    #[test]
    fn string_map_reads_tags_and_tolerates_null() {
        let mut value = DynamicValue::null();
        let tags = HashMap::from([("env".to_string(), "prod".to_string())]);
        value
            .set_string_map(&AttributePath::new("tags"), &tags)
            .unwrap();

        assert_eq!(value.get_string_map(&AttributePath::new("tags")).unwrap(), tags);
        assert!(value
            .get_string_map(&AttributePath::new("missing"))
            .unwrap()
            .is_empty());

        value
            .set_dynamic(&AttributePath::new("unknown_tags"), Dynamic::Unknown)
            .unwrap();
        assert!(value
            .get_string_map(&AttributePath::new("unknown_tags"))
            .unwrap()
            .is_empty());
        assert_eq!(value.get_string_opt(&AttributePath::new("unknown_tags")), None);
    }

    #[test]
    fn numbers_compare_with_tolerance() {
        let a = Dynamic::Map(HashMap::from([("n".to_string(), Dynamic::Number(0.1 + 0.2))]));
        let b = Dynamic::Map(HashMap::from([("n".to_string(), Dynamic::Number(0.3))]));

        assert!(a.semantically_equal(&b));
        assert!(!a.semantically_equal(&Dynamic::Null));
    }

    #[test]
    fn warnings_are_not_errors() {
        let warning = Diagnostic::warning("Deprecated", "use something else");
        assert_eq!(warning.severity, DiagnosticSeverity::Warning);
        assert!(!has_errors(&[warning.clone()]));
        assert!(has_errors(&[warning, Diagnostic::error("Failed", "boom")]));
    }
}
