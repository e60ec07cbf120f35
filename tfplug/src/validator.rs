//! Built-in attribute validators
//!
//! Validators only look at known, non-null values. Null and unknown values
//! pass so optional and computed attributes can be planned.

use crate::schema::{Validator, ValidatorRequest, ValidatorResponse};
use crate::types::{Diagnostic, Dynamic};
use regex::Regex;

pub struct StringLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl StringLengthValidator {
    pub fn between(min: usize, max: usize) -> Box<dyn Validator> {
        Box::new(Self {
            min: Some(min),
            max: Some(max),
        })
    }

    pub fn at_most(max: usize) -> Box<dyn Validator> {
        Box::new(Self {
            min: None,
            max: Some(max),
        })
    }
}

impl Validator for StringLengthValidator {
    fn description(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("length between {} and {}", min, max),
            (Some(min), None) => format!("length at least {}", min),
            (None, Some(max)) => format!("length at most {}", max),
            (None, None) => "any length".to_string(),
        }
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = vec![];
        if let Dynamic::String(s) = &request.config_value.value {
            let len = s.chars().count();
            let too_short = self.min.is_some_and(|min| len < min);
            let too_long = self.max.is_some_and(|max| len > max);
            if too_short || too_long {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid attribute value length",
                        format!("Expected {}, got length {}", self.description(), len),
                    )
                    .with_attribute(request.path),
                );
            }
        }
        ValidatorResponse { diagnostics }
    }
}

pub struct StringPatternValidator {
    pattern: Result<Regex, regex::Error>,
    description: String,
}

impl StringPatternValidator {
    /// A pattern that fails to compile turns every validation into an error
    pub fn create(pattern: &str, description: &str) -> Box<dyn Validator> {
        Box::new(Self {
            pattern: Regex::new(pattern),
            description: description.to_string(),
        })
    }
}

impl Validator for StringPatternValidator {
    fn description(&self) -> String {
        self.description.clone()
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = vec![];
        if let Dynamic::String(s) = &request.config_value.value {
            let pattern = match &self.pattern {
                Ok(pattern) => pattern,
                Err(e) => {
                    diagnostics.push(Diagnostic::error(
                        "Invalid validator pattern",
                        e.to_string(),
                    ));
                    return ValidatorResponse { diagnostics };
                }
            };
            if !pattern.is_match(s) {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid attribute value",
                        format!("{:?} {}", s, self.description),
                    )
                    .with_attribute(request.path),
                );
            }
        }
        ValidatorResponse { diagnostics }
    }
}

/// Accepts only one of a fixed set of strings
pub struct OneOfValidator {
    pub allowed: Vec<String>,
    pub ignore_case: bool,
}

impl OneOfValidator {
    pub fn create(allowed: &[&str]) -> Box<dyn Validator> {
        Box::new(Self {
            allowed: allowed.iter().map(|s| s.to_string()).collect(),
            ignore_case: false,
        })
    }

    pub fn ignoring_case(allowed: &[&str]) -> Box<dyn Validator> {
        Box::new(Self {
            allowed: allowed.iter().map(|s| s.to_string()).collect(),
            ignore_case: true,
        })
    }
}

impl Validator for OneOfValidator {
    fn description(&self) -> String {
        format!("one of {}", self.allowed.join(", "))
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = vec![];
        if let Dynamic::String(s) = &request.config_value.value {
            let matched = self.allowed.iter().any(|allowed| {
                if self.ignore_case {
                    allowed.eq_ignore_ascii_case(s)
                } else {
                    allowed == s
                }
            });
            if !matched {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid attribute value",
                        format!("Expected {}, got {:?}", self.description(), s),
                    )
                    .with_attribute(request.path),
                );
            }
        }
        ValidatorResponse { diagnostics }
    }
}

/// Requires the string to parse as JSON
pub struct JsonStringValidator;

impl Validator for JsonStringValidator {
    fn description(&self) -> String {
        "valid JSON".to_string()
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = vec![];
        if let Dynamic::String(s) = &request.config_value.value {
            if let Err(e) = serde_json::from_str::<serde_json::Value>(s) {
                diagnostics.push(
                    Diagnostic::error("Invalid JSON", format!("Unable to parse value: {}", e))
                        .with_attribute(request.path),
                );
            }
        }
        ValidatorResponse { diagnostics }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::types::{AttributePath, DynamicValue};

    fn request(value: Dynamic) -> ValidatorRequest {
        ValidatorRequest {
            config_value: DynamicValue::new(value),
            path: AttributePath::new("test_field"),
        }
    }

    fn string(s: &str) -> Dynamic {
        Dynamic::String(s.to_string())
    }

    #[test]
    fn string_length_validator_accepts_valid_length() {
        let validator = StringLengthValidator::between(3, 10);
        assert!(validator.validate(request(string("hello"))).diagnostics.is_empty());
    }

    #[test]
    fn string_length_validator_rejects_too_long() {
        let validator = StringLengthValidator::at_most(4);
        let response = validator.validate(request(string("hello")));
        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].detail.contains("length 5"));
    }

    #[test]
    fn validators_skip_null_and_unknown() {
        let validator = StringLengthValidator::between(3, 10);
        assert!(validator.validate(request(Dynamic::Null)).diagnostics.is_empty());
        assert!(validator
            .validate(request(Dynamic::Unknown))
            .diagnostics
            .is_empty());
    }

    #[test]
    fn pattern_validator_reports_description() {
        let validator = StringPatternValidator::create(r"^[a-z]+$", "may only contain lowercase letters");
        assert!(validator.validate(request(string("abc"))).diagnostics.is_empty());

        let response = validator.validate(request(string("ABC")));
        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0]
            .detail
            .contains("may only contain lowercase letters"));
    }

    #[test]
    fn one_of_validator_honours_case_setting() {
        let strict = OneOfValidator::create(&["CanNotDelete", "ReadOnly"]);
        assert!(strict.validate(request(string("ReadOnly"))).diagnostics.is_empty());
        assert_eq!(strict.validate(request(string("readonly"))).diagnostics.len(), 1);

        let relaxed = OneOfValidator::ignoring_case(&["Incremental", "Complete"]);
        assert!(relaxed
            .validate(request(string("complete")))
            .diagnostics
            .is_empty());
    }

    #[test]
    fn json_validator_rejects_garbage() {
        assert!(JsonStringValidator
            .validate(request(string(r#"{"a": 1}"#)))
            .diagnostics
            .is_empty());
        assert_eq!(
            JsonStringValidator
                .validate(request(string("{not json")))
                .diagnostics
                .len(),
            1
        );
    }
}
