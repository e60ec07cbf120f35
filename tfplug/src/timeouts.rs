//! Per-operation timeouts configured through a `timeouts` attribute
//!
//! ```hcl
//! timeouts {
//!   create = "1h30m"
//!   delete = "3h"
//! }
//! ```
//!
//! Durations use Terraform's format: a sequence of decimal numbers with a
//! unit suffix (`ms`, `s`, `m`, `h`).

use crate::error::{Result, TfplugError};
use crate::schema::{Attribute, AttributeBuilder, AttributeType};
use crate::types::{AttributePath, DynamicValue};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Duration;

pub const TIMEOUTS_ATTRIBUTE: &str = "timeouts";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timeouts {
    pub create: Duration,
    pub read: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Timeouts {
    pub const fn new(create: Duration, read: Duration, update: Duration, delete: Duration) -> Self {
        Self {
            create,
            read,
            update,
            delete,
        }
    }

    /// Uniform defaults expressed in minutes
    pub const fn minutes(create: u64, read: u64, update: u64, delete: u64) -> Self {
        Self::new(
            Duration::from_secs(create * 60),
            Duration::from_secs(read * 60),
            Duration::from_secs(update * 60),
            Duration::from_secs(delete * 60),
        )
    }

    /// Overlays whatever the `timeouts` attribute of `value` sets on top of
    /// these defaults
    pub fn resolve(&self, value: &DynamicValue) -> Result<Self> {
        let mut resolved = *self;
        let root = AttributePath::new(TIMEOUTS_ATTRIBUTE);

        let fields: [(&str, &mut Duration); 4] = [
            ("create", &mut resolved.create),
            ("read", &mut resolved.read),
            ("update", &mut resolved.update),
            ("delete", &mut resolved.delete),
        ];
        for (name, slot) in fields {
            if let Some(raw) = value.get_string_opt(&root.clone().attribute(name)) {
                *slot = parse_duration(&raw)?;
            }
        }

        Ok(resolved)
    }

    /// Schema attribute declaring the four optional timeouts
    pub fn attribute() -> Attribute {
        let fields = ["create", "read", "update", "delete"]
            .into_iter()
            .map(|name| (name.to_string(), AttributeType::String))
            .collect::<HashMap<_, _>>();

        AttributeBuilder::new(TIMEOUTS_ATTRIBUTE, AttributeType::Object(fields))
            .description("Operation timeouts such as \"30m\" or \"1h30m\"")
            .optional()
            .build()
    }
}

fn duration_pattern() -> std::result::Result<&'static Regex, &'static regex::Error> {
    static PATTERN: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?P<number>\d+(?:\.\d+)?)(?P<unit>ms|h|m|s)"))
        .as_ref()
}

/// Parses durations like `"90m"`, `"1h30m"`, `"1.5h"` or `"500ms"`
pub fn parse_duration(input: &str) -> Result<Duration> {
    let invalid = |reason: &str| TfplugError::InvalidDuration {
        value: input.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(invalid("duration cannot be empty"));
    }

    let pattern = duration_pattern().map_err(|e| invalid(&e.to_string()))?;
    let mut consumed = 0;
    let mut total = 0f64;
    for captures in pattern.captures_iter(trimmed) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        if whole.start() != consumed {
            return Err(invalid("unexpected characters"));
        }
        consumed = whole.end();

        let number: f64 = captures["number"]
            .parse()
            .map_err(|_| invalid("invalid number"))?;
        let seconds = match &captures["unit"] {
            "ms" => number / 1000.0,
            "s" => number,
            "m" => number * 60.0,
            "h" => number * 3600.0,
            _ => return Err(invalid("unknown unit")),
        };
        total += seconds;
    }

    if consumed != trimmed.len() {
        return Err(invalid("expected a number followed by ms, s, m or h"));
    }

    Ok(Duration::from_secs_f64(total))
}
