//! Shared ARM wire types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type Tags = HashMap<String, String>;

/// ARM error envelope: `{"error": {"code": ..., "message": ...}}`
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ErrorDetail {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<ErrorDetail>,
}

/// One page of a list operation
#[derive(Debug, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(rename = "nextLink", default)]
    pub next_link: Option<String>,
}

/// Body of an `Azure-AsyncOperation` status document
#[derive(Debug, Deserialize)]
pub struct OperationStatus {
    pub status: String,
    #[serde(default)]
    pub error: Option<ErrorDetail>,
}

impl OperationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status.to_ascii_lowercase().as_str(),
            "succeeded" | "failed" | "canceled" | "cancelled"
        )
    }

    pub fn is_success(&self) -> bool {
        self.status.eq_ignore_ascii_case("succeeded")
    }
}

/// Query parameters appended to every request
#[derive(Debug, Default, Clone)]
pub struct QueryParams {
    params: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn api_version(version: &str) -> Self {
        Self::new().add("api-version", version)
    }

    pub fn add(mut self, key: &str, value: &str) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Locations are compared and stored lower-cased without spaces
pub fn normalize_location(location: &str) -> String {
    location.replace(' ', "").to_lowercase()
}
