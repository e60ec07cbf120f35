//! Framework-level failures
//!
//! Resource handlers report problems as diagnostics; these errors cover the
//! plumbing underneath them.

#[derive(Debug, thiserror::Error)]
pub enum TfplugError {
    #[error("no resource type named {0:?}")]
    ResourceNotFound(String),

    #[error("no data source type named {0:?}")]
    DataSourceNotFound(String),

    #[error("expected a {expected} value, found {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("attribute {0} is not set")]
    AttributeNotFound(String),

    #[error("invalid duration {value:?}: {reason}")]
    InvalidDuration { value: String, reason: String },

    #[error("could not install the log subscriber: {0}")]
    LoggingSetup(String),

    #[error("{0}")]
    Custom(String),
}

pub type Result<T> = std::result::Result<T, TfplugError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_value() {
        let err = TfplugError::InvalidDuration {
            value: "soon".to_string(),
            reason: "missing unit".to_string(),
        };
        assert_eq!(err.to_string(), r#"invalid duration "soon": missing unit"#);
        assert_eq!(
            TfplugError::ResourceNotFound("azurerm_thing".to_string()).to_string(),
            r#"no resource type named "azurerm_thing""#
        );
    }
}
