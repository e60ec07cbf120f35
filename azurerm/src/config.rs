//! Provider configuration
//!
//! Every setting can come from the provider block or, when absent there,
//! from the matching `ARM_*` environment variable.

use crate::auth::Credentials;
use std::collections::HashMap;
use tfplug::schema::{Attribute, AttributeBuilder, AttributeType};
use tfplug::types::{AttributePath, DynamicValue};
use thiserror::Error;

pub const DEFAULT_RESOURCE_MANAGER_ENDPOINT: &str = "https://management.azure.com";
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

pub const ENV_SUBSCRIPTION_ID: &str = "ARM_SUBSCRIPTION_ID";
pub const ENV_TENANT_ID: &str = "ARM_TENANT_ID";
pub const ENV_CLIENT_ID: &str = "ARM_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "ARM_CLIENT_SECRET";
pub const ENV_ACCESS_TOKEN: &str = "ARM_ACCESS_TOKEN";
pub const ENV_RESOURCE_MANAGER_ENDPOINT: &str = "ARM_RESOURCE_MANAGER_ENDPOINT";
pub const ENV_AUTHORITY_HOST: &str = "ARM_AUTHORITY_HOST";
pub const ENV_SKIP_PROVIDER_REGISTRATION: &str = "ARM_SKIP_PROVIDER_REGISTRATION";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{attribute} is required (set in provider config or {env} env var)")]
    Missing {
        attribute: &'static str,
        env: &'static str,
    },

    #[error("{env} must be true or false, got {value:?}")]
    InvalidBool { env: &'static str, value: String },
}

/// Behaviour toggles from the provider's `features` block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Features {
    /// Refuse to delete a resource group that still contains resources
    pub prevent_deletion_if_contains_resources: bool,
    /// Delete the resources a template deployment created along with it
    pub delete_nested_items_during_deletion: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            prevent_deletion_if_contains_resources: true,
            delete_nested_items_during_deletion: true,
        }
    }
}

impl Features {
    pub fn from_config(config: &DynamicValue) -> Self {
        let defaults = Self::default();
        let features = AttributePath::new("features");
        Self {
            prevent_deletion_if_contains_resources: config.get_bool_or(
                &features
                    .clone()
                    .attribute("resource_group")
                    .attribute("prevent_deletion_if_contains_resources"),
                defaults.prevent_deletion_if_contains_resources,
            ),
            delete_nested_items_during_deletion: config.get_bool_or(
                &features
                    .attribute("template_deployment")
                    .attribute("delete_nested_items_during_deletion"),
                defaults.delete_nested_items_during_deletion,
            ),
        }
    }

    pub fn attribute() -> Attribute {
        let object = |field: &str| {
            AttributeType::Object(HashMap::from([(field.to_string(), AttributeType::Bool)]))
        };
        let fields = HashMap::from([
            (
                "resource_group".to_string(),
                object("prevent_deletion_if_contains_resources"),
            ),
            (
                "template_deployment".to_string(),
                object("delete_nested_items_during_deletion"),
            ),
        ]);

        AttributeBuilder::new("features", AttributeType::Object(fields))
            .description("Toggles for behaviour that differs from the Azure API defaults")
            .optional()
            .build()
    }
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub subscription_id: String,
    pub credentials: Credentials,
    pub resource_manager_endpoint: String,
    pub skip_provider_registration: bool,
    pub features: Features,
}

fn string_setting(config: &DynamicValue, attribute: &str, env: &str) -> Option<String> {
    config
        .get_string_opt(&AttributePath::new(attribute))
        .filter(|v| !v.is_empty())
        .or_else(|| std::env::var(env).ok().filter(|v| !v.is_empty()))
}

fn bool_setting(
    config: &DynamicValue,
    attribute: &str,
    env: &'static str,
) -> Result<Option<bool>, ConfigError> {
    if let Some(value) = config.get_value(&AttributePath::new(attribute)).as_bool() {
        return Ok(Some(value));
    }
    match std::env::var(env) {
        Ok(raw) if !raw.is_empty() => raw
            .parse::<bool>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidBool { env, value: raw }),
        _ => Ok(None),
    }
}

impl ProviderConfig {
    pub fn from_config(config: &DynamicValue) -> Result<Self, ConfigError> {
        let subscription_id = string_setting(config, "subscription_id", ENV_SUBSCRIPTION_ID)
            .ok_or(ConfigError::Missing {
                attribute: "subscription_id",
                env: ENV_SUBSCRIPTION_ID,
            })?;

        let credentials = match string_setting(config, "access_token", ENV_ACCESS_TOKEN) {
            Some(token) => Credentials::AccessToken(token),
            None => {
                let required = |attribute: &'static str, env: &'static str| {
                    string_setting(config, attribute, env)
                        .ok_or(ConfigError::Missing { attribute, env })
                };
                Credentials::ClientSecret {
                    tenant_id: required("tenant_id", ENV_TENANT_ID)?,
                    client_id: required("client_id", ENV_CLIENT_ID)?,
                    client_secret: required("client_secret", ENV_CLIENT_SECRET)?,
                    authority_host: string_setting(config, "authority_host", ENV_AUTHORITY_HOST)
                        .unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.to_string()),
                }
            }
        };

        Ok(Self {
            subscription_id,
            credentials,
            resource_manager_endpoint: string_setting(
                config,
                "resource_manager_endpoint",
                ENV_RESOURCE_MANAGER_ENDPOINT,
            )
            .unwrap_or_else(|| DEFAULT_RESOURCE_MANAGER_ENDPOINT.to_string()),
            skip_provider_registration: bool_setting(
                config,
                "skip_provider_registration",
                ENV_SKIP_PROVIDER_REGISTRATION,
            )?
            .unwrap_or(false),
            features: Features::from_config(config),
        })
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tfplug::types::Dynamic;

    const ALL_ENV: [&str; 8] = [
        ENV_SUBSCRIPTION_ID,
        ENV_TENANT_ID,
        ENV_CLIENT_ID,
        ENV_CLIENT_SECRET,
        ENV_ACCESS_TOKEN,
        ENV_RESOURCE_MANAGER_ENDPOINT,
        ENV_AUTHORITY_HOST,
        ENV_SKIP_PROVIDER_REGISTRATION,
    ];

    fn clear_env() {
        for name in ALL_ENV {
            std::env::remove_var(name);
        }
    }

    fn config(pairs: &[(&str, Dynamic)]) -> DynamicValue {
        DynamicValue::new(Dynamic::Map(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        ))
    }

    #[test]
    #[serial]
    fn reads_client_secret_from_env() {
        clear_env();
        std::env::set_var(ENV_SUBSCRIPTION_ID, "sub");
        std::env::set_var(ENV_TENANT_ID, "tenant");
        std::env::set_var(ENV_CLIENT_ID, "client");
        std::env::set_var(ENV_CLIENT_SECRET, "secret");

        let parsed = ProviderConfig::from_config(&DynamicValue::null()).unwrap();
        assert_eq!(parsed.subscription_id, "sub");
        assert_eq!(parsed.resource_manager_endpoint, DEFAULT_RESOURCE_MANAGER_ENDPOINT);
        assert!(!parsed.skip_provider_registration);
        match parsed.credentials {
            Credentials::ClientSecret { authority_host, .. } => {
                assert_eq!(authority_host, DEFAULT_AUTHORITY_HOST)
            }
            other => panic!("expected client secret, got {:?}", other),
        }
        clear_env();
    }

    #[test]
    #[serial]
    fn config_values_win_over_env() {
        clear_env();
        std::env::set_var(ENV_SUBSCRIPTION_ID, "from-env");
        std::env::set_var(ENV_SKIP_PROVIDER_REGISTRATION, "false");

        let parsed = ProviderConfig::from_config(&config(&[
            ("subscription_id", Dynamic::String("from-config".into())),
            ("access_token", Dynamic::String("tok".into())),
            ("skip_provider_registration", Dynamic::Bool(true)),
        ]))
        .unwrap();

        assert_eq!(parsed.subscription_id, "from-config");
        assert!(parsed.skip_provider_registration);
        assert!(matches!(parsed.credentials, Credentials::AccessToken(_)));
        clear_env();
    }

    #[test]
    #[serial]
    fn missing_settings_name_attribute_and_env() {
        clear_env();
        let err = ProviderConfig::from_config(&DynamicValue::null()).unwrap_err();
        assert_eq!(err.to_string(), "subscription_id is required (set in provider config or ARM_SUBSCRIPTION_ID env var)");

        std::env::set_var(ENV_SUBSCRIPTION_ID, "sub");
        std::env::set_var(ENV_TENANT_ID, "tenant");
        let err = ProviderConfig::from_config(&DynamicValue::null()).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Missing {
                attribute: "client_id",
                env: ENV_CLIENT_ID
            }
        );
        clear_env();
    }

    #[test]
    #[serial]
    fn invalid_bool_env_is_rejected() {
        clear_env();
        std::env::set_var(ENV_SUBSCRIPTION_ID, "sub");
        std::env::set_var(ENV_ACCESS_TOKEN, "tok");
        std::env::set_var(ENV_SKIP_PROVIDER_REGISTRATION, "yes");

        let err = ProviderConfig::from_config(&DynamicValue::null()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBool { .. }));
        clear_env();
    }

    #[test]
    fn features_default_to_enabled_and_can_be_disabled() {
        assert_eq!(Features::from_config(&DynamicValue::null()), Features::default());

        let mut value = config(&[]);
        value
            .set_bool(
                &AttributePath::new("features")
                    .attribute("template_deployment")
                    .attribute("delete_nested_items_during_deletion"),
                false,
            )
            .unwrap();
        let features = Features::from_config(&value);
        assert!(!features.delete_nested_items_during_deletion);
        assert!(features.prevent_deletion_if_contains_resources);
    }
}
