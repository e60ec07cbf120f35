//! Resource provider and feature registration
//!
//! Registering is asynchronous on the Azure side: the register call returns
//! at once and the reported state then moves through `Registering` until it
//! settles. [`register`] and [`unregister`] start the transition and poll
//! until it completes, fails or the context deadline passes.
//!
//! Some features need approval by Microsoft before they can be used. They
//! sit in `Pending` indefinitely, which is reported as
//! [`RegistrationError::ManualApprovalRequired`] instead of waiting it out.

use crate::api::{ApiError, Client};
use crate::ids::{FeatureId, ResourceProviderId};
use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tfplug::{Context, StateChangeConf, WaitError};
use thiserror::Error;

/// Registration state as reported by ARM
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationState {
    Registering,
    Registered,
    Unregistering,
    Unregistered,
    NotRegistered,
    Pending,
    Unknown(String),
}

impl RegistrationState {
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "registering" => RegistrationState::Registering,
            "registered" => RegistrationState::Registered,
            "unregistering" => RegistrationState::Unregistering,
            "unregistered" => RegistrationState::Unregistered,
            "notregistered" => RegistrationState::NotRegistered,
            "pending" => RegistrationState::Pending,
            _ => RegistrationState::Unknown(value.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RegistrationState::Registering => "Registering",
            RegistrationState::Registered => "Registered",
            RegistrationState::Unregistering => "Unregistering",
            RegistrationState::Unregistered => "Unregistered",
            RegistrationState::NotRegistered => "NotRegistered",
            RegistrationState::Pending => "Pending",
            RegistrationState::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for RegistrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What is being registered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationTarget {
    Provider(ResourceProviderId),
    Feature(FeatureId),
}

impl fmt::Display for RegistrationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationTarget::Provider(id) => write!(
                f,
                "Resource Provider {:?} (Subscription {:?})",
                id.namespace, id.subscription_id
            ),
            RegistrationTarget::Feature(id) => write!(
                f,
                "Feature {:?} of Resource Provider {:?} (Subscription {:?})",
                id.name, id.provider_namespace, id.subscription_id
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Register,
    Unregister,
}

impl Direction {
    fn pending(self) -> Vec<RegistrationState> {
        match self {
            Direction::Register => vec![RegistrationState::Registering],
            Direction::Unregister => vec![RegistrationState::Unregistering],
        }
    }

    fn target(self) -> Vec<RegistrationState> {
        match self {
            Direction::Register => vec![RegistrationState::Registered],
            Direction::Unregister => vec![
                RegistrationState::Unregistered,
                RegistrationState::NotRegistered,
            ],
        }
    }
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error(
        "{target} is pending manual approval by Microsoft; registration cannot complete until it is approved"
    )]
    ManualApprovalRequired { target: RegistrationTarget },

    #[error("timed out waiting for {target} to reach {wanted} (last state: {last_state:?})")]
    Timeout {
        target: RegistrationTarget,
        wanted: String,
        last_state: Option<RegistrationState>,
    },

    #[error("{target} entered unexpected state {state}, wanted {wanted}")]
    UnexpectedState {
        target: RegistrationTarget,
        state: RegistrationState,
        wanted: String,
    },

    #[error("{target}: {source}")]
    Api {
        target: RegistrationTarget,
        #[source]
        source: ApiError,
    },
}

impl RegistrationError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, RegistrationError::Timeout { .. })
    }
}

fn describe(states: &[RegistrationState]) -> String {
    states
        .iter()
        .map(RegistrationState::as_str)
        .collect::<Vec<_>>()
        .join(" or ")
}

/// Polls `refresh` until the registration settles in `direction`'s target
/// states. `Pending` is never waited on.
pub async fn wait_for_registration<F, Fut>(
    ctx: &Context,
    target: &RegistrationTarget,
    direction: Direction,
    poll_interval: Duration,
    refresh: F,
) -> Result<RegistrationState, RegistrationError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<RegistrationState, ApiError>>,
{
    let conf = StateChangeConf::new(direction.pending(), direction.target(), poll_interval);
    let wanted = describe(&conf.target);
    tracing::debug!("Waiting for {} to become {}", target, wanted);

    conf.wait_for_state(ctx, refresh)
        .await
        .map_err(|err| match err {
            WaitError::Refresh(source) => RegistrationError::Api {
                target: target.clone(),
                source,
            },
            WaitError::UnexpectedState {
                state: RegistrationState::Pending,
                ..
            } => RegistrationError::ManualApprovalRequired {
                target: target.clone(),
            },
            WaitError::UnexpectedState { state, .. } => RegistrationError::UnexpectedState {
                target: target.clone(),
                state,
                wanted: wanted.clone(),
            },
            WaitError::Timeout { last_state, .. } => RegistrationError::Timeout {
                target: target.clone(),
                wanted: wanted.clone(),
                last_state,
            },
        })
}

/// Reads the current registration state
pub async fn current_state(
    client: &Client,
    ctx: &Context,
    target: &RegistrationTarget,
) -> Result<RegistrationState, ApiError> {
    let raw = match target {
        RegistrationTarget::Provider(id) => client.providers().get(ctx, id).await?.registration_state,
        RegistrationTarget::Feature(id) => client.features().get(ctx, id).await?.state().to_string(),
    };
    Ok(RegistrationState::parse(&raw))
}

/// Starts registration and waits for it to complete
pub async fn register(
    client: &Client,
    ctx: &Context,
    target: &RegistrationTarget,
) -> Result<RegistrationState, RegistrationError> {
    transition(client, ctx, target, Direction::Register).await
}

/// Starts unregistration and waits for it to complete
pub async fn unregister(
    client: &Client,
    ctx: &Context,
    target: &RegistrationTarget,
) -> Result<RegistrationState, RegistrationError> {
    transition(client, ctx, target, Direction::Unregister).await
}

async fn transition(
    client: &Client,
    ctx: &Context,
    target: &RegistrationTarget,
    direction: Direction,
) -> Result<RegistrationState, RegistrationError> {
    let started = match (target, direction) {
        (RegistrationTarget::Provider(id), Direction::Register) => {
            client.providers().register(ctx, id).await
        }
        (RegistrationTarget::Provider(id), Direction::Unregister) => {
            client.providers().unregister(ctx, id).await
        }
        (RegistrationTarget::Feature(id), Direction::Register) => {
            client.features().register(ctx, id).await
        }
        (RegistrationTarget::Feature(id), Direction::Unregister) => {
            client.features().unregister(ctx, id).await
        }
    };
    started.map_err(|source| RegistrationError::Api {
        target: target.clone(),
        source,
    })?;

    let poll_interval = client.config().registration_poll_interval;
    let state = wait_for_registration(ctx, target, direction, poll_interval, || {
        current_state(client, ctx, target)
    })
    .await?;

    tracing::info!("{} is {}", target, state);
    Ok(state)
}

/// Resource providers the provider registers on configure unless told not to
pub fn default_managed_providers() -> BTreeSet<String> {
    [
        "Microsoft.Authorization",
        "Microsoft.Compute",
        "Microsoft.Features",
        "Microsoft.Insights",
        "Microsoft.KeyVault",
        "Microsoft.Management",
        "Microsoft.Network",
        "Microsoft.Resources",
        "Microsoft.Storage",
        "Microsoft.Web",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Starts registration of every provider in `required` that the subscription
/// has not registered yet. Does not wait for the registrations to finish.
pub async fn ensure_registered(
    client: &Client,
    ctx: &Context,
    subscription_id: &str,
    required: &BTreeSet<String>,
) -> Result<Vec<String>, ApiError> {
    let available = client.providers().list(ctx, subscription_id).await?;
    let mut started = Vec::new();

    for namespace in required {
        let Some(provider) = available
            .iter()
            .find(|p| p.namespace.eq_ignore_ascii_case(namespace))
        else {
            tracing::warn!(
                "Resource provider {} is not available in subscription {}",
                namespace,
                subscription_id
            );
            continue;
        };

        if RegistrationState::parse(&provider.registration_state) == RegistrationState::Registered {
            continue;
        }

        let id = ResourceProviderId::new(subscription_id, &provider.namespace);
        client.providers().register(ctx, &id).await?;
        started.push(provider.namespace.clone());
    }

    Ok(started)
}
