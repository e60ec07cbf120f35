//! Deleting the resources a template deployment created
//!
//! Output resources often depend on each other (a subnet before its virtual
//! network, a role assignment before its scope), and the deployment does not
//! say in which order. Deletion therefore runs in rounds: every remaining
//! resource is attempted once per round, and another round follows as long
//! as the previous one deleted something. A round without progress ends the
//! cleanup with its first error.

use super::api_versions::{ApiVersionError, ApiVersions};
use crate::api::deployments::ResourceReference;
use crate::api::{ApiError, Client};
use crate::ids::{IdParseError, NestedResourceId, ResourceIdentifier};
use async_trait::async_trait;
use std::collections::HashSet;
use tfplug::Context;
use thiserror::Error;

const NO_REGISTERED_PROVIDER: &str = "NoRegisteredProviderFound";
const SUPPORTED_VERSIONS_MARKER: &str = "The supported api-versions are '";

/// A resource to delete and the API version to delete it with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedResource {
    pub id: String,
    pub api_version: String,
}

impl NestedResource {
    pub fn new(id: impl Into<String>, api_version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            api_version: api_version.into(),
        }
    }
}

#[async_trait]
pub trait NestedResourceDeleter: Send + Sync {
    /// Deletes the resource and waits for the deletion to finish
    async fn delete_nested(&self, ctx: &Context, id: &str, api_version: &str)
        -> Result<(), ApiError>;
}

#[async_trait]
impl NestedResourceDeleter for Client {
    async fn delete_nested(
        &self,
        ctx: &Context,
        id: &str,
        api_version: &str,
    ) -> Result<(), ApiError> {
        self.resources().delete_by_id(ctx, id, api_version).await
    }
}

#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("timed out deleting nested resources, {} remaining: {remaining:?}", .remaining.len())]
    Timeout { remaining: Vec<String> },

    #[error("deleting nested resource {id:?}: {source}")]
    Delete {
        id: String,
        #[source]
        source: ApiError,
    },

    #[error("parsing nested resource ID {id:?}: {source}")]
    InvalidReference {
        id: String,
        #[source]
        source: IdParseError,
    },

    #[error(transparent)]
    ApiVersion(#[from] ApiVersionError),
}

impl CleanupError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, CleanupError::Timeout { .. })
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub rounds: u32,
    /// IDs in the order they were deleted
    pub deleted: Vec<String>,
}

/// Pairs each output resource with the API version resolved for its type
pub fn plan_nested_resources(
    references: &[ResourceReference],
    versions: &ApiVersions,
) -> Result<Vec<NestedResource>, CleanupError> {
    references
        .iter()
        .map(|reference| {
            let id = NestedResourceId::parse(&reference.id).map_err(|source| {
                CleanupError::InvalidReference {
                    id: reference.id.clone(),
                    source,
                }
            })?;
            let version = versions.for_resource(&id).ok_or_else(|| {
                ApiVersionError::UnresolvedType {
                    namespace: id.namespace().to_string(),
                    resource_type: id.resource_type(),
                }
            })?;
            Ok(NestedResource::new(reference.id.clone(), version))
        })
        .collect()
}

/// Deletes every resource in `resources`, retrying in rounds while progress
/// is made. Resources that are already gone count as deleted.
pub async fn delete_nested_resources(
    deleter: &dyn NestedResourceDeleter,
    ctx: &Context,
    resources: &[NestedResource],
) -> Result<CleanupReport, CleanupError> {
    let mut seen = HashSet::new();
    let mut remaining: Vec<&NestedResource> = resources
        .iter()
        .filter(|r| seen.insert(r.id.to_ascii_lowercase()))
        .collect();
    let mut report = CleanupReport::default();

    while !remaining.is_empty() {
        report.rounds += 1;
        tracing::debug!(
            "Nested resource cleanup round {}: {} remaining",
            report.rounds,
            remaining.len()
        );

        let mut failed: Vec<&NestedResource> = Vec::new();
        let mut first_error: Option<CleanupError> = None;
        let mut progressed = false;

        for (index, &resource) in remaining.iter().enumerate() {
            if ctx.is_expired() {
                let mut left: Vec<String> = failed.iter().map(|r| r.id.clone()).collect();
                left.extend(remaining[index..].iter().map(|r| r.id.clone()));
                return Err(timeout(left));
            }

            match delete_one(deleter, ctx, resource).await {
                Ok(()) => {
                    tracing::info!("Deleted nested resource {}", resource.id);
                    report.deleted.push(resource.id.clone());
                    progressed = true;
                }
                Err(err) if err.is_not_found() => {
                    tracing::debug!("Nested resource {} was already gone", resource.id);
                    report.deleted.push(resource.id.clone());
                    progressed = true;
                }
                Err(err) if err.is_deadline() => {
                    let mut left: Vec<String> = failed.iter().map(|r| r.id.clone()).collect();
                    left.extend(remaining[index..].iter().map(|r| r.id.clone()));
                    return Err(timeout(left));
                }
                Err(err) => {
                    tracing::debug!("Deleting {} failed this round: {}", resource.id, err);
                    first_error.get_or_insert(CleanupError::Delete {
                        id: resource.id.clone(),
                        source: err,
                    });
                    failed.push(resource);
                }
            }
        }

        if !progressed {
            if let Some(err) = first_error {
                tracing::error!("Nested resource cleanup made no progress: {}", err);
                return Err(err);
            }
        }
        remaining = failed;
    }

    Ok(report)
}

async fn delete_one(
    deleter: &dyn NestedResourceDeleter,
    ctx: &Context,
    resource: &NestedResource,
) -> Result<(), ApiError> {
    let err = match deleter
        .delete_nested(ctx, &resource.id, &resource.api_version)
        .await
    {
        Ok(()) => return Ok(()),
        Err(err) => err,
    };

    let Some(fallback) = fallback_api_version(&err) else {
        return Err(err);
    };
    if fallback == resource.api_version {
        return Err(err);
    }

    tracing::debug!(
        "API version {} rejected for {}, retrying with {}",
        resource.api_version,
        resource.id,
        fallback
    );
    deleter.delete_nested(ctx, &resource.id, &fallback).await
}

/// The first version named in a `NoRegisteredProviderFound` message:
/// "... The supported api-versions are '2019-06-01, 2020-01-01'. ..."
fn fallback_api_version(err: &ApiError) -> Option<String> {
    let message = err.message()?;
    let is_version_error = err.code() == Some(NO_REGISTERED_PROVIDER)
        || message.contains("No registered resource provider found");
    if !is_version_error {
        return None;
    }

    let start = message.find(SUPPORTED_VERSIONS_MARKER)? + SUPPORTED_VERSIONS_MARKER.len();
    let listed = &message[start..];
    let listed = &listed[..listed.find('\'')?];
    listed
        .split(',')
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

fn timeout(remaining: Vec<String>) -> CleanupError {
    tracing::warn!(
        "Deadline reached with {} nested resources left",
        remaining.len()
    );
    CleanupError::Timeout { remaining }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    type Rule = Box<dyn Fn(&HashSet<String>, &str) -> Result<(), ApiError> + Send + Sync>;

    /// Deletes succeed or fail according to per-ID rules over what has
    /// already been deleted
    struct FakeDeleter {
        rules: HashMap<String, Rule>,
        deleted: Mutex<HashSet<String>>,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl FakeDeleter {
        fn new(rules: Vec<(&str, Rule)>) -> Self {
            Self {
                rules: rules
                    .into_iter()
                    .map(|(id, rule)| (id.to_string(), rule))
                    .collect(),
                deleted: Mutex::new(HashSet::new()),
                calls: Mutex::new(vec![]),
            }
        }

        fn calls(&self) -> Vec<(String, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NestedResourceDeleter for FakeDeleter {
        async fn delete_nested(
            &self,
            _ctx: &Context,
            id: &str,
            api_version: &str,
        ) -> Result<(), ApiError> {
            self.calls
                .lock()
                .unwrap()
                .push((id.to_string(), api_version.to_string()));
            let mut deleted = self.deleted.lock().unwrap();
            let result = match self.rules.get(id) {
                Some(rule) => rule(&*deleted, api_version),
                None => Ok(()),
            };
            if result.is_ok() {
                deleted.insert(id.to_string());
            }
            result
        }
    }

    fn api_error(status: u16, code: &str, message: &str) -> ApiError {
        ApiError::ApiError {
            status,
            code: code.to_string(),
            message: message.to_string(),
            details: None,
        }
    }

    fn rule(
        f: impl Fn(&HashSet<String>, &str) -> Result<(), ApiError> + Send + Sync + 'static,
    ) -> Rule {
        Box::new(f)
    }

    fn requires_deleted(other: &'static str) -> Rule {
        rule(move |deleted, _| {
            if deleted.contains(other) {
                Ok(())
            } else {
                Err(api_error(409, "Conflict", "still in use"))
            }
        })
    }

    fn resources(ids: &[&str]) -> Vec<NestedResource> {
        ids.iter()
            .map(|id| NestedResource::new(*id, "2021-01-01"))
            .collect()
    }

    #[tokio::test]
    async fn dependent_resources_converge_in_two_rounds() {
        let deleter = FakeDeleter::new(vec![
            ("A", requires_deleted("B")),
            ("C", requires_deleted("A")),
        ]);

        let report = delete_nested_resources(&deleter, &Context::new(), &resources(&["A", "B", "C"]))
            .await
            .unwrap();

        assert_eq!(report.rounds, 2);
        assert_eq!(report.deleted, vec!["B", "A", "C"]);
        let attempted: Vec<String> = deleter.calls().into_iter().map(|(id, _)| id).collect();
        assert_eq!(attempted, vec!["A", "B", "C", "A", "C"]);
    }

    #[tokio::test]
    async fn not_found_counts_as_deleted() {
        let deleter = FakeDeleter::new(vec![(
            "gone",
            rule(|_, _| Err(api_error(404, "ResourceNotFound", "not found"))),
        )]);

        let report = delete_nested_resources(&deleter, &Context::new(), &resources(&["gone"]))
            .await
            .unwrap();

        assert_eq!(report.rounds, 1);
        assert_eq!(report.deleted, vec!["gone"]);
        assert_eq!(deleter.calls().len(), 1);
    }

    #[tokio::test]
    async fn persistent_failure_stops_after_one_round() {
        let deleter = FakeDeleter::new(vec![(
            "stuck",
            rule(|_, _| Err(api_error(409, "ScopeLocked", "locked"))),
        )]);

        let err = delete_nested_resources(&deleter, &Context::new(), &resources(&["stuck"]))
            .await
            .unwrap_err();

        match err {
            CleanupError::Delete { id, source } => {
                assert_eq!(id, "stuck");
                assert_eq!(source.code(), Some("ScopeLocked"));
            }
            other => panic!("expected delete error, got {:?}", other),
        }
        assert_eq!(deleter.calls().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_references_are_deleted_once() {
        let deleter = FakeDeleter::new(vec![]);
        let report = delete_nested_resources(
            &deleter,
            &Context::new(),
            &resources(&["/x/a", "/X/A", "/x/b"]),
        )
        .await
        .unwrap();

        assert_eq!(report.deleted, vec!["/x/a", "/x/b"]);
    }

    #[tokio::test]
    async fn rejected_api_version_is_retried_with_supported_one() {
        let deleter = FakeDeleter::new(vec![(
            "vnet",
            rule(|_, version| {
                if version == "2021-04-01" {
                    Ok(())
                } else {
                    Err(api_error(
                        400,
                        "NoRegisteredProviderFound",
                        "No registered resource provider found for location 'westeurope' and API version '2099-01-01' for type 'virtualNetworks'. The supported api-versions are '2021-04-01, 2021-06-01'. The supported locations are 'westeurope'.",
                    ))
                }
            }),
        )]);

        let report = delete_nested_resources(
            &deleter,
            &Context::new(),
            &[NestedResource::new("vnet", "2099-01-01")],
        )
        .await
        .unwrap();

        assert_eq!(report.deleted, vec!["vnet"]);
        assert_eq!(
            deleter.calls(),
            vec![
                ("vnet".to_string(), "2099-01-01".to_string()),
                ("vnet".to_string(), "2021-04-01".to_string()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn expired_deadline_is_a_timeout() {
        let deleter = FakeDeleter::new(vec![]);
        let ctx = Context::new().with_timeout(Duration::ZERO);

        let err = delete_nested_resources(&deleter, &ctx, &resources(&["A", "B"]))
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        match err {
            CleanupError::Timeout { remaining } => assert_eq!(remaining, vec!["A", "B"]),
            other => panic!("expected timeout, got {:?}", other),
        }
        assert!(deleter.calls().is_empty());
    }

    #[tokio::test]
    async fn deadline_inside_a_delete_is_a_timeout() {
        let deleter = FakeDeleter::new(vec![(
            "slow",
            rule(|_, _| {
                Err(ApiError::DeadlineExceeded {
                    operation: "DELETE slow".to_string(),
                })
            }),
        )]);

        let err = delete_nested_resources(&deleter, &Context::new(), &resources(&["ok", "slow"]))
            .await
            .unwrap_err();

        match err {
            CleanupError::Timeout { remaining } => assert_eq!(remaining, vec!["slow"]),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn request_timeout_fails_the_reference_not_the_round() {
        let deleter = FakeDeleter::new(vec![("slow", rule(|_, _| Err(ApiError::Timeout(60))))]);
        let ctx = Context::new().with_timeout(Duration::from_secs(3600));

        let err = delete_nested_resources(&deleter, &ctx, &resources(&["slow", "b"]))
            .await
            .unwrap_err();

        match err {
            CleanupError::Delete { id, source } => {
                assert_eq!(id, "slow");
                assert!(matches!(source, ApiError::Timeout(60)));
            }
            other => panic!("expected delete error, got {:?}", other),
        }
        let attempted: Vec<String> = deleter.calls().into_iter().map(|(id, _)| id).collect();
        assert_eq!(attempted, vec!["slow", "b", "slow"]);
        assert!(deleter.deleted.lock().unwrap().contains("b"));
    }

    #[test]
    fn extracts_first_supported_version() {
        let err = api_error(
            400,
            "NoRegisteredProviderFound",
            "No registered resource provider found. The supported api-versions are '2019-06-01, 2020-01-01'.",
        );
        assert_eq!(fallback_api_version(&err).as_deref(), Some("2019-06-01"));
        assert_eq!(
            fallback_api_version(&api_error(400, "InvalidRequest", "bad")),
            None
        );
    }

    #[test]
    fn plans_versions_for_output_resources() {
        let mut versions = ApiVersions::default();
        versions.insert("Microsoft.Network", "virtualNetworks", "2023-05-01");
        let references = vec![ResourceReference {
            id: "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/vn/subnets/default".to_string(),
        }];

        let planned = plan_nested_resources(&references, &versions).unwrap();
        assert_eq!(planned[0].api_version, "2023-05-01");

        let unknown = vec![ResourceReference {
            id: "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Web/sites/app".to_string(),
        }];
        assert!(matches!(
            plan_nested_resources(&unknown, &versions),
            Err(CleanupError::ApiVersion(ApiVersionError::UnresolvedType { .. }))
        ));
    }
}
