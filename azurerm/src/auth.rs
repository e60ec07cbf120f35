//! Bearer tokens for the management endpoint
//!
//! Either a static access token or an OAuth2 client-credentials grant against
//! `{authority_host}/{tenant_id}/oauth2/v2.0/token`. Grant tokens are cached
//! and refreshed shortly before they expire.

use crate::api::ApiError;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Tokens are refreshed this long before their reported expiry
const EXPIRY_MARGIN: Duration = Duration::from_secs(300);

#[derive(Clone)]
pub enum Credentials {
    AccessToken(String),
    ClientSecret {
        tenant_id: String,
        client_id: String,
        client_secret: String,
        authority_host: String,
    },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::AccessToken(_) => f.write_str("AccessToken(<redacted>)"),
            Credentials::ClientSecret {
                tenant_id,
                client_id,
                authority_host,
                ..
            } => f
                .debug_struct("ClientSecret")
                .field("tenant_id", tenant_id)
                .field("client_id", client_id)
                .field("authority_host", authority_host)
                .finish_non_exhaustive(),
        }
    }
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

pub struct TokenSource {
    credentials: Credentials,
    scope: String,
    cached: RwLock<Option<CachedToken>>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<ExpiresIn>,
}

/// AAD v1 endpoints return `expires_in` as a string
#[derive(Deserialize)]
#[serde(untagged)]
enum ExpiresIn {
    Seconds(u64),
    Text(String),
}

impl ExpiresIn {
    fn seconds(&self) -> u64 {
        match self {
            ExpiresIn::Seconds(s) => *s,
            ExpiresIn::Text(s) => s.parse().unwrap_or(0),
        }
    }
}

impl TokenSource {
    /// `resource_manager_endpoint` determines the token audience
    pub fn new(credentials: Credentials, resource_manager_endpoint: &str) -> Self {
        Self {
            credentials,
            scope: format!("{}/.default", resource_manager_endpoint.trim_end_matches('/')),
            cached: RwLock::new(None),
        }
    }

    pub async fn bearer(&self, http: &reqwest::Client) -> Result<String, ApiError> {
        let (tenant_id, client_id, client_secret, authority_host) = match &self.credentials {
            Credentials::AccessToken(token) => return Ok(format!("Bearer {}", token)),
            Credentials::ClientSecret {
                tenant_id,
                client_id,
                client_secret,
                authority_host,
            } => (tenant_id, client_id, client_secret, authority_host),
        };

        if let Some(token) = self.cached.read().await.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(format!("Bearer {}", token.value));
            }
        }

        let mut cached = self.cached.write().await;
        // Another request may have refreshed while we waited for the lock
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(format!("Bearer {}", token.value));
            }
        }

        let url = format!(
            "{}/{}/oauth2/v2.0/token",
            authority_host.trim_end_matches('/'),
            tenant_id
        );
        tracing::debug!("Requesting token from {} for client {}", url, client_id);

        let response = http
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
                ("scope", self.scope.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            tracing::error!("Token request failed with HTTP {}", status);
            return Err(ApiError::AuthError(format!(
                "token endpoint returned HTTP {}: {}",
                status.as_u16(),
                text
            )));
        }

        let token: TokenResponse = serde_json::from_str(&text)
            .map_err(|e| ApiError::ParseError(format!("token response: {}", e)))?;
        let lifetime = Duration::from_secs(token.expires_in.map_or(0, |e| e.seconds()));

        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime.saturating_sub(EXPIRY_MARGIN),
        });

        Ok(format!("Bearer {}", token.access_token))
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn client_secret(authority_host: String) -> Credentials {
        Credentials::ClientSecret {
            tenant_id: "tenant-1".to_string(),
            client_id: "app-1".to_string(),
            client_secret: "s3cret".to_string(),
            authority_host,
        }
    }

    #[tokio::test]
    async fn static_token_needs_no_request() {
        let source = TokenSource::new(
            Credentials::AccessToken("abc".to_string()),
            "https://management.azure.com",
        );
        let bearer = source.bearer(&reqwest::Client::new()).await.unwrap();
        assert_eq!(bearer, "Bearer abc");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn client_credentials_token_is_cached() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/tenant-1/oauth2/v2.0/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "client_credentials".into()),
                Matcher::UrlEncoded("client_id".into(), "app-1".into()),
                Matcher::UrlEncoded(
                    "scope".into(),
                    "https://management.azure.com/.default".into(),
                ),
            ]))
            .with_body(r#"{"access_token":"tok-1","expires_in":3599,"token_type":"Bearer"}"#)
            .expect(1)
            .create_async()
            .await;

        let source = TokenSource::new(client_secret(server.url()), "https://management.azure.com/");
        let http = reqwest::Client::new();

        assert_eq!(source.bearer(&http).await.unwrap(), "Bearer tok-1");
        assert_eq!(source.bearer(&http).await.unwrap(), "Bearer tok-1");

        mock.assert_async().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn rejected_credentials_are_auth_errors() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/tenant-1/oauth2/v2.0/token")
            .with_status(401)
            .with_body(r#"{"error":"invalid_client"}"#)
            .create_async()
            .await;

        let source = TokenSource::new(client_secret(server.url()), "https://management.azure.com");
        let err = source.bearer(&reqwest::Client::new()).await.unwrap_err();
        assert!(matches!(err, ApiError::AuthError(_)));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let rendered = format!("{:?}", client_secret("https://login".to_string()));
        assert!(!rendered.contains("s3cret"));
        assert!(format!("{:?}", Credentials::AccessToken("abc".into())).contains("redacted"));
    }
}
