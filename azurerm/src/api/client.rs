use reqwest::header::{HeaderMap, AUTHORIZATION};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tfplug::Context;

use super::common::{ErrorResponse, ListResponse, OperationStatus, QueryParams};
use super::error::ApiError;
use super::pool::ConnectionPoolConfig;
use crate::auth::{Credentials, TokenSource};

/// Azure Resource Manager API client
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    tokens: TokenSource,
    config: ClientConfig,
}

#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            timeout_seconds: 60,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub retry: RetryConfig,
    /// Used when a long-running operation does not send `Retry-After`
    pub lro_poll_interval: Duration,
    /// Interval between registration state polls
    pub registration_poll_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            lro_poll_interval: Duration::from_secs(10),
            registration_poll_interval: Duration::from_secs(10),
        }
    }
}

/// A successful HTTP exchange, before any long-running operation is followed
#[derive(Debug)]
pub struct RawResponse {
    pub status: u16,
    pub async_operation: Option<String>,
    pub location: Option<String>,
    pub retry_after: Option<Duration>,
    pub body: String,
}

impl RawResponse {
    async fn read(response: reqwest::Response) -> Result<Self, ApiError> {
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.text().await?;
        tracing::debug!("API response (HTTP {}): {}", status, body);

        Ok(Self {
            status,
            async_operation: header(&headers, "azure-asyncoperation"),
            location: header(&headers, "location"),
            retry_after: header(&headers, "retry-after")
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs),
            body,
        })
    }

    /// 201/202 with a status URL means the operation continues server-side
    pub fn is_in_progress(&self) -> bool {
        matches!(self.status, 201 | 202)
            && (self.async_operation.is_some() || self.location.is_some())
    }

    pub fn has_body(&self) -> bool {
        !self.body.trim().is_empty()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_str(&self.body).map_err(|e| {
            tracing::error!("Failed to deserialize response: {}, body: {}", e, self.body);
            ApiError::ParseError(format!("Failed to parse response: {}", e))
        })
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

impl Client {
    /// Create a new API client with default configuration
    pub fn new(endpoint: &str, credentials: Credentials) -> Result<Self, ApiError> {
        Self::with_config(endpoint, credentials, ClientConfig::default())
    }

    /// Create a new API client with custom retry and polling configuration
    pub fn with_config(
        endpoint: &str,
        credentials: Credentials,
        config: ClientConfig,
    ) -> Result<Self, ApiError> {
        let parsed =
            url::Url::parse(endpoint).map_err(|_| ApiError::InvalidEndpoint(endpoint.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::InvalidEndpoint(endpoint.to_string()));
        }

        let pool_config = ConnectionPoolConfig {
            request_timeout: Duration::from_secs(config.retry.timeout_seconds),
            ..Default::default()
        };
        let http_client = pool_config.build_client()?;
        let base_url = endpoint.trim_end_matches('/').to_string();

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                tokens: TokenSource::new(credentials, &base_url),
                base_url,
                config,
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Resource group operations
    pub fn resource_groups(&self) -> super::resource_groups::ResourceGroupsApi<'_> {
        super::resource_groups::ResourceGroupsApi::new(self)
    }

    /// Resource provider operations
    pub fn providers(&self) -> super::providers::ProvidersApi<'_> {
        super::providers::ProvidersApi::new(self)
    }

    /// Preview feature operations
    pub fn features(&self) -> super::features::FeaturesApi<'_> {
        super::features::FeaturesApi::new(self)
    }

    /// Management lock operations
    pub fn locks(&self) -> super::locks::LocksApi<'_> {
        super::locks::LocksApi::new(self)
    }

    /// Resource group template deployment operations
    pub fn deployments(&self) -> super::deployments::DeploymentsApi<'_> {
        super::deployments::DeploymentsApi::new(self)
    }

    /// Resource management private link association operations
    pub fn private_link_associations(
        &self,
    ) -> super::private_link_associations::PrivateLinkAssociationsApi<'_> {
        super::private_link_associations::PrivateLinkAssociationsApi::new(self)
    }

    /// Generic operations on arbitrary resource IDs
    pub fn resources(&self) -> super::resources::ResourcesApi<'_> {
        super::resources::ResourcesApi::new(self)
    }

    /// Execute a GET request with retry logic
    pub async fn get<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        path: &str,
        api_version: &str,
    ) -> Result<T, ApiError> {
        self.request(ctx, Method::GET, path, api_version, None)
            .await?
            .json()
    }

    /// GET every page of a list operation
    pub async fn list<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        path: &str,
        api_version: &str,
    ) -> Result<Vec<T>, ApiError> {
        let mut page: ListResponse<T> = self.get(ctx, path, api_version).await?;
        let mut items = std::mem::take(&mut page.value);

        while let Some(next) = page.next_link.take().filter(|link| !link.is_empty()) {
            page = self
                .send(ctx, Method::GET, &next, &QueryParams::new(), None)
                .await?
                .json()?;
            items.append(&mut page.value);
        }

        Ok(items)
    }

    /// Execute a PUT request and wait for the resource to be provisioned
    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        ctx: &Context,
        path: &str,
        api_version: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = to_json(body)?;
        let initial = self
            .request(ctx, Method::PUT, path, api_version, Some(&body))
            .await?;
        self.finish_write(ctx, Method::PUT, path, api_version, initial)
            .await
    }

    /// Execute a PATCH request and wait for it to apply
    pub async fn patch<T: DeserializeOwned, B: Serialize>(
        &self,
        ctx: &Context,
        path: &str,
        api_version: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = to_json(body)?;
        let initial = self
            .request(ctx, Method::PATCH, path, api_version, Some(&body))
            .await?;
        self.finish_write(ctx, Method::PATCH, path, api_version, initial)
            .await
    }

    /// Execute a POST action. Returns the final body, if the action has one.
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        ctx: &Context,
        path: &str,
        api_version: &str,
        body: Option<&B>,
    ) -> Result<Option<T>, ApiError> {
        let body = body.map(to_json).transpose()?;
        let initial = self
            .request(ctx, Method::POST, path, api_version, body.as_ref())
            .await?;
        let operation = format!("POST {}", path);
        let completed = self.wait_for_completion(ctx, &operation, initial).await?;

        if completed.has_body() {
            completed.json().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Execute a DELETE request and wait for the deletion to finish
    pub async fn delete(&self, ctx: &Context, path: &str, api_version: &str) -> Result<(), ApiError> {
        let initial = self
            .request(ctx, Method::DELETE, path, api_version, None)
            .await?;
        let operation = format!("DELETE {}", path);
        self.wait_for_completion(ctx, &operation, initial).await?;
        Ok(())
    }

    async fn finish_write<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        method: Method,
        path: &str,
        api_version: &str,
        initial: RawResponse,
    ) -> Result<T, ApiError> {
        let tracked = initial.is_in_progress();
        let operation = format!("{} {}", method, path);
        let completed = self.wait_for_completion(ctx, &operation, initial).await?;

        // An Azure-AsyncOperation status document is not the resource
        if tracked || !completed.has_body() {
            return self.get(ctx, path, api_version).await;
        }
        completed.json()
    }

    async fn request(
        &self,
        ctx: &Context,
        method: Method,
        path: &str,
        api_version: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<RawResponse, ApiError> {
        let url = format!("{}{}", self.inner.base_url, path);
        self.send(ctx, method, &url, &QueryParams::api_version(api_version), body)
            .await
    }

    /// Follow a long-running operation until it reaches a terminal state
    async fn wait_for_completion(
        &self,
        ctx: &Context,
        operation: &str,
        initial: RawResponse,
    ) -> Result<RawResponse, ApiError> {
        if !initial.is_in_progress() {
            return Ok(initial);
        }

        let poll_interval = self.inner.config.lro_poll_interval;
        let mut wait = initial.retry_after.unwrap_or(poll_interval);

        if let Some(status_url) = initial.async_operation.clone() {
            loop {
                self.sleep_within(ctx, wait, operation).await?;
                let response = self
                    .send(ctx, Method::GET, &status_url, &QueryParams::new(), None)
                    .await?;
                let status: OperationStatus = response.json()?;
                tracing::debug!("{} is {}", operation, status.status);

                if status.is_terminal() {
                    if status.is_success() {
                        return Ok(initial);
                    }
                    let error = status.error.unwrap_or_default();
                    return Err(ApiError::OperationFailed {
                        status: status.status,
                        code: error.code,
                        message: error.message,
                    });
                }
                wait = response.retry_after.unwrap_or(poll_interval);
            }
        }

        let Some(location) = initial.location.clone() else {
            return Ok(initial);
        };
        loop {
            self.sleep_within(ctx, wait, operation).await?;
            let response = self
                .send(ctx, Method::GET, &location, &QueryParams::new(), None)
                .await?;
            if response.status != 202 {
                return Ok(response);
            }
            tracing::debug!("{} still in progress", operation);
            wait = response.retry_after.unwrap_or(poll_interval);
        }
    }

    async fn sleep_within(&self, ctx: &Context, wait: Duration, operation: &str) -> Result<(), ApiError> {
        if ctx.is_expired() {
            return Err(deadline(operation));
        }
        tokio::time::sleep(ctx.bounded(wait)).await;
        if ctx.is_expired() {
            return Err(deadline(operation));
        }
        Ok(())
    }

    /// Send one request to an absolute URL, retrying throttling and server errors
    pub(crate) async fn send(
        &self,
        ctx: &Context,
        method: Method,
        url: &str,
        query: &QueryParams,
        body: Option<&serde_json::Value>,
    ) -> Result<RawResponse, ApiError> {
        let bearer = self.inner.tokens.bearer(&self.inner.http_client).await?;
        let pairs: Vec<(&str, &str)> = query.pairs().collect();
        let label = format!("{} {}", method, url);

        self.execute_with_retry(
            ctx,
            |timeout| {
                tracing::debug!("{} request to: {}", method, url);

                let mut request = self
                    .inner
                    .http_client
                    .request(method.clone(), url)
                    .header(AUTHORIZATION, &bearer)
                    .timeout(timeout);
                if !pairs.is_empty() {
                    request = request.query(&pairs);
                }
                if let Some(body) = body {
                    request = request.json(body);
                }
                request.send()
            },
            &label,
        )
        .await
    }

    /// Execute request with retry logic
    async fn execute_with_retry<F, Fut>(
        &self,
        ctx: &Context,
        request_fn: F,
        label: &str,
    ) -> Result<RawResponse, ApiError>
    where
        F: Fn(Duration) -> Fut,
        Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
    {
        let retry = &self.inner.config.retry;
        let request_timeout = Duration::from_secs(retry.timeout_seconds);
        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= retry.max_retries {
            if attempt > 0 {
                let backoff = std::cmp::min(
                    retry.initial_backoff_ms * (2_u64.pow(attempt - 1)),
                    retry.max_backoff_ms,
                );
                tracing::debug!(
                    "Retrying {} after {}ms (attempt {})",
                    label,
                    backoff,
                    attempt
                );
                tokio::time::sleep(ctx.bounded(Duration::from_millis(backoff))).await;
            }

            if ctx.is_expired() {
                return Err(deadline(label));
            }

            match request_fn(ctx.bounded(request_timeout)).await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return RawResponse::read(response).await;
                    }

                    if status == reqwest::StatusCode::UNAUTHORIZED {
                        let text = response.text().await.unwrap_or_default();
                        return Err(ApiError::AuthError(text));
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(ApiError::RateLimited);
                    } else if status.is_server_error() {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return Err(Self::error_response(response).await);
                    }
                }
                Err(e) => {
                    if e.is_timeout() {
                        if ctx.is_expired() {
                            return Err(deadline(label));
                        }
                        last_error = Some(ApiError::Timeout(retry.timeout_seconds));
                    } else if e.is_connect() || e.is_request() {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return Err(ApiError::RequestError(e));
                    }
                }
            }

            attempt += 1;
        }

        Err(last_error.unwrap_or(ApiError::ServiceUnavailable))
    }

    /// Turn a non-retryable error response into an [`ApiError`]
    async fn error_response(response: reqwest::Response) -> ApiError {
        let status = response.status();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        tracing::debug!("API error response (HTTP {}): {}", status, text);

        match serde_json::from_str::<ErrorResponse>(&text) {
            Ok(parsed) => ApiError::ApiError {
                status: status.as_u16(),
                code: parsed.error.code.clone(),
                message: parsed.error.message.clone(),
                details: Some(Box::new(parsed.error)),
            },
            Err(_) => ApiError::ApiError {
                status: status.as_u16(),
                code: status.canonical_reason().unwrap_or("Unknown").to_string(),
                message: text,
                details: None,
            },
        }
    }
}

fn to_json<B: Serialize>(body: &B) -> Result<serde_json::Value, ApiError> {
    serde_json::to_value(body).map_err(|e| ApiError::ParseError(format!("request body: {}", e)))
}

fn deadline(operation: &str) -> ApiError {
    tracing::warn!("Deadline exceeded during {}", operation);
    ApiError::DeadlineExceeded {
        operation: operation.to_string(),
    }
}
