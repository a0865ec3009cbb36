//! HTTP client implementation using reqwest

use crate::config::{ConnectionConfig, SafeLogging};
use crate::http::error::{map_http_error, map_transport_error};
use crate::http::{ByteStream, HttpExecutor, HttpMethod, ProviderRequest, RequestOptions};
use crate::providers::{ProviderError, ProviderResult, ProviderType};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, ClientBuilder, RequestBuilder, Response};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Default user agent
const USER_AGENT: &str = concat!("domchat/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client with connection pooling
///
/// Cloning is cheap; clones share one connection pool.
#[derive(Clone)]
pub struct HttpClient {
    /// The underlying reqwest client
    client: Arc<Client>,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> ProviderResult<Self> {
        Self::from_connection(&ConnectionConfig::default())
    }

    /// Create a new HTTP client with custom configuration
    ///
    /// No overall client timeout is set: streamed responses may legitimately
    /// run long. Complete-body requests get a per-request deadline instead.
    pub fn with_config(
        connect_timeout: Duration,
        max_idle_per_host: usize,
    ) -> ProviderResult<Self> {
        let client = ClientBuilder::new()
            .pool_max_idle_per_host(max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(connect_timeout)
            .user_agent(USER_AGENT)
            .gzip(true)
            .build()
            .map_err(|e| {
                ProviderError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// Create a client from the `connection` section of the configuration
    pub fn from_connection(connection: &ConnectionConfig) -> ProviderResult<Self> {
        Self::with_config(connection.connect_timeout(), connection.max_idle_per_host)
    }

    fn build(&self, request: &ProviderRequest, options: &RequestOptions) -> RequestBuilder {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        // Add request ID header for correlation
        builder = builder.header("X-Request-ID", options.request_id.to_string());

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        builder
    }

    /// Send and fail fast on a non-success status
    async fn send(
        &self,
        provider: ProviderType,
        builder: RequestBuilder,
        options: &RequestOptions,
    ) -> ProviderResult<Response> {
        let request_id = options.request_id;

        let response = builder
            .send()
            .await
            .map_err(|e| map_transport_error(provider, &e, request_id))?;

        let status = response.status();
        debug!("Response status: {} [request_id: {}]", status, request_id);

        if !status.is_success() {
            let body = response.text().await.ok();

            warn!(
                "Request failed with status {} for {} [request_id: {}]",
                status, provider, request_id
            );
            if let Some(body) = &body {
                debug!("Error body from {} [request_id: {}]: {}", provider, request_id, body);
            }

            return Err(map_http_error(provider, status, body.as_deref(), request_id));
        }

        Ok(response)
    }
}

#[async_trait]
impl HttpExecutor for HttpClient {
    async fn execute_json(
        &self,
        provider: ProviderType,
        request: &ProviderRequest,
        options: &RequestOptions,
    ) -> ProviderResult<Value> {
        let request_id = options.request_id;

        info!(
            "Executing HTTP request to {} [request_id: {}]",
            provider, request_id
        );
        debug!("Request: {} [request_id: {}]", request.safe_for_logging(), request_id);

        let mut builder = self.build(request, options);
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }

        let response = self.send(provider, builder, options).await?;

        let response_text = response
            .text()
            .await
            .map_err(|e| map_transport_error(provider, &e, request_id))?;

        let value: Value = serde_json::from_str(&response_text).map_err(|e| {
            error!(
                "Failed to parse response from {} [request_id: {}]: {}",
                provider, request_id, e
            );
            ProviderError::InvalidResponse {
                provider,
                message: format!("Invalid response format: {}", e),
            }
        })?;

        info!(
            "Request completed successfully for {} [request_id: {}]",
            provider, request_id
        );

        Ok(value)
    }

    async fn execute_stream(
        &self,
        provider: ProviderType,
        request: &ProviderRequest,
        options: &RequestOptions,
    ) -> ProviderResult<ByteStream> {
        let request_id = options.request_id;

        info!(
            "Opening stream to {} [request_id: {}]",
            provider, request_id
        );
        debug!("Request: {} [request_id: {}]", request.safe_for_logging(), request_id);

        let builder = self.build(request, options);
        let response = self.send(provider, builder, options).await?;

        let stream = response.bytes_stream().map(move |chunk| {
            chunk.map_err(|e| ProviderError::Network {
                provider,
                message: format!("Stream interrupted: {} [request_id: {}]", e, request_id),
            })
        });

        Ok(Box::pin(stream))
    }
}
