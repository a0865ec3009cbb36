//! HTTP client module for making API requests to LLM providers
//!
//! This module implements the HTTP layer for Domchat, handling:
//! - Connection pooling and client management
//! - Error mapping from provider error bodies
//! - Request ID generation and correlation
//!
//! Providers describe requests as [`ProviderRequest`] values; an
//! [`HttpExecutor`] sends them and hands back either a parsed JSON body or the
//! raw byte stream for incremental decoding.

pub mod client;
pub mod error;

pub use client::HttpClient;

use crate::config::{redact_header, redact_url, SafeLogging};
use crate::providers::{ProviderResult, ProviderType};
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::pin::Pin;
use std::time::Duration;
use uuid::Uuid;

/// HTTP method of a provider request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// A fully shaped request, ready to send
#[derive(Clone, PartialEq)]
pub struct ProviderRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
}

impl ProviderRequest {
    /// A JSON `POST`
    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            headers: BTreeMap::from([(
                "Content-Type".to_string(),
                "application/json".to_string(),
            )]),
            body: Some(body),
        }
    }

    /// A bodiless `GET`
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Header value by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

impl SafeLogging for ProviderRequest {
    fn safe_for_logging(&self) -> String {
        format!("{:?} {}", self.method, redact_url(&self.url))
    }
}

impl fmt::Debug for ProviderRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: BTreeMap<&str, String> = self
            .headers
            .iter()
            .map(|(name, value)| (name.as_str(), redact_header(name, value)))
            .collect();

        f.debug_struct("ProviderRequest")
            .field("method", &self.method)
            .field("url", &redact_url(&self.url))
            .field("headers", &headers)
            .field("body", &self.body)
            .finish()
    }
}

/// Options for an HTTP request
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Unique request ID for correlation
    pub request_id: Uuid,

    /// Deadline for a complete JSON response; streams are not bounded
    pub timeout: Option<Duration>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            timeout: None,
        }
    }
}

impl RequestOptions {
    /// Create new request options with a generated request ID
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = request_id;
        self
    }

    /// Set the timeout for this request
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Response body delivered chunk by chunk, in transport order
pub type ByteStream = Pin<Box<dyn Stream<Item = ProviderResult<Bytes>> + Send>>;

/// Trait for HTTP executors
#[async_trait]
pub trait HttpExecutor: Send + Sync {
    /// Send a request and parse the complete body as JSON
    async fn execute_json(
        &self,
        provider: ProviderType,
        request: &ProviderRequest,
        options: &RequestOptions,
    ) -> ProviderResult<Value>;

    /// Send a request and return the body as a byte stream
    ///
    /// A non-success status fails here, before any body byte is decoded.
    async fn execute_stream(
        &self,
        provider: ProviderType,
        request: &ProviderRequest,
        options: &RequestOptions,
    ) -> ProviderResult<ByteStream>;
}
