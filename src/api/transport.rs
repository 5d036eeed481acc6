//! HTTP plumbing: request/response values, the `Transport` seam and the reqwest
//! implementation. The reqwest client keeps a cookie jar; the server's http-only
//! refresh cookie lives there.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::envelope::{self, Envelope};
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::identity::AccessToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

/// One HTTP call against a path relative to the API base.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub bearer: Option<AccessToken>,
}

impl ApiRequest {
    pub fn new<S: Into<String>>(method: Method, path: S) -> Self {
        Self { method, path: path.into(), query: Vec::new(), body: None, bearer: None }
    }

    pub fn get<S: Into<String>>(path: S) -> Self { Self::new(Method::Get, path) }
    pub fn delete<S: Into<String>>(path: S) -> Self { Self::new(Method::Delete, path) }

    pub fn post<S: Into<String>>(path: S, body: Value) -> Self {
        Self { body: Some(body), ..Self::new(Method::Post, path) }
    }

    pub fn put<S: Into<String>>(path: S, body: Value) -> Self {
        Self { body: Some(body), ..Self::new(Method::Put, path) }
    }

    pub fn query<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn with_bearer(mut self, token: Option<AccessToken>) -> Self {
        self.bearer = token;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self { Self { status, body } }

    pub fn is_success(&self) -> bool { (200..300).contains(&self.status) }

    pub fn is_unauthorized(&self) -> bool { self.status == 401 }

    pub fn into_error(self) -> ClientError {
        ClientError::from_status(self.status, envelope::error_message(&self.body))
    }

    /// Fail on non-2xx, then unwrap the envelope.
    pub fn decode<T: DeserializeOwned>(self) -> ClientResult<Option<T>> {
        if !self.is_success() {
            return Err(self.into_error());
        }
        Envelope::<T>::from_value(self.body)?.into_result()
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> ClientResult<ApiResponse>;
}

pub struct HttpTransport {
    base: Url,
    client: reqwest::Client,
    jar: Arc<Jar>,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let jar = Arc::new(Jar::default());
        let mut builder = reqwest::Client::builder()
            .cookie_provider(jar.clone());
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        Ok(Self { base: config.api_base.clone(), client, jar })
    }

    pub fn base(&self) -> &Url { &self.base }

    /// Resolve a path under the API base, keeping the base path.
    pub fn endpoint(&self, path: &str) -> ClientResult<Url> {
        self.base.join(path.trim_start_matches('/'))
            .map_err(|e| ClientError::config(format!("invalid endpoint '{}': {}", path, e)))
    }

    /// `name=value; ...` of the cookies the jar would send to `path`.
    pub fn cookie_header(&self, path: &str) -> Option<String> {
        let url = self.endpoint(path).ok()?;
        let value = self.jar.cookies(&url)?;
        value.to_str().ok().map(str::to_string).filter(|s| !s.is_empty())
    }

    /// Re-seed the jar from a header previously returned by `cookie_header`.
    pub fn restore_cookies(&self, path: &str, header: &str) -> ClientResult<()> {
        let url = self.endpoint(path)?;
        for pair in header.split(';').map(str::trim).filter(|p| p.contains('=')) {
            self.jar.add_cookie_str(pair, &url);
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> ClientResult<ApiResponse> {
        let url = self.endpoint(&request.path)?;
        let mut rb = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
            Method::Put => self.client.put(url),
            Method::Delete => self.client.delete(url),
        };
        if !request.query.is_empty() {
            rb = rb.query(&request.query);
        }
        if let Some(body) = &request.body {
            rb = rb.json(body);
        }
        if let Some(token) = &request.bearer {
            rb = rb.bearer_auth(token.as_str());
        }
        let resp = rb.send().await?;
        let status = resp.status().as_u16();
        let bytes = resp.bytes().await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        debug!(target: "transport", method = ?request.method, path = %request.path, status, authed = request.bearer.is_some(), "response");
        Ok(ApiResponse { status, body })
    }
}
