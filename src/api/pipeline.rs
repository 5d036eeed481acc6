//! Authenticated request pipeline.
//!
//! Wraps a `Transport` so every call carries the current access token, and
//! recovers from an expired token by refreshing and re-issuing the request.
//! The number of refresh-triggered retries per logical request is an explicit
//! parameter (one by default), so a server that keeps answering 401 can never
//! cause a retry loop.

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use super::auth::TokenRefresher;
use super::transport::{ApiRequest, ApiResponse, Transport};
use crate::error::{ClientError, ClientResult};
use crate::identity::SessionStore;

pub const DEFAULT_MAX_REFRESH_RETRIES: u8 = 1;

#[derive(Clone)]
pub struct AuthenticatedClient {
    transport: Arc<dyn Transport>,
    refresher: Arc<dyn TokenRefresher>,
    store: SessionStore,
    max_refresh_retries: u8,
}

impl AuthenticatedClient {
    pub fn new(transport: Arc<dyn Transport>, refresher: Arc<dyn TokenRefresher>, store: SessionStore) -> Self {
        Self { transport, refresher, store, max_refresh_retries: DEFAULT_MAX_REFRESH_RETRIES }
    }

    pub fn with_max_refresh_retries(mut self, retries: u8) -> Self {
        self.max_refresh_retries = retries;
        self
    }

    pub fn store(&self) -> &SessionStore { &self.store }

    /// Send one logical request.
    ///
    /// Only a 401 is treated as an expired token. Every other status, including
    /// 403 and 5xx, is returned as `Ok` for the caller to interpret. A 401 that
    /// survives the allowed retries, or whose refresh fails, is returned as
    /// `ClientError::Unauthorized`.
    pub async fn send(&self, request: ApiRequest) -> ClientResult<ApiResponse> {
        let request_id = Uuid::new_v4();
        let mut request = request;
        request.bearer = self.store.session().access_token().cloned();
        let mut retries = 0u8;
        loop {
            let resp = self.transport.send(&request).await?;
            if !resp.is_unauthorized() {
                return Ok(resp);
            }
            let unauthorized = resp.into_error();
            if retries >= self.max_refresh_retries {
                warn!(target: "pipeline", %request_id, path = %request.path, retries, "still unauthorized after refresh; giving up");
                return Err(unauthorized);
            }
            retries += 1;
            debug!(target: "pipeline", %request_id, path = %request.path, "access token rejected; refreshing");
            match self.refresher.refresh().await {
                Ok(session) => {
                    request.bearer = session.access_token().cloned();
                    self.store.set_session(session);
                }
                Err(e) => {
                    warn!(target: "pipeline", %request_id, path = %request.path, error = %e, "refresh failed");
                    return Err(unauthorized);
                }
            }
        }
    }

    /// Like `send`, but gives up with `ClientError::Aborted` once `cancelled` resolves.
    pub async fn send_until<F>(&self, request: ApiRequest, cancelled: F) -> ClientResult<ApiResponse>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            res = self.send(request) => res,
            _ = cancelled => Err(ClientError::Aborted),
        }
    }

    /// Send, require a 2xx and unwrap the envelope's `Result`.
    pub async fn call<T: DeserializeOwned>(&self, request: ApiRequest) -> ClientResult<Option<T>> {
        self.send(request).await?.decode::<T>()
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<Option<T>> {
        self.call(ApiRequest::get(path)).await
    }

    pub async fn post_json<T: DeserializeOwned>(&self, path: &str, body: Value) -> ClientResult<Option<T>> {
        self.call(ApiRequest::post(path, body)).await
    }

    pub async fn put_json<T: DeserializeOwned>(&self, path: &str, body: Value) -> ClientResult<Option<T>> {
        self.call(ApiRequest::put(path, body)).await
    }

    pub async fn delete(&self, path: &str) -> ClientResult<()> {
        let resp = self.send(ApiRequest::delete(path)).await?;
        if resp.is_success() { Ok(()) } else { Err(resp.into_error()) }
    }
}
