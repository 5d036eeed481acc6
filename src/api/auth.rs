//! Account endpoints: interactive login, registration, silent refresh and sign-out.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use super::pipeline::AuthenticatedClient;
use super::transport::{ApiRequest, Transport};
use crate::error::{ClientError, ClientResult};
use crate::identity::{AccessToken, Identity, Role, Session, SessionStore};

pub const LOGIN_PATH: &str = "Account/login";
pub const REGISTER_PATH: &str = "Account/register";
pub const REFRESH_PATH: &str = "Account/refreshToken";
pub const LOGOUT_PATH: &str = "Account/logout";
pub const UPDATE_PATH: &str = "Account/update";

pub const MISSING_SESSION_MESSAGE: &str = "Something went wrong, please try again!";

/// Exchanges the durable refresh credential for a fresh session.
/// Implementations never write the session store themselves.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self) -> ClientResult<Session>;
}

#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub phone_number: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub full_name: String,
    pub phone_number: String,
    pub email: Option<String>,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub full_name: String,
    pub phone_number: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoutOutcome {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct SessionPayload {
    token: Option<String>,
    user: Option<Identity>,
}

impl SessionPayload {
    fn into_session(self) -> Option<Session> {
        match (self.token.filter(|t| !t.is_empty()), self.user) {
            (Some(token), Some(user)) => Some(Session::authenticated(AccessToken::new(token), user)),
            _ => None,
        }
    }
}

/// Strip everything but digits, including a leading `+` and inner spaces.
pub fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

#[derive(Clone)]
pub struct AuthApi {
    transport: Arc<dyn Transport>,
    store: SessionStore,
}

impl AuthApi {
    pub fn new(transport: Arc<dyn Transport>, store: SessionStore) -> Self { Self { transport, store } }

    /// Interactive sign-in. Writes the new session into the store on success.
    pub async fn login(&self, req: &LoginRequest) -> ClientResult<Session> {
        if self.store.session().identity().is_some() {
            return Err(ClientError::validation("already signed in"));
        }
        let body = json!({
            "phoneNumber": normalize_phone(&req.phone_number),
            "password": req.password,
        });
        let payload = self.transport.send(&ApiRequest::post(LOGIN_PATH, body)).await?
            .decode::<SessionPayload>()?;
        let session = payload
            .and_then(SessionPayload::into_session)
            .ok_or_else(|| ClientError::validation(MISSING_SESSION_MESSAGE))?;
        self.store.set_session(session.clone());
        Ok(session)
    }

    /// Create an account. Does not sign in.
    pub async fn register(&self, req: &RegisterRequest) -> ClientResult<()> {
        let mut req = req.clone();
        req.phone_number = normalize_phone(&req.phone_number);
        let body = serde_json::to_value(&req)?;
        self.transport.send(&ApiRequest::post(REGISTER_PATH, body)).await?
            .decode::<serde_json::Value>()?;
        info!(target: "auth", role = %req.role, "account registered");
        Ok(())
    }

    /// Sign out. The local session is cleared even when the server call fails.
    pub async fn logout(&self) -> LogoutOutcome {
        let bearer = self.store.session().access_token().cloned();
        let req = ApiRequest::post(LOGOUT_PATH, json!({})).with_bearer(bearer);
        let result = match self.transport.send(&req).await {
            Ok(resp) if resp.is_success() => Ok(()),
            Ok(resp) => Err(resp.into_error()),
            Err(e) => Err(e),
        };
        self.store.clear();
        match result {
            Ok(()) => LogoutOutcome { success: true, message: "Signed out".to_string() },
            Err(e) => {
                warn!(target: "auth", error = %e, "server sign-out failed; local session cleared");
                LogoutOutcome { success: false, message: e.message().to_string() }
            }
        }
    }
}

/// Update the signed-in user's profile through the authenticated pipeline.
/// When the server echoes the updated user, the session is replaced with the
/// same token and the new identity.
pub async fn update_profile(client: &AuthenticatedClient, update: &ProfileUpdate) -> ClientResult<Option<Identity>> {
    let mut update = update.clone();
    update.phone_number = normalize_phone(&update.phone_number);
    let body = serde_json::to_value(&update)?;
    let updated = client.post_json::<Identity>(UPDATE_PATH, body).await.or_else(|e| match e {
        // Result may be a bare acknowledgement rather than the user.
        ClientError::Decode { .. } => Ok(None),
        other => Err(other),
    })?;
    if let Some(identity) = &updated {
        let current = client.store().session();
        if let Some(token) = current.access_token() {
            client.store().set_session(Session::authenticated(token.clone(), identity.clone()));
        }
    }
    Ok(updated)
}

#[async_trait]
impl TokenRefresher for AuthApi {
    async fn refresh(&self) -> ClientResult<Session> {
        let resp = self.transport.send(&ApiRequest::get(REFRESH_PATH)).await
            .map_err(|e| ClientError::refresh_failed(e.message().to_string()))?;
        let payload = resp.decode::<SessionPayload>()
            .map_err(|e| ClientError::refresh_failed(e.message().to_string()))?;
        let session = payload
            .and_then(SessionPayload::into_session)
            .ok_or_else(|| ClientError::refresh_failed("refresh response carried no session"))?;
        info!(target: "refresh", "access token refreshed");
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_normalization() {
        assert_eq!(normalize_phone("+20 100 123 4567"), "201001234567");
        assert_eq!(normalize_phone("(010) 12-34"), "0101234");
        assert_eq!(normalize_phone(""), "");
    }

    #[test]
    fn payload_requires_token_and_user() {
        let p: SessionPayload = serde_json::from_value(json!({"token": "abc"})).unwrap();
        assert!(p.into_session().is_none());
        let p: SessionPayload = serde_json::from_value(json!({
            "token": "",
            "user": {"id": "1", "fullName": "A", "phoneNumber": "1", "role": "Client"}
        })).unwrap();
        assert!(p.into_session().is_none());
    }

    #[test]
    fn register_body_shape() {
        let req = RegisterRequest {
            full_name: "Nile Freight".into(),
            phone_number: "201112223334".into(),
            email: None,
            password: "Secret#123".into(),
            role: Role::Company,
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["fullName"], "Nile Freight");
        assert_eq!(v["role"], "Company");
        assert!(v["email"].is_null());
    }
}
