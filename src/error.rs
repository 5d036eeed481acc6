//! Unified client error model.
//! One enum shared by the transport, the auth endpoints, the request pipeline,
//! the bootstrap guard and the hub listener, plus helpers used when turning
//! failures into user notices.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// The durable refresh credential is missing, expired or was rejected.
    #[error("refresh_failed: {message}")]
    RefreshFailed { message: String },
    /// The server reported an expired or invalid access token (HTTP 401).
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },
    #[error("forbidden: {message}")]
    Forbidden { message: String },
    #[error("not_found: {message}")]
    NotFound { message: String },
    /// Request rejected by the server (4xx other than 401/403/404) or refused locally.
    #[error("validation: {message}")]
    Validation { status: u16, message: String },
    #[error("server_error: HTTP {status}: {message}")]
    Server { status: u16, message: String },
    #[error("transport: {message}")]
    Transport { message: String },
    /// The caller cancelled the logical request.
    #[error("aborted")]
    Aborted,
    #[error("decode: {message}")]
    Decode { message: String },
    #[error("storage: {message}")]
    Storage { message: String },
    #[error("config: {message}")]
    Config { message: String },
    #[error("hub: {message}")]
    Hub { message: String },
}

impl ClientError {
    pub fn refresh_failed<S: Into<String>>(msg: S) -> Self { ClientError::RefreshFailed { message: msg.into() } }
    pub fn unauthorized<S: Into<String>>(msg: S) -> Self { ClientError::Unauthorized { message: msg.into() } }
    pub fn validation<S: Into<String>>(msg: S) -> Self { ClientError::Validation { status: 400, message: msg.into() } }
    pub fn transport<S: Into<String>>(msg: S) -> Self { ClientError::Transport { message: msg.into() } }
    pub fn decode<S: Into<String>>(msg: S) -> Self { ClientError::Decode { message: msg.into() } }
    pub fn storage<S: Into<String>>(msg: S) -> Self { ClientError::Storage { message: msg.into() } }
    pub fn config<S: Into<String>>(msg: S) -> Self { ClientError::Config { message: msg.into() } }
    pub fn hub<S: Into<String>>(msg: S) -> Self { ClientError::Hub { message: msg.into() } }

    /// Classify a non-success HTTP status. `message` is the server's error text
    /// when the body carried one.
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        let message = message.unwrap_or_else(|| format!("HTTP {}", status));
        match status {
            401 => ClientError::Unauthorized { message },
            403 => ClientError::Forbidden { message },
            404 => ClientError::NotFound { message },
            400..=499 => ClientError::Validation { status, message },
            _ => ClientError::Server { status, message },
        }
    }

    pub fn code_str(&self) -> &'static str {
        match self {
            ClientError::RefreshFailed { .. } => "refresh_failed",
            ClientError::Unauthorized { .. } => "unauthorized",
            ClientError::Forbidden { .. } => "forbidden",
            ClientError::NotFound { .. } => "not_found",
            ClientError::Validation { .. } => "validation",
            ClientError::Server { .. } => "server_error",
            ClientError::Transport { .. } => "transport",
            ClientError::Aborted => "aborted",
            ClientError::Decode { .. } => "decode",
            ClientError::Storage { .. } => "storage",
            ClientError::Config { .. } => "config",
            ClientError::Hub { .. } => "hub",
        }
    }

    /// HTTP status this error came from, if it came from a response.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            ClientError::Unauthorized { .. } => Some(401),
            ClientError::Forbidden { .. } => Some(403),
            ClientError::NotFound { .. } => Some(404),
            ClientError::Validation { status, .. } | ClientError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Server-provided (or locally produced) message text, without the code prefix.
    pub fn message(&self) -> &str {
        match self {
            ClientError::RefreshFailed { message }
            | ClientError::Unauthorized { message }
            | ClientError::Forbidden { message }
            | ClientError::NotFound { message }
            | ClientError::Validation { message, .. }
            | ClientError::Server { message, .. }
            | ClientError::Transport { message }
            | ClientError::Decode { message }
            | ClientError::Storage { message }
            | ClientError::Config { message }
            | ClientError::Hub { message } => message.as_str(),
            ClientError::Aborted => "aborted",
        }
    }

    pub fn is_unauthorized(&self) -> bool { matches!(self, ClientError::Unauthorized { .. }) }
}

pub type ClientResult<T> = Result<T, ClientError>;

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode { message: err.to_string() }
        } else {
            ClientError::Transport { message: err.to_string() }
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self { ClientError::Decode { message: err.to_string() } }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self { ClientError::Storage { message: err.to_string() } }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(ClientError::from_status(401, None).is_unauthorized());
        assert_eq!(ClientError::from_status(403, None).code_str(), "forbidden");
        assert_eq!(ClientError::from_status(404, Some("gone".into())).message(), "gone");
        assert_eq!(ClientError::from_status(422, None).http_status(), Some(422));
        assert_eq!(ClientError::from_status(409, None).code_str(), "validation");
        assert_eq!(ClientError::from_status(503, None).code_str(), "server_error");
    }

    #[test]
    fn display_carries_code_and_message() {
        let e = ClientError::refresh_failed("cookie missing");
        assert_eq!(e.to_string(), "refresh_failed: cookie missing");
        assert_eq!(e.http_status(), None);
        assert_eq!(ClientError::Aborted.to_string(), "aborted");
    }
}
