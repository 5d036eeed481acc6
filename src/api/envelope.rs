//! The response wrapper every backend endpoint uses:
//! `{ "Success": bool, "StatusCode": int, "Result": T | null, "ErrorMessage": string | null }`.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{ClientError, ClientResult};

pub const UNKNOWN_ERROR: &str = "An unknown error has occured!";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub status_code: u16,
    pub result: Option<T>,
    pub error_message: Option<String>,
}

impl<T> Envelope<T> {
    /// Accept only `Success == true && StatusCode == 200`.
    pub fn into_result(self) -> ClientResult<Option<T>> {
        if self.success && self.status_code == 200 {
            return Ok(self.result);
        }
        let message = self.error_message.filter(|m| !m.trim().is_empty()).unwrap_or_else(|| UNKNOWN_ERROR.to_string());
        let status = if self.status_code >= 400 { self.status_code } else { 400 };
        Err(ClientError::from_status(status, Some(message)))
    }
}

impl<T: DeserializeOwned> Envelope<T> {
    pub fn from_value(body: serde_json::Value) -> ClientResult<Self> {
        serde_json::from_value(body).map_err(|e| ClientError::decode(format!("unexpected response shape: {}", e)))
    }
}

/// `ErrorMessage` of an error body, when it has one.
pub fn error_message(body: &serde_json::Value) -> Option<String> {
    body.get("ErrorMessage")
        .and_then(|m| m.as_str())
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}
