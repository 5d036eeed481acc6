//! Transient user notices ("toasts") and the mapping from client errors to them.

use std::fmt::{Display, Formatter};

use parking_lot::Mutex;

use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
    Success,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
            Severity::Success => "success",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    pub fn error<S: Into<String>>(message: S) -> Self { Self { severity: Severity::Error, message: message.into() } }
    pub fn success<S: Into<String>>(message: S) -> Self { Self { severity: Severity::Success, message: message.into() } }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Collects notices in order; used by tests and by front ends that drain them.
#[derive(Debug, Default)]
pub struct NoticeLog {
    notices: Mutex<Vec<Notice>>,
}

impl NoticeLog {
    pub fn new() -> Self { Self::default() }

    pub fn notices(&self) -> Vec<Notice> { self.notices.lock().clone() }

    pub fn drain(&self) -> Vec<Notice> { std::mem::take(&mut *self.notices.lock()) }
}

impl Notifier for NoticeLog {
    fn notify(&self, notice: Notice) { self.notices.lock().push(notice); }
}

#[derive(Debug, Clone)]
pub struct NoticeDefaults {
    pub message: String,
    pub not_found_message: String,
    pub severity: Severity,
}

impl Default for NoticeDefaults {
    fn default() -> Self {
        Self {
            message: "Operation failed.".to_string(),
            not_found_message: "Entities Not Found.".to_string(),
            severity: Severity::Error,
        }
    }
}

impl NoticeDefaults {
    pub fn with_message<S: Into<String>>(message: S) -> Self {
        Self { message: message.into(), ..Self::default() }
    }
}

/// Notice for a failed call, or `None` when the failure was a cancellation.
///
/// Server-provided error text wins; otherwise 404s get the not-found message and
/// everything else the default one.
pub fn notice_for(err: &ClientError, defaults: &NoticeDefaults) -> Option<Notice> {
    let message = match err {
        ClientError::Aborted => return None,
        ClientError::Unauthorized { message }
        | ClientError::Forbidden { message }
        | ClientError::NotFound { message }
        | ClientError::Validation { message, .. }
        | ClientError::Server { message, .. }
            if !is_generic_status_text(message) => message.clone(),
        ClientError::NotFound { .. } => defaults.not_found_message.clone(),
        _ => defaults.message.clone(),
    };
    Some(Notice { severity: defaults.severity, message })
}

// `ClientError::from_status` fills in "HTTP <code>" when the body had no message.
fn is_generic_status_text(message: &str) -> bool {
    message.strip_prefix("HTTP ").map(|rest| rest.chars().all(|c| c.is_ascii_digit())).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aborted_requests_are_silent() {
        assert_eq!(notice_for(&ClientError::Aborted, &NoticeDefaults::default()), None);
    }

    #[test]
    fn server_text_then_not_found_then_default() {
        let d = NoticeDefaults::with_message("Couldn't fetch orders.");
        let n = notice_for(&ClientError::from_status(400, Some("Weight exceeds limit".into())), &d).unwrap();
        assert_eq!(n.message, "Weight exceeds limit");
        let n = notice_for(&ClientError::from_status(404, None), &d).unwrap();
        assert_eq!(n.message, "Entities Not Found.");
        let n = notice_for(&ClientError::from_status(500, None), &d).unwrap();
        assert_eq!(n.message, "Couldn't fetch orders.");
        let n = notice_for(&ClientError::transport("connection refused"), &d).unwrap();
        assert_eq!(n.message, "Couldn't fetch orders.");
        assert_eq!(n.severity, Severity::Error);
    }
}
