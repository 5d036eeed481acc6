//! Front-end collaborators the session core talks to: navigation, the global
//! loading indicator and transient user notices.

pub mod navigation;
pub mod loading;
pub mod notice;

pub use navigation::{History, Navigator, Redirect, LOGIN_ROUTE, UNAUTHORIZED_ROUTE};
pub use loading::{LoadingFlag, LoadingIndicator};
pub use notice::{notice_for, Notice, NoticeDefaults, NoticeLog, Notifier, Severity};
