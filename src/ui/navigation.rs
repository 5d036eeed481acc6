use parking_lot::Mutex;
use tracing::debug;

pub const LOGIN_ROUTE: &str = "/login";
pub const UNAUTHORIZED_ROUTE: &str = "/unauthorized";

/// A navigation request. `from` is the path the user tried to reach, kept so
/// the login screen can send them back afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub to: String,
    pub from: Option<String>,
    pub replace: bool,
}

impl Redirect {
    pub fn to_login(from: Option<&str>) -> Self {
        Self { to: LOGIN_ROUTE.to_string(), from: from.map(str::to_string), replace: true }
    }

    pub fn to_unauthorized(from: &str) -> Self {
        Self { to: UNAUTHORIZED_ROUTE.to_string(), from: Some(from.to_string()), replace: true }
    }
}

pub trait Navigator: Send + Sync {
    fn redirect(&self, redirect: Redirect);
    fn location(&self) -> String;
}

#[derive(Debug, Default)]
struct HistoryInner {
    location: String,
    redirects: Vec<Redirect>,
}

/// In-memory navigator: tracks the current location and every redirect issued.
#[derive(Debug, Default)]
pub struct History {
    inner: Mutex<HistoryInner>,
}

impl History {
    pub fn new(start: &str) -> Self {
        Self { inner: Mutex::new(HistoryInner { location: start.to_string(), redirects: Vec::new() }) }
    }

    /// Record a user-initiated move (not a redirect).
    pub fn visit(&self, path: &str) { self.inner.lock().location = path.to_string(); }

    pub fn redirects(&self) -> Vec<Redirect> { self.inner.lock().redirects.clone() }

    pub fn last_redirect(&self) -> Option<Redirect> { self.inner.lock().redirects.last().cloned() }
}

impl Navigator for History {
    fn redirect(&self, redirect: Redirect) {
        debug!(target: "router", to = %redirect.to, from = ?redirect.from, "redirect");
        let mut inner = self.inner.lock();
        inner.location = redirect.to.clone();
        inner.redirects.push(redirect);
    }

    fn location(&self) -> String { self.inner.lock().location.clone() }
}
