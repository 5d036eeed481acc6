//! Route table and router.
//!
//! Routes are static data: a path pattern, the screen it shows, the guarded
//! subtree it belongs to (if any) and the role gate in front of it (if any).
//! `Router::navigate` runs the subtree's bootstrap guard once per activation of
//! that subtree, then the role gate, and reports what the front end should do.

use std::sync::Arc;

use tracing::debug;

use crate::api::TokenRefresher;
use crate::guard::{BootstrapGuard, GuardOptions, GuardOutcome, GuardState, Mount};
use crate::identity::{GateDecision, Role, RoleGate, RoleSet, SessionStore};
use crate::ui::{LoadingIndicator, Navigator, Notifier, Redirect};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subtree {
    /// Landing pages: anonymous visitors welcome, no loading flash.
    Landing,
    /// Everything under `/user`.
    Private,
}

impl Subtree {
    pub fn guard_options(self) -> GuardOptions {
        match self {
            Subtree::Landing => GuardOptions::PUBLIC,
            Subtree::Private => GuardOptions::PRIVATE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Register,
    Unauthorized,
    Landing,
    Offers,
    OfferDetail,
    NewOrder,
    Orders,
    OrderDetail,
    Profile,
    Notifications,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteDef {
    pub pattern: &'static str,
    pub screen: Screen,
    pub subtree: Option<Subtree>,
    pub gate: Option<RoleGate>,
}

const STAFF: RoleGate = RoleGate::new(RoleSet::of(&[Role::Company, Role::Admin]));
const ORDERING: RoleGate = RoleGate::new(RoleSet::of(&[Role::Client, Role::Admin]));
const MEMBERS: RoleGate = RoleGate::new(RoleSet::ALL);

const fn public(pattern: &'static str, screen: Screen) -> RouteDef {
    RouteDef { pattern, screen, subtree: None, gate: None }
}

const fn landing(pattern: &'static str) -> RouteDef {
    RouteDef { pattern, screen: Screen::Landing, subtree: Some(Subtree::Landing), gate: None }
}

const fn private(pattern: &'static str, screen: Screen, gate: RoleGate) -> RouteDef {
    RouteDef { pattern, screen, subtree: Some(Subtree::Private), gate: Some(gate) }
}

pub const ROUTES: &[RouteDef] = &[
    public("/login", Screen::Login),
    public("/register", Screen::Register),
    public("/unauthorized", Screen::Unauthorized),
    landing("/"),
    landing("/home"),
    landing("/index"),
    private("/user/offers", Screen::Offers, STAFF),
    private("/user/offers/:id", Screen::OfferDetail, STAFF),
    private("/user/orders/new", Screen::NewOrder, ORDERING),
    private("/user/orders", Screen::Orders, MEMBERS),
    private("/user/orders/:id", Screen::OrderDetail, MEMBERS),
    private("/user/profile", Screen::Profile, MEMBERS),
    private("/user/notifications", Screen::Notifications, MEMBERS),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub route: &'static RouteDef,
    pub path: String,
    pub params: Vec<(&'static str, String)>,
}

impl RouteMatch {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.iter().find(|(k, _)| *k == name).map(|(_, v)| v.as_str())
    }
}

/// Strip query/fragment and any trailing slash (the root stays `/`).
pub fn normalize_path(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or("");
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn match_pattern(pattern: &'static str, path: &str) -> Option<Vec<(&'static str, String)>> {
    let pat: Vec<&'static str> = segments(pattern).collect();
    let got: Vec<&str> = segments(path).collect();
    if pat.len() != got.len() {
        return None;
    }
    let mut params = Vec::new();
    for (p, g) in pat.into_iter().zip(got) {
        match p.strip_prefix(':') {
            Some(name) => params.push((name, g.to_string())),
            None if p == g => {}
            None => return None,
        }
    }
    Some(params)
}

/// Find the route for a path. Literal routes beat parameterised ones.
pub fn match_route(path: &str) -> Option<RouteMatch> {
    let path = normalize_path(path);
    ROUTES
        .iter()
        .filter_map(|route| match_pattern(route.pattern, &path).map(|params| (route, params)))
        .min_by_key(|(_, params)| params.len())
        .map(|(route, params)| RouteMatch { route, path: path.clone(), params })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Render(RouteMatch),
    Redirect(Redirect),
    NotFound(String),
}

pub struct Router {
    landing: BootstrapGuard,
    private: BootstrapGuard,
    store: SessionStore,
    navigator: Arc<dyn Navigator>,
    active: Option<(Subtree, Mount)>,
}

impl Router {
    pub fn new(
        store: SessionStore,
        refresher: Arc<dyn TokenRefresher>,
        loading: Arc<dyn LoadingIndicator>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let guard = |subtree: Subtree| BootstrapGuard::new(
            store.clone(),
            refresher.clone(),
            loading.clone(),
            navigator.clone(),
            notifier.clone(),
            subtree.guard_options(),
        );
        Self {
            landing: guard(Subtree::Landing),
            private: guard(Subtree::Private),
            store: store.clone(),
            navigator: navigator.clone(),
            active: None,
        }
    }

    pub fn active_subtree(&self) -> Option<Subtree> { self.active.as_ref().map(|(s, _)| *s) }

    pub fn guard_state(&self) -> GuardState {
        self.active.as_ref().map(|(_, m)| m.state()).unwrap_or(GuardState::Idle)
    }

    fn guard_for(&self, subtree: Subtree) -> &BootstrapGuard {
        match subtree {
            Subtree::Landing => &self.landing,
            Subtree::Private => &self.private,
        }
    }

    /// Resolve a navigation. Entering a guarded subtree mounts its guard; moving
    /// within the same subtree reuses the settled mount; leaving it unmounts.
    pub async fn navigate(&mut self, path: &str) -> Navigation {
        let Some(m) = match_route(path) else {
            self.active = None;
            return Navigation::NotFound(normalize_path(path));
        };

        match m.route.subtree {
            Some(subtree) => {
                if self.active_subtree() != Some(subtree) {
                    self.active = None;
                    debug!(target: "router", ?subtree, path = %m.path, "mounting guard");
                    let mount = self.guard_for(subtree).mount();
                    self.active = Some((subtree, mount));
                }
                let outcome = match self.active.as_mut() {
                    Some((_, mount)) => mount.settled().await,
                    None => GuardOutcome::Discarded,
                };
                match outcome {
                    GuardOutcome::Render => {}
                    GuardOutcome::Redirected(r) => {
                        self.active = None;
                        return Navigation::Redirect(r);
                    }
                    GuardOutcome::Discarded => {
                        self.active = None;
                        let r = Redirect::to_login(Some(&m.path));
                        debug!(target: "router", path = %m.path, "guard check did not finish");
                        self.navigator.redirect(r.clone());
                        return Navigation::Redirect(r);
                    }
                }
            }
            None => self.active = None,
        }

        if let Some(gate) = m.route.gate {
            let session = self.store.session();
            let redirect = match gate.check(session.identity()) {
                GateDecision::Permit => None,
                GateDecision::DenyAuthenticated => Some(Redirect::to_unauthorized(&m.path)),
                GateDecision::DenyAnonymous => Some(Redirect::to_login(Some(&m.path))),
            };
            if let Some(r) = redirect {
                debug!(target: "router", path = %m.path, to = %r.to, "role gate denied");
                self.navigator.redirect(r.clone());
                return Navigation::Redirect(r);
            }
        }

        Navigation::Render(m)
    }
}
