//! Session bootstrap guard.
//!
//! Sits in front of a route subtree and makes sure the session is fresh before
//! the subtree renders. Each activation of the subtree is one `Mount`: a one-shot
//! task that either finds a token already in memory (ready at once) or performs a
//! single silent refresh. Session changes after the mount never re-run the check.
//!
//! Dropping the `Mount` marks it unmounted; a refresh that resolves afterwards is
//! thrown away without touching the session store, the navigator or the notifier.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::TokenRefresher;
use crate::identity::SessionStore;
use crate::ui::{LoadingIndicator, Navigator, Notice, Notifier, Redirect};

pub const REFRESH_FAILED_NOTICE: &str = "We're unable to refresh your session. Please sign in again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GuardOptions {
    /// Render the subtree even when the refresh fails (anonymous visitors allowed).
    pub suppress_errors: bool,
    /// Do not toggle the page-level loading indicator.
    pub silent: bool,
}

impl GuardOptions {
    pub const PRIVATE: GuardOptions = GuardOptions { suppress_errors: false, silent: false };
    pub const PUBLIC: GuardOptions = GuardOptions { suppress_errors: true, silent: true };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Idle,
    Checking,
    Ready,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Render the subtree (session fresh, or failure suppressed).
    Render,
    /// The refresh failed and navigation was sent to login.
    Redirected(Redirect),
    /// Unmounted before the check finished; nothing was applied.
    Discarded,
}

#[derive(Clone)]
pub struct BootstrapGuard {
    store: SessionStore,
    refresher: Arc<dyn TokenRefresher>,
    loading: Arc<dyn LoadingIndicator>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    options: GuardOptions,
}

impl BootstrapGuard {
    pub fn new(
        store: SessionStore,
        refresher: Arc<dyn TokenRefresher>,
        loading: Arc<dyn LoadingIndicator>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
        options: GuardOptions,
    ) -> Self {
        Self { store, refresher, loading, navigator, notifier, options }
    }

    pub fn options(&self) -> GuardOptions { self.options }

    /// Activate the guard for one subtree mount. Must be called inside a tokio runtime.
    pub fn mount(&self) -> Mount {
        let alive = Arc::new(Mutex::new(true));
        let initial = if self.store.has_access_token() { GuardState::Ready } else { GuardState::Checking };
        let (tx, rx) = watch::channel(initial);
        let guard = self.clone();
        let flag = alive.clone();
        let task = tokio::spawn(async move { guard.run(flag, tx).await });
        Mount { alive, state: rx, task: Some(task), outcome: None }
    }

    async fn run(self, alive: Arc<Mutex<bool>>, state: watch::Sender<GuardState>) -> GuardOutcome {
        if *state.borrow() == GuardState::Ready {
            debug!(target: "guard", "access token in memory; no refresh");
            return GuardOutcome::Render;
        }

        if !self.store.stay_signed_in() {
            debug!(target: "guard", "stay-signed-in is off; skipping silent refresh");
            let mounted = alive.lock();
            if !*mounted {
                return GuardOutcome::Discarded;
            }
            state.send_replace(GuardState::Failed);
            return self.fail(false);
        }

        if !self.options.silent {
            self.loading.set_loading(true);
        }
        let result = self.refresher.refresh().await;
        if !self.options.silent {
            self.loading.set_loading(false);
        }

        // Held until the result is applied so an unmount cannot land in between.
        let mounted = alive.lock();
        if !*mounted {
            debug!(target: "guard", ok = result.is_ok(), "unmounted before refresh resolved; result discarded");
            return GuardOutcome::Discarded;
        }

        match result {
            Ok(session) => {
                self.store.set_session(session);
                state.send_replace(GuardState::Ready);
                info!(target: "guard", "session restored");
                GuardOutcome::Render
            }
            Err(e) => {
                warn!(target: "guard", error = %e, suppressed = self.options.suppress_errors, "silent refresh failed");
                state.send_replace(GuardState::Failed);
                self.fail(true)
            }
        }
    }

    fn fail(&self, attempted: bool) -> GuardOutcome {
        if self.options.suppress_errors {
            return GuardOutcome::Render;
        }
        if attempted {
            self.notifier.notify(Notice::error(REFRESH_FAILED_NOTICE));
        }
        let redirect = Redirect::to_login(None);
        self.navigator.redirect(redirect.clone());
        GuardOutcome::Redirected(redirect)
    }
}

/// One activation of a guarded subtree.
pub struct Mount {
    alive: Arc<Mutex<bool>>,
    state: watch::Receiver<GuardState>,
    task: Option<JoinHandle<GuardOutcome>>,
    outcome: Option<GuardOutcome>,
}

impl Mount {
    pub fn state(&self) -> GuardState { *self.state.borrow() }

    pub fn is_mounted(&self) -> bool { *self.alive.lock() }

    /// Wait for the check to finish. Cancel-safe; later calls return the cached outcome.
    pub async fn settled(&mut self) -> GuardOutcome {
        if let Some(task) = self.task.as_mut() {
            let outcome = task.await.unwrap_or(GuardOutcome::Discarded);
            self.task = None;
            self.outcome = Some(outcome);
        }
        self.outcome.clone().unwrap_or(GuardOutcome::Discarded)
    }

    /// Tear down the mount. The returned handle resolves once the detached
    /// check has finished; awaiting it is optional.
    pub fn unmount(mut self) -> Option<JoinHandle<GuardOutcome>> {
        *self.alive.lock() = false;
        self.task.take()
    }
}

impl Drop for Mount {
    fn drop(&mut self) {
        *self.alive.lock() = false;
    }
}
