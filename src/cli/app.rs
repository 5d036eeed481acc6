//! Wires the library together for one CLI invocation and runs a command.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{debug, warn};

use super::output;
use super::Command;
use crate::api::auth::REFRESH_PATH;
use crate::api::{AuthApi, HttpTransport, LoginRequest, TokenRefresher};
use crate::config::ClientConfig;
use crate::guard::{BootstrapGuard, GuardOptions, GuardOutcome};
use crate::identity::SessionStore;
use crate::realtime::{HubClient, HubEvent};
use crate::routes::Router;
use crate::storage::{FileStore, PreferenceStore, KEY_COOKIE_CONSENT, KEY_REFRESH_COOKIE};
use crate::ui::{History, LoadingFlag, NoticeLog};

pub struct App {
    config: ClientConfig,
    prefs: Arc<FileStore>,
    store: SessionStore,
    transport: Arc<HttpTransport>,
    auth: Arc<AuthApi>,
    history: Arc<History>,
    loading: Arc<LoadingFlag>,
    notices: Arc<NoticeLog>,
}

impl App {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let prefs = Arc::new(FileStore::open(&config.state_file)
            .with_context(|| format!("opening state file {}", config.state_file.display()))?);
        let store = SessionStore::new(prefs.clone());
        let transport = Arc::new(HttpTransport::new(&config)?);
        if store.stay_signed_in() {
            if let Some(cookie) = prefs.get(KEY_REFRESH_COOKIE) {
                transport.restore_cookies(REFRESH_PATH, &cookie)?;
                debug!(target: "storage", "refresh credential restored");
            }
        }
        let auth = Arc::new(AuthApi::new(transport.clone(), store.clone()));
        Ok(Self {
            config,
            prefs,
            store,
            transport,
            auth,
            history: Arc::new(History::new("/")),
            loading: Arc::new(LoadingFlag::new()),
            notices: Arc::new(NoticeLog::new()),
        })
    }

    fn guard(&self, options: GuardOptions) -> BootstrapGuard {
        BootstrapGuard::new(
            self.store.clone(),
            self.refresher(),
            self.loading.clone(),
            self.history.clone(),
            self.notices.clone(),
            options,
        )
    }

    fn refresher(&self) -> Arc<dyn TokenRefresher> { self.auth.clone() }

    /// Keep the refresh cookie on disk only while stay-signed-in is on.
    fn save_credentials(&self) {
        let result = match self.transport.cookie_header(REFRESH_PATH) {
            Some(cookie) if self.store.stay_signed_in() => self.prefs.set(KEY_REFRESH_COOKIE, &cookie),
            _ => self.prefs.remove(KEY_REFRESH_COOKIE),
        };
        if let Err(e) = result {
            warn!(target: "storage", error = %e, "could not save refresh credential");
        }
    }

    /// Run the private-subtree guard; true when a session is available.
    async fn bootstrap(&self) -> bool {
        let mut mount = self.guard(GuardOptions::PRIVATE).mount();
        let outcome = mount.settled().await;
        output::print_notices(&self.notices.drain());
        match outcome {
            GuardOutcome::Render => true,
            GuardOutcome::Redirected(r) => {
                println!("not signed in (redirected to {})", r.to);
                false
            }
            GuardOutcome::Discarded => false,
        }
    }

    pub async fn run(&self, command: Command) -> Result<()> {
        let signing_out = matches!(command, Command::Logout);
        let result = self.dispatch(command).await;
        if !signing_out {
            self.save_credentials();
        }
        result
    }

    async fn dispatch(&self, command: Command) -> Result<()> {
        match command {
            Command::Help => Ok(()),
            Command::Login { phone, password, stay_signed_in } => {
                self.store.set_stay_signed_in(stay_signed_in);
                let session = self.auth.login(&LoginRequest { phone_number: phone, password }).await?;
                if let Some(identity) = session.identity() {
                    println!("signed in as {} ({})", identity.full_name, identity.role);
                }
                Ok(())
            }
            Command::Register(req) => {
                self.auth.register(&req).await?;
                println!("account created for {}; sign in to continue", req.full_name);
                Ok(())
            }
            Command::Logout => {
                let outcome = self.auth.logout().await;
                if let Err(e) = self.prefs.remove(KEY_REFRESH_COOKIE) {
                    warn!(target: "storage", error = %e, "could not remove refresh credential");
                }
                if outcome.success {
                    println!("signed out");
                } else {
                    println!("signed out locally; server said: {}", outcome.message);
                }
                Ok(())
            }
            Command::WhoAmI => {
                if self.bootstrap().await {
                    if let Some(identity) = self.store.session().identity() {
                        output::print_identity(identity);
                    }
                }
                Ok(())
            }
            Command::Open { path } => {
                let mut router = Router::new(
                    self.store.clone(),
                    self.refresher(),
                    self.loading.clone(),
                    self.history.clone(),
                    self.notices.clone(),
                );
                let nav = router.navigate(&path).await;
                output::print_notices(&self.notices.drain());
                output::print_navigation(&nav);
                Ok(())
            }
            Command::Listen => {
                if !self.bootstrap().await {
                    bail!("sign in before listening for notifications");
                }
                let (handle, mut events) = HubClient::new(&self.config, self.store.clone())?.start();
                loop {
                    tokio::select! {
                        ev = events.recv() => match ev {
                            Some(ev) => {
                                output::print_event(&ev);
                                if matches!(ev, HubEvent::Disconnected { .. }) { break; }
                            }
                            None => break,
                        },
                        _ = tokio::signal::ctrl_c() => {
                            println!("stopping");
                            break;
                        }
                    }
                }
                handle.stop().await?;
                Ok(())
            }
            Command::StaySignedIn(on) => {
                self.store.set_stay_signed_in(on);
                println!("stay signed in: {}", if on { "on" } else { "off" });
                Ok(())
            }
            Command::Consent => {
                self.prefs.set(KEY_COOKIE_CONSENT, "true")?;
                println!("cookie consent recorded");
                Ok(())
            }
        }
    }
}
