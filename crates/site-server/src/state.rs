use anyhow::Result;
use axum::extract::FromRef;
use px_session::{SessionPlugin, SessionPlugins};
use std::sync::Arc;
use tracing::info;

use crate::config::Settings;
use crate::database::{RowStore, VisitRepository};
use crate::security::IpBanList;
use crate::services::{LoginService, Mailer, VisitorTracker};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub store: Arc<RowStore>,
    pub visits: Arc<VisitRepository>,
    pub bans: Arc<IpBanList>,
    pub tracker: Arc<VisitorTracker>,
    pub login: Arc<LoginService>,
    pub sessions: Arc<SessionPlugins>,
}

impl AppState {
    /// Wire services together. Session plugin conflicts fail here, before
    /// the server accepts any request.
    pub async fn new(settings: Settings, store: RowStore, mailer: Arc<dyn Mailer>) -> Result<Self> {
        let store = Arc::new(store);
        let visits = Arc::new(VisitRepository::new(store.clone()));
        let bans = Arc::new(IpBanList::new(visits.clone(), settings.tracker.ip_salt.clone()));
        let tracker = Arc::new(VisitorTracker::new(
            visits.clone(),
            bans.clone(),
            settings.tracker.internal_domains.clone(),
        ));
        let login = Arc::new(LoginService::new(mailer, settings.login.clone()));

        let sessions = SessionPlugins::new().with(SessionPlugin::new(settings.session.clone()))?;
        sessions.ensure_dirs().await?;
        info!("✅ Session directory ready: {}", settings.session.dir.display());

        Ok(Self {
            settings: Arc::new(settings),
            store,
            visits,
            bans,
            tracker,
            login,
            sessions: Arc::new(sessions),
        })
    }
}

impl FromRef<AppState> for Arc<RowStore> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Arc<VisitRepository> {
    fn from_ref(state: &AppState) -> Self {
        state.visits.clone()
    }
}

impl FromRef<AppState> for Arc<IpBanList> {
    fn from_ref(state: &AppState) -> Self {
        state.bans.clone()
    }
}

impl FromRef<AppState> for Arc<VisitorTracker> {
    fn from_ref(state: &AppState) -> Self {
        state.tracker.clone()
    }
}

impl FromRef<AppState> for Arc<LoginService> {
    fn from_ref(state: &AppState) -> Self {
        state.login.clone()
    }
}
