use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::config::DEFAULT_KEYWORD;
use crate::error::SessionError;
use crate::plugin::{SessionPlugin, SessionPlugins};
use crate::session::Session;

#[derive(Debug, Clone)]
struct SessionSlot {
    plugin: Arc<SessionPlugin>,
    cookie: Option<String>,
    cell: Arc<OnceCell<Session>>,
}

impl SessionSlot {
    /// Resolved at most once per request, on first extraction
    async fn session(&self) -> Result<Session, SessionError> {
        self.cell
            .get_or_try_init(|| async {
                debug!("Resolving '{}' session", self.plugin.keyword());
                Session::resolve(self.plugin.store().clone(), self.cookie.as_deref()).await
            })
            .await
            .cloned()
    }
}

/// Per-request access to every installed session plugin
#[derive(Debug, Clone)]
pub struct Sessions {
    slots: Arc<Vec<SessionSlot>>,
}

impl Sessions {
    /// Session of the plugin registered under `keyword`
    pub async fn get(&self, keyword: &str) -> Result<Session, SessionError> {
        self.slots
            .iter()
            .find(|slot| slot.plugin.keyword() == keyword)
            .ok_or_else(|| SessionError::NotInstalled(keyword.to_string()))?
            .session()
            .await
    }

    /// The only plugin when exactly one is installed, else the one under the
    /// default keyword
    async fn default_session(&self) -> Result<Session, SessionError> {
        match self.slots.as_slice() {
            [only] => only.session().await,
            _ => self.get(DEFAULT_KEYWORD).await,
        }
    }
}

/// Makes sessions available to handlers and writes cookie changes back.
///
/// Nothing is read from disk unless a handler extracts [`Session`] or calls
/// [`Sessions::get`]; routes that never ask for a session are left alone.
pub async fn session_middleware(
    State(plugins): State<Arc<SessionPlugins>>,
    mut request: Request,
    next: Next,
) -> Response {
    let slots = plugins
        .iter()
        .map(|plugin| SessionSlot {
            cookie: plugin.cookie_value(request.headers()),
            plugin: plugin.clone(),
            cell: Arc::new(OnceCell::new()),
        })
        .collect::<Vec<_>>();

    let sessions = Sessions {
        slots: Arc::new(slots),
    };
    request.extensions_mut().insert(sessions.clone());

    let mut response = next.run(request).await;

    for slot in sessions.slots.iter() {
        let Some(session) = slot.cell.get() else {
            continue;
        };

        if let Some(change) = session.take_cookie_change().await {
            match slot.plugin.cookie_header(&change) {
                Ok(value) => {
                    response.headers_mut().append(header::SET_COOKIE, value);
                }
                Err(e) => warn!(
                    "Dropped '{}' session cookie for {}: {}",
                    slot.plugin.keyword(),
                    session.id().await,
                    e
                ),
            }
        }
    }

    response
}

impl<S> FromRequestParts<S> for Sessions
where
    S: Send + Sync,
{
    type Rejection = SessionError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Sessions>()
            .cloned()
            .ok_or_else(|| SessionError::NotInstalled(DEFAULT_KEYWORD.to_string()))
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = SessionError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let sessions = Sessions::from_request_parts(parts, state).await?;
        sessions.default_session().await
    }
}
