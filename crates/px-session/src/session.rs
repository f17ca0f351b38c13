use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::cookie::CookieChange;
use crate::error::SessionError;
use crate::id::SessionId;
use crate::store::{Payload, SessionStore};

pub const TTL_KEY: &str = "_ttl";
pub const UTM_KEY: &str = "_utm";
pub const SID_KEY: &str = "_sid";

#[derive(Debug)]
struct SessionState {
    id: SessionId,
    data: Payload,
    cookie: Option<CookieChange>,
}

/// Live handle to one session. Clones share the same state.
///
/// Reads and writes check expiry first: an active session slides its `_utm`
/// forward, an expired one is destroyed and replaced by a fresh session with
/// a new id. Every write rewrites the session file before returning.
#[derive(Debug, Clone)]
pub struct Session {
    store: Arc<SessionStore>,
    state: Arc<Mutex<SessionState>>,
}

fn now() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

impl Session {
    /// Load the session named by `cookie`, or start a new one when the cookie
    /// is absent, malformed, or points at a missing file.
    pub async fn resolve(
        store: Arc<SessionStore>,
        cookie: Option<&str>,
    ) -> Result<Self, SessionError> {
        match cookie.map(|raw| (raw, SessionId::parse(raw))) {
            Some((_, Some(id))) => {
                if let Some(data) = store.load(&id).await? {
                    debug!("Loaded session {}", id);
                    let state = SessionState { id, data, cookie: None };
                    return Ok(Self::wrap(store, state));
                }
                debug!("No file for session {}, allocating a new one", id);
            }
            Some((raw, None)) => debug!("Ignoring malformed session cookie {:?}", raw),
            None => debug!("No session cookie presented"),
        }

        Self::create(store).await
    }

    /// Allocate and persist a brand new session
    pub async fn create(store: Arc<SessionStore>) -> Result<Self, SessionError> {
        let state = allocate(&store, now()).await?;
        Ok(Self::wrap(store, state))
    }

    fn wrap(store: Arc<SessionStore>, state: SessionState) -> Self {
        Self {
            store,
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub async fn id(&self) -> SessionId {
        self.state.lock().await.id.clone()
    }

    /// Stored value for `key` after an expiry check
    pub async fn get(&self, key: &str) -> Result<Option<Value>, SessionError> {
        let mut state = self.state.lock().await;
        self.expire_locked(&mut state, now()).await?;
        Ok(state.data.get(key).cloned())
    }

    /// Like [`Session::get`], with `default` standing in for missing or null values
    pub async fn get_or(&self, key: &str, default: Value) -> Result<Value, SessionError> {
        Ok(self
            .get(key)
            .await?
            .filter(|value| !value.is_null())
            .unwrap_or(default))
    }

    /// Typed read. Missing and null values are `None`.
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SessionError> {
        match self.get(key).await? {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
        }
    }

    /// Store `value` under `key` and persist the session
    pub async fn set<T: Serialize>(&self, key: &str, value: T) -> Result<(), SessionError> {
        let value = serde_json::to_value(value)?;

        let mut state = self.state.lock().await;
        self.expire_locked(&mut state, now()).await?;
        state.data.insert(key.to_string(), value);
        self.store.save(&state.id, &state.data).await
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.state.lock().await.data.contains_key(key)
    }

    /// Remove `key` and persist the session
    pub async fn delete(&self, key: &str) -> Result<Option<Value>, SessionError> {
        let mut state = self.state.lock().await;
        let removed = state.data.remove(key);
        if removed.is_some() {
            self.store.save(&state.id, &state.data).await?;
        }
        Ok(removed)
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.data.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.data.is_empty()
    }

    pub async fn keys(&self) -> Vec<String> {
        self.state.lock().await.data.keys().cloned().collect()
    }

    /// Copy of the full payload, reserved keys included
    pub async fn items(&self) -> Payload {
        self.state.lock().await.data.clone()
    }

    /// Write the current payload to disk
    pub async fn save(&self) -> Result<(), SessionError> {
        let state = self.state.lock().await;
        self.store.save(&state.id, &state.data).await
    }

    /// Slide the expiry window, or regenerate when it has lapsed
    pub async fn expire(&self) -> Result<(), SessionError> {
        let mut state = self.state.lock().await;
        self.expire_locked(&mut state, now()).await
    }

    /// Delete the session file and clear the cookie
    pub async fn destroy(&self) -> Result<(), SessionError> {
        let mut state = self.state.lock().await;
        self.destroy_locked(&mut state).await
    }

    /// Replace this session with a fresh one under a new id
    pub async fn regenerate(&self) -> Result<(), SessionError> {
        let mut state = self.state.lock().await;
        self.regenerate_locked(&mut state, now()).await
    }

    /// Move the payload to a new id. The old file is removed and the cookie
    /// updated; user keys survive, reserved keys are reset.
    pub async fn cycle_id(&self) -> Result<(), SessionError> {
        let mut state = self.state.lock().await;
        let carried = state
            .data
            .iter()
            .filter(|(key, _)| !is_reserved(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect::<Vec<_>>();
        let old = state.id.clone();

        self.regenerate_locked(&mut state, now()).await?;
        state.data.extend(carried);
        self.store.save(&state.id, &state.data).await?;

        info!("Session {} moved to {}", old, state.id);
        Ok(())
    }

    /// Cookie change waiting to be written to the response
    pub async fn take_cookie_change(&self) -> Option<CookieChange> {
        self.state.lock().await.cookie.take()
    }

    async fn expire_locked(&self, state: &mut SessionState, now: f64) -> Result<(), SessionError> {
        let utm = state.data.get(UTM_KEY).and_then(Value::as_f64);
        let ttl = state.data.get(TTL_KEY).and_then(Value::as_f64);

        match (utm, ttl) {
            (Some(utm), Some(ttl)) if now - utm <= ttl => {
                state.data.insert(UTM_KEY.to_string(), Value::from(now));
                Ok(())
            }
            _ => {
                info!("Session {} expired, regenerating", state.id);
                self.regenerate_locked(state, now).await
            }
        }
    }

    async fn destroy_locked(&self, state: &mut SessionState) -> Result<(), SessionError> {
        self.store.remove(&state.id).await?;
        state.cookie = Some(CookieChange::Removed);
        debug!("Destroyed session {}", state.id);
        Ok(())
    }

    async fn regenerate_locked(&self, state: &mut SessionState, now: f64) -> Result<(), SessionError> {
        self.destroy_locked(state).await?;
        *state = allocate(&self.store, now).await?;
        Ok(())
    }
}

fn is_reserved(key: &str) -> bool {
    matches!(key, TTL_KEY | UTM_KEY | SID_KEY)
}

async fn allocate(store: &SessionStore, now: f64) -> Result<SessionState, SessionError> {
    let id = SessionId::generate();

    let mut data = Payload::new();
    data.insert(TTL_KEY.to_string(), Value::from(store.config().ttl()));
    data.insert(UTM_KEY.to_string(), Value::from(now));
    data.insert(SID_KEY.to_string(), Value::from(id.as_str()));

    store.save(&id, &data).await?;
    info!("Created session {}", id);

    Ok(SessionState {
        cookie: Some(CookieChange::Set(id.clone())),
        id,
        data,
    })
}
