use axum::http::{header::InvalidHeaderValue, HeaderMap, HeaderValue};
use std::sync::Arc;
use tracing::info;

use crate::config::SessionConfig;
use crate::cookie::{is_valid_cookie_name, read_cookie, CookieChange};
use crate::error::{PluginError, SessionError};
use crate::session::Session;
use crate::store::SessionStore;

/// One configured session source, addressed by its keyword
#[derive(Debug)]
pub struct SessionPlugin {
    store: Arc<SessionStore>,
}

impl SessionPlugin {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            store: Arc::new(SessionStore::new(config)),
        }
    }

    pub fn keyword(&self) -> &str {
        &self.store.config().keyword
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Session for the cookie carried by `headers`
    pub async fn resolve(&self, headers: &HeaderMap) -> Result<Session, SessionError> {
        let cookie = self.cookie_value(headers);
        Session::resolve(self.store.clone(), cookie.as_deref()).await
    }

    pub(crate) fn cookie_value(&self, headers: &HeaderMap) -> Option<String> {
        read_cookie(headers, &self.store.config().cookie_name)
    }

    pub(crate) fn cookie_header(
        &self,
        change: &CookieChange,
    ) -> Result<HeaderValue, InvalidHeaderValue> {
        let config = self.store.config();
        change.header_value(&config.cookie_name, config.max_age())
    }
}

/// Installed session plugins. Keywords are unique; a second plugin with a
/// keyword already in use is rejected when it is installed.
#[derive(Debug, Default, Clone)]
pub struct SessionPlugins {
    plugins: Vec<Arc<SessionPlugin>>,
}

impl SessionPlugins {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(&mut self, plugin: SessionPlugin) -> Result<(), PluginError> {
        let cookie_name = &plugin.store().config().cookie_name;
        if !is_valid_cookie_name(cookie_name) {
            return Err(PluginError::InvalidCookieName {
                name: cookie_name.clone(),
            });
        }

        if self.get(plugin.keyword()).is_some() {
            return Err(PluginError::Conflict {
                keyword: plugin.keyword().to_string(),
            });
        }

        info!(
            "Installed session plugin '{}' (dir={}, cookie={})",
            plugin.keyword(),
            plugin.store().config().dir.display(),
            plugin.store().config().cookie_name
        );
        self.plugins.push(Arc::new(plugin));
        Ok(())
    }

    pub fn with(mut self, plugin: SessionPlugin) -> Result<Self, PluginError> {
        self.install(plugin)?;
        Ok(self)
    }

    pub fn get(&self, keyword: &str) -> Option<&Arc<SessionPlugin>> {
        self.plugins.iter().find(|plugin| plugin.keyword() == keyword)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<SessionPlugin>> {
        self.plugins.iter()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Create every plugin's session directory
    pub async fn ensure_dirs(&self) -> Result<(), SessionError> {
        for plugin in &self.plugins {
            plugin.store().ensure_dir().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_keyword_is_rejected() {
        let mut plugins = SessionPlugins::new();
        plugins.install(SessionPlugin::new(SessionConfig::default())).unwrap();

        let err = plugins
            .install(SessionPlugin::new(SessionConfig::default().with_cookie_lifetime(60)))
            .unwrap_err();
        assert_eq!(
            err,
            PluginError::Conflict {
                keyword: "session".to_string()
            }
        );
        assert_eq!(plugins.len(), 1);
    }

    #[test]
    fn test_invalid_cookie_name_is_rejected() {
        let mut config = SessionConfig::default();
        config.cookie_name = "px session".to_string();

        let err = SessionPlugins::new().with(SessionPlugin::new(config)).unwrap_err();
        assert_eq!(
            err,
            PluginError::InvalidCookieName {
                name: "px session".to_string()
            }
        );
    }

    #[test]
    fn test_distinct_keywords_coexist() {
        let plugins = SessionPlugins::new()
            .with(SessionPlugin::new(SessionConfig::default()))
            .unwrap()
            .with(SessionPlugin::new(SessionConfig::default().with_keyword("cart")))
            .unwrap();

        assert_eq!(plugins.len(), 2);
        assert!(plugins.get("cart").is_some());
        assert!(plugins.get("other").is_none());
    }
}
