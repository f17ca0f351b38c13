use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::id::SessionId;

/// Server-side lifetime used when no cookie lifetime is configured (14 days)
pub const MAX_TTL: u64 = 14 * 24 * 3600;

pub const DEFAULT_COOKIE_NAME: &str = "px.session";
pub const DEFAULT_KEYWORD: &str = "session";

const FILE_PREFIX: &str = "sess-px-";

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SessionConfig {
    /// Directory holding one file per session
    pub dir: PathBuf,
    pub cookie_name: String,
    /// Cookie `Max-Age` and server-side TTL in seconds. `None` issues a
    /// browser-session cookie and falls back to [`MAX_TTL`] on the server.
    pub cookie_lifetime: Option<u64>,
    /// Name handlers use to ask for this plugin's session
    pub keyword: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("/tmp"),
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            cookie_lifetime: None,
            keyword: DEFAULT_KEYWORD.to_string(),
        }
    }
}

impl SessionConfig {
    pub fn ttl(&self) -> u64 {
        self.cookie_lifetime.unwrap_or(MAX_TTL)
    }

    pub fn max_age(&self) -> Option<u64> {
        self.cookie_lifetime
    }

    pub fn file_path(&self, id: &SessionId) -> PathBuf {
        self.dir.join(format!("{}{}", FILE_PREFIX, id))
    }

    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = dir.into();
        self
    }

    pub fn with_cookie_lifetime(mut self, seconds: u64) -> Self {
        self.cookie_lifetime = Some(seconds);
        self
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = keyword.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.cookie_name, "px.session");
        assert_eq!(config.keyword, "session");
        assert_eq!(config.ttl(), 1_209_600);
        assert_eq!(config.max_age(), None);
    }

    #[test]
    fn test_lifetime_drives_ttl_and_max_age() {
        let config = SessionConfig::default().with_cookie_lifetime(600);
        assert_eq!(config.ttl(), 600);
        assert_eq!(config.max_age(), Some(600));
    }

    #[test]
    fn test_file_path() {
        let config = SessionConfig::default().with_dir("/var/sessions");
        let id = SessionId::parse("0123456789abcdef0123456789abcdef").unwrap();
        assert_eq!(
            config.file_path(&id),
            PathBuf::from("/var/sessions/sess-px-0123456789abcdef0123456789abcdef")
        );
    }
}
