use anyhow::Result;
use config::{builder::DefaultState, Config, ConfigBuilder, Environment, File};
use px_session::SessionConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
    pub mail: MailConfig,
    #[serde(default)]
    pub login: LoginConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub enable_admin: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct TrackerConfig {
    /// Hosts whose referrals are not counted (the site's own domains)
    #[serde(default)]
    pub internal_domains: Vec<String>,
    /// Prepended to the client IP before hashing
    #[serde(default)]
    pub ip_salt: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MailConfig {
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub from: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoginConfig {
    #[serde(default = "default_code_length")]
    pub code_length: usize,
    #[serde(default = "default_code_ttl")]
    pub code_ttl_seconds: u64,
    /// Wrong guesses allowed before the pending code is revoked
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            code_length: default_code_length(),
            code_ttl_seconds: default_code_ttl(),
            max_attempts: default_max_attempts(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// `EnvFilter` directives; `RUST_LOG` wins when set
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default = "default_log_dir")]
    pub dir: PathBuf,
    /// Daily files are named `{file_prefix}.YYYY-MM-DD.log`
    #[serde(default = "default_log_prefix")]
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            dir: default_log_dir(),
            file_prefix: default_log_prefix(),
        }
    }
}

fn default_log_level() -> String {
    "info,site_server=debug,px_session=debug".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_prefix() -> String {
    "site".to_string()
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    465
}

fn default_code_length() -> usize {
    6
}

fn default_code_ttl() -> u64 {
    600
}

fn default_max_attempts() -> u32 {
    5
}

impl Settings {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let builder = Config::builder().add_source(File::with_name("config/settings").required(true));
        Self::build(builder)
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let config = builder
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("tracker.internal_domains")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        Ok(settings)
    }
}

impl DatabaseConfig {
    /// Location of the SQLite file, `None` for in-memory databases
    pub fn file_path(&self) -> Option<PathBuf> {
        let path = self
            .url
            .strip_prefix("sqlite://")
            .or_else(|| self.url.strip_prefix("sqlite:"))
            .unwrap_or(&self.url);
        let path = path.split('?').next().unwrap_or(path);

        if path.is_empty() || path == ":memory:" {
            None
        } else {
            Some(PathBuf::from(path))
        }
    }
}
