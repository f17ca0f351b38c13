//! # PX Session
//!
//! Cookie-identified, file-backed sessions for axum services.
//!
//! Every session lives in one JSON file `{dir}/sess-px-{id}`. The id is a
//! random 128-bit value rendered as 32 hex characters and doubles as the
//! cookie value. Writes go straight to disk; expiry is sliding and checked on
//! every read or write.

pub mod config;
pub mod cookie;
pub mod error;
pub mod id;
pub mod middleware;
pub mod plugin;
pub mod session;
pub mod store;

pub use config::SessionConfig;
pub use cookie::CookieChange;
pub use error::{PluginError, SessionError};
pub use id::SessionId;
pub use middleware::{session_middleware, Sessions};
pub use plugin::{SessionPlugin, SessionPlugins};
pub use session::Session;
pub use store::SessionStore;
