use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session file {path} is not a JSON object: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("No session plugin installed for keyword '{0}'")]
    NotInstalled(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PluginError {
    #[error("Found another session plugin with conflicting settings (non-unique keyword '{keyword}')")]
    Conflict { keyword: String },

    #[error("Cookie name '{name}' is not a valid token")]
    InvalidCookieName { name: String },
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        tracing::error!("Session error: {}", self);
        (StatusCode::INTERNAL_SERVER_ERROR, "Session unavailable").into_response()
    }
}
