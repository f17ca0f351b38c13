use crate::utils::error::ApiError;
use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::request::Parts,
};
use std::net::{IpAddr, SocketAddr};
use tracing::debug;

pub const FORWARDED_FOR: &str = "x-forwarded-for";

/// Caller address: first `X-Forwarded-For` hop, else the TCP peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get(FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        if let Some(ip) = forwarded {
            debug!("Client IP from {}: {}", FORWARDED_FOR, ip);
            let ip = ip
                .parse::<IpAddr>()
                .map(|addr| addr.to_string())
                .unwrap_or_else(|_| ip.to_string());
            return Ok(ClientIp(ip));
        }

        parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| ClientIp(addr.ip().to_string()))
            .ok_or_else(|| ApiError::BadRequest("Unable to determine client address".to_string()))
    }
}
