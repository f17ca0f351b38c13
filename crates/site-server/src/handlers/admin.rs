use crate::security::IpBanList;
use crate::utils::error::ApiError;
use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use std::net::IpAddr;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct BanRequest {
    pub ip: String,
}

fn parse_ip(raw: &str) -> Result<String, ApiError> {
    raw.trim()
        .parse::<IpAddr>()
        .map(|ip| ip.to_string())
        .map_err(|_| ApiError::BadRequest(format!("Invalid IP address: {}", raw)))
}

pub async fn add_ban_handler(
    State(bans): State<Arc<IpBanList>>,
    Json(request): Json<BanRequest>,
) -> Result<StatusCode, ApiError> {
    bans.ban(&parse_ip(&request.ip)?).await?;
    Ok(StatusCode::CREATED)
}

pub async fn remove_ban_handler(
    State(bans): State<Arc<IpBanList>>,
    Json(request): Json<BanRequest>,
) -> Result<StatusCode, ApiError> {
    if bans.unban(&parse_ip(&request.ip)?).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("No ban for {}", request.ip)))
    }
}
