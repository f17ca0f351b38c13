use crate::services::LoginService;
use crate::utils::error::ApiError;
use axum::{extract::State, http::StatusCode, Json};
use px_session::Session;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

pub async fn request_code_handler(
    State(login): State<Arc<LoginService>>,
    session: Session,
    Json(request): Json<LoginRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    login.request_code(&session, &request.email).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse {
            message: "Login code sent".to_string(),
        }),
    ))
}

pub async fn verify_code_handler(
    State(login): State<Arc<LoginService>>,
    session: Session,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = login.verify_code(&session, &request.code).await?;
    Ok(Json(UserResponse { user }))
}

pub async fn logout_handler(
    State(login): State<Arc<LoginService>>,
    session: Session,
) -> Result<StatusCode, ApiError> {
    login.logout(&session).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me_handler(
    State(login): State<Arc<LoginService>>,
    session: Session,
) -> Result<Json<UserResponse>, ApiError> {
    let user = login
        .current_user(&session)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Not logged in".to_string()))?;

    Ok(Json(UserResponse { user }))
}
