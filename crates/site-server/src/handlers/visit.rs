use crate::security::ClientIp;
use crate::services::{Visit, VisitorTracker};
use crate::utils::error::ApiError;
use axum::{
    extract::State,
    http::{header, HeaderMap},
    Json,
};
use px_session::Session;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct VisitResponse {
    pub session: String,
    pub first_visit: bool,
    pub first_today: bool,
}

/// Landing page hit: counts the visit and reports what was counted
pub async fn index_handler(
    State(tracker): State<Arc<VisitorTracker>>,
    ClientIp(client_ip): ClientIp,
    headers: HeaderMap,
    session: Session,
) -> Result<Json<VisitResponse>, ApiError> {
    let visit = Visit {
        client_ip,
        referrer: headers
            .get(header::REFERER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    };

    let outcome = tracker.track(&session, &visit).await?;

    Ok(Json(VisitResponse {
        session: session.id().await.to_string(),
        first_visit: outcome.first_visit,
        first_today: outcome.first_today,
    }))
}
