use crate::database::{ReferralCount, VisitRepository};
use crate::utils::{day_start, error::ApiError};
use axum::{extract::State, Json};
use chrono::Local;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub day: i64,
    pub daily_visits: i64,
    pub unique_visits: i64,
    pub referrals: Vec<ReferralCount>,
}

/// Today's counters
pub async fn stats_handler(
    State(visits): State<Arc<VisitRepository>>,
) -> Result<Json<StatsResponse>, ApiError> {
    let day = day_start(&Local::now());
    let db = |e: anyhow::Error| ApiError::DatabaseError(e.to_string());

    let daily_visits = visits.daily_visits(day).await.map_err(db)?.map_or(0, |row| row.visits);
    let unique_visits = visits.unique_visits().await.map_err(db)?;
    let referrals = visits.referrals(day).await.map_err(db)?;

    Ok(Json(StatsResponse {
        day,
        daily_visits,
        unique_visits,
        referrals,
    }))
}
