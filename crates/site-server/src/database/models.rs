use serde::Serialize;
use sqlx::FromRow;

/// Visits counted for one day bucket
#[derive(Debug, Clone, FromRow, Serialize, PartialEq, Eq)]
pub struct DailyVisits {
    pub datetime: i64,
    pub visits: i64,
}

/// Visits referred by an external site on one day bucket
#[derive(Debug, Clone, FromRow, Serialize, PartialEq, Eq)]
pub struct ReferralCount {
    pub site: String,
    pub datetime: i64,
    pub visits: i64,
}
