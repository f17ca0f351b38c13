use super::{DailyVisits, ReferralCount, RowStore};
use anyhow::Result;
use std::sync::Arc;
use tracing::debug;

/// Visit counters and the IP ban list
pub struct VisitRepository {
    pub store: Arc<RowStore>,
}

impl VisitRepository {
    pub fn new(store: Arc<RowStore>) -> Self {
        Self { store }
    }

    /// Count a visit for `day`. The first visit of the day inserts the row;
    /// later visits only increment it when `first_today` is set.
    pub async fn record_daily(&self, day: i64, first_today: bool) -> Result<()> {
        self.store
            .transaction(move |conn| {
                Box::pin(async move {
                    let existing = sqlx::query_scalar::<_, i64>(
                        "SELECT visits FROM visit_stats WHERE datetime = ?",
                    )
                    .bind(day)
                    .fetch_optional(&mut *conn)
                    .await?;

                    match existing {
                        None => {
                            sqlx::query("INSERT INTO visit_stats (datetime, visits) VALUES (?, 1)")
                                .bind(day)
                                .execute(&mut *conn)
                                .await?;
                        }
                        Some(_) if first_today => {
                            sqlx::query(
                                "UPDATE visit_stats SET visits = visits + 1 WHERE datetime = ?",
                            )
                            .bind(day)
                            .execute(&mut *conn)
                            .await?;
                        }
                        Some(_) => {}
                    }

                    Ok(())
                })
            })
            .await?;

        debug!("Recorded daily visit for {} (first_today={})", day, first_today);
        Ok(())
    }

    pub async fn daily_visits(&self, day: i64) -> Result<Option<DailyVisits>> {
        let row = self
            .store
            .transaction(move |conn| {
                Box::pin(async move {
                    sqlx::query_as::<_, DailyVisits>(
                        "SELECT datetime, visits FROM visit_stats WHERE datetime = ?",
                    )
                    .bind(day)
                    .fetch_optional(&mut *conn)
                    .await
                })
            })
            .await?;

        Ok(row)
    }

    pub async fn increment_unique(&self) -> Result<()> {
        self.store
            .transaction(|conn| {
                Box::pin(async move {
                    sqlx::query("UPDATE unique_visit_stats SET visits = visits + 1")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .await?;

        Ok(())
    }

    pub async fn unique_visits(&self) -> Result<i64> {
        let total = self
            .store
            .transaction(|conn| {
                Box::pin(async move {
                    sqlx::query_scalar::<_, i64>("SELECT COALESCE(SUM(visits), 0) FROM unique_visit_stats")
                        .fetch_one(&mut *conn)
                        .await
                })
            })
            .await?;

        Ok(total)
    }

    /// Same day-bucketed rule as [`VisitRepository::record_daily`], keyed by
    /// referring site
    pub async fn record_referral(&self, day: i64, site: &str, first_today: bool) -> Result<()> {
        let site = site.to_string();

        self.store
            .transaction(move |conn| {
                Box::pin(async move {
                    let existing = sqlx::query_scalar::<_, i64>(
                        "SELECT visits FROM visit_tracing WHERE site = ? AND datetime = ?",
                    )
                    .bind(&site)
                    .bind(day)
                    .fetch_optional(&mut *conn)
                    .await?;

                    match existing {
                        None => {
                            sqlx::query(
                                "INSERT INTO visit_tracing (site, datetime, visits) VALUES (?, ?, 1)",
                            )
                            .bind(&site)
                            .bind(day)
                            .execute(&mut *conn)
                            .await?;
                        }
                        Some(_) if first_today => {
                            sqlx::query(
                                "UPDATE visit_tracing SET visits = visits + 1 WHERE site = ? AND datetime = ?",
                            )
                            .bind(&site)
                            .bind(day)
                            .execute(&mut *conn)
                            .await?;
                        }
                        Some(_) => {}
                    }

                    Ok(())
                })
            })
            .await?;

        Ok(())
    }

    pub async fn referrals(&self, day: i64) -> Result<Vec<ReferralCount>> {
        let rows = self
            .store
            .transaction(move |conn| {
                Box::pin(async move {
                    sqlx::query_as::<_, ReferralCount>(
                        r#"SELECT site, datetime, visits
                           FROM visit_tracing
                           WHERE datetime = ?
                           ORDER BY visits DESC, site ASC"#,
                    )
                    .bind(day)
                    .fetch_all(&mut *conn)
                    .await
                })
            })
            .await?;

        Ok(rows)
    }

    pub async fn is_banned(&self, ip_hash: &str) -> Result<bool> {
        let ip_hash = ip_hash.to_string();

        let count = self
            .store
            .transaction(move |conn| {
                Box::pin(async move {
                    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM ip_bans WHERE ip_hash = ?")
                        .bind(ip_hash)
                        .fetch_one(&mut *conn)
                        .await
                })
            })
            .await?;

        Ok(count > 0)
    }

    pub async fn ban(&self, ip_hash: &str) -> Result<()> {
        let ip_hash = ip_hash.to_string();

        self.store
            .transaction(move |conn| {
                Box::pin(async move {
                    sqlx::query("INSERT OR IGNORE INTO ip_bans (ip_hash) VALUES (?)")
                        .bind(ip_hash)
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .await?;

        Ok(())
    }

    /// Returns whether a ban was lifted
    pub async fn unban(&self, ip_hash: &str) -> Result<bool> {
        let ip_hash = ip_hash.to_string();

        let affected = self
            .store
            .transaction(move |conn| {
                Box::pin(async move {
                    let result = sqlx::query("DELETE FROM ip_bans WHERE ip_hash = ?")
                        .bind(ip_hash)
                        .execute(&mut *conn)
                        .await?;
                    Ok(result.rows_affected())
                })
            })
            .await?;

        Ok(affected > 0)
    }
}
