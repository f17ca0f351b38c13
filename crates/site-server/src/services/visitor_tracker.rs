use crate::database::VisitRepository;
use crate::security::IpBanList;
use crate::utils::{day_start, error::ApiError};
use axum::http::Uri;
use chrono::{DateTime, Local, TimeZone};
use px_session::Session;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

pub const LAST_VISIT_KEY: &str = "last_visit";

/// Request facts the tracker needs
#[derive(Debug, Clone)]
pub struct Visit {
    pub client_ip: String,
    /// Raw `Referer` header
    pub referrer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitOutcome {
    /// Session had never been seen before
    pub first_visit: bool,
    /// Session's last visit was before today's bucket (or never)
    pub first_today: bool,
    /// External referring host that was counted
    pub referral: Option<String>,
}

/// Daily, unique and referral counters with at most one increment per
/// session per day
pub struct VisitorTracker {
    repository: Arc<VisitRepository>,
    bans: Arc<IpBanList>,
    internal_domains: HashSet<String>,
}

impl VisitorTracker {
    pub fn new(
        repository: Arc<VisitRepository>,
        bans: Arc<IpBanList>,
        internal_domains: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            repository,
            bans,
            internal_domains: internal_domains
                .into_iter()
                .map(|d| d.to_ascii_lowercase())
                .collect(),
        }
    }

    pub async fn track(&self, session: &Session, visit: &Visit) -> Result<VisitOutcome, ApiError> {
        self.track_at(session, visit, Local::now()).await
    }

    pub async fn track_at<Tz: TimeZone>(
        &self,
        session: &Session,
        visit: &Visit,
        now: DateTime<Tz>,
    ) -> Result<VisitOutcome, ApiError> {
        let day = day_start(&now);
        let timestamp = now.timestamp_micros() as f64 / 1_000_000.0;

        // Nothing is counted for banned callers
        self.bans.require_not_banned(&visit.client_ip).await?;

        let last_visit = session.get_as::<f64>(LAST_VISIT_KEY).await?;
        let first_visit = last_visit.is_none();
        let first_today = last_visit.map_or(true, |last| last < day as f64);

        self.repository
            .record_daily(day, first_today)
            .await
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

        if first_visit {
            self.repository
                .increment_unique()
                .await
                .map_err(|e| ApiError::DatabaseError(e.to_string()))?;
        }

        let referral = visit
            .referrer
            .as_deref()
            .and_then(referrer_host)
            .filter(|host| !self.internal_domains.contains(host));

        if let Some(host) = referral.as_deref() {
            self.repository
                .record_referral(day, host, first_today)
                .await
                .map_err(|e| ApiError::DatabaseError(e.to_string()))?;
        }

        session.set(LAST_VISIT_KEY, timestamp).await?;

        debug!(
            "Tracked visit: first_visit={}, first_today={}, referral={:?}",
            first_visit, first_today, referral
        );

        Ok(VisitOutcome {
            first_visit,
            first_today,
            referral,
        })
    }
}

/// Lower-cased host of a `Referer` value
fn referrer_host(referrer: &str) -> Option<String> {
    let uri = referrer.trim().parse::<Uri>().ok()?;
    uri.host()
        .filter(|host| !host.is_empty())
        .map(|host| host.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::RowStore;
    use chrono::{Duration, Utc};
    use px_session::{SessionConfig, SessionStore};

    struct Fixture {
        tracker: VisitorTracker,
        repository: Arc<VisitRepository>,
        bans: Arc<IpBanList>,
        sessions: Arc<SessionStore>,
        _dir: tempfile::TempDir,
    }

    async fn fixture() -> Fixture {
        let store = RowStore::in_memory().await.unwrap();
        store.migrate().await.unwrap();
        let repository = Arc::new(VisitRepository::new(Arc::new(store)));
        let bans = Arc::new(IpBanList::new(repository.clone(), None));
        let tracker = VisitorTracker::new(
            repository.clone(),
            bans.clone(),
            vec!["example.com".to_string(), "www.example.com".to_string()],
        );

        let dir = tempfile::tempdir().unwrap();
        let sessions = Arc::new(SessionStore::new(SessionConfig::default().with_dir(dir.path())));

        Fixture {
            tracker,
            repository,
            bans,
            sessions,
            _dir: dir,
        }
    }

    fn visit(referrer: Option<&str>) -> Visit {
        Visit {
            client_ip: "203.0.113.7".to_string(),
            referrer: referrer.map(str::to_string),
        }
    }

    fn noon() -> DateTime<Utc> {
        let today = Utc::now().date_naive();
        today.and_hms_opt(12, 0, 0).unwrap().and_utc()
    }

    async fn daily(fx: &Fixture, now: &DateTime<Utc>) -> i64 {
        fx.repository
            .daily_visits(day_start(now))
            .await
            .unwrap()
            .map_or(0, |row| row.visits)
    }

    #[tokio::test]
    async fn test_fresh_session_counts_once() {
        let fx = fixture().await;
        let session = Session::create(fx.sessions.clone()).await.unwrap();
        let now = noon();

        let outcome = fx.tracker.track_at(&session, &visit(None), now).await.unwrap();
        assert!(outcome.first_visit);
        assert!(outcome.first_today);
        assert_eq!(daily(&fx, &now).await, 1);
        assert_eq!(fx.repository.unique_visits().await.unwrap(), 1);

        let later = now + Duration::hours(2);
        let outcome = fx.tracker.track_at(&session, &visit(None), later).await.unwrap();
        assert!(!outcome.first_visit);
        assert!(!outcome.first_today);
        assert_eq!(daily(&fx, &now).await, 1);
        assert_eq!(fx.repository.unique_visits().await.unwrap(), 1);

        let stored = session.get_as::<f64>(LAST_VISIT_KEY).await.unwrap().unwrap();
        assert_eq!(stored, later.timestamp() as f64);
    }

    #[tokio::test]
    async fn test_two_sessions_same_day() {
        let fx = fixture().await;
        let now = noon();

        for _ in 0..2 {
            let session = Session::create(fx.sessions.clone()).await.unwrap();
            fx.tracker.track_at(&session, &visit(None), now).await.unwrap();
        }

        assert_eq!(daily(&fx, &now).await, 2);
        assert_eq!(fx.repository.unique_visits().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_returning_session_next_day() {
        let fx = fixture().await;
        let session = Session::create(fx.sessions.clone()).await.unwrap();
        let yesterday = noon() - Duration::days(1);
        let today = noon();

        fx.tracker.track_at(&session, &visit(None), yesterday).await.unwrap();
        let outcome = fx.tracker.track_at(&session, &visit(None), today).await.unwrap();

        assert!(!outcome.first_visit);
        assert!(outcome.first_today);
        assert_eq!(daily(&fx, &yesterday).await, 1);
        assert_eq!(daily(&fx, &today).await, 1);
        assert_eq!(fx.repository.unique_visits().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_repeat_visitor_creates_todays_row() {
        let fx = fixture().await;
        let session = Session::create(fx.sessions.clone()).await.unwrap();
        let now = noon();

        // Seen earlier today, but today's row does not exist yet
        session.set(LAST_VISIT_KEY, now.timestamp() as f64).await.unwrap();
        let outcome = fx.tracker.track_at(&session, &visit(None), now).await.unwrap();

        assert!(!outcome.first_today);
        assert_eq!(daily(&fx, &now).await, 1);
        assert_eq!(fx.repository.unique_visits().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_external_referral_counted_once_per_day() {
        let fx = fixture().await;
        let session = Session::create(fx.sessions.clone()).await.unwrap();
        let now = noon();
        let hn = Some("https://News.YCombinator.com/item?id=1");

        let outcome = fx.tracker.track_at(&session, &visit(hn), now).await.unwrap();
        assert_eq!(outcome.referral.as_deref(), Some("news.ycombinator.com"));

        fx.tracker
            .track_at(&session, &visit(hn), now + Duration::minutes(5))
            .await
            .unwrap();

        let rows = fx.repository.referrals(day_start(&now)).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].site, "news.ycombinator.com");
        assert_eq!(rows[0].visits, 1);
    }

    #[tokio::test]
    async fn test_internal_and_missing_referrers_ignored() {
        let fx = fixture().await;
        let session = Session::create(fx.sessions.clone()).await.unwrap();
        let now = noon();

        let outcome = fx
            .tracker
            .track_at(&session, &visit(Some("https://www.example.com/blog")), now)
            .await
            .unwrap();
        assert_eq!(outcome.referral, None);

        let outcome = fx
            .tracker
            .track_at(&session, &visit(Some("not a url")), now)
            .await
            .unwrap();
        assert_eq!(outcome.referral, None);

        fx.tracker.track_at(&session, &visit(None), now).await.unwrap();
        assert!(fx.repository.referrals(day_start(&now)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_banned_ip_refused_before_counting() {
        let fx = fixture().await;
        let session = Session::create(fx.sessions.clone()).await.unwrap();
        let now = noon();
        fx.bans.ban("203.0.113.7").await.unwrap();

        let err = fx
            .tracker
            .track_at(&session, &visit(Some("https://lobste.rs/")), now)
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Forbidden(_)));
        assert_eq!(daily(&fx, &now).await, 0);
        assert_eq!(fx.repository.unique_visits().await.unwrap(), 0);
        assert!(fx.repository.referrals(day_start(&now)).await.unwrap().is_empty());
        assert!(!session.contains(LAST_VISIT_KEY).await);
    }

    #[test]
    fn test_referrer_host() {
        assert_eq!(referrer_host("https://Example.com/a?b=c").as_deref(), Some("example.com"));
        assert_eq!(referrer_host("http://lobste.rs:8080/").as_deref(), Some("lobste.rs"));
        assert_eq!(referrer_host("/relative/path"), None);
        assert_eq!(referrer_host(""), None);
    }
}
