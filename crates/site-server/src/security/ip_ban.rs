use crate::database::VisitRepository;
use crate::utils::error::ApiError;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Ban list keyed by a one-way hash of the client IP
pub struct IpBanList {
    repository: Arc<VisitRepository>,
    salt: String,
}

impl IpBanList {
    pub fn new(repository: Arc<VisitRepository>, salt: Option<String>) -> Self {
        Self {
            repository,
            salt: salt.unwrap_or_default(),
        }
    }

    /// Hex SHA-256 of `salt + ip`
    pub fn hash(&self, ip: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.salt.as_bytes());
        hasher.update(ip.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub async fn is_banned(&self, ip: &str) -> Result<bool, ApiError> {
        self.repository
            .is_banned(&self.hash(ip))
            .await
            .map_err(|e| ApiError::DatabaseError(e.to_string()))
    }

    /// Refuse banned callers
    pub async fn require_not_banned(&self, ip: &str) -> Result<(), ApiError> {
        if self.is_banned(ip).await? {
            warn!("Refused request from banned IP {}", ip);
            return Err(ApiError::Forbidden("Access denied".to_string()));
        }

        debug!("IP {} is not banned", ip);
        Ok(())
    }

    pub async fn ban(&self, ip: &str) -> Result<(), ApiError> {
        self.repository
            .ban(&self.hash(ip))
            .await
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

        info!("Banned IP {}", ip);
        Ok(())
    }

    pub async fn unban(&self, ip: &str) -> Result<bool, ApiError> {
        let lifted = self
            .repository
            .unban(&self.hash(ip))
            .await
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

        if lifted {
            info!("Lifted ban on IP {}", ip);
        }
        Ok(lifted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::RowStore;

    async fn ban_list(salt: Option<&str>) -> IpBanList {
        let store = RowStore::in_memory().await.unwrap();
        store.migrate().await.unwrap();
        let repository = Arc::new(VisitRepository::new(Arc::new(store)));
        IpBanList::new(repository, salt.map(str::to_string))
    }

    #[tokio::test]
    async fn test_hash_is_stable_and_salted() {
        let plain = ban_list(None).await;
        let salted = ban_list(Some("pepper")).await;

        assert_eq!(plain.hash("203.0.113.7"), plain.hash("203.0.113.7"));
        assert_eq!(plain.hash("203.0.113.7").len(), 64);
        assert_ne!(plain.hash("203.0.113.7"), salted.hash("203.0.113.7"));
        assert_ne!(plain.hash("203.0.113.7"), plain.hash("203.0.113.8"));
    }

    #[tokio::test]
    async fn test_banned_ip_is_forbidden() {
        let bans = ban_list(Some("pepper")).await;
        bans.require_not_banned("203.0.113.7").await.unwrap();

        bans.ban("203.0.113.7").await.unwrap();
        assert!(matches!(
            bans.require_not_banned("203.0.113.7").await,
            Err(ApiError::Forbidden(_))
        ));
        bans.require_not_banned("203.0.113.8").await.unwrap();

        assert!(bans.unban("203.0.113.7").await.unwrap());
        bans.require_not_banned("203.0.113.7").await.unwrap();
    }
}
