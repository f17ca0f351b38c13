use crate::config::LoginConfig;
use crate::services::Mailer;
use crate::utils::{error::ApiError, random::random_digits, unix_now};
use email_address::EmailAddress;
use px_session::Session;
use std::sync::Arc;
use tracing::{info, warn};

pub const LOGIN_EMAIL_KEY: &str = "login_email";
pub const LOGIN_CODE_KEY: &str = "login_code";
pub const LOGIN_ISSUED_KEY: &str = "login_code_issued";
pub const LOGIN_ATTEMPTS_KEY: &str = "login_attempts";
pub const USER_KEY: &str = "user";

/// Passwordless login: a one-time code is mailed to the visitor and checked
/// against the copy kept in their session
pub struct LoginService {
    mailer: Arc<dyn Mailer>,
    config: LoginConfig,
}

impl LoginService {
    pub fn new(mailer: Arc<dyn Mailer>, config: LoginConfig) -> Self {
        Self { mailer, config }
    }

    pub async fn request_code(&self, session: &Session, email: &str) -> Result<(), ApiError> {
        let email = email.trim();
        if !EmailAddress::is_valid(email) {
            return Err(ApiError::BadRequest(format!("Invalid email address: {}", email)));
        }

        let code = random_digits(self.config.code_length);
        session.set(LOGIN_EMAIL_KEY, email).await?;
        session.set(LOGIN_CODE_KEY, &code).await?;
        session.set(LOGIN_ISSUED_KEY, unix_now()).await?;
        session.delete(LOGIN_ATTEMPTS_KEY).await?;

        let minutes = (self.config.code_ttl_seconds / 60).max(1);
        let plain = format!(
            "Your login code is {}. It expires in {} minutes.",
            code, minutes
        );
        let html = format!(
            "<p>Your login code is <strong>{}</strong>.</p><p>It expires in {} minutes.</p>",
            code, minutes
        );

        self.mailer.send(email, "Your login code", &plain, &html).await?;

        info!("Login code issued for {}", email);
        Ok(())
    }

    /// Check `code`; on success the session is logged in and the email returned
    pub async fn verify_code(&self, session: &Session, code: &str) -> Result<String, ApiError> {
        self.verify_code_at(session, code, unix_now()).await
    }

    async fn verify_code_at(&self, session: &Session, code: &str, now: f64) -> Result<String, ApiError> {
        let expected = session.get_as::<String>(LOGIN_CODE_KEY).await?;
        let issued = session.get_as::<f64>(LOGIN_ISSUED_KEY).await?;
        let email = session.get_as::<String>(LOGIN_EMAIL_KEY).await?;

        let (Some(expected), Some(issued), Some(email)) = (expected, issued, email) else {
            return Err(ApiError::Unauthorized("No login code pending".to_string()));
        };

        if now - issued > self.config.code_ttl_seconds as f64 {
            clear_pending(session).await?;
            warn!("Expired login code presented for {}", email);
            return Err(ApiError::Unauthorized("Login code expired".to_string()));
        }

        if code.trim() != expected {
            let attempts = session.get_as::<u32>(LOGIN_ATTEMPTS_KEY).await?.unwrap_or(0) + 1;
            if attempts >= self.config.max_attempts {
                clear_pending(session).await?;
                warn!("Too many wrong login codes for {}, code revoked", email);
                return Err(ApiError::Unauthorized("Too many attempts".to_string()));
            }

            session.set(LOGIN_ATTEMPTS_KEY, attempts).await?;
            warn!("Wrong login code presented for {} ({} attempts)", email, attempts);
            return Err(ApiError::Unauthorized("Invalid login code".to_string()));
        }

        clear_pending(session).await?;
        // New id for the authenticated session
        session.cycle_id().await?;
        session.set(USER_KEY, &email).await?;

        info!("{} logged in", email);
        Ok(email)
    }

    pub async fn current_user(&self, session: &Session) -> Result<Option<String>, ApiError> {
        Ok(session.get_as::<String>(USER_KEY).await?)
    }

    pub async fn logout(&self, session: &Session) -> Result<(), ApiError> {
        session.destroy().await?;
        Ok(())
    }
}

async fn clear_pending(session: &Session) -> Result<(), ApiError> {
    for key in [LOGIN_CODE_KEY, LOGIN_ISSUED_KEY, LOGIN_EMAIL_KEY, LOGIN_ATTEMPTS_KEY] {
        session.delete(key).await?;
    }
    Ok(())
}
