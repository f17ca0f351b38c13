use crate::config::MailConfig;
use crate::utils::error::ApiError;
use async_trait::async_trait;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send a multipart/alternative message with plain and HTML bodies
    async fn send(&self, receiver: &str, subject: &str, plain: &str, html: &str) -> Result<(), ApiError>;
}

/// SMTP over implicit TLS with the credentials from [`MailConfig`]
pub struct SmtpMailer {
    config: MailConfig,
}

impl SmtpMailer {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }

    pub fn build_message(
        &self,
        receiver: &str,
        subject: &str,
        plain: &str,
        html: &str,
    ) -> Result<Message, ApiError> {
        let from = self.config.from.parse::<Mailbox>().map_err(mail_error)?;
        let to = receiver.parse::<Mailbox>().map_err(mail_error)?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .multipart(MultiPart::alternative_plain_html(
                plain.to_string(),
                html.to_string(),
            ))
            .map_err(mail_error)
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, receiver: &str, subject: &str, plain: &str, html: &str) -> Result<(), ApiError> {
        let message = self.build_message(receiver, subject, plain, html)?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.smtp_host)
            .map_err(mail_error)?
            .port(self.config.smtp_port)
            .credentials(Credentials::new(
                self.config.from.clone(),
                self.config.password.clone(),
            ))
            .build();

        transport.send(message).await.map_err(mail_error)?;

        info!("Mail '{}' sent to {}", subject, receiver);
        Ok(())
    }
}

fn mail_error(err: impl std::fmt::Display) -> ApiError {
    ApiError::MailError(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mailer() -> SmtpMailer {
        SmtpMailer::new(MailConfig {
            smtp_host: "smtp.example.com".into(),
            smtp_port: 465,
            from: "site@example.com".into(),
            password: "secret".into(),
        })
    }

    #[test]
    fn test_build_message() {
        let message = mailer()
            .build_message("ana@example.com", "Your login code", "code 123456", "<b>123456</b>")
            .unwrap();

        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: Your login code"));
        assert!(raw.contains("To: ana@example.com"));
        assert!(raw.contains("multipart/alternative"));
    }

    #[test]
    fn test_invalid_receiver() {
        let err = mailer()
            .build_message("not an address", "s", "p", "h")
            .unwrap_err();
        assert!(matches!(err, ApiError::MailError(_)));
    }
}
