//! Email service for password reset links.
//!
//! Uses SMTP via lettre for delivery with Askama templates. Without SMTP
//! settings the link is written to the log instead.

use askama::Template;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use teamspirit_core::Email;

use crate::config::EmailConfig;

/// HTML template for the password reset email.
#[derive(Template)]
#[template(path = "email/password_reset.html")]
struct PasswordResetEmailHtml<'a> {
    name: &'a str,
    link: &'a str,
}

/// Plain text template for the password reset email.
#[derive(Template)]
#[template(path = "email/password_reset.txt")]
struct PasswordResetEmailText<'a> {
    name: &'a str,
    link: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum MailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Outgoing mail used by the application.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send the password reset `link` to `to`.
    async fn send_password_reset(&self, to: &Email, name: &str, link: &str)
    -> Result<(), MailError>;
}

/// SMTP mailer.
#[derive(Clone)]
pub struct SmtpMailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpMailer {
    /// Create a new SMTP mailer from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), MailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| MailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| MailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_password_reset(
        &self,
        to: &Email,
        name: &str,
        link: &str,
    ) -> Result<(), MailError> {
        let html = PasswordResetEmailHtml { name, link }.render()?;
        let text = PasswordResetEmailText { name, link }.render()?;

        self.send_multipart_email(
            to.as_str(),
            "Réinitialisation de votre mot de passe TeamSpirit",
            &text,
            &html,
        )
        .await
    }
}

/// Mailer for development setups without SMTP: logs the link.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_password_reset(
        &self,
        to: &Email,
        _name: &str,
        link: &str,
    ) -> Result<(), MailError> {
        tracing::info!(to = %to, link = %link, "SMTP not configured, password reset link not sent");
        Ok(())
    }
}

/// A message captured by [`RecordingMailer`].
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub to: Email,
    pub link: String,
}

/// Mailer that records messages, for tests.
#[cfg(any(test, feature = "test-support"))]
#[derive(Default)]
pub struct RecordingMailer {
    sent: tokio::sync::Mutex<Vec<SentMail>>,
}

#[cfg(any(test, feature = "test-support"))]
impl RecordingMailer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().await.clone()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_password_reset(
        &self,
        to: &Email,
        _name: &str,
        link: &str,
    ) -> Result<(), MailError> {
        self.sent.lock().await.push(SentMail {
            to: to.clone(),
            link: link.to_owned(),
        });
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_password_reset_templates_include_link() {
        let link = "https://club.example/profile/reset_password_confirm/4/abc/";
        let text = PasswordResetEmailText {
            name: "Lucie",
            link,
        }
        .render()
        .unwrap();
        assert!(text.contains(link));
        assert!(text.contains("Lucie"));

        let html = PasswordResetEmailHtml {
            name: "Lucie",
            link,
        }
        .render()
        .unwrap();
        assert!(html.contains("reset_password_confirm"));
    }

    #[tokio::test]
    async fn test_recording_mailer() {
        let mailer = RecordingMailer::new();
        let to = Email::parse("a@example.com").unwrap();
        mailer.send_password_reset(&to, "A", "/x/").await.unwrap();
        assert_eq!(mailer.sent().await.len(), 1);
    }
}
