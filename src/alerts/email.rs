use async_trait::async_trait;
use lettre::message::{header, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use super::Notifier;
use crate::config::SmtpConfig;
use crate::utils::error::{AppError, Result};

/// SMTP delivery with an HTML body and a plain-text alternative.
pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    recipients: Vec<Mailbox>,
}

impl EmailNotifier {
    pub fn new(smtp: &SmtpConfig, recipients: &[String]) -> Result<Self> {
        let username = smtp
            .username
            .clone()
            .ok_or_else(|| AppError::Notification("SMTP username missing".to_string()))?;
        let password = smtp
            .password
            .clone()
            .ok_or_else(|| AppError::Notification("SMTP password missing".to_string()))?;

        let from_address = smtp.from_address.clone().unwrap_or_else(|| username.clone());
        let from: Mailbox = format!("{} <{}>", smtp.from_name, from_address)
            .parse()
            .map_err(|e| AppError::Notification(format!("invalid from address: {e}")))?;

        let parsed: Vec<Mailbox> = recipients
            .iter()
            .map(|r| {
                r.parse()
                    .map_err(|e| AppError::Notification(format!("invalid recipient {r}: {e}")))
            })
            .collect::<Result<_>>()?;
        if parsed.is_empty() {
            return Err(AppError::Notification("no recipients configured".to_string()));
        }

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)
            .map_err(|e| AppError::Notification(e.to_string()))?
            .port(smtp.port)
            .credentials(Credentials::new(username, password))
            .build();

        Ok(EmailNotifier {
            mailer,
            from,
            recipients: parsed,
        })
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, subject: &str, html_body: &str, text_body: &str) -> Result<()> {
        let mut builder = Message::builder().from(self.from.clone()).subject(subject);
        for recipient in &self.recipients {
            builder = builder.to(recipient.clone());
        }

        let email = builder
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )
            .map_err(|e| AppError::Notification(e.to_string()))?;

        self.mailer
            .send(email)
            .await
            .map_err(|e| AppError::Notification(e.to_string()))?;

        info!(subject, recipients = self.recipients.len(), "alert email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smtp_config() -> SmtpConfig {
        SmtpConfig {
            username: Some("bot@example.com".to_string()),
            password: Some("secret".to_string()),
            ..SmtpConfig::default()
        }
    }

    #[test]
    fn test_notifier_builds_with_full_config() {
        let notifier = EmailNotifier::new(&smtp_config(), &["ops@example.com".to_string()]);
        assert!(notifier.is_ok());
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let smtp = SmtpConfig::default();
        let err = EmailNotifier::new(&smtp, &["ops@example.com".to_string()])
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(err, AppError::Notification(_)));
    }

    #[test]
    fn test_empty_recipients_rejected() {
        let err = EmailNotifier::new(&smtp_config(), &[]).map(|_| ()).unwrap_err();
        assert!(err.to_string().contains("no recipients"));
    }

    #[test]
    fn test_invalid_recipient_rejected() {
        let err = EmailNotifier::new(&smtp_config(), &["pas une adresse".to_string()])
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(err, AppError::Notification(_)));
    }
}
