use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};

use crate::config::Settings;
use crate::models::{Alert, Comparator, User};

/// Outbound notification channel. With no SMTP host configured the rendered
/// message is logged instead of sent, which is what dev environments use.
#[derive(Clone)]
pub struct Mailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: String,
}

impl Mailer {
    pub fn new(settings: &Settings) -> Self {
        let transport = if settings.smtp_host.trim().is_empty() {
            None
        } else {
            let creds = Credentials::new(
                settings.smtp_username.clone(),
                settings.smtp_password.clone(),
            );

            match AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.smtp_host) {
                Ok(builder) => Some(builder.port(settings.smtp_port).credentials(creds).build()),
                Err(e) => {
                    tracing::error!("invalid SMTP relay {}: {e}", settings.smtp_host);
                    None
                }
            }
        };

        Self {
            transport,
            from: settings.email_from.clone(),
        }
    }

    /// Sends one email covering every alert that fired for `user` in this
    /// evaluation cycle. Best-effort: once retries are exhausted the message
    /// is dropped and the persisted trigger records remain the durable
    /// evidence of the firing.
    pub async fn send_trigger_email(&self, user: &User, fired: &[Alert]) {
        if fired.is_empty() {
            return;
        }

        if user.email.trim().is_empty() {
            tracing::warn!(
                username = %user.username,
                "user has no email address, skipping notification"
            );
            return;
        }

        let subject = format!(
            "StockWatcher Alert: {} of your alerts have triggered!",
            fired.len()
        );

        let mut body = format!(
            "Hi {},\n\nThe following alerts have just triggered:\n\n",
            user.username
        );
        for alert in fired {
            let movement = match alert.comparator {
                Comparator::GreaterThan => "rose above",
                Comparator::LessThan => "dropped below",
            };
            body.push_str(&format!(
                "  - {} {} {:.2}\n",
                alert.symbol, movement, alert.threshold
            ));
        }
        body.push_str("\nThese alerts are now inactive. Reactivate them to keep watching.\n");

        let Some(transport) = &self.transport else {
            tracing::info!(to = %user.email, "SMTP not configured, notification body:\n{body}");
            return;
        };

        let from = match self.from.parse() {
            Ok(m) => m,
            Err(e) => {
                tracing::error!("invalid EMAIL_FROM address {}: {e}", self.from);
                return;
            }
        };
        let to = match user.email.parse() {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("invalid recipient address {}: {e}", user.email);
                return;
            }
        };

        let message = match Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
        {
            Ok(m) => m,
            Err(e) => {
                tracing::error!("failed to build notification email: {e}");
                return;
            }
        };

        let strategy = ExponentialBackoff::from_millis(2)
            .factor(500)
            .map(jitter)
            .take(3);

        match Retry::spawn(strategy, || async { transport.send(message.clone()).await }).await {
            Ok(_) => {
                tracing::info!(to = %user.email, count = fired.len(), "sent trigger notification")
            }
            Err(e) => tracing::error!(to = %user.email, "giving up on trigger notification: {e}"),
        }
    }
}
