// Admin notification sink: deduplicated alert fan-out to admin users,
// in-app rows plus best-effort email.

use crate::db::repositories::{NotificationRepository, UserRepository};
use crate::db::DbPool;
use crate::errors::NotifyError;
use crate::models::{AdminAlert, AlertOutcome, EmailStatus};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use metrics::counter;
use tracing::{debug, instrument, warn};

/// Email transport boundary. The production implementation posts to an
/// HTTP email API; tests substitute doubles.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Whether a transport is actually configured. Unconfigured mailers
    /// skip the email leg entirely instead of recording fake deliveries.
    fn enabled(&self) -> bool {
        true
    }
}

/// HTTP email API transport.
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: Option<String>,
    from_address: String,
}

impl HttpMailer {
    pub fn new(endpoint: Option<String>, from_address: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            from_address,
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    #[instrument(skip(self, body))]
    async fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let Some(endpoint) = &self.endpoint else {
            debug!("No mail endpoint configured, skipping send");
            return Ok(());
        };

        let response = self
            .client
            .post(endpoint)
            .json(&serde_json::json!({
                "from": self.from_address,
                "to": to,
                "subject": subject,
                "body": body,
            }))
            .send()
            .await?;
        response.error_for_status()?;
        Ok(())
    }

    fn enabled(&self) -> bool {
        self.endpoint.is_some()
    }
}

/// Fans alerts out to all admin-role users, suppressing repeats of the
/// same kind inside its dedupe window.
pub struct AdminNotifier {
    user_repo: UserRepository,
    notification_repo: NotificationRepository,
    mailer: std::sync::Arc<dyn Mailer>,
}

impl AdminNotifier {
    pub fn new(db_pool: DbPool, mailer: std::sync::Arc<dyn Mailer>) -> Self {
        Self {
            user_repo: UserRepository::new(db_pool.clone()),
            notification_repo: NotificationRepository::new(db_pool),
            mailer,
        }
    }

    /// Deliver `alert` to every admin, unless an alert of the same kind was
    /// already raised within its dedupe window. One notification row per
    /// recipient, one email attempt per recipient; email failures are
    /// recorded and tolerated.
    #[instrument(skip(self, alert), fields(kind = %alert.kind))]
    pub async fn notify_admin_users(&self, alert: &AdminAlert) -> Result<AlertOutcome, NotifyError> {
        let now = Utc::now();

        if let Some(last) = self
            .notification_repo
            .latest_of_kind(alert.kind.as_str())
            .await?
        {
            if now - last < Duration::minutes(alert.dedupe_window_minutes) {
                debug!(kind = %alert.kind, last_raised = %last, "Alert suppressed by dedupe window");
                counter!("admin_alerts_suppressed_total", "kind" => alert.kind.as_str())
                    .increment(1);
                return Ok(AlertOutcome::Suppressed { kind: alert.kind });
            }
        }

        let admins = self
            .user_repo
            .find_admins()
            .await
            .map_err(|e| NotifyError::RecipientLookup(e.to_string()))?;

        if admins.is_empty() {
            warn!(kind = %alert.kind, "No admin recipients for alert");
            return Ok(AlertOutcome::Delivered {
                kind: alert.kind,
                recipients: 0,
            });
        }

        for admin in &admins {
            let notification = self
                .notification_repo
                .create_for_recipient(admin.id, alert)
                .await?;

            if !self.mailer.enabled() {
                continue;
            }
            match self
                .mailer
                .send(&admin.email, &alert.title, &alert.message)
                .await
            {
                Ok(()) => {
                    self.notification_repo
                        .record_email_delivery(
                            Some(notification.id),
                            &admin.email,
                            EmailStatus::Sent,
                            None,
                        )
                        .await?;
                }
                Err(e) => {
                    warn!(recipient = %admin.email, error = %e, "Alert email failed");
                    self.notification_repo
                        .record_email_delivery(
                            Some(notification.id),
                            &admin.email,
                            EmailStatus::Failed,
                            Some(&e.to_string()),
                        )
                        .await?;
                }
            }
        }

        counter!("admin_alerts_delivered_total", "kind" => alert.kind.as_str()).increment(1);
        Ok(AlertOutcome::Delivered {
            kind: alert.kind,
            recipients: admins.len(),
        })
    }
}
