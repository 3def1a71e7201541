// System health monitor: aggregates operational signals over fixed
// lookback windows and escalates threshold crossings as admin alerts.

use crate::config::MonitorConfig;
use crate::db::repositories::{
    AuditRepository, ContentRepository, NotificationRepository, UserRepository,
};
use crate::db::DbPool;
use crate::guard::{PassiveOutcome, RunGuard};
use crate::models::{
    AdminAlert, AlertKind, AlertOutcome, AuthEventKind, ContentKind, MonitorSignals,
    MonitorSummary,
};
use crate::notify::AdminNotifier;
use chrono::{DateTime, Duration, Utc};
use metrics::{counter, gauge};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tracing::{debug, instrument, warn};

/// Evaluate which alerts the gathered signals warrant. Pure: thresholds in,
/// alerts out.
pub fn evaluate_signals(signals: &MonitorSignals, config: &MonitorConfig) -> Vec<AdminAlert> {
    let mut alerts = Vec::new();

    let backlog = signals.scheduler_backlog();
    if backlog > 0 {
        alerts.push(AdminAlert::new(
            AlertKind::SchedulerBacklog,
            format!(
                "{} scheduled item(s) are more than {} minutes overdue for publishing",
                backlog, config.scheduler_lag_minutes
            ),
            serde_json::json!({
                "overdueScheduledPosts": signals.overdue_scheduled_posts,
                "overdueScheduledReviews": signals.overdue_scheduled_reviews,
            }),
        ));
    }

    if signals.failed_emails_last_hour >= config.failed_email_threshold {
        alerts.push(AdminAlert::new(
            AlertKind::EmailFailures,
            format!(
                "{} outbound email(s) failed in the last hour",
                signals.failed_emails_last_hour
            ),
            serde_json::json!({
                "failedEmailsLastHour": signals.failed_emails_last_hour,
            }),
        ));
    }

    if signals.failed_admin_logins_last_hour >= config.failed_login_threshold
        || signals.rate_limited_logins_last_hour >= config.rate_limited_threshold
        || signals.locked_admin_accounts > 0
    {
        alerts.push(AdminAlert::new(
            AlertKind::AuthAnomalies,
            format!(
                "{} failed login(s), {} rate-limited attempt(s), {} locked admin account(s)",
                signals.failed_admin_logins_last_hour,
                signals.rate_limited_logins_last_hour,
                signals.locked_admin_accounts
            ),
            serde_json::json!({
                "failedLoginsLastHour": signals.failed_admin_logins_last_hour,
                "rateLimitedLastHour": signals.rate_limited_logins_last_hour,
                "lockedAdminAccounts": signals.locked_admin_accounts,
            }),
        ));
    }

    if signals.risky_audit_actions_last_day > 0 {
        alerts.push(AdminAlert::new(
            AlertKind::RiskyAuditActions,
            format!(
                "{} risky administrative action(s) recorded in the last 24 hours",
                signals.risky_audit_actions_last_day
            ),
            serde_json::json!({
                "riskyActionsLastDay": signals.risky_audit_actions_last_day,
            }),
        ));
    }

    alerts
}

/// Periodic health evaluation invoked opportunistically from request paths,
/// throttled by its own in-process guard.
pub struct HealthMonitor {
    content_repo: ContentRepository,
    notification_repo: NotificationRepository,
    user_repo: UserRepository,
    audit_repo: AuditRepository,
    notifier: Arc<AdminNotifier>,
    guard: RunGuard,
    config: MonitorConfig,
}

impl HealthMonitor {
    pub fn new(db_pool: DbPool, notifier: Arc<AdminNotifier>, config: MonitorConfig) -> Self {
        let cooldown = StdDuration::from_secs(config.cooldown_seconds);
        Self {
            content_repo: ContentRepository::new(db_pool.clone()),
            notification_repo: NotificationRepository::new(db_pool.clone()),
            user_repo: UserRepository::new(db_pool.clone()),
            audit_repo: AuditRepository::new(db_pool),
            notifier,
            guard: RunGuard::new("monitor", cooldown),
            config,
        }
    }

    /// Gather all signals, evaluate thresholds, and raise the resulting
    /// alerts. Signal queries and alert deliveries are isolated: a failure
    /// lands in `errors` and the rest of the pass continues.
    #[instrument(skip(self))]
    pub async fn run_system_health_monitor(&self) -> MonitorSummary {
        let now = Utc::now();
        let (signals, mut errors) = self.gather_signals(now).await;

        gauge!("monitor_scheduler_backlog").set(signals.scheduler_backlog() as f64);

        let mut alerts_triggered = 0u32;
        for alert in evaluate_signals(&signals, &self.config) {
            match self.notifier.notify_admin_users(&alert).await {
                Ok(AlertOutcome::Delivered { kind, recipients }) => {
                    counter!("monitor_alerts_total", "kind" => kind.as_str()).increment(1);
                    debug!(kind = %kind, recipients, "Monitor alert delivered");
                    alerts_triggered += 1;
                }
                Ok(AlertOutcome::Suppressed { kind }) => {
                    debug!(kind = %kind, "Monitor alert suppressed by dedupe window");
                }
                Err(e) => {
                    warn!(kind = %alert.kind, error = %e, "Monitor alert delivery failed");
                    errors.push(format!("{}: {}", alert.kind, e));
                }
            }
        }

        MonitorSummary {
            signals,
            alerts_triggered,
            errors,
            ran_at: now,
        }
    }

    /// Passive variant with the same guard pattern as the scheduler: skip
    /// while running or within the cooldown of the last completed pass.
    #[instrument(skip(self))]
    pub async fn maybe_run_system_health_monitor(&self) -> PassiveOutcome<MonitorSummary> {
        let permit = match self.guard.try_acquire_local() {
            Ok(permit) => permit,
            Err(reason) => {
                counter!("monitor_passive_skips_total", "reason" => reason.as_str()).increment(1);
                return PassiveOutcome::Skipped { reason };
            }
        };

        let summary = self.run_system_health_monitor().await;
        permit.complete();
        PassiveOutcome::Ran { summary }
    }

    async fn gather_signals(&self, now: DateTime<Utc>) -> (MonitorSignals, Vec<String>) {
        let mut signals = MonitorSignals::default();
        let mut errors = Vec::new();

        let lag_cutoff = now - Duration::minutes(self.config.scheduler_lag_minutes);
        let hour_ago = now - Duration::hours(1);
        let day_ago = now - Duration::hours(24);

        match self.content_repo.count_overdue(ContentKind::Post, lag_cutoff).await {
            Ok(n) => signals.overdue_scheduled_posts = n,
            Err(e) => errors.push(format!("overdue_scheduled_posts: {}", e)),
        }
        match self
            .content_repo
            .count_overdue(ContentKind::Review, lag_cutoff)
            .await
        {
            Ok(n) => signals.overdue_scheduled_reviews = n,
            Err(e) => errors.push(format!("overdue_scheduled_reviews: {}", e)),
        }
        match self.notification_repo.count_failed_emails_since(hour_ago).await {
            Ok(n) => signals.failed_emails_last_hour = n,
            Err(e) => errors.push(format!("failed_emails_last_hour: {}", e)),
        }
        match self
            .audit_repo
            .count_auth_events_since(AuthEventKind::FailedLogin, hour_ago)
            .await
        {
            Ok(n) => signals.failed_admin_logins_last_hour = n,
            Err(e) => errors.push(format!("failed_admin_logins_last_hour: {}", e)),
        }
        match self
            .audit_repo
            .count_auth_events_since(AuthEventKind::RateLimited, hour_ago)
            .await
        {
            Ok(n) => signals.rate_limited_logins_last_hour = n,
            Err(e) => errors.push(format!("rate_limited_logins_last_hour: {}", e)),
        }
        match self.user_repo.count_locked_admins().await {
            Ok(n) => signals.locked_admin_accounts = n,
            Err(e) => errors.push(format!("locked_admin_accounts: {}", e)),
        }
        match self.audit_repo.count_risky_since(day_ago).await {
            Ok(n) => signals.risky_audit_actions_last_day = n,
            Err(e) => errors.push(format!("risky_audit_actions_last_day: {}", e)),
        }

        if !errors.is_empty() {
            warn!(failed_signals = errors.len(), "Some monitor signals failed to evaluate");
        }

        (signals, errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::models::AlertSeverity;

    fn config() -> MonitorConfig {
        Settings::default().monitor
    }

    #[test]
    fn test_quiet_signals_raise_nothing() {
        let alerts = evaluate_signals(&MonitorSignals::default(), &config());
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_backlog_alert_payload() {
        let signals = MonitorSignals {
            overdue_scheduled_posts: 2,
            overdue_scheduled_reviews: 0,
            ..Default::default()
        };
        let alerts = evaluate_signals(&signals, &config());

        assert_eq!(alerts.len(), 1);
        let alert = &alerts[0];
        assert_eq!(alert.kind, AlertKind::SchedulerBacklog);
        assert_eq!(alert.severity, AlertSeverity::Warning);
        assert_eq!(
            alert.payload,
            serde_json::json!({
                "overdueScheduledPosts": 2,
                "overdueScheduledReviews": 0,
            })
        );
    }

    #[test]
    fn test_email_failures_below_threshold_ignored() {
        let signals = MonitorSignals {
            failed_emails_last_hour: 2,
            ..Default::default()
        };
        assert!(evaluate_signals(&signals, &config()).is_empty());

        let signals = MonitorSignals {
            failed_emails_last_hour: 3,
            ..Default::default()
        };
        let alerts = evaluate_signals(&signals, &config());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::EmailFailures);
    }

    #[test]
    fn test_single_locked_account_is_an_anomaly() {
        let signals = MonitorSignals {
            locked_admin_accounts: 1,
            ..Default::default()
        };
        let alerts = evaluate_signals(&signals, &config());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::AuthAnomalies);
        assert_eq!(alerts[0].severity, AlertSeverity::Critical);
    }

    #[test]
    fn test_auth_thresholds_are_or_combined() {
        let below = MonitorSignals {
            failed_admin_logins_last_hour: 9,
            rate_limited_logins_last_hour: 3,
            ..Default::default()
        };
        assert!(evaluate_signals(&below, &config()).is_empty());

        let rate_limited = MonitorSignals {
            rate_limited_logins_last_hour: 4,
            ..Default::default()
        };
        assert_eq!(evaluate_signals(&rate_limited, &config()).len(), 1);

        let failed = MonitorSignals {
            failed_admin_logins_last_hour: 10,
            ..Default::default()
        };
        assert_eq!(evaluate_signals(&failed, &config()).len(), 1);
    }

    #[test]
    fn test_risky_actions_alert() {
        let signals = MonitorSignals {
            risky_audit_actions_last_day: 1,
            ..Default::default()
        };
        let alerts = evaluate_signals(&signals, &config());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::RiskyAuditActions);
    }

    #[test]
    fn test_multiple_crossings_raise_multiple_alerts() {
        let signals = MonitorSignals {
            overdue_scheduled_posts: 1,
            failed_emails_last_hour: 5,
            risky_audit_actions_last_day: 2,
            ..Default::default()
        };
        let alerts = evaluate_signals(&signals, &config());
        assert_eq!(alerts.len(), 3);
    }
}
