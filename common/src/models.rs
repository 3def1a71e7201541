use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ============================================================================
// Publishable content
// ============================================================================

/// The two publishable content kinds. Structurally identical for scheduling
/// purposes; they live in separate tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Post,
    Review,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Post => "post",
            ContentKind::Review => "review",
        }
    }

    /// Table backing this kind.
    pub fn table(&self) -> &'static str {
        match self {
            ContentKind::Post => "posts",
            ContentKind::Review => "reviews",
        }
    }

    /// Revision reason tag for a scheduler-driven publish.
    pub fn scheduled_publish_reason(&self) -> String {
        format!("{}_scheduled_publish", self.as_str())
    }

    /// Revision reason tag for setting a schedule on a draft.
    pub fn scheduled_reason(&self) -> String {
        format!("{}_scheduled", self.as_str())
    }

    /// Revision reason tag for overwriting an existing schedule.
    pub fn rescheduled_reason(&self) -> String {
        format!("{}_rescheduled", self.as_str())
    }

    /// Revision reason tag for clearing a schedule back to plain draft.
    pub fn schedule_cleared_reason(&self) -> String {
        format!("{}_schedule_cleared", self.as_str())
    }

    /// Revision reason tag for an immediate administrative publish.
    pub fn published_reason(&self) -> String {
        format!("{}_published", self.as_str())
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content lifecycle status. Only drafts may carry a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "content_status", rename_all = "lowercase")]
pub enum ContentStatus {
    Draft,
    Published,
    Archived,
}

/// A publishable item row (post or review — the two tables share this shape).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ContentItem {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub body: String,
    pub status: ContentStatus,
    /// Publish no earlier than this instant. Non-null only while draft.
    pub scheduled_at: Option<DateTime<Utc>>,
    pub scheduled_by: Option<Uuid>,
    /// Actual publish time, set exactly once.
    pub published_at: Option<DateTime<Utc>>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContentItem {
    /// Whether this item is due for publishing at `now`. The boundary
    /// instant itself counts as due.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == ContentStatus::Draft
            && self.scheduled_at.map(|at| at <= now).unwrap_or(false)
    }

    /// Content + status capture persisted with every revision.
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "title": self.title,
            "slug": self.slug,
            "body": self.body,
            "status": self.status,
            "scheduled_at": self.scheduled_at,
            "published_at": self.published_at,
        })
    }

    /// State invariants every transition in this core must preserve.
    pub fn invariants_hold(&self) -> bool {
        let published_has_timestamp =
            self.status != ContentStatus::Published || self.published_at.is_some();
        let scheduled_implies_draft =
            self.scheduled_at.is_none() || self.status == ContentStatus::Draft;
        let schedule_fields_paired = self.scheduled_at.is_some() || self.scheduled_by.is_none();
        published_has_timestamp && scheduled_implies_draft && schedule_fields_paired
    }
}

// ============================================================================
// Revisions
// ============================================================================

/// Append-only versioned snapshot written alongside every content state
/// transition. Never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Revision {
    pub id: Uuid,
    pub entity_id: Uuid,
    pub version: i32,
    pub snapshot: serde_json::Value,
    pub reason: String,
    pub actor: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Scheduler run summary
// ============================================================================

/// Outcome of one scheduler invocation. Ephemeral — returned and logged,
/// never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub published_posts: u64,
    pub published_reviews: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ItemError>,
}

impl RunSummary {
    pub fn total_published(&self) -> u64 {
        self.published_posts + self.published_reviews
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A single item that failed to publish within an otherwise-continuing batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemError {
    pub kind: ContentKind,
    pub id: Uuid,
    pub error: String,
}

// ============================================================================
// Alerts
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Warning,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Warning => "warning",
            AlertSeverity::Critical => "critical",
        }
    }
}

/// Closed set of administrative alert kinds. The serialized names are the
/// wire format and the dedupe key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertKind {
    #[serde(rename = "SYSTEM_SCHEDULER_BACKLOG")]
    SchedulerBacklog,
    #[serde(rename = "SYSTEM_SCHEDULER_RUN_FAILED")]
    SchedulerRunFailed,
    #[serde(rename = "SYSTEM_EMAIL_FAILURES")]
    EmailFailures,
    #[serde(rename = "SYSTEM_AUTH_ANOMALIES")]
    AuthAnomalies,
    #[serde(rename = "SYSTEM_RISKY_AUDIT_ACTIONS")]
    RiskyAuditActions,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::SchedulerBacklog => "SYSTEM_SCHEDULER_BACKLOG",
            AlertKind::SchedulerRunFailed => "SYSTEM_SCHEDULER_RUN_FAILED",
            AlertKind::EmailFailures => "SYSTEM_EMAIL_FAILURES",
            AlertKind::AuthAnomalies => "SYSTEM_AUTH_ANOMALIES",
            AlertKind::RiskyAuditActions => "SYSTEM_RISKY_AUDIT_ACTIONS",
        }
    }

    pub fn severity(&self) -> AlertSeverity {
        match self {
            AlertKind::SchedulerRunFailed | AlertKind::AuthAnomalies => AlertSeverity::Critical,
            AlertKind::SchedulerBacklog
            | AlertKind::EmailFailures
            | AlertKind::RiskyAuditActions => AlertSeverity::Warning,
        }
    }

    /// Suppression window: one alert of this kind per window.
    pub fn dedupe_window_minutes(&self) -> i64 {
        match self {
            AlertKind::SchedulerRunFailed => 20,
            AlertKind::AuthAnomalies => 30,
            AlertKind::SchedulerBacklog => 45,
            AlertKind::EmailFailures => 60,
            AlertKind::RiskyAuditActions => 180,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            AlertKind::SchedulerBacklog => "Scheduled publishing is falling behind",
            AlertKind::SchedulerRunFailed => "Manual scheduler run failed",
            AlertKind::EmailFailures => "Outbound email deliveries are failing",
            AlertKind::AuthAnomalies => "Suspicious admin authentication activity",
            AlertKind::RiskyAuditActions => "Risky administrative actions recorded",
        }
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An alert headed for the admin notification sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminAlert {
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    pub dedupe_window_minutes: i64,
    pub payload: serde_json::Value,
}

impl AdminAlert {
    /// Build an alert with the kind's severity, title, and dedupe window.
    pub fn new(kind: AlertKind, message: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            title: kind.title().to_string(),
            message: message.into(),
            href: None,
            dedupe_window_minutes: kind.dedupe_window_minutes(),
            payload,
        }
    }

    pub fn with_href(mut self, href: impl Into<String>) -> Self {
        self.href = Some(href.into());
        self
    }
}

/// What happened to an alert handed to the sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AlertOutcome {
    /// Same kind already raised within its dedupe window.
    Suppressed { kind: AlertKind },
    /// Fanned out to every admin recipient.
    Delivered { kind: AlertKind, recipients: usize },
}

// ============================================================================
// Health monitor
// ============================================================================

/// Raw operational counts gathered in one monitor pass.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MonitorSignals {
    pub overdue_scheduled_posts: i64,
    pub overdue_scheduled_reviews: i64,
    pub failed_emails_last_hour: i64,
    pub failed_admin_logins_last_hour: i64,
    pub rate_limited_logins_last_hour: i64,
    pub locked_admin_accounts: i64,
    pub risky_audit_actions_last_day: i64,
}

impl MonitorSignals {
    pub fn scheduler_backlog(&self) -> i64 {
        self.overdue_scheduled_posts + self.overdue_scheduled_reviews
    }
}

/// Aggregate outcome of one monitor pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSummary {
    pub signals: MonitorSignals,
    pub alerts_triggered: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    pub ran_at: DateTime<Utc>,
}

// ============================================================================
// Users & auth
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Editor,
    Member,
}

impl UserRole {
    /// Roles allowed to fire the manual scheduler trigger.
    pub fn can_run_scheduler(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Editor)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: UserRole,
    pub locked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// JWT claims carried by authenticated requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: Uuid,
    pub email: String,
    pub role: UserRole,
    pub exp: i64,
}

// ============================================================================
// Audit log & auth events (collaborator schema the monitor reads)
// ============================================================================

/// Audit action tags appended by this core and counted by the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    SchedulerManualRun,
    SchedulerCronRun,
    UserDeleted,
    MemberBanned,
    MemberTimedOut,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::SchedulerManualRun => "scheduler_manual_run",
            AuditAction::SchedulerCronRun => "scheduler_cron_run",
            AuditAction::UserDeleted => "user_deleted",
            AuditAction::MemberBanned => "member_banned",
            AuditAction::MemberTimedOut => "member_timed_out",
        }
    }

    /// Actions the monitor treats as risky over its 24 h lookback.
    pub fn risky_tags() -> &'static [&'static str] {
        &["user_deleted", "member_banned", "member_timed_out"]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "auth_event_kind", rename_all = "snake_case")]
pub enum AuthEventKind {
    FailedLogin,
    RateLimited,
}

// ============================================================================
// Notifications
// ============================================================================

/// Outcome of a single alert email attempt, persisted per recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "email_status", rename_all = "lowercase")]
pub enum EmailStatus {
    Sent,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub kind: String,
    pub severity: String,
    pub title: String,
    pub message: String,
    pub href: Option<String>,
    pub payload: serde_json::Value,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn draft_item(scheduled_at: Option<DateTime<Utc>>) -> ContentItem {
        ContentItem {
            id: Uuid::new_v4(),
            title: "Autumn lens roundup".to_string(),
            slug: "autumn-lens-roundup".to_string(),
            body: "…".to_string(),
            status: ContentStatus::Draft,
            scheduled_at,
            scheduled_by: scheduled_at.map(|_| Uuid::new_v4()),
            published_at: None,
            reviewed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_due_at_boundary_instant() {
        let now = Utc::now();
        let item = draft_item(Some(now));
        assert!(item.is_due(now));
    }

    #[test]
    fn test_future_item_not_due() {
        let now = Utc::now();
        let item = draft_item(Some(now + Duration::hours(1)));
        assert!(!item.is_due(now));
    }

    #[test]
    fn test_unscheduled_draft_not_due() {
        let item = draft_item(None);
        assert!(!item.is_due(Utc::now()));
    }

    #[test]
    fn test_published_item_not_due() {
        let now = Utc::now();
        let mut item = draft_item(Some(now - Duration::seconds(1)));
        item.status = ContentStatus::Published;
        item.published_at = Some(now);
        item.scheduled_at = None;
        item.scheduled_by = None;
        assert!(!item.is_due(now));
        assert!(item.invariants_hold());
    }

    #[test]
    fn test_invariant_published_requires_timestamp() {
        let mut item = draft_item(None);
        item.status = ContentStatus::Published;
        assert!(!item.invariants_hold());
        item.published_at = Some(Utc::now());
        assert!(item.invariants_hold());
    }

    #[test]
    fn test_invariant_schedule_implies_draft() {
        let mut item = draft_item(Some(Utc::now()));
        assert!(item.invariants_hold());
        item.status = ContentStatus::Published;
        item.published_at = Some(Utc::now());
        assert!(!item.invariants_hold());
    }

    #[test]
    fn test_revision_reason_tags() {
        assert_eq!(
            ContentKind::Post.scheduled_publish_reason(),
            "post_scheduled_publish"
        );
        assert_eq!(
            ContentKind::Review.rescheduled_reason(),
            "review_rescheduled"
        );
        assert_eq!(
            ContentKind::Post.schedule_cleared_reason(),
            "post_schedule_cleared"
        );
    }

    #[test]
    fn test_alert_kind_wire_names() {
        let json = serde_json::to_string(&AlertKind::SchedulerBacklog).unwrap();
        assert_eq!(json, "\"SYSTEM_SCHEDULER_BACKLOG\"");
        assert_eq!(
            AlertKind::SchedulerBacklog.as_str(),
            "SYSTEM_SCHEDULER_BACKLOG"
        );
    }

    #[test]
    fn test_alert_dedupe_windows_in_range() {
        for kind in [
            AlertKind::SchedulerBacklog,
            AlertKind::SchedulerRunFailed,
            AlertKind::EmailFailures,
            AlertKind::AuthAnomalies,
            AlertKind::RiskyAuditActions,
        ] {
            let window = kind.dedupe_window_minutes();
            assert!(
                (20..=180).contains(&window),
                "window {} for {} out of range",
                window,
                kind
            );
        }
    }

    #[test]
    fn test_alert_severity_map() {
        assert_eq!(
            AlertKind::SchedulerRunFailed.severity(),
            AlertSeverity::Critical
        );
        assert_eq!(AlertKind::AuthAnomalies.severity(), AlertSeverity::Critical);
        assert_eq!(
            AlertKind::SchedulerBacklog.severity(),
            AlertSeverity::Warning
        );
    }

    #[test]
    fn test_roles_allowed_to_run_scheduler() {
        assert!(UserRole::Admin.can_run_scheduler());
        assert!(UserRole::Editor.can_run_scheduler());
        assert!(!UserRole::Member.can_run_scheduler());
    }

    #[test]
    fn test_run_summary_totals() {
        let summary = RunSummary {
            published_posts: 2,
            published_reviews: 1,
            errors: vec![],
        };
        assert_eq!(summary.total_published(), 3);
        assert!(summary.is_clean());
    }
}
