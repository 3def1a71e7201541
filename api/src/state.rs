use std::sync::Arc;
use std::time::Duration;

use common::config::Settings;
use common::db::DbPool;
use common::monitor::HealthMonitor;
use common::notify::{AdminNotifier, HttpMailer};
use common::scheduler::{NewsletterWebhook, PublishScheduler};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub config: Arc<Settings>,
    pub scheduler: Arc<PublishScheduler>,
    pub monitor: Arc<HealthMonitor>,
    pub notifier: Arc<AdminNotifier>,
}

impl AppState {
    /// Wire the engine, monitor, and notifier around one pool. The guards
    /// live inside the engine and monitor, so every handler cloning this
    /// state shares the same in-process throttle.
    pub fn new(db_pool: DbPool, config: Settings) -> Self {
        let config = Arc::new(config);

        let listener = Arc::new(NewsletterWebhook::new(config.newsletter.webhook_url.clone()));
        let mailer = Arc::new(HttpMailer::new(
            config.mailer.endpoint.clone(),
            config.mailer.from_address.clone(),
        ));

        let notifier = Arc::new(AdminNotifier::new(db_pool.clone(), mailer));
        let scheduler = Arc::new(PublishScheduler::new(
            db_pool.clone(),
            listener,
            Duration::from_secs(config.scheduler.passive_cooldown_seconds),
        ));
        let monitor = Arc::new(HealthMonitor::new(
            db_pool.clone(),
            notifier.clone(),
            config.monitor.clone(),
        ));

        Self {
            db_pool,
            config,
            scheduler,
            monitor,
            notifier,
        }
    }
}
