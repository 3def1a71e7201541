// Publish side-effect boundary

use crate::models::ContentKind;
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Data handed to the publish side-effect, once per transition.
#[derive(Debug, Clone, Serialize)]
pub struct PublishedItem {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub kind: ContentKind,
}

/// Fired exactly once per publish transition. Failures must not roll back
/// the publish; the engine logs and moves on.
#[async_trait]
pub trait PublishListener: Send + Sync {
    async fn notify_published(
        &self,
        item: &PublishedItem,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Newsletter integration: POSTs the published item to a configured
/// webhook. With no URL configured the side effect is a no-op.
pub struct NewsletterWebhook {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

impl NewsletterWebhook {
    pub fn new(webhook_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url,
        }
    }
}

#[async_trait]
impl PublishListener for NewsletterWebhook {
    #[instrument(skip(self, item), fields(kind = %item.kind, id = %item.id))]
    async fn notify_published(
        &self,
        item: &PublishedItem,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let Some(url) = &self.webhook_url else {
            debug!("No newsletter webhook configured, skipping publish notification");
            return Ok(());
        };

        let response = self.client.post(url).json(item).send().await?;
        response.error_for_status()?;

        debug!(slug = %item.slug, "Newsletter notified of publish");
        Ok(())
    }
}
