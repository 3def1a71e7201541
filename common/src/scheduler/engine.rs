// Scheduled-publishing engine: finds due drafts and promotes them to
// published, exactly once per item, with a revision trail.

use crate::db::repositories::{ContentRepository, RevisionRepository};
use crate::db::DbPool;
use crate::errors::SchedulerError;
use crate::guard::{PassiveOutcome, RunGuard};
use crate::models::{ContentItem, ContentKind, ContentStatus, ItemError, RunSummary};
use crate::scheduler::listener::{PublishListener, PublishedItem};
use chrono::{DateTime, Utc};
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Engine behind every trigger surface. One instance lives in the
/// application state; the passive path additionally goes through the
/// engine's in-process guard.
pub struct PublishScheduler {
    content_repo: ContentRepository,
    revision_repo: RevisionRepository,
    listener: Arc<dyn PublishListener>,
    guard: RunGuard,
}

impl PublishScheduler {
    pub fn new(
        db_pool: DbPool,
        listener: Arc<dyn PublishListener>,
        passive_cooldown: Duration,
    ) -> Self {
        Self {
            content_repo: ContentRepository::new(db_pool.clone()),
            revision_repo: RevisionRepository::new(db_pool),
            listener,
            guard: RunGuard::new("scheduler", passive_cooldown),
        }
    }

    /// Scan both content kinds for due drafts and publish each one.
    ///
    /// A failure on one item is collected into the summary and its siblings
    /// continue; a failure of the scan itself propagates. Running this twice
    /// in immediate succession publishes nothing twice: the second scan no
    /// longer matches the items, and the conditional transition protects the
    /// window in between.
    #[instrument(skip(self))]
    pub async fn run_scheduled_publishing(&self) -> Result<RunSummary, SchedulerError> {
        let now = Utc::now();
        let mut summary = RunSummary::default();

        for kind in [ContentKind::Post, ContentKind::Review] {
            let due = self.content_repo.find_due(kind, now).await?;
            debug!(kind = %kind, count = due.len(), "Evaluating due items");

            for item in due {
                match self.publish_item(kind, &item, now).await {
                    Ok(true) => {
                        counter!("scheduler_published_total", "kind" => kind.as_str())
                            .increment(1);
                        match kind {
                            ContentKind::Post => summary.published_posts += 1,
                            ContentKind::Review => summary.published_reviews += 1,
                        }
                    }
                    Ok(false) => {
                        // Another invocation won the conditional transition.
                        debug!(kind = %kind, id = %item.id, "Item already published, skipping");
                    }
                    Err(e) => {
                        error!(kind = %kind, id = %item.id, error = %e, "Failed to publish item");
                        summary.errors.push(ItemError {
                            kind,
                            id: item.id,
                            error: e.to_string(),
                        });
                    }
                }
            }
        }

        info!(
            published_posts = summary.published_posts,
            published_reviews = summary.published_reviews,
            item_errors = summary.errors.len(),
            "Scheduled publishing run finished"
        );
        Ok(summary)
    }

    /// Passive variant for render paths: no-op while a run is in flight or
    /// within the cooldown of the last completed run. Skips never touch the
    /// store.
    #[instrument(skip(self))]
    pub async fn maybe_run_scheduled_publishing(
        &self,
    ) -> Result<PassiveOutcome<RunSummary>, SchedulerError> {
        let permit = match self.guard.try_acquire_local() {
            Ok(permit) => permit,
            Err(reason) => {
                counter!("scheduler_passive_skips_total", "reason" => reason.as_str())
                    .increment(1);
                return Ok(PassiveOutcome::Skipped { reason });
            }
        };

        // A failed run drops the permit uncompleted: no cooldown starts and
        // the next passive tick may retry at once.
        let summary = self.run_scheduled_publishing().await?;
        permit.complete();
        Ok(PassiveOutcome::Ran { summary })
    }

    /// Promote one due item. Returns whether this invocation performed the
    /// transition; `false` means a concurrent invocation got there first and
    /// no side effects fire here.
    async fn publish_item(
        &self,
        kind: ContentKind,
        item: &ContentItem,
        now: DateTime<Utc>,
    ) -> Result<bool, SchedulerError> {
        let won = self
            .content_repo
            .publish_due(kind, item.id, now)
            .await
            .map_err(|e| SchedulerError::PublishFailed {
                kind: kind.to_string(),
                id: item.id,
                reason: e.to_string(),
            })?;

        if !won {
            return Ok(false);
        }

        let scheduled_by = item.scheduled_by;
        let mut published = item.clone();
        published.status = ContentStatus::Published;
        published.published_at = Some(item.published_at.unwrap_or(now));
        published.reviewed_at = Some(now);
        published.scheduled_at = None;
        published.scheduled_by = None;

        self.revision_repo
            .create(
                item.id,
                &kind.scheduled_publish_reason(),
                scheduled_by,
                published.snapshot(),
            )
            .await
            .map_err(|e| SchedulerError::PublishFailed {
                kind: kind.to_string(),
                id: item.id,
                reason: format!("revision write failed: {}", e),
            })?;

        self.fire_publish_side_effect(kind, &published).await;
        Ok(true)
    }

    /// Set or overwrite a schedule on a draft, recording the matching
    /// revision. Returns `None` when the item does not exist or is not a
    /// draft.
    #[instrument(skip(self), fields(kind = %kind))]
    pub async fn schedule_publication(
        &self,
        kind: ContentKind,
        id: Uuid,
        publish_at: DateTime<Utc>,
        actor: Uuid,
    ) -> Result<Option<ContentItem>, SchedulerError> {
        let Some(existing) = self.content_repo.find_by_id(kind, id).await? else {
            return Ok(None);
        };
        let was_scheduled = existing.scheduled_at.is_some();

        let updated = self
            .content_repo
            .set_schedule(kind, id, publish_at, actor)
            .await?;

        if let Some(item) = &updated {
            let reason = if was_scheduled {
                kind.rescheduled_reason()
            } else {
                kind.scheduled_reason()
            };
            self.revision_repo
                .create(id, &reason, Some(actor), item.snapshot())
                .await?;
            info!(kind = %kind, id = %id, publish_at = %publish_at, "Publication scheduled");
        }

        Ok(updated)
    }

    /// Clear a draft's schedule, either back to an unscheduled draft or by
    /// publishing immediately. Both schedule fields go with the status
    /// change in one statement.
    #[instrument(skip(self), fields(kind = %kind))]
    pub async fn clear_schedule(
        &self,
        kind: ContentKind,
        id: Uuid,
        actor: Uuid,
        publish_now: bool,
    ) -> Result<Option<ContentItem>, SchedulerError> {
        if publish_now {
            let updated = self
                .content_repo
                .publish_immediately(kind, id, Utc::now())
                .await?;
            if let Some(item) = &updated {
                self.revision_repo
                    .create(id, &kind.published_reason(), Some(actor), item.snapshot())
                    .await?;
                self.fire_publish_side_effect(kind, item).await;
            }
            Ok(updated)
        } else {
            let updated = self.content_repo.clear_schedule(kind, id).await?;
            if let Some(item) = &updated {
                self.revision_repo
                    .create(
                        id,
                        &kind.schedule_cleared_reason(),
                        Some(actor),
                        item.snapshot(),
                    )
                    .await?;
            }
            Ok(updated)
        }
    }

    /// Failures here never roll back the publish.
    async fn fire_publish_side_effect(&self, kind: ContentKind, item: &ContentItem) {
        let published = PublishedItem {
            id: item.id,
            title: item.title.clone(),
            slug: item.slug.clone(),
            kind,
        };
        if let Err(e) = self.listener.notify_published(&published).await {
            warn!(kind = %kind, id = %item.id, error = %e, "Publish side-effect failed");
        }
    }
}
