//! Journal facade wiring storage, recaps, reminders and thumbnails together
//!
//! Mutations go through the clip store; its events are then drained into the
//! reminder scheduler before the call returns.

use std::sync::Arc;

use chrono::NaiveDateTime;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{info, warn};

use super::events::ClipEvent;
use super::models::{ClipRef, MonthKey, RecapArtifact};
use super::recap::{RecapBanner, RecapComposer};
use super::store::{ClipStore, FsClipStore};
use super::thumbnails::{attach_thumbnails, GridEntry, SidecarThumbnails, ThumbnailGenerator};
use crate::clock::Clock;
use crate::config::Config;
use crate::error::Result;
use crate::reminder::scheduler::{NotificationScheduler, ReminderScheduler};
use crate::story::StorySession;

pub struct Journal {
    store: Arc<dyn ClipStore>,
    composer: RecapComposer,
    reminders: ReminderScheduler,
    thumbnails: Arc<dyn ThumbnailGenerator>,
    clock: Arc<dyn Clock>,
    events: broadcast::Receiver<ClipEvent>,
}

impl Journal {
    pub fn new(
        store: Arc<dyn ClipStore>,
        reminders: ReminderScheduler,
        thumbnails: Arc<dyn ThumbnailGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let events = store.subscribe();
        Self {
            composer: RecapComposer::new(store.clone()),
            store,
            reminders,
            thumbnails,
            clock,
            events,
        }
    }

    /// Open the on-disk journal described by `config`
    pub async fn open(
        config: &Config,
        platform: Arc<dyn NotificationScheduler>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let store = FsClipStore::from_config(config);
        let sweeper = store.clone();
        match tokio::task::spawn_blocking(move || sweeper.cleanup_stale_temps()).await {
            Ok(Ok(stats)) if stats.deleted > 0 || stats.promoted > 0 || stats.hit_limit => {
                info!(
                    deleted = stats.deleted,
                    promoted = stats.promoted,
                    scanned = stats.scanned,
                    hit_limit = stats.hit_limit,
                    "Cleaned up stale staging files"
                );
            }
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!(error = %e, "Stale staging cleanup failed"),
            Err(e) => warn!(error = %e, "Stale staging cleanup task panicked"),
        }

        let reminders = ReminderScheduler::attach(platform, clock.clone())
            .await
            .configure(config);
        let thumbnails = Arc::new(SidecarThumbnails::new(&config.data_dir));

        Self::new(Arc::new(store), reminders, thumbnails, clock)
    }

    pub fn store(&self) -> &Arc<dyn ClipStore> {
        &self.store
    }

    pub fn reminders(&self) -> &ReminderScheduler {
        &self.reminders
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Save a recording as the clip for its day
    pub async fn record(&mut self, source: &str, captured_at: NaiveDateTime) -> Result<ClipRef> {
        let clip = self.store.save_clip(source, captured_at).await?;
        self.dispatch_events().await;
        Ok(clip)
    }

    /// Save a recording captured now
    pub async fn record_now(&mut self, source: &str) -> Result<ClipRef> {
        let now = self.clock.now();
        self.record(source, now).await
    }

    pub async fn delete(&mut self, uri: &str) -> Result<()> {
        self.store.delete_clip(uri).await?;
        self.dispatch_events().await;
        Ok(())
    }

    /// Home-screen evaluation of today: returns whether today has a clip and
    /// brings the reminder in line with it.
    pub async fn refresh_today(&mut self) -> Result<bool> {
        let has_clip = self.store.has_clip_for_day(self.clock.today()).await?;
        if has_clip {
            self.reminders.cancel().await;
        } else {
            self.reminders.ensure_scheduled_today().await;
        }
        Ok(has_clip)
    }

    /// A month's clips with thumbnails, in capture order
    pub async fn month_grid(&self, month: MonthKey) -> Result<Vec<GridEntry>> {
        let clips = self.store.list_month(month).await?;
        Ok(attach_thumbnails(self.thumbnails.as_ref(), clips).await)
    }

    pub async fn resolve_recap(&self) -> Result<Option<RecapArtifact>> {
        self.composer.resolve_recap(self.clock.today()).await
    }

    pub async fn evaluate_recap(&self, banner: RecapBanner) -> RecapBanner {
        self.composer.evaluate(banner, self.clock.today()).await
    }

    /// Navigate into the offered recap, dismissing it
    pub fn open_recap(&self, banner: RecapBanner) -> (RecapBanner, Option<StorySession>) {
        let (banner, offer) = banner.open();
        let story = offer.as_ref().and_then(StorySession::from_recap);
        (banner, story)
    }

    /// Feed pending clip events to the reminder scheduler
    async fn dispatch_events(&mut self) {
        let mut resync = false;
        loop {
            match self.events.try_recv() {
                Ok(event) => self.reminders.apply(&event).await,
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Clip events lagged, re-checking today");
                    resync = true;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }

        if resync {
            if let Err(e) = self.refresh_today().await {
                warn!(error = %e, "Failed to re-check today after lagged events");
            }
        }
    }
}
