//! Test utilities shared by unit tests
//!
//! Only compiled in test builds.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use tokio::sync::broadcast;

use crate::error::{JournalError, Result};
use crate::journal::events::{ClipEvent, EVENT_CAPACITY};
use crate::journal::models::{ClipRef, MonthKey};
use crate::journal::store::ClipStore;
use crate::journal::thumbnails::ThumbnailGenerator;
use crate::reminder::memory::MemoryScheduler;
use crate::reminder::scheduler::{NotificationScheduler, ReminderPayload};

/// Local timestamp shorthand
pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, minute, second))
        .unwrap_or_else(|| panic!("invalid test timestamp {year}-{month}-{day} {hour}:{minute}:{second}"))
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap_or_else(|| panic!("invalid test date {year}-{month}-{day}"))
}

/// Write a fake recording the way the camera leaves one in a temp dir
pub fn write_source_clip(dir: &Path, name: &str, contents: &[u8]) -> String {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("failed to write source clip");
    path.to_string_lossy().into_owned()
}

/// Thumbnail generator that fails for every clip
pub struct FailingThumbnails;

#[async_trait]
impl ThumbnailGenerator for FailingThumbnails {
    async fn generate_thumbnail(&self, clip_uri: &str) -> Result<String> {
        Err(JournalError::read(
            clip_uri,
            std::io::Error::new(std::io::ErrorKind::InvalidData, "corrupt clip"),
        ))
    }
}

/// Platform scheduler whose calls can be switched to fail
#[derive(Default)]
pub struct FlakyScheduler {
    pub inner: MemoryScheduler,
    pub failing: AtomicBool,
}

impl FlakyScheduler {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(JournalError::NotificationScheduling(
                "platform scheduler unavailable".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl NotificationScheduler for FlakyScheduler {
    async fn schedule_one_shot(
        &self,
        id: &str,
        fire_at: NaiveDateTime,
        payload: &ReminderPayload,
    ) -> Result<()> {
        self.check()?;
        self.inner.schedule_one_shot(id, fire_at, payload).await
    }

    async fn cancel(&self, id: &str) -> Result<()> {
        self.check()?;
        self.inner.cancel(id).await
    }

    async fn list_scheduled(&self) -> Result<HashSet<String>> {
        self.check()?;
        self.inner.list_scheduled().await
    }
}

/// Clip store whose every call fails, either unavailable or unreadable
pub struct BrokenStore {
    unavailable: bool,
    events: broadcast::Sender<ClipEvent>,
}

impl BrokenStore {
    pub fn unavailable() -> Self {
        Self::with(true)
    }

    pub fn unreadable() -> Self {
        Self::with(false)
    }

    fn with(unavailable: bool) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            unavailable,
            events,
        }
    }

    fn fail(&self, path: &str) -> JournalError {
        if self.unavailable {
            JournalError::Unavailable("disk detached".to_string())
        } else {
            JournalError::read(
                path,
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            )
        }
    }
}

#[async_trait]
impl ClipStore for BrokenStore {
    async fn has_clip_for_day(&self, _date: NaiveDate) -> Result<bool> {
        Err(self.fail("videos"))
    }

    async fn list_month(&self, _month: MonthKey) -> Result<Vec<ClipRef>> {
        Err(self.fail("videos"))
    }

    async fn save_clip(&self, source: &str, _captured_at: NaiveDateTime) -> Result<ClipRef> {
        Err(self.fail(source))
    }

    async fn delete_clip(&self, uri: &str) -> Result<()> {
        Err(self.fail(uri))
    }

    async fn find_aggregate_recap(&self, _month: MonthKey) -> Result<Option<String>> {
        Err(self.fail("recaps"))
    }

    fn subscribe(&self) -> broadcast::Receiver<ClipEvent> {
        self.events.subscribe()
    }
}
