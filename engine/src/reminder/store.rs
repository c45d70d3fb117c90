// File-backed notification scheduler
// Pending reminders live in `reminders.json` under the data root so separate
// CLI invocations share one schedule. `take_due` hands out what has fired;
// a reminder whose day has passed undelivered is dropped, never sent late.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::scheduler::{NotificationScheduler, ReminderPayload};
use crate::clock::Clock;
use crate::error::{JournalError, Result};
use crate::persistence::{load_json, save_json};

/// A reminder waiting for its fire time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingReminder {
    pub fire_at: NaiveDateTime,
    pub payload: ReminderPayload,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ReminderFile {
    #[serde(default)]
    reminders: BTreeMap<String, PendingReminder>,
}

pub struct FileScheduler {
    path: PathBuf,
    clock: Arc<dyn Clock>,
    /// Serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl FileScheduler {
    pub fn new(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: path.into(),
            clock,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<ReminderFile> {
        load_json(&self.path)
            .await
            .map_err(|e| JournalError::NotificationScheduling(format!("{e:#}")))
    }

    async fn save(&self, file: &ReminderFile) -> Result<()> {
        save_json(&self.path, file)
            .await
            .map_err(|e| JournalError::NotificationScheduling(format!("{e:#}")))
    }

    /// Every pending reminder, keyed by id
    pub async fn pending(&self) -> Result<BTreeMap<String, PendingReminder>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.reminders)
    }

    /// Remove and return reminders that fired earlier on `now`'s day.
    ///
    /// Reminders left over from a previous day are removed without being
    /// returned.
    pub async fn take_due(&self, now: NaiveDateTime) -> Result<Vec<(String, PendingReminder)>> {
        let _guard = self.lock.lock().await;
        let mut file = self.load().await?;

        let fired_ids: Vec<String> = file
            .reminders
            .iter()
            .filter(|(_, reminder)| reminder.fire_at <= now)
            .map(|(id, _)| id.clone())
            .collect();
        if fired_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut due = Vec::new();
        for id in fired_ids {
            let Some(reminder) = file.reminders.remove(&id) else {
                continue;
            };
            if reminder.fire_at.date() == now.date() {
                due.push((id, reminder));
            } else {
                info!(id = %id, fire_at = %reminder.fire_at, "Dropping reminder from a past day");
            }
        }
        self.save(&file).await?;

        Ok(due)
    }
}

#[async_trait]
impl NotificationScheduler for FileScheduler {
    async fn schedule_one_shot(
        &self,
        id: &str,
        fire_at: NaiveDateTime,
        payload: &ReminderPayload,
    ) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut file = self.load().await?;
        file.reminders.insert(
            id.to_string(),
            PendingReminder {
                fire_at,
                payload: payload.clone(),
            },
        );
        self.save(&file).await?;
        debug!(id, %fire_at, path = %self.path.display(), "Stored reminder");
        Ok(())
    }

    async fn cancel(&self, id: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut file = self.load().await?;
        if file.reminders.remove(id).is_some() {
            self.save(&file).await?;
        }
        Ok(())
    }

    /// Only reminders still ahead of the clock; fired ones no longer count
    /// as pending even before `take_due` removes them.
    async fn list_scheduled(&self) -> Result<HashSet<String>> {
        let _guard = self.lock.lock().await;
        let now = self.clock.now();
        Ok(self
            .load()
            .await?
            .reminders
            .into_iter()
            .filter(|(_, reminder)| reminder.fire_at > now)
            .map(|(id, _)| id)
            .collect())
    }
}
