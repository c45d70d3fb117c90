//! In-process notification scheduler
//!
//! Holds pending one-shot reminders in a map. Used by tests and by hosts that
//! deliver notifications themselves.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDateTime;

use super::scheduler::{NotificationScheduler, ReminderPayload};
use crate::error::{JournalError, Result};

#[derive(Debug, Default)]
pub struct MemoryScheduler {
    pending: Mutex<HashMap<String, (NaiveDateTime, ReminderPayload)>>,
    schedule_calls: AtomicUsize,
}

impl MemoryScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of pending notifications by id
    pub fn pending(&self) -> HashMap<String, (NaiveDateTime, ReminderPayload)> {
        self.pending
            .lock()
            .map(|pending| pending.clone())
            .unwrap_or_default()
    }

    /// Number of successful `schedule_one_shot` calls
    pub fn schedule_calls(&self) -> usize {
        self.schedule_calls.load(Ordering::SeqCst)
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, (NaiveDateTime, ReminderPayload)>>> {
        self.pending
            .lock()
            .map_err(|_| JournalError::NotificationScheduling("scheduler lock poisoned".into()))
    }
}

#[async_trait]
impl NotificationScheduler for MemoryScheduler {
    async fn schedule_one_shot(
        &self,
        id: &str,
        fire_at: NaiveDateTime,
        payload: &ReminderPayload,
    ) -> Result<()> {
        self.lock()?
            .insert(id.to_string(), (fire_at, payload.clone()));
        self.schedule_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn cancel(&self, id: &str) -> Result<()> {
        self.lock()?.remove(id);
        Ok(())
    }

    async fn list_scheduled(&self) -> Result<HashSet<String>> {
        Ok(self.lock()?.keys().cloned().collect())
    }
}
