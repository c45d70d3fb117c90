//! Daily reminder state machine
//!
//! Keeps at most one pending "record today's video" reminder in the platform
//! scheduler, keyed by [`DAILY_REMINDER_ID`]. The scheduler never polls: it is
//! driven by clip events and by the home-screen evaluation of today's state.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::{default_reminder_time, Config};
use crate::error::Result;
use crate::journal::events::ClipEvent;
use crate::journal::models::DayKey;

/// Fixed identity of the one daily reminder
pub const DAILY_REMINDER_ID: &str = "daily-bello-reminder";

/// Content shown when the reminder fires
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderPayload {
    pub title: String,
    pub body: String,
    /// Routing tag for the app when the notification is opened
    #[serde(rename = "type")]
    pub kind: String,
}

impl ReminderPayload {
    pub fn daily() -> Self {
        Self {
            title: "Bello Daily Reminder!".to_string(),
            body: "Don't forget to record your video memory today!".to_string(),
            kind: "daily-reminder".to_string(),
        }
    }
}

/// Platform notification scheduler the reminder is delegated to
#[async_trait]
pub trait NotificationScheduler: Send + Sync {
    /// Schedule (or replace) a one-shot notification
    async fn schedule_one_shot(
        &self,
        id: &str,
        fire_at: NaiveDateTime,
        payload: &ReminderPayload,
    ) -> Result<()>;

    /// Cancel a pending notification; cancelling an unknown id succeeds
    async fn cancel(&self, id: &str) -> Result<()>;

    /// Identifiers of every pending notification
    async fn list_scheduled(&self) -> Result<HashSet<String>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderState {
    Scheduled,
    Unscheduled,
}

/// Result of [`ReminderScheduler::ensure_scheduled`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// A new one-shot reminder was handed to the platform
    Scheduled,
    /// One was already pending; nothing changed
    AlreadyScheduled,
    /// The fire time has already passed today; no catch-up
    TooLate,
    /// Reminders are switched off
    Disabled,
    /// The platform rejected the request (logged, not fatal)
    Failed,
}

/// Reminder scheduler with explicit state
pub struct ReminderScheduler {
    platform: Arc<dyn NotificationScheduler>,
    clock: Arc<dyn Clock>,
    state: ReminderState,
    /// Fire time of the reminder we handed to the platform; `None` when the
    /// pending reminder was found at attach time.
    scheduled_for: Option<NaiveDateTime>,
    fire_time: NaiveTime,
    enabled: bool,
}

impl ReminderScheduler {
    /// Attach to the platform scheduler, deriving the initial state from
    /// what it already has pending.
    pub async fn attach(platform: Arc<dyn NotificationScheduler>, clock: Arc<dyn Clock>) -> Self {
        let state = match platform.list_scheduled().await {
            Ok(ids) if ids.contains(DAILY_REMINDER_ID) => ReminderState::Scheduled,
            Ok(_) => ReminderState::Unscheduled,
            Err(e) => {
                warn!(error = %e, "Could not list scheduled reminders, assuming none");
                ReminderState::Unscheduled
            }
        };
        debug!(?state, "Reminder scheduler attached");

        Self {
            platform,
            clock,
            state,
            scheduled_for: None,
            fire_time: default_reminder_time(),
            enabled: true,
        }
    }

    /// Apply the reminder settings from `config`
    pub fn configure(mut self, config: &Config) -> Self {
        self.fire_time = config.reminder_time;
        self.enabled = config.reminders_enabled;
        self
    }

    pub fn with_fire_time(mut self, fire_time: NaiveTime) -> Self {
        self.fire_time = fire_time;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Current state; a reminder whose fire time has passed counts as delivered
    pub fn state(&self) -> ReminderState {
        match self.scheduled_for {
            Some(at) if self.state == ReminderState::Scheduled && at <= self.clock.now() => {
                ReminderState::Unscheduled
            }
            _ => self.state,
        }
    }

    pub fn fire_time(&self) -> NaiveTime {
        self.fire_time
    }

    /// When today's reminder would fire
    pub fn fire_at(&self, day: NaiveDate) -> NaiveDateTime {
        day.and_time(self.fire_time)
    }

    /// Schedule the reminder for `fire_at` unless one is pending or the time has passed
    pub async fn ensure_scheduled(&mut self, fire_at: NaiveDateTime) -> ScheduleOutcome {
        if !self.enabled {
            return ScheduleOutcome::Disabled;
        }
        let now = self.clock.now();
        let mut check_platform = true;
        if self.state == ReminderState::Scheduled {
            match self.scheduled_for {
                Some(pending) if pending > now => return ScheduleOutcome::AlreadyScheduled,
                Some(fired) => {
                    // The platform drops a one-shot once it fires
                    debug!(%fired, "Previous reminder already fired");
                    self.mark_unscheduled();
                    check_platform = false;
                }
                None => {}
            }
        }

        // Another process may have scheduled it since we attached, or the
        // reminder we attached to may have fired since
        if check_platform {
            match self.platform.list_scheduled().await {
                Ok(ids) if ids.contains(DAILY_REMINDER_ID) => {
                    self.state = ReminderState::Scheduled;
                    return ScheduleOutcome::AlreadyScheduled;
                }
                Ok(_) => self.mark_unscheduled(),
                Err(e) => warn!(error = %e, "Could not list scheduled reminders"),
            }
        }

        if fire_at <= now {
            debug!(%fire_at, %now, "Reminder time already passed, not scheduling");
            return ScheduleOutcome::TooLate;
        }

        match self
            .platform
            .schedule_one_shot(DAILY_REMINDER_ID, fire_at, &ReminderPayload::daily())
            .await
        {
            Ok(()) => {
                self.state = ReminderState::Scheduled;
                self.scheduled_for = Some(fire_at);
                info!(%fire_at, "Scheduled daily reminder");
                ScheduleOutcome::Scheduled
            }
            Err(e) => {
                warn!(error = %e, %fire_at, "Failed to schedule daily reminder");
                ScheduleOutcome::Failed
            }
        }
    }

    /// Schedule today's reminder at the configured fire time
    pub async fn ensure_scheduled_today(&mut self) -> ScheduleOutcome {
        let fire_at = self.fire_at(self.clock.today());
        self.ensure_scheduled(fire_at).await
    }

    /// Cancel the reminder whether or not one is pending
    pub async fn cancel(&mut self) {
        if let Err(e) = self.platform.cancel(DAILY_REMINDER_ID).await {
            warn!(error = %e, "Failed to cancel daily reminder");
        }
        if self.state == ReminderState::Scheduled {
            info!("Cancelled daily reminder");
        }
        self.mark_unscheduled();
    }

    fn mark_unscheduled(&mut self) {
        self.state = ReminderState::Unscheduled;
        self.scheduled_for = None;
    }

    /// React to a clip change: today's clip exists -> cancel, otherwise re-arm
    pub async fn apply(&mut self, event: &ClipEvent) {
        if event.day != DayKey::of(&self.clock.today()) {
            return;
        }
        if event.day_has_clip {
            self.cancel().await;
        } else {
            self.ensure_scheduled_today().await;
        }
    }
}
