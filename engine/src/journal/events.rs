//! "Day's clip changed" events emitted by the clip store
//!
//! The reminder scheduler consumes these instead of every save/delete call
//! site remembering to cancel or re-arm today's reminder.

use super::models::{ClipRef, DayKey};

/// Buffered events per subscriber before older ones are dropped (lagged)
pub const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipChange {
    /// A clip was persisted; `superseded` lists same-day clips it replaced
    Saved {
        clip: ClipRef,
        superseded: Vec<String>,
    },
    /// A clip was removed by the user
    Deleted { uri: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipEvent {
    pub day: DayKey,
    pub change: ClipChange,
    /// Whether `day` still has a clip once the change completed
    pub day_has_clip: bool,
}

impl ClipEvent {
    pub fn saved(clip: ClipRef, superseded: Vec<String>) -> Self {
        Self {
            day: clip.day_key(),
            change: ClipChange::Saved { clip, superseded },
            day_has_clip: true,
        }
    }

    pub fn deleted(day: DayKey, uri: impl Into<String>, day_has_clip: bool) -> Self {
        Self {
            day,
            change: ClipChange::Deleted { uri: uri.into() },
            day_has_clip,
        }
    }
}
