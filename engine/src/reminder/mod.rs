//! Daily "record your video" reminder
//!
//! - `scheduler`: the reminder state machine and platform seam
//! - `memory`: in-process platform scheduler
//! - `store`: file-backed platform scheduler shared across CLI runs
//! - `notify`: terminal delivery of fired reminders

pub mod memory;
pub mod notify;
pub mod scheduler;
pub mod store;

pub use memory::MemoryScheduler;
pub use scheduler::{
    NotificationScheduler, ReminderPayload, ReminderScheduler, ReminderState, ScheduleOutcome,
    DAILY_REMINDER_ID,
};
pub use store::{FileScheduler, PendingReminder};
