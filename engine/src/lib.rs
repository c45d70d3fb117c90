//! Storage and recap engine for the Bello daily video journal
//!
//! - `journal`: clip store, path codec, recaps, thumbnails and the `Journal` facade
//! - `reminder`: the daily "record your video" reminder
//! - `story`: story-style playback of a recap
//! - `config`, `clock`, `logging`, `persistence`: ambient plumbing

pub mod clock;
pub mod config;
pub mod error;
pub mod journal;
pub mod logging;
pub mod persistence;
pub mod reminder;
pub mod story;

#[cfg(test)]
pub mod test_utils;

pub use error::{JournalError, Result};
