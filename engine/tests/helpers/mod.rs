//! Shared fixtures for the journal integration tests
#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use bello_lib::clock::FixedClock;
use bello_lib::config::Config;
use bello_lib::journal::Journal;
use bello_lib::reminder::{FileScheduler, MemoryScheduler, NotificationScheduler};
use chrono::{NaiveDate, NaiveDateTime};
use tempfile::TempDir;

pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, minute, second))
        .unwrap()
}

/// Journal on a temp data dir with an in-memory platform scheduler
pub struct TestJournal {
    pub temp: TempDir,
    pub config: Config,
    pub platform: Arc<MemoryScheduler>,
    pub clock: Arc<FixedClock>,
    pub journal: Journal,
}

impl TestJournal {
    pub async fn open(now: NaiveDateTime) -> Self {
        let temp = TempDir::new().unwrap();
        let config = Config::new(temp.path().join("journal"));
        config.ensure_dirs().unwrap();
        let platform = Arc::new(MemoryScheduler::new());
        let clock = Arc::new(FixedClock::new(now));
        let journal = Journal::open(&config, platform.clone(), clock.clone()).await;

        Self {
            temp,
            config,
            platform,
            clock,
            journal,
        }
    }

    /// Fake camera output outside the journal
    pub fn source(&self, name: &str) -> String {
        write_source(self.temp.path(), name)
    }

    /// Reopen the same data dir, as after an app restart
    pub async fn reopen(&mut self) {
        self.journal = Journal::open(&self.config, self.platform.clone(), self.clock.clone()).await;
    }
}

pub fn write_source(dir: &Path, name: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, format!("recording {name}")).unwrap();
    path.to_string_lossy().into_owned()
}

/// Journal that keeps reminders in `reminders.json`, like the CLI
pub async fn open_with_file_scheduler(
    config: &Config,
    clock: Arc<FixedClock>,
) -> (Journal, Arc<FileScheduler>) {
    let platform = Arc::new(FileScheduler::new(config.reminders_file(), clock.clone()));
    let journal = Journal::open(config, platform.clone() as Arc<dyn NotificationScheduler>, clock).await;
    (journal, platform)
}
