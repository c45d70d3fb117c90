// Environment configuration for the journal engine
// Resolves the data root (videos, recaps, thumbnails, reminder + banner state)
// and the daily reminder settings.

use std::path::{Path, PathBuf};

use chrono::NaiveTime;

use crate::journal::paths::{RECAPS_DIR, THUMBNAILS_DIR, VIDEOS_DIR};

/// Default local time for the daily "record your video" reminder
pub const DEFAULT_REMINDER_HOUR: u32 = 20;

/// Extension used when a recording's source has none we recognize
pub const DEFAULT_EXTENSION: &str = "mp4";

/// Configuration for storage paths and reminder behaviour
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of all persisted journal state
    pub data_dir: PathBuf,
    /// Local time of day the daily reminder fires
    pub reminder_time: NaiveTime,
    /// Whether the reminder may be scheduled at all
    pub reminders_enabled: bool,
    /// Extension for clips whose source extension is not a known video type
    pub default_extension: String,
}

impl Config {
    /// Create configuration rooted at `data_dir` with default reminder settings
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            reminder_time: default_reminder_time(),
            reminders_enabled: true,
            default_extension: DEFAULT_EXTENSION.to_string(),
        }
    }

    /// Create configuration using default paths
    pub fn default_paths() -> Self {
        Self::new(Self::default_data_dir())
    }

    /// Create configuration from environment variables, falling back to defaults
    ///
    /// - `BELLO_DATA_DIR` overrides the data root
    /// - `BELLO_REMINDER_TIME` (`HH:MM`) overrides the reminder time
    /// - `BELLO_REMINDERS=0|false|off` disables reminders
    pub fn from_env() -> Self {
        let mut config = match std::env::var("BELLO_DATA_DIR") {
            Ok(dir) if !dir.trim().is_empty() => Self::new(PathBuf::from(dir)),
            _ => Self::default_paths(),
        };

        if let Ok(raw) = std::env::var("BELLO_REMINDER_TIME") {
            match parse_reminder_time(&raw) {
                Some(time) => config.reminder_time = time,
                None => tracing::warn!(value = %raw, "Ignoring invalid BELLO_REMINDER_TIME"),
            }
        }

        if let Ok(raw) = std::env::var("BELLO_REMINDERS") {
            config.reminders_enabled = !matches!(
                raw.trim().to_ascii_lowercase().as_str(),
                "0" | "false" | "off" | "no"
            );
        }

        config
    }

    /// Get the default data directory
    fn default_data_dir() -> PathBuf {
        // All platforms: ~/.bello/ (or /tmp/bello if home unavailable)
        dirs::home_dir()
            .map(|h| h.join(".bello"))
            .unwrap_or_else(|| PathBuf::from("/tmp/bello"))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Root of the per-month video buckets
    pub fn videos_dir(&self) -> PathBuf {
        self.data_dir.join(VIDEOS_DIR)
    }

    /// Directory holding pre-rendered monthly recaps
    pub fn recaps_dir(&self) -> PathBuf {
        self.data_dir.join(RECAPS_DIR)
    }

    pub fn thumbnails_dir(&self) -> PathBuf {
        self.data_dir.join(THUMBNAILS_DIR)
    }

    /// File-backed stand-in for the platform notification store
    pub fn reminders_file(&self) -> PathBuf {
        self.data_dir.join("reminders.json")
    }

    /// Recap banner state carried between CLI invocations
    pub fn recap_banner_file(&self) -> PathBuf {
        self.data_dir.join("recap-banner.json")
    }

    /// Ensure the data root and its storage directories exist
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [self.videos_dir(), self.recaps_dir(), self.thumbnails_dir()] {
            std::fs::create_dir_all(&dir)?;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.data_dir, std::fs::Permissions::from_mode(0o700))?;
        }

        Ok(())
    }
}

/// Reminder time used unless configured otherwise
pub fn default_reminder_time() -> NaiveTime {
    NaiveTime::from_hms_opt(DEFAULT_REMINDER_HOUR, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// Parse an `HH:MM` (or `HH:MM:SS`) local time of day
pub fn parse_reminder_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}
