//! Clip store: disk layout, same-day supersession, listing, retention
//!
//! Provides the filesystem-as-database behind the journal:
//! - Month buckets under `videos/<YYYY>/<MM>/`
//! - One clip per day (stage, drop same-day clips, rename into place)
//! - Idempotent deletes
//! - Bounded cleanup of stale staging files
//! - Availability flag with graceful degradation
//!
//! Callers only see the [`ClipStore`] trait, so another backing store can
//! replace [`FsClipStore`] without touching recaps or playback.

use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use tokio::fs;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::events::{ClipEvent, EVENT_CAPACITY};
use super::models::{ClipRef, DayKey, MonthKey};
use super::paths::{self, VIDEOS_DIR, VIDEO_EXTENSIONS};
use crate::config::{Config, DEFAULT_EXTENSION};
use crate::error::{JournalError, Result};

/// Maximum number of files to scan during staging cleanup
const CLEANUP_SCAN_LIMIT: usize = 1000;

/// Age threshold for staging file cleanup (1 hour)
const CLEANUP_AGE_THRESHOLD: Duration = Duration::from_secs(3600);

/// Narrow storage interface the rest of the engine depends on
#[async_trait]
pub trait ClipStore: Send + Sync {
    /// Whether `date`'s bucket holds any file with that day's prefix.
    /// A missing or unreadable bucket is `Ok(false)`.
    async fn has_clip_for_day(&self, date: NaiveDate) -> Result<bool>;

    /// A month's clips, ascending by capture time. A missing or unreadable
    /// bucket is empty.
    async fn list_month(&self, month: MonthKey) -> Result<Vec<ClipRef>>;

    /// Persist `source` as the clip for `captured_at`'s day, replacing any
    /// clip already recorded that day.
    async fn save_clip(&self, source: &str, captured_at: NaiveDateTime) -> Result<ClipRef>;

    /// Remove a clip. Deleting a clip that no longer exists succeeds.
    async fn delete_clip(&self, uri: &str) -> Result<()>;

    /// Locator of the pre-rendered recap for `month`, if one exists
    async fn find_aggregate_recap(&self, month: MonthKey) -> Result<Option<String>>;

    /// Receive a [`ClipEvent`] for every completed save and delete
    fn subscribe(&self) -> broadcast::Receiver<ClipEvent>;
}

/// Clip store backed by the local filesystem
///
/// Manages on-disk storage of clips under:
/// `<data>/videos/<YYYY>/<MM>/<YYYY>-<MM>-<DD>_<hh>-<mm>.<ss>.<ext>`
/// and reads aggregate recaps from `<data>/recaps/<YYYY>-<MM>.<ext>`.
#[derive(Debug, Clone)]
pub struct FsClipStore {
    /// Data root holding `videos/` and `recaps/`
    root: PathBuf,
    /// Extension for sources without a recognized video extension
    default_extension: String,
    /// Whether the store is available (videos dir successfully created)
    available: bool,
    events: broadcast::Sender<ClipEvent>,
}

impl FsClipStore {
    /// Create a new clip store rooted at `data_dir`
    ///
    /// Attempts to create `videos/` with strict permissions (0700). If that
    /// fails the store is marked unavailable and every operation reports it.
    pub fn new(data_dir: &Path) -> Self {
        let root = data_dir.to_path_buf();
        let available = Self::ensure_base_dir(&root.join(VIDEOS_DIR));
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            root,
            default_extension: DEFAULT_EXTENSION.to_string(),
            available,
            events,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.data_dir).with_default_extension(&config.default_extension)
    }

    pub fn with_default_extension(mut self, ext: &str) -> Self {
        self.default_extension = ext.trim_start_matches('.').to_ascii_lowercase();
        self
    }

    /// Check if the store is available
    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ensure base directory exists with strict permissions
    fn ensure_base_dir(dir: &Path) -> bool {
        match std::fs::create_dir_all(dir) {
            Ok(()) => {
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    if let Err(e) =
                        std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700))
                    {
                        warn!(path = %dir.display(), error = %e, "Failed to set permissions");
                        return false;
                    }
                }
                true
            }
            Err(e) => {
                warn!(
                    path = %dir.display(),
                    error = %e,
                    "Failed to create video directory, clip store unavailable"
                );
                false
            }
        }
    }

    fn check_available(&self) -> Result<()> {
        if self.available {
            Ok(())
        } else {
            Err(JournalError::Unavailable(format!(
                "cannot create {}",
                self.root.join(VIDEOS_DIR).display()
            )))
        }
    }

    /// Get the bucket directory for a month
    fn bucket_dir(&self, month: MonthKey) -> PathBuf {
        self.root.join(paths::bucket_path(month))
    }

    /// Entry names of a month bucket, or None if the bucket does not exist.
    ///
    /// An unreadable bucket reads as missing so listings and today's check
    /// degrade to empty; only an unavailable store is an error.
    async fn bucket_entries(&self, month: MonthKey) -> Result<Option<Vec<String>>> {
        self.check_available()?;

        let dir = self.bucket_dir(month);
        match read_names(&dir).await {
            Ok(names) => Ok(Some(names)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => {
                warn!(
                    error = %JournalError::read(dir, e),
                    month = %month,
                    "Month bucket unreadable, treating as empty"
                );
                Ok(None)
            }
        }
    }

    /// Ensure a bucket exists with strict permissions
    async fn ensure_bucket(&self, month: MonthKey) -> io::Result<PathBuf> {
        let bucket = self.bucket_dir(month);
        fs::create_dir_all(&bucket).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            // Set 0700 on the year and month directories
            let mut dirs = vec![bucket.clone()];
            if let Some(year_dir) = bucket.parent() {
                dirs.push(year_dir.to_path_buf());
            }
            for dir in dirs {
                fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o700)).await?;
            }
        }

        Ok(bucket)
    }

    /// Move the recording into a hidden staging file inside the bucket
    async fn stage_source(source: &Path, staged: &Path) -> io::Result<()> {
        match fs::rename(source, staged).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(e),
            Err(rename_err) => {
                // Cross-device sources cannot be renamed; copy, fsync, then drop the source
                debug!(
                    source = %source.display(),
                    error = %rename_err,
                    "Rename failed, copying recording into bucket"
                );
                if let Err(e) = fs::copy(source, staged).await {
                    let _ = fs::remove_file(staged).await;
                    return Err(e);
                }
                let file = fs::OpenOptions::new().write(true).open(staged).await?;
                file.sync_all().await?;
                drop(file);

                if let Err(e) = fs::remove_file(source).await {
                    warn!(source = %source.display(), error = %e, "Failed to remove recording source");
                }
                Ok(())
            }
        }
    }

    /// Put a staged recording back where it came from after a failed save
    async fn restore_source(staged: &Path, source: &Path) {
        if let Err(e) = fs::rename(staged, source).await {
            warn!(
                staged = %staged.display(),
                source = %source.display(),
                error = %e,
                "Failed to restore recording after save error"
            );
        }
    }

    /// Delete every clip in `bucket` filed under `day`; returns removed locators
    async fn remove_day(bucket: &Path, day: DayKey) -> io::Result<Vec<String>> {
        let prefix = paths::day_prefix(day);
        let mut removed = Vec::new();

        for name in read_names(bucket).await? {
            if !name.starts_with(&prefix) {
                continue;
            }
            let path = bucket.join(&name);
            match fs::remove_file(&path).await {
                Ok(()) => removed.push(path.to_string_lossy().into_owned()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }

        Ok(removed)
    }

    fn emit(&self, event: ClipEvent) {
        if self.events.send(event).is_err() {
            debug!("No clip event subscribers");
        }
    }

    /// Cleanup stale staging files left by interrupted saves
    ///
    /// A `*.tmp.*` file older than CLEANUP_AGE_THRESHOLD (1 hour) is a save
    /// that crashed. If its day has no clip, the crash happened after the
    /// same-day clips were removed, so the staged recording is renamed into
    /// place. Otherwise it is deleted. Scans at most CLEANUP_SCAN_LIMIT files
    /// to avoid blocking startup.
    pub fn cleanup_stale_temps(&self) -> io::Result<CleanupStats> {
        let mut stats = CleanupStats::default();
        if !self.available {
            return Ok(stats);
        }

        let videos_dir = self.root.join(VIDEOS_DIR);
        if !videos_dir.exists() {
            return Ok(stats);
        }

        let now = SystemTime::now();

        for entry in walkdir::WalkDir::new(&videos_dir)
            .max_depth(3) // <YYYY>/<MM>/<file>
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if stats.scanned >= CLEANUP_SCAN_LIMIT {
                warn!(
                    limit = CLEANUP_SCAN_LIMIT,
                    path = %videos_dir.display(),
                    "Hit staging cleanup scan limit"
                );
                stats.hit_limit = true;
                return Ok(stats);
            }

            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            stats.scanned += 1;

            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !name.contains(".tmp.") {
                continue;
            }

            let age = std::fs::metadata(path)
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| now.duration_since(modified).ok());
            if !matches!(age, Some(age) if age > CLEANUP_AGE_THRESHOLD) {
                continue;
            }

            if let Some(final_name) = paths::staged_final_name(name) {
                match promote_stranded(path, final_name) {
                    Ok(true) => {
                        info!(path = %path.display(), clip = final_name, "Recovered staged recording");
                        stats.promoted += 1;
                        continue;
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Failed to recover staged recording");
                        continue;
                    }
                }
            }

            match std::fs::remove_file(path) {
                Ok(()) => stats.deleted += 1,
                Err(e) => warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to delete stale staging file"
                ),
            }
        }

        Ok(stats)
    }
}

/// Outcome of [`FsClipStore::cleanup_stale_temps`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupStats {
    pub deleted: usize,
    pub promoted: usize,
    pub scanned: usize,
    pub hit_limit: bool,
}

/// Rename a stranded staging file to `final_name` when its day has no clip.
/// Returns false, leaving the file alone, when the day is already covered.
fn promote_stranded(staged: &Path, final_name: &str) -> io::Result<bool> {
    let Some(bucket) = staged.parent() else {
        return Ok(false);
    };
    let day_prefix = &final_name[..paths::DAY_PREFIX_LEN];

    for entry in std::fs::read_dir(bucket)? {
        let name = entry?.file_name();
        if name.to_str().map_or(false, |n| n.starts_with(day_prefix)) {
            return Ok(false);
        }
    }

    std::fs::rename(staged, bucket.join(final_name))?;
    Ok(true)
}

#[async_trait]
impl ClipStore for FsClipStore {
    async fn has_clip_for_day(&self, date: NaiveDate) -> Result<bool> {
        let prefix = paths::day_prefix(DayKey::of(&date));
        let names = self.bucket_entries(MonthKey::of(&date)).await?;
        Ok(names.map_or(false, |names| names.iter().any(|n| n.starts_with(&prefix))))
    }

    async fn list_month(&self, month: MonthKey) -> Result<Vec<ClipRef>> {
        let Some(names) = self.bucket_entries(month).await? else {
            return Ok(Vec::new());
        };
        let bucket = self.bucket_dir(month);

        let mut clips: Vec<ClipRef> = names
            .into_iter()
            .filter(|name| paths::is_video_filename(name))
            .filter_map(|name| match paths::parse_captured_at(&name) {
                Ok(captured_at) if MonthKey::of(&captured_at) == month => Some(ClipRef::new(
                    bucket.join(&name).to_string_lossy().into_owned(),
                    captured_at,
                )),
                Ok(_) => {
                    warn!(bucket = %month, file = %name, "Skipping clip filed under the wrong month");
                    None
                }
                Err(e) => {
                    warn!(bucket = %month, error = %e, "Skipping unrecognized video file");
                    None
                }
            })
            .collect();

        // Directory enumeration order is unspecified; the grid relies on this
        clips.sort_by(|a, b| {
            a.captured_at
                .cmp(&b.captured_at)
                .then_with(|| a.uri.cmp(&b.uri))
        });

        Ok(clips)
    }

    async fn save_clip(&self, source: &str, captured_at: NaiveDateTime) -> Result<ClipRef> {
        self.check_available()?;

        let captured_at = captured_at.with_nanosecond(0).unwrap_or(captured_at);
        let source_path = Path::new(source);
        let ext = paths::video_extension(source_path)
            .unwrap_or_else(|| self.default_extension.clone());
        let month = MonthKey::of(&captured_at);
        let day = DayKey::of(&captured_at);
        let final_name = paths::filename(&captured_at, &ext);

        let bucket = self
            .ensure_bucket(month)
            .await
            .map_err(|e| JournalError::write(self.bucket_dir(month), e))?;
        let final_path = bucket.join(&final_name);
        let staged = bucket.join(paths::staging_filename(&final_name));

        // Stage first: the recording is inside the bucket but invisible to listings
        Self::stage_source(source_path, &staged)
            .await
            .map_err(|e| JournalError::write(&final_path, e))?;

        // Then drop the day's earlier clip(s). A crash between here and the rename
        // leaves the day empty with the new clip stranded as a staging file.
        let superseded = match Self::remove_day(&bucket, day).await {
            Ok(removed) => removed,
            Err(e) => {
                Self::restore_source(&staged, source_path).await;
                return Err(JournalError::write(&final_path, e));
            }
        };

        if let Err(e) = fs::rename(&staged, &final_path).await {
            Self::restore_source(&staged, source_path).await;
            return Err(JournalError::write(&final_path, e));
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) =
                fs::set_permissions(&final_path, std::fs::Permissions::from_mode(0o600)).await
            {
                warn!(path = %final_path.display(), error = %e, "Failed to set clip permissions");
            }
        }

        let clip = ClipRef::new(final_path.to_string_lossy().into_owned(), captured_at);
        info!(
            day = %day,
            uri = %clip.uri,
            superseded = superseded.len(),
            "Saved clip"
        );
        self.emit(ClipEvent::saved(clip.clone(), superseded));

        Ok(clip)
    }

    async fn delete_clip(&self, uri: &str) -> Result<()> {
        self.check_available()?;

        let path = PathBuf::from(uri);
        let escapes = path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::CurDir));
        if escapes || !path.starts_with(self.root.join(VIDEOS_DIR)) {
            return Err(JournalError::write(
                path,
                io::Error::new(io::ErrorKind::InvalidInput, "not a journal clip"),
            ));
        }

        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(uri = %uri, "Clip already deleted");
                return Ok(());
            }
            Err(e) => return Err(JournalError::write(path, e)),
        }
        info!(uri = %uri, "Deleted clip");

        let captured_at = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| paths::parse_captured_at(n).ok());
        if let Some(captured_at) = captured_at {
            let day_has_clip = self
                .has_clip_for_day(captured_at.date())
                .await
                .unwrap_or_else(|e| {
                    warn!(error = %e, "Could not recheck day after delete");
                    false
                });
            self.emit(ClipEvent::deleted(
                DayKey::of(&captured_at),
                uri,
                day_has_clip,
            ));
        }

        Ok(())
    }

    async fn find_aggregate_recap(&self, month: MonthKey) -> Result<Option<String>> {
        let candidates = std::iter::once(self.default_extension.as_str())
            .chain(VIDEO_EXTENSIONS.iter().copied())
            .map(|ext| self.root.join(paths::recap_path(month, ext)));

        for path in candidates {
            match fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => return Ok(Some(path.to_string_lossy().into_owned())),
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(JournalError::read(path, e)),
            }
        }

        Ok(None)
    }

    fn subscribe(&self) -> broadcast::Receiver<ClipEvent> {
        self.events.subscribe()
    }
}

/// Names of the entries in `dir` (non-UTF-8 names are skipped)
async fn read_names(dir: &Path) -> io::Result<Vec<String>> {
    let mut entries = fs::read_dir(dir).await?;
    let mut names = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(raw) => debug!(dir = %dir.display(), name = ?raw, "Skipping non-UTF-8 entry"),
        }
    }

    Ok(names)
}
