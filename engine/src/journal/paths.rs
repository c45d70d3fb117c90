//! Path codec: where a clip lives and what it is called
//!
//! Layout (relative to the data root):
//! - `videos/<YYYY>/<MM>/<YYYY>-<MM>-<DD>_<hh>-<mm>.<ss>.<ext>`
//! - `recaps/<YYYY>-<MM>.<ext>`
//!
//! Filenames sort lexicographically in capture order within a bucket, and the
//! first 11 bytes (`YYYY-MM-DD_`) identify the day.

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

use super::models::{DayKey, MonthKey};
use crate::error::{JournalError, Result};

pub const VIDEOS_DIR: &str = "videos";
pub const RECAPS_DIR: &str = "recaps";
pub const THUMBNAILS_DIR: &str = "thumbnails";

/// Extensions recognized as recorded video
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "m4v"];

/// Length of the `YYYY-MM-DD_` day prefix
pub const DAY_PREFIX_LEN: usize = 11;

static CLIP_FILENAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})-(\d{2})-(\d{2})_(\d{2})-(\d{2})\.(\d{2})(?:\.[A-Za-z0-9]+)?$")
        .expect("failed to compile clip filename matcher")
});

/// Bucket directory for a month, relative to the data root
pub fn bucket_path(month: MonthKey) -> PathBuf {
    PathBuf::from(VIDEOS_DIR)
        .join(format!("{:04}", month.year))
        .join(format!("{:02}", month.month))
}

/// Canonical clip filename for a capture time
pub fn filename(captured_at: &NaiveDateTime, ext: &str) -> String {
    format!(
        "{}.{}",
        captured_at.format("%Y-%m-%d_%H-%M.%S"),
        ext.trim_start_matches('.')
    )
}

/// `YYYY-MM-DD_` prefix shared by every filename captured on `day`
pub fn day_prefix(day: DayKey) -> String {
    format!("{:04}-{:02}-{:02}_", day.year, day.month, day.day)
}

/// Inverse of [`filename`]
pub fn parse_captured_at(filename: &str) -> Result<NaiveDateTime> {
    let malformed = || JournalError::MalformedFilename(filename.to_string());

    let caps = CLIP_FILENAME.captures(filename).ok_or_else(malformed)?;
    let field = |i: usize| -> Result<u32> {
        caps.get(i)
            .and_then(|m| m.as_str().parse().ok())
            .ok_or_else(malformed)
    };

    let year = i32::try_from(field(1)?).map_err(|_| malformed())?;
    NaiveDate::from_ymd_opt(year, field(2)?, field(3)?)
        .and_then(|date| date.and_hms_opt(field(4).ok()?, field(5).ok()?, field(6).ok()?))
        .ok_or_else(malformed)
}

/// Whether a bucket entry looks like a recorded video
///
/// Hidden entries (including in-flight `.*.tmp.*` saves) never count.
pub fn is_video_filename(name: &str) -> bool {
    if name.starts_with('.') {
        return false;
    }
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            VIDEO_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Extension of `source` if it is a recognized video type
pub fn video_extension(source: &Path) -> Option<String> {
    let ext = source.extension()?.to_str()?.to_ascii_lowercase();
    VIDEO_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Filename of the aggregate recap for a month
pub fn recap_filename(month: MonthKey, ext: &str) -> String {
    format!("{}.{}", month, ext.trim_start_matches('.'))
}

/// Aggregate recap path for a month, relative to the data root
pub fn recap_path(month: MonthKey, ext: &str) -> PathBuf {
    PathBuf::from(RECAPS_DIR).join(recap_filename(month, ext))
}

/// Hidden staging name used while a clip is moved into its bucket
pub fn staging_filename(final_name: &str) -> String {
    format!(".{}.tmp.{}", final_name, std::process::id())
}

/// Final clip name a staging file was headed for, if `name` is one
pub fn staged_final_name(name: &str) -> Option<&str> {
    let (final_name, pid) = name.strip_prefix('.')?.rsplit_once(".tmp.")?;
    let is_pid = !pid.is_empty() && pid.bytes().all(|b| b.is_ascii_digit());
    (is_pid && is_video_filename(final_name) && parse_captured_at(final_name).is_ok())
        .then_some(final_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn filename_matches_storage_layout() {
        let t = at(2024, 3, 5, 10, 30, 15);
        assert_eq!(filename(&t, "mp4"), "2024-03-05_10-30.15.mp4");
        assert_eq!(filename(&t, ".mov"), "2024-03-05_10-30.15.mov");
    }

    #[test]
    fn parse_inverts_filename() {
        let samples = [
            at(2024, 3, 5, 10, 30, 15),
            at(2024, 2, 29, 0, 0, 0),
            at(2023, 12, 31, 23, 59, 59),
            at(1999, 1, 1, 7, 5, 9),
            at(2024, 11, 3, 12, 0, 1),
        ];
        for t in samples {
            let name = filename(&t, "mp4");
            assert_eq!(parse_captured_at(&name).unwrap(), t, "round-trip of {name}");
        }
    }

    #[test]
    fn lexicographic_order_is_chronological() {
        let times = [
            at(2024, 3, 20, 8, 0, 0),
            at(2024, 3, 2, 23, 59, 59),
            at(2024, 3, 10, 9, 5, 0),
            at(2024, 3, 10, 9, 4, 59),
        ];
        let mut names: Vec<String> = times.iter().map(|t| filename(t, "mp4")).collect();
        names.sort();

        let parsed: Vec<NaiveDateTime> = names
            .iter()
            .map(|n| parse_captured_at(n).unwrap())
            .collect();
        let mut sorted = times.to_vec();
        sorted.sort();
        assert_eq!(parsed, sorted);
    }

    #[test]
    fn day_prefix_is_fixed_length_filename_prefix() {
        let t = at(2024, 3, 5, 10, 30, 15);
        let prefix = day_prefix(DayKey::of(&t));
        assert_eq!(prefix, "2024-03-05_");
        assert_eq!(prefix.len(), DAY_PREFIX_LEN);
        assert!(filename(&t, "mp4").starts_with(&prefix));

        // Day 1 must not prefix-match day 10..19
        let first = day_prefix(DayKey::of(&at(2024, 3, 1, 0, 0, 0)));
        assert!(!filename(&at(2024, 3, 10, 0, 0, 0), "mp4").starts_with(&first));
    }

    #[test]
    fn malformed_filenames_are_rejected() {
        for name in [
            "holiday.mp4",
            "2024-03-05.mp4",
            "2024-3-5_10-30.15.mp4",
            "2024-03-05_10-30.mp4",
            "2024-03-05_10:30:15.mp4",
            "2024-02-30_10-30.15.mp4",
            "2024-03-05_24-00.00.mp4",
            "x2024-03-05_10-30.15.mp4",
            "",
        ] {
            match parse_captured_at(name) {
                Err(JournalError::MalformedFilename(n)) => assert_eq!(n, name),
                other => panic!("expected MalformedFilename for {name:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn bucket_paths_are_distinct_per_month() {
        let march = MonthKey::new(2024, 3).unwrap();
        assert_eq!(bucket_path(march), PathBuf::from("videos/2024/03"));
        assert_eq!(bucket_path(march), bucket_path(MonthKey::new(2024, 3).unwrap()));
        assert_ne!(bucket_path(march), bucket_path(MonthKey::new(2023, 3).unwrap()));
        assert_ne!(
            bucket_path(MonthKey::new(2024, 1).unwrap()),
            bucket_path(MonthKey::new(2024, 10).unwrap())
        );
    }

    #[test]
    fn recap_path_layout() {
        let march = MonthKey::new(2024, 3).unwrap();
        assert_eq!(recap_path(march, "mp4"), PathBuf::from("recaps/2024-03.mp4"));
    }

    #[test]
    fn recognizes_video_names() {
        assert!(is_video_filename("2024-03-05_10-30.15.mp4"));
        assert!(is_video_filename("2024-03-05_10-30.15.MOV"));
        assert!(!is_video_filename("2024-03-05_10-30.15.jpg"));
        assert!(!is_video_filename(".2024-03-05_10-30.15.mp4.tmp.42"));
        assert!(!is_video_filename("notes"));
    }

    #[test]
    fn staging_names_are_hidden() {
        let staged = staging_filename("2024-03-05_10-30.15.mp4");
        assert!(staged.starts_with('.'));
        assert!(staged.contains(".tmp."));
        assert!(!is_video_filename(&staged));
        assert_eq!(staged_final_name(&staged), Some("2024-03-05_10-30.15.mp4"));
    }

    #[test]
    fn only_clip_staging_names_have_a_final_name() {
        assert_eq!(
            staged_final_name(".2024-03-05_10-30.15.mov.tmp.7"),
            Some("2024-03-05_10-30.15.mov")
        );
        assert_eq!(staged_final_name("2024-03-05_10-30.15.mp4.tmp.7"), None);
        assert_eq!(staged_final_name(".holiday.mp4.tmp.7"), None);
        assert_eq!(staged_final_name(".2024-03-05_10-30.15.mp4.tmp."), None);
        assert_eq!(staged_final_name(".reminders.json.tmp.12"), None);
    }
}
