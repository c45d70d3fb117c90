//! Journal data model: clip references, month/day keys, recap artifacts

use std::fmt;

use chrono::{Datelike, Month, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Calendar month addressing one storage bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthKey {
    pub year: i32,
    /// 1-based month (1 = January)
    pub month: u32,
}

impl MonthKey {
    /// Returns None unless `month` is 1..=12
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// Month containing `date`
    pub fn of<D: Datelike>(date: &D) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The month immediately preceding this one (January rolls back to December)
    pub fn prev(self) -> Self {
        if self.month <= 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    pub fn next(self) -> Self {
        if self.month >= 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Parse `YYYY-MM`
    pub fn parse(raw: &str) -> Option<Self> {
        let (year, month) = raw.trim().split_once('-')?;
        if year.len() != 4 || month.len() != 2 {
            return None;
        }
        Self::new(year.parse().ok()?, month.parse().ok()?)
    }

    /// English month name, e.g. "March"
    pub fn month_name(self) -> &'static str {
        u8::try_from(self.month)
            .ok()
            .and_then(|m| Month::try_from(m).ok())
            .map(|m| m.name())
            .unwrap_or("Unknown")
    }

    /// e.g. "March 2024"
    pub fn long_name(self) -> String {
        format!("{} {}", self.month_name(), self.year)
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Calendar day used to enforce at most one clip per day
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DayKey {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl DayKey {
    pub fn of<D: Datelike>(date: &D) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            day: date.day(),
        }
    }

    pub fn month_key(self) -> MonthKey {
        MonthKey {
            year: self.year,
            month: self.month,
        }
    }

    pub fn date(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// One recorded video
///
/// `captured_at` always comes from the filename, never from filesystem metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClipRef {
    /// Storage locator, stable until the clip is deleted
    pub uri: String,
    /// Local capture time, second precision
    pub captured_at: NaiveDateTime,
}

impl ClipRef {
    pub fn new(uri: impl Into<String>, captured_at: NaiveDateTime) -> Self {
        Self {
            uri: uri.into(),
            captured_at,
        }
    }

    pub fn day_key(&self) -> DayKey {
        DayKey::of(&self.captured_at)
    }

    pub fn month_key(&self) -> MonthKey {
        MonthKey::of(&self.captured_at)
    }
}

/// What a recap for a past month resolves to
///
/// A `DailySequence` is never empty: no clips means no recap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecapArtifact {
    /// One pre-rendered file for the whole month
    Aggregate { uri: String },
    /// The month's daily clips, ascending by capture time
    DailySequence { clips: Vec<ClipRef> },
}

impl RecapArtifact {
    /// Locators in playback order
    pub fn uris(&self) -> Vec<String> {
        match self {
            RecapArtifact::Aggregate { uri } => vec![uri.clone()],
            RecapArtifact::DailySequence { clips } => {
                clips.iter().map(|clip| clip.uri.clone()).collect()
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RecapArtifact::Aggregate { .. } => 1,
            RecapArtifact::DailySequence { clips } => clips.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prev_rolls_back_across_january() {
        let jan = MonthKey::new(2024, 1).unwrap();
        assert_eq!(jan.prev(), MonthKey::new(2023, 12).unwrap());

        let apr = MonthKey::new(2024, 4).unwrap();
        assert_eq!(apr.prev(), MonthKey::new(2024, 3).unwrap());
    }

    #[test]
    fn next_rolls_forward_across_december() {
        let dec = MonthKey::new(2023, 12).unwrap();
        assert_eq!(dec.next(), MonthKey::new(2024, 1).unwrap());
        assert_eq!(dec.next().prev(), dec);
    }

    #[test]
    fn month_key_rejects_out_of_range() {
        assert!(MonthKey::new(2024, 0).is_none());
        assert!(MonthKey::new(2024, 13).is_none());
    }

    #[test]
    fn parses_and_displays_month_key() {
        let key = MonthKey::parse("2024-03").unwrap();
        assert_eq!(key, MonthKey::new(2024, 3).unwrap());
        assert_eq!(key.to_string(), "2024-03");

        assert!(MonthKey::parse("2024-3").is_none());
        assert!(MonthKey::parse("2024-13").is_none());
        assert!(MonthKey::parse("march").is_none());
    }

    #[test]
    fn month_names() {
        let key = MonthKey::new(2024, 3).unwrap();
        assert_eq!(key.month_name(), "March");
        assert_eq!(key.long_name(), "March 2024");
    }

    #[test]
    fn clip_day_key_follows_capture_time() {
        let captured = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap();
        let clip = ClipRef::new("/videos/2024/03/a.mp4", captured);

        assert_eq!(clip.day_key().to_string(), "2024-03-05");
        assert_eq!(clip.month_key(), MonthKey::new(2024, 3).unwrap());
    }

    #[test]
    fn aggregate_artifact_plays_single_uri() {
        let artifact = RecapArtifact::Aggregate {
            uri: "/recaps/2024-03.mp4".to_string(),
        };
        assert_eq!(artifact.uris(), vec!["/recaps/2024-03.mp4".to_string()]);
        assert_eq!(artifact.len(), 1);
    }
}
