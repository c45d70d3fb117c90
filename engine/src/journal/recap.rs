//! Monthly recap: resolution and the sticky banner policy
//!
//! `resolve_recap` looks at the month before `today`: a pre-rendered
//! aggregate wins, otherwise the month's daily clips in capture order,
//! otherwise nothing.
//!
//! The banner offering a recap is explicit state ([`RecapBanner`]) handed in
//! and returned by [`RecapComposer::evaluate`]:
//! - a recap is looked up on the 1st of the month, and re-resolved on later
//!   evaluations only while one is already showing
//! - a showing recap is never retracted by a later evaluation, including
//!   one whose lookup fails
//! - opening the recap dismisses it for that month
//! - an offer left over from an earlier month is dropped

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::models::{MonthKey, RecapArtifact};
use super::store::ClipStore;
use crate::error::{JournalError, Result};

/// A recap currently offered to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecapOffer {
    pub month: MonthKey,
    /// e.g. "Recap for March 2024"
    pub title: String,
    /// e.g. "Mar 2024"
    pub label: String,
    pub artifact: RecapArtifact,
}

impl RecapOffer {
    pub fn new(month: MonthKey, artifact: RecapArtifact) -> Self {
        let short: String = month.month_name().chars().take(3).collect();
        Self {
            month,
            title: format!("Recap for {}", month.long_name()),
            label: format!("{} {}", short, month.year),
            artifact,
        }
    }
}

/// Recap banner state carried between evaluations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecapBanner {
    #[serde(default)]
    pub offer: Option<RecapOffer>,
    /// Month whose recap the user already opened
    #[serde(default)]
    pub dismissed: Option<MonthKey>,
}

impl RecapBanner {
    pub fn visible(&self) -> Option<&RecapOffer> {
        self.offer.as_ref()
    }

    /// The user navigated into the recap: hand out the offer and dismiss it
    pub fn open(self) -> (RecapBanner, Option<RecapOffer>) {
        match self.offer {
            Some(offer) => (
                RecapBanner {
                    offer: None,
                    dismissed: Some(offer.month),
                },
                Some(offer),
            ),
            None => (self, None),
        }
    }
}

pub struct RecapComposer {
    store: Arc<dyn ClipStore>,
}

impl RecapComposer {
    pub fn new(store: Arc<dyn ClipStore>) -> Self {
        Self { store }
    }

    /// Recap of the month before `today`, if there is anything to show
    pub async fn resolve_recap(&self, today: NaiveDate) -> Result<Option<RecapArtifact>> {
        let month = MonthKey::of(&today).prev();

        match self.store.find_aggregate_recap(month).await {
            Ok(Some(uri)) => {
                debug!(month = %month, uri = %uri, "Using aggregate recap");
                return Ok(Some(RecapArtifact::Aggregate { uri }));
            }
            Ok(None) => {}
            Err(e @ JournalError::Unavailable(_)) => return Err(e),
            Err(e) => warn!(month = %month, error = %e, "Could not check for aggregate recap"),
        }

        let clips = match self.store.list_month(month).await {
            Ok(clips) => clips,
            Err(JournalError::StorageRead { path, source }) => {
                warn!(
                    month = %month,
                    path = %path.display(),
                    error = %source,
                    "Unreadable bucket, treating as empty"
                );
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        if clips.is_empty() {
            Ok(None)
        } else {
            Ok(Some(RecapArtifact::DailySequence { clips }))
        }
    }

    /// Apply the sticky display policy for `today`
    pub async fn evaluate(&self, banner: RecapBanner, today: NaiveDate) -> RecapBanner {
        let target = MonthKey::of(&today).prev();
        let mut banner = banner;

        if banner.offer.as_ref().is_some_and(|offer| offer.month != target) {
            debug!(target = %target, "Dropping recap offer from an earlier month");
            banner.offer = None;
        }
        if banner.dismissed.is_some_and(|month| month != target) {
            banner.dismissed = None;
        }

        if banner.dismissed == Some(target) {
            banner.offer = None;
            return banner;
        }
        if today.day() != 1 && banner.offer.is_none() {
            return banner;
        }

        // Refresh the offer, but a miss never retracts one already shown
        match self.resolve_recap(today).await {
            Ok(Some(artifact)) => {
                if banner.offer.is_none() {
                    info!(month = %target, clips = artifact.len(), "Recap available");
                }
                banner.offer = Some(RecapOffer::new(target, artifact));
            }
            Ok(None) => {}
            Err(e) => warn!(month = %target, error = %e, "Recap lookup failed, keeping banner as is"),
        }

        banner
    }
}
