//! Story playback: steps through a list of clips one at a time.
//!
//! The host player reports `mark_ready` once a clip starts, and
//! `on_playback_complete`/`on_playback_error` when it stops. User taps are
//! ignored while a clip is still loading. The session never wraps around;
//! moving past the last clip finishes it.

use serde::Serialize;
use tracing::{debug, warn};

use crate::journal::recap::RecapOffer;

/// Where the session is after a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StoryStep {
    /// Playing the clip at this index
    Showing(usize),
    Finished,
}

#[derive(Debug, Clone, Serialize)]
pub struct StorySession {
    title: String,
    sequence: Vec<String>,
    cursor: usize,
    loading: bool,
    finished: bool,
}

impl StorySession {
    /// Start at the first clip. An empty sequence has nothing to play.
    pub fn start(title: impl Into<String>, sequence: Vec<String>) -> Option<Self> {
        if sequence.is_empty() {
            return None;
        }
        Some(Self {
            title: title.into(),
            sequence,
            cursor: 0,
            loading: true,
            finished: false,
        })
    }

    pub fn from_recap(offer: &RecapOffer) -> Option<Self> {
        Self::start(offer.title.clone(), offer.artifact.uris())
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Clip to play, or None once the session finished
    pub fn current(&self) -> Option<&str> {
        if self.finished {
            None
        } else {
            self.sequence.get(self.cursor).map(String::as_str)
        }
    }

    /// (1-based position, total) for the progress indicator
    pub fn progress(&self) -> (usize, usize) {
        (self.cursor + 1, self.sequence.len())
    }

    fn step(&self) -> StoryStep {
        if self.finished {
            StoryStep::Finished
        } else {
            StoryStep::Showing(self.cursor)
        }
    }

    pub fn advance(&mut self) -> StoryStep {
        if self.finished {
            return StoryStep::Finished;
        }
        if self.cursor + 1 < self.sequence.len() {
            self.cursor += 1;
            self.loading = true;
        } else {
            debug!(title = %self.title, "Story finished");
            self.finished = true;
            self.loading = false;
        }
        self.step()
    }

    /// Go back one clip; at the first clip this does nothing
    pub fn retreat(&mut self) -> StoryStep {
        if !self.finished && self.cursor > 0 {
            self.cursor -= 1;
            self.loading = true;
        }
        self.step()
    }

    /// The current clip has started playing
    pub fn mark_ready(&mut self) {
        self.loading = false;
    }

    pub fn on_playback_complete(&mut self) -> StoryStep {
        self.advance()
    }

    /// A clip that cannot play is skipped like one that ended
    pub fn on_playback_error(&mut self, error: &str) -> StoryStep {
        warn!(
            uri = self.current().unwrap_or_default(),
            error,
            "Clip playback failed, skipping"
        );
        self.advance()
    }

    /// Tap on the forward half; None while the clip is loading
    pub fn tap_forward(&mut self) -> Option<StoryStep> {
        if self.loading || self.finished {
            return None;
        }
        Some(self.advance())
    }

    /// Tap on the back half; None while the clip is loading
    pub fn tap_back(&mut self) -> Option<StoryStep> {
        if self.loading || self.finished {
            return None;
        }
        Some(self.retreat())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::models::{ClipRef, MonthKey, RecapArtifact};
    use crate::test_utils::at;

    fn session(n: usize) -> StorySession {
        let clips = (0..n).map(|i| format!("clip-{i}.mp4")).collect();
        StorySession::start("Recap", clips).unwrap()
    }

    #[test]
    fn empty_sequence_never_starts() {
        assert!(StorySession::start("Recap", Vec::new()).is_none());
    }

    #[test]
    fn advance_at_last_index_finishes() {
        let mut story = session(2);
        assert_eq!(story.advance(), StoryStep::Showing(1));
        assert_eq!(story.advance(), StoryStep::Finished);
        assert!(story.is_finished());
        assert_eq!(story.current(), None);

        // No wraparound
        assert_eq!(story.advance(), StoryStep::Finished);
        assert_eq!(story.cursor(), 1);
    }

    #[test]
    fn retreat_at_first_index_is_noop() {
        let mut story = session(3);
        assert_eq!(story.retreat(), StoryStep::Showing(0));
        assert_eq!(story.current(), Some("clip-0.mp4"));

        story.advance();
        assert_eq!(story.retreat(), StoryStep::Showing(0));
    }

    #[test]
    fn error_behaves_like_completion() {
        let mut a = session(3);
        let mut b = session(3);
        assert_eq!(a.on_playback_complete(), b.on_playback_error("decoder failed"));
        assert_eq!(a.cursor(), b.cursor());

        a.advance();
        b.advance();
        assert_eq!(a.on_playback_complete(), StoryStep::Finished);
        assert_eq!(b.on_playback_error("missing file"), StoryStep::Finished);
    }

    #[test]
    fn single_clip_finishes_on_completion() {
        let mut story = session(1);
        assert_eq!(story.progress(), (1, 1));
        assert_eq!(story.on_playback_complete(), StoryStep::Finished);
    }

    #[test]
    fn taps_are_ignored_while_loading() {
        let mut story = session(3);
        assert!(story.is_loading());
        assert_eq!(story.tap_forward(), None);
        assert_eq!(story.tap_back(), None);
        assert_eq!(story.cursor(), 0);

        story.mark_ready();
        assert_eq!(story.tap_forward(), Some(StoryStep::Showing(1)));
        // Next clip is loading again
        assert_eq!(story.tap_forward(), None);

        story.mark_ready();
        assert_eq!(story.tap_back(), Some(StoryStep::Showing(0)));
    }

    #[test]
    fn completion_is_never_gated_by_loading() {
        let mut story = session(2);
        assert!(story.is_loading());
        assert_eq!(story.on_playback_complete(), StoryStep::Showing(1));
    }

    #[test]
    fn recap_offer_plays_in_capture_order() {
        let clips = vec![
            ClipRef::new("a.mp4", at(2024, 3, 2, 8, 0, 0)),
            ClipRef::new("b.mp4", at(2024, 3, 10, 8, 0, 0)),
        ];
        let offer = RecapOffer::new(
            MonthKey::new(2024, 3).unwrap(),
            RecapArtifact::DailySequence { clips },
        );

        let mut story = StorySession::from_recap(&offer).unwrap();
        assert_eq!(story.title(), "Recap for March 2024");
        assert_eq!(story.current(), Some("a.mp4"));
        story.advance();
        assert_eq!(story.current(), Some("b.mp4"));
        assert_eq!(story.progress(), (2, 2));
    }
}
