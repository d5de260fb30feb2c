// Subtitle model and file formats
//
// - srt: numbered-timestamp format used for exchange with recognizers and translators
// - ass: style-capable format rendered for burn-in
// - style: placement-specific style tuning for single and dual band layouts

pub mod ass;
pub mod srt;
pub mod style;

use serde::{Deserialize, Serialize};

pub use style::{Alignment, DualBandTuning, Placement, StyleSpec, StyleTransformer, WrapMode};

use crate::error::{Result, VidError};
use crate::timeline::{TimeWindow, Timestamp};

/// One timestamped subtitle entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleCue {
    /// 1-based position in the track
    pub index: usize,
    pub start: Timestamp,
    pub end: Timestamp,
    pub text: String,
}

impl SubtitleCue {
    pub fn new(index: usize, start: Timestamp, end: Timestamp, text: impl Into<String>) -> Self {
        Self {
            index,
            start,
            end,
            text: text.into(),
        }
    }

    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start: self.start,
            end: self.end,
        }
    }
}

/// Ordered sequence of cues
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleTrack {
    cues: Vec<SubtitleCue>,
}

impl SubtitleTrack {
    pub fn new(cues: Vec<SubtitleCue>) -> Self {
        Self { cues }
    }

    pub fn cues(&self) -> &[SubtitleCue] {
        &self.cues
    }

    pub fn into_cues(self) -> Vec<SubtitleCue> {
        self.cues
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SubtitleCue> {
        self.cues.iter()
    }

    /// Check `start < end`, non-decreasing starts and contiguous 1-based indices
    pub fn validate(&self) -> Result<()> {
        let mut previous_start = Timestamp::ZERO;

        for (position, cue) in self.cues.iter().enumerate() {
            let expected = position + 1;
            if cue.index != expected {
                return Err(VidError::malformed(
                    cue.index,
                    format!("expected index {}", expected),
                ));
            }
            if cue.start >= cue.end {
                return Err(VidError::malformed(
                    cue.index,
                    format!("start {} is not before end {}", cue.start, cue.end),
                ));
            }
            if cue.start < previous_start {
                return Err(VidError::malformed(
                    cue.index,
                    format!("starts at {} before the previous cue ({})", cue.start, previous_start),
                ));
            }
            previous_start = cue.start;
        }

        Ok(())
    }

    /// Sort by start time and reassign indices from 1.
    ///
    /// Collaborators (translators, recognizers) are free to return cues with
    /// their own numbering; this restores the track invariants before
    /// validation.
    pub fn renumbered(mut self) -> Self {
        self.cues.sort_by_key(|cue| cue.start);
        for (position, cue) in self.cues.iter_mut().enumerate() {
            cue.index = position + 1;
        }
        self
    }
}

impl From<Vec<SubtitleCue>> for SubtitleTrack {
    fn from(cues: Vec<SubtitleCue>) -> Self {
        Self::new(cues)
    }
}

impl<'a> IntoIterator for &'a SubtitleTrack {
    type Item = &'a SubtitleCue;
    type IntoIter = std::slice::Iter<'a, SubtitleCue>;

    fn into_iter(self) -> Self::IntoIter {
        self.cues.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cue(index: usize, start: u64, end: u64) -> SubtitleCue {
        SubtitleCue::new(
            index,
            Timestamp::from_millis(start),
            Timestamp::from_millis(end),
            "text",
        )
    }

    #[test]
    fn test_valid_track() {
        let track = SubtitleTrack::new(vec![cue(1, 0, 1000), cue(2, 1000, 2000), cue(3, 1000, 2500)]);
        assert!(track.validate().is_ok());
        assert!(SubtitleTrack::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_inverted_cue_with_its_index() {
        let track = SubtitleTrack::new(vec![cue(1, 0, 1000), cue(2, 3000, 3000)]);

        match track.validate() {
            Err(VidError::MalformedCue { index, .. }) => assert_eq!(index, 2),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_non_monotonic_start() {
        let track = SubtitleTrack::new(vec![cue(1, 5000, 6000), cue(2, 1000, 2000)]);
        assert!(matches!(track.validate(), Err(VidError::MalformedCue { index: 2, .. })));
    }

    #[test]
    fn test_rejects_gap_in_indices() {
        let track = SubtitleTrack::new(vec![cue(1, 0, 1000), cue(3, 1000, 2000)]);
        assert!(matches!(track.validate(), Err(VidError::MalformedCue { index: 3, .. })));
    }

    #[test]
    fn test_renumbered_restores_order() {
        let track = SubtitleTrack::new(vec![cue(7, 5000, 6000), cue(4, 1000, 2000)]).renumbered();

        assert!(track.validate().is_ok());
        assert_eq!(track.cues()[0].start, Timestamp::from_millis(1000));
        assert_eq!(track.cues()[1].index, 2);
    }
}
