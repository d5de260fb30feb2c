use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

use crate::subtitle::{SubtitleCue, SubtitleTrack};
use crate::timeline::{TimeWindow, Timestamp};

/// A span of recognized speech with recognizer-chosen boundaries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsrSegment {
    pub start: Timestamp,
    pub end: Timestamp,
    pub text: String,
}

impl AsrSegment {
    pub fn new(start: Timestamp, end: Timestamp, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    pub fn from_secs(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self::new(Timestamp::from_secs_f64(start), Timestamp::from_secs_f64(end), text)
    }

    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start: self.start,
            end: self.end,
        }
    }
}

/// Maps recognized speech onto a fixed reference timeline.
///
/// The output always has the reference's cue count, indices and timing;
/// only the text changes. A segment spanning a cue boundary contributes its
/// whole text to every cue it overlaps.
pub struct TimingReconciler {
    sentinel: String,
}

impl TimingReconciler {
    pub fn new(sentinel: impl Into<String>) -> Self {
        Self {
            sentinel: sentinel.into(),
        }
    }

    pub fn sentinel(&self) -> &str {
        &self.sentinel
    }

    /// Reconcile `asr` (chronological by start) against `reference`.
    ///
    /// The segment sequence is pulled only as far as the current cue needs,
    /// so it may be a stream produced while recognition is still running.
    pub fn reconcile<I>(&self, reference: &SubtitleTrack, asr: I) -> SubtitleTrack
    where
        I: IntoIterator<Item = AsrSegment>,
    {
        let mut pending = asr.into_iter().peekable();
        let mut active: VecDeque<AsrSegment> = VecDeque::new();
        let mut cues = Vec::with_capacity(reference.len());
        let mut unmatched = 0;

        for cue in reference {
            while let Some(segment) = pending.next_if(|segment| segment.start < cue.end) {
                active.push_back(segment);
            }
            // Cue starts never decrease, so anything ending here is done
            active.retain(|segment| segment.end > cue.start);

            let window = cue.window();
            let text = active
                .iter()
                .filter(|segment| segment.window().overlaps(&window))
                .map(|segment| segment.text.trim())
                .filter(|text| !text.is_empty())
                .collect::<Vec<_>>()
                .join(" ");

            let text = if text.is_empty() {
                unmatched += 1;
                self.sentinel.clone()
            } else {
                text
            };

            cues.push(SubtitleCue::new(cue.index, cue.start, cue.end, text));
        }

        debug!(
            "Reconciled {} reference cues ({} without recognized text)",
            cues.len(),
            unmatched
        );
        SubtitleTrack::new(cues)
    }
}

impl Default for TimingReconciler {
    fn default() -> Self {
        Self::new(crate::config::ReconcileConfig::default().sentinel)
    }
}

/// Turn free-running segments into a track of their own.
///
/// Blank and zero-length segments are dropped; the rest are ordered by start
/// and numbered from 1.
pub fn track_from_segments<I>(segments: I) -> SubtitleTrack
where
    I: IntoIterator<Item = AsrSegment>,
{
    let cues = segments
        .into_iter()
        .filter(|segment| segment.start < segment.end && !segment.text.trim().is_empty())
        .map(|segment| SubtitleCue::new(0, segment.start, segment.end, segment.text.trim()))
        .collect::<Vec<_>>();

    SubtitleTrack::new(cues).renumbered()
}
