// Translation collaborators
//
// Providers translate a whole subtitle track and may return a different
// number of cues with their own timing. translate_track decides whether
// that timing is accepted or folded back onto the reference timeline.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::{Result, VidError};
use crate::reconcile::{AsrSegment, TimingReconciler};
use crate::subtitle::SubtitleTrack;

/// Main trait for translation backends
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Translate `track` from `source_language` into `target_language`
    async fn translate(
        &self,
        track: &SubtitleTrack,
        source_language: &str,
        target_language: &str,
    ) -> Result<SubtitleTrack>;
}

/// How the timing of a provider's output is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimingPolicy {
    /// Keep whatever cue boundaries the provider returned
    Provider,
    /// Map the translated text back onto the reference cues
    #[default]
    PreserveReference,
}

/// Translate `reference` and enforce `policy` on the result.
///
/// With [`TimingPolicy::PreserveReference`] the output always has the
/// reference's cue count and timing, which keeps burned-in subtitles in sync
/// even when the provider merged or split cues.
pub async fn translate_track(
    provider: &dyn TranslationProvider,
    reconciler: &TimingReconciler,
    reference: &SubtitleTrack,
    source_language: &str,
    target_language: &str,
    policy: TimingPolicy,
) -> Result<SubtitleTrack> {
    reference.validate()?;
    info!(
        "Translating {} cues {} -> {} with {}",
        reference.len(),
        source_language,
        target_language,
        provider.name()
    );

    let translated = provider
        .translate(reference, source_language, target_language)
        .await
        .map_err(|e| match e {
            VidError::Translation(_) => e,
            other => VidError::Translation(format!("{}: {}", provider.name(), other)),
        })?
        .renumbered();
    translated.validate()?;

    if translated.len() != reference.len() {
        warn!(
            "{} returned {} cues for {} reference cues",
            provider.name(),
            translated.len(),
            reference.len()
        );
    }

    match policy {
        TimingPolicy::Provider => Ok(translated),
        TimingPolicy::PreserveReference => {
            let segments = translated
                .into_cues()
                .into_iter()
                .map(|cue| AsrSegment::new(cue.start, cue.end, cue.text));
            Ok(reconciler.reconcile(reference, segments))
        }
    }
}
