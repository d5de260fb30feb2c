use serde::{Deserialize, Serialize};

use crate::subtitle::SubtitleTrack;

/// Outcome of comparing a translated track against its original
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    /// Cues where the original has text but the translation is blank
    pub empty_count: usize,
    pub total_count: usize,
    pub empty_percentage: f64,
    /// First cue index of suspected content drift
    pub drift_start: Option<usize>,
    /// Estimated number of cues the content is shifted by
    pub drift_amount: usize,
    pub details: String,
}

impl ValidationReport {
    pub fn has_drift(&self) -> bool {
        self.drift_amount > 0
    }
}

/// Checks translated subtitles before they are burned in.
///
/// Translators that merge neighbouring cues push content forward and leave
/// the last cues blank; blanks clustering in the final quarter are reported
/// as drift.
pub struct TranslationValidator {
    empty_threshold_pct: f64,
}

impl TranslationValidator {
    pub fn new(empty_threshold_pct: f64) -> Self {
        Self {
            empty_threshold_pct,
        }
    }

    pub fn validate(&self, original: &SubtitleTrack, translated: &SubtitleTrack) -> ValidationReport {
        let total = original.len();

        if total == 0 {
            return ValidationReport {
                is_valid: true,
                empty_count: 0,
                total_count: 0,
                empty_percentage: 0.0,
                drift_start: None,
                drift_amount: 0,
                details: "Original track has no cues.".to_string(),
            };
        }

        if translated.len() != total {
            return ValidationReport {
                is_valid: false,
                empty_count: 0,
                total_count: total,
                empty_percentage: 0.0,
                drift_start: None,
                drift_amount: 0,
                details: format!(
                    "Cue count mismatch: original has {} cues, translation has {}. \
                     The burned-in subtitles would fall out of sync.",
                    total,
                    translated.len()
                ),
            };
        }

        // (position, cue index) of cues that lost their text
        let empty: Vec<(usize, usize)> = original
            .iter()
            .zip(translated)
            .enumerate()
            .filter(|(_, (orig, trans))| !orig.text.trim().is_empty() && trans.text.trim().is_empty())
            .map(|(position, (orig, _))| (position, orig.index))
            .collect();

        let empty_count = empty.len();
        let empty_percentage = empty_count as f64 / total as f64 * 100.0;

        let mut drift_start = None;
        let mut drift_amount = 0;

        if empty_count >= 3 {
            let max_index = original.iter().map(|cue| cue.index).max().unwrap_or(total);
            let last_quarter_start = max_index as f64 * 0.75;
            let in_last_quarter = empty
                .iter()
                .filter(|(_, index)| *index as f64 >= last_quarter_start)
                .count();

            if in_last_quarter as f64 >= empty_count as f64 * 0.5 {
                drift_amount = in_last_quarter;
                drift_start = empty
                    .iter()
                    .find(|(position, _)| *position as f64 > total as f64 * 0.5)
                    .or(empty.first())
                    .map(|(_, index)| *index);
            }
        }

        let is_valid = empty_percentage < self.empty_threshold_pct && drift_amount == 0;
        let indices: Vec<usize> = empty.iter().map(|(_, index)| *index).collect();
        let details = describe(
            is_valid,
            total,
            &indices,
            empty_percentage,
            drift_start,
            drift_amount,
        );

        ValidationReport {
            is_valid,
            empty_count,
            total_count: total,
            empty_percentage,
            drift_start,
            drift_amount,
            details,
        }
    }
}

impl Default for TranslationValidator {
    fn default() -> Self {
        Self::new(crate::config::ValidationConfig::default().empty_threshold_pct)
    }
}

fn describe(
    is_valid: bool,
    total: usize,
    empty: &[usize],
    empty_percentage: f64,
    drift_start: Option<usize>,
    drift_amount: usize,
) -> String {
    if is_valid {
        return format!(
            "Translation OK: {} cues, {} without text ({:.1}%).",
            total,
            empty.len(),
            empty_percentage
        );
    }

    let mut lines = vec![
        "Possible quality problems detected:".to_string(),
        format!("Cues: {}", total),
        format!("Empty cues: {} ({:.1}%)", empty.len(), empty_percentage),
    ];

    if drift_amount > 0 {
        lines.push(format!("Content drift of ~{} cues", drift_amount));
        if let Some(start) = drift_start {
            lines.push(format!("Likely starting at cue {}", start));
        }
    } else {
        lines.push(format!(
            "{} cues have no translation although the original has text",
            empty.len()
        ));
    }

    if !empty.is_empty() && empty.len() <= 5 {
        let listed: Vec<String> = empty.iter().map(|index| index.to_string()).collect();
        lines.push(format!("Affected cues: {}", listed.join(", ")));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subtitle::SubtitleCue;
    use crate::timeline::Timestamp;

    fn track(texts: &[&str]) -> SubtitleTrack {
        SubtitleTrack::new(
            texts
                .iter()
                .enumerate()
                .map(|(i, text)| {
                    SubtitleCue::new(
                        i + 1,
                        Timestamp::from_millis(i as u64 * 1_000),
                        Timestamp::from_millis(i as u64 * 1_000 + 900),
                        *text,
                    )
                })
                .collect(),
        )
    }

    #[test]
    fn test_clean_translation_is_valid() {
        let original = track(&["one", "two", "three"]);
        let translated = track(&["eins", "zwei", "drei"]);
        let report = TranslationValidator::default().validate(&original, &translated);

        assert!(report.is_valid);
        assert_eq!(report.empty_count, 0);
        assert!(!report.has_drift());
        assert!(report.details.starts_with("Translation OK"));
    }

    #[test]
    fn test_count_mismatch_is_invalid() {
        let original = track(&["one", "two", "three"]);
        let translated = track(&["eins zwei", "drei"]);
        let report = TranslationValidator::default().validate(&original, &translated);

        assert!(!report.is_valid);
        assert_eq!(report.total_count, 3);
        assert!(report.details.contains("Cue count mismatch"));
    }

    #[test]
    fn test_blank_original_cues_do_not_count() {
        let original = track(&["one", "", "three"]);
        let translated = track(&["eins", "", "drei"]);
        let report = TranslationValidator::default().validate(&original, &translated);

        assert!(report.is_valid);
        assert_eq!(report.empty_count, 0);
    }

    #[test]
    fn test_tail_drift_is_detected() {
        let mut original = vec!["text"; 20];
        original[0] = "start";
        let mut translated = vec!["Text"; 20];
        for slot in translated.iter_mut().skip(16) {
            *slot = "";
        }
        let report = TranslationValidator::default().validate(&track(&original), &track(&translated));

        assert!(!report.is_valid);
        assert_eq!(report.empty_count, 4);
        assert_eq!(report.drift_amount, 4);
        assert_eq!(report.drift_start, Some(17));
        assert_eq!(
            report.details,
            "Possible quality problems detected:\n\
             Cues: 20\n\
             Empty cues: 4 (20.0%)\n\
             Content drift of ~4 cues\n\
             Likely starting at cue 17\n\
             Affected cues: 17, 18, 19, 20"
        );
    }

    #[test]
    fn test_scattered_blanks_are_not_drift() {
        let original = vec!["text"; 100];
        let mut translated = vec!["Text"; 100];
        for position in [3, 10, 40, 60] {
            translated[position] = " ";
        }
        let report = TranslationValidator::default().validate(&track(&original), &track(&translated));

        assert_eq!(report.empty_count, 4);
        assert_eq!(report.drift_amount, 0);
        assert_eq!(report.drift_start, None);
        // 4 % exceeds the default 2 % threshold
        assert!(!report.is_valid);
        assert!(report.details.contains("have no translation"));
    }

    #[test]
    fn test_threshold_is_configurable() {
        let original = vec!["text"; 100];
        let mut translated = vec!["Text"; 100];
        translated[50] = "";
        let validator = TranslationValidator::new(5.0);

        assert!(validator.validate(&track(&original), &track(&translated)).is_valid);
    }

    #[test]
    fn test_empty_original() {
        let report = TranslationValidator::default()
            .validate(&SubtitleTrack::default(), &SubtitleTrack::default());

        assert!(report.is_valid);
        assert_eq!(report.total_count, 0);
    }
}
