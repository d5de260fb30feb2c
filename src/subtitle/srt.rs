use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

use super::{SubtitleCue, SubtitleTrack};
use crate::error::{Result, VidError};
use crate::timeline::Timestamp;

/// Render a track as numbered-timestamp subtitles
pub fn serialize(track: &SubtitleTrack) -> String {
    let mut srt_content = String::new();

    for cue in track {
        srt_content.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            cue.index,
            cue.start.to_srt(),
            cue.end.to_srt(),
            cue.text
        ));
    }

    srt_content
}

/// Parse numbered-timestamp subtitles.
///
/// Blocks are separated by empty lines; body lines are kept verbatim so
/// multi-line cues survive a round trip. A line holding only whitespace
/// belongs to the body unless a new cue (or the end of input) follows it.
/// Ordering is not checked here, use [`SubtitleTrack::validate`] for that.
pub fn parse(content: &str) -> Result<SubtitleTrack> {
    let content = content.trim_start_matches('\u{feff}').replace("\r\n", "\n");
    let lines: Vec<&str> = content.split('\n').collect();
    let mut cues = Vec::new();
    let mut block = 0;
    let mut position = 0;

    loop {
        while lines.get(position).is_some_and(|line| line.trim().is_empty()) {
            position += 1;
        }
        let Some(index_line) = lines.get(position) else {
            break;
        };
        position += 1;
        block += 1;

        let index = index_line.trim().parse::<usize>().map_err(|_| VidError::SubtitleParse {
            block,
            reason: format!("invalid index line '{}'", index_line.trim()),
        })?;

        let timing_line = lines.get(position).ok_or_else(|| VidError::SubtitleParse {
            block,
            reason: "missing timing line".to_string(),
        })?;
        position += 1;
        let (start, end) = parse_timing(timing_line).ok_or_else(|| VidError::SubtitleParse {
            block,
            reason: format!("invalid timing line '{}'", timing_line.trim()),
        })?;

        let mut body = Vec::new();
        while let Some(line) = lines.get(position) {
            if line.is_empty() || (line.trim().is_empty() && ends_body(&lines, position)) {
                break;
            }
            body.push(*line);
            position += 1;
        }

        cues.push(SubtitleCue::new(index, start, end, body.join("\n")));
    }

    debug!("Parsed {} subtitle cues", cues.len());
    Ok(SubtitleTrack::new(cues))
}

/// Whether the whitespace-only run starting at `position` separates cues
fn ends_body(lines: &[&str], position: usize) -> bool {
    let next = lines[position..]
        .iter()
        .position(|line| line.is_empty() || !line.trim().is_empty())
        .map(|offset| position + offset);

    match next {
        None => true,
        Some(next) => starts_cue(lines, next),
    }
}

fn starts_cue(lines: &[&str], position: usize) -> bool {
    lines[position].trim().parse::<usize>().is_ok()
        && lines
            .get(position + 1)
            .is_some_and(|line| parse_timing(line).is_some())
}

fn parse_timing(line: &str) -> Option<(Timestamp, Timestamp)> {
    let (start, end) = line.split_once("-->")?;
    // Some writers append position hints after the end time
    let end = end.split_whitespace().next()?;
    Some((Timestamp::parse_srt(start)?, Timestamp::parse_srt(end)?))
}

pub async fn read_file<P: AsRef<Path>>(path: P) -> Result<SubtitleTrack> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(VidError::FileNotFound(path.display().to_string()));
    }
    let content = fs::read_to_string(path).await?;
    parse(&content)
}

pub async fn write_file<P: AsRef<Path>>(track: &SubtitleTrack, output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    info!("Writing SRT file: {} ({} cues)", output_path.display(), track.len());

    fs::write(output_path, serialize(track)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cue(index: usize, start: u64, end: u64, text: &str) -> SubtitleCue {
        SubtitleCue::new(
            index,
            Timestamp::from_millis(start),
            Timestamp::from_millis(end),
            text,
        )
    }

    #[test]
    fn test_round_trip_empty_track() {
        let track = SubtitleTrack::default();
        assert_eq!(serialize(&track), "");
        assert_eq!(parse(&serialize(&track)).unwrap(), track);
    }

    #[test]
    fn test_round_trip_single_cue() {
        let track = SubtitleTrack::new(vec![cue(1, 0, 6_080, "Does nature speak to us?")]);
        assert_eq!(parse(&serialize(&track)).unwrap(), track);
    }

    #[test]
    fn test_round_trip_multiple_cues_with_line_breaks() {
        let track = SubtitleTrack::new(vec![
            cue(1, 0, 6_080, "Does nature\nspeak to us?"),
            cue(2, 6_280, 9_000, "Second"),
            cue(3, 3_600_000, 3_723_456, "- One\n- Two\n- Three"),
        ]);
        assert_eq!(parse(&serialize(&track)).unwrap(), track);
    }

    #[test]
    fn test_round_trip_whitespace_only_body_line() {
        let track = SubtitleTrack::new(vec![
            cue(1, 0, 1_000, "a\n \nb"),
            cue(2, 1_000, 2_000, "\t\nafter a tab line"),
            cue(3, 2_000, 3_000, "last"),
        ]);
        assert_eq!(parse(&serialize(&track)).unwrap(), track);
    }

    #[test]
    fn test_parse_whitespace_separator_lines() {
        let content = "1\n00:00:01,000 --> 00:00:02,000\nHello\n   \n2\n00:00:02,000 --> 00:00:03,000\nBye\n  ";
        let track = parse(content).unwrap();

        assert_eq!(track.len(), 2);
        assert_eq!(track.cues()[0].text, "Hello");
        assert_eq!(track.cues()[1].text, "Bye");
    }

    #[test]
    fn test_serialized_layout() {
        let track = SubtitleTrack::new(vec![cue(1, 65_123, 66_000, "Hi")]);
        assert_eq!(serialize(&track), "1\n00:01:05,123 --> 00:01:06,000\nHi\n\n");
    }

    #[test]
    fn test_parse_crlf_and_bom() {
        let content = "\u{feff}1\r\n00:00:01,000 --> 00:00:02,500\r\nHello\r\nworld\r\n\r\n2\r\n00:00:03,000 --> 00:00:04,000\r\nBye\r\n";
        let track = parse(content).unwrap();

        assert_eq!(track.len(), 2);
        assert_eq!(track.cues()[0].text, "Hello\nworld");
        assert_eq!(track.cues()[0].end, Timestamp::from_millis(2_500));
        assert_eq!(track.cues()[1].text, "Bye");
    }

    #[test]
    fn test_parse_keeps_empty_body() {
        let track = parse("1\n00:00:01,000 --> 00:00:02,000\n\n2\n00:00:02,000 --> 00:00:03,000\nx\n").unwrap();

        assert_eq!(track.len(), 2);
        assert_eq!(track.cues()[0].text, "");
    }

    #[test]
    fn test_parse_reports_block_number() {
        let content = "1\n00:00:01,000 --> 00:00:02,000\nok\n\n2\n00:00:02 --> 00:00:03,000\nbad\n";
        match parse(content) {
            Err(VidError::SubtitleParse { block, .. }) => assert_eq!(block, 2),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("track.srt");
        let track = SubtitleTrack::new(vec![cue(1, 0, 1_000, "a"), cue(2, 1_000, 2_000, "b\nc")]);

        write_file(&track, &path).await.unwrap();
        assert_eq!(read_file(&path).await.unwrap(), track);
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let err = read_file("/nonexistent/track.srt").await.unwrap_err();
        assert!(matches!(err, VidError::FileNotFound(_)));
    }
}
