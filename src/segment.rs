use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, VidError};
use crate::timeline::{TimeWindow, Timestamp};

/// One output part of a split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitPart {
    /// 1-based part number
    pub part: usize,
    pub window: TimeWindow,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitPlan {
    parts: Vec<SplitPart>,
}

impl SplitPlan {
    pub fn parts(&self) -> &[SplitPart] {
        &self.parts
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn windows(&self) -> impl Iterator<Item = TimeWindow> + '_ {
        self.parts.iter().map(|part| part.window)
    }

    /// Output file name for a part, e.g. `talk_part03.mp4`.
    ///
    /// The number is padded to the width of the largest part number so
    /// names sort in playback order.
    pub fn part_file_name(&self, stem: &str, extension: &str, part: usize) -> String {
        let width = self.parts.len().max(1).to_string().len().max(2);
        format!("{}_part{:0width$}.{}", stem, part, extension, width = width)
    }
}

/// Plans overlapping time windows for cutting a long video into parts
#[derive(Debug, Clone, Copy)]
pub struct SegmentPlanner {
    part_length: Timestamp,
    overlap: Timestamp,
}

impl SegmentPlanner {
    pub fn new(part_length_secs: f64, overlap_secs: f64) -> Result<Self> {
        if !(part_length_secs > 0.0) || !part_length_secs.is_finite() {
            return Err(VidError::InvalidSplit(format!(
                "part length must be positive, got {}",
                part_length_secs
            )));
        }
        if !(overlap_secs >= 0.0) || overlap_secs >= part_length_secs {
            return Err(VidError::InvalidSplit(format!(
                "overlap must be in [0, {}), got {}",
                part_length_secs, overlap_secs
            )));
        }

        let part_length = Timestamp::from_secs_f64(part_length_secs);
        if part_length == Timestamp::ZERO {
            return Err(VidError::InvalidSplit(format!(
                "part length {} rounds to zero milliseconds",
                part_length_secs
            )));
        }

        Ok(Self {
            part_length,
            overlap: Timestamp::from_secs_f64(overlap_secs),
        })
    }

    /// Windows for a video of `total_secs`.
    ///
    /// Part `k` nominally covers `[(k-1)L, kL)`; every part but the first is
    /// widened backwards by the overlap, and every part but the last forwards,
    /// so neighbouring parts share `2·O` seconds around each cut.
    pub fn plan(&self, total_secs: f64) -> Result<SplitPlan> {
        if !total_secs.is_finite() || total_secs < 0.0 {
            return Err(VidError::InvalidSplit(format!(
                "duration must be a non-negative number, got {}",
                total_secs
            )));
        }

        let total = Timestamp::from_secs_f64(total_secs);
        if total == Timestamp::ZERO {
            return Ok(SplitPlan::default());
        }
        if total <= self.part_length {
            return Ok(SplitPlan {
                parts: vec![SplitPart {
                    part: 1,
                    window: TimeWindow::new(Timestamp::ZERO, total)?,
                }],
            });
        }

        let length = self.part_length.as_millis();
        let mut parts = Vec::new();
        let mut nominal_start = 0u64;

        while nominal_start < total.as_millis() {
            let start = Timestamp::from_millis(nominal_start).saturating_sub(self.overlap);
            let end = Timestamp::from_millis(nominal_start + length)
                .saturating_add(self.overlap)
                .min(total);

            parts.push(SplitPart {
                part: parts.len() + 1,
                window: TimeWindow::new(start, end)?,
            });
            nominal_start += length;
        }

        debug!(
            "Planned {} parts of {} (overlap {}) for {}",
            parts.len(),
            self.part_length,
            self.overlap,
            total
        );
        Ok(SplitPlan { parts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(plan: &SplitPlan) -> Vec<(f64, f64)> {
        plan.windows()
            .map(|window| (window.start.as_secs_f64(), window.end.as_secs_f64()))
            .collect()
    }

    #[test]
    fn test_thirty_minutes_in_five_minute_parts() {
        let plan = SegmentPlanner::new(300.0, 2.0).unwrap().plan(1800.0).unwrap();

        assert_eq!(
            secs(&plan),
            [
                (0.0, 302.0),
                (298.0, 602.0),
                (598.0, 902.0),
                (898.0, 1202.0),
                (1198.0, 1502.0),
                (1498.0, 1800.0),
            ]
        );
        assert_eq!(plan.parts()[5].part, 6);
    }

    #[test]
    fn test_short_video_is_one_part() {
        let planner = SegmentPlanner::new(300.0, 2.0).unwrap();

        assert_eq!(secs(&planner.plan(120.5).unwrap()), [(0.0, 120.5)]);
        assert_eq!(secs(&planner.plan(300.0).unwrap()), [(0.0, 300.0)]);
    }

    #[test]
    fn test_zero_duration_is_empty() {
        let plan = SegmentPlanner::new(300.0, 2.0).unwrap().plan(0.0).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_uneven_tail() {
        let plan = SegmentPlanner::new(300.0, 2.0).unwrap().plan(650.0).unwrap();

        assert_eq!(secs(&plan), [(0.0, 302.0), (298.0, 602.0), (598.0, 650.0)]);
    }

    #[test]
    fn test_last_window_ends_at_duration_and_all_cover() {
        for total in [301.0, 599.9, 1000.0, 3601.25] {
            let plan = SegmentPlanner::new(300.0, 5.0).unwrap().plan(total).unwrap();
            let windows: Vec<TimeWindow> = plan.windows().collect();

            assert_eq!(windows[0].start, Timestamp::ZERO);
            assert_eq!(windows.last().unwrap().end, Timestamp::from_secs_f64(total));
            for pair in windows.windows(2) {
                assert!(pair[1].start < pair[0].end, "gap in {:?}", pair);
            }
            // The first cut is pulled back by the overlap, later ones step by L
            assert_eq!(windows[1].start.as_millis(), 295_000);
            for pair in windows[1..].windows(2) {
                assert_eq!(pair[1].start.as_millis() - pair[0].start.as_millis(), 300_000);
            }
        }
    }

    #[test]
    fn test_zero_overlap_tiles_exactly() {
        let plan = SegmentPlanner::new(60.0, 0.0).unwrap().plan(180.0).unwrap();

        assert_eq!(secs(&plan), [(0.0, 60.0), (60.0, 120.0), (120.0, 180.0)]);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(matches!(SegmentPlanner::new(0.0, 0.0), Err(VidError::InvalidSplit(_))));
        assert!(matches!(SegmentPlanner::new(-5.0, 0.0), Err(VidError::InvalidSplit(_))));
        assert!(matches!(SegmentPlanner::new(10.0, 10.0), Err(VidError::InvalidSplit(_))));
        assert!(matches!(SegmentPlanner::new(10.0, -1.0), Err(VidError::InvalidSplit(_))));
        assert!(matches!(
            SegmentPlanner::new(10.0, 1.0).unwrap().plan(f64::NAN),
            Err(VidError::InvalidSplit(_))
        ));
    }

    #[test]
    fn test_part_file_names() {
        let plan = SegmentPlanner::new(300.0, 2.0).unwrap().plan(1800.0).unwrap();
        assert_eq!(plan.part_file_name("talk", "mp4", 3), "talk_part03.mp4");

        let long = SegmentPlanner::new(10.0, 0.0).unwrap().plan(1500.0).unwrap();
        assert_eq!(long.len(), 150);
        assert_eq!(long.part_file_name("talk", "mkv", 7), "talk_part007.mkv");
    }
}
