use std::path::{Component, Path};
use tracing::debug;

use crate::config::LayoutConfig;
use crate::error::{Result, VidError};
use crate::geometry::{Resolution, ScaleOption};
use crate::subtitle::ass::{self, PLAY_RES_Y};
use crate::subtitle::{Placement, StyleSpec, StyleTransformer, SubtitleTrack};

/// Characters the ffmpeg filter-graph parser treats as syntax
const FILTER_METACHARACTERS: &[char] = &['\\', ':', '\'', '"', ',', ';', '[', ']', '=', '%'];

/// What a burned-in track represents, used to name its staged file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackRole {
    Subtitles,
    Original,
    Translation,
}

impl TrackRole {
    fn suffix(&self) -> &'static str {
        match self {
            Self::Subtitles => "subtitles",
            Self::Original => "original",
            Self::Translation => "translation",
        }
    }
}

/// A subtitle track together with the style it should be rendered in
#[derive(Debug, Clone, Copy)]
pub struct StyledTrack<'a> {
    pub track: &'a SubtitleTrack,
    pub style: &'a StyleSpec,
}

impl<'a> StyledTrack<'a> {
    pub fn new(track: &'a SubtitleTrack, style: &'a StyleSpec) -> Self {
        Self { track, style }
    }
}

/// Which subtitle tracks are burned into the output
#[derive(Debug, Clone, Copy)]
pub enum SubtitleLayout<'a> {
    None,
    Single(StyledTrack<'a>),
    Dual {
        original: StyledTrack<'a>,
        translation: StyledTrack<'a>,
    },
}

/// One stage of the video filter graph
#[derive(Debug, Clone, PartialEq)]
pub enum FilterStage {
    Scale {
        width: u32,
        height: u32,
    },
    /// Grow the frame by `extra_height` rows, placing the picture `y_offset` rows down
    Pad {
        extra_height: u32,
        y_offset: u32,
    },
    SubtitleBurn {
        file_name: String,
        role: TrackRole,
        style: StyleSpec,
    },
}

impl FilterStage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Scale { .. } => "scale",
            Self::Pad { .. } => "pad",
            Self::SubtitleBurn { .. } => "ass",
        }
    }

    pub fn to_expression(&self) -> String {
        match self {
            Self::Scale { width, height } => format!("scale={}:{}", width, height),
            Self::Pad {
                extra_height,
                y_offset,
            } => format!("pad=iw:ih+{}:0:{}:black", extra_height, y_offset),
            Self::SubtitleBurn { file_name, .. } => format!("ass=filename={}", file_name),
        }
    }
}

/// A file the caller must write into the working directory before running
/// the encoder, and remove afterwards
#[derive(Debug, Clone, PartialEq)]
pub struct StagedArtifact {
    /// Name relative to the working directory, safe for filter expressions
    pub file_name: String,
    pub role: TrackRole,
    pub contents: String,
}

/// Ordered filter stages plus the artifacts they reference
#[derive(Debug, Clone, PartialEq)]
pub struct FilterPlan {
    stages: Vec<FilterStage>,
    artifacts: Vec<StagedArtifact>,
    output: Resolution,
}

impl FilterPlan {
    pub fn stages(&self) -> &[FilterStage] {
        &self.stages
    }

    pub fn artifacts(&self) -> &[StagedArtifact] {
        &self.artifacts
    }

    /// Final frame size, padding included
    pub fn output_resolution(&self) -> Resolution {
        self.output
    }

    /// Render as an ffmpeg `-vf` argument
    pub fn to_expression(&self) -> String {
        self.stages
            .iter()
            .map(FilterStage::to_expression)
            .collect::<Vec<_>>()
            .join(",")
    }
}

pub struct FilterChainBuilder {
    layout: LayoutConfig,
    styles: StyleTransformer,
}

impl FilterChainBuilder {
    pub fn new(layout: LayoutConfig) -> Self {
        let styles = StyleTransformer::new(layout.dual.clone());
        Self { layout, styles }
    }

    /// Build the filter plan for one processing request.
    ///
    /// `job_id` prefixes every staged file name so concurrent jobs sharing a
    /// working directory do not collide.
    pub fn build(
        &self,
        source: Resolution,
        option: &ScaleOption,
        subtitles: SubtitleLayout<'_>,
        job_id: &str,
    ) -> Result<FilterPlan> {
        let scaled = self.check_option(source, option)?;
        let mut stages = vec![FilterStage::Scale {
            width: scaled.width,
            height: scaled.height,
        }];
        let mut artifacts = Vec::new();
        let mut output = scaled;

        match subtitles {
            SubtitleLayout::None => {}
            SubtitleLayout::Single(styled) => {
                styled.track.validate()?;
                let style = self.styles.single_band(styled.style);
                let band = self.band_height(&[&style], scaled.height)?;

                stages.push(FilterStage::Pad {
                    extra_height: band,
                    y_offset: 0,
                });
                stages.push(self.burn_stage(styled.track, style, TrackRole::Subtitles, job_id, &mut artifacts)?);
                output.height += band;
            }
            SubtitleLayout::Dual {
                original,
                translation,
            } => {
                original.track.validate()?;
                translation.track.validate()?;
                let top_style = self.styles.for_placement(original.style, Placement::TopCenter);
                let bottom_style = self
                    .styles
                    .for_placement(translation.style, Placement::BottomCenter);

                let mut total = self.band_height(&[&top_style, &bottom_style], scaled.height)?;
                let top_content = self.band_content(&top_style);
                let bottom_content = self.band_content(&bottom_style);

                // Each band must hold its own content at the final frame height
                let (top_min, bottom_min) = loop {
                    let frame = scaled.height + total;
                    let top_min = required_rows(top_content, frame);
                    let bottom_min = required_rows(bottom_content, frame);
                    if top_min + bottom_min <= total {
                        break (top_min, bottom_min);
                    }
                    total += 2;
                };
                // The configured share is honoured only while both bands still fit
                let top = round_even(total as f64 * self.layout.top_band_ratio)
                    .max(top_min)
                    .min(total - bottom_min);

                stages.push(FilterStage::Pad {
                    extra_height: total,
                    y_offset: top,
                });
                stages.push(self.burn_stage(original.track, top_style, TrackRole::Original, job_id, &mut artifacts)?);
                stages.push(self.burn_stage(
                    translation.track,
                    bottom_style,
                    TrackRole::Translation,
                    job_id,
                    &mut artifacts,
                )?);
                output.height += total;
            }
        }

        let plan = FilterPlan {
            stages,
            artifacts,
            output,
        };
        debug!("Built filter plan for {}: {}", source, plan.to_expression());
        Ok(plan)
    }

    fn check_option(&self, source: Resolution, option: &ScaleOption) -> Result<Resolution> {
        let source = source.to_even()?;
        let scaled = Resolution::new(option.target_width, option.target_height)?;

        if !scaled.is_even() {
            return Err(VidError::geometry(
                if scaled.width % 2 != 0 { "width" } else { "height" },
                if scaled.width % 2 != 0 { scaled.width } else { scaled.height } as i64,
                "encoder requires even dimensions",
            ));
        }
        if scaled.width > source.width {
            return Err(VidError::geometry(
                "width",
                scaled.width as i64,
                format!("exceeds source width {}", source.width),
            ));
        }
        if scaled.height > source.height {
            return Err(VidError::geometry(
                "height",
                scaled.height as i64,
                format!("exceeds source height {}", source.height),
            ));
        }
        Ok(scaled)
    }

    /// Padding rows needed so the given bands fit below/above the picture.
    ///
    /// The renderer scales script units against the padded frame, so the
    /// band `B` for content height `k` (script units) solves
    /// `B = k * (H + B) / PlayResY`.
    fn band_height(&self, styles: &[&StyleSpec], scaled_height: u32) -> Result<u32> {
        let content: f64 = styles.iter().map(|style| self.band_content(style)).sum();

        let play_res = PLAY_RES_Y as f64;
        if content >= play_res {
            let font_size = styles.iter().map(|style| style.font_size).max().unwrap_or_default();
            return Err(VidError::geometry(
                "font_size",
                font_size as i64,
                "subtitle bands would not fit in the padded frame",
            ));
        }

        let band = content * scaled_height as f64 / (play_res - content);
        Ok(ceil_even(band))
    }

    /// Script units one band occupies: its lines plus the vertical margin
    fn band_content(&self, style: &StyleSpec) -> f64 {
        style.font_size as f64 * self.layout.line_height_multiplier * self.layout.lines_per_band as f64
            + style.margin_v as f64
    }

    fn burn_stage(
        &self,
        track: &SubtitleTrack,
        style: StyleSpec,
        role: TrackRole,
        job_id: &str,
        artifacts: &mut Vec<StagedArtifact>,
    ) -> Result<FilterStage> {
        let file_name = format!("{}_{}.ass", job_id, role.suffix());
        check_filter_path(&file_name)?;

        artifacts.push(StagedArtifact {
            file_name: file_name.clone(),
            role,
            contents: ass::render_document(track, &style),
        });

        Ok(FilterStage::SubtitleBurn {
            file_name,
            role,
            style,
        })
    }
}

/// Reject paths the filter-graph parser would misread
pub fn check_filter_path(path: &str) -> Result<()> {
    let hazard = |reason: String| {
        Err(VidError::PathEncodingHazard {
            path: path.to_string(),
            reason,
        })
    };

    if path.is_empty() {
        return hazard("empty path".to_string());
    }
    if path.starts_with('/') || path.starts_with("\\\\") {
        return hazard("absolute path".to_string());
    }
    let mut chars = path.chars();
    if let (Some(first), Some(':')) = (chars.next(), chars.next()) {
        if first.is_ascii_alphabetic() {
            return hazard("drive or volume prefix".to_string());
        }
    }
    if let Some(c) = path
        .chars()
        .find(|c| FILTER_METACHARACTERS.contains(c) || c.is_control())
    {
        return hazard(format!("character {:?} is special in filter expressions", c));
    }
    Ok(())
}

/// Express `path` relative to `work_dir` in a form filter expressions accept
pub fn relative_filter_path(work_dir: &Path, path: &Path) -> Result<String> {
    let relative = if path.is_absolute() {
        pathdiff::diff_paths(path, work_dir).ok_or_else(|| VidError::PathEncodingHazard {
            path: path.display().to_string(),
            reason: format!("no relative form against {}", work_dir.display()),
        })?
    } else {
        path.to_path_buf()
    };

    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                let part = part.to_str().ok_or_else(|| VidError::PathEncodingHazard {
                    path: path.display().to_string(),
                    reason: "not valid UTF-8".to_string(),
                })?;
                parts.push(part.to_string());
            }
            Component::ParentDir => parts.push("..".to_string()),
            Component::CurDir => {}
            Component::RootDir | Component::Prefix(_) => {
                return Err(VidError::PathEncodingHazard {
                    path: path.display().to_string(),
                    reason: "path keeps a root or drive prefix".to_string(),
                });
            }
        }
    }

    let joined = parts.join("/");
    check_filter_path(&joined)?;
    Ok(joined)
}

fn ceil_even(value: f64) -> u32 {
    let value = value.ceil().max(0.0) as u32;
    value + value % 2
}

/// Even pixel rows `content` script units take up in a frame `frame_height` tall
fn required_rows(content: f64, frame_height: u32) -> u32 {
    ceil_even(content * frame_height as f64 / PLAY_RES_Y as f64)
}

fn round_even(value: f64) -> u32 {
    ((value / 2.0).round().max(0.0) as u32) * 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subtitle::{Alignment, SubtitleCue};
    use crate::timeline::Timestamp;

    fn builder() -> FilterChainBuilder {
        FilterChainBuilder::new(LayoutConfig::default())
    }

    fn source() -> Resolution {
        Resolution::new(1920, 1080).unwrap()
    }

    fn option_720p() -> ScaleOption {
        ScaleOption {
            target_width: 1280,
            target_height: 720,
            quality_rank: 66,
        }
    }

    fn track(text: &str) -> SubtitleTrack {
        SubtitleTrack::new(vec![
            SubtitleCue::new(1, Timestamp::from_millis(0), Timestamp::from_millis(6_080), text),
            SubtitleCue::new(2, Timestamp::from_millis(6_280), Timestamp::from_millis(9_000), "next"),
        ])
    }

    #[test]
    fn test_no_tracks_is_scale_only() {
        let plan = builder()
            .build(source(), &option_720p(), SubtitleLayout::None, "job")
            .unwrap();

        assert_eq!(plan.to_expression(), "scale=1280:720");
        assert!(plan.artifacts().is_empty());
        assert_eq!(plan.output_resolution(), Resolution::new(1280, 720).unwrap());
    }

    #[test]
    fn test_single_track_pads_bottom_band() {
        let subtitles = track("Hello");
        let style = StyleSpec::default();
        let plan = builder()
            .build(
                source(),
                &option_720p(),
                SubtitleLayout::Single(StyledTrack::new(&subtitles, &style)),
                "job1",
            )
            .unwrap();

        let names: Vec<&str> = plan.stages().iter().map(FilterStage::name).collect();
        assert_eq!(names, ["scale", "pad", "ass"]);
        // (20 * 1.2 * 2 + 12) * 720 / (288 - 60) = 189.47
        assert_eq!(
            plan.to_expression(),
            "scale=1280:720,pad=iw:ih+190:0:0:black,ass=filename=job1_subtitles.ass"
        );
        assert_eq!(plan.output_resolution(), Resolution::new(1280, 910).unwrap());

        let artifact = &plan.artifacts()[0];
        assert_eq!(artifact.file_name, "job1_subtitles.ass");
        assert!(artifact.contents.contains("Dialogue: 0,0:00:00.00,0:00:06.08,Default,,0,0,0,,Hello"));
    }

    #[test]
    fn test_dual_tracks_split_padding_asymmetrically() {
        let original = track("Does nature speak to us");
        let translation = track("Spricht die Natur zu uns");
        let style = StyleSpec::default();
        let plan = builder()
            .build(
                source(),
                &option_720p(),
                SubtitleLayout::Dual {
                    original: StyledTrack::new(&original, &style),
                    translation: StyledTrack::new(&translation, &style),
                },
                "job2",
            )
            .unwrap();

        // top (15 * 2.4 + 10) + bottom (15 * 2.4 + 12) = 94 script units
        // 94 * 720 / 194 = 348.87 -> 350, but the bands need 172 + 180 rows of
        // the 1070 frame, so the pad grows to 352 and the top band takes 172
        assert_eq!(
            plan.to_expression(),
            "scale=1280:720,pad=iw:ih+352:0:172:black,\
             ass=filename=job2_original.ass,ass=filename=job2_translation.ass"
        );

        match &plan.stages()[2] {
            FilterStage::SubtitleBurn { style, role, .. } => {
                assert_eq!(*role, TrackRole::Original);
                assert_eq!(style.alignment, Alignment::TopCenter);
            }
            other => panic!("unexpected stage {:?}", other),
        }
        match &plan.stages()[3] {
            FilterStage::SubtitleBurn { style, role, .. } => {
                assert_eq!(*role, TrackRole::Translation);
                assert_eq!(style.alignment, Alignment::BottomCenter);
            }
            other => panic!("unexpected stage {:?}", other),
        }
        assert_eq!(plan.artifacts().len(), 2);
        assert!(plan.output_resolution().is_even());
    }

    /// (top rows, bottom rows, rows the top style needs, rows the bottom style needs)
    fn dual_bands(layout: LayoutConfig) -> (u32, u32, f64, f64) {
        let original = track("Does nature speak to us");
        let translation = track("Spricht die Natur zu uns");
        let style = StyleSpec::default();
        let plan = FilterChainBuilder::new(layout.clone())
            .build(
                source(),
                &option_720p(),
                SubtitleLayout::Dual {
                    original: StyledTrack::new(&original, &style),
                    translation: StyledTrack::new(&translation, &style),
                },
                "job",
            )
            .unwrap();

        let (total, top) = match plan.stages()[1] {
            FilterStage::Pad {
                extra_height,
                y_offset,
            } => (extra_height, y_offset),
            _ => unreachable!(),
        };
        let frame = plan.output_resolution().height as f64;
        let needs = |index: usize| match &plan.stages()[index] {
            FilterStage::SubtitleBurn { style, .. } => {
                (style.font_size as f64 * layout.line_height_multiplier * layout.lines_per_band as f64
                    + style.margin_v as f64)
                    * frame
                    / PLAY_RES_Y as f64
            }
            _ => unreachable!(),
        };
        (top, total - top, needs(2), needs(3))
    }

    #[test]
    fn test_dual_bands_hold_their_own_content() {
        let layouts = [
            LayoutConfig::default(),
            LayoutConfig {
                lines_per_band: 1,
                ..LayoutConfig::default()
            },
            LayoutConfig {
                lines_per_band: 3,
                line_height_multiplier: 1.5,
                ..LayoutConfig::default()
            },
        ];

        for layout in layouts {
            let (top, bottom, top_needs, bottom_needs) = dual_bands(layout);

            assert!(top as f64 >= top_needs, "top band {} < {:.1}", top, top_needs);
            assert!(bottom as f64 >= bottom_needs, "bottom band {} < {:.1}", bottom, bottom_needs);
            assert_eq!(top % 2, 0);
            assert_eq!(bottom % 2, 0);
        }
    }

    #[test]
    fn test_top_band_ratio_never_starves_a_band() {
        for top_band_ratio in [0.1, 140.0 / 300.0, 0.9] {
            let layout = LayoutConfig {
                top_band_ratio,
                ..LayoutConfig::default()
            };
            let (top, bottom, top_needs, bottom_needs) = dual_bands(layout);

            assert!(top as f64 >= top_needs, "ratio {}: top {} < {:.1}", top_band_ratio, top, top_needs);
            assert!(bottom as f64 >= bottom_needs, "ratio {}: bottom {} < {:.1}", top_band_ratio, bottom, bottom_needs);
        }
    }

    #[test]
    fn test_larger_font_gets_taller_band() {
        let subtitles = track("Hello");
        let small = StyleSpec::default();
        let large = StyleSpec {
            font_size: 30,
            ..StyleSpec::default()
        };

        let pad_of = |style: &StyleSpec| {
            let plan = builder()
                .build(
                    source(),
                    &option_720p(),
                    SubtitleLayout::Single(StyledTrack::new(&subtitles, style)),
                    "job",
                )
                .unwrap();
            match plan.stages()[1] {
                FilterStage::Pad { extra_height, .. } => extra_height,
                _ => unreachable!(),
            }
        };

        assert!(pad_of(&large) > pad_of(&small));
        assert_eq!(pad_of(&small) % 2, 0);
        assert_eq!(pad_of(&large) % 2, 0);
    }

    #[test]
    fn test_oversized_font_is_rejected() {
        let subtitles = track("Hello");
        let style = StyleSpec {
            font_size: 200,
            ..StyleSpec::default()
        };
        let err = builder()
            .build(
                source(),
                &option_720p(),
                SubtitleLayout::Single(StyledTrack::new(&subtitles, &style)),
                "job",
            )
            .unwrap_err();

        assert!(matches!(err, VidError::InvalidGeometry { dimension: "font_size", .. }));
    }

    #[test]
    fn test_odd_option_is_rejected() {
        let option = ScaleOption {
            target_width: 1280,
            target_height: 721,
            quality_rank: 66,
        };
        let err = builder()
            .build(source(), &option, SubtitleLayout::None, "job")
            .unwrap_err();

        assert!(matches!(err, VidError::InvalidGeometry { dimension: "height", value: 721, .. }));
    }

    #[test]
    fn test_malformed_track_is_rejected_before_planning() {
        let broken = SubtitleTrack::new(vec![SubtitleCue::new(
            1,
            Timestamp::from_millis(5_000),
            Timestamp::from_millis(1_000),
            "backwards",
        )]);
        let style = StyleSpec::default();
        let err = builder()
            .build(
                source(),
                &option_720p(),
                SubtitleLayout::Single(StyledTrack::new(&broken, &style)),
                "job",
            )
            .unwrap_err();

        assert!(matches!(err, VidError::MalformedCue { index: 1, .. }));
    }

    #[test]
    fn test_unsafe_job_id_is_a_path_hazard() {
        let subtitles = track("Hello");
        let style = StyleSpec::default();
        let err = builder()
            .build(
                source(),
                &option_720p(),
                SubtitleLayout::Single(StyledTrack::new(&subtitles, &style)),
                "C:\\jobs\\1",
            )
            .unwrap_err();

        assert!(matches!(err, VidError::PathEncodingHazard { .. }));
    }

    #[test]
    fn test_expressions_never_carry_drive_prefixes() {
        let subtitles = track("Hello");
        let style = StyleSpec::default();
        for job_id in ["a", "job-42", "0b6c1f3e-8d2a-4f7e-9a51-3c2d1e0f9b8a"] {
            let plan = builder()
                .build(
                    source(),
                    &option_720p(),
                    SubtitleLayout::Dual {
                        original: StyledTrack::new(&subtitles, &style),
                        translation: StyledTrack::new(&subtitles, &style),
                    },
                    job_id,
                )
                .unwrap();

            for stage in plan.stages() {
                let expression = stage.to_expression();
                let parameters = expression.split_once('=').map(|(_, rest)| rest).unwrap_or("");
                if let FilterStage::SubtitleBurn { file_name, .. } = stage {
                    assert!(check_filter_path(file_name).is_ok());
                    assert!(!file_name.starts_with('/'));
                }
                assert!(!parameters.contains(":\\") && !parameters.contains(":/"), "{}", expression);
            }
        }
    }

    #[test]
    fn test_check_filter_path() {
        assert!(check_filter_path("job_subtitles.ass").is_ok());
        assert!(check_filter_path("subs/job.ass").is_ok());
        assert!(check_filter_path("C:/subs/job.ass").is_err());
        assert!(check_filter_path("/tmp/job.ass").is_err());
        assert!(check_filter_path("\\\\server\\share\\job.ass").is_err());
        assert!(check_filter_path("it's.ass").is_err());
        assert!(check_filter_path("a,b.ass").is_err());
        assert!(check_filter_path("").is_err());
    }

    #[test]
    fn test_relative_filter_path() {
        let work_dir = Path::new("/work/jobs");

        assert_eq!(
            relative_filter_path(work_dir, Path::new("/work/jobs/a/sub.ass")).unwrap(),
            "a/sub.ass"
        );
        assert_eq!(
            relative_filter_path(work_dir, Path::new("/work/other/sub.ass")).unwrap(),
            "../other/sub.ass"
        );
        assert_eq!(
            relative_filter_path(work_dir, Path::new("./sub.ass")).unwrap(),
            "sub.ass"
        );
        assert!(matches!(
            relative_filter_path(work_dir, Path::new("/work/jobs/weird:name.ass")),
            Err(VidError::PathEncodingHazard { .. })
        ));
    }
}
