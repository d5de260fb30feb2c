use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{Result, VidError};
use crate::filter::{FilterChainBuilder, StyledTrack, SubtitleLayout};
use crate::geometry::{Resolution, ScaleCalculator, ScaleOption};
use crate::media::{MediaCommandBuilder, MediaProcessorFactory, MediaProcessorTrait, StagedManifest};
use crate::quality::{TranslationValidator, ValidationReport};
use crate::reconcile::{track_from_segments, TimingReconciler};
use crate::segment::SegmentPlanner;
use crate::subtitle::{srt, SubtitleTrack};
use crate::transcribe::{read_segments_json, ModelHandle, RecognitionRequest, SpeechRecognizer};
use crate::translate::{translate_track, TimingPolicy, TranslationProvider};

const VIDEO_EXTENSIONS: [&str; 7] = ["mp4", "avi", "mov", "mkv", "wmv", "flv", "webm"];

/// Result of one encoder run
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOutcome {
    pub job_id: String,
    pub source: Resolution,
    pub option: ScaleOption,
    /// Final frame size including subtitle bands
    pub output: Resolution,
    pub output_path: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub failed: usize,
}

/// Identity and private working directory of one job.
///
/// The directory and anything left in it are removed on drop.
struct Job {
    id: String,
    dir: tempfile::TempDir,
}

impl Job {
    fn create(working_dir: Option<&Path>) -> Result<Self> {
        let id = Uuid::new_v4().to_string();
        let mut builder = tempfile::Builder::new();
        builder.prefix("vidscaler-");

        let dir = match working_dir {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };

        debug!("Job {} working in {}", id, dir.path().display());
        Ok(Self { id, dir })
    }

    fn dir(&self) -> &Path {
        self.dir.path()
    }
}

pub struct Workflow {
    config: Config,
    media: Box<dyn MediaProcessorTrait>,
    commands: MediaCommandBuilder,
    scaler: ScaleCalculator,
    filters: FilterChainBuilder,
    reconciler: TimingReconciler,
    validator: TranslationValidator,
}

impl Workflow {
    pub fn new(config: Config) -> Result<Self> {
        let media = MediaProcessorFactory::create_processor(config.media.clone());

        // Check dependencies
        media.check_availability()?;

        Ok(Self::with_processor(config, media))
    }

    /// Build a workflow around an existing media processor
    pub fn with_processor(config: Config, media: Box<dyn MediaProcessorTrait>) -> Self {
        let commands = MediaCommandBuilder::new(&config.media.binary_path, &config.media.probe_path);
        let scaler = ScaleCalculator::new(config.scale.clone());
        let filters = FilterChainBuilder::new(config.layout.clone());
        let reconciler = TimingReconciler::new(config.reconcile.sentinel.clone());
        let validator = TranslationValidator::new(config.validation.empty_threshold_pct);

        Self {
            config,
            media,
            commands,
            scaler,
            filters,
            reconciler,
            validator,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn version_info(&self) -> Result<String> {
        self.media.version_info().await
    }

    /// Source resolution and duration of a video
    pub async fn media_info<P: AsRef<Path>>(&self, video_path: P) -> Result<(Resolution, f64)> {
        let video_path = existing_file(video_path.as_ref())?;
        let resolution = self.media.probe_resolution(video_path).await?;
        let duration = self.media.probe_duration(video_path).await?;
        Ok((resolution, duration))
    }

    /// Output sizes offered for a video, best quality first
    pub async fn scale_options<P: AsRef<Path>>(&self, video_path: P) -> Result<(Resolution, Vec<ScaleOption>)> {
        let video_path = existing_file(video_path.as_ref())?;
        let source = self.media.probe_resolution(video_path).await?;
        let options = self.scaler.options(source)?;
        Ok((source, options))
    }

    /// Rescale without subtitles. `width: None` keeps the source width.
    pub async fn scale_video<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input_path: P,
        output_path: Q,
        width: Option<u32>,
    ) -> Result<RenderOutcome> {
        self.render(input_path.as_ref(), output_path.as_ref(), width, SubtitleLayout::None)
            .await
    }

    /// Rescale and burn one subtitle track into a band below the picture
    pub async fn burn_subtitles<P: AsRef<Path>, Q: AsRef<Path>, R: AsRef<Path>>(
        &self,
        input_path: P,
        subtitles_path: Q,
        output_path: R,
        width: Option<u32>,
    ) -> Result<RenderOutcome> {
        let track = srt::read_file(subtitles_path).await?;
        let style = &self.config.layout.base_style;

        let layout = SubtitleLayout::Single(StyledTrack::new(&track, style));

        self.render(input_path.as_ref(), output_path.as_ref(), width, layout)
            .await
    }

    /// Rescale and burn the original track above and the translation below
    pub async fn burn_dual<P, Q, R, S>(
        &self,
        input_path: P,
        original_path: Q,
        translation_path: R,
        output_path: S,
        width: Option<u32>,
    ) -> Result<RenderOutcome>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
        R: AsRef<Path>,
        S: AsRef<Path>,
    {
        let original = srt::read_file(original_path).await?;
        let translation = srt::read_file(translation_path).await?;
        let style = &self.config.layout.base_style;

        let layout = SubtitleLayout::Dual {
            original: StyledTrack::new(&original, style),
            translation: StyledTrack::new(&translation, style),
        };

        self.render(input_path.as_ref(), output_path.as_ref(), width, layout)
            .await
    }

    async fn render(
        &self,
        input_path: &Path,
        output_path: &Path,
        width: Option<u32>,
        subtitles: SubtitleLayout<'_>,
    ) -> Result<RenderOutcome> {
        let input_path = std::path::absolute(existing_file(input_path)?)?;
        // The encoder runs inside the job directory, so relative paths would
        // resolve against the wrong place
        let output_path = std::path::absolute(output_path)?;
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let source = self.media.probe_resolution(&input_path).await?;
        let option = match width {
            Some(width) => self.scaler.option_for_width(source, width)?,
            // The first option is always the unscaled source
            None => self
                .scaler
                .options(source)?
                .into_iter()
                .next()
                .ok_or_else(|| VidError::geometry("width", source.width as i64, "no scale options"))?,
        };

        let job = Job::create(self.config.working_dir.as_deref())?;
        let plan = self.filters.build(source, &option, subtitles, &job.id)?;
        info!(
            "Rendering {} at {} -> {} ({})",
            input_path.display(),
            source,
            plan.output_resolution(),
            job.id
        );

        let manifest = StagedManifest::stage(job.dir(), plan.artifacts()).await?;
        let command = self.commands.render(
            input_path.as_path(),
            output_path.as_path(),
            &plan,
            manifest.work_dir(),
            &self.config.media.encode_options,
        );
        let result = self.media.run(command).await;
        drop(manifest);
        result?;

        info!("Wrote {}", output_path.display());
        Ok(RenderOutcome {
            job_id: job.id.clone(),
            source,
            option,
            output: plan.output_resolution(),
            output_path,
        })
    }

    /// Extract audio, run the recognizer and write the result as SRT.
    ///
    /// With a `reference` track the recognized text is mapped onto the
    /// reference timing; otherwise the recognizer's own segmentation is kept.
    pub async fn transcribe_video<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        video_path: P,
        output_path: Q,
        recognizer: &dyn SpeechRecognizer,
        handle: &ModelHandle,
        request: &RecognitionRequest,
        reference: Option<&SubtitleTrack>,
    ) -> Result<SubtitleTrack> {
        let video_path = existing_file(video_path.as_ref())?;
        if let Some(reference) = reference {
            reference.validate()?;
        }

        let job = Job::create(self.config.working_dir.as_deref())?;
        let audio_path = job.dir().join(format!("{}_audio.wav", job.id));
        self.media
            .run(self.commands.extract_audio(video_path, audio_path.as_path()))
            .await?;

        let segments = recognizer.recognize(handle, &audio_path, request).await?;
        info!("{} returned {} segments", recognizer.name(), segments.len());

        let track = match reference {
            Some(reference) => self.reconciler.reconcile(reference, segments),
            None => track_from_segments(segments),
        };

        srt::write_file(&track, output_path).await?;
        Ok(track)
    }

    /// Map an offline whisper.cpp JSON result onto a reference SRT
    pub async fn reconcile_files<P: AsRef<Path>, Q: AsRef<Path>, R: AsRef<Path>>(
        &self,
        reference_path: P,
        segments_path: Q,
        output_path: R,
    ) -> Result<SubtitleTrack> {
        let reference = srt::read_file(reference_path).await?;
        reference.validate()?;
        let segments = read_segments_json(segments_path).await?;

        let track = self.reconciler.reconcile(&reference, segments);
        srt::write_file(&track, output_path).await?;
        Ok(track)
    }

    /// Translate an SRT file and check the result before it is used
    pub async fn translate_subtitles<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        provider: &dyn TranslationProvider,
        input_path: P,
        output_path: Q,
        source_language: &str,
        target_language: &str,
        policy: TimingPolicy,
    ) -> Result<ValidationReport> {
        let original = srt::read_file(input_path).await?;
        let translated = translate_track(
            provider,
            &self.reconciler,
            &original,
            source_language,
            target_language,
            policy,
        )
        .await?;

        let report = self.validator.validate(&original, &translated);
        if !report.is_valid {
            warn!("Translation check failed:\n{}", report.details);
        }

        srt::write_file(&translated, output_path).await?;
        Ok(report)
    }

    /// Check a translated SRT file against its original
    pub async fn validate_translation<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        original_path: P,
        translated_path: Q,
    ) -> Result<ValidationReport> {
        let original = srt::read_file(original_path).await?;
        let translated = srt::read_file(translated_path).await?;
        Ok(self.validator.validate(&original, &translated))
    }

    /// Cut a video into overlapping parts named `<stem>_partNN.<ext>`
    pub async fn split_video<P: AsRef<Path>>(
        &self,
        video_path: P,
        output_dir: Option<&Path>,
    ) -> Result<Vec<PathBuf>> {
        let video_path = existing_file(video_path.as_ref())?;
        let (stem, extension) = stem_and_extension(video_path)?;
        let output_dir = output_dir_for(video_path, output_dir)?;
        fs::create_dir_all(&output_dir).await?;

        let duration = self.media.probe_duration(video_path).await?;
        let planner = SegmentPlanner::new(self.config.split.part_length_secs, self.config.split.overlap_secs)?;
        let plan = planner.plan(duration)?;

        if plan.len() <= 1 {
            info!(
                "{} is {:.1}s long, no split needed",
                video_path.display(),
                duration
            );
            return Ok(Vec::new());
        }

        let mut outputs = Vec::with_capacity(plan.len());
        for part in plan.parts() {
            let output_path = output_dir.join(plan.part_file_name(&stem, &extension, part.part));
            info!(
                "Part {}/{}: {} - {}",
                part.part,
                plan.len(),
                part.window.start,
                part.window.end
            );
            self.media
                .run(self.commands.cut_part(video_path, &part.window, output_path.as_path()))
                .await?;
            outputs.push(output_path);
        }

        Ok(outputs)
    }

    /// Rescale every video under `input_dir` to the option nearest `quality`
    /// (percent of source width). Failures are logged and counted.
    pub async fn process_directory<P: AsRef<Path>>(
        &self,
        input_dir: P,
        output_dir: Option<&Path>,
        quality: u32,
    ) -> Result<BatchSummary> {
        let input_dir = input_dir.as_ref();
        info!("Processing directory: {}", input_dir.display());

        if !input_dir.is_dir() {
            return Err(VidError::Config("Input path is not a directory".to_string()));
        }

        let output_dir = output_dir.unwrap_or(input_dir).to_path_buf();
        fs::create_dir_all(&output_dir).await?;

        let video_files: Vec<PathBuf> = WalkDir::new(input_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|entry| entry.file_type().is_file() && is_video(entry.path()))
            .map(|entry| entry.into_path())
            .collect();

        info!("Found {} video files to process", video_files.len());

        let progress = ProgressBar::new(video_files.len() as u64);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        let mut summary = BatchSummary::default();
        for video_path in &video_files {
            progress.set_message(
                video_path
                    .file_name()
                    .map(|name| name.to_string_lossy().to_string())
                    .unwrap_or_default(),
            );

            match self.scale_nearest(video_path, &output_dir, quality).await {
                Ok(outcome) => {
                    info!("Successfully processed: {}", outcome.output_path.display());
                    summary.processed += 1;
                }
                Err(e) => {
                    warn!("Failed to process {}: {}", video_path.display(), e);
                    summary.failed += 1;
                }
            }
            progress.inc(1);
        }

        progress.finish_with_message("done");
        info!(
            "Batch finished: {} processed, {} failed",
            summary.processed, summary.failed
        );
        Ok(summary)
    }

    async fn scale_nearest(&self, video_path: &Path, output_dir: &Path, quality: u32) -> Result<RenderOutcome> {
        let (_, options) = self.scale_options(video_path).await?;
        let option = nearest_option(&options, quality)
            .ok_or_else(|| VidError::Media(format!("No scale options for {}", video_path.display())))?;

        let (stem, extension) = stem_and_extension(video_path)?;
        let output_path = output_dir.join(format!("{}_scaled.{}", stem, extension));
        self.scale_video(video_path, output_path, Some(option.target_width)).await
    }
}

/// `<stem>_<suffix>.<ext>` next to `input_path`
pub fn derived_path(input_path: &Path, suffix: &str) -> Result<PathBuf> {
    let (stem, extension) = stem_and_extension(input_path)?;
    Ok(input_path.with_file_name(format!("{}_{}.{}", stem, suffix, extension)))
}

fn nearest_option(options: &[ScaleOption], quality: u32) -> Option<ScaleOption> {
    options
        .iter()
        .min_by_key(|option| option.quality_rank.abs_diff(quality))
        .copied()
}

fn existing_file(path: &Path) -> Result<&Path> {
    if !path.is_file() {
        return Err(VidError::FileNotFound(path.display().to_string()));
    }
    Ok(path)
}

fn is_video(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| VIDEO_EXTENSIONS.contains(&extension.to_lowercase().as_str()))
}

fn stem_and_extension(path: &Path) -> Result<(String, String)> {
    let stem = path
        .file_stem()
        .ok_or_else(|| VidError::Config(format!("Invalid video filename: {}", path.display())))?
        .to_string_lossy()
        .to_string();
    let extension = path
        .extension()
        .map(|extension| extension.to_string_lossy().to_string())
        .unwrap_or_else(|| "mp4".to_string());
    Ok((stem, extension))
}

fn output_dir_for(video_path: &Path, output_dir: Option<&Path>) -> Result<PathBuf> {
    match output_dir {
        Some(dir) => Ok(dir.to_path_buf()),
        None => video_path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| VidError::Config("Cannot determine output directory".to_string())),
    }
}
