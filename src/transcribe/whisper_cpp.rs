use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

use super::{ModelHandle, RecognitionRequest, RecognitionTask, SpeechRecognizer};
use crate::config::RecognizerConfig;
use crate::error::{Result, VidError};
use crate::reconcile::AsrSegment;
use crate::timeline::Timestamp;

const BACKEND: &str = "whisper.cpp";

/// Whisper.cpp `-oj` output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppOutput {
    #[serde(default)]
    pub result: Option<WhisperCppResult>,
    pub transcription: Vec<WhisperCppSegment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppResult {
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppSegment {
    pub offsets: WhisperCppOffsets,
    pub text: String,
}

/// Segment bounds in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppOffsets {
    pub from: i64,
    pub to: i64,
}

impl From<WhisperCppSegment> for AsrSegment {
    fn from(segment: WhisperCppSegment) -> Self {
        AsrSegment::new(
            Timestamp::from_millis(segment.offsets.from.max(0) as u64),
            Timestamp::from_millis(segment.offsets.to.max(0) as u64),
            segment.text.trim(),
        )
    }
}

/// Parse whisper.cpp JSON into chronological segments
pub fn parse_segments(json: &str) -> Result<Vec<AsrSegment>> {
    let output: WhisperCppOutput = serde_json::from_str(json)
        .map_err(|e| VidError::Recognizer(format!("Failed to parse whisper.cpp JSON: {}", e)))?;

    if let Some(result) = &output.result {
        debug!("whisper.cpp detected language: {}", result.language);
    }

    let mut segments: Vec<AsrSegment> = output.transcription.into_iter().map(AsrSegment::from).collect();
    segments.sort_by_key(|segment| segment.start);
    Ok(segments)
}

/// Load segments from a whisper.cpp JSON file written earlier
pub async fn read_segments_json<P: AsRef<Path>>(path: P) -> Result<Vec<AsrSegment>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(VidError::FileNotFound(path.display().to_string()));
    }
    let content = tokio::fs::read_to_string(path).await?;
    parse_segments(&content)
}

/// Runs the whisper.cpp CLI
pub struct WhisperCppRecognizer {
    config: RecognizerConfig,
}

impl WhisperCppRecognizer {
    pub fn new(config: RecognizerConfig) -> Self {
        Self { config }
    }

    pub fn model_path(&self, model: &str) -> PathBuf {
        self.config.model_dir.join(format!("ggml-{}.bin", model))
    }

    fn build_args(
        &self,
        handle: &ModelHandle,
        audio_path: &Path,
        output_base: &Path,
        request: &RecognitionRequest,
    ) -> Result<Vec<String>> {
        let mut args = vec![
            "-m".to_string(),
            handle.path().to_string_lossy().to_string(),
            "-f".to_string(),
            audio_path.to_string_lossy().to_string(),
            "-oj".to_string(),
            "-of".to_string(),
            output_base.to_string_lossy().to_string(),
            "-t".to_string(),
            self.config.threads.to_string(),
        ];

        // whisper.cpp assumes English without -l
        let language = request
            .language
            .as_deref()
            .or(self.config.language.as_deref())
            .unwrap_or("auto");
        args.push("-l".to_string());
        args.push(language.to_string());

        if let RecognitionTask::Translate { target } = &request.task {
            // The model can only translate into English
            if !target.eq_ignore_ascii_case("en") {
                return Err(VidError::Recognizer(format!(
                    "{} translates into English only, '{}' requested",
                    BACKEND, target
                )));
            }
            args.push("--translate".to_string());
        }

        Ok(args)
    }
}

#[async_trait]
impl SpeechRecognizer for WhisperCppRecognizer {
    fn name(&self) -> &'static str {
        BACKEND
    }

    async fn acquire(&self, model: &str) -> Result<ModelHandle> {
        let path = self.model_path(model);
        if !path.exists() {
            return Err(VidError::Recognizer(format!(
                "Model '{}' not found at {}",
                model,
                path.display()
            )));
        }

        info!("Using {} model {}", BACKEND, path.display());
        Ok(ModelHandle::new(model, path, BACKEND))
    }

    async fn release(&self, handle: ModelHandle) -> Result<()> {
        handle.ensure_backend(BACKEND)?;
        // Each CLI run loads the model itself; nothing stays resident
        debug!("Released model {}", handle.name());
        Ok(())
    }

    async fn recognize(
        &self,
        handle: &ModelHandle,
        audio_path: &Path,
        request: &RecognitionRequest,
    ) -> Result<Vec<AsrSegment>> {
        handle.ensure_backend(BACKEND)?;
        info!("Recognizing speech in {}", audio_path.display());

        let temp_dir = tempfile::tempdir()
            .map_err(|e| VidError::Recognizer(format!("Failed to create temp directory: {}", e)))?;
        let output_base = temp_dir.path().join("recognized");
        let args = self.build_args(handle, audio_path, &output_base, request)?;

        debug!("Executing {} {:?}", self.config.binary_path, args);
        let output = Command::new(&self.config.binary_path)
            .args(&args)
            .output()
            .await
            .map_err(|e| VidError::Recognizer(format!("Failed to execute {}: {}", self.config.binary_path, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VidError::Recognizer(format!("{} failed: {}", BACKEND, stderr.trim())));
        }

        let segments = read_segments_json(output_base.with_extension("json")).await?;
        info!("Recognized {} segments", segments.len());
        Ok(segments)
    }
}
