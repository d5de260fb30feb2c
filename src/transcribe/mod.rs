// Speech recognition collaborators
//
// Recognizers turn an audio file into chronological AsrSegments. Models are
// acquired explicitly and the returned handle is owned by the caller, who
// passes it to every recognize call and hands it back through release.
//
// To add a recognizer: implement SpeechRecognizer, add a variant to
// RecognizerImplementation and wire it into the factory.

pub mod whisper_cpp;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub use whisper_cpp::{read_segments_json, WhisperCppRecognizer};

use crate::config::RecognizerConfig;
use crate::error::{Result, VidError};
use crate::reconcile::AsrSegment;

/// What the recognizer should produce
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionTask {
    /// Text in the spoken language
    Transcribe,
    /// Text translated by the recognizer itself into `target`
    Translate { target: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionRequest {
    /// Spoken language hint, auto-detected when unset
    pub language: Option<String>,
    pub task: RecognitionTask,
}

impl RecognitionRequest {
    pub fn transcribe(language: Option<String>) -> Self {
        Self {
            language,
            task: RecognitionTask::Transcribe,
        }
    }
}

/// A loaded recognizer model.
///
/// Not `Clone`: exactly one owner holds it until it is released.
#[derive(Debug, PartialEq, Eq)]
pub struct ModelHandle {
    name: String,
    path: PathBuf,
    backend: &'static str,
}

impl ModelHandle {
    pub(crate) fn new(name: impl Into<String>, path: PathBuf, backend: &'static str) -> Self {
        Self {
            name: name.into(),
            path,
            backend,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backend(&self) -> &'static str {
        self.backend
    }

    /// Fail unless this handle was issued by `backend`
    pub(crate) fn ensure_backend(&self, backend: &'static str) -> Result<()> {
        if self.backend != backend {
            return Err(VidError::Recognizer(format!(
                "model '{}' belongs to {}, not {}",
                self.name, self.backend, backend
            )));
        }
        Ok(())
    }
}

/// Main trait for speech recognition
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Load (or locate) a model and hand ownership of it to the caller
    async fn acquire(&self, model: &str) -> Result<ModelHandle>;

    /// Return a model obtained from [`SpeechRecognizer::acquire`]
    async fn release(&self, handle: ModelHandle) -> Result<()>;

    /// Recognize speech in a 16 kHz mono audio file
    async fn recognize(
        &self,
        handle: &ModelHandle,
        audio_path: &Path,
        request: &RecognitionRequest,
    ) -> Result<Vec<AsrSegment>>;
}

/// Recognizer implementation type
#[derive(Debug, Clone)]
pub enum RecognizerImplementation {
    WhisperCpp,
}

/// Factory for creating recognizer instances
pub struct RecognizerFactory;

impl RecognizerFactory {
    pub fn create_recognizer(
        implementation: RecognizerImplementation,
        config: RecognizerConfig,
    ) -> Box<dyn SpeechRecognizer> {
        match implementation {
            RecognizerImplementation::WhisperCpp => Box::new(WhisperCppRecognizer::new(config)),
        }
    }

    pub fn create_default(config: RecognizerConfig) -> Box<dyn SpeechRecognizer> {
        Self::create_recognizer(RecognizerImplementation::WhisperCpp, config)
    }
}
