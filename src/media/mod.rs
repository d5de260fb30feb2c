// Media processing layer
//
// - commands: encoder and probe invocations built from filter plans and time windows
// - processor: ffmpeg/ffprobe backed implementation of MediaProcessorTrait
// - staging: scoped staging of filter artifacts in a job working directory

pub mod commands;
pub mod processor;
pub mod staging;

use async_trait::async_trait;
use std::path::Path;

pub use commands::*;
pub use processor::*;
pub use staging::StagedManifest;

use crate::config::MediaConfig;
use crate::error::Result;
use crate::geometry::Resolution;

/// Main trait for media processing operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaProcessorTrait: Send + Sync {
    /// Check that the encoder and probe binaries can be launched
    fn check_availability(&self) -> Result<()>;

    /// Get media processor version information
    async fn version_info(&self) -> Result<String>;

    /// Pixel size of the first video stream
    async fn probe_resolution(&self, video_path: &Path) -> Result<Resolution>;

    /// Duration in seconds
    async fn probe_duration(&self, video_path: &Path) -> Result<f64>;

    /// Execute a prepared media processing command
    async fn run(&self, command: MediaCommand) -> Result<()>;
}

/// Factory for creating media processor instances
pub struct MediaProcessorFactory;

impl MediaProcessorFactory {
    /// Create the default media processor implementation (FFmpeg-based)
    pub fn create_processor(config: MediaConfig) -> Box<dyn MediaProcessorTrait> {
        Box::new(processor::MediaProcessorImpl::new(config))
    }
}
