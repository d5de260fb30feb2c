use async_trait::async_trait;
use std::path::Path;
use std::process::Command;
use tracing::{debug, info};

use super::{MediaCommand, MediaCommandBuilder, MediaProcessorTrait};
use crate::config::MediaConfig;
use crate::error::{Result, VidError};
use crate::geometry::Resolution;

/// Concrete implementation of media processor (FFmpeg-based)
pub struct MediaProcessorImpl {
    config: MediaConfig,
    command_builder: MediaCommandBuilder,
}

impl MediaProcessorImpl {
    /// Create a new media processor implementation
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.binary_path, &config.probe_path);

        Self {
            config,
            command_builder,
        }
    }
}

#[async_trait]
impl MediaProcessorTrait for MediaProcessorImpl {
    /// Check if media processor is available
    fn check_availability(&self) -> Result<()> {
        for binary in [&self.config.binary_path, &self.config.probe_path] {
            let output = Command::new(binary)
                .arg("-version")
                .output()
                .map_err(|e| VidError::Media(format!("{} not found: {}", binary, e)))?;

            if !output.status.success() {
                return Err(VidError::Media(format!("{} version check failed", binary)));
            }
        }

        info!("Media processor is available");
        Ok(())
    }

    /// Get media processor version information
    async fn version_info(&self) -> Result<String> {
        debug!("Getting media processor version information");

        let stdout = self.command_builder.version_check().execute_capture().await?;
        // The first line carries the version
        Ok(stdout.lines().next().unwrap_or("Unknown version").to_string())
    }

    async fn probe_resolution(&self, video_path: &Path) -> Result<Resolution> {
        let stdout = self
            .command_builder
            .probe_resolution(video_path)
            .execute_capture()
            .await?;

        parse_resolution_output(&stdout)
    }

    async fn probe_duration(&self, video_path: &Path) -> Result<f64> {
        let stdout = self
            .command_builder
            .probe_duration(video_path)
            .execute_capture()
            .await?;

        parse_duration_output(&stdout)
    }

    async fn run(&self, command: MediaCommand) -> Result<()> {
        info!("Executing media processing command: {}", command.description);
        command.execute().await
    }
}

/// Parse `WxH` as printed by the resolution probe
pub fn parse_resolution_output(stdout: &str) -> Result<Resolution> {
    let line = stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or_else(|| VidError::Media("Resolution probe printed nothing".to_string()))?;

    // Some containers report a trailing separator, e.g. "1920x1080x"
    Resolution::parse(line.trim_end_matches('x'))
}

pub fn parse_duration_output(stdout: &str) -> Result<f64> {
    let value = stdout.trim();
    let duration: f64 = value
        .parse()
        .map_err(|_| VidError::Media(format!("Unexpected duration probe output '{}'", value)))?;

    if !duration.is_finite() || duration < 0.0 {
        return Err(VidError::Media(format!("Invalid duration {}", duration)));
    }
    Ok(duration)
}
