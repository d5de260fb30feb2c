use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, VidError};
use crate::subtitle::{DualBandTuning, StyleSpec};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Parent directory for per-job staging directories (system temp if unset)
    pub working_dir: Option<PathBuf>,
    pub media: MediaConfig,
    pub scale: ScaleConfig,
    pub layout: LayoutConfig,
    pub reconcile: ReconcileConfig,
    pub split: SplitConfig,
    pub recognizer: RecognizerConfig,
    pub validation: ValidationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
    /// Path to ffprobe binary
    pub probe_path: String,
    /// Additional encoding options appended to every re-encode
    /// Common options: ["-preset", "medium", "-crf", "23", "-pix_fmt", "yuv420p"]
    /// - preset: encoding speed (ultrafast, fast, medium, slow, veryslow)
    /// - crf: quality (0-51, lower = better quality, 23 is default)
    /// - pix_fmt: pixel format for compatibility
    pub encode_options: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleConfig {
    /// Fractions of the source width offered as options
    pub scale_factors: Vec<f64>,
    /// Common widths offered when below the source width
    pub standard_widths: Vec<u32>,
    /// Narrowest width worth offering
    pub min_width: u32,
    /// Maximum number of options returned
    pub max_options: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Line height as a multiple of the font size
    pub line_height_multiplier: f64,
    /// Lines each band must fit without clipping
    pub lines_per_band: u32,
    /// Share of the dual-mode padding given to the top band
    pub top_band_ratio: f64,
    /// Style template for burned-in tracks
    pub base_style: StyleSpec,
    /// Limits applied when original and translation share the frame
    pub dual: DualBandTuning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Text written into reference cues no recognized segment overlaps
    pub sentinel: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Highest acceptable share of empty translated cues, in percent
    pub empty_threshold_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Nominal length of each part in seconds
    pub part_length_secs: f64,
    /// Seconds shared with the neighbouring part
    pub overlap_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerConfig {
    /// Path to the whisper.cpp CLI binary
    pub binary_path: String,
    /// Directory holding ggml model files
    pub model_dir: PathBuf,
    /// Model name, resolved to `ggml-<model>.bin`
    pub model: String,
    /// Source language hint (auto-detect when unset)
    pub language: Option<String>,
    /// Worker threads passed to the recognizer
    pub threads: u32,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            binary_path: "ffmpeg".to_string(),
            probe_path: "ffprobe".to_string(),
            encode_options: vec![
                // Example encoding options users can customize:
                // "-preset".to_string(), "medium".to_string(),
                // "-crf".to_string(), "23".to_string(),
            ],
        }
    }
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            scale_factors: vec![0.9, 0.8, 0.7, 0.6, 0.5, 0.4, 0.3],
            standard_widths: vec![1920, 1280, 1024, 854, 640, 480, 320],
            min_width: 100,
            max_options: 10,
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            line_height_multiplier: 1.2,
            lines_per_band: 2,
            top_band_ratio: 140.0 / 300.0,
            base_style: StyleSpec::default(),
            dual: DualBandTuning::default(),
        }
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            sentinel: "[No recognized text]".to_string(),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            empty_threshold_pct: 2.0,
        }
    }
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            part_length_secs: 300.0,
            overlap_secs: 2.0,
        }
    }
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            binary_path: "whisper-cli".to_string(),
            model_dir: PathBuf::from(".vidscaler/models"),
            model: "base".to_string(),
            language: None,
            threads: 4,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| VidError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| VidError::Config(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| VidError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| VidError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        let layout = &self.layout;
        if !(layout.line_height_multiplier > 0.0) {
            return Err(VidError::Config(format!(
                "layout.line_height_multiplier must be positive, got {}",
                layout.line_height_multiplier
            )));
        }
        if layout.lines_per_band == 0 {
            return Err(VidError::Config("layout.lines_per_band must be at least 1".to_string()));
        }
        if !(layout.top_band_ratio > 0.0 && layout.top_band_ratio < 1.0) {
            return Err(VidError::Config(format!(
                "layout.top_band_ratio must be between 0 and 1, got {}",
                layout.top_band_ratio
            )));
        }
        if self.scale.max_options == 0 {
            return Err(VidError::Config("scale.max_options must be at least 1".to_string()));
        }
        if !(self.split.part_length_secs > 0.0) || !(self.split.overlap_secs >= 0.0) {
            return Err(VidError::Config(format!(
                "split lengths must be positive, got part={} overlap={}",
                self.split.part_length_secs, self.split.overlap_secs
            )));
        }
        if !(0.0..=100.0).contains(&self.validation.empty_threshold_pct) {
            return Err(VidError::Config(format!(
                "validation.empty_threshold_pct must be between 0 and 100, got {}",
                self.validation.empty_threshold_pct
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[layout]\ntop_band_ratio = 0.5\n\n[split]\noverlap_secs = 5.0\n",
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.layout.top_band_ratio, 0.5);
        assert_eq!(config.layout.lines_per_band, 2);
        assert_eq!(config.split.overlap_secs, 5.0);
        assert_eq!(config.split.part_length_secs, 300.0);
        assert_eq!(config.media.binary_path, "ffmpeg");
    }

    #[test]
    fn test_validation_threshold_is_bounded() {
        let mut config = Config::default();
        assert_eq!(config.validation.empty_threshold_pct, 2.0);

        config.validation.empty_threshold_pct = 150.0;
        assert!(matches!(config.validate(), Err(VidError::Config(_))));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.reconcile.sentinel = "[---]".to_string();
        config.save_to_file(&path).unwrap();

        let reloaded = Config::from_file(&path).unwrap();
        assert_eq!(reloaded.reconcile.sentinel, "[---]");
        assert_eq!(reloaded.layout.base_style, config.layout.base_style);
    }

    #[test]
    fn test_rejects_degenerate_band_ratio() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[layout]\ntop_band_ratio = 1.0\n").unwrap();

        assert!(matches!(Config::from_file(&path), Err(VidError::Config(_))));
    }
}
