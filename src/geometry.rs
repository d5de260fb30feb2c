use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::config::ScaleConfig;
use crate::error::{Result, VidError};

/// Pixel dimensions of a video stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 {
            return Err(VidError::geometry("width", 0, "must be positive"));
        }
        if height == 0 {
            return Err(VidError::geometry("height", 0, "must be positive"));
        }
        Ok(Self { width, height })
    }

    /// Round odd dimensions down to the nearest even value.
    ///
    /// Encoders reject odd frame sizes for 4:2:0 output, so every
    /// resolution handed to a filter plan goes through here first.
    pub fn to_even(&self) -> Result<Self> {
        let width = round_down_even(self.width);
        let height = round_down_even(self.height);
        if width == 0 {
            return Err(VidError::geometry("width", self.width as i64, "no even value above zero"));
        }
        if height == 0 {
            return Err(VidError::geometry("height", self.height as i64, "no even value above zero"));
        }
        Ok(Self { width, height })
    }

    pub fn is_even(&self) -> bool {
        self.width % 2 == 0 && self.height % 2 == 0
    }

    /// Parse `WIDTHxHEIGHT`, the format ffprobe prints with `-of csv=s=x:p=0`
    pub fn parse(value: &str) -> Result<Self> {
        let (width, height) = value
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| VidError::Config(format!("Invalid resolution '{}', expected WxH", value)))?;

        let width = width
            .trim()
            .parse::<u32>()
            .map_err(|e| VidError::Config(format!("Invalid width '{}': {}", width, e)))?;
        let height = height
            .trim()
            .parse::<u32>()
            .map_err(|e| VidError::Config(format!("Invalid height '{}': {}", height, e)))?;

        Self::new(width, height)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One selectable output size, best quality first in a list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleOption {
    pub target_width: u32,
    pub target_height: u32,
    /// Percentage of the source width retained
    pub quality_rank: u32,
}

impl ScaleOption {
    pub fn resolution(&self) -> Resolution {
        Resolution {
            width: self.target_width,
            height: self.target_height,
        }
    }

    /// Rough output size relative to the source, from the pixel ratio.
    /// Smaller frames compress slightly better, hence the bonus below half.
    pub fn estimated_size_ratio(&self, source: Resolution) -> f64 {
        if self.target_width >= source.width {
            return 1.0;
        }
        let pixel_ratio = (self.target_width as f64 / source.width as f64).powi(2);
        let compression_bonus = if pixel_ratio < 0.5 { 0.9 } else { 1.0 };
        pixel_ratio * compression_bonus
    }
}

impl fmt::Display for ScaleOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} ({}%)",
            self.target_width, self.target_height, self.quality_rank
        )
    }
}

pub struct ScaleCalculator {
    config: ScaleConfig,
}

impl ScaleCalculator {
    pub fn new(config: ScaleConfig) -> Self {
        Self { config }
    }

    /// List valid target sizes for a source, widest first.
    ///
    /// The first entry is the even-corrected source itself, so "no scaling"
    /// is always a valid choice.
    pub fn options(&self, source: Resolution) -> Result<Vec<ScaleOption>> {
        let source = source.to_even()?;

        let mut widths: Vec<u32> = Vec::new();
        widths.extend(
            self.config
                .scale_factors
                .iter()
                .filter(|factor| **factor > 0.0 && **factor < 1.0)
                .map(|factor| (source.width as f64 * factor) as u32),
        );
        widths.extend(
            self.config
                .standard_widths
                .iter()
                .copied()
                .filter(|width| *width < source.width),
        );

        let mut options = vec![ScaleOption {
            target_width: source.width,
            target_height: source.height,
            quality_rank: 100,
        }];
        options.extend(widths.into_iter().filter_map(|width| self.candidate(source, width)));

        options.sort_by(|a, b| b.target_width.cmp(&a.target_width));
        options.dedup_by_key(|option| option.target_width);
        options.truncate(self.config.max_options);

        debug!("Computed {} scale options for {}", options.len(), source);
        Ok(options)
    }

    /// Resolve a single requested width against a source
    pub fn option_for_width(&self, source: Resolution, width: u32) -> Result<ScaleOption> {
        let source = source.to_even()?;
        if width > source.width {
            return Err(VidError::geometry(
                "width",
                width as i64,
                format!("exceeds source width {}", source.width),
            ));
        }
        if width < self.config.min_width {
            return Err(VidError::geometry(
                "width",
                width as i64,
                format!("below minimum width {}", self.config.min_width),
            ));
        }
        self.candidate(source, width).ok_or_else(|| {
            VidError::geometry("height", 0, format!("no valid height for width {}", width))
        })
    }

    fn candidate(&self, source: Resolution, width: u32) -> Option<ScaleOption> {
        let width = round_down_even(width);
        if width < self.config.min_width.max(2) {
            return None;
        }

        let height = (source.height as f64 * width as f64 / source.width as f64).round() as u32;
        let height = round_down_even(height);
        if height == 0 {
            return None;
        }

        let quality_rank = ((width as f64 / source.width as f64) * 100.0) as u32;
        Some(ScaleOption {
            target_width: width,
            target_height: height,
            quality_rank,
        })
    }
}

/// Decrement odd values; never rounds up past the source bounds
pub fn round_down_even(value: u32) -> u32 {
    value - (value % 2)
}
