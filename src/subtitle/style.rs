use serde::{Deserialize, Serialize};

/// Vertical anchor of a subtitle band, stored as the numpad code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alignment {
    TopCenter,
    BottomCenter,
}

impl Alignment {
    pub fn code(&self) -> u8 {
        match self {
            Self::BottomCenter => 2,
            Self::TopCenter => 8,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            2 => Some(Self::BottomCenter),
            8 => Some(Self::TopCenter),
            _ => None,
        }
    }
}

/// Line wrapping behaviour (`WrapStyle` in the script header)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WrapMode {
    /// Smart wrapping, upper line wider
    Smart,
    /// Only explicit `\N` breaks
    EndOfLine,
    /// No wrapping at all
    NoWrap,
    /// Smart wrapping, lower line wider
    SmartLower,
}

impl WrapMode {
    pub fn code(&self) -> u8 {
        match self {
            Self::Smart => 0,
            Self::EndOfLine => 1,
            Self::NoWrap => 2,
            Self::SmartLower => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Smart),
            1 => Some(Self::EndOfLine),
            2 => Some(Self::NoWrap),
            3 => Some(Self::SmartLower),
            _ => None,
        }
    }
}

/// Which band of a dual layout a track is rendered into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Placement {
    /// Original-language cues above the picture
    TopCenter,
    /// Translated cues below the picture
    BottomCenter,
}

impl Placement {
    pub fn alignment(&self) -> Alignment {
        match self {
            Self::TopCenter => Alignment::TopCenter,
            Self::BottomCenter => Alignment::BottomCenter,
        }
    }
}

/// Style parameters for one subtitle track, in script resolution units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleSpec {
    pub font_name: String,
    pub font_size: u32,
    pub outline: u32,
    pub shadow: u32,
    pub margin_l: u32,
    pub margin_r: u32,
    pub margin_v: u32,
    pub alignment: Alignment,
    pub wrap_mode: WrapMode,
}

impl Default for StyleSpec {
    fn default() -> Self {
        Self {
            font_name: "Arial".to_string(),
            font_size: 20,
            outline: 2,
            shadow: 0,
            margin_l: 10,
            margin_r: 10,
            margin_v: 12,
            alignment: Alignment::BottomCenter,
            wrap_mode: WrapMode::SmartLower,
        }
    }
}

/// Limits applied when two bands share the padded area
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DualBandTuning {
    pub font_size: u32,
    pub outline: u32,
    pub shadow: u32,
    pub margin_h: u32,
    pub top_margin_v: u32,
    pub bottom_margin_v: u32,
}

impl Default for DualBandTuning {
    fn default() -> Self {
        Self {
            font_size: 15,
            outline: 2,
            shadow: 0,
            margin_h: 2,
            top_margin_v: 10,
            bottom_margin_v: 12,
        }
    }
}

pub struct StyleTransformer {
    tuning: DualBandTuning,
}

impl StyleTransformer {
    pub fn new(tuning: DualBandTuning) -> Self {
        Self { tuning }
    }

    /// Style for one band of a dual layout.
    ///
    /// Font size and horizontal margins are capped, never raised, so the
    /// result is stable under repeated application.
    pub fn for_placement(&self, base: &StyleSpec, placement: Placement) -> StyleSpec {
        let margin_v = match placement {
            Placement::TopCenter => self.tuning.top_margin_v,
            Placement::BottomCenter => self.tuning.bottom_margin_v,
        };

        StyleSpec {
            font_name: base.font_name.clone(),
            font_size: base.font_size.min(self.tuning.font_size),
            outline: self.tuning.outline,
            shadow: self.tuning.shadow,
            margin_l: base.margin_l.min(self.tuning.margin_h),
            margin_r: base.margin_r.min(self.tuning.margin_h),
            margin_v,
            alignment: placement.alignment(),
            wrap_mode: base.wrap_mode,
        }
    }

    /// Style for a lone track in the bottom band
    pub fn single_band(&self, base: &StyleSpec) -> StyleSpec {
        StyleSpec {
            alignment: Alignment::BottomCenter,
            ..base.clone()
        }
    }
}
