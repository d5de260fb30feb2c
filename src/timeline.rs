use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, VidError};

/// A point in media time with millisecond precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    pub fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Negative and non-finite inputs clamp to zero
    pub fn from_secs_f64(seconds: f64) -> Self {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Self::ZERO;
        }
        Self((seconds * 1000.0).round() as u64)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / 1000.0
    }

    pub fn saturating_sub(self, other: Timestamp) -> Timestamp {
        Timestamp(self.0.saturating_sub(other.0))
    }

    pub fn saturating_add(self, other: Timestamp) -> Timestamp {
        Timestamp(self.0.saturating_add(other.0))
    }

    /// Format as `HH:MM:SS,mmm`
    pub fn to_srt(&self) -> String {
        let hours = self.0 / 3_600_000;
        let minutes = (self.0 % 3_600_000) / 60_000;
        let secs = (self.0 % 60_000) / 1_000;
        let millis = self.0 % 1_000;

        format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
    }

    /// Format as `H:MM:SS.cc`, truncating to centiseconds
    pub fn to_ass(&self) -> String {
        let hours = self.0 / 3_600_000;
        let minutes = (self.0 % 3_600_000) / 60_000;
        let secs = (self.0 % 60_000) / 1_000;
        let centis = (self.0 % 1_000) / 10;

        format!("{}:{:02}:{:02}.{:02}", hours, minutes, secs, centis)
    }

    /// Parse `HH:MM:SS,mmm` (a `.` separator is accepted too)
    pub fn parse_srt(value: &str) -> Option<Self> {
        let value = value.trim();
        let (clock, millis) = value.split_once([',', '.'])?;
        let mut parts = clock.split(':');
        let hours: u64 = parts.next()?.trim().parse().ok()?;
        let minutes: u64 = parts.next()?.trim().parse().ok()?;
        let secs: u64 = parts.next()?.trim().parse().ok()?;
        if parts.next().is_some() || minutes >= 60 || secs >= 60 {
            return None;
        }
        if millis.is_empty() || millis.len() > 3 || !millis.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        // "5" after the separator means 500 ms
        let millis: u64 = format!("{:0<3}", millis).parse().ok()?;

        Some(Self(hours * 3_600_000 + minutes * 60_000 + secs * 1_000 + millis))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.as_secs_f64())
    }
}

/// Half-open interval of media time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl TimeWindow {
    pub fn new(start: Timestamp, end: Timestamp) -> Result<Self> {
        if start >= end {
            return Err(VidError::InvalidSplit(format!(
                "window start {} must precede end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn from_secs(start: f64, end: f64) -> Result<Self> {
        Self::new(Timestamp::from_secs_f64(start), Timestamp::from_secs_f64(end))
    }

    pub fn duration(&self) -> Timestamp {
        self.end.saturating_sub(self.start)
    }

    /// Two windows overlap iff `max(a.start, b.start) < min(a.end, b.end)`
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start.max(other.start) < self.end.min(other.end)
    }
}
