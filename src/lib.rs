//! vidscaler - video rescaling with burned-in subtitles
//!
//! Plans ffmpeg filter graphs for rescaling videos and burning single or
//! dual (original above, translation below) subtitle tracks into padded
//! bands, reconciles speech recognition output with fixed subtitle timing,
//! and splits long videos into overlapping parts.

pub mod cli;
pub mod config;
pub mod error;
pub mod filter;
pub mod geometry;
pub mod media;
pub mod quality;
pub mod reconcile;
pub mod segment;
pub mod subtitle;
pub mod timeline;
pub mod transcribe;
pub mod translate;
pub mod workflow;
