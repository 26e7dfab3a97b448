//! Per-chunk ASS subtitle generation.
//!
//! This module provides functionality to:
//! - Clip the full-video transcript to one chunk window and re-zero it
//! - Build and serialize the color-cycling ASS track for that chunk

mod ass;
mod clip;

pub use ass::{AssStyle, SubtitleTrack, format_ass_timestamp};
pub use clip::clip_segments;
