//! Segment clipper.
//!
//! Restricts transcript segments, timed against the whole source video,
//! to one chunk window and shifts them so the window starts at zero.

use crate::clipper::schedule::ChunkWindow;
use crate::clipper::transcript::TranscriptSegment;

/// A transcript segment clipped to a chunk and re-zeroed to its start.
#[derive(Debug, Clone, PartialEq)]
pub struct ClippedSegment {
    /// Start offset from the chunk start, in seconds
    pub start: f64,
    /// End offset from the chunk start, in seconds
    pub end: f64,
    /// Raw transcript text; escaping happens when the track is built
    pub text: String,
}

/// Clip `segments` to `window`, preserving input order.
///
/// Segments touching the window only at a boundary are excluded, as are
/// segments whose clipped interval ends at or before the window start.
/// Overlapping source segments are passed through unmerged.
pub fn clip_segments(segments: &[TranscriptSegment], window: &ChunkWindow) -> Vec<ClippedSegment> {
    let window_start = window.start;
    let window_end = window.end();

    segments
        .iter()
        .filter_map(|segment| {
            if segment.end <= window_start || segment.start >= window_end {
                return None;
            }

            let start = segment.start.max(window_start) - window_start;
            let end = segment.end.min(window_end) - window_start;
            if end <= 0.0 {
                return None;
            }

            Some(ClippedSegment {
                start,
                end,
                text: segment.text.clone(),
            })
        })
        .collect()
}
