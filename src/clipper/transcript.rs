use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// One transcribed utterance, timed against the whole source media.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl TranscriptSegment {
    /// Build a segment from raw engine output.
    ///
    /// Returns `None` when the trimmed text is empty. An `end` before
    /// `start` is raised to `start`.
    pub fn new(start: f64, end: f64, text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        Some(Self {
            start,
            end: end.max(start),
            text: text.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct WhisperOutput {
    segments: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    start: f64,
    end: f64,
    #[serde(default)]
    text: String,
}

/// Parse the segment list from a WhisperX JSON transcript.
///
/// Word-level alignment data is ignored; subtitles are built per segment.
/// Segment order is kept as the engine produced it.
pub fn parse_whisper_json(json_str: &str) -> Result<Vec<TranscriptSegment>> {
    let output: WhisperOutput =
        serde_json::from_str(json_str).context("Failed to parse WhisperX JSON output")?;

    Ok(output
        .segments
        .into_iter()
        .filter_map(|segment| TranscriptSegment::new(segment.start, segment.end, &segment.text))
        .collect())
}
