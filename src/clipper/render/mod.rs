//! Renderer collaborator: turns one chunk window plus its subtitle
//! artifact into an encoded vertical clip.

mod ffmpeg;
mod layout;

use std::path::Path;

use crate::clipper::error::ClipperError;
use crate::clipper::schedule::ChunkWindow;

pub use ffmpeg::FfmpegRenderer;
pub use layout::RenderLayout;

/// Everything the renderer needs for one chunk.
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    pub input: &'a Path,
    pub window: &'a ChunkWindow,
    /// Serialized ASS track for this chunk
    pub subtitle_path: &'a Path,
    pub output: &'a Path,
}

pub trait Renderer {
    fn render(&self, request: &RenderRequest<'_>) -> Result<(), ClipperError>;
}

/// Geometry and encoder knobs owned by the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeSettings {
    pub layout: RenderLayout,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub blur: u32,
    pub frame_rate: u32,
    pub preset: String,
    pub crf: u32,
    pub audio_bitrate: String,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            layout: RenderLayout::default(),
            canvas_width: 1080,
            canvas_height: 1920,
            blur: 20,
            frame_rate: 30,
            preset: "slow".to_string(),
            crf: 18,
            audio_bitrate: "192k".to_string(),
        }
    }
}
