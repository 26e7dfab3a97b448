use std::path::Path;

use serde::{Deserialize, Serialize};

/// How the source frame is fitted into the vertical canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RenderLayout {
    /// Scale to canvas height and center-crop the width
    Crop,
    /// Blurred, cropped copy as background with the full frame fitted on top
    #[default]
    BlurFill,
}

impl RenderLayout {
    /// Output file name for the 1-based clip `index`.
    pub fn output_file_name(&self, index: usize) -> String {
        match self {
            RenderLayout::Crop => format!("clip_{index:03}_9x16_subs.mp4"),
            RenderLayout::BlurFill => format!("clip_{index:03}_9x16_blur_subs.mp4"),
        }
    }

    /// ffmpeg flag that carries the graph built by [`RenderLayout::filter_graph`].
    pub fn filter_flag(&self) -> &'static str {
        match self {
            RenderLayout::Crop => "-vf",
            RenderLayout::BlurFill => "-filter_complex",
        }
    }

    /// Build the filter graph that fits the frame and burns in `subtitle_path`.
    pub fn filter_graph(&self, canvas: (u32, u32), blur: u32, subtitle_path: &Path) -> String {
        let (width, height) = canvas;
        let subtitles = format!("subtitles='{}'", escape_ffmpeg_path(subtitle_path));

        match self {
            RenderLayout::Crop => format!(
                "scale=-2:{height}:flags=lanczos,crop={width}:{height},{subtitles}"
            ),
            RenderLayout::BlurFill => format!(
                "[0:v]scale={width}:{height}:force_original_aspect_ratio=increase,boxblur={blur}:1,crop={width}:{height}[bg];\
[0:v]scale={width}:{height}:force_original_aspect_ratio=decrease[fg];\
[bg][fg]overlay=(W-w)/2:(H-h)/2,{subtitles}"
            ),
        }
    }
}

impl std::fmt::Display for RenderLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderLayout::Crop => write!(f, "crop"),
            RenderLayout::BlurFill => write!(f, "blur-fill"),
        }
    }
}

/// Escape a path for use inside a quoted ffmpeg filter argument.
pub fn escape_ffmpeg_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "/")
        .replace('\'', "'\\''")
        .replace(':', "\\:")
}
