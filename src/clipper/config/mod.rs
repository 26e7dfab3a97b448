use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::clipper::error::ClipperError;
use crate::clipper::pipeline::FailurePolicy;
use crate::clipper::render::{EncodeSettings, RenderLayout};
use crate::clipper::subtitles::AssStyle;
use crate::clipper::transcribe::WhisperOptions;
// Import macro from crate root (#[macro_export] places it there)
use crate::common::config::DocumentedConfig;
use crate::common::paths;
use crate::documented_config;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipperConfig {
    /// Nominal clip length in seconds
    pub chunk_length: f64,
    /// Drop the final clip when it is shorter than chunk_length
    pub stop_if_last_short: bool,
    pub layout: RenderLayout,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub blur: u32,
    pub frame_rate: u32,
    pub crf: u32,
    pub preset: String,
    pub audio_bitrate: String,
    pub model: String,
    pub language: String,
    pub device: String,
    pub compute_type: String,
    pub font_name: String,
    pub font_size: u32,
    pub primary_color: String,
    pub outline_color: String,
    pub back_color: String,
    pub bold: bool,
    pub border_style: u8,
    pub outline: u32,
    pub shadow: u32,
    pub alignment: u8,
    pub margin_h: u32,
    pub margin_v: u32,
    /// ASS color tokens applied round-robin to lines within each clip
    pub color_cycle: Vec<String>,
    pub keep_subtitles: bool,
    pub on_render_failure: FailurePolicy,
    /// Default input file or directory when none is given on the command line
    pub input: Option<String>,
    /// Default output directory
    pub output_dir: Option<String>,
}

impl Default for ClipperConfig {
    fn default() -> Self {
        let style = AssStyle::reels();
        let encode = EncodeSettings::default();
        let whisper = WhisperOptions::default();
        Self {
            chunk_length: Self::DEFAULT_CHUNK_LENGTH,
            stop_if_last_short: false,
            layout: encode.layout,
            canvas_width: encode.canvas_width,
            canvas_height: encode.canvas_height,
            blur: encode.blur,
            frame_rate: encode.frame_rate,
            crf: encode.crf,
            preset: encode.preset,
            audio_bitrate: encode.audio_bitrate,
            model: whisper.model,
            language: whisper.language,
            device: whisper.device,
            compute_type: whisper.compute_type,
            font_name: style.font_name,
            font_size: style.font_size,
            primary_color: style.primary_color,
            outline_color: style.outline_color,
            back_color: style.back_color,
            bold: style.bold,
            border_style: style.border_style,
            outline: style.outline,
            shadow: style.shadow,
            alignment: style.alignment,
            margin_h: style.margin_l,
            margin_v: style.margin_v,
            color_cycle: default_color_cycle(),
            keep_subtitles: false,
            on_render_failure: FailurePolicy::default(),
            input: None,
            output_dir: None,
        }
    }
}

/// Yellow, magenta, cyan, green, orange (ASS tokens are BGR).
fn default_color_cycle() -> Vec<String> {
    ["&H00FFFF&", "&HFF00FF&", "&HFFFF00&", "&H00FF00&", "&H00A5FF&"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}

impl ClipperConfig {
    pub const DEFAULT_CHUNK_LENGTH: f64 = 30.0;

    pub fn load() -> Result<Self> {
        <Self as DocumentedConfig>::load_from_path_documented(clipper_config_path()?)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        <Self as DocumentedConfig>::load_from_path_documented(path.as_ref().to_path_buf())
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating config directory {}", parent.display()))?;
        }

        let toml = toml::to_string_pretty(self).context("serializing reelclip config")?;
        fs::write(path, toml)
            .with_context(|| format!("writing reelclip config to {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ClipperError> {
        if !self.chunk_length.is_finite() || self.chunk_length <= 0.0 {
            return Err(ClipperError::InvalidConfig(format!(
                "chunk_length must be a positive number of seconds, got {}",
                self.chunk_length
            )));
        }
        if self.color_cycle.is_empty() {
            return Err(ClipperError::InvalidConfig(
                "color_cycle needs at least one color".to_string(),
            ));
        }
        if self.canvas_width == 0 || self.canvas_height == 0 {
            return Err(ClipperError::InvalidConfig(format!(
                "canvas size must be non-zero, got {}x{}",
                self.canvas_width, self.canvas_height
            )));
        }
        Ok(())
    }

    pub fn play_res(&self) -> (u32, u32) {
        (self.canvas_width, self.canvas_height)
    }

    pub fn ass_style(&self) -> AssStyle {
        AssStyle {
            font_name: self.font_name.clone(),
            font_size: self.font_size,
            primary_color: self.primary_color.clone(),
            secondary_color: self.primary_color.clone(),
            outline_color: self.outline_color.clone(),
            back_color: self.back_color.clone(),
            bold: self.bold,
            border_style: self.border_style,
            outline: self.outline,
            shadow: self.shadow,
            alignment: self.alignment,
            margin_l: self.margin_h,
            margin_r: self.margin_h,
            margin_v: self.margin_v,
            ..AssStyle::reels()
        }
    }

    pub fn encode_settings(&self) -> EncodeSettings {
        EncodeSettings {
            layout: self.layout,
            canvas_width: self.canvas_width,
            canvas_height: self.canvas_height,
            blur: self.blur,
            frame_rate: self.frame_rate,
            preset: self.preset.clone(),
            crf: self.crf,
            audio_bitrate: self.audio_bitrate.clone(),
        }
    }

    pub fn whisper_options(&self) -> WhisperOptions {
        WhisperOptions {
            model: self.model.clone(),
            language: self.language.clone(),
            device: self.device.clone(),
            compute_type: self.compute_type.clone(),
        }
    }

    pub fn output_dir(&self) -> Option<PathBuf> {
        self.output_dir
            .as_deref()
            .map(|dir| PathBuf::from(shellexpand::tilde(dir).into_owned()))
    }

    pub fn input(&self) -> Option<PathBuf> {
        self.input
            .as_deref()
            .map(|input| PathBuf::from(shellexpand::tilde(input).into_owned()))
    }
}

documented_config!(ClipperConfig {
    fields: [
        chunk_length, "Clip length in seconds",
        stop_if_last_short, "Skip the final clip when it is shorter than chunk_length",
        layout, "Vertical layout: crop or blur-fill",
        canvas_width, "Output width in pixels",
        canvas_height, "Output height in pixels",
        blur, "Background blur strength for blur-fill (12-30 typical)",
        frame_rate, "Output frame rate",
        crf, "x264 CRF (16-18 high quality, 20 good, 23 smaller)",
        preset, "x264 preset (veryfast is faster, slow is better quality)",
        audio_bitrate, "AAC audio bitrate",
        model, "WhisperX model (base is faster, small is good, medium is better)",
        language, "Spoken language code",
        device, "WhisperX device (cpu or cuda)",
        compute_type, "WhisperX compute type (int8, float16, ...)",
        font_name, "Subtitle font (must be installed)",
        font_size, "Subtitle font size in pixels",
        primary_color, "Subtitle base text color (ASS token)",
        outline_color, "Subtitle outline color (ASS token)",
        back_color, "Subtitle box/shadow color (ASS token)",
        bold, "Bold subtitles",
        border_style, "1 = outline with shadow, 3 = opaque box",
        outline, "Outline width in pixels",
        shadow, "Shadow depth in pixels",
        alignment, "Numpad alignment (2 = bottom center)",
        margin_h, "Left and right subtitle margin in pixels",
        margin_v, "Vertical subtitle margin in pixels",
        color_cycle, "Per-line subtitle colors, restarted for every clip (ASS uses BGR)",
        keep_subtitles, "Keep the generated .ass file next to each clip",
        on_render_failure, "What to do when a clip fails to render: abort or continue",
    ],
    optional: [
        input, "Default input video or directory",
        output_dir, "Default output directory",
    ],
    config_path: clipper_config_path(),
});

fn clipper_config_path() -> Result<PathBuf> {
    Ok(paths::reelclip_config_dir()?.join("reelclip.toml"))
}
