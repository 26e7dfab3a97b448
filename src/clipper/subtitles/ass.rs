//! ASS (Advanced SubStation Alpha) track generation.
//!
//! Produces the per-chunk subtitle artifact that ffmpeg's `subtitles`
//! filter burns into each clip.

use std::fmt::Write;

use super::clip::ClippedSegment;

/// Style configuration for the single `Default` ASS style.
#[derive(Debug, Clone, PartialEq)]
pub struct AssStyle {
    /// Style name referenced by every dialogue line
    pub name: String,
    /// Font name (must be installed for libass to pick it up)
    pub font_name: String,
    /// Font size in pixels
    pub font_size: u32,
    /// Primary color token (e.g. &H00FFFFFF& for white)
    pub primary_color: String,
    /// Secondary color token
    pub secondary_color: String,
    /// Outline color token
    pub outline_color: String,
    /// Background/shadow color token
    pub back_color: String,
    /// Bold (-1 = true, 0 = false in the style line)
    pub bold: bool,
    /// 1 = outline + drop shadow, 3 = opaque box
    pub border_style: u8,
    /// Outline width in pixels
    pub outline: u32,
    /// Shadow depth in pixels
    pub shadow: u32,
    /// Alignment (numpad layout: 1-3=bottom, 4-6=mid, 7-9=top)
    pub alignment: u8,
    pub margin_l: u32,
    pub margin_r: u32,
    /// Distance from the bottom edge for bottom-aligned text
    pub margin_v: u32,
}

impl Default for AssStyle {
    fn default() -> Self {
        Self::reels()
    }
}

impl AssStyle {
    /// Bold white text on an opaque box, sized for a 1080x1920 canvas.
    pub fn reels() -> Self {
        Self {
            name: "Default".to_string(),
            font_name: "Arial".to_string(),
            font_size: 68,
            primary_color: "&H00FFFFFF&".to_string(),
            secondary_color: "&H00FFFFFF&".to_string(),
            outline_color: "&H00000000&".to_string(),
            back_color: "&H64000000&".to_string(),
            bold: true,
            border_style: 3,
            outline: 6,
            shadow: 2,
            alignment: 2, // Bottom-center
            margin_l: 70,
            margin_r: 70,
            margin_v: 140,
        }
    }

    /// Format the style line for the ASS file.
    fn to_style_line(&self) -> String {
        let bold_val = if self.bold { -1 } else { 0 };
        format!(
            "Style: {name},{font},{size},{primary},{secondary},{outline},{back},{bold},0,0,0,100,100,0,0,{border},{outline_w},{shadow},{align},{ml},{mr},{mv},1",
            name = self.name,
            font = self.font_name,
            size = self.font_size,
            primary = self.primary_color,
            secondary = self.secondary_color,
            outline = self.outline_color,
            back = self.back_color,
            bold = bold_val,
            border = self.border_style,
            outline_w = self.outline,
            shadow = self.shadow,
            align = self.alignment,
            ml = self.margin_l,
            mr = self.margin_r,
            mv = self.margin_v,
        )
    }
}

/// One dialogue line of a chunk's track, already relative to the chunk start.
#[derive(Debug, Clone, PartialEq)]
pub struct StyledLine {
    pub relative_start: f64,
    pub relative_end: f64,
    /// Escaped text, without the color override prefix
    pub text: String,
    /// Position in the color cycle, restarted for every chunk
    pub color_index: usize,
    pub color: String,
}

/// The subtitle description for one chunk.
#[derive(Debug, Clone)]
pub struct SubtitleTrack {
    pub play_res: (u32, u32),
    pub style: AssStyle,
    pub lines: Vec<StyledLine>,
}

impl SubtitleTrack {
    /// Build a track from the clipped segments of one chunk.
    ///
    /// Colors are assigned by position within `clipped`, so the first
    /// line of every chunk starts at `color_cycle[0]`. An empty
    /// `clipped` slice yields a header-only track.
    pub fn build(
        clipped: &[ClippedSegment],
        color_cycle: &[String],
        style: &AssStyle,
        play_res: (u32, u32),
    ) -> Self {
        let lines = clipped
            .iter()
            .enumerate()
            .map(|(count, segment)| {
                let color_index = if color_cycle.is_empty() {
                    0
                } else {
                    count % color_cycle.len()
                };
                StyledLine {
                    relative_start: segment.start,
                    relative_end: segment.end,
                    text: escape_ass_text(&segment.text),
                    color_index,
                    color: color_cycle
                        .get(color_index)
                        .cloned()
                        .unwrap_or_default(),
                }
            })
            .collect();

        Self {
            play_res,
            style: style.clone(),
            lines,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Serialize the track to ASS file content.
    pub fn to_ass(&self) -> String {
        let mut output = String::new();

        writeln!(output, "[Script Info]").unwrap();
        writeln!(output, "ScriptType: v4.00+").unwrap();
        writeln!(output, "PlayResX: {}", self.play_res.0).unwrap();
        writeln!(output, "PlayResY: {}", self.play_res.1).unwrap();
        writeln!(output, "ScaledBorderAndShadow: yes").unwrap();
        writeln!(output).unwrap();

        writeln!(output, "[V4+ Styles]").unwrap();
        writeln!(
            output,
            "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding"
        )
        .unwrap();
        writeln!(output, "{}", self.style.to_style_line()).unwrap();
        writeln!(output).unwrap();

        writeln!(output, "[Events]").unwrap();
        writeln!(
            output,
            "Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text"
        )
        .unwrap();

        for line in &self.lines {
            writeln!(
                output,
                "Dialogue: 0,{start},{end},{style},,0,0,0,,{{\\c{color}}}{text}",
                start = format_ass_timestamp(line.relative_start),
                end = format_ass_timestamp(line.relative_end),
                style = self.style.name,
                color = line.color,
                text = line.text
            )
            .unwrap();
        }

        output
    }
}

/// Format seconds as an ASS timestamp (H:MM:SS.cc).
///
/// Rounds to centiseconds once and derives every field from that value.
/// Callers must pass a non-negative offset.
pub fn format_ass_timestamp(seconds: f64) -> String {
    debug_assert!(seconds >= 0.0, "negative subtitle timestamp {seconds}");
    let total_cs = (seconds * 100.0).round().max(0.0) as u64;
    let hours = total_cs / 360_000;
    let minutes = (total_cs / 6_000) % 60;
    let secs = (total_cs / 100) % 60;
    let centiseconds = total_cs % 100;

    format!("{hours}:{minutes:02}:{secs:02}.{centiseconds:02}")
}

/// Escape transcript text for a dialogue line.
///
/// Backslashes go first so the ones added in front of braces stay single.
pub fn escape_ass_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('{', "\\{")
        .replace('}', "\\}")
        .replace('\n', " ")
        .trim()
        .to_string()
}
