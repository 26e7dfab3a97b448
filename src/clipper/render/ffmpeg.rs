use std::io::{BufReader, Read};
use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};

use super::{EncodeSettings, RenderRequest, Renderer};
use crate::clipper::error::ClipperError;

pub trait FfmpegRunner {
    fn run(&self, args: &[String], options: FfmpegRunOptions) -> Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemFfmpegRunner;

#[derive(Debug, Clone, Default)]
pub struct FfmpegRunOptions {
    pub total_duration: Option<f64>,
    pub verbose: bool,
    pub label: String,
}

impl FfmpegRunOptions {
    pub fn new(total_duration: Option<f64>, verbose: bool, label: impl Into<String>) -> Self {
        Self {
            total_duration,
            verbose,
            label: label.into(),
        }
    }
}

impl FfmpegRunner for SystemFfmpegRunner {
    fn run(&self, args: &[String], options: FfmpegRunOptions) -> Result<()> {
        let mut child = Command::new("ffmpeg")
            .args(args)
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| "Failed to spawn ffmpeg")?;

        let stderr = child
            .stderr
            .take()
            .context("ffmpeg stderr was not captured")?;

        let pb = match options.total_duration {
            Some(duration) if !options.verbose => Some(progress_bar(duration, &options.label)?),
            _ => None,
        };

        let mut log = StderrLog::default();
        let result = log.consume(stderr, options.verbose, pb.as_ref());

        let status = child.wait().context("Failed to wait for ffmpeg")?;
        result?;

        if let Some(pb) = pb {
            if status.success() {
                pb.finish_with_message("done");
            } else {
                pb.abandon_with_message("failed");
            }
        }

        if !status.success() {
            bail!(
                "ffmpeg exited with status {:?}: {}",
                status.code(),
                log.failure_reason()
            );
        }

        Ok(())
    }
}

fn progress_bar(duration: f64, label: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new((duration * 1000.0) as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{prefix} {spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent:>3}% {msg}")
            .context("Invalid progress bar template")?
            .progress_chars("█▉▊▋▌▍▎▏ "),
    );
    pb.set_prefix(label.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb.set_message("rendering");
    Ok(pb)
}

/// What a finished ffmpeg run left on stderr.
#[derive(Debug, Default)]
struct StderrLog {
    last_line: String,
    errors: Vec<String>,
}

impl StderrLog {
    /// Read stderr to the end. ffmpeg redraws its status line with `\r`,
    /// so both `\r` and `\n` end a line.
    fn consume<R: Read>(
        &mut self,
        stderr: R,
        verbose: bool,
        pb: Option<&ProgressBar>,
    ) -> Result<()> {
        let mut line = Vec::new();
        for byte in BufReader::new(stderr).bytes() {
            let byte = byte.context("Failed to read ffmpeg stderr")?;
            if byte == b'\r' || byte == b'\n' {
                self.observe(&String::from_utf8_lossy(&line), verbose, pb);
                line.clear();
            } else {
                line.push(byte);
            }
        }
        self.observe(&String::from_utf8_lossy(&line), verbose, pb);
        Ok(())
    }

    fn observe(&mut self, line: &str, verbose: bool, pb: Option<&ProgressBar>) {
        if line.is_empty() {
            return;
        }
        if verbose {
            eprintln!("{line}");
        }
        if line.to_ascii_lowercase().contains("error") {
            self.errors.push(line.to_string());
        }
        if let (Some(pb), Some(seconds)) = (pb, parse_ffmpeg_progress(line)) {
            pb.set_position((seconds * 1000.0) as u64);
            if let Some(speed) = parse_ffmpeg_speed(line) {
                pb.set_message(speed);
            }
        }
        self.last_line = line.to_string();
    }

    /// Error lines if any were seen, otherwise the final line.
    fn failure_reason(&self) -> String {
        if self.errors.is_empty() {
            self.last_line.trim().to_string()
        } else {
            self.errors.join("\n")
        }
    }
}

/// Elapsed output time from a status line such as `... time=00:01:02.50 ...`.
fn parse_ffmpeg_progress(line: &str) -> Option<f64> {
    line.split_whitespace()
        .find_map(|field| field.strip_prefix("time="))
        .and_then(clock_to_seconds)
}

/// `HH:MM:SS.cc` to seconds.
fn clock_to_seconds(clock: &str) -> Option<f64> {
    let mut fields = 0;
    let seconds = clock.split(':').try_fold(0.0, |acc, field| {
        fields += 1;
        field.parse::<f64>().ok().map(|value| acc * 60.0 + value)
    })?;
    (fields == 3).then_some(seconds)
}

fn parse_ffmpeg_speed(line: &str) -> Option<String> {
    let (_, rest) = line.split_once("speed=")?;
    let (value, _) = rest.trim_start().split_once('x')?;
    Some(format!("{value}x"))
}

/// Renders chunks by invoking ffmpeg once per window.
pub struct FfmpegRenderer<R: FfmpegRunner = SystemFfmpegRunner> {
    settings: EncodeSettings,
    runner: R,
    verbose: bool,
}

impl FfmpegRenderer<SystemFfmpegRunner> {
    pub fn new(settings: EncodeSettings, verbose: bool) -> Self {
        Self::with_runner(settings, SystemFfmpegRunner, verbose)
    }
}

impl<R: FfmpegRunner> FfmpegRenderer<R> {
    pub fn with_runner(settings: EncodeSettings, runner: R, verbose: bool) -> Self {
        Self {
            settings,
            runner,
            verbose,
        }
    }

    /// Full ffmpeg argument list for one chunk.
    pub fn build_args(&self, request: &RenderRequest<'_>) -> Vec<String> {
        let settings = &self.settings;
        let graph = settings.layout.filter_graph(
            (settings.canvas_width, settings.canvas_height),
            settings.blur,
            request.subtitle_path,
        );

        vec![
            "-y".to_string(),
            "-ss".to_string(),
            format!("{:.3}", request.window.start),
            "-t".to_string(),
            format!("{:.3}", request.window.length),
            "-i".to_string(),
            request.input.to_string_lossy().into_owned(),
            settings.layout.filter_flag().to_string(),
            graph,
            "-r".to_string(),
            settings.frame_rate.to_string(),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            settings.preset.clone(),
            "-crf".to_string(),
            settings.crf.to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            settings.audio_bitrate.clone(),
            request.output.to_string_lossy().into_owned(),
        ]
    }
}

impl<R: FfmpegRunner> Renderer for FfmpegRenderer<R> {
    fn render(&self, request: &RenderRequest<'_>) -> Result<(), ClipperError> {
        let args = self.build_args(request);
        let options = FfmpegRunOptions::new(
            Some(request.window.length),
            self.verbose,
            format!("clip {:03}", request.window.index),
        );

        self.runner
            .run(&args, options)
            .map_err(|err| ClipperError::RenderFailure {
                index: request.window.index,
                output: request.output.to_path_buf(),
                reason: format!("{err:#}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipper::render::RenderLayout;
    use crate::clipper::schedule::ChunkWindow;
    use std::cell::RefCell;
    use std::path::PathBuf;

    #[derive(Default)]
    struct RecordingRunner {
        calls: RefCell<Vec<(Vec<String>, Option<f64>)>>,
        fail_with: Option<String>,
    }

    impl FfmpegRunner for RecordingRunner {
        fn run(&self, args: &[String], options: FfmpegRunOptions) -> Result<()> {
            self.calls
                .borrow_mut()
                .push((args.to_vec(), options.total_duration));
            match &self.fail_with {
                Some(msg) => bail!("{}", msg),
                None => Ok(()),
            }
        }
    }

    fn request_parts() -> (PathBuf, ChunkWindow, PathBuf, PathBuf) {
        let window = ChunkWindow {
            index: 4,
            start: 90.0,
            length: 5.0,
        };
        (
            PathBuf::from("/media/talk.mp4"),
            window,
            PathBuf::from("/out/clip_004.ass"),
            PathBuf::from("/out/clip_004_9x16_subs.mp4"),
        )
    }

    #[test]
    fn args_cover_window_filter_and_encoder() {
        let settings = EncodeSettings {
            layout: RenderLayout::Crop,
            ..EncodeSettings::default()
        };
        let renderer = FfmpegRenderer::with_runner(settings, RecordingRunner::default(), false);
        let (input, window, subs, output) = request_parts();
        let request = RenderRequest {
            input: &input,
            window: &window,
            subtitle_path: &subs,
            output: &output,
        };

        let args = renderer.build_args(&request);
        let joined = args.join(" ");
        assert!(joined.starts_with("-y -ss 90.000 -t 5.000 -i /media/talk.mp4 -vf scale=-2:1920"));
        assert!(joined.contains("subtitles='/out/clip_004.ass'"));
        assert!(joined.contains("-r 30 -c:v libx264 -preset slow -crf 18 -pix_fmt yuv420p"));
        assert!(joined.contains("-c:a aac -b:a 192k"));
        assert_eq!(args.last().unwrap(), "/out/clip_004_9x16_subs.mp4");
    }

    #[test]
    fn blur_fill_uses_filter_complex() {
        let renderer =
            FfmpegRenderer::with_runner(EncodeSettings::default(), RecordingRunner::default(), false);
        let (input, window, subs, output) = request_parts();
        let request = RenderRequest {
            input: &input,
            window: &window,
            subtitle_path: &subs,
            output: &output,
        };

        let args = renderer.build_args(&request);
        let flag = args.iter().position(|a| a == "-filter_complex").unwrap();
        assert!(args[flag + 1].contains("boxblur=20:1"));
    }

    #[test]
    fn runner_failure_becomes_render_failure_with_index() {
        let runner = RecordingRunner {
            fail_with: Some("ffmpeg exited with status Some(1): Invalid argument".to_string()),
            ..RecordingRunner::default()
        };
        let renderer = FfmpegRenderer::with_runner(EncodeSettings::default(), runner, false);
        let (input, window, subs, output) = request_parts();
        let request = RenderRequest {
            input: &input,
            window: &window,
            subtitle_path: &subs,
            output: &output,
        };

        let err = renderer.render(&request).unwrap_err();
        match err {
            ClipperError::RenderFailure { index, reason, .. } => {
                assert_eq!(index, 4);
                assert!(reason.contains("Invalid argument"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(renderer.runner.calls.borrow()[0].1, Some(5.0));
    }

    #[test]
    fn stderr_log_collects_errors_and_last_line() {
        let stderr = b"frame=1 time=00:00:01.50 bitrate=1k speed=2.0x\rError opening filters\r\nlast line";
        let mut log = StderrLog::default();
        log.consume(&stderr[..], false, None).unwrap();

        assert_eq!(log.errors, vec!["Error opening filters".to_string()]);
        assert_eq!(log.last_line, "last line");
        assert_eq!(log.failure_reason(), "Error opening filters");
    }

    #[test]
    fn failure_reason_falls_back_to_last_line() {
        let mut log = StderrLog::default();
        log.consume(&b"Conversion failed!  \n"[..], false, None).unwrap();
        assert_eq!(log.failure_reason(), "Conversion failed!");
    }

    #[test]
    fn parses_progress_fields() {
        let line = "frame=  45 fps=0.0 q=28.0 size=256kB time=00:01:02.50 bitrate=33.5kbits/s speed= 1.25x";
        assert_eq!(parse_ffmpeg_progress(line), Some(62.5));
        assert_eq!(parse_ffmpeg_speed(line), Some("1.25x".to_string()));
        assert_eq!(parse_ffmpeg_progress("frame=1 time=N/A speed=N/A"), None);
        assert_eq!(parse_ffmpeg_progress("Stream mapping:"), None);
    }

    #[test]
    fn clock_folds_hours_and_minutes() {
        assert_eq!(clock_to_seconds("01:02:03.5"), Some(3723.5));
        assert_eq!(clock_to_seconds("00:00:00.00"), Some(0.0));
        assert_eq!(clock_to_seconds("02:03.5"), None);
        assert_eq!(clock_to_seconds("1:2:3:4"), None);
        assert_eq!(clock_to_seconds("bad"), None);
    }
}
