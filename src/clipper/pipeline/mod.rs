//! Pipeline driver: probe once, transcribe once, then clip, style and
//! render every chunk window in schedule order.

mod report;

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::clipper::config::ClipperConfig;
use crate::clipper::error::ClipperError;
use crate::clipper::render::{RenderLayout, RenderRequest, Renderer};
use crate::clipper::schedule::{ChunkSchedule, ChunkWindow, SampleSpec, ScheduleStop, plan_schedule};
use crate::clipper::subtitles::{AssStyle, SubtitleTrack, clip_segments};
use crate::clipper::support::ffmpeg::DurationProber;
use crate::clipper::support::utils::remove_if_exists;
use crate::clipper::transcribe::Transcriber;
use crate::clipper::transcript::TranscriptSegment;
use crate::ui::prelude::{Level, emit};

pub use report::{ChunkOutcome, ChunkStatus, RunReport};

/// What happens to the rest of the run when one clip fails to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Stop at the first failed clip
    #[default]
    Abort,
    /// Record the failure and keep rendering later clips
    Continue,
}

/// Run-level settings the driver needs, resolved from config and flags.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub chunk_length: f64,
    pub stop_if_last_short: bool,
    pub sample: Option<SampleSpec>,
    pub style: AssStyle,
    pub color_cycle: Vec<String>,
    pub play_res: (u32, u32),
    pub layout: RenderLayout,
    pub output_dir: PathBuf,
    pub keep_subtitles: bool,
    pub failure_policy: FailurePolicy,
}

impl PipelineOptions {
    pub fn from_config(config: &ClipperConfig, output_dir: PathBuf) -> Self {
        Self {
            chunk_length: config.chunk_length,
            stop_if_last_short: config.stop_if_last_short,
            sample: None,
            style: config.ass_style(),
            color_cycle: config.color_cycle.clone(),
            play_res: config.play_res(),
            layout: config.layout,
            output_dir,
            keep_subtitles: config.keep_subtitles,
            failure_policy: config.on_render_failure,
        }
    }

    pub fn schedule(&self, total_duration: f64) -> Result<ChunkSchedule, ClipperError> {
        plan_schedule(
            total_duration,
            self.chunk_length,
            self.stop_if_last_short,
            self.sample,
        )
    }

    /// Subtitle track for one window of the full transcript.
    pub fn build_track(&self, segments: &[TranscriptSegment], window: &ChunkWindow) -> SubtitleTrack {
        let clipped = clip_segments(segments, window);
        SubtitleTrack::build(&clipped, &self.color_cycle, &self.style, self.play_res)
    }

    pub fn subtitle_path(&self, window: &ChunkWindow) -> PathBuf {
        self.output_dir.join(format!("clip_{:03}.ass", window.index))
    }

    pub fn output_path(&self, window: &ChunkWindow) -> PathBuf {
        self.output_dir.join(self.layout.output_file_name(window.index))
    }
}

/// Probe, transcript and schedule shared by every chunk of a run.
#[derive(Debug, Clone)]
pub struct PreparedRun {
    pub input: PathBuf,
    pub duration: f64,
    pub segments: Vec<TranscriptSegment>,
    pub schedule: ChunkSchedule,
}

pub struct ClipPipeline<P: DurationProber, T: Transcriber> {
    options: PipelineOptions,
    prober: P,
    transcriber: T,
}

impl<P: DurationProber, T: Transcriber> ClipPipeline<P, T> {
    pub fn new(options: PipelineOptions, prober: P, transcriber: T) -> Self {
        Self {
            options,
            prober,
            transcriber,
        }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Probe the duration, compute the schedule and transcribe once.
    ///
    /// Every error here is fatal and happens before any chunk work.
    pub fn prepare(&self, input: &Path) -> Result<PreparedRun, ClipperError> {
        if !input.is_file() {
            return Err(ClipperError::InputNotFound {
                path: input.to_path_buf(),
            });
        }

        let duration = self.prober.probe_duration(input)?;
        emit(
            Level::Info,
            "clipper.probe.duration",
            &format!("Duration: {:.2} seconds", duration),
            Some(serde_json::json!({ "duration": duration })),
        );

        let schedule = self.options.schedule(duration)?;
        match schedule.stop {
            _ if schedule.is_empty() => emit(
                Level::Warn,
                "clipper.schedule.empty",
                &format!(
                    "Media is too short to produce a clip ({:.2}s); nothing to do",
                    duration
                ),
                None,
            ),
            ScheduleStop::ShortFinalChunk => emit(
                Level::Info,
                "clipper.schedule.short_stop",
                &format!(
                    "Last part is shorter than {}s; stopping after {} clip(s)",
                    self.options.chunk_length,
                    schedule.len()
                ),
                None,
            ),
            ScheduleStop::PastMediaEnd => emit(
                Level::Info,
                "clipper.schedule.past_end",
                &format!(
                    "Only {} of {} sampled clip(s) fit before the end of the media",
                    schedule.len(),
                    schedule.nominal_count
                ),
                Some(serde_json::json!({
                    "fitted": schedule.len(),
                    "requested": schedule.nominal_count,
                })),
            ),
            _ => {}
        }

        let segments = self.transcriber.transcribe(input)?;
        emit(
            Level::Info,
            "clipper.transcribe.segments",
            &format!("Transcript segments: {}", segments.len()),
            Some(serde_json::json!({ "segments": segments.len() })),
        );

        Ok(PreparedRun {
            input: input.to_path_buf(),
            duration,
            segments,
            schedule,
        })
    }

    /// Prepare and render every chunk.
    pub fn run<R: Renderer>(&self, input: &Path, renderer: &R) -> Result<RunReport, ClipperError> {
        let prepared = self.prepare(input)?;
        self.render_all(&prepared, renderer)
    }

    /// Render each window in schedule order.
    ///
    /// With [`FailurePolicy::Abort`] the first render failure is returned
    /// as the error. With [`FailurePolicy::Continue`] failures are kept in
    /// the report and later windows are still rendered.
    pub fn render_all<R: Renderer>(
        &self,
        prepared: &PreparedRun,
        renderer: &R,
    ) -> Result<RunReport, ClipperError> {
        let mut report = RunReport::new(prepared);
        if prepared.schedule.is_empty() {
            return Ok(report);
        }

        fs::create_dir_all(&self.options.output_dir)?;
        let total = prepared.schedule.len();

        for window in &prepared.schedule.windows {
            emit(
                Level::Info,
                "clipper.chunk.start",
                &format!(
                    "Creating clip {}/{}: {:.1}s -> {:.1}s",
                    window.index,
                    total,
                    window.start,
                    window.end()
                ),
                Some(serde_json::json!(window)),
            );

            let outcome = self.render_chunk(prepared, window, renderer);
            match outcome.status {
                ChunkStatus::Rendered => emit(
                    Level::Success,
                    "clipper.chunk.rendered",
                    &format!("Exported: {}", file_name(&outcome.output)),
                    None,
                ),
                ChunkStatus::Failed(ref reason) => emit(
                    Level::Error,
                    "clipper.chunk.failed",
                    &format!("Clip {} failed: {}", window.index, reason),
                    Some(serde_json::json!({ "index": window.index, "reason": reason })),
                ),
            }

            let failure = match &outcome.status {
                ChunkStatus::Failed(reason) => Some(ClipperError::RenderFailure {
                    index: window.index,
                    output: outcome.output.clone(),
                    reason: reason.clone(),
                }),
                ChunkStatus::Rendered => None,
            };
            report.chunks.push(outcome);

            if let Some(err) = failure {
                if self.options.failure_policy == FailurePolicy::Abort {
                    return Err(err);
                }
            }
        }

        Ok(report)
    }

    fn render_chunk<R: Renderer>(
        &self,
        prepared: &PreparedRun,
        window: &ChunkWindow,
        renderer: &R,
    ) -> ChunkOutcome {
        let track = self.options.build_track(&prepared.segments, window);
        if track.is_empty() {
            emit(
                Level::Debug,
                "clipper.chunk.no_speech",
                &format!("Clip {} has no subtitle lines", window.index),
                None,
            );
        }
        let subtitle_path = self.options.subtitle_path(window);
        let output = self.options.output_path(window);

        let result = fs::write(&subtitle_path, track.to_ass())
            .map_err(|err| format!("writing {}: {}", subtitle_path.display(), err))
            .and_then(|_| {
                renderer
                    .render(&RenderRequest {
                        input: &prepared.input,
                        window,
                        subtitle_path: &subtitle_path,
                        output: &output,
                    })
                    .map_err(|err| match err {
                        ClipperError::RenderFailure { reason, .. } => reason,
                        other => other.to_string(),
                    })
            });

        if !self.options.keep_subtitles {
            if let Err(err) = remove_if_exists(&subtitle_path) {
                emit(
                    Level::Warn,
                    "clipper.chunk.cleanup_failed",
                    &format!("{err:#}"),
                    None,
                );
            }
        }

        ChunkOutcome {
            window: *window,
            output,
            lines: track.lines.len(),
            status: match result {
                Ok(()) => ChunkStatus::Rendered,
                Err(reason) => ChunkStatus::Failed(reason),
            },
        }
    }

    /// Write every chunk's subtitle artifact without rendering.
    pub fn write_tracks(&self, prepared: &PreparedRun) -> Result<Vec<PathBuf>, ClipperError> {
        if prepared.schedule.is_empty() {
            return Ok(Vec::new());
        }
        fs::create_dir_all(&self.options.output_dir)?;

        prepared
            .schedule
            .windows
            .iter()
            .map(|window| {
                let track = self.options.build_track(&prepared.segments, window);
                let path = self.options.subtitle_path(window);
                fs::write(&path, track.to_ass())?;
                emit(
                    Level::Success,
                    "clipper.subtitles.written",
                    &format!("Wrote {} ({} lines)", path.display(), track.lines.len()),
                    None,
                );
                Ok(path)
            })
            .collect()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    struct FixedProber(Result<f64, String>);

    impl DurationProber for FixedProber {
        fn probe_duration(&self, path: &Path) -> Result<f64, ClipperError> {
            self.0.clone().map_err(|reason| ClipperError::probe(path, reason))
        }
    }

    struct FixedTranscriber {
        segments: Vec<TranscriptSegment>,
        calls: Cell<usize>,
    }

    impl FixedTranscriber {
        fn new(segments: Vec<TranscriptSegment>) -> Self {
            Self {
                segments,
                calls: Cell::new(0),
            }
        }
    }

    impl Transcriber for FixedTranscriber {
        fn transcribe(&self, _media: &Path) -> Result<Vec<TranscriptSegment>, ClipperError> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.segments.clone())
        }
    }

    /// Captures the subtitle artifact at render time; fails the listed indices.
    #[derive(Default)]
    struct CapturingRenderer {
        rendered: RefCell<Vec<(ChunkWindow, String)>>,
        fail_indices: Vec<usize>,
    }

    impl Renderer for CapturingRenderer {
        fn render(&self, request: &RenderRequest<'_>) -> Result<(), ClipperError> {
            let ass = fs::read_to_string(request.subtitle_path)?;
            self.rendered.borrow_mut().push((*request.window, ass));
            if self.fail_indices.contains(&request.window.index) {
                return Err(ClipperError::RenderFailure {
                    index: request.window.index,
                    output: request.output.to_path_buf(),
                    reason: "encoder exploded".to_string(),
                });
            }
            Ok(())
        }
    }

    fn segment(start: f64, end: f64, text: &str) -> TranscriptSegment {
        TranscriptSegment::new(start, end, text).unwrap()
    }

    fn setup(
        policy: FailurePolicy,
        keep_subtitles: bool,
    ) -> (tempfile::TempDir, PathBuf, PipelineOptions) {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("talk.mp4");
        fs::write(&input, b"video").unwrap();

        let config = ClipperConfig {
            on_render_failure: policy,
            keep_subtitles,
            ..ClipperConfig::default()
        };
        let options = PipelineOptions::from_config(&config, dir.path().join("out"));
        (dir, input, options)
    }

    fn dialogue_lines(ass: &str) -> Vec<&str> {
        ass.lines().filter(|l| l.starts_with("Dialogue:")).collect()
    }

    #[test]
    fn end_to_end_single_long_segment() {
        let (_dir, input, options) = setup(FailurePolicy::Abort, false);
        let pipeline = ClipPipeline::new(
            options.clone(),
            FixedProber(Ok(95.0)),
            FixedTranscriber::new(vec![segment(0.0, 95.0, "full speech")]),
        );
        let renderer = CapturingRenderer::default();

        let report = pipeline.run(&input, &renderer).unwrap();
        assert_eq!(report.chunks.len(), 4);
        assert_eq!(report.failed(), 0);

        let rendered = renderer.rendered.borrow();
        let lengths: Vec<_> = rendered.iter().map(|(w, _)| w.length).collect();
        assert_eq!(lengths, vec![30.0, 30.0, 30.0, 5.0]);

        let expected_ends = ["0:00:30.00", "0:00:30.00", "0:00:30.00", "0:00:05.00"];
        for ((_, ass), end) in rendered.iter().zip(expected_ends) {
            let lines = dialogue_lines(ass);
            assert_eq!(lines.len(), 1);
            assert_eq!(
                lines[0],
                format!("Dialogue: 0,0:00:00.00,{end},Default,,0,0,0,,{{\\c&H00FFFF&}}full speech")
            );
        }

        // Artifacts are temporary unless keep_subtitles is set
        for (window, _) in rendered.iter() {
            assert!(!options.subtitle_path(window).exists());
        }
        assert_eq!(
            report.chunks[3].output.file_name().unwrap(),
            "clip_004_9x16_blur_subs.mp4"
        );
    }

    #[test]
    fn color_cycle_restarts_each_chunk() {
        let (_dir, input, mut options) = setup(FailurePolicy::Abort, false);
        options.color_cycle = vec!["&H1&".into(), "&H2&".into(), "&H3&".into()];

        let segments: Vec<_> = (0..8)
            .map(|i| {
                let base = if i < 4 { 0.0 } else { 30.0 };
                let offset = (i % 4) as f64 * 5.0;
                segment(base + offset, base + offset + 4.0, &format!("line {i}"))
            })
            .collect();

        let pipeline = ClipPipeline::new(
            options,
            FixedProber(Ok(60.0)),
            FixedTranscriber::new(segments),
        );
        let renderer = CapturingRenderer::default();
        pipeline.run(&input, &renderer).unwrap();

        let rendered = renderer.rendered.borrow();
        assert_eq!(rendered.len(), 2);
        for (_, ass) in rendered.iter() {
            let colors: Vec<_> = dialogue_lines(ass)
                .iter()
                .map(|l| l.split(",,").last().unwrap()[..7].to_string())
                .collect();
            assert_eq!(colors, vec!["{\\c&H1&", "{\\c&H2&", "{\\c&H3&", "{\\c&H1&"]);
        }
    }

    #[test]
    fn probe_failure_stops_before_transcription() {
        let (_dir, input, options) = setup(FailurePolicy::Abort, false);
        let transcriber = FixedTranscriber::new(vec![]);
        let pipeline = ClipPipeline::new(
            options,
            FixedProber(Err("moov atom not found".to_string())),
            transcriber,
        );
        let renderer = CapturingRenderer::default();

        let err = pipeline.run(&input, &renderer).unwrap_err();
        assert!(matches!(err, ClipperError::ProbeFailure { .. }));
        assert!(err.to_string().contains("moov atom not found"));
        assert_eq!(pipeline.transcriber.calls.get(), 0);
        assert!(renderer.rendered.borrow().is_empty());
    }

    #[test]
    fn missing_input_is_input_not_found() {
        let (dir, _input, options) = setup(FailurePolicy::Abort, false);
        let pipeline = ClipPipeline::new(
            options,
            FixedProber(Ok(95.0)),
            FixedTranscriber::new(vec![]),
        );

        let err = pipeline
            .prepare(&dir.path().join("missing.mp4"))
            .unwrap_err();
        assert!(matches!(err, ClipperError::InputNotFound { .. }));
    }

    #[test]
    fn tiny_media_completes_with_no_clips() {
        let (_dir, input, options) = setup(FailurePolicy::Abort, false);
        let output_dir = options.output_dir.clone();
        let pipeline = ClipPipeline::new(
            options,
            FixedProber(Ok(0.15)),
            FixedTranscriber::new(vec![segment(0.0, 0.15, "hi")]),
        );
        let renderer = CapturingRenderer::default();

        let report = pipeline.run(&input, &renderer).unwrap();
        assert!(report.chunks.is_empty());
        assert_eq!(report.stop, ScheduleStop::NegligibleRemainder);
        assert!(renderer.rendered.borrow().is_empty());
        assert!(!output_dir.exists());
    }

    #[test]
    fn abort_policy_returns_first_failure() {
        let (_dir, input, options) = setup(FailurePolicy::Abort, false);
        let pipeline = ClipPipeline::new(
            options,
            FixedProber(Ok(95.0)),
            FixedTranscriber::new(vec![segment(0.0, 95.0, "speech")]),
        );
        let renderer = CapturingRenderer {
            fail_indices: vec![2],
            ..CapturingRenderer::default()
        };

        let err = pipeline.run(&input, &renderer).unwrap_err();
        match err {
            ClipperError::RenderFailure { index, reason, .. } => {
                assert_eq!(index, 2);
                assert_eq!(reason, "encoder exploded");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(renderer.rendered.borrow().len(), 2);
    }

    #[test]
    fn continue_policy_records_failures_and_keeps_going() {
        let (_dir, input, options) = setup(FailurePolicy::Continue, false);
        let pipeline = ClipPipeline::new(
            options,
            FixedProber(Ok(95.0)),
            FixedTranscriber::new(vec![segment(0.0, 95.0, "speech")]),
        );
        let renderer = CapturingRenderer {
            fail_indices: vec![2],
            ..CapturingRenderer::default()
        };

        let report = pipeline.run(&input, &renderer).unwrap();
        assert_eq!(report.chunks.len(), 4);
        assert_eq!(report.failed(), 1);
        assert_eq!(
            report.chunks[1].status,
            ChunkStatus::Failed("encoder exploded".to_string())
        );
        assert_eq!(report.chunks[3].status, ChunkStatus::Rendered);
    }

    #[test]
    fn kept_subtitles_are_identical_across_runs() {
        let (_dir, input, options) = setup(FailurePolicy::Abort, true);
        let segments = vec![
            segment(1.0, 4.0, "first {tag}"),
            segment(28.0, 33.0, "straddles"),
            segment(50.0, 52.0, "back\\slash"),
        ];
        let pipeline = ClipPipeline::new(
            options.clone(),
            FixedProber(Ok(61.0)),
            FixedTranscriber::new(segments),
        );

        let prepared = pipeline.prepare(&input).unwrap();
        let first: Vec<String> = pipeline
            .write_tracks(&prepared)
            .unwrap()
            .iter()
            .map(|p| fs::read_to_string(p).unwrap())
            .collect();

        let renderer = CapturingRenderer::default();
        pipeline.render_all(&prepared, &renderer).unwrap();
        let second: Vec<String> = renderer
            .rendered
            .borrow()
            .iter()
            .map(|(_, ass)| ass.clone())
            .collect();

        assert_eq!(first, second);
        assert!(first[0].contains("{\\c&H00FFFF&}first \\{tag\\}"));
        assert!(first[0].contains("Dialogue: 0,0:00:28.00,0:00:30.00"));
        assert!(first[1].contains("Dialogue: 0,0:00:00.00,0:00:03.00,Default,,0,0,0,,{\\c&H00FFFF&}straddles"));
        assert!(first[1].contains("{\\c&HFF00FF&}back\\\\slash"));
        assert!(options.subtitle_path(&prepared.schedule.windows[0]).exists());
    }

    #[test]
    fn sampled_schedule_is_used_when_requested() {
        let (_dir, _input, mut options) = setup(FailurePolicy::Abort, false);
        options.sample = Some(SampleSpec {
            clips: 5,
            start_offset: 5.0,
        });
        let schedule = options.schedule(300.0).unwrap();
        assert_eq!(schedule.len(), 5);
        assert_eq!(schedule.windows[1].start, 58.0);
    }

    #[test]
    fn oversized_schedule_fails_before_transcription() {
        let (_dir, input, options) = setup(FailurePolicy::Abort, false);
        let pipeline = ClipPipeline::new(
            options,
            FixedProber(Ok(1e300)),
            FixedTranscriber::new(vec![]),
        );

        let err = pipeline.prepare(&input).unwrap_err();
        assert!(matches!(err, ClipperError::InvalidConfig(_)));
        assert_eq!(pipeline.transcriber.calls.get(), 0);
    }

    #[test]
    fn invalid_sample_offset_is_rejected() {
        let (_dir, input, mut options) = setup(FailurePolicy::Abort, false);
        for offset in [-5.0, f64::NAN] {
            options.sample = Some(SampleSpec {
                clips: 2,
                start_offset: offset,
            });
            assert!(matches!(
                options.schedule(100.0),
                Err(ClipperError::InvalidConfig(_))
            ));

            let pipeline = ClipPipeline::new(
                options.clone(),
                FixedProber(Ok(100.0)),
                FixedTranscriber::new(vec![segment(0.0, 1.0, "hi")]),
            );
            let renderer = CapturingRenderer::default();
            assert!(pipeline.run(&input, &renderer).is_err());
            assert!(renderer.rendered.borrow().is_empty());
        }
    }

    #[test]
    fn sampled_run_reports_clips_past_media_end() {
        let (_dir, input, mut options) = setup(FailurePolicy::Abort, false);
        options.sample = Some(SampleSpec {
            clips: 3,
            start_offset: 5.0,
        });
        let pipeline = ClipPipeline::new(
            options,
            FixedProber(Ok(36.0)),
            FixedTranscriber::new(vec![segment(0.0, 36.0, "speech")]),
        );
        let renderer = CapturingRenderer::default();

        let report = pipeline.run(&input, &renderer).unwrap();
        assert_eq!(report.stop, ScheduleStop::PastMediaEnd);
        assert_eq!(report.chunks.len(), 2);
    }
}
