use anyhow::{Context, Result, bail};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use std::path::{Path, PathBuf};

use super::cli::{
    ClipperCommands, ConfigCommands, PlanArgs, RunArgs, ScheduleArgs, SourceArgs, SubtitlesArgs,
};
use super::config::ClipperConfig;
use super::pipeline::{ClipPipeline, PipelineOptions};
use super::render::FfmpegRenderer;
use super::schedule::{ChunkSchedule, SampleSpec};
use super::subtitles::format_ass_timestamp;
use super::support::ffmpeg::{DurationProber, FfprobeDurationProber, ensure_tools};
use super::support::utils::resolve_input_video;
use super::transcribe::{JsonFileTranscriber, Transcriber, WhisperxTranscriber};
use crate::common::config::DocumentedConfig;
use crate::common::paths;
use crate::ui::prelude::{Level, OutputFormat, emit, get_output_format};

pub fn handle_clipper_command(command: ClipperCommands, _debug: bool) -> Result<()> {
    match command {
        ClipperCommands::Run(args) => handle_run(args),
        ClipperCommands::Subtitles(args) => handle_subtitles(args),
        ClipperCommands::Plan(args) => handle_plan(args),
        ClipperCommands::Config(command) => handle_config(command),
    }
}

fn handle_run(args: RunArgs) -> Result<()> {
    let mut config = load_config(&args.source)?;
    if let Some(layout) = args.layout {
        config.layout = layout;
    }
    if args.keep_subtitles {
        config.keep_subtitles = true;
    }
    if let Some(policy) = args.on_failure {
        config.on_render_failure = policy;
    }
    config.validate()?;

    ensure_tools()?;
    let input = resolve_source_input(&args.source, &config)?;
    let pipeline = build_pipeline(&args.source, &config, &input)?;
    let renderer = FfmpegRenderer::new(config.encode_settings(), args.verbose);

    emit(
        Level::Info,
        "clipper.run.start",
        &format!("Input: {}", input.display()),
        Some(serde_json::json!({
            "input": input,
            "output_dir": pipeline.options().output_dir,
        })),
    );

    let report = pipeline.run(&input, &renderer)?;
    report.emit();

    if matches!(get_output_format(), OutputFormat::Json) {
        emit(
            Level::Info,
            "clipper.run.report",
            "Run report",
            Some(serde_json::to_value(&report).context("serializing run report")?),
        );
    }

    if report.failed() > 0 {
        bail!(
            "{} of {} clip(s) failed to render",
            report.failed(),
            report.chunks.len()
        );
    }
    Ok(())
}

fn handle_subtitles(args: SubtitlesArgs) -> Result<()> {
    let config = load_config(&args.source)?;
    config.validate()?;

    ensure_tools()?;
    let input = resolve_source_input(&args.source, &config)?;
    let pipeline = build_pipeline(&args.source, &config, &input)?;

    let prepared = pipeline.prepare(&input)?;
    let written = pipeline.write_tracks(&prepared)?;

    emit(
        Level::Success,
        "clipper.subtitles.done",
        &format!(
            "Wrote {} subtitle file(s) to {}",
            written.len(),
            pipeline.options().output_dir.display()
        ),
        Some(serde_json::json!({ "files": written })),
    );
    Ok(())
}

fn handle_plan(args: PlanArgs) -> Result<()> {
    let mut config = ClipperConfig::load()?;
    apply_schedule_args(&mut config, &args.schedule);
    config.validate()?;

    let duration = match (args.duration, &args.input) {
        (Some(duration), _) => duration,
        (None, Some(input)) => {
            let input = resolve_input_video(input)?;
            FfprobeDurationProber.probe_duration(&input)?
        }
        (None, None) => bail!("Pass either --duration <SECONDS> or --input <FILE>"),
    };

    let mut options = PipelineOptions::from_config(&config, PathBuf::new());
    options.sample = sample_spec(&args.schedule);
    let schedule = options.schedule(duration)?;

    match get_output_format() {
        OutputFormat::Json => {
            for window in &schedule.windows {
                emit(
                    Level::Info,
                    "clipper.plan.window",
                    &format!("Clip {}: {:.3}s +{:.3}s", window.index, window.start, window.length),
                    Some(serde_json::json!(window)),
                );
            }
            emit(
                Level::Info,
                "clipper.plan.summary",
                &format!("{} clip(s) planned", schedule.len()),
                Some(serde_json::json!({
                    "duration": duration,
                    "chunk_length": config.chunk_length,
                    "nominal_count": schedule.nominal_count,
                    "stop": schedule.stop,
                    "clips": schedule.len(),
                })),
            );
        }
        OutputFormat::Text => {
            if schedule.is_empty() {
                emit(
                    Level::Warn,
                    "clipper.plan.empty",
                    &format!("No clips fit in {:.2} seconds", duration),
                    None,
                );
                return Ok(());
            }
            println!("{}", plan_table(&schedule));
            emit(
                Level::Info,
                "clipper.plan.summary",
                &format!(
                    "{} clip(s) covering {:.2}s of {:.2}s",
                    schedule.len(),
                    schedule.covered_duration(),
                    duration
                ),
                None,
            );
        }
    }

    Ok(())
}

fn plan_table(schedule: &ChunkSchedule) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Clip", "Start", "End", "Length (s)"]);

    for window in &schedule.windows {
        table.add_row(vec![
            Cell::new(format!("{:03}", window.index)),
            Cell::new(format_ass_timestamp(window.start)),
            Cell::new(format_ass_timestamp(window.end())),
            Cell::new(format!("{:.2}", window.length)).set_alignment(CellAlignment::Right),
        ]);
    }

    table
}

fn handle_config(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Path => {
            let path = ClipperConfig::config_path()?;
            emit(
                Level::Info,
                "clipper.config.path",
                &path.display().to_string(),
                Some(serde_json::json!({ "path": path })),
            );
        }
        ConfigCommands::Show => {
            let config = ClipperConfig::load()?;
            match get_output_format() {
                OutputFormat::Json => emit(
                    Level::Info,
                    "clipper.config.show",
                    "Effective configuration",
                    Some(serde_json::to_value(&config).context("serializing config")?),
                ),
                OutputFormat::Text => print!("{}", config.to_documented_toml()),
            }
        }
    }
    Ok(())
}

fn load_config(source: &SourceArgs) -> Result<ClipperConfig> {
    let mut config = ClipperConfig::load()?;
    apply_schedule_args(&mut config, &source.schedule);
    if let Some(model) = &source.model {
        config.model = model.clone();
    }
    if let Some(language) = &source.language {
        config.language = language.clone();
    }
    Ok(config)
}

fn apply_schedule_args(config: &mut ClipperConfig, args: &ScheduleArgs) {
    if let Some(chunk_length) = args.chunk_length {
        config.chunk_length = chunk_length;
    }
    if args.stop_if_last_short {
        config.stop_if_last_short = true;
    }
}

fn sample_spec(args: &ScheduleArgs) -> Option<SampleSpec> {
    args.sample.map(|clips| SampleSpec {
        clips,
        start_offset: args.offset,
    })
}

fn resolve_source_input(source: &SourceArgs, config: &ClipperConfig) -> Result<PathBuf> {
    let requested = source
        .input
        .clone()
        .or_else(|| config.input())
        .context("No input given; pass a video path or set `input` in the config")?;
    Ok(resolve_input_video(&requested)?)
}

fn output_dir_for(source: &SourceArgs, config: &ClipperConfig, input: &Path) -> PathBuf {
    source
        .out_dir
        .clone()
        .or_else(|| config.output_dir())
        .unwrap_or_else(|| {
            input
                .parent()
                .map(|parent| parent.join("clips"))
                .unwrap_or_else(|| PathBuf::from("clips"))
        })
}

fn build_pipeline(
    source: &SourceArgs,
    config: &ClipperConfig,
    input: &Path,
) -> Result<ClipPipeline<FfprobeDurationProber, Box<dyn Transcriber>>> {
    let transcriber: Box<dyn Transcriber> = match &source.transcript {
        Some(path) => Box::new(JsonFileTranscriber::new(path.clone())),
        None => Box::new(WhisperxTranscriber::new(
            config.whisper_options(),
            paths::transcript_cache_dir()?,
            source.force_transcribe,
        )),
    };

    let mut options = PipelineOptions::from_config(config, output_dir_for(source, config, input));
    options.sample = sample_spec(&source.schedule);

    Ok(ClipPipeline::new(options, FfprobeDurationProber, transcriber))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipper::schedule::schedule_chunks;

    fn source(input: Option<&str>, out_dir: Option<&str>) -> SourceArgs {
        SourceArgs {
            input: input.map(PathBuf::from),
            out_dir: out_dir.map(PathBuf::from),
            transcript: None,
            force_transcribe: false,
            model: None,
            language: None,
            schedule: ScheduleArgs::default(),
        }
    }

    #[test]
    fn output_dir_prefers_flag_then_config_then_input_sibling() {
        let config = ClipperConfig::default();
        let input = Path::new("/videos/talk.mp4");

        assert_eq!(
            output_dir_for(&source(None, Some("/tmp/out")), &config, input),
            PathBuf::from("/tmp/out")
        );
        assert_eq!(
            output_dir_for(&source(None, None), &config, input),
            PathBuf::from("/videos/clips")
        );

        let config = ClipperConfig {
            output_dir: Some("/srv/reels".to_string()),
            ..ClipperConfig::default()
        };
        assert_eq!(
            output_dir_for(&source(None, None), &config, input),
            PathBuf::from("/srv/reels")
        );
    }

    #[test]
    fn schedule_flags_override_config() {
        let mut config = ClipperConfig::default();
        let args = ScheduleArgs {
            chunk_length: Some(15.0),
            stop_if_last_short: true,
            sample: Some(4),
            offset: 2.0,
        };
        apply_schedule_args(&mut config, &args);

        assert_eq!(config.chunk_length, 15.0);
        assert!(config.stop_if_last_short);
        assert_eq!(
            sample_spec(&args),
            Some(SampleSpec {
                clips: 4,
                start_offset: 2.0
            })
        );
    }

    #[test]
    fn plan_table_lists_every_window() {
        let schedule = schedule_chunks(95.0, 30.0, false);
        let rendered = plan_table(&schedule).to_string();

        assert!(rendered.contains("004"));
        assert!(rendered.contains("0:01:35.00"));
        assert!(rendered.contains("5.00"));
    }
}
