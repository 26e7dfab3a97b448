use anyhow::{Context, Result};
use duct::cmd;
use std::fs;
use std::path::{Path, PathBuf};

use crate::clipper::error::ClipperError;
use crate::clipper::transcript::{TranscriptSegment, parse_whisper_json};
use crate::clipper::support::utils::{compute_file_hash, remove_if_exists};
use crate::ui::prelude::{Level, emit};

/// Produces the full-media transcript, once per run.
pub trait Transcriber {
    fn transcribe(&self, media: &Path) -> Result<Vec<TranscriptSegment>, ClipperError>;
}

impl<T: Transcriber + ?Sized> Transcriber for Box<T> {
    fn transcribe(&self, media: &Path) -> Result<Vec<TranscriptSegment>, ClipperError> {
        (**self).transcribe(media)
    }
}

/// Speech model options handed through to WhisperX.
#[derive(Debug, Clone, PartialEq)]
pub struct WhisperOptions {
    pub model: String,
    pub language: String,
    pub device: String,
    pub compute_type: String,
}

impl Default for WhisperOptions {
    fn default() -> Self {
        Self {
            model: "small".to_string(),
            language: "en".to_string(),
            device: "cpu".to_string(),
            compute_type: "int8".to_string(),
        }
    }
}

/// Runs WhisperX through `uvx` and caches its JSON output per input hash.
pub struct WhisperxTranscriber {
    options: WhisperOptions,
    cache_dir: PathBuf,
    force: bool,
}

impl WhisperxTranscriber {
    pub fn new(options: WhisperOptions, cache_dir: PathBuf, force: bool) -> Self {
        Self {
            options,
            cache_dir,
            force,
        }
    }

    /// Cache file for a given input hash under the current model options.
    pub fn cache_path(&self, media_hash: &str) -> PathBuf {
        self.cache_dir.join(format!(
            "{}-{}-{}.json",
            media_hash, self.options.model, self.options.language
        ))
    }

    fn transcribe_cached(&self, media: &Path) -> Result<Vec<TranscriptSegment>> {
        let media_hash = compute_file_hash(media)?;
        let cache_path = self.cache_path(&media_hash);

        if cache_path.exists() && !self.force {
            emit(
                Level::Info,
                "clipper.transcribe.cached",
                &format!("Using cached transcript {}", cache_path.display()),
                None,
            );
        } else {
            self.run_whisperx(media, &media_hash, &cache_path)?;
        }

        let contents = fs::read_to_string(&cache_path)
            .with_context(|| format!("reading transcript {}", cache_path.display()))?;
        parse_whisper_json(&contents)
    }

    fn run_whisperx(&self, media: &Path, media_hash: &str, cache_path: &Path) -> Result<()> {
        let work_dir = self.cache_dir.join(format!("{media_hash}.work"));
        fs::create_dir_all(&work_dir)
            .with_context(|| format!("Failed to create directory {}", work_dir.display()))?;

        emit(
            Level::Info,
            "clipper.transcribe.start",
            &format!(
                "Transcribing {} with WhisperX model '{}' (this can take a while)...",
                media.display(),
                self.options.model
            ),
            None,
        );

        let media_arg = media.to_string_lossy();
        let work_arg = work_dir.to_string_lossy();
        let whisper_args: Vec<&str> = vec![
            "whisperx",
            &media_arg,
            "--output_format",
            "json",
            "--output_dir",
            &work_arg,
            "--model",
            &self.options.model,
            "--language",
            &self.options.language,
            "--device",
            &self.options.device,
            "--compute_type",
            &self.options.compute_type,
            "--vad_method",
            "silero",
        ];

        let run_result = cmd("uvx", &whisper_args)
            .stdout_to_stderr()
            .run()
            .with_context(|| format!("Failed to run WhisperX for {}", media.display()));

        let produced = media
            .file_stem()
            .map(|stem| work_dir.join(stem).with_extension("json"));

        let outcome = run_result.and_then(|_| {
            let produced = produced
                .filter(|p| p.exists())
                .with_context(|| {
                    format!(
                        "WhisperX did not produce a JSON transcript in {}",
                        work_dir.display()
                    )
                })?;
            fs::rename(&produced, cache_path).with_context(|| {
                format!(
                    "Failed to move {} to {}",
                    produced.display(),
                    cache_path.display()
                )
            })
        });

        if let Err(err) = fs::remove_dir_all(&work_dir) {
            emit(
                Level::Warn,
                "clipper.transcribe.cleanup_failed",
                &format!("Failed to remove {}: {}", work_dir.display(), err),
                None,
            );
        }

        if outcome.is_err() {
            // A half-written cache entry would be reused by the next run
            let _ = remove_if_exists(cache_path);
        }
        outcome
    }
}

impl Transcriber for WhisperxTranscriber {
    fn transcribe(&self, media: &Path) -> Result<Vec<TranscriptSegment>, ClipperError> {
        fs::create_dir_all(&self.cache_dir)?;
        self.transcribe_cached(media)
            .map_err(|err| ClipperError::transcription(media, format!("{err:#}")))
    }
}

/// Transcriber backed by an existing WhisperX JSON file.
pub struct JsonFileTranscriber {
    path: PathBuf,
}

impl JsonFileTranscriber {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Transcriber for JsonFileTranscriber {
    fn transcribe(&self, _media: &Path) -> Result<Vec<TranscriptSegment>, ClipperError> {
        fs::read_to_string(&self.path)
            .with_context(|| format!("reading transcript {}", self.path.display()))
            .and_then(|contents| parse_whisper_json(&contents))
            .map_err(|err| ClipperError::transcription(&self.path, format!("{err:#}")))
    }
}
