use anyhow::{Context, Result};
use std::path::Path;
use std::process::Command;

use crate::clipper::error::ClipperError;

/// Tools the render pipeline shells out to.
pub const REQUIRED_TOOLS: &[&str] = &["ffmpeg", "ffprobe"];

/// Reports the total duration of a media file.
pub trait DurationProber {
    fn probe_duration(&self, path: &Path) -> Result<f64, ClipperError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FfprobeDurationProber;

impl DurationProber for FfprobeDurationProber {
    fn probe_duration(&self, path: &Path) -> Result<f64, ClipperError> {
        let duration =
            probe_duration_seconds(path).map_err(|err| ClipperError::probe(path, format!("{err:#}")))?;
        if !duration.is_finite() || duration <= 0.0 {
            return Err(ClipperError::probe(
                path,
                format!("ffprobe reported a non-positive duration ({duration})"),
            ));
        }
        Ok(duration)
    }
}

pub fn probe_duration_seconds(path: &Path) -> Result<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .with_context(|| format!("Failed to run ffprobe for {}", path.display()))?;

    if !output.status.success() {
        anyhow::bail!(
            "ffprobe failed for {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    parse_duration_output(&String::from_utf8_lossy(&output.stdout))
}

fn parse_duration_output(stdout: &str) -> Result<f64> {
    stdout
        .trim()
        .parse()
        .with_context(|| format!("Failed to parse ffprobe duration '{}' as f64", stdout.trim()))
}

/// Make sure ffmpeg and ffprobe are on PATH and runnable.
pub fn ensure_tools() -> Result<()> {
    for tool in REQUIRED_TOOLS {
        let resolved = which::which(tool)
            .with_context(|| format!("{tool} not found in PATH"))?;

        let output = Command::new(&resolved)
            .arg("-version")
            .output()
            .with_context(|| format!("Failed to run {}", resolved.display()))?;

        if !output.status.success() {
            anyhow::bail!(
                "{} -version exited with status {:?}: {}",
                tool,
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
    }
    Ok(())
}
