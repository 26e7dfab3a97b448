use std::path::PathBuf;

use serde::Serialize;

use super::PreparedRun;
use crate::clipper::schedule::{ChunkWindow, ScheduleStop};
use crate::ui::prelude::{Level, emit};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "kebab-case")]
pub enum ChunkStatus {
    Rendered,
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct ChunkOutcome {
    pub window: ChunkWindow,
    pub output: PathBuf,
    /// Subtitle lines burned into this clip
    pub lines: usize,
    #[serde(flatten)]
    pub status: ChunkStatus,
}

/// Per-run summary, one entry per attempted window in schedule order.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub input: PathBuf,
    pub duration: f64,
    pub segments: usize,
    pub stop: ScheduleStop,
    pub chunks: Vec<ChunkOutcome>,
}

impl RunReport {
    pub(super) fn new(prepared: &PreparedRun) -> Self {
        Self {
            input: prepared.input.clone(),
            duration: prepared.duration,
            segments: prepared.segments.len(),
            stop: prepared.schedule.stop,
            chunks: Vec::new(),
        }
    }

    pub fn rendered(&self) -> usize {
        self.chunks
            .iter()
            .filter(|chunk| chunk.status == ChunkStatus::Rendered)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.chunks.len() - self.rendered()
    }

    pub fn summary_lines(&self) -> Vec<ReportLine> {
        let mut lines = Vec::new();

        if self.chunks.is_empty() {
            lines.push(ReportLine::new(
                Level::Warn,
                "clipper.report.empty",
                format!("No clips produced for {}", self.input.display()),
            ));
            return lines;
        }

        lines.push(ReportLine::new(
            Level::Success,
            "clipper.report.rendered",
            format!(
                "Rendered {} of {} clip(s) from {}",
                self.rendered(),
                self.chunks.len(),
                self.input.display()
            ),
        ));

        let failures: Vec<String> = self
            .chunks
            .iter()
            .filter_map(|chunk| match &chunk.status {
                ChunkStatus::Failed(reason) => {
                    Some(format!("clip {:03}: {}", chunk.window.index, reason))
                }
                ChunkStatus::Rendered => None,
            })
            .collect();
        if !failures.is_empty() {
            lines.push(ReportLine::new(
                Level::Error,
                "clipper.report.failed",
                format!("{} clip(s) failed:\n{}", failures.len(), failures.join("\n")),
            ));
        }

        lines
    }

    pub fn emit(&self) {
        emit_report(&self.summary_lines());
    }
}

#[derive(Debug, Clone)]
pub struct ReportLine {
    pub level: Level,
    pub code: &'static str,
    pub message: String,
}

impl ReportLine {
    pub fn new(level: Level, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            level,
            code,
            message: message.into(),
        }
    }
}

fn emit_report(lines: &[ReportLine]) {
    for line in lines {
        emit(line.level, line.code, &line.message, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(index: usize, status: ChunkStatus) -> ChunkOutcome {
        ChunkOutcome {
            window: ChunkWindow {
                index,
                start: (index - 1) as f64 * 30.0,
                length: 30.0,
            },
            output: PathBuf::from(format!("/out/clip_{index:03}_9x16_subs.mp4")),
            lines: 2,
            status,
        }
    }

    fn report(chunks: Vec<ChunkOutcome>) -> RunReport {
        RunReport {
            input: PathBuf::from("/media/talk.mp4"),
            duration: 95.0,
            segments: 12,
            stop: ScheduleStop::Complete,
            chunks,
        }
    }

    #[test]
    fn counts_rendered_and_failed() {
        let report = report(vec![
            outcome(1, ChunkStatus::Rendered),
            outcome(2, ChunkStatus::Failed("boom".to_string())),
            outcome(3, ChunkStatus::Rendered),
        ]);
        assert_eq!(report.rendered(), 2);
        assert_eq!(report.failed(), 1);

        let lines = report.summary_lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].code, "clipper.report.rendered");
        assert!(lines[1].message.contains("clip 002: boom"));
    }

    #[test]
    fn empty_report_warns() {
        let lines = report(Vec::new()).summary_lines();
        assert_eq!(lines.len(), 1);
        assert!(matches!(lines[0].level, Level::Warn));
    }

    #[test]
    fn serializes_status_inline() {
        let value = serde_json::to_value(outcome(2, ChunkStatus::Failed("boom".into()))).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["reason"], "boom");
        assert_eq!(value["window"]["index"], 2);
    }
}
