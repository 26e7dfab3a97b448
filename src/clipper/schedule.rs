//! Chunk schedule over the source timeline.

use serde::Serialize;

use crate::clipper::error::ClipperError;

/// Remainders at or below this many seconds are treated as noise, not a clip.
pub const MIN_REMAINDER_SECS: f64 = 0.2;

/// Sampled windows must end this far before the end of the media.
const SAMPLE_TAIL_GUARD_SECS: f64 = 0.5;

/// Most windows a single schedule may hold.
pub const MAX_CLIPS: usize = 10_000;

/// One window of the source timeline that becomes one output clip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChunkWindow {
    /// 1-based position in the schedule, used for output numbering
    pub index: usize,
    pub start: f64,
    pub length: f64,
}

impl ChunkWindow {
    /// A window with index 1; schedules renumber as they emit.
    pub fn new(start: f64, length: f64) -> Self {
        Self {
            index: 1,
            start,
            length,
        }
    }

    pub fn end(&self) -> f64 {
        self.start + self.length
    }
}

/// Why a schedule emitted fewer windows than `ceil(total / chunk)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScheduleStop {
    /// Every window was emitted
    Complete,
    /// The remaining media was at most [`MIN_REMAINDER_SECS`]
    NegligibleRemainder,
    /// The final window was shorter than a full chunk and `stop_if_last_short` was set
    ShortFinalChunk,
    /// A sampled window would have run into the last half second of media
    PastMediaEnd,
}

/// Evenly spaced highlight windows instead of consecutive chunks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleSpec {
    pub clips: usize,
    pub start_offset: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkSchedule {
    pub windows: Vec<ChunkWindow>,
    /// `ceil(total_duration / chunk_length)`
    pub nominal_count: usize,
    pub stop: ScheduleStop,
}

impl ChunkSchedule {
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// Sum of the emitted window lengths.
    pub fn covered_duration(&self) -> f64 {
        self.windows.iter().map(|w| w.length).sum()
    }
}

/// Validate the inputs and build either the tiled or the sampled schedule.
pub fn plan_schedule(
    total_duration: f64,
    chunk_length: f64,
    stop_if_last_short: bool,
    sample: Option<SampleSpec>,
) -> Result<ChunkSchedule, ClipperError> {
    if !total_duration.is_finite() || total_duration < 0.0 {
        return Err(ClipperError::InvalidConfig(format!(
            "duration must be a non-negative number of seconds, got {total_duration}"
        )));
    }
    if !chunk_length.is_finite() || chunk_length <= 0.0 {
        return Err(ClipperError::InvalidConfig(format!(
            "chunk_length must be a positive number of seconds, got {chunk_length}"
        )));
    }

    match sample {
        Some(spec) => {
            if !spec.start_offset.is_finite() || spec.start_offset < 0.0 {
                return Err(ClipperError::InvalidConfig(format!(
                    "sample offset must be a non-negative number of seconds, got {}",
                    spec.start_offset
                )));
            }
            if spec.clips > MAX_CLIPS {
                return Err(ClipperError::InvalidConfig(format!(
                    "cannot sample {} clips, the limit is {MAX_CLIPS}",
                    spec.clips
                )));
            }
            Ok(sample_chunks(
                total_duration,
                chunk_length,
                spec.clips,
                spec.start_offset,
            ))
        }
        None => {
            let nominal = (total_duration / chunk_length).ceil();
            if nominal > MAX_CLIPS as f64 {
                return Err(ClipperError::InvalidConfig(format!(
                    "{total_duration}s in {chunk_length}s clips exceeds the limit of {MAX_CLIPS} clips"
                )));
            }
            Ok(schedule_chunks(total_duration, chunk_length, stop_if_last_short))
        }
    }
}

/// Tile `[0, total_duration)` with consecutive windows of `chunk_length`.
///
/// The last window is shortened to the remaining media, or dropped when
/// `stop_if_last_short` is set. Inputs are checked by [`plan_schedule`].
pub fn schedule_chunks(
    total_duration: f64,
    chunk_length: f64,
    stop_if_last_short: bool,
) -> ChunkSchedule {
    let nominal_count = (total_duration / chunk_length).ceil().max(0.0) as usize;
    let mut windows = Vec::new();
    let mut stop = ScheduleStop::Complete;

    for i in 0..nominal_count {
        let start = i as f64 * chunk_length;
        let remaining = total_duration - start;
        if remaining <= MIN_REMAINDER_SECS {
            stop = ScheduleStop::NegligibleRemainder;
            break;
        }

        let length = chunk_length.min(remaining);
        if stop_if_last_short && length < chunk_length {
            stop = ScheduleStop::ShortFinalChunk;
            break;
        }

        windows.push(ChunkWindow {
            index: i + 1,
            start,
            length,
        });
    }

    ChunkSchedule {
        windows,
        nominal_count,
        stop,
    }
}

/// Spread `clips` windows of `chunk_length` evenly after `start_offset`.
///
/// Windows may overlap when the media is short. Emission stops at the
/// first window that would end within half a second of the media end.
pub fn sample_chunks(
    total_duration: f64,
    chunk_length: f64,
    clips: usize,
    start_offset: f64,
) -> ChunkSchedule {
    let usable = (total_duration - chunk_length - start_offset).max(0.0);
    let step = usable / clips.max(1) as f64;
    let mut windows = Vec::new();
    let mut stop = ScheduleStop::Complete;

    for i in 0..clips {
        let start = start_offset + i as f64 * step;
        if start + chunk_length > total_duration - SAMPLE_TAIL_GUARD_SECS {
            stop = ScheduleStop::PastMediaEnd;
            break;
        }
        windows.push(ChunkWindow {
            index: i + 1,
            start,
            length: chunk_length,
        });
    }

    ChunkSchedule {
        windows,
        nominal_count: clips,
        stop,
    }
}
