use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::clipper::error::ClipperError;

/// Extensions accepted when an input directory is scanned, in priority order.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "mov", "webm"];

/// Resolve the media file to process.
///
/// A file path is used as-is. For a directory, the first file (by name)
/// with the highest-priority extension from [`VIDEO_EXTENSIONS`] wins.
pub fn resolve_input_video(path: &Path) -> Result<PathBuf, ClipperError> {
    let not_found = || ClipperError::InputNotFound {
        path: path.to_path_buf(),
    };

    if path.is_file() {
        return path.canonicalize().map_err(|_| not_found());
    }
    if !path.is_dir() {
        return Err(not_found());
    }

    let mut candidates: Vec<PathBuf> = fs::read_dir(path)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .collect();
    candidates.sort();

    for extension in VIDEO_EXTENSIONS {
        if let Some(found) = candidates
            .iter()
            .find(|p| p.extension().and_then(|e| e.to_str()) == Some(*extension))
        {
            return found.canonicalize().map_err(ClipperError::from);
        }
    }

    Err(not_found())
}

pub fn compute_file_hash(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .with_context(|| format!("Failed to open {} for hashing", path.display()))?;
    let file_size = file
        .metadata()
        .with_context(|| format!("Failed to read metadata for {}", path.display()))?
        .len();
    let mut hasher = Sha256::new();
    hasher.update(file_size.to_le_bytes());

    // Large files are sampled at evenly spaced offsets instead of read in full
    const SAMPLE_SIZE: usize = 64 * 1024;
    const MIN_SAMPLES: u64 = 8;
    const MAX_SAMPLES: u64 = 512;
    const TARGET_STEP: u64 = 8 * 1024 * 1024;
    let full_read_threshold = (SAMPLE_SIZE as u64) * MAX_SAMPLES;

    if file_size <= full_read_threshold {
        let mut buffer = [0u8; 8192];
        loop {
            let read = file
                .read(&mut buffer)
                .with_context(|| format!("Failed to read {} for hashing", path.display()))?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
        }
    } else {
        let sample_count = (file_size / TARGET_STEP).clamp(MIN_SAMPLES, MAX_SAMPLES);
        let mut buffer = vec![0u8; SAMPLE_SIZE];
        let last_offset = file_size.saturating_sub(SAMPLE_SIZE as u64);
        let step = last_offset / (sample_count - 1);

        for i in 0..sample_count {
            file.seek(SeekFrom::Start(step * i))
                .with_context(|| format!("Failed to seek {} for hashing", path.display()))?;
            let mut read_total = 0;
            while read_total < SAMPLE_SIZE {
                let read = file
                    .read(&mut buffer[read_total..])
                    .with_context(|| format!("Failed to read {} for hashing", path.display()))?;
                if read == 0 {
                    break;
                }
                read_total += read;
            }
            hasher.update(&buffer[..read_total]);
        }
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Remove a file if it exists.
pub fn remove_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path)
            .with_context(|| format!("Failed to remove temporary file {}", path.display()))?;
    }
    Ok(())
}
