use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use walkdir::WalkDir;

use super::ProcessingResult;
use crate::utils::{has_valid_extension, output_filename};

/// One input file and the path its standardized version is written to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageJob {
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Outcome counts for a finished run
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub total_files: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Successful images that had no detectable face
    pub fallbacks: usize,
    pub total_duration: Duration,
}

impl BatchSummary {
    pub fn from_results<E>(results: &[std::result::Result<ProcessingResult, E>], total_duration: Duration) -> Self {
        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        let fallbacks = results
            .iter()
            .filter_map(|r| r.as_ref().ok())
            .filter(|r| r.reference.is_fallback())
            .count();

        Self {
            total_files: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            fallbacks,
            total_duration,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            (self.succeeded as f64 / self.total_files as f64) * 100.0
        }
    }

    pub fn average_duration(&self) -> Duration {
        if self.total_files == 0 {
            Duration::new(0, 0)
        } else {
            self.total_duration / self.total_files as u32
        }
    }
}

/// Image files directly inside `input_dir` with one of `extensions`, sorted
pub fn discover_images(input_dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let mut image_files = Vec::new();

    let walker = WalkDir::new(input_dir)
        .follow_links(false)
        .min_depth(1)
        .max_depth(1);

    for entry in walker {
        let entry = entry.context("Failed to read directory entry")?;
        let path = entry.path();

        if path.is_file() && has_valid_extension(path, extensions) {
            image_files.push(path.to_path_buf());
        }
    }

    // Sort for consistent processing order
    image_files.sort();
    Ok(image_files)
}

/// Map an input path (file or directory) and an output path to jobs.
///
/// A directory input writes `<stem>_processed.jpg` files into `output`. A
/// file input writes into `output` when it is an existing directory and to
/// `output` itself otherwise.
pub fn plan_jobs(input: &Path, output: &Path, extensions: &[String]) -> Result<Vec<ImageJob>> {
    if input.is_file() {
        let target = if output.is_dir() {
            output.join(output_filename(input))
        } else {
            output.to_path_buf()
        };
        return Ok(vec![ImageJob {
            input: input.to_path_buf(),
            output: target,
        }]);
    }

    if input.is_dir() {
        let jobs = discover_images(input, extensions)?
            .into_iter()
            .map(|path| {
                let target = output.join(output_filename(&path));
                ImageJob {
                    input: path,
                    output: target,
                }
            })
            .collect();
        return Ok(jobs);
    }

    Err(anyhow::anyhow!(
        "Input path does not exist: {}",
        input.display()
    ))
}
