use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::image_processing::extractor::DEFAULT_MODEL;
use crate::image_processing::output::DEFAULT_JPEG_QUALITY;
use crate::image_processing::profile::ProfileName;

pub const DEFAULT_EXTENSIONS: &str = "jpg,jpeg,png,webp";
pub const DEFAULT_FACE_MODEL: &str = "seeta_fd_frontal_v1.0.bin";

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ExtractorKind {
    /// Run the rembg command line tool
    #[value(name = "rembg")]
    Rembg,
    /// Run an ISNet ONNX model in-process (requires the `onnx` feature)
    #[value(name = "onnx")]
    Onnx,
    /// Inputs are already cut out; use their alpha as-is
    #[value(name = "none")]
    Passthrough,
}

#[derive(Parser, Debug)]
#[command(
    name = "profile-photo-processor",
    version,
    about = "Standardize portrait photos for profile cards",
    long_about = "
Profile Photo Processor

Removes the background from each portrait, finds the face and rescales the
subject so every face has the same height and eye line, then composites it
onto a flat grey canvas and saves a JPEG.

Profiles:
  standard  810x1440,  face centre at 38% from the top
  uhd       2160x3840, face centre at 30% from the top

Example Usage:
  # Standardize a folder of photos
  profile-photo-processor ~/Photos/team ~/processed

  # Single file, explicit output name
  profile-photo-processor alice.jpg badges/alice.jpg

  # 4K profile, four workers, placement report
  profile-photo-processor ~/Photos/team ~/processed --profile uhd -j 4 --report

  # Inputs already have transparent backgrounds
  profile-photo-processor ~/cutouts ~/processed --extractor none

  # See what would be written without processing anything
  profile-photo-processor ~/Photos/team ~/processed --dry-run"
)]
pub struct Args {
    /// Image file or directory of images
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output directory, or output file when INPUT is a single image
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Comma-separated list of image extensions to process
    #[arg(long = "extensions", default_value = DEFAULT_EXTENSIONS)]
    pub extensions_str: String,

    /// Canvas and placement profile
    #[arg(long = "profile", default_value = "standard")]
    pub profile: ProfileName,

    /// JSON file with profile overrides and defaults
    #[arg(long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Background removal backend
    #[arg(long = "extractor", default_value = "rembg")]
    pub extractor: ExtractorKind,

    /// Segmentation model identifier passed to rembg
    #[arg(long = "model", default_value = DEFAULT_MODEL, value_name = "ID")]
    pub model: String,

    /// Path to the rembg executable
    #[arg(long = "rembg", default_value = "rembg", value_name = "PATH")]
    pub rembg_path: PathBuf,

    /// ONNX segmentation model for --extractor onnx
    #[arg(long = "segmentation-model", value_name = "FILE")]
    pub segmentation_model: Option<PathBuf>,

    /// Disable mask post-processing
    #[arg(long = "no-post-process")]
    pub no_post_process: bool,

    /// SeetaFace frontal detection model
    #[arg(long = "face-model", default_value = DEFAULT_FACE_MODEL, value_name = "FILE")]
    pub face_model: PathBuf,

    /// JPEG quality (1-100)
    #[arg(
        long = "quality",
        default_value_t = DEFAULT_JPEG_QUALITY,
        value_name = "N",
        value_parser = clap::value_parser!(u8).range(1..=100)
    )]
    pub quality: u8,

    /// Number of parallel processing jobs (0 = auto-detect CPU cores)
    #[arg(short = 'j', long = "jobs", default_value = "1", value_name = "N")]
    pub jobs: usize,

    /// Enable verbose output with detailed progress information
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Emit JSON lines instead of human-readable output
    #[arg(long = "json")]
    pub json: bool,

    /// Print a placement table at the end
    #[arg(long = "report")]
    pub report: bool,

    /// Also write <stem>_processed_debug.png with the face reference drawn in
    #[arg(long = "debug")]
    pub debug: bool,

    /// List what would be written without processing anything
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

impl Args {
    /// Parse the extensions string into a vector
    pub fn parse_extensions(&self) -> Vec<String> {
        parse_extensions(&self.extensions_str)
    }

    /// Worker count with 0 resolved to the number of CPU cores
    pub fn effective_jobs(&self) -> usize {
        if self.jobs == 0 {
            num_cpus::get()
        } else {
            self.jobs
        }
    }

    pub fn post_process_mask(&self) -> bool {
        !self.no_post_process
    }
}

/// Lowercase, trim and strip leading dots from a comma-separated list
pub fn parse_extensions(extensions: &str) -> Vec<String> {
    extensions
        .split(',')
        .map(|s| s.trim().trim_start_matches('.').to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_extensions() {
        let args = Args {
            extensions_str: "jpg,png,webp".to_string(),
            ..Default::default()
        };
        assert_eq!(args.parse_extensions(), vec!["jpg", "png", "webp"]);

        let args = Args {
            extensions_str: ".JPG, PNG , .webp ,".to_string(),
            ..Default::default()
        };
        assert_eq!(args.parse_extensions(), vec!["jpg", "png", "webp"]);
    }

    #[test]
    fn test_defaults_from_command_line() {
        let args = Args::try_parse_from(["profile-photo-processor", "in", "out"]).unwrap();

        assert_eq!(args.input, PathBuf::from("in"));
        assert_eq!(args.output, PathBuf::from("out"));
        assert_eq!(args.parse_extensions(), vec!["jpg", "jpeg", "png", "webp"]);
        assert_eq!(args.profile, ProfileName::Standard);
        assert_eq!(args.extractor, ExtractorKind::Rembg);
        assert_eq!(args.model, "isnet-general-use");
        assert_eq!(args.quality, 95);
        assert_eq!(args.jobs, 1);
        assert!(args.post_process_mask());
        assert!(!args.dry_run);
    }

    #[test]
    fn test_flags_from_command_line() {
        let args = Args::try_parse_from([
            "profile-photo-processor",
            "photos",
            "processed",
            "--profile",
            "uhd",
            "--extractor",
            "none",
            "--quality",
            "80",
            "-j",
            "4",
            "--no-post-process",
            "--report",
            "--debug",
        ])
        .unwrap();

        assert_eq!(args.profile, ProfileName::Uhd);
        assert_eq!(args.extractor, ExtractorKind::Passthrough);
        assert_eq!(args.quality, 80);
        assert_eq!(args.effective_jobs(), 4);
        assert!(!args.post_process_mask());
        assert!(args.report && args.debug);
    }

    #[test]
    fn test_quality_range() {
        assert!(Args::try_parse_from(["profile-photo-processor", "a", "b", "--quality", "0"]).is_err());
        assert!(Args::try_parse_from(["profile-photo-processor", "a", "b", "--quality", "101"]).is_err());
    }

    #[test]
    fn test_output_is_required() {
        assert!(Args::try_parse_from(["profile-photo-processor", "photos"]).is_err());
    }

    #[test]
    fn test_zero_jobs_uses_all_cores() {
        let args = Args {
            jobs: 0,
            ..Default::default()
        };
        assert_eq!(args.effective_jobs(), num_cpus::get());
    }
}

// Default implementation for tests
#[cfg(test)]
impl Default for Args {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output: PathBuf::new(),
            extensions_str: DEFAULT_EXTENSIONS.to_string(),
            profile: ProfileName::Standard,
            config_file: None,
            extractor: ExtractorKind::Rembg,
            model: DEFAULT_MODEL.to_string(),
            rembg_path: PathBuf::from("rembg"),
            segmentation_model: None,
            no_post_process: false,
            face_model: PathBuf::from(DEFAULT_FACE_MODEL),
            quality: DEFAULT_JPEG_QUALITY,
            jobs: 1,
            verbose: false,
            json: false,
            report: false,
            debug: false,
            dry_run: false,
        }
    }
}
