use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

use crate::cli::{Args, ExtractorKind};

/// Suffix appended to the input stem for standardized outputs
pub const OUTPUT_SUFFIX: &str = "_processed";

/// Create a styled progress bar
pub fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.blue} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg} ({eta})",
    ) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

/// Format duration in a human-readable way
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if total_secs >= 60 {
        let mins = total_secs / 60;
        let secs = total_secs % 60;
        format!("{}m {}s", mins, secs)
    } else if total_secs > 0 {
        format!("{}.{:03}s", total_secs, millis)
    } else {
        format!("{}ms", duration.as_millis())
    }
}

/// Validate command line arguments
pub fn validate_inputs(args: &Args) -> Result<()> {
    if !args.input.exists() {
        return Err(anyhow::anyhow!(
            "Input path does not exist: {}",
            args.input.display()
        ));
    }
    if !args.input.is_dir() && !args.input.is_file() {
        return Err(anyhow::anyhow!(
            "Input path is neither a file nor a directory: {}",
            args.input.display()
        ));
    }

    if args.input.is_dir() && args.output.is_file() {
        return Err(anyhow::anyhow!(
            "Output must be a directory when the input is a directory: {}",
            args.output.display()
        ));
    }

    let extensions = args.parse_extensions();
    if extensions.is_empty() {
        return Err(anyhow::anyhow!("No valid extensions specified"));
    }

    if args.jobs > 64 {
        return Err(anyhow::anyhow!(
            "Job count too high (max 64), got: {}",
            args.jobs
        ));
    }

    if args.extractor == ExtractorKind::Onnx {
        #[cfg(not(feature = "onnx"))]
        {
            return Err(anyhow::anyhow!(
                "ONNX background removal is not available. \
                 Rebuild with --features onnx or use --extractor rembg"
            ));
        }

        #[cfg(feature = "onnx")]
        {
            if args.segmentation_model.is_none() {
                return Err(anyhow::anyhow!(
                    "--extractor onnx requires --segmentation-model <FILE>"
                ));
            }
        }
    }

    Ok(())
}

/// Get file extension in lowercase
pub fn get_file_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Check if a file has one of the specified extensions
pub fn has_valid_extension(path: &Path, extensions: &[String]) -> bool {
    if let Some(ext) = get_file_extension(path) {
        extensions.contains(&ext)
    } else {
        false
    }
}

/// `<stem>_processed.jpg` for an input path
pub fn output_filename(input_path: &Path) -> String {
    let stem = input_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    format!("{}{}.jpg", stem, OUTPUT_SUFFIX)
}

/// Print verbose information if verbose mode is enabled
pub fn verbose_println(verbose: bool, message: &str) {
    if verbose {
        println!("{} {}", style("[VERBOSE]").dim(), message);
    }
}

/// Print warning message
pub fn warn_println(message: &str) {
    println!("{} {}", style("[WARNING]").yellow().bold(), message);
}

/// Print error message
pub fn error_println(message: &str) {
    eprintln!("{} {}", style("[ERROR]").red().bold(), message);
}
