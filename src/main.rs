use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use indicatif::ProgressBar;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use profile_photo_processor::cli::{Args, ExtractorKind};
use profile_photo_processor::image_processing::batch::{plan_jobs, BatchSummary, ImageJob};
use profile_photo_processor::image_processing::extractor::{
    ForegroundExtractor, PassthroughExtractor, RembgExtractor,
};
use profile_photo_processor::image_processing::face_locator::DetectorParams;
use profile_photo_processor::image_processing::profile::Profile;
use profile_photo_processor::image_processing::report::{PlacementReport, ReportEntry};
use profile_photo_processor::image_processing::rustface_backend::RustfaceLocator;
use profile_photo_processor::image_processing::{ProcessingConfig, ProcessingEngine};
use profile_photo_processor::json_output::JsonMessage;
use profile_photo_processor::utils::{
    create_progress_bar, error_println, format_duration, validate_inputs, verbose_println,
    warn_println,
};

/// Build the background-removal backend selected on the command line
fn build_extractor(args: &Args) -> Result<Box<dyn ForegroundExtractor>> {
    match args.extractor {
        ExtractorKind::Rembg => Ok(Box::new(RembgExtractor::new(
            args.rembg_path.clone(),
            args.post_process_mask(),
        ))),
        ExtractorKind::Passthrough => Ok(Box::new(PassthroughExtractor)),
        #[cfg(feature = "onnx")]
        ExtractorKind::Onnx => {
            use profile_photo_processor::image_processing::onnx_extractor::OnnxExtractor;

            let model_path = args
                .segmentation_model
                .as_ref()
                .context("--extractor onnx requires --segmentation-model <FILE>")?;
            Ok(Box::new(OnnxExtractor::from_file(
                model_path,
                args.post_process_mask(),
            )?))
        }
        #[cfg(not(feature = "onnx"))]
        ExtractorKind::Onnx => Err(anyhow::anyhow!(
            "ONNX background removal is not available. Rebuild with --features onnx"
        )),
    }
}

fn print_configuration(args: &Args, profile: &Profile, jobs: usize) {
    println!("{}", style("Configuration:").bold());
    println!("  Profile: {:?}", args.profile);
    println!(
        "  Canvas: {}x{}, background #{:02x}{:02x}{:02x}",
        profile.canvas_width,
        profile.canvas_height,
        profile.background[0],
        profile.background[1],
        profile.background[2]
    );
    println!(
        "  Face height: {:.0}px, face centre row: {}",
        profile.target_face_height(),
        profile.target_face_row()
    );
    println!("  Fallback divisor: {}", profile.fallback_divisor);
    println!("  Min face size: {}px", profile.min_face_size);
    println!("  Extractor: {:?} (model {})", args.extractor, args.model);
    println!("  Face model: {}", args.face_model.display());
    println!("  JPEG quality: {}", args.quality);
    println!("  Parallel jobs: {}", jobs);
    println!("  Extensions: {:?}", args.parse_extensions());
    if args.debug {
        println!("  Debug mode: enabled - will write face reference overlays");
    }
    if args.dry_run {
        println!("  Dry run mode: enabled (simulation only - no files will be created)");
    }
    println!();
}

fn print_dry_run(jobs: &[ImageJob]) {
    println!("{}", style("Dry Run Results Summary:").bold().cyan());
    println!("  Would be processed: {}", style(jobs.len()).bold().green());
    println!();
    for (i, job) in jobs.iter().enumerate() {
        println!(
            "  {} {} → {}",
            style(format!("#{}", i + 1)).dim(),
            style(job.input.display()).bold(),
            style(job.output.display()).cyan()
        );
    }
    println!();
    println!("{}", style("💡 Dry Run Mode:").bold().yellow());
    println!("  • No files were created during this simulation");
    println!("  • Remove --dry-run to actually process the images");
}

fn main() -> Result<()> {
    let start_time = Instant::now();
    let mut args = Args::parse();
    let config_file = args.load_and_merge_config()?;
    let json = args.json;

    if !json {
        println!("{}", style("Profile Photo Processor").bold().blue());
        println!("{}", style("Background removal and face-anchored framing").dim());
        println!();
        if let Some(path) = &args.config_file {
            verbose_println(args.verbose, &format!("Loaded configuration from: {}", path.display()));
        }
    }

    validate_inputs(&args)?;

    let profile = args
        .resolve_profile(config_file.as_ref())
        .context("Invalid profile configuration")?;
    let parallel_jobs = args.effective_jobs();
    let extensions = args.parse_extensions();

    if args.verbose && !json {
        print_configuration(&args, &profile, parallel_jobs);
    }

    let jobs = plan_jobs(&args.input, &args.output, &extensions)?;

    if jobs.is_empty() {
        if json {
            JsonMessage::summary(0, 0, 0, 0, start_time.elapsed().as_secs_f64());
        } else {
            println!("{}", style("No images found with specified extensions").red());
        }
        return Ok(());
    }

    if args.dry_run {
        if !json {
            print_dry_run(&jobs);
        }
        return Ok(());
    }

    if args.input.is_dir() {
        std::fs::create_dir_all(&args.output).context("Failed to create output directory")?;
    }

    let extractor = build_extractor(&args)?;
    let locator = RustfaceLocator::from_file(
        &args.face_model,
        DetectorParams::with_min_face_size(profile.min_face_size),
    )?;

    let config = ProcessingConfig {
        profile,
        model: args.model.clone(),
        jpeg_quality: args.quality,
        verbose: args.verbose && !json,
        quiet: json,
        debug: args.debug,
        parallel_jobs,
    };
    let engine = ProcessingEngine::new(config, extractor, Box::new(locator))?;
    verbose_println(
        args.verbose && !json,
        &format!("Using {} background removal", engine.extractor_name()),
    );

    let progress = if json {
        ProgressBar::hidden()
    } else {
        create_progress_bar(jobs.len() as u64)
    };
    let completed = AtomicUsize::new(0);
    let total = jobs.len();

    let results = engine.process_batch(&jobs, |job, result| {
        let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
        let filename = job
            .input
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("unknown");

        if json {
            match result {
                Ok(r) => JsonMessage::file_completed(
                    &r.input_path,
                    &r.output_path,
                    r.face_detected(),
                    r.layout.scale,
                    r.processing_time.as_millis(),
                ),
                Err(e) => JsonMessage::file_failed(&job.input, e.to_string()),
            }
            JsonMessage::progress(done, total, filename);
        } else {
            match result {
                Ok(r) => {
                    for warning in &r.warnings {
                        progress.suspend(|| warn_println(warning));
                    }
                }
                Err(e) => progress.suspend(|| error_println(&format!("{}: {}", job.input.display(), e))),
            }
            progress.set_message(filename.to_string());
            progress.inc(1);
        }
    });

    progress.finish_with_message("✓ Processing complete!");

    let summary = BatchSummary::from_results(&results, start_time.elapsed());

    if json {
        JsonMessage::summary(
            summary.total_files,
            summary.succeeded,
            summary.failed,
            summary.fallbacks,
            summary.total_duration.as_secs_f64(),
        );
    } else {
        println!();
        println!("{}", style("Results Summary:").bold().green());
        println!("  Successfully processed: {}", style(summary.succeeded).bold().green());
        if summary.fallbacks > 0 {
            println!(
                "  No face detected (centre fallback): {}",
                style(summary.fallbacks).bold().yellow()
            );
        }
        if summary.failed > 0 {
            println!("  Failed: {}", style(summary.failed).bold().red());
        }
        println!();
        println!("{}", style("Performance:").bold().blue());
        println!(
            "  Total processing time: {}",
            style(format_duration(summary.total_duration)).bold()
        );
        println!(
            "  Average time per image: {}",
            style(format_duration(summary.average_duration())).dim()
        );
        println!();
        println!("{}", style("Output files:").bold().green());
        println!("  All files: {}", args.output.display());

        if args.report {
            let mut report = PlacementReport::new();
            for (job, result) in jobs.iter().zip(&results) {
                match result {
                    Ok(r) => report.add(ReportEntry::from_result(r)),
                    Err(e) => report.add_failure(&job.input, e.to_string()),
                }
            }
            report.print();
        }

        if summary.has_failures() {
            println!();
            println!(
                "{}",
                style(format!("⚠ {} errors occurred during processing", summary.failed))
                    .bold()
                    .yellow()
            );
            println!("  Check image files and try again with --verbose for more details");
        }
    }

    if summary.has_failures() {
        std::process::exit(1);
    }

    Ok(())
}
