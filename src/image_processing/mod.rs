pub mod batch;
pub mod compositor;
pub mod debug;
pub mod extractor;
pub mod face_locator;
pub mod face_policy;
#[cfg(feature = "onnx")]
pub mod onnx_extractor;
pub mod output;
pub mod profile;
pub mod report;
pub mod resize;
pub mod rustface_backend;

use image::{RgbImage, RgbaImage};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::{ProcessError, Result};
use crate::utils::{verbose_println, warn_println};
use batch::ImageJob;
use compositor::CanonicalLayout;
use extractor::ForegroundExtractor;
use face_locator::FaceLocator;
use face_policy::FaceReference;
use profile::Profile;

#[derive(Debug, Clone)]
pub struct ProcessingConfig {
    pub profile: Profile,
    /// Segmentation model identifier handed to the extractor
    pub model: String,
    pub jpeg_quality: u8,
    pub verbose: bool,
    /// Suppress human-readable output (JSON lines mode)
    pub quiet: bool,
    pub debug: bool,
    pub parallel_jobs: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            profile: Profile::standard(),
            model: extractor::DEFAULT_MODEL.to_string(),
            jpeg_quality: output::DEFAULT_JPEG_QUALITY,
            verbose: false,
            quiet: false,
            debug: false,
            parallel_jobs: 1,
        }
    }
}

/// In-memory result of standardizing one photo
pub struct Standardized {
    pub image: RgbImage,
    pub foreground: RgbaImage,
    pub reference: FaceReference,
    pub layout: CanonicalLayout,
    pub faces_found: usize,
}

/// Runs the extract, locate, resolve and composite pipeline.
///
/// The extractor and locator are created once per run and shared by every
/// worker, so both must be `Send + Sync`.
pub struct ProcessingEngine {
    config: ProcessingConfig,
    extractor: Box<dyn ForegroundExtractor>,
    locator: Box<dyn FaceLocator>,
}

impl ProcessingEngine {
    pub fn new(
        config: ProcessingConfig,
        extractor: Box<dyn ForegroundExtractor>,
        locator: Box<dyn FaceLocator>,
    ) -> Result<Self> {
        config.profile.validate()?;
        Ok(Self {
            config,
            extractor,
            locator,
        })
    }

    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    pub fn extractor_name(&self) -> &'static str {
        self.extractor.name()
    }

    /// Standardize encoded image bytes without touching the filesystem
    pub fn standardize_bytes(&self, raw: &[u8]) -> Result<Standardized> {
        let cut_out = self.extractor.extract(raw, &self.config.model)?;
        let foreground = extractor::decode_foreground(&cut_out).map_err(|e| {
            ProcessError::Extraction(format!("{} returned an unreadable image: {}", self.extractor.name(), e))
        })?;
        let (width, height) = foreground.dimensions();

        if width == 0 || height == 0 {
            return Err(ProcessError::Extraction(format!(
                "{} returned an empty image",
                self.extractor.name()
            )));
        }

        // Detection runs on the cut-out with its alpha dropped
        let detection_input = image::DynamicImage::ImageRgba8(foreground.clone()).to_rgb8();
        let candidates = self.locator.locate(&detection_input);
        let reference = face_policy::resolve_reference(
            &candidates,
            width,
            height,
            self.config.profile.fallback_divisor,
        );

        let (image, layout) = compositor::standardize(&foreground, &reference, &self.config.profile)?;

        Ok(Standardized {
            image,
            foreground,
            reference,
            layout,
            faces_found: candidates.len(),
        })
    }

    /// Standardize one file and write the JPEG to `output_path`
    pub fn process_single_image(&self, input_path: &Path, output_path: &Path) -> Result<ProcessingResult> {
        let start = Instant::now();
        verbose_println(self.config.verbose, &format!("Processing: {}", input_path.display()));

        let raw = std::fs::read(input_path).map_err(|source| ProcessError::Read {
            path: input_path.to_path_buf(),
            source,
        })?;

        let standardized = self.standardize_bytes(&raw)?;

        let mut warnings = Vec::new();
        if standardized.reference.is_fallback() {
            warnings.push(format!(
                "No face detected in {}, using centre positioning",
                input_path.display()
            ));
        } else {
            verbose_println(
                self.config.verbose,
                &format!(
                    "{} face candidate(s), reference height {:.0}px",
                    standardized.faces_found, standardized.reference.height
                ),
            );
        }

        verbose_println(
            self.config.verbose,
            &format!(
                "Scale {:.4} -> {}x{}, paste at ({}, {})",
                standardized.layout.scale,
                standardized.layout.scaled_width,
                standardized.layout.scaled_height,
                standardized.layout.paste_x,
                standardized.layout.paste_y
            ),
        );

        let encoded = output::encode_jpeg(&standardized.image, self.config.jpeg_quality)?;
        output::write_output(output_path, &encoded)?;

        let debug_path = if self.config.debug {
            match debug::write_debug_image(&standardized.foreground, &standardized.reference, output_path) {
                Ok(path) => Some(path),
                Err(e) => {
                    warnings.push(format!("Debug overlay for {} not written: {}", input_path.display(), e));
                    None
                }
            }
        } else {
            None
        };

        Ok(ProcessingResult {
            input_path: input_path.to_path_buf(),
            output_path: output_path.to_path_buf(),
            debug_path,
            reference: standardized.reference,
            layout: standardized.layout,
            faces_found: standardized.faces_found,
            warnings,
            processing_time: start.elapsed(),
        })
    }

    /// Process every job, isolating failures per image.
    ///
    /// Results come back in job order. With more than one job a dedicated
    /// rayon pool of `parallel_jobs` threads is used.
    pub fn process_batch<F>(&self, jobs: &[ImageJob], progress_callback: F) -> Vec<Result<ProcessingResult>>
    where
        F: Fn(&ImageJob, &Result<ProcessingResult>) + Send + Sync,
    {
        let run = |job: &ImageJob| {
            let result = self.process_single_image(&job.input, &job.output);
            progress_callback(job, &result);
            result
        };

        if self.config.parallel_jobs <= 1 || jobs.len() <= 1 {
            return jobs.iter().map(&run).collect();
        }

        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.parallel_jobs)
            .build()
        {
            Ok(pool) => pool.install(|| jobs.par_iter().map(&run).collect()),
            Err(e) => {
                if !self.config.quiet {
                    warn_println(&format!(
                        "Failed to start {} worker threads ({}), processing sequentially",
                        self.config.parallel_jobs, e
                    ));
                }
                jobs.iter().map(&run).collect()
            }
        }
    }
}

#[derive(Debug)]
pub struct ProcessingResult {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub debug_path: Option<PathBuf>,
    pub reference: FaceReference,
    pub layout: CanonicalLayout,
    /// Candidates the locator reported before the largest was chosen
    pub faces_found: usize,
    /// Non-fatal problems for the caller to report
    pub warnings: Vec<String>,
    pub processing_time: Duration,
}

impl ProcessingResult {
    pub fn face_detected(&self) -> bool {
        !self.reference.is_fallback()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_processing::extractor::{encode_png, PassthroughExtractor};
    use crate::image_processing::face_locator::FaceBox;
    use image::Rgba;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedLocator(Vec<FaceBox>);

    impl FaceLocator for FixedLocator {
        fn locate(&self, _image: &RgbImage) -> Vec<FaceBox> {
            self.0.clone()
        }
    }

    struct FailingExtractor;

    impl ForegroundExtractor for FailingExtractor {
        fn extract(&self, _raw: &[u8], _model: &str) -> Result<Vec<u8>> {
            Err(ProcessError::Extraction("model unavailable".to_string()))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    /// Returns bytes no image decoder accepts
    struct GarbageExtractor;

    impl ForegroundExtractor for GarbageExtractor {
        fn extract(&self, _raw: &[u8], _model: &str) -> Result<Vec<u8>> {
            Ok(b"not an image".to_vec())
        }

        fn name(&self) -> &'static str {
            "garbage"
        }
    }

    fn engine(faces: Vec<FaceBox>, config: ProcessingConfig) -> ProcessingEngine {
        ProcessingEngine::new(config, Box::new(PassthroughExtractor), Box::new(FixedLocator(faces))).unwrap()
    }

    fn portrait_png() -> Vec<u8> {
        let img = RgbaImage::from_fn(400, 500, |x, _| {
            if (100..300).contains(&x) {
                Rgba([180, 120, 90, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        });
        encode_png(&img).unwrap()
    }

    #[test]
    fn test_standardize_bytes_detected() {
        let engine = engine(vec![FaceBox::new(150, 100, 100, 100)], ProcessingConfig::default());
        let out = engine.standardize_bytes(&portrait_png()).unwrap();

        assert_eq!(out.image.dimensions(), (810, 1440));
        assert_eq!(out.faces_found, 1);
        assert!(!out.reference.is_fallback());
        assert_eq!(out.layout.paste_y + out.layout.scaled_ref_y, 547);
    }

    #[test]
    fn test_standardize_bytes_fallback() {
        let engine = engine(Vec::new(), ProcessingConfig::default());
        let out = engine.standardize_bytes(&portrait_png()).unwrap();

        assert!(out.reference.is_fallback());
        assert_eq!(out.reference.height, 125.0);
        assert_eq!(out.faces_found, 0);
    }

    #[test]
    fn test_extraction_failure_propagates() {
        let engine = ProcessingEngine::new(
            ProcessingConfig::default(),
            Box::new(FailingExtractor),
            Box::new(FixedLocator(Vec::new())),
        )
        .unwrap();

        let result = engine.standardize_bytes(&portrait_png());
        assert!(matches!(result, Err(ProcessError::Extraction(_))));
    }

    #[test]
    fn test_unreadable_cut_out_is_extraction_error() {
        let engine = ProcessingEngine::new(
            ProcessingConfig::default(),
            Box::new(GarbageExtractor),
            Box::new(FixedLocator(Vec::new())),
        )
        .unwrap();

        let result = engine.standardize_bytes(&portrait_png());
        assert!(matches!(result, Err(ProcessError::Extraction(_))));
    }

    #[test]
    fn test_fallback_reported_as_warning() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("erin.png");
        std::fs::write(&input, portrait_png()).unwrap();

        let fallback = engine(Vec::new(), ProcessingConfig::default())
            .process_single_image(&input, &dir.path().join("a.jpg"))
            .unwrap();
        assert_eq!(fallback.warnings.len(), 1);
        assert!(fallback.warnings[0].contains("No face detected"));

        let detected = engine(vec![FaceBox::new(150, 100, 100, 100)], ProcessingConfig::default())
            .process_single_image(&input, &dir.path().join("b.jpg"))
            .unwrap();
        assert!(detected.warnings.is_empty());
    }

    #[test]
    fn test_debug_write_failure_keeps_output() {
        let config = ProcessingConfig {
            debug: true,
            ..ProcessingConfig::default()
        };
        let engine = engine(vec![FaceBox::new(150, 100, 100, 100)], config);
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("frank.png");
        std::fs::write(&input, portrait_png()).unwrap();
        // a directory where the overlay file should go
        std::fs::create_dir(dir.path().join("frank_processed_debug.png")).unwrap();

        let output = dir.path().join("frank_processed.jpg");
        let result = engine.process_single_image(&input, &output).unwrap();

        assert!(output.exists());
        assert_eq!(result.debug_path, None);
        assert!(result.warnings[0].contains("Debug overlay"));
    }

    #[test]
    fn test_invalid_profile_is_rejected() {
        let mut config = ProcessingConfig::default();
        config.profile.fallback_divisor = 0;
        let result = ProcessingEngine::new(config, Box::new(PassthroughExtractor), Box::new(FixedLocator(Vec::new())));
        assert!(matches!(result, Err(ProcessError::InvalidProfile(_))));
    }

    #[test]
    fn test_missing_input_is_read_error() {
        let engine = engine(Vec::new(), ProcessingConfig::default());
        let dir = tempfile::tempdir().unwrap();
        let result = engine.process_single_image(&dir.path().join("missing.png"), &dir.path().join("out.jpg"));
        assert!(matches!(result, Err(ProcessError::Read { .. })));
    }

    #[test]
    fn test_debug_image_written() {
        let config = ProcessingConfig {
            debug: true,
            ..ProcessingConfig::default()
        };
        let engine = engine(vec![FaceBox::new(150, 100, 100, 100)], config);
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("carol.png");
        std::fs::write(&input, portrait_png()).unwrap();

        let output = dir.path().join("carol_processed.jpg");
        let result = engine.process_single_image(&input, &output).unwrap();

        assert!(output.exists());
        assert_eq!(result.debug_path, Some(dir.path().join("carol_processed_debug.png")));
        assert!(dir.path().join("carol_processed_debug.png").exists());
    }

    #[test]
    fn test_parallel_batch_keeps_order_and_isolates_failures() {
        let config = ProcessingConfig {
            parallel_jobs: 3,
            quiet: true,
            ..ProcessingConfig::default()
        };
        let engine = engine(Vec::new(), config);
        let dir = tempfile::tempdir().unwrap();

        let mut jobs = Vec::new();
        for i in 0..5 {
            let input = dir.path().join(format!("p{}.png", i));
            if i == 2 {
                std::fs::write(&input, b"broken").unwrap();
            } else {
                std::fs::write(&input, portrait_png()).unwrap();
            }
            jobs.push(ImageJob {
                output: dir.path().join("out").join(format!("p{}_processed.jpg", i)),
                input,
            });
        }

        let calls = AtomicUsize::new(0);
        let results = engine.process_batch(&jobs, |_, _| {
            calls.fetch_add(1, Ordering::Relaxed);
        });

        assert_eq!(calls.load(Ordering::Relaxed), 5);
        assert_eq!(results.len(), 5);
        for (i, result) in results.iter().enumerate() {
            if i == 2 {
                assert!(matches!(result, Err(ProcessError::Decode(_))));
            } else {
                assert_eq!(result.as_ref().unwrap().input_path, jobs[i].input);
            }
        }
    }
}
