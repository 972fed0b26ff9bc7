// Library exports for reuse by the CLI and integration tests
pub mod cli;
pub mod config_file;
pub mod error;
pub mod image_processing;
pub mod json_output;
pub mod utils;

// Re-export commonly used types
pub use cli::{Args, ExtractorKind};
pub use error::{ProcessError, Result};
pub use image_processing::batch::{BatchSummary, ImageJob};
pub use image_processing::compositor::CanonicalLayout;
pub use image_processing::extractor::{ForegroundExtractor, PassthroughExtractor, RembgExtractor};
pub use image_processing::face_locator::{FaceBox, FaceLocator};
pub use image_processing::face_policy::{FaceReference, ReferenceSource};
pub use image_processing::profile::{Profile, ProfileName};
pub use image_processing::{ProcessingConfig, ProcessingEngine, ProcessingResult};
pub use json_output::JsonMessage;
