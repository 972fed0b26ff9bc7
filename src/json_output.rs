//! JSON lines output
//!
//! When --json is enabled, all progress and status information is emitted
//! as JSON lines to stdout, suppressing all other output.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Last progress emission timestamp (milliseconds since epoch)
/// Used for throttling progress updates to ~25 FPS (40ms between updates)
static LAST_PROGRESS_MS: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JsonMessage {
    /// Progress update
    Progress {
        current: usize,
        total: usize,
        message: String,
    },
    /// File processing completed
    FileCompleted {
        input_path: String,
        output_path: String,
        face_detected: bool,
        scale: f64,
        processing_time_ms: u128,
    },
    /// File processing failed
    FileFailed { input_path: String, error: String },
    /// Processing summary
    Summary {
        total_files: usize,
        processed: usize,
        failed: usize,
        fallbacks: usize,
        duration_secs: f64,
    },
}

impl JsonMessage {
    /// Emit JSON message to stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    /// Create and emit progress message (throttled to ~25 FPS)
    ///
    /// The final progress (current == total) is always emitted.
    pub fn progress(current: usize, total: usize, message: impl Into<String>) {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        let last_ms = LAST_PROGRESS_MS.load(Ordering::Relaxed);

        if now_ms.saturating_sub(last_ms) >= 40 || current == total {
            LAST_PROGRESS_MS.store(now_ms, Ordering::Relaxed);
            Self::Progress {
                current,
                total,
                message: message.into(),
            }
            .emit();
        }
    }

    pub fn file_completed(
        input_path: &Path,
        output_path: &Path,
        face_detected: bool,
        scale: f64,
        processing_time_ms: u128,
    ) {
        Self::FileCompleted {
            input_path: input_path.display().to_string(),
            output_path: output_path.display().to_string(),
            face_detected,
            scale,
            processing_time_ms,
        }
        .emit();
    }

    pub fn file_failed(input_path: &Path, error: impl Into<String>) {
        Self::FileFailed {
            input_path: input_path.display().to_string(),
            error: error.into(),
        }
        .emit();
    }

    pub fn summary(total_files: usize, processed: usize, failed: usize, fallbacks: usize, duration_secs: f64) {
        Self::Summary {
            total_files,
            processed,
            failed,
            fallbacks,
            duration_secs,
        }
        .emit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_completed_shape() {
        let message = JsonMessage::FileCompleted {
            input_path: "in/alice.jpg".to_string(),
            output_path: "out/alice_processed.jpg".to_string(),
            face_detected: false,
            scale: 2.5,
            processing_time_ms: 12,
        };

        let value: serde_json::Value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["type"], "file_completed");
        assert_eq!(value["face_detected"], false);
        assert_eq!(value["scale"], 2.5);
    }

    #[test]
    fn test_summary_round_trip() {
        let message = JsonMessage::Summary {
            total_files: 3,
            processed: 2,
            failed: 1,
            fallbacks: 1,
            duration_secs: 0.5,
        };
        let json = serde_json::to_string(&message).unwrap();
        assert!(json.starts_with(r#"{"type":"summary""#));
        assert_eq!(serde_json::from_str::<JsonMessage>(&json).unwrap(), message);
    }
}
