//! Per-image placement report for `--report`
//!
//! Lists, for every processed photo, where the face reference came from
//! and how the foreground was scaled and placed on the canvas.
use prettytable::{format, Cell, Row, Table};
use std::path::Path;

use super::ProcessingResult;

/// One processed image in the report
#[derive(Debug, Clone)]
pub struct ReportEntry {
    pub input_filename: String,
    pub output_filename: String,
    pub face_detected: bool,
    pub faces_found: usize,
    pub reference_height: f64,
    pub scale: f64,
    pub paste_x: i64,
    pub paste_y: i64,
}

impl ReportEntry {
    pub fn from_result(result: &ProcessingResult) -> Self {
        Self {
            input_filename: extract_filename(&result.input_path),
            output_filename: extract_filename(&result.output_path),
            face_detected: !result.reference.is_fallback(),
            faces_found: result.faces_found,
            reference_height: result.reference.height,
            scale: result.layout.scale,
            paste_x: result.layout.paste_x,
            paste_y: result.layout.paste_y,
        }
    }
}

/// Report over a whole run, including failures
#[derive(Debug, Default)]
pub struct PlacementReport {
    pub entries: Vec<ReportEntry>,
    pub failures: Vec<(String, String)>,
}

impl PlacementReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entry: ReportEntry) {
        self.entries.push(entry);
    }

    pub fn add_failure(&mut self, input: &Path, error: impl Into<String>) {
        self.failures.push((extract_filename(input), error.into()));
    }

    pub fn fallback_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.face_detected).count()
    }

    /// Build the placement table
    pub fn table(&self) -> Table {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_BOX_CHARS);

        table.add_row(Row::new(vec![
            Cell::new("Input"),
            Cell::new("Output"),
            Cell::new("Face"),
            Cell::new("Ref. height"),
            Cell::new("Scale"),
            Cell::new("Paste x"),
            Cell::new("Paste y"),
        ]));

        for entry in &self.entries {
            let face = if entry.face_detected {
                format!("✓ ({})", entry.faces_found)
            } else {
                "✗ fallback".to_string()
            };

            table.add_row(Row::new(vec![
                Cell::new(&truncate(&entry.input_filename, 25)),
                Cell::new(&truncate(&entry.output_filename, 30)),
                Cell::new(&face),
                Cell::new(&format!("{:.1}", entry.reference_height)),
                Cell::new(&format!("{:.3}", entry.scale)),
                Cell::new(&entry.paste_x.to_string()),
                Cell::new(&entry.paste_y.to_string()),
            ]));
        }

        table
    }

    pub fn print(&self) {
        println!("\n📐 PLACEMENT REPORT ({} images)\n", self.entries.len());

        if !self.entries.is_empty() {
            self.table().printstd();
            println!();
        }

        if !self.failures.is_empty() {
            let mut table = Table::new();
            table.set_format(*format::consts::FORMAT_BOX_CHARS);
            table.add_row(Row::new(vec![Cell::new("Failed input"), Cell::new("Error")]));
            for (input, error) in &self.failures {
                table.add_row(Row::new(vec![
                    Cell::new(&truncate(input, 25)),
                    Cell::new(&truncate(error, 60)),
                ]));
            }
            table.printstd();
            println!();
        }

        let total = self.entries.len();
        let fallbacks = self.fallback_count();
        println!("📊 Summary:");
        println!("   • Standardized: {}", total);
        if total > 0 {
            println!(
                "   • Centre fallback used: {} ({:.1}%)",
                fallbacks,
                (fallbacks as f32 / total as f32) * 100.0
            );
        }
        println!("   • Failed: {}", self.failures.len());
        println!();
    }
}

/// Truncate string to fit in column
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{}…", kept)
    }
}

/// Helper to extract filename from path
pub fn extract_filename(path: &Path) -> String {
    path.file_name()
        .and_then(|f| f.to_str())
        .unwrap_or("unknown")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, face_detected: bool) -> ReportEntry {
        ReportEntry {
            input_filename: name.to_string(),
            output_filename: format!("{}_processed.jpg", name),
            face_detected,
            faces_found: usize::from(face_detected),
            reference_height: 100.0,
            scale: 2.592,
            paste_x: -891,
            paste_y: -619,
        }
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
        assert_eq!(truncate("ÄÖÜäöü", 4), "ÄÖÜ…");
    }

    #[test]
    fn test_extract_filename() {
        assert_eq!(extract_filename(Path::new("/a/b/photo.jpg")), "photo.jpg");
        assert_eq!(extract_filename(Path::new("/")), "unknown");
    }

    #[test]
    fn test_table_has_row_per_entry() {
        let mut report = PlacementReport::new();
        report.add(entry("alice", true));
        report.add(entry("bob", false));
        report.add_failure(Path::new("/in/broken.jpg"), "decode");

        assert_eq!(report.table().len(), 3);
        assert_eq!(report.fallback_count(), 1);
        assert_eq!(report.failures[0].0, "broken.jpg");

        let rendered = report.table().to_string();
        assert!(rendered.contains("alice_processed.jpg"));
        assert!(rendered.contains("fallback"));
        assert!(rendered.contains("2.592"));
    }
}
