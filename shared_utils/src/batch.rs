//! Batch Processing Module
//!
//! Running counters for batch operations and extension helpers used when
//! selecting batch inputs.

use serde::Serialize;
use std::path::Path;

/// Lower-cased extension of `path` without the dot, empty when absent.
pub fn extension_lowercase(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

/// Normalizes a user-supplied extension: trims whitespace, strips leading
/// dots and lower-cases. `".PNG"` and `"png"` both become `"png"`.
pub fn normalize_extension(raw: &str) -> String {
    raw.trim().trim_start_matches('.').to_lowercase()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchCounts {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success(&mut self) {
        self.total += 1;
        self.succeeded += 1;
    }

    pub fn fail(&mut self) {
        self.total += 1;
        self.failed += 1;
    }

    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.succeeded as f64 / self.total as f64) * 100.0
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}
