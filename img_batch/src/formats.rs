//! Supported output formats and the extension aliases used for input matching.

use crate::error::JobError;
use serde::{Deserialize, Serialize};
use shared_utils::normalize_extension;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    Bmp,
    Gif,
    Jpeg,
    Png,
    Tiff,
    Webp,
}

impl TargetFormat {
    pub const ALL: [TargetFormat; 6] = [
        TargetFormat::Bmp,
        TargetFormat::Gif,
        TargetFormat::Jpeg,
        TargetFormat::Png,
        TargetFormat::Tiff,
        TargetFormat::Webp,
    ];

    /// Extension written on output files.
    pub fn extension(&self) -> &'static str {
        match self {
            TargetFormat::Bmp => "bmp",
            TargetFormat::Gif => "gif",
            TargetFormat::Jpeg => "jpg",
            TargetFormat::Png => "png",
            TargetFormat::Tiff => "tiff",
            TargetFormat::Webp => "webp",
        }
    }

    /// Every extension recognised as this format, canonical first.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            TargetFormat::Bmp => &["bmp"],
            TargetFormat::Gif => &["gif"],
            TargetFormat::Jpeg => &["jpg", "jpeg"],
            TargetFormat::Png => &["png"],
            TargetFormat::Tiff => &["tiff", "tif"],
            TargetFormat::Webp => &["webp"],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetFormat::Bmp => "BMP",
            TargetFormat::Gif => "GIF",
            TargetFormat::Jpeg => "JPEG",
            TargetFormat::Png => "PNG",
            TargetFormat::Tiff => "TIFF",
            TargetFormat::Webp => "WebP",
        }
    }

    pub fn image_format(&self) -> image::ImageFormat {
        match self {
            TargetFormat::Bmp => image::ImageFormat::Bmp,
            TargetFormat::Gif => image::ImageFormat::Gif,
            TargetFormat::Jpeg => image::ImageFormat::Jpeg,
            TargetFormat::Png => image::ImageFormat::Png,
            TargetFormat::Tiff => image::ImageFormat::Tiff,
            TargetFormat::Webp => image::ImageFormat::WebP,
        }
    }

    /// Looks up a format by any of its aliases, case-insensitive, dot optional.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = normalize_extension(ext);
        Self::ALL
            .into_iter()
            .find(|format| format.aliases().contains(&ext.as_str()))
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for TargetFormat {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s).ok_or_else(|| JobError::UnsupportedFormat(s.trim().to_string()))
    }
}

/// Expands requested input extensions with the aliases of any known format.
///
/// Order follows the request; duplicates and empty entries are dropped.
pub fn expand_extensions<S: AsRef<str>>(requested: &[S]) -> Vec<String> {
    let mut expanded: Vec<String> = Vec::new();
    let mut push = |ext: &str| {
        if !ext.is_empty() && !expanded.iter().any(|e| e == ext) {
            expanded.push(ext.to_string());
        }
    };

    for raw in requested {
        let ext = normalize_extension(raw.as_ref());
        push(&ext);
        if let Some(format) = TargetFormat::from_extension(&ext) {
            for alias in format.aliases() {
                push(alias);
            }
        }
    }
    expanded
}

/// Every alias of every supported format, for "all images" discovery.
pub fn all_input_extensions() -> Vec<String> {
    TargetFormat::ALL
        .iter()
        .flat_map(|f| f.aliases().iter().map(|a| a.to_string()))
        .collect()
}
