//! Imaging backend: decode, scale and encode.
//!
//! The orchestrator only talks to [`ImageBackend`], so tests can swap in a
//! backend that injects failures without real image files.

use crate::error::UnitError;
use crate::formats::TargetFormat;
use crate::job::Scale;
use image::imageops::FilterType;
use image::{DynamicImage, ImageError, ImageReader, Limits};
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub trait ImageBackend: Sync {
    type Image;

    fn decode(&self, input: &Path) -> Result<Self::Image, UnitError>;

    /// Only called when `scale` is not the identity.
    fn scale(&self, image: &Self::Image, scale: Scale) -> Result<Self::Image, UnitError>;

    fn encode(
        &self,
        image: &Self::Image,
        format: TargetFormat,
        output: &Path,
    ) -> Result<(), UnitError>;
}

/// Bytes per pixel of the `f32` RGBA buffer `resize_exact` works in.
const RESIZE_BYTES_PER_PIXEL: u128 = 16;

/// Backend built on the `image` crate.
#[derive(Debug, Clone, Copy)]
pub struct ImageCrateBackend {
    filter: FilterType,
    jpeg_quality: u8,
    /// Largest resize working buffer, in bytes.
    max_alloc: u64,
}

impl Default for ImageCrateBackend {
    fn default() -> Self {
        Self {
            filter: FilterType::CatmullRom,
            jpeg_quality: 90,
            max_alloc: Limits::default().max_alloc.unwrap_or(512 * 1024 * 1024),
        }
    }
}

impl ImageCrateBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn with_max_alloc(mut self, bytes: u64) -> Self {
        self.max_alloc = bytes;
        self
    }

    /// Rejects resizes whose working buffer would exceed `max_alloc`.
    fn check_resize_budget(&self, from: (u32, u32), to: (u32, u32)) -> Result<(), UnitError> {
        // The horizontal pass runs on the wider of the two rows.
        let row = u128::from(from.0.max(to.0));
        let needed = row * u128::from(to.1) * RESIZE_BYTES_PER_PIXEL;
        if needed > u128::from(self.max_alloc) {
            return Err(UnitError::EncodeFailure(format!(
                "scaled size {}x{} needs {} bytes, limit is {}",
                to.0, to.1, needed, self.max_alloc
            )));
        }
        Ok(())
    }

    fn write(&self, image: &DynamicImage, format: TargetFormat, output: &Path) -> Result<(), UnitError> {
        let file = File::create(output).map_err(|e| UnitError::WriteFailure(e.to_string()))?;
        let mut writer = BufWriter::new(file);

        let encoded = match format {
            TargetFormat::Jpeg => {
                let encoder =
                    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut writer, self.jpeg_quality);
                image.write_with_encoder(encoder)
            }
            _ => image.write_to(&mut writer, format.image_format()),
        };
        encoded.map_err(|e| match e {
            ImageError::IoError(io) => UnitError::WriteFailure(io.to_string()),
            other => UnitError::EncodeFailure(other.to_string()),
        })?;

        writer
            .flush()
            .map_err(|e| UnitError::WriteFailure(e.to_string()))
    }
}

/// Converts to a pixel layout the target encoder accepts.
fn prepare_for(image: &DynamicImage, format: TargetFormat) -> Cow<'_, DynamicImage> {
    use DynamicImage::*;

    match (format, image) {
        (TargetFormat::Png, _) => Cow::Borrowed(image),
        (TargetFormat::Jpeg, ImageRgb8(_) | ImageLuma8(_)) => Cow::Borrowed(image),
        (TargetFormat::Jpeg, _) => Cow::Owned(ImageRgb8(image.to_rgb8())),
        (TargetFormat::Bmp, ImageRgb8(_) | ImageRgba8(_) | ImageLuma8(_) | ImageLumaA8(_)) => {
            Cow::Borrowed(image)
        }
        (TargetFormat::Tiff, ImageRgb8(_) | ImageRgba8(_) | ImageLuma8(_) | ImageRgb16(_) | ImageRgba16(_) | ImageLuma16(_)) => {
            Cow::Borrowed(image)
        }
        (TargetFormat::Gif | TargetFormat::Webp, ImageRgb8(_) | ImageRgba8(_)) => Cow::Borrowed(image),
        (_, _) if image.color().has_alpha() => Cow::Owned(ImageRgba8(image.to_rgba8())),
        (_, _) => Cow::Owned(ImageRgb8(image.to_rgb8())),
    }
}

impl ImageBackend for ImageCrateBackend {
    type Image = DynamicImage;

    fn decode(&self, input: &Path) -> Result<DynamicImage, UnitError> {
        ImageReader::open(input)
            .map_err(|e| UnitError::DecodeFailure(e.to_string()))?
            .with_guessed_format()
            .map_err(|e| UnitError::DecodeFailure(e.to_string()))?
            .decode()
            .map_err(|e| UnitError::DecodeFailure(e.to_string()))
    }

    fn scale(&self, image: &DynamicImage, scale: Scale) -> Result<DynamicImage, UnitError> {
        let from = (image.width(), image.height());
        let (width, height) = scale.apply(from.0, from.1);
        self.check_resize_budget(from, (width, height))?;
        tracing::debug!(from = ?from, to = ?(width, height), "Resizing");
        Ok(image.resize_exact(width, height, self.filter))
    }

    fn encode(&self, image: &DynamicImage, format: TargetFormat, output: &Path) -> Result<(), UnitError> {
        let prepared = prepare_for(image, format);
        let result = self.write(&prepared, format, output);
        if result.is_err() && output.exists() {
            if let Err(e) = std::fs::remove_file(output) {
                tracing::warn!(path = %output.display(), error = %e, "Failed to remove partial output");
            }
        }
        result
    }
}
