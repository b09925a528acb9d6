//! Job construction: validates user selections before any file is touched.

use crate::discovery::Discovery;
use crate::error::{JobError, Result};
use crate::formats::{all_input_extensions, TargetFormat};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Percentage scale modifier. 100 leaves pixel dimensions unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Scale(f64);

impl Scale {
    pub const IDENTITY: Scale = Scale(100.0);

    pub fn percent(value: f64) -> Result<Self> {
        if value.is_finite() && value > 0.0 {
            Ok(Scale(value))
        } else {
            Err(JobError::InvalidScale(value))
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn is_identity(&self) -> bool {
        self.0 == 100.0
    }

    /// Scaled dimensions, rounded half-up, never below one pixel.
    pub fn apply(&self, width: u32, height: u32) -> (u32, u32) {
        if self.is_identity() {
            return (width, height);
        }
        let scale_dim = |dim: u32| -> u32 {
            let scaled = (dim as f64 * self.0 / 100.0 + 0.5).floor();
            scaled.clamp(1.0, u32::MAX as f64) as u32
        };
        (scale_dim(width), scale_dim(height))
    }
}

impl Default for Scale {
    fn default() -> Self {
        Scale::IDENTITY
    }
}

/// Raw user selections, as collected by the front end.
#[derive(Debug, Clone)]
pub struct JobSettings {
    pub input_dir: PathBuf,
    /// Extensions to pick up; empty means every supported image extension.
    pub input_extensions: Vec<String>,
    pub output_dir: PathBuf,
    /// Output format identifiers in processing order.
    pub formats: Vec<String>,
    /// Percentage; `None` means unchanged.
    pub scale: Option<f64>,
    pub recursive: bool,
    pub sorted: bool,
    /// Replace files already on disk instead of picking a conflicting name.
    pub overwrite_existing: bool,
    /// Worker count for the write phase; 1 keeps everything on one thread.
    pub jobs: usize,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::new(),
            input_extensions: Vec::new(),
            output_dir: PathBuf::new(),
            formats: vec![TargetFormat::Jpeg.extension().to_string()],
            scale: None,
            recursive: false,
            sorted: false,
            overwrite_existing: false,
            jobs: 1,
        }
    }
}

/// A validated, immutable batch job.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    discovery: Discovery,
    formats: Vec<TargetFormat>,
    scale: Scale,
    output_dir: PathBuf,
    overwrite_existing: bool,
    jobs: usize,
}

impl ConversionJob {
    pub fn new(settings: JobSettings) -> Result<Self> {
        let formats = parse_formats(&settings.formats)?;
        let scale = match settings.scale {
            Some(value) => Scale::percent(value)?,
            None => Scale::IDENTITY,
        };

        let extensions = if settings.input_extensions.is_empty() {
            all_input_extensions()
        } else {
            settings.input_extensions
        };
        let discovery = Discovery::new(&settings.input_dir, &extensions)?
            .recursive(settings.recursive)
            .sorted(settings.sorted);

        let output_dir = prepare_output_dir(&settings.output_dir)?;

        tracing::debug!(
            input = %discovery.root().display(),
            extensions = ?discovery.extensions(),
            output = %output_dir.display(),
            formats = ?formats,
            scale = scale.value(),
            "Conversion job validated"
        );

        Ok(Self {
            discovery,
            formats,
            scale,
            output_dir,
            overwrite_existing: settings.overwrite_existing,
            jobs: settings.jobs.max(1),
        })
    }

    pub fn discovery(&self) -> &Discovery {
        &self.discovery
    }

    pub fn formats(&self) -> &[TargetFormat] {
        &self.formats
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn overwrite_existing(&self) -> bool {
        self.overwrite_existing
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }
}

fn parse_formats(raw: &[String]) -> Result<Vec<TargetFormat>> {
    let mut formats = Vec::with_capacity(raw.len());
    for entry in raw.iter().filter(|s| !s.trim().is_empty()) {
        let format: TargetFormat = entry.parse()?;
        if !formats.contains(&format) {
            formats.push(format);
        }
    }
    if formats.is_empty() {
        return Err(JobError::NoTargetFormats);
    }
    Ok(formats)
}

/// Creates the output directory if needed and checks that it accepts writes.
fn prepare_output_dir(dir: &Path) -> Result<PathBuf> {
    let unwritable = |reason: String| JobError::OutputDirUnwritable {
        path: dir.to_path_buf(),
        reason,
    };

    if dir.as_os_str().is_empty() {
        return Err(unwritable("no output directory given".to_string()));
    }
    shared_utils::check_dangerous_directory(dir).map_err(|e| unwritable(e.to_string()))?;

    std::fs::create_dir_all(dir).map_err(|e| unwritable(e.to_string()))?;
    let canonical = dir.canonicalize().map_err(|e| unwritable(e.to_string()))?;
    if !canonical.is_dir() {
        return Err(unwritable("not a directory".to_string()));
    }

    tempfile::NamedTempFile::new_in(&canonical).map_err(|e| unwritable(e.to_string()))?;

    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn settings(input: &Path, output: &Path) -> JobSettings {
        JobSettings {
            input_dir: input.to_path_buf(),
            output_dir: output.to_path_buf(),
            ..JobSettings::default()
        }
    }

    #[test]
    fn test_scale_identity() {
        assert!(Scale::IDENTITY.is_identity());
        assert_eq!(Scale::IDENTITY.apply(640, 480), (640, 480));
        assert_eq!(Scale::percent(100.0).unwrap().apply(3, 7), (3, 7));
    }

    #[test]
    fn test_scale_half_rounds_half_up() {
        let half = Scale::percent(50.0).unwrap();
        assert_eq!(half.apply(640, 480), (320, 240));
        assert_eq!(half.apply(5, 3), (3, 2));
        assert_eq!(half.apply(1, 1), (1, 1));
    }

    #[test]
    fn test_scale_never_below_one_pixel() {
        let tiny = Scale::percent(1.0).unwrap();
        assert_eq!(tiny.apply(10, 10), (1, 1));
        assert_eq!(Scale::percent(200.0).unwrap().apply(3, 4), (6, 8));
    }

    #[test]
    fn test_scale_rejects_non_positive() {
        for bad in [0.0, -50.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(Scale::percent(bad), Err(JobError::InvalidScale(_))));
        }
    }

    #[test]
    fn test_job_defaults_to_jpeg() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();

        let job = ConversionJob::new(settings(input.path(), output.path())).unwrap();
        assert_eq!(job.formats(), &[TargetFormat::Jpeg]);
        assert!(job.scale().is_identity());
        assert_eq!(job.jobs(), 1);
        assert!(job.output_dir().is_absolute());
    }

    #[test]
    fn test_formats_deduplicated_in_order() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let mut s = settings(input.path(), output.path());
        s.formats = vec!["png".into(), "JPEG".into(), "jpg".into(), ".png".into()];

        let job = ConversionJob::new(s).unwrap();
        assert_eq!(job.formats(), &[TargetFormat::Png, TargetFormat::Jpeg]);
    }

    #[test]
    fn test_unsupported_format() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let mut s = settings(input.path(), output.path());
        s.formats = vec!["png".into(), "jxl".into()];

        let err = ConversionJob::new(s).unwrap_err();
        assert!(matches!(err, JobError::UnsupportedFormat(ref f) if f == "jxl"));
    }

    #[test]
    fn test_no_formats() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let mut s = settings(input.path(), output.path());
        s.formats = vec![];

        assert!(matches!(ConversionJob::new(s), Err(JobError::NoTargetFormats)));
    }

    #[test]
    fn test_invalid_scale() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let mut s = settings(input.path(), output.path());
        s.scale = Some(0.0);

        assert!(matches!(ConversionJob::new(s), Err(JobError::InvalidScale(_))));
    }

    #[test]
    fn test_missing_input_dir() {
        let temp = TempDir::new().unwrap();
        let s = settings(&temp.path().join("missing"), &temp.path().join("out"));

        assert!(matches!(
            ConversionJob::new(s),
            Err(JobError::DirectoryNotFound { .. })
        ));
        assert!(!temp.path().join("out").exists());
    }

    #[test]
    fn test_output_dir_created() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let nested = output.path().join("a").join("b");

        let job = ConversionJob::new(settings(input.path(), &nested)).unwrap();
        assert!(nested.is_dir());
        assert_eq!(std::fs::read_dir(job.output_dir()).unwrap().count(), 0);
    }

    #[test]
    fn test_output_path_is_a_file() {
        let input = TempDir::new().unwrap();
        let blocker = input.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();

        let err = ConversionJob::new(settings(input.path(), &blocker)).unwrap_err();
        assert!(matches!(err, JobError::OutputDirUnwritable { .. }));
    }

    #[test]
    fn test_protected_output_dir() {
        let input = TempDir::new().unwrap();
        let err = ConversionJob::new(settings(input.path(), Path::new("/usr"))).unwrap_err();
        assert!(matches!(err, JobError::OutputDirUnwritable { .. }));
    }
}
