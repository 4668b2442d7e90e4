//! Batch processing job description

use crate::error::{ProcessingError, Result};
use photomon_algorithms::imagery::{IndexKind, LutKind, PixelRepresentation};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything a batch run needs to know, fixed for the duration of the run.
///
/// Can be loaded from JSON; every field except the directories has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingJob {
    pub source_dir: PathBuf,
    pub dest_dir: PathBuf,
    /// Extension of input files, matched case-sensitively without the dot
    pub file_extension: String,
    pub calibration_enabled: bool,
    pub index: IndexKind,
    pub output_scale_from: f64,
    pub output_scale_to: f64,
    pub lut: LutKind,
    /// Worker threads: 0 = all cores, 1 = sequential
    pub workers: usize,
}

impl Default for ProcessingJob {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::new(),
            dest_dir: PathBuf::new(),
            file_extension: "JPG".to_string(),
            calibration_enabled: false,
            index: IndexKind::None,
            output_scale_from: 0.0,
            output_scale_to: 255.0,
            lut: LutKind::None,
            workers: 0,
        }
    }
}

impl ProcessingJob {
    pub fn new(source_dir: impl Into<PathBuf>, dest_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            dest_dir: dest_dir.into(),
            ..Default::default()
        }
    }

    /// Load a job from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Output representation this job produces
    pub fn representation(&self) -> PixelRepresentation {
        PixelRepresentation::select(self.output_scale_to, !self.index.is_none(), self.lut)
    }

    /// Configuration checks that need no file I/O
    pub fn validate(&self) -> Result<()> {
        if same_directory(&self.source_dir, &self.dest_dir) {
            return Err(ProcessingError::Config(
                "input and output directories cannot be the same".into(),
            ));
        }
        if self.file_extension.is_empty() {
            return Err(ProcessingError::Config("file extension is empty".into()));
        }
        if !self.output_scale_from.is_finite() || !self.output_scale_to.is_finite() {
            return Err(ProcessingError::Config("output scale must be finite".into()));
        }
        if !self.representation().is_supported() {
            return Err(ProcessingError::UnsupportedOutput(
                "paletted index output is not implemented".into(),
            ));
        }
        Ok(())
    }

    /// Output path for `source`: the matched extension becomes the output
    /// format's extension, and the index name is prepended when an index is
    /// computed.
    pub fn output_path(&self, source: &Path) -> PathBuf {
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let base = name
            .strip_suffix(self.file_extension.as_str())
            .unwrap_or(&name);
        let mut out = format!("{}{}", base, self.representation().file_extension());
        if let Some(prefix) = self.index.file_prefix() {
            out = format!("{}-{}", prefix, out);
        }
        self.dest_dir.join(out)
    }
}

/// Whether two paths name the same directory, following `..` and symlinks
/// when both exist
fn same_directory(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let job = ProcessingJob::new("in", "out");
        assert_eq!(job.file_extension, "JPG");
        assert_eq!(job.output_scale_to, 255.0);
        assert_eq!(job.representation(), PixelRepresentation::UInt8All);
        assert!(job.validate().is_ok());
    }

    #[test]
    fn test_same_directories() {
        let job = ProcessingJob::new("photos", "photos");
        assert!(matches!(job.validate(), Err(ProcessingError::Config(_))));
    }

    #[test]
    fn test_aliased_directories() {
        let dir = tempfile::tempdir().unwrap();
        let name = dir.path().file_name().unwrap();
        let alias = dir.path().join("..").join(name);

        let job = ProcessingJob::new(dir.path(), &alias);
        assert!(matches!(job.validate(), Err(ProcessingError::Config(_))));

        let other = dir.path().join("out");
        std::fs::create_dir(&other).unwrap();
        assert!(ProcessingJob::new(dir.path(), &other).validate().is_ok());
    }

    #[test]
    fn test_palette_index_unsupported() {
        let job = ProcessingJob {
            index: IndexKind::ndvi(),
            lut: LutKind::Palette,
            ..ProcessingJob::new("in", "out")
        };
        assert!(matches!(
            job.validate(),
            Err(ProcessingError::UnsupportedOutput(_))
        ));

        // a float output never reaches the palette branch
        let job = ProcessingJob {
            output_scale_to: 1.0,
            ..job
        };
        assert!(job.validate().is_ok());
    }

    #[test]
    fn test_output_path() {
        let job = ProcessingJob::new("in", "out");
        assert_eq!(
            job.output_path(Path::new("in/IMG_0001.JPG")),
            PathBuf::from("out/IMG_0001.tiff")
        );

        let job = ProcessingJob {
            index: IndexKind::ndvi(),
            ..job
        };
        assert_eq!(
            job.output_path(Path::new("in/IMG_0001.JPG")),
            PathBuf::from("out/NDVI-IMG_0001.tiff")
        );
    }

    #[test]
    fn test_json_job() {
        let json = r#"{
            "source_dir": "raw",
            "dest_dir": "ndvi",
            "calibration_enabled": true,
            "index": {"kind": "ndvi", "red_band": 1, "nir_band": 3},
            "output_scale_to": 1.0
        }"#;
        let job: ProcessingJob = serde_json::from_str(json).unwrap();
        assert_eq!(job.file_extension, "JPG");
        assert_eq!(job.index, IndexKind::ndvi());
        assert_eq!(job.representation(), PixelRepresentation::Float32);
    }
}
