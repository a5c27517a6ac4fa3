//! Collaborators - Metadata In, Corrections Out
//!
//! The engine never touches image files. It asks a provider for a batch of
//! records and hands corrections to a writer.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::fs;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::record::{parse_records, MetadataRecord};
use crate::validation::Correction;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{tool} exited with {status}: {stderr}")]
    Tool {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("Invalid metadata output: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Metadata output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Snapshot not found: {0}")]
    SnapshotMissing(PathBuf),
}

/// Batch metadata provider - one ordered batch per archive subdirectory
pub trait MetadataProvider {
    fn fetch(&mut self, dir: &Path) -> Result<Vec<MetadataRecord>, ProviderError>;

    /// Post-validation cleanup. Only called after the whole batch passed.
    fn release(&mut self, _dir: &Path) -> Result<(), ProviderError> {
        Ok(())
    }
}

/// Metadata writer - applies preserved file name corrections
pub trait CorrectionWriter {
    fn apply(&mut self, correction: &Correction) -> Result<(), ProviderError>;
}

/// File names are passed and printed as UTF-8 so paths survive the round trip.
const CHARSET: [&str; 2] = ["-charset", "filename=utf8"];

const READ_TAGS: [&str; 6] = [
    "-json",
    "-FileName",
    "-FileType",
    "-PreservedFileName",
    "-IsMergedHDR",
    "-IsMergedPanorama",
];

/// Backups ExifTool leaves next to a file it rewrote without `-overwrite_original`
const BACKUP_SUFFIX: &str = "_original";

/// Snapshot location for one archive subdirectory: `<snapshot_dir>/<name>.json`
pub fn snapshot_file(snapshot_dir: &Path, dir: &Path) -> PathBuf {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "archive".to_string());
    snapshot_dir.join(format!("{}.json", name))
}

/// ExifTool process, used for both reading and writing
#[derive(Debug, Clone)]
pub struct ExifTool {
    binary: PathBuf,
    cache_dir: Option<PathBuf>,
    clean_backups: bool,
}

impl ExifTool {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            cache_dir: None,
            clean_backups: false,
        }
    }

    /// Save each raw `-json` batch where [`SnapshotProvider`] can read it back.
    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(cache_dir.into());
        self
    }

    /// Remove `*_original` backups once a directory has fully passed.
    pub fn with_clean_backups(mut self, clean: bool) -> Self {
        self.clean_backups = clean;
        self
    }

    fn tool_error(&self, status: std::process::ExitStatus, stderr: &[u8]) -> ProviderError {
        ProviderError::Tool {
            tool: self.binary.display().to_string(),
            status: status.to_string(),
            stderr: String::from_utf8_lossy(stderr).trim().to_string(),
        }
    }

    fn cache(&self, dir: &Path, json: &str) -> Result<(), ProviderError> {
        if let Some(cache_dir) = &self.cache_dir {
            fs::create_dir_all(cache_dir)?;
            let path = snapshot_file(cache_dir, dir);
            fs::write(&path, json)?;
            debug!("Cached metadata for {} at {}", dir.display(), path.display());
        }
        Ok(())
    }
}

impl Default for ExifTool {
    fn default() -> Self {
        Self::new("exiftool")
    }
}

impl MetadataProvider for ExifTool {
    fn fetch(&mut self, dir: &Path) -> Result<Vec<MetadataRecord>, ProviderError> {
        debug!("Running {} on {}", self.binary.display(), dir.display());
        let output = Command::new(&self.binary)
            .args(CHARSET)
            .args(READ_TAGS)
            .arg(dir)
            .output()?;

        // ExifTool exits non-zero when some files fail but still prints the rest
        if output.stdout.iter().all(|b| b.is_ascii_whitespace()) {
            if output.status.success() {
                return Ok(vec![]);
            }
            return Err(self.tool_error(output.status, &output.stderr));
        }
        if !output.status.success() {
            warn!(
                "{} reported errors for {}: {}",
                self.binary.display(),
                dir.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let stdout = String::from_utf8(output.stdout)?;
        let records = parse_records(&stdout)?;
        self.cache(dir, &stdout)?;
        Ok(records)
    }

    fn release(&mut self, dir: &Path) -> Result<(), ProviderError> {
        if !self.clean_backups {
            return Ok(());
        }

        let mut removed = 0;
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let is_backup = path
                .file_name()
                .map_or(false, |n| n.to_string_lossy().ends_with(BACKUP_SUFFIX));
            if is_backup && path.is_file() {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        if removed > 0 {
            info!("Removed {} ExifTool backups from {}", removed, dir.display());
        }
        Ok(())
    }
}

impl CorrectionWriter for ExifTool {
    fn apply(&mut self, correction: &Correction) -> Result<(), ProviderError> {
        let output = Command::new(&self.binary)
            .args(CHARSET)
            .arg("-overwrite_original")
            .arg(format!("-PreservedFileName={}", correction.expected_preserved_file_name))
            .arg(&correction.source_file_path)
            .output()?;

        if !output.status.success() {
            return Err(self.tool_error(output.status, &output.stderr));
        }
        Ok(())
    }
}

/// Reads batches captured earlier with `exiftool -json`, one file per
/// subdirectory: `<snapshot_dir>/<subdirectory name>.json`.
#[derive(Debug, Clone)]
pub struct SnapshotProvider {
    snapshot_dir: PathBuf,
}

impl SnapshotProvider {
    pub fn new(snapshot_dir: impl Into<PathBuf>) -> Self {
        Self { snapshot_dir: snapshot_dir.into() }
    }

    pub fn snapshot_path(&self, dir: &Path) -> PathBuf {
        snapshot_file(&self.snapshot_dir, dir)
    }
}

impl MetadataProvider for SnapshotProvider {
    fn fetch(&mut self, dir: &Path) -> Result<Vec<MetadataRecord>, ProviderError> {
        let path = self.snapshot_path(dir);
        if !path.exists() {
            return Err(ProviderError::SnapshotMissing(path));
        }
        let content = fs::read_to_string(&path)?;
        Ok(parse_records(&content)?)
    }
}

/// Report-only writer. Collects corrections without touching any file.
#[derive(Debug, Default)]
pub struct DryRun {
    pub corrections: Vec<Correction>,
}

impl CorrectionWriter for DryRun {
    fn apply(&mut self, correction: &Correction) -> Result<(), ProviderError> {
        debug!(
            "dry run: would set PreservedFileName={} on {}",
            correction.expected_preserved_file_name, correction.source_file_path
        );
        self.corrections.push(correction.clone());
        Ok(())
    }
}
