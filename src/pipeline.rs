//! Audit Pipeline - Batches and Archives
//!
//! Records are checked one at a time in delivery order. The first fatal
//! violation aborts the batch; other subdirectories still run.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::hashing::batch_digest;
use crate::provider::{CorrectionWriter, MetadataProvider, ProviderError};
use crate::record::{FileType, MetadataRecord};
use crate::validation::{ConsistencyChecker, Correction, Violation};
use crate::ENGINE_VERSION;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Batch {batch} failed: {violation}")]
    Violation { batch: String, violation: Violation },

    #[error("Batch {batch}: metadata provider failed: {source}")]
    Provider {
        batch: String,
        #[source]
        source: ProviderError,
    },

    #[error("Batch {batch}: could not correct {file}: {source}")]
    CorrectionFailed {
        batch: String,
        file: String,
        #[source]
        source: ProviderError,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BatchError {
    /// Validation failures, as opposed to tool or I/O trouble
    pub fn is_violation(&self) -> bool {
        matches!(self, BatchError::Violation { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub batch: String,
    pub checked: usize,
    pub passed: usize,
    pub skipped_jpeg: usize,
    pub corrections: Vec<Correction>,
    pub digest: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFailure {
    pub batch: String,
    pub error: String,
    #[serde(default)]
    pub violation: Option<Violation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveReport {
    pub run_id: String,
    pub engine_version: String,
    pub started_at: DateTime<Utc>,
    pub batches: Vec<BatchReport>,
    pub failures: Vec<BatchFailure>,
}

impl ArchiveReport {
    pub fn success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn has_violations(&self) -> bool {
        self.failures.iter().any(|f| f.violation.is_some())
    }
}

/// The audit pipeline - single entry point for archive checks
pub struct AuditPipeline {
    checker: ConsistencyChecker,
}

impl AuditPipeline {
    pub fn new(checker: ConsistencyChecker) -> Self {
        Self { checker }
    }

    pub fn checker(&self) -> &ConsistencyChecker {
        &self.checker
    }

    /// Check a delivered batch. Corrections go to `writer` as they are found.
    pub fn audit_batch(
        &self,
        batch: &str,
        records: &[MetadataRecord],
        writer: &mut dyn CorrectionWriter,
    ) -> Result<BatchReport, BatchError> {
        info!("Checking {} records in {}", records.len(), batch);

        let mut report = BatchReport {
            batch: batch.to_string(),
            checked: 0,
            passed: 0,
            skipped_jpeg: 0,
            corrections: vec![],
            digest: batch_digest(records)?,
        };

        for record in records {
            report.checked += 1;
            let result = self.checker.evaluate(record);

            // Corrections are issued before a later violation on the same record aborts
            if let Some(correction) = result.correction {
                warn!(
                    "{}: PreservedFileName {:?} should be {:?}",
                    record.file_name,
                    correction.current_preserved_file_name,
                    correction.expected_preserved_file_name
                );
                writer.apply(&correction).map_err(|source| BatchError::CorrectionFailed {
                    batch: batch.to_string(),
                    file: record.file_name.clone(),
                    source,
                })?;
                report.corrections.push(correction);
            } else if result.violation.is_none() {
                if record.file_type == FileType::Jpeg {
                    report.skipped_jpeg += 1;
                } else {
                    report.passed += 1;
                }
                debug!("ok: {}", record.file_name);
            }

            if let Some(violation) = result.violation {
                error!("{}: {}", batch, violation);
                return Err(BatchError::Violation {
                    batch: batch.to_string(),
                    violation,
                });
            }
        }

        info!(
            "{}: {} passed, {} jpeg skipped, {} corrected",
            batch,
            report.passed,
            report.skipped_jpeg,
            report.corrections.len()
        );
        Ok(report)
    }

    /// Fetch, check, and release one subdirectory. Cleanup only runs after success.
    pub fn audit_directory(
        &self,
        dir: &Path,
        provider: &mut dyn MetadataProvider,
        writer: &mut dyn CorrectionWriter,
    ) -> Result<BatchReport, BatchError> {
        let batch = dir.display().to_string();
        let records = provider.fetch(dir).map_err(|source| BatchError::Provider {
            batch: batch.clone(),
            source,
        })?;

        let report = self.audit_batch(&batch, &records, writer)?;

        provider.release(dir).map_err(|source| BatchError::Provider {
            batch: batch.clone(),
            source,
        })?;
        Ok(report)
    }

    /// Audit every subdirectory independently, in the order given.
    pub fn audit_archive(
        &self,
        dirs: &[PathBuf],
        provider: &mut dyn MetadataProvider,
        writer: &mut dyn CorrectionWriter,
    ) -> ArchiveReport {
        let mut report = ArchiveReport {
            run_id: Uuid::new_v4().to_string(),
            engine_version: ENGINE_VERSION.to_string(),
            started_at: Utc::now(),
            batches: vec![],
            failures: vec![],
        };

        for dir in dirs {
            match self.audit_directory(dir, provider, writer) {
                Ok(batch) => report.batches.push(batch),
                Err(e) => {
                    error!("{}", e);
                    let violation = match &e {
                        BatchError::Violation { violation, .. } => Some(violation.clone()),
                        _ => None,
                    };
                    report.failures.push(BatchFailure {
                        batch: dir.display().to_string(),
                        error: e.to_string(),
                        violation,
                    });
                }
            }
        }

        report
    }
}

impl Default for AuditPipeline {
    fn default() -> Self {
        Self::new(ConsistencyChecker::default())
    }
}
