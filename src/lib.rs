//! PhotoAudit Core - Archive Naming and Provenance Auditor
//!
//! # The Rules (Non-Negotiable)
//! 1. Only DNG, TIFF, and JPEG belong in the archive
//! 2. JPEGs are previews and are never checked
//! 3. Every processed name follows the grammar and names a known camera original
//! 4. The preserved raw file name matches the processed name
//! 5. Merged HDRs say `-HDR`, merged panoramas say `-Pano`
//! 6. TIFFs are edits: `.tif` with `-Edit`

pub mod patterns;
pub mod filename;
pub mod record;
pub mod validation;
pub mod hashing;
pub mod provider;
pub mod pipeline;
pub mod config;

pub use patterns::{PatternRegistry, RawExtension, RawOriginPattern, OriginMatcher, SequenceMatcher};
pub use filename::{FilenameParser, ParsedFilename, ProcessedExtension, parse_file_name};
pub use record::{FileType, MetadataRecord, parse_records};
pub use validation::{ConsistencyChecker, Correction, RecordCheck, ValidationOutcome, Violation, ViolationKind};
pub use hashing::batch_digest;
pub use provider::{CorrectionWriter, DryRun, ExifTool, MetadataProvider, ProviderError, SnapshotProvider};
pub use pipeline::{ArchiveReport, AuditPipeline, BatchError, BatchReport};
pub use config::{AuditConfig, ConfigError};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
