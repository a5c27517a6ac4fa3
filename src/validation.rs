//! Consistency Checker - Filename vs. Metadata
//!
//! Rules run in a fixed order and stop at the first violation.
//! A stale preserved file name is the only recoverable finding.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::filename::{FilenameParser, ParsedFilename, ProcessedExtension};
use crate::patterns::PatternRegistry;
use crate::record::{FileType, MetadataRecord};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    UnexpectedFileType,
    InvalidFileNameFormat,
    MissingHdrSuffix,
    MissingPanoSuffix,
    MissingEditMarker,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ViolationKind::UnexpectedFileType => "unexpected file type",
            ViolationKind::InvalidFileNameFormat => "invalid file name format",
            ViolationKind::MissingHdrSuffix => "missing -HDR suffix",
            ViolationKind::MissingPanoSuffix => "missing -Pano suffix",
            ViolationKind::MissingEditMarker => "missing -Edit marker",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Violation {
    pub kind: ViolationKind,
    pub file_name: String,
    pub source_file: String,
    pub detail: String,
}

impl Violation {
    fn new(kind: ViolationKind, record: &MetadataRecord, detail: impl Into<String>) -> Self {
        Self {
            kind,
            file_name: record.file_name.clone(),
            source_file: record.source_file_path.clone(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {}: {}", self.kind, self.file_name, self.detail)
    }
}

/// Preserved file name to write back through the metadata writer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Correction {
    pub source_file_path: String,
    pub expected_preserved_file_name: String,
    pub current_preserved_file_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ValidationOutcome {
    Pass,
    Violation(Violation),
    CorrectionNeeded(Correction),
}

impl ValidationOutcome {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ValidationOutcome::Violation(_))
    }
}

/// Everything one record produced: at most one preserved-name correction and
/// at most one violation (the first failing rule).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordCheck {
    pub correction: Option<Correction>,
    pub violation: Option<Violation>,
}

impl RecordCheck {
    fn fatal(violation: Violation) -> Self {
        Self { correction: None, violation: Some(violation) }
    }

    pub fn into_outcome(self) -> ValidationOutcome {
        match (self.violation, self.correction) {
            (Some(violation), _) => ValidationOutcome::Violation(violation),
            (None, Some(correction)) => ValidationOutcome::CorrectionNeeded(correction),
            (None, None) => ValidationOutcome::Pass,
        }
    }
}

/// What a suffix rule sees: the record and its parsed file name
pub struct RuleContext<'a> {
    pub record: &'a MetadataRecord,
    pub parsed: &'a ParsedFilename,
}

/// Record rule trait - produces at most one violation
pub trait RecordRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<Violation>;
}

// --- Concrete Rules ---

/// Merged HDR must carry `-HDR`. A suffix without the flag is accepted.
pub struct HdrSuffixRule;

impl RecordRule for HdrSuffixRule {
    fn name(&self) -> &'static str { "hdr_suffix" }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<Violation> {
        if ctx.record.is_merged_hdr && !ctx.parsed.is_merged_hdr {
            return Some(Violation::new(
                ViolationKind::MissingHdrSuffix,
                ctx.record,
                "metadata marks a merged HDR but the name has no -HDR suffix",
            ));
        }
        None
    }
}

/// Merged panorama must carry `-Pano`. A suffix without the flag is accepted.
pub struct PanoSuffixRule;

impl RecordRule for PanoSuffixRule {
    fn name(&self) -> &'static str { "pano_suffix" }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<Violation> {
        if ctx.record.is_merged_panorama && !ctx.parsed.is_merged_panorama {
            return Some(Violation::new(
                ViolationKind::MissingPanoSuffix,
                ctx.record,
                "metadata marks a merged panorama but the name has no -Pano suffix",
            ));
        }
        None
    }
}

/// TIFFs are always edits: `.tif` extension plus `-Edit` marker.
pub struct TiffEditRule;

impl RecordRule for TiffEditRule {
    fn name(&self) -> &'static str { "tiff_edit" }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<Violation> {
        if ctx.record.file_type != FileType::Tiff {
            return None;
        }
        if ctx.parsed.extension != ProcessedExtension::Tif {
            return Some(Violation::new(
                ViolationKind::MissingEditMarker,
                ctx.record,
                format!("TIFF file has .{} extension, expected .tif", ctx.parsed.extension.as_str()),
            ));
        }
        if !ctx.parsed.is_edit {
            return Some(Violation::new(
                ViolationKind::MissingEditMarker,
                ctx.record,
                "TIFF file name has no -Edit suffix",
            ));
        }
        None
    }
}

/// Checker orchestrates the gates and the suffix rules
pub struct ConsistencyChecker {
    registry: PatternRegistry,
    rules: Vec<Box<dyn RecordRule>>,
}

impl ConsistencyChecker {
    pub fn new(registry: PatternRegistry) -> Self {
        Self {
            registry,
            rules: vec![
                Box::new(HdrSuffixRule),
                Box::new(PanoSuffixRule),
                Box::new(TiffEditRule),
            ],
        }
    }

    pub fn registry(&self) -> &PatternRegistry {
        &self.registry
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Run every rule in order on one record. Pure.
    ///
    /// A stale preserved name does not stop evaluation: the correction is
    /// reported alongside any violation found by a later rule, so the
    /// caller can issue it before aborting.
    pub fn evaluate(&self, record: &MetadataRecord) -> RecordCheck {
        match record.file_type {
            FileType::Dng | FileType::Tiff => {}
            FileType::Jpeg => return RecordCheck::default(),
            FileType::Other(ref other) => {
                return RecordCheck::fatal(Violation::new(
                    ViolationKind::UnexpectedFileType,
                    record,
                    format!("file type {} is not one of DNG, TIFF, JPEG", other),
                ));
            }
        }

        let parser = FilenameParser::new(&self.registry);
        let parsed = match parser.parse(&record.file_name) {
            Some(parsed) => parsed,
            None => {
                return RecordCheck::fatal(Violation::new(
                    ViolationKind::InvalidFileNameFormat,
                    record,
                    "expected YYYYMMDD_HHMMSS_<camera name>[-HDR][-Pano][-Edit].(dng|tif)",
                ));
            }
        };

        let expected = parsed.expected_preserved_file_name();
        let correction = (expected != record.preserved_file_name).then(|| Correction {
            source_file_path: record.source_file_path.clone(),
            expected_preserved_file_name: expected,
            current_preserved_file_name: record.preserved_file_name.clone(),
        });

        let ctx = RuleContext { record, parsed: &parsed };
        let violation = self.rules.iter().find_map(|rule| rule.evaluate(&ctx));

        RecordCheck { correction, violation }
    }

    /// Single outcome for one record. A violation outranks a correction
    /// found earlier on the same record; use [`evaluate`](Self::evaluate)
    /// to see both.
    pub fn check(&self, record: &MetadataRecord) -> ValidationOutcome {
        self.evaluate(record).into_outcome()
    }
}

impl Default for ConsistencyChecker {
    fn default() -> Self {
        Self::new(PatternRegistry::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violation_kind(outcome: ValidationOutcome) -> ViolationKind {
        match outcome {
            ValidationOutcome::Violation(v) => v.kind,
            other => panic!("expected violation, got {:?}", other),
        }
    }

    #[test]
    fn test_unexpected_file_type() {
        let checker = ConsistencyChecker::default();
        let record = MetadataRecord::new("20210615_143200_DSC04521.dng", "PNG");
        assert_eq!(violation_kind(checker.check(&record)), ViolationKind::UnexpectedFileType);
    }

    #[test]
    fn test_jpeg_skips_all_rules() {
        let checker = ConsistencyChecker::default();
        let record = MetadataRecord::new("whatever.jpg", FileType::Jpeg).with_hdr(true);
        assert_eq!(checker.check(&record), ValidationOutcome::Pass);
    }

    #[test]
    fn test_stale_preserved_name_needs_correction() {
        let checker = ConsistencyChecker::default();
        let record = MetadataRecord::new("20210615_143200_IMG_1234.dng", FileType::Dng)
            .with_source("/a/20210615_143200_IMG_1234.dng")
            .with_preserved("IMG_1234.cr2");
        match checker.check(&record) {
            ValidationOutcome::CorrectionNeeded(c) => {
                assert_eq!(c.source_file_path, "/a/20210615_143200_IMG_1234.dng");
                assert_eq!(c.expected_preserved_file_name, "IMG_1234.CR2");
                assert_eq!(c.current_preserved_file_name, "IMG_1234.cr2");
            }
            other => panic!("expected correction, got {:?}", other),
        }
    }

    #[test]
    fn test_correction_survives_later_violation() {
        let checker = ConsistencyChecker::default();
        let record = MetadataRecord::new("20210615_143200_DSC04521.dng", FileType::Dng)
            .with_panorama(true);

        let result = checker.evaluate(&record);
        let correction = result.correction.clone().expect("stale name should be corrected");
        assert_eq!(correction.expected_preserved_file_name, "DSC04521.ARW");
        assert_eq!(result.violation.as_ref().map(|v| v.kind), Some(ViolationKind::MissingPanoSuffix));

        assert_eq!(violation_kind(checker.check(&record)), ViolationKind::MissingPanoSuffix);
    }

    #[test]
    fn test_gate_failures_carry_no_correction() {
        let checker = ConsistencyChecker::default();
        let result = checker.evaluate(&MetadataRecord::new("badname.dng", FileType::Dng));
        assert!(result.correction.is_none());
        assert_eq!(result.violation.map(|v| v.kind), Some(ViolationKind::InvalidFileNameFormat));
    }

    #[test]
    fn test_suffix_without_flag_is_accepted() {
        let checker = ConsistencyChecker::default();
        let record = MetadataRecord::new("20210615_143200_DSC04521-HDR-Pano.dng", FileType::Dng)
            .with_preserved("DSC04521.ARW");
        assert_eq!(checker.check(&record), ValidationOutcome::Pass);
    }

    #[test]
    fn test_hdr_checked_before_pano() {
        let checker = ConsistencyChecker::default();
        let record = MetadataRecord::new("20210615_143200_DSC04521.dng", FileType::Dng)
            .with_hdr(true)
            .with_panorama(true)
            .with_preserved("DSC04521.ARW");
        assert_eq!(violation_kind(checker.check(&record)), ViolationKind::MissingHdrSuffix);
    }

    #[test]
    fn test_tiff_with_dng_extension_is_missing_edit_marker() {
        let checker = ConsistencyChecker::default();
        let record = MetadataRecord::new("20210615_143200_DSC04521-Edit.dng", FileType::Tiff)
            .with_preserved("DSC04521.ARW");
        assert_eq!(violation_kind(checker.check(&record)), ViolationKind::MissingEditMarker);
    }

    #[test]
    fn test_edit_rule_ignores_dng() {
        let checker = ConsistencyChecker::default();
        let record = MetadataRecord::new("20210615_143200_DSC04521.tif", FileType::Dng)
            .with_preserved("DSC04521.ARW");
        assert_eq!(checker.check(&record), ValidationOutcome::Pass);
    }

    #[test]
    fn test_rule_order() {
        let checker = ConsistencyChecker::default();
        assert_eq!(checker.rule_names(), vec!["hdr_suffix", "pano_suffix", "tiff_edit"]);
    }

    #[test]
    fn test_violation_display_names_file() {
        let checker = ConsistencyChecker::default();
        let record = MetadataRecord::new("badname.dng", FileType::Dng);
        match checker.check(&record) {
            ValidationOutcome::Violation(v) => {
                let text = v.to_string();
                assert!(text.contains("invalid file name format"));
                assert!(text.contains("badname.dng"));
            }
            other => panic!("expected violation, got {:?}", other),
        }
    }
}
